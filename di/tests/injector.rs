use ingress_di::{
  Error, Injectable, Injector, Lifetime, Registration, ResolveError, ScopeKind, ServiceKey,
};
use parking_lot::Mutex;
use pretty_assertions::assert_eq;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

// --- Test Fixtures ---

// Records construction order.
#[derive(Default)]
struct Journal {
  entries: Mutex<Vec<&'static str>>,
}

impl Journal {
  fn record(&self, entry: &'static str) {
    self.entries.lock().push(entry);
  }

  fn entries(&self) -> Vec<&'static str> {
    self.entries.lock().clone()
  }
}

struct Leaf;
struct Left {
  _leaf: Arc<Leaf>,
}
struct Right;
struct Root {
  _left: Arc<Left>,
  _right: Arc<Right>,
}

fn journaled_graph(journal: &Arc<Journal>) -> Vec<Registration> {
  let journal = Arc::clone(journal);
  vec![
    Registration::shared::<Journal, (), _>(Lifetime::Singleton, move |()| Arc::clone(&journal)),
    Registration::scoped(|(journal,): (Arc<Journal>,)| {
      journal.record("leaf");
      Leaf
    }),
    Registration::scoped(|(journal, leaf): (Arc<Journal>, Arc<Leaf>)| {
      journal.record("left");
      Left { _leaf: leaf }
    }),
    Registration::scoped(|(journal,): (Arc<Journal>,)| {
      journal.record("right");
      Right
    }),
    Registration::scoped(|(journal, left, right): (Arc<Journal>, Arc<Left>, Arc<Right>)| {
      journal.record("root");
      Root {
        _left: left,
        _right: right,
      }
    }),
  ]
}

trait Clock: Send + Sync {
  fn now(&self) -> u64;
}

struct FixedClock(u64);

impl Clock for FixedClock {
  fn now(&self) -> u64 {
    self.0
  }
}

struct Cyclic1 {
  _other: Arc<Cyclic2>,
}
struct Cyclic2 {
  _other: Arc<Cyclic1>,
}

impl Injectable for Cyclic1 {
  type Dependencies = (Arc<Cyclic2>,);
  fn construct((other,): Self::Dependencies) -> Self {
    Cyclic1 { _other: other }
  }
}

impl Injectable for Cyclic2 {
  type Dependencies = (Arc<Cyclic1>,);
  fn construct((other,): Self::Dependencies) -> Self {
    Cyclic2 { _other: other }
  }
}

struct Missing;
struct NeedsMissing {
  _missing: Arc<Missing>,
}
struct NeedsNeedsMissing {
  _inner: Arc<NeedsMissing>,
}

// --- Resolution Tests ---

#[test]
fn test_dependencies_are_constructed_left_to_right_depth_first() {
  let journal = Arc::new(Journal::default());
  let injector = Injector::resolve_and_create(journaled_graph(&journal)).unwrap();

  injector.get::<Root>().unwrap();

  // `left` (with its own dependency) is complete before `right` starts.
  assert_eq!(journal.entries(), vec!["leaf", "left", "right", "root"]);
}

#[test]
fn test_same_scope_resolution_is_idempotent() {
  let journal = Arc::new(Journal::default());
  let injector = Injector::resolve_and_create(journaled_graph(&journal)).unwrap();

  let first = injector.get::<Root>().unwrap();
  let second = injector.get::<Root>().unwrap();
  let left = injector.get::<Left>().unwrap();

  assert!(Arc::ptr_eq(&first, &second));
  assert!(Arc::ptr_eq(&first._left, &left));
  // Nothing was built twice.
  assert_eq!(journal.entries().len(), 4);
}

#[test]
fn test_circular_dependency_is_rejected_when_the_injector_is_created() {
  let result = Injector::resolve_and_create([
    Registration::injectable::<Cyclic1>(Lifetime::Scoped),
    Registration::injectable::<Cyclic2>(Lifetime::Scoped),
  ]);

  match result {
    Err(Error::Resolve(ResolveError::CircularDependency { cycle })) => {
      assert_eq!(cycle.len(), 3);
      assert_eq!(cycle.first(), cycle.last());
      assert!(cycle.contains(&ServiceKey::of::<Cyclic1>()));
      assert!(cycle.contains(&ServiceKey::of::<Cyclic2>()));
    }
    other => panic!("expected a circular dependency, got {:?}", other.err()),
  }
}

#[test]
fn test_unregistered_dependency_names_the_dependency_and_its_chain() {
  let injector = Injector::resolve_and_create([
    Registration::scoped(|(missing,): (Arc<Missing>,)| NeedsMissing { _missing: missing }),
    Registration::scoped(|(inner,): (Arc<NeedsMissing>,)| NeedsNeedsMissing { _inner: inner }),
  ])
  .unwrap();

  match injector.get::<NeedsNeedsMissing>() {
    Err(ResolveError::UnregisteredService { key, chain }) => {
      assert_eq!(key, ServiceKey::of::<Missing>());
      assert_eq!(
        chain,
        vec![
          ServiceKey::of::<NeedsNeedsMissing>(),
          ServiceKey::of::<NeedsMissing>(),
        ]
      );
    }
    other => panic!("expected an unregistered service, got {:?}", other.err()),
  }
}

#[test]
fn test_failed_construction_is_not_cached() {
  let injector = Injector::resolve_and_create([Registration::scoped(
    |(missing,): (Arc<Missing>,)| NeedsMissing { _missing: missing },
  )])
  .unwrap();

  assert!(injector.get::<NeedsMissing>().is_err());
  assert!(injector.get::<NeedsMissing>().is_err());
  assert!(!injector.has::<Missing>());
}

#[test]
fn test_trait_object_and_named_resolution() {
  let injector = Injector::resolve_and_create([
    Registration::shared::<dyn Clock, (), _>(Lifetime::Singleton, |()| {
      Arc::new(FixedClock(7)) as Arc<dyn Clock>
    }),
    Registration::shared::<dyn Clock, (), _>(Lifetime::Singleton, |()| {
      Arc::new(FixedClock(9)) as Arc<dyn Clock>
    })
    .named("frozen"),
  ])
  .unwrap();

  assert_eq!(injector.get::<dyn Clock>().unwrap().now(), 7);
  assert_eq!(injector.get_named::<dyn Clock>("frozen").unwrap().now(), 9);
  assert!(Arc::ptr_eq(
    &injector.get::<dyn Clock>().unwrap(),
    &injector.get::<dyn Clock>().unwrap()
  ));
}

#[test]
fn test_root_injectors_do_not_share_instances() {
  static BUILT: AtomicUsize = AtomicUsize::new(0);
  struct Counted;

  let registrations = || {
    [Registration::singleton(|()| {
      BUILT.fetch_add(1, Ordering::SeqCst);
      Counted
    })]
  };
  let a = Injector::resolve_and_create(registrations()).unwrap();
  let b = Injector::resolve_and_create(registrations()).unwrap();

  assert!(!Arc::ptr_eq(&a.get::<Counted>().unwrap(), &b.get::<Counted>().unwrap()));
  assert_eq!(BUILT.load(Ordering::SeqCst), 2);
}

#[test]
fn test_instance_registration_hands_out_the_same_allocation() {
  let injector = Injector::resolve_and_create([Registration::instance(String::from("shared"))]).unwrap();
  assert!(Arc::ptr_eq(
    &injector.get::<String>().unwrap(),
    &injector.get::<String>().unwrap()
  ));
}

#[test]
fn test_has_reports_registrations_without_constructing() {
  static BUILT: AtomicUsize = AtomicUsize::new(0);
  struct Lazy;

  let injector = Injector::resolve_and_create([Registration::scoped(|()| {
    BUILT.fetch_add(1, Ordering::SeqCst);
    Lazy
  })])
  .unwrap();

  assert!(injector.has::<Lazy>());
  assert!(!injector.has_named::<Lazy>("other"));
  assert_eq!(BUILT.load(Ordering::SeqCst), 0);
}

#[test]
fn test_empty_injector_is_a_root_with_nothing_registered() {
  let injector = Injector::default();
  assert_eq!(injector.kind(), ScopeKind::Root);
  assert!(injector.parent().is_none());
  assert!(matches!(
    injector.get::<Leaf>(),
    Err(ResolveError::UnregisteredService { .. })
  ));
  assert!(!Injector::empty().ptr_eq(&injector));
}
