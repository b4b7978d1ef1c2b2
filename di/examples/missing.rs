use ingress_di::{resolve, Injector, Registration, ResolveError};
use std::panic;
use std::sync::Arc;

struct UnregisteredService;

struct Consumer {
  _dependency: Arc<UnregisteredService>,
}

fn main() {
  let scope = Injector::resolve_and_create([Registration::scoped(
    |(dependency,): (Arc<UnregisteredService>,)| Consumer {
      _dependency: dependency,
    },
  )])
  .expect("registrations are consistent");

  // --- Using the panicking `resolve!` macro ---
  println!("Attempting to resolve a service whose dependency was never registered...");

  let result = panic::catch_unwind(panic::AssertUnwindSafe(|| {
    let _service = resolve!(scope, Consumer);
  }));

  assert!(result.is_err(), "resolve! should have panicked.");
  println!("Successfully caught the expected panic from resolve!.");

  // --- Using the fallible `get()` method ---
  println!("\nNow, attempting to resolve using the fallible `get()` method...");

  match scope.get::<Consumer>() {
    Ok(_) => panic!("Should not have found the service!"),
    Err(err @ ResolveError::UnregisteredService { .. }) => println!("Correctly failed: {err}"),
    Err(other) => panic!("Unexpected error: {other}"),
  }
}
