//! Registering an implementation against a trait and injecting the trait object.

use ingress_di::{resolve, Injector, Lifetime, Registration};
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

trait Clock: Send + Sync {
  fn unix_seconds(&self) -> u64;
}

struct SystemClock;

impl Clock for SystemClock {
  fn unix_seconds(&self) -> u64 {
    SystemTime::now()
      .duration_since(UNIX_EPOCH)
      .map(|elapsed| elapsed.as_secs())
      .unwrap_or_default()
  }
}

// Depends on the abstraction only.
struct SessionIssuer {
  clock: Arc<dyn Clock>,
  ttl_seconds: u64,
}

impl SessionIssuer {
  fn expiry(&self) -> u64 {
    self.clock.unix_seconds() + self.ttl_seconds
  }
}

fn main() {
  let scope = Injector::resolve_and_create([
    Registration::shared::<dyn Clock, (), _>(Lifetime::Singleton, |()| {
      Arc::new(SystemClock) as Arc<dyn Clock>
    }),
    Registration::scoped(|(clock,): (Arc<dyn Clock>,)| SessionIssuer {
      clock,
      ttl_seconds: 3600,
    }),
  ])
  .expect("registrations are consistent");

  let issuer = resolve!(scope, SessionIssuer);
  println!("a session issued now expires at {}", issuer.expiry());

  // The trait object itself is resolvable and shared.
  let clock = resolve!(scope, trait Clock);
  assert!(Arc::ptr_eq(&clock, &issuer.clock));
}
