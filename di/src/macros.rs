//! Public macros for ergonomic service resolution.

/// Resolves a service from an [`Injector`](crate::Injector) or a
/// [`Container`](crate::Container), panicking if it cannot be resolved.
///
/// Use it where a missing service is a programming error. For a recoverable
/// failure call `get` directly and handle the [`ResolveError`](crate::ResolveError).
///
/// # Panics
///
/// Panics with the resolution error if the service is unregistered, part of a
/// cycle, or not resolvable from the given scope.
///
/// # Examples
///
/// ```
/// use ingress_di::{resolve, Injector, Registration};
/// use std::sync::Arc;
///
/// trait Greeter: Send + Sync {
///   fn greet(&self) -> String;
/// }
/// struct EnglishGreeter;
/// impl Greeter for EnglishGreeter {
///   fn greet(&self) -> String {
///     "Hello!".to_string()
///   }
/// }
///
/// let scope = Injector::resolve_and_create([
///   Registration::instance(String::from("hello")),
///   Registration::instance(String::from("hallo")).named("german"),
///   Registration::shared::<dyn Greeter, (), _>(ingress_di::Lifetime::Singleton, |()| {
///     Arc::new(EnglishGreeter) as Arc<dyn Greeter>
///   }),
/// ])
/// .unwrap();
///
/// assert_eq!(*resolve!(scope, String), "hello");
/// assert_eq!(*resolve!(scope, String, "german"), "hallo");
/// assert_eq!(resolve!(scope, trait Greeter).greet(), "Hello!");
/// ```
#[macro_export]
macro_rules! resolve {
  // The trait arms come first: `trait Foo` is not a type and would abort a `ty` match.
  ($scope:expr, trait $trait_ident:ident) => {
    $scope
      .get::<dyn $trait_ident>()
      .unwrap_or_else(|err| {
        panic!(
          "Failed to resolve required trait service {}: {}",
          std::any::type_name::<dyn $trait_ident>(),
          err
        )
      })
  };

  ($scope:expr, trait $trait_ident:ident, $name:expr) => {
    $scope
      .get_named::<dyn $trait_ident>($name)
      .unwrap_or_else(|err| {
        panic!(
          "Failed to resolve required trait service with name '{}' {}: {}",
          $name,
          std::any::type_name::<dyn $trait_ident>(),
          err
        )
      })
  };

  ($scope:expr, $type:ty) => {
    $scope.get::<$type>().unwrap_or_else(|err| {
      panic!(
        "Failed to resolve required service {}: {}",
        std::any::type_name::<$type>(),
        err
      )
    })
  };

  ($scope:expr, $type:ty, $name:expr) => {
    $scope.get_named::<$type>($name).unwrap_or_else(|err| {
      panic!(
        "Failed to resolve required service with name '{}' {}: {}",
        $name,
        std::any::type_name::<$type>(),
        err
      )
    })
  };
}
