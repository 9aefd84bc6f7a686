//! Hook handler trait and the callable target aliases.

use std::sync::Arc;

use serde_json::Value;

use crate::result::HookResult;

/// Trait for objects whose methods can be invoked by a hook registration.
///
/// Handlers dispatch on a method name rather than exposing one fixed entry
/// point: a single registered object may serve several hooks, each bound to
/// a different method. `type_name` is the stable identifier under which a
/// resolved instance is cached and reference-counted.
pub trait HookHandler: Send + Sync {
    /// Returns the type identifier used as the instance-cache key.
    fn type_name(&self) -> &str;

    /// Invokes the named method with the given positional arguments.
    ///
    /// The first argument is the value being filtered; the return value is
    /// threaded into the next handler in the chain.
    fn invoke(&self, method: &str, args: &[Value]) -> HookResult<Value>;
}

/// A pure function target for static-call registrations; no instance is
/// resolved or cached.
pub type StaticHookFn = Arc<dyn Fn(&[Value]) -> HookResult<Value> + Send + Sync>;

/// A zero-argument producer of a handler instance, invoked at most once.
pub type HandlerFactory = Box<dyn FnOnce() -> Arc<dyn HookHandler> + Send>;
