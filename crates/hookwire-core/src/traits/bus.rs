//! Event bus trait for the wrapped hook-invocation mechanism.

use std::sync::Arc;

use serde_json::Value;

use crate::result::HookResult;

/// Callback installed on the bus for one (hook name, priority, arity) key.
///
/// Receives up to `arity` positional arguments and returns the filtered
/// value that the bus threads into the rest of its own chain.
pub type BusCallback = Arc<dyn Fn(&[Value]) -> HookResult<Value> + Send + Sync>;

/// The external event bus the registry wraps.
///
/// Subscriptions are permanent: there is no unsubscribe. The registry
/// guarantees it subscribes at most once per (hook name, priority, arity)
/// key; a subscription whose registrations have all been removed simply
/// passes its leading argument through unchanged.
pub trait EventBus: Send + Sync {
    /// Subscribes `callback` to `hook_name` at the given priority, to be
    /// invoked with up to `arity` positional arguments per fire.
    fn subscribe(&self, hook_name: &str, priority: i32, arity: usize, callback: BusCallback);
}
