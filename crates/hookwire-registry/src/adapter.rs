//! Bus adapter — the forwarding shim installed on the event bus.
//!
//! One callback exists per (hook name, priority, arity) key for the
//! lifetime of the process. The callback holds a weak reference back to the
//! registry: the registry owns the bus, so a strong reference here would
//! form a cycle and keep both alive forever.

use std::sync::{Arc, Weak};

use serde_json::Value;

use hookwire_core::traits::bus::BusCallback;

use crate::key::HookKey;
use crate::registry::HookRegistry;

/// Builds the callback subscribed on the bus for `key`.
///
/// Forwards every fire into [`HookRegistry::dispatch`]. If the registry has
/// been dropped while the subscription lingers, the leading argument passes
/// through unchanged, matching the no-op filter contract.
pub(crate) fn subscription_callback(registry: &Arc<HookRegistry>, key: &HookKey) -> BusCallback {
    let registry: Weak<HookRegistry> = Arc::downgrade(registry);
    let key = key.clone();
    Arc::new(move |args: &[Value]| match registry.upgrade() {
        Some(registry) => registry.dispatch(&key.name, key.priority, key.arity, args),
        None => Ok(args.first().cloned().unwrap_or(Value::Null)),
    })
}
