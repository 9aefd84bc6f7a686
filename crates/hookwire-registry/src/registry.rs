//! The hook dispatch registry.
//!
//! Owns all registration bookkeeping behind a single lock. The lock is
//! never held across calls into foreign code (handlers, factories, the
//! container, the resolver, the bus), which is what makes it safe for a
//! running handler to register or remove hookings on the registry that is
//! currently dispatching it.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use serde_json::Value;
use tracing::{debug, info};

use hookwire_core::config::RegistryConfig;
use hookwire_core::result::HookResult;
use hookwire_core::traits::bus::EventBus;
use hookwire_core::traits::container::{LegacyResolver, ServiceContainer};
use hookwire_core::traits::handler::HookHandler;
use hookwire_core::{HookError, HookingId};

use crate::adapter;
use crate::key::HookKey;
use crate::state::{Registration, RegistryState};
use crate::target::HookTarget;

/// A step snapshotted out of the live list under the lock, executed with
/// the lock released.
struct Step {
    id: HookingId,
    method: String,
    target: HookTarget,
}

/// Process-wide hook dispatch registry.
///
/// Wraps an external event bus: each unique (hook name, priority, arity)
/// key gets exactly one bus subscription, created lazily on the first
/// registration for that key and never torn down. All registrations under a
/// key execute in registration order on a single bus fire, threading the
/// leading argument through the chain.
pub struct HookRegistry {
    /// The wrapped event bus.
    bus: Arc<dyn EventBus>,
    /// Primary resolution path for type-identifier targets.
    container: Arc<dyn ServiceContainer>,
    /// Fallback resolution path for types the container lacks.
    legacy: Option<Arc<dyn LegacyResolver>>,
    /// Defaults for the `*_default` registration methods.
    config: RegistryConfig,
    /// All mutable bookkeeping, behind one lock.
    state: Mutex<RegistryState>,
}

impl HookRegistry {
    /// Creates a registry wrapping the given bus and resolution
    /// collaborators.
    pub fn new(
        bus: Arc<dyn EventBus>,
        container: Arc<dyn ServiceContainer>,
        legacy: Option<Arc<dyn LegacyResolver>>,
        config: RegistryConfig,
    ) -> Arc<Self> {
        Arc::new(Self {
            bus,
            container,
            legacy,
            config,
            state: Mutex::new(RegistryState::new()),
        })
    }

    fn state(&self) -> MutexGuard<'_, RegistryState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Registers a filter hooking and returns its id.
    ///
    /// Validates the target/method pair, ensures the bus subscription for
    /// the (hook name, priority, arity) key exists, bumps the refcount for
    /// type-identifier targets, and appends the registration to the key's
    /// list.
    pub fn register_filter(
        self: &Arc<Self>,
        hook_name: &str,
        target: HookTarget,
        method: &str,
        priority: i32,
        arity: usize,
    ) -> HookResult<HookingId> {
        target.validate(method)?;

        let key = HookKey::new(hook_name, priority, arity);

        // Membership test and insert are one atomic step; only the inserting
        // caller subscribes, so the bus sees each key exactly once.
        let newly_subscribed = self.state().subscribed.insert(key.clone());
        if newly_subscribed {
            let callback = adapter::subscription_callback(self, &key);
            self.bus
                .subscribe(&key.name, key.priority, key.arity, callback);
            debug!(hook = %key.name, priority = key.priority, arity = key.arity, "subscribed key on bus");
        }

        let id = HookingId::new();
        {
            let mut state = self.state();
            if let Some(type_name) = target.as_type() {
                state.increment_refcount(type_name);
            }
            state
                .hookings
                .entry(key.clone())
                .or_default()
                .entries
                .push(Registration {
                    id,
                    target,
                    method: method.to_string(),
                    priority,
                    arity,
                    removed: false,
                });
        }

        info!(hook = %key.name, priority = key.priority, arity = key.arity, hooking_id = %id, "hook registered");
        Ok(id)
    }

    /// Registers an action hooking. Identical to [`register_filter`]; the
    /// two spellings exist to match the wrapped bus's vocabulary.
    ///
    /// [`register_filter`]: Self::register_filter
    pub fn register_action(
        self: &Arc<Self>,
        hook_name: &str,
        target: HookTarget,
        method: &str,
        priority: i32,
        arity: usize,
    ) -> HookResult<HookingId> {
        self.register_filter(hook_name, target, method, priority, arity)
    }

    /// Registers a filter hooking with the configured default priority and
    /// arity.
    pub fn register_filter_default(
        self: &Arc<Self>,
        hook_name: &str,
        target: HookTarget,
        method: &str,
    ) -> HookResult<HookingId> {
        self.register_filter(
            hook_name,
            target,
            method,
            self.config.default_priority,
            self.config.default_arity,
        )
    }

    /// Registers an action hooking with the configured default priority and
    /// arity.
    pub fn register_action_default(
        self: &Arc<Self>,
        hook_name: &str,
        target: HookTarget,
        method: &str,
    ) -> HookResult<HookingId> {
        self.register_filter_default(hook_name, target, method)
    }

    /// Removes the registration with the given id.
    ///
    /// Returns `true` if a live registration was removed, `false` if the id
    /// matched nothing. Safe to call from inside a handler running under
    /// this registry, including for the handler's own registration or a
    /// not-yet-executed sibling.
    pub fn remove_filter_by_id(&self, id: HookingId) -> bool {
        let removed_from = {
            let mut state = self.state();
            match state.find_by_id(id) {
                Some((key, index)) => {
                    state.remove_at(&key, index);
                    Some(key)
                }
                None => None,
            }
        };

        match removed_from {
            Some(key) => {
                info!(hook = %key.name, hooking_id = %id, "hook removed");
                true
            }
            None => false,
        }
    }

    /// Alias of [`remove_filter_by_id`] for action vocabulary.
    ///
    /// [`remove_filter_by_id`]: Self::remove_filter_by_id
    pub fn remove_action_by_id(&self, id: HookingId) -> bool {
        self.remove_filter_by_id(id)
    }

    /// Removes the first registration under (hook name, priority, arity)
    /// that matches the given target identity and method.
    ///
    /// Instances, factories, and static calls match by pointer identity;
    /// type identifiers match by string equality. Returns `false` when the
    /// key is absent or nothing matches.
    pub fn remove_filter(
        &self,
        hook_name: &str,
        target: &HookTarget,
        method: &str,
        priority: i32,
        arity: usize,
    ) -> bool {
        let key = HookKey::new(hook_name, priority, arity);
        let removed = {
            let mut state = self.state();
            let Some(list) = state.hookings.get(&key) else {
                return false;
            };
            let index = list.entries.iter().position(|reg| {
                !reg.removed
                    && reg.method == method
                    && reg.priority == priority
                    && reg.arity == arity
                    && reg.target.matches(target)
            });
            match index {
                Some(index) => {
                    state.remove_at(&key, index);
                    true
                }
                None => false,
            }
        };

        if removed {
            info!(hook = %key.name, priority, arity, method, "hook removed by value match");
        }
        removed
    }

    /// Alias of [`remove_filter`] for action vocabulary.
    ///
    /// [`remove_filter`]: Self::remove_filter
    pub fn remove_action(
        &self,
        hook_name: &str,
        target: &HookTarget,
        method: &str,
        priority: i32,
        arity: usize,
    ) -> bool {
        self.remove_filter(hook_name, target, method, priority, arity)
    }

    /// Removes every registration whose hook name matches `hook_name`
    /// exactly, across all priority/arity variants. Returns the number
    /// removed.
    ///
    /// Implemented as repeated id removals so the refcount and eviction
    /// logic lives in exactly one place.
    pub fn remove_all_hooks(&self, hook_name: &str) -> usize {
        let ids: Vec<HookingId> = {
            let state = self.state();
            state
                .hookings
                .iter()
                .filter(|(key, _)| key.name == hook_name)
                .flat_map(|(_, list)| {
                    list.entries
                        .iter()
                        .filter(|reg| !reg.removed)
                        .map(|reg| reg.id)
                })
                .collect()
        };

        let removed = ids
            .into_iter()
            .filter(|id| self.remove_filter_by_id(*id))
            .count();
        info!(hook = %hook_name, removed, "removed all hooks for name");
        removed
    }

    /// Dispatch entry point, invoked by the bus adapter when the wrapped
    /// bus fires a subscribed key.
    ///
    /// When the key has no registrations left the leading argument passes
    /// through unchanged, which is the contract the bus expects from a
    /// no-op filter. Otherwise each live registration executes in
    /// registration order with the leading argument replaced by the
    /// previous handler's return value; the final return value is the
    /// dispatch result.
    pub fn dispatch(
        &self,
        hook_name: &str,
        priority: i32,
        arity: usize,
        args: &[Value],
    ) -> HookResult<Value> {
        let key = HookKey::new(hook_name, priority, arity);

        {
            let mut state = self.state();
            let Some(list) = state.hookings.get_mut(&key) else {
                debug!(hook = %key.name, priority, arity, "no registrations for key, passing value through");
                return Ok(args.first().cloned().unwrap_or(Value::Null));
            };
            list.active_passes += 1;
            debug!(hook = %key.name, priority, arity, live = list.live_count(), "dispatch pass started");
        }

        let result = self.run_pass(&key, args);

        // The pass is over; if it was the outermost one for this key, drop
        // the tombstones it walked past and prune the key if it emptied.
        {
            let mut state = self.state();
            let outermost_done = match state.hookings.get_mut(&key) {
                Some(list) => {
                    list.active_passes -= 1;
                    list.active_passes == 0
                }
                None => false,
            };
            if outermost_done {
                state.compact(&key);
            }
        }

        result
    }

    /// Walks `key`'s list by index cursor, re-locking per step.
    ///
    /// Tombstoned entries are skipped; entries appended by handlers during
    /// the pass sit ahead of the cursor and therefore run within it.
    fn run_pass(&self, key: &HookKey, args: &[Value]) -> HookResult<Value> {
        let mut args: Vec<Value> = args.to_vec();
        let mut value = args.first().cloned().unwrap_or(Value::Null);
        let mut index = 0usize;

        loop {
            let step = {
                let state = self.state();
                let Some(list) = state.hookings.get(key) else {
                    break;
                };
                if index >= list.entries.len() {
                    break;
                }
                let reg = &list.entries[index];
                if reg.removed {
                    index += 1;
                    continue;
                }
                Step {
                    id: reg.id,
                    method: reg.method.clone(),
                    target: reg.target.clone(),
                }
            };

            debug!(hook = %key.name, hooking_id = %step.id, method = %step.method, "executing hook step");
            if let Some(returned) = self.execute_step(key, &step, &args)? {
                value = returned;
                if !args.is_empty() {
                    args[0] = value.clone();
                }
            }
            index += 1;
        }

        Ok(value)
    }

    /// Resolves the step's target and invokes its method.
    ///
    /// Returns `Ok(None)` when the step turned out to be gone by the time
    /// its factory cell was consumed elsewhere (only reachable when passes
    /// interleave from multiple threads).
    fn execute_step(
        &self,
        key: &HookKey,
        step: &Step,
        args: &[Value],
    ) -> HookResult<Option<Value>> {
        match &step.target {
            HookTarget::Static(func) => func(args).map(Some),
            HookTarget::Instance(handler) => handler.invoke(&step.method, args).map(Some),
            HookTarget::Type(type_name) => {
                let instance = self.resolve_type(type_name)?;
                instance.invoke(&step.method, args).map(Some)
            }
            HookTarget::Factory(cell) => {
                let instance = match cell.take() {
                    Some(factory) => {
                        let instance = factory();
                        self.adopt_factory_instance(key, step.id, &instance);
                        instance
                    }
                    None => {
                        // Another pass beat us to the factory; the stored
                        // target has been rewritten to a type identifier.
                        let type_name = {
                            let state = self.state();
                            state.hookings.get(key).and_then(|list| {
                                list.entries
                                    .iter()
                                    .find(|reg| reg.id == step.id && !reg.removed)
                                    .and_then(|reg| reg.target.as_type().map(str::to_string))
                            })
                        };
                        match type_name {
                            Some(type_name) => self.resolve_type(&type_name)?,
                            None => return Ok(None),
                        }
                    }
                };
                instance.invoke(&step.method, args).map(Some)
            }
        }
    }

    /// Records a freshly produced factory instance: caches it under its
    /// type identifier, rewrites the registration's target in place so the
    /// factory never runs twice, and counts the registration as a referent
    /// of that type.
    ///
    /// If the registration was removed while the factory ran, the rewrite
    /// and refcount bump are skipped so nothing leaks; the instance still
    /// executes for the step that reached it.
    fn adopt_factory_instance(&self, key: &HookKey, id: HookingId, instance: &Arc<dyn HookHandler>) {
        let type_name = instance.type_name().to_string();
        let mut state = self.state();

        let still_live = state
            .hookings
            .get_mut(key)
            .and_then(|list| list.entries.iter_mut().find(|reg| reg.id == id))
            .filter(|reg| !reg.removed)
            .map(|reg| {
                reg.target = HookTarget::Type(type_name.clone());
            })
            .is_some();

        if still_live {
            state.instances.insert(type_name.clone(), Arc::clone(instance));
            state.increment_refcount(&type_name);
            debug!(hook = %key.name, hooking_id = %id, type_name = %type_name, "factory resolved and rewritten to type target");
        }
    }

    /// Cache-or-compute resolution of a type identifier.
    ///
    /// Checks the instance cache first; on a miss, asks the container, then
    /// the legacy resolver. An identifier neither can produce is a
    /// programming error and surfaces as a fatal resolution error.
    fn resolve_type(&self, type_name: &str) -> HookResult<Arc<dyn HookHandler>> {
        {
            let state = self.state();
            if let Some(instance) = state.instances.get(type_name) {
                return Ok(Arc::clone(instance));
            }
        }

        let instance = if self.container.has(type_name) {
            self.container.get(type_name)?
        } else if let Some(legacy) = &self.legacy {
            legacy.get_instance_of(type_name)?
        } else {
            return Err(HookError::resolution(format!(
                "no provider can resolve type '{type_name}'"
            )));
        };

        debug!(type_name = %type_name, "resolved and cached instance");
        let mut state = self.state();
        Ok(Arc::clone(
            state
                .instances
                .entry(type_name.to_string())
                .or_insert(instance),
        ))
    }
}
