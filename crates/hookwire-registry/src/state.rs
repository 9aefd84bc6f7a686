//! Registry bookkeeping state: hooking lists, instance cache, refcounts,
//! and the mark-and-compact removal core shared by every removal path.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use tracing::debug;

use hookwire_core::traits::handler::HookHandler;
use hookwire_core::HookingId;

use crate::key::HookKey;
use crate::target::HookTarget;

/// One entry in a hook key's ordered list.
#[derive(Debug)]
pub(crate) struct Registration {
    /// Unique id assigned at registration time; used for removal.
    pub id: HookingId,
    /// What to invoke. Rewritten in place from `Factory` to `Type` after the
    /// factory runs.
    pub target: HookTarget,
    /// Method name, or a static-call marker label.
    pub method: String,
    /// Duplicated from the key so value-based removal can match on it.
    pub priority: i32,
    /// Duplicated from the key so value-based removal can match on it.
    pub arity: usize,
    /// Tombstone flag; set instead of deleting while a dispatch pass is
    /// active on the owning key, so cursor indices stay stable.
    pub removed: bool,
}

/// The ordered registrations for one hook key.
#[derive(Debug, Default)]
pub(crate) struct HookList {
    /// Entries in registration order. May contain tombstones while a pass
    /// is active.
    pub entries: Vec<Registration>,
    /// Number of dispatch passes currently walking this list, counting
    /// re-entrant passes on the same key.
    pub active_passes: usize,
}

impl HookList {
    /// Number of live (non-tombstoned) entries.
    pub fn live_count(&self) -> usize {
        self.entries.iter().filter(|r| !r.removed).count()
    }
}

/// Process-wide registry state. Owned by the registry behind a single lock;
/// every method here assumes the caller holds that lock.
#[derive(Default)]
pub(crate) struct RegistryState {
    /// Active hookings keyed by (hook name, priority, arity).
    pub hookings: HashMap<HookKey, HookList>,
    /// Resolved instances keyed by type identifier.
    pub instances: HashMap<String, Arc<dyn HookHandler>>,
    /// Count of live registrations referencing each type identifier.
    pub refcounts: HashMap<String, usize>,
    /// Keys already subscribed on the bus. Subscriptions are permanent, so
    /// this set only grows; re-registration under a drained key reuses the
    /// existing subscription.
    pub subscribed: HashSet<HookKey>,
}

impl RegistryState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records one more live registration referencing `type_name`.
    pub fn increment_refcount(&mut self, type_name: &str) {
        let count = self.refcounts.entry(type_name.to_string()).or_insert(0);
        *count += 1;
    }

    /// Records one less registration referencing `type_name`, evicting the
    /// cached instance and the counter entry when the count reaches zero.
    pub fn decrement_refcount(&mut self, type_name: &str) {
        match self.refcounts.get_mut(type_name) {
            Some(count) if *count > 1 => {
                *count -= 1;
            }
            _ => {
                self.instances.remove(type_name);
                self.refcounts.remove(type_name);
                debug!(type_name = %type_name, "evicted cached instance");
            }
        }
    }

    /// Finds the live registration with the given id. Returns its key and
    /// position within that key's list.
    pub fn find_by_id(&self, id: HookingId) -> Option<(HookKey, usize)> {
        for (key, list) in &self.hookings {
            for (index, reg) in list.entries.iter().enumerate() {
                if reg.id == id && !reg.removed {
                    return Some((key.clone(), index));
                }
            }
        }
        None
    }

    /// Removes the registration at `index` in `key`'s list.
    ///
    /// While a dispatch pass is walking the list the entry is tombstoned so
    /// in-flight cursors keep their positions; otherwise it is deleted
    /// outright and the key entry is pruned when the list empties. Refcount
    /// bookkeeping for type-identifier targets happens immediately in both
    /// cases.
    pub fn remove_at(&mut self, key: &HookKey, index: usize) {
        let Some(list) = self.hookings.get_mut(key) else {
            return;
        };
        let type_name = {
            let reg = &mut list.entries[index];
            if reg.removed {
                return;
            }
            reg.removed = true;
            reg.target.as_type().map(str::to_string)
        };

        if list.active_passes == 0 {
            list.entries.remove(index);
            if list.entries.is_empty() {
                self.hookings.remove(key);
            }
        }

        if let Some(type_name) = type_name {
            self.decrement_refcount(&type_name);
        }
    }

    /// Drops tombstoned entries for `key` and prunes the key if nothing is
    /// left. Called when the last active pass over the list finishes.
    pub fn compact(&mut self, key: &HookKey) {
        if let Some(list) = self.hookings.get_mut(key) {
            list.entries.retain(|reg| !reg.removed);
            if list.entries.is_empty() {
                self.hookings.remove(key);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registration(method: &str) -> Registration {
        Registration {
            id: HookingId::new(),
            target: HookTarget::type_name("OrderSync"),
            method: method.to_string(),
            priority: 10,
            arity: 1,
            removed: false,
        }
    }

    #[test]
    fn test_refcount_evicts_at_zero() {
        let mut state = RegistryState::new();
        state.increment_refcount("OrderSync");
        state.increment_refcount("OrderSync");
        assert_eq!(state.refcounts.get("OrderSync"), Some(&2));

        state.decrement_refcount("OrderSync");
        assert_eq!(state.refcounts.get("OrderSync"), Some(&1));

        state.decrement_refcount("OrderSync");
        assert!(state.refcounts.get("OrderSync").is_none());
        assert!(state.instances.get("OrderSync").is_none());
    }

    #[test]
    fn test_remove_at_deletes_when_no_pass_active() {
        let mut state = RegistryState::new();
        let key = HookKey::new("order_total", 10, 1);
        state.increment_refcount("OrderSync");
        state
            .hookings
            .entry(key.clone())
            .or_default()
            .entries
            .push(registration("recalculate"));

        state.remove_at(&key, 0);
        assert!(state.hookings.get(&key).is_none());
        assert!(state.refcounts.is_empty());
    }

    #[test]
    fn test_remove_at_tombstones_during_active_pass() {
        let mut state = RegistryState::new();
        let key = HookKey::new("order_total", 10, 1);
        state.increment_refcount("OrderSync");
        let list = state.hookings.entry(key.clone()).or_default();
        list.entries.push(registration("recalculate"));
        list.active_passes = 1;

        state.remove_at(&key, 0);
        let list = state.hookings.get(&key).expect("key kept during pass");
        assert!(list.entries[0].removed);
        assert_eq!(list.live_count(), 0);

        state.hookings.get_mut(&key).expect("key").active_passes = 0;
        state.compact(&key);
        assert!(state.hookings.get(&key).is_none());
    }

    #[test]
    fn test_remove_at_is_idempotent_on_tombstones() {
        let mut state = RegistryState::new();
        let key = HookKey::new("order_total", 10, 1);
        state.increment_refcount("OrderSync");
        let list = state.hookings.entry(key.clone()).or_default();
        list.entries.push(registration("recalculate"));
        list.active_passes = 1;

        state.remove_at(&key, 0);
        state.remove_at(&key, 0);
        // A second removal of the same tombstone must not touch refcounts
        // again (they were already evicted to zero).
        assert!(state.refcounts.is_empty());
    }
}
