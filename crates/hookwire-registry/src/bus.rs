//! In-memory reference implementation of the event bus.
//!
//! Reproduces the wrapped bus's filter semantics for tests and for hosts
//! without a native bus: subscribers fire in ascending priority order (ties
//! in subscription order), each receives at most its declared arity of
//! positional arguments, and the leading argument is replaced by the
//! running value between subscribers.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use serde_json::Value;

use hookwire_core::result::HookResult;
use hookwire_core::traits::bus::{BusCallback, EventBus};

struct Subscriber {
    priority: i32,
    arity: usize,
    seq: u64,
    callback: BusCallback,
}

/// In-memory event bus.
#[derive(Default)]
pub struct MemoryBus {
    subscribers: Mutex<HashMap<String, Vec<Subscriber>>>,
    next_seq: Mutex<u64>,
}

impl MemoryBus {
    /// Creates an empty bus.
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, Vec<Subscriber>>> {
        self.subscribers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Fires a hook: threads the leading argument through every subscriber
    /// of `hook_name` in priority order and returns the final value.
    ///
    /// The subscriber list is snapshotted at fire time; subscriptions added
    /// during a fire join the next one.
    pub fn fire(&self, hook_name: &str, args: &[Value]) -> HookResult<Value> {
        let snapshot: Vec<(usize, BusCallback)> = {
            let subscribers = self.lock();
            let Some(list) = subscribers.get(hook_name) else {
                return Ok(args.first().cloned().unwrap_or(Value::Null));
            };
            let mut ordered: Vec<&Subscriber> = list.iter().collect();
            ordered.sort_by_key(|sub| (sub.priority, sub.seq));
            ordered
                .into_iter()
                .map(|sub| (sub.arity, Arc::clone(&sub.callback)))
                .collect()
        };

        let mut args: Vec<Value> = args.to_vec();
        let mut value = args.first().cloned().unwrap_or(Value::Null);
        for (arity, callback) in snapshot {
            let take = arity.min(args.len());
            value = callback(&args[..take])?;
            if !args.is_empty() {
                args[0] = value.clone();
            }
        }
        Ok(value)
    }

    /// Number of subscriptions currently held for a hook name.
    pub fn subscription_count(&self, hook_name: &str) -> usize {
        self.lock().get(hook_name).map(Vec::len).unwrap_or(0)
    }
}

impl EventBus for MemoryBus {
    fn subscribe(&self, hook_name: &str, priority: i32, arity: usize, callback: BusCallback) {
        let seq = {
            let mut next = self.next_seq.lock().unwrap_or_else(PoisonError::into_inner);
            *next += 1;
            *next
        };
        self.lock()
            .entry(hook_name.to_string())
            .or_default()
            .push(Subscriber {
                priority,
                arity,
                seq,
                callback,
            });
    }
}
