//! # hookwire-registry
//!
//! The HookWire registry engine. Provides:
//!
//! - Priority-ordered hook registration keyed by (hook name, priority, arity)
//! - Exactly-one bus subscription per key, created lazily on first registration
//! - Lazy target resolution with instance caching and refcount eviction
//! - Removal by id, by value match, or by hook name, safe to call from
//!   inside a running dispatch pass (re-entrant mark-and-compact deletion)
//! - An in-memory reference bus for tests and hosts without a native bus

pub mod adapter;
pub mod bus;
pub mod key;
pub mod registry;
pub mod state;
pub mod target;

pub use bus::MemoryBus;
pub use key::HookKey;
pub use registry::HookRegistry;
pub use target::HookTarget;
