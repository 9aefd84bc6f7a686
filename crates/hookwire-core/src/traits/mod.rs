//! Collaborator traits defined in `hookwire-core` and implemented by hosts.

pub mod bus;
pub mod container;
pub mod handler;

pub use bus::{BusCallback, EventBus};
pub use container::{LegacyResolver, ServiceContainer};
pub use handler::{HandlerFactory, HookHandler, StaticHookFn};
