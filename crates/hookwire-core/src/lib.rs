//! # hookwire-core
//!
//! Core crate for HookWire. Contains the collaborator traits (event bus,
//! service container, legacy resolver, hook handler), configuration schema,
//! typed identifiers, and the unified error system.
//!
//! This crate has **no** internal dependencies on other HookWire crates.

pub mod config;
pub mod error;
pub mod result;
pub mod traits;
pub mod types;

pub use error::HookError;
pub use result::HookResult;
pub use types::HookingId;
