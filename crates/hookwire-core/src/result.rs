//! Convenience result type alias for HookWire.

use crate::error::HookError;

/// A specialized `Result` type for HookWire operations.
///
/// This is defined as a convenience so that every crate does not need to
/// write `Result<T, HookError>` explicitly.
pub type HookResult<T> = Result<T, HookError>;
