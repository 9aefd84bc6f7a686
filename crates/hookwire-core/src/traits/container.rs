//! Resolution collaborators for type-identifier targets.

use std::sync::Arc;

use crate::result::HookResult;
use crate::traits::handler::HookHandler;

/// Service container used to resolve type identifiers to live instances.
///
/// Consulted on the first dispatch that needs a not-yet-cached type; the
/// resolved instance is then cached by the registry until its reference
/// count drops to zero.
pub trait ServiceContainer: Send + Sync {
    /// Returns whether the container can resolve the given type identifier.
    fn has(&self, type_name: &str) -> bool;

    /// Resolves the type identifier to an instance.
    fn get(&self, type_name: &str) -> HookResult<Arc<dyn HookHandler>>;
}

/// Fallback resolver for types the primary container does not know about.
pub trait LegacyResolver: Send + Sync {
    /// Resolves the type identifier to an instance outside the container.
    fn get_instance_of(&self, type_name: &str) -> HookResult<Arc<dyn HookHandler>>;
}
