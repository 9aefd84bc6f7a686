//! Composite key identifying one bus subscription and its handler list.

use std::fmt;

/// The (hook name, priority, arity) tuple under which registrations are
/// grouped.
///
/// All registrations sharing a key execute together, in registration order,
/// on a single bus fire. Different keys for the same hook name are ordered
/// by the bus's own priority semantics, not by the registry.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct HookKey {
    /// Name of the extension point on the bus.
    pub name: String,
    /// Bus priority (lower runs first).
    pub priority: i32,
    /// Number of positional arguments forwarded by the bus.
    pub arity: usize,
}

impl HookKey {
    /// Creates a key from its parts.
    pub fn new(name: impl Into<String>, priority: i32, arity: usize) -> Self {
        Self {
            name: name.into(),
            priority,
            arity,
        }
    }
}

impl fmt::Display for HookKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}__{}__{}", self.name, self.priority, self.arity)
    }
}
