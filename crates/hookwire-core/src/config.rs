//! Registry configuration.

use serde::{Deserialize, Serialize};

/// Registry configuration.
///
/// Controls the defaults used by the `*_default` registration methods, which
/// mirror the defaulted parameters of the wrapped bus's own registration
/// calls.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegistryConfig {
    /// Priority used when a registration does not specify one.
    #[serde(default = "default_priority")]
    pub default_priority: i32,
    /// Number of positional arguments forwarded when not specified.
    #[serde(default = "default_arity")]
    pub default_arity: usize,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            default_priority: default_priority(),
            default_arity: default_arity(),
        }
    }
}

fn default_priority() -> i32 {
    10
}

fn default_arity() -> usize {
    1
}
