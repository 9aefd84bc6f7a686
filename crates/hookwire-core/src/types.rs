//! Typed identifier for hook registrations.
//!
//! Every registration receives a globally unique random id at registration
//! time; removal by id uses this value. A newtype over [`uuid::Uuid`]
//! prevents accidentally passing an unrelated uuid where a hooking id is
//! expected.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for a single hook registration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct HookingId(pub Uuid);

impl HookingId {
    /// Create a new random identifier.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Create an identifier from an existing UUID.
    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Return the inner UUID value.
    pub fn into_uuid(self) -> Uuid {
        self.0
    }

    /// Return a reference to the inner UUID.
    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for HookingId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for HookingId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for HookingId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s).map(Self)
    }
}

impl From<Uuid> for HookingId {
    fn from(uuid: Uuid) -> Self {
        Self(uuid)
    }
}

impl From<HookingId> for Uuid {
    fn from(id: HookingId) -> Uuid {
        id.0
    }
}
