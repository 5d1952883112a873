//! Type-safe identifier wrappers around [`Uuid`].
//!
//! Identifiers use UUID v7 (time-ordered), so sorting engine IDs sorts them
//! by creation time.

use serde::{Deserialize, Serialize};
use ts_rs::TS;
use uuid::Uuid;

/// Identifies one engine instance.
///
/// Reloading a rule builds a brand-new engine with a fresh ID, which lets
/// snapshot consumers discard frames that belong to a discarded engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct EngineId(pub Uuid);

impl EngineId {
    /// Create a new identifier using UUID v7 (time-ordered).
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }

    /// Return the inner [`Uuid`] value.
    pub const fn into_inner(self) -> Uuid {
        self.0
    }
}

impl Default for EngineId {
    fn default() -> Self {
        Self::new()
    }
}

impl core::fmt::Display for EngineId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<Uuid> for EngineId {
    fn from(id: Uuid) -> Self {
        Self(id)
    }
}

impl From<EngineId> for Uuid {
    fn from(id: EngineId) -> Self {
        id.0
    }
}
