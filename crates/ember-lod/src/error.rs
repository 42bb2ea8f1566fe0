//! LOD error types.

use crate::LodEntityId;

/// Failures reported by [`crate::LodManager`] mutators and threshold validation.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum LodError {
    /// Thresholds must be 1 to 4 finite, positive, strictly increasing distances.
    #[error("invalid LOD thresholds: {0}")]
    InvalidThresholds(String),

    /// The entity is not registered (or was purged after its node vanished).
    #[error("unknown LOD entity {0:?}")]
    UnknownEntity(LodEntityId),
}
