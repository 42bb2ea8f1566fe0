//! Pool error types.

/// Configuration and lookup failures reported by [`crate::PoolManager`].
///
/// None of these are raised as panics; each is logged where it happens and
/// returned so callers can decide whether they care.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PoolError {
    /// A pool with this name already exists.
    #[error("pool `{0}` already exists")]
    DuplicatePool(String),

    /// No prototype was supplied for the pool.
    #[error("pool `{0}` has no prototype")]
    MissingPrototype(String),

    /// No pool with this name exists and none can be created lazily.
    #[error("pool `{0}` not found")]
    PoolNotFound(String),

    /// The requested sizes cannot be satisfied.
    #[error("pool `{name}` has invalid sizes: initial {initial_size}, max {max_size}")]
    InvalidSize {
        /// Pool name.
        name: String,
        /// Requested pre-populated count.
        initial_size: usize,
        /// Requested cap.
        max_size: usize,
    },
}
