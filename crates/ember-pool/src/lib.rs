//! Object pooling for transient world objects: particles, audio voices, UI
//! popups, projectiles.
//!
//! A [`PoolManager`] owns any number of named pools, each bound to one
//! prototype. Instances cycle between idle and active instead of being
//! allocated and dropped. Pools grow up to a cap, reclaim their oldest active
//! instance when exhausted, shed surplus idle instances on a slow cadence, and
//! support deferred release through a min-heap of cancellable timers.
//!
//! Failures are never fatal: a missing pool or an exhausted pool logs a
//! warning and yields `None`, because a lost visual or audio effect is an
//! acceptable degradation.

mod category;
mod error;
mod instance;
mod manager;
mod pool;
mod timers;

pub use category::PoolCategory;
pub use error::PoolError;
pub use instance::{
    InstanceHandle, Poolable, PooledInstance, Prototype, PrototypeRef, prototype,
};
pub use manager::PoolManager;
pub use pool::PoolStats;
pub use timers::DeferredReleases;
