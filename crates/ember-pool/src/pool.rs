//! The per-name pool record.

use std::collections::VecDeque;

use ember_core::ParentId;
use rustc_hash::FxHashSet;

use crate::instance::{InstanceHandle, PrototypeRef};

slotmap::new_key_type! {
    /// Internal identifier of a pool.
    pub(crate) struct PoolId;
}

/// Bookkeeping for one named pool.
///
/// `available` and `active` never share a handle, and at rest
/// `available.len() + active.len() == total_created`.
pub(crate) struct Pool<T> {
    pub(crate) name: String,
    pub(crate) prototype: PrototypeRef<T>,
    pub(crate) container: ParentId,
    /// Idle instances, oldest-returned first.
    pub(crate) available: VecDeque<InstanceHandle>,
    pub(crate) active: FxHashSet<InstanceHandle>,
    pub(crate) max_size: usize,
    pub(crate) allow_growth: bool,
    pub(crate) total_created: usize,
    pub(crate) peak_usage: usize,
}

impl<T> Pool<T> {
    pub(crate) fn new(
        name: String,
        prototype: PrototypeRef<T>,
        container: ParentId,
        max_size: usize,
        allow_growth: bool,
    ) -> Self {
        Self {
            name,
            prototype,
            container,
            available: VecDeque::new(),
            active: FxHashSet::default(),
            max_size,
            allow_growth,
            total_created: 0,
            peak_usage: 0,
        }
    }

    pub(crate) fn can_grow(&self) -> bool {
        self.allow_growth && self.total_created < self.max_size
    }

    pub(crate) fn mark_active(&mut self, handle: InstanceHandle) {
        self.active.insert(handle);
        self.peak_usage = self.peak_usage.max(self.active.len());
    }

    pub(crate) fn stats(&self) -> PoolStats {
        PoolStats {
            name: self.name.clone(),
            available: self.available.len(),
            active: self.active.len(),
            total_created: self.total_created,
            peak_usage: self.peak_usage,
            max_size: self.max_size,
            allow_growth: self.allow_growth,
        }
    }
}

/// Occupancy snapshot of one pool, for diagnostics.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PoolStats {
    /// Pool name.
    pub name: String,
    /// Idle instances.
    pub available: usize,
    /// Instances currently handed out.
    pub active: usize,
    /// Instances alive in total (idle + active).
    pub total_created: usize,
    /// Highest simultaneous active count seen.
    pub peak_usage: usize,
    /// Growth cap.
    pub max_size: usize,
    /// Whether the pool may grow and reclaim.
    pub allow_growth: bool,
}
