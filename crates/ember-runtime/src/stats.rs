//! Read-only diagnostics for overlays and periodic logging.

use std::fmt;

use ember_lod::{LodStats, LodTier};
use ember_pool::PoolStats;
use ember_sched::SchedulerStats;

/// Snapshot of every service's counters.
#[derive(Debug, Clone, PartialEq)]
pub struct RuntimeStats {
    /// Frames run.
    pub frame: u64,
    /// Simulated seconds.
    pub now: f64,
    /// Counters of the last scheduler pass.
    pub scheduler: SchedulerStats,
    /// Registered work items (queue depth).
    pub registered_work: usize,
    /// Last aggregated tier counts.
    pub lod: LodStats,
    /// Occupancy of every pool, by name.
    pub pools: Vec<PoolStats>,
}

impl RuntimeStats {
    /// Active pooled instances across all pools.
    pub fn pooled_active(&self) -> usize {
        self.pools.iter().map(|pool| pool.active).sum()
    }
}

impl fmt::Display for RuntimeStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = &self.scheduler;
        write!(
            f,
            "frame {} t={:.2}s | work {} (due {}, ran {}/{}, deferred {}, skipped {}, failed {}) | lod",
            self.frame,
            self.now,
            self.registered_work,
            s.due,
            s.executed,
            s.budget,
            s.deferred,
            s.skipped,
            s.failed,
        )?;
        for tier in LodTier::ALL {
            write!(f, " {tier}={}", self.lod.count(tier))?;
        }
        write!(f, " | pools")?;
        if self.pools.is_empty() {
            write!(f, " none")?;
        }
        for pool in &self.pools {
            write!(
                f,
                " {}={}/{} (peak {})",
                pool.name, pool.active, pool.total_created, pool.peak_usage
            )?;
        }
        Ok(())
    }
}
