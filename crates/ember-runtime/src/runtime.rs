//! The runtime context that owns and drives every service.

use std::cell::RefCell;
use std::rc::Rc;

use ember_config::Config;
use ember_core::{FrameClock, NodeRef};
use ember_lod::{LodManager, LodStats};
use ember_pool::{PoolManager, Poolable};
use ember_sched::{SchedulerStats, UpdatePriority, UpdateScheduler, WorkId};
use tracing::{info, warn};

use crate::stats::RuntimeStats;

/// Longest frame the runtime accepts. Longer frames are clamped so a stall
/// does not fire a burst of timers at once.
pub const MAX_FRAME_TIME: f64 = 0.25;

/// Explicitly constructed owner of the clock, the scheduler, the LOD manager
/// and the pools.
///
/// Nothing here is global: tests and tools build as many independent
/// runtimes as they like. Each [`frame`](Self::frame) advances the clock,
/// runs one scheduler pass (which includes the LOD pass when due) and then
/// updates the pools.
pub struct Runtime<T> {
    clock: FrameClock,
    scheduler: UpdateScheduler,
    lod: Rc<RefCell<LodManager>>,
    lod_work: WorkId,
    pools: PoolManager<T>,
}

impl<T: Poolable> Runtime<T> {
    /// Build every service from `config` and register the LOD pass.
    pub fn new(config: &Config) -> Self {
        let clock = FrameClock::new();
        let mut scheduler = UpdateScheduler::new(&config.scheduler);
        let lod = Rc::new(RefCell::new(LodManager::new(&config.lod, clock.clone())));
        let lod_work = LodManager::schedule_on(
            &lod,
            &mut scheduler,
            config.lod.update_interval,
            UpdatePriority::Normal,
        );
        let pools = PoolManager::new(config.pool.clone());

        info!(
            "Runtime ready: budget {} updates/frame, LOD pass every {:.2}s",
            config.scheduler.max_updates_per_frame, config.lod.update_interval
        );

        Self {
            clock,
            scheduler,
            lod,
            lod_work,
            pools,
        }
    }

    /// Run one frame. `dt` is the measured duration of the previous frame,
    /// clamped to [`MAX_FRAME_TIME`].
    pub fn frame(&mut self, dt: f64) -> SchedulerStats {
        let dt = if dt > MAX_FRAME_TIME {
            warn!(
                "Frame time {:.1}ms exceeds maximum, clamping to {:.1}ms",
                dt * 1000.0,
                MAX_FRAME_TIME * 1000.0
            );
            MAX_FRAME_TIME
        } else {
            dt
        };

        let now = self.clock.advance(dt);
        let stats = self.scheduler.tick(now, dt);
        self.pools.update(now);
        stats
    }

    /// Set the viewer for both distance-ordered scheduling and LOD.
    pub fn set_viewer(&mut self, viewer: Option<NodeRef>) {
        self.scheduler.set_viewer(viewer.clone());
        self.lod.borrow_mut().set_viewer_reference(viewer);
    }

    /// Re-read tunables after a config reload. Registrations and pooled
    /// instances are kept.
    pub fn apply_config(&mut self, config: &Config) {
        self.scheduler.apply_config(&config.scheduler);
        self.scheduler
            .set_interval(self.lod_work, config.lod.update_interval);

        let mut lod = self.lod.borrow_mut();
        lod.set_hysteresis(config.lod.hysteresis);
        if let Err(err) = lod.set_distance_thresholds(config.lod.thresholds.clone()) {
            warn!("Kept previous LOD thresholds: {err}");
        }
    }

    /// The shared frame clock.
    pub fn clock(&self) -> &FrameClock {
        &self.clock
    }

    /// Seconds of simulated time.
    pub fn now(&self) -> f64 {
        self.clock.now()
    }

    /// The scheduler.
    pub fn scheduler(&self) -> &UpdateScheduler {
        &self.scheduler
    }

    /// Mutable access to the scheduler, for registering work.
    pub fn scheduler_mut(&mut self) -> &mut UpdateScheduler {
        &mut self.scheduler
    }

    /// The shared LOD manager.
    pub fn lod(&self) -> &Rc<RefCell<LodManager>> {
        &self.lod
    }

    /// Scheduler id of the LOD pass.
    pub fn lod_work(&self) -> WorkId {
        self.lod_work
    }

    /// The pools.
    pub fn pools(&self) -> &PoolManager<T> {
        &self.pools
    }

    /// Mutable access to the pools.
    pub fn pools_mut(&mut self) -> &mut PoolManager<T> {
        &mut self.pools
    }

    /// Read-only diagnostics snapshot.
    pub fn stats(&self) -> RuntimeStats {
        let lod = self
            .lod
            .try_borrow()
            .map(|lod| lod.stats())
            .unwrap_or_else(|_| LodStats::default());
        RuntimeStats {
            frame: self.clock.frame(),
            now: self.clock.now(),
            scheduler: self.scheduler.stats(),
            registered_work: self.scheduler.len(),
            lod,
            pools: self.pools.stats(),
        }
    }
}
