//! The update scheduler: priority- and proximity-ordered admission of due
//! work under a dynamic frame budget.

use std::cmp::Ordering;
use std::panic::{self, AssertUnwindSafe};
use std::rc::Rc;
use std::cell::Cell;
use std::time::Instant;

use ember_config::SchedulerConfig;
use ember_core::NodeRef;
use glam::Vec3;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rustc_hash::FxHashMap;
use tracing::{debug, error, info, trace, warn};

use crate::budget::FrameBudget;
use crate::handle::{Command, SchedulerHandle};
use crate::priority::UpdatePriority;
use crate::skip::SkipPolicy;
use crate::work::{ScheduledWork, WorkError, WorkFn, WorkId, WorkInfo};

/// Smallest accepted interval in seconds. Keeps every run's next due time
/// strictly after the run.
pub const MIN_INTERVAL: f64 = 0.001;

/// Counters from the most recent pass.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct SchedulerStats {
    /// Registered items after the pass.
    pub registered: usize,
    /// Paused items.
    pub paused: usize,
    /// Items that were due at the start of the pass.
    pub due: usize,
    /// Items executed.
    pub executed: usize,
    /// Due items left for a later pass because the budget ran out.
    pub deferred: usize,
    /// Due items skipped by the distance policy.
    pub skipped: usize,
    /// Executed items that returned an error or panicked.
    pub failed: usize,
    /// Executed items slower than the slow-update threshold.
    pub slow: usize,
    /// Items removed because their anchor disappeared.
    pub purged: usize,
    /// Budget granted to the pass.
    pub budget: usize,
    /// Wall time of the pass in milliseconds.
    pub pass_time_ms: f64,
}

/// Cooperative single-threaded scheduler for periodic work.
///
/// Each [`tick`](Self::tick):
///
/// 1. applies commands queued through [`SchedulerHandle`]s,
/// 2. purges items whose anchor node is gone,
/// 3. collects unpaused items whose due time has passed,
/// 4. orders them by priority, then by anchor distance to the viewer (items
///    without a measurable distance last), then by registration order,
/// 5. admits them up to the [`FrameBudget`] derived from the previous frame's
///    duration, after the [`SkipPolicy`] had a chance to skip far away
///    low-priority items,
/// 6. runs each admitted item with panics contained, then sets its next due
///    time to `now + interval`.
///
/// Deferred and skipped items keep their due time and compete again next
/// pass.
pub struct UpdateScheduler {
    items: FxHashMap<WorkId, ScheduledWork>,
    handle: SchedulerHandle,
    budget: FrameBudget,
    skip: SkipPolicy,
    viewer: Option<NodeRef>,
    rng: ChaCha8Rng,
    now: f64,
    slow_threshold_ms: f64,
    stats: SchedulerStats,
}

impl UpdateScheduler {
    /// Create a scheduler. Uses `config.seed` for jitter and skip rolls when
    /// set, OS entropy otherwise.
    pub fn new(config: &SchedulerConfig) -> Self {
        let rng = match config.seed {
            Some(seed) => ChaCha8Rng::seed_from_u64(seed),
            None => ChaCha8Rng::from_os_rng(),
        };
        Self::with_rng(config, rng)
    }

    /// Create a scheduler with a fixed RNG seed.
    pub fn with_seed(config: &SchedulerConfig, seed: u64) -> Self {
        Self::with_rng(config, ChaCha8Rng::seed_from_u64(seed))
    }

    fn with_rng(config: &SchedulerConfig, rng: ChaCha8Rng) -> Self {
        Self {
            items: FxHashMap::default(),
            handle: SchedulerHandle::new(Rc::new(Cell::new(0))),
            budget: FrameBudget::from_config(config),
            skip: SkipPolicy::from_config(config),
            viewer: None,
            rng,
            now: 0.0,
            slow_threshold_ms: config.slow_update_threshold_ms,
            stats: SchedulerStats::default(),
        }
    }

    /// Re-read tunables after a config reload. Registrations are kept.
    pub fn apply_config(&mut self, config: &SchedulerConfig) {
        self.budget = FrameBudget::from_config(config);
        self.skip = SkipPolicy::from_config(config);
        self.slow_threshold_ms = config.slow_update_threshold_ms;
    }

    /// Replace the distance skip policy.
    pub fn set_skip_policy(&mut self, skip: SkipPolicy) {
        self.skip = skip;
    }

    /// Change the per-pass maximum.
    pub fn set_max_updates_per_frame(&mut self, max_updates: usize) {
        self.budget.set_max_updates(max_updates);
    }

    /// Register `work` to run every `interval` seconds.
    ///
    /// The first run is jittered uniformly within `[0, interval)` after the
    /// current time so that items registered together do not all come due
    /// on the same frame. `anchor` is used only to order and skip by distance
    /// to the viewer; once the anchored node is dropped the item is purged.
    pub fn schedule<F>(
        &mut self,
        work: F,
        interval: f64,
        priority: UpdatePriority,
        anchor: Option<NodeRef>,
        tag: impl Into<String>,
    ) -> WorkId
    where
        F: FnMut() -> Result<(), WorkError> + 'static,
    {
        let id = self.handle.allocate_id();
        self.insert(id, Box::new(work), interval, priority, anchor, tag.into());
        id
    }

    /// Remove a work item. Returns `false` if the id is unknown.
    pub fn unschedule(&mut self, id: WorkId) -> bool {
        match self.items.remove(&id) {
            Some(item) => {
                debug!("Unscheduled `{}` ({id})", item.tag);
                true
            }
            None => false,
        }
    }

    /// Pause or resume a work item. Returns `false` if the id is unknown.
    pub fn pause(&mut self, id: WorkId, paused: bool) -> bool {
        match self.items.get_mut(&id) {
            Some(item) => {
                item.paused = paused;
                true
            }
            None => false,
        }
    }

    /// Change the interval of a work item. Returns `false` if the id is unknown.
    ///
    /// A shorter interval also pulls the pending due time in, so the change
    /// is felt without waiting out the old interval.
    pub fn set_interval(&mut self, id: WorkId, interval: f64) -> bool {
        let now = self.now;
        match self.items.get_mut(&id) {
            Some(item) => {
                item.interval = sanitize_interval(interval, &item.tag);
                item.next_run = item.next_run.min(now + item.interval);
                true
            }
            None => false,
        }
    }

    /// Change the priority of a work item. Returns `false` if the id is unknown.
    pub fn set_priority(&mut self, id: WorkId, priority: UpdatePriority) -> bool {
        match self.items.get_mut(&id) {
            Some(item) => {
                item.priority = priority;
                true
            }
            None => false,
        }
    }

    /// Set the reference used for distance ordering and skipping.
    pub fn set_viewer(&mut self, viewer: Option<NodeRef>) {
        self.viewer = viewer;
    }

    /// The current viewer reference.
    pub fn viewer(&self) -> Option<&NodeRef> {
        self.viewer.as_ref()
    }

    /// A handle for queuing changes from inside work items.
    pub fn handle(&self) -> SchedulerHandle {
        self.handle.clone()
    }

    /// Snapshot of a work item.
    pub fn info(&self, id: WorkId) -> Option<WorkInfo> {
        self.items.get(&id).map(|item| item.info(id))
    }

    /// Whether the id is registered.
    pub fn contains(&self, id: WorkId) -> bool {
        self.items.contains_key(&id)
    }

    /// Number of registered items.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Whether nothing is registered.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Time of the last pass.
    pub fn now(&self) -> f64 {
        self.now
    }

    /// Counters of the last pass.
    pub fn stats(&self) -> SchedulerStats {
        self.stats
    }

    /// Run one pass at time `now`. `last_frame_dt` is the measured duration
    /// of the previous frame and sizes the budget.
    pub fn tick(&mut self, now: f64, last_frame_dt: f64) -> SchedulerStats {
        let started = Instant::now();
        self.now = now;
        self.apply_commands();
        let purged = self.purge_lost_anchors();

        let viewer = self.viewer.as_ref().and_then(NodeRef::position);
        let mut due: Vec<DueItem> = self
            .items
            .iter()
            .filter(|(_, item)| !item.paused && item.next_run <= now)
            .map(|(&id, item)| DueItem {
                id,
                priority: item.priority,
                distance: anchor_distance(viewer, item.anchor.as_ref()),
            })
            .collect();
        due.sort_by(DueItem::admission_order);

        let budget = self.budget.allowed(last_frame_dt);
        let mut stats = SchedulerStats {
            due: due.len(),
            budget,
            purged,
            ..SchedulerStats::default()
        };

        for entry in &due {
            if stats.executed >= budget {
                break;
            }
            if self
                .skip
                .should_skip(entry.priority, entry.distance, &mut self.rng)
            {
                stats.skipped += 1;
                continue;
            }
            self.run(entry.id, now, &mut stats);
        }

        stats.deferred = stats.due - stats.executed - stats.skipped;
        stats.registered = self.items.len();
        stats.paused = self.items.values().filter(|item| item.paused).count();
        stats.pass_time_ms = started.elapsed().as_secs_f64() * 1000.0;
        if stats.deferred > 0 {
            trace!(
                "Deferred {} of {} due items (budget {budget})",
                stats.deferred, stats.due
            );
        }
        self.stats = stats;
        stats
    }

    fn run(&mut self, id: WorkId, now: f64, stats: &mut SchedulerStats) {
        let Some(item) = self.items.get_mut(&id) else {
            return;
        };

        let started = Instant::now();
        let result = panic::catch_unwind(AssertUnwindSafe(|| (item.work)()));
        let elapsed_ms = started.elapsed().as_secs_f64() * 1000.0;

        item.run_count += 1;
        item.last_duration_ms = elapsed_ms;
        item.next_run = now + item.interval;
        stats.executed += 1;

        match result {
            Ok(Ok(())) => {}
            Ok(Err(WorkError::Busy)) => {
                debug!("Scheduled work `{}` skipped a run: target busy", item.tag);
            }
            Ok(Err(err)) => {
                stats.failed += 1;
                warn!("Scheduled work `{}` failed: {err}", item.tag);
            }
            Err(payload) => {
                stats.failed += 1;
                let err = WorkError::Panicked(panic_message(payload.as_ref()));
                error!("Scheduled work `{}` {err}", item.tag);
            }
        }

        if elapsed_ms > self.slow_threshold_ms {
            stats.slow += 1;
            warn!(
                "Slow update: `{}` took {elapsed_ms:.2} ms (threshold {:.2} ms)",
                item.tag, self.slow_threshold_ms
            );
        }
    }

    fn insert(
        &mut self,
        id: WorkId,
        work: WorkFn,
        interval: f64,
        priority: UpdatePriority,
        anchor: Option<NodeRef>,
        tag: String,
    ) {
        let interval = sanitize_interval(interval, &tag);
        let jitter = self.rng.random_range(0.0..interval);
        debug!("Scheduled `{tag}` ({id}) every {interval:.3}s at {priority} priority");
        self.items.insert(
            id,
            ScheduledWork {
                tag,
                work,
                interval,
                priority,
                next_run: self.now + jitter,
                paused: false,
                anchor,
                registered_at: self.now,
                run_count: 0,
                last_duration_ms: 0.0,
            },
        );
    }

    fn apply_commands(&mut self) {
        for command in self.handle.drain() {
            match command {
                Command::Schedule {
                    id,
                    work,
                    interval,
                    priority,
                    anchor,
                    tag,
                } => self.insert(id, work, interval, priority, anchor, tag),
                Command::Unschedule(id) => {
                    self.unschedule(id);
                }
                Command::Pause(id, paused) => {
                    self.pause(id, paused);
                }
                Command::SetInterval(id, interval) => {
                    self.set_interval(id, interval);
                }
                Command::SetPriority(id, priority) => {
                    self.set_priority(id, priority);
                }
            }
        }
    }

    fn purge_lost_anchors(&mut self) -> usize {
        let before = self.items.len();
        self.items.retain(|id, item| {
            let lost = item.anchor_lost();
            if lost {
                info!("Purged `{}` ({id}): anchor no longer exists", item.tag);
            }
            !lost
        });
        before - self.items.len()
    }
}

#[derive(Debug, Clone, Copy)]
struct DueItem {
    id: WorkId,
    priority: UpdatePriority,
    distance: Option<f32>,
}

impl DueItem {
    fn admission_order(a: &DueItem, b: &DueItem) -> Ordering {
        a.priority
            .cmp(&b.priority)
            .then_with(|| match (a.distance, b.distance) {
                (Some(da), Some(db)) => da.total_cmp(&db),
                (Some(_), None) => Ordering::Less,
                (None, Some(_)) => Ordering::Greater,
                (None, None) => Ordering::Equal,
            })
            .then_with(|| a.id.cmp(&b.id))
    }
}

fn anchor_distance(viewer: Option<Vec3>, anchor: Option<&NodeRef>) -> Option<f32> {
    let viewer = viewer?;
    let position = anchor?.position()?;
    Some(viewer.distance(position))
}

fn sanitize_interval(interval: f64, tag: &str) -> f64 {
    if interval.is_finite() && interval >= MIN_INTERVAL {
        interval
    } else {
        debug!("Interval {interval} for `{tag}` clamped to {MIN_INTERVAL}s");
        MIN_INTERVAL
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(msg) = payload.downcast_ref::<&str>() {
        (*msg).to_string()
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg.clone()
    } else {
        "unknown panic".to_string()
    }
}
