//! Scheduled work items and their failure type.

use std::fmt;

use ember_core::NodeRef;

use crate::priority::UpdatePriority;

/// Identifier of a registered work item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct WorkId(pub(crate) u64);

impl WorkId {
    /// Raw numeric value, for logging.
    pub fn raw(self) -> u64 {
        self.0
    }
}

impl fmt::Display for WorkId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "work#{}", self.0)
    }
}

/// Failure reported by a work item.
///
/// A failing item is logged with its tag and rescheduled as if it had
/// succeeded; it never stops the rest of the pass.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum WorkError {
    /// The work reported a failure of its own.
    #[error("work failed: {0}")]
    Failed(String),

    /// The work panicked; the panic was contained.
    #[error("work panicked: {0}")]
    Panicked(String),

    /// A resource the work needs is borrowed elsewhere this pass.
    #[error("work target is busy")]
    Busy,
}

impl WorkError {
    /// Shorthand for [`WorkError::Failed`].
    pub fn failed(msg: impl Into<String>) -> Self {
        WorkError::Failed(msg.into())
    }
}

/// The callable of a work item.
pub type WorkFn = Box<dyn FnMut() -> Result<(), WorkError>>;

/// One registered work item.
pub(crate) struct ScheduledWork {
    pub(crate) tag: String,
    pub(crate) work: WorkFn,
    pub(crate) interval: f64,
    pub(crate) priority: UpdatePriority,
    pub(crate) next_run: f64,
    pub(crate) paused: bool,
    pub(crate) anchor: Option<NodeRef>,
    pub(crate) registered_at: f64,
    pub(crate) run_count: u64,
    pub(crate) last_duration_ms: f64,
}

impl ScheduledWork {
    /// An anchored item whose node is gone is purged at the next pass.
    pub(crate) fn anchor_lost(&self) -> bool {
        self.anchor.as_ref().is_some_and(|anchor| !anchor.is_alive())
    }

    pub(crate) fn info(&self, id: WorkId) -> WorkInfo {
        WorkInfo {
            id,
            tag: self.tag.clone(),
            interval: self.interval,
            priority: self.priority,
            next_run: self.next_run,
            paused: self.paused,
            registered_at: self.registered_at,
            run_count: self.run_count,
            last_duration_ms: self.last_duration_ms,
        }
    }
}

/// Read-only snapshot of a work item.
#[derive(Debug, Clone, PartialEq)]
pub struct WorkInfo {
    /// Identifier.
    pub id: WorkId,
    /// Human-readable tag used in logs.
    pub tag: String,
    /// Seconds between runs.
    pub interval: f64,
    /// Current priority.
    pub priority: UpdatePriority,
    /// Absolute time of the next run.
    pub next_run: f64,
    /// Whether the item is paused.
    pub paused: bool,
    /// Time of registration.
    pub registered_at: f64,
    /// Completed executions, failed ones included.
    pub run_count: u64,
    /// Duration of the last execution in milliseconds.
    pub last_duration_ms: f64,
}
