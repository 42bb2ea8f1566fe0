//! Cooperative update scheduling for large numbers of periodic work items.
//!
//! Domain code registers zero-argument work with an interval and an
//! [`UpdatePriority`]. Every frame the [`UpdateScheduler`] picks the due items
//! that fit a [`FrameBudget`] sized from the previous frame's duration, most
//! urgent and closest to the viewer first, and defers the rest to a later
//! frame. Far-away low-priority work may additionally be skipped at random by
//! the [`SkipPolicy`].
//!
//! Everything runs on the caller's thread; nothing blocks. Work that needs to
//! change registrations while a pass is running goes through a
//! [`SchedulerHandle`].

mod budget;
mod handle;
mod priority;
mod scheduler;
mod skip;
mod work;

pub use budget::{FrameBudget, LoadLevel};
pub use handle::SchedulerHandle;
pub use priority::UpdatePriority;
pub use scheduler::{MIN_INTERVAL, SchedulerStats, UpdateScheduler};
pub use skip::SkipPolicy;
pub use work::{WorkError, WorkFn, WorkId, WorkInfo};
