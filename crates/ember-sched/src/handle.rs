//! Deferred access to the scheduler for code that runs inside a pass.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use ember_core::NodeRef;

use crate::priority::UpdatePriority;
use crate::work::{WorkError, WorkId, WorkFn};

pub(crate) enum Command {
    Schedule {
        id: WorkId,
        work: WorkFn,
        interval: f64,
        priority: UpdatePriority,
        anchor: Option<NodeRef>,
        tag: String,
    },
    Unschedule(WorkId),
    Pause(WorkId, bool),
    SetInterval(WorkId, f64),
    SetPriority(WorkId, UpdatePriority),
}

/// Cloneable handle that queues registration changes.
///
/// Work items cannot borrow the scheduler that is running them, so they (and
/// services such as the LOD manager) go through a handle instead. Queued
/// commands are applied in order at the start of the next pass. An id
/// returned by [`schedule`](Self::schedule) can be queued against right away,
/// but the scheduler only knows it once the next pass has registered it.
#[derive(Clone)]
pub struct SchedulerHandle {
    pub(crate) queue: Rc<RefCell<Vec<Command>>>,
    pub(crate) next_id: Rc<Cell<u64>>,
}

impl SchedulerHandle {
    pub(crate) fn new(next_id: Rc<Cell<u64>>) -> Self {
        Self {
            queue: Rc::new(RefCell::new(Vec::new())),
            next_id,
        }
    }

    pub(crate) fn allocate_id(&self) -> WorkId {
        let id = self.next_id.get();
        self.next_id.set(id + 1);
        WorkId(id)
    }

    fn push(&self, command: Command) {
        self.queue.borrow_mut().push(command);
    }

    pub(crate) fn drain(&self) -> Vec<Command> {
        std::mem::take(&mut *self.queue.borrow_mut())
    }

    /// Queue a registration. See [`crate::UpdateScheduler::schedule`].
    pub fn schedule<F>(
        &self,
        work: F,
        interval: f64,
        priority: UpdatePriority,
        anchor: Option<NodeRef>,
        tag: impl Into<String>,
    ) -> WorkId
    where
        F: FnMut() -> Result<(), WorkError> + 'static,
    {
        let id = self.allocate_id();
        self.push(Command::Schedule {
            id,
            work: Box::new(work),
            interval,
            priority,
            anchor,
            tag: tag.into(),
        });
        id
    }

    /// Queue an unregistration.
    pub fn unschedule(&self, id: WorkId) {
        self.push(Command::Unschedule(id));
    }

    /// Queue a pause or resume.
    pub fn pause(&self, id: WorkId, paused: bool) {
        self.push(Command::Pause(id, paused));
    }

    /// Queue an interval change.
    pub fn set_interval(&self, id: WorkId, interval: f64) {
        self.push(Command::SetInterval(id, interval));
    }

    /// Queue a priority change.
    pub fn set_priority(&self, id: WorkId, priority: UpdatePriority) {
        self.push(Command::SetPriority(id, priority));
    }

    /// Number of commands waiting for the next pass.
    pub fn pending(&self) -> usize {
        self.queue.borrow().len()
    }
}
