//! Cancellable deferred releases, polled once per frame.

use std::cmp::Ordering;
use std::collections::BinaryHeap;

use rustc_hash::FxHashMap;

use crate::instance::InstanceHandle;

/// An entry in the deadline heap.
#[derive(Clone, Copy, Debug)]
struct PendingRelease {
    deadline: f64,
    handle: InstanceHandle,
    /// Token to recognize entries superseded or cancelled after insertion.
    token: u64,
}

impl PartialEq for PendingRelease {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for PendingRelease {}

impl PartialOrd for PendingRelease {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for PendingRelease {
    // Reversed so the BinaryHeap pops the earliest deadline first.
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .deadline
            .total_cmp(&self.deadline)
            .then_with(|| other.token.cmp(&self.token))
    }
}

/// Min-heap of `(deadline, token, instance)` release timers.
///
/// Cancelling does not touch the heap: it only forgets the live token, and
/// the stale heap entry is discarded when it surfaces. Each instance has at
/// most one live timer; scheduling again supersedes the previous one.
#[derive(Debug, Default)]
pub struct DeferredReleases {
    heap: BinaryHeap<PendingRelease>,
    live: FxHashMap<InstanceHandle, u64>,
    next_token: u64,
}

impl DeferredReleases {
    /// Create an empty timer queue.
    pub fn new() -> Self {
        Self::default()
    }

    /// Arm (or re-arm) the release timer of `handle` for `deadline`.
    /// Returns the token identifying this arming.
    pub fn schedule(&mut self, handle: InstanceHandle, deadline: f64) -> u64 {
        let token = self.next_token;
        self.next_token += 1;
        self.live.insert(handle, token);
        self.heap.push(PendingRelease {
            deadline,
            handle,
            token,
        });
        token
    }

    /// Disarm the timer of `handle`. Returns `true` if one was armed.
    pub fn cancel(&mut self, handle: InstanceHandle) -> bool {
        self.live.remove(&handle).is_some()
    }

    /// Whether `handle` has an armed timer.
    pub fn is_pending(&self, handle: InstanceHandle) -> bool {
        self.live.contains_key(&handle)
    }

    /// Remove and return every instance whose live timer expired at or
    /// before `now`, earliest first.
    pub fn pop_due(&mut self, now: f64) -> Vec<InstanceHandle> {
        let mut due = Vec::new();
        while let Some(entry) = self.heap.peek() {
            if entry.deadline > now {
                break;
            }
            let entry = *entry;
            self.heap.pop();
            if self.live.get(&entry.handle) == Some(&entry.token) {
                self.live.remove(&entry.handle);
                due.push(entry.handle);
            }
            // Otherwise stale: cancelled or superseded
        }
        due
    }

    /// Number of armed timers.
    pub fn len(&self) -> usize {
        self.live.len()
    }

    /// Whether no timer is armed.
    pub fn is_empty(&self) -> bool {
        self.live.is_empty()
    }

    /// Disarm everything.
    pub fn clear(&mut self) {
        self.heap.clear();
        self.live.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use slotmap::SlotMap;

    fn handles(n: usize) -> Vec<InstanceHandle> {
        let mut map: SlotMap<InstanceHandle, ()> = SlotMap::with_key();
        (0..n).map(|_| map.insert(())).collect()
    }

    #[test]
    fn test_pops_in_deadline_order() {
        let h = handles(3);
        let mut timers = DeferredReleases::new();
        timers.schedule(h[0], 3.0);
        timers.schedule(h[1], 1.0);
        timers.schedule(h[2], 2.0);

        assert_eq!(timers.pop_due(2.5), vec![h[1], h[2]]);
        assert_eq!(timers.len(), 1);
        assert_eq!(timers.pop_due(10.0), vec![h[0]]);
        assert!(timers.is_empty());
    }

    #[test]
    fn test_nothing_due_before_deadline() {
        let h = handles(1);
        let mut timers = DeferredReleases::new();
        timers.schedule(h[0], 5.0);
        assert!(timers.pop_due(4.999).is_empty());
        assert!(timers.is_pending(h[0]));
    }

    #[test]
    fn test_cancelled_timer_never_fires() {
        let h = handles(1);
        let mut timers = DeferredReleases::new();
        timers.schedule(h[0], 1.0);
        assert!(timers.cancel(h[0]));
        assert!(timers.pop_due(2.0).is_empty());
        assert!(!timers.cancel(h[0]));
    }

    #[test]
    fn test_rescheduling_supersedes_previous_deadline() {
        let h = handles(1);
        let mut timers = DeferredReleases::new();
        timers.schedule(h[0], 1.0);
        timers.schedule(h[0], 4.0);

        assert!(timers.pop_due(2.0).is_empty(), "old deadline must be stale");
        assert_eq!(timers.pop_due(4.0), vec![h[0]]);
    }

    #[test]
    fn test_cancel_then_rearm_fires_once() {
        let h = handles(1);
        let mut timers = DeferredReleases::new();
        timers.schedule(h[0], 1.0);
        timers.cancel(h[0]);
        timers.schedule(h[0], 1.5);
        assert_eq!(timers.pop_due(3.0), vec![h[0]]);
        assert!(timers.pop_due(3.0).is_empty());
    }
}
