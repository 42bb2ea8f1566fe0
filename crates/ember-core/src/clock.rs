//! Shared frame clock.

use std::cell::Cell;
use std::rc::Rc;

#[derive(Clone, Copy, Debug, Default)]
struct ClockState {
    now: f64,
    delta: f64,
    frame: u64,
}

/// Frame time shared between the runtime and the services it drives.
///
/// The runtime advances the clock once per frame; services that need to
/// timestamp work (LOD transitions, stats cadence) hold a clone and read it.
/// Clones observe the same time.
#[derive(Clone, Debug, Default)]
pub struct FrameClock(Rc<Cell<ClockState>>);

impl FrameClock {
    /// Creates a clock at time zero, frame zero.
    pub fn new() -> Self {
        Self::default()
    }

    /// Advances by `dt` seconds and returns the new time.
    ///
    /// Negative deltas are treated as zero so time never runs backwards.
    pub fn advance(&self, dt: f64) -> f64 {
        let mut state = self.0.get();
        state.delta = dt.max(0.0);
        state.now += state.delta;
        state.frame += 1;
        self.0.set(state);
        state.now
    }

    /// Seconds since the clock started.
    pub fn now(&self) -> f64 {
        self.0.get().now
    }

    /// Duration of the most recent frame in seconds.
    pub fn delta(&self) -> f64 {
        self.0.get().delta
    }

    /// Number of frames advanced so far.
    pub fn frame(&self) -> u64 {
        self.0.get().frame
    }
}
