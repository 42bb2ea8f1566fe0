//! The Ember runtime context.
//!
//! [`Runtime`] wires the frame clock, the update scheduler, the LOD manager
//! (as scheduled work) and the object pools together and drives them once
//! per frame. [`RuntimeStats`] is the read-only diagnostics surface.

mod runtime;
mod stats;

pub use runtime::{MAX_FRAME_TIME, Runtime};
pub use stats::RuntimeStats;
