//! Shared primitives for the Ember scheduling core: transforms, host-owned
//! scene nodes with weak references, and the per-frame clock.
//!
//! Everything here is single-threaded (`Rc`/`Weak`), matching the cooperative
//! frame loop the services run on.

mod clock;
mod node;
mod transform;

pub use clock::FrameClock;
pub use node::{NodeRef, ParentId, SceneNode};
pub use transform::Transform;
