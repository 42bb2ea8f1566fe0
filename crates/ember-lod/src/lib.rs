//! Distance-driven level of detail for simulated entities.
//!
//! The [`LodManager`] measures each registered entity's distance to a viewer,
//! maps it through [`LodThresholds`] and per-entity [`LodSettings`] to a
//! [`LodTier`], and on tier changes pushes the tier's [`TierEffects`] into the
//! entity's visual, animation, audio and particle components. Receding
//! entities also get their own scheduled logic slowed down and demoted.
//!
//! The manager itself runs as scheduled work on an
//! [`ember_sched::UpdateScheduler`], a bounded slice of entities per pass.

mod components;
mod effects;
mod error;
mod manager;
mod selector;
mod settings;
mod tier;

pub use components::{
    AnimationMode, Animator, AudioEmitter, LodTarget, LogicThrottle, ParticleEmitter, ShadowMode,
    TierCallback, Visual,
};
pub use effects::TierEffects;
pub use error::LodError;
pub use manager::{LodEntityId, LodManager, LodStats, PassReport};
pub use selector::{LodThresholds, MAX_THRESHOLDS, select_tier, select_tier_with_hysteresis};
pub use settings::{DEFAULT_PARTICLE_BUDGET, LodProfile, LodSettings};
pub use tier::LodTier;
