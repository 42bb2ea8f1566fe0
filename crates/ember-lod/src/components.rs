//! Contracts with the host's visual, animation, audio and particle
//! subsystems, and the registration builder that caches them.

use std::cell::RefCell;
use std::rc::{Rc, Weak};

use ember_core::NodeRef;
use ember_sched::{UpdatePriority, WorkId};
use tracing::debug;

use crate::tier::LodTier;

/// Shadow casting cost.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ShadowMode {
    /// Casts and receives shadows.
    Full,
    /// Casts shadows only.
    ShadowOnly,
    /// No shadows.
    Off,
}

/// Animation update fidelity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AnimationMode {
    /// Update every frame.
    Full,
    /// Update once every `every_n_frames` frames.
    Reduced {
        /// Frame stride.
        every_n_frames: u32,
    },
    /// No animation updates.
    Disabled,
}

/// Renderable part of an entity.
pub trait Visual {
    /// Show or hide the entity.
    fn set_visible(&mut self, visible: bool);
    /// Change the shadow casting mode.
    fn set_shadow_mode(&mut self, mode: ShadowMode);
}

/// Animation controller of an entity.
pub trait Animator {
    /// Change the animation update fidelity.
    fn set_animation_mode(&mut self, mode: AnimationMode);
}

/// Audio source attached to an entity.
pub trait AudioEmitter {
    /// Enable or disable the source and scale its volume (0..=1).
    fn set_audio(&mut self, enabled: bool, volume: f32);
}

/// Particle system attached to an entity.
pub trait ParticleEmitter {
    /// Enable or disable emission and cap the live particle count.
    fn set_particles(&mut self, enabled: bool, max_particles: u32);
}

/// Callback invoked after a tier change with `(previous, new)`.
pub type TierCallback = Box<dyn FnMut(Option<LodTier>, LodTier)>;

/// The entity's own logic work, retuned as it recedes.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LogicThrottle {
    /// Registered scheduler work.
    pub work: WorkId,
    /// Interval at full fidelity.
    pub base_interval: f64,
    /// Priority at full fidelity.
    pub base_priority: UpdatePriority,
}

/// What the manager needs to drive one entity.
///
/// Component references are weak and resolved once here, at registration;
/// the entity itself is never owned. A missing component simply receives no
/// calls.
pub struct LodTarget {
    pub(crate) node: NodeRef,
    pub(crate) visual: Option<Weak<RefCell<dyn Visual>>>,
    pub(crate) animator: Option<Weak<RefCell<dyn Animator>>>,
    pub(crate) audio: Option<Weak<RefCell<dyn AudioEmitter>>>,
    pub(crate) particles: Option<Weak<RefCell<dyn ParticleEmitter>>>,
    pub(crate) logic: Option<LogicThrottle>,
    pub(crate) on_tier_changed: Option<TierCallback>,
}

impl LodTarget {
    /// Target positioned by `node`. The entity counts as gone once the node is.
    pub fn new(node: NodeRef) -> Self {
        Self {
            node,
            visual: None,
            animator: None,
            audio: None,
            particles: None,
            logic: None,
            on_tier_changed: None,
        }
    }

    /// Attach the visual component.
    pub fn with_visual<V: Visual + 'static>(mut self, visual: &Rc<RefCell<V>>) -> Self {
        let weak = Rc::downgrade(visual);
        self.visual = Some(weak as Weak<RefCell<dyn Visual>>);
        self
    }

    /// Attach the animation component.
    pub fn with_animator<A: Animator + 'static>(mut self, animator: &Rc<RefCell<A>>) -> Self {
        let weak = Rc::downgrade(animator);
        self.animator = Some(weak as Weak<RefCell<dyn Animator>>);
        self
    }

    /// Attach the audio component.
    pub fn with_audio<A: AudioEmitter + 'static>(mut self, audio: &Rc<RefCell<A>>) -> Self {
        let weak = Rc::downgrade(audio);
        self.audio = Some(weak as Weak<RefCell<dyn AudioEmitter>>);
        self
    }

    /// Attach the particle component.
    pub fn with_particles<P: ParticleEmitter + 'static>(mut self, particles: &Rc<RefCell<P>>) -> Self {
        let weak = Rc::downgrade(particles);
        self.particles = Some(weak as Weak<RefCell<dyn ParticleEmitter>>);
        self
    }

    /// Throttle the entity's logic work `work` by tier.
    pub fn with_logic(mut self, work: WorkId, base_interval: f64, base_priority: UpdatePriority) -> Self {
        self.logic = Some(LogicThrottle {
            work,
            base_interval,
            base_priority,
        });
        self
    }

    /// Call `callback` after every tier change.
    pub fn on_tier_changed<F>(mut self, callback: F) -> Self
    where
        F: FnMut(Option<LodTier>, LodTier) + 'static,
    {
        self.on_tier_changed = Some(Box::new(callback));
        self
    }

    /// The entity's node.
    pub fn node(&self) -> &NodeRef {
        &self.node
    }

    /// The logic throttle, if any.
    pub fn logic(&self) -> Option<LogicThrottle> {
        self.logic
    }
}

/// Run `apply` on a weakly held component. Returns `false` when the
/// component is gone or borrowed elsewhere.
pub(crate) fn with_component<C: ?Sized>(
    slot: &Option<Weak<RefCell<C>>>,
    apply: impl FnOnce(&mut C),
) -> bool {
    let Some(component) = slot.as_ref().and_then(Weak::upgrade) else {
        return false;
    };
    let Ok(mut borrowed) = component.try_borrow_mut() else {
        debug!("LOD component busy, effect dropped");
        return false;
    };
    apply(&mut *borrowed);
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use ember_core::SceneNode;

    #[derive(Default)]
    struct Prop {
        visible: Option<bool>,
        animation: Option<AnimationMode>,
        audio: Option<(bool, f32)>,
        particles: Option<(bool, u32)>,
    }

    impl Visual for Prop {
        fn set_visible(&mut self, visible: bool) {
            self.visible = Some(visible);
        }

        fn set_shadow_mode(&mut self, _mode: ShadowMode) {}
    }

    impl Animator for Prop {
        fn set_animation_mode(&mut self, mode: AnimationMode) {
            self.animation = Some(mode);
        }
    }

    impl AudioEmitter for Prop {
        fn set_audio(&mut self, enabled: bool, volume: f32) {
            self.audio = Some((enabled, volume));
        }
    }

    impl ParticleEmitter for Prop {
        fn set_particles(&mut self, enabled: bool, max_particles: u32) {
            self.particles = Some((enabled, max_particles));
        }
    }

    /// Every builder keeps a working weak reference to the concrete component.
    #[test]
    fn test_builders_reach_concrete_components() {
        let node = SceneNode::default();
        let prop = Rc::new(RefCell::new(Prop::default()));
        let target = LodTarget::new(node.downgrade())
            .with_visual(&prop)
            .with_animator(&prop)
            .with_audio(&prop)
            .with_particles(&prop);

        assert!(with_component(&target.visual, |v| v.set_visible(false)));
        assert!(with_component(&target.animator, |a| a.set_animation_mode(AnimationMode::Disabled)));
        assert!(with_component(&target.audio, |a| a.set_audio(true, 0.5)));
        assert!(with_component(&target.particles, |p| p.set_particles(true, 7)));

        let prop = prop.borrow();
        assert_eq!(prop.visible, Some(false));
        assert_eq!(prop.animation, Some(AnimationMode::Disabled));
        assert_eq!(prop.audio, Some((true, 0.5)));
        assert_eq!(prop.particles, Some((true, 7)));
    }

    #[test]
    fn test_dropped_or_busy_component_is_skipped() {
        let node = SceneNode::default();
        let prop = Rc::new(RefCell::new(Prop::default()));
        let target = LodTarget::new(node.downgrade()).with_visual(&prop);

        {
            let _held = prop.borrow_mut();
            assert!(!with_component(&target.visual, |v| v.set_visible(true)));
        }
        drop(prop);
        assert!(!with_component(&target.visual, |v| v.set_visible(true)));
        assert!(!with_component(&target.audio, |a| a.set_audio(true, 1.0)));
    }
}
