//! What each tier means for the entity's subsystems.

use crate::components::{AnimationMode, ShadowMode};
use crate::tier::LodTier;

/// Side effects of one tier.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TierEffects {
    /// Rendered at all.
    pub visible: bool,
    /// Animation update fidelity.
    pub animation: AnimationMode,
    /// Audio source enabled.
    pub audio_enabled: bool,
    /// Audio volume scale.
    pub audio_volume: f32,
    /// Fraction of the particle budget; 0 disables emission.
    pub particle_fraction: f32,
    /// Shadow casting mode.
    pub shadows: ShadowMode,
    /// Multiplier on the entity's logic interval.
    pub logic_interval_scale: f64,
    /// Priority steps the entity's logic is demoted by.
    pub logic_demotion: usize,
}

impl TierEffects {
    /// Effects table, indexed by [`LodTier::index`].
    pub const TABLE: [TierEffects; LodTier::COUNT] = [
        TierEffects {
            visible: true,
            animation: AnimationMode::Full,
            audio_enabled: true,
            audio_volume: 1.0,
            particle_fraction: 1.0,
            shadows: ShadowMode::Full,
            logic_interval_scale: 1.0,
            logic_demotion: 0,
        },
        TierEffects {
            visible: true,
            animation: AnimationMode::Full,
            audio_enabled: true,
            audio_volume: 0.8,
            particle_fraction: 0.75,
            shadows: ShadowMode::Full,
            logic_interval_scale: 1.5,
            logic_demotion: 0,
        },
        TierEffects {
            visible: true,
            animation: AnimationMode::Reduced { every_n_frames: 2 },
            audio_enabled: true,
            audio_volume: 0.5,
            particle_fraction: 0.5,
            shadows: ShadowMode::ShadowOnly,
            logic_interval_scale: 2.0,
            logic_demotion: 1,
        },
        TierEffects {
            visible: true,
            animation: AnimationMode::Reduced { every_n_frames: 4 },
            audio_enabled: true,
            audio_volume: 0.25,
            particle_fraction: 0.25,
            shadows: ShadowMode::Off,
            logic_interval_scale: 4.0,
            logic_demotion: 1,
        },
        TierEffects {
            visible: true,
            animation: AnimationMode::Disabled,
            audio_enabled: false,
            audio_volume: 0.0,
            particle_fraction: 0.0,
            shadows: ShadowMode::Off,
            logic_interval_scale: 8.0,
            logic_demotion: 2,
        },
        TierEffects {
            visible: false,
            animation: AnimationMode::Disabled,
            audio_enabled: false,
            audio_volume: 0.0,
            particle_fraction: 0.0,
            shadows: ShadowMode::Off,
            logic_interval_scale: 16.0,
            logic_demotion: 3,
        },
    ];

    /// Effects of `tier`.
    pub fn for_tier(tier: LodTier) -> TierEffects {
        Self::TABLE[tier.index()]
    }

    /// Particle cap for a full-fidelity `budget`.
    pub fn particle_cap(&self, budget: u32) -> u32 {
        (budget as f32 * self.particle_fraction).round() as u32
    }

    /// Whether particles are emitted at all.
    pub fn particles_enabled(&self) -> bool {
        self.particle_fraction > 0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Culled disables every visual side effect.
    #[test]
    fn test_culled_disables_everything() {
        let culled = TierEffects::for_tier(LodTier::Culled);
        assert!(!culled.visible);
        assert_eq!(culled.animation, AnimationMode::Disabled);
        assert!(!culled.audio_enabled);
        assert!(!culled.particles_enabled());
        assert_eq!(culled.shadows, ShadowMode::Off);
    }

    #[test]
    fn test_fidelity_never_improves_with_tier() {
        for pair in TierEffects::TABLE.windows(2) {
            assert!(pair[1].audio_volume <= pair[0].audio_volume);
            assert!(pair[1].particle_fraction <= pair[0].particle_fraction);
            assert!(pair[1].logic_interval_scale >= pair[0].logic_interval_scale);
            assert!(pair[1].logic_demotion >= pair[0].logic_demotion);
        }
    }

    #[test]
    fn test_particle_cap_scales_budget() {
        assert_eq!(TierEffects::for_tier(LodTier::Lod0).particle_cap(100), 100);
        assert_eq!(TierEffects::for_tier(LodTier::Lod2).particle_cap(100), 50);
        assert_eq!(TierEffects::for_tier(LodTier::Lod4).particle_cap(100), 0);
    }
}
