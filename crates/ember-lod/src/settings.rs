//! Per-entity LOD settings and named presets.

use ember_config::LodConfig;

/// Particle cap at full fidelity when none is configured.
pub const DEFAULT_PARTICLE_BUDGET: u32 = 100;

/// How one entity maps distance to tiers.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LodSettings {
    /// Distance at or beyond which the entity is culled.
    pub cull_distance: f32,
    /// Multiplier on the measured distance; above 1 degrades sooner.
    pub bias: f32,
    /// Maximum particles at `Lod0`; lower tiers get a fraction.
    pub particle_budget: u32,
    /// Pin the entity to the best tier regardless of distance.
    pub force_highest_tier: bool,
}

impl Default for LodSettings {
    fn default() -> Self {
        Self {
            cull_distance: 150.0,
            bias: 1.0,
            particle_budget: DEFAULT_PARTICLE_BUDGET,
            force_highest_tier: false,
        }
    }
}

impl LodSettings {
    /// Defaults using the configured cull distance.
    pub fn from_config(config: &LodConfig) -> Self {
        Self {
            cull_distance: config.cull_distance,
            ..Self::default()
        }
    }

    /// Settings of a preset, relative to `self`.
    pub fn profile(self, profile: LodProfile) -> Self {
        profile.apply(self)
    }

    /// Set the cull distance.
    pub fn with_cull_distance(mut self, cull_distance: f32) -> Self {
        self.cull_distance = cull_distance;
        self
    }

    /// Set the distance bias multiplier.
    pub fn with_bias(mut self, bias: f32) -> Self {
        self.bias = bias;
        self
    }

    /// Set the full-fidelity particle cap.
    pub fn with_particle_budget(mut self, particle_budget: u32) -> Self {
        self.particle_budget = particle_budget;
        self
    }

    /// Pin (or unpin) the entity to the best tier.
    pub fn with_force_highest_tier(mut self, force: bool) -> Self {
        self.force_highest_tier = force;
        self
    }
}

/// Named settings presets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum LodProfile {
    /// The base settings unchanged.
    #[default]
    Standard,
    /// Long-lived actors the player keeps track of: degrade late, cull far.
    PersistentActor,
    /// Short-lived effects: degrade early, cull close, small particle cap.
    FastDegradingEffect,
}

impl LodProfile {
    /// Derive settings for this preset from `base`.
    pub fn apply(self, base: LodSettings) -> LodSettings {
        match self {
            LodProfile::Standard => base,
            LodProfile::PersistentActor => LodSettings {
                cull_distance: base.cull_distance * 2.0,
                bias: base.bias * 0.75,
                particle_budget: base.particle_budget.saturating_mul(2),
                ..base
            },
            LodProfile::FastDegradingEffect => LodSettings {
                cull_distance: base.cull_distance * 0.5,
                bias: base.bias * 2.0,
                particle_budget: base.particle_budget / 2,
                ..base
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_config_uses_cull_distance() {
        let config = LodConfig {
            cull_distance: 300.0,
            ..LodConfig::default()
        };
        let settings = LodSettings::from_config(&config);
        assert_eq!(settings.cull_distance, 300.0);
        assert_eq!(settings.bias, 1.0);
        assert!(!settings.force_highest_tier);
    }

    #[test]
    fn test_builders() {
        let settings = LodSettings::default()
            .with_cull_distance(80.0)
            .with_bias(1.5)
            .with_particle_budget(12)
            .with_force_highest_tier(true);
        assert_eq!(settings.cull_distance, 80.0);
        assert_eq!(settings.bias, 1.5);
        assert_eq!(settings.particle_budget, 12);
        assert!(settings.force_highest_tier);
    }

    /// Presets keep the override flag and move cull distance in opposite directions.
    #[test]
    fn test_profiles_shape_degradation() {
        let base = LodSettings::default();
        let actor = base.profile(LodProfile::PersistentActor);
        let effect = base.profile(LodProfile::FastDegradingEffect);

        assert!(actor.cull_distance > base.cull_distance);
        assert!(actor.bias < base.bias);
        assert!(effect.cull_distance < base.cull_distance);
        assert!(effect.bias > base.bias);
        assert_eq!(base.profile(LodProfile::Standard), base);
    }
}
