//! Distance-based probabilistic skipping of low-priority work.

use ember_config::SchedulerConfig;
use rand::Rng;

use crate::priority::UpdatePriority;

/// Chance that a due, skippable item is passed over this pass.
///
/// The chance grows linearly with how far the item's anchor lies beyond the
/// optimization distance, scaled per priority and capped at
/// `max_skip_chance`. A skipped item keeps its due time, so it is eligible
/// again next pass. The constants are tuning knobs.
#[derive(Debug, Clone, PartialEq)]
pub struct SkipPolicy {
    optimization_distance: f32,
    max_chance: f32,
    normal_scale: f32,
    low_scale: f32,
    very_low_scale: f32,
}

impl SkipPolicy {
    /// Build from the scheduler section of the config.
    pub fn from_config(config: &SchedulerConfig) -> Self {
        Self {
            optimization_distance: config.optimization_distance,
            max_chance: config.max_skip_chance,
            normal_scale: config.normal_skip_scale,
            low_scale: config.low_skip_scale,
            very_low_scale: config.very_low_skip_scale,
        }
    }

    /// A policy that never skips.
    pub fn disabled() -> Self {
        Self {
            optimization_distance: f32::INFINITY,
            max_chance: 0.0,
            normal_scale: 0.0,
            low_scale: 0.0,
            very_low_scale: 0.0,
        }
    }

    fn scale(&self, priority: UpdatePriority) -> f32 {
        match priority {
            UpdatePriority::Critical | UpdatePriority::High => 0.0,
            UpdatePriority::Normal => self.normal_scale,
            UpdatePriority::Low => self.low_scale,
            UpdatePriority::VeryLow => self.very_low_scale,
        }
    }

    /// Probability in `[0, max_chance]` of skipping an item of `priority`
    /// whose anchor is `distance` away from the viewer.
    pub fn skip_chance(&self, priority: UpdatePriority, distance: f32) -> f32 {
        let opt = self.optimization_distance;
        if !priority.is_skippable() || !distance.is_finite() || distance <= opt || opt <= 0.0 {
            return 0.0;
        }
        let excess = (distance - opt) / opt;
        (excess * self.scale(priority)).clamp(0.0, self.max_chance)
    }

    /// Roll the skip decision. Items without a measured distance are never
    /// skipped.
    pub fn should_skip(
        &self,
        priority: UpdatePriority,
        distance: Option<f32>,
        rng: &mut impl Rng,
    ) -> bool {
        let Some(distance) = distance else {
            return false;
        };
        let chance = self.skip_chance(priority, distance);
        chance > 0.0 && rng.random::<f32>() < chance
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn policy() -> SkipPolicy {
        SkipPolicy::from_config(&SchedulerConfig::default())
    }

    #[test]
    fn test_urgent_priorities_never_skip() {
        let policy = policy();
        assert_eq!(policy.skip_chance(UpdatePriority::Critical, 10_000.0), 0.0);
        assert_eq!(policy.skip_chance(UpdatePriority::High, 10_000.0), 0.0);
    }

    #[test]
    fn test_no_skip_within_optimization_distance() {
        let policy = policy();
        assert_eq!(policy.skip_chance(UpdatePriority::VeryLow, 50.0), 0.0);
        assert_eq!(policy.skip_chance(UpdatePriority::VeryLow, 10.0), 0.0);
    }

    /// Lower priorities are skipped more readily at the same distance.
    #[test]
    fn test_chance_scales_with_priority_and_distance() {
        let policy = policy();
        let normal = policy.skip_chance(UpdatePriority::Normal, 100.0);
        let low = policy.skip_chance(UpdatePriority::Low, 100.0);
        let very_low = policy.skip_chance(UpdatePriority::VeryLow, 100.0);
        assert!((normal - 0.25).abs() < 1e-6);
        assert!((low - 0.5).abs() < 1e-6);
        assert!((very_low - 0.75).abs() < 1e-6);
        assert!(policy.skip_chance(UpdatePriority::Normal, 150.0) > normal);
    }

    #[test]
    fn test_chance_is_capped() {
        let policy = policy();
        assert!((policy.skip_chance(UpdatePriority::VeryLow, 1.0e6) - 0.9).abs() < 1e-6);
    }

    #[test]
    fn test_should_skip_respects_missing_distance() {
        let policy = policy();
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        for _ in 0..100 {
            assert!(!policy.should_skip(UpdatePriority::VeryLow, None, &mut rng));
        }
    }

    #[test]
    fn test_skip_rate_roughly_matches_chance() {
        let policy = policy();
        let mut rng = ChaCha8Rng::seed_from_u64(7);
        let skipped = (0..10_000)
            .filter(|_| policy.should_skip(UpdatePriority::Low, Some(100.0), &mut rng))
            .count();
        assert!((4_000..6_000).contains(&skipped), "skipped {skipped} of 10000");
    }

    #[test]
    fn test_disabled_policy_never_skips() {
        let policy = SkipPolicy::disabled();
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        assert!(!policy.should_skip(UpdatePriority::VeryLow, Some(1.0e9), &mut rng));
    }
}
