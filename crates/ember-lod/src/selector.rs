//! Distance-based tier selection with configurable thresholds and optional
//! hysteresis.

use crate::error::LodError;
use crate::settings::LodSettings;
use crate::tier::LodTier;

/// Maximum number of thresholds: one per visible tier boundary.
pub const MAX_THRESHOLDS: usize = 4;

/// Distance boundaries between visible tiers.
///
/// `thresholds[i]` is the maximum distance for `Lod{i}`. Distances beyond the
/// last threshold (but short of the cull distance) map to `Lod4`.
#[derive(Clone, Debug, PartialEq)]
pub struct LodThresholds {
    thresholds: Vec<f32>,
}

impl Default for LodThresholds {
    /// 15, 30, 60 and 100 units.
    fn default() -> Self {
        Self {
            thresholds: vec![15.0, 30.0, 60.0, 100.0],
        }
    }
}

impl LodThresholds {
    /// Validate and wrap custom thresholds.
    ///
    /// Requires 1 to [`MAX_THRESHOLDS`] finite, positive, strictly increasing
    /// distances.
    pub fn new(thresholds: Vec<f32>) -> Result<Self, LodError> {
        if thresholds.is_empty() || thresholds.len() > MAX_THRESHOLDS {
            return Err(LodError::InvalidThresholds(format!(
                "expected 1 to {MAX_THRESHOLDS} thresholds, got {}",
                thresholds.len()
            )));
        }
        for (i, &t) in thresholds.iter().enumerate() {
            if !t.is_finite() || t <= 0.0 {
                return Err(LodError::InvalidThresholds(format!(
                    "threshold {t} must be finite and positive"
                )));
            }
            if i > 0 && t <= thresholds[i - 1] {
                return Err(LodError::InvalidThresholds(
                    "thresholds must be strictly increasing".to_string(),
                ));
            }
        }
        Ok(Self { thresholds })
    }

    /// The threshold distances.
    pub fn as_slice(&self) -> &[f32] {
        &self.thresholds
    }
}

/// Tier for an entity at `distance` (already bias-adjusted).
///
/// `force_highest_tier` wins over everything; then `Culled` at or beyond the
/// cull distance; then the first threshold the distance does not exceed;
/// otherwise the worst visible tier.
pub fn select_tier(distance: f32, thresholds: &LodThresholds, settings: &LodSettings) -> LodTier {
    if settings.force_highest_tier {
        return LodTier::HIGHEST;
    }
    if distance >= settings.cull_distance {
        return LodTier::Culled;
    }
    thresholds
        .thresholds
        .iter()
        .position(|&threshold| distance <= threshold)
        .and_then(LodTier::from_index)
        .unwrap_or(LodTier::LOWEST_VISIBLE)
}

/// Like [`select_tier`], but a degrading transition away from `current` only
/// happens once the distance is `margin` past the boundary.
///
/// Improving transitions are immediate. A `margin` of zero (the default) is
/// exactly [`select_tier`].
pub fn select_tier_with_hysteresis(
    distance: f32,
    current: Option<LodTier>,
    thresholds: &LodThresholds,
    settings: &LodSettings,
    margin: f32,
) -> LodTier {
    let raw = select_tier(distance, thresholds, settings);
    let Some(current) = current else {
        return raw;
    };
    if margin <= 0.0 || raw <= current {
        return raw;
    }
    select_tier(distance - margin, thresholds, settings).max(current)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings() -> LodSettings {
        LodSettings::default()
    }

    fn select(distance: f32) -> LodTier {
        select_tier(distance, &LodThresholds::default(), &settings())
    }

    #[test]
    fn test_zero_distance_is_best_tier() {
        assert_eq!(select(0.0), LodTier::Lod0);
    }

    /// Thresholds are inclusive upper bounds.
    #[test]
    fn test_threshold_boundary_behavior() {
        assert_eq!(select(15.0), LodTier::Lod0);
        assert_eq!(select(15.01), LodTier::Lod1);
        assert_eq!(select(30.0), LodTier::Lod1);
        assert_eq!(select(40.0), LodTier::Lod2);
        assert_eq!(select(100.0), LodTier::Lod3);
        assert_eq!(select(120.0), LodTier::Lod4);
    }

    #[test]
    fn test_cull_distance_is_inclusive() {
        assert_eq!(select(149.9), LodTier::Lod4);
        assert_eq!(select(150.0), LodTier::Culled);
        assert_eq!(select(500.0), LodTier::Culled);
    }

    /// Tier never improves as distance grows.
    #[test]
    fn test_monotonically_increasing_with_distance() {
        let mut prev = LodTier::Lod0;
        let mut d = 0.0_f32;
        while d < 400.0 {
            let tier = select(d);
            assert!(tier >= prev, "tier must not improve with distance: d={d}, {tier} < {prev}");
            prev = tier;
            d += 0.5;
        }
    }

    #[test]
    fn test_force_highest_ignores_distance() {
        let forced = settings().with_force_highest_tier(true);
        let thresholds = LodThresholds::default();
        assert_eq!(select_tier(10_000.0, &thresholds, &forced), LodTier::Lod0);
    }

    /// With fewer thresholds, anything past the last one is the worst visible tier.
    #[test]
    fn test_short_threshold_list() {
        let thresholds = LodThresholds::new(vec![10.0, 20.0]).unwrap();
        assert_eq!(select_tier(5.0, &thresholds, &settings()), LodTier::Lod0);
        assert_eq!(select_tier(15.0, &thresholds, &settings()), LodTier::Lod1);
        assert_eq!(select_tier(25.0, &thresholds, &settings()), LodTier::Lod4);
    }

    #[test]
    fn test_invalid_thresholds_rejected() {
        assert!(LodThresholds::new(vec![]).is_err());
        assert!(LodThresholds::new(vec![10.0, 5.0]).is_err());
        assert!(LodThresholds::new(vec![10.0, 10.0]).is_err());
        assert!(LodThresholds::new(vec![-1.0]).is_err());
        assert!(LodThresholds::new(vec![f32::NAN]).is_err());
        assert!(LodThresholds::new(vec![1.0, 2.0, 3.0, 4.0, 5.0]).is_err());
    }

    #[test]
    fn test_hysteresis_delays_degrading_only() {
        let thresholds = LodThresholds::default();
        let s = settings();
        // Just past 15 stays at Lod0 with a 2-unit margin.
        assert_eq!(
            select_tier_with_hysteresis(16.0, Some(LodTier::Lod0), &thresholds, &s, 2.0),
            LodTier::Lod0
        );
        assert_eq!(
            select_tier_with_hysteresis(17.5, Some(LodTier::Lod0), &thresholds, &s, 2.0),
            LodTier::Lod1
        );
        // Coming closer improves immediately.
        assert_eq!(
            select_tier_with_hysteresis(14.0, Some(LodTier::Lod1), &thresholds, &s, 2.0),
            LodTier::Lod0
        );
    }

    #[test]
    fn test_zero_margin_matches_plain_selection() {
        let thresholds = LodThresholds::default();
        let s = settings();
        for d in [0.0, 15.0, 16.0, 45.0, 99.0, 149.0, 151.0] {
            assert_eq!(
                select_tier_with_hysteresis(d, Some(LodTier::Lod0), &thresholds, &s, 0.0),
                select_tier(d, &thresholds, &s)
            );
        }
    }
}
