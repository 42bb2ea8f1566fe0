//! Dynamic per-frame execution budget.

use ember_config::SchedulerConfig;

/// How far the previous frame overran its target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum LoadLevel {
    /// Within the moderate ratio: full budget.
    Nominal,
    /// Past the moderate ratio: 75 %.
    Moderate,
    /// Past the heavy ratio: 50 %.
    Heavy,
    /// Past the severe ratio: 25 %.
    Severe,
}

impl LoadLevel {
    /// Fraction of the configured maximum admitted at this level.
    pub fn fraction(self) -> f64 {
        match self {
            LoadLevel::Nominal => 1.0,
            LoadLevel::Moderate => 0.75,
            LoadLevel::Heavy => 0.5,
            LoadLevel::Severe => 0.25,
        }
    }
}

/// Number of work items a pass may execute, shrunk in steps as the last
/// frame's duration exceeds the target frame time.
#[derive(Debug, Clone, PartialEq)]
pub struct FrameBudget {
    max_updates: usize,
    target_frame_time: f64,
    moderate_ratio: f64,
    heavy_ratio: f64,
    severe_ratio: f64,
}

impl FrameBudget {
    /// Build from the scheduler section of the config.
    pub fn from_config(config: &SchedulerConfig) -> Self {
        Self {
            max_updates: config.max_updates_per_frame,
            target_frame_time: config.target_frame_time,
            moderate_ratio: config.moderate_load_ratio,
            heavy_ratio: config.heavy_load_ratio,
            severe_ratio: config.severe_load_ratio,
        }
    }

    /// Configured maximum per pass.
    pub fn max_updates(&self) -> usize {
        self.max_updates
    }

    /// Change the maximum per pass.
    pub fn set_max_updates(&mut self, max_updates: usize) {
        self.max_updates = max_updates;
    }

    /// Load level implied by a frame that took `last_frame_dt` seconds.
    ///
    /// Non-positive or non-finite durations (first frame, paused clock) count
    /// as nominal.
    pub fn load_level(&self, last_frame_dt: f64) -> LoadLevel {
        if !last_frame_dt.is_finite() || last_frame_dt <= 0.0 || self.target_frame_time <= 0.0 {
            return LoadLevel::Nominal;
        }
        let ratio = last_frame_dt / self.target_frame_time;
        if ratio > self.severe_ratio {
            LoadLevel::Severe
        } else if ratio > self.heavy_ratio {
            LoadLevel::Heavy
        } else if ratio > self.moderate_ratio {
            LoadLevel::Moderate
        } else {
            LoadLevel::Nominal
        }
    }

    /// Items admitted this pass. Never below one while the maximum is
    /// non-zero, so the most urgent item always makes progress.
    pub fn allowed(&self, last_frame_dt: f64) -> usize {
        if self.max_updates == 0 {
            return 0;
        }
        let fraction = self.load_level(last_frame_dt).fraction();
        ((self.max_updates as f64 * fraction).floor() as usize).max(1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn budget(max: usize) -> FrameBudget {
        let config = SchedulerConfig {
            max_updates_per_frame: max,
            ..SchedulerConfig::default()
        };
        FrameBudget::from_config(&config)
    }

    #[test]
    fn test_budget_steps_down_under_load() {
        let budget = budget(100);
        let target = 1.0 / 60.0;
        assert_eq!(budget.allowed(target), 100);
        assert_eq!(budget.allowed(target * 1.3), 75);
        assert_eq!(budget.allowed(target * 1.8), 50);
        assert_eq!(budget.allowed(target * 3.0), 25);
    }

    #[test]
    fn test_load_levels_at_boundaries() {
        let budget = budget(10);
        let target = 1.0 / 60.0;
        assert_eq!(budget.load_level(target * 1.19), LoadLevel::Nominal);
        assert_eq!(budget.load_level(target * 1.21), LoadLevel::Moderate);
        assert_eq!(budget.load_level(target * 1.51), LoadLevel::Heavy);
        assert_eq!(budget.load_level(target * 2.01), LoadLevel::Severe);
    }

    #[test]
    fn test_unmeasured_frame_gets_full_budget() {
        let budget = budget(40);
        assert_eq!(budget.allowed(0.0), 40);
        assert_eq!(budget.allowed(-1.0), 40);
        assert_eq!(budget.allowed(f64::NAN), 40);
    }

    /// A tiny budget under severe load still admits one item.
    #[test]
    fn test_budget_never_below_one() {
        let small = budget(2);
        assert_eq!(small.allowed(1.0), 1);
        assert_eq!(budget(0).allowed(0.0), 0);
    }
}
