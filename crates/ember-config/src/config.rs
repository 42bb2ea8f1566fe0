//! Configuration structs with sensible defaults and RON persistence.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

const APP_NAME: &str = "ember";

/// Top-level runtime configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    /// Update scheduler settings.
    pub scheduler: SchedulerConfig,
    /// Level-of-detail settings.
    pub lod: LodConfig,
    /// Object pool settings.
    pub pool: PoolConfig,
    /// Debug/development settings.
    pub debug: DebugConfig,
    /// Headless demo settings.
    pub demo: DemoConfig,
}

/// Update scheduler configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SchedulerConfig {
    /// Maximum number of work items executed in one pass at nominal load.
    pub max_updates_per_frame: usize,
    /// Frame duration the budget is measured against, in seconds.
    pub target_frame_time: f64,
    /// Last-frame/target ratio above which the budget drops to 75%.
    pub moderate_load_ratio: f64,
    /// Last-frame/target ratio above which the budget drops to 50%.
    pub heavy_load_ratio: f64,
    /// Last-frame/target ratio above which the budget drops to 25%.
    pub severe_load_ratio: f64,
    /// Anchor distance beyond which low-priority work may be skipped.
    pub optimization_distance: f32,
    /// Upper bound on the per-pass skip probability.
    pub max_skip_chance: f32,
    /// Skip probability gained per optimization distance of excess, Normal priority.
    pub normal_skip_scale: f32,
    /// Skip probability gained per optimization distance of excess, Low priority.
    pub low_skip_scale: f32,
    /// Skip probability gained per optimization distance of excess, VeryLow priority.
    pub very_low_skip_scale: f32,
    /// Work items running longer than this are logged as slow, in milliseconds.
    pub slow_update_threshold_ms: f64,
    /// Fixed RNG seed for jitter and skip decisions. `None` seeds from the OS.
    pub seed: Option<u64>,
}

/// Level-of-detail configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct LodConfig {
    /// Upper distance bound of each tier, nearest first. At most four entries.
    pub thresholds: Vec<f32>,
    /// Cull distance applied to entities registered without settings.
    pub cull_distance: f32,
    /// Number of entities re-evaluated per scheduled pass.
    pub entities_per_pass: usize,
    /// Seconds between LOD passes.
    pub update_interval: f64,
    /// Seconds between statistics aggregations.
    pub stats_interval: f64,
    /// Extra distance an entity must travel past a threshold before it
    /// degrades. `0.0` disables the dead zone.
    pub hysteresis: f32,
}

/// Object pool configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct PoolConfig {
    /// Idle instances created up front for lazily created pools.
    pub default_initial_size: usize,
    /// Instance cap for lazily created pools.
    pub default_max_size: usize,
    /// Whether lazily created pools may grow and reclaim.
    pub default_allow_growth: bool,
    /// Minimum seconds between idle-instance cleanups.
    pub cleanup_interval: f64,
    /// Idle instances a pool always keeps through cleanup.
    pub min_retained: usize,
}

/// Debug/development configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct DebugConfig {
    /// Log level override (e.g., "debug", "info", "warn").
    pub log_level: String,
    /// Log a statistics line periodically.
    pub show_stats: bool,
    /// Seconds between statistics lines.
    pub stats_log_interval: f64,
}

/// Headless demo configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct DemoConfig {
    /// Number of simulated agents.
    pub agents: usize,
    /// Number of frames to simulate.
    pub frames: u64,
    /// Radius of the area agents wander in, in meters.
    pub world_radius: f32,
    /// Simulated frame duration in seconds.
    pub frame_time: f64,
}

// --- Default implementations ---

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            max_updates_per_frame: 50,
            target_frame_time: 1.0 / 60.0,
            moderate_load_ratio: 1.2,
            heavy_load_ratio: 1.5,
            severe_load_ratio: 2.0,
            optimization_distance: 50.0,
            max_skip_chance: 0.9,
            normal_skip_scale: 0.25,
            low_skip_scale: 0.5,
            very_low_skip_scale: 0.75,
            slow_update_threshold_ms: 5.0,
            seed: None,
        }
    }
}

impl Default for LodConfig {
    fn default() -> Self {
        Self {
            thresholds: vec![15.0, 30.0, 60.0, 100.0],
            cull_distance: 150.0,
            entities_per_pass: 64,
            update_interval: 0.1,
            stats_interval: 1.0,
            hysteresis: 0.0,
        }
    }
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            default_initial_size: 10,
            default_max_size: 50,
            default_allow_growth: true,
            cleanup_interval: 30.0,
            min_retained: 5,
        }
    }
}

impl Default for DebugConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            show_stats: true,
            stats_log_interval: 2.0,
        }
    }
}

impl Default for DemoConfig {
    fn default() -> Self {
        Self {
            agents: 500,
            frames: 600,
            world_radius: 250.0,
            frame_time: 1.0 / 60.0,
        }
    }
}

/// Default configuration directory (`<os config dir>/ember`), falling back to
/// the working directory when the OS does not expose one.
pub fn default_config_dir() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_NAME)
}

// --- Load / Save / Reload ---

impl Config {
    /// Load config from the given directory, or create a default config file.
    pub fn load_or_create(config_dir: &Path) -> Result<Self, ConfigError> {
        let config_path = config_dir.join("config.ron");

        if config_path.exists() {
            let contents = std::fs::read_to_string(&config_path).map_err(ConfigError::ReadError)?;
            let config: Config = ron::from_str(&contents).map_err(ConfigError::ParseError)?;
            config.validate()?;
            log::info!("Loaded config from {}", config_path.display());
            Ok(config)
        } else {
            let config = Config::default();
            config.save(config_dir)?;
            log::info!("Created default config at {}", config_path.display());
            Ok(config)
        }
    }

    /// Save config to the given directory as `config.ron`.
    pub fn save(&self, config_dir: &Path) -> Result<(), ConfigError> {
        std::fs::create_dir_all(config_dir).map_err(ConfigError::WriteError)?;

        let config_path = config_dir.join("config.ron");
        let pretty = ron::ser::PrettyConfig::new()
            .depth_limit(3)
            .separate_tuple_members(true)
            .enumerate_arrays(false);

        let serialized =
            ron::ser::to_string_pretty(self, pretty).map_err(ConfigError::SerializeError)?;

        std::fs::write(&config_path, serialized).map_err(ConfigError::WriteError)?;
        Ok(())
    }

    /// Hot-reload: returns `Some(new_config)` if the file changed, `None` otherwise.
    pub fn reload(&self, config_dir: &Path) -> Result<Option<Self>, ConfigError> {
        let config_path = config_dir.join("config.ron");
        let contents = std::fs::read_to_string(&config_path).map_err(ConfigError::ReadError)?;
        let new_config: Config = ron::from_str(&contents).map_err(ConfigError::ParseError)?;
        new_config.validate()?;

        if &new_config != self {
            log::info!("Config reloaded with changes");
            Ok(Some(new_config))
        } else {
            Ok(None)
        }
    }

    /// Check every value the runtime depends on being in range.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let s = &self.scheduler;
        if s.max_updates_per_frame == 0 {
            return Err(invalid("scheduler.max_updates_per_frame", "must be at least 1"));
        }
        if !(s.target_frame_time > 0.0) {
            return Err(invalid("scheduler.target_frame_time", "must be positive"));
        }
        if !(s.moderate_load_ratio < s.heavy_load_ratio && s.heavy_load_ratio < s.severe_load_ratio)
        {
            return Err(invalid(
                "scheduler.moderate_load_ratio",
                "load ratios must be strictly increasing (moderate < heavy < severe)",
            ));
        }
        if !(0.0..=1.0).contains(&s.max_skip_chance) {
            return Err(invalid("scheduler.max_skip_chance", "must be within [0, 1]"));
        }
        if s.optimization_distance < 0.0 {
            return Err(invalid("scheduler.optimization_distance", "must not be negative"));
        }

        let l = &self.lod;
        if l.thresholds.len() > 4 {
            return Err(invalid("lod.thresholds", "at most four thresholds (LOD0..LOD3 bounds)"));
        }
        if l.thresholds.iter().any(|&t| !(t > 0.0)) {
            return Err(invalid("lod.thresholds", "thresholds must be positive"));
        }
        if l.thresholds.windows(2).any(|w| w[1] <= w[0]) {
            return Err(invalid("lod.thresholds", "thresholds must be strictly increasing"));
        }
        if !(l.cull_distance > 0.0) {
            return Err(invalid("lod.cull_distance", "must be positive"));
        }
        if l.entities_per_pass == 0 {
            return Err(invalid("lod.entities_per_pass", "must be at least 1"));
        }
        if !(l.update_interval > 0.0) {
            return Err(invalid("lod.update_interval", "must be positive"));
        }
        if l.hysteresis < 0.0 {
            return Err(invalid("lod.hysteresis", "must not be negative"));
        }

        let p = &self.pool;
        if p.default_max_size == 0 || p.default_initial_size > p.default_max_size {
            return Err(invalid(
                "pool.default_max_size",
                "must be at least 1 and not below default_initial_size",
            ));
        }
        if p.cleanup_interval < 0.0 {
            return Err(invalid("pool.cleanup_interval", "must not be negative"));
        }

        Ok(())
    }
}

fn invalid(field: &'static str, reason: &str) -> ConfigError {
    ConfigError::Invalid {
        field,
        reason: reason.to_string(),
    }
}
