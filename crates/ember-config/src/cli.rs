//! Command-line argument parsing for the Ember runtime.

use std::path::PathBuf;

use clap::Parser;

use crate::Config;

/// Ember command-line arguments.
///
/// CLI values override settings loaded from `config.ron`.
#[derive(Parser, Debug, Default)]
#[command(name = "ember", about = "Ember adaptive scheduling runtime")]
pub struct CliArgs {
    /// Work items executed per frame at nominal load.
    #[arg(long)]
    pub max_updates: Option<usize>,

    /// Default LOD cull distance in meters.
    #[arg(long)]
    pub cull_distance: Option<f32>,

    /// Entities re-evaluated per LOD pass.
    #[arg(long)]
    pub entities_per_pass: Option<usize>,

    /// RNG seed for scheduler jitter and skip decisions.
    #[arg(long)]
    pub seed: Option<u64>,

    /// Number of simulated agents (demo).
    #[arg(long)]
    pub agents: Option<usize>,

    /// Number of simulated frames (demo).
    #[arg(long)]
    pub frames: Option<u64>,

    /// Log level (error, warn, info, debug, trace).
    #[arg(long)]
    pub log_level: Option<String>,

    /// Path to config directory (overrides default location).
    #[arg(long)]
    pub config: Option<PathBuf>,
}

impl Config {
    /// Apply CLI overrides to a loaded config.
    pub fn apply_cli_overrides(&mut self, args: &CliArgs) {
        if let Some(n) = args.max_updates {
            self.scheduler.max_updates_per_frame = n;
        }
        if let Some(d) = args.cull_distance {
            self.lod.cull_distance = d;
        }
        if let Some(n) = args.entities_per_pass {
            self.lod.entities_per_pass = n;
        }
        if let Some(seed) = args.seed {
            self.scheduler.seed = Some(seed);
        }
        if let Some(agents) = args.agents {
            self.demo.agents = agents;
        }
        if let Some(frames) = args.frames {
            self.demo.frames = frames;
        }
        if let Some(ref level) = args.log_level {
            self.debug.log_level = level.clone();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_override() {
        let mut config = Config::default();
        let args = CliArgs {
            max_updates: Some(8),
            seed: Some(7),
            log_level: Some("debug".to_string()),
            ..CliArgs::default()
        };
        config.apply_cli_overrides(&args);
        assert_eq!(config.scheduler.max_updates_per_frame, 8);
        assert_eq!(config.scheduler.seed, Some(7));
        assert_eq!(config.debug.log_level, "debug");
        // Non-overridden fields retain defaults
        assert_eq!(config.lod.cull_distance, 150.0);
        assert_eq!(config.demo.agents, 500);
    }

    #[test]
    fn test_cli_no_override() {
        let original = Config::default();
        let mut config = Config::default();
        config.apply_cli_overrides(&CliArgs::default());
        assert_eq!(config, original);
    }

    #[test]
    fn test_cli_parses_flags() {
        let args = CliArgs::parse_from(["ember", "--agents", "32", "--cull-distance", "90"]);
        assert_eq!(args.agents, Some(32));
        assert_eq!(args.cull_distance, Some(90.0));
        assert!(args.config.is_none());
    }
}
