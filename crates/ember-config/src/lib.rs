//! Configuration system for the Ember runtime.
//!
//! Provides the tunables for the update scheduler, LOD manager and object
//! pools, persisted to disk as RON. Supports CLI overrides via clap, hot-reload
//! detection, validation, and forward/backward compatible serialization.

mod cli;
mod config;
mod error;

pub use cli::CliArgs;
pub use config::{
    Config, DebugConfig, DemoConfig, LodConfig, PoolConfig, SchedulerConfig, default_config_dir,
};
pub use error::ConfigError;
