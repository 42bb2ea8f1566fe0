//! Structured logging for the Ember runtime.
//!
//! Console output with uptime timestamps and module paths, plus a JSON file in
//! debug builds for post-mortem analysis of scheduler and pool behavior. The
//! level comes from `RUST_LOG` or the config `debug.log_level`.

use ember_config::Config;
use std::path::Path;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Filter used when neither `RUST_LOG` nor the config provide one.
pub const DEFAULT_FILTER: &str = "info";

/// File name of the JSON log written in debug builds.
pub const LOG_FILE_NAME: &str = "ember.log";

/// Targets that emit one line per entity or work item on every pass.
///
/// A bare `trace` level caps them at `debug`; name them in the filter to see
/// their trace output.
pub const PER_PASS_TARGETS: &[&str] = &["ember_lod::manager", "ember_sched::scheduler"];

/// Install the global subscriber.
///
/// Calling this twice is harmless: the second install is rejected and the
/// first subscriber stays active.
pub fn init_logging(log_dir: Option<&Path>, debug_build: bool, config: Option<&Config>) {
    let filter_str = filter_string(config);

    // RUST_LOG wins over the config value
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&filter_str));

    let console_layer = fmt::layer()
        .with_target(true)
        .with_level(true)
        .with_timer(fmt::time::uptime());

    let subscriber = tracing_subscriber::registry()
        .with(env_filter)
        .with(console_layer);

    if debug_build
        && let Some(log_dir) = log_dir
        && std::fs::create_dir_all(log_dir).is_ok()
        && let Ok(log_file) = std::fs::File::create(log_dir.join(LOG_FILE_NAME))
    {
        let file_layer = fmt::layer()
            .with_writer(log_file)
            .with_ansi(false)
            .with_target(true)
            .with_timer(fmt::time::uptime())
            .json();

        if subscriber.with(file_layer).try_init().is_ok() {
            tracing::debug!(
                "Logging to console and {} (filter `{filter_str}`)",
                log_dir.join(LOG_FILE_NAME).display()
            );
        }
        return;
    }

    if subscriber.try_init().is_ok() {
        tracing::debug!("Logging to console (filter `{filter_str}`)");
    }
}

/// Filter string derived from the config, falling back to [`DEFAULT_FILTER`].
///
/// When the global level is `trace`, every [`PER_PASS_TARGETS`] entry the
/// filter does not mention is capped at `debug`.
pub fn filter_string(config: Option<&Config>) -> String {
    let base = match config {
        Some(config) if !config.debug.log_level.trim().is_empty() => {
            config.debug.log_level.trim().to_string()
        }
        _ => return DEFAULT_FILTER.to_string(),
    };

    let global_trace = base
        .split(',')
        .any(|directive| directive.trim().eq_ignore_ascii_case("trace"));
    if !global_trace {
        return base;
    }

    let mut filter = base.clone();
    for target in PER_PASS_TARGETS {
        if !base.contains(target) {
            filter.push_str(&format!(",{target}=debug"));
        }
    }
    filter
}

/// Create an `EnvFilter` with the default filter string.
pub fn default_env_filter() -> EnvFilter {
    EnvFilter::new(DEFAULT_FILTER)
}
