//! Headless demo that drives the Ember runtime with a swarm of wandering agents.
//!
//! Configuration is loaded from `config.ron` and can be overridden via CLI flags.
//! Run with `cargo run -p ember-demo` to simulate the default scene.
//! Run with `cargo run -p ember-demo -- --agents 2000 --max-updates 20` to stress the budget.

mod agents;

use clap::Parser;
use ember_config::{CliArgs, Config, default_config_dir};
use ember_core::SceneNode;
use ember_lod::LodTier;
use ember_pool::{PoolCategory, prototype};
use ember_runtime::Runtime;
use glam::Vec3;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use tracing::{info, warn};

use agents::{Effect, SPARK_LIFETIME, Swarm};

/// Seconds for the viewer to circle the world once.
const ORBIT_PERIOD: f64 = 20.0;
/// Chance per frame of a simulated hitch.
const HITCH_CHANCE: f32 = 0.01;

fn main() {
    let args = CliArgs::parse();

    // Resolve config directory
    let config_dir = args.config.clone().unwrap_or_else(default_config_dir);

    // Load or create config, then apply CLI overrides
    let mut config = Config::load_or_create(&config_dir).unwrap_or_else(|e| {
        eprintln!("Failed to load config: {e}, using defaults");
        Config::default()
    });
    config.apply_cli_overrides(&args);
    if let Err(e) = config.validate() {
        eprintln!("Invalid config: {e}, using defaults");
        config = Config::default();
        config.apply_cli_overrides(&args);
    }

    let log_dir = config_dir.join("logs");
    ember_log::init_logging(Some(&log_dir), cfg!(debug_assertions), Some(&config));
    info!("Config directory: {}", config_dir.display());

    run(&config);
}

fn run(config: &Config) {
    let demo = &config.demo;
    let mut rng = match config.scheduler.seed {
        Some(seed) => ChaCha8Rng::seed_from_u64(seed),
        None => ChaCha8Rng::from_os_rng(),
    };

    let mut runtime: Runtime<Effect> = Runtime::new(config);
    runtime.pools_mut().register_category_prototype(
        PoolCategory::Effect,
        "Spark",
        prototype(Effect::default),
    );

    let orbit = demo.world_radius.max(1.0) * 0.5;
    let viewer = SceneNode::at(Vec3::new(orbit, 2.0, 0.0));
    runtime.set_viewer(Some(viewer.downgrade()));

    let swarm = Swarm::spawn(&mut runtime, demo.agents, demo.world_radius.max(1.0), &mut rng);
    info!(
        "Simulating {} agents for {} frames ({:.1}s)",
        swarm.len(),
        demo.frames,
        demo.frames as f64 * demo.frame_time
    );

    let mut next_report = config.debug.stats_log_interval;
    let mut sparks_spawned = 0usize;
    let mut sparks_refused = 0usize;
    let mut sparks_reused = 0usize;

    for _ in 0..demo.frames {
        let dt = if rng.random::<f32>() < HITCH_CHANCE {
            demo.frame_time * rng.random_range(1.5..3.0)
        } else {
            demo.frame_time
        };
        runtime.frame(dt);

        let angle = (runtime.now() / ORBIT_PERIOD * std::f64::consts::TAU) as f32;
        viewer.set_position(Vec3::new(angle.cos() * orbit, 2.0, angle.sin() * orbit));

        for position in swarm.drain_sparks() {
            match runtime
                .pools_mut()
                .spawn_effect("Spark", position, SPARK_LIFETIME)
            {
                Some(handle) => {
                    sparks_spawned += 1;
                    if let Some(effect) = runtime.pools().get(handle) {
                        debug_assert!(effect.is_burning());
                        if effect.bursts() > 1 {
                            sparks_reused += 1;
                        }
                    }
                }
                None => sparks_refused += 1,
            }
        }

        if config.debug.show_stats && runtime.now() >= next_report {
            next_report += config.debug.stats_log_interval;
            info!("{}", runtime.stats());
        }
    }

    let stats = runtime.stats();
    info!("{stats}");
    info!(
        "Agents: {} visible, {} animated, {} casting shadows, {} culled, mean think interval {:.2}s, {} tier changes",
        swarm.visible(),
        swarm.animated(),
        swarm.shadow_casters(),
        swarm.count_at(&runtime, LodTier::Culled),
        swarm.mean_interval(&runtime),
        swarm.transitions()
    );
    info!(
        "Sparks: {sparks_spawned} spawned ({sparks_reused} from recycled instances), {sparks_refused} refused, {} burning, farthest agent {:.1}m",
        stats.pooled_active(),
        swarm.farthest()
    );

    if sparks_refused > 0 {
        warn!("Spark pool refused {sparks_refused} spawns; raise pool.default_max_size");
    }
    let reclaimed = runtime.pools_mut().cleanup();
    if reclaimed > 0 {
        info!("Pool cleanup released {reclaimed} idle instances");
    }
    if let Some(pool) = runtime.pools().pool_stats(&PoolCategory::Effect.key("Spark")) {
        info!(
            "Spark pool after cleanup: {} idle, {} active, peak {}",
            pool.available, pool.active, pool.peak_usage
        );
    }
}
