//! End-to-end scenarios across the scheduler, the LOD manager and the pools.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use ember_config::{Config, SchedulerConfig};
use ember_core::SceneNode;
use ember_lod::{LodTarget, LodTier, ShadowMode, Visual};
use ember_pool::{PoolCategory, Poolable, prototype};
use ember_runtime::Runtime;
use ember_sched::{UpdatePriority, UpdateScheduler};
use glam::{Quat, Vec3};

const DT: f64 = 1.0 / 60.0;

#[derive(Debug, Default)]
struct Spark {
    lit: bool,
}

impl Poolable for Spark {
    fn on_spawn(&mut self) {
        self.lit = true;
    }

    fn on_return(&mut self) {
        self.lit = false;
    }
}

#[derive(Default)]
struct Body {
    visible: bool,
    shadows: Option<ShadowMode>,
}

impl Visual for Body {
    fn set_visible(&mut self, visible: bool) {
        self.visible = visible;
    }

    fn set_shadow_mode(&mut self, mode: ShadowMode) {
        self.shadows = Some(mode);
    }
}

fn config() -> Config {
    let mut config = Config::default();
    config.scheduler.seed = Some(1234);
    config
}

fn run_frames<T: Poolable>(runtime: &mut Runtime<T>, frames: usize) {
    for _ in 0..frames {
        runtime.frame(DT);
    }
}

/// A three-instance pool without growth refuses the fourth spawn.
#[test]
fn test_spark_pool_exhaustion() {
    let mut runtime: Runtime<Spark> = Runtime::new(&config());
    let pools = runtime.pools_mut();
    pools
        .create_pool("Spark", Some(prototype(Spark::default)), 3, 3, false)
        .unwrap();

    let spawned: Vec<_> = (0..3)
        .map(|_| pools.spawn("Spark", Vec3::ZERO, Quat::IDENTITY, None))
        .collect();
    assert!(spawned.iter().all(Option::is_some));
    assert_eq!(pools.pool_stats("Spark").unwrap().available, 0);

    assert!(pools.spawn("Spark", Vec3::ZERO, Quat::IDENTITY, None).is_none());
    assert_eq!(pools.pool_stats("Spark").unwrap().total_created, 3);
}

/// Distance 5 is Lod0, 40 is Lod2, 500 is Culled and hidden.
#[test]
fn test_entity_tier_follows_viewer_distance() {
    let mut runtime: Runtime<Spark> = Runtime::new(&config());
    let viewer = SceneNode::at(Vec3::ZERO);
    runtime.set_viewer(Some(viewer.downgrade()));

    let node = SceneNode::at(Vec3::new(5.0, 0.0, 0.0));
    let body = Rc::new(RefCell::new(Body::default()));
    let id = runtime
        .lod()
        .borrow_mut()
        .register_entity(LodTarget::new(node.downgrade()).with_visual(&body), None);
    assert_eq!(runtime.lod().borrow().get_entity_tier(id), Some(LodTier::Lod0));
    assert!(body.borrow().visible);

    node.set_position(Vec3::new(0.0, 0.0, 40.0));
    run_frames(&mut runtime, 30);
    assert_eq!(runtime.lod().borrow().get_entity_tier(id), Some(LodTier::Lod2));
    assert_eq!(body.borrow().shadows, Some(ShadowMode::ShadowOnly));

    node.set_position(Vec3::new(500.0, 0.0, 0.0));
    run_frames(&mut runtime, 30);
    assert_eq!(runtime.lod().borrow().get_entity_tier(id), Some(LodTier::Culled));
    assert!(!body.borrow().visible);
}

/// Budget 1: Critical "A" runs first, Low "B" on the next pass.
#[test]
fn test_critical_before_low_with_budget_of_one() {
    let config = SchedulerConfig {
        max_updates_per_frame: 1,
        ..SchedulerConfig::default()
    };
    let mut scheduler = UpdateScheduler::with_seed(&config, 5);
    let order = Rc::new(RefCell::new(Vec::new()));
    for (tag, priority) in [("B", UpdatePriority::Low), ("A", UpdatePriority::Critical)] {
        let order = Rc::clone(&order);
        scheduler.schedule(
            move || {
                order.borrow_mut().push(tag);
                Ok(())
            },
            1.0,
            priority,
            None,
            tag,
        );
    }

    scheduler.tick(1.0, DT);
    assert_eq!(*order.borrow(), vec!["A"]);
    scheduler.tick(1.0 + DT, DT);
    assert_eq!(*order.borrow(), vec!["A", "B"]);
}

/// Timed effects go back to their pool once their lifetime passes.
#[test]
fn test_timed_effect_returns_to_pool() {
    let mut runtime: Runtime<Spark> = Runtime::new(&config());
    runtime.pools_mut().register_category_prototype(
        PoolCategory::Effect,
        "Spark",
        prototype(Spark::default),
    );

    let spark = runtime
        .pools_mut()
        .spawn_effect("Spark", Vec3::ONE, 0.5)
        .unwrap();
    assert!(runtime.pools().get(spark).unwrap().lit);

    run_frames(&mut runtime, 20);
    assert!(runtime.pools().is_active(spark));
    run_frames(&mut runtime, 20);
    assert!(!runtime.pools().is_active(spark));
    assert!(!runtime.pools().get(spark).unwrap().lit);

    let stats = runtime.pools().pool_stats("effect/Spark").unwrap();
    assert_eq!(stats.available + stats.active, stats.total_created);
}

/// A receding entity's own logic runs less often.
#[test]
fn test_far_entity_logic_is_throttled() {
    let mut runtime: Runtime<Spark> = Runtime::new(&config());
    let viewer = SceneNode::at(Vec3::ZERO);
    runtime.set_viewer(Some(viewer.downgrade()));

    let node = SceneNode::at(Vec3::new(2.0, 0.0, 0.0));
    let runs = Rc::new(Cell::new(0u32));
    let counter = Rc::clone(&runs);
    let work = runtime.scheduler_mut().schedule(
        move || {
            counter.set(counter.get() + 1);
            Ok(())
        },
        0.1,
        UpdatePriority::High,
        Some(node.downgrade()),
        "agent-brain",
    );
    runtime.lod().borrow_mut().register_entity(
        LodTarget::new(node.downgrade()).with_logic(work, 0.1, UpdatePriority::High),
        None,
    );

    run_frames(&mut runtime, 60);
    let near_runs = runs.get();
    assert!(near_runs >= 8, "near logic ran {near_runs} times");

    node.set_position(Vec3::new(120.0, 0.0, 0.0));
    run_frames(&mut runtime, 30);
    let info = runtime.scheduler().info(work).unwrap();
    assert!((info.interval - 0.8).abs() < 1e-9);
    assert_eq!(info.priority, UpdatePriority::Low);

    runs.set(0);
    run_frames(&mut runtime, 60);
    assert!(runs.get() <= 2, "far logic ran {} times", runs.get());
}

/// Dropping an anchored node purges its work and its LOD entry.
#[test]
fn test_vanished_entity_is_purged_everywhere() {
    let mut runtime: Runtime<Spark> = Runtime::new(&config());
    let viewer = SceneNode::at(Vec3::ZERO);
    runtime.set_viewer(Some(viewer.downgrade()));

    let node = SceneNode::at(Vec3::new(3.0, 0.0, 0.0));
    let work = runtime.scheduler_mut().schedule(
        || Ok(()),
        0.2,
        UpdatePriority::Normal,
        Some(node.downgrade()),
        "doomed",
    );
    let id = runtime
        .lod()
        .borrow_mut()
        .register_entity(LodTarget::new(node.downgrade()), None);

    drop(node);
    run_frames(&mut runtime, 30);
    assert!(!runtime.scheduler().contains(work));
    assert_eq!(runtime.lod().borrow().get_entity_tier(id), None);
    assert!(runtime.lod().borrow().is_empty());
}

/// Two runtimes share nothing.
#[test]
fn test_runtimes_are_isolated() {
    let mut a: Runtime<Spark> = Runtime::new(&config());
    let b: Runtime<Spark> = Runtime::new(&config());
    a.pools_mut()
        .create_pool("Spark", Some(prototype(Spark::default)), 1, 1, false)
        .unwrap();
    a.scheduler_mut()
        .schedule(|| Ok(()), 1.0, UpdatePriority::Low, None, "only-in-a");

    assert!(b.pools().pool_stats("Spark").is_none());
    assert_eq!(a.scheduler().len(), 2);
    assert_eq!(b.scheduler().len(), 1);
}

#[test]
fn test_stats_snapshot_reports_every_service() {
    let mut runtime: Runtime<Spark> = Runtime::new(&config());
    let viewer = SceneNode::at(Vec3::ZERO);
    runtime.set_viewer(Some(viewer.downgrade()));
    let nodes: Vec<SceneNode> = [5.0, 40.0, 500.0]
        .into_iter()
        .map(|x| SceneNode::at(Vec3::new(x, 0.0, 0.0)))
        .collect();
    for node in &nodes {
        runtime
            .lod()
            .borrow_mut()
            .register_entity(LodTarget::new(node.downgrade()), None);
    }
    runtime
        .pools_mut()
        .create_pool("Spark", Some(prototype(Spark::default)), 2, 4, true)
        .unwrap();
    runtime
        .pools_mut()
        .spawn("Spark", Vec3::ZERO, Quat::IDENTITY, None)
        .unwrap();

    run_frames(&mut runtime, 90);
    let stats = runtime.stats();
    assert_eq!(stats.frame, 90);
    assert_eq!(stats.lod.entities, 3);
    assert_eq!(stats.lod.count(LodTier::Lod0), 1);
    assert_eq!(stats.lod.count(LodTier::Lod2), 1);
    assert_eq!(stats.lod.count(LodTier::Culled), 1);
    assert_eq!(stats.pooled_active(), 1);
    assert!(stats.to_string().contains("Spark=1/2"));
}
