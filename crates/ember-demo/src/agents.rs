//! Wandering agents that exercise the scheduler, LOD and pools together.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use ember_core::{FrameClock, SceneNode};
use ember_lod::{AnimationMode, Animator, LodEntityId, LodTarget, LodTier, ShadowMode, Visual};
use ember_pool::Poolable;
use ember_runtime::Runtime;
use ember_sched::{UpdatePriority, WorkError, WorkId};
use glam::Vec3;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use tracing::debug;

/// Base interval of an agent's brain at full fidelity.
const THINK_INTERVAL: f64 = 0.1;
/// Walking speed in meters per second.
const SPEED: f32 = 4.0;
/// Chance per think that an agent kicks up a spark.
const SPARK_CHANCE: f32 = 0.02;
/// Lifetime of a spark effect in seconds.
pub const SPARK_LIFETIME: f64 = 0.75;

/// Pooled spark effect.
#[derive(Debug, Default)]
pub struct Effect {
    burning: bool,
    bursts: u32,
}

impl Effect {
    /// Whether the effect is currently playing.
    pub fn is_burning(&self) -> bool {
        self.burning
    }

    /// How many times this instance has been played.
    pub fn bursts(&self) -> u32 {
        self.bursts
    }
}

impl Poolable for Effect {
    fn on_spawn(&mut self) {
        self.burning = true;
        self.bursts += 1;
    }

    fn on_return(&mut self) {
        self.burning = false;
    }
}

/// Stand-in for an agent's renderer and animation controller.
#[derive(Debug)]
struct Body {
    visible: bool,
    shadows: ShadowMode,
    animation: AnimationMode,
}

impl Default for Body {
    fn default() -> Self {
        Self {
            visible: true,
            shadows: ShadowMode::Full,
            animation: AnimationMode::Full,
        }
    }
}

impl Visual for Body {
    fn set_visible(&mut self, visible: bool) {
        self.visible = visible;
    }

    fn set_shadow_mode(&mut self, mode: ShadowMode) {
        self.shadows = mode;
    }
}

impl Animator for Body {
    fn set_animation_mode(&mut self, mode: AnimationMode) {
        self.animation = mode;
    }
}

struct Agent {
    node: SceneNode,
    body: Rc<RefCell<Body>>,
    work: WorkId,
    lod: LodEntityId,
}

/// All agents plus the spark requests their brains raise.
pub struct Swarm {
    agents: Vec<Agent>,
    sparks: Rc<RefCell<Vec<Vec3>>>,
    transitions: Rc<Cell<u64>>,
}

impl Swarm {
    /// Scatter `count` agents within `radius` of the origin and register
    /// their brains and LOD targets with `runtime`.
    pub fn spawn(runtime: &mut Runtime<Effect>, count: usize, radius: f32, rng: &mut ChaCha8Rng) -> Self {
        let sparks = Rc::new(RefCell::new(Vec::new()));
        let transitions = Rc::new(Cell::new(0));
        let clock = runtime.clock().clone();

        let agents = (0..count)
            .map(|index| {
                let position = random_heading(rng) * radius * rng.random::<f32>().sqrt();
                let node = SceneNode::at(position);
                let body = Rc::new(RefCell::new(Body::default()));
                let brain = brain(
                    node.clone(),
                    radius,
                    clock.clone(),
                    ChaCha8Rng::seed_from_u64(rng.random()),
                    Rc::clone(&sparks),
                );
                let work = runtime.scheduler_mut().schedule(
                    brain,
                    THINK_INTERVAL,
                    UpdatePriority::Normal,
                    Some(node.downgrade()),
                    format!("agent-{index}"),
                );

                let counter = Rc::clone(&transitions);
                let target = LodTarget::new(node.downgrade())
                    .with_visual(&body)
                    .with_animator(&body)
                    .with_logic(work, THINK_INTERVAL, UpdatePriority::Normal)
                    .on_tier_changed(move |_, _| counter.set(counter.get() + 1));
                let lod = runtime.lod().borrow_mut().register_entity(target, None);

                Agent {
                    node,
                    body,
                    work,
                    lod,
                }
            })
            .collect::<Vec<_>>();

        debug!("Spawned {} agents within {radius}m", agents.len());
        Self {
            agents,
            sparks,
            transitions,
        }
    }

    /// Take the spark positions requested since the last call.
    pub fn drain_sparks(&self) -> Vec<Vec3> {
        std::mem::take(&mut *self.sparks.borrow_mut())
    }

    /// Number of agents.
    pub fn len(&self) -> usize {
        self.agents.len()
    }

    /// Agents whose body is currently rendered.
    pub fn visible(&self) -> usize {
        self.agents
            .iter()
            .filter(|agent| agent.body.borrow().visible)
            .count()
    }

    /// Agents still animating at some fidelity.
    pub fn animated(&self) -> usize {
        self.agents
            .iter()
            .filter(|agent| agent.body.borrow().animation != AnimationMode::Disabled)
            .count()
    }

    /// Agents casting shadows.
    pub fn shadow_casters(&self) -> usize {
        self.agents
            .iter()
            .filter(|agent| agent.body.borrow().shadows != ShadowMode::Off)
            .count()
    }

    /// Distance of the agent farthest from the origin.
    pub fn farthest(&self) -> f32 {
        self.agents
            .iter()
            .map(|agent| agent.node.position().length())
            .fold(0.0, f32::max)
    }

    /// Tier changes observed across all agents.
    pub fn transitions(&self) -> u64 {
        self.transitions.get()
    }

    /// Agents currently at `tier`.
    pub fn count_at(&self, runtime: &Runtime<Effect>, tier: LodTier) -> usize {
        let lod = runtime.lod().borrow();
        self.agents
            .iter()
            .filter(|agent| lod.get_entity_tier(agent.lod) == Some(tier))
            .count()
    }

    /// Mean think interval across agents, as retuned by LOD.
    pub fn mean_interval(&self, runtime: &Runtime<Effect>) -> f64 {
        let intervals: Vec<f64> = self
            .agents
            .iter()
            .filter_map(|agent| runtime.scheduler().info(agent.work))
            .map(|info| info.interval)
            .collect();
        if intervals.is_empty() {
            return 0.0;
        }
        intervals.iter().sum::<f64>() / intervals.len() as f64
    }
}

/// One agent's logic: walk along a heading, turn at the edge of the world,
/// and now and then ask for a spark.
fn brain(
    node: SceneNode,
    radius: f32,
    clock: FrameClock,
    mut rng: ChaCha8Rng,
    sparks: Rc<RefCell<Vec<Vec3>>>,
) -> impl FnMut() -> Result<(), WorkError> {
    let mut heading = random_heading(&mut rng);
    let mut last_think = clock.now();
    move || {
        let now = clock.now();
        let elapsed = (now - last_think) as f32;
        last_think = now;

        let mut position = node.position() + heading * SPEED * elapsed;
        if position.length() > radius {
            heading = -position.normalize_or_zero();
            position = position.clamp_length_max(radius);
        } else if rng.random::<f32>() < 0.05 {
            heading = random_heading(&mut rng);
        }
        node.set_position(position);

        if rng.random::<f32>() < SPARK_CHANCE {
            sparks.borrow_mut().push(position);
        }
        Ok(())
    }
}

fn random_heading(rng: &mut ChaCha8Rng) -> Vec3 {
    let angle = rng.random_range(0.0..std::f32::consts::TAU);
    Vec3::new(angle.cos(), 0.0, angle.sin())
}

#[cfg(test)]
mod tests {
    use super::*;
    use ember_config::Config;

    fn runtime() -> Runtime<Effect> {
        let mut config = Config::default();
        config.scheduler.seed = Some(3);
        Runtime::new(&config)
    }

    #[test]
    fn test_spawn_registers_work_and_lod() {
        let mut runtime = runtime();
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let swarm = Swarm::spawn(&mut runtime, 12, 50.0, &mut rng);

        assert_eq!(swarm.len(), 12);
        assert_eq!(runtime.scheduler().len(), 13);
        assert_eq!(runtime.lod().borrow().len(), 12);
    }

    /// Agents stay inside the world while they wander.
    #[test]
    fn test_agents_stay_within_radius() {
        let mut runtime = runtime();
        let viewer = SceneNode::at(Vec3::ZERO);
        runtime.set_viewer(Some(viewer.downgrade()));
        let mut rng = ChaCha8Rng::seed_from_u64(2);
        let swarm = Swarm::spawn(&mut runtime, 20, 30.0, &mut rng);

        for _ in 0..300 {
            runtime.frame(1.0 / 60.0);
        }
        assert!(swarm.farthest() <= 30.0 + 1e-3);
    }

    #[test]
    fn test_far_agents_are_hidden() {
        let mut runtime = runtime();
        let viewer = SceneNode::at(Vec3::new(10_000.0, 0.0, 0.0));
        runtime.set_viewer(Some(viewer.downgrade()));
        let mut rng = ChaCha8Rng::seed_from_u64(4);
        let swarm = Swarm::spawn(&mut runtime, 8, 20.0, &mut rng);

        assert_eq!(swarm.visible(), 0);
        assert_eq!(swarm.animated(), 0);
        assert_eq!(swarm.shadow_casters(), 0);
        assert_eq!(swarm.count_at(&runtime, LodTier::Culled), 8);

        // Throttle commands land on the next pass.
        runtime.frame(1.0 / 60.0);
        assert!(swarm.mean_interval(&runtime) > THINK_INTERVAL);
        assert_eq!(swarm.transitions(), 8);
    }

    #[test]
    fn test_effect_counts_bursts() {
        let mut effect = Effect::default();
        effect.on_spawn();
        effect.on_return();
        effect.on_spawn();
        assert!(effect.is_burning());
        assert_eq!(effect.bursts(), 2);
    }
}
