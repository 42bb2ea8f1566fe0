//! The LOD manager: round-robin tier evaluation and diffed tier effects.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use ember_config::LodConfig;
use ember_core::{FrameClock, NodeRef};
use ember_sched::{SchedulerHandle, UpdatePriority, UpdateScheduler, WorkError, WorkId};
use glam::Vec3;
use slotmap::SlotMap;
use tracing::{debug, info, trace, warn};

use crate::components::{LodTarget, with_component};
use crate::effects::TierEffects;
use crate::error::LodError;
use crate::selector::{LodThresholds, select_tier_with_hysteresis};
use crate::settings::LodSettings;
use crate::tier::LodTier;

slotmap::new_key_type! {
    /// Handle of a registered LOD entity.
    pub struct LodEntityId;
}

/// Tier counts, refreshed on the stats cadence.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LodStats {
    /// Entities per tier, indexed by [`LodTier::index`].
    pub per_tier: [usize; LodTier::COUNT],
    /// Entities not evaluated yet (no viewer so far).
    pub unevaluated: usize,
    /// Tier changes since the manager was created.
    pub total_transitions: u64,
    /// Registered entities.
    pub entities: usize,
}

impl LodStats {
    /// Entities currently at `tier`.
    pub fn count(&self, tier: LodTier) -> usize {
        self.per_tier[tier.index()]
    }
}

/// Outcome of one [`LodManager::update_pass`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PassReport {
    /// Entities evaluated.
    pub evaluated: usize,
    /// Entities whose tier changed.
    pub transitions: usize,
    /// Entities purged because their node was gone.
    pub purged: usize,
}

struct LodEntity {
    target: LodTarget,
    settings: LodSettings,
    /// Last bias-adjusted distance.
    distance: f32,
    /// Tier whose effects are applied.
    current: Option<LodTier>,
    /// Tier picked by the last evaluation.
    target_tier: Option<LodTier>,
    forced: Option<LodTier>,
    last_transition: f64,
}

enum Evaluation {
    Unchanged,
    Changed,
    Gone,
}

/// Assigns quality tiers to registered entities by distance to a viewer.
///
/// Each [`update_pass`](Self::update_pass) evaluates at most
/// `entities_per_pass` entities, continuing round-robin where the previous
/// pass stopped. Effects are applied only when an entity's tier changes, in
/// this order: visibility, animation, audio, particles, shadows, logic
/// throttling, then the entity's own callback. Within a transition, only the
/// effects that differ between the two tiers are touched.
///
/// The manager is meant to run as scheduled work; see
/// [`schedule_on`](Self::schedule_on).
pub struct LodManager {
    thresholds: LodThresholds,
    default_settings: LodSettings,
    entities_per_pass: usize,
    stats_interval: f64,
    hysteresis: f32,
    entities: SlotMap<LodEntityId, LodEntity>,
    /// Round-robin order.
    order: Vec<LodEntityId>,
    cursor: usize,
    viewer: Option<NodeRef>,
    clock: FrameClock,
    scheduler: Option<SchedulerHandle>,
    stats: LodStats,
    last_stats: Option<f64>,
    total_transitions: u64,
}

impl LodManager {
    /// Create a manager from config. Invalid configured thresholds fall back
    /// to the defaults with a warning.
    pub fn new(config: &LodConfig, clock: FrameClock) -> Self {
        let thresholds = LodThresholds::new(config.thresholds.clone()).unwrap_or_else(|err| {
            warn!("{err}; using default LOD thresholds");
            LodThresholds::default()
        });
        Self {
            thresholds,
            default_settings: LodSettings::from_config(config),
            entities_per_pass: config.entities_per_pass.max(1),
            stats_interval: config.stats_interval,
            hysteresis: config.hysteresis.max(0.0),
            entities: SlotMap::with_key(),
            order: Vec::new(),
            cursor: 0,
            viewer: None,
            clock,
            scheduler: None,
            stats: LodStats::default(),
            last_stats: None,
            total_transitions: 0,
        }
    }

    /// Route logic throttling through `handle`.
    pub fn with_scheduler(mut self, handle: SchedulerHandle) -> Self {
        self.scheduler = Some(handle);
        self
    }

    /// Register the update pass on `scheduler` as recurring work and route
    /// logic throttling through it.
    ///
    /// The work holds the manager weakly: once the manager is dropped the
    /// work unschedules itself. A pass that finds the manager borrowed
    /// reports [`WorkError::Busy`] and tries again next interval.
    pub fn schedule_on(
        this: &Rc<RefCell<LodManager>>,
        scheduler: &mut UpdateScheduler,
        interval: f64,
        priority: UpdatePriority,
    ) -> WorkId {
        let handle = scheduler.handle();
        this.borrow_mut().scheduler = Some(handle.clone());

        let manager = Rc::downgrade(this);
        let own_id: Rc<Cell<Option<WorkId>>> = Rc::new(Cell::new(None));
        let own_id_in_work = Rc::clone(&own_id);
        let id = scheduler.schedule(
            move || {
                let Some(manager) = manager.upgrade() else {
                    if let Some(id) = own_id_in_work.take() {
                        handle.unschedule(id);
                    }
                    return Ok(());
                };
                let Ok(mut manager) = manager.try_borrow_mut() else {
                    return Err(WorkError::Busy);
                };
                manager.update_pass();
                Ok(())
            },
            interval,
            priority,
            None,
            "lod-pass",
        );
        own_id.set(Some(id));
        id
    }

    /// Register an entity. `None` settings use the configured defaults.
    ///
    /// The entity is evaluated immediately when a viewer is set.
    pub fn register_entity(&mut self, target: LodTarget, settings: Option<LodSettings>) -> LodEntityId {
        let settings = settings.unwrap_or(self.default_settings);
        let id = self.entities.insert(LodEntity {
            target,
            settings,
            distance: f32::INFINITY,
            current: None,
            target_tier: None,
            forced: None,
            last_transition: self.clock.now(),
        });
        self.order.push(id);
        self.refresh(id);
        id
    }

    /// Remove an entity. Returns `false` if it is unknown.
    pub fn unregister_entity(&mut self, id: LodEntityId) -> bool {
        if self.entities.remove(id).is_none() {
            return false;
        }
        self.remove_from_order(id);
        true
    }

    /// Replace an entity's settings and re-evaluate it.
    ///
    /// A new particle budget reaches the emitter even when the tier holds.
    pub fn set_entity_settings(&mut self, id: LodEntityId, settings: LodSettings) -> Result<(), LodError> {
        let entity = self.entities.get_mut(id).ok_or_else(|| unknown(id))?;
        let previous_budget = entity.settings.particle_budget;
        let previous_tier = entity.current;
        entity.settings = settings;
        self.refresh(id);

        if let Some(entity) = self.entities.get(id)
            && let Some(tier) = entity.current
            && previous_tier == Some(tier)
            && previous_budget != settings.particle_budget
        {
            let effects = TierEffects::for_tier(tier);
            let cap = effects.particle_cap(settings.particle_budget);
            with_component(&entity.target.particles, |particles| {
                particles.set_particles(effects.particles_enabled(), cap);
            });
        }
        Ok(())
    }

    /// Pin an entity to `tier`, or release the pin with `None`.
    ///
    /// The pin persists across passes and is applied immediately.
    pub fn force_entity_tier(&mut self, id: LodEntityId, tier: Option<LodTier>) -> Result<(), LodError> {
        let entity = self.entities.get_mut(id).ok_or_else(|| unknown(id))?;
        entity.forced = tier;
        self.refresh(id);
        Ok(())
    }

    /// Tier whose effects are currently applied; `None` before the first
    /// evaluation or for unknown entities.
    pub fn get_entity_tier(&self, id: LodEntityId) -> Option<LodTier> {
        self.entities.get(id).and_then(|entity| entity.current)
    }

    /// Tier picked by the entity's last evaluation.
    pub fn target_tier(&self, id: LodEntityId) -> Option<LodTier> {
        self.entities.get(id).and_then(|entity| entity.target_tier)
    }

    /// Last bias-adjusted distance of an entity.
    pub fn entity_distance(&self, id: LodEntityId) -> Option<f32> {
        self.entities.get(id).map(|entity| entity.distance)
    }

    /// Time of an entity's last tier change (or registration).
    pub fn last_transition_time(&self, id: LodEntityId) -> Option<f64> {
        self.entities.get(id).map(|entity| entity.last_transition)
    }

    /// Replace the global thresholds. Tiers follow on subsequent passes.
    pub fn set_distance_thresholds(&mut self, thresholds: Vec<f32>) -> Result<(), LodError> {
        match LodThresholds::new(thresholds) {
            Ok(thresholds) => {
                info!("LOD thresholds set to {:?}", thresholds.as_slice());
                self.thresholds = thresholds;
                Ok(())
            }
            Err(err) => {
                warn!("{err}");
                Err(err)
            }
        }
    }

    /// Current thresholds.
    pub fn thresholds(&self) -> &LodThresholds {
        &self.thresholds
    }

    /// Set the reference distances are measured from.
    pub fn set_viewer_reference(&mut self, viewer: Option<NodeRef>) {
        self.viewer = viewer;
    }

    /// Change the degrading-transition margin. Zero disables hysteresis.
    pub fn set_hysteresis(&mut self, margin: f32) {
        self.hysteresis = margin.max(0.0);
    }

    /// Registered entities.
    pub fn len(&self) -> usize {
        self.entities.len()
    }

    /// Whether nothing is registered.
    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    /// Last aggregated stats.
    pub fn stats(&self) -> LodStats {
        self.stats
    }

    /// Evaluate the next slice of entities.
    ///
    /// Does nothing while the viewer is unset or gone. Entities whose node
    /// is gone are purged.
    pub fn update_pass(&mut self) -> PassReport {
        let mut report = PassReport::default();
        let Some(viewer) = self.viewer.as_ref().and_then(NodeRef::position) else {
            trace!("LOD pass skipped: no viewer");
            self.maybe_refresh_stats();
            return report;
        };

        let slice = self.entities_per_pass.min(self.order.len());
        for _ in 0..slice {
            if self.order.is_empty() {
                break;
            }
            if self.cursor >= self.order.len() {
                self.cursor = 0;
            }
            let id = self.order[self.cursor];
            match self.evaluate(id, viewer) {
                Evaluation::Gone => {
                    self.entities.remove(id);
                    self.order.remove(self.cursor);
                    report.purged += 1;
                }
                outcome => {
                    if matches!(outcome, Evaluation::Changed) {
                        report.transitions += 1;
                    }
                    report.evaluated += 1;
                    self.cursor += 1;
                }
            }
        }

        if report.purged > 0 {
            debug!("LOD pass purged {} vanished entities", report.purged);
        }
        self.maybe_refresh_stats();
        report
    }

    /// Recount tiers now, regardless of cadence.
    pub fn refresh_stats(&mut self) -> LodStats {
        let mut stats = LodStats {
            total_transitions: self.total_transitions,
            entities: self.entities.len(),
            ..LodStats::default()
        };
        for entity in self.entities.values() {
            match entity.current {
                Some(tier) => stats.per_tier[tier.index()] += 1,
                None => stats.unevaluated += 1,
            }
        }
        self.stats = stats;
        self.last_stats = Some(self.clock.now());
        stats
    }

    fn maybe_refresh_stats(&mut self) {
        let now = self.clock.now();
        let due = self
            .last_stats
            .is_none_or(|last| now - last >= self.stats_interval);
        if due {
            self.refresh_stats();
        }
    }

    /// Re-evaluate one entity outside the round-robin, e.g. after its
    /// settings or pin changed.
    fn refresh(&mut self, id: LodEntityId) {
        let viewer = self.viewer.as_ref().and_then(NodeRef::position);
        let forced = self.entities.get(id).and_then(|entity| entity.forced);
        match (viewer, forced) {
            (Some(viewer), _) => {
                if let Evaluation::Gone = self.evaluate(id, viewer) {
                    self.entities.remove(id);
                    self.remove_from_order(id);
                }
            }
            (None, Some(tier)) => self.transition(id, tier),
            (None, None) => {}
        }
    }

    fn evaluate(&mut self, id: LodEntityId, viewer: Vec3) -> Evaluation {
        let Some(entity) = self.entities.get_mut(id) else {
            return Evaluation::Gone;
        };
        let Some(position) = entity.target.node.position() else {
            return Evaluation::Gone;
        };

        entity.distance = viewer.distance(position) * entity.settings.bias;
        let tier = entity.forced.unwrap_or_else(|| {
            select_tier_with_hysteresis(
                entity.distance,
                entity.current,
                &self.thresholds,
                &entity.settings,
                self.hysteresis,
            )
        });
        entity.target_tier = Some(tier);
        if entity.current == Some(tier) {
            return Evaluation::Unchanged;
        }
        self.transition(id, tier);
        Evaluation::Changed
    }

    fn transition(&mut self, id: LodEntityId, to: LodTier) {
        let Some(entity) = self.entities.get_mut(id) else {
            return;
        };
        let from = entity.current;
        if from == Some(to) {
            return;
        }

        apply_effects(entity, from, to, self.scheduler.as_ref());
        entity.current = Some(to);
        entity.target_tier = Some(to);
        entity.last_transition = self.clock.now();
        self.total_transitions += 1;
        trace!("LOD entity {id:?}: {from:?} -> {to}");

        if let Some(callback) = entity.target.on_tier_changed.as_mut() {
            callback(from, to);
        }
    }

    fn remove_from_order(&mut self, id: LodEntityId) {
        if let Some(index) = self.order.iter().position(|&other| other == id) {
            self.order.remove(index);
            if index < self.cursor {
                self.cursor -= 1;
            }
        }
    }
}

/// Push the effects of `to` into the entity's components, touching only
/// what differs from `from`.
fn apply_effects(
    entity: &LodEntity,
    from: Option<LodTier>,
    to: LodTier,
    scheduler: Option<&SchedulerHandle>,
) {
    let new = TierEffects::for_tier(to);
    let old = from.map(TierEffects::for_tier);
    let changed = |differs: fn(&TierEffects, &TierEffects) -> bool| {
        old.as_ref().is_none_or(|old| differs(old, &new))
    };
    let target = &entity.target;

    if changed(|a, b| a.visible != b.visible) {
        with_component(&target.visual, |visual| visual.set_visible(new.visible));
    }
    if changed(|a, b| a.animation != b.animation) {
        with_component(&target.animator, |animator| {
            animator.set_animation_mode(new.animation);
        });
    }
    if changed(|a, b| a.audio_enabled != b.audio_enabled || a.audio_volume != b.audio_volume) {
        with_component(&target.audio, |audio| {
            audio.set_audio(new.audio_enabled, new.audio_volume);
        });
    }
    if changed(|a, b| a.particle_fraction != b.particle_fraction) {
        let cap = new.particle_cap(entity.settings.particle_budget);
        with_component(&target.particles, |particles| {
            particles.set_particles(new.particles_enabled(), cap);
        });
    }
    if changed(|a, b| a.shadows != b.shadows) {
        with_component(&target.visual, |visual| visual.set_shadow_mode(new.shadows));
    }

    if let Some(logic) = target.logic
        && changed(|a, b| {
            a.logic_interval_scale != b.logic_interval_scale || a.logic_demotion != b.logic_demotion
        })
    {
        match scheduler {
            Some(handle) => {
                handle.set_interval(logic.work, logic.base_interval * new.logic_interval_scale);
                handle.set_priority(logic.work, logic.base_priority.demoted(new.logic_demotion));
            }
            None => debug!("LOD logic throttle for {} ignored: no scheduler", logic.work),
        }
    }
}

fn unknown(id: LodEntityId) -> LodError {
    let err = LodError::UnknownEntity(id);
    warn!("{err}");
    err
}
