//! The pool manager: named pools, spawn/release, deferred release and cleanup.

use ember_config::PoolConfig;
use ember_core::{ParentId, Transform};
use glam::{Quat, Vec3};
use rustc_hash::FxHashMap;
use slotmap::SlotMap;
use tracing::{debug, info, warn};

use crate::error::PoolError;
use crate::instance::{InstanceHandle, Poolable, PooledInstance, PrototypeRef};
use crate::pool::{Pool, PoolId, PoolStats};
use crate::timers::DeferredReleases;

/// Pool containers take parent ids counting down from here, away from the
/// low ids hosts normally hand out.
const CONTAINER_ID_BASE: u64 = u64::MAX;

/// Owns every pool, every pooled instance and the deferred-release timers.
///
/// # Spawn resolution
///
/// 1. Take the oldest idle instance.
/// 2. Otherwise, if growth is allowed and the pool is below `max_size`,
///    instantiate a new one.
/// 3. Otherwise, if growth is allowed, reclaim the active instance that was
///    spawned longest ago and hand it out again under the same handle.
/// 4. Otherwise log a warning and return `None`.
///
/// Call [`update`](Self::update) once per frame to fire expired deferred
/// releases and run the throttled idle cleanup.
pub struct PoolManager<T> {
    config: PoolConfig,
    pools: SlotMap<PoolId, Pool<T>>,
    names: FxHashMap<String, PoolId>,
    instances: SlotMap<InstanceHandle, PooledInstance<T>>,
    /// Prototypes for pools created on first spawn.
    prototypes: FxHashMap<String, PrototypeRef<T>>,
    releases: DeferredReleases,
    next_container: u64,
    spawn_seq: u64,
    now: f64,
    last_cleanup: f64,
}

impl<T: Poolable> PoolManager<T> {
    /// Create an empty manager.
    pub fn new(config: PoolConfig) -> Self {
        Self {
            config,
            pools: SlotMap::with_key(),
            names: FxHashMap::default(),
            instances: SlotMap::with_key(),
            prototypes: FxHashMap::default(),
            releases: DeferredReleases::new(),
            next_container: CONTAINER_ID_BASE,
            spawn_seq: 0,
            now: 0.0,
            last_cleanup: 0.0,
        }
    }

    /// Register a prototype so that the first spawn from `name` creates the
    /// pool with the configured default sizes.
    pub fn register_prototype(&mut self, name: impl Into<String>, prototype: PrototypeRef<T>) {
        self.prototypes.insert(name.into(), prototype);
    }

    /// Create a pool and pre-populate it with `initial_size` idle instances.
    pub fn create_pool(
        &mut self,
        name: &str,
        prototype: Option<PrototypeRef<T>>,
        initial_size: usize,
        max_size: usize,
        allow_growth: bool,
    ) -> Result<(), PoolError> {
        if self.names.contains_key(name) {
            return Err(log_error(PoolError::DuplicatePool(name.to_string())));
        }
        let Some(prototype) = prototype else {
            return Err(log_error(PoolError::MissingPrototype(name.to_string())));
        };
        if max_size == 0 || initial_size > max_size {
            return Err(log_error(PoolError::InvalidSize {
                name: name.to_string(),
                initial_size,
                max_size,
            }));
        }

        let container = self.allocate_container();
        let id = self.pools.insert(Pool::new(
            name.to_string(),
            prototype,
            container,
            max_size,
            allow_growth,
        ));
        self.names.insert(name.to_string(), id);

        for _ in 0..initial_size {
            let handle = self.instantiate(id);
            self.pools[id].available.push_back(handle);
        }

        info!(
            "Created pool `{name}` ({initial_size} idle, max {max_size}, growth {})",
            if allow_growth { "on" } else { "off" }
        );
        Ok(())
    }

    /// Hand out an instance placed at `position`/`rotation`.
    ///
    /// The instance is parented under `parent`, or under the pool container
    /// when `None`. Returns `None` (with a warning) when the pool is unknown
    /// and cannot be created lazily, or is exhausted.
    pub fn spawn(
        &mut self,
        name: &str,
        position: Vec3,
        rotation: Quat,
        parent: Option<ParentId>,
    ) -> Option<InstanceHandle> {
        let Some(id) = self.resolve_pool(name) else {
            warn!("Spawn requested from unknown pool `{name}`");
            return None;
        };
        let handle = self.acquire(id)?;

        self.spawn_seq += 1;
        let pool = &mut self.pools[id];
        let instance = &mut self.instances[handle];
        instance.transform = Transform::from_position_rotation(position, rotation);
        instance.parent = parent.unwrap_or(pool.container);
        instance.active = true;
        instance.spawn_seq = self.spawn_seq;
        instance.object.on_spawn();
        pool.mark_active(handle);
        Some(handle)
    }

    /// Return an active instance to its pool.
    ///
    /// Runs `on_return`, resets the transform to identity, re-parents the
    /// instance under the pool container and disarms any deferred release.
    /// Returns `false` without side effects if the instance is not active.
    pub fn release(&mut self, handle: InstanceHandle) -> bool {
        let Some(instance) = self.instances.get_mut(handle) else {
            return false;
        };
        if !instance.active {
            return false;
        }
        let Some(pool) = self.pools.get_mut(instance.pool) else {
            return false;
        };
        if !pool.active.remove(&handle) {
            return false;
        }

        self.releases.cancel(handle);
        instance.object.on_return();
        instance.transform = Transform::IDENTITY;
        instance.active = false;
        instance.parent = pool.container;
        pool.available.push_back(handle);
        true
    }

    /// Release `handle` once `delay` seconds have passed.
    ///
    /// Releasing the instance earlier disarms the timer, so a later reuse of
    /// the same instance is never released by a stale timer. Returns `false`
    /// if the instance is not active.
    pub fn release_after(&mut self, handle: InstanceHandle, delay: f64) -> bool {
        if !self.is_active(handle) {
            debug!("Deferred release requested for an inactive instance");
            return false;
        }
        self.releases.schedule(handle, self.now + delay.max(0.0));
        true
    }

    /// Release every active instance, then destroy the pool and all its instances.
    pub fn destroy_pool(&mut self, name: &str) -> Result<(), PoolError> {
        let Some(id) = self.names.remove(name) else {
            return Err(log_error(PoolError::PoolNotFound(name.to_string())));
        };

        let active: Vec<InstanceHandle> = self.pools[id].active.iter().copied().collect();
        for handle in active {
            self.release(handle);
        }

        if let Some(pool) = self.pools.remove(id) {
            for handle in pool.available {
                self.instances.remove(handle);
            }
            info!("Destroyed pool `{name}` ({} instances)", pool.total_created);
        }
        Ok(())
    }

    /// Destroy every pool.
    pub fn destroy_all(&mut self) {
        let names: Vec<String> = self.names.keys().cloned().collect();
        for name in names {
            let _ = self.destroy_pool(&name);
        }
        self.releases.clear();
    }

    /// Advance the manager to `now`: fire expired deferred releases, then run
    /// the throttled cleanup.
    pub fn update(&mut self, now: f64) {
        self.now = now;
        for handle in self.releases.pop_due(now) {
            self.release(handle);
        }
        self.cleanup();
    }

    /// Shrink every pool's idle queue toward `max(min_retained, active)`.
    ///
    /// Runs at most once per `cleanup_interval`; calls in between return 0.
    /// Returns the number of instances destroyed.
    pub fn cleanup(&mut self) -> usize {
        if self.now - self.last_cleanup < self.config.cleanup_interval {
            return 0;
        }
        self.last_cleanup = self.now;

        let min_retained = self.config.min_retained;
        let mut destroyed = 0;
        for pool in self.pools.values_mut() {
            let keep = min_retained.max(pool.active.len());
            while pool.available.len() > keep {
                let Some(handle) = pool.available.pop_back() else {
                    break;
                };
                if self.instances.remove(handle).is_some() {
                    pool.total_created -= 1;
                    destroyed += 1;
                }
            }
        }
        if destroyed > 0 {
            debug!("Pool cleanup destroyed {destroyed} surplus idle instances");
        }
        destroyed
    }

    /// Whether a pool with this name exists.
    pub fn contains_pool(&self, name: &str) -> bool {
        self.names.contains_key(name)
    }

    /// Occupancy of one pool.
    pub fn pool_stats(&self, name: &str) -> Option<PoolStats> {
        self.names.get(name).map(|&id| self.pools[id].stats())
    }

    /// Occupancy of every pool, sorted by name.
    pub fn stats(&self) -> Vec<PoolStats> {
        let mut stats: Vec<PoolStats> = self.pools.values().map(Pool::stats).collect();
        stats.sort_by(|a, b| a.name.cmp(&b.name));
        stats
    }

    /// Total active instances across all pools.
    pub fn total_active(&self) -> usize {
        self.pools.values().map(|pool| pool.active.len()).sum()
    }

    /// Number of armed deferred releases.
    pub fn pending_releases(&self) -> usize {
        self.releases.len()
    }

    /// The pooled instance behind `handle`.
    pub fn instance(&self, handle: InstanceHandle) -> Option<&PooledInstance<T>> {
        self.instances.get(handle)
    }

    /// Mutable access to the pooled instance behind `handle`.
    pub fn instance_mut(&mut self, handle: InstanceHandle) -> Option<&mut PooledInstance<T>> {
        self.instances.get_mut(handle)
    }

    /// The pooled object behind `handle`.
    pub fn get(&self, handle: InstanceHandle) -> Option<&T> {
        self.instances.get(handle).map(PooledInstance::object)
    }

    /// Mutable access to the pooled object behind `handle`.
    pub fn get_mut(&mut self, handle: InstanceHandle) -> Option<&mut T> {
        self.instances.get_mut(handle).map(PooledInstance::object_mut)
    }

    /// Whether `handle` refers to a live, active instance.
    pub fn is_active(&self, handle: InstanceHandle) -> bool {
        self.instances.get(handle).is_some_and(|i| i.active)
    }

    /// Name of the pool that owns `handle`.
    pub fn pool_of(&self, handle: InstanceHandle) -> Option<&str> {
        let instance = self.instances.get(handle)?;
        self.pools.get(instance.pool).map(|pool| pool.name.as_str())
    }

    /// Container parent id of a pool.
    pub fn container(&self, name: &str) -> Option<ParentId> {
        self.names.get(name).map(|&id| self.pools[id].container)
    }

    /// Time of the last [`update`](Self::update).
    pub fn now(&self) -> f64 {
        self.now
    }

    fn resolve_pool(&mut self, name: &str) -> Option<PoolId> {
        if let Some(&id) = self.names.get(name) {
            return Some(id);
        }
        let prototype = self.prototypes.get(name).cloned()?;
        let PoolConfig {
            default_initial_size,
            default_max_size,
            default_allow_growth,
            ..
        } = self.config;
        self.create_pool(
            name,
            Some(prototype),
            default_initial_size,
            default_max_size,
            default_allow_growth,
        )
        .ok()?;
        self.names.get(name).copied()
    }

    fn acquire(&mut self, id: PoolId) -> Option<InstanceHandle> {
        if let Some(handle) = self.pools[id].available.pop_front() {
            return Some(handle);
        }
        if self.pools[id].can_grow() {
            return Some(self.instantiate(id));
        }
        if self.pools[id].allow_growth
            && let Some(victim) = self.oldest_active(id)
        {
            self.reclaim(victim);
            return Some(victim);
        }

        let pool = &self.pools[id];
        warn!(
            "Pool `{}` exhausted ({} active, max {}), spawn dropped",
            pool.name,
            pool.active.len(),
            pool.max_size
        );
        None
    }

    fn instantiate(&mut self, id: PoolId) -> InstanceHandle {
        let pool = &mut self.pools[id];
        let object = pool.prototype.instantiate();
        pool.total_created += 1;
        self.instances
            .insert(PooledInstance::new(object, id, pool.container))
    }

    fn oldest_active(&self, id: PoolId) -> Option<InstanceHandle> {
        self.pools[id].active.iter().copied().min_by_key(|&handle| {
            self.instances
                .get(handle)
                .map_or(u64::MAX, |instance| instance.spawn_seq)
        })
    }

    /// Take an active instance back without queuing it as idle; the caller
    /// hands it straight out again.
    fn reclaim(&mut self, handle: InstanceHandle) {
        self.releases.cancel(handle);
        let Some(instance) = self.instances.get_mut(handle) else {
            return;
        };
        let pool = &mut self.pools[instance.pool];
        pool.active.remove(&handle);
        instance.object.on_return();
        instance.transform = Transform::IDENTITY;
        instance.active = false;
        instance.parent = pool.container;
        debug!("Pool `{}` reclaimed its oldest active instance", pool.name);
    }

    fn allocate_container(&mut self) -> ParentId {
        let id = ParentId(self.next_container);
        self.next_container -= 1;
        id
    }
}

fn log_error(err: PoolError) -> PoolError {
    warn!("{err}");
    err
}
