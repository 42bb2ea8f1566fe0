//! Pooled instance types: the lifecycle hooks, prototypes and handles.

use std::rc::Rc;

use ember_core::{ParentId, Transform};

use crate::pool::PoolId;

slotmap::new_key_type! {
    /// Stable handle to one pooled instance.
    ///
    /// The handle stays the same across spawn/release cycles of the same
    /// instance and becomes invalid once the instance is destroyed (by
    /// cleanup or pool destruction).
    pub struct InstanceHandle;
}

/// Lifecycle hooks for objects that live in a pool.
///
/// Both hooks default to no-ops.
pub trait Poolable {
    /// Called when the instance is handed out by a spawn.
    fn on_spawn(&mut self) {}

    /// Called when the instance goes back to the idle queue, including when
    /// it is forcibly reclaimed or its pool is destroyed.
    fn on_return(&mut self) {}
}

/// Produces fresh instances for a pool.
pub trait Prototype<T> {
    /// Builds one new instance.
    fn instantiate(&self) -> T;
}

impl<T, F> Prototype<T> for F
where
    F: Fn() -> T,
{
    fn instantiate(&self) -> T {
        self()
    }
}

/// Shared prototype reference as stored by pools and the lazy-creation registry.
pub type PrototypeRef<T> = Rc<dyn Prototype<T>>;

/// Wraps a factory closure as a [`PrototypeRef`].
pub fn prototype<T, F>(factory: F) -> PrototypeRef<T>
where
    F: Fn() -> T + 'static,
{
    Rc::new(factory)
}

/// One instance and the pool-managed state around it.
#[derive(Debug)]
pub struct PooledInstance<T> {
    pub(crate) object: T,
    pub(crate) pool: PoolId,
    pub(crate) transform: Transform,
    pub(crate) parent: ParentId,
    pub(crate) active: bool,
    /// Monotonic spawn order; lowest active value is reclaimed first.
    pub(crate) spawn_seq: u64,
}

impl<T> PooledInstance<T> {
    pub(crate) fn new(object: T, pool: PoolId, parent: ParentId) -> Self {
        Self {
            object,
            pool,
            transform: Transform::IDENTITY,
            parent,
            active: false,
            spawn_seq: 0,
        }
    }

    /// The pooled object.
    pub fn object(&self) -> &T {
        &self.object
    }

    /// Mutable access to the pooled object.
    pub fn object_mut(&mut self) -> &mut T {
        &mut self.object
    }

    /// Current transform. Identity while idle.
    pub fn transform(&self) -> &Transform {
        &self.transform
    }

    /// Mutable transform, for hosts that move active instances.
    pub fn transform_mut(&mut self) -> &mut Transform {
        &mut self.transform
    }

    /// Current parent: the spawn parent while active, the pool container while idle.
    pub fn parent(&self) -> ParentId {
        self.parent
    }

    /// Whether the instance is currently handed out.
    pub fn is_active(&self) -> bool {
        self.active
    }
}
