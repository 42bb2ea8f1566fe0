//! Host-owned scene nodes and the weak references services keep to them.
//!
//! The scheduler (work anchors), the LOD manager (managed entities, viewer)
//! never own the objects they observe. They hold a [`NodeRef`], and a node
//! whose owner has dropped it reads back as `None`. That is how stale
//! registrations are detected lazily and purged.

use std::cell::RefCell;
use std::rc::{Rc, Weak};

use glam::Vec3;

use crate::Transform;

/// A strong, shared handle to a world object's transform.
///
/// Cloning shares the same node. The node lives while at least one
/// `SceneNode` exists.
#[derive(Clone, Debug, Default)]
pub struct SceneNode(Rc<RefCell<Transform>>);

impl SceneNode {
    /// Creates a node with the given transform.
    pub fn new(transform: Transform) -> Self {
        Self(Rc::new(RefCell::new(transform)))
    }

    /// Creates a node at `position` with identity rotation and scale.
    pub fn at(position: Vec3) -> Self {
        Self::new(Transform::from_position(position))
    }

    /// Current world position.
    pub fn position(&self) -> Vec3 {
        self.0.borrow().position
    }

    /// Moves the node.
    pub fn set_position(&self, position: Vec3) {
        self.0.borrow_mut().position = position;
    }

    /// Copy of the full transform.
    pub fn transform(&self) -> Transform {
        *self.0.borrow()
    }

    /// Replaces the full transform.
    pub fn set_transform(&self, transform: Transform) {
        *self.0.borrow_mut() = transform;
    }

    /// Weak reference for observers that must not keep the node alive.
    pub fn downgrade(&self) -> NodeRef {
        NodeRef(Rc::downgrade(&self.0))
    }
}

/// Non-owning reference to a [`SceneNode`].
#[derive(Clone, Debug, Default)]
pub struct NodeRef(Weak<RefCell<Transform>>);

impl NodeRef {
    /// A reference that never resolves. Useful in tests and as a placeholder.
    pub fn dangling() -> Self {
        Self(Weak::new())
    }

    /// Position of the referenced node, or `None` once it has been dropped.
    pub fn position(&self) -> Option<Vec3> {
        self.0.upgrade().map(|node| node.borrow().position)
    }

    /// Whether the referenced node still exists.
    pub fn is_alive(&self) -> bool {
        self.0.strong_count() > 0
    }
}

impl From<&SceneNode> for NodeRef {
    fn from(node: &SceneNode) -> Self {
        node.downgrade()
    }
}

/// Opaque identifier of a host-side parent object (a scene container, a UI
/// canvas, an actor's attachment point).
///
/// Pooled instances are parented under their pool's container while idle.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ParentId(pub u64);
