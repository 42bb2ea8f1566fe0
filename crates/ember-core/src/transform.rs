//! Position, orientation and scale of a world object.

use glam::{Quat, Vec3};

/// Local transform of a scene object.
///
/// Pooled instances are reset to [`Transform::IDENTITY`] when they return to
/// their pool, so a freshly spawned instance never inherits the previous
/// user's placement.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Transform {
    /// Translation in world units (meters).
    pub position: Vec3,
    /// Orientation as a unit quaternion.
    pub rotation: Quat,
    /// Per-axis scale. `Vec3::ONE` is unscaled.
    pub scale: Vec3,
}

impl Transform {
    /// Zero translation, no rotation, unit scale.
    pub const IDENTITY: Self = Self {
        position: Vec3::ZERO,
        rotation: Quat::IDENTITY,
        scale: Vec3::ONE,
    };

    /// Creates a transform at `position` with no rotation and unit scale.
    pub fn from_position(position: Vec3) -> Self {
        Self {
            position,
            ..Self::IDENTITY
        }
    }

    /// Creates a transform at `position` with the given orientation.
    pub fn from_position_rotation(position: Vec3, rotation: Quat) -> Self {
        Self {
            position,
            rotation,
            ..Self::IDENTITY
        }
    }

    /// Euclidean distance between the translations of two transforms.
    pub fn distance_to(&self, other: &Transform) -> f32 {
        self.position.distance(other.position)
    }

    /// Whether this transform equals [`Transform::IDENTITY`].
    pub fn is_identity(&self) -> bool {
        *self == Self::IDENTITY
    }
}

impl Default for Transform {
    fn default() -> Self {
        Self::IDENTITY
    }
}
