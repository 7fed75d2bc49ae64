//! Rigid-body math kernel: poses, quaternion maps, isometry matrices.
//!
//! Backed by [`glam`]. Quaternions are stored `{x, y, z, w}` with the scalar
//! last; glam matrices are column-major, functions that document a row-major
//! contract state the transpose convention at the call site.

pub mod matrix;
pub mod quat;

pub use matrix::*;
pub use quat::*;

use glam::{Quat, Vec3};

/// A rigid-body transform: rotation followed by translation.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Pose {
    pub orientation: Quat,
    pub position: Vec3,
}

impl Pose {
    pub const IDENTITY: Pose = Pose {
        orientation: Quat::IDENTITY,
        position: Vec3::ZERO,
    };

    pub fn new(orientation: Quat, position: Vec3) -> Pose {
        Pose { orientation, position }
    }

    /// Pure translation with identity orientation.
    pub fn from_position(position: Vec3) -> Pose {
        Pose { orientation: Quat::IDENTITY, position }
    }

    /// Pure rotation with zero translation.
    pub fn from_orientation(orientation: Quat) -> Pose {
        Pose { orientation, position: Vec3::ZERO }
    }

    /// True if this pose is exactly the identity transform.
    ///
    /// Treats `-0.0` the same as `0.0` and accepts `w == -1.0`, which encodes
    /// the same rotation as the unit quaternion.
    pub fn is_identity(&self) -> bool {
        self.position.x == 0.0
            && self.position.y == 0.0
            && self.position.z == 0.0
            && self.orientation.x == 0.0
            && self.orientation.y == 0.0
            && self.orientation.z == 0.0
            && self.orientation.w.abs() == 1.0
    }

    /// Transform `pose` by `self`, i.e. express `pose` in the parent frame of
    /// `self`. Safe to call with `pose == self`.
    pub fn transform(&self, pose: &Pose) -> Pose {
        Pose {
            orientation: self.orientation * pose.orientation,
            position: self.orientation * pose.position + self.position,
        }
    }

    /// Transform a point by this pose.
    pub fn transform_point(&self, point: Vec3) -> Vec3 {
        self.orientation * point + self.position
    }

    /// Invert this pose. The orientation must be normalized, the conjugate is
    /// used as the inverse rotation.
    pub fn invert(&self) -> Pose {
        let orientation = self.orientation.conjugate();
        Pose {
            orientation,
            position: orientation * -self.position,
        }
    }

    /// Check that this pose can be used in transformation operations: all
    /// components finite and the orientation within 1% of unit length.
    pub fn validate(&self) -> bool {
        self.position.is_finite() && quat_validate_within_1_percent(self.orientation)
    }

    /// Interpolated pose between `a` and `b`: positions lerped, orientations
    /// slerped.
    pub fn interpolate(a: &Pose, b: &Pose, t: f32) -> Pose {
        Pose {
            orientation: quat_slerp(a.orientation, b.orientation, t),
            position: a.position.lerp(b.position, t),
        }
    }
}

impl Default for Pose {
    fn default() -> Pose {
        Pose::IDENTITY
    }
}

/// Check a vector for NaN/infinity. Arithmetic on invalid vectors is
/// undefined; ingestion paths reject samples that fail this.
pub fn vec3_validate(v: Vec3) -> bool {
    v.is_finite()
}

/// Unsigned angle between two vectors, in radians.
pub fn vec3_angle(a: Vec3, b: Vec3) -> f32 {
    a.angle_between(b)
}
