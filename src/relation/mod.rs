//! Space-relation algebra: a pose plus velocities and validity/tracking
//! bits, with composition chains and a time-indexed history buffer.

pub mod chain;
pub mod history;

pub use chain::RelationChain;
pub use history::{RelationHistory, RelationLookup};

use bitflags::bitflags;
use glam::Vec3;

use crate::math::{quat_integrate_velocity, quat_slerp, Pose};

bitflags! {
    /// Which components of a [`Relation`] are valid, and which of those are
    /// actively tracked. A `*_TRACKED` bit without the corresponding
    /// `*_VALID` bit is meaningless and never produced by resolution.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
    pub struct RelationFlags: u32 {
        const ORIENTATION_VALID     = 1 << 0;
        const POSITION_VALID        = 1 << 1;
        const LINEAR_VELOCITY_VALID = 1 << 2;
        const ANGULAR_VELOCITY_VALID = 1 << 3;
        const ORIENTATION_TRACKED   = 1 << 4;
        const POSITION_TRACKED      = 1 << 5;
    }
}

impl RelationFlags {
    /// Both pose-component valid bits.
    pub const POSE_VALID: RelationFlags = RelationFlags::ORIENTATION_VALID
        .union(RelationFlags::POSITION_VALID);

    /// Both pose-component tracked bits.
    pub const POSE_TRACKED: RelationFlags = RelationFlags::ORIENTATION_TRACKED
        .union(RelationFlags::POSITION_TRACKED);

    /// Both velocity valid bits.
    pub const VELOCITY_VALID: RelationFlags = RelationFlags::LINEAR_VELOCITY_VALID
        .union(RelationFlags::ANGULAR_VELOCITY_VALID);
}

/// A relation between two spaces: pose, velocities and validity flags.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Relation {
    pub flags: RelationFlags,
    pub pose: Pose,
    pub linear_velocity: Vec3,
    pub angular_velocity: Vec3,
}

impl Relation {
    /// The untracked relation: no valid components, identity pose. Returned
    /// whenever a query cannot be answered.
    pub const ZERO: Relation = Relation {
        flags: RelationFlags::empty(),
        pose: Pose::IDENTITY,
        linear_velocity: Vec3::ZERO,
        angular_velocity: Vec3::ZERO,
    };

    /// Identity relation with every flag set, the starting point for
    /// accumulating transforms onto.
    pub const IDENTITY: Relation = Relation {
        flags: RelationFlags::all(),
        pose: Pose::IDENTITY,
        linear_velocity: Vec3::ZERO,
        angular_velocity: Vec3::ZERO,
    };

    /// A velocity-less relation from a pose, with both pose components valid
    /// but not tracked.
    pub fn from_pose(pose: Pose) -> Relation {
        Relation {
            flags: RelationFlags::POSE_VALID,
            pose,
            linear_velocity: Vec3::ZERO,
            angular_velocity: Vec3::ZERO,
        }
    }

    /// True when neither pose component is valid.
    pub fn has_no_pose(&self) -> bool {
        !self.flags.intersects(RelationFlags::POSE_VALID)
    }

    /// Invert this relation. Validity flags stay the same, the pose is
    /// inverted and the velocities negated.
    pub fn invert(&self) -> Relation {
        Relation {
            flags: self.flags,
            pose: self.pose.invert(),
            linear_velocity: -self.linear_velocity,
            angular_velocity: -self.angular_velocity,
        }
    }

    /// Interpolate between `a` and `b`, slerping orientations and lerping
    /// positions and velocities. Only components named in `flags` are
    /// touched; `flags` is stored on the output.
    pub fn interpolate(a: &Relation, b: &Relation, t: f32, flags: RelationFlags) -> Relation {
        let mut out = *a;
        out.flags = flags;

        if flags.contains(RelationFlags::ORIENTATION_VALID) {
            out.pose.orientation = quat_slerp(a.pose.orientation, b.pose.orientation, t);
        }
        if flags.contains(RelationFlags::POSITION_VALID) {
            out.pose.position = a.pose.position.lerp(b.pose.position, t);
        }
        if flags.contains(RelationFlags::LINEAR_VELOCITY_VALID) {
            out.linear_velocity = a.linear_velocity.lerp(b.linear_velocity, t);
        }
        if flags.contains(RelationFlags::ANGULAR_VELOCITY_VALID) {
            out.angular_velocity = a.angular_velocity.lerp(b.angular_velocity, t);
        }
        out
    }

    /// Predict this relation `delta_s` seconds into the future (or the past,
    /// for negative values) by advancing the pose along its own velocities.
    pub fn predict(&self, delta_s: f32) -> Relation {
        let mut out = *self;

        let predict_position = self
            .flags
            .contains(RelationFlags::POSITION_VALID | RelationFlags::LINEAR_VELOCITY_VALID);
        let predict_orientation = self
            .flags
            .contains(RelationFlags::ORIENTATION_VALID | RelationFlags::ANGULAR_VELOCITY_VALID);

        if predict_position {
            out.pose.position = self.pose.position + self.linear_velocity * delta_s;
        }
        if predict_orientation {
            out.pose.orientation =
                quat_integrate_velocity(self.pose.orientation, self.angular_velocity, delta_s);
        }
        out
    }
}

impl Default for Relation {
    fn default() -> Relation {
        Relation::ZERO
    }
}
