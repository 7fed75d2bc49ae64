//! Fixed-capacity chains of relations, resolved leaves-first into a single
//! relation with composed velocities.

use glam::Vec3;

use crate::math::{quat_rotate_derivative, quat_rotate_vec3, Pose};
use crate::relation::{Relation, RelationFlags};

/// The maximum number of steps in a chain. Chains are stack-allocated.
pub const RELATION_CHAIN_CAPACITY: usize = 8;

/// An ordered sequence of rigid-body transforms, leaf first. Each step's pose
/// is expressed in the frame of the step that follows it; [`resolve`]
/// flattens the whole chain into one relation.
///
/// [`resolve`]: RelationChain::resolve
#[derive(Clone, Copy, Debug, Default)]
pub struct RelationChain {
    steps: [Relation; RELATION_CHAIN_CAPACITY],
    step_count: usize,
}

impl RelationChain {
    pub fn new() -> RelationChain {
        RelationChain {
            steps: [Relation::ZERO; RELATION_CHAIN_CAPACITY],
            step_count: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.step_count
    }

    pub fn is_empty(&self) -> bool {
        self.step_count == 0
    }

    /// Reserve a step and return a mutable reference to it, or `None` when
    /// the chain is full. The step starts as [`Relation::ZERO`] and must be
    /// populated before resolving.
    pub fn reserve(&mut self) -> Option<&mut Relation> {
        if self.step_count < RELATION_CHAIN_CAPACITY {
            let step = &mut self.steps[self.step_count];
            self.step_count += 1;
            *step = Relation::ZERO;
            Some(step)
        } else {
            None
        }
    }

    /// Append a relation. Silently ignored when the chain is full.
    pub fn push_relation(&mut self, relation: &Relation) {
        if self.step_count >= RELATION_CHAIN_CAPACITY {
            log::warn!("Relation chain full, dropping step");
            return;
        }
        self.steps[self.step_count] = *relation;
        self.step_count += 1;
    }

    /// Append the inverse of a relation. Validity flags stay the same, only
    /// the pose and velocities are inverted.
    pub fn push_inverted_relation(&mut self, relation: &Relation) {
        self.push_relation(&relation.invert());
    }

    /// Append a pose as a velocity-less relation.
    pub fn push_pose(&mut self, pose: &Pose) {
        self.push_relation(&Relation::from_pose(*pose));
    }

    /// Append a pose as a velocity-less relation, skipping identity poses.
    pub fn push_pose_if_not_identity(&mut self, pose: &Pose) {
        if pose.is_identity() {
            return;
        }
        self.push_pose(pose);
    }

    /// Append the inverse of a pose, skipping identity poses.
    pub fn push_inverted_pose_if_not_identity(&mut self, pose: &Pose) {
        if pose.is_identity() {
            return;
        }
        self.push_pose(&pose.invert());
    }

    /// Flatten the chain into a single relation. The chain itself is not
    /// modified.
    ///
    /// An empty chain, or any step with neither pose component valid, yields
    /// [`Relation::ZERO`]: velocities do not propagate through a broken
    /// chain.
    pub fn resolve(&self) -> Relation {
        if self.step_count == 0 || self.has_step_with_no_pose() {
            return Relation::ZERO;
        }

        let mut r = self.steps[0];
        for step in &self.steps[1..self.step_count] {
            r = apply_relation(&r, step);
        }

        // Absorb drift accumulated over the folds.
        r.pose.orientation = r.pose.orientation.normalize();
        r
    }

    fn has_step_with_no_pose(&self) -> bool {
        self.steps[..self.step_count].iter().any(Relation::has_no_pose)
    }
}

/// Upgrade a one-sided pose to a fully valid one: missing orientation becomes
/// identity, missing position becomes zero.
fn make_valid_pose(flags: RelationFlags, pose: &Pose) -> Pose {
    Pose {
        orientation: if flags.contains(RelationFlags::ORIENTATION_VALID) {
            pose.orientation
        } else {
            glam::Quat::IDENTITY
        },
        position: if flags.contains(RelationFlags::POSITION_VALID) {
            pose.position
        } else {
            Vec3::ZERO
        },
    }
}

/// Fold one step onto the accumulated relation: `base` (the next step up the
/// chain) applied to `body` (everything resolved so far).
fn apply_relation(body: &Relation, base: &Relation) -> Relation {
    let bodyf = body.flags;
    let basef = base.flags;

    // Only valid poses take part in the fold; flags are determined below.
    let body_pose = make_valid_pose(bodyf, &body.pose);
    let base_pose = make_valid_pose(basef, &base.pose);

    let pose = base_pose.transform(&body_pose);

    let mut linear_velocity = Vec3::ZERO;
    let mut angular_velocity = Vec3::ZERO;
    let mut has_linear_velocity = false;
    let mut has_angular_velocity = false;

    if bodyf.contains(RelationFlags::LINEAR_VELOCITY_VALID) {
        has_linear_velocity = true;
        linear_velocity += quat_rotate_vec3(base_pose.orientation, body.linear_velocity);
    }

    if basef.contains(RelationFlags::LINEAR_VELOCITY_VALID) {
        has_linear_velocity = true;
        linear_velocity += base.linear_velocity;
    }

    if bodyf.contains(RelationFlags::ANGULAR_VELOCITY_VALID) {
        has_angular_velocity = true;
        angular_velocity += quat_rotate_derivative(base_pose.orientation, body.angular_velocity);
    }

    if basef.contains(RelationFlags::ANGULAR_VELOCITY_VALID) {
        has_angular_velocity = true;
        has_linear_velocity = true;
        angular_velocity += base.angular_velocity;

        // An angular velocity at the origin produces a linear velocity
        // everywhere else: the lever-arm term.
        let rotated_position = quat_rotate_vec3(base_pose.orientation, body_pose.position);
        linear_velocity += base.angular_velocity.cross(rotated_position);
    }

    // Both sides are known to carry at least one pose component; the result
    // is a fully valid pose with the missing halves upgraded to identity.
    let mut flags = RelationFlags::POSE_VALID;
    if bodyf.contains(RelationFlags::POSITION_TRACKED)
        || basef.contains(RelationFlags::POSITION_TRACKED)
    {
        flags |= RelationFlags::POSITION_TRACKED;
    }
    if bodyf.contains(RelationFlags::ORIENTATION_TRACKED)
        || basef.contains(RelationFlags::ORIENTATION_TRACKED)
    {
        flags |= RelationFlags::ORIENTATION_TRACKED;
    }
    if has_linear_velocity {
        flags |= RelationFlags::LINEAR_VELOCITY_VALID;
    }
    if has_angular_velocity {
        flags |= RelationFlags::ANGULAR_VELOCITY_VALID;
    }

    Relation {
        flags,
        pose,
        linear_velocity,
        angular_velocity,
    }
}
