//! Cyclic-coordinate-descent IK over the hand skeleton.
//!
//! Each solve aligns the wrist to the triangulated keypoints (translation
//! only), then repeatedly rotates every driven bone toward the mean of its
//! descendants' targets, clamping against the joint-limit table after every
//! step.

use glam::{Affine3A, Mat3, Mat3A, Quat, Vec3};

use crate::hand::skeleton::{
    clamp_rule, init_hardcoded_statics, propagate_world_poses, Bone, ClampRule,
};
use crate::hand::triangulate::triangulate_rays;
use crate::hand::{HandJoint, HandJointSet, HandObservation, NUM_KEYPOINTS};
use crate::math::Pose;
use crate::relation::{Relation, RelationFlags};

const SOLVE_ITERATIONS: usize = 15;

/// Skeletal model of one hand plus the IK solver state.
pub struct KinematicHand {
    is_right: bool,
    /// Right camera expressed in the left camera's frame.
    right_in_left: Pose,
    wrist_relation: Affine3A,
    fingers: [[Bone; 5]; 5],
    targets: [Vec3; NUM_KEYPOINTS],
}

impl KinematicHand {
    /// `left_in_right` is the stereo extrinsic (left camera in the right
    /// camera's frame); `size` the wrist-to-middle-proximal distance in
    /// meters.
    pub fn new(left_in_right: &Pose, is_right: bool, size: f32) -> KinematicHand {
        let (wrist_relation, mut fingers) = init_hardcoded_statics(size);
        propagate_world_poses(&wrist_relation, &mut fingers);
        KinematicHand {
            is_right,
            right_in_left: left_in_right.invert(),
            wrist_relation,
            fingers,
            targets: [Vec3::ZERO; NUM_KEYPOINTS],
        }
    }

    pub fn is_right(&self) -> bool {
        self.is_right
    }

    /// Solve a stereo observation: triangulate each keypoint from its two
    /// rays, then fit the skeleton.
    pub fn solve(&mut self, observation: &HandObservation) -> HandJointSet {
        let mut points = self.targets;
        for i in 0..NUM_KEYPOINTS {
            match triangulate_rays(
                observation.views[0].rays[i],
                observation.views[1].rays[i],
                &self.right_in_left,
            ) {
                Some(p) => points[i] = p,
                // Degenerate rays: keep the previous target for this point.
                None => log::debug!("Keypoint {i} rays did not intersect"),
            }
        }
        self.solve_points(&points)
    }

    /// Fit the skeleton to already-triangulated keypoints in the left-camera
    /// frame.
    pub fn solve_points(&mut self, points: &[Vec3; NUM_KEYPOINTS]) -> HandJointSet {
        // The model is always a left hand; right hands are solved mirrored
        // and mirrored back on output.
        for i in 0..NUM_KEYPOINTS {
            self.targets[i] = if self.is_right {
                Vec3::new(-points[i].x, points[i].y, points[i].z)
            } else {
                points[i]
            };
        }

        self.optimize();
        self.joint_set()
    }

    /// Model keypoint positions in the same order the targets use: wrist
    /// first, then bones 1..5 of each finger.
    fn model_keypoints(&self) -> [Vec3; NUM_KEYPOINTS] {
        let mut out = [Vec3::ZERO; NUM_KEYPOINTS];
        out[0] = self.wrist_relation.translation.into();
        for finger in 0..5 {
            for bone in 1..5 {
                let b = &self.fingers[finger][bone];
                out[b.keypoint_idx] = b.world_pose.translation.into();
            }
        }
        out
    }

    /// Rigid alignment of the model keypoints to the targets, translation
    /// only: shift the wrist by the difference of the centroids.
    fn align_wrist(&mut self) {
        let model = self.model_keypoints();

        let mut model_centroid = Vec3::ZERO;
        let mut target_centroid = Vec3::ZERO;
        for i in 0..NUM_KEYPOINTS {
            model_centroid += model[i];
            target_centroid += self.targets[i];
        }
        let shift = (target_centroid - model_centroid) / NUM_KEYPOINTS as f32;

        self.wrist_relation.translation += glam::Vec3A::from(shift);
        self.propagate();
    }

    fn propagate(&mut self) {
        propagate_world_poses(&self.wrist_relation, &mut self.fingers);
    }

    /// One CCD step: rotate the bone so its descendants' centroid chases the
    /// corresponding target centroid, both expressed in the bone's frame.
    fn ccd_bone(&mut self, finger: usize, bone_idx: usize) {
        let mut kine = Vec3::ZERO;
        let mut target = Vec3::ZERO;
        let mut num_children = 0.0f32;

        for idx in bone_idx + 1..5 {
            let child = &self.fingers[finger][idx];
            kine += Vec3::from(child.world_pose.translation);
            target += self.targets[child.keypoint_idx];
            num_children += 1.0;
        }
        kine /= num_children;
        target /= num_children;

        let bone = &mut self.fingers[finger][bone_idx];
        let to_local = bone.world_pose.inverse();
        let kine_local = to_local.transform_point3(kine).normalize_or_zero();
        let target_local = to_local.transform_point3(target).normalize_or_zero();
        if kine_local == Vec3::ZERO || target_local == Vec3::ZERO {
            return;
        }

        let rot = Quat::from_rotation_arc(kine_local, target_local);
        bone.bone_relation.matrix3 = bone.bone_relation.matrix3 * Mat3A::from_quat(rot);
    }

    /// Clamp a bone's local rotation against the joint-limit table.
    fn clamp_bone(&mut self, finger: usize, bone_idx: usize) {
        let rule = clamp_rule(finger, bone_idx);
        let bone = &mut self.fingers[finger][bone_idx];
        match rule {
            ClampRule::None => {}
            ClampRule::AxisX { min_angle, max_angle } => {
                clamp_to_x_axis(bone, min_angle, max_angle);
            }
            ClampRule::SwingTwist {
                max_twist,
                tan_waggle_min,
                tan_waggle_max,
                tan_curl_min,
                tan_curl_max,
            } => {
                clamp_swing_twist(
                    bone,
                    max_twist,
                    tan_waggle_min,
                    tan_waggle_max,
                    tan_curl_min,
                    tan_curl_max,
                );
            }
        }
    }

    fn ccd_clamp_propagate(&mut self, finger: usize, bone_idx: usize) {
        self.ccd_bone(finger, bone_idx);
        self.clamp_bone(finger, bone_idx);
        self.propagate();
    }

    fn optimize(&mut self) {
        for _ in 0..SOLVE_ITERATIONS {
            self.align_wrist();

            // Thumb first; its hidden metacarpal is never driven.
            self.ccd_clamp_propagate(0, 1);
            self.ccd_clamp_propagate(0, 2);
            self.ccd_clamp_propagate(0, 3);

            self.align_wrist();

            for finger in 1..5 {
                for bone in 0..4 {
                    self.ccd_clamp_propagate(finger, bone);
                }
            }
        }
        self.align_wrist();
    }

    /// Convert the solved skeleton into the canonical 26-joint set.
    fn joint_set(&self) -> HandJointSet {
        let mut set = HandJointSet::inactive();

        set.joints[HandJoint::Wrist as usize] = self.joint_relation(&self.wrist_relation);

        // Palm: middle metacarpal orientation, positioned halfway between
        // the middle metacarpal and proximal joints.
        let mut palm = self.fingers[2][0].world_pose;
        palm.translation = (self.fingers[2][0].world_pose.translation
            + self.fingers[2][1].world_pose.translation)
            / 2.0;
        set.joints[HandJoint::Palm as usize] = self.joint_relation(&palm);

        let mut joint = HandJoint::ThumbMetacarpal as usize;
        for finger in 0..5 {
            for bone in 0..5 {
                if finger == 0 && bone == 0 {
                    continue;
                }
                set.joints[joint] = self.joint_relation(&self.fingers[finger][bone].world_pose);
                joint += 1;
            }
        }

        set.is_active = true;
        set
    }

    fn joint_relation(&self, world: &Affine3A) -> Relation {
        let mut position = Vec3::from(world.translation);
        let mut rotation = orthonormalize(Mat3::from(world.matrix3));

        if self.is_right {
            // Mirror back across the YZ plane: flip X and the X row, then
            // restore handedness by negating the X column.
            position.x = -position.x;
            let mut m = rotation;
            m.x_axis.x = -m.x_axis.x;
            m.y_axis.x = -m.y_axis.x;
            m.z_axis.x = -m.z_axis.x;
            m.x_axis = -m.x_axis;
            rotation = m;
        }

        Relation {
            flags: RelationFlags::POSE_VALID | RelationFlags::POSE_TRACKED,
            pose: Pose::new(Quat::from_mat3(&rotation).normalize(), position),
            linear_velocity: Vec3::ZERO,
            angular_velocity: Vec3::ZERO,
        }
    }
}

/// Strip scale from a rotation-and-uniform-scale matrix.
fn orthonormalize(m: Mat3) -> Mat3 {
    Mat3::from_cols(
        m.x_axis.normalize_or_zero(),
        m.y_axis.normalize_or_zero(),
        m.z_axis.normalize_or_zero(),
    )
}

/// Project the bone's rotation onto a pure X-axis (flexion) rotation and
/// bound the angle.
fn clamp_to_x_axis(bone: &mut Bone, min_angle: f32, max_angle: f32) {
    let linear = Mat3::from(bone.bone_relation.matrix3);

    let new_x = linear * Vec3::X;
    let correction = Quat::from_rotation_arc(new_x.normalize_or_zero(), Vec3::X);
    let corrected = Mat3::from_quat(correction) * linear;

    // Signed flexion angle from where the corrected rotation takes -Z.
    let cross = (-Vec3::Z).cross(corrected * (-Vec3::Z));
    let angle = cross.x.clamp(-1.0, 1.0).asin().clamp(min_angle, max_angle);

    bone.bone_relation.matrix3 = Mat3A::from_quat(Quat::from_rotation_x(angle));
}

/// Decompose the bone's rotation into swing and twist about the bone axis
/// and clamp each part independently.
fn clamp_swing_twist(
    bone: &mut Bone,
    max_twist: f32,
    tan_waggle_min: f32,
    tan_waggle_max: f32,
    tan_curl_min: f32,
    tan_curl_max: f32,
) {
    let rot = Mat3::from(bone.bone_relation.matrix3);
    let our_z = rot * -Vec3::Z;

    let swing = Quat::from_rotation_arc(-Vec3::Z, our_z.normalize_or_zero());
    let twist = Quat::from_mat3(&(rot * Mat3::from_quat(swing).inverse())).normalize();

    // Bound the twist magnitude.
    let (mut axis, mut angle) = twist.to_axis_angle();
    if angle > std::f32::consts::PI {
        angle = 2.0 * std::f32::consts::PI - angle;
        axis = -axis;
    }
    let twist = Quat::from_axis_angle(axis, angle.min(max_twist));

    // Bound the swing through tan-angles of the deflected bone axis,
    // projected onto the z = -1 plane. Only meaningful over the forward
    // hemisphere, so the axis is first nudged back into it.
    let mut z = our_z;
    if z.z > 0.0 {
        z.z = -0.000001;
    }
    z *= -1.0 / z.z;
    z.x = z.x.clamp(tan_waggle_min, tan_waggle_max);
    z.y = z.y.clamp(tan_curl_min, tan_curl_max);
    let swing = Quat::from_rotation_arc(-Vec3::Z, z.normalize_or_zero());

    bone.bone_relation.matrix3 = Mat3A::from_quat((twist * swing).normalize());
}
