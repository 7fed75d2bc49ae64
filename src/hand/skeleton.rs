//! The resting hand skeleton: bone transforms, joint-limit rules and world
//! pose propagation.
//!
//! A hand is five fingers of five bones each; the thumb's first bone is
//! hidden padding that keeps the indexing uniform. Bone translations are in
//! hand units, the overall scale lives in the wrist transform.

use glam::{Affine3A, Mat3, Quat, Vec3};

use crate::math::quat_from_angle_vector;

/// Waggle (about Y), curl (about X), twist (about Z) Euler triple.
#[derive(Clone, Copy, Debug, Default)]
pub struct Wct {
    pub waggle: f32,
    pub curl: f32,
    pub twist: f32,
}

/// Compose a waggle-curl-twist triple into a rotation, waggle outermost.
pub fn wct_to_quat(wct: Wct) -> Quat {
    let waggle = quat_from_angle_vector(wct.waggle, Vec3::Y);
    let curl = quat_from_angle_vector(wct.curl, Vec3::X);
    let twist = quat_from_angle_vector(wct.twist, Vec3::Z);
    waggle * curl * twist
}

fn rad(degrees: f32) -> f32 {
    degrees.to_radians()
}

/// How a bone's local rotation is constrained after each CCD step.
#[derive(Clone, Copy, Debug)]
pub enum ClampRule {
    /// Free bone (finger tips; never driven by CCD anyway).
    None,
    /// Swing-twist clamp: twist bounded by an absolute angle, swing bounded
    /// by tan-angle limits on the deflected -Z axis. The tan-angle bounds
    /// are tuning values, valid over the forward hemisphere only.
    SwingTwist {
        max_twist: f32,
        tan_waggle_min: f32,
        tan_waggle_max: f32,
        tan_curl_min: f32,
        tan_curl_max: f32,
    },
    /// Project onto a pure X-axis (flexion) rotation bounded to
    /// `[min_angle, max_angle]`.
    AxisX { min_angle: f32, max_angle: f32 },
}

/// Joint-limit table, indexed by finger and bone.
pub fn clamp_rule(finger: usize, bone: usize) -> ClampRule {
    match (finger, bone) {
        // Thumb metacarpal moves a lot in every direction.
        (0, 1) => ClampRule::SwingTwist {
            max_twist: rad(70.0),
            tan_waggle_min: rad(-40.0).tan(),
            tan_waggle_max: rad(40.0).tan(),
            tan_curl_min: rad(-40.0).tan(),
            tan_curl_max: rad(40.0).tan(),
        },
        (0, 2) | (0, 3) => ClampRule::AxisX {
            min_angle: rad(-90.0),
            max_angle: rad(40.0),
        },
        // Finger metacarpals barely move.
        (_, 0) => ClampRule::SwingTwist {
            max_twist: rad(4.0),
            tan_waggle_min: rad(-30.0).tan(),
            tan_waggle_max: rad(30.0).tan(),
            tan_curl_min: rad(-10.0).tan(),
            tan_curl_max: rad(10.0).tan(),
        },
        // Proximals waggle a little and curl a lot.
        (_, 1) => ClampRule::SwingTwist {
            max_twist: rad(4.0),
            tan_waggle_min: rad(-20.0).tan(),
            tan_waggle_max: rad(20.0).tan(),
            tan_curl_min: rad(-89.0).tan(),
            tan_curl_max: rad(30.0).tan(),
        },
        // Intermediate and distal joints are hinges.
        (_, 2) | (_, 3) => ClampRule::AxisX {
            min_angle: rad(-90.0),
            max_angle: rad(10.0),
        },
        _ => ClampRule::None,
    }
}

/// One bone of the kinematic model.
#[derive(Clone, Copy, Debug)]
pub struct Bone {
    /// Translation from the previous joint, in hand units.
    pub trans_from_last_joint: Vec3,
    /// Resting rotation that points this bone's -Z at the next joint.
    pub rot_wct: Wct,
    /// Local transform relative to the parent bone.
    pub bone_relation: Affine3A,
    /// Cached transform of this bone in tracking space.
    pub world_pose: Affine3A,
    /// Which of the 21 reported keypoints this bone's head corresponds to.
    pub keypoint_idx: usize,
}

impl Bone {
    fn rest() -> Bone {
        Bone {
            trans_from_last_joint: Vec3::ZERO,
            rot_wct: Wct::default(),
            bone_relation: Affine3A::IDENTITY,
            world_pose: Affine3A::IDENTITY,
            keypoint_idx: 0,
        }
    }

    /// Rebuild the local transform from the Euler triple and translation.
    pub fn update_relation(&mut self) {
        self.bone_relation =
            Affine3A::from_rotation_translation(wct_to_quat(self.rot_wct), self.trans_from_last_joint);
    }
}

/// Build the hardcoded resting skeleton at the given hand size (wrist to
/// middle-proximal distance, meters).
pub fn init_hardcoded_statics(size: f32) -> (Affine3A, [[Bone; 5]; 5]) {
    let wrist_relation = Affine3A::from_mat3(Mat3::from_diagonal(Vec3::splat(size)));
    let mut fingers = [[Bone::rest(); 5]; 5];

    // Thumb, including the hidden extra bone that keeps indexing uniform.
    {
        let t = &mut fingers[0];
        t[0].rot_wct = Wct {
            waggle: -rad(45.0),
            curl: rad(-10.0),
            twist: -rad(70.0),
        };
        t[0].trans_from_last_joint = Vec3::new(0.33097, 0.0, -0.25968);

        t[1].rot_wct.curl = rad(-5.0);

        t[2].rot_wct.curl = rad(-25.0);
        t[2].trans_from_last_joint.z = -0.389626;

        t[3].rot_wct.curl = rad(-25.0);
        t[3].trans_from_last_joint.z = -0.311176;

        t[4].trans_from_last_joint.z = -0.232195;
    }

    // Proximal, intermediate and distal segment lengths per finger.
    let finger_joints: [[f32; 3]; 4] = [
        [-0.365719, -0.231581, -0.201790],
        [-0.404486, -0.247749, -0.210121],
        [-0.365639, -0.225666, -0.187089],
        [-0.278197, -0.176178, -0.157566],
    ];

    let mut waggle = -0.19f32;
    for finger in 1..5 {
        let of = &mut fingers[finger];
        of[0].rot_wct.waggle = waggle;
        waggle += 0.19;

        of[1].rot_wct.curl = rad(-5.0);
        of[2].rot_wct.curl = rad(-5.0);
        of[3].rot_wct.curl = rad(-5.0);

        for i in 0..3 {
            of[i + 2].trans_from_last_joint = Vec3::new(0.0, 0.0, finger_joints[finger - 1][i]);
        }
    }

    fingers[1][1].trans_from_last_joint.z = -0.66;
    fingers[2][1].trans_from_last_joint.z = -0.645;
    fingers[3][1].trans_from_last_joint.z = -0.58;
    fingers[4][1].trans_from_last_joint.z = -0.52;

    fingers[1][0].trans_from_last_joint = Vec3::new(0.16926, 0.0, -0.34437);
    fingers[2][0].trans_from_last_joint = Vec3::new(0.034639, 0.0, -0.35573);
    fingers[3][0].trans_from_last_joint = Vec3::new(-0.063625, 0.0, -0.34164);
    fingers[4][0].trans_from_last_joint = Vec3::new(-0.1509, 0.0, -0.30373);

    for finger in 0..5 {
        for bone in 0..5 {
            fingers[finger][bone].update_relation();
            // Bones 1..4 of finger f track reported keypoint 4*f + b; the
            // metacarpals (bone 0) have no keypoint.
            if bone >= 1 {
                fingers[finger][bone].keypoint_idx = 4 * finger + bone;
            }
        }
    }

    (wrist_relation, fingers)
}

/// Recompute every bone's world pose from the wrist out.
pub fn propagate_world_poses(wrist_relation: &Affine3A, fingers: &mut [[Bone; 5]; 5]) {
    for finger in fingers.iter_mut() {
        let mut parent = *wrist_relation;
        for bone in finger.iter_mut() {
            bone.world_pose = parent * bone.bone_relation;
            parent = bone.world_pose;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_wct_identity() {
        let q = wct_to_quat(Wct::default());
        assert!(q.dot(Quat::IDENTITY).abs() > 1.0 - 1e-6);
    }

    #[test]
    fn test_wct_order_waggle_outermost() {
        let wct = Wct {
            waggle: 0.5,
            curl: 0.3,
            twist: -0.2,
        };
        let expected = Quat::from_rotation_y(0.5) * Quat::from_rotation_x(0.3) * Quat::from_rotation_z(-0.2);
        let q = wct_to_quat(wct);
        assert!(q.dot(expected).abs() > 1.0 - 1e-6);
    }

    #[test]
    fn test_rest_skeleton_scales_with_size() {
        let size = 0.09;
        let (wrist, mut fingers) = init_hardcoded_statics(size);
        propagate_world_poses(&wrist, &mut fingers);

        // Middle proximal joint sits one hand-size from the wrist, roughly.
        let p: Vec3 = fingers[2][1].world_pose.translation.into();
        let expected = (Vec3::new(0.034639, 0.0, -0.35573) + Vec3::new(0.0, 0.0, -0.645)).length();
        assert_relative_eq!(p.length() / size, expected, epsilon = 0.15);
    }

    #[test]
    fn test_fingers_spread_along_x() {
        let (wrist, mut fingers) = init_hardcoded_statics(0.09);
        propagate_world_poses(&wrist, &mut fingers);

        // Metacarpal heads are ordered thumb-side to little-finger-side.
        let xs: Vec<f32> = (1..5)
            .map(|f| fingers[f][0].world_pose.translation.x)
            .collect();
        assert!(xs.windows(2).all(|w| w[0] > w[1]), "xs = {xs:?}");
    }

    #[test]
    fn test_keypoint_indices_cover_all_fingers() {
        use crate::hand::Keypoint21;

        let (_, fingers) = init_hardcoded_statics(0.09);
        assert_eq!(fingers[0][1].keypoint_idx, Keypoint21::ThumbMcp as usize);
        assert_eq!(fingers[1][1].keypoint_idx, Keypoint21::IndexPxm as usize);
        assert_eq!(fingers[2][3].keypoint_idx, Keypoint21::MiddleDst as usize);
        assert_eq!(fingers[4][4].keypoint_idx, Keypoint21::LittleTip as usize);
    }
}
