//! Optical hand tracking: triangulates 21 per-camera keypoints into 3D and
//! solves a 26-joint skeletal model with cyclic-coordinate-descent IK.

pub mod ccdik;
pub mod skeleton;
pub mod triangulate;

pub use ccdik::KinematicHand;

use glam::Vec3;

use crate::relation::Relation;

/// Number of keypoints the perception stage reports per view.
pub const NUM_KEYPOINTS: usize = 21;

/// Number of joints in the output skeleton.
pub const NUM_HAND_JOINTS: usize = 26;

/// Keypoint indices as reported by the perception stage.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(usize)]
pub enum Keypoint21 {
    Wrist = 0,
    ThumbMcp = 1,
    ThumbPxm = 2,
    ThumbDst = 3,
    ThumbTip = 4,
    IndexPxm = 5,
    IndexInt = 6,
    IndexDst = 7,
    IndexTip = 8,
    MiddlePxm = 9,
    MiddleInt = 10,
    MiddleDst = 11,
    MiddleTip = 12,
    RingPxm = 13,
    RingInt = 14,
    RingDst = 15,
    RingTip = 16,
    LittlePxm = 17,
    LittleInt = 18,
    LittleDst = 19,
    LittleTip = 20,
}

/// Canonical output skeleton order.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(usize)]
pub enum HandJoint {
    Palm = 0,
    Wrist = 1,
    ThumbMetacarpal = 2,
    ThumbProximal = 3,
    ThumbDistal = 4,
    ThumbTip = 5,
    IndexMetacarpal = 6,
    IndexProximal = 7,
    IndexIntermediate = 8,
    IndexDistal = 9,
    IndexTip = 10,
    MiddleMetacarpal = 11,
    MiddleProximal = 12,
    MiddleIntermediate = 13,
    MiddleDistal = 14,
    MiddleTip = 15,
    RingMetacarpal = 16,
    RingProximal = 17,
    RingIntermediate = 18,
    RingDistal = 19,
    RingTip = 20,
    LittleMetacarpal = 21,
    LittleProximal = 22,
    LittleIntermediate = 23,
    LittleDistal = 24,
    LittleTip = 25,
}

/// One relation per joint, in [`HandJoint`] order.
#[derive(Clone, Copy, Debug)]
pub struct HandJointSet {
    pub joints: [Relation; NUM_HAND_JOINTS],
    pub is_active: bool,
}

impl HandJointSet {
    pub fn inactive() -> HandJointSet {
        HandJointSet {
            joints: [Relation::ZERO; NUM_HAND_JOINTS],
            is_active: false,
        }
    }

    pub fn joint(&self, joint: HandJoint) -> &Relation {
        &self.joints[joint as usize]
    }
}

/// Rays from one camera toward the 21 keypoints, in that camera's frame.
#[derive(Clone, Copy, Debug)]
pub struct HandRays {
    pub rays: [Vec3; NUM_KEYPOINTS],
}

/// One stereo observation from the perception stage: left view first.
#[derive(Clone, Copy, Debug)]
pub struct HandObservation {
    pub views: [HandRays; 2],
}
