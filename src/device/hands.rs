//! Hand-tracking device: wraps the left/right kinematic solvers and serves
//! the most recent joint sets to queries.

use std::sync::Mutex;
use std::sync::Arc;

use crate::device::{OutputValue, TrackedDevice};
use crate::hand::{HandJointSet, HandObservation, KinematicHand};
use crate::relation::Relation;
use crate::{Result, TrackingError};

struct SolvedHand {
    set: HandJointSet,
    produced_at_ns: u64,
}

struct HandState {
    solver: KinematicHand,
    last: Option<SolvedHand>,
}

/// Serves [`HandJointSet`]s for the inputs `"hand-left"` and `"hand-right"`.
///
/// The perception stage pushes stereo keypoint observations through
/// [`push_observation`] (typically from its own thread); queries return the
/// newest solved set together with the timestamp it was produced for.
///
/// [`push_observation`]: HandTrackingDevice::push_observation
pub struct HandTrackingDevice {
    name: String,
    left: Mutex<HandState>,
    right: Mutex<HandState>,
}

impl HandTrackingDevice {
    pub fn new(name: &str, left: KinematicHand, right: KinematicHand) -> Arc<HandTrackingDevice> {
        Arc::new(HandTrackingDevice {
            name: name.to_string(),
            left: Mutex::new(HandState { solver: left, last: None }),
            right: Mutex::new(HandState { solver: right, last: None }),
        })
    }

    /// Solve one observation for the given hand, stamped with the camera
    /// timestamp it was captured at.
    pub fn push_observation(
        &self,
        is_right: bool,
        observation: &HandObservation,
        timestamp_ns: u64,
    ) {
        let hand = if is_right { &self.right } else { &self.left };
        let mut state = lock(hand);
        let set = state.solver.solve(observation);
        state.last = Some(SolvedHand {
            set,
            produced_at_ns: timestamp_ns,
        });
    }

    fn hand_for_input(&self, input_name: &str) -> Option<&Mutex<HandState>> {
        match input_name {
            "hand-left" => Some(&self.left),
            "hand-right" => Some(&self.right),
            _ => None,
        }
    }
}

impl TrackedDevice for HandTrackingDevice {
    fn name(&self) -> &str {
        &self.name
    }

    fn update_inputs(&self) {}

    fn get_tracked_pose(&self, input_name: &str, _at_timestamp_ns: u64) -> Result<Relation> {
        // The hand root is the wrist joint of the latest solve.
        let hand = self
            .hand_for_input(input_name)
            .ok_or_else(|| TrackingError::UnknownInput(input_name.to_string()))?;
        let state = lock(hand);
        Ok(match &state.last {
            Some(solved) => *solved.set.joint(crate::hand::HandJoint::Wrist),
            None => Relation::ZERO,
        })
    }

    fn get_hand_tracking(
        &self,
        input_name: &str,
        _at_timestamp_ns: u64,
    ) -> Result<(HandJointSet, u64)> {
        let hand = self
            .hand_for_input(input_name)
            .ok_or_else(|| TrackingError::UnknownInput(input_name.to_string()))?;
        let state = lock(hand);
        Ok(match &state.last {
            Some(solved) => (solved.set, solved.produced_at_ns),
            None => (HandJointSet::inactive(), 0),
        })
    }

    fn set_output(&self, output_name: &str, _value: &OutputValue) -> Result<()> {
        Err(TrackingError::UnknownOutput(output_name.to_string()))
    }
}

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    match mutex.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::Pose;
    use glam::Vec3;

    fn device() -> Arc<HandTrackingDevice> {
        let baseline = Pose::from_position(Vec3::new(-0.09, 0.0, 0.0));
        HandTrackingDevice::new(
            "hand-tracker",
            KinematicHand::new(&baseline, false, 0.09),
            KinematicHand::new(&baseline, true, 0.09),
        )
    }

    #[test]
    fn test_query_before_observation_is_inactive() {
        let dev = device();
        let (set, produced_at) = dev.get_hand_tracking("hand-left", 100).unwrap();
        assert!(!set.is_active);
        assert_eq!(produced_at, 0);
    }

    #[test]
    fn test_unknown_input_is_rejected() {
        let dev = device();
        assert!(dev.get_hand_tracking("gamepad", 100).is_err());
        assert!(dev.get_tracked_pose("gamepad", 100).is_err());
    }
}
