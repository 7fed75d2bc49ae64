//! Fully tracked device: poses come from the SLAM adapter, re-expressed
//! through the device's tracking-origin offset.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use crate::device::clock::monotonic_ns;
use crate::device::{scale_amplitude, InputState, InputValue, OutputValue, TrackedDevice};
use crate::math::Pose;
use crate::relation::{Relation, RelationChain};
use crate::slam::SlamTracker;
use crate::{Result, TrackingError};

struct DeviceState {
    offset_pose: Pose,
    inputs: HashMap<String, InputState>,
    last_vibration: Option<f32>,
}

/// A 6DOF device backed by a [`SlamTracker`].
pub struct SixDofDevice {
    name: String,
    tracker: Arc<SlamTracker>,
    state: Mutex<DeviceState>,
    vibration_range: (f32, f32),
}

impl SixDofDevice {
    /// `offset_pose` moves reported poses from the SLAM (IMU) frame into the
    /// desired reference frame, e.g. the middle-of-eyes correction from
    /// calibration.
    pub fn new(name: &str, tracker: Arc<SlamTracker>, offset_pose: Pose) -> Arc<SixDofDevice> {
        Arc::new(SixDofDevice {
            name: name.to_string(),
            tracker,
            state: Mutex::new(DeviceState {
                offset_pose,
                inputs: HashMap::new(),
                last_vibration: None,
            }),
            vibration_range: (0.0, 1.0),
        })
    }

    pub fn add_input(&self, name: &str, value: InputValue) {
        lock(&self.state).inputs.insert(
            name.to_string(),
            InputState {
                timestamp_ns: monotonic_ns(),
                value,
            },
        );
    }

    pub fn input(&self, name: &str) -> Option<InputState> {
        lock(&self.state).inputs.get(name).copied()
    }

    pub fn last_vibration(&self) -> Option<f32> {
        lock(&self.state).last_vibration
    }
}

impl TrackedDevice for SixDofDevice {
    fn name(&self) -> &str {
        &self.name
    }

    fn update_inputs(&self) {
        let now = monotonic_ns();
        let mut state = lock(&self.state);
        for input in state.inputs.values_mut() {
            input.timestamp_ns = now;
        }
    }

    fn get_tracked_pose(&self, _input_name: &str, at_timestamp_ns: u64) -> Result<Relation> {
        let offset_pose = lock(&self.state).offset_pose;

        // Flush + predict happens inside the tracker, outside our lock.
        let tracked = self.tracker.get_tracked_pose(at_timestamp_ns);

        let mut chain = RelationChain::new();
        chain.push_relation(&tracked);
        chain.push_pose_if_not_identity(&offset_pose);
        Ok(chain.resolve())
    }

    fn set_output(&self, output_name: &str, value: &OutputValue) -> Result<()> {
        if output_name != "haptic" {
            return Err(TrackingError::UnknownOutput(output_name.to_string()));
        }
        let OutputValue::Vibration(v) = value;
        let scaled = scale_amplitude(v.amplitude, self.vibration_range.0, self.vibration_range.1);
        lock(&self.state).last_vibration = Some(scaled);
        Ok(())
    }
}

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    match mutex.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}
