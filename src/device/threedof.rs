//! Orientation-only tracked device: a reader thread feeds IMU samples into
//! the 3DOF fuser and a relation history answers timestamped queries.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;
use std::time::Duration;

use glam::Vec3;

use crate::device::clock::{monotonic_ns, ClockOffsetEstimator};
use crate::device::{scale_amplitude, InputState, InputValue, OutputValue, TrackedDevice};
use crate::frame::ImuSink;
use crate::imu::{Fusion3Dof, GravityDuration, ImuSample};
use crate::math::Pose;
use crate::relation::{Relation, RelationChain, RelationFlags, RelationHistory, RelationLookup};
use crate::{Result, TrackingError};

/// Reader thread gives up after this many consecutive failed or timed-out
/// reads; queries then keep reporting the last known orientation untracked.
const MAX_CONSECUTIVE_READ_FAILURES: u32 = 5;

/// Transport read timeout; the running flag is checked at this cadence.
const READ_TIMEOUT: Duration = Duration::from_millis(500);

/// Source of decoded IMU samples, implemented by the transport-specific
/// layer. Wire-protocol parsing is not this crate's concern.
pub trait ImuSource: Send {
    /// Blocking read of the next sample. `Ok(None)` means the read timed
    /// out with no data.
    fn read_imu(&mut self, timeout: Duration) -> Result<Option<ImuSample>>;
}

struct DeviceState {
    fusion: Fusion3Dof,
    /// Fused relations keyed by host monotonic time, for timestamped
    /// queries.
    history: RelationHistory,
    clock: ClockOffsetEstimator,
    offset_pose: Pose,
    inputs: HashMap<String, InputState>,
    last_vibration: Option<f32>,
    /// Set when the reader thread exits; orientation is no longer tracked.
    reader_dead: bool,
}

/// A 3DOF device: gyro/accel fusion for orientation, no position.
pub struct ThreeDofDevice {
    name: String,
    state: Mutex<DeviceState>,
    running: Arc<AtomicBool>,
    reader: Mutex<Option<JoinHandle<()>>>,
    /// Haptic duty range of the actuator, used to scale amplitudes.
    vibration_range: (f32, f32),
}

impl ThreeDofDevice {
    /// Build a device whose reported poses are re-expressed through the
    /// calibrated IMU placement.
    pub fn with_calibration(
        name: &str,
        gravity: GravityDuration,
        calib: &crate::calib::ImuCalibration,
    ) -> Arc<ThreeDofDevice> {
        ThreeDofDevice::new(name, gravity, calib.device_from_imu)
    }

    /// `offset_pose` re-expresses reported poses in the desired reference
    /// frame, e.g. an imu-to-middle-of-eyes correction from calibration.
    pub fn new(name: &str, gravity: GravityDuration, offset_pose: Pose) -> Arc<ThreeDofDevice> {
        Arc::new(ThreeDofDevice {
            name: name.to_string(),
            state: Mutex::new(DeviceState {
                fusion: Fusion3Dof::new(gravity),
                history: RelationHistory::new(),
                clock: ClockOffsetEstimator::new(),
                offset_pose,
                inputs: HashMap::new(),
                last_vibration: None,
                reader_dead: false,
            }),
            running: Arc::new(AtomicBool::new(false)),
            reader: Mutex::new(None),
            vibration_range: (0.0, 1.0),
        })
    }

    /// Spawn the ingestion thread reading from `source`. The handle keeps a
    /// reference to the device; callers keep their own clone.
    pub fn start_reader(self: Arc<Self>, source: Box<dyn ImuSource>) -> Result<()> {
        if self.running.swap(true, Ordering::SeqCst) {
            return Err(TrackingError::InvalidSample("reader already started"));
        }

        let name = format!("{}-reader", self.name);
        let device = self.clone();
        let thread = std::thread::Builder::new()
            .name(name)
            .spawn(move || reader_loop(device, source))
            .map_err(TrackingError::ThreadSpawn)?;
        *lock(&self.reader) = Some(thread);
        Ok(())
    }

    /// Stop the ingestion thread and wait for it. Idempotent.
    pub fn stop(&self) {
        self.running.store(false, Ordering::SeqCst);
        if let Ok(mut guard) = self.reader.lock() {
            if let Some(thread) = guard.take() {
                let _ = thread.join();
            }
        }
    }

    /// Declare a button/axis input so `update_inputs` can refresh it.
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

    /// Amplitude last sent to the actuator, scaled into device range.
    pub fn last_vibration(&self) -> Option<f32> {
        lock(&self.state).last_vibration
    }
}

impl ImuSink for ThreeDofDevice {
    /// Ingest one raw-timestamped sample: map the hardware clock to host
    /// monotonic, feed the fuser and record the fused relation. Readers
    /// snapshot under this lock, never compute under it.
    fn push_imu(&self, sample: &ImuSample) {
        let mut state = lock(&self.state);
        let mono_ts = state.clock.update(sample.timestamp_ns, monotonic_ns());
        state.fusion.update(&ImuSample::new(
            mono_ts,
            sample.accel_m_s2,
            sample.gyro_rad_s,
        ));
        if !state.fusion.valid() {
            return;
        }

        let rel = Relation {
            flags: RelationFlags::ORIENTATION_VALID
                | RelationFlags::ORIENTATION_TRACKED
                | RelationFlags::ANGULAR_VELOCITY_VALID,
            pose: Pose::from_orientation(state.fusion.orientation()),
            linear_velocity: Vec3::ZERO,
            angular_velocity: state.fusion.angular_velocity(),
        };
        state.history.push(&rel, mono_ts);
    }
}

impl TrackedDevice for ThreeDofDevice {
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

    fn get_tracked_pose(&self, input_name: &str, at_timestamp_ns: u64) -> Result<Relation> {
        // Snapshot under the lock, interpolate/predict after releasing it.
        let (lookup, mut fused, offset_pose, reader_dead) = {
            let state = lock(&self.state);
            let (lookup, fused) = state.history.get(at_timestamp_ns);
            (lookup, fused, state.offset_pose, state.reader_dead)
        };

        if lookup == RelationLookup::Invalid {
            log::trace!("{}: no IMU data yet for {input_name}", self.name);
            return Ok(Relation::ZERO);
        }
        if reader_dead {
            // Last-known orientation, no longer actively tracked.
            fused.flags &= !RelationFlags::POSE_TRACKED;
        }

        let mut chain = RelationChain::new();
        chain.push_relation(&fused);
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
        log::trace!(
            "{}: haptic f={} amp={} dur={}",
            self.name,
            v.frequency_hz,
            scaled,
            v.duration_ns
        );
        Ok(())
    }
}

impl Drop for ThreeDofDevice {
    fn drop(&mut self) {
        self.stop();
    }
}

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    match mutex.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}

fn reader_loop(device: Arc<ThreeDofDevice>, mut source: Box<dyn ImuSource>) {
    log::info!("{}: reader started", device.name);
    let mut failures = 0u32;

    while device.running.load(Ordering::SeqCst) {
        match source.read_imu(READ_TIMEOUT) {
            Ok(Some(sample)) => {
                failures = 0;
                device.push_imu(&sample);
            }
            Ok(None) => {
                failures += 1;
                if failures >= MAX_CONSECUTIVE_READ_FAILURES {
                    log::warn!("{}: transport went quiet, reader exiting", device.name);
                    break;
                }
            }
            Err(e) => {
                failures += 1;
                log::warn!("{}: transport read failed: {e}", device.name);
                if failures >= MAX_CONSECUTIVE_READ_FAILURES {
                    log::error!("{}: transport fatal, reader exiting", device.name);
                    break;
                }
            }
        }
    }

    lock(&device.state).reader_dead = true;
    log::info!("{}: reader stopped", device.name);
}
