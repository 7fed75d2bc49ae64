//! Adapter around an external SLAM system.
//!
//! Fans IMU samples and stereo frames into the external implementation,
//! dequeues the 6DOF poses it produces into a relation history, and answers
//! timestamped queries through a prediction and filtering stack.

pub mod interface;
pub mod recorder;

pub use interface::{SlamFeature, SlamFeatureResult, SlamImplementation, SlamPose};

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Condvar, Mutex};
use std::thread::JoinHandle;
use std::time::Duration;

use glam::Vec3;

use crate::device::clock::monotonic_ns;
use crate::filters::{ExponentialSmoother, FilterFifo3, OneEuroQuat, OneEuroVec3};
use crate::frame::{Frame, FrameContext, FrameNode, FrameSink, ImuSink, PoseSink};
use crate::imu::ImuSample;
use crate::math::{quat_rotate_derivative, quat_rotate_vec3, quat_slerp, Pose};
use crate::relation::{Relation, RelationFlags, RelationHistory};
use crate::{Result, TrackingError, STANDARD_GRAVITY};

/// Number of IMU samples kept for prediction averaging; about one second at
/// typical rates.
const IMU_FIFO_CAPACITY: usize = 1000;

/// How velocities are sourced when predicting past the latest SLAM pose.
/// Naming: S = from SLAM poses (slow, precise), I = from IMU (fast, noisy);
/// P position, O orientation, A angular velocity, L linear velocity.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PredictionType {
    /// No prediction, always return the last SLAM tracked pose.
    None,
    /// Interpolate/extrapolate from SLAM poses only.
    SpSoSaSl,
    /// SLAM pose with angular velocity averaged from recent gyro samples.
    SpSoIaSl,
    /// SLAM pose with angular and linear velocity from recent IMU samples.
    SpSoIaIl,
}

/// Trajectory filter switches and parameters.
#[derive(Clone, Debug)]
pub struct FilterConfig {
    pub use_moving_average: bool,
    /// Time window in ms to average over. Larger smooths more, at the cost
    /// of latency.
    pub window_ms: f64,

    pub use_exponential_smoothing: bool,
    /// How far to lerp toward each new target.
    pub alpha: f32,

    pub use_one_euro: bool,
    pub one_euro_fc_min: f32,
    pub one_euro_fc_min_d: f32,
    pub one_euro_beta: f32,
}

impl Default for FilterConfig {
    fn default() -> FilterConfig {
        FilterConfig {
            use_moving_average: false,
            window_ms: 66.0,
            use_exponential_smoothing: false,
            alpha: 0.1,
            use_one_euro: false,
            one_euro_fc_min: std::f32::consts::PI,
            one_euro_fc_min_d: 1.0,
            one_euro_beta: 0.16,
        }
    }
}

/// Configuration of the adapter itself. The external system's own settings
/// live in its config file; the path is only checked for existence here.
#[derive(Clone, Debug)]
pub struct SlamTrackerConfig {
    /// Config file consumed by the external implementation. Construction
    /// fails when it does not exist.
    pub config_path: PathBuf,
    /// Whether samples pushed to the sinks are submitted to the external
    /// system right away.
    pub submit_from_start: bool,
    pub prediction: PredictionType,
    /// Added to averaged world-frame accelerometer readings to remove the
    /// gravity reaction before integrating linear velocity.
    pub gravity_correction: Vec3,
    /// Enable the trajectory/timing CSV writers.
    pub write_csvs: bool,
    pub csv_path: PathBuf,
    pub filter: FilterConfig,
}

impl Default for SlamTrackerConfig {
    fn default() -> SlamTrackerConfig {
        SlamTrackerConfig {
            config_path: PathBuf::new(),
            submit_from_start: true,
            prediction: PredictionType::SpSoIaSl,
            gravity_correction: Vec3::new(0.0, 0.0, -STANDARD_GRAVITY),
            write_csvs: false,
            csv_path: PathBuf::from("evaluation"),
            filter: FilterConfig::default(),
        }
    }
}

/// Adapter lifecycle. Transitions are one-way.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
enum Lifecycle {
    Initialized,
    Running,
    Stopping,
    Destroyed,
}

/// The sink bundle a video/IMU source feeds.
#[derive(Clone)]
pub struct SlamSinks {
    pub left: Arc<dyn FrameSink>,
    pub right: Arc<dyn FrameSink>,
    pub imu: Arc<dyn ImuSink>,
    /// Optional ground-truth poses, recorded for error metrics.
    pub gt: Arc<dyn PoseSink>,
}

/// Everything guarded by the tracker's internal mutex. The external SLAM
/// system is *never* called while this is locked.
struct TrackerState {
    submit: bool,
    prediction: PredictionType,
    gravity_correction: Vec3,

    /// Relations produced purely from external SLAM data.
    rels: RelationHistory,
    gyro_ff: FilterFifo3,
    accel_ff: FilterFifo3,

    // Timestamp-order checks on the ingest paths.
    last_imu_ts: Option<u64>,
    last_left_ts: Option<u64>,
    last_right_ts: Option<u64>,

    // Memoized answer so repeated queries at one timestamp are cheap.
    last_rel: Relation,
    last_ts: u64,

    // Trajectory filters.
    use_moving_average: bool,
    window_ms: f64,
    pos_ff: FilterFifo3,
    /// Quaternion xyz components only; w is recovered from unit length.
    rot_ff: FilterFifo3,
    use_exponential_smoothing: bool,
    smoother: ExponentialSmoother,
    use_one_euro: bool,
    pos_oe: OneEuroVec3,
    rot_oe: OneEuroQuat,

    // Ground truth for error metrics.
    gt_trajectory: BTreeMap<u64, Pose>,
    gt_origin: Pose,
    gt_last_error_m: Option<f32>,
    gt_override_tracking: bool,

    // Debug CSV writers.
    slam_traj_writer: recorder::TrajectoryWriter,
    pred_traj_writer: recorder::TrajectoryWriter,
    filt_traj_writer: recorder::TrajectoryWriter,
    times_writer: recorder::TimingWriter,
    timing_ext_enabled: bool,
}

struct Tracker {
    /// The external implementation, behind its own lock so pushes and the
    /// worker can reach it without touching tracker state.
    slam: Mutex<Box<dyn SlamImplementation>>,
    state: Mutex<TrackerState>,
    lifecycle: Mutex<Lifecycle>,

    stop_flag: Arc<AtomicBool>,
    /// Signalled by the push paths so the worker drains promptly.
    wakeup: Condvar,
    wakeup_guard: Mutex<bool>,
    worker: Mutex<Option<JoinHandle<()>>>,
}

/// Handle to a running SLAM adapter. Query with [`get_tracked_pose`], feed
/// through the sinks from [`create`].
///
/// [`get_tracked_pose`]: SlamTracker::get_tracked_pose
/// [`create`]: SlamTracker::create
pub struct SlamTracker {
    inner: Arc<Tracker>,
}

impl SlamTracker {
    /// Initialize the external system and build the adapter. The returned
    /// tracker is registered on `ctx` for two-phase teardown.
    pub fn create(
        mut slam: Box<dyn SlamImplementation>,
        config: SlamTrackerConfig,
        ctx: &FrameContext,
    ) -> Result<(SlamTracker, SlamSinks)> {
        if !config.config_path.exists() {
            return Err(TrackingError::ConfigNotFound(config.config_path));
        }

        slam.initialize()?;

        // Two timing columns are always reported; the timing extension
        // inserts the external system's own stamps between them.
        let mut timing_columns = vec!["sampled".to_string(), "received_by_runtime".to_string()];
        let mut timing_ext_enabled = false;
        if slam.supports_feature(SlamFeature::PoseExtTiming) {
            if let Some(SlamFeatureResult::TimingColumns(cols)) =
                slam.use_feature(SlamFeature::PoseExtTiming)
            {
                for (i, col) in cols.into_iter().enumerate() {
                    timing_columns.insert(1 + i, col);
                }
                timing_ext_enabled = true;
            }
        }

        let csvs = config.write_csvs;
        let dir = &config.csv_path;
        let state = TrackerState {
            submit: config.submit_from_start,
            prediction: config.prediction,
            gravity_correction: config.gravity_correction,
            rels: RelationHistory::new(),
            gyro_ff: FilterFifo3::new(IMU_FIFO_CAPACITY),
            accel_ff: FilterFifo3::new(IMU_FIFO_CAPACITY),
            last_imu_ts: None,
            last_left_ts: None,
            last_right_ts: None,
            last_rel: Relation::ZERO,
            last_ts: 0,
            use_moving_average: config.filter.use_moving_average,
            window_ms: config.filter.window_ms,
            pos_ff: FilterFifo3::new(IMU_FIFO_CAPACITY),
            rot_ff: FilterFifo3::new(IMU_FIFO_CAPACITY),
            use_exponential_smoothing: config.filter.use_exponential_smoothing,
            smoother: ExponentialSmoother::new(config.filter.alpha),
            use_one_euro: config.filter.use_one_euro,
            pos_oe: OneEuroVec3::new(
                config.filter.one_euro_fc_min,
                config.filter.one_euro_fc_min_d,
                config.filter.one_euro_beta,
            ),
            rot_oe: OneEuroQuat::new(
                config.filter.one_euro_fc_min,
                config.filter.one_euro_fc_min_d,
                config.filter.one_euro_beta,
            ),
            gt_trajectory: BTreeMap::new(),
            gt_origin: Pose::IDENTITY,
            gt_last_error_m: None,
            gt_override_tracking: false,
            slam_traj_writer: recorder::TrajectoryWriter::new(dir, "tracking.csv", csvs),
            pred_traj_writer: recorder::TrajectoryWriter::new(dir, "prediction.csv", csvs),
            filt_traj_writer: recorder::TrajectoryWriter::new(dir, "filtering.csv", csvs),
            times_writer: recorder::TimingWriter::new(dir, "timing.csv", csvs, timing_columns),
            timing_ext_enabled,
        };

        let inner = Arc::new(Tracker {
            slam: Mutex::new(slam),
            state: Mutex::new(state),
            lifecycle: Mutex::new(Lifecycle::Initialized),
            stop_flag: Arc::new(AtomicBool::new(false)),
            wakeup: Condvar::new(),
            wakeup_guard: Mutex::new(false),
            worker: Mutex::new(None),
        });

        ctx.add(inner.clone());

        let sinks = SlamSinks {
            left: Arc::new(FrameSinkAdapter { tracker: inner.clone(), is_left: true }),
            right: Arc::new(FrameSinkAdapter { tracker: inner.clone(), is_left: false }),
            imu: Arc::new(ImuSinkAdapter { tracker: inner.clone() }),
            gt: Arc::new(GtSinkAdapter { tracker: inner.clone() }),
        };

        log::debug!("SLAM tracker created");
        Ok((SlamTracker { inner }, sinks))
    }

    /// Start the external system on the adapter's worker thread.
    pub fn start(&self) -> Result<()> {
        {
            let mut lifecycle = lock_ignore_poison(&self.inner.lifecycle);
            if *lifecycle != Lifecycle::Initialized {
                return Err(TrackingError::DeviceStopped);
            }
            *lifecycle = Lifecycle::Running;
        }

        let worker_inner = self.inner.clone();
        let thread = std::thread::Builder::new()
            .name("slam-tracker".into())
            .spawn(move || worker_loop(worker_inner))
            .map_err(TrackingError::ThreadSpawn)?;
        *lock_ignore_poison(&self.inner.worker) = Some(thread);

        log::debug!("SLAM tracker started");
        Ok(())
    }

    /// Get a filtered prediction from the SLAM tracked poses.
    ///
    /// Until the external system has produced its first pose the result has
    /// no valid flags; callers must tolerate this.
    pub fn get_tracked_pose(&self, when_ns: u64) -> Relation {
        self.inner.get_tracked_pose(when_ns)
    }

    /// Whether queries report interpolated ground truth instead of tracked
    /// poses, when ground truth is available.
    pub fn set_override_tracking(&self, enable: bool) {
        lock_ignore_poison(&self.inner.state).gt_override_tracking = enable;
    }

    /// Positional error of the most recently flushed pose against the
    /// registered ground truth, if any.
    pub fn gt_error_m(&self) -> Option<f32> {
        lock_ignore_poison(&self.inner.state).gt_last_error_m
    }
}

// A poisoned lock means a panic mid-update; tracking state after that is
// best-effort, so keep serving rather than propagate the panic.
fn lock_ignore_poison<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    match mutex.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}

impl Tracker {
    /// Dequeue all tracked poses from the external system and fold them into
    /// the relation history. Returns whether anything was dequeued.
    fn flush_poses(&self) -> bool {
        // Drain while holding only the slam lock.
        let mut poses = Vec::new();
        {
            let mut slam = lock_ignore_poison(&self.slam);
            while let Some(pose) = slam.try_dequeue_pose() {
                poses.push(pose);
            }
        }
        if poses.is_empty() {
            log::trace!("No poses to flush");
            return false;
        }

        let now = monotonic_ns();
        let mut state = lock_ignore_poison(&self.state);
        for pose in poses {
            log::trace!(
                "Dequeued SLAM pose ts={} p={:?} r={:?}",
                pose.timestamp_ns,
                pose.position,
                pose.orientation
            );

            // Full velocity estimate against the previous SLAM relation.
            let rel = Relation {
                flags: RelationFlags::all(),
                pose: Pose::new(pose.orientation, pose.position),
                linear_velocity: Vec3::ZERO,
                angular_velocity: Vec3::ZERO,
            };
            let rel = state.rels.estimate_motion(&rel, pose.timestamp_ns);
            state.rels.push(&rel, pose.timestamp_ns);

            // Positional error against ground truth, when registered. The
            // origin pose maps the tracked trajectory into the ground-truth
            // frame; full trajectory alignment is offline-analysis business.
            if let Some(gt_pose) = gt_pose_at(&state.gt_trajectory, pose.timestamp_ns) {
                let mapped = state.gt_origin.transform_point(rel.pose.position);
                state.gt_last_error_m = Some((mapped - gt_pose.position).length());
            }

            state.slam_traj_writer.push(pose.timestamp_ns, &rel.pose);

            let mut tss = Vec::with_capacity(pose.timing.len() + 2);
            tss.push(pose.timestamp_ns);
            if state.timing_ext_enabled {
                tss.extend_from_slice(&pose.timing);
            }
            tss.push(now);
            state.times_writer.push(&tss);
        }
        true
    }

    /// Best guess of the relation at `when_ns` from everything the tracker
    /// has. Caller holds the state lock.
    fn predict_pose(&self, state: &mut TrackerState, when_ns: u64) -> Relation {
        // Stop if there is no previous relation to predict from.
        let Some((rel_ts, mut rel)) = state.rels.get_latest() else {
            return Relation::ZERO;
        };

        if state.prediction == PredictionType::None {
            return rel;
        }

        // SLAM data only, when asked for the past or configured that way.
        if state.prediction == PredictionType::SpSoSaSl || when_ns <= rel_ts {
            return state.rels.get(when_ns).1;
        }

        // Angular velocity from averaged gyro samples since the last pose.
        let mut avg_gyro = Vec3::ZERO;
        state.gyro_ff.filter(rel_ts, when_ns, &mut avg_gyro);
        rel.angular_velocity = quat_rotate_derivative(rel.pose.orientation, avg_gyro);
        rel.flags |= RelationFlags::ANGULAR_VELOCITY_VALID;

        // Linear velocity advanced by averaged accelerometer samples.
        if state.prediction == PredictionType::SpSoIaIl {
            let mut avg_accel = Vec3::ZERO;
            state.accel_ff.filter(rel_ts, when_ns, &mut avg_accel);
            let world_accel =
                quat_rotate_vec3(rel.pose.orientation, avg_accel) + state.gravity_correction;

            let last_imu_ts = state.last_imu_ts.unwrap_or(rel_ts);
            let slam_to_imu_dt = ns_delta_s(rel_ts, last_imu_ts);
            rel.linear_velocity += world_accel * slam_to_imu_dt;
            rel.flags |= RelationFlags::LINEAR_VELOCITY_VALID;
        }

        let slam_to_now_dt = ns_delta_s(rel_ts, when_ns);
        rel.predict(slam_to_now_dt)
    }

    /// Run the enabled trajectory filters over a predicted relation. Caller
    /// holds the state lock.
    fn filter_pose(&self, state: &mut TrackerState, when_ns: u64, rel: &mut Relation) {
        if state.use_moving_average {
            if rel.flags.contains(RelationFlags::POSITION_VALID) {
                let pos = rel.pose.position;
                state.pos_ff.push(pos, when_ns);
            }
            if rel.flags.contains(RelationFlags::ORIENTATION_VALID) {
                // w is dropped; it is recovered below from unit length.
                let q = rel.pose.orientation;
                state.rot_ff.push(Vec3::new(q.x, q.y, q.z), when_ns);
            }

            let window = (state.window_ms * 1e6) as u64;
            let start = when_ns.saturating_sub(window);
            let mut avg_pos = Vec3::ZERO;
            state.pos_ff.filter(start, when_ns, &mut avg_pos);
            // Naive but good enough rotation average over a small window.
            let mut avg_rot = Vec3::ZERO;
            state.rot_ff.filter(start, when_ns, &mut avg_rot);

            let avg_rot_w = (1.0 - avg_rot.length_squared()).max(0.0).sqrt();
            rel.pose.orientation =
                glam::Quat::from_xyzw(avg_rot.x, avg_rot.y, avg_rot.z, avg_rot_w).normalize();
            rel.pose.position = avg_pos;
        }

        if state.use_exponential_smoothing {
            *rel = state.smoother.run(rel);
        }

        if state.use_one_euro {
            if rel.flags.contains(RelationFlags::POSITION_VALID) {
                rel.pose.position = state.pos_oe.run(when_ns, rel.pose.position);
            }
            if rel.flags.contains(RelationFlags::ORIENTATION_VALID) {
                rel.pose.orientation = state.rot_oe.run(when_ns, rel.pose.orientation);
            }
        }
    }

    fn get_tracked_pose(&self, when_ns: u64) -> Relation {
        {
            let state = lock_ignore_poison(&self.state);
            if when_ns == state.last_ts {
                return state.last_rel;
            }
        }

        self.flush_poses();

        let mut state = lock_ignore_poison(&self.state);
        let mut rel = self.predict_pose(&mut state, when_ns);
        let pred_pose = rel.pose;
        state.pred_traj_writer.push(when_ns, &pred_pose);

        if !rel.has_no_pose() {
            self.filter_pose(&mut state, when_ns, &mut rel);
        }
        let filt_pose = rel.pose;
        state.filt_traj_writer.push(when_ns, &filt_pose);

        state.last_rel = rel;
        state.last_ts = when_ns;

        if state.gt_override_tracking {
            if let Some(gt_pose) = gt_pose_at(&state.gt_trajectory, when_ns) {
                rel.pose = gt_pose;
            }
        }
        rel
    }

    fn notify_worker(&self) {
        if let Ok(mut pending) = self.wakeup_guard.lock() {
            *pending = true;
        }
        self.wakeup.notify_one();
    }
}

impl FrameNode for Tracker {
    /// Stop the external system and join the worker. Idempotent; later
    /// queries keep answering from the relation history.
    fn break_apart(&self) {
        {
            let mut lifecycle = lock_ignore_poison(&self.lifecycle);
            if *lifecycle >= Lifecycle::Stopping {
                return;
            }
            *lifecycle = Lifecycle::Stopping;
        }

        {
            let mut slam = lock_ignore_poison(&self.slam);
            if let Err(e) = slam.finalize() {
                log::warn!("SLAM finalize failed: {e}");
            }
            if let Err(e) = slam.stop() {
                log::warn!("SLAM stop failed: {e}");
            }
        }

        self.stop_flag.store(true, Ordering::Relaxed);
        self.notify_worker();
        if let Ok(mut guard) = self.worker.lock() {
            if let Some(thread) = guard.take() {
                let _ = thread.join();
            }
        }

        *lock_ignore_poison(&self.lifecycle) = Lifecycle::Destroyed;
        log::debug!("SLAM tracker dismantled");
    }
}

/// Runs the external system and drains poses between wakeups.
fn worker_loop(tracker: Arc<Tracker>) {
    log::debug!("SLAM worker starting");
    {
        let mut slam = lock_ignore_poison(&tracker.slam);
        if let Err(e) = slam.start() {
            log::error!("External SLAM start failed: {e}");
            return;
        }
    }

    loop {
        if tracker.stop_flag.load(Ordering::Relaxed) {
            break;
        }
        {
            let guard = lock_ignore_poison(&tracker.wakeup_guard);
            let (mut guard, _) = match tracker
                .wakeup
                .wait_timeout_while(guard, Duration::from_millis(100), |pending| !*pending)
            {
                Ok(r) => r,
                Err(_) => break,
            };
            *guard = false;
        }
        if tracker.stop_flag.load(Ordering::Relaxed) {
            break;
        }
        tracker.flush_poses();
    }
    log::debug!("SLAM worker stopping");
}

struct ImuSinkAdapter {
    tracker: Arc<Tracker>,
}

impl ImuSink for ImuSinkAdapter {
    fn push_imu(&self, sample: &ImuSample) {
        if !sample.validate() {
            log::warn!("Dropping non-finite IMU sample at {}", sample.timestamp_ns);
            return;
        }

        let submit;
        {
            let mut state = lock_ignore_poison(&self.tracker.state);
            if let Some(last) = state.last_imu_ts {
                if sample.timestamp_ns <= last {
                    debug_assert!(false, "IMU sample older than last");
                    log::warn!(
                        "IMU sample ({}) older than last ({last}), dropping",
                        sample.timestamp_ns
                    );
                    return;
                }
            }
            state.last_imu_ts = Some(sample.timestamp_ns);
            state.gyro_ff.push(sample.gyro_rad_s, sample.timestamp_ns);
            state.accel_ff.push(sample.accel_m_s2, sample.timestamp_ns);
            submit = state.submit;
        }

        if submit {
            let mut slam = lock_ignore_poison(&self.tracker.slam);
            slam.push_imu_sample(sample);
        }
        log::trace!(
            "imu t={} a={:?} w={:?}",
            sample.timestamp_ns,
            sample.accel_m_s2,
            sample.gyro_rad_s
        );
        self.tracker.notify_worker();
    }
}

struct FrameSinkAdapter {
    tracker: Arc<Tracker>,
    is_left: bool,
}

impl FrameSink for FrameSinkAdapter {
    fn push_frame(&self, frame: &Frame) {
        let submit;
        {
            let mut state = lock_ignore_poison(&self.tracker.state);

            // Stereo pairs arrive left then right; a right frame with no
            // left ever seen is a protocol violation.
            if !self.is_left && state.last_left_ts.is_none() {
                debug_assert!(false, "first frame was a right frame");
                log::warn!("Right frame before any left frame, dropping");
                return;
            }

            let last_ts = if self.is_left {
                &mut state.last_left_ts
            } else {
                &mut state.last_right_ts
            };
            if let Some(last) = *last_ts {
                if frame.timestamp_ns <= last {
                    debug_assert!(false, "frame older than last");
                    log::warn!(
                        "{} frame ({}) older than last ({last}), dropping",
                        if self.is_left { "Left" } else { "Right" },
                        frame.timestamp_ns
                    );
                    return;
                }
            }
            *last_ts = Some(frame.timestamp_ns);
            submit = state.submit;
        }

        if submit {
            let mut slam = lock_ignore_poison(&self.tracker.slam);
            slam.push_frame(frame, self.is_left);
        }
        log::trace!(
            "{} frame t={}",
            if self.is_left { " left" } else { "right" },
            frame.timestamp_ns
        );
        self.tracker.notify_worker();
    }
}

struct GtSinkAdapter {
    tracker: Arc<Tracker>,
}

impl PoseSink for GtSinkAdapter {
    fn push_pose(&self, timestamp_ns: u64, pose: &Pose) {
        let mut state = lock_ignore_poison(&self.tracker.state);
        if state.gt_trajectory.is_empty() {
            state.gt_origin = *pose;
        }
        state.gt_trajectory.insert(timestamp_ns, *pose);
    }
}

/// Interpolated ground-truth pose at `ts`, clamped to the trajectory ends.
fn gt_pose_at(gt: &BTreeMap<u64, Pose>, ts: u64) -> Option<Pose> {
    if gt.is_empty() {
        return None;
    }

    let mut after = gt.range(ts..);
    let mut before = gt.range(..=ts);

    match (before.next_back(), after.next()) {
        (Some((&lts, lpose)), Some((&rts, rpose))) => {
            if lts == rts {
                return Some(*lpose);
            }
            let t = (ts - lts) as f32 / (rts - lts) as f32;
            Some(Pose {
                orientation: quat_slerp(lpose.orientation, rpose.orientation, t),
                position: lpose.position.lerp(rpose.position, t),
            })
        }
        // Too far in the past: first pose. Too far in the future: last.
        (None, Some((_, pose))) => Some(*pose),
        (Some((_, pose)), None) => Some(*pose),
        (None, None) => None,
    }
}

fn ns_delta_s(from_ns: u64, to_ns: u64) -> f32 {
    if to_ns >= from_ns {
        ((to_ns - from_ns) as f64 / 1e9) as f32
    } else {
        -(((from_ns - to_ns) as f64 / 1e9) as f32)
    }
}
