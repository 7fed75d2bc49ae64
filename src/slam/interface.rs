//! Interface to the external SLAM implementation.
//!
//! The tracking core never runs visual-inertial odometry itself; it feeds an
//! external system through this trait and dequeues the poses it produces.

use glam::{Quat, Vec3};

use crate::frame::Frame;
use crate::imu::ImuSample;
use crate::Result;

/// Optional capabilities a SLAM implementation may expose.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SlamFeature {
    /// Per-pose internal pipeline timestamps for performance analysis.
    PoseExtTiming,
}

/// Result of enabling a feature via [`SlamImplementation::use_feature`].
#[derive(Clone, Debug)]
pub enum SlamFeatureResult {
    /// Names of the extra timing columns the system will report per pose.
    TimingColumns(Vec<String>),
}

/// A 6DOF pose estimated by the external system.
#[derive(Clone, Debug)]
pub struct SlamPose {
    /// Timestamp of the camera sample this pose was estimated for.
    pub timestamp_ns: u64,
    pub position: Vec3,
    pub orientation: Quat,
    /// Internal pipeline timestamps, present only when
    /// [`SlamFeature::PoseExtTiming`] has been enabled.
    pub timing: Vec<u64>,
}

/// The capability set of an external SLAM system.
///
/// Lifecycle is one-way: `initialize` → `start` → (`stop`, `finalize`).
/// Push calls are expected to enqueue cheaply; the system runs its own
/// pipeline threads. Callers must not invoke these methods while holding
/// tracker state locks, the implementation may reenter the runtime.
pub trait SlamImplementation: Send {
    fn initialize(&mut self) -> Result<()>;

    /// Begin processing queued samples.
    fn start(&mut self) -> Result<()>;

    /// Stop processing. No samples may be pushed afterwards.
    fn stop(&mut self) -> Result<()>;

    /// Perform final computations (e.g. map save) before `stop`.
    fn finalize(&mut self) -> Result<()>;

    fn push_imu_sample(&mut self, sample: &ImuSample);

    /// Push one camera frame. The implementation clones the frame (sharing
    /// the pixel buffer) if it needs it past this call, and releases its
    /// clone when done with it.
    fn push_frame(&mut self, frame: &Frame, is_left: bool);

    /// Dequeue the next estimated pose, oldest first.
    fn try_dequeue_pose(&mut self) -> Option<SlamPose>;

    fn supports_feature(&self, feature: SlamFeature) -> bool;

    /// Enable a supported feature. Returns `None` when unsupported.
    fn use_feature(&mut self, feature: SlamFeature) -> Option<SlamFeatureResult>;
}
