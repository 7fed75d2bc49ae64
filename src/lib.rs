//! # sixdof - Tracking core for 6DOF mixed-reality devices
//!
//! Turns raw sensor streams (IMU samples at ~1 kHz, stereo camera frames at
//! ~30 Hz, optional external-SLAM poses) into a coherent, time-aligned stream
//! of rigid-body states suitable for rendering and application queries.
//! Provides:
//! - A space-relation algebra: pose + velocities + validity/tracking bits,
//!   fixed-capacity relation chains and an interpolating history buffer
//! - A 3DOF orientation fuser and one-Euro/moving-average/exponential
//!   output filters
//! - An adapter that fans camera/IMU data into an external SLAM system and
//!   answers predicted, filtered pose queries
//! - A hand-skeleton CCD IK solver (21 keypoints in, 26 joint poses out)
//!
//! ## Quick Start
//! ```no_run
//! use sixdof::relation::{Relation, RelationChain};
//! use sixdof::math::Pose;
//! use glam::Vec3;
//!
//! let mut chain = RelationChain::new();
//! chain.push_relation(&Relation::from_pose(Pose::IDENTITY));
//! chain.push_pose_if_not_identity(&Pose::from_position(Vec3::new(0.0, 1.8, 0.0)));
//! let head = chain.resolve();
//! println!("pos: {:?}", head.pose.position);
//! ```

pub mod calib;
pub mod device;
pub mod error;
pub mod filters;
pub mod frame;
pub mod hand;
pub mod imu;
pub mod math;
pub mod relation;
pub mod slam;

pub use error::TrackingError;
pub use math::Pose;
pub use relation::{Relation, RelationChain, RelationFlags, RelationHistory};

/// Result type alias for sixdof operations.
pub type Result<T> = std::result::Result<T, TrackingError>;

/// Standard gravity in m/s^2, used by the fuser and the SLAM prediction path.
pub const STANDARD_GRAVITY: f32 = 9.8066;
