//! IMU sample types, the per-device pre-filter and the 3DOF orientation
//! fuser.

pub mod fusion;
pub mod pre_filter;

pub use fusion::{Fusion3Dof, GravityDuration};
pub use pre_filter::ImuPreFilter;

use glam::Vec3;

/// One calibrated IMU reading in SI units.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ImuSample {
    /// Device hardware timestamp mapped into the host monotonic clock.
    pub timestamp_ns: u64,
    /// Linear acceleration in m/s^2.
    pub accel_m_s2: Vec3,
    /// Angular velocity in rad/s.
    pub gyro_rad_s: Vec3,
}

impl ImuSample {
    pub fn new(timestamp_ns: u64, accel_m_s2: Vec3, gyro_rad_s: Vec3) -> ImuSample {
        ImuSample {
            timestamp_ns,
            accel_m_s2,
            gyro_rad_s,
        }
    }

    /// False if any component is NaN or infinite.
    pub fn validate(&self) -> bool {
        self.accel_m_s2.is_finite() && self.gyro_rad_s.is_finite()
    }
}
