//! 3DOF orientation fuser: gyro integration with a slow gravity-alignment
//! correction from the accelerometer.

use glam::{Quat, Vec3};

use crate::imu::ImuSample;
use crate::math::{quat_from_angle_vector, quat_integrate_velocity};
use crate::STANDARD_GRAVITY;

/// World down direction: accelerations measured at rest align with this once
/// rotated into world space.
const WORLD_DOWN: Vec3 = Vec3::new(0.0, -1.0, 0.0);

/// Samples with gaps longer than this are integrated as if the gap were this
/// long, to survive pauses without a correction spike.
const MAX_DT_S: f32 = 0.2;

/// Accelerometer magnitudes further than this from standard gravity
/// contribute no gravity correction at all.
const ACCEL_TRUST_RANGE_M_S2: f32 = 1.0;

/// Low-pass time constant of the gravity correction.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum GravityDuration {
    /// Fast correction, tolerates more accelerometer noise leaking into
    /// orientation. Suited to controllers.
    Ms20,
    /// Slow correction for head-mounted devices.
    Ms300,
}

impl GravityDuration {
    fn time_constant_s(self) -> f32 {
        match self {
            GravityDuration::Ms20 => 0.020,
            GravityDuration::Ms300 => 0.300,
        }
    }
}

/// Gyro-integrating orientation fuser with accelerometer gravity correction.
///
/// Feed time-ordered samples through [`update`]; query the fused orientation
/// with [`orientation`] or a forward-predicted one with [`predict`].
///
/// [`update`]: Fusion3Dof::update
/// [`orientation`]: Fusion3Dof::orientation
/// [`predict`]: Fusion3Dof::predict
#[derive(Clone, Copy, Debug)]
pub struct Fusion3Dof {
    gravity: GravityDuration,
    rot: Quat,
    last_ns: u64,
    last_angular_velocity: Vec3,
    started: bool,
}

impl Fusion3Dof {
    pub fn new(gravity: GravityDuration) -> Fusion3Dof {
        Fusion3Dof {
            gravity,
            rot: Quat::IDENTITY,
            last_ns: 0,
            last_angular_velocity: Vec3::ZERO,
            started: false,
        }
    }

    /// Incorporate one sample. Non-finite samples and timestamp regressions
    /// are dropped.
    pub fn update(&mut self, sample: &ImuSample) {
        if !sample.validate() {
            log::warn!("Dropping non-finite IMU sample at {}", sample.timestamp_ns);
            return;
        }

        if !self.started {
            self.started = true;
            self.last_ns = sample.timestamp_ns;
            self.last_angular_velocity = sample.gyro_rad_s;
            return;
        }

        if sample.timestamp_ns <= self.last_ns {
            // Clock-offset mapping can collapse neighboring timestamps.
            log::trace!(
                "IMU timestamp regression ({} <= {}), dropping",
                sample.timestamp_ns,
                self.last_ns
            );
            return;
        }

        let dt = (((sample.timestamp_ns - self.last_ns) as f64) / 1e9).min(MAX_DT_S as f64) as f32;
        self.last_ns = sample.timestamp_ns;

        self.rot = quat_integrate_velocity(self.rot, sample.gyro_rad_s, dt);
        self.gravity_correction(sample.accel_m_s2, dt);
        self.last_angular_velocity = sample.gyro_rad_s;
    }

    /// Nudge the orientation so the rotated accelerometer reading lines up
    /// with world down. Trust falls off linearly as the magnitude departs
    /// from standard gravity, so sustained linear acceleration contributes
    /// little.
    fn gravity_correction(&mut self, accel: Vec3, dt: f32) {
        let accel_length = accel.length();
        if accel_length < f32::EPSILON {
            return;
        }

        let trust = 1.0 - ((accel_length - STANDARD_GRAVITY).abs() / ACCEL_TRUST_RANGE_M_S2);
        if trust <= 0.0 {
            return;
        }

        let measured_down = (self.rot * (accel / accel_length)).normalize();
        let axis = measured_down.cross(WORLD_DOWN);
        let axis_length = axis.length();
        if axis_length < 1e-6 {
            return;
        }

        let tilt_angle = measured_down.dot(WORLD_DOWN).clamp(-1.0, 1.0).acos();

        // First-order low-pass toward alignment over the configured duration.
        let tau = self.gravity.time_constant_s();
        let alpha = dt / (tau + dt);
        let correction = quat_from_angle_vector(tilt_angle * alpha * trust, axis / axis_length);

        // World-frame correction, applied on the left.
        self.rot = (correction * self.rot).normalize();
    }

    /// The fused orientation.
    pub fn orientation(&self) -> Quat {
        self.rot
    }

    /// Gyro reading of the most recent sample, after calibration.
    pub fn angular_velocity(&self) -> Vec3 {
        self.last_angular_velocity
    }

    /// Timestamp of the most recent incorporated sample, zero before any.
    pub fn last_timestamp_ns(&self) -> u64 {
        self.last_ns
    }

    /// True once at least one sample has been incorporated.
    pub fn valid(&self) -> bool {
        self.started
    }

    /// Orientation predicted at `at_timestamp_ns` by integrating the cached
    /// angular velocity forward from the last sample.
    pub fn predict(&self, at_timestamp_ns: u64) -> Quat {
        if !self.started || at_timestamp_ns <= self.last_ns {
            return self.rot;
        }
        let dt = ((at_timestamp_ns - self.last_ns) as f64 / 1e9) as f32;
        quat_integrate_velocity(self.rot, self.last_angular_velocity, dt)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use std::f32::consts::PI;

    const MS: u64 = 1_000_000;
    const AT_REST: Vec3 = Vec3::new(0.0, -STANDARD_GRAVITY, 0.0);

    /// Feed 1 kHz samples covering `(start_ms, start_ms + millis]`.
    fn feed(fusion: &mut Fusion3Dof, start_ms: u64, millis: u64, accel: Vec3, gyro: Vec3) {
        for i in start_ms..=start_ms + millis {
            fusion.update(&ImuSample::new(i * MS + 1, accel, gyro));
        }
    }

    #[test]
    fn test_stationary_device_stays_level() {
        let mut fusion = Fusion3Dof::new(GravityDuration::Ms300);
        feed(&mut fusion, 0, 1000, AT_REST, Vec3::ZERO);

        let q = fusion.orientation();
        let inner = q.dot(Quat::IDENTITY);
        assert!(1.0 - inner * inner < 1e-3, "drifted to {q:?}");
        assert_eq!(fusion.angular_velocity(), Vec3::ZERO);
    }

    #[test]
    fn test_yaw_rotation_integrates_to_half_turn() {
        let mut fusion = Fusion3Dof::new(GravityDuration::Ms300);
        // pi rad/s about Y; gravity stays aligned throughout a yaw.
        feed(&mut fusion, 0, 1000, AT_REST, Vec3::new(0.0, PI, 0.0));

        let q = fusion.orientation();
        let expected = Quat::from_rotation_y(PI);
        let inner = q.dot(expected);
        assert!(1.0 - inner * inner < 1e-2, "expected half turn, got {q:?}");
    }

    #[test]
    fn test_gravity_pulls_tilt_back() {
        let mut fusion = Fusion3Dof::new(GravityDuration::Ms20);
        feed(&mut fusion, 0, 10, AT_REST, Vec3::ZERO);

        // Knock the estimate off-level, then feed resting samples; the
        // correction must restore it.
        fusion.rot = Quat::from_rotation_z(0.3);
        feed(&mut fusion, 11, 2000, AT_REST, Vec3::ZERO);

        let inner = fusion.orientation().dot(Quat::IDENTITY);
        assert!(1.0 - inner * inner < 1e-3);
    }

    #[test]
    fn test_heavy_acceleration_is_distrusted() {
        let mut fusion = Fusion3Dof::new(GravityDuration::Ms20);
        feed(&mut fusion, 0, 10, AT_REST, Vec3::ZERO);
        fusion.rot = Quat::from_rotation_z(0.3);
        let tilted = fusion.orientation();

        // 3g sideways: far from standard gravity, no correction applied.
        let sideways = Vec3::new(3.0 * STANDARD_GRAVITY, 0.0, 0.0);
        feed(&mut fusion, 11, 500, sideways, Vec3::ZERO);
        let inner = fusion.orientation().dot(tilted);
        assert!(1.0 - inner * inner < 1e-6);
    }

    #[test]
    fn test_prediction_extrapolates_gyro() {
        let mut fusion = Fusion3Dof::new(GravityDuration::Ms300);
        feed(&mut fusion, 0, 100, AT_REST, Vec3::new(0.0, 1.0, 0.0));

        let now = fusion.last_timestamp_ns();
        let predicted = fusion.predict(now + 500 * MS);
        let diff = fusion.orientation().conjugate() * predicted;
        let angle = 2.0 * diff.w.abs().clamp(0.0, 1.0).acos();
        assert_relative_eq!(angle, 0.5, epsilon = 1e-2);
    }

    #[test]
    fn test_non_finite_sample_dropped() {
        let mut fusion = Fusion3Dof::new(GravityDuration::Ms300);
        feed(&mut fusion, 0, 10, AT_REST, Vec3::ZERO);
        let before = fusion.orientation();

        fusion.update(&ImuSample::new(
            20 * MS,
            Vec3::new(f32::NAN, 0.0, 0.0),
            Vec3::ZERO,
        ));
        assert_eq!(fusion.orientation(), before);
    }
}
