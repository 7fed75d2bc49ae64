//! Typed calibration structs, as handed over by the configuration loader.
//!
//! Parsing the device's JSON/firmware blobs is the loader's concern; the
//! tracking core only consumes these already-typed shapes.

use glam::{Mat3, UVec2, Vec3};

use crate::math::Pose;

/// Pinhole intrinsics plus radial-tangential distortion for one camera.
#[derive(Clone, Copy, Debug, Default)]
pub struct CameraIntrinsics {
    pub fx: f32,
    pub fy: f32,
    pub cx: f32,
    pub cy: f32,
}

/// k1..k6 radial and p1/p2 tangential distortion coefficients.
#[derive(Clone, Copy, Debug, Default)]
pub struct CameraDistortion {
    pub k: [f32; 6],
    pub p: [f32; 2],
}

/// Calibration of one camera of a stereo pair.
#[derive(Clone, Copy, Debug)]
pub struct CameraCalibration {
    pub image_size: UVec2,
    pub intrinsics: CameraIntrinsics,
    pub distortion: CameraDistortion,
    /// Camera expressed in the device frame.
    pub device_from_camera: Pose,
}

impl CameraCalibration {
    /// Stereo extrinsic between two cameras of the same device: the left
    /// camera's pose expressed in the right camera's frame. This is the
    /// transform the hand-tracking triangulation consumes.
    pub fn left_in_right(left: &CameraCalibration, right: &CameraCalibration) -> Pose {
        right
            .device_from_camera
            .invert()
            .transform(&left.device_from_camera)
    }
}

/// Per-sensor rectification of an IMU part.
#[derive(Clone, Copy, Debug)]
pub struct ImuPartCalibration {
    /// Row-major misalignment/scale matrix; transpose before handing to
    /// column-major math.
    pub rectification: Mat3,
    pub offset: Vec3,
}

impl Default for ImuPartCalibration {
    fn default() -> ImuPartCalibration {
        ImuPartCalibration {
            rectification: Mat3::IDENTITY,
            offset: Vec3::ZERO,
        }
    }
}

/// Factory calibration of a device's main IMU.
#[derive(Clone, Copy, Debug)]
pub struct ImuCalibration {
    /// IMU expressed in the device frame.
    pub device_from_imu: Pose,
    pub gyro: ImuPartCalibration,
    pub accel: ImuPartCalibration,
    /// Accelerometer bias at 0 degrees Celsius.
    pub accel_offset_at_0c: Vec3,
    /// Per-degree drift of the accelerometer bias.
    pub accel_temp_coefficient: Vec3,
}

impl Default for ImuCalibration {
    fn default() -> ImuCalibration {
        ImuCalibration {
            device_from_imu: Pose::IDENTITY,
            gyro: ImuPartCalibration::default(),
            accel: ImuPartCalibration::default(),
            accel_offset_at_0c: Vec3::ZERO,
            accel_temp_coefficient: Vec3::ZERO,
        }
    }
}

/// One optical tracking sensor on a lighthouse-tracked device.
#[derive(Clone, Copy, Debug)]
pub struct LighthouseSensor {
    pub position: Vec3,
    pub normal: Vec3,
}

/// Positions and normals of all sensors on the device shell.
#[derive(Clone, Debug, Default)]
pub struct LighthouseSensors {
    pub sensors: Vec<LighthouseSensor>,
}

/// Calibration of a controller's IMU, relative to the controller's grip.
#[derive(Clone, Copy, Debug)]
pub struct ControllerImuCalibration {
    pub grip_from_imu: Pose,
    pub gyro: ImuPartCalibration,
    pub accel: ImuPartCalibration,
}

impl Default for ControllerImuCalibration {
    fn default() -> ControllerImuCalibration {
        ControllerImuCalibration {
            grip_from_imu: Pose::IDENTITY,
            gyro: ImuPartCalibration::default(),
            accel: ImuPartCalibration::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use glam::UVec2;

    #[test]
    fn test_stereo_extrinsic_from_camera_placements() {
        let eye = |x: f32| CameraCalibration {
            image_size: UVec2::new(640, 480),
            intrinsics: CameraIntrinsics::default(),
            distortion: CameraDistortion::default(),
            device_from_camera: Pose::from_position(Vec3::new(x, 0.0, 0.0)),
        };
        let left = eye(-0.045);
        let right = eye(0.045);

        let left_in_right = CameraCalibration::left_in_right(&left, &right);
        assert_relative_eq!(left_in_right.position.x, -0.09, epsilon = 1e-6);
        assert_relative_eq!(left_in_right.position.y, 0.0, epsilon = 1e-6);
    }
}
