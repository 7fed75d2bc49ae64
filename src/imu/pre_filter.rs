//! Converts raw integer IMU ticks to calibrated SI samples.

use glam::{IVec3, Mat3, Vec3};

/// Per-sensor scale, bias and gain.
#[derive(Clone, Copy, Debug)]
pub struct ImuPreFilterPart {
    /// Conversion factor from raw ticks to float units.
    pub ticks_to_float: f32,
    /// Per-axis offset, subtracted after tick conversion.
    pub bias: Vec3,
    /// Per-axis gain, applied after the bias.
    pub gain: Vec3,
}

impl ImuPreFilterPart {
    fn new(ticks_to_float: f32) -> ImuPreFilterPart {
        ImuPreFilterPart {
            ticks_to_float,
            bias: Vec3::ZERO,
            gain: Vec3::ONE,
        }
    }

    fn apply(&self, ticks: IVec3) -> Vec3 {
        (ticks.as_vec3() * self.ticks_to_float - self.bias) * self.gain
    }
}

/// Pre-filter that turns raw accelerometer/gyroscope ticks into SI units:
/// scale to float, subtract bias, apply gain, then remap axes into the
/// common device convention.
#[derive(Clone, Copy, Debug)]
pub struct ImuPreFilter {
    pub accel: ImuPreFilterPart,
    pub gyro: ImuPreFilterPart,
    /// Axis remap applied to both sensors, identity by default.
    /// Column-major; transpose row-major calibration matrices when filling.
    pub transform: Mat3,
}

impl ImuPreFilter {
    pub fn new(ticks_to_float_accel: f32, ticks_to_float_gyro: f32) -> ImuPreFilter {
        ImuPreFilter {
            accel: ImuPreFilterPart::new(ticks_to_float_accel),
            gyro: ImuPreFilterPart::new(ticks_to_float_gyro),
            transform: Mat3::IDENTITY,
        }
    }

    /// Swap the X and Y axes, for devices that mirror handedness.
    pub fn set_switch_x_and_y(&mut self) {
        self.transform = Mat3::from_cols(Vec3::Y, Vec3::X, Vec3::Z);
    }

    /// Filter one raw sample into calibrated accel (m/s^2) and gyro (rad/s)
    /// readings.
    pub fn filter_data(&self, accel_ticks: IVec3, gyro_ticks: IVec3) -> (Vec3, Vec3) {
        let a = self.transform * self.accel.apply(accel_ticks);
        let g = self.transform * self.gyro.apply(gyro_ticks);
        (a, g)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_scale_bias_gain_order() {
        let mut f = ImuPreFilter::new(0.5, 1.0);
        f.accel.bias = Vec3::new(1.0, 0.0, 0.0);
        f.accel.gain = Vec3::new(2.0, 1.0, 1.0);

        let (a, _) = f.filter_data(IVec3::new(4, 2, 0), IVec3::ZERO);
        // 4 * 0.5 = 2.0, minus bias 1.0, times gain 2.0.
        assert_relative_eq!(a.x, 2.0, epsilon = 1e-6);
        assert_relative_eq!(a.y, 1.0, epsilon = 1e-6);
    }

    #[test]
    fn test_switch_x_and_y() {
        let mut f = ImuPreFilter::new(1.0, 1.0);
        f.set_switch_x_and_y();

        let (_, g) = f.filter_data(IVec3::ZERO, IVec3::new(1, 2, 3));
        assert_relative_eq!(g.x, 2.0, epsilon = 1e-6);
        assert_relative_eq!(g.y, 1.0, epsilon = 1e-6);
        assert_relative_eq!(g.z, 3.0, epsilon = 1e-6);
    }

    #[test]
    fn test_identity_transform_by_default() {
        let f = ImuPreFilter::new(1.0, 1.0);
        let (a, g) = f.filter_data(IVec3::new(1, 2, 3), IVec3::new(-1, -2, -3));
        assert_relative_eq!(a.z, 3.0, epsilon = 1e-6);
        assert_relative_eq!(g.z, -3.0, epsilon = 1e-6);
    }
}
