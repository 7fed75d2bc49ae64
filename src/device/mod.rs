//! Tracked devices: the query surface a compositor or application consumes,
//! plus the per-device clock and ingestion machinery behind it.

pub mod clock;
pub mod hands;
pub mod sixdof;
pub mod threedof;

pub use clock::ClockOffsetEstimator;
pub use hands::HandTrackingDevice;
pub use sixdof::SixDofDevice;
pub use threedof::{ImuSource, ThreeDofDevice};

use glam::Vec2;

use crate::hand::HandJointSet;
use crate::math::Pose;
use crate::relation::{Relation, RelationChain};
use crate::Result;

/// Value carried by a button or axis input.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum InputValue {
    Click(bool),
    Axis1(f32),
    Axis2(Vec2),
}

/// Cached state of one input, refreshed by [`TrackedDevice::update_inputs`].
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct InputState {
    /// When this value was last known valid, host monotonic.
    pub timestamp_ns: u64,
    pub value: InputValue,
}

/// A vibration request for a haptic output.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Vibration {
    pub frequency_hz: f32,
    /// In `[0, 1]`; zero disables the actuator.
    pub amplitude: f32,
    pub duration_ns: u64,
}

/// Value set on a device output.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum OutputValue {
    Vibration(Vibration),
}

/// The capability set of a tracked device.
///
/// Implementations are concrete device kinds dispatched through this trait;
/// there is no layered inheritance. All methods are safe to call from the
/// rendering hot path: they snapshot state under short-lived locks and never
/// block on I/O.
pub trait TrackedDevice: Send + Sync {
    /// Stable, human-readable device name for logs.
    fn name(&self) -> &str;

    /// Refresh cached button/axis timestamps to now.
    fn update_inputs(&self);

    /// Resolve the relation of `input_name` at `at_timestamp_ns`, expressed
    /// in the device's tracking origin.
    fn get_tracked_pose(&self, input_name: &str, at_timestamp_ns: u64) -> Result<Relation>;

    /// Full hand joint set for hand-tracking inputs. The default declines;
    /// only hand devices implement it.
    fn get_hand_tracking(
        &self,
        input_name: &str,
        at_timestamp_ns: u64,
    ) -> Result<(HandJointSet, u64)> {
        let _ = at_timestamp_ns;
        Err(crate::TrackingError::UnknownInput(input_name.to_string()))
    }

    /// Per-view (eye) relations for rendering: the tracked relation of
    /// `input_name` with each view's offset applied.
    fn get_view_poses(
        &self,
        input_name: &str,
        view_offsets: &[Pose],
        at_timestamp_ns: u64,
    ) -> Result<Vec<Relation>> {
        let head = self.get_tracked_pose(input_name, at_timestamp_ns)?;
        Ok(view_offsets
            .iter()
            .map(|offset| {
                let mut chain = RelationChain::new();
                chain.push_pose_if_not_identity(offset);
                chain.push_relation(&head);
                chain.resolve()
            })
            .collect())
    }

    /// Set a haptic (or other) output.
    fn set_output(&self, output_name: &str, value: &OutputValue) -> Result<()>;
}

/// Scale a normalized `[0, 1]` amplitude into a device's operating range.
/// Zero stays zero, meaning "off".
pub(crate) fn scale_amplitude(amplitude: f32, device_min: f32, device_max: f32) -> f32 {
    if amplitude <= 0.0 {
        return 0.0;
    }
    let amplitude = amplitude.min(1.0);
    device_min + amplitude * (device_max - device_min)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_scale_amplitude_zero_is_off() {
        assert_eq!(scale_amplitude(0.0, 0.2, 1.0), 0.0);
        assert_eq!(scale_amplitude(-1.0, 0.2, 1.0), 0.0);
    }

    #[test]
    fn test_scale_amplitude_maps_into_range() {
        assert_relative_eq!(scale_amplitude(1.0, 0.2, 1.0), 1.0, epsilon = 1e-6);
        assert_relative_eq!(scale_amplitude(0.5, 0.2, 1.0), 0.6, epsilon = 1e-6);
        // Over-range input clamps.
        assert_relative_eq!(scale_amplitude(2.0, 0.2, 1.0), 1.0, epsilon = 1e-6);
    }
}
