//! Timestamp-keyed ring buffer of relations with exact lookup,
//! interpolation and forward/backward prediction.

use std::collections::VecDeque;

use crate::math::quat_finite_difference;
use crate::relation::{Relation, RelationFlags};

/// Default number of samples kept; at 1 kHz this is about four seconds.
const DEFAULT_CAPACITY: usize = 4096;

/// How the result of a [`RelationHistory::get`] lookup was produced.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RelationLookup {
    /// The timestamp was invalid (0) or the buffer was empty.
    Invalid,
    /// The exact timestamp was found.
    Exact,
    /// The timestamp fell between two entries.
    Interpolated,
    /// The timestamp was newer than the most recent entry.
    Predicted,
    /// The timestamp was older than the oldest entry.
    ReversePredicted,
}

/// Ring buffer of `(timestamp_ns, Relation)` keyed by strictly increasing
/// timestamps. Reads never modify the buffer; synchronization is the
/// owner's responsibility.
#[derive(Clone, Debug)]
pub struct RelationHistory {
    samples: VecDeque<(u64, Relation)>,
    capacity: usize,
}

impl RelationHistory {
    pub fn new() -> RelationHistory {
        RelationHistory::with_capacity(DEFAULT_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> RelationHistory {
        RelationHistory {
            samples: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn clear(&mut self) {
        self.samples.clear();
    }

    /// Append a relation at `timestamp_ns`. Timestamps must be strictly
    /// increasing; regressions and duplicates are dropped. When full, the
    /// oldest sample is popped out the other side.
    pub fn push(&mut self, relation: &Relation, timestamp_ns: u64) {
        if let Some(&(last_ts, _)) = self.samples.back() {
            if timestamp_ns <= last_ts {
                log::trace!(
                    "History push out of order ({timestamp_ns} <= {last_ts}), dropping"
                );
                return;
            }
        }
        if self.samples.len() == self.capacity {
            self.samples.pop_front();
        }
        self.samples.push_back((timestamp_ns, *relation));
    }

    /// The most recent sample, if any.
    pub fn get_latest(&self) -> Option<(u64, Relation)> {
        self.samples.back().copied()
    }

    /// Interpolate or extrapolate to `at_timestamp_ns`. Read-only.
    pub fn get(&self, at_timestamp_ns: u64) -> (RelationLookup, Relation) {
        if self.samples.is_empty() || at_timestamp_ns == 0 {
            return (RelationLookup::Invalid, Relation::ZERO);
        }

        let Some(&(newest_ts, newest)) = self.samples.back() else {
            return (RelationLookup::Invalid, Relation::ZERO);
        };
        if at_timestamp_ns > newest_ts {
            let dt = ns_to_s(at_timestamp_ns - newest_ts);
            return (RelationLookup::Predicted, newest.predict(dt));
        }

        let Some(&(oldest_ts, oldest)) = self.samples.front() else {
            return (RelationLookup::Invalid, Relation::ZERO);
        };
        if at_timestamp_ns < oldest_ts {
            let dt = -ns_to_s(oldest_ts - at_timestamp_ns);
            return (RelationLookup::ReversePredicted, oldest.predict(dt));
        }

        // Binary search over the (sorted) timestamps.
        let idx = self
            .samples
            .partition_point(|&(ts, _)| ts < at_timestamp_ns);
        let (right_ts, right) = self.samples[idx];
        if right_ts == at_timestamp_ns {
            return (RelationLookup::Exact, right);
        }

        let (left_ts, left) = self.samples[idx - 1];
        let amount = (at_timestamp_ns - left_ts) as f32 / (right_ts - left_ts) as f32;
        let flags = left.flags & right.flags;
        let rel = Relation::interpolate(&left, &right, amount, flags);
        (RelationLookup::Interpolated, rel)
    }

    /// Fill in the velocity fields of `relation` (assumed to be at
    /// `timestamp_ns`) by finite differencing against the most recent stored
    /// sample. Velocity valid bits are set only where both relations carry
    /// the corresponding pose component.
    pub fn estimate_motion(&self, relation: &Relation, timestamp_ns: u64) -> Relation {
        let mut out = *relation;

        let Some((last_ts, last)) = self.get_latest() else {
            return out;
        };
        if timestamp_ns <= last_ts {
            return out;
        }
        let dt = ns_to_s(timestamp_ns - last_ts);

        let both_position = (relation.flags & last.flags).contains(RelationFlags::POSITION_VALID);
        let both_orientation =
            (relation.flags & last.flags).contains(RelationFlags::ORIENTATION_VALID);

        if both_position {
            out.linear_velocity = (relation.pose.position - last.pose.position) / dt;
            out.flags |= RelationFlags::LINEAR_VELOCITY_VALID;
        }
        if both_orientation {
            out.angular_velocity =
                quat_finite_difference(last.pose.orientation, relation.pose.orientation, dt);
            out.flags |= RelationFlags::ANGULAR_VELOCITY_VALID;
        }
        out
    }
}

impl Default for RelationHistory {
    fn default() -> RelationHistory {
        RelationHistory::new()
    }
}

fn ns_to_s(ns: u64) -> f32 {
    ns as f64 as f32 / 1e9
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::Pose;
    use approx::assert_relative_eq;
    use glam::Vec3;

    fn rel_at(x: f32) -> Relation {
        Relation::from_pose(Pose::from_position(Vec3::new(x, 0.0, 0.0)))
    }

    #[test]
    fn test_empty_and_zero_timestamp_are_invalid() {
        let mut h = RelationHistory::new();
        assert_eq!(h.get(100).0, RelationLookup::Invalid);

        h.push(&rel_at(1.0), 100);
        assert_eq!(h.get(0).0, RelationLookup::Invalid);
    }

    #[test]
    fn test_push_drops_regressions() {
        let mut h = RelationHistory::new();
        h.push(&rel_at(1.0), 100);
        h.push(&rel_at(2.0), 50); // regression, dropped
        h.push(&rel_at(3.0), 100); // duplicate, dropped
        h.push(&rel_at(4.0), 200);
        assert_eq!(h.len(), 2);
        assert_eq!(h.get_latest().unwrap().0, 200);
    }

    #[test]
    fn test_exact_hit() {
        let mut h = RelationHistory::new();
        h.push(&rel_at(1.0), 100);
        h.push(&rel_at(2.0), 200);

        let (kind, r) = h.get(200);
        assert_eq!(kind, RelationLookup::Exact);
        assert_relative_eq!(r.pose.position.x, 2.0, epsilon = 1e-6);

        let (kind, r) = h.get(100);
        assert_eq!(kind, RelationLookup::Exact);
        assert_relative_eq!(r.pose.position.x, 1.0, epsilon = 1e-6);
    }

    #[test]
    fn test_interpolation_stays_on_segment() {
        let mut h = RelationHistory::new();
        h.push(&rel_at(1.0), 100);
        h.push(&rel_at(3.0), 300);

        let (kind, r) = h.get(200);
        assert_eq!(kind, RelationLookup::Interpolated);
        assert_relative_eq!(r.pose.position.x, 2.0, epsilon = 1e-5);
        assert_relative_eq!(r.pose.position.y, 0.0, epsilon = 1e-6);
        assert_eq!(r.flags, RelationFlags::POSE_VALID);
    }

    #[test]
    fn test_forward_prediction_uses_velocity() {
        let mut h = RelationHistory::new();
        let mut r = rel_at(1.0);
        r.flags |= RelationFlags::LINEAR_VELOCITY_VALID;
        r.linear_velocity = Vec3::new(1.0, 0.0, 0.0);
        h.push(&r, 1_000_000_000);

        let (kind, p) = h.get(2_000_000_000);
        assert_eq!(kind, RelationLookup::Predicted);
        assert_relative_eq!(p.pose.position.x, 2.0, epsilon = 1e-4);
    }

    #[test]
    fn test_reverse_prediction_integrates_backward() {
        let mut h = RelationHistory::new();
        let mut r = rel_at(1.0);
        r.flags |= RelationFlags::LINEAR_VELOCITY_VALID;
        r.linear_velocity = Vec3::new(1.0, 0.0, 0.0);
        h.push(&r, 2_000_000_000);
        h.push(&rel_at(5.0), 3_000_000_000);

        let (kind, p) = h.get(1_000_000_000);
        assert_eq!(kind, RelationLookup::ReversePredicted);
        assert_relative_eq!(p.pose.position.x, 0.0, epsilon = 1e-4);
    }

    #[test]
    fn test_capacity_evicts_oldest() {
        let mut h = RelationHistory::with_capacity(4);
        for i in 1..=6u64 {
            h.push(&rel_at(i as f32), i * 100);
        }
        assert_eq!(h.len(), 4);
        // Oldest two evicted; a query before 300 now reverse-predicts.
        let (kind, _) = h.get(100);
        assert_eq!(kind, RelationLookup::ReversePredicted);
    }

    #[test]
    fn test_estimate_motion_finite_differences() {
        let mut h = RelationHistory::new();
        h.push(&rel_at(1.0), 1_000_000_000);

        let next = rel_at(2.0);
        let with_motion = h.estimate_motion(&next, 2_000_000_000);
        assert!(with_motion
            .flags
            .contains(RelationFlags::LINEAR_VELOCITY_VALID));
        assert_relative_eq!(with_motion.linear_velocity.x, 1.0, epsilon = 1e-4);
    }
}
