//! Exponential smoothing over whole relations.

use crate::relation::Relation;

/// Exponential smoothing filter: the state lerps toward each new target by
/// `alpha` (slerp for the orientation). Small alphas smooth more at the cost
/// of added latency.
#[derive(Clone, Copy, Debug)]
pub struct ExponentialSmoother {
    pub alpha: f32,
    last: Relation,
    have_last: bool,
}

impl ExponentialSmoother {
    pub fn new(alpha: f32) -> ExponentialSmoother {
        ExponentialSmoother {
            alpha,
            last: Relation::ZERO,
            have_last: false,
        }
    }

    /// Pull the smoothed state toward `target` and return it. The target's
    /// flags are carried through unchanged.
    pub fn run(&mut self, target: &Relation) -> Relation {
        if !self.have_last {
            self.have_last = true;
            self.last = *target;
            return *target;
        }

        self.last = Relation::interpolate(&self.last, target, self.alpha, target.flags);
        self.last
    }

    pub fn reset(&mut self) {
        self.have_last = false;
        self.last = Relation::ZERO;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::Pose;
    use approx::assert_relative_eq;
    use glam::Vec3;

    #[test]
    fn test_first_target_passes_through() {
        let mut s = ExponentialSmoother::new(0.1);
        let target = Relation::from_pose(Pose::from_position(Vec3::new(1.0, 2.0, 3.0)));
        let out = s.run(&target);
        assert_relative_eq!(out.pose.position.x, 1.0, epsilon = 1e-6);
    }

    #[test]
    fn test_lags_behind_step() {
        let mut s = ExponentialSmoother::new(0.25);
        s.run(&Relation::from_pose(Pose::from_position(Vec3::ZERO)));

        let target = Relation::from_pose(Pose::from_position(Vec3::new(4.0, 0.0, 0.0)));
        let out = s.run(&target);
        assert_relative_eq!(out.pose.position.x, 1.0, epsilon = 1e-6);

        // Converges toward the target over repeated updates.
        let mut last = out;
        for _ in 0..50 {
            last = s.run(&target);
        }
        assert_relative_eq!(last.pose.position.x, 4.0, epsilon = 1e-3);
    }
}
