//! One-Euro filters: adaptive low-pass whose cutoff follows the estimated
//! signal velocity.
//!
//! See Casiez, G., Roussel, N., and Vogel, D. 2012. "1 € filter: a simple
//! speed-based low-pass filter for noisy input in interactive systems",
//! CHI '12. Available at: https://hal.inria.fr/hal-00670496/document
//!
//! Every variant offers `run` (filter and commit state) and `run_no_commit`
//! (filter without mutating state), the latter for prediction queries that
//! may be asked repeatedly for the same frame.

use glam::{Quat, Vec2, Vec3};

use crate::math::quat_slerp;

// Suggestions. These are suitable for head tracking.
pub const HEAD_TRACKING_FC_MIN: f32 = 30.0;
pub const HEAD_TRACKING_FC_MIN_D: f32 = 25.0;
pub const HEAD_TRACKING_BETA: f32 = 0.6;

/// Smoothing factor for a low-pass at cutoff `fc` sampled `dt` seconds
/// apart: `1 / (1 + 1/(2π·fc·dt))`.
fn smoothing_alpha(fc: f32, dt: f32) -> f32 {
    let r = 2.0 * std::f32::consts::PI * fc * dt;
    r / (r + 1.0)
}

fn exp_smooth(alpha: f32, y: f32, prev_y: f32) -> f32 {
    alpha * y + (1.0 - alpha) * prev_y
}

/// Parameters and timing state shared by all variants.
#[derive(Clone, Copy, Debug)]
struct Base {
    /// Minimum frequency cutoff for the signal filter.
    fc_min: f32,
    /// Minimum frequency cutoff for the derivative filter.
    fc_min_d: f32,
    /// Speed coefficient: responsiveness under fast motion.
    beta: f32,
    have_prev_y: bool,
    prev_ts: u64,
}

impl Base {
    fn new(fc_min: f32, fc_min_d: f32, beta: f32) -> Base {
        Base {
            fc_min,
            fc_min_d,
            beta,
            have_prev_y: false,
            prev_ts: 0,
        }
    }

    fn dt_s(&self, ts: u64) -> f32 {
        (ts.saturating_sub(self.prev_ts)) as f64 as f32 / 1e9
    }
}

/// One-Euro filter for a single float measurement.
#[derive(Clone, Copy, Debug)]
pub struct OneEuroF32 {
    base: Base,
    prev_y: f32,
    prev_dy: f32,
}

impl OneEuroF32 {
    pub fn new(fc_min: f32, fc_min_d: f32, beta: f32) -> OneEuroF32 {
        OneEuroF32 {
            base: Base::new(fc_min, fc_min_d, beta),
            prev_y: 0.0,
            prev_dy: 0.0,
        }
    }

    fn step(&self, ts: u64, y: f32) -> (f32, OneEuroF32) {
        if !self.base.have_prev_y {
            let mut next = *self;
            next.base.have_prev_y = true;
            next.base.prev_ts = ts;
            next.prev_y = y;
            next.prev_dy = 0.0;
            return (y, next);
        }

        let dt = self.base.dt_s(ts);
        if dt <= 0.0 {
            return (self.prev_y, *self);
        }
        let mut next = *self;
        next.base.prev_ts = ts;

        let alpha_d = smoothing_alpha(self.base.fc_min_d, dt);
        let dy = (y - self.prev_y) / dt;
        next.prev_dy = exp_smooth(alpha_d, dy, self.prev_dy);

        let cutoff = self.base.fc_min + self.base.beta * next.prev_dy.abs();
        let alpha = smoothing_alpha(cutoff, dt);
        next.prev_y = exp_smooth(alpha, y, self.prev_y);
        (next.prev_y, next)
    }

    /// Filter a measurement and commit changes to filter state.
    pub fn run(&mut self, ts: u64, y: f32) -> f32 {
        let (out, next) = self.step(ts, y);
        *self = next;
        out
    }

    /// Filter a measurement without committing changes to filter state.
    pub fn run_no_commit(&self, ts: u64, y: f32) -> f32 {
        self.step(ts, y).0
    }
}

/// One-Euro filter for a 2D measurement.
#[derive(Clone, Copy, Debug)]
pub struct OneEuroVec2 {
    base: Base,
    prev_y: Vec2,
    prev_dy: Vec2,
}

impl OneEuroVec2 {
    pub fn new(fc_min: f32, fc_min_d: f32, beta: f32) -> OneEuroVec2 {
        OneEuroVec2 {
            base: Base::new(fc_min, fc_min_d, beta),
            prev_y: Vec2::ZERO,
            prev_dy: Vec2::ZERO,
        }
    }

    fn step(&self, ts: u64, y: Vec2) -> (Vec2, OneEuroVec2) {
        if !self.base.have_prev_y {
            let mut next = *self;
            next.base.have_prev_y = true;
            next.base.prev_ts = ts;
            next.prev_y = y;
            next.prev_dy = Vec2::ZERO;
            return (y, next);
        }

        let dt = self.base.dt_s(ts);
        if dt <= 0.0 {
            return (self.prev_y, *self);
        }
        let mut next = *self;
        next.base.prev_ts = ts;

        let alpha_d = smoothing_alpha(self.base.fc_min_d, dt);
        let dy = (y - self.prev_y) / dt;
        next.prev_dy = self.prev_dy.lerp(dy, alpha_d);

        // One shared cutoff from the derivative magnitude.
        let cutoff = self.base.fc_min + self.base.beta * next.prev_dy.length();
        let alpha = smoothing_alpha(cutoff, dt);
        next.prev_y = self.prev_y.lerp(y, alpha);
        (next.prev_y, next)
    }

    pub fn run(&mut self, ts: u64, y: Vec2) -> Vec2 {
        let (out, next) = self.step(ts, y);
        *self = next;
        out
    }

    pub fn run_no_commit(&self, ts: u64, y: Vec2) -> Vec2 {
        self.step(ts, y).0
    }
}

/// One-Euro filter for a 3D measurement.
#[derive(Clone, Copy, Debug)]
pub struct OneEuroVec3 {
    base: Base,
    prev_y: Vec3,
    prev_dy: Vec3,
}

impl OneEuroVec3 {
    pub fn new(fc_min: f32, fc_min_d: f32, beta: f32) -> OneEuroVec3 {
        OneEuroVec3 {
            base: Base::new(fc_min, fc_min_d, beta),
            prev_y: Vec3::ZERO,
            prev_dy: Vec3::ZERO,
        }
    }

    fn step(&self, ts: u64, y: Vec3) -> (Vec3, OneEuroVec3) {
        if !self.base.have_prev_y {
            let mut next = *self;
            next.base.have_prev_y = true;
            next.base.prev_ts = ts;
            next.prev_y = y;
            next.prev_dy = Vec3::ZERO;
            return (y, next);
        }

        let dt = self.base.dt_s(ts);
        if dt <= 0.0 {
            return (self.prev_y, *self);
        }
        let mut next = *self;
        next.base.prev_ts = ts;

        let alpha_d = smoothing_alpha(self.base.fc_min_d, dt);
        let dy = (y - self.prev_y) / dt;
        next.prev_dy = self.prev_dy.lerp(dy, alpha_d);

        let cutoff = self.base.fc_min + self.base.beta * next.prev_dy.length();
        let alpha = smoothing_alpha(cutoff, dt);
        next.prev_y = self.prev_y.lerp(y, alpha);
        (next.prev_y, next)
    }

    pub fn run(&mut self, ts: u64, y: Vec3) -> Vec3 {
        let (out, next) = self.step(ts, y);
        *self = next;
        out
    }

    pub fn run_no_commit(&self, ts: u64, y: Vec3) -> Vec3 {
        self.step(ts, y).0
    }
}

/// One-Euro filter for a unit quaternion, low-passed with slerp.
#[derive(Clone, Copy, Debug)]
pub struct OneEuroQuat {
    base: Base,
    prev_y: Quat,
    prev_dy: Quat,
}

impl OneEuroQuat {
    pub fn new(fc_min: f32, fc_min_d: f32, beta: f32) -> OneEuroQuat {
        OneEuroQuat {
            base: Base::new(fc_min, fc_min_d, beta),
            prev_y: Quat::IDENTITY,
            prev_dy: Quat::IDENTITY,
        }
    }

    fn step(&self, ts: u64, y: Quat) -> (Quat, OneEuroQuat) {
        if !self.base.have_prev_y {
            let mut next = *self;
            next.base.have_prev_y = true;
            next.base.prev_ts = ts;
            next.prev_y = y;
            next.prev_dy = Quat::IDENTITY;
            return (y, next);
        }

        let dt = self.base.dt_s(ts);
        if dt <= 0.0 {
            return (self.prev_y, *self);
        }
        let mut next = *self;
        next.base.prev_ts = ts;

        // Incremental rotation since the previous output, smoothed on the
        // sphere.
        let alpha_d = smoothing_alpha(self.base.fc_min_d, dt);
        let dy = self.prev_y.conjugate() * y;
        next.prev_dy = quat_slerp(self.prev_dy, dy, alpha_d);

        // Angular speed in rad/s of the smoothed increment.
        let half_angle = next.prev_dy.w.abs().clamp(0.0, 1.0).acos();
        let speed = 2.0 * half_angle / dt;

        let cutoff = self.base.fc_min + self.base.beta * speed;
        let alpha = smoothing_alpha(cutoff, dt);
        next.prev_y = quat_slerp(self.prev_y, y, alpha);
        (next.prev_y, next)
    }

    pub fn run(&mut self, ts: u64, y: Quat) -> Quat {
        let (out, next) = self.step(ts, y);
        *self = next;
        out
    }

    pub fn run_no_commit(&self, ts: u64, y: Quat) -> Quat {
        self.step(ts, y).0
    }
}
