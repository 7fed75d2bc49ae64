//! Single-pole IIR low-pass filters for scalar and vector signals.
//!
//! Unlike the one-Euro filters these have a fixed cutoff; they are suited to
//! slow-moving quantities like temperature-dependent biases.

use glam::Vec3;

/// Scalar low-pass with a cutoff frequency in Hz. Uninitialized until the
/// first sample arrives.
#[derive(Clone, Copy, Debug)]
pub struct LowPassIIR {
    time_constant_s: f32,
    state: f32,
    timestamp_ns: u64,
    initialized: bool,
}

impl LowPassIIR {
    pub fn new(cutoff_hz: f32) -> LowPassIIR {
        LowPassIIR {
            time_constant_s: 1.0 / (2.0 * std::f32::consts::PI * cutoff_hz),
            state: 0.0,
            timestamp_ns: 0,
            initialized: false,
        }
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    /// Filtered value; zero before the first sample.
    pub fn state(&self) -> f32 {
        self.state
    }

    /// Timestamp of the newest incorporated sample.
    pub fn timestamp_ns(&self) -> u64 {
        self.timestamp_ns
    }

    /// Incorporate a sample. The first sample initializes the state; older
    /// or equal timestamps leave the state untouched but are recorded.
    pub fn add_sample(&mut self, sample: f32, timestamp_ns: u64) {
        if !self.initialized {
            self.initialized = true;
            self.state = sample;
            self.timestamp_ns = timestamp_ns;
            return;
        }

        let dt = (timestamp_ns.saturating_sub(self.timestamp_ns)) as f64 as f32 / 1e9;
        self.timestamp_ns = timestamp_ns;

        let weight = dt / (self.time_constant_s + dt);
        self.state += weight * (sample - self.state);
    }
}

/// Component-wise low-pass over a vector signal.
#[derive(Clone, Copy, Debug)]
pub struct LowPassIIRVec3 {
    time_constant_s: f32,
    state: Vec3,
    timestamp_ns: u64,
    initialized: bool,
}

impl LowPassIIRVec3 {
    pub fn new(cutoff_hz: f32) -> LowPassIIRVec3 {
        LowPassIIRVec3 {
            time_constant_s: 1.0 / (2.0 * std::f32::consts::PI * cutoff_hz),
            state: Vec3::ZERO,
            timestamp_ns: 0,
            initialized: false,
        }
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    pub fn state(&self) -> Vec3 {
        self.state
    }

    pub fn timestamp_ns(&self) -> u64 {
        self.timestamp_ns
    }

    pub fn add_sample(&mut self, sample: Vec3, timestamp_ns: u64) {
        if !self.initialized {
            self.initialized = true;
            self.state = sample;
            self.timestamp_ns = timestamp_ns;
            return;
        }

        let dt = (timestamp_ns.saturating_sub(self.timestamp_ns)) as f64 as f32 / 1e9;
        self.timestamp_ns = timestamp_ns;

        let weight = dt / (self.time_constant_s + dt);
        self.state += (sample - self.state) * weight;
    }
}
