//! Mapping device hardware timestamps into the host monotonic clock.

use std::sync::OnceLock;
use std::time::Instant;

/// Host monotonic time in nanoseconds, measured from a process-wide epoch.
pub fn monotonic_ns() -> u64 {
    static EPOCH: OnceLock<Instant> = OnceLock::new();
    EPOCH.get_or_init(Instant::now).elapsed().as_nanos() as u64
}

/// Smoothing factor of the offset estimate; high values favor the history
/// over the newest measurement.
const OFFSET_ALPHA: f64 = 0.95;

/// Estimates the offset between a device's hardware clock and the host
/// monotonic clock, smoothed exponentially per sample.
///
/// IMU samples carry the smallest transmission jitter, so they drive the
/// estimate; camera frames reuse the offset cached at the last IMU sample
/// via [`to_monotonic`].
///
/// [`to_monotonic`]: ClockOffsetEstimator::to_monotonic
#[derive(Clone, Copy, Debug, Default)]
pub struct ClockOffsetEstimator {
    offset_ns: Option<i64>,
}

impl ClockOffsetEstimator {
    pub fn new() -> ClockOffsetEstimator {
        ClockOffsetEstimator::default()
    }

    /// Fold one `(hardware timestamp, host time at arrival)` pair into the
    /// estimate and return the sample's host monotonic timestamp.
    pub fn update(&mut self, hw_timestamp_ns: u64, monotonic_now_ns: u64) -> u64 {
        let measured = monotonic_now_ns as i64 - hw_timestamp_ns as i64;
        let offset = match self.offset_ns {
            None => measured,
            Some(prev) => {
                (OFFSET_ALPHA * prev as f64 + (1.0 - OFFSET_ALPHA) * measured as f64) as i64
            }
        };
        self.offset_ns = Some(offset);
        (hw_timestamp_ns as i64 + offset) as u64
    }

    /// Convert a hardware timestamp using the cached offset without updating
    /// the estimate. Before the first [`update`] the raw value is returned.
    ///
    /// [`update`]: ClockOffsetEstimator::update
    pub fn to_monotonic(&self, hw_timestamp_ns: u64) -> u64 {
        match self.offset_ns {
            Some(offset) => (hw_timestamp_ns as i64 + offset) as u64,
            None => hw_timestamp_ns,
        }
    }

    pub fn offset_ns(&self) -> Option<i64> {
        self.offset_ns
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_sample_initializes_offset() {
        let mut est = ClockOffsetEstimator::new();
        assert_eq!(est.offset_ns(), None);

        let mono = est.update(1_000, 5_000);
        assert_eq!(mono, 5_000);
        assert_eq!(est.offset_ns(), Some(4_000));
    }

    #[test]
    fn test_offset_converges_slowly() {
        let mut est = ClockOffsetEstimator::new();
        est.update(0, 1_000_000);

        // The true offset jumps; the estimate moves 5% per sample.
        est.update(1_000, 2_001_000);
        let off = est.offset_ns().unwrap();
        assert!(off > 1_000_000 && off < 1_100_000, "offset = {off}");
    }

    #[test]
    fn test_camera_reuses_cached_offset() {
        let mut est = ClockOffsetEstimator::new();
        est.update(10_000, 30_000);

        // A frame stamped by the same hardware clock maps through the cached
        // offset even though it arrives late.
        assert_eq!(est.to_monotonic(12_000), 32_000);
    }

    #[test]
    fn test_monotonic_ns_increases() {
        let a = monotonic_ns();
        let b = monotonic_ns();
        assert!(b >= a);
    }
}
