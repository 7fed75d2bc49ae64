//! A fifo of timestamped vectors that also allows windowed averaging.

use std::collections::VecDeque;

use glam::Vec3;

/// Bounded FIFO of `(timestamp_ns, Vec3)` samples supporting an arithmetic
/// mean over a time window. Samples must be pushed in time order; pushing
/// out of order yields unspecified averages.
#[derive(Clone, Debug)]
pub struct FilterFifo3 {
    samples: VecDeque<(u64, Vec3)>,
    capacity: usize,
}

impl FilterFifo3 {
    /// A fifo tracking at most `capacity` samples.
    pub fn new(capacity: usize) -> FilterFifo3 {
        FilterFifo3 {
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

    /// Push a sample, evicting the oldest when full.
    pub fn push(&mut self, sample: Vec3, timestamp_ns: u64) {
        if self.samples.len() == self.capacity {
            self.samples.pop_front();
        }
        self.samples.push_back((timestamp_ns, sample));
    }

    /// Sample at `index` counted from the newest push: zero is the last
    /// sample, one the second to last, and so on.
    pub fn get(&self, index: usize) -> Option<(u64, Vec3)> {
        if index >= self.samples.len() {
            return None;
        }
        self.samples.get(self.samples.len() - 1 - index).copied()
    }

    /// Average of all samples with timestamps in `[start_ns, stop_ns]`.
    /// Returns the number of samples averaged; zero samples yields a zero
    /// vector.
    pub fn filter(&self, start_ns: u64, stop_ns: u64, out_average: &mut Vec3) -> usize {
        let mut sum = Vec3::ZERO;
        let mut count = 0usize;

        // Newest entries live at the back; stop early once past the window.
        for &(ts, v) in self.samples.iter().rev() {
            if ts > stop_ns {
                continue;
            }
            if ts < start_ns {
                break;
            }
            sum += v;
            count += 1;
        }

        *out_average = if count > 0 {
            sum / count as f32
        } else {
            Vec3::ZERO
        };
        count
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_filter_averages_window() {
        let mut ff = FilterFifo3::new(16);
        ff.push(Vec3::new(1.0, 0.0, 0.0), 100);
        ff.push(Vec3::new(2.0, 0.0, 0.0), 200);
        ff.push(Vec3::new(3.0, 0.0, 0.0), 300);
        ff.push(Vec3::new(40.0, 0.0, 0.0), 400);

        let mut avg = Vec3::ZERO;
        let n = ff.filter(150, 350, &mut avg);
        assert_eq!(n, 2);
        assert_relative_eq!(avg.x, 2.5, epsilon = 1e-6);
    }

    #[test]
    fn test_filter_empty_window_is_zero() {
        let mut ff = FilterFifo3::new(16);
        ff.push(Vec3::ONE, 100);

        let mut avg = Vec3::ONE;
        let n = ff.filter(200, 300, &mut avg);
        assert_eq!(n, 0);
        assert_eq!(avg, Vec3::ZERO);
    }

    #[test]
    fn test_capacity_evicts_oldest() {
        let mut ff = FilterFifo3::new(2);
        ff.push(Vec3::splat(1.0), 100);
        ff.push(Vec3::splat(2.0), 200);
        ff.push(Vec3::splat(3.0), 300);
        assert_eq!(ff.len(), 2);

        let (ts, v) = ff.get(0).unwrap();
        assert_eq!(ts, 300);
        assert_relative_eq!(v.x, 3.0, epsilon = 1e-6);
        assert!(ff.get(2).is_none());
    }
}
