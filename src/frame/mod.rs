//! Reference-counted camera frames and the sink interfaces that move them
//! (and IMU/pose samples) between pipeline stages.

pub mod context;
pub mod sinks;

pub use context::{FrameContext, FrameNode};
pub use sinks::{CloneSink, ForceMonotonicSink, QueueSink, SplitSink};

use std::sync::Arc;

use crate::imu::ImuSample;
use crate::math::Pose;

/// Pixel layout of a frame.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FrameFormat {
    /// 8-bit luminance.
    L8,
    /// 24-bit interleaved RGB.
    R8G8B8,
}

impl FrameFormat {
    /// Bytes per pixel.
    pub fn pixel_size(self) -> usize {
        match self {
            FrameFormat::L8 => 1,
            FrameFormat::R8G8B8 => 3,
        }
    }
}

/// A camera frame. The pixel buffer is shared: cloning a `Frame` bumps the
/// reference count, the buffer is freed exactly once when the last clone
/// drops. Sinks that keep a frame past the `push_frame` call clone it.
#[derive(Clone, Debug)]
pub struct Frame {
    data: Arc<Vec<u8>>,
    pub width: u32,
    pub height: u32,
    /// Row stride in bytes, at least `width * pixel_size`.
    pub stride: usize,
    pub format: FrameFormat,
    /// Capture time in the host monotonic clock.
    pub timestamp_ns: u64,
    /// Capture time as reported by the sensor's own clock.
    pub source_timestamp_ns: u64,
    /// Rolling frame number from the source.
    pub source_sequence: u64,
    /// Identifier of the producing camera.
    pub source_id: u64,
}

impl Frame {
    pub fn new(
        data: Vec<u8>,
        width: u32,
        height: u32,
        stride: usize,
        format: FrameFormat,
        timestamp_ns: u64,
    ) -> Frame {
        Frame {
            data: Arc::new(data),
            width,
            height,
            stride,
            format,
            timestamp_ns,
            source_timestamp_ns: timestamp_ns,
            source_sequence: 0,
            source_id: 0,
        }
    }

    /// Borrow the pixel data. Valid for as long as any clone of this frame
    /// lives; no lock is needed to read.
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Number of live references to the pixel buffer.
    pub fn reference_count(&self) -> usize {
        Arc::strong_count(&self.data)
    }

    /// Copy the pixel buffer onto a fresh allocation so the producer's
    /// buffer can be released promptly.
    pub fn deep_copy(&self) -> Frame {
        let mut copy = self.clone();
        copy.data = Arc::new(self.data.as_ref().clone());
        copy
    }
}

/// Consumer of camera frames.
///
/// `push_frame` takes a borrowed frame; implementations clone it (bumping
/// the reference count) if they need it beyond the call.
pub trait FrameSink: Send + Sync {
    fn push_frame(&self, frame: &Frame);
}

/// Consumer of calibrated IMU samples.
pub trait ImuSink: Send + Sync {
    fn push_imu(&self, sample: &ImuSample);
}

/// Consumer of timestamped poses (e.g. ground truth).
pub trait PoseSink: Send + Sync {
    fn push_pose(&self, timestamp_ns: u64, pose: &Pose);
}
