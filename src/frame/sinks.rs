//! Built-in sink adapters: worker-thread queues, tees, deep copies and
//! timestamp sanitizing.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;
use std::time::Duration;

use crossbeam_channel::{Receiver, Sender, TrySendError};

use crate::frame::context::next_node_id;
use crate::frame::{Frame, FrameNode, FrameSink};
use crate::{Result, TrackingError};

/// Hands frames to a worker thread through a bounded channel so slow
/// consumers do not stall the producer. When the queue is full the oldest
/// queued frame is dropped in favor of the new one. A capacity of zero
/// means unbounded.
pub struct QueueSink {
    sender: Sender<Frame>,
    /// Kept so the push path can pop the oldest entry when full.
    receiver: Receiver<Frame>,
    stop_flag: Arc<AtomicBool>,
    thread: Mutex<Option<JoinHandle<()>>>,
    dropped: AtomicU64,
}

impl QueueSink {
    /// Spawn the worker and return the sink. The returned value must also be
    /// registered on a `FrameContext` (or broken apart manually) to join the
    /// worker on shutdown.
    pub fn new(capacity: usize, downstream: Arc<dyn FrameSink>) -> Result<Arc<QueueSink>> {
        let (sender, receiver) = if capacity == 0 {
            crossbeam_channel::unbounded()
        } else {
            crossbeam_channel::bounded(capacity)
        };
        let stop_flag = Arc::new(AtomicBool::new(false));

        let worker_receiver = receiver.clone();
        let worker_stop = stop_flag.clone();
        let id = next_node_id();
        let thread = std::thread::Builder::new()
            .name(format!("frame-queue-{id}"))
            .spawn(move || queue_worker_loop(worker_receiver, worker_stop, downstream))
            .map_err(TrackingError::ThreadSpawn)?;

        Ok(Arc::new(QueueSink {
            sender,
            receiver,
            stop_flag,
            thread: Mutex::new(Some(thread)),
            dropped: AtomicU64::new(0),
        }))
    }

    /// Total frames dropped due to backpressure.
    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }
}

impl FrameSink for QueueSink {
    fn push_frame(&self, frame: &Frame) {
        if self.stop_flag.load(Ordering::Relaxed) {
            return;
        }

        let mut frame = frame.clone();
        loop {
            match self.sender.try_send(frame) {
                Ok(()) => return,
                Err(TrySendError::Full(returned)) => {
                    // Drop-oldest: pop one queued frame, retry with ours.
                    if self.receiver.try_recv().is_ok() {
                        self.dropped.fetch_add(1, Ordering::Relaxed);
                    }
                    frame = returned;
                }
                Err(TrySendError::Disconnected(_)) => {
                    log::trace!("Queue sink disconnected, dropping frame");
                    return;
                }
            }
        }
    }
}

impl FrameNode for QueueSink {
    fn break_apart(&self) {
        self.stop_flag.store(true, Ordering::Relaxed);
        if let Ok(mut guard) = self.thread.lock() {
            if let Some(thread) = guard.take() {
                let _ = thread.join();
            }
        }
    }
}

impl Drop for QueueSink {
    fn drop(&mut self) {
        self.break_apart();
    }
}

fn queue_worker_loop(
    receiver: Receiver<Frame>,
    stop_flag: Arc<AtomicBool>,
    downstream: Arc<dyn FrameSink>,
) {
    log::debug!("Frame queue worker started");
    loop {
        if stop_flag.load(Ordering::Relaxed) {
            break;
        }
        // Short timeout so the stop flag is observed promptly.
        match receiver.recv_timeout(Duration::from_millis(100)) {
            Ok(frame) => downstream.push_frame(&frame),
            Err(crossbeam_channel::RecvTimeoutError::Timeout) => continue,
            Err(crossbeam_channel::RecvTimeoutError::Disconnected) => break,
        }
    }
    log::debug!("Frame queue worker stopping");
}

/// Tees each frame to two downstream sinks, left first.
pub struct SplitSink {
    left: Arc<dyn FrameSink>,
    right: Arc<dyn FrameSink>,
}

impl SplitSink {
    pub fn new(left: Arc<dyn FrameSink>, right: Arc<dyn FrameSink>) -> Arc<SplitSink> {
        Arc::new(SplitSink { left, right })
    }
}

impl FrameSink for SplitSink {
    fn push_frame(&self, frame: &Frame) {
        self.left.push_frame(frame);
        self.right.push_frame(frame);
    }
}

/// Deep-copies each frame before passing it on, releasing the producer's
/// buffer as soon as `push_frame` returns.
pub struct CloneSink {
    downstream: Arc<dyn FrameSink>,
}

impl CloneSink {
    pub fn new(downstream: Arc<dyn FrameSink>) -> Arc<CloneSink> {
        Arc::new(CloneSink { downstream })
    }
}

impl FrameSink for CloneSink {
    fn push_frame(&self, frame: &Frame) {
        let copy = frame.deep_copy();
        self.downstream.push_frame(&copy);
    }
}

/// Rewrites timestamps that go backwards to the highest value seen so far,
/// protecting downstream consumers that require monotonic time.
pub struct ForceMonotonicSink {
    downstream: Arc<dyn FrameSink>,
    last_ts: AtomicU64,
}

impl ForceMonotonicSink {
    pub fn new(downstream: Arc<dyn FrameSink>) -> Arc<ForceMonotonicSink> {
        Arc::new(ForceMonotonicSink {
            downstream,
            last_ts: AtomicU64::new(0),
        })
    }
}

impl FrameSink for ForceMonotonicSink {
    fn push_frame(&self, frame: &Frame) {
        let last = self.last_ts.fetch_max(frame.timestamp_ns, Ordering::Relaxed);
        if frame.timestamp_ns >= last {
            self.downstream.push_frame(frame);
            return;
        }

        log::debug!(
            "Frame timestamp went backwards ({} < {}), rewriting",
            frame.timestamp_ns,
            last
        );
        let mut adjusted = frame.clone();
        adjusted.timestamp_ns = last;
        self.downstream.push_frame(&adjusted);
    }
}
