//! Process-wide grouping of frame-graph nodes with deterministic two-phase
//! teardown.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

/// Monotonic id source for frame nodes, used in thread names and logs.
static NEXT_NODE_ID: AtomicU64 = AtomicU64::new(1);

pub(crate) fn next_node_id() -> u64 {
    NEXT_NODE_ID.fetch_add(1, Ordering::Relaxed)
}

/// A node in the frame graph that owns resources needing ordered shutdown:
/// queues with worker threads, trackers with reader threads.
///
/// Teardown happens in two phases: first `break_apart` is called on every
/// node (stopping producers, draining queues, joining threads), only then
/// are the nodes dropped. Sinks are therefore guaranteed to be unlinked
/// before anything they point at is freed.
pub trait FrameNode: Send + Sync {
    /// Stop all activity: producers unhooked, queues drained, threads
    /// joined. Must be idempotent.
    fn break_apart(&self);
}

/// Owns a list of [`FrameNode`]s and tears them all down together, either
/// explicitly via [`end_all`] or on drop.
///
/// [`end_all`]: FrameContext::end_all
#[derive(Default)]
pub struct FrameContext {
    nodes: Mutex<Vec<Arc<dyn FrameNode>>>,
}

impl FrameContext {
    pub fn new() -> FrameContext {
        FrameContext::default()
    }

    /// Register a node. Nodes are broken apart in registration order and
    /// dropped in reverse order.
    pub fn add(&self, node: Arc<dyn FrameNode>) {
        if let Ok(mut nodes) = self.nodes.lock() {
            nodes.push(node);
        }
    }

    /// Break apart all nodes, then release them. Idempotent.
    pub fn end_all(&self) {
        let nodes = match self.nodes.lock() {
            Ok(mut guard) => std::mem::take(&mut *guard),
            Err(_) => return,
        };

        for node in &nodes {
            node.break_apart();
        }
        // Free in LIFO order of construction.
        for node in nodes.into_iter().rev() {
            drop(node);
        }
    }
}

impl Drop for FrameContext {
    fn drop(&mut self) {
        self.end_all();
    }
}
