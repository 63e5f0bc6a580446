//! Out-of-band notification delivery.
//!
//! Handlers for long-running operations emit progress and cancellation
//! acknowledgements off the request/response path. Messages are serialized
//! up front, queued FIFO, and drained by a single background worker thread
//! at a fixed polling interval. Delivery order is FIFO among notifications
//! but deliberately unsynchronized with the response channel: a progress
//! message may arrive before, after, or interleaved with the response to
//! the operation it describes.
//!
//! The worker runs on a dedicated OS thread rather than a runtime task so
//! delivery does not depend on executor shutdown ordering. The empty-queue
//! sleep is a bounded poll, a latency tradeoff rather than a correctness
//! concern.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

use parking_lot::Mutex;
use serde_json::json;
use tracing::{debug, warn};

use crate::protocol::jsonrpc::envelope;
use crate::protocol::jsonrpc::types::ProgressToken;

/// Default worker polling interval between empty-queue checks.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Callback invoked once per delivered message.
pub type DeliveryFn = Arc<dyn Fn(&[u8]) + Send + Sync>;

struct Inner {
    queue: Mutex<VecDeque<Vec<u8>>>,
    running: AtomicBool,
    sink: Mutex<Option<DeliveryFn>>,
    worker: Mutex<Option<JoinHandle<()>>>,
    poll_interval: Duration,
}

/// Handle to the notification delivery subsystem.
///
/// Cheap to clone; all clones share one queue and worker.
#[derive(Clone)]
pub struct Notifier {
    inner: Arc<Inner>,
}

impl Notifier {
    /// Creates a notifier with the default polling interval.
    pub fn new() -> Self {
        Self::with_poll_interval(DEFAULT_POLL_INTERVAL)
    }

    /// Creates a notifier with a custom worker polling interval.
    pub fn with_poll_interval(poll_interval: Duration) -> Self {
        Self {
            inner: Arc::new(Inner {
                queue: Mutex::new(VecDeque::new()),
                running: AtomicBool::new(false),
                sink: Mutex::new(None),
                worker: Mutex::new(None),
                poll_interval,
            }),
        }
    }

    /// Starts the background worker with the given delivery callback.
    ///
    /// Idempotent: calling start while running is a no-op.
    pub fn start<F>(&self, callback: F)
    where
        F: Fn(&[u8]) + Send + Sync + 'static,
    {
        if self.inner.running.swap(true, Ordering::AcqRel) {
            debug!("Notification worker already running");
            return;
        }

        let sink: DeliveryFn = Arc::new(callback);
        *self.inner.sink.lock() = Some(Arc::clone(&sink));

        let inner = Arc::clone(&self.inner);
        let spawned = std::thread::Builder::new()
            .name("notify-worker".to_string())
            .spawn(move || worker_loop(&inner, &sink));

        match spawned {
            Ok(handle) => *self.inner.worker.lock() = Some(handle),
            Err(e) => {
                warn!(error = %e, "Failed to spawn notification worker thread");
                self.inner.running.store(false, Ordering::Release);
                *self.inner.sink.lock() = None;
            }
        }
    }

    /// Stops the worker and waits for in-flight delivery to finish.
    ///
    /// The queue is fully drained before the worker exits, so messages
    /// enqueued before stop are still delivered. Idempotent.
    pub fn stop(&self) {
        if !self.inner.running.swap(false, Ordering::AcqRel) {
            return;
        }

        let handle = self.inner.worker.lock().take();
        if let Some(handle) = handle {
            if handle.join().is_err() {
                warn!("Notification worker panicked during shutdown");
            }
        }
        *self.inner.sink.lock() = None;
    }

    /// Returns true while the worker is running.
    pub fn is_running(&self) -> bool {
        self.inner.running.load(Ordering::Acquire)
    }

    /// Queues an already-serialized message for asynchronous delivery.
    ///
    /// Ownership of the buffer transfers to the queue; it is released after
    /// the delivery callback consumes it.
    pub fn enqueue(&self, message: Vec<u8>) {
        self.inner.queue.lock().push_back(message);
    }

    /// Delivers a serialized message synchronously on the caller's thread.
    ///
    /// Returns false when no delivery callback is registered (worker not
    /// started); the message is dropped in that case.
    pub fn deliver_sync(&self, message: &[u8]) -> bool {
        let sink = self.inner.sink.lock().clone();
        match sink {
            Some(sink) => {
                sink(message);
                true
            }
            None => false,
        }
    }

    /// Builds and queues a `notifications/progress` message.
    ///
    /// The progress token is the caller's opaque correlator; it is copied
    /// into the envelope and not retained.
    pub fn progress(&self, token: &ProgressToken, progress: f64, total: Option<f64>) {
        match encode_progress(token, progress, total) {
            Ok(bytes) => self.enqueue(bytes),
            Err(e) => warn!(error = %e, "Failed to encode progress notification"),
        }
    }

    /// Number of messages waiting for the worker.
    pub fn queued(&self) -> usize {
        self.inner.queue.lock().len()
    }
}

impl Default for Notifier {
    fn default() -> Self {
        Self::new()
    }
}

fn worker_loop(inner: &Inner, sink: &DeliveryFn) {
    loop {
        let batch: Vec<Vec<u8>> = inner.queue.lock().drain(..).collect();
        for message in &batch {
            sink(message);
        }

        if !inner.running.load(Ordering::Acquire) {
            // Final drain so nothing enqueued during the last batch is lost
            let rest: Vec<Vec<u8>> = inner.queue.lock().drain(..).collect();
            for message in &rest {
                sink(message);
            }
            break;
        }

        std::thread::sleep(inner.poll_interval);
    }
}

/// Serializes a `notifications/progress` envelope.
pub fn encode_progress(
    token: &ProgressToken,
    progress: f64,
    total: Option<f64>,
) -> crate::protocol::jsonrpc::error::Result<Vec<u8>> {
    let mut params = json!({
        "progressToken": token,
        "progress": progress,
    });
    if let Some(total) = total {
        params["total"] = json!(total);
    }
    envelope::encode_notification("notifications/progress", params)
}
