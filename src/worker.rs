use crate::config::FailurePolicy;
use crate::metrics::StageMetrics;
use crate::queue::WorkQueue;
use std::io;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Instant;
use tracing::{debug, error, trace, warn};

/// Close `queue` and account for whatever it still held.
///
/// Returns false if the queue had already been closed.
pub(crate) fn close<T>(name: &str, queue: &WorkQueue<T>, metrics: &StageMetrics) -> bool {
    match queue.close() {
        Some(remaining) => {
            metrics.record_discarded(remaining as u64);
            debug!(stage = %name, discarded = remaining, "stage closed");
            true
        }
        None => false,
    }
}

/// Spawn the dedicated worker thread of a stage.
///
/// The worker blocks on the queue's condition variable until an item and an
/// action are both available, runs the action outside the queue lock, and
/// exits as soon as the queue is closed. Queued items are not drained on exit.
pub(crate) fn spawn<T: Send + 'static>(
    name: String,
    queue: Arc<WorkQueue<T>>,
    metrics: StageMetrics,
    policy: FailurePolicy,
) -> io::Result<JoinHandle<()>> {
    thread::Builder::new().name(name.clone()).spawn(move || {
        debug!(stage = %name, "worker started");

        while let Some((item, action)) = queue.next() {
            trace!(stage = %name, "delivering item");
            let start = Instant::now();
            let result = action.call(item);
            metrics.record_delivered(start.elapsed());

            if let Err(e) = result {
                metrics.record_failure();
                match policy {
                    FailurePolicy::Continue => {
                        warn!(stage = %name, error = %e, "action failed, continuing");
                    }
                    FailurePolicy::Terminate => {
                        error!(stage = %name, error = %e, "action failed, terminating worker");
                        close(&name, &queue, &metrics);
                        break;
                    }
                }
            }
        }

        debug!(stage = %name, "worker exited");
    })
}
