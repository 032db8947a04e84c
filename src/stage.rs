use crate::action::Action;
use crate::config::{StageBuilder, StageConfig};
use crate::error::{BoxError, Result};
use crate::metrics::StageMetrics;
use crate::queue::{Installed, WorkQueue};
use crate::worker;
use parking_lot::Mutex;
use std::convert::Infallible;
use std::fmt;
use std::sync::Arc;
use std::thread::{self, JoinHandle, ThreadId};
use tracing::{debug, error, warn};

/// Type-erased view of a child stage, used for cascading shutdown and reporting
trait Cascade: Send + Sync {
    fn stop(&self);
    fn describe(&self, depth: usize, out: &mut String);
}

struct StageInner<T: Send + 'static> {
    config: StageConfig,
    queue: Arc<WorkQueue<T>>,
    metrics: StageMetrics,
    worker: Mutex<Option<JoinHandle<()>>>,
    worker_id: ThreadId,
    children: Mutex<Vec<Arc<dyn Cascade>>>,
}

impl<T: Send + 'static> StageInner<T> {
    fn shutdown(&self) {
        worker::close(&self.config.name, &self.queue, &self.metrics);

        if thread::current().id() == self.worker_id {
            // Stopped from inside its own action; the worker exits once the action returns.
            debug!(stage = %self.config.name, "stop called from worker thread, not joining");
        } else {
            // Held across the join so a concurrent stop() waits for the worker too.
            let mut worker = self.worker.lock();
            if let Some(handle) = worker.take() {
                if handle.join().is_err() {
                    error!(stage = %self.config.name, "worker thread panicked");
                }
            }
        }

        let children: Vec<_> = self.children.lock().clone();
        for child in children {
            child.stop();
        }
    }
}

impl<T: Send + 'static> Cascade for StageInner<T> {
    fn stop(&self) {
        self.shutdown();
    }

    fn describe(&self, depth: usize, out: &mut String) {
        out.push_str(&format!(
            "{}{}: {}\n",
            "  ".repeat(depth),
            self.config.name,
            self.metrics.snapshot().format()
        ));
        for child in self.children.lock().iter() {
            child.describe(depth + 1, out);
        }
    }
}

impl<T: Send + 'static> Drop for StageInner<T> {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// One node of a reactive pipeline.
///
/// A stage owns an unbounded FIFO queue drained by its own worker thread into
/// a single registered action. [`transform`](Stage::transform),
/// [`filter`](Stage::filter) and [`apply`](Stage::apply) graft a child stage
/// and wire this stage's action to forward into it; [`stop`](Stage::stop)
/// halts this stage's worker and then every child, in creation order.
///
/// `Stage` is a cheap handle: clones refer to the same stage. Dropping the
/// last handle stops the stage. A parent keeps its children alive, so a
/// chain stays up as long as its root handle does.
///
/// An action that holds a handle to its own stage keeps that stage alive
/// until [`stop`](Stage::stop) is called explicitly.
pub struct Stage<T: Send + 'static> {
    inner: Arc<StageInner<T>>,
}

impl<T: Send + 'static> Clone for Stage<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T: Send + 'static> fmt::Debug for Stage<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Stage")
            .field("name", &self.inner.config.name)
            .field("stopped", &self.is_stopped())
            .field("queued", &self.len())
            .field("children", &self.children_count())
            .finish()
    }
}

impl Stage<()> {
    /// Start configuring a stage; the item type is chosen at [`spawn`](StageBuilder::spawn)
    pub fn builder() -> StageBuilder {
        StageBuilder::new()
    }
}

impl<T: Send + 'static> Stage<T> {
    /// Spawn a stage with default configuration
    pub fn new() -> Result<Self> {
        StageBuilder::new().spawn()
    }

    /// Spawn a stage from a resolved configuration
    pub fn with_config(config: StageConfig) -> Result<Self> {
        let queue = Arc::new(WorkQueue::new());
        let metrics = StageMetrics::new();
        let handle = worker::spawn(
            config.name.clone(),
            Arc::clone(&queue),
            metrics.clone(),
            config.failure_policy,
        )?;

        let worker_id = handle.thread().id();

        Ok(Self {
            inner: Arc::new(StageInner {
                config,
                queue,
                metrics,
                worker: Mutex::new(Some(handle)),
                worker_id,
                children: Mutex::new(Vec::new()),
            }),
        })
    }

    /// Queue an item for this stage's action.
    ///
    /// Never blocks on downstream work and never fails. Items added after
    /// [`stop`](Stage::stop) are accepted and never delivered.
    pub fn add(&self, item: T) {
        self.inner.metrics.record_added();
        if !self.inner.queue.push(item) {
            debug!(stage = %self.inner.config.name, "item added to stopped stage");
        }
    }

    /// Register `func` as this stage's terminal action
    pub fn for_each<F>(&self, mut func: F) -> Result<()>
    where
        F: FnMut(T) + Send + 'static,
    {
        self.subscribe(Action::new(move |item| {
            func(item);
            Ok(())
        }))
    }

    /// Register a fallible terminal action; errors go through the stage's failure policy
    pub fn try_for_each<F, E>(&self, mut func: F) -> Result<()>
    where
        F: FnMut(T) -> std::result::Result<(), E> + Send + 'static,
        E: Into<BoxError>,
    {
        self.subscribe(Action::new(move |item| func(item).map_err(Into::<BoxError>::into)))
    }

    /// Map every item through `func` into a new child stage.
    ///
    /// The output is always forwarded, whatever its type: a closure returning
    /// `bool` yields a `Stage<bool>` of predicate results. Use
    /// [`filter`](Stage::filter) to forward the original items instead, or
    /// [`apply`](Stage::apply) to map and drop in one step.
    pub fn transform<U, F>(&self, mut func: F) -> Result<Stage<U>>
    where
        U: Send + 'static,
        F: FnMut(T) -> U + Send + 'static,
    {
        self.apply(move |item| Some(func(item)))
    }

    /// Map every item through a fallible `func`; failed items are not forwarded
    pub fn try_transform<U, F, E>(&self, mut func: F) -> Result<Stage<U>>
    where
        U: Send + 'static,
        F: FnMut(T) -> std::result::Result<U, E> + Send + 'static,
        E: Into<BoxError>,
    {
        self.try_apply(move |item| func(item).map(Some))
    }

    /// Forward only the items for which `predicate` holds into a new child stage
    pub fn filter<F>(&self, mut predicate: F) -> Result<Stage<T>>
    where
        F: FnMut(&T) -> bool + Send + 'static,
    {
        self.apply(move |item| if predicate(&item) { Some(item) } else { None })
    }

    /// Unified map/filter: `Some(u)` forwards `u` to the child, `None` drops the item
    pub fn apply<U, F>(&self, mut func: F) -> Result<Stage<U>>
    where
        U: Send + 'static,
        F: FnMut(T) -> Option<U> + Send + 'static,
    {
        self.try_apply(move |item| Ok::<_, Infallible>(func(item)))
    }

    /// Fallible form of [`apply`](Stage::apply)
    pub fn try_apply<U, F, E>(&self, mut func: F) -> Result<Stage<U>>
    where
        U: Send + 'static,
        F: FnMut(T) -> std::result::Result<Option<U>, E> + Send + 'static,
        E: Into<BoxError>,
    {
        let subscription = self.inner.config.subscription;
        self.inner.queue.check_install(subscription)?;

        let mut children = self.inner.children.lock();
        let child = Stage::<U>::with_config(self.inner.config.child(children.len()))?;

        let downstream = Arc::clone(&child.inner.queue);
        let downstream_metrics = child.inner.metrics.clone();
        let action = Action::new(move |item: T| {
            if let Some(output) = func(item).map_err(Into::<BoxError>::into)? {
                downstream_metrics.record_added();
                downstream.push(output);
            }
            Ok(())
        });

        // Lost a race with another registration; the unused child is stopped on drop.
        self.subscribe(action)?;

        children.push(Arc::clone(&child.inner) as Arc<dyn Cascade>);
        debug!(
            stage = %self.inner.config.name,
            child = %child.inner.config.name,
            "child stage attached"
        );
        Ok(child)
    }

    fn subscribe(&self, action: Action<T>) -> Result<()> {
        let name = &self.inner.config.name;
        match self.inner.queue.install(action, self.inner.config.subscription)? {
            Installed::Fresh => debug!(stage = %name, "action registered"),
            Installed::Replaced => warn!(stage = %name, "action replaced, previous wiring discarded"),
        }
        Ok(())
    }

    /// Stop this stage and, once its worker has exited, every child stage.
    ///
    /// Queued items are discarded, not drained. Blocks while the current
    /// action is running. Calling it again is a no-op.
    pub fn stop(&self) {
        self.inner.shutdown();
    }

    /// Whether `stop()` has run or the worker terminated on a failure
    pub fn is_stopped(&self) -> bool {
        !self.inner.queue.is_alive()
    }

    /// Whether an action is registered
    pub fn has_subscriber(&self) -> bool {
        self.inner.queue.has_action()
    }

    /// Stage name, also the worker thread name
    pub fn name(&self) -> &str {
        &self.inner.config.name
    }

    /// Items waiting in the queue
    pub fn len(&self) -> usize {
        self.inner.queue.len()
    }

    /// Check if no items are waiting
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of child stages created from this stage
    pub fn children_count(&self) -> usize {
        self.inner.children.lock().len()
    }

    /// Get a reference to this stage's metrics
    pub fn metrics(&self) -> &StageMetrics {
        &self.inner.metrics
    }

    /// Metrics of this stage and all of its descendants, one line per stage
    pub fn metrics_summary(&self) -> String {
        let mut summary = String::from("Stage Metrics Summary:\n");
        self.inner.describe(1, &mut summary);
        summary
    }
}
