//! A thread-per-stage reactive stream pipeline.
//!
//! A pipeline is a tree of [`Stage`]s. Each stage owns an unbounded FIFO queue
//! and one dedicated worker thread that hands every queued item to the stage's
//! single registered action. Mapping and filtering graft child stages onto the
//! tree; stopping a stage halts its worker and then cascades to its children.
//!
//! # Features
//!
//! - One worker per stage, blocked on a condition variable while idle
//! - Unified map/filter primitive ([`Stage::apply`]) with `transform`,
//!   `filter` and fallible variants built on it
//! - Explicit single-subscriber contract ([`Subscription`])
//! - Configurable action failure handling ([`FailurePolicy`]); panics in
//!   actions are contained
//! - Cooperative, non-draining shutdown cascading through the tree
//! - Per-stage metrics: delivered/failed/discarded counts, action latency
//!
//! # Example
//!
//! ```
//! use reactive_stage::Stage;
//! use std::sync::mpsc;
//!
//! let root = Stage::new()?;
//! let doubled = root.transform(|x: i32| x * 2)?;
//!
//! let (tx, rx) = mpsc::channel();
//! doubled.for_each(move |x| tx.send(x).unwrap())?;
//!
//! root.add(3);
//! root.add(5);
//! assert_eq!(rx.recv().unwrap(), 6);
//! assert_eq!(rx.recv().unwrap(), 10);
//!
//! root.stop();
//! # Ok::<(), reactive_stage::StageError>(())
//! ```

mod action;
pub mod config;
pub mod error;
pub mod metrics;
mod queue;
pub mod stage;
mod worker;

pub use config::{FailurePolicy, StageBuilder, StageConfig, Subscription};
pub use error::{ActionError, BoxError, Result, StageError};
pub use metrics::{LatencySummary, LatencyWindow, MetricsSnapshot, StageMetrics};
pub use stage::Stage;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
