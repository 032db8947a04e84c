use crate::error::Result;
use crate::stage::Stage;
use std::sync::atomic::{AtomicU64, Ordering};

static NEXT_STAGE_ID: AtomicU64 = AtomicU64::new(0);

/// What the worker does when an action returns an error or panics
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FailurePolicy {
    /// Log the failure and move on to the next item
    #[default]
    Continue,
    /// Log the failure and end the worker; the stage stops draining its queue
    Terminate,
}

/// How a stage reacts when an action is registered while one already exists
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Subscription {
    /// A second registration fails with [`StageError::AlreadySubscribed`](crate::StageError::AlreadySubscribed)
    #[default]
    Exclusive,
    /// A second registration silently rewires the stage
    Replace,
}

/// Resolved configuration carried by every stage
#[derive(Debug, Clone)]
pub struct StageConfig {
    pub name: String,
    pub failure_policy: FailurePolicy,
    pub subscription: Subscription,
}

impl StageConfig {
    /// Config for a child stage: same policies, name derived from the parent
    pub(crate) fn child(&self, index: usize) -> Self {
        Self {
            name: format!("{}.{}", self.name, index),
            failure_policy: self.failure_policy,
            subscription: self.subscription,
        }
    }
}

impl Default for StageConfig {
    fn default() -> Self {
        StageBuilder::new().into_config()
    }
}

/// Builder for root stages
#[derive(Debug, Clone, Default)]
pub struct StageBuilder {
    name: Option<String>,
    failure_policy: FailurePolicy,
    subscription: Subscription,
}

impl StageBuilder {
    /// Create a builder with default policies
    pub fn new() -> Self {
        Self::default()
    }

    /// Name the stage; also used as the worker thread name
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Set the action failure policy
    pub fn failure_policy(mut self, policy: FailurePolicy) -> Self {
        self.failure_policy = policy;
        self
    }

    /// Set the subscription policy
    pub fn subscription(mut self, subscription: Subscription) -> Self {
        self.subscription = subscription;
        self
    }

    /// Resolve the configuration, assigning a generated name if none was given
    pub fn into_config(self) -> StageConfig {
        let name = self.name.unwrap_or_else(|| {
            format!("stage-{}", NEXT_STAGE_ID.fetch_add(1, Ordering::Relaxed))
        });
        StageConfig {
            name,
            failure_policy: self.failure_policy,
            subscription: self.subscription,
        }
    }

    /// Spawn the stage and its worker
    pub fn spawn<T: Send + 'static>(self) -> Result<Stage<T>> {
        Stage::with_config(self.into_config())
    }
}
