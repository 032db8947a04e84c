use thiserror::Error;

/// Result type for stage operations
pub type Result<T> = std::result::Result<T, StageError>;

/// Boxed error returned by fallible actions
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Errors returned by the stage API
#[derive(Error, Debug)]
pub enum StageError {
    /// The worker thread could not be spawned
    #[error("Failed to spawn stage worker: {0}")]
    Spawn(#[from] std::io::Error),

    /// The stage has been stopped and cannot be reconfigured
    #[error("Stage has been stopped")]
    Stopped,

    /// An action is already registered and the stage does not allow replacing it
    #[error("Stage already has a subscriber")]
    AlreadySubscribed,
}

/// Failure raised while running a stage's action.
///
/// These never cross the public API; the worker logs them and applies the
/// stage's [`FailurePolicy`](crate::FailurePolicy).
#[derive(Error, Debug)]
pub enum ActionError {
    /// The action returned an error
    #[error("action failed: {0}")]
    Failed(BoxError),

    /// The action panicked
    #[error("action panicked: {0}")]
    Panicked(String),
}

impl ActionError {
    /// Build from a panic payload caught by `catch_unwind`
    pub(crate) fn from_panic(payload: Box<dyn std::any::Any + Send>) -> Self {
        let message = if let Some(s) = payload.downcast_ref::<&str>() {
            (*s).to_string()
        } else if let Some(s) = payload.downcast_ref::<String>() {
            s.clone()
        } else {
            "non-string panic payload".to_string()
        };
        ActionError::Panicked(message)
    }
}
