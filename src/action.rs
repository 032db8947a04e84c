use crate::error::{ActionError, BoxError};
use parking_lot::Mutex;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;

type ActionFn<T> = dyn FnMut(T) -> Result<(), BoxError> + Send;

/// The callback a stage runs on every dequeued item.
///
/// Cloning is cheap; the worker clones the current action under the queue lock
/// and calls it after releasing that lock, so replacing the action never
/// affects an item that has already been handed out.
pub(crate) struct Action<T> {
    func: Arc<Mutex<Box<ActionFn<T>>>>,
}

impl<T> Clone for Action<T> {
    fn clone(&self) -> Self {
        Self {
            func: Arc::clone(&self.func),
        }
    }
}

impl<T> Action<T> {
    pub(crate) fn new<F>(func: F) -> Self
    where
        F: FnMut(T) -> Result<(), BoxError> + Send + 'static,
    {
        Self {
            func: Arc::new(Mutex::new(Box::new(func))),
        }
    }

    /// Run the action, turning both returned errors and panics into `ActionError`
    pub(crate) fn call(&self, item: T) -> Result<(), ActionError> {
        let mut func = self.func.lock();
        match catch_unwind(AssertUnwindSafe(|| (*func)(item))) {
            Ok(Ok(())) => Ok(()),
            Ok(Err(e)) => Err(ActionError::Failed(e)),
            Err(payload) => Err(ActionError::from_panic(payload)),
        }
    }
}
