use crate::action::Action;
use crate::config::Subscription;
use crate::error::{Result, StageError};
use parking_lot::{Condvar, Mutex};
use std::collections::VecDeque;

/// Outcome of installing an action on a queue
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Installed {
    /// No action was registered before
    Fresh,
    /// An existing action was replaced
    Replaced,
}

struct QueueState<T> {
    items: VecDeque<T>,
    action: Option<Action<T>>,
    alive: bool,
}

/// Unbounded FIFO shared between producers and a single stage worker.
///
/// The item queue, the `alive` flag and the action slot share one lock; the
/// condition variable wakes the worker when an item or an action arrives, or
/// when the queue is closed.
pub(crate) struct WorkQueue<T> {
    state: Mutex<QueueState<T>>,
    ready: Condvar,
}

impl<T> WorkQueue<T> {
    pub(crate) fn new() -> Self {
        Self {
            state: Mutex::new(QueueState {
                items: VecDeque::new(),
                action: None,
                alive: true,
            }),
            ready: Condvar::new(),
        }
    }

    /// Append an item and wake the worker.
    ///
    /// Accepted even after `close`; the return value reports whether a worker
    /// will still drain it.
    pub(crate) fn push(&self, item: T) -> bool {
        let mut state = self.state.lock();
        state.items.push_back(item);
        self.ready.notify_one();
        state.alive
    }

    /// Install `action` under the given subscription policy
    pub(crate) fn install(&self, action: Action<T>, subscription: Subscription) -> Result<Installed> {
        let mut state = self.state.lock();
        if !state.alive {
            return Err(StageError::Stopped);
        }
        let installed = match (&state.action, subscription) {
            (None, _) => Installed::Fresh,
            (Some(_), Subscription::Replace) => Installed::Replaced,
            (Some(_), Subscription::Exclusive) => return Err(StageError::AlreadySubscribed),
        };
        state.action = Some(action);
        self.ready.notify_one();
        Ok(installed)
    }

    /// Check that an action could be installed right now without installing one
    pub(crate) fn check_install(&self, subscription: Subscription) -> Result<()> {
        let state = self.state.lock();
        if !state.alive {
            return Err(StageError::Stopped);
        }
        if state.action.is_some() && subscription == Subscription::Exclusive {
            return Err(StageError::AlreadySubscribed);
        }
        Ok(())
    }

    /// Block until an item can be delivered or the queue is closed.
    ///
    /// Returns the head item together with the action current at dequeue
    /// time, or `None` once the queue has been closed. Items are held while no
    /// action is registered.
    pub(crate) fn next(&self) -> Option<(T, Action<T>)> {
        let mut state = self.state.lock();
        loop {
            if !state.alive {
                return None;
            }
            if let Some(action) = state.action.clone() {
                if let Some(item) = state.items.pop_front() {
                    return Some((item, action));
                }
            }
            self.ready.wait(&mut state);
        }
    }

    /// Mark the queue dead and wake the worker.
    ///
    /// Returns the number of items left undelivered, or `None` if the queue
    /// was already closed.
    pub(crate) fn close(&self) -> Option<usize> {
        let mut state = self.state.lock();
        if !state.alive {
            return None;
        }
        state.alive = false;
        self.ready.notify_all();
        Some(state.items.len())
    }

    pub(crate) fn is_alive(&self) -> bool {
        self.state.lock().alive
    }

    pub(crate) fn has_action(&self) -> bool {
        self.state.lock().action.is_some()
    }

    pub(crate) fn len(&self) -> usize {
        self.state.lock().items.len()
    }
}
