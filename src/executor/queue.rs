//! Bounded FIFO mailbox between triggers and the executor worker

use super::error::SubmitError;
use std::time::Duration;
use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::time::timeout;

/// A rejected submission, handing the action back to the caller
#[derive(Debug)]
pub struct Rejected<A> {
    pub error: SubmitError,
    pub action: A,
}

/// Constructor for the sender/receiver pair
pub struct ActionQueue;

impl ActionQueue {
    /// Create a queue holding at most `capacity` pending actions.
    /// A capacity of zero is raised to one.
    pub fn bounded<A>(capacity: usize) -> (QueueSender<A>, QueueReceiver<A>) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        (QueueSender { tx }, QueueReceiver { rx })
    }
}

/// Trigger side of the queue; cheap to clone and usable from any thread
pub struct QueueSender<A> {
    tx: mpsc::Sender<A>,
}

impl<A> Clone for QueueSender<A> {
    fn clone(&self) -> Self {
        Self {
            tx: self.tx.clone(),
        }
    }
}

impl<A> QueueSender<A> {
    /// Submit without blocking, handing the action back on rejection
    pub fn try_submit(&self, action: A) -> Result<(), Rejected<A>> {
        self.tx.try_send(action).map_err(|e| match e {
            TrySendError::Full(action) => Rejected {
                error: SubmitError::QueueFull,
                action,
            },
            TrySendError::Closed(action) => Rejected {
                error: SubmitError::Stopped,
                action,
            },
        })
    }

    /// Submit without blocking
    pub fn submit(&self, action: A) -> Result<(), SubmitError> {
        self.try_submit(action).map_err(|r| r.error)
    }

    /// Boolean form of [`submit`](Self::submit)
    pub fn offer(&self, action: A) -> bool {
        self.submit(action).is_ok()
    }

    /// Fixed capacity chosen at construction
    pub fn capacity(&self) -> usize {
        self.tx.max_capacity()
    }

    /// Number of accepted actions not yet taken by the worker
    pub fn pending(&self) -> usize {
        self.tx.max_capacity() - self.tx.capacity()
    }

    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

/// Worker side of the queue
pub struct QueueReceiver<A> {
    rx: mpsc::Receiver<A>,
}

impl<A> QueueReceiver<A> {
    /// Wait up to `idle` for the next action.
    /// Returns `None` on timeout or when every sender is gone.
    pub async fn take(&mut self, idle: Duration) -> Option<A> {
        timeout(idle, self.rx.recv()).await.unwrap_or_default()
    }

    /// Refuse further submissions and return whatever was accepted before
    pub fn close_and_drain(&mut self) -> Vec<A> {
        self.rx.close();
        let mut remaining = Vec::new();
        while let Ok(action) = self.rx.try_recv() {
            remaining.push(action);
        }
        remaining
    }
}
