//! Delivery of outcomes to an optionally attached observer
//!
//! The worker never touches observer state; it only sends on a channel. At
//! most one observer is attached at a time and attaching replaces the
//! previous one. Messages sent while nothing is attached are dropped.

use parking_lot::Mutex;
use std::fmt::Debug;
use tokio::sync::mpsc;
use tracing::debug;

/// Single-slot "latest observer" with an outbound message queue
pub struct Reporter<T> {
    slot: Mutex<Option<mpsc::UnboundedSender<T>>>,
}

impl<T: Debug + Send + 'static> Reporter<T> {
    pub fn new() -> Self {
        Self {
            slot: Mutex::new(None),
        }
    }

    /// Attach a new observer, replacing any previous one
    pub fn attach(&self) -> mpsc::UnboundedReceiver<T> {
        let (tx, rx) = mpsc::unbounded_channel();
        *self.slot.lock() = Some(tx);
        rx
    }

    /// Detach the current observer; later messages are dropped
    pub fn detach(&self) {
        self.slot.lock().take();
    }

    pub fn is_attached(&self) -> bool {
        self.slot.lock().as_ref().is_some_and(|tx| !tx.is_closed())
    }

    /// Deliver to the attached observer. Returns false when the message
    /// was dropped because nothing is listening.
    pub fn deliver(&self, message: T) -> bool {
        let mut slot = self.slot.lock();
        let Some(tx) = slot.as_ref() else {
            debug!("[REPORTER] No observer attached, dropping {:?}", message);
            return false;
        };
        match tx.send(message) {
            Ok(()) => true,
            Err(mpsc::error::SendError(message)) => {
                debug!("[REPORTER] Observer went away, dropping {:?}", message);
                slot.take();
                false
            }
        }
    }
}

impl<T: Debug + Send + 'static> Default for Reporter<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use remote_agent_shared::FailureReport;

    #[test]
    fn test_dropped_without_observer() {
        let reporter = Reporter::<FailureReport>::new();
        assert!(!reporter.is_attached());
        assert!(!reporter.deliver(FailureReport::new("ring", "failed")));
    }

    #[tokio::test]
    async fn test_delivered_to_attached_observer() {
        let reporter = Reporter::new();
        let mut rx = reporter.attach();
        assert!(reporter.deliver(FailureReport::new("ring", "failed")));
        assert_eq!(rx.recv().await, Some(FailureReport::new("ring", "failed")));
    }

    #[tokio::test]
    async fn test_attach_replaces_previous_observer() {
        let reporter = Reporter::new();
        let mut first = reporter.attach();
        let mut second = reporter.attach();

        assert!(reporter.deliver(FailureReport::new("vibrate", "failed")));
        assert!(first.recv().await.is_none());
        assert!(second.recv().await.is_some());
    }

    #[test]
    fn test_dropped_receiver_detaches() {
        let reporter = Reporter::new();
        let rx = reporter.attach();
        drop(rx);

        assert!(!reporter.is_attached());
        assert!(!reporter.deliver(FailureReport::new("ring", "failed")));
        reporter.detach();
        assert!(!reporter.deliver(FailureReport::new("ring", "failed")));
    }
}
