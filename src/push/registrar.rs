//! Registration with the push transport

use super::PushMessage;
use async_trait::async_trait;
use remote_agent_shared::now_ms;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::mpsc;
use tracing::{info, warn};

/// Starts push (un)registration; the outcome arrives later as a
/// [`PushMessage`]. Returns false when the push service is unavailable.
#[async_trait]
pub trait PushRegistrar: Send + Sync {
    async fn register(&self, sender_id: &str) -> bool;
    async fn unregister(&self) -> bool;
}

/// Local push transport that answers every request with a callback
pub struct SimulatedPush {
    available: AtomicBool,
    callbacks: mpsc::UnboundedSender<PushMessage>,
}

impl SimulatedPush {
    pub fn new(available: bool, callbacks: mpsc::UnboundedSender<PushMessage>) -> Self {
        Self {
            available: AtomicBool::new(available),
            callbacks,
        }
    }

    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }

    fn callback(&self, message: PushMessage) -> bool {
        if self.callbacks.send(message).is_err() {
            warn!("[PUSH] Callback receiver is gone");
            return false;
        }
        true
    }
}

#[async_trait]
impl PushRegistrar for SimulatedPush {
    async fn register(&self, sender_id: &str) -> bool {
        if !self.available.load(Ordering::SeqCst) {
            return false;
        }
        info!("[PUSH] Registering with sender {}", sender_id);
        self.callback(PushMessage::Registered(format!("sim-{:x}", now_ms())))
    }

    async fn unregister(&self) -> bool {
        if !self.available.load(Ordering::SeqCst) {
            return false;
        }
        info!("[PUSH] Unregistering");
        self.callback(PushMessage::Unregistered)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_register_loops_back() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let push = SimulatedPush::new(true, tx);

        assert!(push.register("sender").await);
        assert!(matches!(
            rx.recv().await,
            Some(PushMessage::Registered(id)) if id.starts_with("sim-")
        ));

        assert!(push.unregister().await);
        assert_eq!(rx.recv().await, Some(PushMessage::Unregistered));
    }

    #[tokio::test]
    async fn test_unavailable_sends_nothing() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let push = SimulatedPush::new(false, tx);

        assert!(!push.register("sender").await);
        assert!(!push.unregister().await);
        assert!(rx.try_recv().is_err());

        push.set_available(true);
        assert!(push.register("sender").await);
    }
}
