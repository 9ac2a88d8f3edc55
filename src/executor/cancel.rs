//! Single-slot cancellation of the action in flight

use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Why a running action was stopped early
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CancelReason {
    /// Someone called `request_cancel`
    Requested,
    /// The executor itself is shutting down
    Shutdown,
}

/// Cancellation state owned by one executor.
///
/// A cancel request targets whatever is running at that moment. There is no
/// handle to a specific action: a request made while idle is dropped.
pub struct CancelSlot {
    requested: Arc<AtomicBool>,
    current: Mutex<Option<CancellationToken>>,
    shutdown: CancellationToken,
}

impl CancelSlot {
    pub fn new(shutdown: CancellationToken) -> Self {
        Self {
            requested: Arc::new(AtomicBool::new(false)),
            current: Mutex::new(None),
            shutdown,
        }
    }

    /// Set the flag and interrupt the running action, if any.
    /// Returns true when an action was actually targeted.
    pub fn request_cancel(&self) -> bool {
        let current = self.current.lock();
        self.requested.store(true, Ordering::SeqCst);
        match current.as_ref() {
            Some(token) => {
                token.cancel();
                true
            }
            None => false,
        }
    }

    /// Whether a cancel is pending for the current action
    pub fn is_requested(&self) -> bool {
        self.requested.load(Ordering::SeqCst)
    }

    /// Arm the slot for a new action. The flag is cleared before the
    /// action's token is installed, under the same lock `request_cancel` uses.
    pub fn begin(&self) -> CancelContext {
        let mut current = self.current.lock();
        self.requested.store(false, Ordering::SeqCst);
        let token = self.shutdown.child_token();
        *current = Some(token.clone());
        CancelContext {
            token,
            shutdown: self.shutdown.clone(),
        }
    }

    /// Disarm the slot once the action is over
    pub fn finish(&self) {
        self.current.lock().take();
    }
}

/// Cancellation view handed to an action body
#[derive(Clone)]
pub struct CancelContext {
    token: CancellationToken,
    shutdown: CancellationToken,
}

impl CancelContext {
    /// A context not linked to any executor, never cancelled unless
    /// [`cancel`](Self::cancel) is called
    pub fn standalone() -> Self {
        let shutdown = CancellationToken::new();
        Self {
            token: shutdown.child_token(),
            shutdown,
        }
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Completes when the action is cancelled for any reason
    pub async fn cancelled(&self) {
        self.token.cancelled().await
    }

    /// Reason for the cancellation, `None` while still live
    pub fn reason(&self) -> Option<CancelReason> {
        if !self.token.is_cancelled() {
            None
        } else if self.shutdown.is_cancelled() {
            Some(CancelReason::Shutdown)
        } else {
            Some(CancelReason::Requested)
        }
    }

    /// Cancel this context as if requested
    pub fn cancel(&self) {
        self.token.cancel();
    }
}

impl std::fmt::Debug for CancelContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CancelContext")
            .field("reason", &self.reason())
            .finish_non_exhaustive()
    }
}
