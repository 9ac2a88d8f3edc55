//! Serial background executor
//!
//! This module handles:
//! - Accepting actions into a small bounded queue without blocking the caller
//! - Running them one at a time on a dedicated worker under a held wake-lock
//! - Out-of-band cancellation of the action in flight
//! - Stopping the worker after an idle period
//! - Delivering failures to whatever observer is attached

mod cancel;
mod error;
mod queue;
mod reporter;
mod service;
mod wake_lock;
mod worker;

pub use cancel::{CancelContext, CancelReason, CancelSlot};
pub use error::{ActionError, SubmitError};
pub use queue::{ActionQueue, QueueReceiver, QueueSender, Rejected};
pub use reporter::Reporter;
pub use service::ActionService;
pub use wake_lock::{CountingWakeLock, LoggingWakeLock, WakeLock, WakeLockGuard};
pub use worker::{ActionHandler, ActionOutcome, ExecutorState, SerialExecutor};
