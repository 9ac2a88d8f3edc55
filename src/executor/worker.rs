//! Serial executor - one worker running queued actions one at a time

use super::cancel::{CancelContext, CancelReason, CancelSlot};
use super::error::{ActionError, SubmitError};
use super::queue::{ActionQueue, QueueReceiver, QueueSender, Rejected};
use super::reporter::Reporter;
use super::wake_lock::{WakeLock, WakeLockGuard};
use crate::config::ExecutorConfig;
use anyhow::anyhow;
use async_trait::async_trait;
use futures::FutureExt;
use parking_lot::Mutex;
use remote_agent_shared::FailureReport;
use std::any::Any;
use std::fmt;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Lifecycle of an executor
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutorState {
    /// Created, worker not yet waiting
    Idle,
    /// Blocked on the queue
    Waiting,
    /// Exactly one action is running
    Running,
    /// The running action is being interrupted
    Canceling,
    /// Terminal; a new executor is needed to run anything else
    Stopped,
}

/// How one action ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActionOutcome {
    Completed,
    /// Reported to the attached observer
    Failed { message: String, unexpected: bool },
    /// Not reported; the executor carries on unless the reason is shutdown
    Canceled(CancelReason),
}

/// The body run for each action
#[async_trait]
pub trait ActionHandler: Send + Sync + 'static {
    type Action: fmt::Display + Send + Sync + 'static;

    /// Run one action to completion. Resources acquired here must be
    /// released on drop: a cancelled action's future is dropped mid-await.
    async fn handle(&self, action: &Self::Action, cancel: &CancelContext)
        -> Result<(), ActionError>;

    /// Summary shown to the user when `action` fails
    fn failure_message(&self, _action: &Self::Action, error: &ActionError) -> String {
        error.to_string()
    }
}

/// Handle to a running executor
pub struct SerialExecutor<A> {
    name: String,
    queue: QueueSender<A>,
    cancel: Arc<CancelSlot>,
    shutdown: CancellationToken,
    state: watch::Receiver<ExecutorState>,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl<A: fmt::Display + Send + Sync + 'static> SerialExecutor<A> {
    /// Spawn the worker. Must be called from within a tokio runtime.
    pub fn start<H>(
        config: &ExecutorConfig,
        handler: Arc<H>,
        wake_lock: Arc<dyn WakeLock>,
        reporter: Arc<Reporter<FailureReport>>,
    ) -> Self
    where
        H: ActionHandler<Action = A>,
    {
        Self::start_after(config, handler, wake_lock, reporter, None)
    }

    /// Spawn a worker that only starts taking actions once `previous`
    /// has stopped
    pub(crate) fn start_after<H>(
        config: &ExecutorConfig,
        handler: Arc<H>,
        wake_lock: Arc<dyn WakeLock>,
        reporter: Arc<Reporter<FailureReport>>,
        previous: Option<watch::Receiver<ExecutorState>>,
    ) -> Self
    where
        H: ActionHandler<Action = A>,
    {
        let (queue, receiver) = ActionQueue::bounded(config.capacity);
        let shutdown = CancellationToken::new();
        let cancel = Arc::new(CancelSlot::new(shutdown.clone()));
        let (state_tx, state_rx) = watch::channel(ExecutorState::Idle);

        let worker = Worker {
            name: config.name.clone(),
            idle_timeout: config.idle_timeout,
            handler,
            wake_lock,
            reporter,
            cancel: cancel.clone(),
            shutdown: shutdown.clone(),
            state: state_tx,
        };
        let task = tokio::spawn(worker.run(receiver, previous));

        Self {
            name: config.name.clone(),
            queue,
            cancel,
            shutdown,
            state: state_rx,
            task: Mutex::new(Some(task)),
        }
    }

    /// Queue an action without blocking
    pub fn submit(&self, action: A) -> Result<(), SubmitError> {
        self.try_submit(action).map_err(|rejected| rejected.error)
    }

    /// Boolean form of [`submit`](Self::submit)
    pub fn offer(&self, action: A) -> bool {
        self.submit(action).is_ok()
    }

    /// Queue an action, handing it back when rejected
    pub fn try_submit(&self, action: A) -> Result<(), Rejected<A>> {
        let label = action.to_string();
        match self.queue.try_submit(action) {
            Ok(()) => {
                info!("[EXECUTOR] {}: queued {}", self.name, label);
                Ok(())
            }
            Err(rejected) => {
                match rejected.error {
                    SubmitError::QueueFull => {
                        warn!("[EXECUTOR] {}: queue is full, rejected {}", self.name, label)
                    }
                    SubmitError::Stopped => {
                        debug!("[EXECUTOR] {}: stopped, rejected {}", self.name, label)
                    }
                }
                Err(rejected)
            }
        }
    }

    /// Interrupt the running action. Queued actions are not affected.
    /// Returns false when nothing was running.
    pub fn request_cancel(&self) -> bool {
        let targeted = self.cancel.request_cancel();
        if targeted {
            info!("[EXECUTOR] {}: canceling current action", self.name);
        } else {
            debug!("[EXECUTOR] {}: cancel requested while idle", self.name);
        }
        targeted
    }

    pub fn state(&self) -> ExecutorState {
        *self.state.borrow()
    }

    pub fn subscribe_state(&self) -> watch::Receiver<ExecutorState> {
        self.state.clone()
    }

    pub fn is_stopped(&self) -> bool {
        self.state() == ExecutorState::Stopped || self.queue.is_closed()
    }

    /// Actions accepted but not yet started
    pub fn pending(&self) -> usize {
        self.queue.pending()
    }

    /// Wait until the worker has stopped on its own or by shutdown
    pub async fn wait_stopped(&self) {
        let mut state = self.state.clone();
        let _ = state.wait_for(|s| *s == ExecutorState::Stopped).await;
    }

    /// Stop the worker: the running action is cancelled and queued actions
    /// are discarded
    pub async fn shutdown(&self) {
        self.shutdown.cancel();
        let task = self.task.lock().take();
        if let Some(task) = task {
            if let Err(e) = task.await {
                error!("[EXECUTOR] {}: worker task failed: {}", self.name, e);
            }
        }
    }
}

impl<A> Drop for SerialExecutor<A> {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}

struct Worker<H: ActionHandler> {
    name: String,
    idle_timeout: Duration,
    handler: Arc<H>,
    wake_lock: Arc<dyn WakeLock>,
    reporter: Arc<Reporter<FailureReport>>,
    cancel: Arc<CancelSlot>,
    shutdown: CancellationToken,
    state: watch::Sender<ExecutorState>,
}

impl<H: ActionHandler> Worker<H> {
    async fn run(
        self,
        mut queue: QueueReceiver<H::Action>,
        previous: Option<watch::Receiver<ExecutorState>>,
    ) {
        if let Some(mut previous) = previous {
            tokio::select! {
                biased;
                _ = self.shutdown.cancelled() => {}
                _ = previous.wait_for(|s| *s == ExecutorState::Stopped) => {}
            }
        }
        info!("[EXECUTOR] {}: started", self.name);

        loop {
            self.set_state(ExecutorState::Waiting);

            let next = tokio::select! {
                biased;
                _ = self.shutdown.cancelled() => break,
                next = queue.take(self.idle_timeout) => next,
            };

            let Some(action) = next else {
                debug!(
                    "[EXECUTOR] {}: no action was submitted recently, stopping",
                    self.name
                );
                self.drain_after_idle(&mut queue).await;
                break;
            };

            if self.execute(action).await == ActionOutcome::Canceled(CancelReason::Shutdown) {
                break;
            }
        }

        let discarded = queue.close_and_drain();
        if !discarded.is_empty() {
            warn!(
                "[EXECUTOR] {}: discarding {} queued action(s)",
                self.name,
                discarded.len()
            );
        }
        self.set_state(ExecutorState::Stopped);
        info!("[EXECUTOR] {}: stopped", self.name);
    }

    /// Close the queue and run whatever was accepted before the close.
    /// Returns the number of actions run.
    async fn drain_after_idle(&self, queue: &mut QueueReceiver<H::Action>) -> usize {
        let mut late = queue.close_and_drain().into_iter();
        let mut ran = 0;
        while let Some(action) = late.next() {
            if self.shutdown.is_cancelled() {
                warn!(
                    "[EXECUTOR] {}: discarding {} queued action(s)",
                    self.name,
                    late.len() + 1
                );
                break;
            }
            self.execute(action).await;
            ran += 1;
        }
        ran
    }

    async fn execute(&self, action: H::Action) -> ActionOutcome {
        // Flag cleared and token installed before the body starts
        let ctx = self.cancel.begin();
        self.set_state(ExecutorState::Running);
        info!("[EXECUTOR] {}: executing {}", self.name, action);

        let outcome = {
            let _wake_lock = WakeLockGuard::acquire(self.wake_lock.as_ref());
            let body = AssertUnwindSafe(self.handler.handle(&action, &ctx)).catch_unwind();
            tokio::select! {
                result = body => self.classify(&action, result),
                _ = ctx.cancelled() => {
                    self.set_state(ExecutorState::Canceling);
                    ActionOutcome::Canceled(ctx.reason().unwrap_or(CancelReason::Requested))
                }
            }
        };
        self.cancel.finish();

        match &outcome {
            ActionOutcome::Completed => {
                info!("[EXECUTOR] {}: finished {}", self.name, action);
            }
            ActionOutcome::Failed { message, .. } => {
                self.reporter
                    .deliver(FailureReport::new(action.to_string(), message.clone()));
            }
            ActionOutcome::Canceled(CancelReason::Requested) => {
                info!("[EXECUTOR] {}: {} was canceled", self.name, action);
            }
            ActionOutcome::Canceled(CancelReason::Shutdown) => {
                debug!("[EXECUTOR] {}: {} interrupted by shutdown", self.name, action);
            }
        }
        outcome
    }

    fn classify(
        &self,
        action: &H::Action,
        result: Result<Result<(), ActionError>, Box<dyn Any + Send>>,
    ) -> ActionOutcome {
        let err = match result {
            Ok(Ok(())) => return ActionOutcome::Completed,
            Ok(Err(err)) => err,
            Err(panic) => ActionError::Unexpected(anyhow!(
                "action panicked: {}",
                panic_message(panic.as_ref())
            )),
        };

        let unexpected = err.is_unexpected();
        if unexpected {
            error!(
                "[EXECUTOR] {}: unexpected failure in {}: {}",
                self.name,
                action,
                err.detail()
            );
        } else {
            warn!(
                "[EXECUTOR] {}: error when executing {}: {}",
                self.name,
                action,
                err.detail()
            );
        }

        ActionOutcome::Failed {
            message: self.handler.failure_message(action, &err),
            unexpected,
        }
    }

    fn set_state(&self, state: ExecutorState) {
        self.state.send_replace(state);
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s
    } else {
        "unknown panic"
    }
}
