//! Restartable front for a serial executor
//!
//! An executor that stopped after its idle timeout cannot be restarted in
//! place. The service starts a fresh one on the next submission, after the
//! previous worker has fully stopped, so actions stay serial across restarts.

use super::error::SubmitError;
use super::queue::Rejected;
use super::reporter::Reporter;
use super::wake_lock::WakeLock;
use super::worker::{ActionHandler, ExecutorState, SerialExecutor};
use crate::config::ExecutorConfig;
use parking_lot::Mutex;
use remote_agent_shared::FailureReport;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tracing::debug;

struct Workers<A> {
    current: Option<SerialExecutor<A>>,
    /// Replaced worker still running actions accepted before its idle stop
    draining: Option<SerialExecutor<A>>,
}

pub struct ActionService<H: ActionHandler> {
    config: ExecutorConfig,
    handler: Arc<H>,
    wake_lock: Arc<dyn WakeLock>,
    reporter: Arc<Reporter<FailureReport>>,
    workers: Mutex<Workers<H::Action>>,
    starts: AtomicUsize,
}

impl<H: ActionHandler> ActionService<H> {
    /// Create the service; no worker runs until the first submission
    pub fn new(
        config: ExecutorConfig,
        handler: Arc<H>,
        wake_lock: Arc<dyn WakeLock>,
        reporter: Arc<Reporter<FailureReport>>,
    ) -> Self {
        Self {
            config,
            handler,
            wake_lock,
            reporter,
            workers: Mutex::new(Workers {
                current: None,
                draining: None,
            }),
            starts: AtomicUsize::new(0),
        }
    }

    pub fn handler(&self) -> &Arc<H> {
        &self.handler
    }

    pub fn name(&self) -> &str {
        &self.config.name
    }

    /// Queue an action, starting a worker if none is running
    pub fn submit(&self, action: H::Action) -> Result<(), SubmitError> {
        let mut workers = self.workers.lock();

        let action = match workers.current.as_ref() {
            Some(executor) if !executor.is_stopped() => match executor.try_submit(action) {
                Ok(()) => return Ok(()),
                Err(Rejected {
                    error: SubmitError::Stopped,
                    action,
                }) => action,
                Err(rejected) => return Err(rejected.error),
            },
            _ => action,
        };

        let previous = workers
            .current
            .as_ref()
            .map(|executor| executor.subscribe_state());
        let executor = SerialExecutor::start_after(
            &self.config,
            self.handler.clone(),
            self.wake_lock.clone(),
            self.reporter.clone(),
            previous,
        );
        let generation = self.starts.fetch_add(1, Ordering::SeqCst) + 1;
        debug!("[SERVICE] {}: started worker #{}", self.config.name, generation);

        let result = executor.submit(action);
        // Dropping a handle shuts its worker down; keep it until it has drained
        workers.draining = workers
            .current
            .replace(executor)
            .filter(|old| old.state() != ExecutorState::Stopped);
        result
    }

    /// Interrupt the running action, if any. A draining worker runs
    /// before the current one, so it is targeted first.
    pub fn request_cancel(&self) -> bool {
        let workers = self.workers.lock();
        workers
            .draining
            .as_ref()
            .is_some_and(|executor| executor.request_cancel())
            || workers
                .current
                .as_ref()
                .is_some_and(|executor| executor.request_cancel())
    }

    /// State of the current worker, `None` before the first submission
    pub fn state(&self) -> Option<ExecutorState> {
        self.workers
            .lock()
            .current
            .as_ref()
            .map(|executor| executor.state())
    }

    /// Number of workers started so far
    pub fn starts(&self) -> usize {
        self.starts.load(Ordering::SeqCst)
    }

    /// Stop every worker and wait for them
    pub async fn shutdown(&self) {
        let (draining, current) = {
            let mut workers = self.workers.lock();
            (workers.draining.take(), workers.current.take())
        };
        for executor in [draining, current].into_iter().flatten() {
            executor.shutdown().await;
        }
    }
}
