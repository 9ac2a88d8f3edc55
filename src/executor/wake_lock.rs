//! Wake-lock held while an action runs

use std::sync::atomic::{AtomicUsize, Ordering};
use tracing::debug;

/// A resource keeping the host awake while one action runs
pub trait WakeLock: Send + Sync {
    fn acquire(&self);
    fn release(&self);
}

/// Releases the wake-lock when dropped, whatever way the action ended
pub struct WakeLockGuard<'a> {
    lock: &'a dyn WakeLock,
}

impl<'a> WakeLockGuard<'a> {
    pub fn acquire(lock: &'a dyn WakeLock) -> Self {
        lock.acquire();
        Self { lock }
    }
}

impl Drop for WakeLockGuard<'_> {
    fn drop(&mut self) {
        self.lock.release();
    }
}

/// Wake-lock that only logs, for hosts without a power manager
pub struct LoggingWakeLock {
    tag: String,
}

impl LoggingWakeLock {
    pub fn new(tag: impl Into<String>) -> Self {
        Self { tag: tag.into() }
    }
}

impl WakeLock for LoggingWakeLock {
    fn acquire(&self) {
        debug!("[WAKELOCK] {} acquired", self.tag);
    }

    fn release(&self) {
        debug!("[WAKELOCK] {} released", self.tag);
    }
}

/// Wake-lock that counts acquisitions and releases
#[derive(Debug, Default)]
pub struct CountingWakeLock {
    acquired: AtomicUsize,
    released: AtomicUsize,
}

impl CountingWakeLock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn acquired(&self) -> usize {
        self.acquired.load(Ordering::SeqCst)
    }

    pub fn released(&self) -> usize {
        self.released.load(Ordering::SeqCst)
    }

    pub fn is_held(&self) -> bool {
        self.acquired() > self.released()
    }
}

impl WakeLock for CountingWakeLock {
    fn acquire(&self) {
        self.acquired.fetch_add(1, Ordering::SeqCst);
    }

    fn release(&self) {
        self.released.fetch_add(1, Ordering::SeqCst);
    }
}
