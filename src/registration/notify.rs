//! User-visible progress for registration actions

use parking_lot::Mutex;
use tracing::info;

/// Done notice posted after a registration callback finishes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Notice {
    DeviceOnline,
    DeviceOffline,
    UpdateFailed,
}

impl Notice {
    pub fn text(self) -> &'static str {
        match self {
            Notice::DeviceOnline => "Device is online",
            Notice::DeviceOffline => "Device is offline",
            Notice::UpdateFailed => "Device update failed",
        }
    }
}

/// Keeps the agent marked as doing user-visible work
pub trait ForegroundIndicator: Send + Sync {
    fn start(&self, message: &str);
    fn stop(&self, remove_notice: bool);
}

pub trait Notifier: Send + Sync {
    fn post(&self, notice: Notice);
    fn clear(&self);
}

/// Holds the foreground indicator for one action
pub struct ForegroundGuard<'a> {
    indicator: &'a dyn ForegroundIndicator,
    remove_notice: bool,
}

impl<'a> ForegroundGuard<'a> {
    pub fn start(
        indicator: &'a dyn ForegroundIndicator,
        message: &str,
        remove_notice: bool,
    ) -> Self {
        indicator.start(message);
        Self {
            indicator,
            remove_notice,
        }
    }
}

impl Drop for ForegroundGuard<'_> {
    fn drop(&mut self) {
        self.indicator.stop(self.remove_notice);
    }
}

/// Writes indicator and notice changes to the log
#[derive(Debug, Default)]
pub struct LogNotifier {
    posted: Mutex<Option<Notice>>,
}

impl LogNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current(&self) -> Option<Notice> {
        *self.posted.lock()
    }
}

impl ForegroundIndicator for LogNotifier {
    fn start(&self, message: &str) {
        info!("[NOTICE] {}", message);
    }

    fn stop(&self, remove_notice: bool) {
        if remove_notice {
            info!("[NOTICE] Progress cleared");
        }
    }
}

impl Notifier for LogNotifier {
    fn post(&self, notice: Notice) {
        info!("[NOTICE] {}", notice.text());
        *self.posted.lock() = Some(notice);
    }

    fn clear(&self) {
        self.posted.lock().take();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct Recording(Mutex<Vec<String>>);

    impl ForegroundIndicator for Recording {
        fn start(&self, message: &str) {
            self.0.lock().push(format!("start {}", message));
        }

        fn stop(&self, remove_notice: bool) {
            self.0.lock().push(format!("stop {}", remove_notice));
        }
    }

    #[test]
    fn test_guard_stops_on_panic() {
        let indicator = Recording::default();
        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            let _guard = ForegroundGuard::start(&indicator, "Updating device", true);
            panic!("boom");
        }));
        assert!(result.is_err());
        assert_eq!(*indicator.0.lock(), vec!["start Updating device", "stop true"]);
    }

    #[test]
    fn test_log_notifier_keeps_last_notice() {
        let notifier = LogNotifier::new();
        notifier.post(Notice::DeviceOnline);
        assert_eq!(notifier.current(), Some(Notice::DeviceOnline));
        notifier.clear();
        assert_eq!(notifier.current(), None);
    }
}
