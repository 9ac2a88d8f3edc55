//! Registration actions run on the registration executor
//!
//! Every action ends in a status event for the attached UI. Settled states
//! (`Connected`, `Disconnected`) are persisted as the online flag so the
//! next start, and a push error arriving outside any action, can report the
//! last known state.

use super::backend::{register_url, unregister_url, BackendError, DeviceBackend};
use super::notify::{ForegroundGuard, ForegroundIndicator, Notice, Notifier};
use crate::config::BackendConfig;
use crate::executor::{ActionError, ActionHandler, CancelContext, Reporter};
use crate::prefs::PreferenceStore;
use crate::push::PushRegistrar;
use anyhow::Result;
use async_trait::async_trait;
use parking_lot::Mutex;
use remote_agent_shared::{ConnectionState, ConnectionTracker, ErrorCode, StatusEvent};
use reqwest::Url;
use std::fmt;
use std::sync::Arc;
use tracing::{error, info, warn};

const UPDATING_MESSAGE: &str = "Updating device";

/// Work item of the registration executor
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegistrationAction {
    /// User asked to bring the device online
    Connect,
    /// User asked to take the device offline
    Disconnect,
    /// Push transport handed out a registration id
    Registered,
    /// Push transport dropped the registration
    Unregistered,
}

impl RegistrationAction {
    /// Callbacks finish the user-visible flow, so their progress notice goes
    fn removes_notice(self) -> bool {
        matches!(
            self,
            RegistrationAction::Registered | RegistrationAction::Unregistered
        )
    }
}

impl fmt::Display for RegistrationAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RegistrationAction::Connect => write!(f, "connect"),
            RegistrationAction::Disconnect => write!(f, "disconnect"),
            RegistrationAction::Registered => write!(f, "registered"),
            RegistrationAction::Unregistered => write!(f, "unregistered"),
        }
    }
}

/// Collaborators of the registration actions
#[derive(Clone)]
pub struct RegistrationContext {
    pub prefs: Arc<dyn PreferenceStore>,
    pub backend: Arc<dyn DeviceBackend>,
    pub push: Arc<dyn PushRegistrar>,
    pub foreground: Arc<dyn ForegroundIndicator>,
    pub notifier: Arc<dyn Notifier>,
    pub status: Arc<Reporter<StatusEvent>>,
}

pub struct RegistrationHandler {
    config: BackendConfig,
    ctx: RegistrationContext,
    tracker: Mutex<ConnectionTracker>,
}

impl RegistrationHandler {
    pub fn new(config: BackendConfig, ctx: RegistrationContext) -> Self {
        let tracker = ConnectionTracker::new(ctx.prefs.is_online());
        Self {
            config,
            ctx,
            tracker: Mutex::new(tracker),
        }
    }

    /// Last state broadcast to the UI
    pub fn state(&self) -> ConnectionState {
        self.tracker.lock().state()
    }

    /// Push transport reported an error outside any action
    pub fn on_push_error(&self, code: &str) {
        warn!("[REGISTRATION] Push error: {}", code);
        let state = if self.ctx.prefs.is_online() {
            ConnectionState::Connected
        } else {
            ConnectionState::Disconnected
        };
        self.fire_event(state, Some(ErrorCode::from_wire(code)));
        self.ctx.foreground.stop(true);
    }

    async fn connect(&self) {
        self.fire_event(ConnectionState::Connecting, None);
        if !self.ctx.push.register(&self.config.sender_id).await {
            warn!("[REGISTRATION] Push service unavailable, cannot register");
            self.fire_event(
                ConnectionState::Disconnected,
                Some(ErrorCode::PhoneRegistrationError),
            );
        }
    }

    async fn disconnect(&self) {
        self.fire_event(ConnectionState::Disconnecting, None);
        if !self.ctx.push.unregister().await {
            warn!("[REGISTRATION] Push service unavailable, cannot unregister");
            self.fire_event(
                ConnectionState::Connected,
                Some(ErrorCode::PhoneRegistrationError),
            );
        }
    }

    async fn on_registered(&self) {
        let refused = ErrorCode::DeviceRegistrationError;
        let result = match self.ctx.prefs.registration_id() {
            Some(reg_id) => {
                info!("[REGISTRATION] Registered with push id {}", reg_id);
                let url = register_url(&self.config.base_url, &reg_id, &self.config.device_name);
                self.call_backend(url, &refused).await
            }
            None => {
                warn!("[REGISTRATION] No push registration id stored");
                Err(refused)
            }
        };

        match result {
            Ok(()) => {
                self.fire_event(ConnectionState::Connected, None);
                self.ctx.notifier.post(Notice::DeviceOnline);
            }
            Err(code) => {
                self.fire_event(ConnectionState::Disconnected, Some(code));
                self.ctx.notifier.post(Notice::UpdateFailed);
            }
        }
    }

    async fn on_unregistered(&self) {
        let refused = ErrorCode::DeviceUnregistrationError;
        let result = match self.ctx.prefs.registration_id() {
            Some(reg_id) => {
                let url = unregister_url(&self.config.base_url, &reg_id);
                self.call_backend(url, &refused).await
            }
            None => {
                warn!("[REGISTRATION] No push registration id stored");
                Err(refused)
            }
        };

        match result {
            Ok(()) => {
                if let Err(e) = self.ctx.prefs.set_account(None) {
                    error!("[REGISTRATION] Failed to clear account: {}", e);
                }
                self.fire_event(ConnectionState::Disconnected, None);
                self.ctx.notifier.post(Notice::DeviceOffline);
            }
            Err(code) => {
                self.fire_event(ConnectionState::Connected, Some(code));
                self.ctx.notifier.post(Notice::UpdateFailed);
            }
        }
    }

    /// GET `url` as the stored account; anything but 200 maps to an error code
    async fn call_backend(&self, url: Result<Url>, refused: &ErrorCode) -> Result<(), ErrorCode> {
        let Some(account) = self.ctx.prefs.account() else {
            warn!("[REGISTRATION] No account configured");
            return Err(ErrorCode::AuthFailed);
        };

        let url = url.map_err(|e| {
            error!("[REGISTRATION] unexpected: invalid backend URL: {:#}", e);
            refused.clone()
        })?;

        match self.ctx.backend.get(&account, &url).await {
            Ok(200) => Ok(()),
            Ok(status) => {
                warn!("[REGISTRATION] Backend answered {} for {}", status, url.path());
                Err(refused.clone())
            }
            Err(BackendError::AuthPending) => {
                info!("[REGISTRATION] Waiting for the user to grant access");
                Err(ErrorCode::AuthPending)
            }
            Err(BackendError::AuthFailed(reason)) => {
                warn!("[REGISTRATION] Authentication failed: {}", reason);
                Err(ErrorCode::AuthFailed)
            }
            Err(BackendError::Network(reason)) => {
                warn!("[REGISTRATION] Network error: {}", reason);
                Err(ErrorCode::NetworkError)
            }
            Err(BackendError::Other(reason)) => {
                error!("[REGISTRATION] unexpected backend error: {}", reason);
                Err(refused.clone())
            }
        }
    }

    fn fire_event(&self, state: ConnectionState, error: Option<ErrorCode>) {
        let event = StatusEvent::new(state, error);
        {
            let mut tracker = self.tracker.lock();
            let from = tracker.state();
            if !tracker.apply(&event) {
                warn!("[REGISTRATION] Unexpected transition {:?} -> {:?}", from, state);
            }
        }

        if let Some(online) = state.online() {
            if let Err(e) = self.ctx.prefs.set_online(online) {
                error!("[REGISTRATION] Failed to persist online flag: {}", e);
            }
        }

        match &event.error {
            Some(code) => info!("[REGISTRATION] {:?} ({})", state, code),
            None => info!("[REGISTRATION] {:?}", state),
        }
        self.ctx.status.deliver(event);
    }
}

#[async_trait]
impl ActionHandler for RegistrationHandler {
    type Action = RegistrationAction;

    async fn handle(
        &self,
        action: &RegistrationAction,
        _cancel: &CancelContext,
    ) -> Result<(), ActionError> {
        self.ctx.notifier.clear();
        let _foreground = ForegroundGuard::start(
            self.ctx.foreground.as_ref(),
            UPDATING_MESSAGE,
            action.removes_notice(),
        );

        match action {
            RegistrationAction::Connect => self.connect().await,
            RegistrationAction::Disconnect => self.disconnect().await,
            RegistrationAction::Registered => self.on_registered().await,
            RegistrationAction::Unregistered => self.on_unregistered().await,
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ExecutorConfig;
    use crate::executor::{ActionService, CountingWakeLock};
    use crate::prefs::{MemoryPreferences, Preferences};
    use std::time::Duration;
    use tokio::sync::mpsc;
    use tokio::time::timeout;

    #[derive(Clone, Copy)]
    enum Reply {
        Status(u16),
        Network,
        AuthFailed,
        AuthPending,
        Other,
    }

    struct FakeBackend {
        reply: Mutex<Reply>,
        calls: Mutex<Vec<(String, Url)>>,
    }

    impl FakeBackend {
        fn new(reply: Reply) -> Self {
            Self {
                reply: Mutex::new(reply),
                calls: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl DeviceBackend for FakeBackend {
        async fn get(&self, account: &str, url: &Url) -> Result<u16, BackendError> {
            self.calls.lock().push((account.to_string(), url.clone()));
            match *self.reply.lock() {
                Reply::Status(status) => Ok(status),
                Reply::Network => Err(BackendError::Network("connection refused".into())),
                Reply::AuthFailed => Err(BackendError::AuthFailed("denied".into())),
                Reply::AuthPending => Err(BackendError::AuthPending),
                Reply::Other => Err(BackendError::Other("garbled".into())),
            }
        }
    }

    struct FakePush {
        available: bool,
        calls: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl PushRegistrar for FakePush {
        async fn register(&self, sender_id: &str) -> bool {
            self.calls.lock().push(format!("register {}", sender_id));
            self.available
        }

        async fn unregister(&self) -> bool {
            self.calls.lock().push("unregister".into());
            self.available
        }
    }

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

    impl Notifier for Recording {
        fn post(&self, notice: Notice) {
            self.0.lock().push(format!("post {:?}", notice));
        }

        fn clear(&self) {
            self.0.lock().push("clear".into());
        }
    }

    struct Fixture {
        handler: RegistrationHandler,
        prefs: Arc<MemoryPreferences>,
        backend: Arc<FakeBackend>,
        push: Arc<FakePush>,
        ui: Arc<Recording>,
        events: mpsc::UnboundedReceiver<StatusEvent>,
    }

    fn fixture(prefs: Preferences, reply: Reply, push_available: bool) -> Fixture {
        let prefs = Arc::new(MemoryPreferences::new(prefs));
        let backend = Arc::new(FakeBackend::new(reply));
        let push = Arc::new(FakePush {
            available: push_available,
            calls: Mutex::new(Vec::new()),
        });
        let ui = Arc::new(Recording::default());
        let status = Arc::new(Reporter::new());
        let events = status.attach();

        let config = BackendConfig {
            base_url: "https://registry.example.com".into(),
            sender_id: "sender@example.com".into(),
            ..BackendConfig::default()
        };
        let handler = RegistrationHandler::new(
            config,
            RegistrationContext {
                prefs: prefs.clone(),
                backend: backend.clone(),
                push: push.clone(),
                foreground: ui.clone(),
                notifier: ui.clone(),
                status,
            },
        );
        Fixture {
            handler,
            prefs,
            backend,
            push,
            ui,
            events,
        }
    }

    fn registered_prefs() -> Preferences {
        Preferences {
            account: Some("me@example.com".into()),
            registration_id: Some("reg-1".into()),
            online: false,
        }
    }

    fn drain(
        events: &mut mpsc::UnboundedReceiver<StatusEvent>,
    ) -> Vec<(ConnectionState, Option<ErrorCode>)> {
        let mut seen = Vec::new();
        while let Ok(event) = events.try_recv() {
            seen.push((event.state, event.error));
        }
        seen
    }

    async fn run(f: &Fixture, action: RegistrationAction) {
        f.handler
            .handle(&action, &CancelContext::standalone())
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_connect_then_registered_goes_online() {
        let mut f = fixture(registered_prefs(), Reply::Status(200), true);

        run(&f, RegistrationAction::Connect).await;
        run(&f, RegistrationAction::Registered).await;

        assert_eq!(
            drain(&mut f.events),
            vec![
                (ConnectionState::Connecting, None),
                (ConnectionState::Connected, None),
            ]
        );
        assert!(f.prefs.is_online());
        assert_eq!(f.handler.state(), ConnectionState::Connected);
        assert_eq!(*f.push.calls.lock(), vec!["register sender@example.com"]);

        let calls = f.backend.calls.lock();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].0, "me@example.com");
        assert_eq!(calls[0].1.path(), "/api/1/register");
    }

    #[tokio::test]
    async fn test_registration_id_and_name_are_encoded() {
        let prefs = Preferences {
            registration_id: Some("a b&c".into()),
            ..registered_prefs()
        };
        let f = fixture(prefs, Reply::Status(200), true);

        run(&f, RegistrationAction::Registered).await;

        let calls = f.backend.calls.lock();
        assert_eq!(
            calls[0].1.query(),
            Some("regid=a+b%26c&name=Unknown+Device")
        );
    }

    #[tokio::test]
    async fn test_refused_registration() {
        let mut f = fixture(registered_prefs(), Reply::Status(503), true);

        run(&f, RegistrationAction::Registered).await;

        assert_eq!(
            drain(&mut f.events),
            vec![(
                ConnectionState::Disconnected,
                Some(ErrorCode::DeviceRegistrationError)
            )]
        );
        assert!(!f.prefs.is_online());
    }

    #[tokio::test]
    async fn test_registration_error_mapping() {
        let cases = [
            (Reply::AuthPending, ErrorCode::AuthPending),
            (Reply::AuthFailed, ErrorCode::AuthFailed),
            (Reply::Network, ErrorCode::NetworkError),
            (Reply::Other, ErrorCode::DeviceRegistrationError),
        ];
        for (reply, expected) in cases {
            let mut f = fixture(registered_prefs(), reply, true);
            run(&f, RegistrationAction::Registered).await;
            assert_eq!(
                drain(&mut f.events),
                vec![(ConnectionState::Disconnected, Some(expected))]
            );
        }
    }

    #[tokio::test]
    async fn test_no_account_is_auth_failure() {
        let prefs = Preferences {
            account: None,
            ..registered_prefs()
        };
        let mut f = fixture(prefs, Reply::Status(200), true);

        run(&f, RegistrationAction::Registered).await;

        assert_eq!(
            drain(&mut f.events),
            vec![(ConnectionState::Disconnected, Some(ErrorCode::AuthFailed))]
        );
        assert!(f.backend.calls.lock().is_empty());
    }

    #[tokio::test]
    async fn test_push_unavailable_on_connect() {
        let mut f = fixture(registered_prefs(), Reply::Status(200), false);

        run(&f, RegistrationAction::Connect).await;

        assert_eq!(
            drain(&mut f.events),
            vec![
                (ConnectionState::Connecting, None),
                (
                    ConnectionState::Disconnected,
                    Some(ErrorCode::PhoneRegistrationError)
                ),
            ]
        );
    }

    #[tokio::test]
    async fn test_push_unavailable_on_disconnect_stays_connected() {
        let prefs = Preferences {
            online: true,
            ..registered_prefs()
        };
        let mut f = fixture(prefs, Reply::Status(200), false);

        run(&f, RegistrationAction::Disconnect).await;

        assert_eq!(
            drain(&mut f.events),
            vec![
                (ConnectionState::Disconnecting, None),
                (
                    ConnectionState::Connected,
                    Some(ErrorCode::PhoneRegistrationError)
                ),
            ]
        );
        assert!(f.prefs.is_online());
    }

    #[tokio::test]
    async fn test_unregistered_clears_account() {
        let prefs = Preferences {
            online: true,
            ..registered_prefs()
        };
        let mut f = fixture(prefs, Reply::Status(200), true);

        run(&f, RegistrationAction::Disconnect).await;
        run(&f, RegistrationAction::Unregistered).await;

        assert_eq!(
            drain(&mut f.events),
            vec![
                (ConnectionState::Disconnecting, None),
                (ConnectionState::Disconnected, None),
            ]
        );
        let snapshot = f.prefs.snapshot();
        assert_eq!(snapshot.account, None);
        assert!(!snapshot.online);
        assert_eq!(
            f.backend.calls.lock()[0].1.as_str(),
            "https://registry.example.com/api/1/unregister?regid=reg-1"
        );
    }

    #[tokio::test]
    async fn test_failed_unregistration_keeps_connected() {
        let prefs = Preferences {
            online: true,
            ..registered_prefs()
        };
        let mut f = fixture(prefs, Reply::Status(500), true);

        run(&f, RegistrationAction::Unregistered).await;

        assert_eq!(
            drain(&mut f.events),
            vec![(
                ConnectionState::Connected,
                Some(ErrorCode::DeviceUnregistrationError)
            )]
        );
        assert_eq!(f.prefs.account().as_deref(), Some("me@example.com"));
        assert!(f.prefs.is_online());
    }

    #[tokio::test]
    async fn test_push_error_reports_persisted_state() {
        let prefs = Preferences {
            online: true,
            ..registered_prefs()
        };
        let mut f = fixture(prefs, Reply::Status(200), true);

        f.handler.on_push_error("SERVICE_NOT_AVAILABLE");

        assert_eq!(
            drain(&mut f.events),
            vec![(
                ConnectionState::Connected,
                Some(ErrorCode::ServiceNotAvailable)
            )]
        );
        assert_eq!(*f.ui.0.lock(), vec!["stop true"]);
    }

    #[tokio::test]
    async fn test_foreground_and_notices() {
        let f = fixture(registered_prefs(), Reply::Status(200), true);

        run(&f, RegistrationAction::Connect).await;
        run(&f, RegistrationAction::Registered).await;

        assert_eq!(
            *f.ui.0.lock(),
            vec![
                "clear",
                "start Updating device",
                "stop false",
                "clear",
                "start Updating device",
                "post DeviceOnline",
                "stop true",
            ]
        );
    }

    #[tokio::test]
    async fn test_runs_on_registration_service() {
        let Fixture {
            handler,
            prefs,
            mut events,
            ..
        } = fixture(registered_prefs(), Reply::Status(200), true);
        let service = ActionService::new(
            ExecutorConfig::new("registration", 2, Duration::from_secs(5)),
            Arc::new(handler),
            Arc::new(CountingWakeLock::new()),
            Arc::new(Reporter::new()),
        );

        service.submit(RegistrationAction::Connect).unwrap();
        service.submit(RegistrationAction::Registered).unwrap();

        let mut states = Vec::new();
        while states.len() < 2 {
            let event = timeout(Duration::from_secs(5), events.recv())
                .await
                .unwrap()
                .unwrap();
            states.push(event.state);
        }
        assert_eq!(states, vec![ConnectionState::Connecting, ConnectionState::Connected]);
        assert!(prefs.is_online());
        service.shutdown().await;
    }
}
