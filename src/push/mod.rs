//! Push message routing
//!
//! Messages from the push transport are turned into executor submissions:
//! commands go to the command executor, registration callbacks to the
//! registration executor. Push errors bypass the queue.

mod registrar;

pub use registrar::{PushRegistrar, SimulatedPush};

use crate::command::CommandHandler;
use crate::executor::{ActionService, SubmitError};
use crate::prefs::PreferenceStore;
use crate::registration::{RegistrationAction, RegistrationHandler};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

/// Message delivered by the push transport
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PushMessage {
    /// Raw command text sent to this device
    Command(String),
    /// Registration succeeded with this id
    Registered(String),
    Unregistered,
    /// Registration failed with this error id
    Error(String),
}

pub struct PushRouter {
    commands: Arc<ActionService<CommandHandler>>,
    registration: Arc<ActionService<RegistrationHandler>>,
    prefs: Arc<dyn PreferenceStore>,
}

impl PushRouter {
    pub fn new(
        commands: Arc<ActionService<CommandHandler>>,
        registration: Arc<ActionService<RegistrationHandler>>,
        prefs: Arc<dyn PreferenceStore>,
    ) -> Self {
        Self {
            commands,
            registration,
            prefs,
        }
    }

    /// Hand one push message to the executor that owns it
    pub fn route(&self, message: PushMessage) -> Result<(), SubmitError> {
        debug!("[PUSH] Received {:?}", message);
        match message {
            PushMessage::Command(raw) => {
                let result = self.commands.submit(raw);
                if let Err(SubmitError::QueueFull) = result {
                    warn!("[PUSH] Command queue is full");
                }
                result
            }
            PushMessage::Registered(reg_id) => {
                // The registration action reads the id back from the store
                if let Err(e) = self.prefs.set_registration_id(Some(reg_id)) {
                    error!("[PUSH] Failed to store registration id: {}", e);
                }
                self.submit_registration(RegistrationAction::Registered)
            }
            PushMessage::Unregistered => self.submit_registration(RegistrationAction::Unregistered),
            PushMessage::Error(code) => {
                self.registration.handler().on_push_error(&code);
                Ok(())
            }
        }
    }

    /// User asked to go online
    pub fn connect(&self) -> Result<(), SubmitError> {
        self.submit_registration(RegistrationAction::Connect)
    }

    /// User asked to go offline
    pub fn disconnect(&self) -> Result<(), SubmitError> {
        self.submit_registration(RegistrationAction::Disconnect)
    }

    /// Stop the command currently running
    pub fn cancel_command(&self) -> bool {
        self.commands.request_cancel()
    }

    /// Route messages until the transport side closes
    pub async fn run(self: Arc<Self>, mut messages: mpsc::UnboundedReceiver<PushMessage>) {
        while let Some(message) = messages.recv().await {
            if let Err(e) = self.route(message) {
                warn!("[PUSH] Message dropped: {}", e);
            }
        }
        info!("[PUSH] Push transport closed");
    }

    fn submit_registration(&self, action: RegistrationAction) -> Result<(), SubmitError> {
        let result = self.registration.submit(action);
        if let Err(e) = &result {
            warn!("[PUSH] Registration {} rejected: {}", action, e);
        }
        result
    }
}
