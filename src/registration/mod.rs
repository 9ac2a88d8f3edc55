//! Device registration with the backend
//!
//! This module handles:
//! - Connect/disconnect requests against the push transport
//! - Registering and unregistering the push id with the backend
//! - Mapping every outcome to a connection state and error code
//! - Keeping the foreground indicator up while an action runs

mod backend;
mod handler;
mod notify;

pub use backend::{
    register_url, unregister_url, Authenticator, BackendError, DeviceBackend, HttpBackend,
    StaticTokenAuthenticator,
};
pub use handler::{RegistrationAction, RegistrationContext, RegistrationHandler};
pub use notify::{ForegroundGuard, ForegroundIndicator, LogNotifier, Notice, Notifier};
