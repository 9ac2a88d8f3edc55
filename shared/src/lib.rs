//! Remote Agent Shared Types
//!
//! This crate provides the command grammar and status types exchanged between
//! the device agent, its attached UI, and whatever pushes commands to it.

pub mod command;
pub mod state_machine;

use std::fmt;
use std::time::{SystemTime, UNIX_EPOCH};

pub use command::{Command, CommandParseError};
pub use state_machine::{is_valid_transition, ConnectionState, ConnectionTracker};

/// Get current timestamp in milliseconds since Unix epoch
pub fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}

/// Timing and sizing parameters for the executors
pub mod timing {
    /// Idle wait before the command executor stops itself
    pub const COMMAND_IDLE_TIMEOUT_MS: u64 = 60_000;

    /// Pending commands accepted while one is running
    pub const COMMAND_QUEUE_CAPACITY: usize = 8;

    /// Idle wait before the registration executor stops itself
    pub const REGISTRATION_IDLE_TIMEOUT_MS: u64 = 30_000;

    /// Pending registration actions accepted while one is running
    pub const REGISTRATION_QUEUE_CAPACITY: usize = 2;

    /// How long a vibrate command keeps the vibrator running
    pub const VIBRATE_DURATION_MS: u64 = 10_000;

    /// Vibration pattern: initial delay, on, off (milliseconds)
    pub const VIBRATE_PATTERN_MS: [u64; 3] = [0, 500, 300];

    /// Index in the pattern where repetition restarts
    pub const VIBRATE_REPEAT_INDEX: usize = 1;
}

/// Externally visible error codes attached to a status event
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    /// Push service is not reachable from this device
    ServiceNotAvailable,
    /// Push registration could not be started on this device
    PhoneRegistrationError,
    /// Backend could not be reached
    NetworkError,
    /// No account configured or the account was refused
    AuthFailed,
    /// The user still has to grant the authentication token
    AuthPending,
    /// Backend refused the registration
    DeviceRegistrationError,
    /// Backend refused the unregistration
    DeviceUnregistrationError,
    /// Any other error id reported by the push transport
    Other(String),
}

impl ErrorCode {
    /// Wire name of this error code
    pub fn as_str(&self) -> &str {
        match self {
            ErrorCode::ServiceNotAvailable => "SERVICE_NOT_AVAILABLE",
            ErrorCode::PhoneRegistrationError => "PHONE_REGISTRATION_ERROR",
            ErrorCode::NetworkError => "NETWORK_ERROR",
            ErrorCode::AuthFailed => "AUTH_FAILED",
            ErrorCode::AuthPending => "AUTH_PENDING",
            ErrorCode::DeviceRegistrationError => "DEVICE_REGISTRATION_ERROR",
            ErrorCode::DeviceUnregistrationError => "DEVICE_UNREGISTRATION_ERROR",
            ErrorCode::Other(code) => code,
        }
    }

    /// Map a wire name back to a code; unknown names are kept verbatim
    pub fn from_wire(code: &str) -> Self {
        match code {
            "SERVICE_NOT_AVAILABLE" => ErrorCode::ServiceNotAvailable,
            "PHONE_REGISTRATION_ERROR" => ErrorCode::PhoneRegistrationError,
            "NETWORK_ERROR" => ErrorCode::NetworkError,
            "AUTH_FAILED" => ErrorCode::AuthFailed,
            "AUTH_PENDING" => ErrorCode::AuthPending,
            "DEVICE_REGISTRATION_ERROR" => ErrorCode::DeviceRegistrationError,
            "DEVICE_UNREGISTRATION_ERROR" => ErrorCode::DeviceUnregistrationError,
            other => ErrorCode::Other(other.to_string()),
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Connection state change broadcast to the attached UI
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusEvent {
    pub state: ConnectionState,
    pub error: Option<ErrorCode>,
    pub timestamp_ms: u64,
}

impl StatusEvent {
    /// Create a status event stamped with the current time
    pub fn new(state: ConnectionState, error: Option<ErrorCode>) -> Self {
        Self {
            state,
            error,
            timestamp_ms: now_ms(),
        }
    }
}

/// Failure of one action, delivered to the attached UI
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailureReport {
    /// Identifier of the failed action
    pub action: String,
    /// Human-readable summary
    pub message: String,
}

impl FailureReport {
    pub fn new(action: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            action: action.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for FailureReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.action, self.message)
    }
}
