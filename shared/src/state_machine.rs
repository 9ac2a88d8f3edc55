//! Connection State Machine
//!
//! Coarse connection states shown to the user and the transitions between
//! them.

use crate::{ErrorCode, StatusEvent};

/// Coarse connection state of the device with the backend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ConnectionState {
    #[default]
    Disconnected,
    Connecting,
    Connected,
    Disconnecting,
}

impl ConnectionState {
    /// Settled states are persisted as the "online" flag
    pub fn is_settled(self) -> bool {
        matches!(self, ConnectionState::Connected | ConnectionState::Disconnected)
    }

    /// Online flag implied by a settled state
    pub fn online(self) -> Option<bool> {
        match self {
            ConnectionState::Connected => Some(true),
            ConnectionState::Disconnected => Some(false),
            _ => None,
        }
    }
}

/// Check if a transition from one state to another is expected
pub fn is_valid_transition(from: ConnectionState, to: ConnectionState) -> bool {
    use ConnectionState::*;

    match (from, to) {
        // Same state is always valid
        (a, b) if a == b => true,

        // Settled states can be reached from anywhere: push callbacks and
        // push errors arrive without a matching request
        (_, Connected | Disconnected) => true,

        (Disconnected, Connecting) => true,
        (Connected, Disconnecting) => true,

        _ => false,
    }
}

/// Tracks the last state broadcast to the UI
#[derive(Debug, Default)]
pub struct ConnectionTracker {
    current_state: ConnectionState,
    last_error: Option<ErrorCode>,
}

impl ConnectionTracker {
    /// Start from a persisted online flag
    pub fn new(online: bool) -> Self {
        Self {
            current_state: if online {
                ConnectionState::Connected
            } else {
                ConnectionState::Disconnected
            },
            last_error: None,
        }
    }

    /// Get current state
    pub fn state(&self) -> ConnectionState {
        self.current_state
    }

    /// Error attached to the last applied event
    pub fn last_error(&self) -> Option<&ErrorCode> {
        self.last_error.as_ref()
    }

    /// Apply an event; returns false when the transition was unexpected.
    /// The event is applied either way, the UI must reflect it.
    pub fn apply(&mut self, event: &StatusEvent) -> bool {
        let valid = is_valid_transition(self.current_state, event.state);
        self.current_state = event.state;
        self.last_error = event.error.clone();
        valid
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_initial_state() {
        assert_eq!(ConnectionTracker::default().state(), ConnectionState::Disconnected);
        assert_eq!(ConnectionTracker::new(true).state(), ConnectionState::Connected);
    }

    #[test]
    fn test_connect_flow() {
        let mut tracker = ConnectionTracker::new(false);
        assert!(tracker.apply(&StatusEvent::new(ConnectionState::Connecting, None)));
        assert!(tracker.apply(&StatusEvent::new(ConnectionState::Connected, None)));
        assert_eq!(tracker.state(), ConnectionState::Connected);
        assert!(tracker.last_error().is_none());
    }

    #[test]
    fn test_failed_connect_keeps_error() {
        let mut tracker = ConnectionTracker::new(false);
        tracker.apply(&StatusEvent::new(ConnectionState::Connecting, None));
        tracker.apply(&StatusEvent::new(
            ConnectionState::Disconnected,
            Some(ErrorCode::DeviceRegistrationError),
        ));
        assert_eq!(tracker.state(), ConnectionState::Disconnected);
        assert_eq!(tracker.last_error(), Some(&ErrorCode::DeviceRegistrationError));
    }

    #[test]
    fn test_unexpected_transition_is_flagged() {
        let mut tracker = ConnectionTracker::new(true);
        assert!(!tracker.apply(&StatusEvent::new(ConnectionState::Connecting, None)));
        // Still applied
        assert_eq!(tracker.state(), ConnectionState::Connecting);
    }

    #[test]
    fn test_settled_states() {
        assert_eq!(ConnectionState::Connected.online(), Some(true));
        assert_eq!(ConnectionState::Disconnected.online(), Some(false));
        assert_eq!(ConnectionState::Connecting.online(), None);
        assert!(!ConnectionState::Disconnecting.is_settled());
        assert!(!is_valid_transition(
            ConnectionState::Disconnected,
            ConnectionState::Disconnecting
        ));
    }
}
