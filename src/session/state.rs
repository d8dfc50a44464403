//! Connection state machine
//!
//! Tracks the connection state of a session and validates transitions. The
//! state may also be undetermined (`None`) while a reconnect is pending, in
//! which case no surface is rendered and only the overlay message shows.

use std::fmt;

use crate::error::SessionError;

/// Possible states of a remote access connection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConnectionState {
    /// Created, no connection started
    Idle,
    /// Tunnel and protocol handshake in progress
    Connecting,
    /// Handshake done, waiting for the remote desktop
    Waiting,
    /// Remote display is live
    Connected,
    /// Disconnection in progress
    Disconnecting,
    /// Connection ended
    Disconnected,
    /// Reconnect budget exhausted, no further retries
    Failed,
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConnectionState::Idle => write!(f, "Idle"),
            ConnectionState::Connecting => write!(f, "Connecting"),
            ConnectionState::Waiting => write!(f, "Waiting"),
            ConnectionState::Connected => write!(f, "Connected"),
            ConnectionState::Disconnecting => write!(f, "Disconnecting"),
            ConnectionState::Disconnected => write!(f, "Disconnected"),
            ConnectionState::Failed => write!(f, "Failed"),
        }
    }
}

impl ConnectionState {
    /// Returns the label shown in the status overlay
    pub fn label(&self) -> &'static str {
        match self {
            ConnectionState::Idle => "Idle",
            ConnectionState::Connecting => "Connecting",
            ConnectionState::Waiting => "Connecting...",
            ConnectionState::Connected => "Connected",
            ConnectionState::Disconnecting => "Disconnecting",
            ConnectionState::Disconnected => "Disconnected",
            ConnectionState::Failed => "Failed",
        }
    }

    /// Returns true while a connection is being set up or torn down
    pub fn is_loading(&self) -> bool {
        matches!(
            self,
            ConnectionState::Connecting | ConnectionState::Waiting | ConnectionState::Disconnecting
        )
    }

    /// Returns true if no further transition is possible
    pub fn is_terminal(&self) -> bool {
        matches!(self, ConnectionState::Disconnected | ConnectionState::Failed)
    }

    /// Returns valid transitions from this state
    pub fn valid_transitions(&self) -> &'static [ConnectionState] {
        match self {
            ConnectionState::Idle => &[
                ConnectionState::Connecting,
                ConnectionState::Disconnecting,
                ConnectionState::Disconnected,
            ],
            ConnectionState::Connecting => &[
                ConnectionState::Waiting,
                ConnectionState::Connected,
                ConnectionState::Disconnecting,
                ConnectionState::Disconnected,
            ],
            ConnectionState::Waiting => &[
                ConnectionState::Connected,
                ConnectionState::Disconnecting,
                ConnectionState::Disconnected,
            ],
            ConnectionState::Connected => &[
                ConnectionState::Disconnecting,
                ConnectionState::Disconnected,
            ],
            ConnectionState::Disconnecting => &[ConnectionState::Disconnected],
            ConnectionState::Disconnected => &[],
            ConnectionState::Failed => &[],
        }
    }
}

/// Valid transitions out of the undetermined state
const FROM_UNDETERMINED: &[ConnectionState] = &[
    ConnectionState::Connecting,
    ConnectionState::Failed,
    ConnectionState::Disconnecting,
    ConnectionState::Disconnected,
];

fn describe(state: Option<ConnectionState>) -> String {
    match state {
        Some(state) => state.to_string(),
        None => "undetermined".to_string(),
    }
}

/// State machine for a session's connection
#[derive(Debug)]
pub struct SessionStateMachine {
    current: Option<ConnectionState>,
}

impl Default for SessionStateMachine {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionStateMachine {
    /// Creates a new state machine in Idle state
    pub fn new() -> Self {
        Self {
            current: Some(ConnectionState::Idle),
        }
    }

    /// Returns the current state, `None` when undetermined
    pub fn current(&self) -> Option<ConnectionState> {
        self.current
    }

    /// Returns true if the transition is valid
    pub fn can_transition(&self, to: ConnectionState) -> bool {
        match self.current {
            Some(state) => state.valid_transitions().contains(&to),
            None => FROM_UNDETERMINED.contains(&to),
        }
    }

    /// Attempts to transition to a new state
    pub fn transition(&mut self, to: ConnectionState) -> Result<(), SessionError> {
        if !self.can_transition(to) {
            return Err(SessionError::InvalidStateTransition {
                from: describe(self.current),
                to: to.to_string(),
            });
        }

        self.current = Some(to);
        Ok(())
    }

    /// Clears the state to undetermined ahead of a reconnect
    ///
    /// Allowed from every state except Failed.
    pub fn clear(&mut self) -> Result<(), SessionError> {
        if self.current == Some(ConnectionState::Failed) {
            return Err(SessionError::InvalidStateTransition {
                from: describe(self.current),
                to: describe(None),
            });
        }

        self.current = None;
        Ok(())
    }

    /// Force transition to a state (bypasses validation)
    ///
    /// Only used on session teardown.
    pub fn force_transition(&mut self, to: ConnectionState) {
        self.current = Some(to);
    }

    /// Returns true if the remote display is live
    pub fn is_connected(&self) -> bool {
        self.current == Some(ConnectionState::Connected)
    }

    /// Returns true once Failed was reached
    pub fn is_failed(&self) -> bool {
        self.current == Some(ConnectionState::Failed)
    }

    /// Returns true if the session has reached a terminal state
    pub fn is_terminated(&self) -> bool {
        self.current.is_some_and(|state| state.is_terminal())
    }
}
