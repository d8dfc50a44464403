//! Session data and the status exposed to the presentation layer

use std::fmt;
use std::time::Duration;

use crate::config::Config;
use crate::session::policy::ReconnectPolicy;
use crate::session::state::ConnectionState;
use crate::tunnel::GatewayEndpoint;

/// Resolved settings for one session
#[derive(Clone)]
pub struct SessionSettings {
    /// Connection token, part of the tunnel path
    pub token: String,
    /// Display name of the remote endpoint
    pub endpoint_name: Option<String>,
    /// Gateway serving the tunnel
    pub gateway: GatewayEndpoint,
    /// Reconnect policy
    pub reconnect: ReconnectPolicy,
    /// Tunnel idle receive timeout
    pub receive_timeout: Duration,
    /// Synchronize the clipboard
    pub clipboard_enabled: bool,
    /// Local clipboard poll period
    pub clipboard_poll_interval: Duration,
    /// Forward local audio input
    pub audio_input_enabled: bool,
    /// Title suffix
    pub brand_title: String,
}

impl SessionSettings {
    /// Resolves the settings for `token` from the loaded configuration
    pub fn from_config(
        config: &Config,
        token: impl Into<String>,
        endpoint_name: Option<String>,
    ) -> Self {
        Self {
            token: token.into(),
            endpoint_name,
            gateway: GatewayEndpoint::new(config.gateway.host.clone(), config.gateway.secure),
            reconnect: ReconnectPolicy::from_config(&config.reconnect),
            receive_timeout: Duration::from_secs(config.tunnel.receive_timeout_secs),
            clipboard_enabled: config.clipboard.enabled,
            clipboard_poll_interval: Duration::from_millis(config.clipboard.poll_interval_ms),
            audio_input_enabled: config.audio.input_enabled,
            brand_title: config.ui.brand_title.clone(),
        }
    }
}

impl fmt::Debug for SessionSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionSettings")
            .field("token", &"<redacted>")
            .field("endpoint_name", &self.endpoint_name)
            .field("gateway", &self.gateway)
            .field("reconnect", &self.reconnect)
            .field("receive_timeout", &self.receive_timeout)
            .field("clipboard_enabled", &self.clipboard_enabled)
            .field("clipboard_poll_interval", &self.clipboard_poll_interval)
            .field("audio_input_enabled", &self.audio_input_enabled)
            .field("brand_title", &self.brand_title)
            .finish()
    }
}

/// A remote access session
///
/// Owned by the session controller and only mutated from its event loop.
#[derive(Clone, PartialEq, Eq)]
pub struct Session {
    /// Connection token
    pub token: String,
    /// Display name of the remote endpoint
    pub endpoint_name: Option<String>,
    /// Current connection state, `None` when undetermined
    pub connection_state: Option<ConnectionState>,
    /// Failures since the last successful connection
    pub connection_attempt: u32,
    /// Set on the first successful connection, or when the initial budget
    /// is exhausted
    pub has_connected_once: bool,
    /// Last error message reported by the remote end
    pub last_error_message: Option<String>,
    /// Pending reconnect or failure message
    pub status_message: Option<String>,
}

impl Session {
    /// Creates an idle session
    pub fn new(token: impl Into<String>, endpoint_name: Option<String>) -> Self {
        Self {
            token: token.into(),
            endpoint_name,
            connection_state: Some(ConnectionState::Idle),
            connection_attempt: 0,
            has_connected_once: false,
            last_error_message: None,
            status_message: None,
        }
    }

    /// Returns the window title
    pub fn title(&self, brand_title: &str) -> String {
        match &self.endpoint_name {
            Some(name) if !name.is_empty() => format!("{} - {}", name, brand_title),
            _ => brand_title.to_string(),
        }
    }

    /// Returns the status overlay, `None` when the display is live
    pub fn overlay(&self) -> Option<Overlay> {
        let detail = self.last_error_message.clone();

        match self.connection_state {
            Some(ConnectionState::Connected) => None,
            None => self.status_message.as_ref().map(|message| Overlay {
                message: message.clone(),
                detail,
                loading: true,
            }),
            Some(ConnectionState::Failed) => Some(Overlay {
                message: self
                    .status_message
                    .clone()
                    .unwrap_or_else(|| ConnectionState::Failed.label().to_string()),
                detail,
                loading: false,
            }),
            Some(state) => {
                let message = match &self.status_message {
                    Some(message) if self.has_connected_once => message.clone(),
                    _ => state.label().to_string(),
                };
                Some(Overlay {
                    message,
                    detail,
                    loading: state.is_loading(),
                })
            }
        }
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("token", &"<redacted>")
            .field("endpoint_name", &self.endpoint_name)
            .field("connection_state", &self.connection_state)
            .field("connection_attempt", &self.connection_attempt)
            .field("has_connected_once", &self.has_connected_once)
            .field("last_error_message", &self.last_error_message)
            .field("status_message", &self.status_message)
            .finish()
    }
}

/// Overlay covering the display surface while it is not live
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Overlay {
    /// Headline
    pub message: String,
    /// Secondary line, the remote error if any
    pub detail: Option<String>,
    /// Show a progress indicator
    pub loading: bool,
}

/// Snapshot of a session published after every handled event
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionStatus {
    /// Connection state, `None` when undetermined
    pub state: Option<ConnectionState>,
    /// Failures since the last successful connection
    pub connection_attempt: u32,
    /// See [`Session::has_connected_once`]
    pub has_connected_once: bool,
    /// Window title
    pub title: String,
    /// Status overlay
    pub overlay: Option<Overlay>,
}

impl SessionStatus {
    /// Derives the status of `session`
    pub fn from_session(session: &Session, brand_title: &str) -> Self {
        Self {
            state: session.connection_state,
            connection_attempt: session.connection_attempt,
            has_connected_once: session.has_connected_once,
            title: session.title(brand_title),
            overlay: session.overlay(),
        }
    }

    /// Returns the overlay message, if any
    pub fn message(&self) -> Option<&str> {
        self.overlay.as_ref().map(|overlay| overlay.message.as_str())
    }
}
