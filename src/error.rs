//! Error types for the RAC console
//!
//! This module defines all error types used throughout the crate, one enum
//! per concern, aggregated by [`RacError`].

use std::io;
use std::time::Duration;
use thiserror::Error;

/// Main error type for the RAC console
#[derive(Error, Debug)]
pub enum RacError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Tunnel (transport) errors
    #[error("Tunnel error: {0}")]
    Tunnel(#[from] TunnelError),

    /// Remote-display protocol errors
    #[error("Protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    /// Local clipboard errors
    #[error("Clipboard error: {0}")]
    Clipboard(#[from] ClipboardError),

    /// Session lifecycle errors
    #[error("Session error: {0}")]
    Session(#[from] SessionError),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Generic error with context
    #[error("{0}")]
    Generic(String),
}

/// Configuration-related errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to load configuration: {0}")]
    LoadFailed(String),

    #[error("Failed to save configuration: {0}")]
    SaveFailed(String),

    #[error("Invalid configuration value: {0}")]
    InvalidValue(String),

    #[error("Configuration directory not found: {0}")]
    DirectoryNotFound(String),

    #[error("Failed to create configuration directory: {0}")]
    DirectoryCreationFailed(String),
}

/// Tunnel-level errors
///
/// Every variant reaching the session controller is a transport failure and
/// is routed into the reconnect path.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TunnelError {
    #[error("Invalid gateway endpoint: {0}")]
    InvalidEndpoint(String),

    #[error("Failed to connect tunnel: {0}")]
    ConnectFailed(String),

    #[error("No data received for {0:?}")]
    Timeout(Duration),

    #[error("WebSocket error: {0}")]
    WebSocket(String),

    #[error("Gateway closed the tunnel with code {code}: {reason}")]
    Closed { code: u16, reason: String },

    #[error("Tunnel is already connected")]
    AlreadyConnected,

    #[error("Tunnel is not connected")]
    NotConnected,
}

/// Errors raised by the remote-display protocol adapter
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProtocolError {
    #[error("Stream already closed")]
    StreamClosed,

    #[error("Stream ended before its payload was complete")]
    StreamAborted,

    #[error("Failed to send: {0}")]
    SendFailed(String),
}

/// Local clipboard errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ClipboardError {
    /// The clipboard is temporarily unavailable (no focus, held by another
    /// application). Expected; retried on the next poll.
    #[error("Clipboard access denied: {0}")]
    AccessDenied(String),

    #[error("Clipboard failure: {0}")]
    Unexpected(String),

    #[error("Unsupported clipboard mimetype: {0}")]
    UnsupportedMimetype(String),

    #[error("Remote clipboard stream failed: {0}")]
    Stream(#[from] ProtocolError),
}

/// Session lifecycle errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SessionError {
    #[error("Invalid state transition from {from} to {to}")]
    InvalidStateTransition { from: String, to: String },

    #[error("Transport failure: {0}")]
    Transport(#[from] TunnelError),

    #[error("Protocol failure ({code}): {message}")]
    Protocol { code: u16, message: String },

    #[error("Protocol client failure: {0}")]
    Client(#[from] ProtocolError),

    #[error("Connection failed after {attempts} attempts.")]
    ReconnectExhausted { attempts: u32 },

    #[error("Session is no longer running")]
    ChannelClosed,
}

/// Type alias for Results using RacError
pub type Result<T> = std::result::Result<T, RacError>;

/// Type alias for Config Results
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// Type alias for Tunnel Results
pub type TunnelResult<T> = std::result::Result<T, TunnelError>;

/// Type alias for Protocol Results
pub type ProtocolResult<T> = std::result::Result<T, ProtocolError>;

/// Type alias for Clipboard Results
pub type ClipboardResult<T> = std::result::Result<T, ClipboardError>;

/// Type alias for Session Results
pub type SessionResult<T> = std::result::Result<T, SessionError>;

impl From<toml::de::Error> for RacError {
    fn from(err: toml::de::Error) -> Self {
        RacError::Config(ConfigError::LoadFailed(err.to_string()))
    }
}

impl From<toml::ser::Error> for RacError {
    fn from(err: toml::ser::Error) -> Self {
        RacError::Config(ConfigError::SaveFailed(err.to_string()))
    }
}

impl From<url::ParseError> for TunnelError {
    fn from(err: url::ParseError) -> Self {
        TunnelError::InvalidEndpoint(err.to_string())
    }
}

impl From<tokio_tungstenite::tungstenite::Error> for TunnelError {
    fn from(err: tokio_tungstenite::tungstenite::Error) -> Self {
        TunnelError::WebSocket(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reconnect_exhausted_message() {
        let error = SessionError::ReconnectExhausted { attempts: 5 };
        assert_eq!(error.to_string(), "Connection failed after 5 attempts.");
    }

    #[test]
    fn test_error_conversion() {
        let io_error = io::Error::new(io::ErrorKind::NotFound, "file not found");
        let rac_error: RacError = io_error.into();
        assert!(matches!(rac_error, RacError::Io(_)));

        let session_error: SessionError = TunnelError::Timeout(Duration::from_secs(10)).into();
        assert!(matches!(
            session_error,
            SessionError::Transport(TunnelError::Timeout(_))
        ));
    }

    #[test]
    fn test_url_error_maps_to_invalid_endpoint() {
        let err = url::Url::parse("not a url").unwrap_err();
        let tunnel_error: TunnelError = err.into();
        assert!(matches!(tunnel_error, TunnelError::InvalidEndpoint(_)));
    }
}
