//! Capability surface of the remote-display protocol implementation
//!
//! The wire format belongs to the protocol library. The session controller
//! only relies on what is declared here: a client bound to a [`Tunnel`],
//! its event channel, input primitives, stream creation and the display.

use tokio::sync::mpsc;

use crate::display::SurfaceHandle;
use crate::error::ProtocolResult;
use crate::input::{Keysym, MouseState};
use crate::protocol::stream::{InboundStream, OutputStream};
use crate::session::ConnectionState;
use crate::tunnel::Tunnel;

/// Error status reported by the remote end
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProtocolStatus {
    /// Protocol status code
    pub code: u16,
    /// Human readable message, if the remote supplied one
    pub message: Option<String>,
}

impl ProtocolStatus {
    /// Creates a status with a message
    pub fn new(code: u16, message: impl Into<String>) -> Self {
        Self {
            code,
            message: Some(message.into()),
        }
    }
}

/// Events delivered by a protocol client
#[derive(Debug)]
pub enum ProtocolEvent {
    /// The client changed state
    StateChanged(ConnectionState),
    /// The remote end or the client reported an error
    Error(ProtocolStatus),
    /// The remote end opened a clipboard stream
    Clipboard {
        /// Payload mimetype
        mimetype: String,
        /// Payload chunks
        stream: InboundStream,
    },
    /// The audio input stream was closed by the remote end
    AudioInputClosed,
}

/// The rendered remote screen
pub trait RemoteDisplay: Send {
    /// Returns the mountable surface
    fn element(&self) -> SurfaceHandle;

    /// Returns the current render scale factor
    fn scale(&self) -> f64;
}

/// A remote-display protocol client
pub trait ProtocolClient: Send {
    /// Starts the connection, `handshake` being the urlencoded parameters
    fn connect(&mut self, handshake: &str) -> ProtocolResult<()>;

    /// Tears the connection down
    fn disconnect(&mut self);

    /// Sends the full pointer state
    fn send_mouse_state(&mut self, state: MouseState);

    /// Sends a key press or release
    fn send_key_event(&mut self, pressed: bool, keysym: Keysym);

    /// Requests a new remote display size
    fn send_size(&mut self, width: u32, height: u32);

    /// Opens an outbound clipboard stream
    fn create_clipboard_stream(&mut self, mimetype: &str) -> Box<dyn OutputStream>;

    /// Opens an outbound audio stream
    fn create_audio_stream(&mut self, mimetype: &str) -> Box<dyn OutputStream>;

    /// Returns the display rendering the remote screen
    fn display(&self) -> &dyn RemoteDisplay;
}

/// A freshly built client together with its event channel
///
/// The channel exists before `connect` is called, so no event can be lost.
pub struct ProtocolBinding {
    /// The client
    pub client: Box<dyn ProtocolClient>,
    /// Events emitted by the client
    pub events: mpsc::UnboundedReceiver<ProtocolEvent>,
}

impl ProtocolBinding {
    /// Pairs a client with its event receiver
    pub fn new(
        client: Box<dyn ProtocolClient>,
        events: mpsc::UnboundedReceiver<ProtocolEvent>,
    ) -> Self {
        Self { client, events }
    }
}

/// Builds a protocol client bound to a tunnel
///
/// Called once per connection attempt; clients are never reused.
pub trait ProtocolFactory: Send {
    /// Builds a client that will drive `tunnel`
    fn build(&self, tunnel: Tunnel) -> ProtocolBinding;
}
