//! Tunnel transport
//!
//! Owns the single bidirectional connection to the gateway and the
//! addressing/handshake rules used to open it.

pub mod endpoint;
pub mod websocket;

pub use endpoint::{GatewayEndpoint, HandshakeParams, SCREEN_DPI};
pub use websocket::{Tunnel, TunnelStatus, DEFAULT_RECEIVE_TIMEOUT, TUNNEL_SUBPROTOCOL};
