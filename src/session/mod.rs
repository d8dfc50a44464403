//! Remote access session module
//!
//! This module owns the connection lifecycle: the state machine, the
//! reconnect policy, status exposure and the controller event loop that
//! wires the tunnel, protocol client, clipboard, input and display together.

pub mod controller;
pub mod policy;
pub mod state;
pub mod types;

pub use controller::{SessionCommand, SessionController, SessionHandle};
pub use policy::{retry_message, ReconnectDecision, ReconnectPolicy};
pub use state::{ConnectionState, SessionStateMachine};
pub use types::{Overlay, Session, SessionSettings, SessionStatus};
