//! Input module
//!
//! Mouse and keyboard capture normalization and forwarding:
//! - Local input event types and protocol keysyms
//! - Pointer scaling under non-1.0 display zoom
//! - Button state tracking and focus handoff

pub mod bridge;
pub mod types;

pub use bridge::InputBridge;
pub use types::{ButtonMask, InputEvent, Keysym, MouseState};
