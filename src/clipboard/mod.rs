//! Clipboard module
//!
//! Synchronizes the local clipboard with the remote session in both
//! directions without feedback loops.

pub mod sync;
pub mod system;

pub use sync::{
    is_text_mimetype, receive_remote, ClipboardBridge, ClipboardOrigin, ClipboardSnapshot,
    ClipboardValue, DEFAULT_POLL_INTERVAL, OUTBOUND_MIMETYPE,
};
pub use system::{LocalClipboard, SystemClipboard};
