//! Remote-display protocol adapter
//!
//! Thin capability wrapper around an external protocol implementation.

pub mod audio;
pub mod client;
pub mod stream;

pub use audio::{AudioInput, AUDIO_INPUT_MIMETYPE};
pub use client::{
    ProtocolBinding, ProtocolClient, ProtocolEvent, ProtocolFactory, ProtocolStatus,
    RemoteDisplay,
};
pub use stream::{write_text, InboundStream, OutputStream, StreamChunk, StreamSender};
