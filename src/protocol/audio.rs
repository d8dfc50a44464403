//! Audio input forwarding

use crate::protocol::stream::OutputStream;

/// Uncompressed 16-bit linear PCM, 44.1kHz, stereo
pub const AUDIO_INPUT_MIMETYPE: &str = "audio/L16;rate=44100,channels=2";

/// A local audio source feeding an outbound audio stream
pub trait AudioInput: Send {
    /// Starts recording into `stream`
    ///
    /// Hands the stream back when the source cannot record, so the caller
    /// can end it.
    fn attach(
        &mut self,
        stream: Box<dyn OutputStream>,
    ) -> Result<(), Box<dyn OutputStream>>;
}
