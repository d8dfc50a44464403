//! Typed byte streams multiplexed over the protocol connection

use bytes::Bytes;
use tokio::sync::mpsc;

use crate::error::{ProtocolError, ProtocolResult};

/// Largest chunk handed to a single `write` by [`write_text`]
pub const MAX_CHUNK_BYTES: usize = 6048;

/// Outbound stream opened on the protocol client
///
/// One stream carries exactly one payload and is closed with `end`.
pub trait OutputStream: Send {
    /// Writes a chunk of the payload
    fn write(&mut self, data: &[u8]) -> ProtocolResult<()>;

    /// Closes the stream
    fn end(&mut self) -> ProtocolResult<()>;
}

/// Writes `text` as UTF-8 in chunks that never split a character
pub fn write_text(stream: &mut dyn OutputStream, text: &str) -> ProtocolResult<()> {
    let mut rest = text;
    while !rest.is_empty() {
        let mut cut = rest.len().min(MAX_CHUNK_BYTES);
        while !rest.is_char_boundary(cut) {
            cut -= 1;
        }
        let (chunk, tail) = rest.split_at(cut);
        stream.write(chunk.as_bytes())?;
        rest = tail;
    }
    Ok(())
}

/// One message on an inbound stream
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamChunk {
    /// Part of the payload
    Data(Bytes),
    /// The remote end finished the payload
    End,
}

/// Sending half of an [`InboundStream`], held by the protocol client
///
/// Dropping it without calling [`StreamSender::end`] aborts the stream.
#[derive(Debug, Clone)]
pub struct StreamSender {
    tx: mpsc::UnboundedSender<StreamChunk>,
}

impl StreamSender {
    /// Forwards a chunk of the payload
    pub fn send(&self, data: Bytes) -> ProtocolResult<()> {
        self.tx
            .send(StreamChunk::Data(data))
            .map_err(|_| ProtocolError::StreamClosed)
    }

    /// Marks the payload complete
    pub fn end(self) -> ProtocolResult<()> {
        self.tx
            .send(StreamChunk::End)
            .map_err(|_| ProtocolError::StreamClosed)
    }
}

/// Inbound stream opened by the remote end
///
/// Only a stream finished with [`StreamChunk::End`] yields a payload; one
/// whose sender goes away first (the connection dropped) is aborted.
#[derive(Debug)]
pub struct InboundStream {
    rx: mpsc::UnboundedReceiver<StreamChunk>,
    finished: bool,
}

impl InboundStream {
    /// Wraps a chunk receiver
    pub fn new(rx: mpsc::UnboundedReceiver<StreamChunk>) -> Self {
        Self {
            rx,
            finished: false,
        }
    }

    /// Creates a connected sender/stream pair
    pub fn channel() -> (StreamSender, InboundStream) {
        let (tx, rx) = mpsc::unbounded_channel();
        (StreamSender { tx }, Self::new(rx))
    }

    /// Receives the next chunk, `Ok(None)` at end-of-stream
    pub async fn next_chunk(&mut self) -> ProtocolResult<Option<Bytes>> {
        if self.finished {
            return Ok(None);
        }
        match self.rx.recv().await {
            Some(StreamChunk::Data(data)) => Ok(Some(data)),
            Some(StreamChunk::End) => {
                self.finished = true;
                Ok(None)
            }
            None => Err(ProtocolError::StreamAborted),
        }
    }

    /// Accumulates every chunk until end-of-stream
    ///
    /// Partial data from an aborted stream is discarded.
    pub async fn read_to_end(mut self) -> ProtocolResult<Vec<u8>> {
        let mut data = Vec::new();
        while let Some(chunk) = self.next_chunk().await? {
            data.extend_from_slice(&chunk);
        }
        Ok(data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct Recorder {
        chunks: Vec<Vec<u8>>,
        ended: bool,
    }

    impl OutputStream for Recorder {
        fn write(&mut self, data: &[u8]) -> ProtocolResult<()> {
            self.chunks.push(data.to_vec());
            Ok(())
        }

        fn end(&mut self) -> ProtocolResult<()> {
            self.ended = true;
            Ok(())
        }
    }

    #[test]
    fn test_write_text_chunks_on_char_boundaries() {
        let text = "é".repeat(MAX_CHUNK_BYTES);
        let mut recorder = Recorder::default();
        write_text(&mut recorder, &text).unwrap();

        assert!(recorder.chunks.len() > 1);
        for chunk in &recorder.chunks {
            assert!(chunk.len() <= MAX_CHUNK_BYTES);
            assert!(std::str::from_utf8(chunk).is_ok());
        }
        assert_eq!(recorder.chunks.concat(), text.as_bytes());
        assert!(!recorder.ended);
    }

    #[test]
    fn test_write_empty_text_writes_nothing() {
        let mut recorder = Recorder::default();
        write_text(&mut recorder, "").unwrap();
        assert!(recorder.chunks.is_empty());
    }

    #[tokio::test]
    async fn test_inbound_read_to_end() {
        let (tx, stream) = InboundStream::channel();
        tx.send(Bytes::from_static(b"ab")).unwrap();
        tx.send(Bytes::from_static(b"c")).unwrap();
        tx.end().unwrap();

        assert_eq!(stream.read_to_end().await.unwrap(), b"abc");
    }

    #[tokio::test]
    async fn test_dropped_sender_aborts_stream() {
        let (tx, stream) = InboundStream::channel();
        tx.send(Bytes::from_static(b"partial-")).unwrap();
        drop(tx);

        assert_eq!(
            stream.read_to_end().await,
            Err(ProtocolError::StreamAborted)
        );
    }

    #[tokio::test]
    async fn test_chunks_after_end_are_ignored() {
        let (tx, mut stream) = InboundStream::channel();
        tx.send(Bytes::from_static(b"x")).unwrap();
        tx.clone().end().unwrap();
        tx.send(Bytes::from_static(b"y")).unwrap();

        assert_eq!(stream.next_chunk().await, Ok(Some(Bytes::from_static(b"x"))));
        assert_eq!(stream.next_chunk().await, Ok(None));
        assert_eq!(stream.next_chunk().await, Ok(None));
    }

    #[tokio::test]
    async fn test_send_after_reader_dropped_fails() {
        let (tx, stream) = InboundStream::channel();
        drop(stream);
        assert_eq!(
            tx.send(Bytes::from_static(b"x")),
            Err(ProtocolError::StreamClosed)
        );
    }
}
