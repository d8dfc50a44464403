//! Bidirectional clipboard synchronization
//!
//! Outbound, the local clipboard is polled and any change is pushed to the
//! remote end as a `text/plain` stream. Inbound, clipboard streams opened by
//! the remote end are accumulated and written to the local clipboard.
//!
//! Remote text is recorded in the snapshot with [`ClipboardOrigin::Remote`],
//! so the next poll reading the same value does not echo it back.

use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace, warn};

use crate::clipboard::system::LocalClipboard;
use crate::error::{ClipboardError, ClipboardResult, ProtocolResult};
use crate::protocol::{write_text, InboundStream, ProtocolClient};
use crate::timer::RepeatingTask;

/// Mimetype of outbound clipboard streams
pub const OUTBOUND_MIMETYPE: &str = "text/plain";

/// Default local clipboard poll period
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(500);

/// Returns true for mimetypes carried as text
pub fn is_text_mimetype(mimetype: &str) -> bool {
    mimetype.starts_with("text/")
}

/// Where a clipboard value came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClipboardOrigin {
    /// Observed on the local clipboard
    Local,
    /// Received from the remote end
    Remote,
}

/// Clipboard payload
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClipboardValue {
    /// Text content
    Text(String),
    /// Typed binary content
    Binary {
        /// Payload mimetype
        mimetype: String,
        /// Payload bytes
        data: Bytes,
    },
}

impl ClipboardValue {
    /// Builds a value from an accumulated inbound stream
    pub fn from_stream(mimetype: &str, data: Vec<u8>) -> Self {
        if is_text_mimetype(mimetype) {
            ClipboardValue::Text(String::from_utf8_lossy(&data).into_owned())
        } else {
            ClipboardValue::Binary {
                mimetype: mimetype.to_string(),
                data: Bytes::from(data),
            }
        }
    }

    /// Returns the text, if this is a text value
    pub fn as_text(&self) -> Option<&str> {
        match self {
            ClipboardValue::Text(text) => Some(text),
            ClipboardValue::Binary { .. } => None,
        }
    }
}

/// Last known clipboard value
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClipboardSnapshot {
    /// The value
    pub value: ClipboardValue,
    /// Where it came from
    pub origin: ClipboardOrigin,
}

impl ClipboardSnapshot {
    fn text(value: String, origin: ClipboardOrigin) -> Self {
        Self {
            value: ClipboardValue::Text(value),
            origin,
        }
    }
}

/// Accumulates a remote clipboard stream and writes it locally
///
/// Nothing is written unless the stream reaches its end.
pub async fn receive_remote(
    mimetype: String,
    stream: InboundStream,
    clipboard: Arc<dyn LocalClipboard>,
) -> ClipboardResult<ClipboardValue> {
    let data = stream.read_to_end().await?;
    let value = ClipboardValue::from_stream(&mimetype, data);

    match &value {
        ClipboardValue::Text(text) => clipboard.write_text(text).await?,
        ClipboardValue::Binary { mimetype, data } => {
            clipboard.write_binary(mimetype, data).await?
        }
    }

    debug!("Updated local clipboard from remote ({})", mimetype);
    Ok(value)
}

/// Clipboard synchronizer owned by the session controller
#[derive(Debug, Default)]
pub struct ClipboardBridge {
    snapshot: Option<ClipboardSnapshot>,
    remote_writes_pending: u32,
    poller: Option<RepeatingTask>,
}

impl ClipboardBridge {
    /// Creates a bridge with no baseline
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts polling the local clipboard every `period`
    ///
    /// Each read result is passed to `on_read`; the first fires immediately.
    pub fn start_polling<F>(
        &mut self,
        clipboard: Arc<dyn LocalClipboard>,
        period: Duration,
        parent: &CancellationToken,
        on_read: F,
    ) where
        F: Fn(ClipboardResult<String>) + Send + Sync + 'static,
    {
        let on_read = Arc::new(on_read);
        self.poller = Some(RepeatingTask::spawn(period, parent, move || {
            let clipboard = Arc::clone(&clipboard);
            let on_read = Arc::clone(&on_read);
            async move { on_read(clipboard.read_text().await) }
        }));
        debug!("Clipboard polling every {:?}", period);
    }

    /// Stops polling
    pub fn stop_polling(&mut self) {
        if let Some(poller) = self.poller.take() {
            poller.cancel();
        }
    }

    /// Returns true while the poll task runs
    pub fn is_polling(&self) -> bool {
        self.poller.as_ref().is_some_and(|p| !p.is_stopped())
    }

    /// Returns the last known value
    pub fn snapshot(&self) -> Option<&ClipboardSnapshot> {
        self.snapshot.as_ref()
    }

    /// Classifies a local read, returning a value to push to the remote end
    pub fn handle_local_read(&mut self, result: ClipboardResult<String>) -> Option<String> {
        match result {
            Ok(value) => self.observe_local(value),
            Err(ClipboardError::AccessDenied(reason)) => {
                // Usually lost focus; the next tick retries.
                trace!("Clipboard not readable: {}", reason);
                None
            }
            Err(e) => {
                warn!("Error reading clipboard: {}", e);
                None
            }
        }
    }

    /// Compares a local value against the snapshot
    ///
    /// The first observation only records a baseline, so pre-existing
    /// content is never pushed on startup.
    pub fn observe_local(&mut self, value: String) -> Option<String> {
        if self.remote_writes_pending > 0 {
            trace!("Remote clipboard write in flight, skipping local read");
            return None;
        }

        match &self.snapshot {
            None => {
                self.snapshot = Some(ClipboardSnapshot::text(value, ClipboardOrigin::Local));
                None
            }
            Some(snapshot) if snapshot.value.as_text() == Some(value.as_str()) => None,
            Some(_) => {
                debug!("New local clipboard value ({} bytes)", value.len());
                self.snapshot = Some(ClipboardSnapshot::text(
                    value.clone(),
                    ClipboardOrigin::Local,
                ));
                Some(value)
            }
        }
    }

    /// Sends `value` to the remote end on a fresh stream
    pub fn send_outbound(client: &mut dyn ProtocolClient, value: &str) -> ProtocolResult<()> {
        let mut stream = client.create_clipboard_stream(OUTBOUND_MIMETYPE);
        write_text(stream.as_mut(), value)?;
        stream.end()?;
        debug!("Sent clipboard ({} bytes)", value.len());
        Ok(())
    }

    /// Marks a remote payload as being written locally
    pub fn begin_remote_write(&mut self) {
        self.remote_writes_pending += 1;
    }

    /// Records the outcome of a remote payload write
    pub fn finish_remote_write(&mut self, result: ClipboardResult<ClipboardValue>) {
        self.remote_writes_pending = self.remote_writes_pending.saturating_sub(1);

        match result {
            Ok(value @ ClipboardValue::Text(_)) => {
                self.snapshot = Some(ClipboardSnapshot {
                    value,
                    origin: ClipboardOrigin::Remote,
                });
            }
            Ok(ClipboardValue::Binary { mimetype, data }) => {
                debug!("Wrote {} bytes of {} to local clipboard", data.len(), mimetype);
            }
            Err(ClipboardError::Stream(e)) => debug!("Dropped remote clipboard: {}", e),
            Err(e) => warn!("Failed to apply remote clipboard: {}", e),
        }
    }
}
