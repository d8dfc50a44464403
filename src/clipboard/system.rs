//! Access to the local clipboard

use std::borrow::Cow;

use arboard::{Clipboard, ImageData};
use async_trait::async_trait;

use crate::error::{ClipboardError, ClipboardResult};

/// The local clipboard, a single externally-owned resource
#[async_trait]
pub trait LocalClipboard: Send + Sync {
    /// Reads the current text content
    async fn read_text(&self) -> ClipboardResult<String>;

    /// Replaces the content with text
    async fn write_text(&self, text: &str) -> ClipboardResult<()>;

    /// Replaces the content with typed binary data
    async fn write_binary(&self, mimetype: &str, data: &[u8]) -> ClipboardResult<()>;
}

/// The operating system clipboard, accessed through `arboard`
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClipboard;

impl SystemClipboard {
    /// Creates a handle to the system clipboard
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl LocalClipboard for SystemClipboard {
    async fn read_text(&self) -> ClipboardResult<String> {
        with_clipboard(|clipboard| match clipboard.get_text() {
            Ok(text) => Ok(text),
            // Empty clipboard or non-text content
            Err(arboard::Error::ContentNotAvailable) => Ok(String::new()),
            Err(e) => Err(map_error(e)),
        })
        .await
    }

    async fn write_text(&self, text: &str) -> ClipboardResult<()> {
        let text = text.to_string();
        with_clipboard(move |clipboard| clipboard.set_text(text).map_err(map_error)).await
    }

    async fn write_binary(&self, mimetype: &str, data: &[u8]) -> ClipboardResult<()> {
        if !mimetype.starts_with("image/") {
            return Err(ClipboardError::UnsupportedMimetype(mimetype.to_string()));
        }

        let rgba = image::load_from_memory(data)
            .map_err(|e| ClipboardError::Unexpected(format!("Failed to decode {}: {}", mimetype, e)))?
            .to_rgba8();
        let (width, height) = rgba.dimensions();
        let image = ImageData {
            width: width as usize,
            height: height as usize,
            bytes: Cow::Owned(rgba.into_raw()),
        };

        with_clipboard(move |clipboard| clipboard.set_image(image).map_err(map_error)).await
    }
}

async fn with_clipboard<T, F>(op: F) -> ClipboardResult<T>
where
    F: FnOnce(&mut Clipboard) -> ClipboardResult<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(move || {
        let mut clipboard = Clipboard::new().map_err(map_error)?;
        op(&mut clipboard)
    })
    .await
    .map_err(|e| ClipboardError::Unexpected(format!("Clipboard task failed: {}", e)))?
}

fn map_error(err: arboard::Error) -> ClipboardError {
    match err {
        arboard::Error::ClipboardOccupied => ClipboardError::AccessDenied(err.to_string()),
        other => ClipboardError::Unexpected(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_occupied_is_access_denied() {
        assert!(matches!(
            map_error(arboard::Error::ClipboardOccupied),
            ClipboardError::AccessDenied(_)
        ));
        assert!(matches!(
            map_error(arboard::Error::ClipboardNotSupported),
            ClipboardError::Unexpected(_)
        ));
    }

    #[tokio::test]
    async fn test_non_image_binary_is_unsupported() {
        let result = SystemClipboard::new()
            .write_binary("application/pdf", b"%PDF")
            .await;
        assert_eq!(
            result,
            Err(ClipboardError::UnsupportedMimetype("application/pdf".to_string()))
        );
    }

    // Requires a desktop session with clipboard access
    #[tokio::test]
    #[ignore]
    async fn test_system_clipboard_round_trip() {
        let clipboard = SystemClipboard::new();
        clipboard.write_text("from rac-console").await.unwrap();
        assert_eq!(clipboard.read_text().await.unwrap(), "from rac-console");
    }
}
