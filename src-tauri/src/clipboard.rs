//! Clipboard publishing for captured images.
//!
//! Uses arboard for native clipboard access. The handle is created once
//! and kept for the life of the process: on X11 the clipboard contents
//! belong to whoever owns the selection, so dropping the handle right
//! after the write would empty the clipboard before the paste lands.

use crate::capture::CapturedImage;
use crate::events::ErrorKind;
use std::borrow::Cow;
use std::sync::Mutex;

pub trait ClipboardPublisher: Send + Sync {
    /// Replace the clipboard contents with `image` in one write.
    fn publish(&self, image: &CapturedImage) -> Result<(), ClipboardError>;
}

#[derive(Default)]
pub struct SystemClipboard {
    handle: Mutex<Option<arboard::Clipboard>>,
}

impl SystemClipboard {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ClipboardPublisher for SystemClipboard {
    fn publish(&self, image: &CapturedImage) -> Result<(), ClipboardError> {
        let start = std::time::Instant::now();
        let mut guard = self
            .handle
            .lock()
            .map_err(|e| ClipboardError::Unavailable(e.to_string()))?;

        if guard.is_none() {
            let clipboard =
                arboard::Clipboard::new().map_err(|e| ClipboardError::Unavailable(e.to_string()))?;
            *guard = Some(clipboard);
        }
        let clipboard = guard
            .as_mut()
            .ok_or_else(|| ClipboardError::Unavailable("clipboard handle missing".into()))?;

        let result = clipboard.set_image(arboard::ImageData {
            width: image.width() as usize,
            height: image.height() as usize,
            bytes: Cow::Borrowed(image.as_raw()),
        });

        if let Err(e) = result {
            // A broken connection stays broken; reconnect on the next write.
            *guard = None;
            return Err(ClipboardError::WriteFailed(e.to_string()));
        }

        log::info!(
            "[CLIPBOARD] Wrote {}x{} image in {}ms",
            image.width(),
            image.height(),
            start.elapsed().as_millis()
        );
        Ok(())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ClipboardError {
    #[error("Clipboard unavailable: {0}")]
    Unavailable(String),

    #[error("Clipboard write failed: {0}")]
    WriteFailed(String),
}

impl ClipboardError {
    pub fn kind(&self) -> ErrorKind {
        ErrorKind::ClipboardWriteFailed
    }
}
