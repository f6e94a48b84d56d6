//! Screen capture domain: public API.
//!
//! This module owns all screen capture functionality.
//! External code should only use the types exported here.
//!
//! The pixel source sits behind `FrameSource` so the crop path runs the
//! same under tests (synthetic frames) and on the desktop (xcap).

mod region;
#[cfg(feature = "desktop")]
mod screenshot;

pub use region::{crop_frame, CaptureRegion, CapturedImage, CropError, DisplayGeometry, Frame};
#[cfg(feature = "desktop")]
pub use screenshot::XcapFrameSource;

use crate::events::ErrorKind;
use std::sync::Arc;

/// Anything that can enumerate displays and grab a full frame of one.
pub trait FrameSource: Send + Sync {
    fn displays(&self) -> Result<Vec<DisplayGeometry>, CaptureError>;

    fn grab(&self, display: &DisplayGeometry) -> Result<Frame, CaptureError>;
}

/// Captures a screen rectangle: find the display, grab it, crop it.
///
/// Single attempt. A failure is reported, never retried.
pub struct FrameCapturer {
    source: Arc<dyn FrameSource>,
}

impl FrameCapturer {
    pub fn new(source: Arc<dyn FrameSource>) -> Self {
        Self { source }
    }

    /// Blocking. Call from `spawn_blocking` in async contexts.
    pub fn capture(&self, region: &CaptureRegion) -> Result<CapturedImage, CaptureError> {
        let start = std::time::Instant::now();

        let displays = self.source.displays()?;
        let display = displays
            .iter()
            .find(|d| d.contains_point(region.x, region.y))
            .copied()
            .ok_or(CaptureError::NoScreenSource {
                x: region.x,
                y: region.y,
            })?;

        let frame = self.source.grab(&display)?;
        let grab_ms = start.elapsed().as_millis();

        let image = crop_frame(frame, region)?;
        log::info!(
            "[CAPTURE] {}x{} at {},{} on display {} (grab={}ms, total={}ms)",
            image.width(),
            image.height(),
            region.x,
            region.y,
            display.id,
            grab_ms,
            start.elapsed().as_millis()
        );
        Ok(image)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum CaptureError {
    #[error("Failed to enumerate displays: {0}")]
    MonitorEnumeration(String),

    #[error("No capturable display contains point ({x}, {y})")]
    NoScreenSource { x: i32, y: i32 },

    #[error("Screen capture failed: {0}")]
    CaptureFailed(String),

    #[error(transparent)]
    Crop(#[from] CropError),
}

impl CaptureError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            CaptureError::MonitorEnumeration(_) | CaptureError::NoScreenSource { .. } => {
                ErrorKind::NoScreenSource
            }
            CaptureError::CaptureFailed(_) => ErrorKind::CaptureFailed,
            CaptureError::Crop(CropError::ZeroDimension) => ErrorKind::InvalidRegion,
            CaptureError::Crop(CropError::OutOfBounds { .. }) => ErrorKind::CaptureFailed,
        }
    }
}
