//! Display capture using the `xcap` crate.
//!
//! This is the infrastructure layer; it talks to the OS.
//! Everything after the grab (resample, crop) lives in region.rs.

use super::region::{DisplayGeometry, Frame};
use super::{CaptureError, FrameSource};
use xcap::Monitor;

/// Captures whole monitors through xcap.
#[derive(Debug, Default)]
pub struct XcapFrameSource;

impl XcapFrameSource {
    pub fn new() -> Self {
        Self
    }
}

fn geometry(monitor: &Monitor) -> Result<DisplayGeometry, CaptureError> {
    let query = |e: xcap::XCapError| CaptureError::MonitorEnumeration(e.to_string());

    let (x, y) = (monitor.x().map_err(query)?, monitor.y().map_err(query)?);
    let (width, height) = (monitor.width().map_err(query)?, monitor.height().map_err(query)?);

    // macOS reports bounds in points; every other backend already uses pixels.
    let scale = if cfg!(target_os = "macos") {
        monitor.scale_factor().map_err(query)? as f64
    } else {
        1.0
    };
    let px = |v: f64| (v * scale).round();

    Ok(DisplayGeometry {
        id: monitor.id().map_err(query)?,
        x: px(x as f64) as i32,
        y: px(y as f64) as i32,
        width: px(width as f64) as u32,
        height: px(height as f64) as u32,
    })
}

impl FrameSource for XcapFrameSource {
    fn displays(&self) -> Result<Vec<DisplayGeometry>, CaptureError> {
        let monitors =
            Monitor::all().map_err(|e| CaptureError::MonitorEnumeration(e.to_string()))?;
        monitors.iter().map(geometry).collect()
    }

    fn grab(&self, display: &DisplayGeometry) -> Result<Frame, CaptureError> {
        let monitors =
            Monitor::all().map_err(|e| CaptureError::MonitorEnumeration(e.to_string()))?;
        let monitor = monitors
            .into_iter()
            .find(|m| m.id().map(|id| id == display.id).unwrap_or(false))
            .ok_or(CaptureError::NoScreenSource {
                x: display.x,
                y: display.y,
            })?;

        let image = monitor
            .capture_image()
            .map_err(|e| CaptureError::CaptureFailed(e.to_string()))?;

        Ok(Frame {
            image,
            display: *display,
        })
    }
}
