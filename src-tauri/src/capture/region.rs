//! Pure region cropping logic, the functional core.
//!
//! This module has zero infrastructure dependencies.
//! It takes a display frame in, returns the selected pixels out.
//!
//! All coordinates here are physical pixels. A frame that came back at
//! logical (DPI-scaled) size is resampled to its display's physical size
//! before cropping; cropping logical pixels with physical coordinates
//! shifts the selection on scaled displays.

use image::imageops::{self, FilterType};
use image::RgbaImage;
use serde::{Deserialize, Serialize};

/// Selected rectangle in physical screen pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CaptureRegion {
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
}

impl CaptureRegion {
    pub fn new(x: i32, y: i32, width: u32, height: u32) -> Result<Self, CropError> {
        if width == 0 || height == 0 {
            return Err(CropError::ZeroDimension);
        }
        Ok(Self {
            x,
            y,
            width,
            height,
        })
    }

    /// Convert a rectangle reported in logical (CSS) pixels by the overlay.
    pub fn from_logical(
        x: f64,
        y: f64,
        width: f64,
        height: f64,
        scale_factor: f64,
    ) -> Result<Self, CropError> {
        let to_physical = |v: f64| (v * scale_factor).round();
        let (w, h) = (to_physical(width), to_physical(height));
        if w < 1.0 || h < 1.0 {
            return Err(CropError::ZeroDimension);
        }
        Self::new(to_physical(x) as i32, to_physical(y) as i32, w as u32, h as u32)
    }
}

/// A display's bounds in physical pixels on the virtual desktop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DisplayGeometry {
    pub id: u32,
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
}

impl DisplayGeometry {
    pub fn contains_point(&self, x: i32, y: i32) -> bool {
        let (right, bottom) = (
            self.x as i64 + self.width as i64,
            self.y as i64 + self.height as i64,
        );
        (x as i64) >= self.x as i64
            && (x as i64) < right
            && (y as i64) >= self.y as i64
            && (y as i64) < bottom
    }
}

/// One captured display image plus the geometry it covers.
pub struct Frame {
    pub image: RgbaImage,
    pub display: DisplayGeometry,
}

/// The cropped selection, ready for the clipboard.
#[derive(Debug, Clone)]
pub struct CapturedImage {
    image: RgbaImage,
}

impl CapturedImage {
    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    /// Tightly packed RGBA8 rows.
    pub fn as_raw(&self) -> &[u8] {
        self.image.as_raw()
    }

    pub fn into_image(self) -> RgbaImage {
        self.image
    }
}

impl From<RgbaImage> for CapturedImage {
    fn from(image: RgbaImage) -> Self {
        Self { image }
    }
}

/// Crops `frame` to `region` and returns exactly `region.width × region.height` pixels.
///
/// This is a pure function with no side effects.
pub fn crop_frame(frame: Frame, region: &CaptureRegion) -> Result<CapturedImage, CropError> {
    if region.width == 0 || region.height == 0 {
        return Err(CropError::ZeroDimension);
    }

    let display = frame.display;
    let local_x = region.x as i64 - display.x as i64;
    let local_y = region.y as i64 - display.y as i64;

    if local_x < 0
        || local_y < 0
        || local_x + region.width as i64 > display.width as i64
        || local_y + region.height as i64 > display.height as i64
    {
        return Err(CropError::OutOfBounds {
            requested: (region.x, region.y, region.width, region.height),
            display_size: (display.width, display.height),
        });
    }

    let physical = to_physical_size(frame.image, &display);
    let cropped = imageops::crop_imm(
        &physical,
        local_x as u32,
        local_y as u32,
        region.width,
        region.height,
    )
    .to_image();

    Ok(CapturedImage { image: cropped })
}

fn to_physical_size(image: RgbaImage, display: &DisplayGeometry) -> RgbaImage {
    if image.dimensions() == (display.width, display.height) {
        return image;
    }
    log::debug!(
        "[CAPTURE] Resampling {}x{} frame to physical {}x{}",
        image.width(),
        image.height(),
        display.width,
        display.height
    );
    imageops::resize(&image, display.width, display.height, FilterType::Triangle)
}

#[derive(Debug, thiserror::Error)]
pub enum CropError {
    #[error("Crop rectangle has zero width or height")]
    ZeroDimension,

    #[error(
        "Crop rectangle ({},{},{},{}) exceeds display bounds ({}x{})",
        requested.0, requested.1, requested.2, requested.3,
        display_size.0, display_size.1
    )]
    OutOfBounds {
        requested: (i32, i32, u32, u32),
        display_size: (u32, u32),
    },
}
