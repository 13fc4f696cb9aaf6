//! Raster buffer seam
//!
//! The geometry and render layers work against this minimal interface so no
//! display toolkit leaks into them. The shipped implementation is backed by
//! the `image` crate; a frontend is free to convert into its own surface
//! type at the presentation boundary.

use crate::scan::ScanImage;
use image::imageops::{self, FilterType};
use image::RgbImage;
use std::path::Path;
use thiserror::Error;

/// Raster encoding error types
#[derive(Debug, Error)]
pub enum RasterError {
    #[error("Image encode failed: {0}")]
    EncodeError(#[from] image::ImageError),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, RasterError>;

/// Minimal raster-buffer operations the viewer core needs
pub trait RasterSurface: Sized {
    fn from_pixels(width: u32, height: u32, rgb: &[u8]) -> Self;

    fn width(&self) -> u32;
    fn height(&self) -> u32;

    /// Extract a sub-region, clamped to the buffer bounds.
    fn crop(&self, x: i64, y: i64, width: u32, height: u32) -> Self;

    /// Proportional resample to exactly `width x height`.
    fn scale_to(&self, width: u32, height: u32) -> Self;

    /// Horizontal mirror.
    fn mirror_h(&self) -> Self;
}

/// `image`-backed raster buffer
#[derive(Debug, Clone, PartialEq)]
pub struct ImageRaster {
    image: RgbImage,
}

impl ImageRaster {
    pub fn from_scan(scan: &ScanImage) -> Self {
        Self::from_pixels(scan.width, scan.height, scan.pixels())
    }

    pub fn as_image(&self) -> &RgbImage {
        &self.image
    }

    pub fn into_image(self) -> RgbImage {
        self.image
    }

    /// Write as JPEG with the given quality, creating the file.
    pub fn save_jpeg(&self, path: &Path, quality: u8) -> Result<()> {
        let file = std::fs::File::create(path)?;
        let mut writer = std::io::BufWriter::new(file);
        let mut encoder =
            image::codecs::jpeg::JpegEncoder::new_with_quality(&mut writer, quality);
        encoder.encode_image(&self.image)?;
        Ok(())
    }
}

impl RasterSurface for ImageRaster {
    fn from_pixels(width: u32, height: u32, rgb: &[u8]) -> Self {
        let image = RgbImage::from_raw(width, height, rgb.to_vec())
            .unwrap_or_else(|| RgbImage::new(width.max(1), height.max(1)));
        Self { image }
    }

    fn width(&self) -> u32 {
        self.image.width()
    }

    fn height(&self) -> u32 {
        self.image.height()
    }

    fn crop(&self, x: i64, y: i64, width: u32, height: u32) -> Self {
        let x0 = x.clamp(0, self.image.width() as i64) as u32;
        let y0 = y.clamp(0, self.image.height() as i64) as u32;
        let w = width.min(self.image.width() - x0).max(1);
        let h = height.min(self.image.height() - y0).max(1);
        Self {
            image: imageops::crop_imm(&self.image, x0, y0, w, h).to_image(),
        }
    }

    fn scale_to(&self, width: u32, height: u32) -> Self {
        Self {
            image: imageops::resize(&self.image, width.max(1), height.max(1), FilterType::Triangle),
        }
    }

    fn mirror_h(&self) -> Self {
        Self {
            image: imageops::flip_horizontal(&self.image),
        }
    }
}
