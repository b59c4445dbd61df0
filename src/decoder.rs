//! Turning uploaded bytes into pixels.

use std::io::Cursor;
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use image::io::Reader;
use image::{DynamicImage, ImageFormat};

use crate::input::UploadFile;

/// Largest image (width × height) the default decoder will expand.
pub const MAX_PIXELS: u64 = 64 * 1024 * 1024;

/// A decoded upload, ready for a [`BackgroundRemover`](crate::remover::BackgroundRemover).
#[derive(Debug, Clone)]
pub struct DecodedImage {
    /// Shared so blocking tasks can take the pixels without copying them.
    pub image: Arc<DynamicImage>,
    /// Container format the bytes were in, when recognised.
    pub format: Option<ImageFormat>,
}

impl DecodedImage {
    pub fn new(image: DynamicImage, format: Option<ImageFormat>) -> Self {
        Self {
            image: Arc::new(image),
            format,
        }
    }
}

/// Decodes an upload. Failures become a processing error, not a validation one:
/// the MIME check already passed by the time this runs.
pub trait ImageDecoder: Send + Sync {
    fn decode(&self, file: &UploadFile) -> Result<DecodedImage>;
}

/// Decoder backed by the `image` crate (PNG, JPEG, GIF, WebP).
#[derive(Debug, Clone)]
pub struct ImageCrateDecoder {
    max_pixels: u64,
}

impl ImageCrateDecoder {
    pub fn new(max_pixels: u64) -> Self {
        Self { max_pixels }
    }
}

impl Default for ImageCrateDecoder {
    fn default() -> Self {
        Self::new(MAX_PIXELS)
    }
}

impl ImageDecoder for ImageCrateDecoder {
    fn decode(&self, file: &UploadFile) -> Result<DecodedImage> {
        let format = image::guess_format(&file.bytes).ok();

        // Read the header first so oversized images are refused before allocation.
        let (width, height) = Reader::new(Cursor::new(&file.bytes[..]))
            .with_guessed_format()
            .context("failed to read image header")?
            .into_dimensions()
            .with_context(|| format!("unrecognised image data in {}", file.name))?;

        let pixels = u64::from(width) * u64::from(height);
        if pixels > self.max_pixels {
            bail!(
                "{}x{} exceeds the {} pixel limit",
                width,
                height,
                self.max_pixels
            );
        }

        let image = image::load_from_memory(&file.bytes)
            .with_context(|| format!("failed to decode {}", file.name))?;

        Ok(DecodedImage::new(image, format))
    }
}
