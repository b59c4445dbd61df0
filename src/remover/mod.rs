pub mod chroma;
pub mod http;
pub mod mock;

use std::io::Cursor;

use anyhow::{Context, Result};
use async_trait::async_trait;
use image::{DynamicImage, ImageFormat};

use crate::decoder::DecodedImage;

/// The borrowed segmenter. Could be a local heuristic, a remote model,
/// or a test script. Returns the encoded result image.
#[async_trait]
pub trait BackgroundRemover: Send + Sync {
    fn name(&self) -> &str;
    async fn remove(&self, image: &DecodedImage) -> Result<Vec<u8>>;
}

/// Encode any image as PNG, the format every processed result is stored in.
pub fn encode_png(image: &DynamicImage) -> Result<Vec<u8>> {
    let mut out = Vec::new();
    image
        .write_to(&mut Cursor::new(&mut out), ImageFormat::Png)
        .context("failed to encode PNG")?;
    Ok(out)
}

/// Pass PNG bytes through untouched and re-encode any other image format as PNG.
pub fn ensure_png(bytes: Vec<u8>) -> Result<Vec<u8>> {
    if image::guess_format(&bytes).ok() == Some(ImageFormat::Png) {
        return Ok(bytes);
    }
    let image = image::load_from_memory(&bytes).context("result is not a decodable image")?;
    encode_png(&image)
}
