//! A local remover for flat backgrounds.
//!
//! Picks the dominant border colour and clears every pixel connected to the
//! border whose colour is within `tolerance` of it. Good enough for product
//! shots and screenshots; anything else wants a real segmentation model
//! behind [`HttpRemover`](super::http::HttpRemover).

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

use anyhow::{Context, Result};
use async_trait::async_trait;
use image::{DynamicImage, Rgba, RgbaImage};

use super::{BackgroundRemover, encode_png};
use crate::decoder::DecodedImage;

/// Default per-channel colour distance still counted as background.
pub const DEFAULT_TOLERANCE: u8 = 24;

#[derive(Debug, Clone)]
pub struct ChromaKeyRemover {
    tolerance: u8,
}

impl ChromaKeyRemover {
    pub fn new(tolerance: u8) -> Self {
        Self { tolerance }
    }
}

impl Default for ChromaKeyRemover {
    fn default() -> Self {
        Self::new(DEFAULT_TOLERANCE)
    }
}

#[async_trait]
impl BackgroundRemover for ChromaKeyRemover {
    fn name(&self) -> &str {
        "chroma"
    }

    async fn remove(&self, image: &DecodedImage) -> Result<Vec<u8>> {
        let image = Arc::clone(&image.image);
        let tolerance = self.tolerance;
        tokio::task::spawn_blocking(move || {
            let keyed = key_out_background(image.to_rgba8(), tolerance);
            encode_png(&DynamicImage::ImageRgba8(keyed))
        })
        .await
        .context("chroma key task panicked")?
    }
}

/// Clear the border-connected background of `img`.
pub fn key_out_background(mut img: RgbaImage, tolerance: u8) -> RgbaImage {
    let (width, height) = img.dimensions();
    if width == 0 || height == 0 {
        return img;
    }
    let key = border_color(&img);
    let matches = |p: &Rgba<u8>| {
        p.0[..3]
            .iter()
            .zip(key.iter())
            .all(|(a, b)| a.abs_diff(*b) <= tolerance)
    };

    let idx = |x: u32, y: u32| (y as usize) * (width as usize) + x as usize;
    let mut seen = vec![false; (width as usize) * (height as usize)];
    let mut queue = VecDeque::new();

    for (x, y) in border(width, height) {
        if !seen[idx(x, y)] && matches(img.get_pixel(x, y)) {
            seen[idx(x, y)] = true;
            queue.push_back((x, y));
        }
    }

    while let Some((x, y)) = queue.pop_front() {
        img.get_pixel_mut(x, y).0[3] = 0;

        let neighbours = [
            (x.checked_sub(1), Some(y)),
            (Some(x + 1).filter(|&nx| nx < width), Some(y)),
            (Some(x), y.checked_sub(1)),
            (Some(x), Some(y + 1).filter(|&ny| ny < height)),
        ];
        for (nx, ny) in neighbours {
            let (Some(nx), Some(ny)) = (nx, ny) else {
                continue;
            };
            if !seen[idx(nx, ny)] && matches(img.get_pixel(nx, ny)) {
                seen[idx(nx, ny)] = true;
                queue.push_back((nx, ny));
            }
        }
    }

    img
}

/// Most frequent RGB value on the image border. Ties go to the smallest value.
fn border_color(img: &RgbaImage) -> [u8; 3] {
    let mut counts: HashMap<[u8; 3], usize> = HashMap::new();
    for (x, y) in border(img.width(), img.height()) {
        let p = img.get_pixel(x, y).0;
        *counts.entry([p[0], p[1], p[2]]).or_default() += 1;
    }
    counts
        .into_iter()
        .max_by(|(ca, na), (cb, nb)| na.cmp(nb).then(cb.cmp(ca)))
        .map(|(color, _)| color)
        .unwrap_or([255, 255, 255])
}

fn border(width: u32, height: u32) -> impl Iterator<Item = (u32, u32)> {
    let top_bottom = (0..width).flat_map(move |x| [(x, 0), (x, height - 1)]);
    let sides = (1..height.saturating_sub(1)).flat_map(move |y| [(0, y), (width - 1, y)]);
    top_bottom.chain(sides)
}
