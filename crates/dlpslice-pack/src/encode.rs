//! Mask padding and image encoding.

use std::io::Cursor;

use dlpslice::raster::{Mask, BACKGROUND};
use image::{DynamicImage, GrayImage, ImageFormat};
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Image file format for layer masks.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// 8-bit grayscale PNG.
    #[default]
    Png,
    /// Palette GIF.
    Gif,
}

impl OutputFormat {
    /// File extension without the dot.
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Png => "png",
            Self::Gif => "gif",
        }
    }
}

/// Surround `mask` with `border` background pixels on every side.
pub fn pad_mask(mask: &Mask, border: u32) -> Mask {
    if border == 0 {
        return mask.clone();
    }
    let (w, h) = (mask.width() as usize, mask.height() as usize);
    let b = border as usize;
    let padded_w = w + 2 * b;
    let padded_h = h + 2 * b;

    let mut pixels = vec![BACKGROUND; padded_w * padded_h];
    if w > 0 {
        for (y, row) in mask.pixels().chunks_exact(w).enumerate() {
            let start = (y + b) * padded_w + b;
            pixels[start..start + w].copy_from_slice(row);
        }
    }
    Mask::from_raw(padded_w as u32, padded_h as u32, pixels)
        .unwrap_or_else(|| Mask::new(padded_w as u32, padded_h as u32))
}

/// Encode `mask` as an image file.
pub fn encode(mask: &Mask, format: OutputFormat) -> Result<Vec<u8>> {
    let gray = GrayImage::from_raw(mask.width(), mask.height(), mask.pixels().to_vec())
        .unwrap_or_else(|| GrayImage::new(mask.width(), mask.height()));
    let mut out = Cursor::new(Vec::new());
    match format {
        OutputFormat::Png => gray.write_to(&mut out, ImageFormat::Png)?,
        // The GIF encoder takes RGB input; gray levels map to an exact palette.
        OutputFormat::Gif => {
            DynamicImage::ImageLuma8(gray)
                .to_rgb8()
                .write_to(&mut out, ImageFormat::Gif)?
        }
    }
    Ok(out.into_inner())
}
