//! Encode and decode chunk and tile image files.
//!
//! Tiles are written in the configured output format; intermediate chunks are
//! always PNG so that stitched tiles stay byte-identical to a monolithic
//! decode.

use crate::raster::PixelBuffer;
use anyhow::{bail, Context, Result};
use image::{DynamicImage, ExtendedColorType, ImageFormat};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Output encoding for finished tiles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum TileFormat {
    Png,
    Jpeg,
}

impl TileFormat {
    /// File extension used in tile names.
    pub fn extension(&self) -> &'static str {
        match self {
            TileFormat::Png => "png",
            TileFormat::Jpeg => "jpg",
        }
    }

    pub fn image_format(&self) -> ImageFormat {
        match self {
            TileFormat::Png => ImageFormat::Png,
            TileFormat::Jpeg => ImageFormat::Jpeg,
        }
    }
}

impl Default for TileFormat {
    fn default() -> Self {
        TileFormat::Png
    }
}

fn color_type(channels: u8) -> Result<ExtendedColorType> {
    Ok(match channels {
        1 => ExtendedColorType::L8,
        3 => ExtendedColorType::Rgb8,
        4 => ExtendedColorType::Rgba8,
        other => bail!("unsupported channel count {}", other),
    })
}

/// Write a buffer to `path` atomically: encode to a sibling temp file, then
/// rename. A crash never leaves a partial file at the final path.
pub fn write_image_atomic(path: &Path, buf: &PixelBuffer, format: ImageFormat) -> Result<()> {
    let mut tmp_name = path.as_os_str().to_os_string();
    tmp_name.push(".tmp");
    let tmp = std::path::PathBuf::from(tmp_name);

    image::save_buffer_with_format(
        &tmp,
        &buf.data,
        buf.width,
        buf.height,
        color_type(buf.channels)?,
        format,
    )
    .with_context(|| format!("failed to encode {}", path.display()))?;

    std::fs::rename(&tmp, path)
        .with_context(|| format!("failed to finalize {}", path.display()))?;
    Ok(())
}

/// Decode an image file into a pixel buffer, keeping its native channel
/// layout where it is one we support.
pub fn read_image(path: &Path) -> Result<PixelBuffer> {
    let mut reader = image::ImageReader::open(path)
        .with_context(|| format!("failed to open image {}", path.display()))?;
    // Chunk files can exceed the default decode limits; our own pixel ceiling
    // governs how large they get.
    reader.no_limits();
    let img = reader
        .decode()
        .with_context(|| format!("failed to decode image {}", path.display()))?;

    let (channels, width, height, data) = match img {
        DynamicImage::ImageLuma8(b) => {
            let (w, h) = b.dimensions();
            (1, w, h, b.into_raw())
        }
        DynamicImage::ImageRgb8(b) => {
            let (w, h) = b.dimensions();
            (3, w, h, b.into_raw())
        }
        DynamicImage::ImageRgba8(b) => {
            let (w, h) = b.dimensions();
            (4, w, h, b.into_raw())
        }
        other => {
            let b = other.to_rgb8();
            let (w, h) = b.dimensions();
            (3, w, h, b.into_raw())
        }
    };

    Ok(PixelBuffer {
        width,
        height,
        channels,
        data,
    })
}
