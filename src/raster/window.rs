//! Windowed reads from stripped TIFF sources.
//!
//! Oversized rasters cannot be decoded whole, so the chunk decomposer reads
//! rectangular sub-windows strip by strip. Only baseline stripped layouts with
//! 8-bit samples are supported; that is what the upstream fetch service
//! produces.

use crate::raster::PixelBuffer;
use anyhow::{bail, Context, Result};
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use tiff::decoder::{Decoder, DecodingResult, Limits};
use tiff::tags::Tag;
use tiff::ColorType;

/// Reader over a stripped TIFF that decodes only the strips a requested
/// window touches. Opening the reader parses the header without decoding any
/// pixel data, so probing dimensions of an oversized raster is cheap.
pub struct RasterReader {
    decoder: Decoder<BufReader<File>>,
    path: PathBuf,
    width: u32,
    height: u32,
    channels: u8,
    rows_per_strip: u32,
}

impl RasterReader {
    pub fn open(path: &Path) -> Result<Self> {
        let file = File::open(path)
            .with_context(|| format!("failed to open raster {}", path.display()))?;
        let mut decoder = Decoder::new(BufReader::new(file))
            .with_context(|| format!("failed to parse TIFF header of {}", path.display()))?
            .with_limits(Limits::unlimited());

        if decoder.find_tag(Tag::TileWidth)?.is_some() {
            bail!(
                "tiled TIFF layouts are not supported (expected strips): {}",
                path.display()
            );
        }

        let (width, height) = decoder.dimensions()?;
        let channels = match decoder.colortype()? {
            ColorType::Gray(8) => 1,
            ColorType::RGB(8) => 3,
            ColorType::RGBA(8) => 4,
            other => bail!(
                "unsupported color type {:?} in {} (8-bit gray/RGB/RGBA only)",
                other,
                path.display()
            ),
        };

        // Absent RowsPerStrip means the whole image is one strip.
        let rows_per_strip = decoder.get_tag_u32(Tag::RowsPerStrip).unwrap_or(height);
        if rows_per_strip == 0 {
            bail!("invalid RowsPerStrip of 0 in {}", path.display());
        }

        Ok(Self {
            decoder,
            path: path.to_path_buf(),
            width,
            height,
            channels,
            rows_per_strip,
        })
    }

    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    pub fn channels(&self) -> u8 {
        self.channels
    }

    /// Decode the `w x h` window at (`x`, `y`) into a fresh buffer.
    pub fn read_window(&mut self, x: u32, y: u32, w: u32, h: u32) -> Result<PixelBuffer> {
        if x + w > self.width || y + h > self.height {
            bail!(
                "window {}x{}+{}+{} exceeds raster {}x{} in {}",
                w,
                h,
                x,
                y,
                self.width,
                self.height,
                self.path.display()
            );
        }

        let ch = self.channels as usize;
        let mut out = PixelBuffer::zeroed(w, h, self.channels);
        let out_stride = w as usize * ch;
        let src_stride = self.width as usize * ch;

        let first_strip = y / self.rows_per_strip;
        let last_strip = (y + h - 1) / self.rows_per_strip;

        for strip in first_strip..=last_strip {
            let data = match self.decoder.read_chunk(strip)? {
                DecodingResult::U8(v) => v,
                _ => bail!("unexpected non-8-bit strip data in {}", self.path.display()),
            };

            let strip_top = strip * self.rows_per_strip;
            let strip_rows = self.rows_per_strip.min(self.height - strip_top);
            let expected = strip_rows as usize * src_stride;
            if data.len() < expected {
                bail!(
                    "truncated strip {} in {} ({} bytes, expected {})",
                    strip,
                    self.path.display(),
                    data.len(),
                    expected
                );
            }

            let row_start = y.max(strip_top);
            let row_end = (y + h).min(strip_top + strip_rows);
            for row in row_start..row_end {
                let src_off = (row - strip_top) as usize * src_stride + x as usize * ch;
                let dst_off = (row - y) as usize * out_stride;
                out.data[dst_off..dst_off + out_stride]
                    .copy_from_slice(&data[src_off..src_off + out_stride]);
            }
        }

        Ok(out)
    }

    /// Decode the full raster. Callers are responsible for checking the
    /// decode ceiling first.
    pub fn read_all(&mut self) -> Result<PixelBuffer> {
        self.read_window(0, 0, self.width, self.height)
    }
}
