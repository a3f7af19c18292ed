//! Split an oversized raster into a regular grid of decodable chunks.
//!
//! Chunk sides are chosen at most `floor(sqrt(ceiling))` pixels, so any chunk
//! decodes within the pixel ceiling, and at least one tile extent, so any tile
//! overlaps at most a 2x2 block of chunks. Sides shrink in fixed decrements
//! until the trailing remainder chunk on each axis is either absent or itself
//! at least a tile extent wide.

use crate::grid::TileSpec;
use crate::raster::{write_image_atomic, RasterReader};
use anyhow::{bail, Context, Result};
use image::ImageFormat;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Largest pixel count decoded in one piece. Twice the common library default
/// for decompression-bomb protection; anything above it gets decomposed.
pub const DECODE_PIXEL_CEILING: u64 = 357_913_940;

/// Granularity of chunk side adjustment.
pub const CHUNK_SIDE_STEP: u32 = 256;

/// One chunk's grid position and pixel rectangle (end-exclusive).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkDescriptor {
    pub row: u32,
    pub col: u32,
    pub start_x: u32,
    pub start_y: u32,
    pub end_x: u32,
    pub end_y: u32,
}

impl ChunkDescriptor {
    pub fn width(&self) -> u32 {
        self.end_x - self.start_x
    }

    pub fn height(&self) -> u32 {
        self.end_y - self.start_y
    }
}

/// Regular chunk grid over a raster. All chunks share the nominal side
/// lengths except the last row and column, which absorb the remainders.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkGrid {
    pub raster_w: u32,
    pub raster_h: u32,
    pub chunk_w: u32,
    pub chunk_h: u32,
    pub cols: u32,
    pub rows: u32,
}

impl ChunkGrid {
    /// Decide whether a raster needs decomposition and size the grid if so.
    /// Returns `None` when the raster decodes whole within `ceiling`.
    pub fn build(
        raster_w: u32,
        raster_h: u32,
        spec: &TileSpec,
        ceiling: u64,
    ) -> Result<Option<Self>> {
        if raster_w as u64 * raster_h as u64 <= ceiling {
            return Ok(None);
        }

        let max_side = (ceiling as f64).sqrt().floor() as u32;
        let chunk_w = fit_axis(raster_w, spec.width, max_side)?;
        let chunk_h = fit_axis(raster_h, spec.height, max_side)?;

        Ok(Some(Self {
            raster_w,
            raster_h,
            chunk_w,
            chunk_h,
            cols: raster_w.div_ceil(chunk_w),
            rows: raster_h.div_ceil(chunk_h),
        }))
    }

    /// Trivial one-chunk grid covering the whole raster, for rasters that
    /// decode in one piece.
    pub fn single(raster_w: u32, raster_h: u32) -> Self {
        Self {
            raster_w,
            raster_h,
            chunk_w: raster_w,
            chunk_h: raster_h,
            cols: 1,
            rows: 1,
        }
    }

    pub fn chunk_count(&self) -> usize {
        self.cols as usize * self.rows as usize
    }

    pub fn descriptor(&self, row: u32, col: u32) -> ChunkDescriptor {
        let start_x = col * self.chunk_w;
        let start_y = row * self.chunk_h;
        ChunkDescriptor {
            row,
            col,
            start_x,
            start_y,
            end_x: (start_x + self.chunk_w).min(self.raster_w),
            end_y: (start_y + self.chunk_h).min(self.raster_h),
        }
    }

    /// Iterate chunks in row-major order.
    pub fn iter(&self) -> impl Iterator<Item = ChunkDescriptor> + '_ {
        (0..self.rows).flat_map(move |row| (0..self.cols).map(move |col| self.descriptor(row, col)))
    }
}

/// Pick the chunk extent for one axis. Starts from the decode-limit side and
/// steps down until the trailing remainder is empty or at least one tile
/// extent, keeping every chunk tile-sized or larger.
fn fit_axis(extent: u32, tile_extent: u32, max_side: u32) -> Result<u32> {
    let mut side = max_side.min(extent);
    while side >= tile_extent {
        let rem = extent % side;
        if rem == 0 || rem >= tile_extent {
            return Ok(side);
        }
        if side < tile_extent + CHUNK_SIDE_STEP {
            break;
        }
        side -= CHUNK_SIDE_STEP;
    }
    bail!(
        "cannot split extent {} into chunks of at least {} pixels; \
         lower the tile extent or raise the decode ceiling",
        extent,
        tile_extent
    )
}

/// On-disk name of one chunk's intermediate file.
pub fn chunk_path(dir: &Path, row: u32, col: u32) -> PathBuf {
    dir.join(format!("chunk_r{:03}_c{:03}.png", row, col))
}

/// Decode every chunk window and write it under `dir` as a lossless
/// intermediate. Chunks already on disk are kept, so an interrupted run
/// resumes where it stopped. Returns the number of chunks written.
pub fn carve_chunks(reader: &mut RasterReader, grid: &ChunkGrid, dir: &Path) -> Result<usize> {
    std::fs::create_dir_all(dir)
        .with_context(|| format!("failed to create chunk directory {}", dir.display()))?;

    let mut written = 0usize;
    for chunk in grid.iter() {
        let path = chunk_path(dir, chunk.row, chunk.col);
        if path.exists() {
            debug!(path = %path.display(), "chunk already carved, skipping");
            continue;
        }
        let buf = reader.read_window(chunk.start_x, chunk.start_y, chunk.width(), chunk.height())?;
        write_image_atomic(&path, &buf, ImageFormat::Png)?;
        written += 1;
    }
    info!(
        chunks = grid.chunk_count(),
        written, "carved chunk intermediates"
    );
    Ok(written)
}
