//! Assemble output tiles by blitting from chunk buffers.
//!
//! Every tile is built the same way regardless of how many chunks cover it:
//! start from a zero-filled buffer of the nominal tile size, then blit the
//! intersection of the tile's clamped footprint with each covering chunk.
//! Padded edge tiles keep their zeros wherever no chunk reaches.

use crate::chunk::{ChunkGrid, ChunkId, SpanAssignment};
use crate::grid::TileSpec;
use crate::raster::{write_image_atomic, PixelBuffer, TileFormat};
use anyhow::{bail, Result};
use std::sync::Arc;
use tracing::error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComposeOutcome {
    /// Tile written to its output path
    Written,

    /// Assignment had no pixels to draw; nothing written
    Noop,
}

/// Stateless tile assembler for one raster.
pub struct Compositor {
    spec: TileSpec,
    grid: ChunkGrid,
    channels: u8,
    format: TileFormat,
}

impl Compositor {
    pub fn new(spec: TileSpec, grid: ChunkGrid, channels: u8, format: TileFormat) -> Self {
        Self {
            spec,
            grid,
            channels,
            format,
        }
    }

    /// Build and write one tile. `fetch` supplies the decoded buffer for a
    /// chunk; it is called once per covering chunk.
    pub fn compose<F>(&self, assignment: &SpanAssignment, mut fetch: F) -> Result<ComposeOutcome>
    where
        F: FnMut(ChunkId) -> Result<Arc<PixelBuffer>>,
    {
        let tile = assignment.tile();
        let end_x = (tile.x + self.spec.width).min(self.grid.raster_w);
        let end_y = (tile.y + self.spec.height).min(self.grid.raster_h);

        let mut out = PixelBuffer::zeroed(self.spec.width, self.spec.height, self.channels);
        for id in assignment.chunks() {
            let chunk = self.grid.descriptor(id.0, id.1);

            let ix0 = tile.x.max(chunk.start_x);
            let iy0 = tile.y.max(chunk.start_y);
            let ix1 = end_x.min(chunk.end_x);
            let iy1 = end_y.min(chunk.end_y);
            if ix1 <= ix0 || iy1 <= iy0 {
                // Classification should never hand us a chunk the tile does
                // not touch; drop the tile rather than write garbage.
                error!(
                    tile_x = tile.x,
                    tile_y = tile.y,
                    chunk_row = id.0,
                    chunk_col = id.1,
                    "tile does not intersect its assigned chunk, skipping tile"
                );
                return Ok(ComposeOutcome::Noop);
            }

            let buf = fetch(id)?;
            if buf.width != chunk.width() || buf.height != chunk.height() {
                bail!(
                    "chunk ({}, {}) decoded as {}x{}, expected {}x{}",
                    id.0,
                    id.1,
                    buf.width,
                    buf.height,
                    chunk.width(),
                    chunk.height()
                );
            }

            out.blit(
                ix0 - tile.x,
                iy0 - tile.y,
                &buf,
                ix0 - chunk.start_x,
                iy0 - chunk.start_y,
                ix1 - ix0,
                iy1 - iy0,
            );
        }

        write_image_atomic(&tile.output_path, &out, self.format.image_format())?;
        Ok(ComposeOutcome::Written)
    }
}
