//! Classify which chunks each planned tile draws from.
//!
//! Chunk sides are at least one tile extent, so a tile's pixel footprint
//! intersects one chunk, a horizontal or vertical pair, or a 2x2 quad. The
//! footprint is clamped to the raster first: a padded tile's zero-filled
//! region past the edge belongs to no chunk.

use crate::chunk::ChunkGrid;
use crate::grid::{TileDescriptor, TileSpec};
use anyhow::{bail, Result};

/// Chunk grid coordinate, `(row, col)`.
pub type ChunkId = (u32, u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Axis {
    Horizontal,
    Vertical,
}

/// A tile together with the chunks that cover its footprint.
#[derive(Debug, Clone)]
pub enum SpanAssignment {
    Single {
        chunk: ChunkId,
        tile: TileDescriptor,
    },
    Pair {
        first: ChunkId,
        second: ChunkId,
        axis: Axis,
        tile: TileDescriptor,
    },
    Quad {
        top_left: ChunkId,
        top_right: ChunkId,
        bottom_left: ChunkId,
        bottom_right: ChunkId,
        tile: TileDescriptor,
    },
}

impl SpanAssignment {
    pub fn tile(&self) -> &TileDescriptor {
        match self {
            SpanAssignment::Single { tile, .. } => tile,
            SpanAssignment::Pair { tile, .. } => tile,
            SpanAssignment::Quad { tile, .. } => tile,
        }
    }

    /// Chunks this tile reads, in row-major order.
    pub fn chunks(&self) -> Vec<ChunkId> {
        match *self {
            SpanAssignment::Single { chunk, .. } => vec![chunk],
            SpanAssignment::Pair { first, second, .. } => vec![first, second],
            SpanAssignment::Quad {
                top_left,
                top_right,
                bottom_left,
                bottom_right,
                ..
            } => vec![top_left, top_right, bottom_left, bottom_right],
        }
    }
}

/// Assign every tile to the chunks covering it.
pub fn classify(
    tiles: Vec<TileDescriptor>,
    grid: &ChunkGrid,
    spec: &TileSpec,
) -> Result<Vec<SpanAssignment>> {
    tiles
        .into_iter()
        .map(|tile| classify_one(tile, grid, spec))
        .collect()
}

fn classify_one(
    tile: TileDescriptor,
    grid: &ChunkGrid,
    spec: &TileSpec,
) -> Result<SpanAssignment> {
    // Clamp the footprint to the raster; padded tiles read nothing past it
    let end_x = (tile.x + spec.width).min(grid.raster_w);
    let end_y = (tile.y + spec.height).min(grid.raster_h);
    if end_x <= tile.x || end_y <= tile.y {
        bail!(
            "tile at ({}, {}) lies outside the {}x{} raster",
            tile.x,
            tile.y,
            grid.raster_w,
            grid.raster_h
        );
    }

    let col_a = tile.x / grid.chunk_w;
    let col_b = (end_x - 1) / grid.chunk_w;
    let row_a = tile.y / grid.chunk_h;
    let row_b = (end_y - 1) / grid.chunk_h;

    Ok(match (col_b - col_a, row_b - row_a) {
        (0, 0) => SpanAssignment::Single {
            chunk: (row_a, col_a),
            tile,
        },
        (1, 0) => SpanAssignment::Pair {
            first: (row_a, col_a),
            second: (row_a, col_b),
            axis: Axis::Horizontal,
            tile,
        },
        (0, 1) => SpanAssignment::Pair {
            first: (row_a, col_a),
            second: (row_b, col_a),
            axis: Axis::Vertical,
            tile,
        },
        (1, 1) => SpanAssignment::Quad {
            top_left: (row_a, col_a),
            top_right: (row_a, col_b),
            bottom_left: (row_b, col_a),
            bottom_right: (row_b, col_b),
            tile,
        },
        (dc, dr) => bail!(
            "tile at ({}, {}) spans {}x{} chunks; chunk sizing must keep \
             chunks at least one tile extent",
            tile.x,
            tile.y,
            dc + 1,
            dr + 1
        ),
    })
}
