//! Reference-counted cache of decoded chunk buffers.
//!
//! Each chunk is decoded at most once per run. The engine loads a chunk
//! before any tile reading it is composed and releases one reference per
//! composed tile; the buffer is dropped when its last tile finishes, keeping
//! resident memory proportional to one composite group rather than the whole
//! grid.

use crate::chunk::{chunk_path, ChunkId, SpanAssignment};
use crate::raster::{read_image, PixelBuffer};
use anyhow::{bail, Result};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::trace;

/// Where chunk pixels come from.
pub enum ChunkSource {
    /// Carved intermediates on disk, one PNG per chunk
    Directory(PathBuf),

    /// The whole raster decoded in one piece, served as chunk (0, 0)
    Whole(Arc<PixelBuffer>),
}

pub struct ChunkCache {
    source: ChunkSource,
    buffers: HashMap<ChunkId, Arc<PixelBuffer>>,
    remaining: HashMap<ChunkId, usize>,
    decoded: usize,
}

impl ChunkCache {
    /// Build a cache whose reference counts cover every chunk use in
    /// `assignments`.
    pub fn new<'a>(
        source: ChunkSource,
        assignments: impl IntoIterator<Item = &'a SpanAssignment>,
    ) -> Self {
        let mut remaining: HashMap<ChunkId, usize> = HashMap::new();
        for assignment in assignments {
            for id in assignment.chunks() {
                *remaining.entry(id).or_insert(0) += 1;
            }
        }
        Self {
            source,
            buffers: HashMap::new(),
            remaining,
            decoded: 0,
        }
    }

    /// Number of decode events so far.
    pub fn decoded(&self) -> usize {
        self.decoded
    }

    /// Load a chunk buffer if it is not resident yet and return it.
    pub fn ensure(&mut self, id: ChunkId) -> Result<Arc<PixelBuffer>> {
        if let Some(buf) = self.buffers.get(&id) {
            return Ok(buf.clone());
        }
        if !self.remaining.contains_key(&id) {
            bail!("chunk ({}, {}) is not used by any remaining tile", id.0, id.1);
        }

        let buf = match &self.source {
            ChunkSource::Directory(dir) => Arc::new(read_image(&chunk_path(dir, id.0, id.1))?),
            ChunkSource::Whole(buf) => {
                if id != (0, 0) {
                    bail!("whole-raster source only serves chunk (0, 0), got ({}, {})", id.0, id.1);
                }
                buf.clone()
            }
        };
        trace!(row = id.0, col = id.1, "chunk loaded");
        self.decoded += 1;
        self.buffers.insert(id, buf.clone());
        Ok(buf)
    }

    /// Release one reference per chunk of a composed tile, evicting buffers
    /// whose last tile is done.
    pub fn release(&mut self, ids: &[ChunkId]) {
        for id in ids {
            if let Some(count) = self.remaining.get_mut(id) {
                *count -= 1;
                if *count == 0 {
                    self.remaining.remove(id);
                    self.buffers.remove(id);
                    trace!(row = id.0, col = id.1, "chunk evicted");
                }
            }
        }
    }

    #[cfg(test)]
    fn resident(&self) -> usize {
        self.buffers.len()
    }
}
