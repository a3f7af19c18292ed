//! Chunk decomposition for rasters too large to decode whole.

mod classifier;
mod decomposer;

pub use classifier::{classify, Axis, ChunkId, SpanAssignment};
pub use decomposer::{
    carve_chunks, chunk_path, ChunkDescriptor, ChunkGrid, CHUNK_SIDE_STEP, DECODE_PIXEL_CEILING,
};
