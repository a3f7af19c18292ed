//! Run orchestration: chunk caching, tile composition, statistics.

mod cache;
mod engine;
mod stats;

pub use cache::{ChunkCache, ChunkSource};
pub use engine::ExecutionEngine;
pub use stats::RunStats;
