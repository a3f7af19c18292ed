//! Raster tiling engine.
//!
//! Cuts large georeferenced rasters into fixed-size, optionally overlapping
//! tiles named after their geographic bounds. Rasters too large to decode in
//! one piece are split into lossless chunk intermediates first and tiles are
//! stitched across chunk seams, byte-identical to a monolithic decode.

pub mod chunk;
pub mod compose;
pub mod config;
pub mod geo;
pub mod grid;
pub mod pipeline;
pub mod raster;

pub use config::Config;
pub use pipeline::{ExecutionEngine, RunStats};

use anyhow::{bail, Context, Result};
use std::path::{Path, PathBuf};
use tracing::{error, info};

/// Initialize the global Rayon thread pool.
pub fn init_rayon(num_threads: Option<usize>) -> Result<()> {
    let mut builder = rayon::ThreadPoolBuilder::new();
    if let Some(n) = num_threads {
        builder = builder.num_threads(n);
    }
    builder
        .build_global()
        .context("failed to initialize rayon thread pool")
}

/// Rasters a run covers: a single file, or every TIFF directly inside a
/// directory, in name order.
pub fn collect_rasters(path: &Path) -> Result<Vec<PathBuf>> {
    if path.is_file() {
        return Ok(vec![path.to_path_buf()]);
    }
    if !path.is_dir() {
        bail!("input path {} does not exist", path.display());
    }

    let mut rasters: Vec<PathBuf> = std::fs::read_dir(path)
        .with_context(|| format!("failed to read input directory {}", path.display()))?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|p| {
            p.is_file()
                && p.extension()
                    .and_then(|e| e.to_str())
                    .map(|e| e.eq_ignore_ascii_case("tif") || e.eq_ignore_ascii_case("tiff"))
                    .unwrap_or(false)
        })
        .collect();
    rasters.sort();
    Ok(rasters)
}

/// Tile every raster the configuration covers. A raster that fails is logged
/// and the batch continues; the run fails at the end if any raster did.
pub fn run(config: &Config) -> Result<RunStats> {
    config.validate()?;

    let rasters = collect_rasters(&config.input.path)?;
    if rasters.is_empty() {
        bail!("no rasters found under {}", config.input.path.display());
    }
    info!(count = rasters.len(), "starting tiling run");

    let engine = ExecutionEngine::new(config);
    let mut total = RunStats::default();
    let mut failures = 0usize;

    for raster in &rasters {
        match engine.process_raster(raster) {
            Ok(stats) => total.merge(&stats),
            Err(err) => {
                error!(raster = %raster.display(), error = format!("{err:#}"), "raster failed");
                failures += 1;
            }
        }
    }

    info!(%total, "tiling run finished");
    if failures > 0 {
        bail!("{} of {} rasters failed", failures, rasters.len());
    }
    Ok(total)
}
