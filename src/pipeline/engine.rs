//! End-to-end processing of one raster: plan, decompose, classify, compose.

use crate::chunk::{carve_chunks, classify, ChunkGrid, ChunkId, SpanAssignment};
use crate::compose::{ComposeOutcome, Compositor};
use crate::config::Config;
use crate::geo::GeoTransform;
use crate::grid::{self, raster_date, TileLocator};
use crate::pipeline::{ChunkCache, ChunkSource, RunStats};
use crate::raster::{PixelBuffer, RasterReader};
use anyhow::{anyhow, Context, Result};
use rayon::prelude::*;
use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info};

pub struct ExecutionEngine<'a> {
    config: &'a Config,
}

impl<'a> ExecutionEngine<'a> {
    pub fn new(config: &'a Config) -> Self {
        Self { config }
    }

    /// Tile one raster. Already-written tiles are kept, so re-running after
    /// an interruption finishes the remainder without recomposing anything.
    pub fn process_raster(&self, path: &Path) -> Result<RunStats> {
        let start = Instant::now();

        let mut reader = RasterReader::open(path)?;
        let (raster_w, raster_h) = reader.dimensions();
        let channels = reader.channels();

        let date = match &self.config.input.date {
            Some(date) => date.clone(),
            None => raster_date(path)?,
        };
        let geo = GeoTransform::from_sidecar(path)?;

        let plan = grid::plan(raster_w, raster_h, &self.config.tiling)?;
        let locator = TileLocator::new(
            geo,
            self.config.tiling,
            &self.config.output.root,
            &date,
            self.config.output.format.extension(),
        );

        let mut stats = RunStats {
            tiles_planned: plan.tile_count(),
            ..Default::default()
        };

        let mut pending = Vec::new();
        for origin in plan.iter() {
            let tile = locator.locate(origin)?;
            if tile.output_path.exists() {
                debug!(path = %tile.output_path.display(), "tile already written, skipping");
                stats.tiles_skipped += 1;
            } else {
                pending.push(tile);
            }
        }

        let chunk_dir = self.chunk_dir(path, raster_w, raster_h);
        if pending.is_empty() {
            // A leftover chunk directory from an interrupted run is stale
            // once every tile exists
            if chunk_dir.exists() {
                std::fs::remove_dir_all(&chunk_dir)?;
            }
            stats.elapsed = start.elapsed();
            info!(raster = %path.display(), "all tiles already written");
            return Ok(stats);
        }

        let built = ChunkGrid::build(
            raster_w,
            raster_h,
            &self.config.tiling,
            self.config.processing.decode_pixel_ceiling,
        )?;

        let (chunk_grid, source) = match built {
            Some(chunk_grid) => {
                info!(
                    raster = %path.display(),
                    chunks = chunk_grid.chunk_count(),
                    chunk_w = chunk_grid.chunk_w,
                    chunk_h = chunk_grid.chunk_h,
                    "raster exceeds decode ceiling, carving chunks"
                );
                carve_chunks(&mut reader, &chunk_grid, &chunk_dir)?;
                (chunk_grid, ChunkSource::Directory(chunk_dir.clone()))
            }
            None => {
                let whole = Arc::new(reader.read_all()?);
                (
                    ChunkGrid::single(raster_w, raster_h),
                    ChunkSource::Whole(whole),
                )
            }
        };
        let decomposed = matches!(source, ChunkSource::Directory(_));

        let assignments = classify(pending, &chunk_grid, &self.config.tiling)?;

        // Group tiles by the chunk set they read; groups run in a stable
        // order so memory peaks at one group's chunks
        let mut groups: BTreeMap<Vec<ChunkId>, Vec<SpanAssignment>> = BTreeMap::new();
        for assignment in assignments {
            groups
                .entry(assignment.chunks())
                .or_default()
                .push(assignment);
        }

        let mut cache = ChunkCache::new(source, groups.values().flatten());
        let compositor = Compositor::new(
            self.config.tiling,
            chunk_grid,
            channels,
            self.config.output.format,
        );

        for (chunk_ids, group) in &groups {
            let loaded: HashMap<ChunkId, Arc<PixelBuffer>> = chunk_ids
                .iter()
                .map(|&id| Ok((id, cache.ensure(id)?)))
                .collect::<Result<_>>()?;
            let fetch = |id: ChunkId| {
                loaded
                    .get(&id)
                    .cloned()
                    .ok_or_else(|| anyhow!("chunk ({}, {}) not loaded for its group", id.0, id.1))
            };

            let outcomes: Vec<ComposeOutcome> = if self.config.processing.parallel {
                group
                    .par_iter()
                    .map(|assignment| compositor.compose(assignment, fetch))
                    .collect::<Result<_>>()?
            } else {
                group
                    .iter()
                    .map(|assignment| compositor.compose(assignment, fetch))
                    .collect::<Result<_>>()?
            };

            for outcome in outcomes {
                match outcome {
                    ComposeOutcome::Written => stats.tiles_written += 1,
                    ComposeOutcome::Noop => stats.tiles_dropped += 1,
                }
            }
            for assignment in group {
                cache.release(&assignment.chunks());
            }
        }

        stats.chunks_decoded = cache.decoded();

        // Intermediates are only safe to drop once every tile that reads
        // them has been composed
        if decomposed {
            std::fs::remove_dir_all(&chunk_dir)
                .with_context(|| format!("failed to remove {}", chunk_dir.display()))?;
        }

        stats.elapsed = start.elapsed();
        info!(raster = %path.display(), %stats, "raster tiled");
        Ok(stats)
    }

    // Keyed by the raster's own name: two products captured on the same date
    // share dimensions, and their intermediates must never be confused
    fn chunk_dir(&self, raster: &Path, raster_w: u32, raster_h: u32) -> PathBuf {
        let stem = raster.file_stem().unwrap_or_default().to_string_lossy();
        self.config
            .output
            .root
            .join(format!(".chunks-{}-{}x{}", stem, raster_w, raster_h))
    }
}
