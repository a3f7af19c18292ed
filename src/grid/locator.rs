//! Output placement: map planned tile origins to their destination paths.
//!
//! Tiles land under `<root>/<date>/<cell>/` where `<cell>` is the world-grid
//! shard containing the tile's south-west corner, and are named after their
//! geographic bounding box so a tile can be located without reading it.

use crate::geo::{GeoTransform, GridCell};
use crate::grid::{TileOrigin, TileSpec};
use anyhow::{bail, Context, Result};
use std::path::{Path, PathBuf};

/// A planned tile bound to its output location.
#[derive(Debug, Clone)]
pub struct TileDescriptor {
    pub x: u32,
    pub y: u32,
    pub is_last_col: bool,
    pub is_last_row: bool,
    pub output_path: PathBuf,
}

/// Computes output paths for one raster's tiles and creates shard directories
/// on first use.
pub struct TileLocator {
    geo: GeoTransform,
    spec: TileSpec,
    date: String,
    date_dir: PathBuf,
    extension: &'static str,
}

impl TileLocator {
    pub fn new(
        geo: GeoTransform,
        spec: TileSpec,
        output_root: &Path,
        date: &str,
        extension: &'static str,
    ) -> Self {
        Self {
            geo,
            spec,
            date: date.to_string(),
            date_dir: output_root.join(date),
            extension,
        }
    }

    /// Bind a planned origin to its destination path, creating the shard
    /// directory if needed.
    pub fn locate(&self, origin: TileOrigin) -> Result<TileDescriptor> {
        let bounds = self
            .geo
            .tile_bounds(origin.x, origin.y, self.spec.width, self.spec.height);
        let cell = GridCell::from_lat_lon(bounds.south, bounds.west);

        let shard_dir = self.date_dir.join(cell.to_string());
        std::fs::create_dir_all(&shard_dir)
            .with_context(|| format!("failed to create {}", shard_dir.display()))?;

        let name = format!(
            "{}_{:08.4},{:09.4},{:08.4},{:09.4}.{}",
            self.date, bounds.south, bounds.west, bounds.north, bounds.east, self.extension
        );

        Ok(TileDescriptor {
            x: origin.x,
            y: origin.y,
            is_last_col: origin.is_last_col,
            is_last_row: origin.is_last_row,
            output_path: shard_dir.join(name),
        })
    }
}

/// Capture date of a raster, taken from the trailing `_`-separated component
/// of its file stem. The fetch service names rasters `<product>_<date>.<ext>`.
pub fn raster_date(path: &Path) -> Result<String> {
    let stem = path
        .file_stem()
        .and_then(|s| s.to_str())
        .with_context(|| format!("raster path has no file stem: {}", path.display()))?;
    match stem.rsplit('_').next() {
        Some(date) if !date.is_empty() => Ok(date.to_string()),
        _ => bail!("cannot extract date from raster name {}", path.display()),
    }
}
