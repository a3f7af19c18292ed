//! Tile grid planning.
//!
//! A plan is the cross product of two independent axis walks. Each axis
//! advances by a fixed integer step derived from the tile extent and overlap
//! fraction, and the configured boundary policy decides what happens to the
//! final partial tile.

use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};

/// What to do with the final tile on an axis when it would extend past the
/// raster edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum BoundaryPolicy {
    /// Pull the last origin back so the tile ends flush with the edge. The
    /// last tile overlaps its neighbor more than the configured fraction.
    ShiftToFit,

    /// Keep the stepped origin and zero-fill the region past the edge.
    PadIncomplete,

    /// Drop the partial tile; the edge region is not covered.
    DiscardIncomplete,
}

impl Default for BoundaryPolicy {
    fn default() -> Self {
        BoundaryPolicy::ShiftToFit
    }
}

/// Tile dimensions and stepping parameters for one run.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct TileSpec {
    pub width: u32,
    pub height: u32,

    /// Fraction of each tile shared with its neighbor, `0.0 <= overlap < 1.0`
    #[serde(default)]
    pub overlap: f64,

    #[serde(default)]
    pub boundary: BoundaryPolicy,
}

impl TileSpec {
    /// Horizontal distance between consecutive tile origins.
    pub fn step_x(&self) -> u32 {
        (self.width as f64 * (1.0 - self.overlap)).floor() as u32
    }

    /// Vertical distance between consecutive tile origins.
    pub fn step_y(&self) -> u32 {
        (self.height as f64 * (1.0 - self.overlap)).floor() as u32
    }

    pub fn validate(&self) -> Result<()> {
        if self.width == 0 || self.height == 0 {
            bail!("tile dimensions must be positive, got {}x{}", self.width, self.height);
        }
        if !(0.0..1.0).contains(&self.overlap) {
            bail!("overlap must be in [0, 1), got {}", self.overlap);
        }
        if self.step_x() == 0 || self.step_y() == 0 {
            bail!(
                "overlap {} leaves a zero step for {}x{} tiles",
                self.overlap,
                self.width,
                self.height
            );
        }
        Ok(())
    }
}

/// Origin of one planned tile. The last-in-axis flags mark tiles that were
/// shifted or padded at the raster edge; flush-fitting final tiles are not
/// flagged.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TileOrigin {
    pub x: u32,
    pub y: u32,
    pub is_last_col: bool,
    pub is_last_row: bool,
}

/// The planned grid for one raster: per-axis origin lists whose cross product
/// is the tile set.
#[derive(Debug, Clone)]
pub struct GridPlan {
    cols: Vec<(u32, bool)>,
    rows: Vec<(u32, bool)>,
}

impl GridPlan {
    pub fn cols(&self) -> usize {
        self.cols.len()
    }

    pub fn rows(&self) -> usize {
        self.rows.len()
    }

    pub fn tile_count(&self) -> usize {
        self.cols.len() * self.rows.len()
    }

    /// Iterate tiles in row-major order (left to right, top to bottom).
    pub fn iter(&self) -> impl Iterator<Item = TileOrigin> + '_ {
        self.rows.iter().flat_map(move |&(y, last_row)| {
            self.cols.iter().map(move |&(x, last_col)| TileOrigin {
                x,
                y,
                is_last_col: last_col,
                is_last_row: last_row,
            })
        })
    }
}

/// Walk one axis, emitting each origin with a flag for the clamped or padded
/// final position.
fn axis_positions(extent: u32, tile: u32, step: u32, policy: BoundaryPolicy) -> Vec<(u32, bool)> {
    let mut out = Vec::new();
    let mut p = 0u32;
    loop {
        let rem = extent - p;
        if rem > tile {
            out.push((p, false));
            p += step;
            continue;
        }
        if rem == tile {
            // Flush fit, no boundary handling needed
            out.push((p, false));
        } else {
            match policy {
                BoundaryPolicy::ShiftToFit => out.push((extent - tile, true)),
                BoundaryPolicy::PadIncomplete => out.push((p, true)),
                BoundaryPolicy::DiscardIncomplete => {}
            }
        }
        return out;
    }
}

/// Closed-form tile count for one axis; must agree with `axis_positions`.
#[cfg(test)]
fn axis_count(extent: u32, tile: u32, step: u32, policy: BoundaryPolicy) -> usize {
    let a = (extent - tile) as usize;
    let s = step as usize;
    match policy {
        BoundaryPolicy::DiscardIncomplete => a / s + 1,
        BoundaryPolicy::ShiftToFit | BoundaryPolicy::PadIncomplete => a.div_ceil(s) + 1,
    }
}

/// Plan the tile grid for a raster.
pub fn plan(raster_w: u32, raster_h: u32, spec: &TileSpec) -> Result<GridPlan> {
    spec.validate()?;
    if spec.width > raster_w || spec.height > raster_h {
        bail!(
            "tile {}x{} exceeds raster {}x{}",
            spec.width,
            spec.height,
            raster_w,
            raster_h
        );
    }

    Ok(GridPlan {
        cols: axis_positions(raster_w, spec.width, spec.step_x(), spec.boundary),
        rows: axis_positions(raster_h, spec.height, spec.step_y(), spec.boundary),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spec(width: u32, height: u32, overlap: f64, boundary: BoundaryPolicy) -> TileSpec {
        TileSpec {
            width,
            height,
            overlap,
            boundary,
        }
    }

    #[test]
    fn test_shift_clamps_last_origin() {
        let p = plan(1000, 1000, &spec(512, 512, 0.0, BoundaryPolicy::ShiftToFit)).unwrap();
        assert_eq!((p.cols(), p.rows()), (2, 2));
        let tiles: Vec<_> = p.iter().collect();
        assert_eq!(tiles[0], TileOrigin { x: 0, y: 0, is_last_col: false, is_last_row: false });
        assert_eq!(tiles[1], TileOrigin { x: 488, y: 0, is_last_col: true, is_last_row: false });
        assert_eq!(tiles[3], TileOrigin { x: 488, y: 488, is_last_col: true, is_last_row: true });
    }

    #[test]
    fn test_pad_keeps_stepped_origin() {
        let p = plan(1000, 1000, &spec(512, 512, 0.0, BoundaryPolicy::PadIncomplete)).unwrap();
        assert_eq!(p.tile_count(), 4);
        let last = p.iter().last().unwrap();
        assert_eq!((last.x, last.y), (512, 512));
        assert!(last.is_last_col && last.is_last_row);
    }

    #[test]
    fn test_discard_drops_partial() {
        let p = plan(1000, 1000, &spec(512, 512, 0.0, BoundaryPolicy::DiscardIncomplete)).unwrap();
        assert_eq!(p.tile_count(), 1);
        let only = p.iter().next().unwrap();
        assert_eq!((only.x, only.y), (0, 0));
        assert!(!only.is_last_col && !only.is_last_row);
    }

    #[test]
    fn test_flush_fit_is_unflagged() {
        let p = plan(1024, 1024, &spec(512, 512, 0.0, BoundaryPolicy::ShiftToFit)).unwrap();
        assert_eq!(p.tile_count(), 4);
        assert!(p.iter().all(|t| !t.is_last_col && !t.is_last_row));
    }

    #[test]
    fn test_single_tile_exact_fit() {
        let p = plan(512, 512, &spec(512, 512, 0.0, BoundaryPolicy::DiscardIncomplete)).unwrap();
        assert_eq!(p.tile_count(), 1);
    }

    #[test]
    fn test_overlap_halves_step() {
        let s = spec(512, 512, 0.5, BoundaryPolicy::ShiftToFit);
        assert_eq!(s.step_x(), 256);
        let p = plan(1024, 512, &s).unwrap();
        // Columns at 0, 256, 512 (flush fit)
        let xs: Vec<u32> = p.iter().map(|t| t.x).collect();
        assert_eq!(xs, vec![0, 256, 512]);
    }

    #[test]
    fn test_counts_match_walk() {
        let extents = [500u32, 512, 777, 1000, 1024, 2000, 4999];
        let tiles = [100u32, 256, 512];
        let overlaps = [0.0, 0.1, 0.25, 0.5, 0.75];
        let policies = [
            BoundaryPolicy::ShiftToFit,
            BoundaryPolicy::PadIncomplete,
            BoundaryPolicy::DiscardIncomplete,
        ];
        for &extent in &extents {
            for &tile in &tiles {
                if tile > extent {
                    continue;
                }
                for &overlap in &overlaps {
                    let step = (tile as f64 * (1.0 - overlap)).floor() as u32;
                    if step == 0 {
                        continue;
                    }
                    for &policy in &policies {
                        let walked = axis_positions(extent, tile, step, policy).len();
                        let counted = axis_count(extent, tile, step, policy);
                        assert_eq!(
                            walked, counted,
                            "extent={} tile={} step={} policy={:?}",
                            extent, tile, step, policy
                        );
                    }
                }
            }
        }
    }

    #[test]
    fn test_non_square_tiles() {
        let p = plan(1000, 600, &spec(300, 200, 0.0, BoundaryPolicy::PadIncomplete)).unwrap();
        // 1000/300: origins 0, 300, 600, 900 (padded); 600/200: 0, 200, 400 flush
        assert_eq!((p.cols(), p.rows()), (4, 3));
        let last = p.iter().last().unwrap();
        assert!(last.is_last_col);
        assert!(!last.is_last_row);
    }

    #[test]
    fn test_tile_larger_than_raster_is_error() {
        assert!(plan(400, 400, &spec(512, 512, 0.0, BoundaryPolicy::ShiftToFit)).is_err());
    }

    #[test]
    fn test_invalid_overlap_is_error() {
        assert!(spec(512, 512, 1.0, BoundaryPolicy::ShiftToFit).validate().is_err());
        assert!(spec(512, 512, -0.1, BoundaryPolicy::ShiftToFit).validate().is_err());
    }
}
