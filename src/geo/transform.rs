//! Affine pixel-to-geographic transforms read from sidecar files.
//!
//! The fetch service deposits either a 6-value ESRI world file (`.tfw`) next
//! to a GeoTIFF, or a GDAL PAM auxiliary XML file (`<raster>.aux.xml`) with a
//! `<GeoTransform>` element. Both describe the same linear mapping
//! `geo = origin + pixel * scale` per axis; rotation terms are always zero for
//! the north-up rasters we consume and are ignored.

use anyhow::{bail, Context, Result};
use std::path::Path;

/// Linear affine mapping from pixel coordinates to geographic coordinates.
///
/// `y_size` is negative for north-up rasters: row 0 is the northern edge.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeoTransform {
    /// Geographic x of pixel column 0 (western edge)
    pub x_min: f64,

    /// Geographic width of one pixel
    pub x_size: f64,

    /// Geographic y of pixel row 0 (northern edge for north-up rasters)
    pub y_min: f64,

    /// Geographic height of one pixel (negative for north-up)
    pub y_size: f64,
}

/// Geographic bounding box of one tile, in the raster's CRS (degrees for the
/// rasters we consume).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TileBounds {
    pub south: f64,
    pub west: f64,
    pub north: f64,
    pub east: f64,
}

impl GeoTransform {
    /// Map a pixel coordinate to its geographic coordinate.
    pub fn pixel_to_geo(&self, px: f64, py: f64) -> (f64, f64) {
        (self.x_min + px * self.x_size, self.y_min + py * self.y_size)
    }

    /// Geographic bounding box of the `w x h` tile whose top-left pixel is
    /// (`x`, `y`). The box covers the tile's full nominal extent, including
    /// any zero-padded region past the raster edge.
    pub fn tile_bounds(&self, x: u32, y: u32, w: u32, h: u32) -> TileBounds {
        let (west, north) = self.pixel_to_geo(x as f64, y as f64);
        let (east, south) = self.pixel_to_geo((x + w) as f64, (y + h) as f64);
        TileBounds {
            south,
            west,
            north,
            east,
        }
    }

    /// Read the geotransform sidecar for a raster: `.tfw` for `.tif` inputs,
    /// `<raster>.aux.xml` otherwise.
    pub fn from_sidecar(raster_path: &Path) -> Result<Self> {
        let is_tiff = raster_path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.eq_ignore_ascii_case("tif") || e.eq_ignore_ascii_case("tiff"))
            .unwrap_or(false);

        if is_tiff {
            let world = raster_path.with_extension("tfw");
            Self::from_world_file(&world)
        } else {
            let mut name = raster_path.as_os_str().to_os_string();
            name.push(".aux.xml");
            Self::from_aux_xml(Path::new(&name))
        }
    }

    /// Parse a 6-line ESRI world file: x scale, two rotation terms, y scale,
    /// then the geographic coordinates of the top-left pixel.
    pub fn from_world_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("missing geotransform sidecar {}", path.display()))?;
        let values: Vec<f64> = content
            .lines()
            .map(|l| l.trim().parse::<f64>())
            .collect::<Result<_, _>>()
            .with_context(|| format!("malformed world file {}", path.display()))?;
        if values.len() < 6 {
            bail!(
                "malformed world file {} ({} lines, expected 6)",
                path.display(),
                values.len()
            );
        }
        Ok(Self {
            x_size: values[0],
            y_size: values[3],
            x_min: values[4],
            y_min: values[5],
        })
    }

    /// Parse the `<GeoTransform>` element of a GDAL auxiliary XML file:
    /// six comma-separated values `x_min, x_size, skew, y_min, skew, y_size`.
    pub fn from_aux_xml(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("missing geotransform sidecar {}", path.display()))?;
        let lower = content.to_ascii_lowercase();
        let start = lower
            .find("<geotransform>")
            .map(|i| i + "<geotransform>".len());
        let end = lower.find("</geotransform>");
        let (start, end) = match (start, end) {
            (Some(s), Some(e)) if s <= e => (s, e),
            _ => bail!("no <GeoTransform> element in {}", path.display()),
        };

        let values: Vec<f64> = content[start..end]
            .split(',')
            .map(|v| v.trim().parse::<f64>())
            .collect::<Result<_, _>>()
            .with_context(|| format!("malformed <GeoTransform> in {}", path.display()))?;
        if values.len() != 6 {
            bail!(
                "malformed <GeoTransform> in {} ({} values, expected 6)",
                path.display(),
                values.len()
            );
        }
        Ok(Self {
            x_min: values[0],
            x_size: values[1],
            y_min: values[3],
            y_size: values[5],
        })
    }
}
