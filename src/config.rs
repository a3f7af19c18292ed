//! Configuration for the tiling engine.

use crate::chunk::DECODE_PIXEL_CEILING;
use crate::grid::TileSpec;
use crate::raster::TileFormat;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Main configuration for a tiling run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Input configuration
    pub input: InputConfig,

    /// Tile dimensions, overlap and boundary policy
    pub tiling: TileSpec,

    /// Output configuration
    pub output: OutputConfig,

    /// Processing configuration
    #[serde(default)]
    pub processing: ProcessingConfig,
}

/// Input raster configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InputConfig {
    /// A GeoTIFF file, or a directory whose `.tif` files are all processed
    pub path: PathBuf,

    /// Capture date override. When unset the date is taken from each raster's
    /// file name.
    #[serde(default)]
    pub date: Option<String>,
}

/// Output tile configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    /// Root directory for the date/cell tile tree
    pub root: PathBuf,

    /// Tile image format
    #[serde(default)]
    pub format: TileFormat,
}

/// Processing configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessingConfig {
    /// Compose tiles in parallel. Sequential runs produce byte-identical
    /// output and exist for debugging.
    #[serde(default = "default_true")]
    pub parallel: bool,

    /// Rayon thread pool size (null = num CPUs)
    #[serde(default)]
    pub threads: Option<usize>,

    /// Largest pixel count decoded in one piece; larger rasters are split
    /// into chunk intermediates first
    #[serde(default = "default_decode_pixel_ceiling")]
    pub decode_pixel_ceiling: u64,
}

impl Default for ProcessingConfig {
    fn default() -> Self {
        Self {
            parallel: true,
            threads: None,
            decode_pixel_ceiling: DECODE_PIXEL_CEILING,
        }
    }
}

impl Config {
    /// Load configuration from a YAML or JSON file.
    /// Format is auto-detected from file extension (.yaml, .yml, or .json).
    pub fn from_file(path: &PathBuf) -> anyhow::Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");

        let config: Config = match ext {
            "yaml" | "yml" => serde_yaml::from_str(&contents)?,
            "json" => serde_json::from_str(&contents)?,
            _ => {
                // Try YAML first (it's a superset of JSON)
                serde_yaml::from_str(&contents)?
            }
        };
        Ok(config)
    }

    /// Load configuration from a YAML string.
    pub fn from_yaml(yaml: &str) -> anyhow::Result<Self> {
        let config: Config = serde_yaml::from_str(yaml)?;
        Ok(config)
    }

    /// Serialize configuration to YAML.
    pub fn to_yaml(&self) -> anyhow::Result<String> {
        Ok(serde_yaml::to_string(self)?)
    }

    /// Validate the configuration.
    pub fn validate(&self) -> anyhow::Result<()> {
        self.tiling.validate()?;

        if self.output.root.as_os_str().is_empty() {
            anyhow::bail!("Output root must not be empty");
        }
        if self.processing.decode_pixel_ceiling == 0 {
            anyhow::bail!("Decode pixel ceiling must be > 0");
        }

        // Chunk sides must fit at least one tile, or oversized rasters can
        // never be decomposed
        let max_side = (self.processing.decode_pixel_ceiling as f64).sqrt().floor() as u32;
        if max_side < self.tiling.width.max(self.tiling.height) {
            anyhow::bail!(
                "Decode pixel ceiling {} is too small for {}x{} tiles",
                self.processing.decode_pixel_ceiling,
                self.tiling.width,
                self.tiling.height
            );
        }
        Ok(())
    }
}

// Default value functions for serde
fn default_true() -> bool {
    true
}
fn default_decode_pixel_ceiling() -> u64 {
    DECODE_PIXEL_CEILING
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::BoundaryPolicy;

    fn minimal_yaml() -> &'static str {
        r#"
input:
  path: /data/rasters
tiling:
  width: 512
  height: 512
output:
  root: /data/tiles
"#
    }

    #[test]
    fn test_minimal_yaml_applies_defaults() {
        let config = Config::from_yaml(minimal_yaml()).unwrap();
        assert_eq!(config.tiling.overlap, 0.0);
        assert_eq!(config.tiling.boundary, BoundaryPolicy::ShiftToFit);
        assert_eq!(config.output.format, TileFormat::Png);
        assert!(config.processing.parallel);
        assert_eq!(config.processing.decode_pixel_ceiling, DECODE_PIXEL_CEILING);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_full_yaml_round_trip() {
        let yaml = r#"
input:
  path: /data/modis_2021-05-01.tif
  date: "2021-05-01"
tiling:
  width: 1024
  height: 768
  overlap: 0.25
  boundary: pad-incomplete
output:
  root: /data/tiles
  format: jpeg
processing:
  parallel: false
  threads: 4
  decode_pixel_ceiling: 100000000
"#;
        let config = Config::from_yaml(yaml).unwrap();
        assert_eq!(config.tiling.boundary, BoundaryPolicy::PadIncomplete);
        assert_eq!(config.output.format, TileFormat::Jpeg);
        assert_eq!(config.processing.threads, Some(4));

        let back = Config::from_yaml(&config.to_yaml().unwrap()).unwrap();
        assert_eq!(back.tiling.width, 1024);
        assert_eq!(back.processing.decode_pixel_ceiling, 100_000_000);
    }

    #[test]
    fn test_validation_rejects_bad_overlap() {
        let mut config = Config::from_yaml(minimal_yaml()).unwrap();
        config.tiling.overlap = 1.5;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validation_rejects_tiny_ceiling() {
        let mut config = Config::from_yaml(minimal_yaml()).unwrap();
        config.processing.decode_pixel_ceiling = 10_000;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_json_config_parses() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(
            &path,
            r#"{"input":{"path":"/in"},"tiling":{"width":256,"height":256},"output":{"root":"/out"}}"#,
        )
        .unwrap();
        let config = Config::from_file(&path).unwrap();
        assert_eq!(config.tiling.width, 256);
    }
}
