//! Raster tiler CLI
//!
//! Cuts georeferenced rasters into geographically named tiles.

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use raster_tiler::chunk::{classify, ChunkGrid, SpanAssignment};
use raster_tiler::grid::TileDescriptor;
use raster_tiler::raster::RasterReader;
use raster_tiler::{collect_rasters, grid, init_rayon, run, Config};

#[derive(Parser)]
#[command(name = "raster-tiler")]
#[command(about = "Cut georeferenced rasters into geographically named tiles", long_about = None)]
struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "config.yaml", global = true)]
    config: PathBuf,

    /// Override worker thread count
    #[arg(long, global = true)]
    threads: Option<usize>,

    /// Compose tiles one at a time instead of in parallel
    #[arg(long, global = true)]
    sequential: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the tiling engine (default if no command specified)
    Run,

    /// Show the tile and chunk plan without writing anything
    Plan,

    /// Validate configuration
    Validate,

    /// Generate a sample configuration file
    GenerateConfig {
        /// Output path for configuration file
        #[arg(short, long, default_value = "config.yaml")]
        output: PathBuf,
    },
}

fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into()))
        .init();

    let cli = Cli::parse();

    match cli.command {
        None | Some(Commands::Run) => {
            run_command(cli.config, cli.threads, cli.sequential)?;
        }

        Some(Commands::Plan) => {
            plan_command(cli.config)?;
        }

        Some(Commands::Validate) => {
            validate_command(cli.config)?;
        }

        Some(Commands::GenerateConfig { output }) => {
            generate_config_command(output)?;
        }
    }

    Ok(())
}

fn run_command(config_path: PathBuf, threads: Option<usize>, sequential: bool) -> Result<()> {
    let mut config = Config::from_file(&config_path)?;

    // Apply overrides
    if let Some(t) = threads {
        config.processing.threads = Some(t);
    }
    if sequential {
        config.processing.parallel = false;
    }

    config.validate()?;
    init_rayon(config.processing.threads)?;

    run(&config)?;
    Ok(())
}

fn plan_command(config_path: PathBuf) -> Result<()> {
    let config = Config::from_file(&config_path)?;
    config.validate()?;

    let rasters = collect_rasters(&config.input.path)?;
    if rasters.is_empty() {
        anyhow::bail!("no rasters found under {}", config.input.path.display());
    }

    println!("\n=== Tiling Plan ===");
    println!(
        "Tile: {}x{} px, overlap {:.0}%, boundary {:?}",
        config.tiling.width,
        config.tiling.height,
        config.tiling.overlap * 100.0,
        config.tiling.boundary
    );

    for raster in &rasters {
        let reader = RasterReader::open(raster)?;
        let (width, height) = reader.dimensions();
        let plan = grid::plan(width, height, &config.tiling)?;
        let chunks = ChunkGrid::build(
            width,
            height,
            &config.tiling,
            config.processing.decode_pixel_ceiling,
        )?;

        println!("\n{}", raster.display());
        println!("  Raster: {}x{} px", width, height);
        println!(
            "  Tiles: {} ({} cols x {} rows)",
            plan.tile_count(),
            plan.cols(),
            plan.rows()
        );
        match chunks {
            Some(chunk_grid) => {
                println!(
                    "  Chunks: {} ({} cols x {} rows of {}x{} px)",
                    chunk_grid.chunk_count(),
                    chunk_grid.cols,
                    chunk_grid.rows,
                    chunk_grid.chunk_w,
                    chunk_grid.chunk_h
                );

                let tiles: Vec<TileDescriptor> = plan
                    .iter()
                    .map(|origin| TileDescriptor {
                        x: origin.x,
                        y: origin.y,
                        is_last_col: origin.is_last_col,
                        is_last_row: origin.is_last_row,
                        output_path: PathBuf::new(),
                    })
                    .collect();
                let (mut single, mut pair, mut quad) = (0usize, 0usize, 0usize);
                for span in classify(tiles, &chunk_grid, &config.tiling)? {
                    match span {
                        SpanAssignment::Single { .. } => single += 1,
                        SpanAssignment::Pair { .. } => pair += 1,
                        SpanAssignment::Quad { .. } => quad += 1,
                    }
                }
                println!(
                    "  Spans: {} single, {} pair, {} quad",
                    single, pair, quad
                );
            }
            None => println!("  Chunks: none (decodes whole)"),
        }
    }
    println!();

    Ok(())
}

fn validate_command(config_path: PathBuf) -> Result<()> {
    let config = Config::from_file(&config_path)?;
    config.validate()?;
    println!("Configuration is valid");
    Ok(())
}

fn generate_config_command(output: PathBuf) -> Result<()> {
    // Generate a commented YAML config
    let yaml = r#"# Raster Tiler Configuration

# === INPUT: What to tile ===
input:
  # A GeoTIFF, or a directory whose .tif files are all processed.
  # Each raster needs a geotransform sidecar (.tfw world file, or .aux.xml).
  path: "/data/rasters"

  # Capture date override. When omitted the date is parsed from each
  # raster's file name (everything after the last underscore).
  # date: "2021-05-01"

# === TILING: Grid geometry ===
tiling:
  # Tile size in pixels
  width: 512
  height: 512

  # Fraction of each tile shared with its neighbor, 0.0 <= overlap < 1.0
  overlap: 0.0

  # What to do with the final partial tile on each axis:
  #   shift-to-fit       pull it back so it ends flush with the edge
  #   pad-incomplete     keep its origin and zero-fill past the edge
  #   discard-incomplete drop it
  boundary: shift-to-fit

# === OUTPUT: Where tiles go ===
output:
  # Tiles land under <root>/<date>/<grid-cell>/
  root: "/data/tiles"

  # Tile image format: png or jpeg
  format: png

# === PROCESSING: Performance tuning ===
processing:
  # Compose tiles in parallel (sequential output is byte-identical)
  parallel: true

  # Rayon thread pool size (null = num CPUs)
  # threads: 16

  # Largest pixel count decoded in one piece; larger rasters are split
  # into chunk intermediates first
  decode_pixel_ceiling: 357913940
"#;

    std::fs::write(&output, yaml)?;
    println!("Generated sample configuration at: {}", output.display());

    Ok(())
}
