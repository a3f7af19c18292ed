//! End-to-end tests over real files: synthetic GeoTIFFs in, tile trees out.

use raster_tiler::config::{InputConfig, OutputConfig, ProcessingConfig};
use raster_tiler::grid::{BoundaryPolicy, TileSpec};
use raster_tiler::raster::TileFormat;
use raster_tiler::{run, Config, ExecutionEngine};
use std::collections::BTreeMap;
use std::io::Cursor;
use std::path::{Path, PathBuf};
use tiff::encoder::{colortype, TiffEncoder};

fn test_pixel(x: u32, y: u32) -> [u8; 3] {
    [(x % 251) as u8, (y % 241) as u8, ((x + y) % 253) as u8]
}

fn write_raster(dir: &Path, name: &str, width: u32, height: u32) -> PathBuf {
    let mut data = Vec::with_capacity(width as usize * height as usize * 3);
    for y in 0..height {
        for x in 0..width {
            data.extend_from_slice(&test_pixel(x, y));
        }
    }
    let mut bytes = Cursor::new(Vec::new());
    let mut encoder = TiffEncoder::new(&mut bytes).unwrap();
    encoder
        .write_image::<colortype::RGB8>(width, height, &data)
        .unwrap();

    let path = dir.join(name);
    std::fs::write(&path, bytes.into_inner()).unwrap();
    std::fs::write(
        path.with_extension("tfw"),
        "0.001\n0.0\n0.0\n-0.001\n-120.0\n40.0\n",
    )
    .unwrap();
    path
}

fn config(input: PathBuf, root: PathBuf, boundary: BoundaryPolicy) -> Config {
    Config {
        input: InputConfig { path: input, date: None },
        tiling: TileSpec {
            width: 128,
            height: 96,
            overlap: 0.0,
            boundary,
        },
        output: OutputConfig {
            root,
            format: TileFormat::Png,
        },
        processing: ProcessingConfig {
            parallel: true,
            threads: None,
            decode_pixel_ceiling: 1 << 40,
        },
    }
}

/// Every tile file under a root, keyed by path relative to it.
fn tile_tree(root: &Path) -> BTreeMap<PathBuf, Vec<u8>> {
    let mut out = BTreeMap::new();
    let mut stack = vec![root.to_path_buf()];
    while let Some(dir) = stack.pop() {
        for entry in std::fs::read_dir(&dir).unwrap() {
            let path = entry.unwrap().path();
            if path.is_dir() {
                stack.push(path);
            } else {
                let rel = path.strip_prefix(root).unwrap().to_path_buf();
                out.insert(rel, std::fs::read(&path).unwrap());
            }
        }
    }
    out
}

#[test]
fn decomposed_output_matches_monolithic() {
    let dir = tempfile::TempDir::new().unwrap();
    let raster = write_raster(dir.path(), "scene_2021-05-01.tif", 1200, 900);

    let whole_root = dir.path().join("whole");
    let chunked_root = dir.path().join("chunked");

    let whole_cfg = config(raster.clone(), whole_root.clone(), BoundaryPolicy::ShiftToFit);
    let mut chunked_cfg = config(raster.clone(), chunked_root.clone(), BoundaryPolicy::ShiftToFit);
    // Force a 3x3 chunk grid on the second run
    chunked_cfg.processing.decode_pixel_ceiling = 160_000;

    let whole_stats = ExecutionEngine::new(&whole_cfg).process_raster(&raster).unwrap();
    let chunked_stats = ExecutionEngine::new(&chunked_cfg).process_raster(&raster).unwrap();
    assert_eq!(whole_stats.tiles_written, chunked_stats.tiles_written);
    assert_eq!(chunked_stats.chunks_decoded, 9);

    let whole = tile_tree(&whole_root);
    let chunked = tile_tree(&chunked_root);
    assert_eq!(whole.len(), chunked.len());
    for (rel, bytes) in &whole {
        assert_eq!(
            Some(bytes),
            chunked.get(rel),
            "stitched tile {} differs from monolithic decode",
            rel.display()
        );
    }
}

#[test]
fn decomposed_overlapping_tiles_match_monolithic() {
    let dir = tempfile::TempDir::new().unwrap();
    let raster = write_raster(dir.path(), "scene_2021-05-01.tif", 1200, 900);

    let whole_root = dir.path().join("whole");
    let chunked_root = dir.path().join("chunked");

    let mut whole_cfg = config(raster.clone(), whole_root.clone(), BoundaryPolicy::ShiftToFit);
    whole_cfg.tiling.overlap = 0.5;
    let mut chunked_cfg = config(raster.clone(), chunked_root.clone(), BoundaryPolicy::ShiftToFit);
    chunked_cfg.tiling.overlap = 0.5;
    chunked_cfg.processing.decode_pixel_ceiling = 160_000;

    let whole_stats = ExecutionEngine::new(&whole_cfg).process_raster(&raster).unwrap();
    let chunked_stats = ExecutionEngine::new(&chunked_cfg).process_raster(&raster).unwrap();
    assert_eq!(whole_stats.tiles_written, chunked_stats.tiles_written);
    assert_eq!(chunked_stats.chunks_decoded, 9);

    // Half-overlap puts tiles on every chunk seam; each must still decode to
    // the same bytes as its monolithic counterpart
    let whole = tile_tree(&whole_root);
    let chunked = tile_tree(&chunked_root);
    assert_eq!(whole.len(), chunked.len());
    for (rel, bytes) in &whole {
        assert_eq!(
            Some(bytes),
            chunked.get(rel),
            "overlapping tile {} differs from monolithic decode",
            rel.display()
        );
    }
}

#[test]
fn parallel_and_sequential_runs_are_identical() {
    let dir = tempfile::TempDir::new().unwrap();
    let raster = write_raster(dir.path(), "scene_2021-05-01.tif", 700, 500);

    let par_root = dir.path().join("par");
    let seq_root = dir.path().join("seq");

    let par_cfg = config(raster.clone(), par_root.clone(), BoundaryPolicy::PadIncomplete);
    let mut seq_cfg = config(raster.clone(), seq_root.clone(), BoundaryPolicy::PadIncomplete);
    seq_cfg.processing.parallel = false;

    ExecutionEngine::new(&par_cfg).process_raster(&raster).unwrap();
    ExecutionEngine::new(&seq_cfg).process_raster(&raster).unwrap();

    assert_eq!(tile_tree(&par_root), tile_tree(&seq_root));
}

#[test]
fn boundary_policies_change_tile_counts() {
    let dir = tempfile::TempDir::new().unwrap();
    let raster = write_raster(dir.path(), "scene_2021-05-01.tif", 1000, 1000);

    let mut counts = BTreeMap::new();
    for (name, boundary) in [
        ("shift", BoundaryPolicy::ShiftToFit),
        ("pad", BoundaryPolicy::PadIncomplete),
        ("discard", BoundaryPolicy::DiscardIncomplete),
    ] {
        let root = dir.path().join(name);
        let mut cfg = config(raster.clone(), root, boundary);
        cfg.tiling = TileSpec {
            width: 512,
            height: 512,
            overlap: 0.0,
            boundary,
        };
        let stats = ExecutionEngine::new(&cfg).process_raster(&raster).unwrap();
        counts.insert(name, stats.tiles_written);
    }

    assert_eq!(counts["shift"], 4);
    assert_eq!(counts["pad"], 4);
    assert_eq!(counts["discard"], 1);
}

#[test]
fn padded_tiles_decode_to_nominal_size_with_zero_fill() {
    let dir = tempfile::TempDir::new().unwrap();
    let raster = write_raster(dir.path(), "scene_2021-05-01.tif", 1000, 1000);
    let root = dir.path().join("tiles");
    let mut cfg = config(raster.clone(), root.clone(), BoundaryPolicy::PadIncomplete);
    cfg.tiling = TileSpec {
        width: 512,
        height: 512,
        overlap: 0.0,
        boundary: BoundaryPolicy::PadIncomplete,
    };

    ExecutionEngine::new(&cfg).process_raster(&raster).unwrap();

    for bytes in tile_tree(&root).values() {
        let img = image::load_from_memory(bytes).unwrap().to_rgb8();
        assert_eq!(img.dimensions(), (512, 512));
    }

    // The corner tile covers 488x488 real pixels; it is the only tile padded
    // on both axes
    let corner = tile_tree(&root)
        .into_iter()
        .map(|(_, bytes)| image::load_from_memory(&bytes).unwrap().to_rgb8())
        .find(|img| img.get_pixel(511, 0).0 == [0, 0, 0] && img.get_pixel(0, 511).0 == [0, 0, 0])
        .expect("one tile must be padded on both axes");
    assert_eq!(corner.get_pixel(0, 0).0, test_pixel(512, 512));
    assert_eq!(corner.get_pixel(487, 487).0, test_pixel(999, 999));
    assert_eq!(corner.get_pixel(488, 0).0, [0, 0, 0]);
    assert_eq!(corner.get_pixel(0, 488).0, [0, 0, 0]);
}

#[test]
fn batch_continues_past_broken_raster() {
    let dir = tempfile::TempDir::new().unwrap();
    let input = dir.path().join("in");
    std::fs::create_dir(&input).unwrap();

    write_raster(&input, "good_2021-05-01.tif", 400, 300);
    // No .tfw sidecar for this one
    let broken = write_raster(&input, "broken_2021-05-02.tif", 400, 300);
    std::fs::remove_file(broken.with_extension("tfw")).unwrap();

    let root = dir.path().join("tiles");
    let cfg = config(input, root.clone(), BoundaryPolicy::ShiftToFit);

    let err = run(&cfg).expect_err("run must fail when a raster fails");
    assert!(err.to_string().contains("1 of 2 rasters failed"));

    // The healthy raster was still tiled
    assert!(root.join("2021-05-01").is_dir());
    assert!(!tile_tree(&root.join("2021-05-01")).is_empty());
    assert!(!root.join("2021-05-02").exists());
}

#[test]
fn interrupted_run_resumes_without_rewriting() {
    let dir = tempfile::TempDir::new().unwrap();
    let raster = write_raster(dir.path(), "scene_2021-05-01.tif", 400, 300);
    let root = dir.path().join("tiles");
    let cfg = config(raster.clone(), root.clone(), BoundaryPolicy::ShiftToFit);
    let engine = ExecutionEngine::new(&cfg);

    let first = engine.process_raster(&raster).unwrap();
    assert!(first.tiles_written > 0);

    // Simulate an interruption by deleting one tile
    let tree = tile_tree(&root);
    let victim = root.join(tree.keys().next().unwrap());
    std::fs::remove_file(&victim).unwrap();

    let second = engine.process_raster(&raster).unwrap();
    assert_eq!(second.tiles_written, 1);
    assert_eq!(second.tiles_skipped, first.tiles_written - 1);
    assert!(victim.exists());
}
