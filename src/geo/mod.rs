//! Geographic support: affine geotransforms and the output-sharding grid.

mod transform;
mod world_grid;

pub use transform::{GeoTransform, TileBounds};
pub use world_grid::GridCell;
