//! Tile grid planning and output placement.

mod locator;
mod planner;

pub use locator::{raster_date, TileDescriptor, TileLocator};
pub use planner::{plan, BoundaryPolicy, GridPlan, TileOrigin, TileSpec};
