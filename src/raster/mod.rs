//! Pixel buffers and raster file I/O.

mod buffer;
mod codec;
mod window;

pub use buffer::PixelBuffer;
pub use codec::{read_image, write_image_atomic, TileFormat};
pub use window::RasterReader;
