//! Tile assembly from decoded chunk buffers.

mod compositor;

pub use compositor::{ComposeOutcome, Compositor};
