// dither-cam: live camera feed rendered through an ordered-dither filter,
// with detector boxes snapped to the same pixel grid.

pub mod camera;
pub mod cli;
pub mod config;
pub mod control;
pub mod detect;
pub mod dither;
pub mod draw;
pub mod error;
pub mod frame_loop;
pub mod gesture;
pub mod grid;
pub mod overlay;
pub mod types;

pub use error::{ConfigError, Error};
pub use frame_loop::{CancelToken, Display, FrameLoop, TickOutcome};
pub use types::{BoundingBox, Detection, FacingMode, Frame, FrameBuffer};
