// Core types shared by the dither engine, the overlay and the frame loop.

use std::fmt;
use std::time::Instant;

use image::RgbaImage;
use serde::Deserialize;

#[derive(Clone, Debug, PartialEq)]
pub struct FrameBuffer {
    pub width: usize,      // how wide the frame is on screen (pixels)
    pub height: usize,     // how tall the frame is on screen (pixels)
    pub pixels: Vec<u32>,  // each entry is 0x00RRGGBB for minifb
}

impl FrameBuffer {
    pub fn new(width: usize, height: usize) -> Self {
        Self { width, height, pixels: vec![0u32; width * height] }
    }

    /// Match the given dimensions. Only reallocates when the pixel count grows.
    pub fn ensure_size(&mut self, width: usize, height: usize) {
        if self.width != width || self.height != height {
            self.width = width;
            self.height = height;
            self.pixels.resize(width * height, 0);
        }
    }
}

/// One captured camera frame (RGBA8, row-major).
#[derive(Clone, Debug)]
pub struct Frame {
    pub image: RgbaImage,
    /// When the frame was grabbed from the source
    pub captured_at: Instant,
}

impl Frame {
    pub fn new(image: RgbaImage) -> Self {
        Self { image, captured_at: Instant::now() }
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }
}

/// Axis-aligned box in source-frame pixel coordinates, as reported by a detector.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BoundingBox {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl BoundingBox {
    pub fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self { x, y, width, height }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Detection {
    pub label: String,
    pub bbox: BoundingBox,
}

/// Which physical camera feeds the stream.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum FacingMode {
    /// Back camera (scene in front of the user)
    #[default]
    Environment,
    /// Front camera (selfie)
    User,
}

impl FacingMode {
    pub fn flipped(self) -> Self {
        match self {
            FacingMode::Environment => FacingMode::User,
            FacingMode::User => FacingMode::Environment,
        }
    }
}

impl fmt::Display for FacingMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FacingMode::Environment => write!(f, "environment"),
            FacingMode::User => write!(f, "user"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn facing_flip_round_trips() {
        assert_eq!(FacingMode::Environment.flipped(), FacingMode::User);
        assert_eq!(FacingMode::User.flipped(), FacingMode::Environment);
        assert_eq!(FacingMode::default(), FacingMode::Environment);
    }

    #[test]
    fn ensure_size_keeps_buffer_when_dimensions_match() {
        let mut fb = FrameBuffer::new(4, 2);
        fb.pixels[3] = 0x00FF_FFFF;
        fb.ensure_size(4, 2);
        assert_eq!(fb.pixels[3], 0x00FF_FFFF);

        fb.ensure_size(8, 8);
        assert_eq!(fb.pixels.len(), 64);
        assert_eq!((fb.width, fb.height), (8, 8));
    }
}
