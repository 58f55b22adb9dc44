// Snap detector boxes onto the dither grid so outlines line up with the blocks.

use crate::types::BoundingBox;

/// A box whose origin and extent are whole multiples of the grid scale.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct AlignedBox {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl AlignedBox {
    /// Zero width or height; renders as nothing.
    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }
}

/// Floor every component of `bbox` to a multiple of `scale`.
///
/// Negative and NaN inputs land on 0. Extents shorter than one block become 0.
pub fn align(bbox: &BoundingBox, scale: u32) -> AlignedBox {
    let s = scale.max(1);
    AlignedBox {
        x: snap(bbox.x, s),
        y: snap(bbox.y, s),
        width: snap(bbox.width, s),
        height: snap(bbox.height, s),
    }
}

#[inline]
fn snap(v: f32, s: u32) -> u32 {
    // float → int casts saturate; NaN becomes 0
    let v = v.max(0.0).floor() as u32;
    (v / s) * s
}
