// Detection overlay: a transparent RGBA surface the window composites on top
// of the dithered video.
// Visual: purple outlines snapped to the dither blocks, label text above each box.

use image::{Rgba, RgbaImage};

use crate::draw::draw_glyphs;
use crate::grid::{align, AlignedBox};
use crate::types::Detection;

/// Outline width is `scale * STROKE_PER_SCALE`, so strokes stay on the grid.
pub const STROKE_PER_SCALE: u32 = 1;
/// Label glyph dots are `scale / LABEL_DOT_DIVISOR` px (at least 1), which puts
/// the 7-dot font at roughly twice the block size.
pub const LABEL_DOT_DIVISOR: u32 = 4;

const CLEAR: Rgba<u8> = Rgba([0, 0, 0, 0]);

pub struct OverlaySurface {
    image: RgbaImage,
}

impl OverlaySurface {
    pub fn new(width: u32, height: u32) -> Self {
        Self { image: RgbaImage::new(width, height) }
    }

    /// Resize to match the video frame. Contents are undefined afterwards.
    pub fn ensure_size(&mut self, width: u32, height: u32) {
        if self.image.dimensions() != (width, height) {
            self.image = RgbaImage::new(width, height);
        }
    }

    pub fn clear(&mut self) {
        for p in self.image.pixels_mut() {
            *p = CLEAR;
        }
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    pub fn pixel(&self, x: u32, y: u32) -> Rgba<u8> {
        *self.image.get_pixel(x, y)
    }

    /// True when every pixel is fully transparent.
    pub fn is_blank(&self) -> bool {
        self.image.pixels().all(|p| p[3] == 0)
    }

    /// Put a pixel if (x,y) is inside bounds.
    #[inline]
    fn put(&mut self, x: i64, y: i64, color: Rgba<u8>) {
        if x < 0 || y < 0 || x >= self.width() as i64 || y >= self.height() as i64 {
            return;
        }
        self.image.put_pixel(x as u32, y as u32, color);
    }

    /// Fill [x0,x1) × [y0,y1), clipped.
    fn fill(&mut self, x0: i64, y0: i64, x1: i64, y1: i64, color: Rgba<u8>) {
        let x0 = x0.max(0);
        let y0 = y0.max(0);
        let x1 = x1.min(self.width() as i64);
        let y1 = y1.min(self.height() as i64);
        for y in y0..y1 {
            for x in x0..x1 {
                self.image.put_pixel(x as u32, y as u32, color);
            }
        }
    }
}

pub struct OverlayRenderer {
    color: Rgba<u8>,
}

impl OverlayRenderer {
    pub fn new(rgb: [u8; 3]) -> Self {
        Self { color: Rgba([rgb[0], rgb[1], rgb[2], 255]) }
    }

    /// Clear `surface` and draw every detection in the order given.
    /// Later detections overdraw earlier ones.
    pub fn render(&self, detections: &[Detection], scale: u32, surface: &mut OverlaySurface) {
        surface.clear();
        let scale = scale.max(1);
        let stroke = scale * STROKE_PER_SCALE;

        for det in detections {
            let b = align(&det.bbox, scale);
            if b.is_empty() {
                // thinner than one block: nothing on the grid to outline
                continue;
            }
            stroke_rect(surface, &b, stroke, self.color);
            if !det.label.is_empty() {
                self.draw_label(surface, &det.label, &b, scale, stroke);
            }
        }
    }

    fn draw_label(
        &self,
        surface: &mut OverlaySurface,
        label: &str,
        b: &AlignedBox,
        scale: u32,
        stroke: u32,
    ) {
        let dot = (scale / LABEL_DOT_DIVISOR).max(1) as i64;
        let text_h = 7 * dot;
        // Text bottom sits one block above the box; flip inside when clipped.
        let above = b.y as i64 - scale as i64 - text_h;
        let top = if above >= 0 { above } else { b.y as i64 + stroke as i64 };
        let color = self.color;
        draw_glyphs(label, b.x as i64, top, dot, |x, y| surface.put(x, y, color));
    }
}

/// Outline drawn inward from the box edges, `thickness` px wide.
fn stroke_rect(surface: &mut OverlaySurface, b: &AlignedBox, thickness: u32, color: Rgba<u8>) {
    let (x0, y0) = (b.x as i64, b.y as i64);
    let (x1, y1) = (x0 + b.width as i64, y0 + b.height as i64);
    let t = thickness as i64;
    surface.fill(x0, y0, x1, (y0 + t).min(y1), color); // top
    surface.fill(x0, (y1 - t).max(y0), x1, y1, color); // bottom
    surface.fill(x0, y0, (x0 + t).min(x1), y1, color); // left
    surface.fill((x1 - t).max(x0), y0, x1, y1, color); // right
}
