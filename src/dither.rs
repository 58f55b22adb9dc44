// Ordered (Bayer) dithering on a coarse pixel grid.
// The source frame is split into `scale × scale` cells. Each cell's average
// luma is compared against one entry of the 8×8 threshold matrix and the whole
// cell is painted pure black or pure white. The result is the blocky two-tone
// image the window shows.

use crate::types::{Frame, FrameBuffer};

pub const BLACK: u32 = 0x0000_0000;
pub const WHITE: u32 = 0x00FF_FFFF;

/// Classic 8×8 Bayer index matrix. Threshold for an entry `k` is `k / 64`.
pub const BAYER_8X8: [[u8; 8]; 8] = [
    [0, 32, 8, 40, 2, 34, 10, 42],
    [48, 16, 56, 24, 50, 18, 58, 26],
    [12, 44, 4, 36, 14, 46, 6, 38],
    [60, 28, 52, 20, 62, 30, 54, 22],
    [3, 35, 11, 43, 1, 33, 9, 41],
    [51, 19, 59, 27, 49, 17, 57, 25],
    [15, 47, 7, 39, 13, 45, 5, 37],
    [63, 31, 55, 23, 61, 29, 53, 21],
];

const BAYER_LEVELS: u64 = 64;

/// BT.601 coefficients scaled by 1000, so full white is `255 * 1000`.
const LUMA_MAX: u64 = 255_000;

/// Luma of one RGB triple, scaled to `0..=255_000`.
#[inline]
pub fn luma(r: u8, g: u8, b: u8) -> u32 {
    299 * r as u32 + 587 * g as u32 + 114 * b as u32
}

/// Black or white for a cell whose `count` pixels sum to `luma_sum`.
///
/// White iff `average / LUMA_MAX > k / 64` with `k` the matrix entry at
/// (cx mod 8, cy mod 8). Kept in integers so ties are exact and land on black.
pub fn cell_color(luma_sum: u64, count: u64, cx: usize, cy: usize) -> u32 {
    let k = BAYER_8X8[cy % 8][cx % 8] as u64;
    if luma_sum * BAYER_LEVELS > k * LUMA_MAX * count { WHITE } else { BLACK }
}

/// Reusable dithering state. Keeps the per-cell scratch buffer alive between
/// frames so steady-state frames do not allocate.
#[derive(Default)]
pub struct DitherEngine {
    cells: Vec<u32>,
}

impl DitherEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Dither `frame` at block size `scale` into a freshly allocated buffer.
    pub fn dither(&mut self, frame: &Frame, scale: u32) -> FrameBuffer {
        let mut out = FrameBuffer::new(frame.width() as usize, frame.height() as usize);
        self.dither_into(frame, scale, &mut out);
        out
    }

    /// Dither `frame` into `out`, resizing `out` only if the frame size changed.
    pub fn dither_into(&mut self, frame: &Frame, scale: u32, out: &mut FrameBuffer) {
        let w = frame.width() as usize;
        let h = frame.height() as usize;
        out.ensure_size(w, h);
        if w == 0 || h == 0 {
            return;
        }

        let s = scale.max(1) as usize;
        // A dimension smaller than one block still gets a single cell.
        let cols = (w / s).max(1);
        let rows = (h / s).max(1);

        self.cells.clear();
        self.cells.reserve(cols * rows);

        let raw = frame.image.as_raw();
        for cy in 0..rows {
            let y0 = cy * s;
            let y1 = ((cy + 1) * s).min(h);
            for cx in 0..cols {
                let x0 = cx * s;
                let x1 = ((cx + 1) * s).min(w);

                let mut sum = 0u64;
                let mut count = 0u64;
                for py in y0..y1 {
                    let row = py * w;
                    for px in x0..x1 {
                        let i = (row + px) * 4;
                        sum += luma(raw[i], raw[i + 1], raw[i + 2]) as u64;
                        count += 1;
                    }
                }

                self.cells.push(cell_color(sum, count, cx, cy));
            }
        }

        // Nearest-neighbour upsample: each cell becomes a solid s×s block.
        // The right/bottom remainder stripes reuse the last cell.
        for y in 0..h {
            let cy = (y / s).min(rows - 1);
            let cell_row = &self.cells[cy * cols..(cy + 1) * cols];
            let dst = &mut out.pixels[y * w..(y + 1) * w];
            for (x, px) in dst.iter_mut().enumerate() {
                *px = cell_row[(x / s).min(cols - 1)];
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgba, RgbaImage};

    fn solid(w: u32, h: u32, v: u8) -> Frame {
        Frame::new(RgbaImage::from_pixel(w, h, Rgba([v, v, v, 255])))
    }

    fn gradient(w: u32, h: u32) -> Frame {
        Frame::new(RgbaImage::from_fn(w, h, |x, y| {
            let v = ((x * 7 + y * 3) % 256) as u8;
            Rgba([v, 255 - v, v / 2, 255])
        }))
    }

    #[test]
    fn matrix_is_a_permutation_of_0_to_63() {
        let mut seen = [false; 64];
        for row in BAYER_8X8 {
            for k in row {
                seen[k as usize] = true;
            }
        }
        assert!(seen.iter().all(|s| *s));
    }

    #[test]
    fn cell_color_compares_against_matrix_entry() {
        // (0, 0) has threshold 0: any light at all is white, pure black is not
        assert_eq!(cell_color(0, 1, 0, 0), BLACK);
        assert_eq!(cell_color(1, 1, 0, 0), WHITE);
        // (0, 7) has the top entry 63/64; full white still clears it
        assert_eq!(cell_color(LUMA_MAX, 1, 0, 7), WHITE);
        // exactly on the threshold stays black: 32/64 of full scale at (1, 0)
        assert_eq!(cell_color(LUMA_MAX / 2, 1, 1, 0), BLACK);
        // the matrix wraps every 8 cells
        assert_eq!(cell_color(1, 1, 8, 16), cell_color(1, 1, 0, 0));
    }

    #[test]
    fn white_frame_stays_white() {
        let out = DitherEngine::new().dither(&solid(16, 16, 255), 8);
        assert_eq!(out.pixels.len(), 256);
        assert!(out.pixels.iter().all(|p| *p == WHITE));
    }

    #[test]
    fn black_frame_stays_black() {
        let out = DitherEngine::new().dither(&solid(20, 12, 0), 4);
        assert!(out.pixels.iter().all(|p| *p == BLACK));
    }

    #[test]
    fn output_is_two_tone() {
        let out = DitherEngine::new().dither(&gradient(64, 48), 4);
        assert!(out.pixels.iter().all(|p| *p == WHITE || *p == BLACK));
        assert!(out.pixels.contains(&WHITE));
        assert!(out.pixels.contains(&BLACK));
    }

    #[test]
    fn mid_gray_lights_half_the_matrix() {
        // luma 128/255 beats thresholds 0/64..=32/64
        let out = DitherEngine::new().dither(&solid(8, 8, 128), 1);
        let whites = out.pixels.iter().filter(|p| **p == WHITE).count();
        assert_eq!(whites, 33);
    }

    #[test]
    fn dithering_is_deterministic() {
        let frame = gradient(50, 30);
        let mut engine = DitherEngine::new();
        let a = engine.dither(&frame, 8);
        let b = engine.dither(&frame, 8);
        assert_eq!(a, b);
    }

    #[test]
    fn cells_are_solid_blocks() {
        let frame = gradient(32, 32);
        let out = DitherEngine::new().dither(&frame, 8);
        for by in 0..4 {
            for bx in 0..4 {
                let first = out.pixels[by * 8 * 32 + bx * 8];
                for y in by * 8..by * 8 + 8 {
                    for x in bx * 8..bx * 8 + 8 {
                        assert_eq!(out.pixels[y * 32 + x], first);
                    }
                }
            }
        }
    }

    #[test]
    fn remainder_stripe_copies_last_cell() {
        // 10 px wide at scale 4: cells cover 0..8, columns 8 and 9 reuse cell 1
        let frame = gradient(10, 4);
        let out = DitherEngine::new().dither(&frame, 4);
        for y in 0..4 {
            assert_eq!(out.pixels[y * 10 + 8], out.pixels[y * 10 + 7]);
            assert_eq!(out.pixels[y * 10 + 9], out.pixels[y * 10 + 7]);
        }
    }

    #[test]
    fn frame_smaller_than_scale_is_one_cell() {
        let out = DitherEngine::new().dither(&solid(3, 3, 255), 16);
        assert_eq!(out.pixels, vec![WHITE; 9]);
    }

    #[test]
    fn dither_into_reuses_output_buffer() {
        let mut engine = DitherEngine::new();
        let mut out = FrameBuffer::new(16, 16);
        let ptr = out.pixels.as_ptr();
        engine.dither_into(&solid(16, 16, 255), 8, &mut out);
        engine.dither_into(&solid(16, 16, 0), 8, &mut out);
        assert_eq!(out.pixels.as_ptr(), ptr);
        assert!(out.pixels.iter().all(|p| *p == BLACK));
    }
}
