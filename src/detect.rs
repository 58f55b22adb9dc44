// Object detectors the frame loop can ask for boxes.
// The loop only sees the `Detector` trait. `MotionDetector` is a
// model-free fallback that reports moving regions; `NoDetector` turns the
// overlay off.

use std::collections::VecDeque;

use crate::dither::luma;
use crate::error::Error;
use crate::types::{BoundingBox, Detection, Frame};

pub const MOTION_LABEL: &str = "motion";

/// Runs inference on a frame.
pub trait Detector {
    /// False while the detector is still loading; the frame loop waits.
    fn is_ready(&self) -> bool {
        true
    }

    /// Boxes in source-frame pixels, in whatever order the detector prefers.
    fn detect(&mut self, frame: &Frame) -> Result<Vec<Detection>, Error>;
}

/// Never reports anything.
#[derive(Debug, Default)]
pub struct NoDetector;

impl Detector for NoDetector {
    fn detect(&mut self, _frame: &Frame) -> Result<Vec<Detection>, Error> {
        Ok(Vec::new())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MotionSettings {
    pub cell_size: u32,
    pub sensitivity: u8,
    pub min_cells: usize,
}

impl Default for MotionSettings {
    fn default() -> Self {
        Self { cell_size: 16, sensitivity: 24, min_cells: 2 }
    }
}

/// Frame differencing on a coarse luma grid.
///
/// Each frame is averaged down to `cell_size` cells and compared with the
/// previous one. Cells whose luma moved by more than `sensitivity` are grouped
/// into 4-connected blobs; every blob of at least `min_cells` cells becomes one
/// detection.
pub struct MotionDetector {
    settings: MotionSettings,
    previous: Vec<u8>,
    current: Vec<u8>,
    grid: (usize, usize),
    visited: Vec<bool>,
    queue: VecDeque<usize>,
}

impl MotionDetector {
    pub fn new(settings: MotionSettings) -> Self {
        Self {
            settings,
            previous: Vec::new(),
            current: Vec::new(),
            grid: (0, 0),
            visited: Vec::new(),
            queue: VecDeque::new(),
        }
    }

    fn sample(&mut self, frame: &Frame) -> (usize, usize) {
        let w = frame.width() as usize;
        let h = frame.height() as usize;
        let cs = self.settings.cell_size.max(1) as usize;
        let cols = w.div_ceil(cs);
        let rows = h.div_ceil(cs);
        let raw = frame.image.as_raw();

        self.current.clear();
        self.current.reserve(cols * rows);
        for cy in 0..rows {
            for cx in 0..cols {
                let mut sum = 0u64;
                let mut count = 0u64;
                for py in cy * cs..((cy + 1) * cs).min(h) {
                    for px in cx * cs..((cx + 1) * cs).min(w) {
                        let i = (py * w + px) * 4;
                        sum += luma(raw[i], raw[i + 1], raw[i + 2]) as u64;
                        count += 1;
                    }
                }
                let avg = if count > 0 { sum / count / 1000 } else { 0 };
                self.current.push(avg as u8);
            }
        }
        (cols, rows)
    }

    fn blobs(&mut self, cols: usize, rows: usize, frame: &Frame) -> Vec<Detection> {
        let threshold = self.settings.sensitivity;
        let moving: Vec<bool> = self
            .current
            .iter()
            .zip(&self.previous)
            .map(|(c, p)| c.abs_diff(*p) > threshold)
            .collect();

        self.visited.clear();
        self.visited.resize(cols * rows, false);

        let cs = self.settings.cell_size.max(1);
        let mut out = Vec::new();
        for seed in 0..moving.len() {
            if !moving[seed] || self.visited[seed] {
                continue;
            }
            self.visited[seed] = true;
            self.queue.push_back(seed);

            let (mut min_x, mut min_y, mut max_x, mut max_y) = (cols, rows, 0, 0);
            let mut cells = 0usize;
            while let Some(idx) = self.queue.pop_front() {
                let (x, y) = (idx % cols, idx / cols);
                cells += 1;
                min_x = min_x.min(x);
                min_y = min_y.min(y);
                max_x = max_x.max(x);
                max_y = max_y.max(y);

                let mut visit = |n: usize| {
                    if moving[n] && !self.visited[n] {
                        self.visited[n] = true;
                        self.queue.push_back(n);
                    }
                };
                if x > 0 { visit(idx - 1); }
                if x + 1 < cols { visit(idx + 1); }
                if y > 0 { visit(idx - cols); }
                if y + 1 < rows { visit(idx + cols); }
            }

            if cells < self.settings.min_cells {
                continue;
            }
            let x0 = min_x as u32 * cs;
            let y0 = min_y as u32 * cs;
            let x1 = ((max_x as u32 + 1) * cs).min(frame.width());
            let y1 = ((max_y as u32 + 1) * cs).min(frame.height());
            out.push(Detection {
                label: MOTION_LABEL.to_string(),
                bbox: BoundingBox::new(x0 as f32, y0 as f32, (x1 - x0) as f32, (y1 - y0) as f32),
            });
        }
        out
    }
}

impl Detector for MotionDetector {
    fn detect(&mut self, frame: &Frame) -> Result<Vec<Detection>, Error> {
        if frame.width() == 0 || frame.height() == 0 {
            return Err(Error::Detect("empty frame".into()));
        }
        let (cols, rows) = self.sample(frame);

        // First frame, or the camera switched resolution: nothing to compare to.
        let detections = if self.grid == (cols, rows) {
            self.blobs(cols, rows, frame)
        } else {
            log::debug!("motion grid reset to {}x{}", cols, rows);
            Vec::new()
        };

        self.grid = (cols, rows);
        std::mem::swap(&mut self.previous, &mut self.current);
        Ok(detections)
    }
}
