// The per-refresh pipeline: input → control state → detect → dither → overlay → present.
// FrameLoop owns every collaborator explicitly (video source, detector,
// display, buffers, control state). `run` is a plain loop that checks a
// CancelToken before every tick; the display's present call paces it to the
// refresh rate, so every tick presents something, even when the frame fails.
// Visual expectation: a failed frame leaves the last image on screen with
// "FRAME ERROR" in the corner while gestures keep working.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::camera::VideoSource;
use crate::control::{ControlState, Controls, Intent};
use crate::detect::Detector;
use crate::dither::DitherEngine;
use crate::error::Error;
use crate::gesture::{GestureClassifier, RawInput};
use crate::overlay::{OverlayRenderer, OverlaySurface};
use crate::types::FrameBuffer;

pub const LOADING_INDICATOR: &str = "LOADING";
pub const NO_CAMERA_INDICATOR: &str = "NO CAMERA";
pub const FRAME_ERROR_INDICATOR: &str = "FRAME ERROR";

/// Host surface: shows the two render layers and reports raw input.
pub trait Display {
    fn is_open(&self) -> bool;
    fn poll_input(&mut self) -> Vec<RawInput>;
    fn present(
        &mut self,
        video: &FrameBuffer,
        overlay: &OverlaySurface,
        indicator: &str,
    ) -> Result<(), Error>;
}

/// Shared stop flag. Clones observe the same cancellation.
#[derive(Clone, Debug, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// What a single tick ended up doing.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TickOutcome {
    /// A frame was dithered, overlaid and presented with this state.
    Rendered(ControlState),
    DisplayClosed,
    DetectorLoading,
    NoFrame,
    /// Capture or detection failed; the previous surfaces were shown again.
    FrameFailed,
}

pub struct FrameLoop<S, D, W> {
    source: S,
    detector: D,
    display: W,
    controls: Controls,
    gestures: GestureClassifier,
    engine: DitherEngine,
    renderer: OverlayRenderer,
    video: FrameBuffer,
    overlay: OverlaySurface,
}

impl<S: VideoSource, D: Detector, W: Display> FrameLoop<S, D, W> {
    pub fn new(
        source: S,
        detector: D,
        display: W,
        controls: Controls,
        gestures: GestureClassifier,
        renderer: OverlayRenderer,
    ) -> Self {
        Self {
            source,
            detector,
            display,
            controls,
            gestures,
            engine: DitherEngine::new(),
            renderer,
            video: FrameBuffer::new(0, 0),
            overlay: OverlaySurface::new(0, 0),
        }
    }

    pub fn state(&self) -> ControlState {
        self.controls.state()
    }

    pub fn display(&self) -> &W {
        &self.display
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    /// Tick until cancelled or the display closes, then release the camera.
    /// A failing tick is logged and the loop moves on to the next one.
    pub fn run(&mut self, cancel: &CancelToken) {
        let ladder = self.controls.ladder();
        log::info!(
            "frame loop started at scale {} (allowed {}..={})",
            self.controls.state().scale,
            ladder.min(),
            ladder.max()
        );
        let mut failed_ticks = 0u64;
        while !cancel.is_cancelled() {
            match self.tick() {
                Ok(TickOutcome::DisplayClosed) => break,
                Ok(TickOutcome::FrameFailed) => failed_ticks += 1,
                Ok(outcome) => log::trace!("tick: {:?}", outcome),
                Err(e) => {
                    failed_ticks += 1;
                    log::error!("present failed: {e}");
                }
            }
        }
        self.source.release();
        log::info!("frame loop stopped ({failed_ticks} failed ticks)");
    }

    /// One pass of the pipeline. Dither and overlay use the same state snapshot.
    ///
    /// Every tick with an open display presents exactly once, so input keeps
    /// flowing while the camera or detector is failing. Only a failed present
    /// is returned as an error.
    pub fn tick(&mut self) -> Result<TickOutcome, Error> {
        if !self.display.is_open() {
            return Ok(TickOutcome::DisplayClosed);
        }
        self.handle_input();

        if !self.detector.is_ready() {
            self.present(LOADING_INDICATOR)?;
            return Ok(TickOutcome::DetectorLoading);
        }

        match self.render_frame() {
            Ok(Some(snapshot)) => {
                self.present(&format!("SCALE {}", snapshot.scale))?;
                Ok(TickOutcome::Rendered(snapshot))
            }
            Ok(None) => {
                self.present(NO_CAMERA_INDICATOR)?;
                Ok(TickOutcome::NoFrame)
            }
            Err(e) => {
                log::warn!("frame skipped: {e}");
                self.present(FRAME_ERROR_INDICATOR)?;
                Ok(TickOutcome::FrameFailed)
            }
        }
    }

    /// Capture, detect, dither and draw the overlay. The surfaces are only
    /// touched once capture and detection both succeeded.
    fn render_frame(&mut self) -> Result<Option<ControlState>, Error> {
        let Some(frame) = self.source.next_frame()? else {
            return Ok(None);
        };

        let snapshot = self.controls.state();
        let detections = self.detector.detect(&frame)?;
        log::debug!(
            "{} detections, frame age {:?}",
            detections.len(),
            frame.captured_at.elapsed()
        );

        self.engine.dither_into(&frame, snapshot.scale, &mut self.video);
        self.overlay.ensure_size(frame.width(), frame.height());
        self.renderer.render(&detections, snapshot.scale, &mut self.overlay);
        Ok(Some(snapshot))
    }

    fn present(&mut self, indicator: &str) -> Result<(), Error> {
        self.display.present(&self.video, &self.overlay, indicator)
    }

    fn handle_input(&mut self) {
        for input in self.display.poll_input() {
            let Some(gesture) = self.gestures.classify(&input) else {
                continue;
            };
            match self.controls.apply(gesture.transition()) {
                Some(Intent::ScaleChanged(scale)) => log::info!("scale -> {scale}"),
                Some(Intent::RestartVideo(facing)) => {
                    log::info!("switching camera to {facing}");
                    if let Err(e) = self.source.set_facing(facing) {
                        log::warn!("{e}; staying idle until the camera comes back");
                    }
                }
                None => {}
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cancel_token_is_shared_between_clones() {
        let token = CancelToken::new();
        let clone = token.clone();
        assert!(!clone.is_cancelled());
        token.cancel();
        assert!(clone.is_cancelled());
    }
}
