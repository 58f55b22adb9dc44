// What you SEE:
// • The camera feed as a two-tone, blocky ordered-dither image.
// • Purple boxes (snapped to the blocks) around whatever the detector reports.
// • Up/Down (or W/S, K/J) or a vertical mouse drag: bigger/smaller blocks.
// • Double-click (or F): switch between the environment and user camera.
// • ESC, closing the window, or Ctrl-C quits.

use clap::Parser;
use std::time::Duration;

use dither_cam::camera::{list_devices, CameraSettings, CameraSource};
use dither_cam::cli::{Args, Command};
use dither_cam::config::{Config, DetectorKind};
use dither_cam::control::Controls;
use dither_cam::detect::{Detector, MotionDetector, NoDetector};
use dither_cam::draw::WindowDisplay;
use dither_cam::gesture::GestureClassifier;
use dither_cam::overlay::OverlayRenderer;
use dither_cam::{CancelToken, Error, Frame, FrameLoop};

/// Lets `main` pick the detector at runtime while FrameLoop stays generic.
enum AnyDetector {
    Motion(MotionDetector),
    Off(NoDetector),
}

impl Detector for AnyDetector {
    fn is_ready(&self) -> bool {
        match self {
            AnyDetector::Motion(d) => d.is_ready(),
            AnyDetector::Off(d) => d.is_ready(),
        }
    }

    fn detect(&mut self, frame: &Frame) -> Result<Vec<dither_cam::Detection>, Error> {
        match self {
            AnyDetector::Motion(d) => d.detect(frame),
            AnyDetector::Off(d) => d.detect(frame),
        }
    }
}

fn main() -> Result<(), Error> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    if let Some(Command::ListCameras) = args.command {
        for cam in list_devices()? {
            println!("[{}] {} ({})", cam.index, cam.name, cam.description);
        }
        return Ok(());
    }

    let mut config = Config::load(args.config.as_deref())?;
    args.apply_to(&mut config);
    config.validate()?;

    /* --- Camera + window setup ---
       Visual: window opens at the camera's resolution (black until frames arrive). */
    let camera = CameraSource::new(
        CameraSettings {
            environment_device: config.camera.environment_device,
            user_device: config.camera.user_device,
            width: config.camera.width,
            height: config.camera.height,
            fps: config.camera.fps,
            retry_interval: Duration::from_millis(config.camera.retry_interval_ms),
        },
        config.camera.facing,
    );
    let (w, h) = camera.resolution();
    let display =
        WindowDisplay::new(&config.window.title, w as usize, h as usize, config.window.target_fps)?;

    /* --- Detector ---
       Visual: boxes labelled MOTION around moving regions, or none with --no-detect. */
    let detector = match config.detector.kind {
        DetectorKind::Motion => {
            AnyDetector::Motion(MotionDetector::new(config.detector.motion_settings()))
        }
        DetectorKind::None => AnyDetector::Off(NoDetector),
    };

    /* --- Control state + input ---
       Visual: HUD shows "SCALE n"; gestures move n along the allowed ladder. */
    let controls =
        Controls::new(config.scale_ladder()?, config.dither.initial_scale, config.camera.facing);
    let gestures = GestureClassifier::new(config.input.gesture_settings());
    let renderer = OverlayRenderer::new(config.overlay_color()?);

    /* --- Cancellation ---
       Ctrl-C flips the token; the loop notices before its next tick. */
    let cancel = CancelToken::new();
    let handler_token = cancel.clone();
    if let Err(e) = ctrlc::set_handler(move || handler_token.cancel()) {
        log::warn!("Ctrl-C handler not installed: {e}");
    }

    /* ------------------------------ Main loop ------------------------------ */
    let mut frame_loop = FrameLoop::new(camera, detector, display, controls, gestures, renderer);
    frame_loop.run(&cancel);

    Ok(())
}
