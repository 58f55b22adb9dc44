// Opens a camera for the current facing mode and converts its frames into RGBA
// images for the dither engine.
// Visual expectation: when the frame loop calls `next_frame()`, you get the
// latest camera image, or `None` while no camera is available.

use std::time::{Duration, Instant};

use crate::error::Error;
use crate::types::{FacingMode, Frame};

// Bring in nokhwa types for camera control.
use nokhwa::{
    Camera,
    pixel_format::RgbFormat,
    query,
    utils::{
        ApiBackend, CameraFormat, CameraIndex, FrameFormat, RequestedFormat, RequestedFormatType,
        Resolution,
    },
};

// `image` turns the decoded RGB frame into the RGBA layout the pipeline uses.
use image::DynamicImage;

/// Anything that can feed frames to the frame loop.
pub trait VideoSource {
    /// Latest frame, or `None` while the source is not (yet) delivering.
    fn next_frame(&mut self) -> Result<Option<Frame>, Error>;
    /// Reopen the stream on the camera for `facing`.
    fn set_facing(&mut self, facing: FacingMode) -> Result<(), Error>;
    /// Stop streaming and free the device.
    fn release(&mut self);
}

#[derive(Clone, Debug)]
pub struct CameraSettings {
    pub environment_device: u32,
    pub user_device: u32,
    pub width: u32,
    pub height: u32,
    pub fps: u32,
    pub retry_interval: Duration,
}

impl CameraSettings {
    pub fn device_for(&self, facing: FacingMode) -> u32 {
        match facing {
            FacingMode::Environment => self.environment_device,
            FacingMode::User => self.user_device,
        }
    }
}

// An open stream the source can pull frames from.
trait Capture {
    fn grab(&mut self) -> Result<Frame, Error>;
    fn resolution(&self) -> (u32, u32);
}

// A small wrapper around nokhwa::Camera so the source stays clean.
struct CameraCapture {
    cam: Camera,
}

impl CameraCapture {
    /// Try to open camera `index` at a target resolution (falls back if not exact).
    /// Nothing reaches the window until `next_frame` is polled.
    fn open(index: u32, settings: &CameraSettings) -> Result<Self, Error> {
        // 1) Choose the device
        let idx = CameraIndex::Index(index);

        let fmt = CameraFormat::new(
            Resolution::new(settings.width, settings.height),
            FrameFormat::YUYV, // uncompressed; cheap to convert to RGB
            settings.fps,
        );

        // 2) Ask for RGB frames, closest to our request.
        let req = RequestedFormat::new::<RgbFormat>(RequestedFormatType::Closest(fmt));

        // 3) Create the camera (this might fail if no device exists or access is denied).
        let mut cam = Camera::new(idx, req)
            .map_err(|e| Error::CameraInit(format!("Create camera {index}: {e}")))?;

        // 4) Start streaming frames from the camera.
        cam.open_stream()
            .map_err(|e| Error::CameraInit(format!("Open stream {index}: {e}")))?;

        Ok(Self { cam })
    }
}

impl Capture for CameraCapture {
    /// Grab one frame and convert it to RGBA.
    fn grab(&mut self) -> Result<Frame, Error> {
        // 1) Pull a frame from the camera (this blocks until a new frame is ready).
        let frame = self
            .cam
            .frame()
            .map_err(|e| Error::CameraFrame(format!("Fetch frame: {e}")))?;

        // 2) Decode to an ImageBuffer<Rgb<u8>, Vec<u8>> (handles various raw formats safely).
        let rgb_img = frame
            .decode_image::<RgbFormat>()
            .map_err(|e| Error::CameraFrame(format!("Decode RGB: {e}")))?;

        // 3) Widen to RGBA (opaque alpha).
        Ok(Frame::new(DynamicImage::ImageRgb8(rgb_img).to_rgba8()))
    }

    /// Report the actual resolution the camera is delivering.
    fn resolution(&self) -> (u32, u32) {
        let actual = self.cam.resolution();
        (actual.width(), actual.height())
    }
}

impl Drop for CameraCapture {
    fn drop(&mut self) {
        if let Err(e) = self.cam.stop_stream() {
            log::warn!("stopping camera stream failed: {e}");
        }
    }
}

/// nokhwa-backed [`VideoSource`]. Facing mode picks the device index.
///
/// If the camera cannot be opened (no device, permission denied) the source
/// stays idle and retries at most once per `retry_interval`.
pub struct CameraSource {
    settings: CameraSettings,
    facing: FacingMode,
    capture: Option<Box<dyn Capture>>,
    last_attempt: Option<Instant>,
}

impl CameraSource {
    pub fn new(settings: CameraSettings, facing: FacingMode) -> Self {
        let mut source = Self { settings, facing, capture: None, last_attempt: None };
        if let Err(e) = source.open() {
            log::warn!("{e}; will retry");
        }
        source
    }

    /// Resolution of the open stream, or the requested one when idle.
    pub fn resolution(&self) -> (u32, u32) {
        self.capture
            .as_ref()
            .map(|c| c.resolution())
            .unwrap_or((self.settings.width, self.settings.height))
    }

    fn open(&mut self) -> Result<(), Error> {
        self.capture = None; // drop stops the previous stream first
        self.last_attempt = Some(Instant::now());
        let index = self.settings.device_for(self.facing);
        let capture = CameraCapture::open(index, &self.settings)?;
        let (w, h) = capture.resolution();
        log::info!("camera {index} ({}) streaming at {w}x{h}", self.facing);
        self.capture = Some(Box::new(capture));
        Ok(())
    }

    fn retry_due(&self) -> bool {
        self.last_attempt
            .is_none_or(|t| t.elapsed() >= self.settings.retry_interval)
    }
}

impl VideoSource for CameraSource {
    fn next_frame(&mut self) -> Result<Option<Frame>, Error> {
        if self.capture.is_none() {
            if !self.retry_due() {
                return Ok(None);
            }
            if let Err(e) = self.open() {
                log::warn!("{e}; will retry");
                return Ok(None);
            }
        }
        let Some(capture) = self.capture.as_mut() else {
            return Ok(None);
        };
        match capture.grab() {
            Ok(frame) => Ok(Some(frame)),
            Err(e) => {
                // Lost device: drop the stream and let the throttled reopen take over.
                log::warn!("{e}; closing camera, will retry");
                self.capture = None;
                self.last_attempt = Some(Instant::now());
                Ok(None)
            }
        }
    }

    fn set_facing(&mut self, facing: FacingMode) -> Result<(), Error> {
        self.facing = facing;
        self.open()
    }

    fn release(&mut self) {
        if self.capture.take().is_some() {
            log::info!("camera released");
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CameraInfo {
    pub index: u32,
    pub name: String,
    pub description: String,
}

/// List all available camera devices on the system.
pub fn list_devices() -> Result<Vec<CameraInfo>, Error> {
    let devices = query(ApiBackend::Auto)
        .map_err(|e| Error::CameraInit(format!("Query cameras: {e}")))?;
    Ok(devices
        .into_iter()
        .map(|d| CameraInfo {
            index: d.index().as_index().unwrap_or(0),
            name: d.human_name(),
            description: d.description().to_string(),
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings() -> CameraSettings {
        CameraSettings {
            environment_device: 0,
            user_device: 2,
            width: 640,
            height: 480,
            fps: 30,
            retry_interval: Duration::from_secs(60),
        }
    }

    #[test]
    fn facing_selects_device() {
        let s = settings();
        assert_eq!(s.device_for(FacingMode::Environment), 0);
        assert_eq!(s.device_for(FacingMode::User), 2);
    }

    struct Unplugged;

    impl Capture for Unplugged {
        fn grab(&mut self) -> Result<Frame, Error> {
            Err(Error::CameraFrame("device unplugged".into()))
        }

        fn resolution(&self) -> (u32, u32) {
            (320, 240)
        }
    }

    #[test]
    fn frame_error_closes_the_stream_and_waits_to_reopen() {
        let mut source = CameraSource {
            settings: settings(),
            facing: FacingMode::Environment,
            capture: Some(Box::new(Unplugged)),
            last_attempt: None,
        };
        assert_eq!(source.resolution(), (320, 240));

        assert!(source.next_frame().unwrap().is_none());
        assert!(source.capture.is_none());
        assert!(!source.retry_due());
        // idle until the retry interval elapses
        assert!(source.next_frame().unwrap().is_none());
        assert_eq!(source.resolution(), (640, 480));
    }

    #[test]
    fn idle_source_waits_for_retry_interval() {
        let mut source = CameraSource {
            settings: settings(),
            facing: FacingMode::Environment,
            capture: None,
            last_attempt: Some(Instant::now()),
        };
        assert!(!source.retry_due());
        assert!(source.next_frame().unwrap().is_none());
        assert_eq!(source.resolution(), (640, 480));
        source.release();
    }
}
