// Configuration file handling for dither-cam.
// Loads `dither-cam.toml` from the working directory or a custom path.
// Every key is optional; a missing file means "all defaults".

use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::control::ScaleLadder;
use crate::detect::MotionSettings;
use crate::error::ConfigError;
use crate::gesture::GestureSettings;
use crate::types::FacingMode;

pub const DEFAULT_FILE: &str = "dither-cam.toml";

#[derive(Debug, Deserialize, Default, Clone)]
#[serde(default)]
pub struct Config {
    pub camera: CameraConfig,
    pub dither: DitherConfig,
    pub input: InputConfig,
    pub overlay: OverlayConfig,
    pub detector: DetectorConfig,
    pub window: WindowConfig,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct CameraConfig {
    /// Device index used for the back camera
    pub environment_device: u32,
    /// Device index used for the front camera
    pub user_device: u32,
    pub width: u32,
    pub height: u32,
    pub fps: u32,
    pub facing: FacingMode,
    /// Minimum delay between attempts to reopen a camera that failed
    pub retry_interval_ms: u64,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            environment_device: 0,
            user_device: 1,
            width: 640,
            height: 480,
            fps: 30,
            facing: FacingMode::Environment,
            retry_interval_ms: 2000,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct DitherConfig {
    pub scales: Vec<u32>,
    pub initial_scale: u32,
}

impl Default for DitherConfig {
    fn default() -> Self {
        Self { scales: ScaleLadder::default().values().to_vec(), initial_scale: 8 }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct InputConfig {
    pub swipe_threshold: f32,
    pub tap_slop: f32,
    pub double_tap_window_ms: u64,
}

impl Default for InputConfig {
    fn default() -> Self {
        let d = GestureSettings::default();
        Self {
            swipe_threshold: d.swipe_threshold,
            tap_slop: d.tap_slop,
            double_tap_window_ms: d.double_tap_window.as_millis() as u64,
        }
    }
}

impl InputConfig {
    pub fn gesture_settings(&self) -> GestureSettings {
        GestureSettings {
            swipe_threshold: self.swipe_threshold,
            tap_slop: self.tap_slop,
            double_tap_window: Duration::from_millis(self.double_tap_window_ms),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct OverlayConfig {
    /// `#rrggbb`
    pub color: String,
}

impl Default for OverlayConfig {
    fn default() -> Self {
        Self { color: "#5a00e6".to_string() }
    }
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum DetectorKind {
    #[default]
    Motion,
    None,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct DetectorConfig {
    pub kind: DetectorKind,
    /// Side of one motion cell in pixels
    pub cell_size: u32,
    /// Luma change (0-255) a cell needs to count as moving
    pub sensitivity: u8,
    /// Smallest blob (in cells) that gets reported
    pub min_cells: usize,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        let d = MotionSettings::default();
        Self {
            kind: DetectorKind::Motion,
            cell_size: d.cell_size,
            sensitivity: d.sensitivity,
            min_cells: d.min_cells,
        }
    }
}

impl DetectorConfig {
    pub fn motion_settings(&self) -> MotionSettings {
        MotionSettings {
            cell_size: self.cell_size,
            sensitivity: self.sensitivity,
            min_cells: self.min_cells,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct WindowConfig {
    pub title: String,
    /// Refresh rate the frame loop is paced to
    pub target_fps: usize,
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self { title: "dither-cam".to_string(), target_fps: 60 }
    }
}

impl Config {
    /// Load configuration from a file path.
    /// Returns default config if the file doesn't exist.
    /// Returns an error if the file exists but cannot be parsed or is invalid.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let path = path.map(PathBuf::from).unwrap_or_else(|| PathBuf::from(DEFAULT_FILE));

        if !path.exists() {
            log::debug!("no config at {}, using defaults", path.display());
            return Ok(Config::default());
        }

        let content = std::fs::read_to_string(&path).map_err(|e| ConfigError::Io {
            path: path.clone(),
            source: e,
        })?;
        let config: Config = toml::from_str(&content).map_err(|e| ConfigError::Parse {
            path: path.clone(),
            source: e,
        })?;
        config.validate()?;
        log::info!("loaded config from {}", path.display());
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.scale_ladder()?;
        self.overlay_color()?;
        if self.detector.cell_size == 0 {
            return Err(ConfigError::Invalid("detector.cell_size must be positive".into()));
        }
        if self.camera.width == 0 || self.camera.height == 0 {
            return Err(ConfigError::Invalid("camera resolution must be positive".into()));
        }
        Ok(())
    }

    pub fn scale_ladder(&self) -> Result<ScaleLadder, ConfigError> {
        ScaleLadder::new(self.dither.scales.iter().copied())
    }

    pub fn overlay_color(&self) -> Result<[u8; 3], ConfigError> {
        parse_hex_color(&self.overlay.color)
    }
}

/// Parse `#rrggbb` (leading `#` optional).
pub fn parse_hex_color(s: &str) -> Result<[u8; 3], ConfigError> {
    let digits = s.trim().trim_start_matches('#');
    let bytes = hex::decode(digits)
        .map_err(|e| ConfigError::Invalid(format!("overlay.color '{}': {}", s, e)))?;
    <[u8; 3]>::try_from(bytes.as_slice())
        .map_err(|_| ConfigError::Invalid(format!("overlay.color '{}': expected #rrggbb", s)))
}
