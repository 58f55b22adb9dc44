// Error types for the whole pipeline.
// Every variant states *where* things went wrong.
use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    /// Creating the window failed
    #[error("Window init error: {0}")]
    WindowInit(String),
    /// Pushing a frame to the window failed
    #[error("Window update error: {0}")]
    WindowUpdate(String),
    /// Opening/starting/restarting the camera failed
    #[error("Camera init error: {0}")]
    CameraInit(String),
    /// Grabbing/decoding a frame failed
    #[error("Camera frame error: {0}")]
    CameraFrame(String),
    /// The detector could not process a frame
    #[error("Detector error: {0}")]
    Detect(String),
    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// Errors that can occur when loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file '{}': {source}", path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Failed to parse config file '{}': {source}", path.display())]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}
