// CLI argument parsing with clap.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::config::{Config, DetectorKind};
use crate::types::FacingMode;

/// Live camera through an ordered-dither filter, with detection boxes on the pixel grid
#[derive(Parser, Debug)]
#[command(name = "dither-cam")]
#[command(version, about, long_about = None)]
pub struct Args {
    #[command(subcommand)]
    pub command: Option<Command>,

    /// Config file path (default: ./dither-cam.toml)
    #[arg(long, short)]
    pub config: Option<PathBuf>,

    /// Camera device index for the environment (back) facing mode
    #[arg(long)]
    pub camera: Option<u32>,

    /// Camera device index for the user (front) facing mode
    #[arg(long)]
    pub user_camera: Option<u32>,

    /// Starting pixel density; snapped to the nearest allowed scale
    #[arg(long, short)]
    pub scale: Option<u32>,

    /// Starting facing mode
    #[arg(long, value_enum)]
    pub facing: Option<FacingMode>,

    /// Run without a detector (no overlay boxes)
    #[arg(long)]
    pub no_detect: bool,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// List available cameras
    ListCameras,
}

impl Args {
    /// Flags win over the config file.
    pub fn apply_to(&self, config: &mut Config) {
        if let Some(index) = self.camera {
            config.camera.environment_device = index;
        }
        if let Some(index) = self.user_camera {
            config.camera.user_device = index;
        }
        if let Some(scale) = self.scale {
            config.dither.initial_scale = scale;
        }
        if let Some(facing) = self.facing {
            config.camera.facing = facing;
        }
        if self.no_detect {
            config.detector.kind = DetectorKind::None;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_leave_config_untouched() {
        let args = Args::try_parse_from(["dither-cam"]).unwrap();
        let mut config = Config::default();
        args.apply_to(&mut config);
        assert_eq!(config.dither.initial_scale, 8);
        assert_eq!(config.camera.facing, FacingMode::Environment);
        assert!(args.command.is_none());
    }

    #[test]
    fn flags_override_config() {
        let args = Args::try_parse_from([
            "dither-cam", "--camera", "2", "--user-camera", "5", "-s", "12", "--facing", "user",
            "--no-detect",
        ])
        .unwrap();
        let mut config = Config::default();
        args.apply_to(&mut config);
        assert_eq!(config.camera.environment_device, 2);
        assert_eq!(config.camera.user_device, 5);
        assert_eq!(config.dither.initial_scale, 12);
        assert_eq!(config.camera.facing, FacingMode::User);
        assert_eq!(config.detector.kind, DetectorKind::None);
    }

    #[test]
    fn list_cameras_subcommand() {
        let args = Args::try_parse_from(["dither-cam", "list-cameras"]).unwrap();
        assert!(matches!(args.command, Some(Command::ListCameras)));
    }
}
