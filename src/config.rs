//! Daemon configuration.
//!
//! Layered the usual way: built-in defaults, then an optional JSON config
//! file named by `STEREOSCOPE_CONFIG`, then `STEREOSCOPE_*` environment
//! overrides, then validation. Command-line flags are applied on top by the
//! binaries and win over everything.
//!
//! The calibration constants themselves live in `params`; this module only
//! decides which devices to open and where recordings go.

use anyhow::{anyhow, Result};
use serde::Deserialize;
use std::path::Path;

use crate::params::TuningParams;

const DEFAULT_LEFT_DEVICE: &str = "0";
const DEFAULT_RIGHT_DEVICE: &str = "1";
const DEFAULT_RECORD_PATH: &str = crate::record::DEFAULT_OUTPUT_PATH;
const DEFAULT_TRACKER_DEVICE: &str = "stub://hmd";
const DEFAULT_ACTUATOR_DEVICE: &str = "stub://maestro";

#[derive(Debug, Deserialize, Default)]
struct ViewerConfigFile {
    cameras: Option<CamerasFile>,
    canvas: Option<CanvasFile>,
    recording: Option<RecordingFile>,
    tracking: Option<TrackingFile>,
}

#[derive(Debug, Deserialize, Default)]
struct CamerasFile {
    left: Option<String>,
    right: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
struct CanvasFile {
    width: Option<u32>,
    height: Option<u32>,
}

#[derive(Debug, Deserialize, Default)]
struct RecordingFile {
    path: Option<String>,
    fps: Option<f64>,
}

#[derive(Debug, Deserialize, Default)]
struct TrackingFile {
    device: Option<String>,
    actuator: Option<String>,
}

/// Resolved configuration for both binaries.
#[derive(Debug, Clone)]
pub struct ViewerConfig {
    pub left_device: String,
    pub right_device: String,
    pub canvas_width: u32,
    pub canvas_height: u32,
    pub record_path: String,
    pub record_fps: f64,
    pub tracker_device: String,
    pub actuator_device: String,
}

impl ViewerConfig {
    pub fn load() -> Result<Self> {
        let config_path = std::env::var("STEREOSCOPE_CONFIG").ok();
        let file_cfg = match config_path.as_deref() {
            Some(path) => Some(read_config_file(Path::new(path))?),
            None => None,
        };
        let mut cfg = Self::from_file(file_cfg.unwrap_or_default());
        cfg.apply_env()?;
        cfg.validate()?;
        Ok(cfg)
    }

    fn from_file(file: ViewerConfigFile) -> Self {
        let left_device = file
            .cameras
            .as_ref()
            .and_then(|cameras| cameras.left.clone())
            .unwrap_or_else(|| DEFAULT_LEFT_DEVICE.to_string());
        let right_device = file
            .cameras
            .as_ref()
            .and_then(|cameras| cameras.right.clone())
            .unwrap_or_else(|| DEFAULT_RIGHT_DEVICE.to_string());
        let canvas_width = file
            .canvas
            .as_ref()
            .and_then(|canvas| canvas.width)
            .unwrap_or(crate::params::DEFAULT_CANVAS_WIDTH as u32);
        let canvas_height = file
            .canvas
            .as_ref()
            .and_then(|canvas| canvas.height)
            .unwrap_or(crate::params::DEFAULT_CANVAS_HEIGHT as u32);
        let record_path = file
            .recording
            .as_ref()
            .and_then(|recording| recording.path.clone())
            .unwrap_or_else(|| DEFAULT_RECORD_PATH.to_string());
        let record_fps = file
            .recording
            .as_ref()
            .and_then(|recording| recording.fps)
            .unwrap_or(crate::params::DEFAULT_TARGET_FPS);
        let tracker_device = file
            .tracking
            .as_ref()
            .and_then(|tracking| tracking.device.clone())
            .unwrap_or_else(|| DEFAULT_TRACKER_DEVICE.to_string());
        let actuator_device = file
            .tracking
            .and_then(|tracking| tracking.actuator)
            .unwrap_or_else(|| DEFAULT_ACTUATOR_DEVICE.to_string());

        Self {
            left_device,
            right_device,
            canvas_width,
            canvas_height,
            record_path,
            record_fps,
            tracker_device,
            actuator_device,
        }
    }

    fn apply_env(&mut self) -> Result<()> {
        if let Ok(device) = std::env::var("STEREOSCOPE_LEFT_DEVICE") {
            if !device.trim().is_empty() {
                self.left_device = device;
            }
        }
        if let Ok(device) = std::env::var("STEREOSCOPE_RIGHT_DEVICE") {
            if !device.trim().is_empty() {
                self.right_device = device;
            }
        }
        if let Ok(path) = std::env::var("STEREOSCOPE_RECORD_PATH") {
            if !path.trim().is_empty() {
                self.record_path = path;
            }
        }
        if let Ok(fps) = std::env::var("STEREOSCOPE_RECORD_FPS") {
            self.record_fps = fps
                .parse()
                .map_err(|_| anyhow!("STEREOSCOPE_RECORD_FPS must be a number"))?;
        }
        if let Ok(device) = std::env::var("STEREOSCOPE_TRACKER") {
            if !device.trim().is_empty() {
                self.tracker_device = device;
            }
        }
        if let Ok(device) = std::env::var("STEREOSCOPE_ACTUATOR") {
            if !device.trim().is_empty() {
                self.actuator_device = device;
            }
        }
        Ok(())
    }

    fn validate(&self) -> Result<()> {
        if self.canvas_width == 0 || self.canvas_height == 0 {
            return Err(anyhow!("canvas dimensions must be non-zero"));
        }
        if self.record_fps <= 0.0 {
            return Err(anyhow!("recording fps must be positive"));
        }
        if self.left_device == self.right_device {
            return Err(anyhow!(
                "left and right cameras resolve to the same device '{}'",
                self.left_device
            ));
        }
        Ok(())
    }

    /// The initial tuning set: calibration defaults with this deployment's
    /// canvas geometry and recording rate.
    pub fn initial_params(&self) -> TuningParams {
        TuningParams {
            canvas_width: self.canvas_width as f64,
            canvas_height: self.canvas_height as f64,
            target_fps: self.record_fps,
            ..TuningParams::default()
        }
    }
}

fn read_config_file(path: &Path) -> Result<ViewerConfigFile> {
    let raw = std::fs::read_to_string(path)
        .map_err(|e| anyhow!("failed to read config file {}: {}", path.display(), e))?;
    let cfg = serde_json::from_str(&raw)
        .map_err(|e| anyhow!("invalid config file {}: {}", path.display(), e))?;
    Ok(cfg)
}
