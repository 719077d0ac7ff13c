//! Frame capture.
//!
//! One `CameraSource` per eye, each driven by its own `CaptureWorker` thread:
//!
//! - `stub://<name>` device strings dispatch to a synthetic source that needs
//!   no hardware (and can script read failures for tests)
//! - integer device strings dispatch to a real camera via nokhwa
//!   (feature: capture-nokhwa)
//!
//! A worker's lifecycle is OPEN → RUNNING → STOPPED: the source is opened
//! before the thread spawns (open failure is a fatal startup fault and is
//! checked for both eyes before either worker runs), the running loop turns
//! raw frames into corrected frames through the transform engine, and the
//! shared stop flag ends the loop cooperatively.
//!
//! Each worker owns its fault domain. A failed read skips the tick and is
//! logged once per outage; it never stops the worker, the other eye, or the
//! compositor.

mod synthetic;
mod worker;

#[cfg(feature = "capture-nokhwa")]
mod nokhwa;

use anyhow::{anyhow, Result};
use image::RgbImage;

use crate::Eye;
use synthetic::SyntheticCameraSource;

#[cfg(feature = "capture-nokhwa")]
use self::nokhwa::NokhwaCameraSource;

pub use worker::CaptureWorker;

/// Configuration for one camera.
#[derive(Clone, Debug)]
pub struct CameraConfig {
    /// Device string: a bare integer index ("0") or a `stub://` name.
    pub device: String,
    /// Preferred capture width.
    pub width: u32,
    /// Preferred capture height.
    pub height: u32,
}

impl CameraConfig {
    pub fn for_index(index: u32, width: u32, height: u32) -> Self {
        Self {
            device: index.to_string(),
            width,
            height,
        }
    }
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            device: "0".to_string(),
            width: 720,
            height: 480,
        }
    }
}

/// A corrected frame tagged with its eye, as handed to the compositor.
#[derive(Clone, Debug)]
pub struct EyeFrame {
    pub eye: Eye,
    pub image: RgbImage,
    /// Per-eye frame counter; the eyes' counters are independent.
    pub sequence: u64,
}

/// Statistics for a camera source.
#[derive(Clone, Debug)]
pub struct CaptureStats {
    pub frames_read: u64,
    pub frames_failed: u64,
    pub device: String,
}

/// Camera device facade.
pub struct CameraSource {
    backend: CameraBackend,
}

enum CameraBackend {
    Synthetic(SyntheticCameraSource),
    #[cfg(feature = "capture-nokhwa")]
    Device(NokhwaCameraSource),
}

impl CameraSource {
    /// Open the device. Failure here is a fatal startup fault for the daemon.
    pub fn open(config: CameraConfig) -> Result<Self> {
        if config.device.starts_with("stub://") {
            return Ok(Self {
                backend: CameraBackend::Synthetic(SyntheticCameraSource::open(config)?),
            });
        }

        let index: u32 = config.device.parse().map_err(|_| {
            anyhow!(
                "camera device must be an integer index or a stub:// name, got '{}'",
                config.device
            )
        })?;

        #[cfg(feature = "capture-nokhwa")]
        {
            Ok(Self {
                backend: CameraBackend::Device(NokhwaCameraSource::open(index, config)?),
            })
        }
        #[cfg(not(feature = "capture-nokhwa"))]
        {
            let _ = index;
            Err(anyhow!(
                "camera index {} requires the capture-nokhwa feature",
                config.device
            ))
        }
    }

    /// Read one raw frame. Failure is recoverable; the caller skips the tick.
    pub fn read_frame(&mut self) -> Result<RgbImage> {
        match &mut self.backend {
            CameraBackend::Synthetic(source) => source.read_frame(),
            #[cfg(feature = "capture-nokhwa")]
            CameraBackend::Device(source) => source.read_frame(),
        }
    }

    pub fn stats(&self) -> CaptureStats {
        match &self.backend {
            CameraBackend::Synthetic(source) => source.stats(),
            #[cfg(feature = "capture-nokhwa")]
            CameraBackend::Device(source) => source.stats(),
        }
    }

    pub fn device(&self) -> &str {
        match &self.backend {
            CameraBackend::Synthetic(source) => source.device(),
            #[cfg(feature = "capture-nokhwa")]
            CameraBackend::Device(source) => source.device(),
        }
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stub_devices_open_without_hardware() -> Result<()> {
        let mut source = CameraSource::open(CameraConfig {
            device: "stub://left".to_string(),
            width: 720,
            height: 480,
        })?;
        let frame = source.read_frame()?;
        assert_eq!(frame.dimensions(), (720, 480));
        assert_eq!(source.stats().frames_read, 1);
        Ok(())
    }

    #[test]
    fn garbage_device_strings_are_rejected_at_open() {
        let result = CameraSource::open(CameraConfig {
            device: "camera-one".to_string(),
            width: 720,
            height: 480,
        });
        assert!(result.is_err());
    }
}
