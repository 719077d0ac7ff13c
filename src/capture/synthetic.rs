//! Synthetic camera source for `stub://` devices.
//!
//! Produces a deterministic moving gradient so tests and hardware-free runs
//! exercise the full pipeline. A failure window can be scripted into the
//! device string — `stub://left?fail=5..8` makes reads 5, 6 and 7 (0-based)
//! fail — which is how the worker-resilience tests simulate a camera
//! intermittently dropping frames.

use anyhow::{anyhow, Result};
use image::{Rgb, RgbImage};
use std::ops::Range;

use crate::stub::parse_stub_device;

use super::{CameraConfig, CaptureStats};

pub(crate) struct SyntheticCameraSource {
    device: String,
    width: u32,
    height: u32,
    /// Seed derived from the device name so the two eyes differ.
    seed: u8,
    fail_window: Option<Range<u64>>,
    frames_read: u64,
    frames_failed: u64,
    reads_attempted: u64,
}

impl SyntheticCameraSource {
    pub(crate) fn open(config: CameraConfig) -> Result<Self> {
        let (name, fail_window) = parse_stub_device(&config.device)?;
        let seed = name.bytes().fold(0u8, |acc, b| acc.wrapping_add(b));
        log::info!("CameraSource: opened {} (synthetic)", config.device);

        Ok(Self {
            device: config.device.clone(),
            width: config.width,
            height: config.height,
            seed,
            fail_window,
            frames_read: 0,
            frames_failed: 0,
            reads_attempted: 0,
        })
    }

    pub(crate) fn read_frame(&mut self) -> Result<RgbImage> {
        let tick = self.reads_attempted;
        self.reads_attempted += 1;

        if let Some(window) = &self.fail_window {
            if window.contains(&tick) {
                self.frames_failed += 1;
                return Err(anyhow!("synthetic read failure at tick {}", tick));
            }
        }

        self.frames_read += 1;
        let seed = self.seed;
        let phase = (self.frames_read % 256) as u8;
        Ok(RgbImage::from_fn(self.width, self.height, |x, y| {
            Rgb([
                (x % 256) as u8 ^ seed,
                (y % 256) as u8,
                phase.wrapping_add((x + y) as u8),
            ])
        }))
    }

    pub(crate) fn stats(&self) -> CaptureStats {
        CaptureStats {
            frames_read: self.frames_read,
            frames_failed: self.frames_failed,
            device: self.device.clone(),
        }
    }

    pub(crate) fn device(&self) -> &str {
        &self.device
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
