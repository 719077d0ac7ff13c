//! Real camera source backed by nokhwa (feature: capture-nokhwa).

use anyhow::{anyhow, Context, Result};
use image::RgbImage;
use nokhwa::{
    pixel_format::RgbFormat,
    utils::{CameraIndex, RequestedFormat, RequestedFormatType},
    Camera,
};

use super::{CameraConfig, CaptureStats};

pub(crate) struct NokhwaCameraSource {
    camera: Camera,
    device: String,
    frames_read: u64,
    frames_failed: u64,
}

impl NokhwaCameraSource {
    pub(crate) fn open(index: u32, config: CameraConfig) -> Result<Self> {
        let requested =
            RequestedFormat::new::<RgbFormat>(RequestedFormatType::AbsoluteHighestFrameRate);
        let mut camera = Camera::new(CameraIndex::Index(index), requested)
            .map_err(|e| anyhow!(e))
            .with_context(|| format!("open camera index {}", index))?;
        camera
            .open_stream()
            .map_err(|e| anyhow!(e))
            .with_context(|| format!("start stream on camera index {}", index))?;

        log::info!(
            "CameraSource: opened index {} ({}, {})",
            index,
            camera.info().human_name(),
            camera.camera_format()
        );

        Ok(Self {
            camera,
            device: config.device,
            frames_read: 0,
            frames_failed: 0,
        })
    }

    pub(crate) fn read_frame(&mut self) -> Result<RgbImage> {
        // Decoded pixels are moved out as raw bytes at this boundary and
        // rebuilt as our own buffer type.
        let decoded = self
            .camera
            .frame()
            .and_then(|frame| frame.decode_image::<RgbFormat>())
            .map_err(|e| {
                self.frames_failed += 1;
                anyhow!(e)
            })
            .with_context(|| format!("read frame from camera {}", self.device))?;

        let (width, height) = (decoded.width(), decoded.height());
        let frame = RgbImage::from_raw(width, height, decoded.into_raw()).ok_or_else(|| {
            self.frames_failed += 1;
            anyhow!("camera {} returned a malformed {}x{} frame buffer", self.device, width, height)
        })?;
        self.frames_read += 1;
        Ok(frame)
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

impl Drop for NokhwaCameraSource {
    fn drop(&mut self) {
        // Best-effort release; a failure here must not block the rest of
        // teardown.
        if let Err(e) = self.camera.stop_stream() {
            log::warn!("CameraSource: release of {} failed: {}", self.device, e);
        }
    }
}
