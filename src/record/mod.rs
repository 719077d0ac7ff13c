//! Composite recording.
//!
//! When `--write` is given the daemon appends every presented composite to a
//! video file at the configured target frame rate. The output resolution is
//! not guessed and not hard-coded: `derived_composite_size` computes it from
//! the tuning parameters the recorder was created with, and that law is
//! pinned by a test.
//!
//! Live tuning can change the composite size after recording has started. A
//! frame that no longer matches the configured output is skipped with a
//! once-per-episode warning — the on-disk stream stays well-formed and the
//! mismatch is observable in the log.
//!
//! Backends:
//! - `stub://` paths count frames without touching the filesystem (tests)
//! - real paths encode via ffmpeg (feature: record-ffmpeg); requesting a real
//!   recording without the feature is a startup error

#[cfg(feature = "record-ffmpeg")]
mod ffmpeg;

use anyhow::{anyhow, Result};
use image::RgbImage;

use crate::params::TuningParams;

#[cfg(feature = "record-ffmpeg")]
use self::ffmpeg::FfmpegRecorder;

pub const DEFAULT_OUTPUT_PATH: &str = "output.avi";

/// Configuration for the recording sink.
#[derive(Clone, Debug)]
pub struct RecorderConfig {
    /// Output path, or `stub://` for the counting sink.
    pub path: String,
    /// Playback rate stamped into the container. USB cameras rarely exceed
    /// ~15 fps; setting this higher makes the recording play sped-up.
    pub fps: f64,
    pub width: u32,
    pub height: u32,
}

impl RecorderConfig {
    /// Configure for the composite the current tuning produces.
    pub fn for_params(path: &str, params: &TuningParams) -> Result<Self> {
        let (width, height) = derived_composite_size(params)
            .ok_or_else(|| anyhow!("crop margins leave no composite to record"))?;
        Ok(Self {
            path: path.to_string(),
            fps: params.target_fps,
            width,
            height,
        })
    }
}

/// The side-by-side composite size the given tuning produces:
/// twice the cropped width by the cropped height. `None` when the margins
/// consume the whole canvas.
pub fn derived_composite_size(params: &TuningParams) -> Option<(u32, u32)> {
    let (left, right, top, bottom) = params.crop_margins();
    let canvas_w = params.canvas_width();
    let canvas_h = params.canvas_height();
    let eye_w = canvas_w.checked_sub(left + right).filter(|w| *w > 0)?;
    let eye_h = canvas_h.checked_sub(top + bottom).filter(|h| *h > 0)?;
    Some((eye_w * 2, eye_h))
}

/// Recording sink facade.
pub struct Recorder {
    backend: RecorderBackend,
    config: RecorderConfig,
    frames_written: u64,
    frames_skipped: u64,
    mismatch_reported: bool,
}

enum RecorderBackend {
    Counting,
    #[cfg(feature = "record-ffmpeg")]
    Ffmpeg(FfmpegRecorder),
}

impl Recorder {
    /// Open the recording sink. Failure here is a fatal startup fault — the
    /// operator asked for a recording the process cannot produce.
    pub fn create(config: RecorderConfig) -> Result<Self> {
        if config.fps <= 0.0 {
            return Err(anyhow!("recording fps must be positive, got {}", config.fps));
        }
        let backend = if config.path.starts_with("stub://") {
            RecorderBackend::Counting
        } else {
            #[cfg(feature = "record-ffmpeg")]
            {
                RecorderBackend::Ffmpeg(FfmpegRecorder::create(&config)?)
            }
            #[cfg(not(feature = "record-ffmpeg"))]
            {
                return Err(anyhow!(
                    "recording to {} requires the record-ffmpeg feature",
                    config.path
                ));
            }
        };

        log::info!(
            "recording {}x{} @ {} fps to {}",
            config.width,
            config.height,
            config.fps,
            config.path
        );
        Ok(Self {
            backend,
            config,
            frames_written: 0,
            frames_skipped: 0,
            mismatch_reported: false,
        })
    }

    /// Append one composite. Mismatched sizes are skipped, not rescaled.
    pub fn write_frame(&mut self, frame: &RgbImage) -> Result<()> {
        if frame.dimensions() != (self.config.width, self.config.height) {
            if !self.mismatch_reported {
                log::warn!(
                    "composite is {}x{} but the recording is {}x{}; skipping frames until sizes match again",
                    frame.width(),
                    frame.height(),
                    self.config.width,
                    self.config.height
                );
                self.mismatch_reported = true;
            }
            self.frames_skipped += 1;
            return Ok(());
        }
        self.mismatch_reported = false;

        match &mut self.backend {
            RecorderBackend::Counting => {}
            #[cfg(feature = "record-ffmpeg")]
            RecorderBackend::Ffmpeg(recorder) => recorder.write_frame(frame)?,
        }
        self.frames_written += 1;
        Ok(())
    }

    pub fn frames_written(&self) -> u64 {
        self.frames_written
    }

    pub fn frames_skipped(&self) -> u64 {
        self.frames_skipped
    }

    /// Flush and close the recording. Best-effort at shutdown: callers log a
    /// failure and carry on releasing everything else.
    pub fn finish(self) -> Result<()> {
        match self.backend {
            RecorderBackend::Counting => Ok(()),
            #[cfg(feature = "record-ffmpeg")]
            RecorderBackend::Ffmpeg(recorder) => recorder.finish(),
        }
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
