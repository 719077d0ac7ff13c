//! Head-orientation tracking.
//!
//! The tracking SDK itself is an external collaborator; this module models
//! the interface the pipeline consumes — initialize, then read one
//! pitch/yaw/roll sample per tick — plus the fixed linear maps from head
//! pose onto actuator angles.
//!
//! The built-in backend is synthetic (`stub://` devices): a deterministic
//! sweep through the tracked domains, with the usual scriptable failure
//! window. Initializing a non-stub device reports that the external SDK is
//! not linked; whether that is fatal is the daemon's call (the `--oculus`
//! flag).

use anyhow::{anyhow, Result};
use std::ops::Range;

use crate::stub::parse_stub_device;

/// One head-pose reading. Ephemeral; a new sample is read every tick.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct OrientationSample {
    pub pitch: f64,
    pub yaw: f64,
    pub roll: f64,
}

/// A commanded pair of actuator angles, in degrees.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ActuatorTarget {
    pub yaw_angle: i32,
    pub pitch_angle: i32,
}

// Tracked head-pose domains and the actuator ranges they map onto. Tuned for
// the mounted servo rig; the mapping is open-loop by design.
pub const PITCH_DOMAIN: (f64, f64) = (-0.3, 0.7);
pub const PITCH_RANGE: (f64, f64) = (0.0, 180.0);
pub const YAW_DOMAIN: (f64, f64) = (-0.7, 0.7);
pub const YAW_RANGE: (f64, f64) = (15.0, 165.0);

/// Map a pitch sample onto the tilt servo.
///
/// Sign-inverted: pitching up drives the angle down. The domain's low end
/// (-0.3) therefore lands on 180 and the high end (0.7) on 0, with
/// out-of-domain samples clamped to those extremes.
pub fn map_pitch(pitch: f64) -> i32 {
    let inverted_domain = (-PITCH_DOMAIN.1, -PITCH_DOMAIN.0);
    interp_clamped(-pitch, inverted_domain, PITCH_RANGE).round() as i32
}

/// Map a yaw sample onto the pan servo.
pub fn map_yaw(yaw: f64) -> i32 {
    interp_clamped(yaw, YAW_DOMAIN, YAW_RANGE).round() as i32
}

/// Resolve a full sample to the actuator pair. Roll is unused; the rig has
/// no third axis.
pub fn map_orientation(sample: &OrientationSample) -> ActuatorTarget {
    ActuatorTarget {
        yaw_angle: map_yaw(sample.yaw),
        pitch_angle: map_pitch(sample.pitch),
    }
}

/// Linear interpolation with the output clamped to the range endpoints,
/// matching the edge behavior the calibration was tuned against.
fn interp_clamped(x: f64, domain: (f64, f64), range: (f64, f64)) -> f64 {
    let t = ((x - domain.0) / (domain.1 - domain.0)).clamp(0.0, 1.0);
    range.0 + t * (range.1 - range.0)
}

/// Configuration for the tracking source.
#[derive(Clone, Debug)]
pub struct TrackingConfig {
    /// Device string; only `stub://` backends are built in.
    pub device: String,
}

impl Default for TrackingConfig {
    fn default() -> Self {
        Self {
            device: "stub://hmd".to_string(),
        }
    }
}

/// Head tracker facade.
pub struct TrackingSource {
    backend: TrackingBackend,
}

enum TrackingBackend {
    Synthetic(SyntheticTracker),
}

impl TrackingSource {
    /// Initialize the tracker. The caller decides whether failure is fatal.
    pub fn initialize(config: TrackingConfig) -> Result<Self> {
        if config.device.starts_with("stub://") {
            return Ok(Self {
                backend: TrackingBackend::Synthetic(SyntheticTracker::new(&config.device)?),
            });
        }
        Err(anyhow!(
            "head tracker '{}' needs an external tracking SDK; only stub:// devices are built in",
            config.device
        ))
    }

    /// Read one orientation sample. Failure is transient; the caller skips
    /// the tick.
    pub fn sample(&mut self) -> Result<OrientationSample> {
        match &mut self.backend {
            TrackingBackend::Synthetic(tracker) => tracker.sample(),
        }
    }
}

// ----------------------------------------------------------------------------
// Synthetic tracker (stub://) for tests and hardware-free runs
// ----------------------------------------------------------------------------

struct SyntheticTracker {
    ticks: u64,
    fail_window: Option<Range<u64>>,
}

impl SyntheticTracker {
    fn new(device: &str) -> Result<Self> {
        let (_, fail_window) = parse_stub_device(device)?;
        log::info!("TrackingSource: initialized {} (synthetic)", device);
        Ok(Self {
            ticks: 0,
            fail_window,
        })
    }

    fn sample(&mut self) -> Result<OrientationSample> {
        let tick = self.ticks;
        self.ticks += 1;

        if let Some(window) = &self.fail_window {
            if window.contains(&tick) {
                return Err(anyhow!("synthetic tracking dropout at tick {}", tick));
            }
        }

        // Triangle sweeps through the tracked domains, out of phase so pitch
        // and yaw do not move in lockstep.
        Ok(OrientationSample {
            pitch: triangle(tick, 80, PITCH_DOMAIN),
            yaw: triangle(tick + 20, 60, YAW_DOMAIN),
            roll: 0.0,
        })
    }
}

/// Triangle wave over `domain` with the given period in ticks.
fn triangle(tick: u64, period: u64, domain: (f64, f64)) -> f64 {
    let phase = (tick % period) as f64 / period as f64;
    let t = if phase < 0.5 { phase * 2.0 } else { 2.0 - phase * 2.0 };
    domain.0 + t * (domain.1 - domain.0)
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
