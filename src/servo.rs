//! Head-tracked actuator bridge.
//!
//! An open-loop mapper, not a controller: each tick reads one orientation
//! sample, pushes it through the fixed pitch/yaw maps and emits the resulting
//! angles to the actuator link. No feedback correction is applied.
//!
//! The serial servo driver is an external collaborator; the built-in link
//! backend logs commanded targets, which is also what the tests observe.

use anyhow::{anyhow, Result};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use crate::tracking::{map_orientation, ActuatorTarget, TrackingSource};

/// Actuator channel assignments on the rig.
pub const YAW_CHANNEL: u8 = 0;
pub const PITCH_CHANNEL: u8 = 1;

/// Bridge tick interval: 20 Hz is plenty for a mechanical pan/tilt rig.
pub const TICK_INTERVAL: Duration = Duration::from_millis(50);

/// Actuator link facade.
///
/// `stub://` devices (and the default) log commanded targets; a real serial
/// device requires an external driver and is reported as such.
pub struct ActuatorLink {
    device: String,
    commands_sent: u64,
    last_targets: [Option<i32>; 2],
}

impl ActuatorLink {
    pub fn open(device: &str) -> Result<Self> {
        if !device.starts_with("stub://") {
            return Err(anyhow!(
                "actuator '{}' needs an external serial driver; only stub:// devices are built in",
                device
            ));
        }
        log::info!("ActuatorLink: opened {} (logging)", device);
        Ok(Self {
            device: device.to_string(),
            commands_sent: 0,
            last_targets: [None, None],
        })
    }

    /// Command one channel to an angle in degrees.
    pub fn set_target(&mut self, channel: u8, angle: i32) -> Result<()> {
        if channel as usize >= self.last_targets.len() {
            return Err(anyhow!("actuator channel {} out of range", channel));
        }
        self.commands_sent += 1;
        self.last_targets[channel as usize] = Some(angle);
        log::debug!("{}: channel {} -> {} deg", self.device, channel, angle);
        Ok(())
    }

    pub fn commands_sent(&self) -> u64 {
        self.commands_sent
    }

    pub fn last_target(&self, channel: u8) -> Option<i32> {
        self.last_targets.get(channel as usize).copied().flatten()
    }
}

/// The bridge loop: tracker in, actuator targets out.
pub struct ServoBridge {
    tracker: TrackingSource,
    link: ActuatorLink,
    stop: Arc<AtomicBool>,
    sample_outage: u64,
    ticks: u64,
}

impl ServoBridge {
    pub fn new(tracker: TrackingSource, link: ActuatorLink, stop: Arc<AtomicBool>) -> Self {
        Self {
            tracker,
            link,
            stop,
            sample_outage: 0,
            ticks: 0,
        }
    }

    /// Park both axes mid-range before tracking starts.
    pub fn center(&mut self) -> Result<()> {
        let yaw_mid = ((crate::tracking::YAW_RANGE.0 + crate::tracking::YAW_RANGE.1) / 2.0) as i32;
        let pitch_mid =
            ((crate::tracking::PITCH_RANGE.0 + crate::tracking::PITCH_RANGE.1) / 2.0) as i32;
        self.link.set_target(YAW_CHANNEL, yaw_mid)?;
        self.link.set_target(PITCH_CHANNEL, pitch_mid)?;
        Ok(())
    }

    /// One bridge tick. `None` means the tick was skipped on a transient
    /// tracking failure.
    pub fn tick(&mut self) -> Result<Option<ActuatorTarget>> {
        self.ticks += 1;
        let sample = match self.tracker.sample() {
            Ok(sample) => sample,
            Err(e) => {
                if self.sample_outage == 0 {
                    log::warn!("tracking sample failed, holding position: {:#}", e);
                }
                self.sample_outage += 1;
                return Ok(None);
            }
        };
        if self.sample_outage > 0 {
            log::info!("tracking recovered after {} dropped samples", self.sample_outage);
            self.sample_outage = 0;
        }

        let target = map_orientation(&sample);
        self.link.set_target(YAW_CHANNEL, target.yaw_angle)?;
        self.link.set_target(PITCH_CHANNEL, target.pitch_angle)?;
        Ok(Some(target))
    }

    /// Run until the stop flag is set.
    pub fn run(&mut self) -> Result<()> {
        self.center()?;
        while !self.stop.load(Ordering::Relaxed) {
            self.tick()?;
            thread::sleep(TICK_INTERVAL);
        }
        log::info!("servo bridge stopped after {} ticks", self.ticks);
        Ok(())
    }

    pub fn link(&self) -> &ActuatorLink {
        &self.link
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
