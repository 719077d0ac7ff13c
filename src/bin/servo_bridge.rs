//! servo_bridge - head-tracked pan/tilt bridge
//!
//! Reads head orientation at 20 Hz and maps pitch/yaw onto the two actuator
//! channels through the fixed calibration ranges. Open-loop: no feedback
//! correction, just sample → map → emit until SIGINT.

use anyhow::{Context, Result};
use clap::Parser;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use stereoscope::{ActuatorLink, ServoBridge, TrackingConfig, TrackingSource, ViewerConfig};

#[derive(Parser, Debug)]
#[command(name = "servo_bridge", about = "Map head orientation onto pan/tilt servo targets")]
struct Args {
    /// Tracking device (overrides the configured one)
    #[arg(long)]
    tracker: Option<String>,

    /// Actuator device (overrides the configured one)
    #[arg(long)]
    actuator: Option<String>,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    let mut config = ViewerConfig::load()?;
    if let Some(tracker) = args.tracker {
        config.tracker_device = tracker;
    }
    if let Some(actuator) = args.actuator {
        config.actuator_device = actuator;
    }

    // The bridge exists to consume tracking, so init failure is always fatal
    // here, unlike the viewer's --oculus escape hatch.
    let tracker = TrackingSource::initialize(TrackingConfig {
        device: config.tracker_device.clone(),
    })
    .context("head tracking failed to initialize; is the headset connected?")?;
    let link = ActuatorLink::open(&config.actuator_device)?;

    let stop = Arc::new(AtomicBool::new(false));
    {
        let stop = Arc::clone(&stop);
        ctrlc::set_handler(move || stop.store(true, Ordering::Relaxed))
            .context("install SIGINT handler")?;
    }

    log::info!(
        "servo_bridge running: tracker {}, actuator {}",
        config.tracker_device,
        config.actuator_device
    );

    let mut bridge = ServoBridge::new(tracker, link, stop);
    bridge.run()
}
