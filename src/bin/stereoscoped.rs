//! stereoscoped - stereo passthrough viewer daemon
//!
//! This daemon:
//! 1. Opens both cameras (both must open, or startup fails)
//! 2. Initializes head tracking (required unless --oculus is given)
//! 3. Spawns one capture worker per eye feeding latest-wins relays
//! 4. Runs the compositor/display/input loop on the main thread
//! 5. Optionally records every composite at a derived, fixed resolution
//! 6. Tears down cooperatively on `q`, window close, or SIGINT

use anyhow::{Context, Result};
use clap::Parser;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use stereoscope::{
    display::DisplayConfig, record::RecorderConfig, CameraConfig, CameraSource, CaptureWorker,
    DisplaySurface, Eye, FrameSlot, ParamStore, Recorder, TrackingConfig, TrackingSource,
    ViewerConfig, ViewerLoop,
};

#[derive(Parser, Debug)]
#[command(name = "stereoscoped", about = "Stereo passthrough viewer for head-mounted displays")]
struct Args {
    /// Left camera index (e.g. /dev/video1 is "1")
    #[arg(short, long)]
    left: Option<u32>,

    /// Right camera index
    #[arg(short, long)]
    right: Option<u32>,

    /// Record composites to the configured output file
    #[arg(short, long)]
    write: bool,

    /// Tolerate head-tracker initialization failure (it is fatal otherwise)
    #[arg(short = 'O', long)]
    oculus: bool,

    /// Recording frame rate
    #[arg(short, long)]
    fps: Option<f64>,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    let mut config = ViewerConfig::load()?;
    if let Some(index) = args.left {
        config.left_device = index.to_string();
    }
    if let Some(index) = args.right {
        config.right_device = index.to_string();
    }
    if let Some(fps) = args.fps {
        config.record_fps = fps;
    }

    let store = ParamStore::new(config.initial_params());
    let params = store.snapshot();

    // Both capture devices must open before any worker enters its loop.
    let left_source = CameraSource::open(CameraConfig {
        device: config.left_device.clone(),
        width: config.canvas_width,
        height: config.canvas_height,
    })
    .context("left camera failed to open; is it connected?")?;
    let right_source = CameraSource::open(CameraConfig {
        device: config.right_device.clone(),
        width: config.canvas_width,
        height: config.canvas_height,
    })
    .context("right camera failed to open; is it connected?")?;

    // The tracker keeps the headset's sensor path alive for the whole run.
    // Required by default; --oculus downgrades a failure to a warning.
    let _tracking = match TrackingSource::initialize(TrackingConfig {
        device: config.tracker_device.clone(),
    }) {
        Ok(source) => Some(source),
        Err(e) if args.oculus => {
            log::warn!("head tracking unavailable, continuing without it: {:#}", e);
            None
        }
        Err(e) => {
            return Err(e.context("head tracking is required (pass --oculus to tolerate failure)"))
        }
    };

    let stop = Arc::new(AtomicBool::new(false));
    {
        let stop = Arc::clone(&stop);
        ctrlc::set_handler(move || stop.store(true, Ordering::Relaxed))
            .context("install SIGINT handler")?;
    }

    let recorder = if args.write {
        let recorder_config = RecorderConfig::for_params(&config.record_path, &params)?;
        Some(Recorder::create(recorder_config)?)
    } else {
        None
    };

    let (preview_width, preview_height) =
        stereoscope::derived_composite_size(&params).unwrap_or((config.canvas_width * 2, config.canvas_height));
    let display = DisplaySurface::create(&DisplayConfig {
        title: "stereoscope".to_string(),
        width: preview_width,
        height: preview_height,
    })?;

    let left_slot = FrameSlot::new();
    let right_slot = FrameSlot::new();
    let workers = vec![
        CaptureWorker::spawn(
            Eye::Left,
            left_source,
            store.clone(),
            left_slot.clone(),
            Arc::clone(&stop),
        )?,
        CaptureWorker::spawn(
            Eye::Right,
            right_source,
            store.clone(),
            right_slot.clone(),
            Arc::clone(&stop),
        )?,
    ];

    log::info!(
        "stereoscoped running: cameras {} / {}, composite {}x{}, recording {}",
        config.left_device,
        config.right_device,
        preview_width,
        preview_height,
        if args.write { config.record_path.as_str() } else { "off" }
    );

    let mut viewer = ViewerLoop::new(
        store,
        left_slot,
        right_slot,
        display,
        recorder,
        Arc::clone(&stop),
    );
    let run_result = viewer.run();

    // Teardown is total even when a step fails: stop the workers (dropping a
    // worker's camera releases the device), then close the recorder and dump
    // the final tuning.
    stop.store(true, Ordering::Relaxed);
    for worker in workers {
        worker.join();
    }
    viewer.shutdown();

    run_result
}
