//! Per-eye capture worker thread.

use anyhow::Context;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use crate::params::ParamStore;
use crate::relay::FrameSlot;
use crate::warp;
use crate::Eye;

use super::{CameraSource, EyeFrame};

/// How long a worker backs off after a failed read before retrying. Camera
/// devices intermittently drop frames; hammering a failing device helps
/// nothing.
const READ_RETRY_BACKOFF: Duration = Duration::from_millis(5);

/// One eye's capture loop, running on its own OS thread.
///
/// The worker owns its camera handle and its fault domain: read failures and
/// degenerate crop geometry skip the tick and are logged once per outage,
/// never propagated. The loop exits only when the shared stop flag is set.
pub struct CaptureWorker {
    eye: Eye,
    handle: thread::JoinHandle<()>,
}

impl CaptureWorker {
    /// Spawn the worker. The camera must already be open — open failures are
    /// fatal startup faults and are checked for both eyes before any worker
    /// spawns.
    pub fn spawn(
        eye: Eye,
        source: CameraSource,
        store: ParamStore,
        slot: FrameSlot<EyeFrame>,
        stop: Arc<AtomicBool>,
    ) -> anyhow::Result<Self> {
        let handle = thread::Builder::new()
            .name(format!("capture-{}", eye.label()))
            .spawn(move || run_loop(eye, source, store, slot, stop))
            .with_context(|| format!("spawn capture worker for {} eye", eye.label()))?;
        Ok(Self { eye, handle })
    }

    pub fn eye(&self) -> Eye {
        self.eye
    }

    /// Wait for the loop to observe the stop flag and finish.
    pub fn join(self) {
        if self.handle.join().is_err() {
            log::error!("capture worker ({}) panicked", self.eye.label());
        }
    }
}

fn run_loop(
    eye: Eye,
    mut source: CameraSource,
    store: ParamStore,
    slot: FrameSlot<EyeFrame>,
    stop: Arc<AtomicBool>,
) {
    let mut sequence = 0u64;
    let mut dropped = 0u64;
    let mut read_outage = 0u64;
    let mut crop_fault_reported = false;

    while !stop.load(Ordering::Relaxed) {
        let raw = match source.read_frame() {
            Ok(frame) => frame,
            Err(e) => {
                if read_outage == 0 {
                    log::warn!(
                        "capture ({}): frame read failed, skipping ticks until recovery: {:#}",
                        eye.label(),
                        e
                    );
                }
                read_outage += 1;
                thread::sleep(READ_RETRY_BACKOFF);
                continue;
            }
        };
        if read_outage > 0 {
            log::info!(
                "capture ({}): recovered after {} failed reads",
                eye.label(),
                read_outage
            );
            read_outage = 0;
        }

        let params = store.snapshot();
        let plan = warp::plan_for(&params, eye);
        let corrected = warp::correct_frame(&raw, &plan);

        if corrected.width() == 0 || corrected.height() == 0 {
            if !crop_fault_reported {
                log::warn!(
                    "capture ({}): crop margins {:?} leave no image on a {}x{} canvas; skipping frames",
                    eye.label(),
                    plan.crop,
                    plan.canvas_width,
                    plan.canvas_height
                );
                crop_fault_reported = true;
            }
            continue;
        }
        crop_fault_reported = false;

        sequence += 1;
        if slot.publish(EyeFrame {
            eye,
            image: corrected,
            sequence,
        }) {
            dropped += 1;
        }

        // Yield so the compositor and the sibling worker get scheduled even
        // when reads return instantly (synthetic sources).
        thread::yield_now();
    }

    let stats = source.stats();
    log::info!(
        "capture ({}): stopped; {} reads, {} read failures, {} corrected frames ({} overwritten unconsumed)",
        eye.label(),
        stats.frames_read,
        stats.frames_failed,
        sequence,
        dropped
    );
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
