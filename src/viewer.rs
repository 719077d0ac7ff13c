//! Compositor and control loop.
//!
//! The consumer side of the pipeline: each tick polls the keyboard, then
//! checks both eye relays and — when both are loaded — joins the two
//! corrected frames, presents the composite and optionally records it.
//!
//! The loop never waits on a particular eye. If one camera stalls, the other
//! eye's frames keep landing in its relay and are simply held until the
//! stalled eye recovers; composite output pauses but input handling and the
//! surface stay live. Left/right frame-index skew is bounded by the relays'
//! capacity of one and is accepted by design.

use anyhow::Result;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use crate::capture::EyeFrame;
use crate::compose;
use crate::display::DisplaySurface;
use crate::input::{self, ControlAction};
use crate::params::ParamStore;
use crate::record::Recorder;
use crate::relay::FrameSlot;

const IDLE_BACKOFF: Duration = Duration::from_millis(1);
const HEALTH_LOG_INTERVAL: Duration = Duration::from_secs(5);

/// What one tick accomplished.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TickOutcome {
    /// A composite was presented (and recorded, when enabled).
    Composited,
    /// At least one relay was empty; nothing to present.
    Idle,
    /// Shutdown was requested via the keyboard or a closed window.
    Quit,
}

/// The main-thread loop: compositor, display and input in one tick.
pub struct ViewerLoop {
    store: ParamStore,
    left: FrameSlot<EyeFrame>,
    right: FrameSlot<EyeFrame>,
    display: DisplaySurface,
    recorder: Option<Recorder>,
    stop: Arc<AtomicBool>,
    composites: u64,
    join_fault_reported: bool,
    last_health_log: Instant,
}

impl ViewerLoop {
    pub fn new(
        store: ParamStore,
        left: FrameSlot<EyeFrame>,
        right: FrameSlot<EyeFrame>,
        display: DisplaySurface,
        recorder: Option<Recorder>,
        stop: Arc<AtomicBool>,
    ) -> Self {
        Self {
            store,
            left,
            right,
            display,
            recorder,
            stop,
            composites: 0,
            join_fault_reported: false,
            last_health_log: Instant::now(),
        }
    }

    /// One compositor tick. Runs input handling first so tuning and quit
    /// stay responsive even while a camera is down.
    pub fn tick(&mut self) -> Result<TickOutcome> {
        for key in self.display.poll_keys() {
            if input::handle_key(&self.store, key) == ControlAction::Quit {
                self.stop.store(true, Ordering::Relaxed);
                return Ok(TickOutcome::Quit);
            }
        }
        if !self.display.is_open() {
            self.stop.store(true, Ordering::Relaxed);
            return Ok(TickOutcome::Quit);
        }

        if !(self.left.is_loaded() && self.right.is_loaded()) {
            return Ok(TickOutcome::Idle);
        }
        let (Some(left), Some(right)) = (self.left.take(), self.right.take()) else {
            return Ok(TickOutcome::Idle);
        };

        let composite = match compose::join(&left.image, &right.image) {
            Ok(frame) => frame,
            Err(e) => {
                // Tuning changed between the eyes' corrections; the next
                // pair will agree again.
                if !self.join_fault_reported {
                    log::warn!("dropping composite: {:#}", e);
                    self.join_fault_reported = true;
                }
                return Ok(TickOutcome::Idle);
            }
        };
        self.join_fault_reported = false;

        self.display.present(&composite)?;
        if let Some(recorder) = &mut self.recorder {
            recorder.write_frame(&composite)?;
        }
        self.composites += 1;

        if self.last_health_log.elapsed() >= HEALTH_LOG_INTERVAL {
            log::info!(
                "compositor: {} composites presented (left seq {}, right seq {})",
                self.composites,
                left.sequence,
                right.sequence
            );
            self.last_health_log = Instant::now();
        }

        Ok(TickOutcome::Composited)
    }

    /// Run until the stop flag is set or shutdown is requested.
    pub fn run(&mut self) -> Result<()> {
        while !self.stop.load(Ordering::Relaxed) {
            match self.tick()? {
                TickOutcome::Quit => break,
                TickOutcome::Idle => thread::sleep(IDLE_BACKOFF),
                TickOutcome::Composited => {}
            }
        }
        Ok(())
    }

    pub fn composites(&self) -> u64 {
        self.composites
    }

    pub fn display_mut(&mut self) -> &mut DisplaySurface {
        &mut self.display
    }

    /// Release the recording and dump the final tuning. Best-effort and
    /// total: a failing step is logged and the rest of teardown proceeds.
    pub fn shutdown(self) {
        if let Some(recorder) = self.recorder {
            let written = recorder.frames_written();
            match recorder.finish() {
                Ok(()) => log::info!("recording closed with {} frames", written),
                Err(e) => log::error!("failed to finalize recording: {:#}", e),
            }
        }
        input::log_param_dump(&self.store);
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
