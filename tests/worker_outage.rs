//! One camera failing must never stall the other eye or the compositor.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use stereoscope::viewer::TickOutcome;
use stereoscope::{
    CameraConfig, CameraSource, CaptureWorker, DisplaySurface, Eye, FrameSlot, ParamKey,
    ParamStore, ViewerLoop,
};

fn open_stub(device: &str) -> CameraSource {
    CameraSource::open(CameraConfig {
        device: device.to_string(),
        width: 64,
        height: 48,
    })
    .expect("stub cameras always open")
}

/// A small canvas keeps per-frame correction cheap so the timing windows in
/// these tests stay comfortable on slow builds.
fn small_canvas_store() -> ParamStore {
    let store = ParamStore::default();
    store.set(ParamKey::CanvasWidth, 64.0);
    store.set(ParamKey::CanvasHeight, 48.0);
    store.set(ParamKey::CropLeft, 4.0);
    store.set(ParamKey::CropRight, 8.0);
    store.set(ParamKey::CropTop, 2.0);
    store.set(ParamKey::CropBottom, 6.0);
    store
}

#[test]
fn compositor_rides_out_a_one_eye_outage() {
    let store = small_canvas_store();
    let stop = Arc::new(AtomicBool::new(false));
    let left_slot = FrameSlot::new();
    let right_slot = FrameSlot::new();

    // The right camera fails its first 40 reads, then recovers; the left
    // camera is healthy throughout.
    let left_worker = CaptureWorker::spawn(
        Eye::Left,
        open_stub("stub://left"),
        store.clone(),
        left_slot.clone(),
        Arc::clone(&stop),
    )
    .unwrap();
    let right_worker = CaptureWorker::spawn(
        Eye::Right,
        open_stub("stub://right?fail=0..40"),
        store.clone(),
        right_slot.clone(),
        Arc::clone(&stop),
    )
    .unwrap();

    let mut viewer = ViewerLoop::new(
        store,
        left_slot.clone(),
        right_slot,
        DisplaySurface::headless(),
        None,
        Arc::clone(&stop),
    );

    // The healthy eye produces regardless of the sibling's outage.
    let deadline = Instant::now() + Duration::from_secs(30);
    while !left_slot.is_loaded() {
        assert!(Instant::now() < deadline, "healthy eye never produced");
        thread::sleep(Duration::from_millis(2));
    }

    // The gap ends once the scripted window is exhausted; composites resume.
    // Until then every tick is an idle tick, never an error.
    let deadline = Instant::now() + Duration::from_secs(30);
    while viewer.composites() == 0 {
        assert!(
            Instant::now() < deadline,
            "compositor never recovered from the outage"
        );
        match viewer.tick().expect("ticks never error on a headless surface") {
            TickOutcome::Idle => thread::sleep(Duration::from_millis(2)),
            TickOutcome::Composited => {}
            TickOutcome::Quit => panic!("nothing requested shutdown"),
        }
    }

    // Composite size follows the cropped eyes: (64-4-8)*2 by 48-2-6.
    assert_eq!(viewer.display_mut().last_frame_size(), Some((104, 40)));

    // A few more composites to show steady state, then cooperative shutdown.
    let deadline = Instant::now() + Duration::from_secs(30);
    while viewer.composites() < 5 {
        assert!(Instant::now() < deadline, "pipeline stalled after recovery");
        let _ = viewer.tick().unwrap();
        thread::sleep(Duration::from_millis(1));
    }

    stop.store(true, Ordering::Relaxed);
    left_worker.join();
    right_worker.join();
}

#[test]
fn both_eyes_down_simply_pauses_composites() {
    let store = small_canvas_store();
    let stop = Arc::new(AtomicBool::new(false));
    let left_slot = FrameSlot::new();
    let right_slot = FrameSlot::new();

    let mut viewer = ViewerLoop::new(
        store,
        left_slot,
        right_slot,
        DisplaySurface::headless(),
        None,
        Arc::clone(&stop),
    );

    // No workers at all: every tick is an idle tick, never an error.
    for _ in 0..50 {
        assert_eq!(viewer.tick().unwrap(), TickOutcome::Idle);
    }
    assert_eq!(viewer.composites(), 0);
}
