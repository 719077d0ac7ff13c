//! Keyboard control driven end-to-end through the display surface.

use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use stereoscope::viewer::TickOutcome;
use stereoscope::{DisplaySurface, FrameSlot, ParamKey, ParamStore, ViewerLoop};

fn viewer_with_store() -> (ViewerLoop, ParamStore) {
    let store = ParamStore::default();
    let viewer = ViewerLoop::new(
        store.clone(),
        FrameSlot::new(),
        FrameSlot::new(),
        DisplaySurface::headless(),
        None,
        Arc::new(AtomicBool::new(false)),
    );
    (viewer, store)
}

#[test]
fn ten_crop_decrements_floor_the_margin_at_zero() {
    let (mut viewer, store) = viewer_with_store();
    assert_eq!(store.get(ParamKey::CropLeft), 30.0);

    for _ in 0..10 {
        viewer.display_mut().push_key('x');
        viewer.tick().unwrap();
    }

    // 30 → 20 → 10 → 0, then the floor holds for the remaining presses.
    assert_eq!(store.get(ParamKey::CropLeft), 0.0);
}

#[test]
fn increments_and_decrements_cancel_out() {
    let (mut viewer, store) = viewer_with_store();
    for key in ['f', 'f', 's', 'e', 'd', 'z', 'x'] {
        viewer.display_mut().push_key(key);
        viewer.tick().unwrap();
    }
    assert_eq!(store.get(ParamKey::FxLeft), 360.0);
    assert_eq!(store.get(ParamKey::FyLeft), 300.0);
    assert_eq!(store.get(ParamKey::CropLeft), 30.0);
}

#[test]
fn dump_key_is_handled_without_touching_values() {
    let (mut viewer, store) = viewer_with_store();
    let before = store.snapshot();
    viewer.display_mut().push_key('p');
    assert_eq!(viewer.tick().unwrap(), TickOutcome::Idle);
    assert_eq!(store.snapshot(), before);
}

#[test]
fn quit_key_wins_over_pending_adjustments() {
    let (mut viewer, store) = viewer_with_store();
    viewer.display_mut().push_key('q');
    viewer.display_mut().push_key('f');
    assert_eq!(viewer.tick().unwrap(), TickOutcome::Quit);
    // The adjustment behind the quit key is never applied.
    assert_eq!(store.get(ParamKey::FxLeft), 350.0);
}
