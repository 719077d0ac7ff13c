//! Live-tunable correction parameters.
//!
//! Every numeric knob of the frame pipeline lives here: per-eye pinhole
//! intrinsics, alignment offsets, the shared pre/post-distortion translations,
//! crop margins, canvas geometry and the recording frame rate.
//!
//! The store has exactly one writer role (the input loop) and many readers
//! (capture workers snapshot it once per frame). All fields are independent
//! scalars and staleness by one frame is acceptable, so a single `RwLock`
//! around the whole set is sufficient; there are no multi-field transactions.
//!
//! Crop margins are floor-clamped at zero. A clamp is reported exactly once
//! per excursion below the floor: the report latch is set on the first clamped
//! adjust and cleared as soon as the margin leaves the floor again, so a
//! held-down decrement key produces one notice, not a stream of them.

use std::sync::{Arc, RwLock};

/// Step applied by the increment/decrement key bindings.
pub const ADJUST_STEP: f64 = 10.0;

/// Lower bound for the four crop margins.
const CROP_FLOOR: f64 = 0.0;

// Hand-tuned calibration for the target headset. These encode a specific
// lens/camera pairing and are expected to be recalibrated, not computed.
pub const DEFAULT_FX: f64 = 350.0;
pub const DEFAULT_FY: f64 = 300.0;
pub const DEFAULT_CX: f64 = 310.0;
pub const DEFAULT_CY: f64 = 260.0;
pub const DEFAULT_PRE_OFFSET_X: f64 = -80.0;
pub const DEFAULT_PRE_OFFSET_Y: f64 = 20.0;
pub const DEFAULT_POST_OFFSET_X: f64 = -110.0;
pub const DEFAULT_POST_OFFSET_Y: f64 = 0.0;
pub const DEFAULT_CROP_LEFT: f64 = 30.0;
pub const DEFAULT_CROP_RIGHT: f64 = 170.0;
pub const DEFAULT_CROP_TOP: f64 = 0.0;
pub const DEFAULT_CROP_BOTTOM: f64 = 80.0;
pub const DEFAULT_CANVAS_WIDTH: f64 = 720.0;
pub const DEFAULT_CANVAS_HEIGHT: f64 = 480.0;
pub const DEFAULT_TARGET_FPS: f64 = 15.0;

/// Statically declared list of tuning keys.
///
/// `dump()` iterates this list instead of reflecting over struct fields, so
/// the diagnostic output is stable and explicit.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ParamKey {
    FxLeft,
    FyLeft,
    CxLeft,
    CyLeft,
    FxRight,
    FyRight,
    CxRight,
    CyRight,
    AlignXLeft,
    AlignYLeft,
    AlignXRight,
    AlignYRight,
    PreOffsetX,
    PreOffsetY,
    PostOffsetX,
    PostOffsetY,
    CropLeft,
    CropRight,
    CropTop,
    CropBottom,
    CanvasWidth,
    CanvasHeight,
    TargetFps,
}

impl ParamKey {
    pub const ALL: &'static [ParamKey] = &[
        ParamKey::FxLeft,
        ParamKey::FyLeft,
        ParamKey::CxLeft,
        ParamKey::CyLeft,
        ParamKey::FxRight,
        ParamKey::FyRight,
        ParamKey::CxRight,
        ParamKey::CyRight,
        ParamKey::AlignXLeft,
        ParamKey::AlignYLeft,
        ParamKey::AlignXRight,
        ParamKey::AlignYRight,
        ParamKey::PreOffsetX,
        ParamKey::PreOffsetY,
        ParamKey::PostOffsetX,
        ParamKey::PostOffsetY,
        ParamKey::CropLeft,
        ParamKey::CropRight,
        ParamKey::CropTop,
        ParamKey::CropBottom,
        ParamKey::CanvasWidth,
        ParamKey::CanvasHeight,
        ParamKey::TargetFps,
    ];

    /// The four floor-clamped crop margins.
    pub const CROP_KEYS: &'static [ParamKey] = &[
        ParamKey::CropLeft,
        ParamKey::CropRight,
        ParamKey::CropTop,
        ParamKey::CropBottom,
    ];

    pub fn name(self) -> &'static str {
        match self {
            ParamKey::FxLeft => "fx_left",
            ParamKey::FyLeft => "fy_left",
            ParamKey::CxLeft => "cx_left",
            ParamKey::CyLeft => "cy_left",
            ParamKey::FxRight => "fx_right",
            ParamKey::FyRight => "fy_right",
            ParamKey::CxRight => "cx_right",
            ParamKey::CyRight => "cy_right",
            ParamKey::AlignXLeft => "align_x_left",
            ParamKey::AlignYLeft => "align_y_left",
            ParamKey::AlignXRight => "align_x_right",
            ParamKey::AlignYRight => "align_y_right",
            ParamKey::PreOffsetX => "pre_offset_x",
            ParamKey::PreOffsetY => "pre_offset_y",
            ParamKey::PostOffsetX => "post_offset_x",
            ParamKey::PostOffsetY => "post_offset_y",
            ParamKey::CropLeft => "crop_left",
            ParamKey::CropRight => "crop_right",
            ParamKey::CropTop => "crop_top",
            ParamKey::CropBottom => "crop_bottom",
            ParamKey::CanvasWidth => "canvas_width",
            ParamKey::CanvasHeight => "canvas_height",
            ParamKey::TargetFps => "target_fps",
        }
    }

    fn is_crop(self) -> bool {
        Self::CROP_KEYS.contains(&self)
    }
}

/// One coherent set of tuning values.
///
/// Copied out of the store once per frame by the capture workers; the copy is
/// what flows into the transform pipeline, so a frame is always corrected
/// with a single consistent parameter set.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TuningParams {
    pub fx_left: f64,
    pub fy_left: f64,
    pub cx_left: f64,
    pub cy_left: f64,
    pub fx_right: f64,
    pub fy_right: f64,
    pub cx_right: f64,
    pub cy_right: f64,
    pub align_x_left: f64,
    pub align_y_left: f64,
    pub align_x_right: f64,
    pub align_y_right: f64,
    pub pre_offset_x: f64,
    pub pre_offset_y: f64,
    pub post_offset_x: f64,
    pub post_offset_y: f64,
    pub crop_left: f64,
    pub crop_right: f64,
    pub crop_top: f64,
    pub crop_bottom: f64,
    pub canvas_width: f64,
    pub canvas_height: f64,
    pub target_fps: f64,
}

impl Default for TuningParams {
    fn default() -> Self {
        // The right eye ships tied to the left eye's calibration; the keys
        // stay independent so the eyes can be tuned apart later.
        Self {
            fx_left: DEFAULT_FX,
            fy_left: DEFAULT_FY,
            cx_left: DEFAULT_CX,
            cy_left: DEFAULT_CY,
            fx_right: DEFAULT_FX,
            fy_right: DEFAULT_FY,
            cx_right: DEFAULT_CX,
            cy_right: DEFAULT_CY,
            align_x_left: 0.0,
            align_y_left: 0.0,
            align_x_right: 0.0,
            align_y_right: 0.0,
            pre_offset_x: DEFAULT_PRE_OFFSET_X,
            pre_offset_y: DEFAULT_PRE_OFFSET_Y,
            post_offset_x: DEFAULT_POST_OFFSET_X,
            post_offset_y: DEFAULT_POST_OFFSET_Y,
            crop_left: DEFAULT_CROP_LEFT,
            crop_right: DEFAULT_CROP_RIGHT,
            crop_top: DEFAULT_CROP_TOP,
            crop_bottom: DEFAULT_CROP_BOTTOM,
            canvas_width: DEFAULT_CANVAS_WIDTH,
            canvas_height: DEFAULT_CANVAS_HEIGHT,
            target_fps: DEFAULT_TARGET_FPS,
        }
    }
}

impl TuningParams {
    pub fn get(&self, key: ParamKey) -> f64 {
        match key {
            ParamKey::FxLeft => self.fx_left,
            ParamKey::FyLeft => self.fy_left,
            ParamKey::CxLeft => self.cx_left,
            ParamKey::CyLeft => self.cy_left,
            ParamKey::FxRight => self.fx_right,
            ParamKey::FyRight => self.fy_right,
            ParamKey::CxRight => self.cx_right,
            ParamKey::CyRight => self.cy_right,
            ParamKey::AlignXLeft => self.align_x_left,
            ParamKey::AlignYLeft => self.align_y_left,
            ParamKey::AlignXRight => self.align_x_right,
            ParamKey::AlignYRight => self.align_y_right,
            ParamKey::PreOffsetX => self.pre_offset_x,
            ParamKey::PreOffsetY => self.pre_offset_y,
            ParamKey::PostOffsetX => self.post_offset_x,
            ParamKey::PostOffsetY => self.post_offset_y,
            ParamKey::CropLeft => self.crop_left,
            ParamKey::CropRight => self.crop_right,
            ParamKey::CropTop => self.crop_top,
            ParamKey::CropBottom => self.crop_bottom,
            ParamKey::CanvasWidth => self.canvas_width,
            ParamKey::CanvasHeight => self.canvas_height,
            ParamKey::TargetFps => self.target_fps,
        }
    }

    fn set(&mut self, key: ParamKey, value: f64) {
        match key {
            ParamKey::FxLeft => self.fx_left = value,
            ParamKey::FyLeft => self.fy_left = value,
            ParamKey::CxLeft => self.cx_left = value,
            ParamKey::CyLeft => self.cy_left = value,
            ParamKey::FxRight => self.fx_right = value,
            ParamKey::FyRight => self.fy_right = value,
            ParamKey::CxRight => self.cx_right = value,
            ParamKey::CyRight => self.cy_right = value,
            ParamKey::AlignXLeft => self.align_x_left = value,
            ParamKey::AlignYLeft => self.align_y_left = value,
            ParamKey::AlignXRight => self.align_x_right = value,
            ParamKey::AlignYRight => self.align_y_right = value,
            ParamKey::PreOffsetX => self.pre_offset_x = value,
            ParamKey::PreOffsetY => self.pre_offset_y = value,
            ParamKey::PostOffsetX => self.post_offset_x = value,
            ParamKey::PostOffsetY => self.post_offset_y = value,
            ParamKey::CropLeft => self.crop_left = value,
            ParamKey::CropRight => self.crop_right = value,
            ParamKey::CropTop => self.crop_top = value,
            ParamKey::CropBottom => self.crop_bottom = value,
            ParamKey::CanvasWidth => self.canvas_width = value,
            ParamKey::CanvasHeight => self.canvas_height = value,
            ParamKey::TargetFps => self.target_fps = value,
        }
    }

    pub fn canvas_width(&self) -> u32 {
        self.canvas_width.round().max(1.0) as u32
    }

    pub fn canvas_height(&self) -> u32 {
        self.canvas_height.round().max(1.0) as u32
    }

    pub fn crop_margins(&self) -> (u32, u32, u32, u32) {
        (
            self.crop_left.round().max(0.0) as u32,
            self.crop_right.round().max(0.0) as u32,
            self.crop_top.round().max(0.0) as u32,
            self.crop_bottom.round().max(0.0) as u32,
        )
    }
}

/// Result of a single `adjust` call.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct AdjustOutcome {
    /// The value now stored under the key.
    pub value: f64,
    /// The delta would have driven a crop margin below zero.
    pub clamped: bool,
    /// First clamp of this excursion; callers report this one to the user.
    pub notice: bool,
}

struct StoreState {
    params: TuningParams,
    /// Per-crop-key latch, indexed parallel to `ParamKey::CROP_KEYS`.
    clamp_reported: [bool; 4],
}

/// Shared handle to the live parameter set.
///
/// Cloning is cheap; all clones see the same values.
#[derive(Clone)]
pub struct ParamStore {
    inner: Arc<RwLock<StoreState>>,
}

impl ParamStore {
    pub fn new(params: TuningParams) -> Self {
        Self {
            inner: Arc::new(RwLock::new(StoreState {
                params,
                clamp_reported: [false; 4],
            })),
        }
    }

    pub fn get(&self, key: ParamKey) -> f64 {
        self.inner.read().expect("param store poisoned").params.get(key)
    }

    /// Overwrite a value. Crop margins are still held at the floor.
    pub fn set(&self, key: ParamKey, value: f64) {
        let mut state = self.inner.write().expect("param store poisoned");
        let value = if key.is_crop() { value.max(CROP_FLOOR) } else { value };
        if key.is_crop() && value > CROP_FLOOR {
            state.clamp_reported[crop_index(key)] = false;
        }
        state.params.set(key, value);
    }

    /// Apply a delta, clamping crop margins at zero.
    pub fn adjust(&self, key: ParamKey, delta: f64) -> AdjustOutcome {
        let mut state = self.inner.write().expect("param store poisoned");
        let proposed = state.params.get(key) + delta;

        if key.is_crop() && proposed < CROP_FLOOR {
            let idx = crop_index(key);
            let notice = !state.clamp_reported[idx];
            state.clamp_reported[idx] = true;
            state.params.set(key, CROP_FLOOR);
            return AdjustOutcome {
                value: CROP_FLOOR,
                clamped: true,
                notice,
            };
        }

        if key.is_crop() {
            // Value moved legitimately; the next excursion reports again.
            state.clamp_reported[crop_index(key)] = false;
        }
        state.params.set(key, proposed);
        AdjustOutcome {
            value: proposed,
            clamped: false,
            notice: false,
        }
    }

    /// Copy the full set out for one frame's worth of processing.
    pub fn snapshot(&self) -> TuningParams {
        self.inner.read().expect("param store poisoned").params
    }

    /// All keys and current values, in declaration order.
    pub fn dump(&self) -> Vec<(&'static str, f64)> {
        let params = self.snapshot();
        ParamKey::ALL
            .iter()
            .map(|&key| (key.name(), params.get(key)))
            .collect()
    }
}

impl Default for ParamStore {
    fn default() -> Self {
        Self::new(TuningParams::default())
    }
}

fn crop_index(key: ParamKey) -> usize {
    ParamKey::CROP_KEYS
        .iter()
        .position(|&k| k == key)
        .expect("crop_index called with non-crop key")
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn adjust_moves_plain_keys_freely() {
        let store = ParamStore::default();
        store.adjust(ParamKey::FxLeft, ADJUST_STEP);
        assert_eq!(store.get(ParamKey::FxLeft), DEFAULT_FX + 10.0);
        store.adjust(ParamKey::PostOffsetX, -ADJUST_STEP);
        assert_eq!(store.get(ParamKey::PostOffsetX), DEFAULT_POST_OFFSET_X - 10.0);
        // Negative values are fine outside the crop margins.
        store.set(ParamKey::PreOffsetY, 0.0);
        store.adjust(ParamKey::PreOffsetY, -ADJUST_STEP);
        assert_eq!(store.get(ParamKey::PreOffsetY), -10.0);
    }

    #[test]
    fn crop_margins_never_go_negative() {
        let store = ParamStore::default();
        for key in ParamKey::CROP_KEYS {
            for delta in [-7.0, -100.0, 3.0, -3.0, -1e9, 5.0, -5.0, -5.0] {
                store.adjust(*key, delta);
                assert!(
                    store.get(*key) >= 0.0,
                    "{} went negative",
                    key.name()
                );
            }
        }
    }

    #[test]
    fn clamp_notice_fires_once_per_excursion() {
        let store = ParamStore::default();
        // crop_left starts at 30; three decrements land exactly on the floor
        // without clamping.
        let mut notices = 0;
        for _ in 0..10 {
            let outcome = store.adjust(ParamKey::CropLeft, -ADJUST_STEP);
            if outcome.notice {
                notices += 1;
            }
        }
        assert_eq!(store.get(ParamKey::CropLeft), 0.0);
        assert_eq!(notices, 1, "held-down decrement must report exactly once");

        // Raising the margin re-arms the notice.
        store.adjust(ParamKey::CropLeft, ADJUST_STEP);
        let outcome = store.adjust(ParamKey::CropLeft, -2.0 * ADJUST_STEP);
        assert!(outcome.clamped && outcome.notice);
    }

    #[test]
    fn exact_landing_on_floor_is_not_a_clamp() {
        let store = ParamStore::default();
        store.set(ParamKey::CropTop, 10.0);
        let outcome = store.adjust(ParamKey::CropTop, -ADJUST_STEP);
        assert_eq!(outcome.value, 0.0);
        assert!(!outcome.clamped);
        assert!(!outcome.notice);
    }

    #[test]
    fn dump_covers_every_key_in_declaration_order() {
        let store = ParamStore::default();
        let dump = store.dump();
        assert_eq!(dump.len(), ParamKey::ALL.len());
        assert_eq!(dump[0].0, "fx_left");
        assert_eq!(dump.last().unwrap().0, "target_fps");
        let (name, value) = dump
            .iter()
            .find(|(name, _)| *name == "crop_right")
            .copied()
            .unwrap();
        assert_eq!(name, "crop_right");
        assert_eq!(value, DEFAULT_CROP_RIGHT);
    }

    #[test]
    fn snapshot_is_a_consistent_copy() {
        let store = ParamStore::default();
        let before = store.snapshot();
        store.adjust(ParamKey::CxLeft, ADJUST_STEP);
        let after = store.snapshot();
        assert_eq!(before.cx_left, DEFAULT_CX);
        assert_eq!(after.cx_left, DEFAULT_CX + 10.0);
        // The earlier copy is unaffected by later edits.
        assert_ne!(before, after);
    }

    #[test]
    fn set_holds_crop_floor() {
        let store = ParamStore::default();
        store.set(ParamKey::CropBottom, -50.0);
        assert_eq!(store.get(ParamKey::CropBottom), 0.0);
    }
}
