//! End-to-end checks of the default calibration over synthetic frames.

use image::{Rgb, RgbImage};

use stereoscope::warp::{correct_frame, plan_for};
use stereoscope::{derived_composite_size, join, Eye, TuningParams};

#[test]
fn default_tuning_turns_720x480_into_520x400_per_eye() {
    let params = TuningParams::default();
    let raw = RgbImage::from_pixel(720, 480, Rgb([128, 128, 128]));

    let left = correct_frame(&raw, &plan_for(&params, Eye::Left));
    let right = correct_frame(&raw, &plan_for(&params, Eye::Right));

    // 720 - 30 - 170 wide, 480 - 0 - 80 tall.
    assert_eq!(left.dimensions(), (520, 400));
    assert_eq!(right.dimensions(), (520, 400));
}

#[test]
fn composite_of_default_eyes_matches_the_derived_recording_size() {
    let params = TuningParams::default();
    let raw = RgbImage::from_pixel(720, 480, Rgb([40, 90, 200]));

    let left = correct_frame(&raw, &plan_for(&params, Eye::Left));
    let right = correct_frame(&raw, &plan_for(&params, Eye::Right));
    let composite = join(&left, &right).expect("equal heights by construction");

    assert_eq!(
        Some(composite.dimensions()),
        derived_composite_size(&params),
        "the recorder's derived size must match what the pipeline actually produces"
    );
}

#[test]
fn pipeline_is_deterministic_for_identical_input() {
    let params = TuningParams::default();
    let raw = RgbImage::from_fn(720, 480, |x, y| {
        Rgb([(x % 251) as u8, (y % 241) as u8, ((x * y) % 239) as u8])
    });

    let plan = plan_for(&params, Eye::Left);
    assert_eq!(correct_frame(&raw, &plan), correct_frame(&raw, &plan));
}

#[test]
fn degenerate_margins_yield_an_empty_frame_end_to_end() {
    let mut params = TuningParams::default();
    params.crop_left = 400.0;
    params.crop_right = 400.0;
    let raw = RgbImage::from_pixel(720, 480, Rgb([1, 2, 3]));

    let out = correct_frame(&raw, &plan_for(&params, Eye::Left));
    assert_eq!(out.dimensions(), (0, 0));
    assert_eq!(derived_composite_size(&params), None);
}
