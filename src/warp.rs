//! Geometric transform engine.
//!
//! Pure per-frame image math, applied independently to each eye:
//!
//! 1. `translate` — align the raw frame on the working canvas
//! 2. `undistort` — invert the headset lens's radial warp
//! 3. `translate` — shared positional correction of the corrected image
//! 4. `crop` — cut the usable sub-rectangle
//!
//! The order is significant: the radial correction runs on an
//! already-translated image and the second translation repositions its output
//! before the crop. Both binaries and both concurrency shapes call this one
//! engine; there is no second copy of the math.
//!
//! The lens model is the Brown-Conrady polynomial: a destination pixel is
//! normalized through the pinhole matrix, pushed through the forward
//! distortion model and sampled bilinearly from the source — the standard
//! inverse-mapping formulation, so no iterative solve is needed.

use image::{Rgb, RgbImage};

use crate::params::TuningParams;
use crate::Eye;

/// Pinhole camera matrix (fx, 0, cx; 0, fy, cy; 0, 0, 1).
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CameraMatrix {
    pub fx: f64,
    pub fy: f64,
    pub cx: f64,
    pub cy: f64,
}

/// Brown-Conrady distortion coefficients.
///
/// k1..k3 are the radial terms (r², r⁴, r⁶), p1/p2 the tangential terms.
/// k1 > 0 corrects toward barrel, k1 < 0 toward pincushion.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DistortionCoeffs {
    pub k1: f64,
    pub k2: f64,
    pub k3: f64,
    pub p1: f64,
    pub p2: f64,
}

/// Fixed correction for the target headset's lenses. Calibration data, not
/// something the code derives; retune when the optics change.
pub const HMD_LENS: DistortionCoeffs = DistortionCoeffs {
    k1: 0.22,
    k2: 0.24,
    k3: 0.0,
    p1: 0.0,
    p2: 0.0,
};

/// Everything one eye's pipeline pass needs, resolved from a parameter
/// snapshot so a frame is corrected with one consistent set of values.
#[derive(Clone, Copy, Debug)]
pub struct FramePlan {
    pub matrix: CameraMatrix,
    pub distortion: DistortionCoeffs,
    /// Per-eye alignment plus the shared pre-distortion offset.
    pub pre_dx: i64,
    pub pre_dy: i64,
    /// Shared post-distortion offset.
    pub post_dx: i64,
    pub post_dy: i64,
    /// left, right, top, bottom margins.
    pub crop: (u32, u32, u32, u32),
    pub canvas_width: u32,
    pub canvas_height: u32,
}

/// Resolve the pipeline plan for one eye from a parameter snapshot.
pub fn plan_for(params: &TuningParams, eye: Eye) -> FramePlan {
    let (fx, fy, cx, cy, align_x, align_y) = match eye {
        Eye::Left => (
            params.fx_left,
            params.fy_left,
            params.cx_left,
            params.cy_left,
            params.align_x_left,
            params.align_y_left,
        ),
        Eye::Right => (
            params.fx_right,
            params.fy_right,
            params.cx_right,
            params.cy_right,
            params.align_x_right,
            params.align_y_right,
        ),
    };

    FramePlan {
        matrix: CameraMatrix { fx, fy, cx, cy },
        distortion: HMD_LENS,
        pre_dx: (align_x + params.pre_offset_x).round() as i64,
        pre_dy: (align_y + params.pre_offset_y).round() as i64,
        post_dx: params.post_offset_x.round() as i64,
        post_dy: params.post_offset_y.round() as i64,
        crop: params.crop_margins(),
        canvas_width: params.canvas_width(),
        canvas_height: params.canvas_height(),
    }
}

/// Run the full fixed pipeline for one eye.
///
/// The result may be empty when the crop margins are degenerate; callers
/// treat that as a recoverable per-frame fault, not an error.
pub fn correct_frame(raw: &RgbImage, plan: &FramePlan) -> RgbImage {
    let aligned = translate(
        raw,
        plan.pre_dx,
        plan.pre_dy,
        plan.canvas_width,
        plan.canvas_height,
    );
    let corrected = undistort(&aligned, &plan.matrix, &plan.distortion);
    let positioned = translate(
        &corrected,
        plan.post_dx,
        plan.post_dy,
        plan.canvas_width,
        plan.canvas_height,
    );
    let (left, right, top, bottom) = plan.crop;
    crop(&positioned, left, right, top, bottom)
}

/// Shift an image by (dx, dy) onto a fixed-size canvas.
///
/// Pixels leaving the canvas are dropped; newly exposed pixels are black.
/// Offsets are whole pixels (the tuning keys only ever move in integer
/// steps), which keeps the shift lossless.
pub fn translate(image: &RgbImage, dx: i64, dy: i64, canvas_w: u32, canvas_h: u32) -> RgbImage {
    let mut out = RgbImage::new(canvas_w, canvas_h);

    // Overlap of the shifted source with the canvas, in canvas coordinates.
    let x0 = dx.max(0).min(canvas_w as i64);
    let y0 = dy.max(0).min(canvas_h as i64);
    let x1 = (image.width() as i64 + dx).clamp(0, canvas_w as i64);
    let y1 = (image.height() as i64 + dy).clamp(0, canvas_h as i64);

    for y in y0..y1 {
        for x in x0..x1 {
            let src = *image.get_pixel((x - dx) as u32, (y - dy) as u32);
            out.put_pixel(x as u32, y as u32, src);
        }
    }
    out
}

/// Remove lens distortion via inverse mapping through the pinhole matrix.
pub fn undistort(image: &RgbImage, matrix: &CameraMatrix, coeffs: &DistortionCoeffs) -> RgbImage {
    let (width, height) = image.dimensions();
    let mut out = RgbImage::new(width, height);

    for v in 0..height {
        for u in 0..width {
            // Normalize, distort forward, unnormalize: where in the source
            // does this corrected pixel come from?
            let x = (u as f64 - matrix.cx) / matrix.fx;
            let y = (v as f64 - matrix.cy) / matrix.fy;
            let r2 = x * x + y * y;
            let radial = 1.0 + coeffs.k1 * r2 + coeffs.k2 * r2 * r2 + coeffs.k3 * r2 * r2 * r2;
            let x_d = x * radial + 2.0 * coeffs.p1 * x * y + coeffs.p2 * (r2 + 2.0 * x * x);
            let y_d = y * radial + coeffs.p1 * (r2 + 2.0 * y * y) + 2.0 * coeffs.p2 * x * y;
            let src_u = matrix.fx * x_d + matrix.cx;
            let src_v = matrix.fy * y_d + matrix.cy;
            out.put_pixel(u, v, sample_bilinear(image, src_u, src_v));
        }
    }
    out
}

/// Cut the sub-rectangle x ∈ [left, w-right), y ∈ [top, h-bottom).
///
/// Degenerate margins produce an empty image rather than a panic; the frame
/// pipeline skips such frames and keeps running.
pub fn crop(image: &RgbImage, left: u32, right: u32, top: u32, bottom: u32) -> RgbImage {
    let (width, height) = image.dimensions();
    let x_end = width.saturating_sub(right);
    let y_end = height.saturating_sub(bottom);
    if left >= x_end || top >= y_end {
        return RgbImage::new(0, 0);
    }
    image::imageops::crop_imm(image, left, top, x_end - left, y_end - top).to_image()
}

/// Bilinear sample with black outside the source bounds.
fn sample_bilinear(image: &RgbImage, x: f64, y: f64) -> Rgb<u8> {
    let (width, height) = image.dimensions();
    if x < 0.0 || y < 0.0 || x > (width - 1) as f64 || y > (height - 1) as f64 {
        return Rgb([0, 0, 0]);
    }

    let x0 = x.floor() as u32;
    let y0 = y.floor() as u32;
    let x1 = (x0 + 1).min(width - 1);
    let y1 = (y0 + 1).min(height - 1);
    let fx = x - x0 as f64;
    let fy = y - y0 as f64;

    let p00 = image.get_pixel(x0, y0);
    let p10 = image.get_pixel(x1, y0);
    let p01 = image.get_pixel(x0, y1);
    let p11 = image.get_pixel(x1, y1);

    let mut out = [0u8; 3];
    for c in 0..3 {
        let top = p00[c] as f64 * (1.0 - fx) + p10[c] as f64 * fx;
        let bottom = p01[c] as f64 * (1.0 - fx) + p11[c] as f64 * fx;
        out[c] = (top * (1.0 - fy) + bottom * fy).round().clamp(0.0, 255.0) as u8;
    }
    Rgb(out)
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::params::TuningParams;

    fn gradient(width: u32, height: u32) -> RgbImage {
        RgbImage::from_fn(width, height, |x, y| {
            Rgb([(x % 256) as u8, (y % 256) as u8, ((x + y) % 256) as u8])
        })
    }

    const NO_DISTORTION: DistortionCoeffs = DistortionCoeffs {
        k1: 0.0,
        k2: 0.0,
        k3: 0.0,
        p1: 0.0,
        p2: 0.0,
    };

    #[test]
    fn translate_round_trips_on_the_interior() {
        let img = gradient(64, 48);
        let shifted = translate(&img, 7, -5, 64, 48);
        let back = translate(&shifted, -7, 5, 64, 48);
        // Interior pixels survive the round trip; only the clipped border may
        // have been filled with black.
        for y in 5..43 {
            for x in 0..57 {
                assert_eq!(back.get_pixel(x, y), img.get_pixel(x, y), "at ({x},{y})");
            }
        }
    }

    #[test]
    fn translate_fills_exposed_pixels_with_black() {
        let img = gradient(16, 16);
        let shifted = translate(&img, 4, 0, 16, 16);
        for y in 0..16 {
            for x in 0..4 {
                assert_eq!(*shifted.get_pixel(x, y), Rgb([0, 0, 0]));
            }
        }
        assert_eq!(shifted.get_pixel(4, 3), img.get_pixel(0, 3));
    }

    #[test]
    fn translate_resizes_onto_the_canvas() {
        let img = gradient(100, 100);
        let out = translate(&img, 0, 0, 40, 30);
        assert_eq!(out.dimensions(), (40, 30));
        assert_eq!(out.get_pixel(10, 10), img.get_pixel(10, 10));
    }

    #[test]
    fn undistort_with_zero_coefficients_is_identity() {
        let img = gradient(40, 30);
        // Power-of-two intrinsics keep the normalize/unnormalize round trip
        // exact, so the identity holds pixel-for-pixel.
        let matrix = CameraMatrix {
            fx: 256.0,
            fy: 128.0,
            cx: 16.0,
            cy: 8.0,
        };
        let out = undistort(&img, &matrix, &NO_DISTORTION);
        assert_eq!(out, img);
    }

    #[test]
    fn undistort_keeps_the_optical_center_fixed() {
        let mut img = RgbImage::new(41, 31);
        img.put_pixel(20, 15, Rgb([255, 255, 255]));
        let matrix = CameraMatrix {
            fx: 100.0,
            fy: 100.0,
            cx: 20.0,
            cy: 15.0,
        };
        let out = undistort(&img, &matrix, &HMD_LENS);
        // r = 0 at the principal point, so it maps to itself.
        assert_eq!(*out.get_pixel(20, 15), Rgb([255, 255, 255]));
    }

    #[test]
    fn undistort_pulls_corners_from_outside_the_source() {
        // With positive radial terms the corners reach outside the source
        // image and come back black.
        let img = RgbImage::from_pixel(41, 31, Rgb([200, 200, 200]));
        let matrix = CameraMatrix {
            fx: 20.0,
            fy: 20.0,
            cx: 20.0,
            cy: 15.0,
        };
        let out = undistort(&img, &matrix, &HMD_LENS);
        assert_eq!(*out.get_pixel(0, 0), Rgb([0, 0, 0]));
        assert_eq!(*out.get_pixel(40, 30), Rgb([0, 0, 0]));
        // The center remains lit.
        assert_eq!(*out.get_pixel(20, 15), Rgb([200, 200, 200]));
    }

    #[test]
    fn crop_obeys_the_size_law() {
        let img = gradient(720, 480);
        let out = crop(&img, 30, 170, 0, 80);
        assert_eq!(out.dimensions(), (520, 400));
        assert_eq!(out.get_pixel(0, 0), img.get_pixel(30, 0));
        assert_eq!(out.get_pixel(519, 399), img.get_pixel(549, 399));
    }

    #[test]
    fn degenerate_crop_is_empty_not_a_panic() {
        let img = gradient(100, 100);
        assert_eq!(crop(&img, 60, 50, 0, 0).dimensions(), (0, 0));
        assert_eq!(crop(&img, 0, 0, 70, 40).dimensions(), (0, 0));
        assert_eq!(crop(&img, 100, 0, 0, 0).dimensions(), (0, 0));
        // Margins that exactly exhaust an axis are also degenerate.
        assert_eq!(crop(&img, 50, 50, 0, 0).dimensions(), (0, 0));
    }

    #[test]
    fn default_plan_produces_the_documented_output_size() {
        let params = TuningParams::default();
        let raw = RgbImage::from_pixel(720, 480, Rgb([90, 120, 150]));

        let left = correct_frame(&raw, &plan_for(&params, Eye::Left));
        let right = correct_frame(&raw, &plan_for(&params, Eye::Right));

        assert_eq!(left.dimensions(), (520, 400));
        assert_eq!(right.dimensions(), (520, 400));
        // Default right-eye intrinsics are tied to the left eye's, so both
        // pipelines agree on identical input.
        assert_eq!(left, right);
    }

    #[test]
    fn plans_read_per_eye_intrinsics_independently() {
        let mut params = TuningParams::default();
        params.fx_right = 257.0;
        params.cx_right = 207.0;
        let left = plan_for(&params, Eye::Left);
        let right = plan_for(&params, Eye::Right);
        assert_eq!(left.matrix.fx, 350.0);
        assert_eq!(right.matrix.fx, 257.0);
        assert_eq!(right.matrix.cx, 207.0);
        assert_eq!(left.post_dx, right.post_dx);
        assert_eq!(left.crop, right.crop);
    }
}
