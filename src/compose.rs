//! Frame compositor.
//!
//! Joins the two corrected eye images into one wide side-by-side frame for
//! the headset. The composite is ephemeral: it goes straight to the display
//! surface and, when enabled, to the recorder.
//!
//! A height mismatch between the eyes is rejected rather than padded — the
//! mismatch means the tuning parameters changed between the two frames'
//! corrections, and the next tick will compose cleanly, so dropping one
//! composite is cheaper and more honest than inventing filler rows.

use anyhow::{bail, Result};
use image::RgbImage;

/// Horizontally concatenate the left and right eye images.
///
/// Output width is the sum of the input widths; both inputs must share a
/// height.
pub fn join(left: &RgbImage, right: &RgbImage) -> Result<RgbImage> {
    if left.height() != right.height() {
        bail!(
            "eye frame heights diverged ({} vs {}); dropping composite",
            left.height(),
            right.height()
        );
    }

    let height = left.height();
    let mut out = RgbImage::new(left.width() + right.width(), height);
    image::imageops::replace(&mut out, left, 0, 0);
    image::imageops::replace(&mut out, right, left.width() as i64, 0);
    Ok(out)
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;

    #[test]
    fn join_concatenates_along_the_width() -> Result<()> {
        let left = RgbImage::from_pixel(520, 400, Rgb([255, 0, 0]));
        let right = RgbImage::from_pixel(520, 400, Rgb([0, 0, 255]));
        let composite = join(&left, &right)?;

        assert_eq!(composite.dimensions(), (1040, 400));
        assert_eq!(*composite.get_pixel(0, 0), Rgb([255, 0, 0]));
        assert_eq!(*composite.get_pixel(519, 399), Rgb([255, 0, 0]));
        assert_eq!(*composite.get_pixel(520, 0), Rgb([0, 0, 255]));
        assert_eq!(*composite.get_pixel(1039, 399), Rgb([0, 0, 255]));
        Ok(())
    }

    #[test]
    fn join_accepts_unequal_widths() -> Result<()> {
        let left = RgbImage::from_pixel(300, 200, Rgb([1, 2, 3]));
        let right = RgbImage::from_pixel(500, 200, Rgb([4, 5, 6]));
        let composite = join(&left, &right)?;
        assert_eq!(composite.dimensions(), (800, 200));
        Ok(())
    }

    #[test]
    fn join_rejects_mismatched_heights() {
        let left = RgbImage::new(520, 400);
        let right = RgbImage::new(520, 380);
        assert!(join(&left, &right).is_err());
    }
}
