//! Shared helpers for synthetic-image unit tests.

use std::ops::Range;

use image::{Rgb, RgbImage};

use crate::config::VisibilityConfig;
use crate::mask::BinaryMask;
use crate::visibility::VisibilityMasks;

/// Paint `rows × cols` of `img` with `rgb`.
pub(crate) fn fill_rect(img: &mut RgbImage, rows: Range<u32>, cols: Range<u32>, rgb: [u8; 3]) {
    for row in rows {
        for col in cols.clone() {
            img.put_pixel(col, row, Rgb(rgb));
        }
    }
}

/// Default bands applied to a fully covered `w × h` frame.
pub(crate) fn full_visibility(w: u32, h: u32) -> VisibilityMasks {
    VisibilityMasks::from_coverage(
        BinaryMask::from_fn(w, h, |_, _| true),
        &VisibilityConfig::default(),
    )
}
