//! Binary erosion/dilation with rectangular structuring elements.
//!
//! The kernel anchor is its center (`rows / 2`, `cols / 2`). Neighbours
//! falling outside the grid are ignored: they never erode a pixel and never
//! dilate into one, so the grid border behaves as "no information".

use crate::mask::BinaryMask;

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MorphologyKind {
    /// Keep a pixel only if every in-grid neighbour under the kernel is set.
    Erode,
    /// Set a pixel if any in-grid neighbour under the kernel is set.
    Dilate,
}

/// One morphological cleanup step, repeated `iterations` times.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct MorphologyOp {
    pub kind: MorphologyKind,
    pub kernel_rows: u32,
    pub kernel_cols: u32,
    pub iterations: u32,
}

impl MorphologyOp {
    pub fn new(kind: MorphologyKind, kernel_rows: u32, kernel_cols: u32, iterations: u32) -> Self {
        Self {
            kind,
            kernel_rows,
            kernel_cols,
            iterations,
        }
    }

    /// Apply the operation to `mask`.
    pub fn apply(&self, mask: &BinaryMask) -> BinaryMask {
        let mut out = mask.clone();
        for _ in 0..self.iterations {
            if out.is_empty() {
                break;
            }
            out = sweep(&out, self.kind, self.kernel_rows, self.kernel_cols);
        }
        out
    }
}

/// Single pass of the structuring element over the grid.
///
/// Separable: a rectangular kernel is a row sweep followed by a column sweep.
fn sweep(mask: &BinaryMask, kind: MorphologyKind, kernel_rows: u32, kernel_cols: u32) -> BinaryMask {
    let (w, h) = mask.dimensions();
    let horizontal = sweep_axis(w, h, kind, kernel_cols, |row, col| mask.get(row, col), false);
    sweep_axis(w, h, kind, kernel_rows, |row, col| horizontal.get(row, col), true)
}

fn sweep_axis(
    w: u32,
    h: u32,
    kind: MorphologyKind,
    size: u32,
    src: impl Fn(u32, u32) -> bool,
    vertical: bool,
) -> BinaryMask {
    let size = size.max(1) as i64;
    let before = size / 2;
    let after = size - 1 - before;
    let len = i64::from(if vertical { h } else { w });

    BinaryMask::from_fn(w, h, |row, col| {
        let center = i64::from(if vertical { row } else { col });
        let lo = (center - before).max(0);
        let hi = (center + after).min(len - 1);
        let mut taps = (lo..=hi).map(|k| {
            if vertical {
                src(k as u32, col)
            } else {
                src(row, k as u32)
            }
        });
        match kind {
            MorphologyKind::Erode => taps.all(|b| b),
            MorphologyKind::Dilate => taps.any(|b| b),
        }
    })
}
