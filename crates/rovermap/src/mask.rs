//! Dense binary grid aligned with an image.

use image::{GrayImage, Luma};

/// Row-major binary grid. `true` marks a selected pixel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BinaryMask {
    width: u32,
    height: u32,
    bits: Vec<bool>,
}

impl BinaryMask {
    /// All-false mask.
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            bits: vec![false; width as usize * height as usize],
        }
    }

    /// Mask where `f(row, col)` decides each pixel.
    pub fn from_fn(width: u32, height: u32, mut f: impl FnMut(u32, u32) -> bool) -> Self {
        let mut bits = Vec::with_capacity(width as usize * height as usize);
        for row in 0..height {
            for col in 0..width {
                bits.push(f(row, col));
            }
        }
        Self {
            width,
            height,
            bits,
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    #[inline]
    fn index(&self, row: u32, col: u32) -> usize {
        row as usize * self.width as usize + col as usize
    }

    /// Pixel value; out-of-range coordinates read as `false`.
    #[inline]
    pub fn get(&self, row: u32, col: u32) -> bool {
        row < self.height && col < self.width && self.bits[self.index(row, col)]
    }

    /// Set a pixel; out-of-range coordinates are ignored.
    #[inline]
    pub fn set(&mut self, row: u32, col: u32, value: bool) {
        if row < self.height && col < self.width {
            let idx = self.index(row, col);
            self.bits[idx] = value;
        }
    }

    pub fn count_ones(&self) -> usize {
        self.bits.iter().filter(|&&b| b).count()
    }

    pub fn is_empty(&self) -> bool {
        !self.bits.iter().any(|&b| b)
    }

    /// Selected pixels as `(row, col)`, row-major.
    pub fn iter_ones(&self) -> impl Iterator<Item = (u32, u32)> + '_ {
        let w = self.width as usize;
        self.bits
            .iter()
            .enumerate()
            .filter(|(_, b)| **b)
            .map(move |(i, _)| ((i / w) as u32, (i % w) as u32))
    }

    /// Pixel-wise AND with a same-size mask.
    ///
    /// # Panics
    /// If the two masks differ in size.
    pub fn and(&self, other: &BinaryMask) -> BinaryMask {
        assert_eq!(
            self.dimensions(),
            other.dimensions(),
            "mask size mismatch in and()"
        );
        BinaryMask {
            width: self.width,
            height: self.height,
            bits: self
                .bits
                .iter()
                .zip(&other.bits)
                .map(|(&a, &b)| a && b)
                .collect(),
        }
    }

    /// Clear rows `[start, end)`, clamped to the grid.
    pub fn zero_rows(&mut self, start: u32, end: u32) {
        let end = end.min(self.height);
        for row in start.min(end)..end {
            let from = self.index(row, 0);
            self.bits[from..from + self.width as usize].fill(false);
        }
    }

    /// Clear columns `[start, end)` in every row, clamped to the grid.
    pub fn zero_cols(&mut self, start: u32, end: u32) {
        let end = end.min(self.width);
        for row in 0..self.height {
            for col in start.min(end)..end {
                let idx = self.index(row, col);
                self.bits[idx] = false;
            }
        }
    }

    /// 0/255 grayscale rendering.
    pub fn to_gray_image(&self) -> GrayImage {
        GrayImage::from_fn(self.width, self.height, |x, y| {
            Luma([if self.get(y, x) { 255 } else { 0 }])
        })
    }
}
