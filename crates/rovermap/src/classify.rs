//! Colour-threshold terrain classification of the rectified frame.
//!
//! Three independent rules, each confined to a visibility mask:
//! - **Navigable**: every channel above `navigable_rgb_min` (bright ground).
//! - **Obstacle**: the navigable rule on the channel-wise complement
//!   (`255 - v`), i.e. uniformly dark pixels inside the visible region.
//! - **Rock**: bright red and green with little blue, near field only.
//!
//! Each raw mask then goes through its configured morphology step.

use image::{Rgb, RgbImage};

use crate::config::{ClassifierConfig, RockThreshold};
use crate::mask::BinaryMask;
use crate::visibility::VisibilityMasks;

/// Terrain category of a classified pixel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TerrainClass {
    Navigable,
    Obstacle,
    Rock,
}

impl TerrainClass {
    pub const ALL: [TerrainClass; 3] = [Self::Navigable, Self::Obstacle, Self::Rock];
}

/// Image-space pixel position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub struct PixelCoord {
    pub row: u32,
    pub col: u32,
}

/// Sparse set of pixels of one class, row-major, with the size of the image
/// they were taken from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PixelSet {
    pub width: u32,
    pub height: u32,
    pub pixels: Vec<PixelCoord>,
}

impl PixelSet {
    pub fn empty(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            pixels: Vec::new(),
        }
    }

    pub fn from_mask(mask: &BinaryMask) -> Self {
        Self {
            width: mask.width(),
            height: mask.height(),
            pixels: mask
                .iter_ones()
                .map(|(row, col)| PixelCoord { row, col })
                .collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.pixels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pixels.is_empty()
    }
}

/// `true` when every channel is strictly above its threshold.
#[inline]
pub fn is_navigable(px: [u8; 3], rgb_min: [u8; 3]) -> bool {
    px[0] > rgb_min[0] && px[1] > rgb_min[1] && px[2] > rgb_min[2]
}

/// Navigable rule on the complemented pixel.
#[inline]
pub fn is_obstacle(px: [u8; 3], rgb_min: [u8; 3]) -> bool {
    is_navigable(px.map(|v| 255 - v), rgb_min)
}

#[inline]
pub fn is_rock(px: [u8; 3], rock: &RockThreshold) -> bool {
    px[0] > rock.red_min && px[1] > rock.green_min && px[2] < rock.blue_max
}

/// A frame with every channel at zero carries no camera signal.
///
/// The cut-off is exact: one non-zero channel anywhere makes the frame
/// regular input, and dark visible pixels then classify as obstacle.
pub fn is_blank_frame(frame: &RgbImage) -> bool {
    frame.as_raw().iter().all(|&v| v == 0)
}

/// Per-class binary masks after morphological cleanup.
#[derive(Debug, Clone)]
pub struct Classification {
    pub navigable: BinaryMask,
    pub obstacle: BinaryMask,
    pub rock: BinaryMask,
}

impl Classification {
    /// All-empty classification for a `width × height` frame.
    pub fn empty(width: u32, height: u32) -> Self {
        Self {
            navigable: BinaryMask::new(width, height),
            obstacle: BinaryMask::new(width, height),
            rock: BinaryMask::new(width, height),
        }
    }

    pub fn mask(&self, class: TerrainClass) -> &BinaryMask {
        match class {
            TerrainClass::Navigable => &self.navigable,
            TerrainClass::Obstacle => &self.obstacle,
            TerrainClass::Rock => &self.rock,
        }
    }

    pub fn pixel_set(&self, class: TerrainClass) -> PixelSet {
        PixelSet::from_mask(self.mask(class))
    }

    /// Debug view: red = obstacle, blue = navigable, at full intensity.
    pub fn vision_image(&self) -> RgbImage {
        let (w, h) = self.navigable.dimensions();
        RgbImage::from_fn(w, h, |x, y| {
            let red = if self.obstacle.get(y, x) { 255 } else { 0 };
            let blue = if self.navigable.get(y, x) { 255 } else { 0 };
            Rgb([red, 0, blue])
        })
    }
}

/// Applies the colour rules and cleanup to a rectified frame.
#[derive(Debug, Clone, Default)]
pub struct TerrainClassifier {
    config: ClassifierConfig,
}

impl TerrainClassifier {
    pub fn new(config: ClassifierConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ClassifierConfig {
        &self.config
    }

    /// Classify `warped` inside `visibility`. Empty classes are valid output.
    pub fn classify(&self, warped: &RgbImage, visibility: &VisibilityMasks) -> Classification {
        let cfg = &self.config;
        let (w, h) = warped.dimensions();
        let pixel = |row: u32, col: u32| warped.get_pixel(col, row).0;

        let rule = |test: &dyn Fn([u8; 3]) -> bool| {
            BinaryMask::from_fn(w, h, |row, col| test(pixel(row, col)))
        };
        let navigable = rule(&|px| is_navigable(px, cfg.navigable_rgb_min)).and(&visibility.full);
        let obstacle = rule(&|px| is_obstacle(px, cfg.navigable_rgb_min)).and(&visibility.full);
        let rock = rule(&|px| is_rock(px, &cfg.rock)).and(&visibility.near);

        tracing::trace!(
            "raw classes: navigable={} obstacle={} rock={}",
            navigable.count_ones(),
            obstacle.count_ones(),
            rock.count_ones()
        );

        Classification {
            navigable: cfg.navigable_cleanup.apply(&navigable),
            obstacle: cfg.obstacle_cleanup.apply(&obstacle),
            rock: cfg.rock_cleanup.apply(&rock),
        }
    }
}
