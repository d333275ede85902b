//! Pipeline configuration.
//!
//! Defaults reproduce the 320×160 forward camera calibration: a 10×10 px
//! destination square per calibration tile, a 200×200 world grid and ten
//! rover-frame pixels per world cell.

use std::path::Path;

use crate::error::PerceptionError;
use crate::morphology::{MorphologyKind, MorphologyOp};

const DEFAULT_FRAME_WIDTH: u32 = 320;
const DEFAULT_FRAME_HEIGHT: u32 = 160;
const DEFAULT_DST_HALF_SIZE: f64 = 5.0;
const DEFAULT_BOTTOM_OFFSET: f64 = 6.0;

/// Four-point perspective calibration for the camera mount.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct CalibrationConfig {
    /// Calibration tile corners in the raw camera frame, `(x, y)` pixels.
    pub src_quad: [[f64; 2]; 4],
    /// Where those corners land in the top-down rectified frame.
    pub dst_quad: [[f64; 2]; 4],
}

impl CalibrationConfig {
    /// Destination square of half-size `half` centered horizontally,
    /// `bottom_offset` rows above the bottom edge of a `width × height` frame.
    pub fn centered_square(width: u32, height: u32, half: f64, bottom_offset: f64) -> [[f64; 2]; 4] {
        let cx = width as f64 / 2.0;
        let bottom = height as f64 - bottom_offset;
        [
            [cx - half, bottom],
            [cx + half, bottom],
            [cx + half, bottom - 2.0 * half],
            [cx - half, bottom - 2.0 * half],
        ]
    }
}

impl Default for CalibrationConfig {
    fn default() -> Self {
        Self {
            src_quad: [[14.0, 140.0], [301.0, 140.0], [200.0, 96.0], [118.0, 96.0]],
            dst_quad: Self::centered_square(
                DEFAULT_FRAME_WIDTH,
                DEFAULT_FRAME_HEIGHT,
                DEFAULT_DST_HALF_SIZE,
                DEFAULT_BOTTOM_OFFSET,
            ),
        }
    }
}

/// Border bands removed from the rectified coverage mask.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct VisibilityConfig {
    /// Rows zeroed from the top (far field, heavily stretched).
    pub top_rows: u32,
    /// Columns zeroed from the left edge.
    pub left_cols: u32,
    /// Columns zeroed from the right edge.
    pub right_cols: u32,
    /// Rows zeroed from the top for the near-field rock mask.
    pub rock_top_rows: u32,
}

impl Default for VisibilityConfig {
    fn default() -> Self {
        Self {
            top_rows: 60,
            left_cols: 50,
            right_cols: 50,
            rock_top_rows: 110,
        }
    }
}

/// Rock colour signature: bright red and green, almost no blue.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct RockThreshold {
    pub red_min: u8,
    pub green_min: u8,
    pub blue_max: u8,
}

impl Default for RockThreshold {
    fn default() -> Self {
        Self {
            red_min: 110,
            green_min: 110,
            blue_max: 40,
        }
    }
}

/// Colour rules and per-class morphological cleanup.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct ClassifierConfig {
    /// Per-channel strict lower bound for navigable ground (RGB order).
    pub navigable_rgb_min: [u8; 3],
    pub rock: RockThreshold,
    pub navigable_cleanup: MorphologyOp,
    pub obstacle_cleanup: MorphologyOp,
    pub rock_cleanup: MorphologyOp,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            navigable_rgb_min: [160, 160, 160],
            rock: RockThreshold::default(),
            navigable_cleanup: MorphologyOp::new(MorphologyKind::Erode, 3, 5, 3),
            obstacle_cleanup: MorphologyOp::new(MorphologyKind::Dilate, 5, 5, 2),
            rock_cleanup: MorphologyOp::new(MorphologyKind::Dilate, 3, 3, 2),
        }
    }
}

/// World grid geometry.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct WorldConfig {
    /// Edge length of the square world grid, in cells.
    pub world_size: usize,
    /// Rover-frame pixels per world cell.
    pub scale: f64,
}

impl Default for WorldConfig {
    fn default() -> Self {
        Self {
            world_size: 200,
            scale: 10.0,
        }
    }
}

/// Top-level configuration for [`crate::Perception`].
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct PerceptionConfig {
    /// Expected camera frame size `[width, height]`.
    pub frame_size: [u32; 2],
    pub calibration: CalibrationConfig,
    pub visibility: VisibilityConfig,
    pub classifier: ClassifierConfig,
    pub world: WorldConfig,
    /// Produce the warped-space debug image each cycle.
    pub render_vision_image: bool,
}

impl Default for PerceptionConfig {
    fn default() -> Self {
        Self {
            frame_size: [DEFAULT_FRAME_WIDTH, DEFAULT_FRAME_HEIGHT],
            calibration: CalibrationConfig::default(),
            visibility: VisibilityConfig::default(),
            classifier: ClassifierConfig::default(),
            world: WorldConfig::default(),
            render_vision_image: false,
        }
    }
}

impl PerceptionConfig {
    /// Load a configuration from a JSON file. Missing fields take defaults.
    pub fn from_json_file(path: &Path) -> Result<Self, Box<dyn std::error::Error>> {
        let data = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&data)?;
        config.validate()?;
        Ok(config)
    }

    /// Check sizes, bands and kernels. Quad geometry is checked when the
    /// homography is built.
    pub fn validate(&self) -> Result<(), PerceptionError> {
        let [w, h] = self.frame_size;
        if w == 0 || h == 0 {
            return Err(PerceptionError::Configuration(format!(
                "frame size must be non-zero, got {}x{}",
                w, h
            )));
        }

        let vis = &self.visibility;
        if vis.top_rows > h || vis.rock_top_rows > h {
            return Err(PerceptionError::Configuration(format!(
                "top bands ({} / {} rows) exceed frame height {}",
                vis.top_rows, vis.rock_top_rows, h
            )));
        }
        if vis.left_cols.saturating_add(vis.right_cols) > w {
            return Err(PerceptionError::Configuration(format!(
                "side bands ({} + {} cols) exceed frame width {}",
                vis.left_cols, vis.right_cols, w
            )));
        }

        for (name, op) in [
            ("navigable_cleanup", &self.classifier.navigable_cleanup),
            ("obstacle_cleanup", &self.classifier.obstacle_cleanup),
            ("rock_cleanup", &self.classifier.rock_cleanup),
        ] {
            if op.kernel_rows == 0 || op.kernel_cols == 0 {
                return Err(PerceptionError::Configuration(format!(
                    "{}: kernel must be at least 1x1, got {}x{}",
                    name, op.kernel_rows, op.kernel_cols
                )));
            }
        }

        if self.world.world_size == 0 {
            return Err(PerceptionError::Configuration(
                "world_size must be non-zero".into(),
            ));
        }
        if !self.world.scale.is_finite() || self.world.scale <= 0.0 {
            return Err(PerceptionError::Configuration(format!(
                "scale must be positive and finite, got {}",
                self.world.scale
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_destination_square() {
        let cfg = CalibrationConfig::default();
        assert_eq!(
            cfg.dst_quad,
            [[155.0, 154.0], [165.0, 154.0], [165.0, 144.0], [155.0, 144.0]]
        );
    }

    #[test]
    fn default_config_is_valid() {
        PerceptionConfig::default().validate().unwrap();
    }

    #[test]
    fn zero_scale_is_rejected() {
        let mut cfg = PerceptionConfig::default();
        cfg.world.scale = 0.0;
        assert!(matches!(
            cfg.validate(),
            Err(PerceptionError::Configuration(_))
        ));
    }

    #[test]
    fn oversized_bands_are_rejected() {
        let mut cfg = PerceptionConfig::default();
        cfg.visibility.left_cols = 200;
        cfg.visibility.right_cols = 200;
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn empty_kernel_is_rejected() {
        let mut cfg = PerceptionConfig::default();
        cfg.classifier.rock_cleanup.kernel_cols = 0;
        let err = cfg.validate().unwrap_err();
        assert!(err.to_string().contains("rock_cleanup"));
    }

    #[test]
    fn partial_json_fills_defaults() {
        let cfg: PerceptionConfig =
            serde_json::from_str(r#"{ "render_vision_image": true }"#).unwrap();
        assert!(cfg.render_vision_image);
        assert_eq!(cfg.world, WorldConfig::default());
    }

    #[test]
    fn nested_partial_json_keeps_sibling_defaults() {
        let cfg: PerceptionConfig =
            serde_json::from_str(r#"{ "world": { "scale": 5.0 } }"#).unwrap();
        assert_eq!(cfg.world.scale, 5.0);
        assert_eq!(cfg.world.world_size, 200);
    }

    #[test]
    fn json_roundtrip_preserves_config() {
        let cfg = PerceptionConfig::default();
        let json = serde_json::to_string(&cfg).unwrap();
        let back: PerceptionConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(back, cfg);
    }
}
