//! Visibility masks for the rectified frame.

use crate::config::VisibilityConfig;
use crate::mask::BinaryMask;
use crate::rectify::Rectifier;

/// Trusted regions of the rectified frame.
#[derive(Debug, Clone)]
pub struct VisibilityMasks {
    /// Real camera coverage minus the top and side bands.
    pub full: BinaryMask,
    /// `full` with a deeper top band: the near field used for rock detection.
    pub near: BinaryMask,
}

impl VisibilityMasks {
    /// Derive both masks from the rectifier's coverage.
    pub fn build(rectifier: &Rectifier, config: &VisibilityConfig) -> Self {
        Self::from_coverage(rectifier.coverage(), config)
    }

    /// Apply the configured bands to an existing coverage mask.
    pub fn from_coverage(mut coverage: BinaryMask, config: &VisibilityConfig) -> Self {
        let (w, h) = coverage.dimensions();
        coverage.zero_rows(0, config.top_rows);
        coverage.zero_cols(0, config.left_cols);
        coverage.zero_cols(w.saturating_sub(config.right_cols), w);

        let mut near = coverage.clone();
        near.zero_rows(0, config.rock_top_rows.min(h));

        tracing::debug!(
            "visibility: {} px full, {} px near",
            coverage.count_ones(),
            near.count_ones()
        );

        Self {
            full: coverage,
            near,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CalibrationConfig;

    fn bands_are_clear(mask: &BinaryMask, cfg: &VisibilityConfig, top: u32) {
        let (w, h) = mask.dimensions();
        for row in 0..h {
            for col in 0..w {
                let in_band = row < top || col < cfg.left_cols || col >= w - cfg.right_cols;
                if in_band {
                    assert!(!mask.get(row, col), "band pixel ({row}, {col}) is set");
                }
            }
        }
    }

    #[test]
    fn bands_are_zero_even_with_full_coverage() {
        let cfg = VisibilityConfig::default();
        let masks = VisibilityMasks::from_coverage(BinaryMask::from_fn(320, 160, |_, _| true), &cfg);
        bands_are_clear(&masks.full, &cfg, cfg.top_rows);
        bands_are_clear(&masks.near, &cfg, cfg.rock_top_rows);
        assert_eq!(masks.full.count_ones(), (160 - 60) * (320 - 100));
        assert_eq!(masks.near.count_ones(), (160 - 110) * (320 - 100));
    }

    #[test]
    fn default_calibration_masks() {
        let cfg = VisibilityConfig::default();
        let rect = Rectifier::new(&CalibrationConfig::default(), [320, 160]).unwrap();
        let masks = VisibilityMasks::build(&rect, &cfg);
        bands_are_clear(&masks.full, &cfg, cfg.top_rows);
        bands_are_clear(&masks.near, &cfg, cfg.rock_top_rows);
        assert!(masks.full.get(150, 160));
        assert!(masks.near.get(150, 160));
        assert!(masks.full.get(80, 160));
        assert!(!masks.near.get(80, 160));
    }

    #[test]
    fn near_is_subset_of_full() {
        let cfg = VisibilityConfig::default();
        let rect = Rectifier::new(&CalibrationConfig::default(), [320, 160]).unwrap();
        let masks = VisibilityMasks::build(&rect, &cfg);
        assert_eq!(masks.near.and(&masks.full), masks.near);
    }
}
