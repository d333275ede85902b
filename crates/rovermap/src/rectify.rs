//! Perspective rectification of camera frames into a top-down view.

use image::{Rgb, RgbImage};
use nalgebra::{Matrix3, Vector3};

use crate::config::CalibrationConfig;
use crate::error::PerceptionError;
use crate::homography::homography_from_quads;
use crate::mask::BinaryMask;

/// Fixed-size perspective warp built from a four-point calibration.
///
/// Destination pixels are pulled from the source through the inverse
/// homography with bilinear sampling; taps outside the source frame read
/// as zero intensity.
#[derive(Debug, Clone)]
pub struct Rectifier {
    h: Matrix3<f64>,
    h_inv: Matrix3<f64>,
    /// Sign of the homogeneous coordinate on the visible side of the horizon.
    front_sign: f64,
    width: u32,
    height: u32,
}

impl Rectifier {
    /// Build the warp for `frame_size = [width, height]`.
    ///
    /// Fails with [`PerceptionError::Configuration`] on degenerate quads.
    pub fn new(calibration: &CalibrationConfig, frame_size: [u32; 2]) -> Result<Self, PerceptionError> {
        let h = homography_from_quads(&calibration.src_quad, &calibration.dst_quad)?;
        let h_inv = h.try_inverse().ok_or_else(|| {
            PerceptionError::Configuration("perspective transform is not invertible".into())
        })?;
        let (cx, cy) = calibration
            .dst_quad
            .iter()
            .fold((0.0, 0.0), |(sx, sy), p| (sx + p[0] / 4.0, sy + p[1] / 4.0));
        let w = (h_inv * Vector3::new(cx, cy, 1.0))[2];
        Ok(Self {
            h,
            h_inv,
            front_sign: w.signum(),
            width: frame_size[0],
            height: frame_size[1],
        })
    }

    /// Source → destination homography.
    pub fn homography(&self) -> &Matrix3<f64> {
        &self.h
    }

    /// Map a raw-frame point into the rectified frame.
    pub fn warp_point(&self, xy: [f64; 2]) -> [f64; 2] {
        crate::homography::project(&self.h, xy[0], xy[1])
    }

    /// Rectified pixel → raw-frame point; `None` when it lies behind the
    /// camera (beyond the horizon).
    fn source_point(&self, x: f64, y: f64) -> Option<[f64; 2]> {
        let p = self.h_inv * Vector3::new(x, y, 1.0);
        if p[2] * self.front_sign <= 1e-15 {
            return None;
        }
        Some([p[0] / p[2], p[1] / p[2]])
    }

    /// Warp `frame` into the rectified view (same dimensions).
    pub fn warp(&self, frame: &RgbImage) -> RgbImage {
        RgbImage::from_fn(self.width, self.height, |x, y| {
            match self.source_point(x as f64, y as f64) {
                Some(s) => sample_bilinear_rgb(frame, s[0], s[1]),
                None => Rgb([0, 0, 0]),
            }
        })
    }

    /// Warp of an all-255 field: `true` where every contributing tap came
    /// from inside the camera frame.
    pub fn coverage(&self) -> BinaryMask {
        let white = RgbImage::from_pixel(self.width, self.height, Rgb([255, 255, 255]));
        let warped = self.warp(&white);
        BinaryMask::from_fn(self.width, self.height, |row, col| {
            warped.get_pixel(col, row)[0] == 255
        })
    }
}

/// Bilinear RGB sample at sub-pixel `(x, y)`; out-of-frame taps are zero.
fn sample_bilinear_rgb(img: &RgbImage, x: f64, y: f64) -> Rgb<u8> {
    if !x.is_finite() || !y.is_finite() {
        return Rgb([0, 0, 0]);
    }
    let (w, h) = img.dimensions();
    let x0 = x.floor();
    let y0 = y.floor();
    let fx = x - x0;
    let fy = y - y0;
    if x0 < -1.0 || y0 < -1.0 || x0 >= w as f64 || y0 >= h as f64 {
        return Rgb([0, 0, 0]);
    }
    let (x0, y0) = (x0 as i64, y0 as i64);

    let taps = [
        (x0, y0, (1.0 - fx) * (1.0 - fy)),
        (x0 + 1, y0, fx * (1.0 - fy)),
        (x0, y0 + 1, (1.0 - fx) * fy),
        (x0 + 1, y0 + 1, fx * fy),
    ];

    let mut acc = [0.0f64; 3];
    for (tx, ty, weight) in taps {
        if weight <= 0.0 || tx < 0 || ty < 0 || tx >= w as i64 || ty >= h as i64 {
            continue;
        }
        let p = img.get_pixel(tx as u32, ty as u32);
        for c in 0..3 {
            acc[c] += weight * p[c] as f64;
        }
    }
    Rgb(acc.map(|v| v.round().clamp(0.0, 255.0) as u8))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn identity_calibration() -> CalibrationConfig {
        let quad = [[10.0, 10.0], [50.0, 10.0], [50.0, 30.0], [10.0, 30.0]];
        CalibrationConfig {
            src_quad: quad,
            dst_quad: quad,
        }
    }

    #[test]
    fn identity_warp_preserves_frame() {
        let rect = Rectifier::new(&identity_calibration(), [64, 40]).unwrap();
        let frame = RgbImage::from_fn(64, 40, |x, y| Rgb([x as u8 * 3, y as u8 * 5, 77]));
        assert_eq!(rect.warp(&frame), frame);
        assert_eq!(rect.coverage().count_ones(), 64 * 40);
    }

    #[test]
    fn degenerate_calibration_is_configuration_error() {
        let cfg = CalibrationConfig {
            src_quad: [[0.0, 0.0], [1.0, 1.0], [2.0, 2.0], [0.0, 5.0]],
            ..CalibrationConfig::default()
        };
        assert!(matches!(
            Rectifier::new(&cfg, [320, 160]),
            Err(PerceptionError::Configuration(_))
        ));
    }

    #[test]
    fn default_calibration_maps_tile_to_square() {
        let cfg = CalibrationConfig::default();
        let rect = Rectifier::new(&cfg, [320, 160]).unwrap();
        for (s, d) in cfg.src_quad.iter().zip(&cfg.dst_quad) {
            let p = rect.warp_point(*s);
            assert!((p[0] - d[0]).abs() < 1e-6 && (p[1] - d[1]).abs() < 1e-6);
        }
    }

    #[test]
    fn default_coverage_is_a_fan_below_the_horizon() {
        let rect = Rectifier::new(&CalibrationConfig::default(), [320, 160]).unwrap();
        let cov = rect.coverage();
        // Ground just ahead of the rover is seen; the last rows lie behind
        // the camera and the lower-left flank is outside its field of view.
        assert!(cov.get(150, 160));
        assert!(cov.get(120, 200));
        assert!(!cov.get(159, 160));
        assert!(!cov.get(120, 100));
    }

    #[test]
    fn out_of_frame_source_reads_black() {
        let cfg = CalibrationConfig {
            src_quad: [[0.0, 0.0], [10.0, 0.0], [10.0, 10.0], [0.0, 10.0]],
            dst_quad: [[20.0, 0.0], [30.0, 0.0], [30.0, 10.0], [20.0, 10.0]],
        };
        let rect = Rectifier::new(&cfg, [40, 10]).unwrap();
        let frame = RgbImage::from_pixel(40, 10, Rgb([200, 200, 200]));
        let warped = rect.warp(&frame);
        // Pure shift by +20 px: destination columns < 20 pull from x < 0.
        assert_eq!(*warped.get_pixel(5, 5), Rgb([0, 0, 0]));
        assert_eq!(*warped.get_pixel(25, 5), Rgb([200, 200, 200]));
    }
}
