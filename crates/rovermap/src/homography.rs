//! Planar homography from four point correspondences.
//!
//! The calibration is always exactly four pairs, so the linear system is a
//! fixed 8×9 matrix. Quads are checked for degeneracy before solving.

use nalgebra::{Matrix3, SMatrix, SymmetricEigen, Vector3};

/// Doubled triangle area (relative to the squared quad extent) below which
/// three points are treated as collinear.
const COLLINEAR_REL_TOL: f64 = 1e-6;

#[derive(Debug, Clone, PartialEq)]
pub enum HomographyError {
    NonFinitePoint { quad: &'static str, index: usize },
    CollinearPoints { quad: &'static str, indices: [usize; 3] },
    NumericalFailure(String),
}

impl std::fmt::Display for HomographyError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NonFinitePoint { quad, index } => {
                write!(f, "{} point {} is not finite", quad, index)
            }
            Self::CollinearPoints { quad, indices } => write!(
                f,
                "{} points {}, {}, {} are collinear (degenerate quadrilateral)",
                quad, indices[0], indices[1], indices[2]
            ),
            Self::NumericalFailure(msg) => write!(f, "numerical failure: {}", msg),
        }
    }
}

impl std::error::Error for HomographyError {}

/// Project a 2D point through a 3×3 homography: H * [x, y, 1]^T → [u, v].
pub fn project(h: &Matrix3<f64>, x: f64, y: f64) -> [f64; 2] {
    let p = h * Vector3::new(x, y, 1.0);
    if p[2].abs() < 1e-15 {
        return [f64::NAN, f64::NAN];
    }
    [p[0] / p[2], p[1] / p[2]]
}

/// Reject quadrilaterals with non-finite corners or any collinear triple.
pub fn validate_quad(quad: &[[f64; 2]; 4], name: &'static str) -> Result<(), HomographyError> {
    for (index, p) in quad.iter().enumerate() {
        if !p[0].is_finite() || !p[1].is_finite() {
            return Err(HomographyError::NonFinitePoint { quad: name, index });
        }
    }

    let (mut min_x, mut max_x) = (quad[0][0], quad[0][0]);
    let (mut min_y, mut max_y) = (quad[0][1], quad[0][1]);
    for p in &quad[1..] {
        min_x = min_x.min(p[0]);
        max_x = max_x.max(p[0]);
        min_y = min_y.min(p[1]);
        max_y = max_y.max(p[1]);
    }
    let extent = (max_x - min_x).max(max_y - min_y);
    let tol = COLLINEAR_REL_TOL * (extent * extent).max(1e-12);

    const TRIPLES: [[usize; 3]; 4] = [[0, 1, 2], [0, 1, 3], [0, 2, 3], [1, 2, 3]];
    for indices in TRIPLES {
        let [a, b, c] = indices.map(|i| quad[i]);
        let cross = (b[0] - a[0]) * (c[1] - a[1]) - (b[1] - a[1]) * (c[0] - a[0]);
        if cross.abs() <= tol {
            return Err(HomographyError::CollinearPoints { quad: name, indices });
        }
    }
    Ok(())
}

/// Similarity that moves the quad centroid to the origin and scales the mean
/// corner distance to `sqrt(2)`, plus the corners in that frame.
fn hartley_frame(quad: &[[f64; 2]; 4]) -> (Matrix3<f64>, [[f64; 2]; 4]) {
    let centroid = quad
        .iter()
        .fold([0.0, 0.0], |acc, p| [acc[0] + p[0] / 4.0, acc[1] + p[1] / 4.0]);
    let spread = quad
        .iter()
        .map(|p| (p[0] - centroid[0]).hypot(p[1] - centroid[1]))
        .sum::<f64>()
        / 4.0;
    let k = if spread > 1e-15 {
        std::f64::consts::SQRT_2 / spread
    } else {
        1.0
    };

    let frame = Matrix3::new(
        k,
        0.0,
        -k * centroid[0],
        0.0,
        k,
        -k * centroid[1],
        0.0,
        0.0,
        1.0,
    );
    let moved = quad.map(|p| [k * (p[0] - centroid[0]), k * (p[1] - centroid[1])]);
    (frame, moved)
}

/// Four-point Direct Linear Transform in Hartley-normalized coordinates.
///
/// Returns `H` with `H[(2, 2)] = 1` (when representable) such that
/// `project(H, src[i]) ≈ dst[i]`.
pub fn estimate_quad_homography(
    src: &[[f64; 2]; 4],
    dst: &[[f64; 2]; 4],
) -> Result<Matrix3<f64>, HomographyError> {
    let (t_src, s) = hartley_frame(src);
    let (t_dst, d) = hartley_frame(dst);

    // Two constraint rows per correspondence: u·(h3·p) = h1·p, v·(h3·p) = h2·p.
    let mut a = SMatrix::<f64, 8, 9>::zeros();
    for (i, (p, q)) in s.iter().zip(&d).enumerate() {
        let (x, y) = (p[0], p[1]);
        let (u, v) = (q[0], q[1]);
        let r = 2 * i;
        a.row_mut(r)
            .copy_from_slice(&[x, y, 1.0, 0.0, 0.0, 0.0, -u * x, -u * y, -u]);
        a.row_mut(r + 1)
            .copy_from_slice(&[0.0, 0.0, 0.0, x, y, 1.0, -v * x, -v * y, -v]);
    }

    // Null vector: eigenvector of AᵀA with the smallest eigenvalue.
    let eig = SymmetricEigen::new(a.transpose() * a);
    let (null_idx, _) = eig
        .eigenvalues
        .iter()
        .map(|l| l.abs())
        .enumerate()
        .fold((0, f64::INFINITY), |best, (i, l)| if l < best.1 { (i, l) } else { best });
    let null = eig.eigenvectors.column(null_idx);
    let h_norm = Matrix3::from_fn(|r, c| null[3 * r + c]);

    let t_dst_inv = t_dst.try_inverse().ok_or_else(|| {
        HomographyError::NumericalFailure("destination normalization is singular".into())
    })?;
    let h = t_dst_inv * h_norm * t_src;

    let h22 = h[(2, 2)];
    Ok(if h22.abs() > 1e-15 { h / h22 } else { h })
}

/// Homography mapping the `src` quadrilateral onto `dst`.
///
/// Both quads are validated first; the result must be finite and invertible.
pub fn homography_from_quads(
    src: &[[f64; 2]; 4],
    dst: &[[f64; 2]; 4],
) -> Result<Matrix3<f64>, HomographyError> {
    validate_quad(src, "source")?;
    validate_quad(dst, "destination")?;

    let h = estimate_quad_homography(src, dst)?;
    if h.iter().any(|v| !v.is_finite()) {
        return Err(HomographyError::NumericalFailure(
            "homography has non-finite entries".into(),
        ));
    }
    if h.determinant().abs() < 1e-12 {
        return Err(HomographyError::NumericalFailure(
            "homography is singular".into(),
        ));
    }
    Ok(h)
}
