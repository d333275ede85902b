//! Error type shared by every pipeline stage.

use crate::homography::HomographyError;

/// Reasons a perception cycle (or session construction) is rejected.
///
/// Every variant is raised before the world map is touched, so a failed
/// cycle leaves the map in its previous state.
#[derive(Debug, Clone, PartialEq)]
pub enum PerceptionError {
    /// Calibration or tuning parameters are malformed.
    Configuration(String),
    /// Frame dimensions differ from the configured frame size.
    InvalidFrame { expected: [u32; 2], got: [u32; 2] },
    /// Pose is non-finite or outside the world bounds / yaw range.
    InvalidPose(String),
    /// World map edge length differs from the configured world size.
    MapSizeMismatch { expected: usize, got: usize },
    /// World map layers do not hold `size * size` cells.
    MalformedMap(String),
}

impl std::fmt::Display for PerceptionError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Configuration(msg) => write!(f, "configuration error: {}", msg),
            Self::InvalidFrame { expected, got } => write!(
                f,
                "invalid frame: expected {}x{}, got {}x{}",
                expected[0], expected[1], got[0], got[1]
            ),
            Self::InvalidPose(msg) => write!(f, "invalid pose: {}", msg),
            Self::MapSizeMismatch { expected, got } => write!(
                f,
                "world map size mismatch: expected {}x{}, got {}x{}",
                expected, expected, got, got
            ),
            Self::MalformedMap(msg) => write!(f, "malformed world map: {}", msg),
        }
    }
}

impl std::error::Error for PerceptionError {}

impl From<HomographyError> for PerceptionError {
    fn from(e: HomographyError) -> Self {
        Self::Configuration(e.to_string())
    }
}
