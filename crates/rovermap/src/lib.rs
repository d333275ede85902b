//! rovermap: camera-to-world-map perception for ground rovers.
//!
//! One forward camera frame and the rover pose go in; a persistent
//! three-channel world map (obstacle / rock / navigable) is updated and the
//! navigable terrain is summarized as polar heading candidates.
//!
//! The pipeline stages are:
//!
//! 1. **Rectify**: four-point perspective warp to a top-down rover view.
//! 2. **Visibility**: coverage mask of the warp, trimmed by fixed bands.
//! 3. **Classify**: colour rules for navigable / obstacle / rock, followed
//!    by per-class erosion or dilation.
//! 4. **Transform**: image → rover Cartesian → polar, rover → world grid
//!    with clipping at the grid edge.
//! 5. **Fuse**: set evidence in the world map; navigable clears obstacle.
//! 6. **Navigate**: polar summary of the navigable pixels.
//!
//! # Public API
//! - [`Perception`] as the session entry point, [`PerceptionConfig`] for tuning
//! - [`WorldMap`] as the persistent state owned by the caller
//! - stage building blocks ([`Rectifier`], [`VisibilityMasks`],
//!   [`TerrainClassifier`], [`transform`] functions) for direct use and tests

mod classify;
mod config;
mod error;
mod homography;
mod mask;
mod morphology;
mod navigation;
mod pipeline;
mod rectify;
pub mod transform;
mod visibility;
mod world_map;

#[cfg(test)]
pub(crate) mod test_utils;

pub use classify::{
    is_blank_frame, is_navigable, is_obstacle, is_rock, Classification, PixelCoord, PixelSet,
    TerrainClass, TerrainClassifier,
};
pub use config::{
    CalibrationConfig, ClassifierConfig, PerceptionConfig, RockThreshold, VisibilityConfig,
    WorldConfig,
};
pub use error::PerceptionError;
pub use homography::HomographyError;
pub use mask::BinaryMask;
pub use morphology::{MorphologyKind, MorphologyOp};
pub use navigation::{NavigationSummary, PolarObservation};
pub use pipeline::{ClassCounts, CycleInput, CycleOutput, Perception};
pub use rectify::Rectifier;
pub use transform::{GridCell, RoverPose};
pub use visibility::VisibilityMasks;
pub use world_map::{EvidenceChannel, MapUpdateStats, WorldMap, EVIDENCE};
