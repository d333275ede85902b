//! Per-cycle perception: frame + pose in, map update + heading summary out.

use image::RgbImage;

use crate::classify::{is_blank_frame, Classification, PixelSet, TerrainClass, TerrainClassifier};
use crate::config::PerceptionConfig;
use crate::error::PerceptionError;
use crate::navigation::NavigationSummary;
use crate::rectify::Rectifier;
use crate::transform::{pixels_to_world, RoverPose};
use crate::visibility::VisibilityMasks;
use crate::world_map::{MapUpdateStats, WorldMap};

/// Immutable inputs of one cycle, borrowed from the caller.
#[derive(Debug, Clone, Copy)]
pub struct CycleInput<'a> {
    pub frame: &'a RgbImage,
    pub pose: RoverPose,
}

/// Pixel counts per class after cleanup.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct ClassCounts {
    pub navigable: usize,
    pub obstacle: usize,
    pub rock: usize,
}

/// Everything a cycle produces besides the map mutation itself.
#[derive(Debug, Clone)]
pub struct CycleOutput {
    /// Heading candidates for steering.
    pub navigation: NavigationSummary,
    pub counts: ClassCounts,
    pub map_update: MapUpdateStats,
    /// Warped-space debug view, when enabled in the config.
    pub vision_image: Option<RgbImage>,
}

/// Perception session.
///
/// Holds the validated configuration and everything derived from the fixed
/// calibration. Create once, call [`Perception::process`] every cycle.
/// Cycles that share a [`WorldMap`] must run one after another.
///
/// # Examples
///
/// ```
/// use image::RgbImage;
/// use rovermap::{CycleInput, Perception, PerceptionConfig, RoverPose};
///
/// let perception = Perception::new(PerceptionConfig::default()).unwrap();
/// let mut map = perception.new_world_map();
/// let frame = RgbImage::new(320, 160);
/// let input = CycleInput { frame: &frame, pose: RoverPose::new(100.0, 100.0, 0.0) };
/// let out = perception.process(&input, &mut map).unwrap();
/// assert!(out.navigation.is_empty());
/// ```
#[derive(Debug, Clone)]
pub struct Perception {
    config: PerceptionConfig,
    rectifier: Rectifier,
    visibility: VisibilityMasks,
    classifier: TerrainClassifier,
}

impl Perception {
    /// Validate `config` and precompute the warp and visibility masks.
    pub fn new(config: PerceptionConfig) -> Result<Self, PerceptionError> {
        config.validate()?;
        let rectifier = Rectifier::new(&config.calibration, config.frame_size)?;
        let visibility = VisibilityMasks::build(&rectifier, &config.visibility);
        if visibility.full.is_empty() {
            tracing::warn!("visibility mask is empty; every cycle will classify nothing");
        }
        let classifier = TerrainClassifier::new(config.classifier.clone());
        Ok(Self {
            config,
            rectifier,
            visibility,
            classifier,
        })
    }

    pub fn config(&self) -> &PerceptionConfig {
        &self.config
    }

    pub fn rectifier(&self) -> &Rectifier {
        &self.rectifier
    }

    pub fn visibility(&self) -> &VisibilityMasks {
        &self.visibility
    }

    /// Empty map sized for this session.
    pub fn new_world_map(&self) -> WorldMap {
        WorldMap::new(self.config.world.world_size)
    }

    /// Run one cycle.
    ///
    /// Inputs are validated before any work; on error `map` is untouched.
    pub fn process(
        &self,
        input: &CycleInput<'_>,
        map: &mut WorldMap,
    ) -> Result<CycleOutput, PerceptionError> {
        if let Err(e) = self.validate(input, map) {
            tracing::warn!("cycle rejected: {}", e);
            return Err(e);
        }

        let classes = self.classify_frame(input.frame);
        let sets = TerrainClass::ALL.map(|class| classes.pixel_set(class));
        let [navigable, obstacle, rock] = &sets;
        let counts = ClassCounts {
            navigable: navigable.len(),
            obstacle: obstacle.len(),
            rock: rock.len(),
        };
        tracing::debug!(
            "classified: navigable={} obstacle={} rock={}",
            counts.navigable,
            counts.obstacle,
            counts.rock
        );

        let world = &self.config.world;
        let to_world =
            |set: &PixelSet| pixels_to_world(set, &input.pose, world.scale, world.world_size);
        let nav_cells = to_world(navigable);
        let obstacle_cells = to_world(obstacle);
        let rock_cells = to_world(rock);

        let navigation = NavigationSummary::from_pixels(navigable);
        let vision_image = self
            .config
            .render_vision_image
            .then(|| classes.vision_image());

        // Only mutation of the cycle; nothing after this can fail.
        let map_update = map.fuse(&nav_cells, &obstacle_cells, &rock_cells);

        tracing::info!(
            "cycle at ({:.1}, {:.1}) yaw {:.1}: +{} navigable, +{} obstacle (-{} retracted), +{} rock, {} heading candidates",
            input.pose.x,
            input.pose.y,
            input.pose.yaw_deg,
            map_update.navigable_set,
            map_update.obstacle_set,
            map_update.obstacle_retracted,
            map_update.rock_set,
            navigation.len()
        );

        Ok(CycleOutput {
            navigation,
            counts,
            map_update,
            vision_image,
        })
    }

    /// Rectify and classify a frame without touching any map.
    pub fn classify_frame(&self, frame: &RgbImage) -> Classification {
        if is_blank_frame(frame) {
            tracing::warn!("blank frame: no camera signal, skipping classification");
            let [w, h] = self.config.frame_size;
            return Classification::empty(w, h);
        }
        let warped = self.rectifier.warp(frame);
        self.classifier.classify(&warped, &self.visibility)
    }

    fn validate(&self, input: &CycleInput<'_>, map: &WorldMap) -> Result<(), PerceptionError> {
        let got = [input.frame.width(), input.frame.height()];
        if got != self.config.frame_size {
            return Err(PerceptionError::InvalidFrame {
                expected: self.config.frame_size,
                got,
            });
        }

        let world_size = self.config.world.world_size;
        if map.size() != world_size {
            return Err(PerceptionError::MapSizeMismatch {
                expected: world_size,
                got: map.size(),
            });
        }
        if !map.is_well_formed() {
            return Err(PerceptionError::MalformedMap(format!(
                "layers do not cover {}x{} cells",
                world_size, world_size
            )));
        }

        let pose = &input.pose;
        if !pose.x.is_finite() || !pose.y.is_finite() || !pose.yaw_deg.is_finite() {
            return Err(PerceptionError::InvalidPose(format!(
                "non-finite pose ({}, {}, {})",
                pose.x, pose.y, pose.yaw_deg
            )));
        }
        let limit = world_size as f64;
        if pose.x < 0.0 || pose.x >= limit || pose.y < 0.0 || pose.y >= limit {
            return Err(PerceptionError::InvalidPose(format!(
                "position ({}, {}) outside [0, {})",
                pose.x, pose.y, world_size
            )));
        }
        if !(0.0..=360.0).contains(&pose.yaw_deg) {
            return Err(PerceptionError::InvalidPose(format!(
                "yaw {} outside [0, 360]",
                pose.yaw_deg
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;

    fn session() -> Perception {
        Perception::new(PerceptionConfig::default()).unwrap()
    }

    #[test]
    fn wrong_frame_size_is_rejected_without_mutation() {
        let p = session();
        let mut map = p.new_world_map();
        let before = map.clone();
        let frame = RgbImage::new(100, 100);
        let input = CycleInput {
            frame: &frame,
            pose: RoverPose::new(10.0, 10.0, 0.0),
        };
        assert_eq!(
            p.process(&input, &mut map).unwrap_err(),
            PerceptionError::InvalidFrame {
                expected: [320, 160],
                got: [100, 100]
            }
        );
        assert_eq!(map, before);
    }

    #[test]
    fn invalid_poses_are_rejected() {
        let p = session();
        let mut map = p.new_world_map();
        let frame = RgbImage::from_pixel(320, 160, Rgb([200, 200, 200]));
        for pose in [
            RoverPose::new(f64::NAN, 10.0, 0.0),
            RoverPose::new(10.0, 10.0, f64::INFINITY),
            RoverPose::new(-1.0, 10.0, 0.0),
            RoverPose::new(10.0, 200.0, 0.0),
            RoverPose::new(10.0, 10.0, 361.0),
            RoverPose::new(10.0, 10.0, -0.5),
        ] {
            let input = CycleInput {
                frame: &frame,
                pose,
            };
            assert!(matches!(
                p.process(&input, &mut map),
                Err(PerceptionError::InvalidPose(_))
            ));
        }
        assert_eq!(map, p.new_world_map());
    }

    #[test]
    fn map_size_mismatch_is_rejected() {
        let p = session();
        let mut map = WorldMap::new(50);
        let frame = RgbImage::new(320, 160);
        let input = CycleInput {
            frame: &frame,
            pose: RoverPose::new(10.0, 10.0, 0.0),
        };
        assert!(matches!(
            p.process(&input, &mut map),
            Err(PerceptionError::MapSizeMismatch { expected: 200, got: 50 })
        ));
    }

    #[test]
    fn malformed_map_is_rejected_without_mutation() {
        let p = session();
        let mut map = WorldMap::with_missing_layers(200);
        let before = map.clone();
        let frame = RgbImage::from_pixel(320, 160, Rgb([200, 200, 200]));
        let input = CycleInput {
            frame: &frame,
            pose: RoverPose::new(100.0, 100.0, 0.0),
        };
        assert!(matches!(
            p.process(&input, &mut map),
            Err(PerceptionError::MalformedMap(_))
        ));
        assert_eq!(map, before);
    }

    #[test]
    fn degenerate_calibration_fails_construction() {
        let mut cfg = PerceptionConfig::default();
        cfg.calibration.dst_quad[3] = cfg.calibration.dst_quad[0];
        assert!(matches!(
            Perception::new(cfg),
            Err(PerceptionError::Configuration(_))
        ));
    }

    #[test]
    fn vision_image_only_when_enabled() {
        let frame = RgbImage::from_pixel(320, 160, Rgb([200, 200, 200]));
        let input = CycleInput {
            frame: &frame,
            pose: RoverPose::new(100.0, 100.0, 0.0),
        };

        let p = session();
        let mut map = p.new_world_map();
        assert!(p.process(&input, &mut map).unwrap().vision_image.is_none());

        let p = Perception::new(PerceptionConfig {
            render_vision_image: true,
            ..PerceptionConfig::default()
        })
        .unwrap();
        let out = p.process(&input, &mut map).unwrap();
        let vision = out.vision_image.unwrap();
        assert_eq!(vision.dimensions(), (320, 160));
    }
}
