//! Persistent world map with three binary evidence channels.
//!
//! Cells hold 0 or 255. Evidence only accumulates, with one override:
//! after every fusion, navigable evidence clears obstacle evidence in the
//! same cell. The reverse never happens, so a cell once seen as navigable
//! stays obstacle-free even if the terrain later becomes blocked.

use image::{Rgb, RgbImage};

use crate::transform::GridCell;

/// Value of a cell that carries evidence.
pub const EVIDENCE: u8 = 255;

/// One evidence layer of the map.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EvidenceChannel {
    Obstacle,
    Rock,
    Navigable,
}

impl EvidenceChannel {
    /// RGB channel index in map snapshots (red, green, blue).
    pub fn rgb_index(self) -> usize {
        match self {
            Self::Obstacle => 0,
            Self::Rock => 1,
            Self::Navigable => 2,
        }
    }
}

/// Counters for one fusion step.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct MapUpdateStats {
    /// Cells whose obstacle channel went from 0 to 255.
    pub obstacle_set: usize,
    pub rock_set: usize,
    pub navigable_set: usize,
    /// Obstacle cells cleared by navigable evidence.
    pub obstacle_retracted: usize,
}

impl MapUpdateStats {
    pub fn is_unchanged(&self) -> bool {
        *self == Self::default()
    }
}

/// Square evidence grid, `size × size`, cell `(x, y)` at `y * size + x`.
///
/// Deserialization goes through the same checks as
/// [`WorldMap::from_layers`], so a loaded map always has full-length layers
/// and binary cells.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(try_from = "WorldMapLayers")]
pub struct WorldMap {
    size: usize,
    obstacle: Vec<u8>,
    rock: Vec<u8>,
    navigable: Vec<u8>,
}

/// Unchecked wire form of [`WorldMap`].
#[derive(serde::Deserialize)]
struct WorldMapLayers {
    size: usize,
    obstacle: Vec<u8>,
    rock: Vec<u8>,
    navigable: Vec<u8>,
}

impl TryFrom<WorldMapLayers> for WorldMap {
    type Error = String;

    fn try_from(raw: WorldMapLayers) -> Result<Self, Self::Error> {
        WorldMap::from_layers(raw.size, raw.obstacle, raw.rock, raw.navigable)
    }
}

impl WorldMap {
    /// Empty map.
    pub fn new(size: usize) -> Self {
        Self {
            size,
            obstacle: vec![0; size * size],
            rock: vec![0; size * size],
            navigable: vec![0; size * size],
        }
    }

    pub fn size(&self) -> usize {
        self.size
    }

    /// Build a map from raw channel layers.
    ///
    /// Every layer must hold `size * size` cells. Any non-zero value counts
    /// as evidence, and navigable evidence clears obstacle evidence.
    pub fn from_layers(
        size: usize,
        obstacle: Vec<u8>,
        rock: Vec<u8>,
        navigable: Vec<u8>,
    ) -> Result<Self, String> {
        let cells = size
            .checked_mul(size)
            .ok_or_else(|| format!("map size {} overflows", size))?;
        for (name, layer) in [
            ("obstacle", &obstacle),
            ("rock", &rock),
            ("navigable", &navigable),
        ] {
            if layer.len() != cells {
                return Err(format!(
                    "{} layer has {} cells, expected {}x{} = {}",
                    name,
                    layer.len(),
                    size,
                    size,
                    cells
                ));
            }
        }
        let binarize = |layer: Vec<u8>| -> Vec<u8> {
            layer
                .into_iter()
                .map(|v| if v != 0 { EVIDENCE } else { 0 })
                .collect()
        };
        let mut map = Self {
            size,
            obstacle: binarize(obstacle),
            rock: binarize(rock),
            navigable: binarize(navigable),
        };
        map.resolve_conflicts();
        Ok(map)
    }

    /// `true` when every layer holds exactly `size * size` cells.
    pub fn is_well_formed(&self) -> bool {
        let cells = self.size.checked_mul(self.size);
        [&self.obstacle, &self.rock, &self.navigable]
            .iter()
            .all(|layer| Some(layer.len()) == cells)
    }

    fn layer(&self, channel: EvidenceChannel) -> &[u8] {
        match channel {
            EvidenceChannel::Obstacle => &self.obstacle,
            EvidenceChannel::Rock => &self.rock,
            EvidenceChannel::Navigable => &self.navigable,
        }
    }

    fn layer_mut(&mut self, channel: EvidenceChannel) -> &mut Vec<u8> {
        match channel {
            EvidenceChannel::Obstacle => &mut self.obstacle,
            EvidenceChannel::Rock => &mut self.rock,
            EvidenceChannel::Navigable => &mut self.navigable,
        }
    }

    /// Channel value at `(x, y)`; `None` outside the grid.
    pub fn get(&self, channel: EvidenceChannel, x: usize, y: usize) -> Option<u8> {
        (x < self.size && y < self.size).then(|| self.layer(channel)[y * self.size + x])
    }

    /// Number of cells carrying evidence in `channel`.
    pub fn count(&self, channel: EvidenceChannel) -> usize {
        self.layer(channel).iter().filter(|&&v| v != 0).count()
    }

    /// Set `channel` at each cell. Returns how many cells changed.
    pub fn mark(&mut self, channel: EvidenceChannel, cells: &[GridCell]) -> usize {
        let size = self.size;
        let layer = self.layer_mut(channel);
        let mut changed = 0;
        for cell in cells {
            if cell.x >= size || cell.y >= size {
                continue;
            }
            let v = &mut layer[cell.y * size + cell.x];
            if *v != EVIDENCE {
                *v = EVIDENCE;
                changed += 1;
            }
        }
        changed
    }

    /// Clear obstacle evidence wherever navigable evidence exists.
    pub fn resolve_conflicts(&mut self) -> usize {
        let mut cleared = 0;
        for (obs, &nav) in self.obstacle.iter_mut().zip(&self.navigable) {
            if nav == EVIDENCE && *obs != 0 {
                *obs = 0;
                cleared += 1;
            }
        }
        cleared
    }

    /// Fuse one cycle of evidence, then apply the navigable-over-obstacle rule.
    pub fn fuse(
        &mut self,
        navigable: &[GridCell],
        obstacle: &[GridCell],
        rock: &[GridCell],
    ) -> MapUpdateStats {
        let obstacle_before = self.obstacle.clone();
        self.mark(EvidenceChannel::Obstacle, obstacle);
        let rock_set = self.mark(EvidenceChannel::Rock, rock);
        let navigable_set = self.mark(EvidenceChannel::Navigable, navigable);
        self.resolve_conflicts();

        let mut stats = MapUpdateStats {
            rock_set,
            navigable_set,
            ..MapUpdateStats::default()
        };
        for (&before, &after) in obstacle_before.iter().zip(&self.obstacle) {
            match (before, after) {
                (0, EVIDENCE) => stats.obstacle_set += 1,
                (EVIDENCE, 0) => stats.obstacle_retracted += 1,
                _ => {}
            }
        }
        stats
    }

    /// RGB snapshot: red = obstacle, green = rock, blue = navigable.
    /// Image row `y` holds map row `y`.
    pub fn to_rgb_image(&self) -> RgbImage {
        let n = self.size as u32;
        RgbImage::from_fn(n, n, |x, y| {
            let i = y as usize * self.size + x as usize;
            Rgb([self.obstacle[i], self.rock[i], self.navigable[i]])
        })
    }

    /// Rebuild a map from a snapshot; any non-zero channel value is evidence.
    pub fn from_rgb_image(img: &RgbImage) -> Result<Self, String> {
        let (w, h) = img.dimensions();
        if w != h {
            return Err(format!("map snapshot must be square, got {}x{}", w, h));
        }
        let channel = |c: EvidenceChannel| -> Vec<u8> {
            img.pixels().map(|p| p[c.rgb_index()]).collect()
        };
        Self::from_layers(
            w as usize,
            channel(EvidenceChannel::Obstacle),
            channel(EvidenceChannel::Rock),
            channel(EvidenceChannel::Navigable),
        )
    }
}

#[cfg(test)]
impl WorldMap {
    /// Map claiming `size` with empty layers, as a hand-built value could.
    pub(crate) fn with_missing_layers(size: usize) -> Self {
        Self {
            size,
            obstacle: Vec::new(),
            rock: Vec::new(),
            navigable: Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cells(pts: &[(usize, usize)]) -> Vec<GridCell> {
        pts.iter().map(|&(x, y)| GridCell { x, y }).collect()
    }

    #[test]
    fn navigable_clears_obstacle_in_same_cycle() {
        let mut map = WorldMap::new(10);
        let stats = map.fuse(&cells(&[(3, 4)]), &cells(&[(3, 4), (5, 5)]), &[]);
        assert_eq!(map.get(EvidenceChannel::Obstacle, 3, 4), Some(0));
        assert_eq!(map.get(EvidenceChannel::Navigable, 3, 4), Some(255));
        assert_eq!(map.get(EvidenceChannel::Obstacle, 5, 5), Some(255));
        assert_eq!(stats.obstacle_set, 1);
        assert_eq!(stats.obstacle_retracted, 0);
    }

    #[test]
    fn navigable_retracts_older_obstacle() {
        let mut map = WorldMap::new(10);
        map.fuse(&[], &cells(&[(1, 1)]), &[]);
        let stats = map.fuse(&cells(&[(1, 1)]), &[], &[]);
        assert_eq!(map.get(EvidenceChannel::Obstacle, 1, 1), Some(0));
        assert_eq!(stats.obstacle_retracted, 1);
    }

    #[test]
    fn obstacle_never_clears_navigable() {
        let mut map = WorldMap::new(10);
        map.fuse(&cells(&[(2, 2)]), &[], &[]);
        let stats = map.fuse(&[], &cells(&[(2, 2)]), &[]);
        assert_eq!(map.get(EvidenceChannel::Navigable, 2, 2), Some(255));
        assert_eq!(map.get(EvidenceChannel::Obstacle, 2, 2), Some(0));
        assert!(stats.is_unchanged());
    }

    #[test]
    fn rock_channel_is_independent() {
        let mut map = WorldMap::new(10);
        map.fuse(&cells(&[(7, 7)]), &cells(&[(7, 7)]), &cells(&[(7, 7)]));
        assert_eq!(map.get(EvidenceChannel::Rock, 7, 7), Some(255));
    }

    #[test]
    fn fusion_is_idempotent() {
        let nav = cells(&[(0, 0), (1, 0), (1, 0)]);
        let obs = cells(&[(9, 9), (1, 0)]);
        let rock = cells(&[(4, 4)]);
        let mut map = WorldMap::new(10);
        map.fuse(&nav, &obs, &rock);
        let after_first = map.clone();
        let stats = map.fuse(&nav, &obs, &rock);
        assert_eq!(map, after_first);
        assert!(stats.is_unchanged());
    }

    #[test]
    fn empty_sets_leave_map_untouched() {
        let mut map = WorldMap::new(5);
        map.fuse(&cells(&[(1, 2)]), &[], &[]);
        let before = map.clone();
        assert!(map.fuse(&[], &[], &[]).is_unchanged());
        assert_eq!(map, before);
    }

    #[test]
    fn snapshot_roundtrip_keeps_evidence() {
        let mut map = WorldMap::new(6);
        map.fuse(&cells(&[(0, 5)]), &cells(&[(5, 0)]), &cells(&[(2, 3)]));
        let img = map.to_rgb_image();
        assert_eq!(*img.get_pixel(0, 5), Rgb([0, 0, 255]));
        assert_eq!(*img.get_pixel(5, 0), Rgb([255, 0, 0]));
        assert_eq!(WorldMap::from_rgb_image(&img).unwrap(), map);
    }

    #[test]
    fn non_square_snapshot_is_rejected() {
        assert!(WorldMap::from_rgb_image(&RgbImage::new(4, 5)).is_err());
    }

    #[test]
    fn short_layers_are_rejected_on_load() {
        let err = serde_json::from_str::<WorldMap>(
            r#"{"size":200,"obstacle":[],"rock":[],"navigable":[]}"#,
        )
        .unwrap_err();
        assert!(err.to_string().contains("obstacle layer has 0 cells"));
    }

    #[test]
    fn loaded_cells_are_binarized_and_resolved() {
        let map: WorldMap = serde_json::from_str(
            r#"{"size":2,"obstacle":[255,255,0,0],"rock":[0,3,0,0],"navigable":[7,0,0,0]}"#,
        )
        .unwrap();
        assert!(map.is_well_formed());
        assert_eq!(map.get(EvidenceChannel::Navigable, 0, 0), Some(255));
        assert_eq!(map.get(EvidenceChannel::Obstacle, 0, 0), Some(0));
        assert_eq!(map.get(EvidenceChannel::Obstacle, 1, 0), Some(255));
        assert_eq!(map.get(EvidenceChannel::Rock, 1, 0), Some(255));
    }

    #[test]
    fn json_roundtrip_keeps_map() {
        let mut map = WorldMap::new(4);
        map.fuse(&cells(&[(1, 1)]), &cells(&[(2, 3)]), &cells(&[(0, 0)]));
        let json = serde_json::to_string(&map).unwrap();
        assert_eq!(serde_json::from_str::<WorldMap>(&json).unwrap(), map);
    }

    #[test]
    fn out_of_grid_reads_none() {
        let map = WorldMap::new(3);
        assert_eq!(map.get(EvidenceChannel::Rock, 3, 0), None);
        assert_eq!(map.count(EvidenceChannel::Rock), 0);
    }
}
