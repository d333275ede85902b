//! Image → rover → world coordinate transforms.
//!
//! Rover frame: origin at the bottom-center of the rectified image, `x`
//! forward (up the image), `y` to the rover's left. World frame: the fixed
//! map grid, rover position in cells, yaw in degrees from the world `x` axis.

use crate::classify::PixelSet;

/// Rover pose for one cycle.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct RoverPose {
    /// World position, grid cells.
    pub x: f64,
    pub y: f64,
    /// Heading in degrees, `[0, 360]`.
    pub yaw_deg: f64,
}

impl RoverPose {
    pub fn new(x: f64, y: f64, yaw_deg: f64) -> Self {
        Self { x, y, yaw_deg }
    }
}

/// World-grid cell, `x` = column, `y` = row of the map.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub struct GridCell {
    pub x: usize,
    pub y: usize,
}

/// Image pixel `(row, col)` → rover-frame `(x, y)` for a `width × height` image.
#[inline]
pub fn rover_coords(row: u32, col: u32, width: u32, height: u32) -> [f64; 2] {
    let x = -(row as f64 - height as f64);
    let y = -(col as f64 - width as f64 / 2.0);
    [x, y]
}

/// Rover-frame `(x, y)` → `(distance, angle)`; angle in radians from the
/// forward axis, positive to the left.
#[inline]
pub fn to_polar(xy: [f64; 2]) -> (f64, f64) {
    (xy[0].hypot(xy[1]), xy[1].atan2(xy[0]))
}

/// Rotate `(x, y)` counter-clockwise by `yaw_deg`.
#[inline]
pub fn rotate(xy: [f64; 2], yaw_deg: f64) -> [f64; 2] {
    let (s, c) = yaw_deg.to_radians().sin_cos();
    [xy[0] * c - xy[1] * s, xy[0] * s + xy[1] * c]
}

/// Scale rover units down to world cells and shift by the rover position.
#[inline]
pub fn translate(xy: [f64; 2], pos: [f64; 2], scale: f64) -> [f64; 2] {
    [xy[0] / scale + pos[0], xy[1] / scale + pos[1]]
}

/// Round to the nearest cell and clamp into `[0, world_size - 1]`.
#[inline]
pub fn clip_to_grid(v: f64, world_size: usize) -> usize {
    let max = world_size.saturating_sub(1) as f64;
    v.round().clamp(0.0, max) as usize
}

/// Rover-frame point → world cell.
///
/// Points beyond the grid collapse onto its edge rather than being dropped.
pub fn rover_to_world(xy: [f64; 2], pose: &RoverPose, scale: f64, world_size: usize) -> GridCell {
    let rotated = rotate(xy, pose.yaw_deg);
    let [wx, wy] = translate(rotated, [pose.x, pose.y], scale);
    GridCell {
        x: clip_to_grid(wx, world_size),
        y: clip_to_grid(wy, world_size),
    }
}

/// Rover-frame coordinates for every pixel of `set`.
pub fn pixels_to_rover(set: &PixelSet) -> Vec<[f64; 2]> {
    set.pixels
        .iter()
        .map(|p| rover_coords(p.row, p.col, set.width, set.height))
        .collect()
}

/// World cells for every pixel of `set` (one per pixel, duplicates kept).
pub fn pixels_to_world(
    set: &PixelSet,
    pose: &RoverPose,
    scale: f64,
    world_size: usize,
) -> Vec<GridCell> {
    set.pixels
        .iter()
        .map(|p| {
            let xy = rover_coords(p.row, p.col, set.width, set.height);
            rover_to_world(xy, pose, scale, world_size)
        })
        .collect()
}
