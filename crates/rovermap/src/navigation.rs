//! Heading candidates for steering: navigable pixels in rover-frame polar form.

use crate::classify::PixelSet;
use crate::transform::{pixels_to_rover, to_polar};

/// One navigable pixel seen from the rover.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct PolarObservation {
    /// Rover-frame pixels from the rover origin.
    pub distance: f64,
    /// Radians from the forward axis, positive to the left.
    pub angle: f64,
}

/// Per-cycle navigable-terrain summary. Recomputed every cycle.
#[derive(Debug, Clone, Default, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct NavigationSummary {
    pub observations: Vec<PolarObservation>,
}

impl NavigationSummary {
    /// Polar form of every pixel in the navigable set.
    pub fn from_pixels(navigable: &PixelSet) -> Self {
        let observations = pixels_to_rover(navigable)
            .into_iter()
            .map(|xy| {
                let (distance, angle) = to_polar(xy);
                PolarObservation { distance, angle }
            })
            .collect();
        Self { observations }
    }

    pub fn len(&self) -> usize {
        self.observations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.observations.is_empty()
    }

    pub fn distances(&self) -> impl Iterator<Item = f64> + '_ {
        self.observations.iter().map(|o| o.distance)
    }

    pub fn angles(&self) -> impl Iterator<Item = f64> + '_ {
        self.observations.iter().map(|o| o.angle)
    }

    /// Mean heading in radians, `None` when nothing is navigable.
    pub fn mean_angle(&self) -> Option<f64> {
        mean(self.angles())
    }

    pub fn mean_angle_deg(&self) -> Option<f64> {
        self.mean_angle().map(f64::to_degrees)
    }

    pub fn mean_distance(&self) -> Option<f64> {
        mean(self.distances())
    }
}

fn mean(values: impl Iterator<Item = f64>) -> Option<f64> {
    let (sum, n) = values.fold((0.0, 0usize), |(s, n), v| (s + v, n + 1));
    (n > 0).then(|| sum / n as f64)
}
