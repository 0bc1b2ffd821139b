//! Map definitions: grid size, noise shape, and the floor bands that turn a
//! noise value into a traversal cost.

use crate::noise::NoiseSettings;

/// Tolerance used when a noise value sits exactly on a band's upper edge.
const EDGE_EPSILON: f64 = 1e-6;

/// A floor type covering the half-open noise interval `[min, max)`.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct FloorBand {
    pub id: String,
    pub min: f64,
    pub max: f64,
    /// Cost of entering a cell of this floor.
    pub cost: f64,
}

impl FloorBand {
    pub fn new(id: impl Into<String>, min: f64, max: f64, cost: f64) -> Self {
        Self {
            id: id.into(),
            min,
            max,
            cost,
        }
    }

    #[inline]
    pub fn contains(&self, noise: f64) -> bool {
        noise >= self.min && noise < self.max
    }
}

/// Everything needed to generate a world grid.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct MapDefinition {
    pub width: i32,
    pub height: i32,
    pub noise: NoiseSettings,
    /// Bands are matched in order; noise values covered by no band are
    /// impassable.
    pub floors: Vec<FloorBand>,
}

impl Default for MapDefinition {
    fn default() -> Self {
        Self {
            width: 64,
            height: 64,
            noise: NoiseSettings {
                frequency: 0.08,
                octaves: 3,
                ..Default::default()
            },
            floors: vec![
                FloorBand::new("road", -0.55, 0.0, 1.0),
                FloorBand::new("grass", 0.0, 0.4, 2.0),
                FloorBand::new("forest", 0.4, 1.0, 4.0),
            ],
        }
    }
}

impl MapDefinition {
    /// The floor band for a noise value.
    ///
    /// The first band containing `noise` wins. A value equal to some band's
    /// upper edge falls back to that band, so `1.0` still maps to a band
    /// ending at `1.0`.
    pub fn band_for(&self, noise: f64) -> Option<&FloorBand> {
        self.floors
            .iter()
            .find(|b| b.contains(noise))
            .or_else(|| self.floors.iter().find(|b| (noise - b.max).abs() < EDGE_EPSILON))
    }
}
