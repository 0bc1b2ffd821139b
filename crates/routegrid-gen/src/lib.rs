//! World generation for routegrid: builds a [`WeightedGrid`](routegrid_paths::WeightedGrid)
//! from a seeded noise field, and picks random traversable positions.

pub mod mapdef;
pub mod mapgen;
pub mod noise;

pub use mapdef::{FloorBand, MapDefinition};
pub use mapgen::{MapGen, random_position, random_position_near};
pub use noise::{NoiseField, NoiseSettings};
