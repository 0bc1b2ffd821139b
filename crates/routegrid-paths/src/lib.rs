//! Pathfinding over weighted 4-connected grids.
//!
//! This crate provides two interchangeable shortest-path algorithms over a
//! [`WeightedGrid`]:
//!
//! - **Uniform-cost search** (Dijkstra-style, [`Algorithm::UniformCost`])
//! - **Heuristic-guided search** (A*-style with a Manhattan estimate,
//!   [`Algorithm::HeuristicGuided`])
//!
//! Both are available as a single blocking call ([`PathFinder::find_path`])
//! and as a resumable [`Search`] that advances by a bounded number of
//! iterations per [`Search::step`]. [`PathComputation`] wraps one search with
//! cancellation and a lifecycle state for use by a scheduler.
//!
//! Moving *into* a cell costs that cell's traversal cost; the start cell is
//! never charged.
//!
//! # Trait hierarchy
//!
//! | Trait | Required for |
//! |---|---|
//! | [`Pather`] | neighbour enumeration |
//! | [`WeightedPather`] : [`Pather`] | uniform-cost search |
//! | [`AstarPather`] : [`WeightedPather`] | heuristic-guided search |

mod computation;
mod distance;
mod grid;
mod heuristic;
mod node;
mod search;
mod traits;
mod uniform;

pub use computation::{ComputationState, PathComputation};
pub use distance::manhattan;
pub use grid::{GridError, WeightedGrid};
pub use search::{Algorithm, PathFinder, Search, Step, path_cost};
pub use traits::{AstarPather, Pather, WeightedPather};
