//! **routegrid-core**: foundational types shared by the *routegrid* crates.
//!
//! This crate provides the grid coordinate type ([`Point`]), rectangular
//! bounds ([`Range`]) and a cooperative cancellation token ([`Context`]).

pub mod context;
pub mod geom;

pub use context::Context;
pub use geom::{Point, Range, RangeIter};
