//! `foothold-planning` – graph construction for the path planner.
//!
//! # Modules
//!
//! - [`cost_map`] – [`CostGraphBuilder`][cost_map::CostGraphBuilder]:
//!   converts a reward table into the directed, weighted
//!   [`AdjacencyMap`][foothold_types::AdjacencyMap] consumed by graph search.

pub mod cost_map;

pub use cost_map::{CostGraphBuilder, DEFAULT_SEARCH_RADIUS, Direction};
