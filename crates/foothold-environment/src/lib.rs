//! `foothold-environment` – terrain evaluation.
//!
//! Turns a live occupancy map around a moving robot into a per-column
//! traversability score, re-evaluating only what changed between planning
//! cycles.
//!
//! # Modules
//!
//! - [`grid`] – [`GridIndex`][grid::GridIndex]: key ↔ vertex id ↔ position
//!   mapping at the environment resolution.
//! - [`feature`] – [`TerrainFeature`][feature::TerrainFeature]: pluggable
//!   scoring units and the built-in slope, curvature and height-deviation
//!   features.
//! - [`surface`] – covariance-based plane fitting (normal and curvature).
//! - [`reward_map`] – [`RewardMap`][reward_map::RewardMap]: configuration,
//!   height and reward tables, interest-region eviction, and the
//!   [`RewardBackend`][reward_map::RewardBackend] cycle contract.
//! - [`terrain_evaluator`] –
//!   [`SpatialTerrainEvaluator`][terrain_evaluator::SpatialTerrainEvaluator]:
//!   the backend that discovers surface heights and scores them against a
//!   [`SpatialIndex`][foothold_perception::SpatialIndex].

pub mod feature;
pub mod grid;
pub mod reward_map;
pub mod surface;
pub mod terrain_evaluator;

pub use feature::{CurvatureFeature, HeightDeviationFeature, SlopeFeature, TerrainFeature};
pub use grid::GridIndex;
pub use reward_map::{ColumnUpdate, CycleReport, RewardBackend, RewardMap};
pub use terrain_evaluator::SpatialTerrainEvaluator;
