//! `foothold-perception` – the map side of terrain evaluation.
//!
//! # Modules
//!
//! - [`index`] – [`SpatialIndex`][index::SpatialIndex]: the read-only query
//!   surface (coordinate ↔ key, lookup, occupancy test) the evaluator issues
//!   against an externally owned map.
//! - [`octree`] – [`OccupancyOctree`][octree::OccupancyOctree]: a 16-level
//!   log-odds occupancy octree implementing that surface.
//! - [`transform`] – [`Heading`][transform::Heading]: planar yaw rotations
//!   between the robot heading frame and the world frame.

pub mod index;
pub mod octree;
pub mod transform;

pub use index::{OccupancyNode, SpatialIndex, TREE_DEPTH};
pub use octree::OccupancyOctree;
pub use transform::Heading;
