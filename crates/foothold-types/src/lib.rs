//! `foothold-types` – shared vocabulary of the terrain-evaluation core.
//!
//! Every other crate in the workspace speaks in these types: discretized
//! cell addresses ([`CellKey`], [`PlanarKey`], [`VertexId`]), the robot
//! pose, the robot-relative [`SearchArea`]s and [`NeighboringWindow`], the
//! reward/height tables and the [`AdjacencyMap`] handed to the path
//! planner.

use std::collections::BTreeMap;
use std::fmt;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use thiserror::Error;

// ────────────────────────────────────────────────────────────────────────────
// Geometry
// ────────────────────────────────────────────────────────────────────────────

/// A 3-D position or direction in the world frame (metres).
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Vec3 {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Vec3 {
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    /// The zero vector.
    pub fn zero() -> Self {
        Self::new(0.0, 0.0, 0.0)
    }

    pub fn add(self, rhs: Self) -> Self {
        Self::new(self.x + rhs.x, self.y + rhs.y, self.z + rhs.z)
    }

    pub fn sub(self, rhs: Self) -> Self {
        Self::new(self.x - rhs.x, self.y - rhs.y, self.z - rhs.z)
    }

    pub fn scale(self, k: f64) -> Self {
        Self::new(self.x * k, self.y * k, self.z * k)
    }

    pub fn dot(self, rhs: Self) -> f64 {
        self.x * rhs.x + self.y * rhs.y + self.z * rhs.z
    }

    /// Euclidean length.
    pub fn norm(self) -> f64 {
        self.dot(self).sqrt()
    }
}

/// Robot pose supplied once per planning cycle: position plus heading
/// (yaw, radians, counter-clockwise from +X).
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct RobotPose {
    pub x: f64,
    pub y: f64,
    pub z: f64,
    pub yaw: f64,
}

impl RobotPose {
    pub fn new(x: f64, y: f64, z: f64, yaw: f64) -> Self {
        Self { x, y, z, yaw }
    }

    pub fn position(&self) -> Vec3 {
        Vec3::new(self.x, self.y, self.z)
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Discrete addressing
// ────────────────────────────────────────────────────────────────────────────

/// Discretized 3-D cell address at the configured resolution.
///
/// Each axis is a 16-bit key; the world origin sits at key `32768`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CellKey {
    pub x: u16,
    pub y: u16,
    pub z: u16,
}

impl CellKey {
    pub fn new(x: u16, y: u16, z: u16) -> Self {
        Self { x, y, z }
    }

    /// Projection onto the ground plane (the column this cell belongs to).
    pub fn planar(&self) -> PlanarKey {
        PlanarKey::new(self.x, self.y)
    }

    /// Key shifted by a signed offset per axis, or `None` when the result
    /// leaves the 16-bit key span.
    pub fn offset(&self, dx: i32, dy: i32, dz: i32) -> Option<CellKey> {
        Some(CellKey::new(
            shift_axis(self.x, dx)?,
            shift_axis(self.y, dy)?,
            shift_axis(self.z, dz)?,
        ))
    }
}

/// Discretized 2-D column address (a [`CellKey`] without its height).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PlanarKey {
    pub x: u16,
    pub y: u16,
}

impl PlanarKey {
    pub fn new(x: u16, y: u16) -> Self {
        Self { x, y }
    }

    /// Key shifted by a signed planar offset, or `None` outside the key span.
    pub fn offset(&self, dx: i32, dy: i32) -> Option<PlanarKey> {
        Some(PlanarKey::new(shift_axis(self.x, dx)?, shift_axis(self.y, dy)?))
    }
}

fn shift_axis(key: u16, delta: i32) -> Option<u16> {
    u16::try_from(i32::from(key) + delta).ok()
}

/// Unique scalar identity of a cell or column; used as graph node id and
/// table key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct VertexId(pub u64);

impl fmt::Display for VertexId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "v{}", self.0)
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Configuration shapes
// ────────────────────────────────────────────────────────────────────────────

/// Robot-relative, heading-aligned box over which rewards are evaluated,
/// together with the planar sampling resolution.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct SearchArea {
    pub min_x: f64,
    pub max_x: f64,
    pub min_y: f64,
    pub max_y: f64,
    pub min_z: f64,
    pub max_z: f64,
    /// Planar sampling step (metres).
    pub resolution: f64,
}

impl SearchArea {
    pub fn new(
        min_x: f64,
        max_x: f64,
        min_y: f64,
        max_y: f64,
        min_z: f64,
        max_z: f64,
        resolution: f64,
    ) -> Self {
        Self {
            min_x,
            max_x,
            min_y,
            max_y,
            min_z,
            max_z,
            resolution,
        }
    }

    /// True when a world-aligned square cell overlaps the planar box.
    ///
    /// `(local_x, local_y)` is the cell centre in the heading frame, `half`
    /// half the cell side and `yaw` the heading the box is placed at. The
    /// test separates along both the box axes and the cell axes, so a cell
    /// is kept only when some part of it lies inside the box.
    pub fn overlaps_cell(&self, local_x: f64, local_y: f64, half: f64, yaw: f64) -> bool {
        let (sin, cos) = yaw.sin_cos();
        let (half_x, half_y) = ((self.max_x - self.min_x) / 2.0, (self.max_y - self.min_y) / 2.0);
        let dx = local_x - (self.min_x + self.max_x) / 2.0;
        let dy = local_y - (self.min_y + self.max_y) / 2.0;

        // Box axes: the rotated cell reaches half·(|cos|+|sin|).
        let reach = half * (cos.abs() + sin.abs());
        if dx.abs() > half_x + reach || dy.abs() > half_y + reach {
            return false;
        }
        // Cell axes: world x and y expressed in the heading frame.
        let along_x = dx * cos - dy * sin;
        let along_y = dx * sin + dy * cos;
        along_x.abs() <= half + half_x * cos.abs() + half_y * sin.abs()
            && along_y.abs() <= half + half_x * sin.abs() + half_y * cos.abs()
    }
}

impl Default for SearchArea {
    /// The area installed when none was registered before the first cycle:
    /// a strip in front of the robot, reaching below its body.
    fn default() -> Self {
        Self::new(0.5, 3.0, -0.75, 0.75, -0.77, -0.4, 0.04)
    }
}

/// Integer offset ranges (inclusive) sampled around a surface cell for
/// local surface estimation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct NeighboringWindow {
    pub min_x: i32,
    pub max_x: i32,
    pub min_y: i32,
    pub max_y: i32,
    pub min_z: i32,
    pub max_z: i32,
}

impl NeighboringWindow {
    pub fn new(min_x: i32, max_x: i32, min_y: i32, max_y: i32, min_z: i32, max_z: i32) -> Self {
        Self {
            min_x,
            max_x,
            min_y,
            max_y,
            min_z,
            max_z,
        }
    }

    /// All `(dx, dy, dz)` offsets of the window except the origin, iterated
    /// z-major then y then x.
    pub fn offsets(&self) -> impl Iterator<Item = (i32, i32, i32)> + '_ {
        (self.min_z..=self.max_z)
            .flat_map(move |dz| {
                (self.min_y..=self.max_y)
                    .flat_map(move |dy| (self.min_x..=self.max_x).map(move |dx| (dx, dy, dz)))
            })
            .filter(|&offset| offset != (0, 0, 0))
    }
}

impl Default for NeighboringWindow {
    fn default() -> Self {
        Self::new(-1, 1, -1, 1, -1, 1)
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Tables and graph
// ────────────────────────────────────────────────────────────────────────────

/// A rewarded terrain cell.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Cell {
    /// Surface cell address (column + height key).
    pub key: CellKey,
    /// Planar vertex id of the column; the reward table key.
    pub vertex: VertexId,
    /// Weighted traversability score; higher is better.
    pub reward: f64,
    /// Position the reward was computed at.
    pub position: Vec3,
}

/// Directed edge of the cost graph.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Edge {
    pub target: VertexId,
    /// Negated reward of `target`.
    pub cost: f64,
}

impl Edge {
    pub fn new(target: VertexId, cost: f64) -> Self {
        Self { target, cost }
    }
}

/// Planar vertex id → last-known terrain height of that column.
pub type HeightTable = BTreeMap<VertexId, f64>;

/// Planar vertex id → rewarded cell of that column.
pub type RewardTable = BTreeMap<VertexId, Cell>;

/// Source vertex → outgoing edges, consumed by the graph-search planner.
pub type AdjacencyMap = BTreeMap<VertexId, Vec<Edge>>;

/// Local surface summary handed to every terrain feature.
///
/// `normal` and `curvature` are `None` when too few neighbours were
/// available for a plane fit.
#[derive(Debug, Clone, Copy)]
pub struct TerrainDescriptor<'a> {
    pub position: Vec3,
    /// Column being rewarded. `position` may lie in a neighbouring column
    /// when it is the cloud centroid.
    pub column: PlanarKey,
    pub normal: Option<Vec3>,
    pub curvature: Option<f64>,
    pub height_table: &'a HeightTable,
    /// Environment grid resolution (metres).
    pub resolution: f64,
}

// ────────────────────────────────────────────────────────────────────────────
// Errors and warnings
// ────────────────────────────────────────────────────────────────────────────

/// Error type of the terrain-evaluation core. No variant is process-fatal.
#[derive(Error, Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum FootholdError {
    #[error("position ({x}, {y}, {z}) outside the representable grid span")]
    OutOfRange { x: f64, y: f64, z: f64 },

    #[error("query ({x}, {y}, {z}) outside the spatial index bounds")]
    OutOfBounds { x: f64, y: f64, z: f64 },

    #[error("Configuration Error: {0}")]
    Config(String),
}

/// Recoverable conditions surfaced by a planning cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CycleWarning {
    /// No search area was registered; the default one was installed.
    NoSearchArea,
    /// No terrain feature is registered; reward assignment was skipped.
    NoFeatures,
}

impl fmt::Display for CycleWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CycleWarning::NoSearchArea => write!(f, "no search area registered, using default"),
            CycleWarning::NoFeatures => write!(f, "no terrain features registered"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cell_key_offset_within_span() {
        let key = CellKey::new(100, 200, 300);
        assert_eq!(key.offset(1, -1, 0), Some(CellKey::new(101, 199, 300)));
    }

    #[test]
    fn cell_key_offset_rejects_underflow_and_overflow() {
        assert_eq!(CellKey::new(0, 5, 5).offset(-1, 0, 0), None);
        assert_eq!(CellKey::new(5, 5, u16::MAX).offset(0, 0, 1), None);
        assert_eq!(PlanarKey::new(0, 0).offset(0, -3), None);
    }

    #[test]
    fn planar_projection_drops_height() {
        assert_eq!(CellKey::new(7, 8, 9).planar(), PlanarKey::new(7, 8));
    }

    #[test]
    fn window_offsets_skip_origin() {
        let window = NeighboringWindow::default();
        let offsets: Vec<_> = window.offsets().collect();
        assert_eq!(offsets.len(), 26);
        assert!(!offsets.contains(&(0, 0, 0)));
        assert_eq!(offsets[0], (-1, -1, -1));
        assert_eq!(offsets[1], (0, -1, -1));
    }

    #[test]
    fn flat_window_yields_planar_ring() {
        let window = NeighboringWindow::new(-1, 1, -1, 1, 0, 0);
        assert_eq!(window.offsets().count(), 8);
    }

    #[test]
    fn cell_overlap_needs_part_of_the_cell_inside() {
        let area = SearchArea::new(0.5, 1.5, -0.5, 0.5, -1.0, 0.0, 0.1);
        assert!(area.overlaps_cell(1.0, 0.0, 0.05, 0.0));
        // Straddles the near edge.
        assert!(area.overlaps_cell(0.46, 0.0, 0.05, 0.0));
        // Whole cell in front of the near edge.
        assert!(!area.overlaps_cell(0.41, 0.0, 0.05, 0.0));
        assert!(!area.overlaps_cell(1.0, 0.56, 0.05, 0.0));
    }

    #[test]
    fn cell_overlap_accounts_for_yaw() {
        let area = SearchArea::new(0.5, 1.5, -0.5, 0.5, -1.0, 0.0, 0.1);
        let yaw = std::f64::consts::FRAC_PI_4;
        // A corner of the rotated cell reaches half·√2 towards the box.
        let reach = 0.05 * std::f64::consts::SQRT_2;
        assert!(area.overlaps_cell(0.5 - reach + 0.005, 0.0, 0.05, yaw));
        assert!(!area.overlaps_cell(0.5 - reach - 0.005, 0.0, 0.05, yaw));
        // Near a box corner only the cell axes separate.
        assert!(!area.overlaps_cell(0.5 - 0.06, 0.5 + 0.06, 0.05, yaw));
    }

    #[test]
    fn default_search_area_is_in_front_of_robot() {
        let area = SearchArea::default();
        assert!(area.min_x > 0.0);
        assert!(area.max_z < 0.0);
        assert!((area.resolution - 0.04).abs() < f64::EPSILON);
    }

    #[test]
    fn vec3_arithmetic() {
        let a = Vec3::new(1.0, 2.0, 2.0);
        assert!((a.norm() - 3.0).abs() < 1e-12);
        assert_eq!(a.sub(a), Vec3::zero());
        assert!((a.dot(Vec3::new(0.0, 0.0, 1.0)) - 2.0).abs() < 1e-12);
    }

    #[test]
    fn search_area_serialization_roundtrip() {
        let area = SearchArea::default();
        let json = serde_json::to_string(&area).unwrap();
        let back: SearchArea = serde_json::from_str(&json).unwrap();
        assert_eq!(area, back);
    }

    #[test]
    fn foothold_error_display() {
        let err = FootholdError::OutOfBounds {
            x: 1.0,
            y: 2.0,
            z: 3.0,
        };
        assert!(err.to_string().contains("spatial index"));
        let err = FootholdError::Config("bad resolution".to_string());
        assert!(err.to_string().contains("bad resolution"));
    }
}
