//! Occupancy Octree.
//!
//! Partitions 3-D space into a 16-level octree of cubic cells addressed by
//! [`CellKey`]s, each leaf carrying a log-odds occupancy estimate. It is
//! the concrete map behind [`SpatialIndex`] used by the CLI and the tests;
//! any other map structure can stand in for it.
//!
//! # Key types
//!
//! | Type | Role |
//! |------|------|
//! | [`OccupancyOctree`] | Spatial index; integrate hits/misses, query by key. |
//! | [`OccupancyNode`]   | Log-odds state of an observed leaf.                |
//!
//! # Example
//!
//! ```rust
//! use foothold_perception::index::{SpatialIndex, TREE_DEPTH};
//! use foothold_perception::octree::OccupancyOctree;
//! use foothold_types::Vec3;
//!
//! let mut tree = OccupancyOctree::new(0.1);
//! tree.insert_point(Vec3::new(1.05, 2.05, -0.55));
//!
//! let key = tree.coord_to_key_checked(Vec3::new(1.05, 2.05, -0.55), TREE_DEPTH).unwrap();
//! let node = tree.search(&key).unwrap();
//! assert!(tree.is_occupied(&node));
//!
//! let below = key.offset(0, 0, -1).unwrap();
//! assert!(tree.search(&below).is_none());
//! ```

use foothold_types::{CellKey, Vec3};
use tracing::debug;

use crate::index::{OccupancyNode, SpatialIndex, TREE_DEPTH, axis_coord, axis_key};

/// Log-odds increment applied on an occupied observation.
pub const LOG_ODDS_HIT: f32 = 0.85;
/// Log-odds increment applied on a free observation.
pub const LOG_ODDS_MISS: f32 = -0.4;
/// Lower clamping bound of a leaf's log-odds.
pub const LOG_ODDS_MIN: f32 = -2.0;
/// Upper clamping bound of a leaf's log-odds.
pub const LOG_ODDS_MAX: f32 = 3.5;
/// Leaves strictly above this log-odds are occupied.
pub const OCCUPANCY_THRESHOLD: f32 = 0.0;

// ────────────────────────────────────────────────────────────────────────────
// OccupancyOctree
// ────────────────────────────────────────────────────────────────────────────

/// A 16-level octree of occupancy leaves.
///
/// Construct with [`OccupancyOctree::new`], integrate observations with
/// [`OccupancyOctree::insert_point`] / [`OccupancyOctree::mark_free`], then
/// query it through the [`SpatialIndex`] trait.
#[derive(Debug)]
pub struct OccupancyOctree {
    root: OctreeNode,
    resolution: f64,
    leaf_count: usize,
}

impl OccupancyOctree {
    /// Create an empty tree whose full-depth cells have edge `resolution`
    /// metres.
    pub fn new(resolution: f64) -> Self {
        Self {
            root: OctreeNode::default(),
            resolution,
            leaf_count: 0,
        }
    }

    /// Number of observed leaves (occupied or free).
    pub fn len(&self) -> usize {
        self.leaf_count
    }

    /// True when nothing has been observed yet.
    pub fn is_empty(&self) -> bool {
        self.leaf_count == 0
    }

    /// Integrate an occupied observation at `point`.
    ///
    /// Returns `false` (and changes nothing) when the point lies outside the
    /// representable span.
    pub fn insert_point(&mut self, point: Vec3) -> bool {
        self.update_node(point, true)
    }

    /// Integrate a free-space observation at `point`.
    pub fn mark_free(&mut self, point: Vec3) -> bool {
        self.update_node(point, false)
    }

    /// Integrate a single hit or miss at `point`.
    pub fn update_node(&mut self, point: Vec3, occupied: bool) -> bool {
        let Some(key) = self.coord_to_key_checked(point, TREE_DEPTH) else {
            debug!(x = point.x, y = point.y, z = point.z, "observation outside octree span");
            return false;
        };
        let delta = if occupied { LOG_ODDS_HIT } else { LOG_ODDS_MISS };
        if self.root.update(&key, delta, 0) {
            self.leaf_count += 1;
        }
        true
    }

    /// Export the centres of all occupied leaves.
    ///
    /// Used for map sharing: peers call [`merge`][Self::merge] with the
    /// exported points to fuse them into their own trees.
    pub fn occupied_points(&self) -> Vec<Vec3> {
        let mut keys = Vec::new();
        self.root.collect_occupied(CellKey::new(0, 0, 0), 0, &mut keys);
        keys.iter().map(|k| self.key_to_coord(k)).collect()
    }

    /// Integrate a batch of occupied points (e.g. a peer's exported map).
    ///
    /// Points outside the representable span are skipped, consistent with
    /// [`insert_point`][Self::insert_point].
    pub fn merge(&mut self, points: &[Vec3]) {
        for &p in points {
            self.insert_point(p);
        }
    }
}

impl SpatialIndex for OccupancyOctree {
    fn resolution(&self) -> f64 {
        self.resolution
    }

    fn coord_to_key_checked(&self, point: Vec3, depth: u8) -> Option<CellKey> {
        Some(CellKey::new(
            axis_key(point.x, self.resolution, depth)?,
            axis_key(point.y, self.resolution, depth)?,
            axis_key(point.z, self.resolution, depth)?,
        ))
    }

    fn search(&self, key: &CellKey) -> Option<OccupancyNode> {
        self.root.search(key, 0)
    }

    fn key_to_coord(&self, key: &CellKey) -> Vec3 {
        Vec3::new(
            axis_coord(key.x, self.resolution),
            axis_coord(key.y, self.resolution),
            axis_coord(key.z, self.resolution),
        )
    }

    fn is_occupied(&self, node: &OccupancyNode) -> bool {
        node.log_odds > OCCUPANCY_THRESHOLD
    }
}

// ────────────────────────────────────────────────────────────────────────────
// OctreeNode – internal implementation
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Default)]
struct OctreeNode {
    /// Log-odds of a leaf; `None` until the leaf is observed.
    log_odds: Option<f32>,
    /// Eight children; `None` below the deepest created level.
    children: Option<Box<[OctreeNode; 8]>>,
}

/// Child slot of `key` below a node at `depth`.
fn child_index(key: &CellKey, depth: u8) -> usize {
    let bit = TREE_DEPTH - 1 - depth;
    let pick = |k: u16| usize::from((k >> bit) & 1);
    pick(key.x) | (pick(key.y) << 1) | (pick(key.z) << 2)
}

impl OctreeNode {
    /// Apply `delta` to the leaf addressed by `key`, creating the branch on
    /// demand. Returns `true` when the leaf was previously unobserved.
    fn update(&mut self, key: &CellKey, delta: f32, depth: u8) -> bool {
        if depth == TREE_DEPTH {
            let first = self.log_odds.is_none();
            let value = self.log_odds.unwrap_or(0.0) + delta;
            self.log_odds = Some(value.clamp(LOG_ODDS_MIN, LOG_ODDS_MAX));
            return first;
        }
        let children = self
            .children
            .get_or_insert_with(|| Box::new(std::array::from_fn(|_| OctreeNode::default())));
        children[child_index(key, depth)].update(key, delta, depth + 1)
    }

    fn search(&self, key: &CellKey, depth: u8) -> Option<OccupancyNode> {
        if depth == TREE_DEPTH {
            return self.log_odds.map(|log_odds| OccupancyNode { log_odds });
        }
        let children = self.children.as_ref()?;
        children[child_index(key, depth)].search(key, depth + 1)
    }

    /// Collect the keys of all occupied leaves (depth-first traversal).
    fn collect_occupied(&self, prefix: CellKey, depth: u8, out: &mut Vec<CellKey>) {
        if depth == TREE_DEPTH {
            if self.log_odds.is_some_and(|l| l > OCCUPANCY_THRESHOLD) {
                out.push(prefix);
            }
            return;
        }
        let Some(children) = &self.children else {
            return;
        };
        let bit = TREE_DEPTH - 1 - depth;
        for (i, child) in children.iter().enumerate() {
            let key = CellKey::new(
                prefix.x | (((i & 1) as u16) << bit),
                prefix.y | ((((i >> 1) & 1) as u16) << bit),
                prefix.z | ((((i >> 2) & 1) as u16) << bit),
            );
            child.collect_occupied(key, depth + 1, out);
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn key_of(tree: &OccupancyOctree, x: f64, y: f64, z: f64) -> CellKey {
        tree.coord_to_key_checked(Vec3::new(x, y, z), TREE_DEPTH)
            .expect("in range")
    }

    // ── Basic insert/query ──────────────────────────────────────────────────

    #[test]
    fn empty_tree_knows_nothing() {
        let tree = OccupancyOctree::new(0.1);
        assert!(tree.is_empty());
        let key = key_of(&tree, 0.5, 0.5, 0.5);
        assert!(tree.search(&key).is_none());
    }

    #[test]
    fn insert_and_search() {
        let mut tree = OccupancyOctree::new(0.1);
        assert!(tree.insert_point(Vec3::new(0.55, 0.55, 0.55)));
        let node = tree.search(&key_of(&tree, 0.55, 0.55, 0.55)).expect("observed");
        assert!(tree.is_occupied(&node));
        assert!(tree.search(&key_of(&tree, 0.15, 0.15, 0.15)).is_none());
    }

    #[test]
    fn insert_outside_span_is_ignored() {
        let mut tree = OccupancyOctree::new(0.1);
        assert!(!tree.insert_point(Vec3::new(1.0e6, 0.0, 0.0)));
        assert!(tree.is_empty());
    }

    #[test]
    fn len_counts_distinct_leaves() {
        let mut tree = OccupancyOctree::new(0.1);
        tree.insert_point(Vec3::new(0.05, 0.05, 0.05));
        tree.insert_point(Vec3::new(0.06, 0.04, 0.05)); // same cell
        tree.insert_point(Vec3::new(-0.05, 0.05, 0.05));
        assert_eq!(tree.len(), 2);
    }

    #[test]
    fn negative_coordinates_are_addressable() {
        let mut tree = OccupancyOctree::new(0.1);
        tree.insert_point(Vec3::new(-3.25, -1.05, -0.55));
        let key = key_of(&tree, -3.25, -1.05, -0.55);
        assert!(tree.search(&key).is_some());
        let centre = tree.key_to_coord(&key);
        assert!((centre.x + 3.25).abs() < 1e-9);
        assert!((centre.z + 0.55).abs() < 1e-9);
    }

    // ── Log-odds ────────────────────────────────────────────────────────────

    #[test]
    fn free_observations_clear_occupancy() {
        let mut tree = OccupancyOctree::new(0.1);
        let p = Vec3::new(0.25, 0.25, 0.25);
        tree.insert_point(p);
        tree.mark_free(p);
        tree.mark_free(p);
        tree.mark_free(p);
        let node = tree.search(&key_of(&tree, 0.25, 0.25, 0.25)).expect("observed");
        assert!(!tree.is_occupied(&node));
    }

    #[test]
    fn log_odds_are_clamped() {
        let mut tree = OccupancyOctree::new(0.1);
        let p = Vec3::new(0.25, 0.25, 0.25);
        for _ in 0..20 {
            tree.insert_point(p);
        }
        let node = tree.search(&key_of(&tree, 0.25, 0.25, 0.25)).expect("observed");
        assert!((node.log_odds - LOG_ODDS_MAX).abs() < 1e-6);
    }

    // ── occupied_points / merge ─────────────────────────────────────────────

    #[test]
    fn occupied_points_returns_cell_centres() {
        let mut tree = OccupancyOctree::new(0.1);
        tree.insert_point(Vec3::new(0.12, 0.18, -0.51));
        tree.insert_point(Vec3::new(-0.75, 0.35, 0.95));
        tree.mark_free(Vec3::new(1.05, 1.05, 1.05));

        let points = tree.occupied_points();
        assert_eq!(points.len(), 2);
        assert!(points.iter().any(|p| {
            (p.x - 0.15).abs() < 1e-9 && (p.y - 0.15).abs() < 1e-9 && (p.z + 0.55).abs() < 1e-9
        }));
    }

    #[test]
    fn merge_fuses_peer_map() {
        let mut robot_a = OccupancyOctree::new(0.1);
        robot_a.insert_point(Vec3::new(1.05, 1.05, 1.05));
        robot_a.insert_point(Vec3::new(2.05, 2.05, 2.05));

        let mut robot_b = OccupancyOctree::new(0.1);
        robot_b.insert_point(Vec3::new(8.05, 8.05, 8.05));
        robot_b.merge(&robot_a.occupied_points());

        assert_eq!(robot_b.len(), 3);
        assert_eq!(robot_b.occupied_points().len(), 3);
    }

    #[test]
    fn child_index_uses_one_bit_per_axis() {
        let key = CellKey::new(0x8000, 0x0000, 0x8000);
        assert_eq!(child_index(&key, 0), 0b101);
        assert_eq!(child_index(&key, 1), 0);
    }
}
