//! [`CostGraphBuilder`] – reward table → adjacency map.
//!
//! Every rewarded cell is connected to at most one neighbour in each of the
//! four cardinal planar directions: the nearest cell at 1..=`max_radius`
//! cells along that direction (same key on the orthogonal axis). The edge
//! cost is the neighbour's negated reward, so that minimizing graph search
//! prefers high-reward terrain.
//!
//! # Example
//!
//! ```
//! use foothold_planning::cost_map::CostGraphBuilder;
//! use foothold_types::{Cell, CellKey, Vec3, VertexId};
//!
//! let cell = |x: u16, y: u16, reward: f64| Cell {
//!     key: CellKey::new(x, y, 0),
//!     vertex: VertexId(u64::from(y) << 16 | u64::from(x)),
//!     reward,
//!     position: Vec3::zero(),
//! };
//! let cells = [cell(10, 10, -1.0), cell(11, 10, -2.0)];
//!
//! let mut builder = CostGraphBuilder::new();
//! let graph = builder.build(&cells);
//! let edges = &graph[&cells[0].vertex];
//! assert_eq!(edges.len(), 1);
//! assert_eq!(edges[0].cost, 2.0);
//! ```

use std::collections::HashMap;

use foothold_types::{AdjacencyMap, Cell, Edge, PlanarKey, RewardTable, VertexId};
use tracing::debug;

/// Farthest neighbour distance (in cells) scanned per direction.
pub const DEFAULT_SEARCH_RADIUS: u16 = 3;

/// Cardinal planar directions, in the order their edges are emitted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    PositiveX,
    NegativeX,
    PositiveY,
    NegativeY,
}

impl Direction {
    pub const ALL: [Direction; 4] = [
        Direction::PositiveX,
        Direction::NegativeX,
        Direction::PositiveY,
        Direction::NegativeY,
    ];

    /// Unit planar step `(dx, dy)`.
    pub fn step(self) -> (i32, i32) {
        match self {
            Direction::PositiveX => (1, 0),
            Direction::NegativeX => (-1, 0),
            Direction::PositiveY => (0, 1),
            Direction::NegativeY => (0, -1),
        }
    }
}

/// Builds the directed, weighted adjacency map used by the path planner.
#[derive(Debug, Clone)]
pub struct CostGraphBuilder {
    max_radius: u16,
    adjacency: AdjacencyMap,
}

impl Default for CostGraphBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl CostGraphBuilder {
    /// Builder scanning up to [`DEFAULT_SEARCH_RADIUS`] cells per direction.
    pub fn new() -> Self {
        Self::with_radius(DEFAULT_SEARCH_RADIUS)
    }

    /// Builder scanning up to `max_radius` cells per direction (at least 1).
    pub fn with_radius(max_radius: u16) -> Self {
        Self {
            max_radius: max_radius.max(1),
            adjacency: AdjacencyMap::new(),
        }
    }

    pub fn max_radius(&self) -> u16 {
        self.max_radius
    }

    /// Rebuild the adjacency map from `cells`, discarding the previous one.
    ///
    /// Every cell gets an entry, possibly with no edges. When two cells share
    /// a column the later one wins.
    pub fn build<'a>(&mut self, cells: impl IntoIterator<Item = &'a Cell>) -> &AdjacencyMap {
        let cells: Vec<&Cell> = cells.into_iter().collect();
        let by_column: HashMap<PlanarKey, &Cell> =
            cells.iter().map(|&cell| (cell.key.planar(), cell)).collect();

        self.adjacency.clear();
        for cell in &cells {
            let edges = self.neighbours(cell, &by_column);
            self.adjacency.insert(cell.vertex, edges);
        }
        debug!(
            vertices = self.adjacency.len(),
            edges = self.edge_count(),
            "cost graph rebuilt"
        );
        &self.adjacency
    }

    /// Rebuild from a reward table.
    pub fn build_from_table(&mut self, table: &RewardTable) -> &AdjacencyMap {
        self.build(table.values())
    }

    /// Nearest neighbour per direction within the scan radius.
    fn neighbours(&self, cell: &Cell, by_column: &HashMap<PlanarKey, &Cell>) -> Vec<Edge> {
        let origin = cell.key.planar();
        Direction::ALL
            .iter()
            .filter_map(|direction| {
                let (dx, dy) = direction.step();
                (1..=i32::from(self.max_radius)).find_map(|r| {
                    let key = origin.offset(dx * r, dy * r)?;
                    by_column.get(&key).map(|n| Edge::new(n.vertex, -n.reward))
                })
            })
            .collect()
    }

    pub fn adjacency(&self) -> &AdjacencyMap {
        &self.adjacency
    }

    pub fn into_adjacency(self) -> AdjacencyMap {
        self.adjacency
    }

    /// Outgoing edges of `vertex` (empty when unknown).
    pub fn edges(&self, vertex: VertexId) -> &[Edge] {
        self.adjacency.get(&vertex).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn vertex_count(&self) -> usize {
        self.adjacency.len()
    }

    pub fn edge_count(&self) -> usize {
        self.adjacency.values().map(Vec::len).sum()
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use foothold_types::{CellKey, Vec3};

    fn vertex(x: u16, y: u16) -> VertexId {
        VertexId(u64::from(y) << 16 | u64::from(x))
    }

    fn cell(x: u16, y: u16, reward: f64) -> Cell {
        Cell {
            key: CellKey::new(x, y, 32760),
            vertex: vertex(x, y),
            reward,
            position: Vec3::zero(),
        }
    }

    #[test]
    fn four_cardinal_neighbours() {
        let cells = [
            cell(1000, 1000, -1.5),
            cell(1001, 1000, -2.0),
            cell(999, 1000, -3.0),
            cell(1000, 1001, -4.0),
            cell(1000, 999, -5.0),
        ];
        let mut builder = CostGraphBuilder::new();
        builder.build(&cells);

        let edges = builder.edges(vertex(1000, 1000));
        assert_eq!(
            edges,
            &[
                Edge::new(vertex(1001, 1000), 2.0),
                Edge::new(vertex(999, 1000), 3.0),
                Edge::new(vertex(1000, 1001), 4.0),
                Edge::new(vertex(1000, 999), 5.0),
            ]
        );
        // The arms only see the centre back (diagonals are not neighbours).
        assert_eq!(builder.edges(vertex(1001, 1000)), &[Edge::new(vertex(1000, 1000), 1.5)]);
        assert_eq!(builder.vertex_count(), 5);
        assert_eq!(builder.edge_count(), 8);
    }

    #[test]
    fn nearest_radius_wins() {
        let cells = [
            cell(50, 50, 0.0),
            cell(53, 50, -3.0),
            cell(52, 50, -2.0),
        ];
        let mut builder = CostGraphBuilder::new();
        builder.build(&cells);
        assert_eq!(builder.edges(vertex(50, 50)), &[Edge::new(vertex(52, 50), 2.0)]);
    }

    #[test]
    fn nothing_beyond_scan_radius() {
        let cells = [cell(50, 50, 0.0), cell(54, 50, -1.0), cell(50, 46, -1.0)];
        let mut builder = CostGraphBuilder::new();
        builder.build(&cells);
        assert!(builder.edges(vertex(50, 50)).is_empty());
        assert!(builder.adjacency().contains_key(&vertex(50, 50)));

        let mut wide = CostGraphBuilder::with_radius(4);
        wide.build(&cells);
        assert_eq!(wide.edges(vertex(50, 50)).len(), 2);
    }

    #[test]
    fn orthogonal_axis_must_match() {
        let cells = [cell(50, 50, 0.0), cell(51, 51, -1.0), cell(52, 49, -1.0)];
        let mut builder = CostGraphBuilder::new();
        builder.build(&cells);
        assert!(builder.edges(vertex(50, 50)).is_empty());
    }

    #[test]
    fn edge_cost_is_negated_target_reward() {
        let mut cells = Vec::new();
        for x in 10..16u16 {
            for y in 10..16u16 {
                if (x + y) % 3 != 0 {
                    cells.push(cell(x, y, -f64::from(x * 7 + y) / 10.0));
                }
            }
        }
        let rewards: HashMap<VertexId, f64> = cells.iter().map(|c| (c.vertex, c.reward)).collect();
        let mut builder = CostGraphBuilder::new();
        let graph = builder.build(&cells);
        for edges in graph.values() {
            assert!(edges.len() <= 4);
            for edge in edges {
                assert_eq!(edge.cost, -rewards[&edge.target]);
            }
        }
    }

    #[test]
    fn at_most_one_edge_per_direction_and_no_self_loops() {
        let cells: Vec<Cell> = (0..7u16).map(|x| cell(100 + x, 100, -1.0)).collect();
        let mut builder = CostGraphBuilder::new();
        builder.build(&cells);
        for (source, edges) in builder.adjacency() {
            assert!(edges.iter().all(|e| e.target != *source));
            let mut targets: Vec<_> = edges.iter().map(|e| e.target).collect();
            targets.dedup();
            assert_eq!(targets.len(), edges.len());
        }
        assert_eq!(builder.edges(vertex(103, 100)).len(), 2);
        assert_eq!(builder.edges(vertex(100, 100)).len(), 1);
    }

    #[test]
    fn keys_at_span_edge_do_not_overflow() {
        let cells = [cell(0, 0, -1.0), cell(u16::MAX, u16::MAX, -1.0)];
        let mut builder = CostGraphBuilder::new();
        builder.build(&cells);
        assert_eq!(builder.edge_count(), 0);
        assert_eq!(builder.vertex_count(), 2);
    }

    #[test]
    fn rebuild_discards_previous_graph() {
        let mut builder = CostGraphBuilder::new();
        builder.build(&[cell(1, 1, -1.0), cell(2, 1, -1.0)]);
        assert_eq!(builder.vertex_count(), 2);
        builder.build(&[cell(7, 7, -1.0)]);
        assert_eq!(builder.vertex_count(), 1);
        assert!(builder.edges(vertex(1, 1)).is_empty());
    }

    #[test]
    fn build_from_reward_table() {
        let mut table = RewardTable::new();
        for c in [cell(5, 5, -1.0), cell(5, 6, -2.0)] {
            table.insert(c.vertex, c);
        }
        let mut builder = CostGraphBuilder::new();
        let graph = builder.build_from_table(&table);
        assert_eq!(graph[&vertex(5, 5)], vec![Edge::new(vertex(5, 6), 2.0)]);
    }

    #[test]
    fn empty_input_gives_empty_graph() {
        let mut builder = CostGraphBuilder::new();
        assert!(builder.build(&Vec::<Cell>::new()).is_empty());
    }
}
