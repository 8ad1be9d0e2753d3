//! [`PlanningSession`] – one robot's terrain evaluation state.
//!
//! A session owns the reward map (height and reward tables plus their
//! configuration) and the cost graph derived from it. Each
//! [`cycle`][PlanningSession::cycle] refreshes the tables around the
//! current pose and rebuilds the graph the planner searches.
//!
//! # Example
//!
//! ```
//! use foothold_perception::OccupancyOctree;
//! use foothold_runtime::{PlanningSession, config::TerrainConfig};
//! use foothold_types::{RobotPose, SearchArea, Vec3};
//!
//! let mut octree = OccupancyOctree::new(0.1);
//! for i in 0..30 {
//!     for j in -10..10 {
//!         octree.insert_point(Vec3::new(i as f64 * 0.1 + 0.05, j as f64 * 0.1 + 0.05, -0.55));
//!     }
//! }
//!
//! let config = TerrainConfig {
//!     resolution: 0.1,
//!     search_areas: vec![SearchArea::new(0.5, 1.5, -0.5, 0.5, -0.8, -0.3, 0.1)],
//!     ..TerrainConfig::default()
//! };
//! let mut session = PlanningSession::new(&config).unwrap();
//! let summary = session.cycle(&octree, &RobotPose::new(0.05, 0.05, 0.0, 0.0)).unwrap();
//! assert_eq!(summary.vertices, 100);
//! ```

use foothold_environment::{CycleReport, RewardBackend, RewardMap, SpatialTerrainEvaluator};
use foothold_perception::SpatialIndex;
use foothold_planning::CostGraphBuilder;
use foothold_types::{AdjacencyMap, Cell, FootholdError, RobotPose};
use tracing::{info, instrument};

use crate::config::TerrainConfig;

/// Result of one successful planning cycle.
#[derive(Debug, Clone, PartialEq)]
pub struct CycleSummary {
    /// 1-based cycle number within the session.
    pub cycle: u64,
    pub report: CycleReport,
    /// Vertices of the rebuilt cost graph.
    pub vertices: usize,
    /// Directed edges of the rebuilt cost graph.
    pub edges: usize,
}

#[derive(Debug)]
pub struct PlanningSession {
    evaluator: SpatialTerrainEvaluator,
    graph: CostGraphBuilder,
    cycles: u64,
}

impl PlanningSession {
    /// Create a session with empty tables configured from `config`.
    pub fn new(config: &TerrainConfig) -> Result<Self, FootholdError> {
        Ok(Self::from_parts(
            config.build_evaluator()?,
            config.build_graph_builder(),
        ))
    }

    pub fn from_parts(evaluator: SpatialTerrainEvaluator, graph: CostGraphBuilder) -> Self {
        Self {
            evaluator,
            graph,
            cycles: 0,
        }
    }

    /// Run one planning cycle: update the reward map around `pose` and
    /// rebuild the cost graph.
    ///
    /// On error the tables keep the updates made before the failure and
    /// the previous graph stays in place.
    #[instrument(
        name = "planning_cycle",
        skip_all,
        fields(cycle = self.cycles + 1, x = pose.x, y = pose.y, yaw = pose.yaw)
    )]
    pub fn cycle(
        &mut self,
        index: &dyn SpatialIndex,
        pose: &RobotPose,
    ) -> Result<CycleSummary, FootholdError> {
        self.cycles += 1;
        let report = self.evaluator.compute(index, pose)?;
        self.graph
            .build_from_table(self.evaluator.reward_map().reward_table());

        let summary = CycleSummary {
            cycle: self.cycles,
            report,
            vertices: self.graph.vertex_count(),
            edges: self.graph.edge_count(),
        };
        info!(
            evaluated = summary.report.evaluated,
            pruned = summary.report.pruned,
            degraded = summary.report.degraded,
            vertices = summary.vertices,
            edges = summary.edges,
            "planning cycle complete"
        );
        Ok(summary)
    }

    /// Forget all terrain knowledge; configuration is kept.
    pub fn reset(&mut self) {
        self.evaluator.reward_map_mut().clear();
        self.graph.build(std::iter::empty::<&Cell>());
        info!("planning session reset");
    }

    pub fn adjacency(&self) -> &AdjacencyMap {
        self.graph.adjacency()
    }

    pub fn graph(&self) -> &CostGraphBuilder {
        &self.graph
    }

    pub fn reward_map(&self) -> &RewardMap {
        self.evaluator.reward_map()
    }

    pub fn evaluator(&self) -> &SpatialTerrainEvaluator {
        &self.evaluator
    }

    /// Cycles attempted so far, failed ones included.
    pub fn cycles(&self) -> u64 {
        self.cycles
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
