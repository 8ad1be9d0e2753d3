//! [`RewardMap`] – session state of terrain evaluation, and the
//! [`RewardBackend`] contract concrete evaluators implement.
//!
//! A `RewardMap` owns the configuration (search areas, neighbouring window,
//! registered features, position mode) and the two tables that persist
//! across planning cycles:
//!
//! - the **height table**: column → last discovered terrain height;
//! - the **reward table**: column → rewarded [`Cell`].
//!
//! A backend's cycle is driven by [`RewardBackend::compute`]: install the
//! default area if none was registered, discover surface heights, evaluate
//! rewards for new or changed columns, then evict every column outside the
//! interest region of the current pose.

use foothold_perception::SpatialIndex;
use foothold_perception::transform::to_heading_frame;
use foothold_types::{
    Cell, CellKey, CycleWarning, FootholdError, HeightTable, NeighboringWindow, RewardTable,
    RobotPose, SearchArea, VertexId,
};
use tracing::{debug, warn};

use crate::feature::TerrainFeature;
use crate::grid::GridIndex;

/// Largest accepted difference between grid and index resolutions (metres).
const RESOLUTION_TOLERANCE: f64 = 1e-9;

// ────────────────────────────────────────────────────────────────────────────
// Cycle bookkeeping
// ────────────────────────────────────────────────────────────────────────────

/// Outcome of recording a discovered surface height for a column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnUpdate {
    /// The column was unknown.
    New,
    /// The column's height key moved; its stale entries were removed.
    Changed,
    /// Same height key as before; nothing to do.
    Unchanged,
}

/// Counters and warnings of one planning cycle.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CycleReport {
    /// Planar samples queried against the index.
    pub samples: usize,
    /// Samples whose descent reached an occupied cell.
    pub surface_hits: usize,
    /// Columns that were new or changed height.
    pub updated_columns: usize,
    /// Cells whose reward was (re)computed.
    pub evaluated: usize,
    /// Evaluated cells lacking a plane fit (fewer than three samples).
    pub degraded: usize,
    /// Columns evicted from the tables.
    pub pruned: usize,
    pub warnings: Vec<CycleWarning>,
}

impl CycleReport {
    /// True when the cycle raised `warning`.
    pub fn has_warning(&self, warning: CycleWarning) -> bool {
        self.warnings.contains(&warning)
    }
}

// ────────────────────────────────────────────────────────────────────────────
// RewardMap
// ────────────────────────────────────────────────────────────────────────────

/// Configuration and persistent tables of one planning session.
///
/// # Example
///
/// ```
/// use foothold_environment::reward_map::RewardMap;
/// use foothold_environment::feature::SlopeFeature;
/// use foothold_types::{NeighboringWindow, SearchArea};
///
/// let mut map = RewardMap::new(0.04).unwrap();
/// map.add_search_area(SearchArea::default()).unwrap();
/// map.set_neighboring_window(NeighboringWindow::new(-2, 2, -2, 2, -1, 1));
/// map.add_feature(Box::new(SlopeFeature::new(1.0, 0.17, 0.78)));
///
/// assert_eq!(map.search_areas().len(), 1);
/// assert!(map.reward_table().is_empty());
/// ```
pub struct RewardMap {
    grid: GridIndex,
    search_areas: Vec<SearchArea>,
    neighboring_window: NeighboringWindow,
    features: Vec<Box<dyn TerrainFeature>>,
    height_table: HeightTable,
    reward_table: RewardTable,
    first_pass: bool,
    cloud_mean: bool,
}

impl std::fmt::Debug for RewardMap {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RewardMap")
            .field("grid", &self.grid)
            .field("search_areas", &self.search_areas)
            .field("neighboring_window", &self.neighboring_window)
            .field(
                "features",
                &self.features.iter().map(|f| f.name()).collect::<Vec<_>>(),
            )
            .field("columns", &self.height_table.len())
            .field("cells", &self.reward_table.len())
            .field("first_pass", &self.first_pass)
            .field("cloud_mean", &self.cloud_mean)
            .finish()
    }
}

impl RewardMap {
    /// Create an empty map over an environment grid of `resolution` metres.
    pub fn new(resolution: f64) -> Result<Self, FootholdError> {
        Ok(Self::with_grid(GridIndex::new(resolution)?))
    }

    pub fn with_grid(grid: GridIndex) -> Self {
        Self {
            grid,
            search_areas: Vec::new(),
            neighboring_window: NeighboringWindow::default(),
            features: Vec::new(),
            height_table: HeightTable::new(),
            reward_table: RewardTable::new(),
            first_pass: true,
            cloud_mean: false,
        }
    }

    // ── Configuration ───────────────────────────────────────────────────────

    /// Register a search area. Areas are evaluated in registration order.
    ///
    /// Rejects areas with a non-positive sampling resolution or inverted
    /// bounds.
    pub fn add_search_area(&mut self, area: SearchArea) -> Result<(), FootholdError> {
        if !area.resolution.is_finite() || area.resolution <= 0.0 {
            return Err(FootholdError::Config(format!(
                "search area resolution must be positive, got {}",
                area.resolution
            )));
        }
        if area.min_x > area.max_x || area.min_y > area.max_y || area.min_z > area.max_z {
            return Err(FootholdError::Config(format!(
                "search area bounds are inverted: {area:?}"
            )));
        }
        self.search_areas.push(area);
        Ok(())
    }

    pub fn set_neighboring_window(&mut self, window: NeighboringWindow) {
        self.neighboring_window = window;
    }

    /// Register a feature. Features are accumulated in registration order.
    pub fn add_feature(&mut self, feature: Box<dyn TerrainFeature>) {
        debug!(feature = feature.name(), weight = feature.weight(), "terrain feature registered");
        self.features.push(feature);
    }

    /// Report the neighbour-cloud centroid instead of the raw query point as
    /// a cell's position.
    pub fn set_cloud_mean(&mut self, enabled: bool) {
        self.cloud_mean = enabled;
    }

    // ── Accessors ───────────────────────────────────────────────────────────

    pub fn grid(&self) -> &GridIndex {
        &self.grid
    }

    pub fn search_areas(&self) -> &[SearchArea] {
        &self.search_areas
    }

    pub fn neighboring_window(&self) -> &NeighboringWindow {
        &self.neighboring_window
    }

    pub fn features(&self) -> &[Box<dyn TerrainFeature>] {
        &self.features
    }

    pub fn height_table(&self) -> &HeightTable {
        &self.height_table
    }

    pub fn reward_table(&self) -> &RewardTable {
        &self.reward_table
    }

    pub fn is_first_pass(&self) -> bool {
        self.first_pass
    }

    pub fn uses_cloud_mean(&self) -> bool {
        self.cloud_mean
    }

    /// Rewarded cell of a column.
    pub fn cell(&self, column: VertexId) -> Option<&Cell> {
        self.reward_table.get(&column)
    }

    /// Rewarded cell whose column contains `key`.
    pub fn cell_at(&self, key: &CellKey) -> Option<&Cell> {
        self.cell(self.grid.planar_vertex(&key.planar()))
    }

    /// Snapshot of all rewarded cells, ordered by column id.
    pub fn cells(&self) -> Vec<Cell> {
        self.reward_table.values().copied().collect()
    }

    // ── Cycle steps shared by every backend ─────────────────────────────────

    /// Reject an index whose cells differ in size from the environment grid.
    ///
    /// Surface cells are re-addressed through the grid; with mismatched
    /// sizes the same pose would discover different columns on every pass.
    pub fn check_index(&self, index: &dyn SpatialIndex) -> Result<(), FootholdError> {
        let (grid, cells) = (self.grid.resolution(), index.resolution());
        if (grid - cells).abs() > RESOLUTION_TOLERANCE {
            warn!(grid, index = cells, "spatial index resolution does not match the grid");
            return Err(FootholdError::Config(format!(
                "spatial index resolution {cells} does not match grid resolution {grid}"
            )));
        }
        Ok(())
    }

    /// Install the default search area when none is registered.
    pub fn ensure_search_area(&mut self) -> Option<CycleWarning> {
        if !self.search_areas.is_empty() {
            return None;
        }
        warn!("no search area registered; adding the default search area");
        self.search_areas.push(SearchArea::default());
        Some(CycleWarning::NoSearchArea)
    }

    /// Record the surface height discovered for the column of `key`.
    ///
    /// When the height key differs from the stored one, the column's reward
    /// and height entries are removed before the new height is stored.
    pub fn record_height(&mut self, key: &CellKey, height: f64) -> ColumnUpdate {
        let column = self.grid.planar_vertex(&key.planar());
        let update = match self.height_table.get(&column) {
            Some(&known) if self.grid.axis_key(known) == Some(key.z) => return ColumnUpdate::Unchanged,
            Some(_) => ColumnUpdate::Changed,
            None => ColumnUpdate::New,
        };
        self.remove_column(column);
        self.height_table.insert(column, height);
        update
    }

    /// True when the column has no reward yet, or its reward was computed
    /// at a different height than the one now stored.
    pub fn needs_evaluation(&self, column: VertexId) -> bool {
        let Some(&height) = self.height_table.get(&column) else {
            return false;
        };
        match self.reward_table.get(&column) {
            Some(cell) => self.grid.axis_key(height) != Some(cell.key.z),
            None => true,
        }
    }

    /// Store a rewarded cell under its column.
    pub fn insert_cell(&mut self, cell: Cell) {
        self.reward_table.insert(cell.vertex, cell);
    }

    /// Drop both table entries of a column. Returns `true` when anything
    /// was removed.
    pub fn remove_column(&mut self, column: VertexId) -> bool {
        let had_reward = self.reward_table.remove(&column).is_some();
        let had_height = self.height_table.remove(&column).is_some();
        had_reward || had_height
    }

    pub(crate) fn finish_first_pass(&mut self) {
        self.first_pass = false;
    }

    /// True when the grid cell centred at world point `(x, y)` overlaps any
    /// search area placed at `pose`. Areas are heading-aligned; a column is
    /// kept while any part of its cell lies inside one of them.
    pub fn in_interest_region(&self, pose: &RobotPose, x: f64, y: f64) -> bool {
        let (local_x, local_y) = to_heading_frame(pose, x, y);
        let half = self.grid.resolution() / 2.0;
        self.search_areas
            .iter()
            .any(|area| area.overlaps_cell(local_x, local_y, half, pose.yaw))
    }

    /// Evict every column outside the interest region of `pose`. Returns the
    /// number of evicted columns.
    pub fn prune_outside_interest_region(&mut self, pose: &RobotPose) -> usize {
        let mut doomed: Vec<VertexId> = self
            .height_table
            .keys()
            .chain(self.reward_table.keys())
            .copied()
            .filter(|&column| {
                let (x, y) = self.grid.planar_position(column);
                !self.in_interest_region(pose, x, y)
            })
            .collect();
        doomed.sort_unstable();
        doomed.dedup();
        for &column in &doomed {
            self.remove_column(column);
        }
        if !doomed.is_empty() {
            debug!(evicted = doomed.len(), "columns evicted outside interest region");
        }
        doomed.len()
    }

    /// Forget all discovered heights and rewards; configuration is kept and
    /// the next cycle is a first pass again.
    pub fn clear(&mut self) {
        self.height_table.clear();
        self.reward_table.clear();
        self.first_pass = true;
    }
}

// ────────────────────────────────────────────────────────────────────────────
// RewardBackend
// ────────────────────────────────────────────────────────────────────────────

/// A spatial backend that fills a [`RewardMap`] from a [`SpatialIndex`].
///
/// Implementors supply height discovery and reward evaluation; the cycle
/// ordering, default-area handling and eviction are shared through the
/// provided [`compute`][Self::compute].
pub trait RewardBackend {
    fn reward_map(&self) -> &RewardMap;

    fn reward_map_mut(&mut self) -> &mut RewardMap;

    /// Find the surface height of every sample of every search area and
    /// record it in the height table.
    fn discover_heights(
        &mut self,
        index: &dyn SpatialIndex,
        pose: &RobotPose,
        report: &mut CycleReport,
    ) -> Result<(), FootholdError>;

    /// Compute rewards for the columns that need them.
    fn evaluate_rewards(&mut self, index: &dyn SpatialIndex, report: &mut CycleReport);

    /// Run one planning cycle against `index` at `pose`.
    ///
    /// Returns [`FootholdError::Config`] before touching the tables when the
    /// index resolution differs from the grid's, and
    /// [`FootholdError::OutOfBounds`] when a sample could not be
    /// addressed in the index; the remaining samples of the cycle are then
    /// skipped and the tables keep whatever was already updated.
    fn compute(
        &mut self,
        index: &dyn SpatialIndex,
        pose: &RobotPose,
    ) -> Result<CycleReport, FootholdError> {
        self.reward_map().check_index(index)?;
        let mut report = CycleReport::default();
        if let Some(warning) = self.reward_map_mut().ensure_search_area() {
            report.warnings.push(warning);
        }
        self.discover_heights(index, pose, &mut report)?;
        self.evaluate_rewards(index, &mut report);
        report.pruned = self.reward_map_mut().prune_outside_interest_region(pose);
        Ok(report)
    }
}
