//! [`SpatialTerrainEvaluator`] – reward backend over a 3-D occupancy index.
//!
//! Per cycle:
//!
//! 1. Every search area is placed at the robot position and rasterized at
//!    its planar resolution; each sample is rotated by the robot yaw about
//!    the robot position, so the area stays aligned with the heading.
//! 2. From the area's top, the evaluator descends one index cell at a time
//!    until it meets an occupied cell (the terrain surface) or passes the
//!    area's bottom. A sample whose start point cannot be addressed in the
//!    index aborts the cycle with [`FootholdError::OutOfBounds`].
//! 3. Discovered heights are recorded in the height table; new or moved
//!    columns lose their stale reward.
//! 4. Columns without an up-to-date reward gather the occupied cells of the
//!    neighbouring window around their surface cell, fit a local plane and
//!    score the resulting [`TerrainDescriptor`] with the registered
//!    features.

use foothold_perception::transform::Heading;
use foothold_perception::{SpatialIndex, TREE_DEPTH};
use foothold_types::{
    Cell, CellKey, CycleWarning, FootholdError, RobotPose, SearchArea, TerrainDescriptor, Vec3,
    VertexId,
};
use tracing::{debug, warn};

use crate::feature::weighted_reward;
use crate::reward_map::{ColumnUpdate, CycleReport, RewardBackend, RewardMap};
use crate::surface::{MIN_PLANE_SAMPLES, PlaneFit, fit_plane};

/// Local surface around one surface cell.
#[derive(Debug, Clone, PartialEq)]
pub struct SurfaceSample {
    /// Centre of the surface cell itself.
    pub query: Vec3,
    /// Surface cell plus every occupied neighbour in the window.
    pub cloud: Vec<Vec3>,
    /// `None` with fewer than three cloud points or a degenerate cloud.
    pub plane: Option<PlaneFit>,
}

/// Reward backend reading any [`SpatialIndex`].
///
/// # Example
///
/// ```
/// use foothold_environment::feature::SlopeFeature;
/// use foothold_environment::reward_map::RewardBackend;
/// use foothold_environment::terrain_evaluator::SpatialTerrainEvaluator;
/// use foothold_perception::OccupancyOctree;
/// use foothold_types::{RobotPose, SearchArea, Vec3};
///
/// let mut octree = OccupancyOctree::new(0.1);
/// for i in -5..30 {
///     for j in -10..10 {
///         octree.insert_point(Vec3::new(i as f64 * 0.1 + 0.05, j as f64 * 0.1 + 0.05, -0.55));
///     }
/// }
///
/// let mut evaluator = SpatialTerrainEvaluator::new(0.1).unwrap();
/// let map = evaluator.reward_map_mut();
/// map.add_search_area(SearchArea::new(0.5, 1.5, -0.5, 0.5, -0.8, -0.3, 0.1)).unwrap();
/// map.add_feature(Box::new(SlopeFeature::new(1.0, 0.1, 0.8)));
///
/// let report = evaluator.compute(&octree, &RobotPose::new(0.05, 0.05, 0.0, 0.0)).unwrap();
/// assert_eq!(report.samples, 100);
/// assert_eq!(evaluator.reward_map().reward_table().len(), 100);
/// ```
#[derive(Debug)]
pub struct SpatialTerrainEvaluator {
    map: RewardMap,
}

impl SpatialTerrainEvaluator {
    /// Evaluator over an empty [`RewardMap`] at `resolution` metres.
    pub fn new(resolution: f64) -> Result<Self, FootholdError> {
        Ok(Self::from_map(RewardMap::new(resolution)?))
    }

    pub fn from_map(map: RewardMap) -> Self {
        Self { map }
    }

    pub fn into_map(self) -> RewardMap {
        self.map
    }

    /// Walk down from `start` until an occupied cell is met or the cell
    /// centre falls below `bottom`. Returns the surface cell centre.
    fn find_surface(index: &dyn SpatialIndex, start: CellKey, bottom: f64) -> Option<Vec3> {
        let mut key = start;
        loop {
            let centre = index.key_to_coord(&key);
            if centre.z < bottom {
                return None;
            }
            if index
                .search(&key)
                .is_some_and(|node| index.is_occupied(&node))
            {
                return Some(centre);
            }
            key = key.offset(0, 0, -1)?;
        }
    }

    /// Discover the surface under every sample of `area` at `pose`.
    fn scan_area(
        &mut self,
        index: &dyn SpatialIndex,
        pose: &RobotPose,
        area: &SearchArea,
        report: &mut CycleReport,
    ) -> Result<(), FootholdError> {
        let heading = Heading::of(pose);
        let top = pose.z + area.max_z;
        let bottom = pose.z + area.min_z;

        for y in raster(pose.y + area.min_y, pose.y + area.max_y, area.resolution) {
            for x in raster(pose.x + area.min_x, pose.x + area.max_x, area.resolution) {
                report.samples += 1;
                let (xr, yr) = heading.rotate_about((x, y), (pose.x, pose.y));
                let query = Vec3::new(xr, yr, top);
                let Some(start) = index.coord_to_key_checked(query, TREE_DEPTH) else {
                    warn!(x = xr, y = yr, z = top, "sample outside spatial index bounds; aborting cycle");
                    return Err(FootholdError::OutOfBounds {
                        x: xr,
                        y: yr,
                        z: top,
                    });
                };
                let Some(surface) = Self::find_surface(index, start, bottom) else {
                    continue;
                };
                report.surface_hits += 1;

                let key = self.map.grid().to_key(surface)?;
                if self.map.record_height(&key, surface.z) != ColumnUpdate::Unchanged {
                    report.updated_columns += 1;
                }
            }
        }
        Ok(())
    }

    /// Gather the occupied cells of the neighbouring window around `key`
    /// and fit a plane when enough of them exist.
    pub fn sample_surface(&self, index: &dyn SpatialIndex, key: &CellKey) -> SurfaceSample {
        let query = index.key_to_coord(key);
        let mut cloud = vec![query];
        cloud.extend(
            self.map
                .neighboring_window()
                .offsets()
                .filter_map(|(dx, dy, dz)| key.offset(dx, dy, dz))
                .filter(|neighbor| {
                    index
                        .search(neighbor)
                        .is_some_and(|node| index.is_occupied(&node))
                })
                .map(|neighbor| index.key_to_coord(&neighbor)),
        );
        let plane = if cloud.len() >= MIN_PLANE_SAMPLES {
            fit_plane(&cloud)
        } else {
            None
        };
        SurfaceSample { query, cloud, plane }
    }

    /// Compute and store the reward of one column at `height`.
    ///
    /// Returns `false` when the column's surface cell cannot be addressed.
    fn evaluate_column(
        &mut self,
        index: &dyn SpatialIndex,
        column: VertexId,
        height: f64,
        report: &mut CycleReport,
    ) -> bool {
        let grid = *self.map.grid();
        let (x, y) = grid.planar_position(column);
        let (Some(index_key), Some(height_key)) = (
            index.coord_to_key_checked(Vec3::new(x, y, height), TREE_DEPTH),
            grid.axis_key(height),
        ) else {
            debug!(%column, x, y, height, "column surface not addressable; skipped");
            return false;
        };

        let sample = self.sample_surface(index, &index_key);
        if sample.plane.is_none() {
            report.degraded += 1;
            debug!(%column, samples = sample.cloud.len(), "insufficient neighbours for a plane fit");
        }
        let position = match sample.plane {
            Some(plane) if self.map.uses_cloud_mean() => plane.centroid,
            _ => sample.query,
        };

        let planar = grid.vertex_to_planar_key(column);
        let reward = {
            let descriptor = TerrainDescriptor {
                position,
                column: planar,
                normal: sample.plane.map(|p| p.normal),
                curvature: sample.plane.map(|p| p.curvature),
                height_table: self.map.height_table(),
                resolution: grid.resolution(),
            };
            weighted_reward(self.map.features(), &descriptor)
        };

        self.map.insert_cell(Cell {
            key: CellKey::new(planar.x, planar.y, height_key),
            vertex: column,
            reward,
            position,
        });
        report.evaluated += 1;
        true
    }
}

impl RewardBackend for SpatialTerrainEvaluator {
    fn reward_map(&self) -> &RewardMap {
        &self.map
    }

    fn reward_map_mut(&mut self) -> &mut RewardMap {
        &mut self.map
    }

    fn discover_heights(
        &mut self,
        index: &dyn SpatialIndex,
        pose: &RobotPose,
        report: &mut CycleReport,
    ) -> Result<(), FootholdError> {
        let areas = self.map.search_areas().to_vec();
        for area in &areas {
            self.scan_area(index, pose, area, report)?;
        }
        debug!(
            samples = report.samples,
            hits = report.surface_hits,
            updated = report.updated_columns,
            "height discovery finished"
        );
        Ok(())
    }

    fn evaluate_rewards(&mut self, index: &dyn SpatialIndex, report: &mut CycleReport) {
        if self.map.features().is_empty() {
            warn!("no terrain features registered; skipping reward assignment");
            report.warnings.push(CycleWarning::NoFeatures);
            return;
        }

        let first_pass = self.map.is_first_pass();
        let pending: Vec<(VertexId, f64)> = self
            .map
            .height_table()
            .iter()
            .filter(|&(&column, _)| first_pass || self.map.needs_evaluation(column))
            .map(|(&column, &height)| (column, height))
            .collect();
        if first_pass {
            debug!(columns = pending.len(), "first pass: evaluating every discovered column");
        }

        for (column, height) in pending {
            self.evaluate_column(index, column, height, report);
        }
        self.map.finish_first_pass();
    }
}

/// Sample coordinates `min, min + step, …` strictly below `max`.
fn raster(min: f64, max: f64, step: f64) -> impl Iterator<Item = f64> {
    let span = max - min;
    let count = if span > 0.0 && step > 0.0 {
        // Guard against `span / step` landing a hair above an integer.
        (span / step - 1e-9).ceil().max(0.0) as usize
    } else {
        0
    };
    (0..count).map(move |i| min + i as f64 * step)
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────
