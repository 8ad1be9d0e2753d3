//! [`TerrainFeature`] – pluggable terrain scoring.
//!
//! Each feature turns a [`TerrainDescriptor`] into a reward contribution
//! and carries a fixed weight. The reward of a cell is the weighted sum
//! over all registered features, accumulated in registration order
//! ([`weighted_reward`]).
//!
//! Three built-in features are provided. Their rewards lie in `[-1, 0]`,
//! `0` being ideal terrain:
//! - [`SlopeFeature`] – penalises inclination of the surface normal.
//! - [`CurvatureFeature`] – penalises rough, non-planar patches.
//! - [`HeightDeviationFeature`] – penalises steps relative to the
//!   surrounding columns of the height table.
//!
//! When a descriptor lacks the normal or curvature (too few neighbours for
//! a plane fit) the features relying on it score `0`.

use foothold_types::TerrainDescriptor;

use crate::grid::GridIndex;

// ────────────────────────────────────────────────────────────────────────────
// TerrainFeature trait
// ────────────────────────────────────────────────────────────────────────────

/// A single terrain scoring strategy.
///
/// Implement this trait to create custom features and register them with
/// [`RewardMap::add_feature`][crate::reward_map::RewardMap::add_feature].
pub trait TerrainFeature: Send + Sync {
    /// Human-readable name used in logs.
    fn name(&self) -> &str;

    /// Reward contribution of the described terrain (before weighting).
    fn compute_reward(&self, terrain: &TerrainDescriptor<'_>) -> f64;

    /// Weight applied to [`compute_reward`][Self::compute_reward].
    fn weight(&self) -> f64;
}

/// `Σ weight_i * reward_i` over `features`, in order.
pub fn weighted_reward(features: &[Box<dyn TerrainFeature>], terrain: &TerrainDescriptor<'_>) -> f64 {
    features
        .iter()
        .map(|f| f.weight() * f.compute_reward(terrain))
        .sum()
}

fn normalized_penalty(value: f64, start: f64, end: f64) -> f64 {
    if end <= start {
        return if value > start { -1.0 } else { 0.0 };
    }
    -((value - start) / (end - start)).clamp(0.0, 1.0)
}

// ────────────────────────────────────────────────────────────────────────────
// Built-in features
// ────────────────────────────────────────────────────────────────────────────

/// Penalises the angle between the surface normal and the vertical.
///
/// Slopes up to `flat_angle` score `0`; at `max_angle` and beyond they
/// score `-1`.
#[derive(Debug, Clone)]
pub struct SlopeFeature {
    pub weight: f64,
    /// Radians.
    pub flat_angle: f64,
    /// Radians.
    pub max_angle: f64,
}

impl SlopeFeature {
    pub fn new(weight: f64, flat_angle: f64, max_angle: f64) -> Self {
        Self {
            weight,
            flat_angle,
            max_angle,
        }
    }
}

impl TerrainFeature for SlopeFeature {
    fn name(&self) -> &str {
        "slope"
    }

    fn compute_reward(&self, terrain: &TerrainDescriptor<'_>) -> f64 {
        let Some(normal) = terrain.normal else {
            return 0.0;
        };
        let norm = normal.norm();
        if norm <= f64::EPSILON {
            return 0.0;
        }
        // The normal's sign is arbitrary.
        let slope = (normal.z.abs() / norm).clamp(0.0, 1.0).acos();
        normalized_penalty(slope, self.flat_angle, self.max_angle)
    }

    fn weight(&self) -> f64 {
        self.weight
    }
}

/// Penalises surface variation up to `max_curvature`.
#[derive(Debug, Clone)]
pub struct CurvatureFeature {
    pub weight: f64,
    pub max_curvature: f64,
}

impl CurvatureFeature {
    pub fn new(weight: f64, max_curvature: f64) -> Self {
        Self {
            weight,
            max_curvature,
        }
    }
}

impl TerrainFeature for CurvatureFeature {
    fn name(&self) -> &str {
        "curvature"
    }

    fn compute_reward(&self, terrain: &TerrainDescriptor<'_>) -> f64 {
        match terrain.curvature {
            Some(curvature) => normalized_penalty(curvature, 0.0, self.max_curvature),
            None => 0.0,
        }
    }

    fn weight(&self) -> f64 {
        self.weight
    }
}

/// Penalises the height difference between a column and the mean height of
/// the known columns within `radius_cells` around it.
#[derive(Debug, Clone)]
pub struct HeightDeviationFeature {
    pub weight: f64,
    pub radius_cells: u16,
    /// Deviation (metres) scoring `-1`.
    pub max_deviation: f64,
}

impl HeightDeviationFeature {
    pub fn new(weight: f64, radius_cells: u16, max_deviation: f64) -> Self {
        Self {
            weight,
            radius_cells,
            max_deviation,
        }
    }
}

impl TerrainFeature for HeightDeviationFeature {
    fn name(&self) -> &str {
        "height_deviation"
    }

    fn compute_reward(&self, terrain: &TerrainDescriptor<'_>) -> f64 {
        let Ok(grid) = GridIndex::new(terrain.resolution) else {
            return 0.0;
        };
        let centre = terrain.column;
        let r = i32::from(self.radius_cells);

        let (sum, count) = (-r..=r)
            .flat_map(|dy| (-r..=r).map(move |dx| (dx, dy)))
            .filter(|&offset| offset != (0, 0))
            .filter_map(|(dx, dy)| centre.offset(dx, dy))
            .filter_map(|key| terrain.height_table.get(&grid.planar_vertex(&key)))
            .fold((0.0, 0usize), |(sum, count), h| (sum + h, count + 1));
        if count == 0 {
            return 0.0;
        }
        let deviation = (terrain.position.z - sum / count as f64).abs();
        normalized_penalty(deviation, 0.0, self.max_deviation)
    }

    fn weight(&self) -> f64 {
        self.weight
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────
