//! Synthetic terrain for dry runs without a sensor stack.
//!
//! A flat corridor along +x with an optional raised step, rasterized into an
//! [`OccupancyOctree`] at the configured resolution.

use foothold_perception::OccupancyOctree;
use foothold_types::Vec3;

/// Floor height below the robot frame (metres).
pub const FLOOR_Z: f64 = -0.55;

#[derive(Debug, Clone)]
pub struct Corridor {
    pub length: f64,
    pub half_width: f64,
    /// `(start_x, rise)` of a step spanning the full width.
    pub step: Option<(f64, f64)>,
}

impl Corridor {
    pub fn new(length: f64, half_width: f64) -> Self {
        Self {
            length,
            half_width,
            step: None,
        }
    }

    pub fn with_step(mut self, start_x: f64, rise: f64) -> Self {
        self.step = Some((start_x, rise));
        self
    }

    /// Surface height at `x`.
    pub fn floor_at(&self, x: f64) -> f64 {
        match self.step {
            Some((start, rise)) if x >= start => FLOOR_Z + rise,
            _ => FLOOR_Z,
        }
    }

    /// Occupancy octree with one occupied cell per surface column, from one
    /// metre behind the origin to `length`.
    pub fn build(&self, resolution: f64) -> OccupancyOctree {
        let mut octree = OccupancyOctree::new(resolution);
        let columns = |min: f64, max: f64| {
            let first = (min / resolution).floor() as i64;
            let last = (max / resolution).ceil() as i64;
            (first..last).map(move |i| (i as f64 + 0.5) * resolution)
        };
        for x in columns(-1.0, self.length) {
            for y in columns(-self.half_width, self.half_width) {
                octree.insert_point(Vec3::new(x, y, self.floor_at(x)));
            }
        }
        octree
    }
}
