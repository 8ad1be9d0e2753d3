//! Read-only query surface of an occupancy map.
//!
//! The terrain evaluator never owns the map it reads. The mapping subsystem
//! hands a borrowed `&dyn SpatialIndex` to each planning cycle; any
//! structure that can translate coordinates to discrete keys and report
//! per-key occupancy can back it.

use foothold_types::{CellKey, Vec3};

/// Number of key levels of a full-depth index (16-bit keys per axis).
pub const TREE_DEPTH: u8 = 16;

/// Key of the cell whose lower corner sits at the world origin.
pub const KEY_ORIGIN: i64 = 1 << (TREE_DEPTH - 1);

/// Occupancy state of an observed cell, stored as log-odds.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OccupancyNode {
    pub log_odds: f32,
}

impl OccupancyNode {
    /// Occupancy probability in `[0, 1]`.
    pub fn probability(&self) -> f32 {
        1.0 - 1.0 / (1.0 + self.log_odds.exp())
    }
}

/// Query operations the terrain evaluator issues against the map.
pub trait SpatialIndex {
    /// Edge length of a full-depth cell (metres).
    fn resolution(&self) -> f64;

    /// Convert `point` to the key of the cell containing it at `depth`
    /// (`0` or [`TREE_DEPTH`] means full depth). Returns `None` when the
    /// point lies outside the representable span.
    fn coord_to_key_checked(&self, point: Vec3, depth: u8) -> Option<CellKey>;

    /// Look up an observed cell. `None` means the cell is unknown.
    fn search(&self, key: &CellKey) -> Option<OccupancyNode>;

    /// Centre coordinate of the cell addressed by `key`.
    fn key_to_coord(&self, key: &CellKey) -> Vec3;

    /// True when `node` is considered occupied.
    fn is_occupied(&self, node: &OccupancyNode) -> bool;
}

/// Axis key of coordinate `c` at `resolution`, adjusted to the centre key of
/// the enclosing cell at `depth`.
pub fn axis_key(c: f64, resolution: f64, depth: u8) -> Option<u16> {
    if !c.is_finite() {
        return None;
    }
    let scaled = (c / resolution).floor();
    if scaled < -(KEY_ORIGIN as f64) || scaled >= KEY_ORIGIN as f64 {
        return None;
    }
    let key = scaled as i64 + KEY_ORIGIN;
    let key = u16::try_from(key).ok()?;
    if depth == 0 || depth >= TREE_DEPTH {
        return Some(key);
    }
    let shift = TREE_DEPTH - depth;
    Some(((key >> shift) << shift) + (1 << (shift - 1)))
}

/// Centre coordinate of axis key `key` at `resolution`.
pub fn axis_coord(key: u16, resolution: f64) -> f64 {
    ((i64::from(key) - KEY_ORIGIN) as f64 + 0.5) * resolution
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn origin_maps_to_middle_key() {
        assert_eq!(axis_key(0.0, 0.1, TREE_DEPTH), Some(32768));
        assert_eq!(axis_key(-0.01, 0.1, TREE_DEPTH), Some(32767));
    }

    #[test]
    fn out_of_span_is_rejected() {
        assert_eq!(axis_key(3276.9, 0.1, TREE_DEPTH), None);
        assert_eq!(axis_key(-3276.9, 0.1, TREE_DEPTH), None);
        assert_eq!(axis_key(f64::NAN, 0.1, TREE_DEPTH), None);
    }

    #[test]
    fn coarse_depth_snaps_to_centre_key() {
        // depth 15 groups keys in pairs; the centre key is the upper one.
        assert_eq!(axis_key(0.0, 0.1, 15), Some(32769));
        assert_eq!(axis_key(0.15, 0.1, 15), Some(32769));
    }

    #[test]
    fn axis_coord_is_cell_centre() {
        assert!((axis_coord(32768, 0.1) - 0.05).abs() < 1e-12);
        assert!((axis_coord(32767, 0.1) + 0.05).abs() < 1e-12);
    }

    #[test]
    fn probability_of_zero_log_odds_is_half() {
        let node = OccupancyNode { log_odds: 0.0 };
        assert!((node.probability() - 0.5).abs() < 1e-6);
    }
}
