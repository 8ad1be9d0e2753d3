//! [`GridIndex`] – discretization of the environment.
//!
//! Maps world coordinates to [`CellKey`]s at a fixed resolution, and cell
//! or column keys to unique [`VertexId`]s. The vertex encoding packs the
//! three 16-bit axis keys into one integer (`z << 32 | y << 16 | x`);
//! column (planar) ids are the same encoding with the height key zeroed,
//! so every id decodes back to exactly one key.

use foothold_perception::index::{TREE_DEPTH, axis_coord, axis_key};
use foothold_types::{CellKey, FootholdError, PlanarKey, Vec3, VertexId};

/// Bidirectional key ↔ vertex ↔ position mapping at a fixed resolution.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GridIndex {
    resolution: f64,
}

impl GridIndex {
    /// Create an index with cells of edge `resolution` metres.
    ///
    /// Returns [`FootholdError::Config`] unless `resolution` is finite and
    /// positive.
    pub fn new(resolution: f64) -> Result<Self, FootholdError> {
        if !resolution.is_finite() || resolution <= 0.0 {
            return Err(FootholdError::Config(format!(
                "grid resolution must be positive, got {resolution}"
            )));
        }
        Ok(Self { resolution })
    }

    pub fn resolution(&self) -> f64 {
        self.resolution
    }

    /// Key of the cell containing `position`.
    pub fn to_key(&self, position: Vec3) -> Result<CellKey, FootholdError> {
        let out_of_range = || FootholdError::OutOfRange {
            x: position.x,
            y: position.y,
            z: position.z,
        };
        Ok(CellKey::new(
            self.axis_key(position.x).ok_or_else(out_of_range)?,
            self.axis_key(position.y).ok_or_else(out_of_range)?,
            self.axis_key(position.z).ok_or_else(out_of_range)?,
        ))
    }

    /// Key of the cell containing coordinate `c` along one axis.
    pub fn axis_key(&self, c: f64) -> Option<u16> {
        axis_key(c, self.resolution, TREE_DEPTH)
    }

    /// Centre coordinate of axis key `key`.
    pub fn axis_coord(&self, key: u16) -> f64 {
        axis_coord(key, self.resolution)
    }

    pub fn to_vertex(&self, key: &CellKey) -> VertexId {
        VertexId(u64::from(key.z) << 32 | u64::from(key.y) << 16 | u64::from(key.x))
    }

    /// Column id of a planar key.
    pub fn planar_vertex(&self, key: &PlanarKey) -> VertexId {
        VertexId(u64::from(key.y) << 16 | u64::from(key.x))
    }

    pub fn vertex_to_key(&self, vertex: VertexId) -> CellKey {
        CellKey::new(
            (vertex.0 & 0xFFFF) as u16,
            ((vertex.0 >> 16) & 0xFFFF) as u16,
            ((vertex.0 >> 32) & 0xFFFF) as u16,
        )
    }

    pub fn vertex_to_planar_key(&self, vertex: VertexId) -> PlanarKey {
        self.vertex_to_key(vertex).planar()
    }

    /// Cell-centre coordinate of a cell vertex.
    pub fn to_position(&self, vertex: VertexId) -> Vec3 {
        self.key_to_position(&self.vertex_to_key(vertex))
    }

    /// Cell-centre coordinate of `key`.
    pub fn key_to_position(&self, key: &CellKey) -> Vec3 {
        Vec3::new(
            self.axis_coord(key.x),
            self.axis_coord(key.y),
            self.axis_coord(key.z),
        )
    }

    /// Planar centre `(x, y)` of a column vertex.
    pub fn planar_position(&self, vertex: VertexId) -> (f64, f64) {
        let key = self.vertex_to_planar_key(vertex);
        (self.axis_coord(key.x), self.axis_coord(key.y))
    }

    /// Column id of the column containing planar point `(x, y)`.
    pub fn column_of(&self, x: f64, y: f64) -> Option<VertexId> {
        let key = PlanarKey::new(self.axis_key(x)?, self.axis_key(y)?);
        Some(self.planar_vertex(&key))
    }
}
