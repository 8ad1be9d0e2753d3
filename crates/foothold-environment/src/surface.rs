//! Local surface estimation.
//!
//! A plane is fitted to a small cloud of occupied-cell centres by principal
//! component analysis:
//!
//! 1. Compute the centroid and the 3×3 covariance matrix of the cloud.
//! 2. Solve the symmetric eigenproblem.
//! 3. The eigenvector of the smallest eigenvalue is the surface normal.
//! 4. Curvature (surface variation) is `λ_min / (λ_0 + λ_1 + λ_2)`.
//!
//! The sign of the normal is whatever the eigensolver returns; callers must
//! not rely on it.

use foothold_types::Vec3;
use nalgebra::{Matrix3, Vector3};

/// Fewest points a plane fit accepts.
pub const MIN_PLANE_SAMPLES: usize = 3;

/// Eigenvalue sums below this are treated as a degenerate (point-like) cloud.
const DEGENERATE_SPREAD: f64 = 1e-12;

/// Result of a successful plane fit.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlaneFit {
    pub centroid: Vec3,
    /// Unit normal, arbitrary sign.
    pub normal: Vec3,
    /// Surface variation in `[0, 1/3]`.
    pub curvature: f64,
}

fn to_vector(p: Vec3) -> Vector3<f64> {
    Vector3::new(p.x, p.y, p.z)
}

/// Centroid and (population) covariance of `points`, or `None` for an
/// empty slice.
pub fn mean_and_covariance(points: &[Vec3]) -> Option<(Vec3, Matrix3<f64>)> {
    if points.is_empty() {
        return None;
    }
    let n = points.len() as f64;
    let mean = points
        .iter()
        .fold(Vector3::zeros(), |acc, &p| acc + to_vector(p))
        / n;
    let covariance = points.iter().fold(Matrix3::zeros(), |acc, &p| {
        let d = to_vector(p) - mean;
        acc + d * d.transpose()
    }) / n;
    Some((Vec3::new(mean.x, mean.y, mean.z), covariance))
}

/// Fit a plane through `points`.
///
/// Returns `None` with fewer than [`MIN_PLANE_SAMPLES`] points or when all
/// points coincide.
pub fn fit_plane(points: &[Vec3]) -> Option<PlaneFit> {
    if points.len() < MIN_PLANE_SAMPLES {
        return None;
    }
    let (centroid, covariance) = mean_and_covariance(points)?;
    let eigen = covariance.symmetric_eigen();

    // Round-off can push a zero eigenvalue slightly negative.
    let eigenvalues = eigen.eigenvalues.map(|l| l.max(0.0));
    let spread = eigenvalues.sum();
    if spread < DEGENERATE_SPREAD {
        return None;
    }
    let smallest = eigenvalues.imin();
    let normal = eigen.eigenvectors.column(smallest).normalize();

    Some(PlaneFit {
        centroid,
        normal: Vec3::new(normal.x, normal.y, normal.z),
        curvature: eigenvalues[smallest] / spread,
    })
}
