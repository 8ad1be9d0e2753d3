//! Planar heading transforms.
//!
//! Search areas are expressed in the robot's heading frame: a box "in front
//! of the robot" must follow its yaw. [`Heading`] caches the sine and cosine
//! of a yaw angle and maps planar points between the heading frame and the
//! world frame.
//!
//! # Example
//!
//! ```rust
//! use foothold_perception::transform::Heading;
//!
//! // Robot at (1, 1) facing +Y.
//! let heading = Heading::new(std::f64::consts::FRAC_PI_2);
//! let (x, y) = heading.rotate_about((2.0, 1.0), (1.0, 1.0));
//! assert!((x - 1.0).abs() < 1e-9);
//! assert!((y - 2.0).abs() < 1e-9);
//! ```

use foothold_types::RobotPose;

/// A planar rotation by a fixed yaw angle.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Heading {
    yaw: f64,
    cos: f64,
    sin: f64,
}

impl Heading {
    /// Rotation by `yaw` radians (counter-clockwise).
    pub fn new(yaw: f64) -> Self {
        let (sin, cos) = yaw.sin_cos();
        Self { yaw, cos, sin }
    }

    /// Heading of a robot pose.
    pub fn of(pose: &RobotPose) -> Self {
        Self::new(pose.yaw)
    }

    pub fn yaw(&self) -> f64 {
        self.yaw
    }

    /// The opposite rotation.
    pub fn inverse(&self) -> Self {
        Self {
            yaw: -self.yaw,
            cos: self.cos,
            sin: -self.sin,
        }
    }

    /// Rotate a planar vector about the origin.
    pub fn rotate(&self, (x, y): (f64, f64)) -> (f64, f64) {
        (x * self.cos - y * self.sin, x * self.sin + y * self.cos)
    }

    /// Rotate `point` about `pivot`.
    pub fn rotate_about(&self, point: (f64, f64), pivot: (f64, f64)) -> (f64, f64) {
        let (x, y) = self.rotate((point.0 - pivot.0, point.1 - pivot.1));
        (x + pivot.0, y + pivot.1)
    }
}

/// Express a world-frame planar point in the heading frame of `pose`
/// (origin at the robot, +X along its heading).
pub fn to_heading_frame(pose: &RobotPose, x: f64, y: f64) -> (f64, f64) {
    Heading::of(pose).inverse().rotate((x - pose.x, y - pose.y))
}

/// Express a heading-frame planar point of `pose` in the world frame.
pub fn to_world_frame(pose: &RobotPose, local_x: f64, local_y: f64) -> (f64, f64) {
    let (x, y) = Heading::of(pose).rotate((local_x, local_y));
    (x + pose.x, y + pose.y)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::{FRAC_PI_2, PI};

    fn approx(a: (f64, f64), b: (f64, f64)) -> bool {
        (a.0 - b.0).abs() < 1e-9 && (a.1 - b.1).abs() < 1e-9
    }

    #[test]
    fn zero_yaw_is_identity() {
        let h = Heading::new(0.0);
        assert!(approx(h.rotate((3.0, -2.0)), (3.0, -2.0)));
    }

    #[test]
    fn quarter_turn_maps_x_to_y() {
        let h = Heading::new(FRAC_PI_2);
        assert!(approx(h.rotate((1.0, 0.0)), (0.0, 1.0)));
    }

    #[test]
    fn half_turn_about_pivot() {
        let h = Heading::new(PI);
        assert!(approx(h.rotate_about((3.0, 1.0), (1.0, 1.0)), (-1.0, 1.0)));
    }

    #[test]
    fn inverse_undoes_rotation() {
        let h = Heading::new(0.7);
        let p = (1.3, -0.4);
        assert!(approx(h.inverse().rotate(h.rotate(p)), p));
        assert!((h.inverse().yaw() + 0.7).abs() < 1e-12);
    }

    #[test]
    fn heading_and_world_frames_are_inverse() {
        let pose = RobotPose::new(2.0, -1.0, 0.3, 1.1);
        let (lx, ly) = to_heading_frame(&pose, 4.0, 0.5);
        assert!(approx(to_world_frame(&pose, lx, ly), (4.0, 0.5)));
    }

    #[test]
    fn point_ahead_of_robot_has_positive_local_x() {
        let pose = RobotPose::new(0.0, 0.0, 0.0, FRAC_PI_2);
        let (lx, ly) = to_heading_frame(&pose, 0.0, 2.0);
        assert!(approx((lx, ly), (2.0, 0.0)));
    }
}
