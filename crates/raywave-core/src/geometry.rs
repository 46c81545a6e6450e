//! Node positions, velocities and link geometry helpers.
//!
//! Positions use a local Cartesian frame in meters with `z` as height
//! above ground. Angles follow the global coordinate system convention:
//! azimuth is measured from the x axis in the x-y plane, inclination
//! (zenith angle) from the z axis.

use serde::{Deserialize, Serialize};

/// Propagation speed used by the empirical fits, in m/s.
pub const SPEED_OF_LIGHT: f64 = 3.0e8;

/// Position in meters in the local Cartesian frame.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Position {
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    /// Horizontal (ground-plane) distance to another position in meters.
    pub fn distance_2d(&self, other: &Position) -> f64 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        (dx * dx + dy * dy).sqrt()
    }

    /// Euclidean distance to another position in meters.
    pub fn distance_3d(&self, other: &Position) -> f64 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        let dz = self.z - other.z;
        (dx * dx + dy * dy + dz * dz).sqrt()
    }
}

/// Velocity in meters per second.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Velocity {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Velocity {
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    pub fn zero() -> Self {
        Self { x: 0.0, y: 0.0, z: 0.0 }
    }
}

/// One endpoint of a radio link.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Node {
    /// Unique node identifier; link caches are keyed on id pairs.
    pub id: u32,
    pub position: Position,
    pub velocity: Velocity,
}

impl Node {
    pub fn new(id: u32, position: Position, velocity: Velocity) -> Self {
        Self { id, position, velocity }
    }

    pub fn stationary(id: u32, position: Position) -> Self {
        Self { id, position, velocity: Velocity::zero() }
    }
}

/// Symmetric cache key for the link between two nodes.
///
/// Cantor pairing of the sorted id pair, so `link_key(a, b) == link_key(b, a)`.
pub fn link_key(a: u32, b: u32) -> u64 {
    let x1 = a.min(b) as u64;
    let x2 = a.max(b) as u64;
    (x1 + x2) * (x1 + x2 + 1) / 2 + x2
}

/// Azimuth and inclination of the direction from `from` towards `to`, in
/// radians.
pub fn bearing(from: &Position, to: &Position) -> (f64, f64) {
    let dx = to.x - from.x;
    let dy = to.y - from.y;
    let dz = to.z - from.z;
    let r = (dx * dx + dy * dy + dz * dz).sqrt();
    assert!(r > 0.0, "bearing is undefined for co-located positions");
    let azimuth = dy.atan2(dx);
    let inclination = (dz / r).acos();
    (azimuth, inclination)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_distances() {
        let a = Position::new(0.0, 0.0, 10.0);
        let b = Position::new(3.0, 4.0, 10.0);
        assert!((a.distance_2d(&b) - 5.0).abs() < 1e-12);
        assert!((a.distance_3d(&b) - 5.0).abs() < 1e-12);

        let c = Position::new(1.0, 0.0, 1.6);
        let tx = Position::new(0.0, 0.0, 10.0);
        // 2D distance 1 m, 3D distance sqrt(1 + 8.4^2)
        assert!((tx.distance_2d(&c) - 1.0).abs() < 1e-12);
        assert!((tx.distance_3d(&c) - (1.0f64 + 8.4 * 8.4).sqrt()).abs() < 1e-12);
    }

    #[test]
    fn test_link_key_is_symmetric() {
        assert_eq!(link_key(3, 7), link_key(7, 3));
        assert_ne!(link_key(3, 7), link_key(3, 8));
        // Cantor pairing of (0, 1)
        assert_eq!(link_key(0, 1), 2);
    }

    #[test]
    fn test_bearing_along_axes() {
        let o = Position::new(0.0, 0.0, 0.0);
        let (az, incl) = bearing(&o, &Position::new(1.0, 0.0, 0.0));
        assert!(az.abs() < 1e-12, "azimuth along +x should be 0, got {az}");
        assert!((incl - std::f64::consts::FRAC_PI_2).abs() < 1e-12);

        let (_, incl_up) = bearing(&o, &Position::new(0.0, 0.0, 5.0));
        assert!(incl_up.abs() < 1e-12, "straight up is zero inclination");
    }

    #[test]
    #[should_panic(expected = "co-located")]
    fn test_bearing_rejects_identical_positions() {
        let p = Position::new(1.0, 2.0, 3.0);
        bearing(&p, &p);
    }
}
