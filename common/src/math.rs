//! Coordinate conversions between Cartesian and spherical frames.
//!
//! The geodesic integrator works in Schwarzschild spherical coordinates
//! (r, theta, phi) with theta measured from the +y polar axis of the
//! render frame; these helpers are the single place that convention lives.

use glam::DVec3;

/// Spherical position (r, theta, phi) to Cartesian.
///
/// Uses the physics convention with z along the polar axis:
/// x = r sin(theta) cos(phi), y = r sin(theta) sin(phi), z = r cos(theta).
pub fn spherical_to_cartesian(r: f64, theta: f64, phi: f64) -> DVec3 {
    DVec3::new(
        r * theta.sin() * phi.cos(),
        r * theta.sin() * phi.sin(),
        r * theta.cos(),
    )
}

/// Cartesian position to (r, theta, phi). Undefined at the origin.
pub fn cartesian_to_spherical(p: DVec3) -> (f64, f64, f64) {
    let r = p.length();
    let theta = (p.z / r).clamp(-1.0, 1.0).acos();
    let phi = p.y.atan2(p.x);
    (r, theta, phi)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trip_within_tolerance() {
        let samples = [
            DVec3::new(1.0, 2.0, 3.0),
            DVec3::new(-4.0, 0.5, -2.0),
            DVec3::new(6.34194e10, 1e9, -3e10),
        ];
        for p in samples {
            let (r, theta, phi) = cartesian_to_spherical(p);
            let q = spherical_to_cartesian(r, theta, phi);
            assert!(
                (p - q).length() / p.length() < 1e-9,
                "round trip failed: {p:?} -> {q:?}"
            );
        }
    }

    #[test]
    fn polar_axis_maps_to_zero_theta() {
        let (r, theta, _) = cartesian_to_spherical(DVec3::new(0.0, 0.0, 5.0));
        assert!((r - 5.0).abs() < 1e-12);
        assert!(theta.abs() < 1e-12);
    }
}
