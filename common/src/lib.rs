//! Shared infrastructure for the relativistic rendering workspace
//!
//! This crate provides window/GPU bring-up, the orbit and free-fly cameras,
//! coordinate conversions, and the typed handle table used by renderers in
//! both the geodesic and the particle binaries.

pub mod camera;
pub mod graphics;
pub mod handles;
pub mod math;

pub use camera::*;
pub use graphics::*;
pub use handles::*;

/// Physical constants in SI units
pub mod constants {
    /// Gravitational constant (m³/kg·s²)
    pub const G: f64 = 6.67430e-11;

    /// Speed of light (m/s)
    pub const C: f64 = 299_792_458.0;

    /// Schwarzschild radius of a mass in kg: rs = 2GM/c²
    pub fn schwarzschild_radius(mass: f64) -> f64 {
        2.0 * G * mass / (C * C)
    }
}

#[cfg(test)]
mod tests {
    use super::constants::*;

    #[test]
    fn schwarzschild_radius_of_sagittarius_a() {
        // M = 8.54e36 kg gives rs ~= 1.2679e10 m
        let rs = schwarzschild_radius(8.54e36);
        let mantissa = rs / 1e10;
        assert!((mantissa - 1.2679).abs() < 0.01, "rs = {rs:e}");
    }

    #[test]
    fn schwarzschild_radius_increases_with_mass() {
        let mut last = 0.0;
        for m in [1e30, 1e33, 1e36, 1e39] {
            let rs = schwarzschild_radius(m);
            assert!(rs > last);
            last = rs;
        }
    }
}
