//! Scene model: the primary black hole, ancillary occluders, and the
//! accretion disk.

use common::constants::schwarzschild_radius;
use glam::{DVec3, Vec3};

/// Non-rotating black hole. The Schwarzschild radius is computed once at
/// construction and treated as read-only afterwards.
#[derive(Debug, Clone, Copy)]
pub struct BlackHole {
    pub position: DVec3,
    pub mass: f64,
    pub r_s: f64,
}

impl BlackHole {
    pub fn new(position: DVec3, mass: f64) -> Self {
        assert!(mass > 0.0, "black hole mass must be positive");
        Self {
            position,
            mass,
            r_s: schwarzschild_radius(mass),
        }
    }

    /// Unstable circular photon orbit at 1.5 rs
    pub fn photon_sphere_radius(&self) -> f64 {
        1.5 * self.r_s
    }

    /// Metric factor f(r) = 1 - rs/r
    pub fn metric_factor(&self, r: f64) -> f64 {
        1.0 - self.r_s / r
    }
}

/// Ancillary scene object: occludes rays and deforms the curvature grid,
/// but does not bend light.
#[derive(Debug, Clone, Copy)]
pub struct SceneObject {
    pub position: DVec3,
    pub radius: f64,
    pub color: Vec3,
    pub mass: f64,
}

/// Accretion disk: equatorial annulus between r1 and r2 with spiral
/// banding and finite thickness.
#[derive(Debug, Clone, Copy)]
pub struct Disk {
    pub r1: f64,
    pub r2: f64,
    pub arms: u32,
    pub thickness: f64,
}

impl Disk {
    pub fn for_black_hole(bh: &BlackHole) -> Self {
        Self {
            r1: 2.2 * bh.r_s,
            r2: 5.2 * bh.r_s,
            arms: 2,
            thickness: 1e9,
        }
    }
}

/// Everything the renderer and the CPU oracle look at. Built once;
/// immutable within a session apart from the input-driven gravity flag.
pub struct Scene {
    pub black_hole: BlackHole,
    pub disk: Disk,
    pub objects: Vec<SceneObject>,
    /// Toggled by input; consumed only by the particle demo. Kept here so
    /// the toggle is explicit state rather than a process-wide global.
    pub gravity_enabled: bool,
}

impl Scene {
    /// Default scene: Sagittarius A* with one solar-mass companion
    pub fn sagittarius() -> Self {
        let black_hole = BlackHole::new(DVec3::ZERO, 8.54e36);
        let disk = Disk::for_black_hole(&black_hole);
        let objects = vec![SceneObject {
            position: DVec3::new(4e11, 0.0, 4e11),
            radius: 4e10,
            color: Vec3::new(1.0, 1.0, 0.0),
            mass: 1.98892e30,
        }];
        debug_assert!(disk.r1 > black_hole.r_s && disk.r2 > disk.r1);
        Self {
            black_hole,
            disk,
            objects,
            gravity_enabled: false,
        }
    }

    pub fn toggle_gravity(&mut self) {
        self.gravity_enabled = !self.gravity_enabled;
        log::info!(
            "gravity {}",
            if self.gravity_enabled { "ON" } else { "OFF" }
        );
    }
}
