//! Tuning constants for the geodesic renderer

use std::path::PathBuf;

/// Window size at startup
pub const WIDTH: u32 = 800;
pub const HEIGHT: u32 = 600;

/// Compute target while the camera is idle
pub const COMPUTE_STATIC_W: u32 = 200;
pub const COMPUTE_STATIC_H: u32 = 150;

/// Compute target while the camera is being dragged or zoomed
pub const COMPUTE_DYNAMIC_W: u32 = 100;
pub const COMPUTE_DYNAMIC_H: u32 = 75;

/// Compute shader local workgroup edge
pub const WORKGROUP_SIZE: u32 = 16;

/// Camera frustum
pub const FOV_DEGREES: f32 = 60.0;
pub const NEAR_PLANE: f32 = 1e9;
pub const FAR_PLANE: f32 = 1e14;

/// Rays past this radius are treated as escaped
pub const ESCAPE_RADIUS: f64 = 1e14;

/// Step budget for the CPU ray march
pub const MAX_TRACE_STEPS: u32 = 10_000;

/// Affine step scale: d(lambda) = STEP_SCALE * r, small enough that
/// features at the Schwarzschild-radius scale see at least 50 steps
pub const STEP_SCALE: f64 = 0.01;

/// Upper bound on ancillary scene objects in the GPU uniform block
pub const MAX_OBJECTS: usize = 16;

/// Curvature grid: cells per side and world spacing between vertices
pub const GRID_SIZE: usize = 25;
pub const GRID_SPACING: f64 = 1e10;

/// Resolve the shader directory: prefer `shaders/` under the current
/// working directory, falling back to the crate's own copy.
pub fn shader_dir() -> PathBuf {
    let cwd = PathBuf::from("shaders");
    if cwd.is_dir() {
        cwd
    } else {
        PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("shaders")
    }
}
