//! CPU-side curvature grid: a flexed wireframe plane whose vertical
//! displacement sums the embedding-diagram contribution of every massive
//! object in the scene.

use common::constants::schwarzschild_radius;

use crate::config::{GRID_SIZE, GRID_SPACING};
use crate::scene::Scene;

/// Vertical offset that keeps the flexed plane below the disk
const GRID_DROP: f64 = 3e10;

/// Wireframe grid mesh, rebuilt from the scene each frame.
///
/// Vertices are (N+1)^2 world-space positions; the index buffer is a
/// static line list with one horizontal and one vertical segment per
/// cell (4·N² indices).
pub struct CurvatureGrid {
    pub vertices: Vec<[f32; 3]>,
    pub indices: Vec<u32>,
}

impl CurvatureGrid {
    pub fn new() -> Self {
        let side = GRID_SIZE + 1;
        Self {
            vertices: vec![[0.0; 3]; side * side],
            indices: build_indices(),
        }
    }

    /// Recompute vertex heights from the current scene
    pub fn rebuild(&mut self, scene: &Scene) {
        let side = GRID_SIZE + 1;
        let half = GRID_SIZE as f64 / 2.0;

        // All grid-deforming masses: the primary hole plus every object
        let masses = std::iter::once((scene.black_hole.position, scene.black_hole.mass))
            .chain(scene.objects.iter().map(|o| (o.position, o.mass)));
        let wells: Vec<(f64, f64, f64)> = masses
            .map(|(pos, mass)| (pos.x, pos.z, schwarzschild_radius(mass)))
            .collect();

        for z in 0..side {
            for x in 0..side {
                let world_x = (x as f64 - half) * GRID_SPACING;
                let world_z = (z as f64 - half) * GRID_SPACING;
                let mut y = 0.0;
                for &(ox, oz, rs) in &wells {
                    let dx = world_x - ox;
                    let dz = world_z - oz;
                    let dist = (dx * dx + dz * dz).sqrt();
                    let lift = if dist > rs {
                        2.0 * (rs * (dist - rs)).sqrt()
                    } else {
                        2.0 * rs
                    };
                    y += lift - GRID_DROP;
                }
                self.vertices[z * side + x] = [world_x as f32, y as f32, world_z as f32];
            }
        }
    }

    pub fn index_count(&self) -> u32 {
        self.indices.len() as u32
    }

    pub fn vertex_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.vertices)
    }

    pub fn index_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.indices)
    }
}

impl Default for CurvatureGrid {
    fn default() -> Self {
        Self::new()
    }
}

fn build_indices() -> Vec<u32> {
    let side = (GRID_SIZE + 1) as u32;
    let mut indices = Vec::with_capacity(4 * GRID_SIZE * GRID_SIZE);
    for z in 0..GRID_SIZE as u32 {
        for x in 0..GRID_SIZE as u32 {
            let i = z * side + x;
            indices.extend_from_slice(&[i, i + 1, i, i + side]);
        }
    }
    indices
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::Scene;
    use glam::DVec3;

    fn centered_scene() -> Scene {
        let mut scene = Scene::sagittarius();
        scene.objects.clear();
        scene
    }

    #[test]
    fn index_buffer_has_four_indices_per_cell() {
        let grid = CurvatureGrid::new();
        assert_eq!(grid.indices.len(), 4 * GRID_SIZE * GRID_SIZE);
        let side = (GRID_SIZE + 1) as u32;
        assert!(grid.indices.iter().all(|&i| i < side * side));
    }

    #[test]
    fn grid_is_symmetric_about_a_centered_hole() {
        let scene = centered_scene();
        let mut grid = CurvatureGrid::new();
        grid.rebuild(&scene);

        let side = GRID_SIZE + 1;
        for z in 0..side {
            for x in 0..side {
                let a = grid.vertices[z * side + x];
                let b = grid.vertices[(side - 1 - z) * side + (side - 1 - x)];
                // y(x, z) == y(-x, -z)
                assert!(
                    (a[1] - b[1]).abs() <= 1e-3 * a[1].abs().max(1.0),
                    "asymmetry at ({x},{z}): {} vs {}",
                    a[1],
                    b[1]
                );
            }
        }
    }

    #[test]
    fn well_is_deepest_at_the_hole() {
        let scene = centered_scene();
        let mut grid = CurvatureGrid::new();
        grid.rebuild(&scene);

        let side = GRID_SIZE + 1;
        let center = grid.vertices[(side / 2) * side + side / 2][1];
        let corner = grid.vertices[0][1];
        assert!(center < corner, "center {center} not below corner {corner}");
    }

    #[test]
    fn companion_dimples_the_grid() {
        let mut scene = Scene::sagittarius();
        scene.objects[0].position = DVec3::new(4e11, 0.0, 4e11);
        let mut grid = CurvatureGrid::new();
        grid.rebuild(&scene);

        let side = GRID_SIZE + 1;
        // Nearest vertex to (4e11, *, 4e11)
        let mut nearest = 0;
        let mut best = f64::INFINITY;
        for (i, v) in grid.vertices.iter().enumerate() {
            let dx = v[0] as f64 - 4e11;
            let dz = v[2] as f64 - 4e11;
            let d = dx * dx + dz * dz;
            if d < best {
                best = d;
                nearest = i;
            }
        }

        let dimple = grid.vertices[nearest][1];
        for corner in [0, side - 1, side * (side - 1), side * side - 1] {
            if corner == nearest {
                continue;
            }
            assert!(
                dimple < grid.vertices[corner][1],
                "companion dimple {dimple} not below corner {}",
                grid.vertices[corner][1]
            );
        }
    }
}
