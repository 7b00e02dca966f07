//! Camera systems: the orbit camera driving the geodesic view and a
//! free-fly camera for the alternative WASD mode.

use glam::{Mat4, Vec3};

/// Orbit camera around a fixed target, parameterized by azimuth,
/// elevation and radius.
///
/// Elevation is clamped strictly inside (0, pi) so the view basis never
/// degenerates at the poles. The `moving` flag tracks whether any drag
/// or zoom delta occurred since the previous frame; the renderer uses it
/// to drop to the low-resolution compute target.
#[derive(Debug, Clone)]
pub struct OrbitCamera {
    pub target: Vec3,
    pub radius: f32,
    pub min_radius: f32,
    pub max_radius: f32,
    pub azimuth: f32,
    pub elevation: f32,
    pub orbit_speed: f32,
    pub zoom_speed: f32,
    pub dragging: bool,
    pub moving: bool,
    last_x: f64,
    last_y: f64,
}

const ELEVATION_MARGIN: f32 = 0.01;

impl OrbitCamera {
    pub fn new() -> Self {
        Self {
            target: Vec3::ZERO,
            radius: 6.34194e10,
            min_radius: 1e10,
            max_radius: 1e12,
            azimuth: 0.0,
            elevation: std::f32::consts::FRAC_PI_2,
            orbit_speed: 0.01,
            zoom_speed: 25e9,
            dragging: false,
            moving: false,
            last_x: 0.0,
            last_y: 0.0,
        }
    }

    /// World-space eye position derived from the orbit parameters
    pub fn position(&self) -> Vec3 {
        let clamped = self
            .elevation
            .clamp(ELEVATION_MARGIN, std::f32::consts::PI - ELEVATION_MARGIN);
        Vec3::new(
            self.radius * clamped.sin() * self.azimuth.cos(),
            self.radius * clamped.cos(),
            self.radius * clamped.sin() * self.azimuth.sin(),
        )
    }

    /// Re-centre the target and fold drag state into the motion latch.
    /// The latch also catches zoom deltas and is cleared by `end_frame`.
    pub fn update(&mut self) {
        self.target = Vec3::ZERO;
        self.moving = self.moving || self.dragging;
    }

    pub fn begin_drag(&mut self, x: f64, y: f64) {
        self.dragging = true;
        self.last_x = x;
        self.last_y = y;
        self.update();
    }

    pub fn end_drag(&mut self) {
        self.dragging = false;
        self.update();
    }

    pub fn process_mouse_move(&mut self, x: f64, y: f64) {
        let dx = (x - self.last_x) as f32;
        let dy = (y - self.last_y) as f32;
        if self.dragging {
            self.azimuth += dx * self.orbit_speed;
            self.elevation = (self.elevation - dy * self.orbit_speed)
                .clamp(ELEVATION_MARGIN, std::f32::consts::PI - ELEVATION_MARGIN);
        }
        self.last_x = x;
        self.last_y = y;
        self.update();
    }

    pub fn process_scroll(&mut self, dy: f32) {
        self.radius = (self.radius - dy * self.zoom_speed).clamp(self.min_radius, self.max_radius);
        // A zoom delta counts as movement for this frame even without a drag.
        self.moving = true;
    }

    /// Clear the per-frame motion latch once the frame has consumed it;
    /// an ongoing drag keeps the camera moving
    pub fn end_frame(&mut self) {
        self.moving = self.dragging;
    }

    /// Orthonormal view basis: (right, up, forward), forward towards the target
    pub fn basis(&self) -> (Vec3, Vec3, Vec3) {
        let forward = (self.target - self.position()).normalize();
        let right = forward.cross(Vec3::Y).normalize();
        let up = right.cross(forward);
        (right, up, forward)
    }

    pub fn view_matrix(&self) -> Mat4 {
        Mat4::look_at_rh(self.position(), self.target, Vec3::Y)
    }
}

impl Default for OrbitCamera {
    fn default() -> Self {
        Self::new()
    }
}

/// Free-fly camera for the alternative WASD/QE mode
#[derive(Debug, Clone)]
pub struct FreeCamera {
    pub position: Vec3,
    pub yaw: f32,
    pub pitch: f32,
    pub fly_speed: f32,
}

impl FreeCamera {
    pub fn new(position: Vec3) -> Self {
        Self {
            position,
            yaw: -std::f32::consts::FRAC_PI_2,
            pitch: 0.0,
            fly_speed: 5e10,
        }
    }

    pub fn forward(&self) -> Vec3 {
        Vec3::new(
            self.yaw.cos() * self.pitch.cos(),
            self.pitch.sin(),
            self.yaw.sin() * self.pitch.cos(),
        )
        .normalize()
    }

    pub fn right(&self) -> Vec3 {
        self.forward().cross(Vec3::Y).normalize()
    }

    /// Translate by the axis inputs in [-1, 1] over `dt` seconds
    pub fn translate(&mut self, forward: f32, strafe: f32, vertical: f32, dt: f32) {
        let step = self.fly_speed * dt;
        self.position += self.forward() * forward * step;
        self.position += self.right() * strafe * step;
        self.position += Vec3::Y * vertical * step;
    }

    pub fn basis(&self) -> (Vec3, Vec3, Vec3) {
        let forward = self.forward();
        let right = forward.cross(Vec3::Y).normalize();
        let up = right.cross(forward);
        (right, up, forward)
    }

    pub fn view_matrix(&self) -> Mat4 {
        Mat4::look_to_rh(self.position, self.forward(), Vec3::Y)
    }
}

/// Perspective projection shared by both camera modes
pub fn projection_matrix(fov_y_radians: f32, aspect: f32, near: f32, far: f32) -> Mat4 {
    Mat4::perspective_rh(fov_y_radians, aspect, near, far)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn orbit_position_matches_spherical_parameterization() {
        let mut cam = OrbitCamera::new();
        cam.radius = 10.0;
        cam.azimuth = 0.0;
        cam.elevation = std::f32::consts::FRAC_PI_2;
        let p = cam.position();
        assert!((p - Vec3::new(10.0, 0.0, 0.0)).length() < 1e-4, "{p:?}");
    }

    #[test]
    fn elevation_never_reaches_poles() {
        let mut cam = OrbitCamera::new();
        cam.begin_drag(0.0, 0.0);
        cam.process_mouse_move(0.0, 1e6);
        assert!(cam.elevation >= 0.01);
        cam.process_mouse_move(0.0, -2e6);
        assert!(cam.elevation <= std::f32::consts::PI - 0.01);
    }

    #[test]
    fn zoom_clamps_to_radius_bounds() {
        let mut cam = OrbitCamera::new();
        cam.process_scroll(1e9);
        assert_eq!(cam.radius, cam.min_radius);
        cam.process_scroll(-1e9);
        assert_eq!(cam.radius, cam.max_radius);
    }

    #[test]
    fn moving_tracks_drag_and_zoom() {
        let mut cam = OrbitCamera::new();
        assert!(!cam.moving);
        cam.begin_drag(0.0, 0.0);
        assert!(cam.moving);
        cam.end_drag();
        cam.end_frame();
        assert!(!cam.moving);

        // A zoom delta counts as movement for exactly one frame
        cam.process_scroll(1.0);
        cam.update();
        assert!(cam.moving);
        cam.end_frame();
        assert!(!cam.moving);

        // The per-frame update must not clobber the zoom latch
        cam.process_scroll(-1.0);
        cam.update();
        assert!(cam.moving);
    }

    #[test]
    fn orbit_basis_is_orthonormal() {
        let mut cam = OrbitCamera::new();
        cam.azimuth = 0.7;
        cam.elevation = 1.1;
        let (right, up, forward) = cam.basis();
        assert!(right.dot(up).abs() < 1e-5);
        assert!(right.dot(forward).abs() < 1e-5);
        assert!(up.dot(forward).abs() < 1e-5);
        assert!((right.length() - 1.0).abs() < 1e-5);
    }
}
