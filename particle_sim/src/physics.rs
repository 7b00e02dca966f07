//! Newtonian particle dynamics around a central mass, with selectable
//! integration methods and first-order relativistic trimmings.

use common::constants::{schwarzschild_radius, C, G};
use glam::DVec3;
use rand::Rng;

/// Particles faster than this fraction of c get clamped
const MAX_VELOCITY_FRACTION: f64 = 0.1;

/// The central attractor (the black hole, for this demo)
#[derive(Debug, Clone, Copy)]
pub struct CentralMass {
    pub position: DVec3,
    pub mass: f64,
    pub rs: f64,
}

impl CentralMass {
    pub fn new(position: DVec3, mass: f64) -> Self {
        Self {
            position,
            mass,
            rs: schwarzschild_radius(mass),
        }
    }

    /// Newtonian acceleration, with a quadratic proximity correction
    /// inside ten Schwarzschild radii when `relativistic` is set
    pub fn acceleration(&self, at: DVec3, relativistic: bool) -> DVec3 {
        let offset = at - self.position;
        let r = offset.length();
        if r <= self.rs {
            return DVec3::ZERO;
        }
        let newtonian = -offset * (G * self.mass / (r * r * r));
        if relativistic && r < 10.0 * self.rs {
            let proximity = self.rs / r;
            newtonian * (1.0 + proximity * proximity)
        } else {
            newtonian
        }
    }

    /// Circular orbital speed sqrt(GM/r) at the given radius
    pub fn orbital_speed(&self, r: f64) -> f64 {
        (G * self.mass / r).sqrt()
    }
}

#[derive(Debug, Clone, Copy)]
pub struct Particle {
    pub position: DVec3,
    pub velocity: DVec3,
    pub mass: f64,
    pub active: bool,
}

impl Particle {
    pub fn new(position: DVec3, velocity: DVec3, mass: f64) -> Self {
        Self {
            position,
            velocity,
            mass,
            active: true,
        }
    }
}

/// Integration method for the particle path. Only particles get a
/// method knob; geodesic rays are always RK4.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Integrator {
    Euler,
    Rk2,
    Rk4,
    Verlet,
}

impl Integrator {
    pub fn next(self) -> Self {
        match self {
            Integrator::Euler => Integrator::Rk2,
            Integrator::Rk2 => Integrator::Rk4,
            Integrator::Rk4 => Integrator::Verlet,
            Integrator::Verlet => Integrator::Euler,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Integrator::Euler => "euler",
            Integrator::Rk2 => "rk2",
            Integrator::Rk4 => "rk4",
            Integrator::Verlet => "verlet",
        }
    }
}

/// Orbital diagnostics for a particle relative to the central mass
#[derive(Debug, Clone, Copy)]
pub struct OrbitalElements {
    pub specific_energy: f64,
    pub specific_angular_momentum: f64,
    pub eccentricity: f64,
    pub is_bound: bool,
}

pub struct Simulation {
    pub central: CentralMass,
    pub particles: Vec<Particle>,
    pub integrator: Integrator,
    pub relativistic: bool,
}

impl Simulation {
    pub fn new(central: CentralMass) -> Self {
        Self {
            central,
            particles: Vec::new(),
            integrator: Integrator::Rk4,
            relativistic: true,
        }
    }

    /// Spawn particles on jittered circular orbits in the equatorial
    /// plane between `r_min` and `r_max`
    pub fn spawn_disk(&mut self, count: usize, r_min: f64, r_max: f64, rng: &mut impl Rng) {
        self.particles.clear();
        for _ in 0..count {
            let r = rng.gen_range(r_min..r_max);
            let angle = rng.gen_range(0.0..std::f64::consts::TAU);
            let position =
                self.central.position + DVec3::new(r * angle.cos(), 0.0, r * angle.sin());

            let speed = self.central.orbital_speed(r) * rng.gen_range(0.95..1.05);
            let velocity = DVec3::new(-angle.sin(), 0.0, angle.cos()) * speed;

            let mass = rng.gen_range(1e20..1e24);
            self.particles.push(Particle::new(position, velocity, mass));
        }
    }

    /// Advance every active particle by `dt` seconds
    pub fn step(&mut self, dt: f64) {
        let central = self.central;
        let relativistic = self.relativistic;
        let method = self.integrator;

        for particle in &mut self.particles {
            if !particle.active {
                continue;
            }
            if (particle.position - central.position).length() <= central.rs {
                particle.active = false;
                continue;
            }

            let (position, velocity) = integrate(
                method,
                particle.position,
                particle.velocity,
                dt,
                |p| central.acceleration(p, relativistic),
            );
            particle.position = position;
            particle.velocity = velocity;

            if relativistic {
                apply_relativistic_effects(particle, &central);
            }
        }
    }

    /// Advance positions only; used while the gravity toggle is off
    pub fn coast(&mut self, dt: f64) {
        for particle in &mut self.particles {
            if particle.active {
                particle.position += particle.velocity * dt;
            }
        }
    }

    pub fn active_count(&self) -> usize {
        self.particles.iter().filter(|p| p.active).count()
    }

    /// Classical orbital elements of one particle
    pub fn orbital_elements(&self, particle: &Particle) -> OrbitalElements {
        let mu = G * self.central.mass;
        let r_vec = particle.position - self.central.position;
        let v_vec = particle.velocity;
        let r = r_vec.length();
        let v = v_vec.length();

        let specific_energy = 0.5 * v * v - mu / r;
        let h_vec = r_vec.cross(v_vec);
        let specific_angular_momentum = h_vec.length();

        let e_vec = v_vec.cross(h_vec) / mu - r_vec / r;
        let eccentricity = e_vec.length();

        OrbitalElements {
            specific_energy,
            specific_angular_momentum,
            eccentricity,
            is_bound: specific_energy < 0.0,
        }
    }
}

/// One step of the selected method over the (position, velocity) state
fn integrate(
    method: Integrator,
    position: DVec3,
    velocity: DVec3,
    dt: f64,
    accel: impl Fn(DVec3) -> DVec3,
) -> (DVec3, DVec3) {
    match method {
        Integrator::Euler => {
            let a = accel(position);
            let velocity = velocity + a * dt;
            (position + velocity * dt, velocity)
        }
        Integrator::Rk2 => {
            // Midpoint method
            let a1 = accel(position);
            let mid_pos = position + velocity * (dt * 0.5);
            let mid_vel = velocity + a1 * (dt * 0.5);
            let a2 = accel(mid_pos);
            (position + mid_vel * dt, velocity + a2 * dt)
        }
        Integrator::Rk4 => {
            let k1_x = velocity;
            let k1_v = accel(position);

            let k2_x = velocity + k1_v * (dt * 0.5);
            let k2_v = accel(position + k1_x * (dt * 0.5));

            let k3_x = velocity + k2_v * (dt * 0.5);
            let k3_v = accel(position + k2_x * (dt * 0.5));

            let k4_x = velocity + k3_v * dt;
            let k4_v = accel(position + k3_x * dt);

            (
                position + (k1_x + k2_x * 2.0 + k3_x * 2.0 + k4_x) * (dt / 6.0),
                velocity + (k1_v + k2_v * 2.0 + k3_v * 2.0 + k4_v) * (dt / 6.0),
            )
        }
        Integrator::Verlet => {
            // Velocity Verlet: position with current acceleration, then
            // velocity with the average of old and new accelerations
            let a0 = accel(position);
            let new_position = position + velocity * dt + a0 * (0.5 * dt * dt);
            let a1 = accel(new_position);
            (new_position, velocity + (a0 + a1) * (0.5 * dt))
        }
    }
}

fn apply_relativistic_effects(particle: &mut Particle, central: &CentralMass) {
    // Cap the speed at a fraction of c
    let speed = particle.velocity.length();
    let max_speed = MAX_VELOCITY_FRACTION * C;
    if speed > max_speed {
        particle.velocity *= max_speed / speed;
    }

    // Gravitational time dilation damps apparent motion near the horizon
    let r = (particle.position - central.position).length();
    if r > central.rs {
        let dilation = (1.0 - central.rs / r).sqrt();
        if dilation < 0.5 {
            particle.velocity *= dilation.max(0.1);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn sagittarius() -> CentralMass {
        CentralMass::new(DVec3::ZERO, 8.54e36)
    }

    fn circular_setup(central: &CentralMass, r: f64) -> Particle {
        let speed = central.orbital_speed(r);
        Particle::new(
            DVec3::new(r, 0.0, 0.0),
            DVec3::new(0.0, 0.0, speed),
            1e22,
        )
    }

    /// Run one particle for `steps` and return relative energy drift
    fn energy_drift(method: Integrator, steps: usize) -> f64 {
        let central = sagittarius();
        let mut sim = Simulation::new(central);
        sim.relativistic = false;
        sim.integrator = method;

        let r = 1000.0 * central.rs;
        sim.particles.push(circular_setup(&central, r));
        let e0 = sim.orbital_elements(&sim.particles[0]).specific_energy;

        let period = std::f64::consts::TAU * r / central.orbital_speed(r);
        let dt = period / 1000.0;
        for _ in 0..steps {
            sim.step(dt);
        }
        let e1 = sim.orbital_elements(&sim.particles[0]).specific_energy;
        ((e1 - e0) / e0).abs()
    }

    #[test]
    fn rk4_holds_a_circular_orbit() {
        let central = sagittarius();
        let mut sim = Simulation::new(central);
        sim.relativistic = false;

        let r = 1000.0 * central.rs;
        sim.particles.push(circular_setup(&central, r));

        let period = std::f64::consts::TAU * r / central.orbital_speed(r);
        let dt = period / 1000.0;
        for _ in 0..1000 {
            sim.step(dt);
        }

        let radius = sim.particles[0].position.length();
        assert!(
            (radius - r).abs() / r < 0.01,
            "orbit radius drifted to {radius:e}"
        );
        assert!(sim.particles[0].active);
    }

    #[test]
    fn rk4_beats_euler_on_energy_drift() {
        let euler = energy_drift(Integrator::Euler, 500);
        let rk4 = energy_drift(Integrator::Rk4, 500);
        assert!(rk4 < euler, "rk4 drift {rk4} not below euler drift {euler}");
    }

    #[test]
    fn rk2_beats_euler_on_energy_drift() {
        let euler = energy_drift(Integrator::Euler, 500);
        let rk2 = energy_drift(Integrator::Rk2, 500);
        assert!(rk2 < euler);
    }

    #[test]
    fn verlet_energy_drift_stays_bounded() {
        let drift = energy_drift(Integrator::Verlet, 5000);
        assert!(drift < 0.01, "verlet drift {drift}");
    }

    #[test]
    fn horizon_deactivates_particles() {
        let central = sagittarius();
        let mut sim = Simulation::new(central);
        sim.particles.push(Particle::new(
            DVec3::new(0.5 * central.rs, 0.0, 0.0),
            DVec3::ZERO,
            1e22,
        ));
        sim.step(1.0);
        assert!(!sim.particles[0].active);
        assert_eq!(sim.active_count(), 0);
    }

    #[test]
    fn velocity_cap_applies() {
        let central = sagittarius();
        let mut sim = Simulation::new(central);
        let r = 1000.0 * central.rs;
        sim.particles.push(Particle::new(
            DVec3::new(r, 0.0, 0.0),
            DVec3::new(0.0, 0.0, 0.9 * C),
            1e22,
        ));
        sim.step(1.0);
        let speed = sim.particles[0].velocity.length();
        assert!(speed <= MAX_VELOCITY_FRACTION * C * 1.0001, "speed {speed:e}");
    }

    #[test]
    fn integrator_knob_cycles_through_all_methods() {
        let mut m = Integrator::Euler;
        let mut seen = vec![m.name()];
        for _ in 0..3 {
            m = m.next();
            seen.push(m.name());
        }
        assert_eq!(seen, ["euler", "rk2", "rk4", "verlet"]);
        assert_eq!(m.next(), Integrator::Euler);
    }

    #[test]
    fn circular_orbit_is_bound_with_low_eccentricity() {
        let central = sagittarius();
        let sim = Simulation::new(central);
        let particle = circular_setup(&central, 500.0 * central.rs);
        let elements = sim.orbital_elements(&particle);
        assert!(elements.is_bound);
        assert!(elements.eccentricity < 1e-6, "e = {}", elements.eccentricity);
        assert!(elements.specific_angular_momentum > 0.0);
    }

    #[test]
    fn spawned_disk_particles_are_bound() {
        let central = sagittarius();
        let mut sim = Simulation::new(central);
        let mut rng = StdRng::seed_from_u64(7);
        sim.spawn_disk(64, 3.0 * central.rs, 10.0 * central.rs, &mut rng);
        assert_eq!(sim.particles.len(), 64);
        for p in &sim.particles {
            let elements = sim.orbital_elements(p);
            assert!(elements.is_bound, "unbound spawn at {:?}", p.position);
        }
    }

    #[test]
    fn coasting_ignores_gravity() {
        let central = sagittarius();
        let mut sim = Simulation::new(central);
        let v = DVec3::new(0.0, 0.0, 1e6);
        sim.particles
            .push(Particle::new(DVec3::new(1e12, 0.0, 0.0), v, 1e22));
        sim.coast(10.0);
        assert_eq!(sim.particles[0].velocity, v);
        assert_eq!(
            sim.particles[0].position,
            DVec3::new(1e12, 0.0, 1e7)
        );
    }
}
