//! Newtonian N-body particle demo around the black hole.
//!
//! A standalone sibling of the geodesic renderer: particles orbit the
//! central mass under selectable integration methods and are drawn as
//! instanced billboards. It shares the window/camera plumbing but does
//! not interact with the geodesic path.

pub mod physics;
pub mod renderer;

use std::time::{Duration, Instant};

use common::{projection_matrix, GraphicsContext, OrbitCamera};
use glam::DVec3;
use physics::{CentralMass, Simulation};
use rand::rngs::StdRng;
use rand::SeedableRng;
use renderer::ParticleRenderer;
use winit::{
    event::{ElementState, Event, KeyEvent, MouseButton, MouseScrollDelta, WindowEvent},
    event_loop::ControlFlow,
    keyboard::{KeyCode, PhysicalKey},
};

const WIDTH: u32 = 800;
const HEIGHT: u32 = 600;
const FOV_DEGREES: f32 = 60.0;
const NEAR_PLANE: f32 = 1e9;
const FAR_PLANE: f32 = 1e14;

/// Simulated seconds per wall-clock second
const TIME_SCALE: f64 = 200.0;

const PARTICLE_COUNT: usize = 2000;

// Renderer before context so GPU handles are released first at teardown
struct App {
    renderer: ParticleRenderer,
    ctx: GraphicsContext,
    sim: Simulation,
    camera: OrbitCamera,
    cursor: (f64, f64),
    paused: bool,
    gravity_enabled: bool,
    rng: StdRng,
}

impl App {
    fn new(ctx: GraphicsContext) -> Self {
        let central = CentralMass::new(DVec3::ZERO, 8.54e36);
        let mut sim = Simulation::new(central);
        let mut rng = StdRng::seed_from_u64(0x5eed);
        sim.spawn_disk(PARTICLE_COUNT, 3.0 * central.rs, 12.0 * central.rs, &mut rng);

        let renderer = ParticleRenderer::new(&ctx, PARTICLE_COUNT);

        Self {
            renderer,
            ctx,
            sim,
            camera: OrbitCamera::new(),
            cursor: (0.0, 0.0),
            paused: false,
            gravity_enabled: true,
            rng,
        }
    }

    fn update(&mut self, dt: f32) {
        self.camera.update();
        if self.paused {
            return;
        }
        let sim_dt = dt as f64 * TIME_SCALE;
        if self.gravity_enabled {
            self.sim.step(sim_dt);
        } else {
            self.sim.coast(sim_dt);
        }
    }

    fn render(&mut self) -> Result<(), wgpu::SurfaceError> {
        let projection = projection_matrix(
            FOV_DEGREES.to_radians(),
            self.ctx.aspect_ratio(),
            NEAR_PLANE,
            FAR_PLANE,
        );
        self.renderer.update_camera(&self.ctx.queue, &self.camera, projection);

        // update_instances needs &ctx while self.renderer is borrowed
        // mutably, so split the borrows explicitly
        let Self { ctx, renderer, sim, .. } = self;
        renderer.update_instances(ctx, sim);

        let output = self.ctx.surface.get_current_texture()?;
        let view = output
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());

        let mut encoder = self
            .ctx
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Particle Frame Encoder"),
            });
        self.renderer.render(&mut encoder, &view);
        self.ctx.queue.submit(std::iter::once(encoder.finish()));
        output.present();

        self.camera.end_frame();
        Ok(())
    }

    fn toggle_gravity(&mut self) {
        self.gravity_enabled = !self.gravity_enabled;
        log::info!(
            "gravity {}",
            if self.gravity_enabled { "ON" } else { "OFF" }
        );
    }

    fn respawn(&mut self) {
        let rs = self.sim.central.rs;
        let Self { sim, rng, .. } = self;
        sim.spawn_disk(PARTICLE_COUNT, 3.0 * rs, 12.0 * rs, rng);
        match self.renderer.buffer_capacity("particles") {
            Ok(capacity) => log::info!(
                "respawned {PARTICLE_COUNT} particles (instance capacity {capacity} bytes)"
            ),
            Err(e) => log::warn!("{e}"),
        }
    }

    fn handle_key(&mut self, key: KeyCode, state: ElementState) {
        if state != ElementState::Pressed {
            return;
        }
        match key {
            KeyCode::Space => self.paused = !self.paused,
            KeyCode::KeyG => self.toggle_gravity(),
            KeyCode::KeyR => self.respawn(),
            KeyCode::KeyI => {
                self.sim.integrator = self.sim.integrator.next();
                log::info!("integrator: {}", self.sim.integrator.name());
            }
            _ => {}
        }
    }

    fn shutdown(&self) {
        if !self.ctx.wait_idle(Duration::from_secs(1)) {
            log::warn!("timed out waiting for the GPU to go idle before shutdown");
        }
        log::info!("{} particles still active", self.sim.active_count());
    }
}

/// Run the particle demo until the user quits. Exits the process with
/// status 1 on initialization failure.
pub fn run() {
    let (ctx, event_loop) = match pollster::block_on(GraphicsContext::new(
        "Particles",
        WIDTH,
        HEIGHT,
    )) {
        Ok(v) => v,
        Err(e) => {
            log::error!("initialization failed: {e}");
            std::process::exit(1);
        }
    };

    let mut app = App::new(ctx);
    let mut last_time = Instant::now();

    let result = event_loop.run(move |event, elwt| {
        elwt.set_control_flow(ControlFlow::Poll);

        match event {
            Event::WindowEvent { event, .. } => match event {
                WindowEvent::CloseRequested => {
                    app.shutdown();
                    elwt.exit();
                }
                WindowEvent::Resized(size) => app.ctx.resize(size),
                WindowEvent::MouseInput { state, button, .. } => match button {
                    MouseButton::Left | MouseButton::Middle => {
                        if state == ElementState::Pressed {
                            app.camera.begin_drag(app.cursor.0, app.cursor.1);
                        } else {
                            app.camera.end_drag();
                        }
                    }
                    MouseButton::Right => {
                        if state == ElementState::Pressed {
                            app.toggle_gravity();
                        }
                    }
                    _ => {}
                },
                WindowEvent::CursorMoved { position, .. } => {
                    app.cursor = (position.x, position.y);
                    app.camera.process_mouse_move(position.x, position.y);
                }
                WindowEvent::KeyboardInput {
                    event:
                        KeyEvent {
                            physical_key: PhysicalKey::Code(key),
                            state,
                            ..
                        },
                    ..
                } => {
                    if key == KeyCode::Escape && state == ElementState::Pressed {
                        app.shutdown();
                        elwt.exit();
                    } else {
                        app.handle_key(key, state);
                    }
                }
                WindowEvent::MouseWheel { delta, .. } => {
                    let scroll = match delta {
                        MouseScrollDelta::LineDelta(_, y) => y,
                        MouseScrollDelta::PixelDelta(pos) => pos.y as f32 / 100.0,
                    };
                    app.camera.process_scroll(scroll);
                }
                WindowEvent::RedrawRequested => {
                    let now = Instant::now();
                    let dt = (now - last_time).as_secs_f32().min(0.1);
                    last_time = now;

                    app.update(dt);
                    match app.render() {
                        Ok(_) => {}
                        Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                            app.ctx.resize(app.ctx.size)
                        }
                        Err(wgpu::SurfaceError::OutOfMemory) => {
                            log::error!("out of GPU memory");
                            elwt.exit();
                        }
                        Err(e) => log::warn!("render error: {e:?}"),
                    }
                }
                _ => {}
            },
            Event::AboutToWait => {
                app.ctx.window.request_redraw();
            }
            _ => {}
        }
    });

    if let Err(e) = result {
        log::error!("event loop error: {e}");
        std::process::exit(1);
    }
}
