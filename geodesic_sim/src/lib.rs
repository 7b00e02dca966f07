//! Real-time Schwarzschild black hole renderer.
//!
//! Camera rays are marched through the Schwarzschild metric in a compute
//! shader, sampling the accretion disk and ancillary occluders, and the
//! result is composited over a CPU-built curvature grid. The same
//! geodesic stepper exists on the CPU (`geodesic`) where it serves as
//! the numerical oracle for the test suite.

pub mod config;
pub mod geodesic;
pub mod grid;
pub mod profiler;
pub mod renderer;
pub mod scene;
pub mod shader;

use std::time::{Duration, Instant};

use common::{projection_matrix, FreeCamera, GraphicsContext, OrbitCamera};
use grid::CurvatureGrid;
use profiler::Profiler;
use renderer::{CameraBlock, DiskBlock, GeodesicRenderer, ObjectsBlock};
use scene::Scene;
use winit::{
    event::{ElementState, Event, KeyEvent, MouseButton, MouseScrollDelta, WindowEvent},
    event_loop::ControlFlow,
    keyboard::{KeyCode, PhysicalKey},
};

#[derive(Debug, Clone, Copy, PartialEq)]
enum CameraMode {
    Orbit,
    Free,
}

/// Held-key state for the free-fly mode
#[derive(Debug, Default)]
struct FlyInput {
    forward: bool,
    back: bool,
    left: bool,
    right: bool,
    up: bool,
    down: bool,
}

impl FlyInput {
    fn axes(&self) -> (f32, f32, f32) {
        let axis = |pos: bool, neg: bool| (pos as i32 - neg as i32) as f32;
        (
            axis(self.forward, self.back),
            axis(self.right, self.left),
            axis(self.up, self.down),
        )
    }

    fn any(&self) -> bool {
        self.forward || self.back || self.left || self.right || self.up || self.down
    }
}

// Field order matters at teardown: the renderer's GPU handles must be
// released before the context that owns the device and window.
struct App {
    renderer: GeodesicRenderer,
    ctx: GraphicsContext,
    scene: Scene,
    grid: CurvatureGrid,
    orbit: OrbitCamera,
    free: FreeCamera,
    mode: CameraMode,
    fly_input: FlyInput,
    cursor: (f64, f64),
    profiler: Profiler,
}

impl App {
    fn new(ctx: GraphicsContext) -> Result<Self, renderer::RenderInitError> {
        let scene = Scene::sagittarius();
        geodesic::self_check(&scene);

        let grid = CurvatureGrid::new();
        let renderer = GeodesicRenderer::new(&ctx, &config::shader_dir(), &grid)?;
        let orbit = OrbitCamera::new();
        let free = FreeCamera::new(orbit.position());

        Ok(Self {
            renderer,
            ctx,
            scene,
            grid,
            orbit,
            free,
            mode: CameraMode::Orbit,
            fly_input: FlyInput::default(),
            cursor: (0.0, 0.0),
            profiler: Profiler::new(),
        })
    }

    fn resize(&mut self, new_size: winit::dpi::PhysicalSize<u32>) {
        self.ctx.resize(new_size);
    }

    fn update(&mut self, dt: f32) {
        match self.mode {
            CameraMode::Orbit => self.orbit.update(),
            CameraMode::Free => {
                let (fwd, strafe, vertical) = self.fly_input.axes();
                self.free.translate(fwd, strafe, vertical, dt);
            }
        }
    }

    fn camera_moving(&self) -> bool {
        match self.mode {
            CameraMode::Orbit => self.orbit.moving,
            CameraMode::Free => self.fly_input.any(),
        }
    }

    fn render(&mut self) -> Result<(), wgpu::SurfaceError> {
        // 1. Grid geometry from the current scene
        self.grid.rebuild(&self.scene);

        // 2. Camera matrices
        let aspect = self.ctx.aspect_ratio();
        let (view, position, basis) = match self.mode {
            CameraMode::Orbit => (
                self.orbit.view_matrix(),
                self.orbit.position(),
                self.orbit.basis(),
            ),
            CameraMode::Free => (
                self.free.view_matrix(),
                self.free.position,
                self.free.basis(),
            ),
        };
        let proj = projection_matrix(
            config::FOV_DEGREES.to_radians(),
            aspect,
            config::NEAR_PLANE,
            config::FAR_PLANE,
        );
        let view_proj = proj * view;

        // 3. Compute target tracks camera motion; reallocate only on change
        let moving = self.camera_moving();
        if self.renderer.ensure_compute_target(&self.ctx, moving) {
            let (w, h) = self.renderer.compute_extent();
            log::debug!("compute target now {w}x{h}");
        }

        // 4. Uniform blocks
        let camera_block = CameraBlock::new(position, basis, config::FOV_DEGREES, aspect, moving);
        let disk_block = DiskBlock::from_scene(&self.scene);
        let objects_block = ObjectsBlock::from_scene(&self.scene);
        self.renderer
            .update_uniforms(&self.ctx.queue, &camera_block, &disk_block, &objects_block);
        self.renderer
            .upload_grid(&self.ctx.queue, &self.grid, view_proj);

        // 5. Encode and submit: grid overlay, compute, present
        let output = self.ctx.surface.get_current_texture()?;
        let target = output
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());

        self.profiler.begin_encode();
        let mut encoder = self
            .ctx
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Frame Encoder"),
            });
        self.renderer.encode_frame(&mut encoder, &target);
        self.profiler.end_encode();

        self.ctx.queue.submit(std::iter::once(encoder.finish()));
        output.present();

        self.orbit.end_frame();
        Ok(())
    }

    fn handle_key(&mut self, key: KeyCode, state: ElementState) {
        let pressed = state == ElementState::Pressed;
        match key {
            KeyCode::KeyW => self.fly_input.forward = pressed,
            KeyCode::KeyS => self.fly_input.back = pressed,
            KeyCode::KeyA => self.fly_input.left = pressed,
            KeyCode::KeyD => self.fly_input.right = pressed,
            KeyCode::KeyQ => self.fly_input.up = pressed,
            KeyCode::KeyE => self.fly_input.down = pressed,
            KeyCode::KeyG if pressed => self.scene.toggle_gravity(),
            KeyCode::KeyF if pressed => {
                self.mode = match self.mode {
                    CameraMode::Orbit => {
                        self.free.position = self.orbit.position();
                        CameraMode::Free
                    }
                    CameraMode::Free => CameraMode::Orbit,
                };
                log::info!("camera mode: {:?}", self.mode);
            }
            _ => {}
        }
    }

    fn handle_mouse_button(&mut self, button: MouseButton, state: ElementState) {
        match button {
            MouseButton::Left | MouseButton::Middle => {
                if state == ElementState::Pressed {
                    self.orbit.begin_drag(self.cursor.0, self.cursor.1);
                } else {
                    self.orbit.end_drag();
                }
            }
            MouseButton::Right => {
                if state == ElementState::Pressed {
                    self.scene.toggle_gravity();
                }
            }
            _ => {}
        }
    }

    fn handle_scroll(&mut self, scroll: f32) {
        if self.mode == CameraMode::Orbit {
            self.orbit.process_scroll(scroll);
        }
    }

    /// Drain outstanding GPU work before teardown; a timeout here is
    /// logged but never fatal
    fn shutdown(&self) {
        if !self.ctx.wait_idle(Duration::from_secs(1)) {
            log::warn!("timed out waiting for the GPU to go idle before shutdown");
        }
        log::info!("rendered {} frames", self.profiler.frame_count());
    }
}

/// Bring up the window and GPU, then run the render loop until the user
/// quits. Exits the process with status 1 on any initialization failure.
pub fn run() {
    let (ctx, event_loop) = match pollster::block_on(GraphicsContext::new(
        "Black Hole",
        config::WIDTH,
        config::HEIGHT,
    )) {
        Ok(v) => v,
        Err(e) => {
            log::error!("initialization failed: {e}");
            std::process::exit(1);
        }
    };

    let mut app = match App::new(ctx) {
        Ok(app) => app,
        Err(e) => {
            log::error!("initialization failed: {e}");
            std::process::exit(1);
        }
    };

    let mut last_time = Instant::now();

    let result = event_loop.run(move |event, elwt| {
        elwt.set_control_flow(ControlFlow::Poll);

        match event {
            Event::WindowEvent { event, .. } => match event {
                WindowEvent::CloseRequested => {
                    app.shutdown();
                    elwt.exit();
                }
                WindowEvent::Resized(size) => app.resize(size),
                WindowEvent::MouseInput { state, button, .. } => {
                    app.handle_mouse_button(button, state);
                }
                WindowEvent::CursorMoved { position, .. } => {
                    app.cursor = (position.x, position.y);
                    app.orbit.process_mouse_move(position.x, position.y);
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
                    app.handle_scroll(scroll);
                }
                WindowEvent::RedrawRequested => {
                    let now = Instant::now();
                    let dt = (now - last_time).as_secs_f32().min(0.1);
                    last_time = now;

                    app.profiler.begin_frame();
                    app.profiler.begin_update();
                    app.update(dt);
                    app.profiler.end_update();

                    let outcome = app.render();
                    app.profiler.end_frame();
                    match outcome {
                        Ok(_) => {}
                        Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                            app.resize(app.ctx.size)
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
