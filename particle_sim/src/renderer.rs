//! Instanced billboard renderer for the particle demo.
//!
//! Instance data lives in a growable vertex buffer: uploads that fit the
//! current capacity are plain sub-writes; larger uploads reallocate with
//! a 1.5x growth factor.

use common::{GraphicsContext, Handle, HandleTable, LookupError, OrbitCamera};
use glam::Mat4;

use crate::physics::Simulation;

/// Capacity growth policy: fit the request, or grow by half, whichever
/// is larger
pub fn grown_capacity(current: usize, needed: usize) -> usize {
    needed.max((current * 3).div_ceil(2))
}

/// A vertex buffer that reallocates as its contents grow
pub struct GrowableBuffer {
    buffer: wgpu::Buffer,
    capacity: usize,
    usage: wgpu::BufferUsages,
    label: &'static str,
}

impl GrowableBuffer {
    pub fn new(
        device: &wgpu::Device,
        label: &'static str,
        capacity: usize,
        usage: wgpu::BufferUsages,
    ) -> Self {
        let usage = usage | wgpu::BufferUsages::COPY_DST;
        Self {
            buffer: Self::allocate(device, label, capacity, usage),
            capacity,
            usage,
            label,
        }
    }

    fn allocate(
        device: &wgpu::Device,
        label: &str,
        capacity: usize,
        usage: wgpu::BufferUsages,
    ) -> wgpu::Buffer {
        device.create_buffer(&wgpu::BufferDescriptor {
            label: Some(label),
            size: capacity.max(1) as u64,
            usage,
            mapped_at_creation: false,
        })
    }

    /// Upload `data`, growing the buffer first if it does not fit.
    /// Returns whether a reallocation happened.
    pub fn upload(&mut self, device: &wgpu::Device, queue: &wgpu::Queue, data: &[u8]) -> bool {
        let reallocated = if data.len() > self.capacity {
            self.capacity = grown_capacity(self.capacity, data.len());
            self.buffer = Self::allocate(device, self.label, self.capacity, self.usage);
            true
        } else {
            false
        };
        if !data.is_empty() {
            queue.write_buffer(&self.buffer, 0, data);
        }
        reallocated
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn slice(&self) -> wgpu::BufferSlice<'_> {
        self.buffer.slice(..)
    }
}

/// Instance data for one particle billboard
#[repr(C)]
#[derive(Copy, Clone, Debug, bytemuck::Pod, bytemuck::Zeroable)]
pub struct ParticleInstance {
    pub position: [f32; 3],
    pub radius: f32,
    pub color: [f32; 4],
}

impl ParticleInstance {
    const ATTRIBS: [wgpu::VertexAttribute; 3] = wgpu::vertex_attr_array![
        1 => Float32x3,
        2 => Float32,
        3 => Float32x4,
    ];

    pub fn layout() -> wgpu::VertexBufferLayout<'static> {
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<ParticleInstance>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Instance,
            attributes: &Self::ATTRIBS,
        }
    }
}

#[repr(C)]
#[derive(Copy, Clone, Debug, bytemuck::Pod, bytemuck::Zeroable)]
pub struct QuadVertex {
    pub corner: [f32; 2],
}

impl QuadVertex {
    const ATTRIBS: [wgpu::VertexAttribute; 1] = wgpu::vertex_attr_array![0 => Float32x2];

    pub fn layout() -> wgpu::VertexBufferLayout<'static> {
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<QuadVertex>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &Self::ATTRIBS,
        }
    }
}

const QUAD_VERTICES: &[QuadVertex] = &[
    QuadVertex { corner: [-1.0, -1.0] },
    QuadVertex { corner: [1.0, -1.0] },
    QuadVertex { corner: [1.0, 1.0] },
    QuadVertex { corner: [-1.0, -1.0] },
    QuadVertex { corner: [1.0, 1.0] },
    QuadVertex { corner: [-1.0, 1.0] },
];

/// Camera uniform: view-projection plus the billboard basis
#[repr(C)]
#[derive(Copy, Clone, Debug, bytemuck::Pod, bytemuck::Zeroable)]
struct ParticleCameraUniform {
    view_proj: [[f32; 4]; 4],
    right: [f32; 4],
    up: [f32; 4],
}

pub struct ParticleRenderer {
    pipeline: wgpu::RenderPipeline,
    quad_buffer: wgpu::Buffer,
    camera_buffer: wgpu::Buffer,
    camera_bind_group: wgpu::BindGroup,
    buffers: HandleTable<GrowableBuffer>,
    instances: Handle<GrowableBuffer>,
    instance_count: u32,
}

impl ParticleRenderer {
    pub fn new(ctx: &GraphicsContext, initial_capacity: usize) -> Self {
        use wgpu::util::DeviceExt;
        let device = &ctx.device;

        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("Particle Shader"),
            source: wgpu::ShaderSource::Wgsl(include_str!("shaders/particle.wgsl").into()),
        });

        let camera_buffer = common::create_uniform_buffer::<ParticleCameraUniform>(
            device,
            "Particle Camera Buffer",
        );

        let camera_bind_group_layout =
            device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                label: Some("Particle Camera Bind Group Layout"),
                entries: &[wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::VERTEX,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Uniform,
                        has_dynamic_offset: false,
                        min_binding_size: None,
                    },
                    count: None,
                }],
            });

        let camera_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Particle Camera Bind Group"),
            layout: &camera_bind_group_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: camera_buffer.as_entire_binding(),
            }],
        });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Particle Pipeline Layout"),
            bind_group_layouts: &[&camera_bind_group_layout],
            push_constant_ranges: &[],
        });

        let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("Particle Pipeline"),
            layout: Some(&pipeline_layout),
            vertex: wgpu::VertexState {
                module: &shader,
                entry_point: "vs_particle",
                buffers: &[QuadVertex::layout(), ParticleInstance::layout()],
                compilation_options: Default::default(),
            },
            fragment: Some(wgpu::FragmentState {
                module: &shader,
                entry_point: "fs_particle",
                targets: &[Some(wgpu::ColorTargetState {
                    format: ctx.config.format,
                    blend: Some(wgpu::BlendState::ALPHA_BLENDING),
                    write_mask: wgpu::ColorWrites::ALL,
                })],
                compilation_options: Default::default(),
            }),
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleList,
                strip_index_format: None,
                front_face: wgpu::FrontFace::Ccw,
                cull_mode: None,
                polygon_mode: wgpu::PolygonMode::Fill,
                unclipped_depth: false,
                conservative: false,
            },
            depth_stencil: None,
            multisample: wgpu::MultisampleState::default(),
            multiview: None,
        });

        let quad_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Particle Quad Buffer"),
            contents: bytemuck::cast_slice(QUAD_VERTICES),
            usage: wgpu::BufferUsages::VERTEX,
        });

        let mut buffers = HandleTable::new();
        let instances = buffers.register(
            "particles",
            GrowableBuffer::new(
                device,
                "Particle Instances",
                initial_capacity * std::mem::size_of::<ParticleInstance>(),
                wgpu::BufferUsages::VERTEX,
            ),
        );

        Self {
            pipeline,
            quad_buffer,
            camera_buffer,
            camera_bind_group,
            buffers,
            instances,
            instance_count: 0,
        }
    }

    pub fn update_camera(&self, queue: &wgpu::Queue, camera: &OrbitCamera, projection: Mat4) {
        let (right, up, _) = camera.basis();
        let uniform = ParticleCameraUniform {
            view_proj: (projection * camera.view_matrix()).to_cols_array_2d(),
            right: [right.x, right.y, right.z, 0.0],
            up: [up.x, up.y, up.z, 0.0],
        };
        queue.write_buffer(&self.camera_buffer, 0, bytemuck::bytes_of(&uniform));
    }

    /// Pack active particles into the instance buffer
    pub fn update_instances(&mut self, ctx: &GraphicsContext, sim: &Simulation) {
        let rs = sim.central.rs as f32;
        let instances: Vec<ParticleInstance> = sim
            .particles
            .iter()
            .filter(|p| p.active)
            .map(|p| {
                // Size and tint scale with mass
                let t = ((p.mass.log10() - 20.0) / 4.0).clamp(0.0, 1.0) as f32;
                ParticleInstance {
                    position: [
                        p.position.x as f32,
                        p.position.y as f32,
                        p.position.z as f32,
                    ],
                    radius: rs * (0.02 + 0.05 * t),
                    color: [0.6 + 0.4 * t, 0.7, 1.0 - 0.5 * t, 0.9],
                }
            })
            .collect();
        self.instance_count = instances.len() as u32;

        let grew = self.buffers.get_mut(self.instances).upload(
            &ctx.device,
            &ctx.queue,
            bytemuck::cast_slice(&instances),
        );
        if grew {
            log::debug!(
                "instance buffer grew to {} bytes",
                self.buffers.get(self.instances).capacity()
            );
        }
    }

    /// Checked debug-path lookup into the buffer table
    pub fn buffer_capacity(&self, name: &str) -> Result<usize, LookupError> {
        let handle = self.buffers.lookup(name)?;
        Ok(self.buffers.get(handle).capacity())
    }

    pub fn render(&self, encoder: &mut wgpu::CommandEncoder, view: &wgpu::TextureView) {
        let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("Particle Pass"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view,
                resolve_target: None,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Clear(wgpu::Color {
                        r: 0.01,
                        g: 0.01,
                        b: 0.03,
                        a: 1.0,
                    }),
                    store: wgpu::StoreOp::Store,
                },
            })],
            depth_stencil_attachment: None,
            timestamp_writes: None,
            occlusion_query_set: None,
        });

        pass.set_pipeline(&self.pipeline);
        pass.set_bind_group(0, &self.camera_bind_group, &[]);
        pass.set_vertex_buffer(0, self.quad_buffer.slice(..));
        pass.set_vertex_buffer(1, self.buffers.get(self.instances).slice());
        pass.draw(0..QUAD_VERTICES.len() as u32, 0..self.instance_count);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn growth_policy_takes_the_larger_of_fit_and_half_growth() {
        // Slightly over capacity: 1.5x wins
        assert_eq!(grown_capacity(1000, 1001), 1500);
        // Far over capacity: the request wins
        assert_eq!(grown_capacity(1000, 4000), 4000);
        // Rounds up
        assert_eq!(grown_capacity(3, 4), 5);
        assert_eq!(grown_capacity(0, 8), 8);
    }

    #[test]
    fn instance_layout_is_tightly_packed() {
        assert_eq!(std::mem::size_of::<ParticleInstance>(), 32);
        assert_eq!(std::mem::size_of::<QuadVertex>(), 8);
    }
}
