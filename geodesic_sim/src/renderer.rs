//! GPU pipeline manager: owns every GPU handle, the three fixed-layout
//! uniform blocks, the adaptive compute target, and the per-frame pass
//! encoding.

use std::path::Path;

use common::GraphicsContext;
use glam::Mat4;

use crate::config::{
    COMPUTE_DYNAMIC_H, COMPUTE_DYNAMIC_W, COMPUTE_STATIC_H, COMPUTE_STATIC_W, MAX_OBJECTS,
    WORKGROUP_SIZE,
};
use crate::grid::CurvatureGrid;
use crate::scene::Scene;
use crate::shader::{self, ShaderError};

#[derive(Debug, thiserror::Error)]
pub enum RenderInitError {
    #[error(transparent)]
    Shader(#[from] ShaderError),
    #[error("GPU resource allocation failed: {0}")]
    Allocation(String),
}

/// Camera uniform block: binding 1, 128 bytes.
///
/// Offsets are part of the shader contract: basis vectors at 0/16/32/48,
/// tan(fov/2) at 64, aspect at 68, moving flag at 72, zero padding to 128.
#[repr(C)]
#[derive(Copy, Clone, Debug, bytemuck::Pod, bytemuck::Zeroable)]
pub struct CameraBlock {
    pub position: [f32; 3],
    _pad0: f32,
    pub right: [f32; 3],
    _pad1: f32,
    pub up: [f32; 3],
    _pad2: f32,
    pub forward: [f32; 3],
    _pad3: f32,
    pub tan_half_fov: f32,
    pub aspect: f32,
    pub moving: f32,
    _tail: [f32; 13],
}

impl CameraBlock {
    pub fn new(
        position: glam::Vec3,
        basis: (glam::Vec3, glam::Vec3, glam::Vec3),
        fov_degrees: f32,
        aspect: f32,
        moving: bool,
    ) -> Self {
        let (right, up, forward) = basis;
        Self {
            position: position.to_array(),
            _pad0: 0.0,
            right: right.to_array(),
            _pad1: 0.0,
            up: up.to_array(),
            _pad2: 0.0,
            forward: forward.to_array(),
            _pad3: 0.0,
            tan_half_fov: (fov_degrees.to_radians() * 0.5).tan(),
            aspect,
            moving: if moving { 1.0 } else { 0.0 },
            _tail: [0.0; 13],
        }
    }
}

/// Disk uniform block: binding 2, 16 bytes of (r1, r2, num, thk)
#[repr(C)]
#[derive(Copy, Clone, Debug, bytemuck::Pod, bytemuck::Zeroable)]
pub struct DiskBlock {
    pub r1: f32,
    pub r2: f32,
    pub num: f32,
    pub thickness: f32,
}

impl DiskBlock {
    pub fn from_scene(scene: &Scene) -> Self {
        Self {
            r1: scene.disk.r1 as f32,
            r2: scene.disk.r2 as f32,
            num: scene.disk.arms as f32,
            thickness: scene.disk.thickness as f32,
        }
    }
}

/// Objects uniform block: binding 3.
///
/// An i32 count padded to 16 bytes, then parallel vec4-aligned arrays:
/// (position, radius), color (a = 1), and the scalar mass padded out to
/// a vec4 per entry.
#[repr(C)]
#[derive(Copy, Clone, Debug, bytemuck::Pod, bytemuck::Zeroable)]
pub struct ObjectsBlock {
    pub count: i32,
    _pad: [i32; 3],
    pub pos_radius: [[f32; 4]; MAX_OBJECTS],
    pub color: [[f32; 4]; MAX_OBJECTS],
    pub mass: [[f32; 4]; MAX_OBJECTS],
}

impl ObjectsBlock {
    pub fn from_scene(scene: &Scene) -> Self {
        let mut block = Self::zeroed_block();
        let count = scene.objects.len().min(MAX_OBJECTS);
        block.count = count as i32;
        for (i, obj) in scene.objects.iter().take(count).enumerate() {
            block.pos_radius[i] = [
                obj.position.x as f32,
                obj.position.y as f32,
                obj.position.z as f32,
                obj.radius as f32,
            ];
            block.color[i] = [obj.color.x, obj.color.y, obj.color.z, 1.0];
            block.mass[i] = [obj.mass as f32, 0.0, 0.0, 0.0];
        }
        block
    }

    fn zeroed_block() -> Self {
        bytemuck::Zeroable::zeroed()
    }
}

/// Compute target size for the current camera state: full quality while
/// idle, half resolution while the user is manipulating the view.
pub fn target_extent(moving: bool) -> (u32, u32) {
    if moving {
        (COMPUTE_DYNAMIC_W, COMPUTE_DYNAMIC_H)
    } else {
        (COMPUTE_STATIC_W, COMPUTE_STATIC_H)
    }
}

/// Workgroups needed to cover the target with 16x16 local invocations
pub fn workgroup_count(extent: (u32, u32)) -> (u32, u32) {
    (
        extent.0.div_ceil(WORKGROUP_SIZE),
        extent.1.div_ceil(WORKGROUP_SIZE),
    )
}

/// The extent the compute texture should have for the camera state, or
/// `None` when the current texture already fits
pub fn needs_reallocation(current: (u32, u32), moving: bool) -> Option<(u32, u32)> {
    let wanted = target_extent(moving);
    (wanted != current).then_some(wanted)
}

/// View-projection uniform for the grid pass
#[repr(C)]
#[derive(Copy, Clone, Debug, bytemuck::Pod, bytemuck::Zeroable)]
struct GridUniform {
    view_proj: [[f32; 4]; 4],
}

pub struct GeodesicRenderer {
    compute_pipeline: wgpu::ComputePipeline,
    present_pipeline: wgpu::RenderPipeline,
    grid_pipeline: wgpu::RenderPipeline,

    camera_buffer: wgpu::Buffer,
    disk_buffer: wgpu::Buffer,
    objects_buffer: wgpu::Buffer,
    grid_uniform_buffer: wgpu::Buffer,
    grid_vertex_buffer: wgpu::Buffer,
    grid_index_buffer: wgpu::Buffer,
    grid_index_count: u32,

    compute_layout: wgpu::BindGroupLayout,
    present_layout: wgpu::BindGroupLayout,
    grid_bind_group: wgpu::BindGroup,
    compute_bind_group: wgpu::BindGroup,
    present_bind_group: wgpu::BindGroup,

    compute_texture: wgpu::Texture,
    compute_extent: (u32, u32),
    sampler: wgpu::Sampler,
}

impl GeodesicRenderer {
    pub fn new(
        ctx: &GraphicsContext,
        shader_dir: &Path,
        grid: &CurvatureGrid,
    ) -> Result<Self, RenderInitError> {
        let device = &ctx.device;

        let geodesic_module = shader::load_module(device, shader_dir, "geodesic.wgsl")?;
        let present_module = shader::load_module(device, shader_dir, "present.wgsl")?;
        let grid_module = shader::load_module(device, shader_dir, "grid.wgsl")?;

        // Everything below is plain allocation; surface an out-of-memory
        // condition instead of deferring the failure to first use.
        device.push_error_scope(wgpu::ErrorFilter::OutOfMemory);

        let camera_buffer = common::create_uniform_buffer::<CameraBlock>(device, "Camera Block");
        let disk_buffer = common::create_uniform_buffer::<DiskBlock>(device, "Disk Block");
        let objects_buffer = common::create_uniform_buffer::<ObjectsBlock>(device, "Objects Block");
        let grid_uniform_buffer =
            common::create_uniform_buffer::<GridUniform>(device, "Grid ViewProj");

        let grid_vertex_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Grid Vertices"),
            size: grid.vertex_bytes().len() as u64,
            usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        // The line-list topology never changes; upload the indices once
        let grid_index_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Grid Indices"),
            size: grid.index_bytes().len() as u64,
            usage: wgpu::BufferUsages::INDEX | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        ctx.queue
            .write_buffer(&grid_index_buffer, 0, grid.index_bytes());

        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("Compute Target Sampler"),
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            ..Default::default()
        });

        let compute_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Compute Bind Group Layout"),
            entries: &[
                wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::COMPUTE,
                    ty: wgpu::BindingType::StorageTexture {
                        access: wgpu::StorageTextureAccess::WriteOnly,
                        format: wgpu::TextureFormat::Rgba8Unorm,
                        view_dimension: wgpu::TextureViewDimension::D2,
                    },
                    count: None,
                },
                uniform_entry(1),
                uniform_entry(2),
                uniform_entry(3),
            ],
        });

        let present_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Present Bind Group Layout"),
            entries: &[
                wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Texture {
                        multisampled: false,
                        view_dimension: wgpu::TextureViewDimension::D2,
                        sample_type: wgpu::TextureSampleType::Float { filterable: true },
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 1,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                    count: None,
                },
            ],
        });

        let grid_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Grid Bind Group Layout"),
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

        let compute_pipeline_layout =
            device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
                label: Some("Compute Pipeline Layout"),
                bind_group_layouts: &[&compute_layout],
                push_constant_ranges: &[],
            });
        let compute_pipeline = device.create_compute_pipeline(&wgpu::ComputePipelineDescriptor {
            label: Some("Geodesic Compute Pipeline"),
            layout: Some(&compute_pipeline_layout),
            module: &geodesic_module,
            entry_point: "main",
            compilation_options: Default::default(),
        });

        let present_pipeline_layout =
            device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
                label: Some("Present Pipeline Layout"),
                bind_group_layouts: &[&present_layout],
                push_constant_ranges: &[],
            });
        let present_pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("Present Pipeline"),
            layout: Some(&present_pipeline_layout),
            vertex: wgpu::VertexState {
                module: &present_module,
                entry_point: "vs_fullscreen",
                buffers: &[],
                compilation_options: Default::default(),
            },
            fragment: Some(wgpu::FragmentState {
                module: &present_module,
                entry_point: "fs_present",
                targets: &[Some(wgpu::ColorTargetState {
                    format: ctx.config.format,
                    // Escaped rays carry zero alpha so the grid drawn
                    // underneath stays visible through the background
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

        let grid_pipeline_layout =
            device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
                label: Some("Grid Pipeline Layout"),
                bind_group_layouts: &[&grid_layout],
                push_constant_ranges: &[],
            });
        let grid_pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("Grid Pipeline"),
            layout: Some(&grid_pipeline_layout),
            vertex: wgpu::VertexState {
                module: &grid_module,
                entry_point: "vs_grid",
                buffers: &[wgpu::VertexBufferLayout {
                    array_stride: (std::mem::size_of::<[f32; 3]>()) as wgpu::BufferAddress,
                    step_mode: wgpu::VertexStepMode::Vertex,
                    attributes: &[wgpu::VertexAttribute {
                        offset: 0,
                        shader_location: 0,
                        format: wgpu::VertexFormat::Float32x3,
                    }],
                }],
                compilation_options: Default::default(),
            },
            fragment: Some(wgpu::FragmentState {
                module: &grid_module,
                entry_point: "fs_grid",
                targets: &[Some(wgpu::ColorTargetState {
                    format: ctx.config.format,
                    blend: Some(wgpu::BlendState::ALPHA_BLENDING),
                    write_mask: wgpu::ColorWrites::ALL,
                })],
                compilation_options: Default::default(),
            }),
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::LineList,
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

        let grid_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Grid Bind Group"),
            layout: &grid_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: grid_uniform_buffer.as_entire_binding(),
            }],
        });

        let compute_extent = target_extent(false);
        let compute_texture = create_compute_texture(device, compute_extent);
        let (compute_bind_group, present_bind_group) = create_target_bind_groups(
            device,
            &compute_layout,
            &present_layout,
            &compute_texture,
            &sampler,
            &camera_buffer,
            &disk_buffer,
            &objects_buffer,
        );

        if let Some(err) = pollster::block_on(device.pop_error_scope()) {
            return Err(RenderInitError::Allocation(err.to_string()));
        }

        Ok(Self {
            compute_pipeline,
            present_pipeline,
            grid_pipeline,
            camera_buffer,
            disk_buffer,
            objects_buffer,
            grid_uniform_buffer,
            grid_vertex_buffer,
            grid_index_buffer,
            grid_index_count: grid.index_count(),
            compute_layout,
            present_layout,
            grid_bind_group,
            compute_bind_group,
            present_bind_group,
            compute_texture,
            compute_extent,
            sampler,
        })
    }

    pub fn compute_extent(&self) -> (u32, u32) {
        self.compute_extent
    }

    /// Match the compute texture to the camera state. Reallocates the
    /// texture and its dependent bind groups only when the size actually
    /// changes; returns whether a reallocation happened.
    pub fn ensure_compute_target(&mut self, ctx: &GraphicsContext, moving: bool) -> bool {
        let Some(wanted) = needs_reallocation(self.compute_extent, moving) else {
            return false;
        };
        self.compute_extent = wanted;
        self.compute_texture = create_compute_texture(&ctx.device, wanted);
        let (compute_bg, present_bg) = create_target_bind_groups(
            &ctx.device,
            &self.compute_layout,
            &self.present_layout,
            &self.compute_texture,
            &self.sampler,
            &self.camera_buffer,
            &self.disk_buffer,
            &self.objects_buffer,
        );
        self.compute_bind_group = compute_bg;
        self.present_bind_group = present_bg;
        log::debug!("compute target resized to {}x{}", wanted.0, wanted.1);
        true
    }

    /// Whole-block uniform updates; each is a single memcpy of the
    /// declared record
    pub fn update_uniforms(
        &self,
        queue: &wgpu::Queue,
        camera: &CameraBlock,
        disk: &DiskBlock,
        objects: &ObjectsBlock,
    ) {
        queue.write_buffer(&self.camera_buffer, 0, bytemuck::bytes_of(camera));
        queue.write_buffer(&self.disk_buffer, 0, bytemuck::bytes_of(disk));
        queue.write_buffer(&self.objects_buffer, 0, bytemuck::bytes_of(objects));
    }

    pub fn upload_grid(&self, queue: &wgpu::Queue, grid: &CurvatureGrid, view_proj: Mat4) {
        queue.write_buffer(&self.grid_vertex_buffer, 0, grid.vertex_bytes());
        let uniform = GridUniform {
            view_proj: view_proj.to_cols_array_2d(),
        };
        queue.write_buffer(&self.grid_uniform_buffer, 0, bytemuck::bytes_of(&uniform));
    }

    /// Encode one frame: grid overlay, geodesic compute, present blit.
    /// Pass ordering within the encoder provides the image barrier the
    /// present sampler needs.
    pub fn encode_frame(&self, encoder: &mut wgpu::CommandEncoder, view: &wgpu::TextureView) {
        {
            let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Grid Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(wgpu::Color::BLACK),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: None,
                timestamp_writes: None,
                occlusion_query_set: None,
            });
            pass.set_pipeline(&self.grid_pipeline);
            pass.set_bind_group(0, &self.grid_bind_group, &[]);
            pass.set_vertex_buffer(0, self.grid_vertex_buffer.slice(..));
            pass.set_index_buffer(self.grid_index_buffer.slice(..), wgpu::IndexFormat::Uint32);
            pass.draw_indexed(0..self.grid_index_count, 0, 0..1);
        }

        {
            let mut pass = encoder.begin_compute_pass(&wgpu::ComputePassDescriptor {
                label: Some("Geodesic Pass"),
                timestamp_writes: None,
            });
            pass.set_pipeline(&self.compute_pipeline);
            pass.set_bind_group(0, &self.compute_bind_group, &[]);
            let (gx, gy) = workgroup_count(self.compute_extent);
            pass.dispatch_workgroups(gx, gy, 1);
        }

        {
            let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Present Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Load,
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: None,
                timestamp_writes: None,
                occlusion_query_set: None,
            });
            pass.set_pipeline(&self.present_pipeline);
            pass.set_bind_group(0, &self.present_bind_group, &[]);
            pass.draw(0..6, 0..1);
        }
    }
}

fn uniform_entry(binding: u32) -> wgpu::BindGroupLayoutEntry {
    wgpu::BindGroupLayoutEntry {
        binding,
        visibility: wgpu::ShaderStages::COMPUTE,
        ty: wgpu::BindingType::Buffer {
            ty: wgpu::BufferBindingType::Uniform,
            has_dynamic_offset: false,
            min_binding_size: None,
        },
        count: None,
    }
}

fn create_compute_texture(device: &wgpu::Device, extent: (u32, u32)) -> wgpu::Texture {
    device.create_texture(&wgpu::TextureDescriptor {
        label: Some("Compute Target"),
        size: wgpu::Extent3d {
            width: extent.0,
            height: extent.1,
            depth_or_array_layers: 1,
        },
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format: wgpu::TextureFormat::Rgba8Unorm,
        usage: wgpu::TextureUsages::STORAGE_BINDING | wgpu::TextureUsages::TEXTURE_BINDING,
        view_formats: &[],
    })
}

#[allow(clippy::too_many_arguments)]
fn create_target_bind_groups(
    device: &wgpu::Device,
    compute_layout: &wgpu::BindGroupLayout,
    present_layout: &wgpu::BindGroupLayout,
    texture: &wgpu::Texture,
    sampler: &wgpu::Sampler,
    camera_buffer: &wgpu::Buffer,
    disk_buffer: &wgpu::Buffer,
    objects_buffer: &wgpu::Buffer,
) -> (wgpu::BindGroup, wgpu::BindGroup) {
    let view = texture.create_view(&wgpu::TextureViewDescriptor::default());

    let compute = device.create_bind_group(&wgpu::BindGroupDescriptor {
        label: Some("Compute Bind Group"),
        layout: compute_layout,
        entries: &[
            wgpu::BindGroupEntry {
                binding: 0,
                resource: wgpu::BindingResource::TextureView(&view),
            },
            wgpu::BindGroupEntry {
                binding: 1,
                resource: camera_buffer.as_entire_binding(),
            },
            wgpu::BindGroupEntry {
                binding: 2,
                resource: disk_buffer.as_entire_binding(),
            },
            wgpu::BindGroupEntry {
                binding: 3,
                resource: objects_buffer.as_entire_binding(),
            },
        ],
    });

    let present = device.create_bind_group(&wgpu::BindGroupDescriptor {
        label: Some("Present Bind Group"),
        layout: present_layout,
        entries: &[
            wgpu::BindGroupEntry {
                binding: 0,
                resource: wgpu::BindingResource::TextureView(&view),
            },
            wgpu::BindGroupEntry {
                binding: 1,
                resource: wgpu::BindingResource::Sampler(sampler),
            },
        ],
    });

    (compute, present)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::Scene;
    use std::mem::{offset_of, size_of};

    #[test]
    fn camera_block_layout_matches_the_shader_contract() {
        assert_eq!(size_of::<CameraBlock>(), 128);
        assert_eq!(offset_of!(CameraBlock, position), 0);
        assert_eq!(offset_of!(CameraBlock, right), 16);
        assert_eq!(offset_of!(CameraBlock, up), 32);
        assert_eq!(offset_of!(CameraBlock, forward), 48);
        assert_eq!(offset_of!(CameraBlock, tan_half_fov), 64);
        assert_eq!(offset_of!(CameraBlock, aspect), 68);
        assert_eq!(offset_of!(CameraBlock, moving), 72);
    }

    #[test]
    fn camera_block_bytes_for_a_fixed_pose() {
        let block = CameraBlock::new(
            glam::Vec3::new(1.0, 2.0, 3.0),
            (glam::Vec3::X, glam::Vec3::Y, glam::Vec3::Z),
            60.0,
            800.0 / 600.0,
            true,
        );
        let bytes = bytemuck::bytes_of(&block);
        assert_eq!(bytes.len(), 128);
        let read = |off: usize| f32::from_le_bytes(bytes[off..off + 4].try_into().unwrap());
        assert_eq!(read(0), 1.0);
        assert_eq!(read(4), 2.0);
        assert_eq!(read(8), 3.0);
        assert_eq!(read(16), 1.0);
        assert_eq!(read(36), 1.0);
        assert_eq!(read(56), 1.0);
        assert!((read(64) - (30.0f32).to_radians().tan()).abs() < 1e-6);
        assert!((read(68) - 800.0 / 600.0).abs() < 1e-6);
        assert_eq!(read(72), 1.0);
        assert!(bytes[76..].iter().all(|&b| b == 0));
    }

    #[test]
    fn disk_block_bytes_are_the_four_le_floats() {
        let block = DiskBlock {
            r1: 2.789e10,
            r2: 6.593e10,
            num: 2.0,
            thickness: 1e9,
        };
        let bytes = bytemuck::bytes_of(&block);
        assert_eq!(bytes.len(), 16);
        let mut expected = Vec::new();
        for v in [2.789e10f32, 6.593e10, 2.0, 1e9] {
            expected.extend_from_slice(&v.to_le_bytes());
        }
        assert_eq!(bytes, &expected[..]);
    }

    #[test]
    fn objects_block_layout_and_packing() {
        assert_eq!(size_of::<ObjectsBlock>(), 16 + 3 * 16 * 16);
        assert_eq!(offset_of!(ObjectsBlock, count), 0);
        assert_eq!(offset_of!(ObjectsBlock, pos_radius), 16);
        assert_eq!(offset_of!(ObjectsBlock, color), 16 + 256);
        assert_eq!(offset_of!(ObjectsBlock, mass), 16 + 512);

        let scene = Scene::sagittarius();
        let block = ObjectsBlock::from_scene(&scene);
        assert_eq!(block.count, 1);
        assert_eq!(block.pos_radius[0], [4e11, 0.0, 4e11, 4e10]);
        assert_eq!(block.color[0], [1.0, 1.0, 0.0, 1.0]);
        assert_eq!(block.mass[0][0], 1.98892e30);

        let bytes = bytemuck::bytes_of(&block);
        assert_eq!(
            i32::from_le_bytes(bytes[0..4].try_into().unwrap()),
            1
        );
        // Unused trailing entries stay zeroed
        assert!(bytes[16 + 16..16 + 256].iter().all(|&b| b == 0));
    }

    #[test]
    fn target_extent_switches_with_camera_motion() {
        assert_eq!(target_extent(false), (200, 150));
        assert_eq!(target_extent(true), (100, 75));
    }

    #[test]
    fn workgroup_counts_cover_the_target() {
        assert_eq!(workgroup_count((200, 150)), (13, 10));
        assert_eq!(workgroup_count((100, 75)), (7, 5));
        assert_eq!(workgroup_count((16, 16)), (1, 1));
        assert_eq!(workgroup_count((17, 1)), (2, 1));
    }

    #[test]
    fn reallocation_only_happens_on_a_size_change() {
        // Idle with a full-size target: nothing to do
        assert_eq!(needs_reallocation((200, 150), false), None);
        // Idle -> moving swaps to the half-resolution target once
        assert_eq!(needs_reallocation((200, 150), true), Some((100, 75)));
        // Staying in motion keeps the texture as-is
        assert_eq!(needs_reallocation((100, 75), true), None);
        // Releasing the camera restores full quality
        assert_eq!(needs_reallocation((100, 75), false), Some((200, 150)));
    }
}
