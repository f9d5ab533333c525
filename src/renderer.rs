//! GPU side of the viewer: compute the set into a storage texture, then blit it to the screen.

use std::num::NonZeroU32;

use log::{debug, trace};

use crate::{
    command_encoder::CommandEncoderExt,
    compute::{self, Uniforms},
    cpu, screen,
    var::Var,
    view::ViewParameters,
};

const RESULT_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba8Unorm;
const RESULT_USAGE: wgpu::TextureUsages = wgpu::TextureUsages::STORAGE_BINDING
    .union(wgpu::TextureUsages::COPY_SRC);

fn create_texture(
    device: &wgpu::Device,
    label: &str,
    size: screen::Size,
    usage: wgpu::TextureUsages,
) -> wgpu::Texture {
    device.create_texture(&wgpu::TextureDescriptor {
        label: Some(label),
        size: wgpu::Extent3d {
            width: size.width,
            height: size.height,
            depth_or_array_layers: 1,
        },
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format: RESULT_FORMAT,
        usage: usage | wgpu::TextureUsages::TEXTURE_BINDING,
    })
}

pub struct Renderer {
    compute_pipeline: wgpu::ComputePipeline,
    compute_bind_group_layout: wgpu::BindGroupLayout,
    render_pipeline: wgpu::RenderPipeline,
    render_bind_group_layout: wgpu::BindGroupLayout,
    sampler: wgpu::Sampler,

    uniforms: Var<Uniforms>,
    view: ViewParameters,
    max_iterations: u32,

    result_texture: wgpu::Texture,
    preview_texture: wgpu::Texture,
    compute_bind_group: wgpu::BindGroup,
    result_render_bind_group: wgpu::BindGroup,
    preview_render_bind_group: wgpu::BindGroup,

    cpu: cpu::Renderer,
    show_preview: bool,
}

impl Renderer {
    pub fn new(
        device: &wgpu::Device,
        surface_format: wgpu::TextureFormat,
        view: ViewParameters,
        max_iterations: u32,
        cpu: cpu::Renderer,
    ) -> Self {
        let compute_shader_module = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("compute-shader"),
            source: wgpu::ShaderSource::Wgsl(include_str!("compute.wgsl").into()),
        });

        let compute_bind_group_layout =
            device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                label: Some("compute-bind-group-layout"),
                entries: &[
                    wgpu::BindGroupLayoutEntry {
                        binding: 0,
                        visibility: wgpu::ShaderStages::COMPUTE,
                        ty: wgpu::BindingType::Buffer {
                            ty: wgpu::BufferBindingType::Uniform,
                            has_dynamic_offset: false,
                            min_binding_size: None,
                        },
                        count: None,
                    },
                    wgpu::BindGroupLayoutEntry {
                        binding: 1,
                        visibility: wgpu::ShaderStages::COMPUTE,
                        ty: wgpu::BindingType::StorageTexture {
                            access: wgpu::StorageTextureAccess::WriteOnly,
                            format: RESULT_FORMAT,
                            view_dimension: wgpu::TextureViewDimension::D2,
                        },
                        count: None,
                    },
                ],
            });

        let compute_pipeline_layout =
            device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
                label: Some("compute-pipeline-layout"),
                bind_group_layouts: &[&compute_bind_group_layout],
                push_constant_ranges: &[],
            });

        let compute_pipeline = device.create_compute_pipeline(&wgpu::ComputePipelineDescriptor {
            label: Some("compute-pipeline"),
            layout: Some(&compute_pipeline_layout),
            module: &compute_shader_module,
            entry_point: "main",
        });

        let render_shader_module = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("render-shader"),
            source: wgpu::ShaderSource::Wgsl(include_str!("shader.wgsl").into()),
        });

        let render_bind_group_layout =
            device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                label: Some("render-bind-group-layout"),
                entries: &[
                    wgpu::BindGroupLayoutEntry {
                        binding: 0,
                        visibility: wgpu::ShaderStages::FRAGMENT,
                        ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                        count: None,
                    },
                    wgpu::BindGroupLayoutEntry {
                        binding: 1,
                        visibility: wgpu::ShaderStages::FRAGMENT,
                        ty: wgpu::BindingType::Texture {
                            sample_type: wgpu::TextureSampleType::Float { filterable: true },
                            view_dimension: wgpu::TextureViewDimension::D2,
                            multisampled: false,
                        },
                        count: None,
                    },
                ],
            });

        let render_pipeline_layout =
            device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
                label: Some("render-pipeline-layout"),
                bind_group_layouts: &[&render_bind_group_layout],
                push_constant_ranges: &[],
            });

        let render_pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("render-pipeline"),
            layout: Some(&render_pipeline_layout),
            vertex: wgpu::VertexState {
                module: &render_shader_module,
                entry_point: "vertex_main",
                buffers: &[],
            },
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleList,
                strip_index_format: None,
                front_face: wgpu::FrontFace::Ccw,
                cull_mode: Some(wgpu::Face::Back),
                unclipped_depth: false,
                polygon_mode: wgpu::PolygonMode::Fill,
                conservative: false,
            },
            depth_stencil: None,
            multisample: wgpu::MultisampleState::default(),
            fragment: Some(wgpu::FragmentState {
                module: &render_shader_module,
                entry_point: "fragment_main",
                targets: &[Some(wgpu::ColorTargetState {
                    format: surface_format,
                    blend: Some(wgpu::BlendState::REPLACE),
                    write_mask: wgpu::ColorWrites::ALL,
                })],
            }),
            multiview: None,
        });

        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("result-sampler"),
            mag_filter: wgpu::FilterMode::Nearest,
            min_filter: wgpu::FilterMode::Nearest,
            ..Default::default()
        });

        let uniforms = Var::uniform(
            device,
            "uniforms-buffer",
            Uniforms::new(view, max_iterations),
        );

        // wgpu rejects zero sized textures; `resize` replaces this once the window has an area.
        let result_size = if view.screen_dimensions.is_empty() {
            screen::Size::new(1, 1)
        } else {
            view.screen_dimensions
        };
        let result_texture = create_texture(
            device,
            "result-texture",
            result_size,
            RESULT_USAGE,
        );
        let preview_texture = create_texture(
            device,
            "preview-texture",
            cpu::PREVIEW_SIZE,
            wgpu::TextureUsages::COPY_DST,
        );

        let compute_bind_group = create_compute_bind_group(
            device,
            &compute_bind_group_layout,
            &uniforms,
            &result_texture,
        );
        let result_render_bind_group = create_render_bind_group(
            device,
            &render_bind_group_layout,
            &sampler,
            &result_texture,
        );
        let preview_render_bind_group = create_render_bind_group(
            device,
            &render_bind_group_layout,
            &sampler,
            &preview_texture,
        );

        Self {
            compute_pipeline,
            compute_bind_group_layout,
            render_pipeline,
            render_bind_group_layout,
            sampler,
            uniforms,
            view,
            max_iterations,
            result_texture,
            preview_texture,
            compute_bind_group,
            result_render_bind_group,
            preview_render_bind_group,
            cpu,
            show_preview: false,
        }
    }

    pub fn view(&self) -> &ViewParameters {
        &self.view
    }

    /// The view can be changed freely; call [`Renderer::compute`] afterwards to see it.
    pub fn view_mut(&mut self) -> &mut ViewParameters {
        &mut self.view
    }

    /// Reallocate the result texture. Zero sized surfaces (minimised windows) are ignored.
    pub fn resize(&mut self, device: &wgpu::Device, size: screen::Size) -> bool {
        if size.is_empty() {
            debug!("ignoring resize to {:?}", size);
            return false;
        }

        debug!("resizing result texture to {:?}", size);

        self.view.screen_dimensions = size;
        self.result_texture = create_texture(
            device,
            "result-texture",
            size,
            RESULT_USAGE,
        );
        self.compute_bind_group = create_compute_bind_group(
            device,
            &self.compute_bind_group_layout,
            &self.uniforms,
            &self.result_texture,
        );
        self.result_render_bind_group = create_render_bind_group(
            device,
            &self.render_bind_group_layout,
            &self.sampler,
            &self.result_texture,
        );
        true
    }

    /// Recompute the set for the current view.
    ///
    /// With `with_preview`, a low resolution CPU render is uploaded first and drawn on the next
    /// frame instead of the GPU result.
    pub fn compute(&mut self, device: &wgpu::Device, queue: &wgpu::Queue, with_preview: bool) {
        trace!("begin compute {:?}", self.view);

        if with_preview {
            let preview = self.cpu.preview(&self.view);
            self.write_preview(queue, &preview);
            self.show_preview = true;
        }

        self.uniforms
            .set(queue, Uniforms::new(self.view, self.max_iterations));

        let mut command_encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("compute-encoder"),
        });

        let (x, y, z) = compute::dispatch_size(self.view.screen_dimensions);
        command_encoder.with_debug_group("compute-pass", |command_encoder| {
            command_encoder.with_compute_pass("compute-pass", |compute_pass| {
                compute_pass.set_pipeline(&self.compute_pipeline);
                compute_pass.set_bind_group(0, &self.compute_bind_group, &[]);
                compute_pass.insert_debug_marker("mandelbrot");
                compute_pass.dispatch_workgroups(x, y, z);
            })
        });

        queue.submit([command_encoder.finish()]);
        trace!("end compute");
    }

    fn write_preview(&self, queue: &wgpu::Queue, preview: &cpu::Image) {
        let size = preview.size();
        queue.write_texture(
            wgpu::ImageCopyTexture {
                texture: &self.preview_texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            &preview.to_rgba8(),
            wgpu::ImageDataLayout {
                offset: 0,
                bytes_per_row: NonZeroU32::new(4 * size.width),
                rows_per_image: NonZeroU32::new(size.height),
            },
            wgpu::Extent3d {
                width: size.width,
                height: size.height,
                depth_or_array_layers: 1,
            },
        );
    }

    /// Record a pass that draws the latest result (or the pending preview) over `target`.
    pub fn render(
        &mut self,
        command_encoder: &mut wgpu::CommandEncoder,
        target: &wgpu::TextureView,
    ) {
        let bind_group = if self.show_preview {
            self.show_preview = false;
            &self.preview_render_bind_group
        } else {
            &self.result_render_bind_group
        };
        let render_pipeline = &self.render_pipeline;

        command_encoder.with_debug_group("render-pass", |command_encoder| {
            command_encoder.with_render_pass(
                &wgpu::RenderPassDescriptor {
                    label: Some("render-pass"),
                    color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                        view: target,
                        resolve_target: None,
                        ops: wgpu::Operations {
                            load: wgpu::LoadOp::Clear(wgpu::Color::BLACK),
                            store: true,
                        },
                    })],
                    depth_stencil_attachment: None,
                },
                |render_pass| {
                    render_pass.set_pipeline(render_pipeline);
                    render_pass.set_bind_group(0, bind_group, &[]);
                    render_pass.draw(0..6, 0..1);
                },
            )
        });
    }
}

fn create_compute_bind_group(
    device: &wgpu::Device,
    layout: &wgpu::BindGroupLayout,
    uniforms: &Var<Uniforms>,
    result_texture: &wgpu::Texture,
) -> wgpu::BindGroup {
    let result_texture_view = result_texture.create_view(&wgpu::TextureViewDescriptor::default());
    device.create_bind_group(&wgpu::BindGroupDescriptor {
        label: Some("compute-bind-group"),
        layout,
        entries: &[
            wgpu::BindGroupEntry {
                binding: 0,
                resource: uniforms.binding_resource(),
            },
            wgpu::BindGroupEntry {
                binding: 1,
                resource: wgpu::BindingResource::TextureView(&result_texture_view),
            },
        ],
    })
}

fn create_render_bind_group(
    device: &wgpu::Device,
    layout: &wgpu::BindGroupLayout,
    sampler: &wgpu::Sampler,
    texture: &wgpu::Texture,
) -> wgpu::BindGroup {
    let texture_view = texture.create_view(&wgpu::TextureViewDescriptor::default());
    device.create_bind_group(&wgpu::BindGroupDescriptor {
        label: Some("render-bind-group"),
        layout,
        entries: &[
            wgpu::BindGroupEntry {
                binding: 0,
                resource: wgpu::BindingResource::Sampler(sampler),
            },
            wgpu::BindGroupEntry {
                binding: 1,
                resource: wgpu::BindingResource::TextureView(&texture_view),
            },
        ],
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pixel::Pixel;

    fn validate_wgsl(source: &str) {
        let module = naga::front::wgsl::parse_str(source)
            .unwrap_or_else(|error| panic!("{}", error.emit_to_string(source)));
        naga::valid::Validator::new(
            naga::valid::ValidationFlags::all(),
            naga::valid::Capabilities::empty(),
        )
        .validate(&module)
        .unwrap();
    }

    #[test]
    fn shaders_are_valid_wgsl() {
        validate_wgsl(include_str!("compute.wgsl"));
        validate_wgsl(include_str!("shader.wgsl"));
    }

    /// A device that can run compute shaders, or `None` on machines without one.
    fn device() -> Option<(wgpu::Device, wgpu::Queue)> {
        let instance = wgpu::Instance::new(wgpu::Backends::all());
        let adapter = pollster::block_on(instance.request_adapter(&wgpu::RequestAdapterOptions {
            power_preference: wgpu::PowerPreference::default(),
            force_fallback_adapter: false,
            compatible_surface: None,
        }))?;
        if !adapter
            .get_downlevel_capabilities()
            .flags
            .contains(wgpu::DownlevelFlags::COMPUTE_SHADERS)
        {
            return None;
        }

        pollster::block_on(adapter.request_device(
            &wgpu::DeviceDescriptor {
                label: Some("test-device"),
                features: wgpu::Features::empty(),
                limits: adapter.limits(),
            },
            None,
        ))
        .ok()
    }

    fn renderer(device: &wgpu::Device, view: ViewParameters, max_iterations: u32) -> Renderer {
        Renderer::new(
            device,
            RESULT_FORMAT,
            view,
            max_iterations,
            cpu::Renderer::new(1).unwrap(),
        )
    }

    /// Tightly packed RGBA8 contents of the result texture.
    fn read_result(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        renderer: &Renderer,
        size: screen::Size,
    ) -> Vec<u8> {
        let unpadded_bytes_per_row = 4 * size.width;
        let alignment = wgpu::COPY_BYTES_PER_ROW_ALIGNMENT;
        let padded_bytes_per_row = (unpadded_bytes_per_row + alignment - 1) / alignment * alignment;

        let buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("readback-buffer"),
            size: (padded_bytes_per_row * size.height) as wgpu::BufferAddress,
            usage: wgpu::BufferUsages::COPY_DST | wgpu::BufferUsages::MAP_READ,
            mapped_at_creation: false,
        });

        let mut command_encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("readback-encoder"),
        });
        command_encoder.copy_texture_to_buffer(
            renderer.result_texture.as_image_copy(),
            wgpu::ImageCopyBuffer {
                buffer: &buffer,
                layout: wgpu::ImageDataLayout {
                    offset: 0,
                    bytes_per_row: NonZeroU32::new(padded_bytes_per_row),
                    rows_per_image: NonZeroU32::new(size.height),
                },
            },
            wgpu::Extent3d {
                width: size.width,
                height: size.height,
                depth_or_array_layers: 1,
            },
        );
        queue.submit([command_encoder.finish()]);

        let slice = buffer.slice(..);
        slice.map_async(wgpu::MapMode::Read, |result| result.unwrap());
        device.poll(wgpu::Maintain::Wait);

        let data = slice.get_mapped_range();
        let bytes = data
            .chunks(padded_bytes_per_row as usize)
            .flat_map(|row| &row[..unpadded_bytes_per_row as usize])
            .copied()
            .collect();
        drop(data);
        buffer.unmap();
        bytes
    }

    /// Rgba8Unorm stores may round differently from the CPU by one step.
    fn assert_rgba8_close(gpu: &[u8], cpu: &[u8], size: screen::Size) {
        assert_eq!(gpu.len(), cpu.len());
        for (index, (gpu, cpu)) in gpu.chunks(4).zip(cpu.chunks(4)).enumerate() {
            let pixel = Pixel::new(index as u32 % size.width, index as u32 / size.width);
            let close = gpu
                .iter()
                .zip(cpu)
                .all(|(gpu, cpu)| (*gpu as i16 - *cpu as i16).abs() <= 1);
            assert!(close, "{:?}: gpu {:?}, cpu {:?}", pixel, gpu, cpu);
        }
    }

    #[test]
    fn gpu_matches_cpu_for_two_by_two_scenario() {
        let Some((device, queue)) = device() else {
            println!("Skipping test: no GPU available");
            return;
        };

        let size = screen::Size::new(2, 2);
        let view = ViewParameters::new([0.0, 0.0], [4.0, 4.0], size);
        let mut renderer = renderer(&device, view, 10);
        renderer.compute(&device, &queue, false);
        let gpu = read_result(&device, &queue, &renderer, size);

        let mut image = cpu::Image::new(size);
        cpu::Renderer::new(1).unwrap().render(&view, 10, &mut image);

        assert_rgba8_close(&gpu, &image.to_rgba8(), size);
        // c = (-2, -2) escapes after one step.
        assert_eq!(&gpu[..4], &[255, 153, 0, 255]);
        // c = (0, 0) stays at the origin, where atan2 is taken as 0.
        assert_eq!(&gpu[12..], &[0, 255, 255, 255]);
    }

    #[test]
    fn gpu_leaves_texels_outside_the_view_untouched() {
        let Some((device, queue)) = device() else {
            println!("Skipping test: no GPU available");
            return;
        };

        let texture_size = screen::Size::new(8, 8);
        let mut renderer = renderer(
            &device,
            ViewParameters::new([-0.5, 0.0], [3.0, 2.0], texture_size),
            32,
        );
        // Shrink the view without reallocating, so one 8x8 workgroup covers more than the view.
        renderer.view_mut().screen_dimensions = screen::Size::new(5, 3);
        renderer.compute(&device, &queue, false);
        let gpu = read_result(&device, &queue, &renderer, texture_size);

        let mut image = cpu::Image::new(texture_size);
        let written = cpu::Renderer::new(1)
            .unwrap()
            .render(renderer.view(), 32, &mut image);
        assert_eq!(written, 15);

        assert_rgba8_close(&gpu, &image.to_rgba8(), texture_size);
        for (index, texel) in gpu.chunks(4).enumerate() {
            let pixel = Pixel::new(index as u32 % 8, index as u32 / 8);
            if !renderer.view().screen_dimensions.contains(pixel) {
                assert_eq!(texel, &[0, 0, 0, 0], "{:?} should be untouched", pixel);
            }
        }
    }

    #[test]
    fn zero_sized_window_keeps_view_empty_until_resized() {
        let Some((device, _queue)) = device() else {
            println!("Skipping test: no GPU available");
            return;
        };

        let empty = screen::Size::new(0, 0);
        let view = ViewParameters::default().with_screen_dimensions(empty);
        let mut renderer = renderer(&device, view, 10);
        assert!(renderer.view().screen_dimensions.is_empty());

        assert!(!renderer.resize(&device, screen::Size::new(640, 0)));
        assert!(renderer.view().screen_dimensions.is_empty());

        assert!(renderer.resize(&device, screen::Size::new(640, 480)));
        assert_eq!(renderer.view().screen_dimensions, screen::Size::new(640, 480));
    }
}
