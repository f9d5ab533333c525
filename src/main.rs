use std::{path::Path, time::Instant};

use hsv_mandelbrot::{
    config::{self, Config},
    cpu, renderer::Renderer, screen, Error, Result,
};
use log::{debug, error, info, warn};
use winit::{
    event::{ElementState, Event, KeyboardInput, MouseScrollDelta, VirtualKeyCode, WindowEvent},
    event_loop::{ControlFlow, EventLoop},
    window::WindowBuilder,
};

const PAN_FRACTION: f32 = 0.1;
const ZOOM_FACTOR: f32 = 1.25;

fn main() {
    env_logger::init();

    let config = match Config::from_args(std::env::args().skip(1)) {
        Ok(config) => config,
        Err(error) => {
            eprintln!("{}\n\n{}", error, config::USAGE);
            std::process::exit(2);
        }
    };

    if config.help {
        println!("{}", config::USAGE);
        return;
    }

    let result = match &config.output {
        Some(path) => render_to_file(&config, path),
        None => run(config),
    };

    if let Err(error) = result {
        error!("{}", error);
        std::process::exit(1);
    }
}

fn render_to_file(config: &Config, path: &Path) -> Result<()> {
    let cpu = cpu::Renderer::new(config.threads)?;
    let params = config.view_parameters(config.output_size);
    let mut image = cpu::Image::new(config.output_size);

    let start = Instant::now();
    cpu.render(&params, config.max_iterations, &mut image);
    info!(
        "rendered {}x{} on {} threads in {:?}",
        config.output_size.width,
        config.output_size.height,
        cpu.current_num_threads(),
        start.elapsed()
    );

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    image.save_png(path)?;
    info!("image saved to {}", path.display());
    Ok(())
}

fn run(config: Config) -> Result<()> {
    let event_loop = EventLoop::new();
    let window = WindowBuilder::new()
        .with_title("hsv-mandelbrot")
        .build(&event_loop)?;

    let instance = wgpu::Instance::new(wgpu::Backends::all());

    let size = window.inner_size();
    let surface = unsafe { instance.create_surface(&window) };

    let adapter = pollster::block_on(instance.request_adapter(&wgpu::RequestAdapterOptions {
        power_preference: wgpu::PowerPreference::HighPerformance,
        force_fallback_adapter: false,
        compatible_surface: Some(&surface),
    }))
    .ok_or(Error::NoAdapter)?;
    debug!("adapter: {:?}", adapter.get_info());

    let (device, queue) = pollster::block_on(adapter.request_device(
        &wgpu::DeviceDescriptor {
            label: Some("device"),
            features: wgpu::Features::empty(),
            limits: wgpu::Limits::default(),
        },
        None,
    ))?;

    let mut surface_configuration = wgpu::SurfaceConfiguration {
        usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
        format: surface.get_supported_formats(&adapter)[0],
        width: size.width,
        height: size.height,
        present_mode: wgpu::PresentMode::Fifo,
        alpha_mode: wgpu::CompositeAlphaMode::Auto,
    };
    if size.width > 0 && size.height > 0 {
        surface.configure(&device, &surface_configuration);
    }

    let screen_size = screen::Size::from(size);
    let mut renderer = Renderer::new(
        &device,
        surface_configuration.format,
        config.view_parameters(screen_size),
        config.max_iterations,
        cpu::Renderer::new(config.threads)?,
    );
    if !screen_size.is_empty() {
        renderer.compute(&device, &queue, true);
    }

    event_loop.run(move |event, _, control_flow| {
        let mut resize = |renderer: &mut Renderer, size: winit::dpi::PhysicalSize<u32>| {
            if renderer.resize(&device, size.into()) {
                surface_configuration.width = size.width;
                surface_configuration.height = size.height;
                surface.configure(&device, &surface_configuration);
                renderer.compute(&device, &queue, false);
            }
        };

        match event {
            Event::MainEventsCleared => {
                window.request_redraw();
            }
            Event::WindowEvent { window_id, event } if window_id == window.id() => {
                let view_changed = match event {
                    WindowEvent::CloseRequested => {
                        *control_flow = ControlFlow::Exit;
                        false
                    }
                    WindowEvent::Resized(size) => {
                        resize(&mut renderer, size);
                        false
                    }
                    WindowEvent::ScaleFactorChanged { new_inner_size, .. } => {
                        resize(&mut renderer, *new_inner_size);
                        false
                    }
                    WindowEvent::KeyboardInput {
                        input:
                            KeyboardInput {
                                state: ElementState::Pressed,
                                virtual_keycode: Some(keycode),
                                ..
                            },
                        ..
                    } => handle_key(&mut renderer, keycode),
                    WindowEvent::MouseWheel { delta, .. } => {
                        let lines = match delta {
                            MouseScrollDelta::LineDelta(_, y) => y,
                            MouseScrollDelta::PixelDelta(position) => position.y as f32 / 100.0,
                        };
                        renderer.view_mut().zoom(ZOOM_FACTOR.powf(lines));
                        lines != 0.0
                    }
                    _ => false,
                };

                if view_changed {
                    debug!("view changed to {:?}", renderer.view());
                    renderer.compute(&device, &queue, true);
                    window.request_redraw();
                }
            }
            Event::RedrawRequested(window_id) if window_id == window.id() => {
                // The surface is only configured once the window has a non-zero size.
                if renderer.view().screen_dimensions.is_empty() {
                    return;
                }

                let surface_texture = match surface.get_current_texture() {
                    Ok(surface_texture) => surface_texture,
                    Err(wgpu::SurfaceError::Lost) => {
                        resize(&mut renderer, window.inner_size());
                        return;
                    }
                    Err(wgpu::SurfaceError::OutOfMemory) => {
                        error!("out of memory");
                        *control_flow = ControlFlow::Exit;
                        return;
                    }
                    Err(error) => {
                        warn!("{:?}", error);
                        return;
                    }
                };

                let surface_texture_view = surface_texture
                    .texture
                    .create_view(&wgpu::TextureViewDescriptor::default());

                let mut command_encoder =
                    device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
                        label: Some("render-encoder"),
                    });
                renderer.render(&mut command_encoder, &surface_texture_view);

                queue.submit([command_encoder.finish()]);
                surface_texture.present();
            }
            _ => {}
        }
    })
}

/// Returns whether the view changed.
fn handle_key(renderer: &mut Renderer, keycode: VirtualKeyCode) -> bool {
    let view = renderer.view_mut();
    match keycode {
        VirtualKeyCode::Left => view.pan(-PAN_FRACTION, 0.0),
        VirtualKeyCode::Right => view.pan(PAN_FRACTION, 0.0),
        VirtualKeyCode::Up => view.pan(0.0, -PAN_FRACTION),
        VirtualKeyCode::Down => view.pan(0.0, PAN_FRACTION),
        VirtualKeyCode::Equals | VirtualKeyCode::Plus | VirtualKeyCode::NumpadAdd => {
            view.zoom(ZOOM_FACTOR)
        }
        VirtualKeyCode::Minus | VirtualKeyCode::NumpadSubtract => view.zoom(1.0 / ZOOM_FACTOR),
        VirtualKeyCode::R => view.reset(),
        _ => return false,
    }
    true
}
