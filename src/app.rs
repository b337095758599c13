use std::{process, sync::Arc};

use anyhow::bail;
use wgpu::{
    Adapter, Backends, BindGroup, BindGroupDescriptor, BindGroupEntry, BindGroupLayout,
    BindGroupLayoutDescriptor, BindGroupLayoutEntry, BindingResource, BindingType, BlendState,
    ColorTargetState, ColorWrites, Device, DeviceDescriptor, Extent3d, FilterMode, FragmentState,
    InstanceDescriptor, LoadOp, MemoryHints, MultisampleState, Operations,
    PipelineCompilationOptions, PipelineLayoutDescriptor, PrimitiveState, PrimitiveTopology, Queue,
    RenderPass, RenderPassColorAttachment, RenderPassDescriptor, RenderPipeline,
    RenderPipelineDescriptor, RequestAdapterOptions, SamplerBindingType, SamplerDescriptor,
    ShaderModuleDescriptor, ShaderSource, ShaderStages, StoreOp, Surface, SurfaceError,
    SurfaceTarget, TexelCopyBufferLayout, Texture, TextureDescriptor, TextureDimension,
    TextureFormat, TextureSampleType, TextureUsages, TextureViewDimension, VertexState,
};
use winit::{
    application::ApplicationHandler,
    event::{ElementState, MouseButton, TouchPhase, WindowEvent},
    event_loop::ActiveEventLoop,
    window::{Window, WindowId},
};

use crate::{
    canvas::{self, Compositor},
    config::Config,
    event::PointerEvent,
    math::{vec2, Vec2f},
    pen::{Color, Pen},
    stroke::StrokeTracker,
};

pub struct App {
    instance: wgpu::Instance,
    config: Config,
    win: Option<Win>,
}

struct Gpu {
    adapter: Adapter,
    device: Device,
    queue: Queue,
    /// Format of the window surface, used as the format of the render
    /// target.
    format: TextureFormat,

    render_pipeline: RenderPipeline,
    sampler_bg: BindGroup,
    texture_bgl: BindGroupLayout,
}

impl Gpu {
    fn new(
        instance: &wgpu::Instance,
        surface: &Surface<'_>,
        width: u32,
        height: u32,
    ) -> anyhow::Result<Self> {
        let adapter = pollster::block_on(instance.request_adapter(&RequestAdapterOptions {
            compatible_surface: Some(surface),
            ..Default::default()
        }))?;

        let (device, queue) = pollster::block_on(adapter.request_device(&DeviceDescriptor {
            memory_hints: MemoryHints::MemoryUsage,
            ..Default::default()
        }))?;

        let Some(config) = surface.get_default_config(&adapter, width, height) else {
            bail!("adapter does not support the window surface");
        };

        // Shader
        let shader = device.create_shader_module(ShaderModuleDescriptor {
            label: Some("shader"),
            source: ShaderSource::Wgsl(include_str!("shader.wgsl").into()),
        });

        // BGLs
        let sampler_bgl = device.create_bind_group_layout(&BindGroupLayoutDescriptor {
            label: Some("sampler"),
            entries: &[BindGroupLayoutEntry {
                binding: 0,
                count: None,
                visibility: ShaderStages::FRAGMENT,
                ty: BindingType::Sampler(SamplerBindingType::Filtering),
            }],
        });
        let texture_bgl = device.create_bind_group_layout(&BindGroupLayoutDescriptor {
            label: Some("texture"),
            entries: &[BindGroupLayoutEntry {
                binding: 0,
                count: None,
                visibility: ShaderStages::FRAGMENT,
                ty: BindingType::Texture {
                    sample_type: TextureSampleType::Float { filterable: true },
                    view_dimension: TextureViewDimension::D2,
                    multisampled: false,
                },
            }],
        });

        // Pipeline.
        let render_pipeline = device.create_render_pipeline(&RenderPipelineDescriptor {
            label: Some("blit_pipeline"),
            layout: Some(&device.create_pipeline_layout(&PipelineLayoutDescriptor {
                label: Some("blit_pipeline"),
                bind_group_layouts: &[&sampler_bgl, &texture_bgl],
                ..Default::default()
            })),
            vertex: VertexState {
                module: &shader,
                entry_point: Some("vertex"),
                compilation_options: PipelineCompilationOptions::default(),
                buffers: &[],
            },
            primitive: PrimitiveState {
                topology: PrimitiveTopology::TriangleStrip,
                ..Default::default()
            },
            depth_stencil: None,
            multisample: MultisampleState::default(),
            fragment: Some(FragmentState {
                module: &shader,
                entry_point: Some("fragment"),
                compilation_options: PipelineCompilationOptions::default(),
                targets: &[Some(ColorTargetState {
                    format: config.format,
                    blend: Some(BlendState::REPLACE),
                    write_mask: ColorWrites::all(),
                })],
            }),
            multiview_mask: None,
            cache: None,
        });
        let sampler = device.create_sampler(&SamplerDescriptor {
            mag_filter: FilterMode::Linear,
            min_filter: FilterMode::Linear,
            ..Default::default()
        });
        let sampler_bg = device.create_bind_group(&BindGroupDescriptor {
            label: Some("sampler"),
            layout: &sampler_bgl,
            entries: &[BindGroupEntry {
                binding: 0,
                resource: BindingResource::Sampler(&sampler),
            }],
        });

        Ok(Gpu {
            adapter,
            device,
            queue,
            format: config.format,
            render_pipeline,
            sampler_bg,
            texture_bgl,
        })
    }
}

struct Win {
    window: Arc<Window>,
    surface: Surface<'static>,
    gpu: Gpu,

    /// CPU screen target the compositor renders into each repaint.
    screen: canvas::Surface,
    screen_tex: ScreenTexture,

    compositor: Compositor,
    tracker: StrokeTracker,
    pen: Pen,
    background: Color,

    cursor_pos: Option<Vec2f>,
    mouse_down: bool,
    active_touch: Option<u64>,
}

impl Win {
    fn recreate_swapchain(&self) {
        let res = self.window.inner_size();

        let config = self
            .surface
            .get_default_config(&self.gpu.adapter, res.width, res.height)
            .expect("adapter does not support surface");

        log::debug!(
            "configuring window surface for {}x{} (format: {:?}, present mode: {:?})",
            res.width,
            res.height,
            config.format,
            config.present_mode,
        );

        self.surface.configure(&self.gpu.device, &config);
    }

    fn resize(&mut self, width: u32, height: u32) {
        self.recreate_swapchain();
        self.screen = canvas::Surface::new(width, height, self.background);
        self.screen_tex = ScreenTexture::new(&self.gpu, width, height);
        self.compositor.resize(width, height);
    }

    fn redraw(&mut self) {
        let st = match self.surface.get_current_texture() {
            Ok(st) => st,
            Err(err @ (SurfaceError::Outdated | SurfaceError::Lost)) => {
                log::debug!("surface error: {}", err);
                self.recreate_swapchain();
                self.surface
                    .get_current_texture()
                    .expect("failed to acquire next frame after recreating swapchain")
            }
            Err(e) => {
                panic!("failed to acquire frame: {}", e);
            }
        };

        self.compositor.render(Some(&mut self.screen));
        self.screen_tex.upload(&self.gpu, &self.screen);

        let mut enc = self.gpu.device.create_command_encoder(&Default::default());

        let view = st.texture.create_view(&Default::default());
        let mut pass = enc.begin_render_pass(&RenderPassDescriptor {
            color_attachments: &[Some(RenderPassColorAttachment {
                view: &view,
                depth_slice: None,
                resolve_target: None,
                ops: Operations {
                    load: LoadOp::Clear(wgpu::Color::BLACK),
                    store: StoreOp::Store,
                },
            })],
            ..Default::default()
        });
        self.screen_tex.draw(&self.gpu, &mut pass);
        drop(pass);

        self.gpu.queue.submit([enc.finish()]);
        self.window.pre_present_notify();
        st.present();
    }

    /// Feeds one pointer event through the stroke tracker and commits
    /// whatever segment it produces. Only accepted moves schedule a repaint.
    fn pointer_event(&mut self, event: PointerEvent) {
        match event {
            PointerEvent::Down { position } => self.tracker.on_start(position),
            PointerEvent::Move { position } => {
                if let Some(seg) = self.tracker.on_move(position) {
                    self.compositor.commit_segment(&seg, &self.pen);
                    self.window.request_redraw();
                }
            }
            PointerEvent::Up => {
                if let Some(path) = self.tracker.on_end() {
                    log::debug!("stroke finished with {} segments", path.segments().len());
                }
            }
        }
    }
}

impl App {
    pub fn new(config: Config) -> Self {
        Self {
            instance: wgpu::Instance::new(&InstanceDescriptor {
                backends: Backends::PRIMARY,
                ..Default::default()
            }),
            config,
            win: None,
        }
    }

    fn create_win(&self, event_loop: &ActiveEventLoop) -> anyhow::Result<Win> {
        let window = Arc::new(
            event_loop
                .create_window(Window::default_attributes().with_title(env!("CARGO_PKG_NAME")))?,
        );

        let surface = self
            .instance
            .create_surface(SurfaceTarget::from(window.clone()))?;
        let res = window.inner_size();
        if res.width == 0 || res.height == 0 {
            bail!("window has no drawable area ({}x{})", res.width, res.height);
        }
        let gpu = Gpu::new(&self.instance, &surface, res.width, res.height)?;

        log::debug!(
            "creating canvas at {}x{}, format={:?}",
            res.width,
            res.height,
            gpu.format
        );

        let pen = Pen::new(self.config.stroke_color, self.config.stroke_width);
        let mut compositor =
            Compositor::new(self.config.background_color, self.config.frame_inset, pen);
        compositor.resize(res.width, res.height);

        let screen = canvas::Surface::new(res.width, res.height, self.config.background_color);
        let screen_tex = ScreenTexture::new(&gpu, res.width, res.height);

        let win = Win {
            window,
            surface,
            gpu,
            screen,
            screen_tex,
            compositor,
            tracker: StrokeTracker::new(self.config.move_tolerance),
            pen,
            background: self.config.background_color,
            cursor_pos: None,
            mouse_down: false,
            active_touch: None,
        };
        win.recreate_swapchain();
        Ok(win)
    }
}

impl ApplicationHandler for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.win.is_none() {
            let win = match self.create_win(event_loop) {
                Ok(win) => win,
                Err(e) => {
                    eprintln!("could not create window: {e}");
                    process::exit(1);
                }
            };
            self.win = Some(win);
        }
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        _window_id: WindowId,
        event: WindowEvent,
    ) {
        let Some(win) = &mut self.win else { return };

        match event {
            WindowEvent::CloseRequested => event_loop.exit(),
            WindowEvent::RedrawRequested => win.redraw(),
            WindowEvent::Resized(size) => {
                if size.width == 0 || size.height == 0 {
                    // Minimized; keep the previous surface until a real size
                    // arrives.
                    return;
                }
                win.resize(size.width, size.height);
                win.window.request_redraw();
            }
            WindowEvent::CursorMoved { position, .. } => {
                let position = vec2(position.x as f32, position.y as f32);
                win.cursor_pos = Some(position);
                if win.mouse_down {
                    win.pointer_event(PointerEvent::Move { position });
                }
            }
            WindowEvent::MouseInput {
                state,
                button: MouseButton::Left,
                ..
            } if win.active_touch.is_none() => match state {
                ElementState::Pressed => {
                    if let Some(position) = win.cursor_pos {
                        win.mouse_down = true;
                        win.pointer_event(PointerEvent::Down { position });
                    }
                }
                ElementState::Released => {
                    if win.mouse_down {
                        win.mouse_down = false;
                        win.pointer_event(PointerEvent::Up);
                    }
                }
            },
            WindowEvent::Touch(touch) if !win.mouse_down => {
                let position = vec2(touch.location.x as f32, touch.location.y as f32);
                match touch.phase {
                    TouchPhase::Started => {
                        // Only the first touch of a gesture draws.
                        if win.active_touch.is_none() {
                            win.active_touch = Some(touch.id);
                            win.pointer_event(PointerEvent::Down { position });
                        }
                    }
                    TouchPhase::Moved => {
                        if win.active_touch == Some(touch.id) {
                            win.pointer_event(PointerEvent::Move { position });
                        }
                    }
                    TouchPhase::Ended | TouchPhase::Cancelled => {
                        if win.active_touch == Some(touch.id) {
                            win.active_touch = None;
                            win.pointer_event(PointerEvent::Up);
                        }
                    }
                }
            }
            _ => {}
        }
    }
}

/// GPU copy of the CPU screen buffer, drawn to the window as a fullscreen
/// quad.
struct ScreenTexture {
    texture: Texture,
    bind_group: BindGroup,
}

impl ScreenTexture {
    fn new(gpu: &Gpu, width: u32, height: u32) -> Self {
        let texture = gpu.device.create_texture(&TextureDescriptor {
            label: Some("screen"),
            size: Extent3d {
                width,
                height,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: TextureDimension::D2,
            format: TextureFormat::Bgra8UnormSrgb,
            usage: TextureUsages::TEXTURE_BINDING | TextureUsages::COPY_DST,
            view_formats: &[],
        });
        let bind_group = gpu.device.create_bind_group(&BindGroupDescriptor {
            label: Some("screen"),
            layout: &gpu.texture_bgl,
            entries: &[BindGroupEntry {
                binding: 0,
                resource: BindingResource::TextureView(&texture.create_view(&Default::default())),
            }],
        });

        Self {
            texture,
            bind_group,
        }
    }

    /// Uploads the packed `0xAARRGGBB` screen pixels, which are BGRA bytes
    /// in memory.
    fn upload(&self, gpu: &Gpu, screen: &canvas::Surface) {
        gpu.queue.write_texture(
            self.texture.as_image_copy(),
            bytemuck::cast_slice(screen.data()),
            TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(4 * screen.width()),
                rows_per_image: Some(screen.height()),
            },
            Extent3d {
                width: screen.width(),
                height: screen.height(),
                depth_or_array_layers: 1,
            },
        );
    }

    fn draw(&self, gpu: &Gpu, pass: &mut RenderPass<'_>) {
        pass.set_pipeline(&gpu.render_pipeline);
        pass.set_bind_group(0, &gpu.sampler_bg, &[]);
        pass.set_bind_group(1, &self.bind_group, &[]);
        pass.draw(0..4, 0..1);
    }
}
