use std::iter;

use eframe::egui;
use wgpu::{
    Backends, Color, CommandEncoderDescriptor, CompositeAlphaMode, Device, DeviceDescriptor,
    Dx12Compiler, Features, FilterMode, Instance, InstanceDescriptor, Limits, LoadOp, Operations,
    PowerPreference, PresentMode, Queue, RenderPassColorAttachment, RenderPassDescriptor,
    RequestAdapterOptions, Surface, SurfaceConfiguration, SurfaceError, TextureUsages,
    TextureView, TextureViewDescriptor,
};
use winit::dpi::PhysicalSize;
use winit::event::WindowEvent;
use winit::event_loop::EventLoop;
use winit::window::Window;

/// Window/GPU/UI plumbing around the renderer: wgpu surface and device, plus
/// the egui state that draws the viewport image and the editor panel.
pub struct Application {
    surface: Surface,
    pub device: Device,
    pub queue: Queue,
    config: SurfaceConfiguration,
    pub size: PhysicalSize<u32>,
    pub window: Window,
    egui_state: egui_winit::State,
    egui_context: egui::Context,
    egui_renderer: egui_wgpu::Renderer,
    egui_screen: egui_wgpu::renderer::ScreenDescriptor,
}

impl Application {
    pub async fn new(window: Window, event_loop: &EventLoop<()>) -> Self {
        let size = window.inner_size();

        let instance = Instance::new(InstanceDescriptor {
            backends: Backends::all(),
            dx12_shader_compiler: Dx12Compiler::default(),
        });

        // The window must outlive the surface created from it; both live in
        // this struct so that holds.
        let surface = unsafe { instance.create_surface(&window) }.unwrap();

        let adapter = instance
            .request_adapter(&RequestAdapterOptions {
                power_preference: PowerPreference::default(),
                force_fallback_adapter: false,
                compatible_surface: Some(&surface),
            })
            .await
            .unwrap();

        let (device, queue) = adapter
            .request_device(
                &DeviceDescriptor {
                    features: Features::empty(),
                    limits: Limits::default(),
                    label: Some("Ember GPU"),
                },
                None,
            )
            .await
            .unwrap();

        let capabilities = surface.get_capabilities(&adapter);
        let surface_format = capabilities
            .formats
            .iter()
            .find(|format| format.is_srgb())
            .copied()
            .unwrap_or(capabilities.formats[0]);
        let config = SurfaceConfiguration {
            usage: TextureUsages::RENDER_ATTACHMENT,
            format: surface_format,
            width: size.width,
            height: size.height,
            present_mode: PresentMode::AutoVsync,
            alpha_mode: CompositeAlphaMode::Auto,
            view_formats: vec![],
        };
        surface.configure(&device, &config);

        let egui_state = egui_winit::State::new(event_loop);
        let egui_context = egui::Context::default();
        let egui_renderer = egui_wgpu::Renderer::new(&device, surface_format, None, 1);
        let egui_screen = egui_wgpu::renderer::ScreenDescriptor {
            size_in_pixels: [config.width, config.height],
            pixels_per_point: egui_context.pixels_per_point(),
        };

        Self {
            surface,
            device,
            queue,
            config,
            size,
            window,
            egui_state,
            egui_context,
            egui_renderer,
            egui_screen,
        }
    }

    pub fn resize(&mut self, new_size: PhysicalSize<u32>) {
        if new_size.width == 0 || new_size.height == 0 {
            return;
        }

        self.size = new_size;
        self.config.width = new_size.width;
        self.config.height = new_size.height;
        self.surface.configure(&self.device, &self.config);

        self.egui_screen.pixels_per_point = self.egui_context.pixels_per_point();
        self.egui_screen.size_in_pixels = [self.config.width, self.config.height];
    }

    /// Reconfigures the surface with the current size. Used to recover from
    /// a lost or outdated surface.
    pub fn reconfigure(&mut self) {
        self.surface.configure(&self.device, &self.config);
    }

    /// Hands the event to egui first. Returns true when egui consumed it.
    pub fn input(&mut self, event: &WindowEvent) -> bool {
        self.egui_state.on_event(&self.egui_context, event).consumed
    }

    pub fn wants_pointer(&self) -> bool {
        self.egui_context.is_pointer_over_area()
    }

    /// Makes a wgpu texture view drawable as an egui image.
    pub fn register_texture(&mut self, view: &TextureView) -> egui::TextureId {
        self.egui_renderer
            .register_native_texture(&self.device, view, FilterMode::Nearest)
    }

    pub fn free_texture(&mut self, id: egui::TextureId) {
        self.egui_renderer.free_texture(&id);
    }

    /// Runs one egui frame described by `run_ui` and presents it.
    pub fn render(
        &mut self,
        run_ui: impl FnOnce(&egui::Context),
    ) -> Result<(), SurfaceError> {
        let output = self.surface.get_current_texture()?;
        let view = output.texture.create_view(&TextureViewDescriptor::default());
        let mut encoder = self
            .device
            .create_command_encoder(&CommandEncoderDescriptor {
                label: Some("Ember Encoder"),
            });

        let egui_input = self.egui_state.take_egui_input(&self.window);
        let egui_output = self.egui_context.run(egui_input, run_ui);
        self.egui_state.handle_platform_output(
            &self.window,
            &self.egui_context,
            egui_output.platform_output,
        );

        let primitives = self.egui_context.tessellate(egui_output.shapes);
        for (id, delta) in &egui_output.textures_delta.set {
            self.egui_renderer
                .update_texture(&self.device, &self.queue, *id, delta);
        }
        self.egui_renderer.update_buffers(
            &self.device,
            &self.queue,
            &mut encoder,
            &primitives,
            &self.egui_screen,
        );

        // The render pass borrows the encoder; scope it so the encoder can be
        // finished afterwards.
        {
            let mut render_pass = encoder.begin_render_pass(&RenderPassDescriptor {
                label: Some("Ember Render Pass"),
                color_attachments: &[Some(RenderPassColorAttachment {
                    view: &view,
                    resolve_target: None,
                    ops: Operations {
                        load: LoadOp::Clear(Color {
                            r: 0.0,
                            g: 0.0,
                            b: 0.0,
                            a: 1.0,
                        }),
                        store: true,
                    },
                })],
                depth_stencil_attachment: None,
            });

            self.egui_renderer
                .render(&mut render_pass, &primitives, &self.egui_screen);
        }

        for id in &egui_output.textures_delta.free {
            self.egui_renderer.free_texture(id);
        }

        self.queue.submit(iter::once(encoder.finish()));
        output.present();

        Ok(())
    }
}
