use std::time::Instant;

use bytemuck::cast_slice;
use eframe::egui;
use log::{error, info, warn};
use nalgebra::{Point3, Vector3};
use wgpu::SurfaceError;
use winit::dpi::{LogicalSize, PhysicalSize};
use winit::event::{ElementState, Event, KeyboardInput, VirtualKeyCode, WindowEvent};
use winit::event_loop::{ControlFlow, EventLoop};
use winit::window::WindowBuilder;

pub mod app;
pub mod camera;
pub mod ember;
pub mod util;

use app::Application;
use camera::Camera;
use ember::scene::{Material, Scene, Sphere};
use ember::texture::Image;
use ember::Renderer;

fn starting_scene() -> Scene {
    Scene {
        spheres: vec![
            Sphere {
                position: Point3::new(0.0, 0.0, 0.0),
                radius: 1.0,
                material_index: 0,
            },
            Sphere {
                position: Point3::new(2.0, 0.0, 2.0),
                radius: 1.0,
                material_index: 2,
            },
            Sphere {
                position: Point3::new(0.0, -101.0, 0.0),
                radius: 100.0,
                material_index: 1,
            },
        ],
        materials: vec![
            Material {
                albedo: Vector3::new(1.0, 0.0, 1.0),
                ..Default::default()
            },
            Material {
                albedo: Vector3::new(0.2, 0.3, 1.0),
                ..Default::default()
            },
            Material {
                albedo: Vector3::new(0.8, 0.5, 0.2),
                emission_color: Vector3::new(0.8, 0.5, 0.2),
                emission_power: 2.0,
            },
        ],
    }
}

fn save_render(renderer: &Renderer) {
    let result = image::save_buffer(
        "render.png",
        cast_slice(renderer.image_data()),
        renderer.width(),
        renderer.height(),
        image::ColorType::Rgba8,
    );
    match result {
        Ok(()) => info!(
            "saved render.png ({}x{})",
            renderer.width(),
            renderer.height()
        ),
        Err(save_error) => error!("failed to save render.png: {save_error}"),
    }
}

/// Builds the window, the renderer and the scene, then drives the event loop
/// until the window closes.
pub fn run() {
    let event_loop = EventLoop::new();
    let window = WindowBuilder::new()
        .with_title("Ember: Path Tracer")
        .with_inner_size(LogicalSize::new(1280.0, 720.0))
        .build(&event_loop)
        .unwrap();

    let mut app = pollster::block_on(Application::new(window, &event_loop));

    let mut scene = starting_scene();
    if let Err(scene_error) = scene.validate() {
        error!("invalid starting scene: {scene_error}");
        return;
    }

    let initial_size = app.size;
    let mut camera = Camera::new(45f32.to_radians(), 0.1, 100.0, initial_size);
    let mut renderer = Renderer::new(initial_size.width, initial_size.height);
    let mut image = Image::new(
        &app.device,
        initial_size.width,
        initial_size.height,
        "Ember Output",
    );
    let mut texture_id = app.register_texture(&image.view);

    // The central panel reports how much room the traced image has; the
    // renderer follows that size on the next frame.
    let mut viewport = initial_size;
    let mut last_frame = Instant::now();
    let mut last_render_ms = 0.0f32;

    info!(
        "starting at {}x{} with {} spheres",
        viewport.width,
        viewport.height,
        scene.spheres.len()
    );

    event_loop.run(move |event, _, control_flow| match event {
        Event::WindowEvent {
            ref event,
            window_id,
        } if window_id == app.window.id() => {
            let over_ui = app.input(event) || app.wants_pointer();
            camera.input(event, over_ui);

            match event {
                WindowEvent::CloseRequested
                | WindowEvent::KeyboardInput {
                    input:
                        KeyboardInput {
                            state: ElementState::Pressed,
                            virtual_keycode: Some(VirtualKeyCode::Escape),
                            ..
                        },
                    ..
                } => *control_flow = ControlFlow::ExitWithCode(0),

                WindowEvent::Resized(physical_size) => app.resize(*physical_size),
                WindowEvent::ScaleFactorChanged { new_inner_size, .. } => {
                    app.resize(**new_inner_size)
                }
                _ => {}
            }
        }

        Event::RedrawRequested(window_id) if window_id == app.window.id() => {
            let now = Instant::now();
            let time_step = (now - last_frame).as_secs_f32();
            last_frame = now;

            if camera.update(time_step) {
                renderer.reset_frame_index();
            }

            // Follow the viewport measured by last frame's UI. Renderer,
            // camera and texture resize together; all of them ignore a
            // no-change resize.
            renderer.on_resize(viewport.width, viewport.height);
            camera.resize(PhysicalSize::new(renderer.width(), renderer.height()));
            let render_size = PhysicalSize::new(renderer.width(), renderer.height());
            if image.size() != render_size {
                image.resize(&app.device, render_size);
                app.free_texture(texture_id);
                texture_id = app.register_texture(&image.view);
            }

            let render_start = Instant::now();
            renderer.render(&scene, &camera);
            last_render_ms = render_start.elapsed().as_secs_f32() * 1000.0;

            image.write(&app.queue, cast_slice(renderer.image_data()));

            let mut scene_changed = false;
            let mut reset_clicked = false;
            let mut save_clicked = false;
            let mut measured_viewport = viewport;

            let result = app.render(|ctx| {
                egui::SidePanel::right("settings")
                    .default_width(240.0)
                    .show(ctx, |ui| {
                        ui.heading("Renderer");
                        ui.label(format!("last render: {last_render_ms:.2} ms"));
                        ui.label(format!("frame index: {}", renderer.frame_index()));
                        ui.checkbox(&mut renderer.settings.accumulate, "Accumulate");
                        ui.checkbox(&mut renderer.settings.slow_random, "Slow random source");
                        if ui.button("Reset accumulation").clicked() {
                            reset_clicked = true;
                        }
                        if ui.button("Save PNG").clicked() {
                            save_clicked = true;
                        }

                        ui.separator();
                        ui.heading("Spheres");
                        let material_count = scene.materials.len();
                        for (index, sphere) in scene.spheres.iter_mut().enumerate() {
                            ui.push_id(index, |ui| {
                                ui.label(format!("Sphere {index}"));
                                ui.horizontal(|ui| {
                                    for component in sphere.position.iter_mut() {
                                        scene_changed |= ui
                                            .add(egui::DragValue::new(component).speed(0.1))
                                            .changed();
                                    }
                                });
                                scene_changed |= ui
                                    .add(
                                        egui::Slider::new(&mut sphere.radius, 0.1..=100.0)
                                            .text("radius"),
                                    )
                                    .changed();
                                scene_changed |= ui
                                    .add(
                                        egui::Slider::new(
                                            &mut sphere.material_index,
                                            0..=material_count - 1,
                                        )
                                        .text("material"),
                                    )
                                    .changed();
                                ui.separator();
                            });
                        }

                        ui.heading("Materials");
                        for (index, material) in scene.materials.iter_mut().enumerate() {
                            ui.push_id(material_count + index, |ui| {
                                ui.label(format!("Material {index}"));

                                let mut albedo =
                                    [material.albedo.x, material.albedo.y, material.albedo.z];
                                if ui.color_edit_button_rgb(&mut albedo).changed() {
                                    material.albedo = Vector3::from(albedo);
                                    scene_changed = true;
                                }

                                let mut emission = [
                                    material.emission_color.x,
                                    material.emission_color.y,
                                    material.emission_color.z,
                                ];
                                if ui.color_edit_button_rgb(&mut emission).changed() {
                                    material.emission_color = Vector3::from(emission);
                                    scene_changed = true;
                                }

                                scene_changed |= ui
                                    .add(
                                        egui::Slider::new(&mut material.emission_power, 0.0..=10.0)
                                            .text("emission"),
                                    )
                                    .changed();
                                ui.separator();
                            });
                        }
                    });

                egui::CentralPanel::default().show(ctx, |ui| {
                    let available = ui.available_size();
                    measured_viewport = PhysicalSize::new(
                        available.x.max(1.0) as u32,
                        available.y.max(1.0) as u32,
                    );
                    ui.image(texture_id, available);
                });
            });

            viewport = measured_viewport;
            if scene_changed || reset_clicked {
                renderer.reset_frame_index();
            }
            if save_clicked {
                save_render(&renderer);
            }

            match result {
                Ok(()) => {}
                Err(SurfaceError::Lost | SurfaceError::Outdated) => app.reconfigure(),
                Err(SurfaceError::OutOfMemory) => {
                    error!("surface out of memory");
                    *control_flow = ControlFlow::ExitWithCode(1);
                }
                Err(surface_error) => warn!("dropped frame: {surface_error:?}"),
            }
        }

        Event::MainEventsCleared => app.window.request_redraw(),

        _ => {}
    });
}
