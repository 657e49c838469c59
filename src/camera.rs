use std::ops::Add;

use nalgebra::{Isometry3, Matrix4, Perspective3, Point3, Unit, Vector2, Vector3, Vector4};
use rayon::prelude::*;
use winit::dpi::{PhysicalPosition, PhysicalSize};
use winit::event::{
    ElementState, KeyboardInput, MouseButton, VirtualKeyCode, WindowEvent,
};

/// Interactive pinhole camera. Owns the per-pixel ray-direction table the
/// renderer indexes row-major (`x + y * width`); the table is regenerated
/// whenever the camera moves, turns, or the viewport changes size.
pub struct Camera {
    projection: Perspective3<f32>,
    view: Isometry3<f32>,

    vertical_fov: f32,
    near: f32,
    far: f32,

    pub position: Point3<f32>,
    forward: Unit<Vector3<f32>>,

    rays: Vec<Vector3<f32>>,
    last_mouse: PhysicalPosition<f64>,

    viewport_size: PhysicalSize<u32>,

    // WASD Space Shift
    inputs: [bool; 6],
    looking: bool,
}

impl Camera {
    pub fn new(vertical_fov: f32, near: f32, far: f32, viewport_size: PhysicalSize<u32>) -> Self {
        let position = Point3::new(0.0, 0.0, -6.0);
        let forward = Vector3::z_axis();
        let target = position.add(forward.into_inner());
        let view = Isometry3::look_at_lh(&position, &target, &Vector3::y_axis());

        let mut camera = Self {
            projection: Self::projection_for(viewport_size, vertical_fov, near, far),
            view,
            vertical_fov,
            near,
            far,
            position,
            forward,
            rays: vec![],
            last_mouse: Default::default(),
            viewport_size,
            inputs: [false; 6],
            looking: false,
        };

        camera.reevaluate_rays();
        camera
    }

    /// Routes window events into fly controls. Mouse look is active while the
    /// right button is held and the pointer is not over the UI.
    pub fn input(&mut self, event: &WindowEvent, over_ui: bool) -> bool {
        match event {
            WindowEvent::MouseInput {
                state,
                button: MouseButton::Right,
                ..
            } => {
                self.looking = matches!(state, ElementState::Pressed) && !over_ui;
                true
            }
            WindowEvent::CursorMoved { position, .. } => {
                let delta = Vector2::new(
                    (position.x - self.last_mouse.x) as f32,
                    (position.y - self.last_mouse.y) as f32,
                ) * 0.002;
                self.last_mouse = *position;

                if !self.looking || over_ui {
                    return false;
                }

                let up: Unit<Vector3<f32>> = Vector3::y_axis();
                let right = Unit::new_normalize(up.cross(&self.forward));

                let pitch = delta.y * self.rotation_speed();
                let yaw = delta.x * self.rotation_speed();

                let turn = nalgebra::UnitQuaternion::from_axis_angle(&right, pitch)
                    * nalgebra::UnitQuaternion::from_axis_angle(&up, yaw);

                self.forward = turn * self.forward;
                self.forward.renormalize_fast();

                self.reevaluate_view();
                self.reevaluate_rays();

                true
            }
            WindowEvent::KeyboardInput {
                input:
                    KeyboardInput {
                        state,
                        virtual_keycode: Some(key),
                        ..
                    },
                ..
            } => {
                let pressed = matches!(state, ElementState::Pressed);
                match key {
                    VirtualKeyCode::W => self.inputs[0] = pressed,
                    VirtualKeyCode::A => self.inputs[1] = pressed,
                    VirtualKeyCode::S => self.inputs[2] = pressed,
                    VirtualKeyCode::D => self.inputs[3] = pressed,
                    VirtualKeyCode::Space => self.inputs[4] = pressed,
                    VirtualKeyCode::LShift => self.inputs[5] = pressed,
                    _ => return false,
                };
                true
            }
            _ => false,
        }
    }

    /// Applies held movement keys. Returns whether the camera moved, so the
    /// caller knows to restart accumulation.
    pub fn update(&mut self, time_step: f32) -> bool {
        let time_step = time_step.min(1.0 / 60.0);

        let up: Unit<Vector3<f32>> = Vector3::y_axis();
        let right = up.cross(&self.forward);
        let step = self.movement_speed() * time_step;
        let mut moved = false;

        if self.inputs[0] {
            self.position += self.forward.scale(step);
            moved = true;
        }
        if self.inputs[1] {
            self.position -= right.scale(step);
            moved = true;
        }
        if self.inputs[2] {
            self.position -= self.forward.scale(step);
            moved = true;
        }
        if self.inputs[3] {
            self.position += right.scale(step);
            moved = true;
        }
        if self.inputs[4] {
            self.position += up.scale(step);
            moved = true;
        }
        if self.inputs[5] {
            self.position -= up.scale(step);
            moved = true;
        }

        if moved {
            self.reevaluate_view();
            self.reevaluate_rays();
        }

        moved
    }

    pub fn resize(&mut self, new_size: PhysicalSize<u32>) {
        if new_size == self.viewport_size || new_size.width == 0 || new_size.height == 0 {
            return;
        }
        self.viewport_size = new_size;

        self.projection =
            Self::projection_for(new_size, self.vertical_fov, self.near, self.far);
        self.reevaluate_rays();
    }

    pub fn ray_directions(&self) -> &[Vector3<f32>] {
        &self.rays
    }

    pub fn rotation_speed(&self) -> f32 {
        0.7
    }

    pub fn movement_speed(&self) -> f32 {
        5.0
    }

    fn projection_for(
        viewport_size: PhysicalSize<u32>,
        vertical_fov: f32,
        near: f32,
        far: f32,
    ) -> Perspective3<f32> {
        let aspect = viewport_size.width as f32 / viewport_size.height as f32;

        // Perspective3 is right handed; flip z to match the left-handed view.
        let right_handed = Perspective3::new(aspect, vertical_fov, near, far).into_inner();
        let mut z_flip = Matrix4::identity();
        z_flip[(2, 2)] = -1.0;
        Perspective3::from_matrix_unchecked(right_handed * z_flip)
    }

    fn reevaluate_view(&mut self) {
        let target = self.position.add(self.forward.into_inner());
        self.view = Isometry3::look_at_lh(&self.position, &target, &Vector3::y_axis());
    }

    fn reevaluate_rays(&mut self) {
        let width = self.viewport_size.width;
        let height = self.viewport_size.height;
        let inverse_projection = self.projection.inverse();
        let view = &self.view;

        self.rays = (0..width * height)
            .into_par_iter()
            .map(|index| {
                let x = index % width;
                let y = index / width;

                let coord = Vector2::new(
                    x as f32 / width as f32,
                    y as f32 / height as f32,
                ) * 2.0
                    - Vector2::new(1.0, 1.0);

                let target = inverse_projection * Vector4::new(coord.x, coord.y, 1.0, 1.0);

                let mut normalized = target.xyz().normalize();
                if target.w.is_sign_negative() {
                    normalized = -normalized;
                }

                view.inverse_transform_vector(&normalized)
            })
            .collect();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn camera(width: u32, height: u32) -> Camera {
        Camera::new(45f32.to_radians(), 0.1, 100.0, PhysicalSize::new(width, height))
    }

    #[test]
    fn ray_table_matches_resolution() {
        let camera = camera(8, 6);
        assert_eq!(camera.ray_directions().len(), 48);
    }

    #[test]
    fn center_ray_points_forward() {
        let camera = camera(4, 4);
        // Pixel (2, 2) of a 4x4 grid maps to clip coordinate (0, 0).
        let direction = camera.ray_directions()[2 + 2 * 4];
        assert!(direction.z > 0.9, "center ray {direction:?} should face +z");
        assert!((direction.magnitude() - 1.0).abs() < 1e-3);
    }

    #[test]
    fn resize_regenerates_the_table() {
        let mut camera = camera(4, 4);
        camera.resize(PhysicalSize::new(10, 5));
        assert_eq!(camera.ray_directions().len(), 50);
    }

    #[test]
    fn resize_to_same_or_zero_size_keeps_the_table() {
        let mut camera = camera(4, 4);
        camera.resize(PhysicalSize::new(4, 4));
        camera.resize(PhysicalSize::new(0, 4));
        assert_eq!(camera.ray_directions().len(), 16);
    }

    #[test]
    fn movement_keys_translate_the_camera() {
        let mut camera = camera(4, 4);
        let before = camera.position;

        let pressed = WindowEvent::KeyboardInput {
            device_id: unsafe { winit::event::DeviceId::dummy() },
            input: KeyboardInput {
                scancode: 0,
                state: ElementState::Pressed,
                virtual_keycode: Some(VirtualKeyCode::W),
                modifiers: Default::default(),
            },
            is_synthetic: false,
        };
        assert!(camera.input(&pressed, false));
        assert!(camera.update(1.0 / 60.0));
        assert!(camera.position.z > before.z);
    }
}
