use log::warn;
use nalgebra::{Point3, Vector3, Vector4};
use rayon::prelude::*;

use crate::camera::Camera;
use crate::ember::random::{PcgRandom, RandomSource, ThreadRandom};
use crate::ember::ray::Ray;
use crate::ember::scene::Scene;
use crate::util::pack_rgba;

pub mod random;
pub mod ray;
pub mod scene;
pub mod texture;

#[derive(Clone, Copy)]
pub struct Settings {
    /// Average frames over time instead of restarting from one sample each
    /// frame.
    pub accumulate: bool,
    /// Use the thread-local rand source instead of the PCG hash. Same
    /// distribution, slower, not reproducible; kept for comparison.
    pub slow_random: bool,
    /// Hard cap on path length. Bounds worst-case cost; biases energy in
    /// high-albedo scenes compared to Russian-roulette termination.
    pub bounces: u32,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            accumulate: true,
            slow_random: false,
            bounces: 5,
        }
    }
}

/// Progressive path tracer over the scene's sphere list.
///
/// Owns the per-pixel accumulation buffer and the packed output buffer; both
/// always match the current resolution and are reallocated together. The
/// camera's ray table and the presentable texture belong to collaborators.
pub struct Renderer {
    width: u32,
    height: u32,
    image_data: Vec<u32>,
    accumulation: Vec<Vector4<f32>>,
    frame_index: u32,
    pub settings: Settings,
}

impl Renderer {
    pub fn new(width: u32, height: u32) -> Self {
        debug_assert!(width > 0 && height > 0);
        let pixels = (width * height) as usize;

        Self {
            width,
            height,
            image_data: vec![0; pixels],
            accumulation: vec![Vector4::zeros(); pixels],
            frame_index: 1,
            settings: Settings::default(),
        }
    }

    /// Reallocates both buffers for a new resolution and restarts
    /// accumulation. A resize to the current size is a no-op; a zero-sized
    /// resize is rejected, since rendering into empty buffers is undefined.
    pub fn on_resize(&mut self, width: u32, height: u32) {
        if width == self.width && height == self.height {
            return;
        }
        if width == 0 || height == 0 {
            warn!("ignoring resize to {width}x{height}");
            return;
        }

        let pixels = (width * height) as usize;
        self.width = width;
        self.height = height;
        self.image_data = vec![0; pixels];
        self.accumulation = vec![Vector4::zeros(); pixels];
        self.frame_index = 1;
    }

    /// Renders one frame into the output buffer. The scene and camera are
    /// read-only for the duration of the call; the caller must not mutate
    /// them or resize concurrently.
    pub fn render(&mut self, scene: &Scene, camera: &Camera) {
        debug_assert_eq!(
            camera.ray_directions().len(),
            (self.width * self.height) as usize
        );

        if self.frame_index == 1 {
            self.accumulation.fill(Vector4::zeros());
        }

        let width = self.width;
        let frame_index = self.frame_index;
        let settings = self.settings;

        // Rows fan out across the thread pool; every task owns a disjoint
        // pair of row slices, so no synchronization is needed.
        self.accumulation
            .par_chunks_mut(width as usize)
            .zip(self.image_data.par_chunks_mut(width as usize))
            .enumerate()
            .for_each(|(y, (accumulation_row, image_row))| {
                for (x, (accumulated, out)) in
                    accumulation_row.iter_mut().zip(image_row).enumerate()
                {
                    let color =
                        per_pixel(scene, camera, x as u32, y as u32, width, frame_index, &settings);
                    *accumulated += color;

                    let averaged = (*accumulated / frame_index as f32)
                        .map(|channel| channel.clamp(0.0, 1.0));
                    *out = pack_rgba(&averaged);
                }
            });

        if self.settings.accumulate {
            self.frame_index += 1;
        } else {
            self.frame_index = 1;
        }
    }

    /// Restarts the converging sequence. Called whenever the camera moves or
    /// the scene is edited.
    pub fn reset_frame_index(&mut self) {
        self.frame_index = 1;
    }

    /// Packed pixels of the last completed frame, row-major, `0xAABBGGRR`.
    pub fn image_data(&self) -> &[u32] {
        &self.image_data
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn frame_index(&self) -> u32 {
        self.frame_index
    }
}

pub struct HitPayload {
    pub distance: f32,
    pub position: Point3<f32>,
    pub normal: Vector3<f32>,
    pub object_index: usize,
}

/// Evaluates the light transported to one pixel: up to `settings.bounces`
/// path segments, accumulating emission and attenuating by albedo.
///
/// Emission is deliberately added at full weight instead of being scaled by
/// the running throughput; only later bounces see the albedo product. Sky
/// contribution on a miss is disabled, so escaping paths just end.
///
/// Pure function of its arguments (plus the locally advanced seed), so it can
/// run concurrently for independent pixels.
fn per_pixel(
    scene: &Scene,
    camera: &Camera,
    x: u32,
    y: u32,
    width: u32,
    frame_index: u32,
    settings: &Settings,
) -> Vector4<f32> {
    let index = (x + y * width) as usize;
    let mut ray = Ray {
        origin: camera.position,
        direction: camera.ray_directions()[index],
    };

    let mut light = Vector3::zeros();
    let mut throughput = Vector3::new(1.0, 1.0, 1.0);

    let seed = (x + y * width).wrapping_mul(frame_index);
    let mut pcg = PcgRandom::new(seed);
    let mut thread = ThreadRandom;
    let rng: &mut dyn RandomSource = if settings.slow_random {
        &mut thread
    } else {
        &mut pcg
    };

    for bounce in 0..settings.bounces {
        rng.perturb(bounce);

        let Some(payload) = trace_ray(&ray, scene) else {
            break;
        };

        let sphere = &scene.spheres[payload.object_index];
        let material = &scene.materials[sphere.material_index];

        light += material.emission();
        throughput.component_mul_assign(&material.albedo);

        // Step off the surface so the next trace does not hit it again at
        // distance zero.
        ray.origin = payload.position + payload.normal * 1e-4;
        ray.direction = (payload.normal + rng.in_unit_sphere()).normalize();
    }

    Vector4::new(light.x, light.y, light.z, 1.0)
}

/// Closest-hit test against every sphere in the scene. Strict `t > 0`, and
/// strict `<` on the running minimum keeps the lowest-index sphere on ties.
/// A miss is `None`. Pure function of `(ray, scene)`.
pub fn trace_ray(ray: &Ray, scene: &Scene) -> Option<HitPayload> {
    let mut closest: Option<(usize, f32)> = None;

    for (index, sphere) in scene.spheres.iter().enumerate() {
        // Solve the quadratic of the ray against the sphere, with the ray
        // origin shifted into sphere-local space.
        let origin = ray.origin - sphere.position;

        let a = ray.direction.magnitude_squared();
        let b = 2.0 * ray.direction.dot(&origin);
        let c = origin.magnitude_squared() - sphere.radius * sphere.radius;

        let discriminant = b * b - 4.0 * a * c;
        if discriminant < 0.0 {
            continue;
        }

        // Near root only; the far root is the back of the sphere.
        let t = (-b - discriminant.sqrt()) / (2.0 * a);
        if t > 0.0 && closest.map_or(true, |(_, nearest)| t < nearest) {
            closest = Some((index, t));
        }
    }

    closest.map(|(index, distance)| closest_hit(ray, scene, distance, index))
}

fn closest_hit(ray: &Ray, scene: &Scene, distance: f32, object_index: usize) -> HitPayload {
    let sphere = &scene.spheres[object_index];

    let origin = ray.origin - sphere.position;
    let local_position = origin + ray.direction * distance;

    HitPayload {
        distance,
        position: sphere.position + local_position,
        // Exact for a sphere: the normal points from the center to the hit.
        normal: local_position.normalize(),
        object_index,
    }
}
