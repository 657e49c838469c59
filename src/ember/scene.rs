use std::error::Error;
use std::fmt;

use nalgebra::{Point3, Vector3};

/// Everything the integrator reads while a frame is in flight. Read-only
/// during a render; the editor panel mutates it between frames only.
pub struct Scene {
    pub spheres: Vec<Sphere>,
    pub materials: Vec<Material>,
}

impl Scene {
    /// Checks every material reference once, at load time, so the integrator
    /// can index materials without per-pixel bounds checks.
    pub fn validate(&self) -> Result<(), InvalidMaterialIndex> {
        for (index, sphere) in self.spheres.iter().enumerate() {
            if sphere.material_index >= self.materials.len() {
                return Err(InvalidMaterialIndex {
                    sphere: index,
                    material_index: sphere.material_index,
                    material_count: self.materials.len(),
                });
            }
        }
        Ok(())
    }
}

pub struct Sphere {
    pub position: Point3<f32>,
    pub radius: f32,
    pub material_index: usize,
}

impl Default for Sphere {
    fn default() -> Self {
        Self {
            position: Point3::origin(),
            radius: 1.0,
            material_index: 0,
        }
    }
}

pub struct Material {
    /// Per-channel reflectance, components in `[0, 1]`.
    pub albedo: Vector3<f32>,
    pub emission_color: Vector3<f32>,
    pub emission_power: f32,
}

impl Material {
    pub fn emission(&self) -> Vector3<f32> {
        self.emission_color * self.emission_power
    }
}

impl Default for Material {
    fn default() -> Self {
        Self {
            albedo: Vector3::new(1.0, 1.0, 1.0),
            emission_color: Vector3::zeros(),
            emission_power: 0.0,
        }
    }
}

/// A sphere referenced a material slot that does not exist.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InvalidMaterialIndex {
    pub sphere: usize,
    pub material_index: usize,
    pub material_count: usize,
}

impl fmt::Display for InvalidMaterialIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "sphere {} references material {} but the scene only holds {}",
            self.sphere, self.material_index, self.material_count
        )
    }
}

impl Error for InvalidMaterialIndex {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn valid_scene_passes() {
        let scene = Scene {
            spheres: vec![Sphere::default(), Sphere { material_index: 1, ..Default::default() }],
            materials: vec![Material::default(), Material::default()],
        };
        assert!(scene.validate().is_ok());
    }

    #[test]
    fn out_of_range_material_is_reported() {
        let scene = Scene {
            spheres: vec![Sphere::default(), Sphere { material_index: 3, ..Default::default() }],
            materials: vec![Material::default()],
        };

        let error = scene.validate().unwrap_err();
        assert_eq!(error.sphere, 1);
        assert_eq!(error.material_index, 3);
        assert_eq!(error.material_count, 1);
    }

    #[test]
    fn emission_scales_with_power() {
        let material = Material {
            emission_color: Vector3::new(0.8, 0.5, 0.2),
            emission_power: 2.0,
            ..Default::default()
        };
        assert_eq!(material.emission(), Vector3::new(1.6, 1.0, 0.4));
    }
}
