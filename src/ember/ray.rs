use nalgebra::{Point3, Vector3};

/// One segment of a light path. The intersection math does not require the
/// direction to be normalized; bounce directions are normalized when derived.
pub struct Ray {
    pub origin: Point3<f32>,
    pub direction: Vector3<f32>,
}
