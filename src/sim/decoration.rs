//! Small decoration bodies
//!
//! Non-colliding filler rocks near the camera. Their transform is fixed at
//! construction and never recomputed.

use glam::{Mat4, Vec3};
use rand::Rng;

use crate::random_float;

#[derive(Debug, Clone, PartialEq)]
pub struct SmallDecorationBody {
    pub kind: usize,
    pub position: Vec3,
    pub size: f32,
    render_transform: Mat4,
}

impl SmallDecorationBody {
    /// Create a decoration with a random size and orientation
    pub fn spawn<R: Rng + ?Sized>(rng: &mut R, kind: usize, position: Vec3, base_size: f32) -> Self {
        let size = base_size + random_float(rng, -2.5, 5.0);
        let rot_x = random_float(rng, 0.0, 3.0);
        let rot_y = random_float(rng, -1.6, 1.5);
        let rot_z = random_float(rng, 0.0, 2.0);

        let render_transform = Mat4::from_translation(position)
            * Mat4::from_scale(Vec3::splat(size))
            * Mat4::from_rotation_z(rot_z)
            * Mat4::from_rotation_y(rot_y)
            * Mat4::from_rotation_x(rot_x);

        Self {
            kind,
            position,
            size,
            render_transform,
        }
    }

    #[inline]
    pub fn render_transform(&self) -> Mat4 {
        self.render_transform
    }
}
