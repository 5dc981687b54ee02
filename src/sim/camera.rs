//! Camera state supplied by the external camera controller each tick

use glam::{Mat4, Vec3};
use serde::{Deserialize, Serialize};

use crate::error::CollisionFault;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CameraState {
    pub position: Vec3,
    /// Unit view direction
    pub forward: Vec3,
    pub up: Vec3,
    /// Field of view used for sector visibility (radians)
    pub viewable_fov: f32,
}

impl Default for CameraState {
    /// Camera at the origin looking down +Z (into the level)
    fn default() -> Self {
        Self {
            position: Vec3::ZERO,
            forward: Vec3::Z,
            up: Vec3::Y,
            viewable_fov: std::f32::consts::FRAC_PI_2 * 0.75,
        }
    }
}

impl CameraState {
    pub fn new(position: Vec3, forward: Vec3, viewable_fov: f32) -> Self {
        Self {
            position,
            forward: forward.normalize_or_zero(),
            up: Vec3::Y,
            viewable_fov,
        }
    }

    /// Forward and up must be finite, non-zero and not parallel
    pub fn validate(&self) -> Result<(), CollisionFault> {
        if !self.position.is_finite() || !self.forward.is_finite() || !self.up.is_finite() {
            return Err(CollisionFault::NonFinite("camera"));
        }
        if self.forward.length_squared() < 1e-8 || self.forward.cross(self.up).length_squared() < 1e-8 {
            return Err(CollisionFault::DegenerateCamera);
        }
        Ok(())
    }

    /// Vertical component of the view direction
    #[inline]
    pub fn pitch_component(&self) -> f32 {
        self.forward.y
    }

    pub fn view_matrix(&self) -> Result<Mat4, CollisionFault> {
        self.validate()?;
        Ok(Mat4::look_to_rh(self.position, self.forward.normalize(), self.up))
    }

    /// Rotate a world-space direction into camera space (x right, y up, -z forward)
    pub fn to_camera_space(&self, direction: Vec3) -> Result<Vec3, CollisionFault> {
        let view = self.view_matrix()?;
        let v = view.transform_vector3(direction);
        if v.is_finite() {
            Ok(v)
        } else {
            Err(CollisionFault::NonFinite("camera space"))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_camera_space_axes() {
        let cam = CameraState::default();
        let right = cam.to_camera_space(Vec3::new(-1.0, 0.0, 0.0)).unwrap();
        // Looking down +Z with +Y up, world -X is to the right
        assert!((right - Vec3::X).length() < 1e-5);
        let ahead = cam.to_camera_space(Vec3::Z).unwrap();
        assert!((ahead - Vec3::NEG_Z).length() < 1e-5);
        let above = cam.to_camera_space(Vec3::Y).unwrap();
        assert!((above - Vec3::Y).length() < 1e-5);
    }

    #[test]
    fn test_degenerate_camera() {
        let cam = CameraState {
            forward: Vec3::Y,
            ..Default::default()
        };
        assert_eq!(cam.validate(), Err(CollisionFault::DegenerateCamera));

        let cam = CameraState {
            forward: Vec3::ZERO,
            ..Default::default()
        };
        assert_eq!(cam.view_matrix(), Err(CollisionFault::DegenerateCamera));

        let cam = CameraState {
            position: Vec3::splat(f32::NAN),
            ..Default::default()
        };
        assert!(matches!(cam.validate(), Err(CollisionFault::NonFinite(_))));
    }
}
