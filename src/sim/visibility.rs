//! Sector visibility
//!
//! `in_range` and `direction` depend only on a cell's offset from the grid
//! center and are computed once. `visible` is refreshed every tick from the
//! camera orientation.

use glam::Vec3;

use super::camera::CameraState;
use crate::angle_between;
use crate::consts::*;
use crate::error::CollisionFault;

#[derive(Debug, Clone, PartialEq)]
pub struct VisibilityField {
    side: usize,
    in_range: Vec<bool>,
    /// Unit direction from the center cell towards each cell (zero for the center)
    direction: Vec<Vec3>,
    visible: Vec<bool>,
}

impl VisibilityField {
    /// Precompute range and direction for a `side` x `side` grid.
    ///
    /// Every cell starts out visible until the first refresh.
    pub fn new(side: usize) -> Self {
        let middle = (side / 2) as i32;
        let mut in_range = Vec::with_capacity(side * side);
        let mut direction = Vec::with_capacity(side * side);
        for iz in 0..side as i32 {
            for ix in 0..side as i32 {
                let (x, z) = ((ix - middle) as f32, (iz - middle) as f32);
                in_range.push((x * x + z * z).sqrt() < middle as f32 + IN_RANGE_SLACK);
                direction.push(Vec3::new(x, 0.0, z).normalize_or_zero());
            }
        }
        Self {
            side,
            in_range,
            direction,
            visible: vec![true; side * side],
        }
    }

    pub fn side(&self) -> usize {
        self.side
    }

    #[inline]
    fn index(&self, ix: usize, iz: usize) -> usize {
        iz * self.side + ix
    }

    /// Always-visible cells around the camera
    #[inline]
    pub fn is_inner_diamond(&self, ix: usize, iz: usize) -> bool {
        let middle = (self.side / 2) as i32;
        (ix as i32 - middle).abs() + (iz as i32 - middle).abs() <= INNER_DIAMOND
    }

    pub fn in_range(&self, ix: usize, iz: usize) -> bool {
        self.in_range[self.index(ix, iz)]
    }

    pub fn direction(&self, ix: usize, iz: usize) -> Vec3 {
        self.direction[self.index(ix, iz)]
    }

    #[inline]
    pub fn is_visible(&self, ix: usize, iz: usize) -> bool {
        self.visible[self.index(ix, iz)]
    }

    /// Visibility flags, row-major like the sector grid
    pub fn visible_flags(&self) -> &[bool] {
        &self.visible
    }

    pub fn visible_count(&self) -> usize {
        self.visible.iter().filter(|v| **v).count()
    }

    /// Recompute visibility for the camera's orientation.
    ///
    /// A degenerate view direction leaves the previous flags untouched.
    pub fn refresh(&mut self, camera: &CameraState) -> Result<(), CollisionFault> {
        if !camera.forward.is_finite() {
            return Err(CollisionFault::NonFinite("camera forward"));
        }
        let forward = camera.forward.normalize_or_zero();
        if forward == Vec3::ZERO {
            return Err(CollisionFault::DegenerateCamera);
        }

        let steep = forward.y.abs() >= STEEP_PITCH;
        for iz in 0..self.side {
            for ix in 0..self.side {
                let i = self.index(ix, iz);
                let mut visible = self.in_range[i];
                if visible && !steep {
                    visible = angle_between(forward, self.direction[i]) < camera.viewable_fov;
                }
                if self.is_inner_diamond(ix, iz) {
                    visible = true;
                }
                self.visible[i] = visible;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn camera(forward: Vec3) -> CameraState {
        CameraState::new(Vec3::ZERO, forward, std::f32::consts::FRAC_PI_2 * 0.75)
    }

    #[test]
    fn test_static_range_and_direction() {
        let field = VisibilityField::new(19);
        assert!(field.in_range(9, 9));
        assert!(field.in_range(18, 9));
        // Corners lie outside the view circle
        assert!(!field.in_range(0, 0));
        assert!(!field.in_range(18, 18));
        assert_eq!(field.direction(10, 9), Vec3::X);
        assert_eq!(field.direction(9, 8), Vec3::NEG_Z);
        assert_eq!(field.direction(9, 9), Vec3::ZERO);
    }

    #[test]
    fn test_looking_forward_culls_behind() {
        let mut field = VisibilityField::new(19);
        field.refresh(&camera(Vec3::Z)).unwrap();
        // Ahead
        assert!(field.is_visible(9, 15));
        // Behind, outside the inner diamond
        assert!(!field.is_visible(9, 3));
        // Behind but inside the inner diamond
        assert!(field.is_visible(9, 7));
        // Out of range even when ahead
        assert!(!field.is_visible(18, 18));
    }

    #[test]
    fn test_steep_pitch_shows_all_in_range() {
        let mut field = VisibilityField::new(19);
        field.refresh(&camera(Vec3::new(0.0, 0.9, 0.3))).unwrap();
        for iz in 0..19 {
            for ix in 0..19 {
                assert_eq!(field.is_visible(ix, iz), field.in_range(ix, iz));
            }
        }
    }

    #[test]
    fn test_wider_fov_shows_more() {
        let mut narrow = VisibilityField::new(19);
        let mut wide = VisibilityField::new(19);
        let mut cam = camera(Vec3::X);
        narrow.refresh(&cam).unwrap();
        cam.viewable_fov = std::f32::consts::FRAC_PI_2;
        wide.refresh(&cam).unwrap();
        assert!(wide.visible_count() > narrow.visible_count());
    }

    #[test]
    fn test_degenerate_forward_keeps_flags() {
        let mut field = VisibilityField::new(19);
        field.refresh(&camera(Vec3::Z)).unwrap();
        let before = field.clone();
        let cam = CameraState {
            forward: Vec3::ZERO,
            ..camera(Vec3::Z)
        };
        assert_eq!(field.refresh(&cam), Err(CollisionFault::DegenerateCamera));
        assert_eq!(field, before);
    }

    proptest! {
        #[test]
        fn prop_inner_diamond_always_visible(
            x in -1.0f32..1.0,
            y in -1.0f32..1.0,
            z in -1.0f32..1.0,
            fov in 0.01f32..1.5,
        ) {
            prop_assume!(Vec3::new(x, y, z).length() > 1e-3);
            let mut field = VisibilityField::new(19);
            let cam = CameraState::new(Vec3::ZERO, Vec3::new(x, y, z), fov);
            field.refresh(&cam).unwrap();
            for iz in 0..19usize {
                for ix in 0..19usize {
                    if (ix as i32 - 9).abs() + (iz as i32 - 9).abs() <= 2 {
                        prop_assert!(field.is_visible(ix, iz));
                    }
                }
            }
        }
    }
}
