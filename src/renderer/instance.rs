//! Instance types for batched 3D model rendering

use bytemuck::{Pod, Zeroable};
use glam::Mat4;

use crate::sim::{AsteroidInstance, DecorationInstance, ItemInstance, ModelDetail};

/// Per-instance data uploaded to the GPU
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, Pod, Zeroable)]
pub struct InstanceRaw {
    /// Column-major model matrix
    pub model: [[f32; 4]; 4],
    pub alpha: f32,
    pub _padding: [f32; 3],
}

impl InstanceRaw {
    pub fn new(transform: Mat4, alpha: f32) -> Self {
        Self {
            model: transform.to_cols_array_2d(),
            alpha: alpha.clamp(0.0, 1.0),
            _padding: [0.0; 3],
        }
    }
}

impl From<&AsteroidInstance> for InstanceRaw {
    fn from(instance: &AsteroidInstance) -> Self {
        Self::new(instance.transform, instance.alpha)
    }
}

impl From<&DecorationInstance> for InstanceRaw {
    fn from(instance: &DecorationInstance) -> Self {
        Self::new(instance.transform, instance.alpha)
    }
}

impl From<&ItemInstance> for InstanceRaw {
    fn from(instance: &ItemInstance) -> Self {
        Self::new(instance.transform, 1.0)
    }
}

/// Model a batch is drawn with
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ModelKey {
    Asteroid { kind: usize, detail: ModelDetail },
    Decoration { kind: usize },
    Item { kind: usize },
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec3;

    #[test]
    fn test_layout() {
        assert_eq!(std::mem::size_of::<InstanceRaw>(), 80);
        let raw = InstanceRaw::new(Mat4::IDENTITY, 0.5);
        let bytes: &[u8] = bytemuck::bytes_of(&raw);
        assert_eq!(bytes.len(), 80);
    }

    #[test]
    fn test_translation_in_last_column() {
        let raw = InstanceRaw::new(Mat4::from_translation(Vec3::new(1.0, 2.0, 3.0)), 1.0);
        assert_eq!(raw.model[3], [1.0, 2.0, 3.0, 1.0]);
    }

    #[test]
    fn test_alpha_clamped() {
        assert_eq!(InstanceRaw::new(Mat4::IDENTITY, -0.2).alpha, 0.0);
        assert_eq!(InstanceRaw::new(Mat4::IDENTITY, 1.7).alpha, 1.0);
    }
}
