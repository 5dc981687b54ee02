//! Level descriptor
//!
//! Produced by an external loader (density map image to numbers) and handed
//! to the field read-only. Density is indexed by level column `x` (centered
//! on world sector 0) and row `z` (world sector z, starting at 0).

use glam::Vec3;
use serde::{Deserialize, Serialize};

use crate::consts::BASE_DENSITY;
use crate::error::FieldError;

/// Pickup categories, in level-file order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ItemKind {
    Fuel,
    Health,
    ExtraLife,
    Speed,
    Bomb,
}

impl ItemKind {
    pub const ALL: [ItemKind; 5] = [
        ItemKind::Fuel,
        ItemKind::Health,
        ItemKind::ExtraLife,
        ItemKind::Speed,
        ItemKind::Bomb,
    ];

    #[inline]
    pub fn index(self) -> usize {
        self as usize
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ItemKind::Fuel => "Fuel",
            ItemKind::Health => "Health",
            ItemKind::ExtraLife => "ExtraLife",
            ItemKind::Speed => "Speed",
            ItemKind::Bomb => "Bomb",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LevelDescriptor {
    pub name: String,
    width: usize,
    length: usize,
    /// Column-major: `density[x * length + z]`, each value in [0, 1]
    density: Vec<f32>,
    /// One list per `ItemKind`
    items: [Vec<Vec3>; 5],
}

impl Default for LevelDescriptor {
    /// Level with no density data, every sector uses the base density
    fn default() -> Self {
        Self {
            name: "empty".to_string(),
            width: 0,
            length: 0,
            density: Vec::new(),
            items: Default::default(),
        }
    }
}

impl LevelDescriptor {
    /// Build a level from a `width` x `length` column-major density grid
    pub fn new(name: impl Into<String>, width: usize, length: usize, density: Vec<f32>) -> Result<Self, FieldError> {
        let level = Self {
            name: name.into(),
            width,
            length,
            density,
            items: Default::default(),
        };
        level.validate()?;
        Ok(level)
    }

    /// Parse a level from JSON
    pub fn from_json(json: &str) -> Result<Self, FieldError> {
        let level: Self = serde_json::from_str(json)?;
        level.validate()?;
        Ok(level)
    }

    pub fn validate(&self) -> Result<(), FieldError> {
        if self.density.len() != self.width * self.length {
            return Err(FieldError::InvalidLevel(format!(
                "density has {} values, expected {}x{}",
                self.density.len(),
                self.width,
                self.length
            )));
        }
        if let Some(bad) = self.density.iter().find(|d| !(0.0..=1.0).contains(*d)) {
            return Err(FieldError::InvalidLevel(format!(
                "density value {} outside [0, 1]",
                bad
            )));
        }
        if self.items.iter().flatten().any(|p| !p.is_finite()) {
            return Err(FieldError::InvalidLevel("non-finite item position".to_string()));
        }
        Ok(())
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn length(&self) -> usize {
        self.length
    }

    /// Add an item position
    pub fn with_item(mut self, kind: ItemKind, position: Vec3) -> Self {
        self.items[kind.index()].push(position);
        self
    }

    pub fn items(&self, kind: ItemKind) -> &[Vec3] {
        &self.items[kind.index()]
    }

    /// Raw level density for a world sector, `None` outside the level
    pub fn level_density(&self, sector_x: i32, sector_z: i32) -> Option<f32> {
        let x = sector_x + (self.width / 2) as i32;
        let z = sector_z;
        if x < 0 || z < 0 || x as usize >= self.width || z as usize >= self.length {
            return None;
        }
        self.density.get(x as usize * self.length + z as usize).copied()
    }

    /// Spawn density for a world sector: base density plus the level value
    pub fn sector_density(&self, sector_x: i32, sector_z: i32) -> f32 {
        BASE_DENSITY + self.level_density(sector_x, sector_z).unwrap_or(0.0)
    }

    /// Goal position at the far end of the level
    pub fn target_position(&self, sector_edge: f32) -> Vec3 {
        Vec3::new(0.0, 0.0, (self.length as f32 + 1.0) * sector_edge)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn level() -> LevelDescriptor {
        // 4 columns, 3 rows; value encodes (x, z)
        let mut density = Vec::new();
        for x in 0..4 {
            for z in 0..3 {
                density.push((x * 10 + z) as f32 / 100.0);
            }
        }
        LevelDescriptor::new("test", 4, 3, density).unwrap()
    }

    #[test]
    fn test_density_lookup() {
        let level = level();
        // Column 0 is world sector x = -2
        assert_eq!(level.level_density(-2, 0), Some(0.0));
        assert_eq!(level.level_density(1, 2), Some(0.32));
        assert_eq!(level.level_density(0, 1), Some(0.21));
    }

    #[test]
    fn test_outside_level_uses_base_density() {
        let level = level();
        assert_eq!(level.level_density(-3, 0), None);
        assert_eq!(level.level_density(2, 0), None);
        assert_eq!(level.level_density(0, -1), None);
        assert_eq!(level.level_density(0, 3), None);
        assert_eq!(level.sector_density(50, 50), BASE_DENSITY);
        assert_eq!(LevelDescriptor::default().sector_density(0, 0), BASE_DENSITY);
    }

    #[test]
    fn test_invalid_levels() {
        assert!(matches!(
            LevelDescriptor::new("bad", 2, 2, vec![0.0; 3]),
            Err(FieldError::InvalidLevel(_))
        ));
        assert!(LevelDescriptor::new("bad", 1, 1, vec![1.5]).is_err());
        assert!(LevelDescriptor::new("bad", 1, 1, vec![f32::NAN]).is_err());
    }

    #[test]
    fn test_items_and_target() {
        let level = level().with_item(ItemKind::Bomb, Vec3::new(1.0, 2.0, 3.0));
        assert_eq!(level.items(ItemKind::Bomb).len(), 1);
        assert!(level.items(ItemKind::Fuel).is_empty());
        assert_eq!(level.target_position(200.0), Vec3::new(0.0, 0.0, 800.0));
    }

    #[test]
    fn test_json_roundtrip() {
        let level = level().with_item(ItemKind::Speed, Vec3::new(0.0, 0.0, 400.0));
        let json = serde_json::to_string(&level).unwrap();
        assert_eq!(LevelDescriptor::from_json(&json).unwrap(), level);
    }
}
