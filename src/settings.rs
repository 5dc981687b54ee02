//! Field settings
//!
//! Grid sizing, asteroid sizes and view tuning. Loaded from JSON, every
//! missing field falls back to the game's defaults.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::FieldError;

/// Asteroid field configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FieldSettings {
    // === Grid ===
    /// Side of the full asteroid grid (odd)
    pub sector_count: usize,
    /// Side of the decoration grid (odd, at most `sector_count`)
    pub small_sector_count: usize,
    /// Edge length of one sector in world units
    pub sector_edge: f32,

    // === Asteroids ===
    pub min_asteroid_size: f32,
    pub max_asteroid_size: f32,
    /// Base size of decoration bodies
    pub small_asteroid_size: f32,
    /// Number of asteroid models available (0 means none could be loaded)
    pub asteroid_kinds: usize,
    /// Number of decoration models
    pub small_asteroid_kinds: usize,
    /// Kind id of the donut model, if the model set has one
    pub donut_kind: Option<usize>,

    // === View ===
    /// Render field of view (radians)
    pub field_of_view: f32,
    /// Fraction of the render FOV used for visibility while flying
    pub viewable_fov_factor: f32,

    /// RNG seed
    pub seed: u64,
}

impl Default for FieldSettings {
    fn default() -> Self {
        Self {
            sector_count: 19,
            small_sector_count: 7,
            sector_edge: 200.0,

            min_asteroid_size: 32.0,
            max_asteroid_size: 62.0,
            small_asteroid_size: 129.0,
            asteroid_kinds: 5,
            small_asteroid_kinds: 3,
            donut_kind: Some(4),

            field_of_view: std::f32::consts::FRAC_PI_2,
            viewable_fov_factor: 0.75,

            seed: 0x5eed_a57e,
        }
    }
}

impl FieldSettings {
    /// Index of the center cell of the full grid
    pub fn middle(&self) -> usize {
        self.sector_count / 2
    }

    /// Index of the center cell of the decoration grid
    pub fn small_middle(&self) -> usize {
        self.small_sector_count / 2
    }

    /// Offset from a decoration cell index to the matching full cell index
    pub fn small_sector_offset(&self) -> usize {
        self.middle() - self.small_middle()
    }

    pub fn max_view_depth(&self) -> f32 {
        self.sector_edge * self.middle() as f32 - self.sector_edge / 2.0
    }

    /// Distance where asteroids start fading out
    pub fn fade_out_depth(&self) -> f32 {
        self.max_view_depth() * 0.75
    }

    /// Beyond this distance the low-detail model is used
    pub fn half_view_depth(&self) -> f32 {
        self.max_view_depth() * 0.4
    }

    pub fn small_view_depth(&self) -> f32 {
        self.max_view_depth() * 0.4
    }

    pub fn small_fade_out_depth(&self) -> f32 {
        self.small_view_depth() * 0.75
    }

    /// Field of view used for the sector visibility test.
    ///
    /// Narrower than the render FOV while flying to avoid popping at the
    /// screen edges, widened to the full FOV once the game is over.
    pub fn viewable_field_of_view(&self, game_over: bool) -> f32 {
        if game_over {
            self.field_of_view
        } else {
            self.field_of_view * self.viewable_fov_factor
        }
    }

    /// Parse settings from JSON
    pub fn from_json(json: &str) -> Result<Self, FieldError> {
        let settings: Self = serde_json::from_str(json)?;
        settings.validate()?;
        Ok(settings)
    }

    /// Load settings from a JSON file
    pub fn load(path: impl AsRef<Path>) -> Result<Self, FieldError> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path)?;
        let settings = Self::from_json(&json)?;
        log::info!("Loaded field settings from {}", path.display());
        Ok(settings)
    }

    /// Load settings from a file, or use defaults if it is missing or invalid
    pub fn load_or_default(path: impl AsRef<Path>) -> Self {
        match Self::load(path) {
            Ok(settings) => settings,
            Err(e) => {
                log::warn!("Using default field settings: {}", e);
                Self::default()
            }
        }
    }

    /// Validate settings
    pub fn validate(&self) -> Result<(), FieldError> {
        if self.asteroid_kinds == 0 {
            return Err(FieldError::NoAsteroidKinds);
        }
        if self.sector_count < 5 || self.sector_count % 2 == 0 {
            return Err(FieldError::InvalidSettings(
                "sector_count must be odd and at least 5".to_string(),
            ));
        }
        if self.small_sector_count < 3
            || self.small_sector_count % 2 == 0
            || self.small_sector_count > self.sector_count
        {
            return Err(FieldError::InvalidSettings(
                "small_sector_count must be odd, at least 3 and at most sector_count".to_string(),
            ));
        }
        if !(self.sector_edge.is_finite() && self.sector_edge > 0.0) {
            return Err(FieldError::InvalidSettings(
                "sector_edge must be positive".to_string(),
            ));
        }
        if !(self.min_asteroid_size > 0.0 && self.min_asteroid_size <= self.max_asteroid_size) {
            return Err(FieldError::InvalidSettings(
                "asteroid sizes must satisfy 0 < min <= max".to_string(),
            ));
        }
        if self.small_asteroid_size <= 2.5 {
            return Err(FieldError::InvalidSettings(
                "small_asteroid_size must be greater than 2.5".to_string(),
            ));
        }
        if let Some(donut) = self.donut_kind {
            if donut >= self.asteroid_kinds {
                return Err(FieldError::InvalidSettings(format!(
                    "donut_kind {} out of range for {} kinds",
                    donut, self.asteroid_kinds
                )));
            }
        }
        if !(self.field_of_view > 0.0 && self.field_of_view < std::f32::consts::PI) {
            return Err(FieldError::InvalidSettings(
                "field_of_view must be in (0, pi)".to_string(),
            ));
        }
        if !(self.viewable_fov_factor > 0.0 && self.viewable_fov_factor <= 1.0) {
            return Err(FieldError::InvalidSettings(
                "viewable_fov_factor must be in (0, 1]".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let settings = FieldSettings::default();
        assert!(settings.validate().is_ok());
        assert_eq!(settings.middle(), 9);
        assert_eq!(settings.small_middle(), 3);
        assert_eq!(settings.small_sector_offset(), 6);
    }

    #[test]
    fn test_derived_depths() {
        let settings = FieldSettings::default();
        assert_eq!(settings.max_view_depth(), 1700.0);
        assert_eq!(settings.fade_out_depth(), 1275.0);
        assert_eq!(settings.half_view_depth(), 680.0);
        assert_eq!(settings.small_view_depth(), 680.0);
        assert_eq!(settings.small_fade_out_depth(), 510.0);
    }

    #[test]
    fn test_viewable_fov_widens_on_game_over() {
        let settings = FieldSettings::default();
        let flying = settings.viewable_field_of_view(false);
        let over = settings.viewable_field_of_view(true);
        assert!(flying < over);
        assert_eq!(over, settings.field_of_view);
    }

    #[test]
    fn test_no_kinds_is_fatal() {
        let settings = FieldSettings {
            asteroid_kinds: 0,
            ..Default::default()
        };
        assert!(matches!(settings.validate(), Err(FieldError::NoAsteroidKinds)));
    }

    #[test]
    fn test_even_grid_rejected() {
        let settings = FieldSettings {
            sector_count: 18,
            ..Default::default()
        };
        assert!(matches!(
            settings.validate(),
            Err(FieldError::InvalidSettings(_))
        ));

        let settings = FieldSettings {
            small_sector_count: 21,
            ..Default::default()
        };
        assert!(settings.validate().is_err());
    }

    #[test]
    fn test_donut_out_of_range() {
        let settings = FieldSettings {
            asteroid_kinds: 3,
            donut_kind: Some(4),
            ..Default::default()
        };
        assert!(settings.validate().is_err());
    }

    #[test]
    fn test_from_json_partial() {
        let settings = FieldSettings::from_json(r#"{ "sector_count": 11, "seed": 42 }"#).unwrap();
        assert_eq!(settings.sector_count, 11);
        assert_eq!(settings.seed, 42);
        assert_eq!(settings.sector_edge, 200.0);
    }

    #[test]
    fn test_from_json_invalid() {
        assert!(matches!(
            FieldSettings::from_json("{ not json"),
            Err(FieldError::Parse(_))
        ));
        assert!(matches!(
            FieldSettings::from_json(r#"{ "asteroid_kinds": 0 }"#),
            Err(FieldError::NoAsteroidKinds)
        ));
    }

    #[test]
    fn test_load_roundtrip_file() {
        let path = std::env::temp_dir().join(format!(
            "asteroid_field_settings_{}.json",
            std::process::id()
        ));
        let settings = FieldSettings {
            seed: 99,
            ..Default::default()
        };
        std::fs::write(&path, serde_json::to_string(&settings).unwrap()).unwrap();
        let loaded = FieldSettings::load(&path).unwrap();
        std::fs::remove_file(&path).ok();
        assert_eq!(loaded, settings);
    }

    #[test]
    fn test_load_or_default_missing_file() {
        let settings = FieldSettings::load_or_default("/nonexistent/asteroid_field.json");
        assert_eq!(settings, FieldSettings::default());
    }
}
