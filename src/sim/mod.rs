//! Deterministic asteroid field simulation
//!
//! All field logic lives here. This module stays free of threading and
//! rendering concerns:
//! - Seeded RNG only
//! - Stable iteration order (row-major sector cells)
//! - Per-tick faults are absorbed, never propagated as panics

pub mod asteroid;
pub mod camera;
pub mod collision;
pub mod decoration;
pub mod events;
pub mod field;
pub mod level;
pub mod player;
pub mod sector;
pub mod tick;
pub mod visibility;

pub use asteroid::{AsteroidBody, SpawnRoll};
pub use camera::CameraState;
pub use collision::{CollisionStats, CollisionSystem, reflect_velocity, resolve_collision};
pub use decoration::SmallDecorationBody;
pub use events::{EventQueue, FieldEvent};
pub use field::{
    AsteroidField, AsteroidInstance, DecorationInstance, FieldSnapshot, FieldStats, ItemInstance,
    ModelDetail,
};
pub use level::{ItemKind, LevelDescriptor};
pub use player::{FrameTiming, PlayerState, collect_items, player_asteroid_collision};
pub use sector::{DecorationSector, GridShift, Sector, SectorGrid, SectorId};
pub use tick::{TickInput, TickPhase, TickReport, tick};
pub use visibility::VisibilityField;
