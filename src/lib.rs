//! Asteroid Field - simulation core for a 3D space-flight arcade game
//!
//! Core modules:
//! - `sim`: Sector grid, visibility, collisions and the per-tick loop
//! - `worker`: Dedicated simulation thread with snapshot publication
//! - `renderer`: GPU-ready instance data built from published snapshots
//! - `settings`: Data-driven field configuration
//! - `error`: Fatal and per-tick error types

pub mod error;
pub mod renderer;
pub mod settings;
pub mod sim;
pub mod worker;

pub use error::{CollisionFault, FieldError};
pub use settings::FieldSettings;

use glam::Vec3;
use rand::Rng;

/// Game tuning constants
pub mod consts {
    /// Collision radius correction applied to the render radius.
    /// Non-spherical kinds get it twice, the donut three times.
    pub const COLLISION_SIZE_CORRECTION: f32 = 0.914_959_4;

    /// Margin added when pushing two overlapping bodies apart
    pub const SEPARATION_MARGIN: f32 = 1.015;

    /// Sectors whose offsets both lie inside this band only test their own cell
    pub const INTERIOR_BORDER: f32 = 0.4;

    /// Vertical spawn spread around the camera altitude (in sector edges)
    pub const SPAWN_VERTICAL_SPREAD: f32 = 3.15;
    /// Per-axis spawn jitter around the sector center (in sector edges)
    pub const SPAWN_JITTER: f32 = 0.42;
    /// Base density used for every sector (and for sectors outside the level)
    pub const BASE_DENSITY: f32 = 0.1;

    /// Initial speed range (world units per second, sign flips direction)
    pub const SPAWN_SPEED: f32 = 20.0;
    /// Roll below this (out of 100) creates a fast, fast-spinning asteroid
    pub const FAST_ASTEROID_PERCENT: usize = 5;
    /// Roll below this (out of 100) doubles the speed
    pub const QUICK_ASTEROID_PERCENT: usize = 40;

    /// Vertical spread of decoration bodies (in sector edges)
    pub const DECORATION_VERTICAL_SPREAD: f32 = 2.1;

    /// Cells with |x| + |z| at or below this are always visible
    pub const INNER_DIAMOND: i32 = 2;
    /// Looking up or down further than this makes every in-range sector visible
    pub const STEEP_PITCH: f32 = 0.75;
    /// Extra slack (in sectors) for the static in-range test
    pub const IN_RANGE_SLACK: f32 = 0.25;

    /// Player hit test, fraction of the render radius
    pub const PLAYER_HIT_RADIUS: f32 = 0.825_157_8;
    /// Movement speed of the player ship at full throttle (units per second)
    pub const MOVEMENT_SPEED_PER_SECOND: f32 = 1111.0;
    /// Maximum number of bomb (shield) charges
    pub const MAX_BOMB_ITEMS: u32 = 3;

    /// Pickup item size and collection reach
    pub const ITEM_SIZE: f32 = 75.0;
    pub const ITEM_COLLECT_FACTOR: f32 = 2.15;
    /// Score for collecting any item
    pub const ITEM_SCORE: u64 = 2500;
    /// Speed item duration (seconds)
    pub const SPEED_ITEM_DURATION: f32 = 10.0;
}

/// Uniform float in `[min, max)`.
///
/// Never panics on an empty range, `min == max` simply returns `min`.
#[inline]
pub fn random_float<R: Rng + ?Sized>(rng: &mut R, min: f32, max: f32) -> f32 {
    min + rng.random::<f32>() * (max - min)
}

/// Uniform integer in `[0, max)`, or 0 when `max` is 0
#[inline]
pub fn random_int<R: Rng + ?Sized>(rng: &mut R, max: usize) -> usize {
    if max == 0 { 0 } else { rng.random_range(0..max) }
}

/// Vector with every component drawn from `[min, max)`
#[inline]
pub fn random_vec3<R: Rng + ?Sized>(rng: &mut R, min: f32, max: f32) -> Vec3 {
    let x = random_float(rng, min, max);
    let y = random_float(rng, min, max);
    let z = random_float(rng, min, max);
    Vec3::new(x, y, z)
}

/// Angle between two unit vectors (radians)
#[inline]
pub fn angle_between(a: Vec3, b: Vec3) -> f32 {
    a.dot(b).clamp(-1.0, 1.0).acos()
}

/// Sector coordinate along one axis for a world position
#[inline]
pub fn sector_coord(value: f32, edge: f32) -> i32 {
    (value / edge).round() as i32
}
