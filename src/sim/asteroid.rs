//! Asteroid bodies
//!
//! Spawn randomization is split in two: `SpawnRoll` performs every random
//! draw in a fixed order, `AsteroidBody::from_roll` turns the draws into a
//! body. Replaying a roll reproduces the body exactly.

use std::f32::consts::PI;

use glam::{Mat4, Vec2, Vec3};
use rand::Rng;

use crate::consts::*;
use crate::settings::FieldSettings;
use crate::{random_float, random_int};

/// All random draws needed to spawn one asteroid, in draw order
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpawnRoll {
    /// Base render radius in `[min_size, max_size)`
    pub size: f32,
    /// Signed speed, negative reverses the direction
    pub speed: f32,
    /// Unnormalized flight direction, each axis in `[-1, 1)`
    pub direction: Vec3,
    /// Rotation angles in `[-pi, pi)`
    pub rotation: Vec3,
    /// Yaw rate in `[-0.25, 0.6)`, pitch rate in `[-0.75, 1.0)`
    pub rotation_rate: Vec2,
    /// Speed class roll in `[0, 100)`
    pub speed_roll: usize,
    /// Replacement spin rate, only drawn for fast asteroids
    pub fast_spin: Option<f32>,
}

impl SpawnRoll {
    pub fn draw<R: Rng + ?Sized>(rng: &mut R, settings: &FieldSettings) -> Self {
        let size = random_float(rng, settings.min_asteroid_size, settings.max_asteroid_size);
        let speed = random_float(rng, -SPAWN_SPEED, SPAWN_SPEED);
        let direction = Vec3::new(
            random_float(rng, -1.0, 1.0),
            random_float(rng, -1.0, 1.0),
            random_float(rng, -1.0, 1.0),
        );
        let rotation = Vec3::new(
            random_float(rng, -PI, PI),
            random_float(rng, -PI, PI),
            random_float(rng, -PI, PI),
        );
        let rotation_rate = Vec2::new(random_float(rng, -0.25, 0.6), random_float(rng, -0.75, 1.0));
        let speed_roll = random_int(rng, 100);
        let fast_spin = (speed_roll < FAST_ASTEROID_PERCENT).then(|| random_float(rng, 1.28, 4.28));

        Self {
            size,
            speed,
            direction,
            rotation,
            rotation_rate,
            speed_roll,
            fast_spin,
        }
    }
}

/// A single colliding asteroid
#[derive(Debug, Clone, PartialEq)]
pub struct AsteroidBody {
    /// Model bucket
    pub kind: usize,
    pub position: Vec3,
    /// World units per second
    pub velocity: Vec3,
    /// Render scale, also the mass basis
    pub radius_render: f32,
    /// Sphere used for asteroid-asteroid collisions
    pub radius_collision: f32,
    /// Rotation angles, only x and y advance
    pub rotation: Vec3,
    pub rotation_rate: Vec2,
}

impl AsteroidBody {
    /// Create a body with explicit kinematics (no randomization)
    pub fn new(kind: usize, position: Vec3, velocity: Vec3, radius_render: f32, radius_collision: f32) -> Self {
        debug_assert!(radius_collision > 0.0 && radius_collision <= radius_render);
        Self {
            kind,
            position,
            velocity,
            radius_render,
            radius_collision,
            rotation: Vec3::ZERO,
            rotation_rate: Vec2::ZERO,
        }
    }

    /// Spawn a randomized asteroid of `kind` at `position`
    pub fn spawn<R: Rng + ?Sized>(
        rng: &mut R,
        kind: usize,
        position: Vec3,
        settings: &FieldSettings,
    ) -> Self {
        let roll = SpawnRoll::draw(rng, settings);
        Self::from_roll(kind, position, &roll, settings)
    }

    /// Build a body from previously drawn random values
    pub fn from_roll(kind: usize, position: Vec3, roll: &SpawnRoll, settings: &FieldSettings) -> Self {
        let is_donut = settings.donut_kind == Some(kind);

        let mut radius_render = roll.size;
        let mut radius_collision = roll.size * COLLISION_SIZE_CORRECTION;
        if kind > 0 {
            radius_collision *= COLLISION_SIZE_CORRECTION;
        }
        if is_donut {
            radius_collision *= COLLISION_SIZE_CORRECTION;
        }

        let mut velocity = roll.direction.normalize_or_zero() * roll.speed;
        let mut rotation_rate = roll.rotation_rate;

        // The 40% class is tested on the same roll, so fast asteroids get both
        if roll.speed_roll < FAST_ASTEROID_PERCENT {
            velocity *= 5.0;
            if let Some(spin) = roll.fast_spin {
                rotation_rate.y = spin;
            }
        }
        if roll.speed_roll < QUICK_ASTEROID_PERCENT {
            velocity *= 2.0;
        }

        if is_donut {
            radius_render += settings.max_asteroid_size;
            rotation_rate = Vec2::new(rotation_rate.x / 3.0, rotation_rate.y / 4.0);
        }

        debug_assert!(radius_collision > 0.0 && radius_collision <= radius_render);

        Self {
            kind,
            position,
            velocity,
            radius_render,
            radius_collision,
            rotation: roll.rotation,
            rotation_rate,
        }
    }

    /// Mass used by the impulse resolver (area, not volume)
    #[inline]
    pub fn mass(&self) -> f32 {
        self.radius_render * self.radius_render
    }

    /// Advance rotation and position by `dt` seconds
    pub fn integrate(&mut self, dt: f32) {
        self.rotation.x += self.rotation_rate.x * dt;
        self.rotation.y += self.rotation_rate.y * dt;
        self.position += self.velocity * dt;
    }

    /// World transform: rotate (x, then y, then z), scale, translate
    pub fn render_transform(&self) -> Mat4 {
        Mat4::from_translation(self.position)
            * Mat4::from_scale(Vec3::splat(self.radius_render))
            * Mat4::from_rotation_z(self.rotation.z)
            * Mat4::from_rotation_y(self.rotation.y)
            * Mat4::from_rotation_x(self.rotation.x)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rand::SeedableRng;
    use rand_pcg::Pcg32;

    fn roll(speed_roll: usize) -> SpawnRoll {
        SpawnRoll {
            size: 40.0,
            speed: 10.0,
            direction: Vec3::new(1.0, 0.0, 0.0),
            rotation: Vec3::new(0.1, 0.2, 0.3),
            rotation_rate: Vec2::new(0.3, 0.6),
            speed_roll,
            fast_spin: (speed_roll < FAST_ASTEROID_PERCENT).then_some(2.0),
        }
    }

    #[test]
    fn test_spawn_is_deterministic() {
        let settings = FieldSettings::default();
        let mut a = Pcg32::seed_from_u64(12);
        let mut b = Pcg32::seed_from_u64(12);
        for kind in 0..5 {
            let pos = Vec3::new(400.0, 0.0, 200.0);
            assert_eq!(
                AsteroidBody::spawn(&mut a, kind, pos, &settings),
                AsteroidBody::spawn(&mut b, kind, pos, &settings)
            );
        }
    }

    #[test]
    fn test_collision_radius_per_kind() {
        let settings = FieldSettings::default();
        let sphere = AsteroidBody::from_roll(0, Vec3::ZERO, &roll(50), &settings);
        let rock = AsteroidBody::from_roll(1, Vec3::ZERO, &roll(50), &settings);
        let donut = AsteroidBody::from_roll(4, Vec3::ZERO, &roll(50), &settings);

        let c = COLLISION_SIZE_CORRECTION;
        assert!((sphere.radius_collision - 40.0 * c).abs() < 1e-4);
        assert!((rock.radius_collision - 40.0 * c * c).abs() < 1e-4);
        assert!((donut.radius_collision - 40.0 * c * c * c).abs() < 1e-4);
    }

    #[test]
    fn test_speed_classes() {
        let settings = FieldSettings::default();
        let slow = AsteroidBody::from_roll(0, Vec3::ZERO, &roll(70), &settings);
        let quick = AsteroidBody::from_roll(0, Vec3::ZERO, &roll(20), &settings);
        let fast = AsteroidBody::from_roll(0, Vec3::ZERO, &roll(3), &settings);

        assert!((slow.velocity.length() - 10.0).abs() < 1e-4);
        assert!((quick.velocity.length() - 20.0).abs() < 1e-4);
        // Fast asteroids also fall in the quick class
        assert!((fast.velocity.length() - 100.0).abs() < 1e-3);
        assert_eq!(fast.rotation_rate.y, 2.0);
        assert_eq!(slow.rotation_rate.y, 0.6);
    }

    #[test]
    fn test_negative_speed_reverses_direction() {
        let settings = FieldSettings::default();
        let mut r = roll(70);
        r.speed = -10.0;
        let body = AsteroidBody::from_roll(0, Vec3::ZERO, &r, &settings);
        assert!((body.velocity - Vec3::new(-10.0, 0.0, 0.0)).length() < 1e-4);
    }

    #[test]
    fn test_donut_scaling() {
        let settings = FieldSettings::default();
        let mut rng = Pcg32::seed_from_u64(2024);
        let drawn = SpawnRoll::draw(&mut rng, &settings);
        let donut = AsteroidBody::from_roll(4, Vec3::ZERO, &drawn, &settings);

        assert_eq!(donut.radius_render, drawn.size + settings.max_asteroid_size);
        let base_pitch = drawn.fast_spin.unwrap_or(drawn.rotation_rate.y);
        assert_eq!(donut.rotation_rate.x, drawn.rotation_rate.x / 3.0);
        assert_eq!(donut.rotation_rate.y, base_pitch / 4.0);
    }

    #[test]
    fn test_no_donut_kind() {
        let settings = FieldSettings {
            donut_kind: None,
            ..Default::default()
        };
        let body = AsteroidBody::from_roll(4, Vec3::ZERO, &roll(70), &settings);
        assert_eq!(body.radius_render, 40.0);
    }

    #[test]
    fn test_integrate() {
        let mut body = AsteroidBody::from_roll(0, Vec3::ZERO, &roll(70), &FieldSettings::default());
        let rotation_before = body.rotation;
        body.integrate(0.5);
        assert!((body.position - Vec3::new(5.0, 0.0, 0.0)).length() < 1e-4);
        assert!((body.rotation.x - (rotation_before.x + 0.15)).abs() < 1e-6);
        assert!((body.rotation.y - (rotation_before.y + 0.3)).abs() < 1e-6);
        assert_eq!(body.rotation.z, rotation_before.z);
    }

    #[test]
    fn test_render_transform() {
        let mut body = AsteroidBody::new(0, Vec3::new(10.0, 20.0, 30.0), Vec3::ZERO, 4.0, 3.0);
        let m = body.render_transform();
        assert!((m.transform_point3(Vec3::ZERO) - body.position).length() < 1e-5);
        assert!((m.transform_point3(Vec3::X) - Vec3::new(14.0, 20.0, 30.0)).length() < 1e-5);

        // X rotation is applied first
        body.rotation = Vec3::new(std::f32::consts::FRAC_PI_2, std::f32::consts::FRAC_PI_2, 0.0);
        let m = body.render_transform();
        let p = m.transform_vector3(Vec3::Y);
        // Y -> Z under RotX(90), then Z -> X under RotY(90)
        assert!((p - Vec3::new(4.0, 0.0, 0.0)).length() < 1e-4);
    }

    proptest! {
        #[test]
        fn prop_radius_invariant(seed in any::<u64>(), kind in 0usize..5) {
            let settings = FieldSettings::default();
            let mut rng = Pcg32::seed_from_u64(seed);
            let body = AsteroidBody::spawn(&mut rng, kind, Vec3::ZERO, &settings);
            prop_assert!(body.radius_collision > 0.0);
            prop_assert!(body.radius_collision <= body.radius_render);
            prop_assert!(body.velocity.is_finite());
            prop_assert!(body.velocity.length() <= SPAWN_SPEED * 10.0 + 1e-3);
        }
    }
}
