//! Asteroid-asteroid collision detection and response
//!
//! Collisions are sphere-only. Each body is tested against its own sector,
//! or against the visible 3x3 neighborhood when it sits near a sector
//! border. Overlapping pairs are pushed apart and exchange momentum along
//! the line of centers.

use glam::{IVec2, Vec3};
use rand::Rng;
use serde::Serialize;

use super::asteroid::AsteroidBody;
use super::sector::{Sector, SectorGrid};
use super::visibility::VisibilityField;
use crate::consts::*;
use crate::error::CollisionFault;
use crate::random_float;

/// Counters accumulated by the collision system
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CollisionStats {
    pub pairs_tested: u64,
    pub collisions: u64,
    pub migrations: u64,
    pub faults: u64,
}

/// Location of a body: (flat cell index, index in that cell)
type BodyRef = (usize, usize);

#[derive(Debug, Clone, Default)]
pub struct CollisionSystem {
    stats: CollisionStats,
}

impl CollisionSystem {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stats(&self) -> CollisionStats {
        self.stats
    }

    /// Return the counters and start from zero
    pub fn take_stats(&mut self) -> CollisionStats {
        std::mem::take(&mut self.stats)
    }

    /// Run physics for every visible sector, in row-major order
    pub fn handle_visible_sectors<R: Rng + ?Sized>(
        &mut self,
        grid: &mut SectorGrid,
        visibility: &VisibilityField,
        rng: &mut R,
    ) {
        debug_assert_eq!(grid.side(), visibility.side());
        let camera_sector = grid.center();
        for iz in 0..grid.side() {
            for ix in 0..grid.side() {
                if visibility.is_visible(ix, iz) {
                    self.handle_sector(grid, visibility, ix, iz, camera_sector, rng);
                }
            }
        }
    }

    /// Migrate and collide every body stored in cell `(check_x, check_z)`.
    ///
    /// Bodies that drifted into another sector are moved there first, so
    /// they are tested in the neighborhood they now belong to.
    pub fn handle_sector<R: Rng + ?Sized>(
        &mut self,
        grid: &mut SectorGrid,
        visibility: &VisibilityField,
        check_x: usize,
        check_z: usize,
        camera_sector: IVec2,
        rng: &mut R,
    ) {
        let side = grid.side();
        let middle = grid.middle() as i32;
        let edge = grid.edge();
        let cell = grid.index(check_x, check_z);

        let mut num = 0;
        while num < grid.cells()[cell].asteroids.len() {
            let position = grid.cells()[cell].asteroids[num].position;
            let xp = position.x / edge;
            let zp = position.z / edge;
            let (rx, rz) = (xp.round(), zp.round());
            let border_x = xp - rx;
            let border_z = zp - rz;

            let ix = clamp_cell(rx as i32 - camera_sector.x + middle, side);
            let iz = clamp_cell(rz as i32 - camera_sector.y + middle, side);

            let cells = grid.cells_mut();
            let body: BodyRef = if ix != check_x || iz != check_z {
                let target = iz * side + ix;
                let moved = cells[cell].asteroids.remove(num);
                cells[target].asteroids.push(moved);
                self.stats.migrations += 1;
                (target, cells[target].asteroids.len() - 1)
            } else {
                num += 1;
                (cell, num - 1)
            };

            let interior = border_x > -INTERIOR_BORDER
                && border_x < INTERIOR_BORDER
                && border_z > -INTERIOR_BORDER
                && border_z < INTERIOR_BORDER;

            if interior {
                self.test_against_cell(cells, body, body.0, rng);
            } else {
                let (home_x, home_z) = (body.0 % side, body.0 / side);
                for z in home_z.saturating_sub(1)..=(home_z + 1).min(side - 1) {
                    for x in home_x.saturating_sub(1)..=(home_x + 1).min(side - 1) {
                        if visibility.is_visible(x, z) {
                            self.test_against_cell(cells, body, z * side + x, rng);
                        }
                    }
                }
            }
        }
    }

    fn test_against_cell<R: Rng + ?Sized>(
        &mut self,
        cells: &mut [Sector],
        body: BodyRef,
        other_cell: usize,
        rng: &mut R,
    ) {
        for j in 0..cells[other_cell].asteroids.len() {
            let other: BodyRef = (other_cell, j);
            if other == body {
                continue;
            }

            let a = &cells[body.0].asteroids[body.1];
            let b = &cells[other.0].asteroids[other.1];
            self.stats.pairs_tested += 1;
            let reach = a.radius_collision + b.radius_collision;
            if a.position.distance_squared(b.position) >= reach * reach {
                continue;
            }

            let (a, b) = two_bodies_mut(cells, body, other);
            match resolve_collision(a, b, rng) {
                Ok(()) => self.stats.collisions += 1,
                Err(fault) => {
                    log::debug!("Skipped asteroid collision: {}", fault);
                    self.stats.faults += 1;
                }
            }
        }
    }
}

#[inline]
fn clamp_cell(index: i32, side: usize) -> usize {
    index.clamp(0, side as i32 - 1) as usize
}

/// Mutable access to two distinct bodies anywhere in the grid
fn two_bodies_mut(
    cells: &mut [Sector],
    a: BodyRef,
    b: BodyRef,
) -> (&mut AsteroidBody, &mut AsteroidBody) {
    debug_assert_ne!(a, b);
    if a.0 == b.0 {
        let list = &mut cells[a.0].asteroids;
        if a.1 < b.1 {
            let (lo, hi) = list.split_at_mut(b.1);
            (&mut lo[a.1], &mut hi[0])
        } else {
            let (lo, hi) = list.split_at_mut(a.1);
            (&mut hi[0], &mut lo[b.1])
        }
    } else if a.0 < b.0 {
        let (lo, hi) = cells.split_at_mut(b.0);
        (&mut lo[a.0].asteroids[a.1], &mut hi[0].asteroids[b.1])
    } else {
        let (lo, hi) = cells.split_at_mut(a.0);
        (&mut hi[0].asteroids[a.1], &mut lo[b.0].asteroids[b.1])
    }
}

/// Reflect a vector off a surface with unit normal `normal`
#[inline]
pub fn reflect_velocity(velocity: Vec3, normal: Vec3) -> Vec3 {
    velocity - 2.0 * velocity.dot(normal) * normal
}

/// Resolve an overlapping pair.
///
/// Both bodies are pushed out of the contact point to 1.5% beyond their
/// collision radius. Each body's speed becomes a blend of a plain
/// reflection and the 1D elastic impulse `(|m1-m2|*v1 + 2*m2*v2)/(m1+m2)`,
/// weighted by how head-on the hit is. Nothing is modified on error.
pub fn resolve_collision<R: Rng + ?Sized>(
    a: &mut AsteroidBody,
    b: &mut AsteroidBody,
    rng: &mut R,
) -> Result<(), CollisionFault> {
    let reach = a.radius_collision + b.radius_collision;
    if !(reach > 0.0) {
        return Err(CollisionFault::NonFinite("collision radius"));
    }

    // Contact point, each center weighted by the other body's share
    let middle = b.position * (a.radius_collision / reach) + a.position * (b.radius_collision / reach);
    let normal_a = (a.position - middle)
        .try_normalize()
        .ok_or(CollisionFault::CoincidentCenters)?;
    let normal_b = (b.position - middle)
        .try_normalize()
        .ok_or(CollisionFault::CoincidentCenters)?;

    let speed_a = a.velocity.length();
    let speed_b = b.velocity.length();
    let mass_a = a.mass();
    let mass_b = b.mass();
    let both_masses = mass_a + mass_b;

    let dir_a = a.velocity.normalize_or_zero();
    let dir_b = b.velocity.normalize_or_zero();

    let mut strength_a = dir_a.dot(normal_a).abs();
    let mut strength_b = dir_b.dot(normal_b).abs();
    let mut reflection_a = reflect_velocity(dir_a, normal_a);
    let mut reflection_b = reflect_velocity(dir_b, normal_b);

    // A resting body borrows the other's strength and bounces along its normal
    if dir_a.length() <= 0.01 {
        strength_a = strength_b;
        reflection_a = normal_a;
    }
    if dir_b.length() <= 0.01 {
        strength_b = strength_a;
        reflection_b = normal_b;
    }

    let new_speed_a = (1.0 - strength_a) * speed_a
        + strength_a * ((mass_a - mass_b).abs() * speed_a + 2.0 * mass_b * speed_b) / both_masses;
    let new_speed_b = (1.0 - strength_b) * speed_b
        + strength_b * ((mass_b - mass_a).abs() * speed_b + 2.0 * mass_a * speed_a) / both_masses;

    let position_a = middle + normal_a * a.radius_collision * SEPARATION_MARGIN;
    let position_b = middle + normal_b * b.radius_collision * SEPARATION_MARGIN;
    let velocity_a = reflection_a * new_speed_a;
    let velocity_b = reflection_b * new_speed_b;

    if !(position_a.is_finite() && position_b.is_finite()) {
        return Err(CollisionFault::NonFinite("separated position"));
    }
    if !(velocity_a.is_finite() && velocity_b.is_finite()) {
        return Err(CollisionFault::NonFinite("collision velocity"));
    }

    a.position = position_a;
    b.position = position_b;
    a.velocity = velocity_a;
    b.velocity = velocity_b;

    a.rotation_rate.y = (a.rotation_rate.y + random_float(rng, -0.75, 1.0)) / 2.0;
    b.rotation_rate.y = (b.rotation_rate.y + random_float(rng, -0.75, 1.0)) / 2.0;
    Ok(())
}
