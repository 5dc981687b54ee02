//! Player versus field interaction
//!
//! The ship is not a rigid body here. Hits are a distance heuristic against
//! the render radius, near misses drive the whoosh cue, and pickups are a
//! simple reach test. Presentation side effects go out as `FieldEvent`s.

use glam::{Mat4, Vec3};
use serde::{Deserialize, Serialize};

use super::camera::CameraState;
use super::events::{EventQueue, FieldEvent};
use super::level::ItemKind;
use super::sector::SectorGrid;
use crate::consts::*;
use crate::error::CollisionFault;

const DEFAULT_LIVES: u32 = 3;
const DEFAULT_SPEED: f32 = 0.5;
const MAX_SPEED_WITHOUT_ITEM: f32 = 0.7;
const MAX_SPEED_WITH_ITEM: f32 = 1.0;

/// Player values touched by the field.
///
/// Exactly one owner mutates it. With a `SimulationWorker` that owner is the
/// worker thread, and the render side only reads published copies.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerState {
    /// Throttle, 0..1 of the full movement speed
    pub speed: f32,
    /// Shield charges, each absorbs one hit
    pub bomb_items: u32,
    pub score: u64,
    pub health: f32,
    pub fuel: f32,
    pub lives: u32,
    /// Remaining speed item time (seconds)
    pub speed_item_timeout: f32,
    pub game_over: bool,
}

impl Default for PlayerState {
    fn default() -> Self {
        Self {
            speed: DEFAULT_SPEED,
            bomb_items: 0,
            score: 0,
            health: 1.0,
            fuel: 1.0,
            lives: DEFAULT_LIVES,
            speed_item_timeout: 0.0,
            game_over: false,
        }
    }
}

impl PlayerState {
    /// Apply a collected item
    pub fn handle_item(&mut self, kind: ItemKind) {
        self.score += ITEM_SCORE;
        match kind {
            ItemKind::Fuel => self.fuel = 1.0,
            ItemKind::Health => self.health = (self.health + 0.5).min(1.0),
            ItemKind::ExtraLife => self.lives += 1,
            ItemKind::Speed => {
                self.speed_item_timeout = SPEED_ITEM_DURATION;
                self.speed = MAX_SPEED_WITH_ITEM;
            }
            ItemKind::Bomb => self.bomb_items = (self.bomb_items + 1).min(MAX_BOMB_ITEMS),
        }
    }

    /// Apply the damage factor of one contact check.
    ///
    /// Returns true when the ship was lost. A ship at full health always
    /// survives its first hit with 10% health left.
    pub fn apply_collision(&mut self, damage: f32) -> bool {
        if self.game_over || damage <= 0.0 {
            return false;
        }
        let old_health = self.health;
        // Side hits still cost at least 10%
        self.health -= 0.1 + damage * 4.25;
        if old_health >= 1.0 && self.health <= 0.0 {
            self.health = 0.1;
        }
        if self.health > 0.0 {
            return false;
        }

        if self.lives > 0 {
            self.lives -= 1;
        } else {
            self.game_over = true;
        }
        self.reset_life_values();
        true
    }

    /// Start a new life: refill, drop active items and charges
    pub fn reset_life_values(&mut self) {
        if self.game_over {
            self.health = 0.0;
            self.speed = 0.0;
        } else {
            self.health = 1.0;
            self.fuel = 1.0;
            self.speed = DEFAULT_SPEED;
        }
        self.speed_item_timeout = 0.0;
        self.bomb_items = 0;
    }

    /// Count down the speed item, capping the speed once it runs out
    pub fn update_timers(&mut self, dt: f32) {
        if self.speed_item_timeout > 0.0 {
            self.speed_item_timeout = (self.speed_item_timeout - dt.max(0.0)).max(0.0);
            if self.speed_item_timeout == 0.0 {
                self.speed = self.speed.min(MAX_SPEED_WITHOUT_ITEM);
            }
        }
    }
}

/// Frame timing for one contact check
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameTiming {
    /// Seconds since the previous frame
    pub elapsed: f32,
    /// Total frames rendered so far
    pub frame: u64,
}

impl FrameTiming {
    fn elapsed_ms(&self) -> u64 {
        (self.elapsed.max(0.0) * 1000.0).round() as u64
    }
}

fn camera_space(view: &Mat4, direction: Vec3) -> Result<Vec3, CollisionFault> {
    let v = view.transform_vector3(direction);
    if v.is_finite() {
        Ok(v)
    } else {
        Err(CollisionFault::NonFinite("camera space"))
    }
}

/// Check the 3x3 sectors around the camera for hits and near misses.
///
/// Returns the worst damage factor of this call (0 when nothing was hit or a
/// shield charge absorbed the hit). Struck asteroids are removed.
///
/// Player, event and grid changes are staged and only committed on `Ok`, so
/// a fault leaves everything as it was.
pub fn player_asteroid_collision(
    grid: &mut SectorGrid,
    camera: &CameraState,
    player: &mut PlayerState,
    timing: FrameTiming,
    events: &mut EventQueue,
) -> Result<f32, CollisionFault> {
    let view = camera.view_matrix()?;
    let forward = camera.forward.normalize();
    let camera_pos = camera.position;
    let max_size = grid.settings().max_asteroid_size;
    let whoosh_band = max_size * 3.5;

    let look_ahead = camera_pos + forward * 10.0;
    let next_look_ahead =
        camera_pos + forward * (10.0 + player.speed * timing.elapsed * MOVEMENT_SPEED_PER_SECOND);

    let mut damage = 0.0f32;
    let mut whoosh_volume = 0.0f32;
    let mut whoosh_pan = 0.0f32;

    let mut staged = player.clone();
    let mut pending = EventQueue::new();
    let mut struck = Vec::new();

    let middle = grid.middle();
    for iz in middle - 1..=middle + 1 {
        for ix in middle - 1..=middle + 1 {
            for (num, asteroid) in grid.sector(ix, iz).asteroids.iter().enumerate() {
                let position = asteroid.position;
                let size = asteroid.radius_render;
                let radius = asteroid.radius_collision;

                let distance = (position - camera_pos).length();
                let hit = distance <= size * PLAYER_HIT_RADIUS;
                if hit {
                    let mut this_damage =
                        0.175 + 0.25 * (1.0 - distance / (radius * 1.025)).max(0.0);
                    // Bigger asteroids hurt more
                    this_damage *= 0.5 + 0.5 * (size / max_size);
                    damage = damage.max(this_damage);

                    pending.push(FieldEvent::SideHit);
                    let rel = camera_space(&view, position - camera_pos)?;
                    pending.push(FieldEvent::HitDirection {
                        angle: rel.x.atan2(rel.y),
                    });
                    pending.push(FieldEvent::Rumble {
                        left: 0.125 + 0.4 * damage,
                        right: 0.25 + 0.45 * damage,
                    });

                    if staged.bomb_items > 0 {
                        staged.bomb_items -= 1;
                        damage = 0.0;
                    }
                }

                let distance_soon = (position - look_ahead).length();
                // Only once the asteroid stops closing in
                if distance_soon < whoosh_band && distance_soon < (position - next_look_ahead).length() {
                    let loudness = (1.25
                        * (1.0 - (distance_soon - radius * 1.5) / (whoosh_band - radius * 1.5)))
                        .min(1.0);
                    if loudness > 0.1 {
                        if loudness > 0.8 {
                            pending.push(FieldEvent::Rumble {
                                left: 0.05,
                                right: 0.15,
                            });
                        }

                        let rel = camera_space(&view, position - look_ahead)?;
                        let pan = (rel.x / max_size * 4.0).clamp(-0.7, 0.7);
                        let volume = 0.5 + 0.5 * loudness;
                        if volume > whoosh_volume {
                            whoosh_volume = volume;
                            whoosh_pan = pan;
                        }

                        if distance <= radius * 2.5 {
                            pending.push(FieldEvent::CameraWobble {
                                factor: 0.33 * (1.0 - distance / (radius * 2.0)),
                            });
                        }

                        // A little score for flying close
                        if timing.frame % 20 == 0 {
                            staged.score += timing.elapsed_ms();
                        }
                    }
                }

                if hit {
                    struck.push((ix, iz, num));
                }
            }
        }
    }

    for &(ix, iz, num) in struck.iter().rev() {
        grid.sector_mut(ix, iz).asteroids.remove(num);
    }
    *player = staged;
    for event in pending.drain() {
        events.push(event);
    }

    // Limit how often the whoosh cue can retrigger
    if whoosh_volume > 0.0 && timing.frame % 5 == 0 {
        events.push(FieldEvent::Whoosh {
            volume: whoosh_volume,
            pan: whoosh_pan,
        });
    }

    Ok(damage)
}

/// Collect every item within reach of the camera.
///
/// Collected items are removed from `items` and applied to `player`.
pub fn collect_items(
    items: &mut [Vec<Vec3>; 5],
    camera_position: Vec3,
    player: &mut PlayerState,
    events: &mut EventQueue,
) -> usize {
    let reach = ITEM_SIZE * ITEM_COLLECT_FACTOR;
    let mut collected = 0;
    for kind in ItemKind::ALL {
        let list = &mut items[kind.index()];
        let before = list.len();
        list.retain(|position| position.distance(camera_position) > reach);
        for _ in list.len()..before {
            player.handle_item(kind);
            events.push(FieldEvent::ItemCollected { kind });
            collected += 1;
        }
    }
    collected
}
