//! Asteroid field
//!
//! Owns the sector grid, its visibility and the collision system, plus the
//! seeded RNG every random draw goes through. Render queries read from here
//! but never mutate simulation state.

use glam::{IVec2, Mat4, Vec3};
use rand::SeedableRng;
use rand_pcg::Pcg32;
use serde::Serialize;

use super::camera::CameraState;
use super::collision::{CollisionStats, CollisionSystem};
use super::events::EventQueue;
use super::level::{ItemKind, LevelDescriptor};
use super::player::{self, FrameTiming, PlayerState};
use super::sector::{GridShift, SectorGrid};
use super::tick::TickPhase;
use super::visibility::VisibilityField;
use crate::consts::ITEM_SIZE;
use crate::error::{CollisionFault, FieldError};
use crate::settings::FieldSettings;

/// Which model variant to draw
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum ModelDetail {
    High,
    Low,
}

/// One asteroid to draw this frame
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AsteroidInstance {
    pub transform: Mat4,
    /// 1 = opaque, fades to 0 at the max view depth
    pub alpha: f32,
    pub kind: usize,
    pub detail: ModelDetail,
}

/// One decoration to draw this frame
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DecorationInstance {
    pub transform: Mat4,
    pub alpha: f32,
    pub kind: usize,
}

/// One pickup item to draw this frame
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ItemInstance {
    pub transform: Mat4,
    pub kind: ItemKind,
}

/// Running totals, refreshed every tick
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct FieldStats {
    pub ticks: u64,
    pub total_asteroids: usize,
    pub visible_sectors: usize,
    pub visible_asteroids: usize,
    pub pairs_tested: u64,
    pub collisions: u64,
    pub migrations: u64,
    pub regenerated_sectors: u64,
    pub faults: u64,
}

impl FieldStats {
    pub(crate) fn absorb(&mut self, collision: CollisionStats) {
        self.pairs_tested += collision.pairs_tested;
        self.collisions += collision.collisions;
        self.migrations += collision.migrations;
        self.faults += collision.faults;
    }
}

/// Immutable view of the field published after a tick
#[derive(Debug, Clone, Default)]
pub struct FieldSnapshot {
    pub tick: u64,
    pub center: IVec2,
    pub camera: Option<CameraState>,
    pub asteroids: Vec<AsteroidInstance>,
    pub decorations: Vec<DecorationInstance>,
    pub items: Vec<ItemInstance>,
    /// Row-major sector visibility
    pub visible: Vec<bool>,
    pub stats: FieldStats,
}

/// Linear fade from 1 at `fade_start` to 0 at `max`
#[inline]
fn fade_alpha(distance: f32, fade_start: f32, max: f32) -> f32 {
    if distance > fade_start {
        1.0 - (distance - fade_start) / (max - fade_start)
    } else {
        1.0
    }
}

pub struct AsteroidField {
    settings: FieldSettings,
    level: LevelDescriptor,
    /// Uncollected items, one list per `ItemKind`
    items: [Vec<Vec3>; 5],
    grid: SectorGrid,
    visibility: VisibilityField,
    collision: CollisionSystem,
    rng: Pcg32,
    camera: CameraState,
    phase: TickPhase,
    stats: FieldStats,
}

impl AsteroidField {
    /// Build a field around the origin.
    ///
    /// Fails if the settings or the level are invalid, including when no
    /// asteroid models are available.
    pub fn new(settings: FieldSettings, level: LevelDescriptor) -> Result<Self, FieldError> {
        settings.validate()?;
        level.validate()?;

        let mut rng = Pcg32::seed_from_u64(settings.seed);
        let camera = CameraState {
            viewable_fov: settings.viewable_field_of_view(false),
            ..Default::default()
        };
        let grid = SectorGrid::new(&settings, &level, camera.position, &mut rng)?;
        let mut visibility = VisibilityField::new(grid.side());
        if let Err(fault) = visibility.refresh(&camera) {
            log::warn!("Initial visibility refresh failed: {}", fault);
        }

        let items = ItemKind::ALL.map(|kind| level.items(kind).to_vec());
        let stats = FieldStats {
            total_asteroids: grid.asteroid_count(),
            visible_sectors: visibility.visible_count(),
            ..Default::default()
        };

        log::info!(
            "Asteroid field created: seed {:#x}, level '{}', {}x{} sectors, {}x{} decoration sectors, {} asteroids",
            settings.seed,
            level.name,
            grid.side(),
            grid.side(),
            grid.small_side(),
            grid.small_side(),
            stats.total_asteroids
        );

        Ok(Self {
            settings,
            level,
            items,
            grid,
            visibility,
            collision: CollisionSystem::new(),
            rng,
            camera,
            phase: TickPhase::Idle,
            stats,
        })
    }

    /// Switch to another level and repopulate the grid around the camera
    pub fn set_level(&mut self, level: LevelDescriptor) -> Result<(), FieldError> {
        level.validate()?;
        self.grid = SectorGrid::new(&self.settings, &level, self.camera.position, &mut self.rng)?;
        self.items = ItemKind::ALL.map(|kind| level.items(kind).to_vec());
        log::info!(
            "Level '{}' loaded, {} asteroids",
            level.name,
            self.grid.asteroid_count()
        );
        self.level = level;
        self.stats.total_asteroids = self.grid.asteroid_count();
        Ok(())
    }

    // === Accessors ===

    pub fn settings(&self) -> &FieldSettings {
        &self.settings
    }

    pub fn level(&self) -> &LevelDescriptor {
        &self.level
    }

    pub fn grid(&self) -> &SectorGrid {
        &self.grid
    }

    pub fn grid_mut(&mut self) -> &mut SectorGrid {
        &mut self.grid
    }

    pub fn visibility(&self) -> &VisibilityField {
        &self.visibility
    }

    /// Camera of the last tick
    pub fn camera(&self) -> &CameraState {
        &self.camera
    }

    pub fn phase(&self) -> TickPhase {
        self.phase
    }

    pub fn stats(&self) -> FieldStats {
        self.stats
    }

    pub fn remaining_items(&self, kind: ItemKind) -> &[Vec3] {
        &self.items[kind.index()]
    }

    // === Tick steps ===

    pub(crate) fn set_phase(&mut self, phase: TickPhase) {
        self.phase = phase;
    }

    pub(crate) fn stats_mut(&mut self) -> &mut FieldStats {
        &mut self.stats
    }

    pub(crate) fn recenter_grid(&mut self, camera: &CameraState) -> Option<GridShift> {
        self.camera = *camera;
        self.grid.recenter(camera.position, &self.level, &mut self.rng)
    }

    pub(crate) fn refresh_visibility(&mut self, camera: &CameraState) -> Result<(), CollisionFault> {
        self.visibility.refresh(camera)
    }

    pub(crate) fn run_physics(&mut self) -> CollisionStats {
        self.collision
            .handle_visible_sectors(&mut self.grid, &self.visibility, &mut self.rng);
        self.collision.take_stats()
    }

    /// Advance every body in a visible sector. Returns how many moved.
    pub(crate) fn integrate_visible(&mut self, dt: f32) -> usize {
        let side = self.grid.side();
        let mut moved = 0;
        for (i, cell) in self.grid.cells_mut().iter_mut().enumerate() {
            if self.visibility.is_visible(i % side, i / side) {
                for asteroid in &mut cell.asteroids {
                    asteroid.integrate(dt);
                }
                moved += cell.asteroids.len();
            }
        }
        moved
    }

    // === Player interaction ===

    /// Player contact for this frame.
    ///
    /// Faults are logged and count as "no collision this frame".
    pub fn player_asteroid_collision(
        &mut self,
        camera: &CameraState,
        player: &mut PlayerState,
        timing: FrameTiming,
        events: &mut EventQueue,
    ) -> f32 {
        match player::player_asteroid_collision(&mut self.grid, camera, player, timing, events) {
            Ok(damage) => damage,
            Err(fault) => {
                log::warn!("Player asteroid collision skipped: {}", fault);
                self.stats.faults += 1;
                0.0
            }
        }
    }

    /// Collect items in reach of the camera
    pub fn collect_items(&mut self, camera_position: Vec3, player: &mut PlayerState, events: &mut EventQueue) -> usize {
        player::collect_items(&mut self.items, camera_position, player, events)
    }

    /// Clear the 3x3 block around the camera, used after the player dies
    pub fn kill_all_inner_sector_asteroids(&mut self) -> usize {
        let killed = self.grid.kill_inner_sectors();
        self.stats.total_asteroids = self.grid.asteroid_count();
        log::debug!("Killed {} inner sector asteroids", killed);
        killed
    }

    // === Render queries ===

    /// Asteroids of visible sectors within view depth
    pub fn asteroids_to_render(&self, camera_position: Vec3) -> Vec<AsteroidInstance> {
        let max = self.settings.max_view_depth();
        let fade = self.settings.fade_out_depth();
        let half = self.settings.half_view_depth();
        let side = self.grid.side();

        let mut instances = Vec::new();
        for (i, cell) in self.grid.cells().iter().enumerate() {
            if !self.visibility.is_visible(i % side, i / side) {
                continue;
            }
            for asteroid in &cell.asteroids {
                let distance = asteroid.position.distance(camera_position);
                if distance > max {
                    continue;
                }
                let (detail, alpha) = if distance > half {
                    (ModelDetail::Low, fade_alpha(distance, fade, max))
                } else {
                    (ModelDetail::High, 1.0)
                };
                instances.push(AsteroidInstance {
                    transform: asteroid.render_transform(),
                    alpha,
                    kind: asteroid.kind,
                    detail,
                });
            }
        }
        instances
    }

    /// Decorations whose matching full sector is visible
    pub fn decorations_to_render(&self, camera_position: Vec3) -> Vec<DecorationInstance> {
        let max = self.settings.small_view_depth();
        let fade = self.settings.small_fade_out_depth();
        let offset = self.settings.small_sector_offset();
        let small_side = self.grid.small_side();

        let mut instances = Vec::new();
        for (i, cell) in self.grid.decoration_cells().iter().enumerate() {
            let (ix, iz) = (i % small_side + offset, i / small_side + offset);
            if !self.visibility.is_visible(ix, iz) {
                continue;
            }
            for decoration in &cell.decorations {
                let distance = decoration.position.distance(camera_position);
                if distance > max {
                    continue;
                }
                instances.push(DecorationInstance {
                    transform: decoration.render_transform(),
                    alpha: fade_alpha(distance, fade, max),
                    kind: decoration.kind,
                });
            }
        }
        instances
    }

    /// Remaining items. Far items are pulled in to the view depth and shrunk.
    pub fn items_to_render(&self, camera_position: Vec3) -> Vec<ItemInstance> {
        let max = self.settings.max_view_depth();
        let mut instances = Vec::new();
        for kind in ItemKind::ALL {
            for &position in &self.items[kind.index()] {
                let distance = position.distance(camera_position);
                if distance > max * 6.0 {
                    continue;
                }
                let (size, position) = if distance > max {
                    let toward = (position - camera_position) / distance;
                    (ITEM_SIZE / (distance / max), camera_position + toward * (max - 25.0))
                } else {
                    (ITEM_SIZE, position)
                };
                instances.push(ItemInstance {
                    transform: Mat4::from_translation(position) * Mat4::from_scale(Vec3::splat(size)),
                    kind,
                });
            }
        }
        instances
    }

    /// Build an immutable snapshot for the render side
    pub fn snapshot(&self) -> FieldSnapshot {
        let position = self.camera.position;
        FieldSnapshot {
            tick: self.stats.ticks,
            center: self.grid.center(),
            camera: Some(self.camera),
            asteroids: self.asteroids_to_render(position),
            decorations: self.decorations_to_render(position),
            items: self.items_to_render(position),
            visible: self.visibility.visible_flags().to_vec(),
            stats: self.stats,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::asteroid::AsteroidBody;

    fn field() -> AsteroidField {
        AsteroidField::new(FieldSettings::default(), LevelDescriptor::default()).unwrap()
    }

    fn clear(field: &mut AsteroidField) {
        for cell in field.grid_mut().cells_mut() {
            cell.asteroids.clear();
        }
    }

    #[test]
    fn test_new_field() {
        let field = field();
        assert_eq!(field.phase(), TickPhase::Idle);
        assert_eq!(field.grid().side(), 19);
        assert!(field.stats().total_asteroids > 0);
        assert!(field.stats().visible_sectors > 0);
    }

    #[test]
    fn test_no_models_is_fatal() {
        let settings = FieldSettings {
            asteroid_kinds: 0,
            ..Default::default()
        };
        assert!(matches!(
            AsteroidField::new(settings, LevelDescriptor::default()),
            Err(FieldError::NoAsteroidKinds)
        ));
    }

    #[test]
    fn test_same_seed_same_field() {
        let a = field();
        let b = field();
        let pa: Vec<_> = a.grid().cells().iter().flat_map(|c| c.asteroids.iter().map(|x| x.position)).collect();
        let pb: Vec<_> = b.grid().cells().iter().flat_map(|c| c.asteroids.iter().map(|x| x.position)).collect();
        assert_eq!(pa, pb);
    }

    #[test]
    fn test_render_lod_and_fade() {
        let mut field = field();
        clear(&mut field);
        let settings = field.settings().clone();
        // Straight ahead (+Z) so the sectors are visible
        let near = Vec3::new(0.0, 0.0, 300.0);
        let far = Vec3::new(0.0, 0.0, 1500.0);
        let beyond = Vec3::new(0.0, 0.0, 1790.0);
        for position in [near, far, beyond] {
            let (ix, iz) = field.grid().cell_of_sector(field.grid().sector_of(position)).unwrap();
            field
                .grid_mut()
                .sector_mut(ix, iz)
                .asteroids
                .push(AsteroidBody::new(2, position, Vec3::ZERO, 40.0, 30.0));
        }

        let instances = field.asteroids_to_render(Vec3::ZERO);
        assert_eq!(instances.len(), 2);
        let near_instance = instances.iter().find(|i| i.detail == ModelDetail::High).unwrap();
        assert_eq!(near_instance.alpha, 1.0);
        let far_instance = instances.iter().find(|i| i.detail == ModelDetail::Low).unwrap();
        let expected = 1.0
            - (1500.0 - settings.fade_out_depth()) / (settings.max_view_depth() - settings.fade_out_depth());
        assert!((far_instance.alpha - expected).abs() < 1e-5);
        assert_eq!(far_instance.kind, 2);
    }

    #[test]
    fn test_invisible_sectors_not_rendered() {
        let mut field = field();
        clear(&mut field);
        // Behind the camera, outside the inner diamond
        let behind = Vec3::new(0.0, 0.0, -800.0);
        let (ix, iz) = field.grid().cell_of_sector(field.grid().sector_of(behind)).unwrap();
        assert!(!field.visibility().is_visible(ix, iz));
        field
            .grid_mut()
            .sector_mut(ix, iz)
            .asteroids
            .push(AsteroidBody::new(0, behind, Vec3::ZERO, 40.0, 30.0));
        assert!(field.asteroids_to_render(Vec3::ZERO).is_empty());
    }

    #[test]
    fn test_decorations_render_with_fade() {
        let field = field();
        let settings = field.settings();
        for instance in field.decorations_to_render(Vec3::ZERO) {
            assert!((0.0..=1.0).contains(&instance.alpha));
            let distance = instance.transform.transform_point3(Vec3::ZERO).length();
            assert!(distance <= settings.small_view_depth() + 1e-2);
        }
    }

    #[test]
    fn test_far_items_pulled_into_view() {
        let level = LevelDescriptor::default()
            .with_item(ItemKind::Health, Vec3::new(0.0, 0.0, 500.0))
            .with_item(ItemKind::Speed, Vec3::new(0.0, 0.0, 3400.0))
            .with_item(ItemKind::Fuel, Vec3::new(0.0, 0.0, 20000.0));
        let field = AsteroidField::new(FieldSettings::default(), level).unwrap();
        let items = field.items_to_render(Vec3::ZERO);
        assert_eq!(items.len(), 2);

        let speed = items.iter().find(|i| i.kind == ItemKind::Speed).unwrap();
        let max = field.settings().max_view_depth();
        let position = speed.transform.transform_point3(Vec3::ZERO);
        assert!((position.z - (max - 25.0)).abs() < 1e-2);
        // 3400 is twice the view depth, so half size
        let scale = speed.transform.transform_vector3(Vec3::X).length();
        assert!((scale - ITEM_SIZE / 2.0).abs() < 1e-3);
    }

    #[test]
    fn test_collect_items_through_field() {
        let level = LevelDescriptor::default().with_item(ItemKind::ExtraLife, Vec3::new(0.0, 0.0, 50.0));
        let mut field = AsteroidField::new(FieldSettings::default(), level).unwrap();
        let mut player = PlayerState::default();
        let mut events = EventQueue::new();
        assert_eq!(field.collect_items(Vec3::ZERO, &mut player, &mut events), 1);
        assert_eq!(player.lives, 4);
        assert!(field.remaining_items(ItemKind::ExtraLife).is_empty());
        // The level descriptor itself is untouched
        assert_eq!(field.level().items(ItemKind::ExtraLife).len(), 1);
    }

    #[test]
    fn test_player_fault_is_absorbed() {
        let mut field = field();
        let camera = CameraState {
            forward: Vec3::ZERO,
            ..Default::default()
        };
        let mut player = PlayerState::default();
        let mut events = EventQueue::new();
        let damage = field.player_asteroid_collision(
            &camera,
            &mut player,
            FrameTiming { elapsed: 0.016, frame: 1 },
            &mut events,
        );
        assert_eq!(damage, 0.0);
        assert_eq!(field.stats().faults, 1);
    }

    #[test]
    fn test_kill_inner_sectors() {
        let mut field = field();
        field
            .grid_mut()
            .sector_mut(9, 9)
            .asteroids
            .push(AsteroidBody::new(0, Vec3::ZERO, Vec3::ZERO, 40.0, 30.0));
        let total = field.grid().asteroid_count();
        assert_eq!(field.kill_all_inner_sector_asteroids(), 1);
        assert_eq!(field.stats().total_asteroids, total - 1);
    }

    #[test]
    fn test_set_level_rejects_invalid() {
        let mut field = field();
        let level = LevelDescriptor::default().with_item(ItemKind::Fuel, Vec3::splat(f32::INFINITY));
        assert!(matches!(field.set_level(level), Err(FieldError::InvalidLevel(_))));
        assert_eq!(field.level().name, "empty");
    }

    #[test]
    fn test_snapshot_matches_queries() {
        let field = field();
        let snapshot = field.snapshot();
        assert_eq!(snapshot.asteroids.len(), field.asteroids_to_render(Vec3::ZERO).len());
        assert_eq!(snapshot.visible.len(), 19 * 19);
        assert_eq!(snapshot.center, IVec2::ZERO);
    }
}
