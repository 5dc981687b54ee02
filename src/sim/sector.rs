//! Sector grid
//!
//! A square window of sectors centered on the camera's sector. Cell
//! `[iz][ix]` always holds world sector
//! `(ix - middle + center.x, iz - middle + center.z)`. When the camera
//! crosses a sector boundary the window is shifted: cells that stay inside
//! the window are moved over untouched, cells that scroll in are generated.
//!
//! A second, smaller grid of decoration sectors shares the same center.

use glam::{IVec2, Vec3};
use rand::Rng;

use super::asteroid::AsteroidBody;
use super::decoration::SmallDecorationBody;
use super::level::LevelDescriptor;
use crate::consts::*;
use crate::error::FieldError;
use crate::settings::FieldSettings;
use crate::{random_float, random_int, random_vec3, sector_coord};

/// Identity stamp of a sector cell, new for every generated cell
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SectorId(pub u64);

/// Asteroids owned by one sector
#[derive(Debug, Clone)]
pub struct Sector {
    id: SectorId,
    pub asteroids: Vec<AsteroidBody>,
}

impl Sector {
    pub fn id(&self) -> SectorId {
        self.id
    }
}

/// Decorations owned by one small sector
#[derive(Debug, Clone)]
pub struct DecorationSector {
    id: SectorId,
    pub decorations: Vec<SmallDecorationBody>,
}

impl DecorationSector {
    pub fn id(&self) -> SectorId {
        self.id
    }
}

/// Result of a grid shift
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GridShift {
    pub old_center: IVec2,
    pub new_center: IVec2,
    /// Full sectors generated for cells that scrolled in
    pub regenerated: usize,
    /// Decoration sectors generated for cells that scrolled in
    pub regenerated_small: usize,
}

impl GridShift {
    pub fn shift(&self) -> IVec2 {
        self.new_center - self.old_center
    }
}

#[derive(Debug, Clone)]
pub struct SectorGrid {
    settings: FieldSettings,
    /// Sector coordinate of the camera, `x` is world X and `y` is world Z
    center: IVec2,
    /// Row-major, `cells[iz * side + ix]`
    cells: Vec<Sector>,
    small_cells: Vec<DecorationSector>,
    next_id: u64,
}

impl SectorGrid {
    /// Build and populate a grid centered on the camera's sector
    pub fn new<R: Rng + ?Sized>(
        settings: &FieldSettings,
        level: &LevelDescriptor,
        camera_position: Vec3,
        rng: &mut R,
    ) -> Result<Self, FieldError> {
        settings.validate()?;

        let side = settings.sector_count;
        let small_side = settings.small_sector_count;
        let center = IVec2::new(
            sector_coord(camera_position.x, settings.sector_edge),
            sector_coord(camera_position.z, settings.sector_edge),
        );

        let mut grid = Self {
            settings: settings.clone(),
            center,
            cells: Vec::with_capacity(side * side),
            small_cells: Vec::with_capacity(small_side * small_side),
            next_id: 0,
        };

        for iz in 0..side {
            for ix in 0..side {
                let world = grid.world_sector(ix, iz);
                let mut asteroids = Vec::new();
                grid.generate_sector(&mut asteroids, world.x, world.y, camera_position.y, level, rng);
                let id = grid.allocate_id();
                grid.cells.push(Sector { id, asteroids });
            }
        }

        let offset = settings.small_sector_offset();
        for iz in 0..small_side {
            for ix in 0..small_side {
                let world = grid.world_small_sector(ix, iz);
                let nearby = grid.sector(ix + offset, iz + offset).asteroids.len();
                let mut decorations = Vec::new();
                grid.generate_decoration_sector(&mut decorations, nearby, world.x, world.y, rng);
                let id = grid.allocate_id();
                grid.small_cells.push(DecorationSector { id, decorations });
            }
        }

        grid.debug_check_shape();
        Ok(grid)
    }

    fn allocate_id(&mut self) -> SectorId {
        let id = SectorId(self.next_id);
        self.next_id += 1;
        id
    }

    fn debug_check_shape(&self) {
        debug_assert_eq!(self.cells.len(), self.side() * self.side());
        debug_assert_eq!(self.small_cells.len(), self.small_side() * self.small_side());
    }

    // === Geometry ===

    pub fn settings(&self) -> &FieldSettings {
        &self.settings
    }

    #[inline]
    pub fn side(&self) -> usize {
        self.settings.sector_count
    }

    #[inline]
    pub fn small_side(&self) -> usize {
        self.settings.small_sector_count
    }

    #[inline]
    pub fn middle(&self) -> usize {
        self.settings.middle()
    }

    #[inline]
    pub fn edge(&self) -> f32 {
        self.settings.sector_edge
    }

    /// Sector coordinate the grid is centered on (`y` holds world Z)
    #[inline]
    pub fn center(&self) -> IVec2 {
        self.center
    }

    /// Flat index of cell `(ix, iz)`
    #[inline]
    pub fn index(&self, ix: usize, iz: usize) -> usize {
        debug_assert!(ix < self.side() && iz < self.side());
        iz * self.side() + ix
    }

    /// World sector represented by full cell `(ix, iz)`
    pub fn world_sector(&self, ix: usize, iz: usize) -> IVec2 {
        let middle = self.middle() as i32;
        IVec2::new(ix as i32 - middle + self.center.x, iz as i32 - middle + self.center.y)
    }

    /// World sector represented by decoration cell `(ix, iz)`
    pub fn world_small_sector(&self, ix: usize, iz: usize) -> IVec2 {
        let middle = self.settings.small_middle() as i32;
        IVec2::new(ix as i32 - middle + self.center.x, iz as i32 - middle + self.center.y)
    }

    /// World sector containing a position
    pub fn sector_of(&self, position: Vec3) -> IVec2 {
        IVec2::new(
            sector_coord(position.x, self.edge()),
            sector_coord(position.z, self.edge()),
        )
    }

    /// Grid cell for a world sector, `None` outside the window
    pub fn cell_of_sector(&self, sector: IVec2) -> Option<(usize, usize)> {
        let middle = self.middle() as i32;
        let ix = sector.x - self.center.x + middle;
        let iz = sector.y - self.center.y + middle;
        let side = self.side() as i32;
        if (0..side).contains(&ix) && (0..side).contains(&iz) {
            Some((ix as usize, iz as usize))
        } else {
            None
        }
    }

    // === Cell access ===

    pub fn sector(&self, ix: usize, iz: usize) -> &Sector {
        &self.cells[self.index(ix, iz)]
    }

    pub fn sector_mut(&mut self, ix: usize, iz: usize) -> &mut Sector {
        let index = self.index(ix, iz);
        &mut self.cells[index]
    }

    pub fn cells(&self) -> &[Sector] {
        &self.cells
    }

    pub fn cells_mut(&mut self) -> &mut [Sector] {
        &mut self.cells
    }

    pub fn decoration_sector(&self, ix: usize, iz: usize) -> &DecorationSector {
        &self.small_cells[iz * self.small_side() + ix]
    }

    pub fn decoration_cells(&self) -> &[DecorationSector] {
        &self.small_cells
    }

    pub fn asteroid_count(&self) -> usize {
        self.cells.iter().map(|c| c.asteroids.len()).sum()
    }

    pub fn decoration_count(&self) -> usize {
        self.small_cells.iter().map(|c| c.decorations.len()).sum()
    }

    // === Generation ===

    /// Fill `target` with the asteroids of world sector `(sector_x, sector_z)`.
    ///
    /// Sectors around the origin stay empty so the player never spawns
    /// inside an asteroid.
    pub fn generate_sector<R: Rng + ?Sized>(
        &self,
        target: &mut Vec<AsteroidBody>,
        sector_x: i32,
        sector_z: i32,
        camera_y: f32,
        level: &LevelDescriptor,
        rng: &mut R,
    ) {
        if sector_x.abs() < 2 && sector_z.abs() < 2 {
            return;
        }

        let settings = &self.settings;
        let edge = settings.sector_edge;
        let density = level.sector_density(sector_x, sector_z);
        let count = random_int(rng, (2.0 + density * 10.0) as usize);

        target.reserve(count);
        for _ in 0..count {
            let kind = random_int(rng, settings.asteroid_kinds);
            let y = camera_y + random_float(rng, -edge * SPAWN_VERTICAL_SPREAD, edge * SPAWN_VERTICAL_SPREAD);
            let jitter = random_vec3(rng, -edge * SPAWN_JITTER, edge * SPAWN_JITTER);
            let position = Vec3::new(sector_x as f32 * edge, y, sector_z as f32 * edge) + jitter;
            target.push(AsteroidBody::spawn(rng, kind, position, settings));
        }
    }

    /// Fill `target` with decorations for world sector `(sector_x, sector_z)`.
    ///
    /// Busier full sectors get more decorations.
    pub fn generate_decoration_sector<R: Rng + ?Sized>(
        &self,
        target: &mut Vec<SmallDecorationBody>,
        nearby_asteroids: usize,
        sector_x: i32,
        sector_z: i32,
        rng: &mut R,
    ) {
        let settings = &self.settings;
        let edge = settings.sector_edge;
        let count = 2 + random_int(rng, 4 + nearby_asteroids);

        target.reserve(count);
        for _ in 0..count {
            let kind = random_int(rng, settings.small_asteroid_kinds);
            let offset = Vec3::new(
                random_float(rng, -edge / 2.0, edge / 2.0),
                random_float(rng, -edge * DECORATION_VERTICAL_SPREAD, edge * DECORATION_VERTICAL_SPREAD),
                random_float(rng, -edge / 2.0, edge / 2.0),
            );
            let position = Vec3::new(sector_x as f32 * edge, 0.0, sector_z as f32 * edge) + offset;
            target.push(SmallDecorationBody::spawn(rng, kind, position, settings.small_asteroid_size));
        }
    }

    // === Recentring ===

    /// Shift the window so it is centered on the camera's sector.
    ///
    /// Returns `None` (and touches nothing) when the camera is still in the
    /// center sector. Shifts wider than the grid simply regenerate every cell.
    pub fn recenter<R: Rng + ?Sized>(
        &mut self,
        camera_position: Vec3,
        level: &LevelDescriptor,
        rng: &mut R,
    ) -> Option<GridShift> {
        let new_center = self.sector_of(camera_position);
        if new_center == self.center {
            return None;
        }

        let old_center = self.center;
        let shift = new_center - old_center;
        self.center = new_center;

        let side = self.side();
        let mut old_cells: Vec<Option<Sector>> = std::mem::take(&mut self.cells).into_iter().map(Some).collect();
        let mut regenerated = 0;
        for iz in 0..side {
            for ix in 0..side {
                let reused = shifted_index(ix, iz, shift, side).and_then(|i| old_cells[i].take());
                let cell = match reused {
                    Some(cell) => cell,
                    None => {
                        let world = self.world_sector(ix, iz);
                        let mut asteroids = Vec::new();
                        self.generate_sector(&mut asteroids, world.x, world.y, camera_position.y, level, rng);
                        regenerated += 1;
                        Sector {
                            id: self.allocate_id(),
                            asteroids,
                        }
                    }
                };
                self.cells.push(cell);
            }
        }

        let small_side = self.small_side();
        let offset = self.settings.small_sector_offset();
        let mut old_small: Vec<Option<DecorationSector>> =
            std::mem::take(&mut self.small_cells).into_iter().map(Some).collect();
        let mut regenerated_small = 0;
        for iz in 0..small_side {
            for ix in 0..small_side {
                let reused = shifted_index(ix, iz, shift, small_side).and_then(|i| old_small[i].take());
                let cell = match reused {
                    Some(cell) => cell,
                    None => {
                        let world = self.world_small_sector(ix, iz);
                        let nearby = self.sector(ix + offset, iz + offset).asteroids.len();
                        let mut decorations = Vec::new();
                        self.generate_decoration_sector(&mut decorations, nearby, world.x, world.y, rng);
                        regenerated_small += 1;
                        DecorationSector {
                            id: self.allocate_id(),
                            decorations,
                        }
                    }
                };
                self.small_cells.push(cell);
            }
        }

        self.debug_check_shape();
        log::debug!(
            "Grid recentered {:?} -> {:?} (shift {:?}), regenerated {} sectors, {} decoration sectors",
            old_center,
            new_center,
            shift,
            regenerated,
            regenerated_small
        );

        Some(GridShift {
            old_center,
            new_center,
            regenerated,
            regenerated_small,
        })
    }

    /// Empty the 3x3 block around the camera in both grids.
    ///
    /// Returns the number of asteroids removed.
    pub fn kill_inner_sectors(&mut self) -> usize {
        let middle = self.middle();
        let small_middle = self.settings.small_middle();
        let small_side = self.small_side();
        let mut killed = 0;
        for iz in middle - 1..=middle + 1 {
            for ix in middle - 1..=middle + 1 {
                let cell = self.sector_mut(ix, iz);
                killed += cell.asteroids.len();
                cell.asteroids.clear();
            }
        }
        for iz in small_middle - 1..=small_middle + 1 {
            for ix in small_middle - 1..=small_middle + 1 {
                self.small_cells[iz * small_side + ix].decorations.clear();
            }
        }
        killed
    }
}

/// Old flat index that lands on new cell `(ix, iz)` after a shift, if still in bounds
fn shifted_index(ix: usize, iz: usize, shift: IVec2, side: usize) -> Option<usize> {
    let sx = ix as i64 + shift.x as i64;
    let sz = iz as i64 + shift.y as i64;
    let side = side as i64;
    if (0..side).contains(&sx) && (0..side).contains(&sz) {
        Some((sz * side + sx) as usize)
    } else {
        None
    }
}
