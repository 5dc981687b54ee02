//! Simulation tick
//!
//! One tick walks the field through a fixed sequence of phases:
//! recenter the grid on the camera, refresh sector visibility, resolve
//! collisions in visible sectors, then integrate visible bodies.

use serde::Serialize;

use super::camera::CameraState;
use super::collision::CollisionStats;
use super::field::AsteroidField;
use super::sector::GridShift;
use crate::error::CollisionFault;

/// Phase of the tick state machine
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub enum TickPhase {
    #[default]
    Idle,
    RecenteringGrid,
    RefreshingVisibility,
    RunningPhysics,
    IntegratingKinematics,
}

impl TickPhase {
    /// Next phase in tick order, wrapping back to `Idle`
    pub fn next(self) -> Self {
        match self {
            TickPhase::Idle => TickPhase::RecenteringGrid,
            TickPhase::RecenteringGrid => TickPhase::RefreshingVisibility,
            TickPhase::RefreshingVisibility => TickPhase::RunningPhysics,
            TickPhase::RunningPhysics => TickPhase::IntegratingKinematics,
            TickPhase::IntegratingKinematics => TickPhase::Idle,
        }
    }
}

/// Input for a single tick
#[derive(Debug, Clone, Copy, Default)]
pub struct TickInput {
    pub camera: CameraState,
    /// Seconds since the previous tick
    pub dt: f32,
}

/// What happened during a tick
#[derive(Debug, Clone, Copy, Default)]
pub struct TickReport {
    pub shift: Option<GridShift>,
    pub visibility_fault: Option<CollisionFault>,
    pub visible_sectors: usize,
    pub collision: CollisionStats,
    /// Bodies moved by integration
    pub integrated: usize,
}

/// Advance the field by one tick
pub fn tick(field: &mut AsteroidField, input: &TickInput) -> TickReport {
    let mut report = TickReport::default();
    let dt = if input.dt.is_finite() { input.dt.max(0.0) } else { 0.0 };

    let mut phase = field.phase().next();
    while phase != TickPhase::Idle {
        field.set_phase(phase);
        match phase {
            TickPhase::RecenteringGrid => {
                report.shift = field.recenter_grid(&input.camera);
            }
            TickPhase::RefreshingVisibility => {
                if let Err(fault) = field.refresh_visibility(&input.camera) {
                    log::warn!("Visibility refresh skipped: {}", fault);
                    report.visibility_fault = Some(fault);
                }
                report.visible_sectors = field.visibility().visible_count();
            }
            TickPhase::RunningPhysics => {
                report.collision = field.run_physics();
            }
            TickPhase::IntegratingKinematics => {
                report.integrated = field.integrate_visible(dt);
            }
            TickPhase::Idle => {}
        }
        phase = phase.next();
    }
    field.set_phase(TickPhase::Idle);

    let total = field.grid().asteroid_count();
    let stats = field.stats_mut();
    stats.ticks += 1;
    stats.absorb(report.collision);
    if report.visibility_fault.is_some() {
        stats.faults += 1;
    }
    if let Some(shift) = report.shift {
        stats.regenerated_sectors += shift.regenerated as u64;
    }
    stats.total_asteroids = total;
    stats.visible_sectors = report.visible_sectors;
    stats.visible_asteroids = report.integrated;

    report
}
