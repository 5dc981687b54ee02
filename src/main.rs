//! Asteroid Field headless demo
//!
//! Flies a scripted camera through a procedurally built level, driving the
//! simulation worker once per frame and logging what the field reports.
//!
//! Usage: `asteroid-field [settings.json] [level.json]`

use std::time::Duration;

use glam::Vec3;

use asteroid_field::consts::MOVEMENT_SPEED_PER_SECOND;
use asteroid_field::renderer::InstanceBatches;
use asteroid_field::sim::{AsteroidField, CameraState, FieldEvent, LevelDescriptor, PlayerState};
use asteroid_field::worker::{SimulationWorker, TickRequest};
use asteroid_field::{FieldError, FieldSettings};

const FRAMES: u64 = 600;
const FRAME_DT: f32 = 1.0 / 60.0;

/// Level with dense bands that thin out towards the sides
fn procedural_level() -> Result<LevelDescriptor, FieldError> {
    let (width, length) = (7, 40);
    let mut density = Vec::with_capacity(width * length);
    for x in 0..width {
        let side = (x as f32 - (width / 2) as f32).abs() / (width / 2) as f32;
        for z in 0..length {
            let band = ((z as f32 * 0.35).sin() * 0.5 + 0.5) * (1.0 - 0.6 * side);
            density.push(band.clamp(0.0, 1.0));
        }
    }
    let mut level = LevelDescriptor::new("demo", width, length, density)?;
    for z in (4..length).step_by(6) {
        let kind = asteroid_field::sim::ItemKind::ALL[z % 5];
        level = level.with_item(kind, Vec3::new(0.0, 0.0, z as f32 * 200.0));
    }
    Ok(level)
}

fn run() -> Result<(), FieldError> {
    let mut args = std::env::args().skip(1);
    let settings = match args.next() {
        Some(path) => FieldSettings::load_or_default(path),
        None => FieldSettings::default(),
    };
    let level = match args.next() {
        Some(path) => LevelDescriptor::from_json(&std::fs::read_to_string(path)?)?,
        None => procedural_level()?,
    };
    let target = level.target_position(settings.sector_edge);
    let fov = settings.viewable_field_of_view(false);

    let worker = SimulationWorker::spawn(AsteroidField::new(settings, level)?, PlayerState::default())?;
    // Latest copy published by the worker, which owns the player
    let mut player = PlayerState::default();
    let mut position = Vec3::ZERO;

    for frame in 1..=FRAMES {
        // Gentle weave while flying into the level
        let t = frame as f32 * FRAME_DT;
        let forward = Vec3::new((t * 0.7).sin() * 0.3, (t * 0.4).sin() * 0.1, 1.0).normalize();
        position += forward * player.speed * MOVEMENT_SPEED_PER_SECOND * FRAME_DT;
        let camera = CameraState::new(position, forward, fov);

        worker.request_tick(TickRequest {
            camera,
            dt: FRAME_DT,
            frame,
            player_contact: true,
        });

        while let Some(report) = worker.try_contact() {
            for event in &report.events {
                match event {
                    FieldEvent::ItemCollected { kind } => {
                        log::info!("Frame {}: collected {}", report.frame, kind.as_str())
                    }
                    FieldEvent::SideHit => log::info!("Frame {}: hit, damage {:.2}", report.frame, report.damage),
                    _ => log::trace!("Frame {}: {:?}", report.frame, event),
                }
            }
            if report.ship_lost {
                log::info!("Ship lost, {} lives left", report.player.lives);
            }
            player = report.player;
        }

        if player.game_over {
            log::info!("Game over at frame {}", frame);
            break;
        }
        if position.z > target.z {
            log::info!("Level target reached at frame {}", frame);
            break;
        }
        std::thread::sleep(Duration::from_secs_f32(FRAME_DT));
    }

    let snapshot = worker.snapshot();
    let batches = InstanceBatches::from_snapshot(&snapshot);
    log::info!(
        "Last snapshot: tick {}, {} instances in {} draw calls, {} requests skipped",
        snapshot.tick,
        batches.instance_count(),
        batches.draw_calls(),
        worker.skipped_requests()
    );
    log::info!("Field stats: {}", serde_json::to_string(&snapshot.stats)?);
    log::info!("Player: {}", serde_json::to_string(&player)?);
    worker.shutdown();
    Ok(())
}

fn main() {
    #[cfg(not(target_arch = "wasm32"))]
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    log::info!("Asteroid Field demo starting...");
    if let Err(e) = run() {
        log::error!("Demo failed: {}", e);
        std::process::exit(1);
    }
}
