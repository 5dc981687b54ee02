//! Dedicated simulation worker
//!
//! The render side posts one `TickRequest` per frame into a single-slot
//! mailbox. A request that is still pending when the next one arrives is
//! replaced, so the worker never queues stale frames and simply skips a
//! tick when it falls behind. After every tick the worker publishes an
//! immutable snapshot that the render side can read without blocking the
//! simulation.
//!
//! The worker is the only writer of the `PlayerState`. Contact reports carry
//! copies of it; changes from the game side go through `WorkerCommand`.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use crossbeam_channel::{Receiver, Sender, TrySendError, bounded, unbounded};
use parking_lot::{Condvar, Mutex, RwLock};

use crate::error::FieldError;
use crate::sim::{
    AsteroidField, CameraState, EventQueue, FieldEvent, FieldSnapshot, FrameTiming, LevelDescriptor,
    PlayerState, TickInput, tick,
};

/// Work for one tick, posted once per rendered frame
#[derive(Debug, Clone, Copy)]
pub struct TickRequest {
    pub camera: CameraState,
    /// Seconds since the previous frame
    pub dt: f32,
    pub frame: u64,
    /// Run player contact and item pickup after the tick
    pub player_contact: bool,
}

/// Result of player contact for one tick
#[derive(Debug, Clone)]
pub struct ContactReport {
    pub frame: u64,
    /// Damage factor in [0, 1]
    pub damage: f32,
    /// The hit cost a life
    pub ship_lost: bool,
    /// Player after this tick
    pub player: PlayerState,
    pub events: Vec<FieldEvent>,
}

/// Control messages applied at the top of the next tick
#[derive(Debug)]
pub enum WorkerCommand {
    KillInnerSectors,
    SetLevel(Box<LevelDescriptor>),
    ResetPlayer(PlayerState),
}

/// Post into a single-slot channel, evicting whatever is pending.
///
/// Returns whether a pending item was replaced, or `None` once the
/// receiving side is gone.
fn post_latest<T>(sender: &Sender<T>, evict: &Receiver<T>, item: T) -> Option<bool> {
    let mut item = item;
    let mut replaced = false;
    loop {
        match sender.try_send(item) {
            Ok(()) => return Some(replaced),
            Err(TrySendError::Full(back)) => {
                replaced |= evict.try_recv().is_ok();
                item = back;
            }
            Err(TrySendError::Disconnected(_)) => return None,
        }
    }
}

struct WorkerShared {
    snapshot: RwLock<Arc<FieldSnapshot>>,
    // tick of the latest published snapshot
    published: Mutex<u64>,
    // notified after every publication
    published_cvar: Condvar,
    shutdown: AtomicBool,
}

struct WorkerState {
    field: AsteroidField,
    player: PlayerState,
}

impl WorkerState {
    fn apply(&mut self, command: WorkerCommand) {
        match command {
            WorkerCommand::KillInnerSectors => {
                self.field.kill_all_inner_sector_asteroids();
            }
            WorkerCommand::SetLevel(level) => {
                if let Err(e) = self.field.set_level(*level) {
                    log::warn!("Level change rejected: {}", e);
                }
            }
            WorkerCommand::ResetPlayer(player) => self.player = player,
        }
    }

    fn player_contact(&mut self, request: &TickRequest) -> ContactReport {
        let mut events = EventQueue::new();
        let mut damage = 0.0;
        let mut ship_lost = false;
        if !self.player.game_over {
            self.player.update_timers(request.dt);
            let timing = FrameTiming {
                elapsed: request.dt,
                frame: request.frame,
            };
            damage = self
                .field
                .player_asteroid_collision(&request.camera, &mut self.player, timing, &mut events);
            ship_lost = self.player.apply_collision(damage);
            if ship_lost {
                self.field.kill_all_inner_sector_asteroids();
                log::info!(
                    "Ship lost at frame {}, {} lives left{}",
                    request.frame,
                    self.player.lives,
                    if self.player.game_over { ", game over" } else { "" }
                );
            }
            self.field
                .collect_items(request.camera.position, &mut self.player, &mut events);
        }
        ContactReport {
            frame: request.frame,
            damage,
            ship_lost,
            player: self.player.clone(),
            events: events.drain(),
        }
    }
}

fn thread_body(
    mut state: WorkerState,
    shared: Arc<WorkerShared>,
    mailbox: Receiver<TickRequest>,
    commands: Receiver<WorkerCommand>,
    contacts: Sender<ContactReport>,
) {
    log::info!("Simulation worker started");
    while !shared.shutdown.load(Ordering::Acquire) {
        let Ok(request) = mailbox.recv() else {
            break;
        };
        if shared.shutdown.load(Ordering::Acquire) {
            break;
        }

        for command in commands.try_iter() {
            state.apply(command);
        }

        tick(
            &mut state.field,
            &TickInput {
                camera: request.camera,
                dt: request.dt,
            },
        );

        if request.player_contact {
            // Nobody listening is fine
            let _ = contacts.send(state.player_contact(&request));
        }

        let snapshot = Arc::new(state.field.snapshot());
        let published = snapshot.tick;
        *shared.snapshot.write() = snapshot;
        *shared.published.lock() = published;
        shared.published_cvar.notify_all();
    }
    log::info!("Simulation worker stopped after {} ticks", state.field.stats().ticks);
}

/// Handle to the simulation thread. Dropping it stops and joins the thread.
pub struct SimulationWorker {
    mailbox: Option<Sender<TickRequest>>,
    /// Second receiver on the mailbox, used to evict a pending request
    evict: Receiver<TickRequest>,
    commands: Sender<WorkerCommand>,
    contacts: Receiver<ContactReport>,
    shared: Arc<WorkerShared>,
    skipped: AtomicU64,
    thread: Option<JoinHandle<()>>,
}

impl SimulationWorker {
    /// Move the field and the player onto a new simulation thread
    pub fn spawn(field: AsteroidField, player: PlayerState) -> Result<Self, FieldError> {
        let (mailbox, mailbox_recv) = bounded(1);
        let (commands, commands_recv) = unbounded();
        let (contacts_send, contacts) = unbounded();
        let snapshot = field.snapshot();
        let shared = Arc::new(WorkerShared {
            published: Mutex::new(snapshot.tick),
            snapshot: RwLock::new(Arc::new(snapshot)),
            published_cvar: Condvar::new(),
            shutdown: AtomicBool::new(false),
        });

        let state = WorkerState { field, player };
        let thread_shared = Arc::clone(&shared);
        let thread_mailbox = mailbox_recv.clone();
        let thread = std::thread::Builder::new()
            .name("asteroid-field-sim".to_string())
            .spawn(move || thread_body(state, thread_shared, thread_mailbox, commands_recv, contacts_send))
            .map_err(FieldError::WorkerSpawn)?;

        Ok(Self {
            mailbox: Some(mailbox),
            evict: mailbox_recv,
            commands,
            contacts,
            shared,
            skipped: AtomicU64::new(0),
            thread: Some(thread),
        })
    }

    /// Request a tick, replacing any request the worker has not picked up.
    ///
    /// Returns false once the worker has stopped.
    pub fn request_tick(&self, request: TickRequest) -> bool {
        let Some(mailbox) = &self.mailbox else {
            return false;
        };
        if self.thread.as_ref().is_none_or(|t| t.is_finished()) {
            return false;
        }
        let frame = request.frame;
        match post_latest(mailbox, &self.evict, request) {
            Some(replaced) => {
                if replaced {
                    let skipped = self.skipped.fetch_add(1, Ordering::Relaxed) + 1;
                    log::trace!("Worker busy, pending tick replaced by frame {} ({} skipped)", frame, skipped);
                }
                true
            }
            None => false,
        }
    }

    pub fn send_command(&self, command: WorkerCommand) -> bool {
        self.commands.send(command).is_ok()
    }

    pub fn kill_inner_sectors(&self) -> bool {
        self.send_command(WorkerCommand::KillInnerSectors)
    }

    pub fn set_level(&self, level: LevelDescriptor) -> bool {
        self.send_command(WorkerCommand::SetLevel(Box::new(level)))
    }

    /// Replace the player, e.g. when a new game starts
    pub fn reset_player(&self, player: PlayerState) -> bool {
        self.send_command(WorkerCommand::ResetPlayer(player))
    }

    /// Latest published snapshot
    pub fn snapshot(&self) -> Arc<FieldSnapshot> {
        Arc::clone(&self.shared.snapshot.read())
    }

    /// Block until a snapshot at least as new as `tick` is published
    pub fn wait_for_tick(&self, tick: u64, timeout: Duration) -> Option<Arc<FieldSnapshot>> {
        let deadline = Instant::now() + timeout;
        let mut published = self.shared.published.lock();
        while *published < tick {
            if self.shared.published_cvar.wait_until(&mut published, deadline).timed_out() {
                break;
            }
        }
        let reached = *published >= tick;
        drop(published);
        reached.then(|| self.snapshot())
    }

    /// Next pending contact report, if any
    pub fn try_contact(&self) -> Option<ContactReport> {
        self.contacts.try_recv().ok()
    }

    pub fn recv_contact_timeout(&self, timeout: Duration) -> Option<ContactReport> {
        self.contacts.recv_timeout(timeout).ok()
    }

    /// Tick requests replaced before the worker picked them up
    pub fn skipped_requests(&self) -> u64 {
        self.skipped.load(Ordering::Relaxed)
    }

    /// Stop the worker and wait for the thread to exit
    pub fn shutdown(mut self) {
        self.stop();
    }

    fn stop(&mut self) {
        self.shared.shutdown.store(true, Ordering::Release);
        // Dropping the only sender wakes a worker blocked on the mailbox
        self.mailbox = None;
        if let Some(thread) = self.thread.take() {
            if thread.join().is_err() {
                log::warn!("Simulation worker panicked");
            }
        }
    }
}

impl Drop for SimulationWorker {
    fn drop(&mut self) {
        self.stop();
    }
}
