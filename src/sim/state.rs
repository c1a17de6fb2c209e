//! Game state: score, lives, phase, removal queue and the owned level
//!
//! All mutable state of a run lives here and is advanced exclusively by
//! [`crate::sim::tick`]. Rendering and input collaborators only read it
//! between ticks; events queued during a tick are drained by the shell.

use glam::Vec2;
use rand::{Rng, SeedableRng};
use rand_pcg::Pcg32;

use super::camera::CameraController;
use super::entity::{CollectibleKind, EntityId, EntityKind};
use super::physics::PhysicsWorld;
use crate::consts;
use crate::level::Level;
use crate::tuning::Tuning;

/// Which motion strategy drives the level's entities
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PhysicsMode {
    /// Manual per-axis integration and AABB overlap tests
    Kinematic,
    /// An external rigid-body solver owns motion; contacts come from its
    /// narrow phase
    RigidBody,
}

/// Current phase of a run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GamePhase {
    Playing,
    /// Goal reached; holds for a fixed delay before the shell is notified
    LevelComplete,
    /// Out of lives; holds for a fixed delay before the shell is notified
    GameOver,
}

/// Discrete sound triggers for the external audio collaborator
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Sfx {
    Jump,
    PickupCoin,
    PickupFeather,
    PickupStar,
    PickupRain,
    LifeLost,
}

/// Signals consumed by the shell (audio, UI, persistence). The sim never
/// cares whether or how they are handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GameEvent {
    Sound(Sfx),
    ScoreAwarded { amount: i32, total: i32 },
    LifeLost { remaining: i32 },
    GameOver { final_score: i32 },
    LevelComplete { final_score: i32 },
}

/// Complete simulation state for one run.
#[derive(Debug)]
pub struct GameState {
    pub level: Level,
    /// Pristine copy used for respawns and resets
    initial_level: Level,
    pub mode: PhysicsMode,
    /// Present iff `mode == RigidBody`
    pub physics: Option<PhysicsWorld>,
    pub camera: CameraController,
    pub tuning: Tuning,

    pub phase: GamePhase,
    pub lives: i32,
    pub score: i32,
    /// Cosmetic counters trailing the authoritative values; never read by
    /// game logic
    pub lives_visual: f32,
    pub score_visual: f32,

    /// Entities flagged for destruction this frame; drained exactly once per
    /// frame after all collision and state logic
    pub removal_queue: Vec<EntityId>,
    events: Vec<GameEvent>,

    pub rng: Pcg32,
    pub seed: u64,
    pub time: f32,
    pub frame: u64,

    pub time_left_game_over: f32,
    pub time_left_level_complete: f32,
    pub(crate) game_over_notified: bool,
    pub(crate) level_complete_notified: bool,

    // Weather / hazard bookkeeping (rigid-body levels)
    pub rain_alive: u32,
    pub rain_limit: u32,
    pub hazard_timer: f32,
}

impl GameState {
    /// Build a run from a freshly loaded level. In rigid-body mode every
    /// collidable entity is registered with the solver immediately.
    pub fn new(level: Level, mode: PhysicsMode, tuning: Tuning, seed: u64) -> Self {
        let initial_level = level.clone();
        let camera = CameraController::new(&tuning);
        let mut state = Self {
            level,
            initial_level,
            mode,
            physics: None,
            camera,
            tuning,
            phase: GamePhase::Playing,
            lives: consts::LIVES_START,
            score: 0,
            lives_visual: consts::LIVES_START as f32,
            score_visual: 0.0,
            removal_queue: Vec::new(),
            events: Vec::new(),
            rng: Pcg32::seed_from_u64(seed),
            seed,
            time: 0.0,
            frame: 0,
            time_left_game_over: 0.0,
            time_left_level_complete: 0.0,
            game_over_notified: false,
            level_complete_notified: false,
            rain_alive: 0,
            rain_limit: 0,
            hazard_timer: 0.0,
        };
        state.init_level();
        state
    }

    /// Shared setup for new games, resets and respawns: physics bodies,
    /// camera target, spawner bookkeeping.
    fn init_level(&mut self) {
        self.rain_limit = self.level.rain_pixel_count * self.tuning.rain_limit_factor;
        self.rain_alive = self
            .level
            .collectibles
            .iter()
            .filter(|c| {
                matches!(&c.kind, EntityKind::Collectible(s) if s.kind == CollectibleKind::Raindrop)
            })
            .count() as u32;
        self.hazard_timer = self
            .rng
            .random_range(self.tuning.hazard_respawn_min..self.tuning.hazard_respawn_max);

        if self.mode == PhysicsMode::RigidBody {
            if let Some(player) = &mut self.level.player {
                player.apply_profile(&self.tuning.player_rigid);
            }
            self.physics = Some(Self::build_physics(&mut self.level, &self.tuning));
        }

        self.camera.set_target(self.level.player.as_ref().map(|p| p.id));
    }

    fn build_physics(level: &mut Level, tuning: &Tuning) -> PhysicsWorld {
        let mut physics = PhysicsWorld::new(tuning.gravity, tuning.solver_iterations);
        for ground in &mut level.ground {
            physics.register_static(ground);
        }
        for item in &mut level.collectibles {
            let raindrop = matches!(
                &item.kind,
                EntityKind::Collectible(s) if s.kind == CollectibleKind::Raindrop
            );
            if raindrop {
                physics.register_dynamic(item, tuning.raindrop_gravity_scale);
            } else {
                physics.register_static(item);
            }
        }
        for hazard in &mut level.hazards {
            physics.register_dynamic(hazard, 1.0);
        }
        if let Some(player) = &mut level.player {
            physics.register_dynamic(player, 1.0);
        }
        physics
    }

    /// Reload the level in place, keeping score and lives (losing a life
    /// respawns; it does not reset the run).
    pub fn respawn_level(&mut self) {
        self.level = self.initial_level.clone();
        self.level.clear_bodies();
        self.physics = None;
        self.removal_queue.clear();
        self.init_level();
    }

    /// Full re-init back to a fresh run on the same level.
    pub fn reset(&mut self) {
        log::debug!("Game world reset");
        self.respawn_level();
        self.phase = GamePhase::Playing;
        self.lives = consts::LIVES_START;
        self.score = 0;
        self.lives_visual = self.lives as f32;
        self.score_visual = 0.0;
        self.time_left_game_over = 0.0;
        self.time_left_level_complete = 0.0;
        self.game_over_notified = false;
        self.level_complete_notified = false;
        self.events.clear();
    }

    /// Add to the authoritative score and announce it.
    pub fn award(&mut self, amount: i32) {
        self.score += amount;
        self.events.push(GameEvent::ScoreAwarded { amount, total: self.score });
    }

    pub fn push_event(&mut self, event: GameEvent) {
        self.events.push(event);
    }

    /// Queue an entity for the end-of-frame removal pass. Queuing twice is
    /// harmless.
    pub fn flag_for_removal(&mut self, id: EntityId) {
        if !self.removal_queue.contains(&id) {
            self.removal_queue.push(id);
        }
    }

    pub fn is_flagged_for_removal(&self, id: EntityId) -> bool {
        self.removal_queue.contains(&id)
    }

    /// Drain the removal queue: detach each entity from its collection and
    /// release its solver body. Runs exactly once per frame, after all
    /// collision and state logic, so no collection is mutated while the
    /// frame logic iterates it.
    pub(crate) fn drain_removal_queue(&mut self) {
        if self.removal_queue.is_empty() {
            return;
        }
        let queue = std::mem::take(&mut self.removal_queue);
        for id in queue {
            let Some(entity) = self.level.remove(id) else {
                // Already gone; double removal is a guarded no-op
                continue;
            };
            if entity.body.is_some() {
                if let Some(physics) = &mut self.physics {
                    physics.unregister(id);
                }
            }
            if matches!(
                &entity.kind,
                EntityKind::Collectible(s) if s.kind == CollectibleKind::Raindrop
            ) {
                self.rain_alive = self.rain_alive.saturating_sub(1);
            }
        }
    }

    /// Hand the queued events to the shell.
    pub fn take_events(&mut self) -> Vec<GameEvent> {
        std::mem::take(&mut self.events)
    }

    pub fn events(&self) -> &[GameEvent] {
        &self.events
    }

    /// Where the camera wants to look: the target's position plus its
    /// horizontal origin offset.
    pub(crate) fn camera_target_pos(&self) -> Option<Vec2> {
        let id = self.camera.target()?;
        let e = self.level.entity(id)?;
        Some(Vec2::new(e.pos.x + e.origin.x, e.pos.y))
    }
}
