//! Per-frame simulation tick
//!
//! One `tick` call per rendered frame drives the whole core, in a fixed
//! order: input intents -> motion -> contacts -> resolution -> weather ->
//! deferred removal -> life/phase evaluation -> camera. Everything is
//! synchronous; there are no callbacks crossing frame boundaries.

use glam::Vec2;
use rand::Rng;

use super::collision::{self, ContactClass};
use super::entity::{CollectibleKind, Entity, EntityId, EntityKind, JumpPhase, ViewDirection};
use super::state::{GameEvent, GamePhase, GameState, PhysicsMode, Sfx};
use crate::consts;
use crate::tuning::{MotionProfile, Tuning};

/// Re-rising with the flight power-up restarts the ascent this close to the
/// end of the window, so flight gives short repeated boosts instead of a
/// full second jump.
const FLIGHT_REJUMP_WINDOW: f32 = 0.018;

/// Input snapshot for a single tick. Polling mechanics are external; the sim
/// only sees the result.
#[derive(Debug, Clone, Default)]
pub struct TickInput {
    /// Move left, held
    pub left: bool,
    /// Move right, held
    pub right: bool,
    /// Jump, held
    pub jump: bool,
    /// Reset the run, pressed
    pub reset: bool,
    /// Toggle camera follow, pressed
    pub toggle_follow: bool,
}

/// Advance the game by one frame.
pub fn tick(state: &mut GameState, input: &TickInput, dt: f32) {
    if input.reset {
        state.reset();
        return;
    }
    if input.toggle_follow {
        let target = if state.camera.has_target() {
            None
        } else {
            state.level.player.as_ref().map(|p| p.id)
        };
        state.camera.set_target(target);
        log::debug!("Camera follow enabled: {}", state.camera.has_target());
    }

    state.time += dt;
    state.frame += 1;

    tick_phase_delays(state, dt);

    // Once the run has ended the world keeps simulating through the
    // notification delay, but player input no longer applies.
    let live_input;
    let input = if state.phase == GamePhase::Playing {
        input
    } else {
        live_input = TickInput::default();
        &live_input
    };

    apply_player_intents(state, input);
    tick_power_up_timers(state, dt);

    match state.mode {
        PhysicsMode::Kinematic => integrate_kinematic(state, dt),
        PhysicsMode::RigidBody => step_rigid_bodies(state, dt),
    }

    let contacts = match state.mode {
        PhysicsMode::Kinematic => aabb_contacts(state),
        PhysicsMode::RigidBody => state
            .physics
            .as_ref()
            .map(|p| p.active_contacts())
            .unwrap_or_default(),
    };
    resolve_contacts(state, &contacts);

    if state.mode == PhysicsMode::RigidBody {
        update_weather(state, dt);
    }

    state.drain_removal_queue();

    evaluate_player_fate(state);

    let target = state.camera_target_pos();
    state.camera.update(target, dt);
    state.level.update_parallax(state.camera.position());

    update_visual_counters(state, dt);
}

/// Countdown toward the shell notification once a run has ended. The event
/// fires exactly once when the delay crosses zero.
fn tick_phase_delays(state: &mut GameState, dt: f32) {
    match state.phase {
        GamePhase::GameOver => {
            state.time_left_game_over -= dt;
            if state.time_left_game_over < 0.0 && !state.game_over_notified {
                state.game_over_notified = true;
                state.push_event(GameEvent::GameOver { final_score: state.score });
            }
        }
        GamePhase::LevelComplete => {
            state.time_left_level_complete -= dt;
            if state.time_left_level_complete < 0.0 && !state.level_complete_notified {
                state.level_complete_notified = true;
                state.push_event(GameEvent::LevelComplete { final_score: state.score });
            }
        }
        GamePhase::Playing => {}
    }
}

/// Feed the input snapshot into the player: horizontal intent and the jump
/// state machine (kinematic) or forces and impulses (rigid-body).
fn apply_player_intents(state: &mut GameState, input: &TickInput) {
    let mode = state.mode;
    let jump_time_max = state.tuning.jump_time_max;
    let mut jumped = false;

    {
        let physics = state.physics.as_mut();
        let Some(player) = state.level.player.as_mut() else {
            return;
        };

        match mode {
            PhysicsMode::Kinematic => {
                if input.left {
                    player.velocity.x = -player.terminal_velocity.x;
                } else if input.right {
                    player.velocity.x = player.terminal_velocity.x;
                }
                // else: friction brings the run to a stop
                jumped = set_jumping(player, input.jump, jump_time_max);
            }
            PhysicsMode::RigidBody => {
                let run_force = player.acceleration.x;
                let jump_impulse = player.acceleration.y;
                let handle = player.body;
                if let (Some(physics), Some(handle)) = (physics, handle) {
                    if input.left {
                        physics.apply_force(handle, Vec2::new(-run_force, 0.0));
                    } else if input.right {
                        physics.apply_force(handle, Vec2::new(run_force, 0.0));
                    }
                    // Jumping is allowed only while resting on something;
                    // ground contacts zero the vertical velocity exactly.
                    if input.jump && physics.linvel(handle).y == 0.0 {
                        physics.apply_impulse(handle, Vec2::new(0.0, jump_impulse));
                        jumped = true;
                    }
                }
                if let Some(ps) = player.player_state_mut() {
                    if input.left {
                        ps.view_direction = ViewDirection::Left;
                    } else if input.right {
                        ps.view_direction = ViewDirection::Right;
                    }
                }
            }
        }
    }

    if jumped {
        state.push_event(GameEvent::Sound(Sfx::Jump));
    }
}

/// The jump-phase transition table. Returns true when an ascent started.
fn set_jumping(player: &mut Entity, jump_held: bool, jump_time_max: f32) -> bool {
    let flight = player
        .player_state()
        .map(|s| s.flight_active())
        .unwrap_or(false);
    let Some(ps) = player.player_state_mut() else {
        return false;
    };
    match ps.jump_phase {
        JumpPhase::Grounded => {
            if jump_held {
                ps.time_jumping = 0.0;
                ps.jump_phase = JumpPhase::JumpRising;
                return true;
            }
        }
        JumpPhase::JumpRising => {
            if !jump_held {
                ps.jump_phase = JumpPhase::JumpFalling;
            }
        }
        JumpPhase::Falling | JumpPhase::JumpFalling => {
            if jump_held && flight {
                ps.time_jumping = jump_time_max - FLIGHT_REJUMP_WINDOW;
                ps.jump_phase = JumpPhase::JumpRising;
                return true;
            }
        }
    }
    false
}

/// Count down the power-up timers; crossing zero reverts the physics profile
/// to baseline exactly once (entry into this branch requires a positive
/// remainder).
fn tick_power_up_timers(state: &mut GameState, dt: f32) {
    let baseline = match state.mode {
        PhysicsMode::Kinematic => state.tuning.player_kinematic,
        PhysicsMode::RigidBody => state.tuning.player_rigid,
    };
    let Some(player) = state.level.player.as_mut() else {
        return;
    };
    let mut revert = false;
    if let Some(ps) = player.player_state_mut() {
        if ps.star_time_left > 0.0 {
            ps.star_time_left -= dt;
            if ps.star_time_left <= 0.0 {
                ps.star_time_left = 0.0;
                ps.has_star = false;
                revert = true;
            }
        }
        if ps.feather_time_left > 0.0 {
            ps.feather_time_left -= dt;
            if ps.feather_time_left <= 0.0 {
                ps.feather_time_left = 0.0;
                ps.has_feather = false;
            }
        }
    }
    if revert {
        player.apply_profile(&baseline);
    }
}

/// The speed boost in the manual integrator only raises the horizontal cap;
/// gravity and ground friction keep their baseline values. The rigid-body
/// variant swaps the whole profile.
fn boosted_profile(tuning: &Tuning, mode: PhysicsMode) -> MotionProfile {
    match mode {
        PhysicsMode::RigidBody => tuning.player_boosted,
        PhysicsMode::Kinematic => MotionProfile {
            terminal_velocity: Vec2::new(
                tuning.player_boosted.terminal_velocity.x,
                tuning.player_kinematic.terminal_velocity.y,
            ),
            friction: tuning.player_kinematic.friction,
            acceleration: tuning.player_kinematic.acceleration,
        },
    }
}

// --- motion -------------------------------------------------------------

fn integrate_kinematic(state: &mut GameState, dt: f32) {
    let tuning = &state.tuning;
    let level = &mut state.level;
    if let Some(player) = level.player.as_mut() {
        update_player_motion(player, dt, tuning);
    }
    for e in level.collectibles.iter_mut().chain(&mut level.hazards) {
        e.integrate(dt);
    }
    // ground and decorations do not move
}

/// Player motion with the jump-phase vertical rules layered over the plain
/// per-axis integrator.
fn update_player_motion(player: &mut Entity, dt: f32, tuning: &Tuning) {
    player.update_motion_x(dt);
    let vx = player.velocity.x;

    let terminal_y = player.terminal_velocity.y;
    let mut force_ascent = false;
    if let Some(ps) = player.player_state_mut() {
        if vx != 0.0 {
            ps.view_direction = if vx < 0.0 { ViewDirection::Left } else { ViewDirection::Right };
        }
        match ps.jump_phase {
            JumpPhase::Grounded => {
                // Only ground collision resolution puts this back
                ps.jump_phase = JumpPhase::Falling;
            }
            JumpPhase::JumpRising => {
                ps.time_jumping += dt;
                if ps.time_jumping <= tuning.jump_time_max {
                    force_ascent = true;
                }
            }
            JumpPhase::Falling => {}
            JumpPhase::JumpFalling => {
                ps.time_jumping += dt;
                // Minimum-hop rule: a tap shorter than the minimum still
                // rises for the full minimum window
                if ps.time_jumping > 0.0 && ps.time_jumping <= tuning.jump_time_min {
                    force_ascent = true;
                }
            }
        }
    }
    if force_ascent {
        player.velocity.y = terminal_y;
    }
    player.update_motion_y(dt);
    player.pos += player.velocity * dt;
}

/// Drive solver-owned bodies, step the solver once, then mirror its state
/// back into the entities and enforce the terminal bound.
fn step_rigid_bodies(state: &mut GameState, dt: f32) {
    if let Some(ps) = state
        .level
        .player
        .as_mut()
        .and_then(|p| p.player_state_mut())
    {
        // Re-grounded by a ground contact below, if any
        ps.grounded = false;
    }

    let Some(physics) = state.physics.as_mut() else {
        return;
    };

    // The scuttler patrols leftward at terminal speed and hops whenever it
    // stops drifting left.
    for hazard in &mut state.level.hazards {
        let Some(handle) = hazard.body else { continue };
        let v = physics.linvel(handle);
        if v.x >= 0.0 {
            physics.apply_impulse(handle, Vec2::new(0.0, hazard.acceleration.y));
        }
        let vx = v.x.min(-hazard.terminal_velocity.x);
        let vy = v.y.min(hazard.terminal_velocity.y);
        physics.set_linvel(handle, Vec2::new(vx, vy));
    }

    physics.step(dt);

    if let Some(player) = state.level.player.as_mut() {
        mirror_from_solver(player, physics);
    }
    for e in state
        .level
        .collectibles
        .iter_mut()
        .chain(&mut state.level.hazards)
    {
        mirror_from_solver(e, physics);
    }
}

/// Rigid-body-driven update: the entity only mirrors solver-owned position
/// and rotation; its own friction/acceleration fields are solver metadata.
fn mirror_from_solver(e: &mut Entity, physics: &mut super::physics::PhysicsWorld) {
    let Some(handle) = e.body else { return };
    physics.clamp_velocity(handle, e.terminal_velocity);
    if let Some(t) = physics.translation(handle) {
        e.pos = t;
    }
    if let Some(r) = physics.rotation(handle) {
        e.rotation = r;
    }
    e.velocity = physics.linvel(handle);
}

// --- contacts and resolution --------------------------------------------

/// Overlap tests for the manual-integration world: the player against
/// ground runs, pick-ups and the goal, plus hazards against raindrops.
fn aabb_contacts(state: &GameState) -> Vec<(EntityId, EntityId)> {
    let mut pairs = Vec::new();
    let level = &state.level;
    let Some(player) = level.player.as_ref() else {
        return pairs;
    };

    for ground in &level.ground {
        if collision::entities_overlap(player, ground) {
            pairs.push((player.id, ground.id));
        }
    }
    for item in &level.collectibles {
        let collected = item
            .collectible_state()
            .map(|s| s.collected)
            .unwrap_or(false);
        if !collected && collision::entities_overlap(player, item) {
            pairs.push((player.id, item.id));
        }
    }
    for hazard in &level.hazards {
        for item in &level.collectibles {
            let raindrop = matches!(
                &item.kind,
                EntityKind::Collectible(s) if s.kind == CollectibleKind::Raindrop && !s.collected
            );
            if raindrop && collision::entities_overlap(hazard, item) {
                pairs.push((hazard.id, item.id));
            }
        }
    }
    pairs
}

/// Dispatch every contact through the symmetric classifier and apply the
/// per-pair rule. Ids that stopped resolving (entity removed earlier this
/// frame) are skipped.
fn resolve_contacts(state: &mut GameState, contacts: &[(EntityId, EntityId)]) {
    for &(a, b) in contacts {
        let Some(class) = collision::classify(&state.level, a, b) else {
            continue;
        };
        match class {
            ContactClass::PlayerGround { ground, .. } => resolve_ground_contact(state, ground),
            ContactClass::PlayerCollectible { item, .. } => collect_item(state, item),
            ContactClass::PlayerGoal { .. } => reach_goal(state),
            // The solver already separates the two; being shoved is the
            // whole effect
            ContactClass::PlayerHazard { .. } => {}
            ContactClass::HazardRaindrop { raindrop, .. } => state.flag_for_removal(raindrop),
        }
    }
}

fn resolve_ground_contact(state: &mut GameState, ground_id: EntityId) {
    match state.mode {
        PhysicsMode::Kinematic => {
            let threshold = state.tuning.ground_edge_threshold;
            let level = &mut state.level;
            let Some(player) = level.player.as_mut() else { return };
            let Some(ground) = level.ground.iter().find(|g| g.id == ground_id) else {
                return;
            };
            collision::resolve_player_on_ground(player, ground, threshold);
        }
        PhysicsMode::RigidBody => {
            let Some(player) = state.level.player.as_mut() else { return };
            if let Some(ps) = player.player_state_mut() {
                ps.grounded = true;
            }
            let Some(handle) = player.body else { return };
            if let Some(physics) = state.physics.as_mut() {
                // Kill downward motion so the body rests; upward motion is
                // left alone or a starting jump would be cancelled
                let v = physics.linvel(handle);
                if v.y < 0.0 {
                    physics.set_linvel(handle, Vec2::new(v.x, 0.0));
                }
            }
        }
    }
}

/// Pick up a collectible. Idempotent: a second contact on an already
/// collected item the same frame is a no-op.
fn collect_item(state: &mut GameState, item_id: EntityId) {
    let kind = {
        let Some(item) = state.level.entity_mut(item_id) else { return };
        let Some(cs) = item.collectible_state_mut() else { return };
        if cs.collected {
            return;
        }
        cs.collected = true;
        cs.kind
    };

    let (amount, sfx) = match kind {
        CollectibleKind::Coin => (state.tuning.score_coin, Sfx::PickupCoin),
        CollectibleKind::Feather => (state.tuning.score_feather, Sfx::PickupFeather),
        CollectibleKind::Star => (state.tuning.score_star, Sfx::PickupStar),
        CollectibleKind::Raindrop => (state.tuning.score_raindrop, Sfx::PickupRain),
    };
    state.award(amount);
    state.push_event(GameEvent::Sound(sfx));

    match kind {
        CollectibleKind::Feather => {
            let duration = state.tuning.feather_duration;
            if let Some(ps) = state
                .level
                .player
                .as_mut()
                .and_then(|p| p.player_state_mut())
            {
                ps.has_feather = true;
                ps.feather_time_left = duration;
            }
        }
        CollectibleKind::Star => {
            let duration = state.tuning.star_duration;
            let profile = boosted_profile(&state.tuning, state.mode);
            if let Some(player) = state.level.player.as_mut() {
                if let Some(ps) = player.player_state_mut() {
                    ps.has_star = true;
                    ps.star_time_left = duration;
                }
                player.apply_profile(&profile);
            }
        }
        _ => {}
    }

    state.flag_for_removal(item_id);
}

fn reach_goal(state: &mut GameState) {
    if state.phase != GamePhase::Playing {
        return;
    }
    log::debug!("Goal reached with score {}", state.score);
    state.phase = GamePhase::LevelComplete;
    state.time_left_level_complete = consts::TIME_DELAY_LEVEL_COMPLETE;
}

// --- weather and hazard spawners (rigid-body levels) --------------------

fn update_weather(state: &mut GameState, dt: f32) {
    let despawn_y = state.tuning.raindrop_despawn_y;
    let fatal_y = state.tuning.fatal_y;

    // Raindrop lifetimes: drops drift while falling, start evaporating once
    // they come to rest, and despawn well below the world
    let mut expired: Vec<EntityId> = Vec::new();
    if let Some(physics) = state.physics.as_mut() {
        for drop in &mut state.level.collectibles {
            let EntityKind::Collectible(cs) = &mut drop.kind else { continue };
            if cs.kind != CollectibleKind::Raindrop || cs.collected {
                continue;
            }
            if drop.pos.y <= despawn_y || cs.decay_left <= 0.0 {
                expired.push(drop.id);
                continue;
            }
            let Some(handle) = drop.body else { continue };
            let v = physics.linvel(handle);
            if v.y == 0.0 {
                cs.decaying = true;
                cs.decay_left -= dt;
                physics.set_linvel(handle, Vec2::ZERO);
            } else if !cs.decaying {
                let drift = state.rng.random_range(-0.05..0.1);
                physics.set_linvel(handle, Vec2::new(v.x + drift, v.y));
            }
        }
    }
    for id in expired {
        state.flag_for_removal(id);
    }

    // New drops fall in around the level while under the cap
    if state.rain_limit > 0
        && state.rain_alive < state.rain_limit
        && state.rng.random_range(0.0..0.2) < dt
    {
        let width = state.level.width as f32;
        let radius = state.tuning.rain_spawn_radius;
        let ground_top = state.level.highest_ground_top();
        let x = state.rng.random_range(0.0..width) + state.rng.random_range(-radius..radius);
        let base_y = if ground_top.is_finite() { ground_top } else { 0.0 };
        let y = base_y + state.rng.random_range(4.0..8.0);

        let id = state.level.alloc_id();
        let mut drop = Entity::collectible(id, CollectibleKind::Raindrop, &state.tuning);
        drop.pos = Vec2::new(x, y);
        if let Some(physics) = state.physics.as_mut() {
            physics.register_dynamic(&mut drop, state.tuning.raindrop_gravity_scale);
        }
        state.level.collectibles.push(drop);
        state.rain_alive += 1;
    }

    // Hazard lifecycle: flag a scuttler that fell off the stage, respawn
    // after a random delay when none is alive
    let fallen: Vec<EntityId> = state
        .level
        .hazards
        .iter()
        .filter(|h| h.pos.y <= fatal_y)
        .map(|h| h.id)
        .collect();
    for id in fallen {
        state.flag_for_removal(id);
    }

    // The scuttler only haunts levels with weather; it exists to steal
    // raindrops.
    if state.rain_limit > 0 && state.level.hazards.is_empty() {
        state.hazard_timer -= dt;
        if state.hazard_timer <= 0.0 {
            let spawn = state.level.hazard_spawn;
            let id = state.level.alloc_id();
            let mut hazard = Entity::hazard(id, &state.tuning);
            hazard.pos = spawn;
            if let Some(physics) = state.physics.as_mut() {
                physics.register_dynamic(&mut hazard, 1.0);
                if let Some(handle) = hazard.body {
                    physics.set_linvel(handle, Vec2::new(-0.01, -0.01));
                }
            }
            log::debug!("Scuttler spawned at {:.1},{:.1}", spawn.x, spawn.y);
            state.level.hazards.push(hazard);
            state.hazard_timer = state
                .rng
                .random_range(state.tuning.hazard_respawn_min..state.tuning.hazard_respawn_max);
        }
    }
}

// --- end-of-frame evaluation --------------------------------------------

/// A player below the fatal line loses a life: respawn while lives remain,
/// otherwise start the game-over delay.
fn evaluate_player_fate(state: &mut GameState) {
    if state.phase != GamePhase::Playing {
        return;
    }
    let below = state
        .level
        .player
        .as_ref()
        .map(|p| p.pos.y < state.tuning.fatal_y)
        .unwrap_or(false);
    if !below {
        return;
    }

    state.push_event(GameEvent::Sound(Sfx::LifeLost));
    state.lives -= 1;
    state.push_event(GameEvent::LifeLost { remaining: state.lives });
    if state.lives < 0 {
        state.phase = GamePhase::GameOver;
        state.time_left_game_over = consts::TIME_DELAY_GAME_OVER;
    } else {
        state.respawn_level();
    }
}

/// The cosmetic counters trail the authoritative values at a fixed rate;
/// they are presentation only and never gate logic.
fn update_visual_counters(state: &mut GameState, dt: f32) {
    state.lives_visual = crate::approach(
        state.lives_visual,
        state.lives as f32,
        state.tuning.lives_visual_rate * dt,
    );
    state.score_visual = crate::approach(
        state.score_visual,
        state.score as f32,
        state.tuning.score_visual_rate * dt,
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::consts::SIM_DT;
    use crate::level::{loader, ColorTable, Level};
    use image::{Rgba, RgbaImage};

    const BLACK: Rgba<u8> = Rgba([0, 0, 0, 255]);
    const GREEN: Rgba<u8> = Rgba([0, 255, 0, 255]);
    const WHITE: Rgba<u8> = Rgba([255, 255, 255, 255]);
    const YELLOW: Rgba<u8> = Rgba([255, 255, 0, 255]);
    const MAGENTA: Rgba<u8> = Rgba([255, 0, 255, 255]);

    /// 10-wide level: a three-tile ground run on the bottom row, the spawn
    /// above its left end, a coin on the row above the run.
    fn walkway_level() -> Level {
        let mut img = RgbaImage::from_pixel(10, 4, BLACK);
        img.put_pixel(0, 3, GREEN);
        img.put_pixel(1, 3, GREEN);
        img.put_pixel(2, 3, GREEN);
        img.put_pixel(0, 2, WHITE);
        img.put_pixel(2, 2, YELLOW);
        loader::from_image(&img, &ColorTable::v1(), &Tuning::default())
    }

    fn kinematic_state(level: Level) -> GameState {
        GameState::new(level, PhysicsMode::Kinematic, Tuning::default(), 42)
    }

    fn hold_right() -> TickInput {
        TickInput { right: true, ..Default::default() }
    }

    fn settle_on_ground(state: &mut GameState) {
        for _ in 0..60 {
            tick(state, &TickInput::default(), SIM_DT);
        }
        let phase = state.level.player.as_ref().unwrap().player_state().unwrap().jump_phase;
        // The grounded phase flips to Falling during motion and back on
        // contact; right after a tick it is Falling while standing
        assert!(
            matches!(phase, JumpPhase::Grounded | JumpPhase::Falling),
            "player did not settle: {phase:?}"
        );
    }

    #[test]
    fn test_end_to_end_walk_and_collect() {
        let level = walkway_level();
        assert_eq!(level.ground.len(), 1, "one run-length ground entity");
        assert_eq!(level.ground[0].ground_length(), 3);
        assert_eq!(level.collectibles.len(), 1);
        let player = level.player.as_ref().unwrap();
        assert_eq!(player.pos.x, 0.0);
        let coin_value = Tuning::default().score_coin;

        let mut state = kinematic_state(level);
        settle_on_ground(&mut state);

        let mut last_x = state.level.player.as_ref().unwrap().pos.x;
        let mut collected_at_frame = None;
        for frame in 0..240 {
            tick(&mut state, &hold_right(), SIM_DT);
            let x = state.level.player.as_ref().unwrap().pos.x;
            assert!(x >= last_x, "rightward input moves x monotonically");
            last_x = x;
            if state.score > 0 {
                collected_at_frame = Some(frame);
                break;
            }
        }

        assert!(collected_at_frame.is_some(), "player reached the coin");
        assert_eq!(state.score, coin_value, "coin scored exactly once");
        assert!(
            state.level.collectibles.is_empty(),
            "collected coin is gone before the next frame"
        );

        // The next frame must not re-score the removed coin
        tick(&mut state, &hold_right(), SIM_DT);
        assert_eq!(state.score, coin_value);
    }

    #[test]
    fn test_double_contact_scores_once() {
        let mut state = kinematic_state(walkway_level());
        let coin_id = state.level.collectibles[0].id;
        let player_id = state.level.player.as_ref().unwrap().id;

        // Two overlapping contacts in the same frame
        resolve_contacts(&mut state, &[(player_id, coin_id), (coin_id, player_id)]);
        assert_eq!(state.score, state.tuning.score_coin);

        state.drain_removal_queue();
        assert!(state.level.entity(coin_id).is_none());
    }

    #[test]
    fn test_tap_jump_still_produces_a_minimum_hop() {
        let mut state = kinematic_state(walkway_level());
        settle_on_ground(&mut state);
        let start_y = state.level.player.as_ref().unwrap().pos.y;

        // Tap: hold jump for two frames, well under the minimum window
        let jump = TickInput { jump: true, ..Default::default() };
        tick(&mut state, &jump, SIM_DT);
        tick(&mut state, &jump, SIM_DT);

        let mut peak = f32::NEG_INFINITY;
        for _ in 0..120 {
            tick(&mut state, &TickInput::default(), SIM_DT);
            let p = state.level.player.as_ref().unwrap();
            peak = peak.max(p.pos.y);
            if p.player_state().unwrap().jump_phase == JumpPhase::Grounded {
                break;
            }
        }
        assert!(
            peak > start_y + 0.1,
            "tap jump rose before landing: peak {peak}, start {start_y}"
        );
    }

    #[test]
    fn test_jump_phase_sequence() {
        let mut state = kinematic_state(walkway_level());
        settle_on_ground(&mut state);
        let phase = |s: &GameState| {
            s.level.player.as_ref().unwrap().player_state().unwrap().jump_phase
        };

        let jump = TickInput { jump: true, ..Default::default() };
        tick(&mut state, &jump, SIM_DT);
        assert_eq!(phase(&state), JumpPhase::JumpRising);

        tick(&mut state, &TickInput::default(), SIM_DT);
        assert_eq!(phase(&state), JumpPhase::JumpFalling, "release ends the ascent");
    }

    #[test]
    fn test_flight_allows_rising_while_falling() {
        let tuning = Tuning::default();
        let mut player = Entity::player(1, &tuning);
        let ps = player.player_state_mut().unwrap();
        ps.jump_phase = JumpPhase::Falling;
        ps.has_feather = true;
        ps.feather_time_left = 5.0;

        assert!(set_jumping(&mut player, true, tuning.jump_time_max));
        assert_eq!(
            player.player_state().unwrap().jump_phase,
            JumpPhase::JumpRising
        );

        // Without the power-up the same input does nothing
        let mut player = Entity::player(2, &tuning);
        player.player_state_mut().unwrap().jump_phase = JumpPhase::Falling;
        assert!(!set_jumping(&mut player, true, tuning.jump_time_max));
    }

    #[test]
    fn test_star_boost_reverts_exactly_once() {
        let mut img = RgbaImage::from_pixel(10, 4, BLACK);
        for x in 0..10 {
            img.put_pixel(x, 3, GREEN);
        }
        img.put_pixel(0, 2, WHITE);
        img.put_pixel(2, 2, MAGENTA); // star in the v2 table
        let level = loader::from_image(&img, &ColorTable::v2(), &Tuning::default());
        let mut state = kinematic_state(level);
        settle_on_ground(&mut state);

        let baseline = state.tuning.player_kinematic;
        // Walk into the star
        for _ in 0..240 {
            tick(&mut state, &hold_right(), SIM_DT);
            if state.score > 0 {
                break;
            }
        }
        assert_eq!(state.score, state.tuning.score_star);
        {
            let player = state.level.player.as_ref().unwrap();
            let ps = player.player_state().unwrap();
            assert!(ps.has_star);
            assert!(
                player.terminal_velocity.x > baseline.terminal_velocity.x,
                "boost raised the horizontal cap"
            );
        }

        // Run past the power-up duration
        let frames = (state.tuning.star_duration / SIM_DT) as usize + 10;
        for _ in 0..frames {
            tick(&mut state, &TickInput::default(), SIM_DT);
        }
        let player = state.level.player.as_ref().unwrap();
        let ps = player.player_state().unwrap();
        assert!(!ps.has_star);
        assert_eq!(ps.star_time_left, 0.0, "timer clamps at zero");
        assert_eq!(player.terminal_velocity, baseline.terminal_velocity);
        assert_eq!(player.friction, baseline.friction);
    }

    #[test]
    fn test_falling_out_of_the_world_respawns_then_game_over() {
        let mut img = RgbaImage::from_pixel(4, 4, BLACK);
        img.put_pixel(0, 0, WHITE); // spawn with no ground anywhere
        let level = loader::from_image(&img, &ColorTable::v1(), &Tuning::default());
        let mut state = kinematic_state(level);

        let mut lives_seen = Vec::new();
        let mut game_over_events = 0;
        // Long enough for four falls plus the notification delay
        for _ in 0..4000 {
            tick(&mut state, &TickInput::default(), SIM_DT);
            for ev in state.take_events() {
                match ev {
                    GameEvent::LifeLost { remaining } => lives_seen.push(remaining),
                    GameEvent::GameOver { final_score } => {
                        game_over_events += 1;
                        assert_eq!(final_score, 0);
                    }
                    _ => {}
                }
            }
        }

        assert_eq!(lives_seen, vec![2, 1, 0, -1]);
        assert_eq!(state.phase, GamePhase::GameOver);
        assert_eq!(game_over_events, 1, "the shell is notified exactly once");
    }

    #[test]
    fn test_visual_counters_trail_the_authoritative_values() {
        let mut state = kinematic_state(walkway_level());
        state.award(500);
        tick(&mut state, &TickInput::default(), SIM_DT);
        let expected = state.tuning.score_visual_rate * SIM_DT;
        assert!((state.score_visual - expected).abs() < 1e-3, "never instantaneous");
        for _ in 0..400 {
            tick(&mut state, &TickInput::default(), SIM_DT);
        }
        assert_eq!(state.score_visual, 500.0, "eventually converges");
    }

    #[test]
    fn test_rigid_mode_grounds_and_jumps() {
        let mut img = RgbaImage::from_pixel(10, 4, BLACK);
        for x in 0..10 {
            img.put_pixel(x, 3, GREEN);
        }
        img.put_pixel(2, 1, WHITE);
        let level = loader::from_image(&img, &ColorTable::v2(), &Tuning::default());
        let mut state = GameState::new(level, PhysicsMode::RigidBody, Tuning::default(), 42);

        // Fall onto the ground
        for _ in 0..240 {
            tick(&mut state, &TickInput::default(), SIM_DT);
        }
        let grounded = state
            .level
            .player
            .as_ref()
            .unwrap()
            .player_state()
            .unwrap()
            .grounded;
        assert!(grounded, "ground contact sets the grounded flag");
        let rest_y = state.level.player.as_ref().unwrap().pos.y;

        // Jump
        let jump = TickInput { jump: true, ..Default::default() };
        tick(&mut state, &jump, SIM_DT);
        let mut peak = rest_y;
        for _ in 0..30 {
            tick(&mut state, &TickInput::default(), SIM_DT);
            peak = peak.max(state.level.player.as_ref().unwrap().pos.y);
        }
        assert!(peak > rest_y + 0.2, "impulse lifted the player: {rest_y} -> {peak}");
    }

    #[test]
    fn test_rigid_collect_releases_the_body() {
        let mut img = RgbaImage::from_pixel(10, 4, BLACK);
        for x in 0..10 {
            img.put_pixel(x, 3, GREEN);
        }
        img.put_pixel(0, 1, WHITE);
        img.put_pixel(3, 2, MAGENTA);
        let level = loader::from_image(&img, &ColorTable::v2(), &Tuning::default());
        let mut state = GameState::new(level, PhysicsMode::RigidBody, Tuning::default(), 42);
        let star_id = state.level.collectibles[0].id;
        let bodies_before = state.physics.as_ref().unwrap().body_count();

        for _ in 0..600 {
            tick(&mut state, &hold_right(), SIM_DT);
            if state.score > 0 {
                break;
            }
        }
        assert_eq!(state.score, state.tuning.score_star, "star collected once");
        assert!(state.level.entity(star_id).is_none());
        assert!(!state.physics.as_ref().unwrap().has_body(star_id));
        assert_eq!(
            state.physics.as_ref().unwrap().body_count(),
            bodies_before - 1
        );
    }

    #[test]
    fn test_same_seed_same_story() {
        let build = || {
            let mut img = RgbaImage::from_pixel(12, 4, BLACK);
            for x in 0..12 {
                img.put_pixel(x, 3, GREEN);
            }
            img.put_pixel(1, 1, WHITE);
            img.put_pixel(6, 2, YELLOW); // raindrop pixel enables weather
            let level = loader::from_image(&img, &ColorTable::v2(), &Tuning::default());
            GameState::new(level, PhysicsMode::RigidBody, Tuning::default(), 777)
        };
        let mut a = build();
        let mut b = build();
        for i in 0..300 {
            let input = if i % 7 == 0 { hold_right() } else { TickInput::default() };
            tick(&mut a, &input, SIM_DT);
            tick(&mut b, &input, SIM_DT);
        }
        let pa = a.level.player.as_ref().unwrap().pos;
        let pb = b.level.player.as_ref().unwrap().pos;
        assert_eq!(pa, pb);
        assert_eq!(a.score, b.score);
        assert_eq!(a.rain_alive, b.rain_alive);
        assert_eq!(a.level.collectibles.len(), b.level.collectibles.len());
    }

    #[test]
    fn test_goal_contact_completes_the_level_once() {
        let mut img = RgbaImage::from_pixel(8, 4, BLACK);
        for x in 0..8 {
            img.put_pixel(x, 3, GREEN);
        }
        img.put_pixel(0, 2, WHITE);
        img.put_pixel(3, 2, Rgba([0, 0, 255, 255])); // goal post
        let level = loader::from_image(&img, &ColorTable::v1(), &Tuning::default());
        let mut state = kinematic_state(level);
        settle_on_ground(&mut state);

        for _ in 0..240 {
            tick(&mut state, &hold_right(), SIM_DT);
            if state.phase == GamePhase::LevelComplete {
                break;
            }
        }
        assert_eq!(state.phase, GamePhase::LevelComplete);

        // Notification only after the fixed delay, exactly once
        let mut notifications = 0;
        let frames = (consts::TIME_DELAY_LEVEL_COMPLETE / SIM_DT) as usize + 20;
        for _ in 0..frames {
            tick(&mut state, &TickInput::default(), SIM_DT);
            for ev in state.take_events() {
                if matches!(ev, GameEvent::LevelComplete { .. }) {
                    notifications += 1;
                }
            }
        }
        assert_eq!(notifications, 1);
    }

    #[test]
    fn test_reset_input_restarts_the_run() {
        let mut state = kinematic_state(walkway_level());
        state.award(75);
        let reset = TickInput { reset: true, ..Default::default() };
        tick(&mut state, &reset, SIM_DT);
        assert_eq!(state.score, 0);
        assert_eq!(state.lives, consts::LIVES_START);
    }

    #[test]
    fn test_camera_follows_the_walking_player() {
        let mut state = kinematic_state(walkway_level());
        settle_on_ground(&mut state);
        let cam_before = state.camera.position().x;
        for _ in 0..60 {
            tick(&mut state, &hold_right(), SIM_DT);
        }
        assert!(
            state.camera.position().x > cam_before,
            "camera trails the player to the right"
        );
        assert!(state.camera.position().y >= state.tuning.camera_floor_y);
    }
}
