//! Data-driven game balance
//!
//! Every numeric knob the simulation consumes lives here so levels can be
//! re-balanced without touching sim code. The shell may override the defaults
//! from a JSON file; the sim only ever sees an immutable [`Tuning`] value.

use std::path::Path;

use glam::Vec2;
use serde::{Deserialize, Serialize};

/// Physics constants for one entity archetype.
///
/// For manually integrated entities these feed the per-axis integrator
/// directly. For rigid-body-driven entities `acceleration` becomes the
/// force/impulse magnitudes applied to the body and `friction.x` the fixture
/// friction; `terminal_velocity` is enforced by clamping the solver velocity
/// after each step.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MotionProfile {
    pub terminal_velocity: Vec2,
    pub friction: Vec2,
    pub acceleration: Vec2,
}

/// Vertical placement rule for one tile kind: the loader computes
/// `y = base_height * entity_height * height_factor + vertical_offset`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Placement {
    pub height_factor: f32,
    pub vertical_offset: f32,
}

/// All tunable constants of the simulation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tuning {
    // === Player physics ===
    /// Baseline profile for the manually integrated player. `acceleration.y`
    /// is gravity; horizontal input sets the velocity directly.
    pub player_kinematic: MotionProfile,
    /// Baseline profile for the rigid-body player. `acceleration.x` is the
    /// run force, `acceleration.y` the jump impulse.
    pub player_rigid: MotionProfile,
    /// Profile while the speed power-up is active.
    pub player_boosted: MotionProfile,

    // === Jump state machine ===
    /// Maximum sustained-ascent duration in seconds
    pub jump_time_max: f32,
    /// Minimum hop duration; a shorter tap still rises this long
    pub jump_time_min: f32,

    // === Power-ups ===
    /// Speed-boost duration in seconds
    pub star_duration: f32,
    /// Flight duration in seconds
    pub feather_duration: f32,

    // === Score values ===
    pub score_raindrop: i32,
    pub score_star: i32,
    pub score_coin: i32,
    pub score_feather: i32,
    /// Visual score counter rate, points per second
    pub score_visual_rate: f32,
    /// Visual lives counter rate, lives per second
    pub lives_visual_rate: f32,

    // === World thresholds ===
    /// Player y below this loses a life
    pub fatal_y: f32,
    /// Raindrops below this despawn silently
    pub raindrop_despawn_y: f32,
    /// Feet-to-top distance above which a ground contact counts as a side hit
    pub ground_edge_threshold: f32,

    // === Camera ===
    pub camera_follow_speed: f32,
    /// Camera never drops below this y (keeps the water off screen)
    pub camera_floor_y: f32,
    pub camera_zoom_min: f32,
    pub camera_zoom_max: f32,

    // === Rigid-body world ===
    pub gravity: Vec2,
    /// Solver velocity iterations per step
    pub solver_iterations: usize,

    // === Weather / hazard spawners (rigid-body levels) ===
    /// Raindrop profile; terminal velocity bounds the fall speed
    pub raindrop: MotionProfile,
    /// Gravity scale applied to raindrop bodies
    pub raindrop_gravity_scale: f32,
    /// Horizontal spawn radius around the pick point
    pub rain_spawn_radius: f32,
    /// Alive-raindrop cap as a multiple of the level's rain pixel count
    pub rain_limit_factor: u32,
    /// Seconds a grounded raindrop lingers before evaporating
    pub raindrop_decay: f32,
    /// Scuttler hazard profile; it patrols leftward and hops when blocked
    pub hazard: MotionProfile,
    /// Respawn delay range for the hazard, seconds
    pub hazard_respawn_min: f32,
    pub hazard_respawn_max: f32,

    // === Loader placement ===
    pub place_ground: Placement,
    pub place_foreground: Placement,
    pub place_item: Placement,
    pub place_spawn: Placement,
    pub place_goal: Placement,
}

impl Default for Tuning {
    fn default() -> Self {
        Self {
            player_kinematic: MotionProfile {
                terminal_velocity: Vec2::new(3.0, 4.0),
                friction: Vec2::new(12.0, 0.0),
                acceleration: Vec2::new(0.0, -25.0),
            },
            player_rigid: MotionProfile {
                terminal_velocity: Vec2::new(5.0, 5.0),
                friction: Vec2::new(2.0, 0.0),
                acceleration: Vec2::new(14.0, 12.0),
            },
            player_boosted: MotionProfile {
                terminal_velocity: Vec2::new(8.0, 5.0),
                friction: Vec2::new(5.0, 0.0),
                acceleration: Vec2::new(22.0, 12.0),
            },

            jump_time_max: 0.3,
            jump_time_min: 0.1,

            star_duration: 9.0,
            feather_duration: 9.0,

            score_raindrop: 5,
            score_star: 25,
            score_coin: 100,
            score_feather: 250,
            score_visual_rate: 250.0,
            lives_visual_rate: 1.0,

            fatal_y: -5.0,
            raindrop_despawn_y: -10.0,
            ground_edge_threshold: 0.25,

            camera_follow_speed: 4.0,
            camera_floor_y: -1.0,
            camera_zoom_min: 0.25,
            camera_zoom_max: 10.0,

            gravity: Vec2::new(0.0, -9.81),
            solver_iterations: 8,

            raindrop: MotionProfile {
                terminal_velocity: Vec2::new(0.5, 1.0),
                friction: Vec2::ZERO,
                acceleration: Vec2::new(0.0, -0.3),
            },
            raindrop_gravity_scale: 0.35,
            rain_spawn_radius: 3.0,
            rain_limit_factor: 4,
            raindrop_decay: 1.0,
            hazard: MotionProfile {
                terminal_velocity: Vec2::new(3.3, 4.0),
                friction: Vec2::new(1.0, 0.0),
                acceleration: Vec2::new(8.0, 12.0),
            },
            hazard_respawn_min: 0.5,
            hazard_respawn_max: 2.0,

            place_ground: Placement { height_factor: 0.3, vertical_offset: -2.5 },
            place_foreground: Placement { height_factor: 0.25, vertical_offset: -2.5 },
            place_item: Placement { height_factor: 1.0, vertical_offset: -2.2 },
            place_spawn: Placement { height_factor: 1.0, vertical_offset: -1.0 },
            place_goal: Placement { height_factor: 0.5, vertical_offset: -3.45 },
        }
    }
}

impl Tuning {
    /// Load overrides from a JSON file, falling back to defaults on any error.
    pub fn load(path: &Path) -> Self {
        match std::fs::read_to_string(path) {
            Ok(json) => match serde_json::from_str(&json) {
                Ok(tuning) => {
                    log::info!("Loaded tuning overrides from {}", path.display());
                    tuning
                }
                Err(err) => {
                    log::warn!("Ignoring malformed tuning file {}: {err}", path.display());
                    Self::default()
                }
            },
            Err(_) => Self::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_sane() {
        let t = Tuning::default();
        assert!(t.jump_time_min < t.jump_time_max);
        assert!(t.camera_zoom_min < t.camera_zoom_max);
        assert!(t.player_kinematic.acceleration.y < 0.0, "gravity points down");
        assert!(t.fatal_y > t.raindrop_despawn_y);
    }

    #[test]
    fn test_json_round_trip() {
        let t = Tuning::default();
        let json = serde_json::to_string(&t).unwrap();
        let back: Tuning = serde_json::from_str(&json).unwrap();
        assert_eq!(back, t);
    }
}
