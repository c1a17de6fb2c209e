//! Camera follow controller
//!
//! Smoothly tracks a target entity without owning it: the controller holds
//! an id, the caller resolves the position each frame. Zoom is clamped on
//! every mutation and never smoothed.

use glam::Vec2;

use super::entity::EntityId;
use crate::tuning::Tuning;

#[derive(Debug, Clone)]
pub struct CameraController {
    position: Vec2,
    zoom: f32,
    target: Option<EntityId>,
    follow_speed: f32,
    floor_y: f32,
    zoom_min: f32,
    zoom_max: f32,
}

impl CameraController {
    pub fn new(tuning: &Tuning) -> Self {
        Self {
            position: Vec2::ZERO,
            zoom: 1.0,
            target: None,
            follow_speed: tuning.camera_follow_speed,
            floor_y: tuning.camera_floor_y,
            zoom_min: tuning.camera_zoom_min,
            zoom_max: tuning.camera_zoom_max,
        }
    }

    /// Blend toward the target position (already offset by the target's
    /// horizontal origin). The blend rate scales with `dt` so response time
    /// is frame-rate independent to first order; the result never drops
    /// below the floor.
    pub fn update(&mut self, target_pos: Option<Vec2>, dt: f32) {
        if self.target.is_none() {
            return;
        }
        let Some(desired) = target_pos else {
            return;
        };
        self.position = self
            .position
            .lerp(desired, (self.follow_speed * dt).clamp(0.0, 1.0));
        self.position.y = self.position.y.max(self.floor_y);
    }

    pub fn position(&self) -> Vec2 {
        self.position
    }

    pub fn set_position(&mut self, x: f32, y: f32) {
        self.position = Vec2::new(x, y);
    }

    pub fn zoom(&self) -> f32 {
        self.zoom
    }

    pub fn set_zoom(&mut self, zoom: f32) {
        self.zoom = zoom.clamp(self.zoom_min, self.zoom_max);
    }

    pub fn add_zoom(&mut self, amount: f32) {
        self.set_zoom(self.zoom + amount);
    }

    pub fn set_target(&mut self, target: Option<EntityId>) {
        self.target = target;
    }

    pub fn target(&self) -> Option<EntityId> {
        self.target
    }

    pub fn has_target(&self) -> bool {
        self.target.is_some()
    }
}
