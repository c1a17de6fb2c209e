//! Level data: typed entity collections parsed from a color-coded image
//!
//! The level exclusively owns every non-player entity; the player sits in its
//! own slot so frame logic can borrow it alongside the collections it tests
//! against. Camera and render code refer to entities by id, never by pointer.

pub mod colors;
pub mod loader;

pub use colors::{ColorTable, TileKind};
pub use loader::{LevelError, UnknownPixel};

use glam::Vec2;

use crate::sim::entity::{Entity, EntityId, EntityKind};

/// A loaded level: entity collections plus the scan metadata the sim needs.
#[derive(Debug, Clone)]
pub struct Level {
    /// Level bounds in world units (1 pixel column = 1 unit along x)
    pub width: u32,
    pub height: u32,
    pub ground: Vec<Entity>,
    pub collectibles: Vec<Entity>,
    pub hazards: Vec<Entity>,
    pub decorations: Vec<Entity>,
    /// None until a spawn pixel was found
    pub player: Option<Entity>,
    /// Where runtime-spawned hazards enter the world
    pub hazard_spawn: Vec2,
    /// Raindrop pixels seen during the scan; caps the live-rain count
    pub rain_pixel_count: u32,
    /// Unrecognized pixels recorded during the scan
    pub warnings: Vec<UnknownPixel>,
    next_id: EntityId,
}

impl Level {
    pub(crate) fn empty(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            ground: Vec::new(),
            collectibles: Vec::new(),
            hazards: Vec::new(),
            decorations: Vec::new(),
            player: None,
            hazard_spawn: Vec2::ZERO,
            rain_pixel_count: 0,
            warnings: Vec::new(),
            next_id: 1,
        }
    }

    /// Allocate the next entity id (deterministic: scan order, then spawn
    /// order).
    pub fn alloc_id(&mut self) -> EntityId {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    /// Top of the tallest ground run, in world units. Weather spawns above
    /// this.
    pub fn highest_ground_top(&self) -> f32 {
        self.ground
            .iter()
            .map(|g| g.pos.y + g.bounds.y + g.bounds.h)
            .fold(f32::NEG_INFINITY, f32::max)
    }

    /// Look up any live entity, the player included.
    pub fn entity(&self, id: EntityId) -> Option<&Entity> {
        if let Some(p) = &self.player {
            if p.id == id {
                return Some(p);
            }
        }
        self.ground
            .iter()
            .chain(&self.collectibles)
            .chain(&self.hazards)
            .chain(&self.decorations)
            .find(|e| e.id == id)
    }

    pub fn entity_mut(&mut self, id: EntityId) -> Option<&mut Entity> {
        if let Some(p) = &mut self.player {
            if p.id == id {
                return Some(p);
            }
        }
        self.ground
            .iter_mut()
            .chain(&mut self.collectibles)
            .chain(&mut self.hazards)
            .chain(&mut self.decorations)
            .find(|e| e.id == id)
    }

    /// Detach an entity from its owning collection. Returns `None` if the id
    /// is already gone (double removal is a guarded no-op, not an error).
    /// The player and decorations are never removed.
    pub fn remove(&mut self, id: EntityId) -> Option<Entity> {
        for list in [&mut self.ground, &mut self.collectibles, &mut self.hazards] {
            if let Some(idx) = list.iter().position(|e| e.id == id) {
                return Some(list.remove(idx));
            }
        }
        None
    }

    /// Forget solver handles, e.g. before re-registering a respawned level.
    pub fn clear_bodies(&mut self) {
        if let Some(p) = &mut self.player {
            p.body = None;
        }
        for e in self
            .ground
            .iter_mut()
            .chain(&mut self.collectibles)
            .chain(&mut self.hazards)
        {
            e.body = None;
        }
    }

    /// Scroll the far-background decorations with the camera so they appear
    /// infinitely distant.
    pub fn update_parallax(&mut self, cam_pos: Vec2) {
        for deco in &mut self.decorations {
            if let EntityKind::Decoration(kind) = deco.kind {
                use crate::sim::entity::DecorationKind::*;
                match kind {
                    PyramidNear | PyramidFar => deco.pos.x = cam_pos.x,
                    Sun => deco.pos.x = cam_pos.x - 4.0,
                    _ => {}
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tuning::Tuning;

    #[test]
    fn test_remove_is_idempotent() {
        let tuning = Tuning::default();
        let mut level = Level::empty(4, 4);
        let id = level.alloc_id();
        level
            .collectibles
            .push(Entity::collectible(id, crate::sim::entity::CollectibleKind::Coin, &tuning));

        assert!(level.remove(id).is_some());
        assert!(level.remove(id).is_none(), "second removal is a no-op");
        assert!(level.entity(id).is_none());
    }

    #[test]
    fn test_entity_lookup_covers_player() {
        let tuning = Tuning::default();
        let mut level = Level::empty(4, 4);
        let pid = level.alloc_id();
        level.player = Some(Entity::player(pid, &tuning));
        assert!(level.entity(pid).is_some());
        assert!(level.entity_mut(pid).is_some());
    }

    #[test]
    fn test_highest_ground_top() {
        let mut level = Level::empty(8, 8);
        for y in [0.0_f32, 2.0, -1.0] {
            let id = level.alloc_id();
            let mut g = Entity::ground(id);
            g.pos.y = y;
            level.ground.push(g);
        }
        // bounds height is 0.75 for unit ground tiles
        assert!((level.highest_ground_top() - 2.75).abs() < 1e-5);
    }
}
