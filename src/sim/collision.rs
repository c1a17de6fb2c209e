//! Collision detection and contact classification
//!
//! Two detection styles feed the same resolution rules: axis-aligned overlap
//! tests for manually integrated entities, and solver contact pairs for
//! rigid-body levels. Classification is symmetric - which side of a pair an
//! entity arrives on never changes the outcome.

use super::entity::{CollectibleKind, Entity, EntityId, EntityKind, JumpPhase, Rect};
use crate::level::Level;

/// A classified contact, normalized so each role is named explicitly.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContactClass {
    PlayerGround { player: EntityId, ground: EntityId },
    PlayerCollectible { player: EntityId, item: EntityId },
    PlayerGoal { player: EntityId, goal: EntityId },
    /// The solver already pushes the two apart; the sim itself does nothing.
    PlayerHazard { player: EntityId, hazard: EntityId },
    /// The scuttler eats the drop: the drop is removed, no score changes.
    HazardRaindrop { hazard: EntityId, raindrop: EntityId },
}

/// Classify a contact between two live entities. Returns `None` for pairs
/// with no resolution rule, and for ids that no longer resolve to an entity
/// (e.g. removed earlier this frame) - such contacts must be ignored, never
/// dereferenced.
pub fn classify(level: &Level, a: EntityId, b: EntityId) -> Option<ContactClass> {
    let ea = level.entity(a)?;
    let eb = level.entity(b)?;
    ordered_class(ea, eb).or_else(|| ordered_class(eb, ea))
}

fn ordered_class(x: &Entity, y: &Entity) -> Option<ContactClass> {
    match (&x.kind, &y.kind) {
        (EntityKind::Player(_), EntityKind::Ground { .. }) => Some(ContactClass::PlayerGround {
            player: x.id,
            ground: y.id,
        }),
        (EntityKind::Player(_), EntityKind::Collectible(_)) => {
            Some(ContactClass::PlayerCollectible { player: x.id, item: y.id })
        }
        (EntityKind::Player(_), EntityKind::Goal) => {
            Some(ContactClass::PlayerGoal { player: x.id, goal: y.id })
        }
        (EntityKind::Player(_), EntityKind::Hazard) => {
            Some(ContactClass::PlayerHazard { player: x.id, hazard: y.id })
        }
        (EntityKind::Hazard, EntityKind::Collectible(c)) if c.kind == CollectibleKind::Raindrop => {
            Some(ContactClass::HazardRaindrop { hazard: x.id, raindrop: y.id })
        }
        _ => None,
    }
}

/// World-space overlap between two entities' bounding boxes.
pub fn entities_overlap(a: &Entity, b: &Entity) -> bool {
    a.aabb().overlaps(&b.aabb())
}

/// Resolve a player/ground overlap in the manual-integration world.
///
/// If the player's feet are clearly away from the block's top this is a side
/// hit: push the player out horizontally, choosing the side by comparing
/// centers. Otherwise snap onto the top; Falling and JumpFalling become
/// Grounded, while JumpRising keeps its phase so ascending against a ledge
/// does not cancel the jump.
pub fn resolve_player_on_ground(player: &mut Entity, ground: &Entity, edge_threshold: f32) {
    let ground_rect: Rect = ground.aabb();
    let ground_top = ground_rect.y + ground_rect.h;
    let feet = player.pos.y + player.bounds.y;

    if (feet - ground_top).abs() > edge_threshold {
        let hit_right_edge = player.center().x > ground_rect.x + ground_rect.w / 2.0;
        if hit_right_edge {
            player.pos.x = ground_rect.x + ground_rect.w - player.bounds.x;
        } else {
            player.pos.x = ground_rect.x - player.bounds.x - player.bounds.w;
        }
        return;
    }

    let snap_y = ground_top - player.bounds.y;
    let Some(phase) = player.player_state().map(|s| s.jump_phase) else {
        return;
    };
    match phase {
        JumpPhase::Grounded => {}
        JumpPhase::Falling | JumpPhase::JumpFalling => {
            player.pos.y = snap_y;
            if let Some(state) = player.player_state_mut() {
                state.jump_phase = JumpPhase::Grounded;
            }
        }
        JumpPhase::JumpRising => {
            player.pos.y = snap_y;
        }
    }
}
