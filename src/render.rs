//! Render sink: per-frame draw snapshots for an external renderer
//!
//! The core never draws. Once per frame the shell asks for a draw list and
//! blits it however it likes; everything a drawer needs (position, pivot,
//! size, scale, rotation, tint, flip) is captured by value, so the renderer
//! holds no references into the simulation.

use glam::Vec2;

use crate::settings::Settings;
use crate::sim::entity::{
    CollectibleKind, DecorationKind, Entity, EntityKind, ViewDirection,
};
use crate::sim::state::GameState;

/// Which texture the external drawer should select
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpriteId {
    Player,
    Ground,
    Foreground,
    Coin,
    Feather,
    Star,
    Raindrop,
    Scuttler,
    Goal,
    Backdrop,
    PyramidNear,
    PyramidFar,
    Cloud,
    Sun,
    WaterOverlay,
}

/// One blit, fully self-contained.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpriteInstance {
    pub sprite: SpriteId,
    pub pos: Vec2,
    pub origin: Vec2,
    pub dim: Vec2,
    pub scale: Vec2,
    pub rotation: f32,
    pub tint: [f32; 4],
    pub flip_x: bool,
}

const WHITE: [f32; 4] = [1.0, 1.0, 1.0, 1.0];
/// Golden overlay while the flight power-up is active
const FEATHER_TINT: [f32; 4] = [1.0, 0.8, 0.0, 1.0];

fn instance(e: &Entity, sprite: SpriteId) -> SpriteInstance {
    SpriteInstance {
        sprite,
        pos: e.pos,
        origin: e.origin,
        dim: e.dim,
        scale: e.scale,
        rotation: e.rotation,
        tint: WHITE,
        flip_x: false,
    }
}

/// Assemble the frame's draw list, back to front: backdrop, far parallax,
/// player, ground, foreground tiles, items, hazards, then the water overlay
/// and clouds in front of everything.
pub fn draw_list(state: &GameState, settings: &Settings) -> Vec<SpriteInstance> {
    let level = &state.level;
    let mut out = Vec::new();

    let deco = |out: &mut Vec<SpriteInstance>, want: DecorationKind, sprite: SpriteId| {
        for d in &level.decorations {
            if matches!(d.kind, EntityKind::Decoration(k) if k == want) {
                out.push(instance(d, sprite));
            }
        }
    };

    deco(&mut out, DecorationKind::Backdrop, SpriteId::Backdrop);
    deco(&mut out, DecorationKind::PyramidFar, SpriteId::PyramidFar);
    deco(&mut out, DecorationKind::PyramidNear, SpriteId::PyramidNear);
    deco(&mut out, DecorationKind::Sun, SpriteId::Sun);

    if let Some(player) = &level.player {
        let mut inst = instance(player, SpriteId::Player);
        if let Some(ps) = player.player_state() {
            inst.flip_x = ps.view_direction == ViewDirection::Left;
            inst.tint = if ps.flight_active() {
                FEATHER_TINT
            } else if ps.has_star {
                WHITE
            } else {
                settings.character_skin().tint()
            };
        }
        out.push(inst);
    }

    for ground in &level.ground {
        let mut inst = instance(ground, SpriteId::Ground);
        // The drawer tiles the segment; report the stretched size
        inst.dim.x = ground.dim.x * ground.ground_length() as f32;
        out.push(inst);
    }

    deco(&mut out, DecorationKind::Foreground, SpriteId::Foreground);

    for item in &level.collectibles {
        match &item.kind {
            EntityKind::Collectible(cs) => {
                if cs.collected {
                    continue;
                }
                let sprite = match cs.kind {
                    CollectibleKind::Coin => SpriteId::Coin,
                    CollectibleKind::Feather => SpriteId::Feather,
                    CollectibleKind::Star => SpriteId::Star,
                    CollectibleKind::Raindrop => SpriteId::Raindrop,
                };
                out.push(instance(item, sprite));
            }
            EntityKind::Goal => out.push(instance(item, SpriteId::Goal)),
            _ => {}
        }
    }

    for hazard in &level.hazards {
        out.push(instance(hazard, SpriteId::Scuttler));
    }

    deco(&mut out, DecorationKind::WaterOverlay, SpriteId::WaterOverlay);
    deco(&mut out, DecorationKind::Cloud, SpriteId::Cloud);

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::level::{loader, ColorTable};
    use crate::sim::state::PhysicsMode;
    use crate::tuning::Tuning;
    use image::{Rgba, RgbaImage};

    fn demo_state() -> GameState {
        let mut img = RgbaImage::from_pixel(10, 4, Rgba([0, 0, 0, 255]));
        img.put_pixel(0, 3, Rgba([0, 255, 0, 255]));
        img.put_pixel(1, 3, Rgba([0, 255, 0, 255]));
        img.put_pixel(0, 2, Rgba([255, 255, 255, 255]));
        img.put_pixel(4, 2, Rgba([255, 255, 0, 255]));
        let level = loader::from_image(&img, &ColorTable::v1(), &Tuning::default());
        GameState::new(level, PhysicsMode::Kinematic, Tuning::default(), 1)
    }

    #[test]
    fn test_draw_list_contains_world_and_backdrop() {
        let state = demo_state();
        let list = draw_list(&state, &Settings::default());

        let count = |id: SpriteId| list.iter().filter(|s| s.sprite == id).count();
        assert_eq!(count(SpriteId::Player), 1);
        assert_eq!(count(SpriteId::Ground), 1);
        assert_eq!(count(SpriteId::Coin), 1);
        assert_eq!(count(SpriteId::Backdrop), 1);
        assert_eq!(count(SpriteId::WaterOverlay), 1);
        assert!(count(SpriteId::Cloud) > 0);
    }

    #[test]
    fn test_ground_reports_stretched_size() {
        let state = demo_state();
        let list = draw_list(&state, &Settings::default());
        let ground = list.iter().find(|s| s.sprite == SpriteId::Ground).unwrap();
        assert!((ground.dim.x - 2.0 * 1.01).abs() < 1e-5);
    }

    #[test]
    fn test_collected_items_are_absent() {
        let mut state = demo_state();
        let coin_id = state.level.collectibles[0].id;
        if let Some(cs) = state
            .level
            .entity_mut(coin_id)
            .and_then(|e| e.collectible_state_mut())
        {
            cs.collected = true;
        }
        let list = draw_list(&state, &Settings::default());
        assert!(list.iter().all(|s| s.sprite != SpriteId::Coin));
    }

    #[test]
    fn test_flight_overrides_the_skin_tint() {
        let mut state = demo_state();
        let settings = Settings::default();
        {
            let ps = state
                .level
                .player
                .as_mut()
                .unwrap()
                .player_state_mut()
                .unwrap();
            ps.has_feather = true;
            ps.feather_time_left = 3.0;
        }
        let list = draw_list(&state, &settings);
        let player = list.iter().find(|s| s.sprite == SpriteId::Player).unwrap();
        assert_eq!(player.tint, FEATHER_TINT);
    }

    #[test]
    fn test_backdrop_draws_behind_the_player() {
        let state = demo_state();
        let list = draw_list(&state, &Settings::default());
        let backdrop_idx = list.iter().position(|s| s.sprite == SpriteId::Backdrop).unwrap();
        let player_idx = list.iter().position(|s| s.sprite == SpriteId::Player).unwrap();
        let cloud_idx = list.iter().position(|s| s.sprite == SpriteId::Cloud).unwrap();
        assert!(backdrop_idx < player_idx);
        assert!(player_idx < cloud_idx, "clouds drift in front");
    }
}
