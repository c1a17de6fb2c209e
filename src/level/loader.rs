//! Tilemap loader: raster image -> placed entities
//!
//! Pixels are scanned top-to-bottom, left-to-right and matched against the
//! [`ColorTable`]. A missing or corrupt image is fatal; an unrecognized pixel
//! color is a recoverable warning recorded on the level.

use std::fmt;
use std::path::Path;

use glam::Vec2;
use image::RgbaImage;

use super::colors::{ColorTable, TileKind};
use super::Level;
use crate::sim::entity::{CollectibleKind, DecorationKind, Entity};
use crate::tuning::{Placement, Tuning};

/// Fatal level-loading failure
#[derive(Debug)]
pub enum LevelError {
    /// The level asset could not be read or decoded
    Image(image::ImageError),
}

impl fmt::Display for LevelError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LevelError::Image(err) => write!(f, "failed to load level image: {err}"),
        }
    }
}

impl std::error::Error for LevelError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            LevelError::Image(err) => Some(err),
        }
    }
}

impl From<image::ImageError> for LevelError {
    fn from(err: image::ImageError) -> Self {
        LevelError::Image(err)
    }
}

/// A pixel the color table did not recognize; scanning continued past it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UnknownPixel {
    pub x: u32,
    pub y: u32,
    pub rgba: [u8; 4],
}

/// Load a level image from disk and scan it.
pub fn load(path: &Path, table: &ColorTable, tuning: &Tuning) -> Result<Level, LevelError> {
    let img = image::open(path)?.to_rgba8();
    let level = from_image(&img, table, tuning);
    log::debug!("Level '{}' loaded", path.display());
    Ok(level)
}

/// Scan an in-memory image into a level. Never fails: unknown pixels become
/// warnings and a missing spawn leaves `player` as `None`.
pub fn from_image(img: &RgbaImage, table: &ColorTable, tuning: &Tuning) -> Level {
    let (w, h) = img.dimensions();
    let mut level = Level::empty(w, h);

    for pixel_y in 0..h {
        // Run-length merging only looks at the immediately preceding pixel
        // on the same scanline.
        let mut prev_color: Option<[u8; 4]> = None;
        for pixel_x in 0..w {
            let rgba = img.get_pixel(pixel_x, pixel_y).0;
            // Height grows from bottom to top
            let base_height = (h - pixel_y) as f32;

            match table.kind_of(rgba) {
                Some(TileKind::Empty) => {}

                Some(TileKind::Ground) => {
                    if prev_color == Some(rgba) {
                        // Same color as the previous pixel: extend the run
                        if let Some(last) = level.ground.last_mut() {
                            last.set_ground_length(last.ground_length() + 1);
                        }
                    } else {
                        let id = level.alloc_id();
                        let mut ground = Entity::ground(id);
                        ground.pos = placed_at(pixel_x, base_height, ground.dim.y, &tuning.place_ground);
                        level.ground.push(ground);
                    }
                }

                Some(TileKind::Foreground) => {
                    let id = level.alloc_id();
                    let mut deco = Entity::decoration(id, DecorationKind::Foreground, Vec2::ONE);
                    deco.pos = placed_at(pixel_x, base_height, deco.dim.y, &tuning.place_foreground);
                    level.decorations.push(deco);
                }

                Some(TileKind::PlayerSpawn) => {
                    if level.player.is_some() {
                        log::warn!(
                            "Duplicate player spawn at x<{pixel_x}> y<{pixel_y}>; keeping the later one"
                        );
                    }
                    let id = level.alloc_id();
                    let mut player = Entity::player(id, tuning);
                    player.pos = placed_at(pixel_x, base_height, player.dim.y, &tuning.place_spawn);
                    level.player = Some(player);
                }

                Some(tile @ (TileKind::Coin | TileKind::Feather | TileKind::Star | TileKind::Raindrop)) => {
                    let kind = match tile {
                        TileKind::Coin => CollectibleKind::Coin,
                        TileKind::Feather => CollectibleKind::Feather,
                        TileKind::Star => CollectibleKind::Star,
                        _ => CollectibleKind::Raindrop,
                    };
                    if kind == CollectibleKind::Raindrop {
                        level.rain_pixel_count += 1;
                    }
                    let id = level.alloc_id();
                    let mut item = Entity::collectible(id, kind, tuning);
                    item.pos = placed_at(pixel_x, base_height, item.dim.y, &tuning.place_item);
                    level.collectibles.push(item);
                }

                Some(TileKind::Goal) => {
                    let id = level.alloc_id();
                    let mut goal = Entity::goal(id);
                    goal.pos = placed_at(pixel_x, base_height, goal.dim.y, &tuning.place_goal);
                    level.collectibles.push(goal);
                }

                None => {
                    let [r, g, b, a] = rgba;
                    log::warn!(
                        "Unknown tile at x<{pixel_x}> y<{pixel_y}>: r<{r}> g<{g}> b<{b}> a<{a}>"
                    );
                    level.warnings.push(UnknownPixel { x: pixel_x, y: pixel_y, rgba });
                }
            }

            prev_color = Some(rgba);
        }
    }

    add_backdrop(&mut level);

    let ground_top = level.highest_ground_top();
    level.hazard_spawn = Vec2::new(
        (w as f32 - 2.0).max(0.0),
        if ground_top.is_finite() { ground_top + 4.0 } else { 4.0 },
    );

    log::debug!(
        "Scanned {}x{} level: {} ground runs, {} collectibles, {} warnings",
        w,
        h,
        level.ground.len(),
        level.collectibles.len(),
        level.warnings.len()
    );
    level
}

fn placed_at(pixel_x: u32, base_height: f32, entity_height: f32, place: &Placement) -> Vec2 {
    Vec2::new(
        pixel_x as f32,
        base_height * entity_height * place.height_factor + place.vertical_offset,
    )
}

/// Fixed decorative entities sized to the level width: sky backdrop, two
/// pyramid parallax layers, a row of clouds, the sun and the water overlay.
fn add_backdrop(level: &mut Level) {
    let w = level.width as f32;

    let id = level.alloc_id();
    let mut backdrop = Entity::decoration(id, DecorationKind::Backdrop, Vec2::new(w * 2.0, 3.0));
    backdrop.origin.x = -backdrop.dim.x / 2.0;
    backdrop.pos = Vec2::new(-backdrop.origin.x, -6.5);
    level.decorations.push(backdrop);

    let id = level.alloc_id();
    let mut far = Entity::decoration(id, DecorationKind::PyramidFar, Vec2::new(2.375, 1.125));
    far.pos = Vec2::new(far.dim.x * 2.0, -1.2);
    level.decorations.push(far);

    let id = level.alloc_id();
    let mut near = Entity::decoration(id, DecorationKind::PyramidNear, Vec2::new(2.375, 1.125));
    near.pos = Vec2::new(-1.0, -0.6);
    level.decorations.push(near);

    // One cloud every five units, staggered heights
    let stagger = [0.0, 0.5, -0.4, 0.7, -0.6];
    let cloud_count = (w / 5.0) as usize;
    for i in 0..cloud_count {
        let id = level.alloc_id();
        let mut cloud = Entity::decoration(id, DecorationKind::Cloud, Vec2::new(3.0, 1.5));
        cloud.pos = Vec2::new(i as f32 * 5.0, 3.0 + stagger[i % stagger.len()]);
        level.decorations.push(cloud);
    }

    let id = level.alloc_id();
    let mut sun = Entity::decoration(id, DecorationKind::Sun, Vec2::new(1.6, 1.6));
    sun.pos = Vec2::new(-4.0, 3.5);
    level.decorations.push(sun);

    let id = level.alloc_id();
    let mut water = Entity::decoration(id, DecorationKind::WaterOverlay, Vec2::new(w * 10.0, 3.0));
    water.origin.x = -water.dim.x / 2.0;
    water.pos = Vec2::new(0.0, -3.75);
    level.decorations.push(water);
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    const BLACK: Rgba<u8> = Rgba([0, 0, 0, 255]);
    const GREEN: Rgba<u8> = Rgba([0, 255, 0, 255]);
    const WHITE: Rgba<u8> = Rgba([255, 255, 255, 255]);
    const YELLOW: Rgba<u8> = Rgba([255, 255, 0, 255]);

    fn blank(w: u32, h: u32) -> RgbaImage {
        RgbaImage::from_pixel(w, h, BLACK)
    }

    #[test]
    fn test_single_spawn_pixel_yields_only_a_player() {
        let mut img = blank(8, 8);
        img.put_pixel(3, 7, WHITE);

        let level = from_image(&img, &ColorTable::v1(), &Tuning::default());
        let player = level.player.expect("spawn pixel creates the player");
        assert_eq!(player.pos.x, 3.0);
        assert!(level.ground.is_empty());
        assert!(level.collectibles.is_empty());
        assert!(level.warnings.is_empty());
    }

    #[test]
    fn test_adjacent_ground_pixels_merge_into_one_run() {
        let mut img = blank(8, 4);
        img.put_pixel(2, 3, GREEN);
        img.put_pixel(3, 3, GREEN);

        let level = from_image(&img, &ColorTable::v1(), &Tuning::default());
        assert_eq!(level.ground.len(), 1, "two adjacent pixels are one entity");
        assert_eq!(level.ground[0].ground_length(), 2);
    }

    #[test]
    fn test_gap_breaks_the_run() {
        let mut img = blank(8, 4);
        img.put_pixel(1, 3, GREEN);
        img.put_pixel(3, 3, GREEN);

        let level = from_image(&img, &ColorTable::v1(), &Tuning::default());
        assert_eq!(level.ground.len(), 2);
    }

    #[test]
    fn test_runs_do_not_continue_across_scanlines() {
        let mut img = blank(4, 4);
        img.put_pixel(3, 1, GREEN);
        img.put_pixel(0, 2, GREEN);

        let level = from_image(&img, &ColorTable::v1(), &Tuning::default());
        assert_eq!(level.ground.len(), 2);
    }

    #[test]
    fn test_later_spawn_pixel_wins() {
        let mut img = blank(8, 4);
        img.put_pixel(1, 2, WHITE);
        img.put_pixel(6, 2, WHITE);

        let level = from_image(&img, &ColorTable::v1(), &Tuning::default());
        assert_eq!(level.player.unwrap().pos.x, 6.0);
    }

    #[test]
    fn test_unknown_color_is_recorded_and_scan_continues() {
        let mut img = blank(8, 4);
        img.put_pixel(0, 0, Rgba([13, 37, 200, 255]));
        img.put_pixel(4, 3, GREEN);

        let level = from_image(&img, &ColorTable::v1(), &Tuning::default());
        assert_eq!(level.warnings.len(), 1);
        assert_eq!(level.warnings[0], UnknownPixel { x: 0, y: 0, rgba: [13, 37, 200, 255] });
        assert_eq!(level.ground.len(), 1, "later pixels still load");
    }

    #[test]
    fn test_backdrop_decorations_are_added() {
        let img = blank(20, 8);
        let level = from_image(&img, &ColorTable::v1(), &Tuning::default());

        use crate::sim::entity::{DecorationKind::*, EntityKind};
        let count = |kind| {
            level
                .decorations
                .iter()
                .filter(|d| matches!(d.kind, EntityKind::Decoration(k) if k == kind))
                .count()
        };
        assert_eq!(count(Backdrop), 1);
        assert_eq!(count(PyramidNear), 1);
        assert_eq!(count(PyramidFar), 1);
        assert_eq!(count(Sun), 1);
        assert_eq!(count(WaterOverlay), 1);
        assert_eq!(count(Cloud), 4, "one cloud per five units of width");
    }

    #[test]
    fn test_raindrop_pixels_are_counted_for_the_cap() {
        let mut img = blank(8, 4);
        img.put_pixel(1, 1, YELLOW);
        img.put_pixel(5, 1, YELLOW);

        let level = from_image(&img, &ColorTable::v2(), &Tuning::default());
        assert_eq!(level.rain_pixel_count, 2);
        assert_eq!(level.collectibles.len(), 2);
    }

    #[test]
    fn test_missing_file_is_fatal() {
        let err = load(
            Path::new("levels/does-not-exist.png"),
            &ColorTable::v1(),
            &Tuning::default(),
        )
        .unwrap_err();
        assert!(matches!(err, LevelError::Image(_)));
    }
}
