//! Fixed tile color table
//!
//! Level images encode entity placement as exact 32-bit RGBA values. The
//! table is built once per load and consulted per pixel; it never changes at
//! runtime.
//!
//! Two level-format versions exist because historical levels reuse the same
//! colors with different meanings (yellow was a coin before it meant rain,
//! magenta a feather before it meant a star). The caller picks the version
//! explicitly; the loader never tries to guess it from the image.

/// What a matched pixel places in the level
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TileKind {
    Empty,
    Foreground,
    Ground,
    PlayerSpawn,
    Coin,
    Feather,
    Star,
    Raindrop,
    Goal,
}

impl TileKind {
    /// Run-length kinds merge with an identical immediately preceding pixel
    /// on the same scanline instead of creating a new entity.
    pub fn is_run_length(self) -> bool {
        matches!(self, TileKind::Ground)
    }
}

/// Immutable bijective RGBA -> [`TileKind`] mapping
#[derive(Debug, Clone)]
pub struct ColorTable {
    entries: Vec<([u8; 4], TileKind)>,
}

impl ColorTable {
    /// Version 1 ("classic"): fixed collectibles and a goal post.
    ///
    /// black=empty, red=foreground, green=ground, white=spawn,
    /// magenta=feather, yellow=coin, blue=goal.
    pub fn v1() -> Self {
        Self {
            entries: vec![
                ([0, 0, 0, 255], TileKind::Empty),
                ([255, 0, 0, 255], TileKind::Foreground),
                ([0, 255, 0, 255], TileKind::Ground),
                ([255, 255, 255, 255], TileKind::PlayerSpawn),
                ([255, 0, 255, 255], TileKind::Feather),
                ([255, 255, 0, 255], TileKind::Coin),
                ([0, 0, 255, 255], TileKind::Goal),
            ],
        }
    }

    /// Version 2 ("desert"): weather collectibles for rigid-body levels.
    ///
    /// black=empty, red=foreground, green=ground, white=spawn,
    /// magenta=star, yellow=raindrop.
    pub fn v2() -> Self {
        Self {
            entries: vec![
                ([0, 0, 0, 255], TileKind::Empty),
                ([255, 0, 0, 255], TileKind::Foreground),
                ([0, 255, 0, 255], TileKind::Ground),
                ([255, 255, 255, 255], TileKind::PlayerSpawn),
                ([255, 0, 255, 255], TileKind::Star),
                ([255, 255, 0, 255], TileKind::Raindrop),
            ],
        }
    }

    /// Exact-match lookup; `None` means an unrecognized color (a recoverable
    /// decode warning, not an error).
    pub fn kind_of(&self, rgba: [u8; 4]) -> Option<TileKind> {
        self.entries
            .iter()
            .find(|(color, _)| *color == rgba)
            .map(|&(_, kind)| kind)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_v1_lookup() {
        let table = ColorTable::v1();
        assert_eq!(table.kind_of([0, 0, 0, 255]), Some(TileKind::Empty));
        assert_eq!(table.kind_of([0, 255, 0, 255]), Some(TileKind::Ground));
        assert_eq!(table.kind_of([255, 255, 0, 255]), Some(TileKind::Coin));
        assert_eq!(table.kind_of([255, 0, 255, 255]), Some(TileKind::Feather));
        assert_eq!(table.kind_of([0, 0, 255, 255]), Some(TileKind::Goal));
    }

    #[test]
    fn test_v2_reuses_colors_with_new_meanings() {
        let table = ColorTable::v2();
        assert_eq!(table.kind_of([255, 255, 0, 255]), Some(TileKind::Raindrop));
        assert_eq!(table.kind_of([255, 0, 255, 255]), Some(TileKind::Star));
        assert_eq!(table.kind_of([0, 0, 255, 255]), None, "v2 has no goal color");
    }

    #[test]
    fn test_unknown_color_is_none() {
        let table = ColorTable::v1();
        assert_eq!(table.kind_of([12, 34, 56, 255]), None);
        // Alpha is part of the key: a translucent ground pixel is unknown
        assert_eq!(table.kind_of([0, 255, 0, 128]), None);
    }

    #[test]
    fn test_tables_are_bijective() {
        for table in [ColorTable::v1(), ColorTable::v2()] {
            for (i, (color_a, kind_a)) in table.entries.iter().enumerate() {
                for (color_b, kind_b) in table.entries.iter().skip(i + 1) {
                    assert_ne!(color_a, color_b);
                    assert_ne!(kind_a, kind_b);
                }
            }
        }
    }
}
