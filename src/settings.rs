//! Player preferences
//!
//! Persisted separately from high scores as a small JSON file. The sim only
//! ever reads the selected character skin tint; audio toggles and volumes
//! are consumed by the shell's audio collaborator.

use std::path::Path;

use serde::{Deserialize, Serialize};

/// Selectable player tints
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum CharacterSkin {
    #[default]
    Default,
    Yellow,
    Red,
}

impl CharacterSkin {
    pub const COUNT: usize = 3;

    pub fn from_index(index: usize) -> Self {
        match index {
            1 => CharacterSkin::Yellow,
            2 => CharacterSkin::Red,
            _ => CharacterSkin::Default,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            CharacterSkin::Default => "Default",
            CharacterSkin::Yellow => "Yellow",
            CharacterSkin::Red => "Red",
        }
    }

    /// RGBA multiplier applied to the player sprite
    pub fn tint(&self) -> [f32; 4] {
        match self {
            CharacterSkin::Default => [0.6, 0.6, 0.6, 1.0],
            CharacterSkin::Yellow => [0.8, 0.4, 0.8, 1.0],
            CharacterSkin::Red => [1.0, 0.4, 0.4, 1.0],
        }
    }
}

/// Game settings/preferences
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    /// Sound effects on/off
    pub sound: bool,
    /// Music on/off
    pub music: bool,
    /// Sound effects volume (0.0 - 1.0)
    pub vol_sound: f32,
    /// Music volume (0.0 - 1.0)
    pub vol_music: f32,
    /// Selected character skin index
    pub char_skin: usize,
    /// Show the FPS counter
    pub show_fps_counter: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            sound: true,
            music: true,
            vol_sound: 0.5,
            vol_music: 0.5,
            char_skin: 0,
            show_fps_counter: false,
        }
    }
}

impl Settings {
    pub fn character_skin(&self) -> CharacterSkin {
        CharacterSkin::from_index(self.char_skin)
    }

    /// Load from a JSON file, clamping out-of-range values. Any problem
    /// falls back to defaults.
    pub fn load(path: &Path) -> Self {
        let mut settings: Settings = match std::fs::read_to_string(path) {
            Ok(json) => match serde_json::from_str(&json) {
                Ok(s) => s,
                Err(err) => {
                    log::warn!("Malformed settings file {}: {err}", path.display());
                    return Self::default();
                }
            },
            Err(_) => {
                log::info!("Using default settings");
                return Self::default();
            }
        };
        settings.vol_sound = settings.vol_sound.clamp(0.0, 1.0);
        settings.vol_music = settings.vol_music.clamp(0.0, 1.0);
        settings.char_skin = settings.char_skin.min(CharacterSkin::COUNT - 1);
        log::info!("Loaded settings from {}", path.display());
        settings
    }

    /// Save as JSON; failures are logged, never fatal.
    pub fn save(&self, path: &Path) {
        match serde_json::to_string_pretty(self) {
            Ok(json) => {
                if let Err(err) = std::fs::write(path, json) {
                    log::warn!("Could not save settings to {}: {err}", path.display());
                } else {
                    log::info!("Settings saved");
                }
            }
            Err(err) => log::warn!("Could not serialize settings: {err}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_save_load_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");

        let mut settings = Settings::default();
        settings.sound = false;
        settings.vol_music = 0.25;
        settings.char_skin = 2;
        settings.save(&path);

        let loaded = Settings::load(&path);
        assert_eq!(loaded, settings);
        assert_eq!(loaded.character_skin(), CharacterSkin::Red);
    }

    #[test]
    fn test_load_clamps_out_of_range_values() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        std::fs::write(
            &path,
            r#"{"sound":true,"music":true,"vol_sound":7.5,"vol_music":-1.0,"char_skin":99,"show_fps_counter":false}"#,
        )
        .unwrap();

        let loaded = Settings::load(&path);
        assert_eq!(loaded.vol_sound, 1.0);
        assert_eq!(loaded.vol_music, 0.0);
        assert_eq!(loaded.char_skin, CharacterSkin::COUNT - 1);
    }

    #[test]
    fn test_missing_file_gives_defaults() {
        let loaded = Settings::load(Path::new("no/such/settings.json"));
        assert_eq!(loaded, Settings::default());
    }

    #[test]
    fn test_skin_index_round_trip() {
        for i in 0..CharacterSkin::COUNT {
            assert_eq!(CharacterSkin::from_index(i).tint().len(), 4);
        }
        assert_eq!(CharacterSkin::from_index(42), CharacterSkin::Default);
    }
}
