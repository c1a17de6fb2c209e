//! High score leaderboard
//!
//! Tracks the top 10 final scores with JSON persistence. The sim only emits
//! a final score on game over; the shell decides when to record it. The
//! timestamp is supplied by the caller so the library stays clock-free.

use std::path::Path;

use serde::{Deserialize, Serialize};

/// Maximum number of high scores to keep
pub const MAX_HIGH_SCORES: usize = 10;

/// A single high score entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HighScoreEntry {
    /// Final score of the run
    pub score: i32,
    /// Level index the run ended on
    pub level: usize,
    /// Unix timestamp (seconds) when achieved
    pub timestamp: u64,
}

/// High score leaderboard, sorted descending by score.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct HighScores {
    pub entries: Vec<HighScoreEntry>,
}

impl HighScores {
    pub fn new() -> Self {
        Self { entries: Vec::new() }
    }

    /// Check if a score qualifies for the leaderboard.
    pub fn qualifies(&self, score: i32) -> bool {
        if score <= 0 {
            return false;
        }
        if self.entries.len() < MAX_HIGH_SCORES {
            return true;
        }
        self.entries.last().map(|e| score > e.score).unwrap_or(true)
    }

    /// Add a score if it qualifies. Returns the 1-indexed rank achieved.
    pub fn add_score(&mut self, score: i32, level: usize, timestamp: u64) -> Option<usize> {
        if !self.qualifies(score) {
            return None;
        }

        let entry = HighScoreEntry { score, level, timestamp };
        let pos = self.entries.iter().position(|e| score > e.score);
        let rank = match pos {
            Some(i) => {
                self.entries.insert(i, entry);
                i + 1
            }
            None => {
                self.entries.push(entry);
                self.entries.len()
            }
        };
        self.entries.truncate(MAX_HIGH_SCORES);
        Some(rank)
    }

    pub fn top_score(&self) -> Option<i32> {
        self.entries.first().map(|e| e.score)
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Load the leaderboard from a JSON file; missing or malformed files
    /// start a fresh board.
    pub fn load(path: &Path) -> Self {
        match std::fs::read_to_string(path) {
            Ok(json) => match serde_json::from_str::<HighScores>(&json) {
                Ok(scores) => {
                    log::info!("Loaded {} high scores", scores.entries.len());
                    scores
                }
                Err(err) => {
                    log::warn!("Malformed high score file {}: {err}", path.display());
                    Self::new()
                }
            },
            Err(_) => {
                log::info!("No high scores found, starting fresh");
                Self::new()
            }
        }
    }

    /// Save as JSON; failures are logged, never fatal.
    pub fn save(&self, path: &Path) {
        match serde_json::to_string_pretty(self) {
            Ok(json) => {
                if let Err(err) = std::fs::write(path, json) {
                    log::warn!("Could not save high scores to {}: {err}", path.display());
                } else {
                    log::info!("High scores saved ({} entries)", self.entries.len());
                }
            }
            Err(err) => log::warn!("Could not serialize high scores: {err}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scores_stay_sorted_and_ranked() {
        let mut scores = HighScores::new();
        assert_eq!(scores.add_score(100, 1, 10), Some(1));
        assert_eq!(scores.add_score(300, 1, 20), Some(1));
        assert_eq!(scores.add_score(200, 2, 30), Some(2));

        let values: Vec<i32> = scores.entries.iter().map(|e| e.score).collect();
        assert_eq!(values, vec![300, 200, 100]);
    }

    #[test]
    fn test_zero_scores_never_qualify() {
        let mut scores = HighScores::new();
        assert!(!scores.qualifies(0));
        assert_eq!(scores.add_score(0, 1, 10), None);
    }

    #[test]
    fn test_board_is_capped() {
        let mut scores = HighScores::new();
        for i in 1..=15 {
            scores.add_score(i * 10, 1, i as u64);
        }
        assert_eq!(scores.entries.len(), MAX_HIGH_SCORES);
        assert_eq!(scores.top_score(), Some(150));
        assert!(!scores.qualifies(50), "below the lowest surviving entry");
        assert!(scores.qualifies(65));
    }

    #[test]
    fn test_save_load_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("highscores.json");

        let mut scores = HighScores::new();
        scores.add_score(500, 2, 1234);
        scores.save(&path);

        let loaded = HighScores::load(&path);
        assert_eq!(loaded, scores);
    }

    #[test]
    fn test_missing_file_starts_fresh() {
        let loaded = HighScores::load(Path::new("no/such/highscores.json"));
        assert!(loaded.is_empty());
    }
}
