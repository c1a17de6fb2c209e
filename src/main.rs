//! Dune Dash headless shell
//!
//! Loads a level image, runs the simulation with scripted input and logs
//! every event the core emits. A real frontend would drive the exact same
//! API: one `tick` per frame, then drain events and fetch the draw list.
//!
//! Usage: `dune-dash [level.png] [kinematic|rigid] [frames]`

use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use anyhow::{Context, Result};
use image::{Rgba, RgbaImage};

use dune_dash::consts::SIM_DT;
use dune_dash::level::{loader, ColorTable, Level};
use dune_dash::render;
use dune_dash::sim::{tick, GameEvent, GamePhase, GameState, PhysicsMode, TickInput};
use dune_dash::{HighScores, Settings, Tuning};

const SETTINGS_FILE: &str = "dune-dash-settings.json";
const HIGHSCORE_FILE: &str = "dune-dash-highscores.json";
const TUNING_FILE: &str = "dune-dash-tuning.json";

fn main() -> Result<()> {
    env_logger::init();

    let mut args = std::env::args().skip(1);
    let level_path = args.next().map(PathBuf::from);
    let mode = match args.next().as_deref() {
        Some("rigid") => PhysicsMode::RigidBody,
        Some("kinematic") | None => PhysicsMode::Kinematic,
        Some(other) => anyhow::bail!("unknown physics mode '{other}' (kinematic|rigid)"),
    };
    let frames: u64 = args
        .next()
        .map(|s| s.parse())
        .transpose()
        .context("frame count must be a number")?
        .unwrap_or(600);

    let settings = Settings::load(Path::new(SETTINGS_FILE));
    let tuning = Tuning::load(Path::new(TUNING_FILE));

    // Kinematic demos use the v1 table (coins, feathers, goal); rigid-body
    // demos use v2 (stars, rain). A real shell would pick per level file.
    let table = match mode {
        PhysicsMode::Kinematic => ColorTable::v1(),
        PhysicsMode::RigidBody => ColorTable::v2(),
    };
    let level = match &level_path {
        Some(path) => loader::load(path, &table, &tuning)
            .with_context(|| format!("loading level {}", path.display()))?,
        None => {
            log::info!("No level given, using the built-in demo strip");
            demo_level(&table, &tuning)
        }
    };

    let mut state = GameState::new(level, mode, tuning, 0xD1CE);

    let mut input = TickInput { right: true, ..Default::default() };
    let mut done = false;
    for frame in 0..frames {
        // Run right, hopping every second and a half
        input.jump = frame % 90 < 12;
        tick(&mut state, &input, SIM_DT);

        for event in state.take_events() {
            match event {
                GameEvent::Sound(sfx) => log::debug!("sfx: {sfx:?}"),
                GameEvent::ScoreAwarded { amount, total } => {
                    log::info!("+{amount} points (total {total})")
                }
                GameEvent::LifeLost { remaining } => log::info!("life lost, {remaining} left"),
                GameEvent::GameOver { final_score } => {
                    log::info!("game over, final score {final_score}");
                    done = true;
                }
                GameEvent::LevelComplete { final_score } => {
                    log::info!("level complete, score {final_score}");
                    done = true;
                }
            }
        }
        if done {
            break;
        }
    }

    let sprites = render::draw_list(&state, &settings);
    println!(
        "phase: {:?}  score: {}  lives: {}  sprites: {}",
        state.phase,
        state.score,
        state.lives,
        sprites.len()
    );

    if state.phase == GamePhase::GameOver && state.score > 0 {
        let timestamp = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(0);
        let path = Path::new(HIGHSCORE_FILE);
        let mut scores = HighScores::load(path);
        if let Some(rank) = scores.add_score(state.score, 1, timestamp) {
            log::info!("New high score at rank {rank}");
            scores.save(path);
        }
    }

    Ok(())
}

/// A small built-in strip: a long floor, a few pick-ups and the spawn.
fn demo_level(table: &ColorTable, tuning: &Tuning) -> Level {
    let mut img = RgbaImage::from_pixel(24, 6, Rgba([0, 0, 0, 255]));
    for x in 0..24 {
        img.put_pixel(x, 5, Rgba([0, 255, 0, 255]));
    }
    img.put_pixel(1, 4, Rgba([255, 255, 255, 255]));
    for x in [5, 9, 13] {
        img.put_pixel(x, 4, Rgba([255, 255, 0, 255]));
    }
    img.put_pixel(17, 4, Rgba([255, 0, 255, 255]));
    loader::from_image(&img, table, tuning)
}
