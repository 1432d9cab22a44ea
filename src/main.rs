//! Leak Panic entry point
//!
//! Headless demo driver: runs the simulation with a small auto-player,
//! logs the cues a frontend would forward to its audio collaborator, and
//! prints the final renderer snapshot as JSON.

use std::path::PathBuf;
use std::time::{SystemTime, UNIX_EPOCH};

use leak_panic::sim::{self, GamePhase, GameState};
use leak_panic::{GameConfig, HighScores, Millis};

/// Demo frame cadence (the real frontend supplies its own timestamps).
const FRAME_MS: Millis = 1000.0 / 60.0;
/// Hard cutoff so a lucky autopilot cannot run forever.
const DEMO_CUTOFF_MS: Millis = 10.0 * 60_000.0;

fn main() -> std::io::Result<()> {
    env_logger::init();

    let mut args = std::env::args().skip(1);
    let seed: u64 = args.next().and_then(|s| s.parse().ok()).unwrap_or(0xD1D5EED);
    let rounds: u32 = args.next().and_then(|s| s.parse().ok()).unwrap_or(1);

    let config = GameConfig::load_or_default(&PathBuf::from("leak-panic.json"));
    let scores_path = PathBuf::from("highscores.json");
    let mut scores = HighScores::load(&scores_path);

    log::info!("Leak Panic demo: seed {seed}, {rounds} round(s)");
    let mut state = GameState::new(config, seed);
    let mut now: Millis = 0.0;

    for round in 1..=rounds {
        state.request_start(now);
        while state.phase != GamePhase::GameOver {
            now += FRAME_MS;
            autopilot(&mut state);
            for cue in sim::tick(&mut state, now) {
                log::debug!("[{now:>8.0}ms] cue {}", cue.as_str());
            }
            if now > DEMO_CUTOFF_MS * round as Millis {
                log::warn!("demo cutoff reached, ending round early");
                break;
            }
        }
        log::info!("round {round} over: score {}, high score {}", state.score, state.high_score);
        // Let the game-over blink play out before restarting.
        for _ in 0..120 {
            now += FRAME_MS;
            sim::tick(&mut state, now);
        }
    }

    let timestamp = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as f64)
        .unwrap_or(0.0);
    if let Some(rank) = scores.add_score(state.high_score, timestamp) {
        log::info!("score {} entered the leaderboard at rank {rank}", state.high_score);
    }
    scores.save(&scores_path)?;

    match serde_json::to_string_pretty(&state.snapshot()) {
        Ok(json) => println!("{json}"),
        Err(err) => log::error!("snapshot serialization failed: {err}"),
    }
    Ok(())
}

/// Chase the drop that lands soonest; once the bucket is full, head for
/// the drain. One station of movement per frame.
fn autopilot(state: &mut GameState) {
    if state.phase != GamePhase::Playing {
        return;
    }
    let target = if state.bucket_filled {
        0
    } else {
        state
            .drops
            .iter()
            .min_by(|a, b| {
                a.expected_landing
                    .partial_cmp(&b.expected_landing)
                    .unwrap_or(std::cmp::Ordering::Equal)
            })
            .map(|drop| drop.column as usize)
            .unwrap_or(state.player_position)
    };
    if target < state.player_position {
        state.move_left();
    } else if target > state.player_position {
        state.move_right();
    }
}
