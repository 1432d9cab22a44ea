//! Game phase machine
//!
//! Top-level dispatch per simulation tick. Within one tick the order is
//! fixed: leak scheduling (shuffled column order) runs fully before drop
//! advancement, which runs before bucket-dump/score handling, so a drop
//! created this tick is never advanced in the same tick.

use super::state::{BlinkTimer, Cue, GamePhase, GameState, TextDisplay};
use crate::Millis;

/// Advance the game by one frame. Returns the cues emitted since the last
/// tick, in emission order, for the external audio collaborator.
pub fn tick(state: &mut GameState, now: Millis) -> Vec<Cue> {
    match state.phase {
        GamePhase::Attract => state.update_attract(now),
        GamePhase::Starting => state.update_starting(now),
        GamePhase::Playing => state.update_playing(now),
        GamePhase::GameOver => state.update_game_over(now),
    }
    state.drain_cues()
}

impl GameState {
    /// Begin a round: reset per-round state (high score and RNG stream
    /// survive) and enter the Starting countdown. Ignored while already
    /// Starting.
    pub fn request_start(&mut self, now: Millis) {
        if self.phase == GamePhase::Starting {
            return;
        }
        let high_score = self.high_score;
        self.reset_round_state();
        self.high_score = high_score;
        self.phase = GamePhase::Starting;
        self.start_blink = Some(BlinkTimer {
            remaining: self.config.start_blink_count * 2,
            on: true,
            next_toggle: now + self.config.start_blink_interval,
        });
        self.text_display = TextDisplay { new: true, game: true, over: false };
        self.push_cue(Cue::StartFanfare);
        log::info!("round requested, countdown running");
    }

    /// Enter the Attract phase (idle demo) directly.
    pub fn enter_attract(&mut self, now: Millis) {
        let high_score = self.high_score;
        self.reset_round_state();
        self.high_score = high_score;
        self.phase = GamePhase::Attract;
        self.attract_next_toggle = now + self.config.attract_blink_interval;
        self.text_display = TextDisplay::default();
    }

    /// Move one station toward the drain. No-op outside Starting/Playing.
    pub fn move_left(&mut self) {
        if !self.can_control_player() {
            return;
        }
        if self.player_position > 0 {
            self.player_position -= 1;
            self.push_cue(Cue::MoveBlip);
        }
    }

    /// Move one station away from the drain. No-op outside Starting/Playing.
    pub fn move_right(&mut self) {
        if !self.can_control_player() {
            return;
        }
        if self.player_position + 1 < self.station_count() {
            self.player_position += 1;
            self.push_cue(Cue::MoveBlip);
        }
    }

    fn can_control_player(&self) -> bool {
        matches!(self.phase, GamePhase::Playing | GamePhase::Starting)
    }

    fn update_attract(&mut self, now: Millis) {
        self.text_display = TextDisplay::default();
        if now >= self.attract_next_toggle {
            self.attract_blink_on = !self.attract_blink_on;
            self.attract_next_toggle = now + self.config.attract_blink_interval;
        }
    }

    fn update_starting(&mut self, now: Millis) {
        let Some(mut blink) = self.start_blink else {
            self.finalize_gameplay_start(now);
            return;
        };
        if now < blink.next_toggle {
            return;
        }
        blink.on = !blink.on;
        blink.next_toggle = now + self.config.start_blink_interval;
        blink.remaining = blink.remaining.saturating_sub(1);
        self.text_display = TextDisplay { new: blink.on, game: blink.on, over: false };
        if blink.remaining == 0 {
            self.start_blink = None;
            self.finalize_gameplay_start(now);
        } else {
            self.start_blink = Some(blink);
        }
    }

    /// Countdown done: arm every leak and hand control to the main loop.
    fn finalize_gameplay_start(&mut self, now: Millis) {
        self.phase = GamePhase::Playing;
        self.bucket_filled = false;
        self.score = 0;
        self.lives = self.config.max_lives;
        self.water_level = 0;
        self.drops.clear();
        self.bucket_dump = Default::default();
        self.speed_factor = 1.0;
        let delay = self.config.initial_leak_delay;
        let spread = self.config.initial_leak_spread;
        for idx in 0..self.leaks.len() {
            let jitter = self.rng.unit() * spread;
            let leak = &mut self.leaks[idx];
            leak.reset_warning();
            leak.next_spawn_at = now + delay + jitter;
        }
        self.crack_warnings.fill(false);
        self.refresh_concurrent_limit();
        self.last_drop_column = None;
        self.initialize_reward_schedule();
        self.text_display = TextDisplay::default();
        log::info!("round started at {now:.0}ms, seed {}", self.seed);
    }

    fn update_playing(&mut self, now: Millis) {
        self.update_leak_scheduling(now);
        self.advance_drops(now);
        self.handle_bucket_dump(now);
    }

    fn update_game_over(&mut self, now: Millis) {
        let Some(mut blink) = self.game_over_blink else {
            return;
        };
        if now < blink.next_toggle {
            return;
        }
        blink.on = !blink.on;
        blink.next_toggle = now + self.config.game_over_blink_interval;
        blink.remaining = blink.remaining.saturating_sub(1);
        self.text_display.game = blink.on;
        self.text_display.over = blink.on;
        if blink.remaining == 0 {
            self.game_over_blink = None;
            self.text_display.game = true;
            self.text_display.over = true;
        } else {
            self.game_over_blink = Some(blink);
        }
    }

    /// End the round: record the high score and start the game-over blink.
    pub(crate) fn trigger_game_over(&mut self, now: Millis) {
        self.phase = GamePhase::GameOver;
        self.high_score = self.high_score.max(self.score);
        self.game_over_blink = Some(BlinkTimer {
            remaining: self.config.game_over_blink_count * 2,
            on: true,
            next_toggle: now + self.config.game_over_blink_interval,
        });
        self.text_display.game = true;
        self.text_display.over = true;
        self.push_cue(Cue::GameOver);
        log::info!("game over: score {}, high score {}", self.score, self.high_score);
    }

    /// Empty a full bucket at the drain, award the deposit, and run the
    /// dump-blink feedback timer.
    fn handle_bucket_dump(&mut self, now: Millis) {
        if self.bucket_filled && self.player_position == 0 {
            self.bucket_filled = false;
            self.push_cue(Cue::BucketDump);
            self.award_bucket_deposit();
            if self.config.bucket_dump_duration > 0.0 {
                self.bucket_dump.active = true;
                self.bucket_dump.until = now + self.config.bucket_dump_duration;
                self.bucket_dump.next_blink = now + self.config.bucket_dump_blink_interval;
                self.bucket_dump.blink_on = true;
            } else {
                self.bucket_dump.active = false;
                self.bucket_dump.blink_on = false;
            }
        }
        if !self.bucket_dump.active {
            return;
        }
        if now >= self.bucket_dump.next_blink {
            self.bucket_dump.blink_on = !self.bucket_dump.blink_on;
            self.bucket_dump.next_blink = now + self.config.bucket_dump_blink_interval;
        }
        if now >= self.bucket_dump.until {
            self.bucket_dump.active = false;
            self.bucket_dump.blink_on = false;
        }
    }

    /// Score a deposit, then re-derive everything score feeds: rewards and
    /// the concurrency cap.
    fn award_bucket_deposit(&mut self) {
        self.score += 1;
        self.update_rewards();
        self.refresh_concurrent_limit();
        self.push_cue(Cue::Score);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GameConfig;

    fn new_game(seed: u64) -> GameState {
        GameState::new(GameConfig::default(), seed)
    }

    #[test]
    fn start_request_runs_countdown_then_plays() {
        let mut state = new_game(1);
        state.request_start(0.0);
        assert_eq!(state.phase, GamePhase::Starting);
        let cues = tick(&mut state, 0.0);
        assert!(cues.contains(&Cue::StartFanfare));

        // 5 blinks = 10 toggles at 220ms.
        let mut now = 0.0;
        for _ in 0..9 {
            now += 220.0;
            tick(&mut state, now);
            assert_eq!(state.phase, GamePhase::Starting);
        }
        tick(&mut state, now + 220.0);
        assert_eq!(state.phase, GamePhase::Playing);
        assert!(state.start_blink.is_none());
        assert_eq!(state.score, 0);
        assert_eq!(state.lives, 3);
        assert_eq!(state.reward_schedule.len(), 13);
        for leak in &state.leaks {
            assert!(leak.next_spawn_at >= now + 220.0 + 600.0);
        }
    }

    #[test]
    fn start_request_ignored_while_starting() {
        let mut state = new_game(1);
        state.request_start(0.0);
        let blink = state.start_blink.unwrap();
        state.request_start(50.0);
        assert_eq!(state.start_blink.unwrap().next_toggle, blink.next_toggle);
    }

    #[test]
    fn movement_only_in_starting_and_playing() {
        let mut state = new_game(1);
        assert_eq!(state.player_position, 2);
        state.move_left();
        assert_eq!(state.player_position, 2, "attract ignores movement");

        state.request_start(0.0);
        state.move_left();
        assert_eq!(state.player_position, 1, "countdown allows movement");

        state.phase = GamePhase::GameOver;
        state.move_right();
        assert_eq!(state.player_position, 1, "game over ignores movement");
    }

    #[test]
    fn movement_clamps_to_stations_and_blips() {
        let mut state = new_game(1);
        state.phase = GamePhase::Playing;
        state.player_position = 0;
        state.move_left();
        assert_eq!(state.player_position, 0);
        let cues = tick(&mut state, 0.0);
        assert!(!cues.contains(&Cue::MoveBlip), "clamped move is silent");

        state.move_right();
        assert_eq!(state.player_position, 1);
        let cues = tick(&mut state, 1.0);
        assert!(cues.contains(&Cue::MoveBlip));

        state.player_position = state.station_count() - 1;
        state.move_right();
        assert_eq!(state.player_position, 4, "right edge clamps");
    }

    #[test]
    fn bucket_dump_awards_score_and_blinks() {
        let mut state = new_game(1);
        state.phase = GamePhase::Playing;
        state.bucket_filled = true;
        state.player_position = 0;

        let cues = tick(&mut state, 1000.0);
        assert!(!state.bucket_filled);
        assert_eq!(state.score, 1);
        assert!(state.bucket_dump.active);
        assert!(state.bucket_dump.blink_on);
        let dump_pos = cues.iter().position(|c| *c == Cue::BucketDump).unwrap();
        let score_pos = cues.iter().position(|c| *c == Cue::Score).unwrap();
        assert!(dump_pos < score_pos, "dump cue precedes score cue");

        // Blink toggles at 120ms, dump clears at 700ms.
        tick(&mut state, 1120.0);
        assert!(!state.bucket_dump.blink_on);
        tick(&mut state, 1700.0);
        assert!(!state.bucket_dump.active);
    }

    #[test]
    fn dump_away_from_drain_does_nothing() {
        let mut state = new_game(1);
        state.phase = GamePhase::Playing;
        state.bucket_filled = true;
        state.player_position = 1;
        tick(&mut state, 0.0);
        assert!(state.bucket_filled);
        assert_eq!(state.score, 0);
    }

    #[test]
    fn score_crossing_threshold_raises_cap() {
        let mut state = new_game(1);
        state.phase = GamePhase::Playing;
        assert_eq!(state.max_concurrent_drops, 1);
        state.score = 9;
        state.bucket_filled = true;
        state.player_position = 0;
        tick(&mut state, 0.0);
        assert_eq!(state.score, 10);
        assert_eq!(state.max_concurrent_drops, 2, "cap rises exactly at 10");
    }

    #[test]
    fn game_over_records_high_score_and_blinks_out() {
        let mut state = new_game(1);
        state.phase = GamePhase::Playing;
        state.score = 7;
        state.lives = 1;
        state.lose_life(0.0);
        assert_eq!(state.phase, GamePhase::GameOver);
        assert_eq!(state.high_score, 7);

        // 6 blinks = 12 toggles at 260ms; text holds on afterwards.
        let mut now = 0.0;
        for _ in 0..12 {
            now += 260.0;
            tick(&mut state, now);
        }
        assert!(state.game_over_blink.is_none());
        assert!(state.text_display.game && state.text_display.over);
        tick(&mut state, now + 10_000.0);
        assert_eq!(state.phase, GamePhase::GameOver, "holds until a start request");
    }

    #[test]
    fn restart_preserves_high_score_resets_the_rest() {
        let mut state = new_game(1);
        state.phase = GamePhase::Playing;
        state.score = 12;
        state.speed_factor = 1.4;
        state.lives = 1;
        state.lose_life(0.0);
        assert_eq!(state.high_score, 12);

        state.request_start(500.0);
        assert_eq!(state.phase, GamePhase::Starting);
        assert_eq!(state.high_score, 12, "high score survives the reset");
        assert_eq!(state.score, 0);
        assert_eq!(state.lives, 3);
        assert_eq!(state.speed_factor, 1.0);
        assert!(state.drops.is_empty());
        assert!(state.rewards_unlocked.is_empty());
    }

    #[test]
    fn lower_final_score_keeps_previous_high_score() {
        let mut state = new_game(1);
        state.high_score = 20;
        state.phase = GamePhase::Playing;
        state.score = 5;
        state.lives = 1;
        state.lose_life(0.0);
        assert_eq!(state.high_score, 20);
    }

    #[test]
    fn attract_blink_toggles_on_interval() {
        let mut state = new_game(1);
        state.enter_attract(0.0);
        let initial = state.attract_blink_on;
        tick(&mut state, 100.0);
        assert_eq!(state.attract_blink_on, initial);
        tick(&mut state, 650.0);
        assert_eq!(state.attract_blink_on, !initial);
    }

    #[test]
    fn catch_then_deposit_full_cycle() {
        let mut state = new_game(1);
        state.phase = GamePhase::Playing;
        state.player_position = 2;
        // Hand-place a drop about to land on the player's column.
        let id = state.next_drop_id();
        state.drops.push(crate::sim::state::Drop {
            id,
            column: 2,
            stage: 3,
            next_stage_at: 100.0,
            expected_landing: 100.0,
        });
        let cues = tick(&mut state, 100.0);
        assert!(cues.contains(&Cue::BucketFill));
        assert!(state.bucket_filled);
        assert_eq!(state.lives, 3, "no life lost on a catch");

        // Walk home and dump.
        state.move_left();
        state.move_right(); // wander a bit
        state.move_left();
        state.move_left();
        assert_eq!(state.player_position, 0);
        let cues = tick(&mut state, 300.0);
        assert!(cues.contains(&Cue::BucketDump));
        assert!(cues.contains(&Cue::Score));
        assert_eq!(state.score, 1);
    }
}
