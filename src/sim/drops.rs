//! Drop stage advancement and landing resolution
//!
//! Drops descend in discrete stages; stage times are recomputed at every
//! transition from the current speed factor. Landing resolution runs
//! synchronously in the tick that removes the drop.

use super::state::{Cue, Drop, GameState};
use crate::Millis;

impl GameState {
    /// Advance every due drop by one stage; drops past the final stage are
    /// removed and resolved immediately.
    pub(crate) fn advance_drops(&mut self, now: Millis) {
        let mut i = self.drops.len();
        while i > 0 {
            i -= 1;
            // A miss resolution may have wiped the collection mid-walk.
            if i >= self.drops.len() {
                continue;
            }
            if now < self.drops[i].next_stage_at {
                continue;
            }
            self.drops[i].stage += 1;
            if self.drops[i].stage > self.config.max_drop_stage {
                let had_simultaneous = self.drops.len() > 1;
                let drop = self.drops.remove(i);
                self.resolve_drop_landing(&drop, now, had_simultaneous);
                continue;
            }
            let duration = self.stage_duration();
            let remaining = (self.config.max_drop_stage - self.drops[i].stage + 1) as Millis;
            self.drops[i].next_stage_at = now + duration;
            self.drops[i].expected_landing = now + duration * remaining;
            self.push_cue(Cue::DropStep);
        }
    }

    /// Catch or miss, then re-arm the source leak. A miss wipes the board
    /// to give the player a clean restart window; `clear_others` force-
    /// clears siblings when more than one drop was active at removal time.
    pub(crate) fn resolve_drop_landing(&mut self, drop: &Drop, now: Millis, clear_others: bool) {
        let caught = self.player_position == drop.column as usize && !self.bucket_filled;
        if caught {
            self.bucket_filled = true;
            self.push_cue(Cue::BucketFill);
        } else {
            self.lose_life(now);
            self.clear_board_after_miss();
            self.push_cue(Cue::DropMiss);
        }

        // Unknown columns are skipped, never fatal.
        if let Some(idx) = self.leaks.iter().position(|l| l.column == drop.column) {
            self.leaks[idx].expected_landing = now;
            self.leaks[idx].pending_drop = false;
            self.leaks[idx].warning_on = false;
            let delay = self.spawn_delay_for(idx, now);
            self.leaks[idx].next_spawn_at = now + delay;
            self.leaks[idx].crack_hold = false;
            self.leaks[idx].active_drop_id = None;
        }
        self.last_drop_column = Some(drop.column);
        if clear_others && !caught {
            self.drops.clear();
        }
        self.bump_speed();
    }

    /// Decrement a life (floor 0), raise the flood level, and end the round
    /// at zero.
    pub(crate) fn lose_life(&mut self, now: Millis) {
        self.lives = self.lives.saturating_sub(1);
        let lost = self.config.max_lives.saturating_sub(self.lives);
        self.water_level = lost.min(self.config.water_levels);
        if self.lives == 0 {
            self.trigger_game_over(now);
        }
    }

    /// Wipe all drops and reset every leak's warning state to idle.
    pub(crate) fn clear_board_after_miss(&mut self) {
        self.drops.clear();
        for leak in &mut self.leaks {
            leak.reset_warning();
        }
        self.crack_warnings.fill(false);
        self.last_drop_column = None;
    }
}
