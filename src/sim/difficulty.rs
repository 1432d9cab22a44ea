//! Difficulty ramp
//!
//! Stateless derivations: the concurrency cap comes from the score table,
//! stage timing from the speed factor. The speed factor itself ratchets up
//! on every landing, caught or missed.

use super::state::GameState;
use crate::Millis;

impl GameState {
    /// Highest cap whose score threshold has been reached; 1 if none.
    pub fn concurrent_drop_limit(&self) -> u32 {
        let mut max = 1;
        for rule in &self.config.concurrent_drops_by_score {
            if self.score >= rule.score {
                max = max.max(rule.max);
            }
        }
        max
    }

    /// Recompute the cap after a score change. Non-decreasing within a
    /// round because score is.
    pub(crate) fn refresh_concurrent_limit(&mut self) {
        self.max_concurrent_drops = self.concurrent_drop_limit();
    }

    /// Per-stage fall time at the current speed factor, floored so the
    /// descent never becomes unreadable.
    pub fn stage_duration(&self) -> Millis {
        let divisor = self.speed_factor.max(self.config.speed_factor_floor);
        (self.config.drop_fall_time_per_stage / divisor).max(self.config.drop_stage_min_time)
    }

    /// Ratchet the speed factor up by one increment, capped at the ceiling.
    pub(crate) fn bump_speed(&mut self) {
        self.speed_factor =
            (self.speed_factor + self.config.speed_increase_per_drop).min(self.config.speed_factor_max);
    }
}
