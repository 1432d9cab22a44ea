//! Score-threshold reward scheduling
//!
//! Each round assigns every reward id a target score by shuffling the ids
//! and interpolating thresholds across the configured range with bounded
//! jitter. Unlocks are monotonic: once triggered, a reward stays unlocked
//! for the rest of the round.

use super::state::{GameState, RewardSlot};

impl GameState {
    /// Build this round's schedule. Called on entering the Playing phase.
    pub(crate) fn initialize_reward_schedule(&mut self) {
        self.reward_schedule.clear();
        self.rewards_unlocked.clear();

        let mut ids = self.config.reward_ids.clone();
        if ids.is_empty() {
            return;
        }
        self.rng.shuffle(&mut ids);

        let start = self.config.reward_score_start;
        let end = self.config.reward_score_end.max(start);
        let jitter = self.config.reward_score_jitter;
        let count = ids.len();

        for (idx, id) in ids.into_iter().enumerate() {
            let ratio = if count <= 1 { 0.0 } else { idx as f64 / (count - 1) as f64 };
            let mut target = (start as f64 + ratio * (end - start) as f64).round() as i64;
            if jitter > 0 {
                target += (self.rng.signed_unit() * jitter as f64).round() as i64;
            }
            let score = target.clamp(start as i64, end as i64) as u32;
            self.reward_schedule.push(RewardSlot { id, score });
        }
    }

    /// Unlock every scheduled reward whose threshold the score has reached.
    /// Idempotent; evaluation order does not matter.
    pub(crate) fn update_rewards(&mut self) {
        let score = self.score;
        let schedule = &self.reward_schedule;
        let unlocked = &mut self.rewards_unlocked;
        for slot in schedule {
            if score >= slot.score && !unlocked.iter().any(|id| id == &slot.id) {
                unlocked.push(slot.id.clone());
                log::debug!("reward {} unlocked at score {score}", slot.id);
            }
        }
    }
}
