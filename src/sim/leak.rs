//! Leak scheduling state machine
//!
//! Per tick and per column: begin a warning sequence, advance an
//! in-progress blink, or release a drop. Columns are visited in a freshly
//! shuffled order every tick so no column is systematically favored when
//! several become eligible at once.

use super::state::{Cue, Drop, GameState, WarningPhase};
use crate::Millis;

impl GameState {
    /// Run one scheduling pass over every leak. Also recomputes the
    /// per-column crack visibility flags.
    pub(crate) fn update_leak_scheduling(&mut self, now: Millis) {
        self.crack_warnings.fill(false);

        let mut order: Vec<usize> = (0..self.leaks.len()).collect();
        self.rng.shuffle(&mut order);

        for idx in order {
            if self.leaks[idx].pending_drop {
                self.advance_warning_blink(idx, now);
                if self.leaks[idx].warning_phase == WarningPhase::Waiting {
                    self.try_release_drop(idx, now);
                }
            } else if now >= self.leaks[idx].next_spawn_at {
                self.maybe_begin_warning(idx, now);
            }

            let leak = &self.leaks[idx];
            let col = leak.column as usize;
            if col >= 1 && col <= self.crack_warnings.len() {
                self.crack_warnings[col - 1] = leak.crack_hold || leak.warning_on;
            }
        }
    }

    /// Toggle the warning blink if due. Each OFF toggle consumes one
    /// remaining blink; at zero the leak moves to Waiting.
    fn advance_warning_blink(&mut self, idx: usize, now: Millis) {
        let interval = self.config.leak_warning_blink_interval;
        let leak = &mut self.leaks[idx];
        if leak.warning_phase != WarningPhase::Blinking || now < leak.next_warning_toggle {
            return;
        }
        leak.warning_on = !leak.warning_on;
        leak.next_warning_toggle = now + interval;
        if !leak.warning_on {
            leak.blinks_remaining = leak.blinks_remaining.saturating_sub(1);
            if leak.blinks_remaining == 0 {
                leak.warning_phase = WarningPhase::Waiting;
                leak.warning_on = false;
            }
        }
    }

    /// Start a warning sequence, unless the anti-repeat deferral applies.
    fn maybe_begin_warning(&mut self, idx: usize, now: Millis) {
        if self.should_defer_leak(idx, now) {
            self.leaks[idx].next_spawn_at = now + self.config.leak_defer_delay;
            return;
        }
        let blink_count = self.config.leak_warning_blink_count;
        let interval = self.config.leak_warning_blink_interval;
        let leak = &mut self.leaks[idx];
        leak.pending_drop = true;
        leak.warning_on = true;
        leak.warning_phase = WarningPhase::Blinking;
        leak.blinks_remaining = blink_count;
        leak.next_warning_toggle = now + interval;
        leak.crack_hold = false;
        leak.active_drop_id = None;
    }

    /// Anti-repeat tie-breaker: the column that fired most recently yields
    /// when a sibling is about to become due.
    fn should_defer_leak(&self, idx: usize, now: Millis) -> bool {
        let Some(last) = self.last_drop_column else {
            return false;
        };
        if self.leaks[idx].column != last {
            return false;
        }
        let window = self.config.leak_defer_window;
        self.leaks
            .iter()
            .enumerate()
            .any(|(i, other)| i != idx && now >= other.next_spawn_at - window)
    }

    /// Release gate: refused at the concurrency cap, or until every active
    /// drop is far enough down. A refused leak holds in Waiting and retries
    /// next tick.
    pub(crate) fn try_release_drop(&mut self, idx: usize, now: Millis) -> bool {
        if self.active_drop_count() >= self.max_concurrent_drops as usize
            || !self.ready_for_next_drop()
        {
            self.hold_warning(idx);
            return false;
        }

        let duration = self.stage_duration();
        let total_stages = (self.config.max_drop_stage + 1) as Millis;
        let id = self.next_drop_id();
        let column = self.leaks[idx].column;
        let drop = Drop {
            id,
            column,
            stage: 0,
            next_stage_at: now + duration,
            expected_landing: now + duration * total_stages,
        };
        let landing = drop.expected_landing;
        self.drops.push(drop);

        // Re-arm delay uses the previous landing on this column, not the
        // one just scheduled.
        let delay = self.spawn_delay_for(idx, now);
        let leak = &mut self.leaks[idx];
        leak.pending_drop = false;
        leak.warning_on = false;
        leak.warning_phase = WarningPhase::Idle;
        leak.blinks_remaining = 0;
        leak.next_warning_toggle = 0.0;
        leak.next_spawn_at = now + delay;
        leak.expected_landing = landing;
        leak.crack_hold = true;
        leak.active_drop_id = Some(id);
        self.last_drop_column = Some(column);
        self.push_cue(Cue::DropStep);
        log::debug!("column {column} released drop {id}, lands at {landing:.0}");
        true
    }

    /// Keep the warning armed without losing state; retried next tick.
    fn hold_warning(&mut self, idx: usize) {
        let leak = &mut self.leaks[idx];
        leak.pending_drop = true;
        leak.warning_on = false;
        leak.warning_phase = WarningPhase::Waiting;
        leak.blinks_remaining = 0;
    }

    /// Fairness gate for concurrent drops: a second drop is only allowed
    /// once every active drop has descended past the spawn threshold.
    pub(crate) fn ready_for_next_drop(&self) -> bool {
        if self.drops.is_empty() {
            return true;
        }
        if self.drops.len() >= self.max_concurrent_drops as usize {
            return false;
        }
        if self.max_concurrent_drops <= 1 {
            return false;
        }
        let threshold = self.config.drop_stage_spawn_threshold;
        self.drops.iter().all(|drop| drop.stage >= threshold)
    }

    /// Jittered re-arm delay: base plus uniform jitter, floored at the
    /// minimum interval, then pushed out to honor the landing gap.
    pub(crate) fn spawn_delay_for(&mut self, idx: usize, now: Millis) -> Millis {
        let column = self.leaks[idx].column;
        let min = self.config.min_leak_interval;
        let (base, jitter) = self
            .config
            .timing_for(column)
            .map(|t| (t.base_interval, t.jitter))
            .unwrap_or((min, 0.0));
        let gap = self.config.drop_landing_gap;
        let expected_landing = self.leaks[idx].expected_landing;

        let mut delay = base + self.rng.signed_unit() * jitter;
        if delay < min {
            delay = min;
        }
        if gap > 0.0 && expected_landing > 0.0 {
            let earliest = expected_landing + gap;
            if now + delay < earliest {
                delay = delay.max(earliest - now);
            }
        }
        delay
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GameConfig;
    use crate::sim::state::GamePhase;

    fn playing_state() -> GameState {
        let mut state = GameState::new(GameConfig::default(), 1234);
        state.phase = GamePhase::Playing;
        state
    }

    #[test]
    fn warning_blinks_then_waits() {
        let mut state = playing_state();
        // Make column 1 due now, everything else far in the future.
        for leak in &mut state.leaks {
            leak.next_spawn_at = 1_000_000.0;
        }
        state.leaks[0].next_spawn_at = 0.0;
        state.update_leak_scheduling(0.0);

        let leak = &state.leaks[0];
        assert!(leak.pending_drop);
        assert_eq!(leak.warning_phase, WarningPhase::Blinking);
        assert!(leak.warning_on);
        assert_eq!(leak.blinks_remaining, 4);
        assert!(state.crack_warnings[0]);

        // Walk the blink sequence: 4 blinks = 8 toggles at 140ms.
        let mut now = 0.0;
        for _ in 0..8 {
            now += 140.0;
            state.update_leak_scheduling(now);
        }
        assert_eq!(state.leaks[0].warning_phase, WarningPhase::Idle);
        assert_eq!(state.drops.len(), 1, "drop released once waiting");
    }

    #[test]
    fn release_refused_at_cap_holds_waiting() {
        let mut state = playing_state();
        state.max_concurrent_drops = 1;
        state.drops.push(Drop {
            id: 99,
            column: 2,
            stage: 0,
            next_stage_at: 1e9,
            expected_landing: 1e9,
        });
        state.leaks[0].pending_drop = true;
        state.leaks[0].warning_phase = WarningPhase::Waiting;

        assert!(!state.try_release_drop(0, 100.0));
        assert_eq!(state.leaks[0].warning_phase, WarningPhase::Waiting);
        assert!(state.leaks[0].pending_drop);
        assert_eq!(state.drops.len(), 1);
    }

    #[test]
    fn second_drop_gated_on_spawn_threshold() {
        let mut state = playing_state();
        state.max_concurrent_drops = 2;
        state.drops.push(Drop {
            id: 1,
            column: 2,
            stage: 1,
            next_stage_at: 1e9,
            expected_landing: 1e9,
        });
        assert!(!state.ready_for_next_drop(), "stage 1 is below the threshold");

        state.drops[0].stage = 3;
        assert!(state.ready_for_next_drop(), "threshold reached");
    }

    #[test]
    fn release_records_column_and_hold() {
        let mut state = playing_state();
        state.leaks[2].pending_drop = true;
        state.leaks[2].warning_phase = WarningPhase::Waiting;
        assert!(state.try_release_drop(2, 1000.0));

        let leak = &state.leaks[2];
        assert_eq!(state.last_drop_column, Some(3));
        assert!(leak.crack_hold);
        assert_eq!(leak.active_drop_id, Some(state.drops[0].id));
        assert_eq!(leak.warning_phase, WarningPhase::Idle);
        assert!(!leak.pending_drop);
        // Fall plan: 4 stages at 385ms each from t=1000.
        assert_eq!(state.drops[0].expected_landing, 1000.0 + 4.0 * 385.0);
    }

    #[test]
    fn deferral_pushes_repeat_column_back() {
        let mut state = playing_state();
        state.last_drop_column = Some(1);
        state.leaks[0].next_spawn_at = 0.0;
        // Sibling due within the 50ms window.
        state.leaks[1].next_spawn_at = 40.0;
        for leak in &mut state.leaks[2..] {
            leak.next_spawn_at = 1_000_000.0;
        }

        state.update_leak_scheduling(0.0);
        assert!(!state.leaks[0].pending_drop, "repeat column deferred");
        assert_eq!(state.leaks[0].next_spawn_at, 120.0);
    }

    #[test]
    fn no_deferral_without_imminent_sibling() {
        let mut state = playing_state();
        state.last_drop_column = Some(1);
        state.leaks[0].next_spawn_at = 0.0;
        for leak in &mut state.leaks[1..] {
            leak.next_spawn_at = 1_000_000.0;
        }
        state.update_leak_scheduling(0.0);
        assert!(state.leaks[0].pending_drop, "no sibling imminent, warning begins");
    }

    #[test]
    fn spawn_delay_respects_floor_and_landing_gap() {
        let mut state = playing_state();
        // Zero out jitter so the delay is deterministic.
        for timing in &mut state.config.leak_timing {
            timing.jitter = 0.0;
            timing.base_interval = 100.0; // below the 950 floor
        }
        let delay = state.spawn_delay_for(0, 0.0);
        assert_eq!(delay, 950.0);

        // A recent landing pushes the delay out to landing + gap.
        state.leaks[0].expected_landing = 2000.0;
        let delay = state.spawn_delay_for(0, 0.0);
        assert_eq!(delay, 2700.0);
    }

    #[test]
    fn at_most_one_drop_in_flight_per_leak() {
        let mut state = playing_state();
        state.max_concurrent_drops = 3;
        state.leaks[0].pending_drop = true;
        state.leaks[0].warning_phase = WarningPhase::Waiting;
        assert!(state.try_release_drop(0, 0.0));

        // The leak re-armed; it cannot be in Waiting again until its next
        // warning sequence completes, so its active drop stays unique.
        assert_eq!(
            state.drops.iter().filter(|d| d.column == 1).count(),
            1
        );
        assert_eq!(state.leaks[0].warning_phase, WarningPhase::Idle);
    }
}
