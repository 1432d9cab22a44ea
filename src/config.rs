//! Data-driven game tuning
//!
//! All numeric and structural parameters the simulation consumes, supplied
//! once at construction. No dynamic reconfiguration mid-round.

use serde::{Deserialize, Serialize};

use crate::Millis;

/// Per-column leak cadence.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LeakTiming {
    /// Leak column (1-based; station index under this column).
    pub column: u8,
    /// Mean delay between drops from this column.
    pub base_interval: Millis,
    /// Uniform jitter applied around `base_interval` (plus or minus).
    pub jitter: Millis,
}

/// One row of the score-to-concurrency table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConcurrencyRule {
    /// Score at which this cap becomes available.
    pub score: u32,
    /// Maximum simultaneous drops once reached.
    pub max: u32,
}

/// Game configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GameConfig {
    /// Lives at round start; also the life ceiling.
    pub max_lives: u32,
    /// Final drop stage (stages run 0..=max_drop_stage).
    pub max_drop_stage: u32,
    /// Displayed flood levels (water rises one level per lost life).
    pub water_levels: u32,
    /// Stations the player can occupy: the drain plus one per leak column.
    /// Station 0 is the drain; the player starts here each round.
    pub start_position: usize,

    // === Phase blink cadence ===
    pub attract_blink_interval: Millis,
    pub start_blink_count: u32,
    pub start_blink_interval: Millis,
    pub game_over_blink_count: u32,
    pub game_over_blink_interval: Millis,

    // === Leak scheduling ===
    pub leak_timing: Vec<LeakTiming>,
    /// Floor on any computed spawn delay.
    pub min_leak_interval: Millis,
    pub leak_warning_blink_interval: Millis,
    pub leak_warning_blink_count: u32,
    /// Sibling window for the anti-repeat deferral: a column that just
    /// fired yields if another leak is due within this many ms.
    pub leak_defer_window: Millis,
    /// How far a deferred column pushes its own spawn back.
    pub leak_defer_delay: Millis,
    /// Base delay before the first warning of a fresh round.
    pub initial_leak_delay: Millis,
    /// Uniform spread added on top of `initial_leak_delay`.
    pub initial_leak_spread: Millis,
    /// Minimum gap between a landing and the next drop on the same column.
    pub drop_landing_gap: Millis,

    // === Drop descent ===
    /// Per-stage fall time at speed factor 1.
    pub drop_fall_time_per_stage: Millis,
    /// Per-stage fall time never drops below this.
    pub drop_stage_min_time: Millis,
    /// Existing drops must have reached this stage before a second
    /// concurrent drop may be released.
    pub drop_stage_spawn_threshold: u32,

    // === Speed ramp ===
    pub speed_increase_per_drop: f64,
    pub speed_factor_max: f64,
    /// Floor on the divisor when converting speed factor to stage time.
    pub speed_factor_floor: f64,

    // === Bucket dump ===
    pub bucket_dump_duration: Millis,
    pub bucket_dump_blink_interval: Millis,

    // === Rewards ===
    pub reward_score_start: u32,
    pub reward_score_end: u32,
    pub reward_score_jitter: u32,
    /// Decorative unlockables assigned to score thresholds each round.
    pub reward_ids: Vec<String>,

    // === Difficulty ===
    pub concurrent_drops_by_score: Vec<ConcurrencyRule>,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            max_lives: 3,
            max_drop_stage: 3,
            water_levels: 3,
            start_position: 2,

            attract_blink_interval: 650.0,
            start_blink_count: 5,
            start_blink_interval: 220.0,
            game_over_blink_count: 6,
            game_over_blink_interval: 260.0,

            leak_timing: vec![
                LeakTiming { column: 1, base_interval: 1800.0, jitter: 400.0 },
                LeakTiming { column: 2, base_interval: 1500.0, jitter: 300.0 },
                LeakTiming { column: 3, base_interval: 1300.0, jitter: 300.0 },
                LeakTiming { column: 4, base_interval: 1600.0, jitter: 500.0 },
            ],
            min_leak_interval: 950.0,
            leak_warning_blink_interval: 140.0,
            leak_warning_blink_count: 4,
            leak_defer_window: 50.0,
            leak_defer_delay: 120.0,
            initial_leak_delay: 600.0,
            initial_leak_spread: 1200.0,
            drop_landing_gap: 700.0,

            drop_fall_time_per_stage: 385.0,
            drop_stage_min_time: 190.0,
            drop_stage_spawn_threshold: 3,

            speed_increase_per_drop: 0.0035,
            speed_factor_max: 1.6,
            speed_factor_floor: 0.4,

            bucket_dump_duration: 700.0,
            bucket_dump_blink_interval: 120.0,

            reward_score_start: 5,
            reward_score_end: 50,
            reward_score_jitter: 4,
            reward_ids: (1..=13).map(|i| format!("decor-{i}")).collect(),

            concurrent_drops_by_score: vec![
                ConcurrencyRule { score: 0, max: 1 },
                ConcurrencyRule { score: 10, max: 2 },
                ConcurrencyRule { score: 30, max: 3 },
            ],
        }
    }
}

impl GameConfig {
    /// Parse a configuration from JSON. Missing fields take their defaults.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Load from a JSON file, falling back to defaults if the file is
    /// missing or malformed.
    pub fn load_or_default(path: &std::path::Path) -> Self {
        match std::fs::read_to_string(path) {
            Ok(json) => match Self::from_json(&json) {
                Ok(config) => {
                    log::info!("Loaded config from {}", path.display());
                    config
                }
                Err(err) => {
                    log::warn!("Config {} is malformed ({err}), using defaults", path.display());
                    Self::default()
                }
            },
            Err(_) => {
                log::info!("No config at {}, using defaults", path.display());
                Self::default()
            }
        }
    }

    /// Number of stations the player can occupy (drain + leak columns).
    pub fn station_count(&self) -> usize {
        self.leak_timing.len() + 1
    }

    /// Cadence entry for a column, if configured.
    pub fn timing_for(&self, column: u8) -> Option<&LeakTiming> {
        self.leak_timing.iter().find(|t| t.column == column)
    }
}
