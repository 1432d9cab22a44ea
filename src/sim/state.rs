//! Game state and core simulation types
//!
//! The `GameState` root exclusively owns every leak and drop; all mutation
//! flows through the tick path, so external consumers only ever read a
//! `Snapshot`.

use serde::Serialize;

use super::rng::SimRng;
use crate::Millis;
use crate::config::GameConfig;

/// Current phase of gameplay
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum GamePhase {
    /// Idle demo, waiting for a start request
    Attract,
    /// Countdown blink before the round begins
    Starting,
    /// Active gameplay
    Playing,
    /// Run ended; holds until a start request
    GameOver,
}

/// Warning sequence state for one leak column
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WarningPhase {
    /// No drop pending; waiting for the next spawn time
    #[default]
    Idle,
    /// Crack warning blinking ahead of a release
    Blinking,
    /// Blink sequence done; waiting for the release gate to open
    Waiting,
}

/// Discrete audio cues emitted by the simulation, in emission order.
/// The audio collaborator is fire-and-forget.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Cue {
    DropStep,
    BucketFill,
    BucketDump,
    DropMiss,
    GameOver,
    StartFanfare,
    Score,
    MoveBlip,
}

impl Cue {
    pub fn as_str(&self) -> &'static str {
        match self {
            Cue::DropStep => "drop-step",
            Cue::BucketFill => "bucket-fill",
            Cue::BucketDump => "bucket-dump",
            Cue::DropMiss => "drop-miss",
            Cue::GameOver => "game-over",
            Cue::StartFanfare => "start-fanfare",
            Cue::Score => "score",
            Cue::MoveBlip => "move-blip",
        }
    }
}

/// Per-column leak scheduling state
#[derive(Debug, Clone)]
pub struct LeakState {
    /// Leak column, immutable (also the station index beneath it).
    pub column: u8,
    /// When the next warning may begin (idle only).
    pub next_spawn_at: Millis,
    pub warning_phase: WarningPhase,
    /// Current blink visibility.
    pub warning_on: bool,
    /// Off-toggles left before Blinking hands over to Waiting.
    pub blinks_remaining: u32,
    pub next_warning_toggle: Millis,
    /// True from warning start until a drop is actually created.
    pub pending_drop: bool,
    /// Landing time of the most recent or in-flight drop from this column.
    pub expected_landing: Millis,
    /// Crack stays visible while a drop from this column is in flight.
    pub crack_hold: bool,
    /// Back-reference to the in-flight drop, lookup only.
    pub active_drop_id: Option<u64>,
}

impl LeakState {
    pub fn new(column: u8) -> Self {
        Self {
            column,
            next_spawn_at: 0.0,
            warning_phase: WarningPhase::Idle,
            warning_on: false,
            blinks_remaining: 0,
            next_warning_toggle: 0.0,
            pending_drop: false,
            expected_landing: 0.0,
            crack_hold: false,
            active_drop_id: None,
        }
    }

    /// Reset all warning/hold state back to idle.
    pub fn reset_warning(&mut self) {
        self.warning_phase = WarningPhase::Idle;
        self.warning_on = false;
        self.blinks_remaining = 0;
        self.next_warning_toggle = 0.0;
        self.pending_drop = false;
        self.expected_landing = 0.0;
        self.crack_hold = false;
        self.active_drop_id = None;
    }
}

/// A falling drop. Lives only inside `GameState::drops`; removal from the
/// collection is the liveness signal.
#[derive(Debug, Clone)]
pub struct Drop {
    pub id: u64,
    /// Source leak column.
    pub column: u8,
    /// Monotonically increasing, 0..=max_drop_stage.
    pub stage: u32,
    pub next_stage_at: Millis,
    /// Recomputed at every stage transition from the current speed factor.
    pub expected_landing: Millis,
}

/// Countdown blink used by the Starting and GameOver phases.
#[derive(Debug, Clone, Copy)]
pub struct BlinkTimer {
    /// Toggles left (two per visible blink).
    pub remaining: u32,
    pub on: bool,
    pub next_toggle: Millis,
}

/// Text lamp flags mirrored into the snapshot for the renderer.
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct TextDisplay {
    pub new: bool,
    pub game: bool,
    pub over: bool,
}

/// Bucket-dump feedback timer (blinks the drain while the bucket empties).
#[derive(Debug, Clone, Copy, Default)]
pub struct BucketDump {
    pub active: bool,
    pub until: Millis,
    pub blink_on: bool,
    pub next_blink: Millis,
}

/// One reward id with its assigned unlock score for this round.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RewardSlot {
    pub id: String,
    pub score: u32,
}

/// Complete game state. Single instance per running game; mutated only by
/// the tick driver.
#[derive(Debug, Clone)]
pub struct GameState {
    pub config: GameConfig,
    /// Run seed for reproducibility.
    pub seed: u64,
    pub(crate) rng: SimRng,

    pub phase: GamePhase,
    /// Station index; 0 is the drain.
    pub player_position: usize,
    /// Player is carrying a caught drop.
    pub bucket_filled: bool,

    pub score: u32,
    pub lives: u32,
    /// Best score across rounds; survives `request_start`.
    pub high_score: u32,
    /// Displayed flood level, rises as lives are lost.
    pub water_level: u32,

    /// Scales drop fall duration inversely; bumped on every landing.
    pub speed_factor: f64,
    /// Derived from the score table after every score change.
    pub max_concurrent_drops: u32,

    pub leaks: Vec<LeakState>,
    pub drops: Vec<Drop>,
    /// Per-column crack visibility, recomputed each tick.
    pub crack_warnings: Vec<bool>,

    pub reward_schedule: Vec<RewardSlot>,
    pub rewards_unlocked: Vec<String>,

    /// Most recent column that released a drop (anti-repeat heuristic).
    pub last_drop_column: Option<u8>,

    pub text_display: TextDisplay,
    pub bucket_dump: BucketDump,
    pub start_blink: Option<BlinkTimer>,
    pub game_over_blink: Option<BlinkTimer>,
    pub attract_blink_on: bool,
    pub attract_next_toggle: Millis,

    cues: Vec<Cue>,
    next_drop_id: u64,
}

impl GameState {
    /// Create a new game in the Attract phase with the given seed.
    pub fn new(config: GameConfig, seed: u64) -> Self {
        let leaks: Vec<LeakState> =
            config.leak_timing.iter().map(|t| LeakState::new(t.column)).collect();
        let columns = leaks.len();
        Self {
            player_position: config.start_position.min(columns),
            lives: config.max_lives,
            seed,
            rng: SimRng::seed_from_u64(seed),
            phase: GamePhase::Attract,
            bucket_filled: false,
            score: 0,
            high_score: 0,
            water_level: 0,
            speed_factor: 1.0,
            max_concurrent_drops: 1,
            leaks,
            drops: Vec::new(),
            crack_warnings: vec![false; columns],
            reward_schedule: Vec::new(),
            rewards_unlocked: Vec::new(),
            last_drop_column: None,
            text_display: TextDisplay { new: true, game: true, over: false },
            bucket_dump: BucketDump::default(),
            start_blink: None,
            game_over_blink: None,
            attract_blink_on: true,
            attract_next_toggle: 0.0,
            cues: Vec::new(),
            next_drop_id: 1,
            config,
        }
    }

    /// Reset everything per-round. The high score and RNG stream are the
    /// caller's to preserve.
    pub(crate) fn reset_round_state(&mut self) {
        self.phase = GamePhase::Attract;
        self.player_position = self.config.start_position.min(self.leaks.len());
        self.bucket_filled = false;
        self.score = 0;
        self.lives = self.config.max_lives;
        self.water_level = 0;
        self.speed_factor = 1.0;
        self.max_concurrent_drops = 1;
        for leak in &mut self.leaks {
            leak.reset_warning();
            leak.next_spawn_at = 0.0;
        }
        self.drops.clear();
        self.crack_warnings.fill(false);
        self.reward_schedule.clear();
        self.rewards_unlocked.clear();
        self.last_drop_column = None;
        self.text_display = TextDisplay { new: true, game: true, over: false };
        self.bucket_dump = BucketDump::default();
        self.start_blink = None;
        self.game_over_blink = None;
    }

    /// Allocate a drop id.
    pub(crate) fn next_drop_id(&mut self) -> u64 {
        let id = self.next_drop_id;
        self.next_drop_id += 1;
        id
    }

    pub(crate) fn push_cue(&mut self, cue: Cue) {
        self.cues.push(cue);
    }

    /// Take the cues buffered since the last drain, in emission order.
    pub(crate) fn drain_cues(&mut self) -> Vec<Cue> {
        std::mem::take(&mut self.cues)
    }

    pub fn active_drop_count(&self) -> usize {
        self.drops.len()
    }

    /// Number of stations the player can occupy.
    pub fn station_count(&self) -> usize {
        self.leaks.len() + 1
    }

    /// Read-only view for the renderer.
    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            phase: self.phase,
            player_position: self.player_position,
            bucket_filled: self.bucket_filled,
            lives: self.lives,
            score: self.score,
            high_score: self.high_score,
            water_level: self.water_level,
            speed_factor: self.speed_factor,
            max_concurrent_drops: self.max_concurrent_drops,
            drops: self
                .drops
                .iter()
                .map(|d| DropView { column: d.column, stage: d.stage })
                .collect(),
            crack_warnings: self.crack_warnings.clone(),
            rewards_unlocked: self.rewards_unlocked.clone(),
            text: self.text_display,
            bucket_dump_active: self.bucket_dump.active,
            bucket_dump_blink: self.bucket_dump.blink_on,
            attract_blink_on: self.attract_blink_on,
        }
    }
}

/// Column and stage of one in-flight drop, as the renderer sees it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DropView {
    pub column: u8,
    pub stage: u32,
}

/// Read-only state snapshot for external consumers. The renderer and
/// audio subsystem never mutate core state.
#[derive(Debug, Clone, Serialize)]
pub struct Snapshot {
    pub phase: GamePhase,
    pub player_position: usize,
    pub bucket_filled: bool,
    pub lives: u32,
    pub score: u32,
    pub high_score: u32,
    pub water_level: u32,
    pub speed_factor: f64,
    pub max_concurrent_drops: u32,
    pub drops: Vec<DropView>,
    pub crack_warnings: Vec<bool>,
    pub rewards_unlocked: Vec<String>,
    pub text: TextDisplay,
    pub bucket_dump_active: bool,
    pub bucket_dump_blink: bool,
    pub attract_blink_on: bool,
}
