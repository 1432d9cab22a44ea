//! Deterministic simulation module
//!
//! All gameplay logic lives here. This module must be pure and deterministic:
//! - Driven only by externally supplied monotonic timestamps
//! - Seeded RNG only, owned by the state
//! - No rendering, audio, or platform dependencies

pub mod difficulty;
pub mod drops;
pub mod leak;
pub mod rewards;
pub mod rng;
pub mod state;
pub mod tick;

pub use rng::SimRng;
pub use state::{
    BlinkTimer, BucketDump, Cue, Drop, DropView, GamePhase, GameState, LeakState, RewardSlot,
    Snapshot, TextDisplay, WarningPhase,
};
pub use tick::tick;
