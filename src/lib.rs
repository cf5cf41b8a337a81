//! # Chicken Race
//!
//! Race resolution and player economy engine for the Chicken Race game.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                       CHICKEN RACE                           │
//! ├─────────────────────────────────────────────────────────────┤
//! │  core/           - Primitives                                │
//! │  └── rng.rs      - Seedable Xorshift128+ random source       │
//! │                                                              │
//! │  economy/        - Persistent player economy                 │
//! │  ├── catalog.rs  - Backgrounds and boosters for sale         │
//! │  ├── ledger.rs   - Points, boosters, cosmetics, statistics   │
//! │  ├── shop.rs     - Guarded purchase flows                    │
//! │  ├── stats.rs    - Statistics snapshot                       │
//! │  └── store.rs    - SaveLoad capability and backends          │
//! │                                                              │
//! │  race/           - Race state machine                        │
//! │  ├── session.rs  - Racers, durations, phases                 │
//! │  └── engine.rs   - Start, settle, rewards                    │
//! │                                                              │
//! │  config.rs       - Tunable race and economy settings         │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Execution Model
//!
//! Everything runs on one logical thread. The engine borrows the ledger
//! mutably for each start and settle, so ledger mutations are serialized by
//! the borrow checker. The wait between start and settle is owned by the
//! caller.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(unsafe_code)]

pub mod config;
pub mod core;
pub mod economy;
pub mod race;

// Re-export commonly used types
pub use config::{EconomyConfig, GameConfig, RaceConfig};
pub use self::core::rng::{DeterministicRng, RandomSource};
pub use economy::{BoosterKind, JsonFileStore, Ledger, LedgerError, MemoryStore, SaveLoad};
pub use race::{BoosterFlags, RaceEngine, RaceError, RaceOutcome, RaceStart, RacerId};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Fastest possible finish time (seconds)
pub const MIN_RACE_DURATION: f64 = 3.0;

/// Slowest possible finish time (seconds)
pub const MAX_RACE_DURATION: f64 = 20.0;

/// Opponent floor under a guaranteed-win booster (seconds)
pub const GUARANTEED_OPPONENT_MIN_DURATION: f64 = 4.0;

/// Points for a won race before the x2 booster
pub const BASE_REWARD: i64 = 50;
