//! Race Logic
//!
//! - `session`: Racer ids, durations, booster toggles and session phase
//! - `engine`: Start/settle state machine and reward settlement

pub mod engine;
pub mod session;

// Re-export key types
pub use engine::{RaceEngine, RaceError, RaceOutcome, RaceStart};
pub use session::{BoosterFlags, RacePhase, RaceSession, RacerDurations, RacerId};
