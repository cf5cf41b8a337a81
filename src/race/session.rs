//! Race Session State
//!
//! One session per visit to the race screen.

use serde::{Serialize, Deserialize};
use uuid::Uuid;

/// One of the two racers on the track.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum RacerId {
    /// Top lane
    One = 1,
    /// Bottom lane
    Two = 2,
}

impl RacerId {
    /// Both racers, in lane order.
    pub const ALL: [RacerId; 2] = [RacerId::One, RacerId::Two];

    /// Racer from its lane number (1 or 2).
    pub fn from_number(number: u8) -> Option<RacerId> {
        match number {
            1 => Some(RacerId::One),
            2 => Some(RacerId::Two),
            _ => None,
        }
    }

    /// Lane number (1 or 2).
    #[inline]
    pub fn number(self) -> u8 {
        self as u8
    }

    /// The other racer.
    #[inline]
    pub fn opponent(self) -> RacerId {
        match self {
            RacerId::One => RacerId::Two,
            RacerId::Two => RacerId::One,
        }
    }
}

impl std::fmt::Display for RacerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "racer {}", self.number())
    }
}

/// Time each racer needs to finish. Lower is faster.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct RacerDurations {
    /// Racer 1 finish time (seconds)
    pub one: f64,
    /// Racer 2 finish time (seconds)
    pub two: f64,
}

impl RacerDurations {
    /// Duration for one racer.
    #[inline]
    pub fn get(&self, racer: RacerId) -> f64 {
        match racer {
            RacerId::One => self.one,
            RacerId::Two => self.two,
        }
    }

    /// Overwrite one racer's duration.
    #[inline]
    pub fn set(&mut self, racer: RacerId, duration: f64) {
        match racer {
            RacerId::One => self.one = duration,
            RacerId::Two => self.two = duration,
        }
    }

    /// Time until both racers have finished.
    pub fn slowest(&self) -> f64 {
        self.one.max(self.two)
    }

    /// Racer with the strictly smaller duration, `None` on a tie.
    pub fn leader(&self) -> Option<RacerId> {
        if self.one < self.two {
            Some(RacerId::One)
        } else if self.two < self.one {
            Some(RacerId::Two)
        } else {
            None
        }
    }
}

/// Booster toggles chosen before the start.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoosterFlags {
    /// Double the reward if the chosen racer wins
    pub use_double_points: bool,
    /// Force the chosen racer to win
    pub use_guaranteed_win: bool,
}

impl BoosterFlags {
    /// Flags from the two toggles.
    pub fn new(use_double_points: bool, use_guaranteed_win: bool) -> Self {
        Self { use_double_points, use_guaranteed_win }
    }
}

/// Race lifecycle phase.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum RacePhase {
    /// Picking a racer and boosters
    #[default]
    Selecting,
    /// Racers on the track, waiting for the finish
    Racing,
    /// Winner decided and rewards paid
    Settled,
}

/// State of one race.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RaceSession {
    /// Session id, for log correlation
    pub id: Uuid,
    /// Lifecycle phase
    pub phase: RacePhase,
    /// Player's champion
    pub selected_racer: Option<RacerId>,
    /// Finish times, set when the race starts
    pub racer_durations: RacerDurations,
    /// Toggles captured at the start, cleared on settlement
    pub boosters: BoosterFlags,
    /// An x2 booster was consumed for this race
    pub x2_applied: bool,
    /// A guaranteed-win booster was consumed for this race
    pub guaranteed_applied: bool,
    /// Winner, set on settlement
    pub winner: Option<RacerId>,
}

impl RaceSession {
    /// New session in the selecting phase.
    pub fn new() -> Self {
        Self {
            id: Uuid::new_v4(),
            phase: RacePhase::Selecting,
            selected_racer: None,
            racer_durations: RacerDurations::default(),
            boosters: BoosterFlags::default(),
            x2_applied: false,
            guaranteed_applied: false,
            winner: None,
        }
    }

    /// Whether the player's racer won. `None` until settled.
    pub fn did_win(&self) -> Option<bool> {
        match (self.winner, self.selected_racer) {
            (Some(winner), Some(selected)) => Some(winner == selected),
            _ => None,
        }
    }
}

impl Default for RaceSession {
    fn default() -> Self {
        Self::new()
    }
}
