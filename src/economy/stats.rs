//! Statistics snapshot for the stats screen.

use serde::Serialize;

use crate::economy::catalog;
use crate::economy::ledger::PlayerEconomy;

/// Read-only view of the player's progress.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Statistics {
    /// Races played
    pub total_races: u32,
    /// Races won
    pub wins: u32,
    /// Races lost
    pub losses: u32,
    /// x2 boosters owned
    pub x2_boosters: u32,
    /// Guaranteed-win boosters owned
    pub guaranteed_boosters: u32,
    /// Backgrounds bought (the free default is not counted)
    pub backgrounds_purchased: usize,
    /// Name of the active background, if it is in the catalog
    pub current_background: Option<&'static str>,
}

impl Statistics {
    /// Build a snapshot from the economy.
    pub fn from_economy(economy: &PlayerEconomy) -> Self {
        Self {
            total_races: economy.total_races,
            wins: economy.wins,
            losses: economy.losses,
            x2_boosters: economy.x2_boosters,
            guaranteed_boosters: economy.guaranteed_boosters,
            backgrounds_purchased: economy.purchased_background_ids.len(),
            current_background: catalog::background(economy.selected_background_id)
                .map(|entry| entry.name),
        }
    }

    /// Fraction of races won, or `None` before the first race.
    pub fn win_rate(&self) -> Option<f64> {
        if self.total_races == 0 {
            None
        } else {
            Some(f64::from(self.wins) / f64::from(self.total_races))
        }
    }
}
