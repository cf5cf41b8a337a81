//! Player Economy Ledger
//!
//! Owns the persistent player state: points, booster inventories, unlocked
//! backgrounds and race statistics. Every mutation writes the full state
//! through the injected [`SaveLoad`] store before returning.

use std::collections::BTreeSet;

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::config::EconomyConfig;
use crate::economy::catalog::{
    self, BackgroundCatalogEntry, BoosterKind, DEFAULT_BACKGROUND_ID, DEFAULT_BACKGROUND_IMAGE,
};
use crate::economy::stats::Statistics;
use crate::economy::store::{PersistError, SaveLoad, StoredEconomy};

// =============================================================================
// PLAYER ECONOMY
// =============================================================================

/// In-memory player economy.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct PlayerEconomy {
    /// Spendable currency. Only the unguarded spend path can push it below zero.
    pub points: i64,
    /// Races played (always `wins + losses`)
    pub total_races: u32,
    /// Races won
    pub wins: u32,
    /// Races lost
    pub losses: u32,
    /// Reward-doubling boosters owned
    pub x2_boosters: u32,
    /// Guaranteed-win boosters owned
    pub guaranteed_boosters: u32,
    /// Unlocked backgrounds. Never contains the default id.
    pub purchased_background_ids: BTreeSet<u32>,
    /// Active background
    pub selected_background_id: u32,
}

impl PlayerEconomy {
    /// Fresh economy with the configured starting balances.
    pub fn new(config: &EconomyConfig) -> Self {
        Self {
            points: config.starting_points,
            total_races: 0,
            wins: 0,
            losses: 0,
            x2_boosters: clamp_count(config.starting_x2_boosters),
            guaranteed_boosters: clamp_count(config.starting_guaranteed_boosters),
            purchased_background_ids: BTreeSet::new(),
            selected_background_id: DEFAULT_BACKGROUND_ID,
        }
    }

    /// Rebuild the economy from a stored record.
    ///
    /// Points and booster counts that are absent or stored as zero are
    /// replaced by the starting floor, so a player who really reached zero
    /// is topped back up. Returns the names of the substituted fields.
    pub fn from_stored(record: &StoredEconomy, config: &EconomyConfig) -> (Self, Vec<&'static str>) {
        let mut substituted = Vec::new();

        let points = match record.points {
            Some(points) if points != 0 => points,
            _ => {
                substituted.push("points");
                config.starting_points
            }
        };
        let x2_boosters = match record.x2_boosters {
            Some(count) if count > 0 => clamp_count(count),
            _ => {
                substituted.push("x2_boosters");
                clamp_count(config.starting_x2_boosters)
            }
        };
        let guaranteed_boosters = match record.guaranteed_boosters {
            Some(count) if count > 0 => clamp_count(count),
            _ => {
                substituted.push("guaranteed_boosters");
                clamp_count(config.starting_guaranteed_boosters)
            }
        };

        let wins = record.wins.map(clamp_count).unwrap_or(0);
        let losses = record.losses.map(clamp_count).unwrap_or(0);
        let total_races = wins.saturating_add(losses);
        if let Some(stored_total) = record.total_races {
            if stored_total != i64::from(total_races) {
                warn!(stored_total, wins, losses, "Stored race total disagrees with wins + losses, recomputing");
            }
        }

        let purchased_background_ids = record
            .purchased_background_ids
            .iter()
            .flatten()
            .copied()
            .filter(|&id| id != DEFAULT_BACKGROUND_ID)
            .collect();

        let economy = Self {
            points,
            total_races,
            wins,
            losses,
            x2_boosters,
            guaranteed_boosters,
            purchased_background_ids,
            selected_background_id: record.selected_background_id.unwrap_or(DEFAULT_BACKGROUND_ID),
        };

        (economy, substituted)
    }

    /// Flat record for persistence.
    pub fn to_stored(&self) -> StoredEconomy {
        StoredEconomy {
            points: Some(self.points),
            total_races: Some(i64::from(self.total_races)),
            wins: Some(i64::from(self.wins)),
            losses: Some(i64::from(self.losses)),
            x2_boosters: Some(i64::from(self.x2_boosters)),
            guaranteed_boosters: Some(i64::from(self.guaranteed_boosters)),
            purchased_background_ids: Some(self.purchased_background_ids.iter().copied().collect()),
            selected_background_id: Some(self.selected_background_id),
        }
    }

    /// Booster inventory for a kind.
    pub fn booster_count(&self, kind: BoosterKind) -> u32 {
        match kind {
            BoosterKind::DoublePoints => self.x2_boosters,
            BoosterKind::GuaranteedWin => self.guaranteed_boosters,
        }
    }

    fn booster_count_mut(&mut self, kind: BoosterKind) -> &mut u32 {
        match kind {
            BoosterKind::DoublePoints => &mut self.x2_boosters,
            BoosterKind::GuaranteedWin => &mut self.guaranteed_boosters,
        }
    }

    /// Whether a background is unlocked. The default is always owned.
    pub fn owns_background(&self, id: u32) -> bool {
        id == DEFAULT_BACKGROUND_ID || self.purchased_background_ids.contains(&id)
    }
}

fn clamp_count(value: i64) -> u32 {
    u32::try_from(value.max(0)).unwrap_or(u32::MAX)
}

// =============================================================================
// LEDGER ERRORS
// =============================================================================

/// Ledger errors.
#[derive(Debug, thiserror::Error)]
pub enum LedgerError {
    /// Balance does not cover the price.
    #[error("insufficient funds: need {needed}, have {available}")]
    InsufficientFunds {
        /// Price requested.
        needed: i64,
        /// Balance at the time of the request.
        available: i64,
    },

    /// Background has not been purchased.
    #[error("background {0} is not owned")]
    NotOwned(u32),

    /// Background was already purchased.
    #[error("background {0} is already owned")]
    AlreadyOwned(u32),

    /// Background id is not in the catalog.
    #[error("unknown background {0}")]
    UnknownBackground(u32),

    /// Write-through save failed. The in-memory change is kept.
    #[error("failed to persist economy: {0}")]
    Persist(#[from] PersistError),
}

// =============================================================================
// LEDGER
// =============================================================================

/// Persistent economy ledger.
///
/// All state changes go through these methods; each one that changes
/// anything saves the whole economy synchronously.
#[derive(Debug)]
pub struct Ledger<S: SaveLoad> {
    economy: PlayerEconomy,
    config: EconomyConfig,
    store: S,
}

impl<S: SaveLoad> Ledger<S> {
    /// Load the economy from `store`, applying starting floors.
    pub fn load(mut store: S, config: EconomyConfig) -> Result<Self, LedgerError> {
        let record = store.load()?;
        let (economy, substituted) = PlayerEconomy::from_stored(&record, &config);

        if !substituted.is_empty() {
            warn!(fields = ?substituted, "Absent or zero values replaced with starting floor");
        }
        info!(
            points = economy.points,
            total_races = economy.total_races,
            x2_boosters = economy.x2_boosters,
            guaranteed_boosters = economy.guaranteed_boosters,
            backgrounds = economy.purchased_background_ids.len(),
            "Economy loaded"
        );

        Ok(Self { economy, config, store })
    }

    /// Current economy state.
    pub fn economy(&self) -> &PlayerEconomy {
        &self.economy
    }

    /// Economy settings in effect.
    pub fn config(&self) -> &EconomyConfig {
        &self.config
    }

    /// Backing store.
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Current point balance.
    pub fn points(&self) -> i64 {
        self.economy.points
    }

    /// Booster inventory for a kind.
    pub fn booster_count(&self, kind: BoosterKind) -> u32 {
        self.economy.booster_count(kind)
    }

    fn persist(&mut self) -> Result<(), LedgerError> {
        self.store.save(&self.economy.to_stored())?;
        Ok(())
    }

    // -------------------------------------------------------------------------
    // Points
    // -------------------------------------------------------------------------

    /// Add points to the balance. Non-positive amounts are ignored.
    pub fn add_points(&mut self, amount: i64) -> Result<(), LedgerError> {
        if amount <= 0 {
            warn!(amount, "Ignoring non-positive point credit");
            return Ok(());
        }
        self.economy.points = self.economy.points.saturating_add(amount);
        debug!(amount, points = self.economy.points, "Points added");
        self.persist()
    }

    /// Deduct points without checking the balance.
    ///
    /// Callers must have verified `points >= amount`; use
    /// [`Ledger::try_spend_points`] otherwise.
    pub fn spend_points(&mut self, amount: i64) -> Result<(), LedgerError> {
        if amount <= 0 {
            warn!(amount, "Ignoring non-positive point debit");
            return Ok(());
        }
        self.economy.points = self.economy.points.saturating_sub(amount);
        debug!(amount, points = self.economy.points, "Points spent");
        self.persist()
    }

    /// Deduct points if the balance covers them.
    pub fn try_spend_points(&mut self, amount: i64) -> Result<(), LedgerError> {
        if self.economy.points < amount {
            return Err(LedgerError::InsufficientFunds {
                needed: amount,
                available: self.economy.points,
            });
        }
        self.spend_points(amount)
    }

    // -------------------------------------------------------------------------
    // Statistics
    // -------------------------------------------------------------------------

    /// Count a finished race.
    pub fn record_race_outcome(&mut self, did_win: bool) -> Result<(), LedgerError> {
        self.economy.total_races = self.economy.total_races.saturating_add(1);
        if did_win {
            self.economy.wins = self.economy.wins.saturating_add(1);
        } else {
            self.economy.losses = self.economy.losses.saturating_add(1);
        }
        debug!(
            did_win,
            total_races = self.economy.total_races,
            wins = self.economy.wins,
            losses = self.economy.losses,
            "Race outcome recorded"
        );
        self.persist()
    }

    /// Count a settled race and credit its reward with a single save.
    ///
    /// Both changes stay in memory if the save fails, so the next
    /// successful save writes the win and its payout together.
    pub fn record_settlement(&mut self, did_win: bool, reward: i64) -> Result<(), LedgerError> {
        self.economy.total_races = self.economy.total_races.saturating_add(1);
        if did_win {
            self.economy.wins = self.economy.wins.saturating_add(1);
        } else {
            self.economy.losses = self.economy.losses.saturating_add(1);
        }
        if reward > 0 {
            self.economy.points = self.economy.points.saturating_add(reward);
        }
        debug!(
            did_win,
            reward,
            points = self.economy.points,
            total_races = self.economy.total_races,
            "Settlement recorded"
        );
        self.persist()
    }

    /// Snapshot for the statistics screen.
    pub fn statistics(&self) -> Statistics {
        Statistics::from_economy(&self.economy)
    }

    // -------------------------------------------------------------------------
    // Boosters
    // -------------------------------------------------------------------------

    /// Use one booster of `kind`.
    ///
    /// Returns `false` and leaves the store untouched when none are owned.
    pub fn consume_booster(&mut self, kind: BoosterKind) -> Result<bool, LedgerError> {
        let count = self.economy.booster_count_mut(kind);
        if *count == 0 {
            debug!(?kind, "No booster to consume");
            return Ok(false);
        }
        *count -= 1;
        let remaining = *count;
        debug!(?kind, remaining, "Booster consumed");
        self.persist()?;
        Ok(true)
    }

    /// Add one booster of `kind` to the inventory.
    pub fn grant_booster(&mut self, kind: BoosterKind) -> Result<(), LedgerError> {
        let count = self.economy.booster_count_mut(kind);
        *count = count.saturating_add(1);
        let owned = *count;
        debug!(?kind, owned, "Booster granted");
        self.persist()
    }

    /// Use one x2 booster if any are owned.
    pub fn consume_x2_booster(&mut self) -> Result<bool, LedgerError> {
        self.consume_booster(BoosterKind::DoublePoints)
    }

    /// Use one guaranteed-win booster if any are owned.
    pub fn consume_guaranteed_booster(&mut self) -> Result<bool, LedgerError> {
        self.consume_booster(BoosterKind::GuaranteedWin)
    }

    /// Add one x2 booster.
    pub fn grant_x2_booster(&mut self) -> Result<(), LedgerError> {
        self.grant_booster(BoosterKind::DoublePoints)
    }

    /// Add one guaranteed-win booster.
    pub fn grant_guaranteed_booster(&mut self) -> Result<(), LedgerError> {
        self.grant_booster(BoosterKind::GuaranteedWin)
    }

    /// Take the boosters a race start asked for, saving once.
    ///
    /// Returns `(x2_applied, guaranteed_applied)`. A kind with no inventory
    /// is skipped. If the save fails the inventory is restored, so a failed
    /// start never spends anything.
    pub fn consume_race_boosters(
        &mut self,
        x2: bool,
        guaranteed: bool,
    ) -> Result<(bool, bool), LedgerError> {
        let x2_applied = x2 && self.economy.x2_boosters > 0;
        let guaranteed_applied = guaranteed && self.economy.guaranteed_boosters > 0;
        if !x2_applied && !guaranteed_applied {
            return Ok((false, false));
        }

        let before = (self.economy.x2_boosters, self.economy.guaranteed_boosters);
        if x2_applied {
            self.economy.x2_boosters -= 1;
        }
        if guaranteed_applied {
            self.economy.guaranteed_boosters -= 1;
        }

        if let Err(err) = self.persist() {
            (self.economy.x2_boosters, self.economy.guaranteed_boosters) = before;
            warn!(error = %err, "Race boosters restored after failed save");
            return Err(err);
        }
        debug!(
            x2_applied,
            guaranteed_applied,
            x2_remaining = self.economy.x2_boosters,
            guaranteed_remaining = self.economy.guaranteed_boosters,
            "Race boosters consumed"
        );
        Ok((x2_applied, guaranteed_applied))
    }

    // -------------------------------------------------------------------------
    // Backgrounds
    // -------------------------------------------------------------------------

    /// Whether a background is unlocked.
    pub fn owns_background(&self, id: u32) -> bool {
        self.economy.owns_background(id)
    }

    /// Unlock a background without charging for it.
    ///
    /// Returns `false` if it was already owned.
    pub fn purchase_background(&mut self, id: u32) -> Result<bool, LedgerError> {
        if self.economy.owns_background(id) {
            debug!(id, "Background already owned");
            return Ok(false);
        }
        self.economy.purchased_background_ids.insert(id);
        debug!(id, "Background unlocked");
        self.persist()?;
        Ok(true)
    }

    /// Set the active background without an ownership check.
    pub fn select_background(&mut self, id: u32) -> Result<(), LedgerError> {
        self.economy.selected_background_id = id;
        debug!(id, "Background selected");
        self.persist()
    }

    /// Set the active background if it is owned.
    pub fn try_select_background(&mut self, id: u32) -> Result<(), LedgerError> {
        if !self.economy.owns_background(id) {
            return Err(LedgerError::NotOwned(id));
        }
        self.select_background(id)
    }

    /// Catalog entry of the active background, falling back to the default.
    pub fn selected_background(&self) -> &'static BackgroundCatalogEntry {
        catalog::background(self.economy.selected_background_id)
            .unwrap_or(&catalog::BACKGROUNDS[0])
    }

    /// Image to draw behind every screen.
    pub fn selected_background_image(&self) -> &'static str {
        catalog::background(self.economy.selected_background_id)
            .map(|entry| entry.image_ref)
            .unwrap_or(DEFAULT_BACKGROUND_IMAGE)
    }
}

// =============================================================================
// TESTS
// =============================================================================
