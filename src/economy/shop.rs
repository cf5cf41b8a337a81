//! Booster and Background Store
//!
//! Purchase flows on top of the ledger. Each flow checks affordability and
//! ownership first, then performs the spend and the grant as separate ledger
//! mutations.

use serde::Serialize;
use tracing::info;

use crate::economy::catalog::{self, BackgroundCatalogEntry, BoosterKind};
use crate::economy::ledger::{Ledger, LedgerError};
use crate::economy::store::SaveLoad;

/// One background as shown in the store grid.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct BackgroundListing {
    /// Catalog entry
    pub entry: &'static BackgroundCatalogEntry,
    /// Already unlocked
    pub owned: bool,
    /// Currently active
    pub selected: bool,
    /// Balance covers the price
    pub affordable: bool,
}

/// One booster as shown in the booster store.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct BoosterListing {
    /// Booster type
    pub kind: BoosterKind,
    /// Price in points
    pub price: i64,
    /// Inventory
    pub owned: u32,
    /// Balance covers the price
    pub affordable: bool,
}

impl<S: SaveLoad> Ledger<S> {
    /// Background catalog with the player's ownership state.
    pub fn background_listings(&self) -> Vec<BackgroundListing> {
        let economy = self.economy();
        catalog::backgrounds()
            .iter()
            .map(|entry| BackgroundListing {
                entry,
                owned: economy.owns_background(entry.id),
                selected: economy.selected_background_id == entry.id,
                affordable: economy.points >= entry.price,
            })
            .collect()
    }

    /// Booster products with prices and inventory.
    pub fn booster_listings(&self) -> Vec<BoosterListing> {
        BoosterKind::ALL
            .iter()
            .map(|&kind| {
                let price = kind.price(self.config());
                BoosterListing {
                    kind,
                    price,
                    owned: self.booster_count(kind),
                    affordable: self.points() >= price,
                }
            })
            .collect()
    }

    /// Buy one booster.
    pub fn buy_booster(&mut self, kind: BoosterKind) -> Result<(), LedgerError> {
        let price = kind.price(self.config());
        self.try_spend_points(price)?;
        self.grant_booster(kind)?;

        info!(?kind, price, points = self.points(), "Booster bought");
        Ok(())
    }

    /// Buy a background and make it active.
    pub fn buy_background(&mut self, id: u32) -> Result<(), LedgerError> {
        let entry = catalog::background(id).ok_or(LedgerError::UnknownBackground(id))?;
        if self.owns_background(id) {
            return Err(LedgerError::AlreadyOwned(id));
        }

        self.try_spend_points(entry.price)?;
        self.purchase_background(id)?;
        self.select_background(id)?;

        info!(id, name = entry.name, price = entry.price, points = self.points(), "Background bought");
        Ok(())
    }

    /// Make an owned catalog background active.
    pub fn choose_background(&mut self, id: u32) -> Result<(), LedgerError> {
        if catalog::background(id).is_none() {
            return Err(LedgerError::UnknownBackground(id));
        }
        self.try_select_background(id)
    }
}
