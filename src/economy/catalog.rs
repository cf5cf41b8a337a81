//! Static Store Catalog
//!
//! Backgrounds and boosters offered in the store. Built into the binary and
//! never mutated at runtime.

use serde::{Serialize, Deserialize};

use crate::config::EconomyConfig;

/// Identifier of the free background every player owns.
pub const DEFAULT_BACKGROUND_ID: u32 = 0;

/// Image shown when the selected id is not in the catalog.
pub const DEFAULT_BACKGROUND_IMAGE: &str = "background_default";

/// A purchasable race background.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct BackgroundCatalogEntry {
    /// Unique id (0 = free default)
    pub id: u32,
    /// Display name
    pub name: &'static str,
    /// Price in points
    pub price: i64,
    /// Asset name for the renderer
    pub image_ref: &'static str,
}

/// All backgrounds, ordered by id and price.
pub static BACKGROUNDS: [BackgroundCatalogEntry; 8] = [
    BackgroundCatalogEntry { id: 0, name: "Default", price: 0, image_ref: DEFAULT_BACKGROUND_IMAGE },
    BackgroundCatalogEntry { id: 1, name: "Beach", price: 50, image_ref: "Beach" },
    BackgroundCatalogEntry { id: 2, name: "Forest", price: 100, image_ref: "Forest" },
    BackgroundCatalogEntry { id: 3, name: "Dungeon", price: 150, image_ref: "Dungeon" },
    BackgroundCatalogEntry { id: 4, name: "Castle", price: 200, image_ref: "Castle" },
    BackgroundCatalogEntry { id: 5, name: "Mountains", price: 300, image_ref: "Mountains" },
    BackgroundCatalogEntry { id: 6, name: "Farm", price: 400, image_ref: "Farm" },
    BackgroundCatalogEntry { id: 7, name: "Sea", price: 500, image_ref: "Sea" },
];

/// The full background catalog.
pub fn backgrounds() -> &'static [BackgroundCatalogEntry] {
    &BACKGROUNDS
}

/// Look up a background by id.
pub fn background(id: u32) -> Option<&'static BackgroundCatalogEntry> {
    BACKGROUNDS.iter().find(|entry| entry.id == id)
}

/// Consumable booster types.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BoosterKind {
    /// Doubles the reward of one won race.
    DoublePoints,
    /// Forces the chosen racer to win one race.
    GuaranteedWin,
}

impl BoosterKind {
    /// Both booster kinds, in store order.
    pub const ALL: [BoosterKind; 2] = [BoosterKind::DoublePoints, BoosterKind::GuaranteedWin];

    /// Store title.
    pub fn title(self) -> &'static str {
        match self {
            BoosterKind::DoublePoints => "x2 Multiplier",
            BoosterKind::GuaranteedWin => "100% Win",
        }
    }

    /// Store description.
    pub fn description(self) -> &'static str {
        match self {
            BoosterKind::DoublePoints => "Double your race reward",
            BoosterKind::GuaranteedWin => "Guarantees your chicken wins",
        }
    }

    /// Price under the given economy settings.
    pub fn price(self, config: &EconomyConfig) -> i64 {
        match self {
            BoosterKind::DoublePoints => config.x2_booster_price,
            BoosterKind::GuaranteedWin => config.guaranteed_booster_price,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;

    #[test]
    fn test_catalog_shape() {
        assert_eq!(backgrounds().len(), 8);

        let ids: BTreeSet<u32> = backgrounds().iter().map(|b| b.id).collect();
        assert_eq!(ids.len(), 8, "ids must be unique");

        let default = background(DEFAULT_BACKGROUND_ID).unwrap();
        assert_eq!(default.price, 0);
        assert_eq!(default.image_ref, DEFAULT_BACKGROUND_IMAGE);
    }

    #[test]
    fn test_catalog_lookup() {
        assert_eq!(background(2).unwrap().name, "Forest");
        assert_eq!(background(2).unwrap().price, 100);
        assert!(background(8).is_none());
    }

    #[test]
    fn test_booster_prices() {
        let config = EconomyConfig::default();
        assert_eq!(BoosterKind::DoublePoints.price(&config), 50);
        assert_eq!(BoosterKind::GuaranteedWin.price(&config), 40);
    }
}
