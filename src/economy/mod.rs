//! Player Economy
//!
//! ## Module Structure
//!
//! - `catalog`: Static background and booster catalog
//! - `ledger`: Persistent points, boosters, cosmetics and statistics
//! - `shop`: Guarded purchase and selection flows
//! - `stats`: Statistics snapshot
//! - `store`: `SaveLoad` capability and storage backends

pub mod catalog;
pub mod ledger;
pub mod shop;
pub mod stats;
pub mod store;

// Re-export key types
pub use catalog::{BackgroundCatalogEntry, BoosterKind, BACKGROUNDS};
pub use ledger::{Ledger, LedgerError, PlayerEconomy};
pub use shop::{BackgroundListing, BoosterListing};
pub use stats::Statistics;
pub use store::{JsonFileStore, MemoryStore, PersistError, SaveLoad, StoredEconomy};
