//! Performance analytics over a trading journal.
//!
//! Trades are read through a [`store::TradeStore`] (SQLite or in-memory) and
//! summarized by the pure engines in [`analytics`]. [`analytics::TradeAnalytics`]
//! ties the two together for a single user.

pub mod analytics;
pub mod db;
pub mod error;
pub mod models;
pub mod store;

pub use analytics::{Dashboard, DateRange, DateRangePreset, TradeAnalytics, TradeQuery};
pub use db::SqliteTradeStore;
pub use error::{AnalyticsError, StoreError};
pub use models::{AnalyticsSettings, Trade, TradeDate};
pub use store::{MemoryTradeStore, TradeStore};
