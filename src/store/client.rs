use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::analytics::{DateRange, TradePage, TradeQuery};
use crate::error::StoreError;
use crate::models::{AnalyticsSettings, Trade};

/// Read-only source of trade records that every adapter implements.
#[async_trait]
pub trait TradeStore: Send + Sync {
    /// Adapter name for log lines (e.g. "sqlite", "memory")
    fn store_name(&self) -> &str;

    /// Trades of `user_id` matching `query`, ascending by (trade_date, created_at)
    async fn fetch_trades(
        &self,
        user_id: &str,
        query: &TradeQuery,
    ) -> Result<Vec<Trade>, StoreError>;

    /// One listing page, newest first, continuing below `cursor`
    async fn list_trades(
        &self,
        user_id: &str,
        query: &TradeQuery,
        cursor: Option<DateTime<Utc>>,
        page_size: usize,
    ) -> Result<TradePage, StoreError>;

    /// Analytics settings backing this store
    async fn settings(&self) -> Result<AnalyticsSettings, StoreError>;

    /// Closed trades inside `range`, ascending
    async fn get_closed_trades(
        &self,
        user_id: &str,
        range: &DateRange,
    ) -> Result<Vec<Trade>, StoreError> {
        self.fetch_trades(user_id, &TradeQuery::closed_in(range.clone()))
            .await
    }
}
