use async_trait::async_trait;
use chrono::{DateTime, Utc};

use super::client::TradeStore;
use crate::analytics::{TradePage, TradeQuery, paginate};
use crate::error::StoreError;
use crate::models::{AnalyticsSettings, Trade};

/// Trade store over an already loaded collection.
#[derive(Debug, Clone, Default)]
pub struct MemoryTradeStore {
    trades: Vec<Trade>,
    settings: AnalyticsSettings,
}

impl MemoryTradeStore {
    pub fn new(trades: Vec<Trade>) -> Self {
        Self {
            trades,
            settings: AnalyticsSettings::default(),
        }
    }

    pub fn with_settings(mut self, settings: AnalyticsSettings) -> Self {
        self.settings = settings;
        self
    }

    fn owned_by(&self, user_id: &str) -> Vec<Trade> {
        self.trades
            .iter()
            .filter(|t| t.user_id == user_id)
            .cloned()
            .collect()
    }
}

#[async_trait]
impl TradeStore for MemoryTradeStore {
    fn store_name(&self) -> &str {
        "memory"
    }

    async fn fetch_trades(
        &self,
        user_id: &str,
        query: &TradeQuery,
    ) -> Result<Vec<Trade>, StoreError> {
        Ok(query.select(&self.owned_by(user_id)))
    }

    async fn list_trades(
        &self,
        user_id: &str,
        query: &TradeQuery,
        cursor: Option<DateTime<Utc>>,
        page_size: usize,
    ) -> Result<TradePage, StoreError> {
        Ok(paginate(&self.owned_by(user_id), query, cursor, page_size))
    }

    async fn settings(&self) -> Result<AnalyticsSettings, StoreError> {
        Ok(self.settings.clone())
    }
}
