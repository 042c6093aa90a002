use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::MutexGuard;

use crate::analytics::{TradePage, TradeQuery, next_cursor};
use crate::db::Database;
use crate::error::StoreError;
use crate::models::{
    AnalyticsSettings, Direction, Emotion, Trade, TradeDate, TradeStatus, UpdateSettingsInput,
};
use crate::store::TradeStore;

const TRADE_COLUMNS: &str = "id, user_id, pair, direction, status, trade_date, \
     created_at, closed_at, pnl, rr_ratio, emotion, setup, mistakes";

/// Raw column values of a `trades` row, before validation.
struct TradeRow {
    id: String,
    user_id: String,
    pair: String,
    direction: String,
    status: String,
    trade_date: String,
    created_at: Option<i64>,
    closed_at: Option<i64>,
    pnl: Option<f64>,
    rr_ratio: Option<f64>,
    emotion: Option<String>,
    setup: Option<String>,
    mistakes: String,
}

/// Helper function to map a database row to its raw column values
fn map_row(row: &rusqlite::Row) -> rusqlite::Result<TradeRow> {
    Ok(TradeRow {
        id: row.get(0)?,
        user_id: row.get(1)?,
        pair: row.get(2)?,
        direction: row.get(3)?,
        status: row.get(4)?,
        trade_date: row.get(5)?,
        created_at: row.get(6)?,
        closed_at: row.get(7)?,
        pnl: row.get(8)?,
        rr_ratio: row.get(9)?,
        emotion: row.get(10)?,
        setup: row.get(11)?,
        mistakes: row.get(12)?,
    })
}

impl TradeRow {
    /// Rows that break the record contract are rejected, never defaulted.
    fn into_trade(self) -> Result<Trade, StoreError> {
        let id = self.id;
        let corrupt = |reason: String| StoreError::Corrupt {
            id: id.clone(),
            reason,
        };

        let timestamp = |millis: Option<i64>, column: &str| {
            millis
                .map(|ms| {
                    DateTime::<Utc>::from_timestamp_millis(ms)
                        .ok_or_else(|| corrupt(format!("{} out of range: {}", column, ms)))
                })
                .transpose()
        };

        let trade = Trade {
            user_id: self.user_id,
            pair: self.pair,
            direction: self.direction.parse::<Direction>().map_err(corrupt)?,
            status: self.status.parse::<TradeStatus>().map_err(corrupt)?,
            trade_date: self
                .trade_date
                .parse::<TradeDate>()
                .map_err(|e| corrupt(e.to_string()))?,
            created_at: timestamp(self.created_at, "created_at")?,
            closed_at: timestamp(self.closed_at, "closed_at")?,
            pnl: self.pnl,
            rr_ratio: self.rr_ratio,
            emotion: self
                .emotion
                .map(|e| e.parse::<Emotion>())
                .transpose()
                .map_err(corrupt)?,
            setup: self.setup,
            mistakes: serde_json::from_str(&self.mistakes)
                .map_err(|e| corrupt(format!("mistakes is not a JSON string array: {}", e)))?,
            id: id.clone(),
        };
        Ok(trade)
    }
}

/// Builds the WHERE clause for `user_id` and `query`.
fn where_clause(user_id: &str, query: &TradeQuery) -> (String, Vec<Box<dyn rusqlite::ToSql>>) {
    let mut conditions = vec!["user_id = ?"];
    let mut params: Vec<Box<dyn rusqlite::ToSql>> = vec![Box::new(user_id.to_string())];

    if let Some(status) = query.status {
        conditions.push("status = ?");
        params.push(Box::new(status.as_str()));
    }
    if let Some(pair) = &query.pair {
        conditions.push("pair = ?");
        params.push(Box::new(pair.clone()));
    }
    if let Some(direction) = query.direction {
        conditions.push("direction = ?");
        params.push(Box::new(direction.as_str()));
    }
    // trade_date is always zero-padded ISO text, so string comparison orders by date
    if let Some(from) = &query.range.from {
        conditions.push("trade_date >= ?");
        params.push(Box::new(from.as_str().to_string()));
    }
    if let Some(to) = &query.range.to {
        conditions.push("trade_date <= ?");
        params.push(Box::new(to.as_str().to_string()));
    }

    (conditions.join(" AND "), params)
}

/// Trade store backed by the journal's SQLite database.
pub struct SqliteTradeStore {
    db: Database,
}

impl SqliteTradeStore {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    pub fn open(db_path: &str) -> Result<Self, StoreError> {
        log::info!("Opening trade store at {}", db_path);
        Ok(Self::new(Database::open(db_path)?))
    }

    pub fn open_in_memory() -> Result<Self, StoreError> {
        Ok(Self::new(Database::open_in_memory()?))
    }

    fn conn(&self) -> Result<MutexGuard<'_, rusqlite::Connection>, StoreError> {
        self.db
            .conn
            .lock()
            .map_err(|e| StoreError::Unavailable(e.to_string()))
    }

    fn query_trades(
        &self,
        sql: &str,
        params: Vec<Box<dyn rusqlite::ToSql>>,
    ) -> Result<Vec<Trade>, StoreError> {
        let conn = self.conn()?;
        let param_refs: Vec<&dyn rusqlite::ToSql> = params.iter().map(|p| p.as_ref()).collect();
        let mut stmt = conn.prepare(sql)?;
        let rows = stmt.query_map(param_refs.as_slice(), map_row)?;

        let mut trades = Vec::new();
        for row in rows {
            trades.push(row?.into_trade()?);
        }
        Ok(trades)
    }

    pub fn update_settings(
        &self,
        settings: UpdateSettingsInput,
    ) -> Result<AnalyticsSettings, StoreError> {
        {
            let conn = self.conn()?;

            // Build dynamic UPDATE query
            let mut updates = Vec::new();
            let mut values: Vec<Box<dyn rusqlite::ToSql>> = Vec::new();

            if let Some(val) = settings.page_size {
                updates.push("page_size = ?");
                values.push(Box::new(val));
            }
            if let Some(val) = settings.utc_offset_minutes {
                updates.push("utc_offset_minutes = ?");
                values.push(Box::new(val));
            }

            updates.push("updated_at = strftime('%s', 'now')");

            let query = format!("UPDATE settings SET {} WHERE id = 1", updates.join(", "));
            let params: Vec<&dyn rusqlite::ToSql> = values.iter().map(|v| v.as_ref()).collect();

            conn.execute(&query, params.as_slice())?;
        }

        self.read_settings()
    }

    fn read_settings(&self) -> Result<AnalyticsSettings, StoreError> {
        let conn = self.conn()?;
        let settings = conn.query_row(
            "SELECT page_size, utc_offset_minutes, updated_at FROM settings WHERE id = 1",
            [],
            |row| {
                Ok(AnalyticsSettings {
                    page_size: row.get(0)?,
                    utc_offset_minutes: row.get(1)?,
                    updated_at: row.get(2)?,
                })
            },
        )?;
        Ok(settings)
    }
}

#[async_trait]
impl TradeStore for SqliteTradeStore {
    fn store_name(&self) -> &str {
        "sqlite"
    }

    async fn fetch_trades(
        &self,
        user_id: &str,
        query: &TradeQuery,
    ) -> Result<Vec<Trade>, StoreError> {
        let (filter, params) = where_clause(user_id, query);
        let sql = format!(
            "SELECT {} FROM trades WHERE {} ORDER BY trade_date ASC, created_at ASC, id ASC",
            TRADE_COLUMNS, filter
        );
        let trades = self.query_trades(&sql, params)?;
        log::debug!("sqlite store: fetched {} trades for {}", trades.len(), user_id);
        Ok(trades)
    }

    async fn list_trades(
        &self,
        user_id: &str,
        query: &TradeQuery,
        cursor: Option<DateTime<Utc>>,
        page_size: usize,
    ) -> Result<TradePage, StoreError> {
        let page_size = page_size.max(1);
        let (mut filter, mut params) = where_clause(user_id, query);
        if let Some(cursor) = cursor {
            filter.push_str(" AND created_at < ?");
            params.push(Box::new(cursor.timestamp_millis()));
        }
        params.push(Box::new(page_size as i64));

        let sql = format!(
            "SELECT {} FROM trades WHERE {} \
             ORDER BY trade_date DESC, created_at DESC, id DESC LIMIT ?",
            TRADE_COLUMNS, filter
        );
        let trades = self.query_trades(&sql, params)?;

        Ok(TradePage {
            next_cursor: next_cursor(&trades, page_size),
            trades,
        })
    }

    async fn settings(&self) -> Result<AnalyticsSettings, StoreError> {
        self.read_settings()
    }
}
