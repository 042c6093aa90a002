pub mod breakdown;
pub mod equity;
pub mod filter;
pub mod portfolio;
pub mod service;
pub mod stats;
pub mod time_buckets;

pub use breakdown::*;
pub use equity::*;
pub use filter::*;
pub use portfolio::*;
pub use service::*;
pub use stats::*;
pub use time_buckets::*;

#[cfg(test)]
pub(crate) mod test_support {
    use std::sync::atomic::{AtomicI64, Ordering};

    use chrono::{DateTime, Utc};

    use crate::models::{Direction, Trade, TradeDate, TradeStatus};

    static SEQUENCE: AtomicI64 = AtomicI64::new(0);

    pub fn date(s: &str) -> TradeDate {
        s.parse().expect("valid test date")
    }

    pub fn timestamp(s: &str) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(s)
            .expect("valid test timestamp")
            .with_timezone(&Utc)
    }

    /// Trades built one after another get increasing created_at values on
    /// their trade_date, so same-day order follows construction order.
    pub fn trade(trade_date: &str, status: TradeStatus, pnl: Option<f64>) -> Trade {
        let trade_date = date(trade_date);
        let seq = SEQUENCE.fetch_add(1, Ordering::SeqCst);
        let created_at = trade_date
            .date()
            .and_hms_opt(0, 0, 0)
            .map(|midnight| midnight.and_utc() + chrono::Duration::milliseconds(seq));

        Trade {
            id: uuid::Uuid::new_v4().to_string(),
            user_id: "user-1".to_string(),
            pair: "BTCUSDT".to_string(),
            direction: Direction::Long,
            status,
            trade_date,
            created_at,
            closed_at: None,
            pnl,
            rr_ratio: None,
            emotion: None,
            setup: None,
            mistakes: Vec::new(),
        }
    }

    pub fn closed(trade_date: &str, pnl: Option<f64>) -> Trade {
        trade(trade_date, TradeStatus::Closed, pnl)
    }

    pub fn open(trade_date: &str, pnl: Option<f64>) -> Trade {
        trade(trade_date, TradeStatus::Open, pnl)
    }

    pub fn with_created_at(mut trade: Trade, created_at: &str) -> Trade {
        trade.created_at = Some(timestamp(created_at));
        trade
    }
}
