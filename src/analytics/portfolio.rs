//! Portfolio snapshot composed from the other engines.
//!
//! Totals and position counts cover every trade, open or closed. Performance
//! figures (stats, drawdown, streaks, active days) cover closed trades only.

use serde::{Deserialize, Serialize};

use super::equity::analyze_equity;
use super::stats::{TradeStats, calculate_trade_stats};
use crate::models::{Trade, TradeDate};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PortfolioSummary {
    pub total_trades: usize,
    pub open_positions: usize,
    pub closed_positions: usize,
    pub total_pnl: f64,
    pub open_pnl: f64,
    pub closed_pnl: f64,
    pub stats: TradeStats,
    pub max_drawdown: f64,
    pub max_drawdown_pct: f64,
    pub current_drawdown: f64,
    pub current_streak: i64,
    pub longest_win_streak: u64,
    pub longest_loss_streak: u64,
    pub first_trade_date: Option<TradeDate>,
    pub last_trade_date: Option<TradeDate>,
    pub active_days: usize,
}

pub fn portfolio_summary(trades: &[Trade]) -> PortfolioSummary {
    let (closed, open): (Vec<&Trade>, Vec<&Trade>) = trades.iter().partition(|t| t.is_closed());

    let open_pnl: f64 = open.iter().map(|t| t.pnl_or_zero()).sum();
    let closed_pnl: f64 = closed.iter().map(|t| t.pnl_or_zero()).sum();

    let first_trade_date = trades.iter().map(|t| &t.trade_date).min().cloned();
    let last_trade_date = trades.iter().map(|t| &t.trade_date).max().cloned();

    let stats = calculate_trade_stats(closed.iter().copied());
    let equity = analyze_equity(closed.iter().copied());

    log::debug!(
        "portfolio summary: {} trades ({} open, {} closed)",
        trades.len(),
        open.len(),
        closed.len()
    );

    PortfolioSummary {
        total_trades: trades.len(),
        open_positions: open.len(),
        closed_positions: closed.len(),
        total_pnl: open_pnl + closed_pnl,
        open_pnl,
        closed_pnl,
        stats,
        max_drawdown: equity.drawdown.max_drawdown,
        max_drawdown_pct: equity.drawdown.max_drawdown_pct,
        current_drawdown: equity.drawdown.current_drawdown,
        current_streak: equity.streaks.current_streak,
        longest_win_streak: equity.streaks.longest_win_streak,
        longest_loss_streak: equity.streaks.longest_loss_streak,
        first_trade_date,
        last_trade_date,
        active_days: equity.active_days,
    }
}
