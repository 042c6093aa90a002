//! Core metrics over a set of closed trades.
//!
//! Every ratio has a zero default: an empty set yields all-zero stats and no
//! computation divides by zero. A trade without pnl counts as 0 in every sum
//! and is classified breakeven.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::models::{Outcome, Trade};

/// Gross profit over gross loss magnitude.
///
/// `Unbounded` stands in for an infinite ratio (wins with no losses) so the
/// value never leaks infinity or NaN. Serialized as a plain number or the
/// string `"unbounded"`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "ProfitFactorRepr", into = "ProfitFactorRepr")]
pub enum ProfitFactor {
    Finite(f64),
    Unbounded,
}

const UNBOUNDED_MARKER: &str = "unbounded";

#[derive(Clone, Serialize, Deserialize)]
#[serde(untagged)]
enum ProfitFactorRepr {
    Finite(f64),
    Marker(String),
}

impl TryFrom<ProfitFactorRepr> for ProfitFactor {
    type Error = String;

    fn try_from(value: ProfitFactorRepr) -> Result<Self, Self::Error> {
        match value {
            ProfitFactorRepr::Finite(v) => Ok(ProfitFactor::Finite(v)),
            ProfitFactorRepr::Marker(m) if m == UNBOUNDED_MARKER => Ok(ProfitFactor::Unbounded),
            ProfitFactorRepr::Marker(m) => Err(format!("invalid profit factor: {}", m)),
        }
    }
}

impl From<ProfitFactor> for ProfitFactorRepr {
    fn from(value: ProfitFactor) -> Self {
        match value {
            ProfitFactor::Finite(v) => ProfitFactorRepr::Finite(v),
            ProfitFactor::Unbounded => ProfitFactorRepr::Marker(UNBOUNDED_MARKER.to_string()),
        }
    }
}

impl ProfitFactor {
    pub fn from_totals(gross_profit: f64, gross_loss: f64) -> Self {
        if gross_loss > 0.0 {
            ProfitFactor::Finite(gross_profit / gross_loss)
        } else if gross_profit > 0.0 {
            ProfitFactor::Unbounded
        } else {
            ProfitFactor::Finite(0.0)
        }
    }

    pub fn is_unbounded(&self) -> bool {
        matches!(self, ProfitFactor::Unbounded)
    }

    /// Finite value, `None` when unbounded.
    pub fn finite(&self) -> Option<f64> {
        match self {
            ProfitFactor::Finite(v) => Some(*v),
            ProfitFactor::Unbounded => None,
        }
    }
}

impl Default for ProfitFactor {
    fn default() -> Self {
        ProfitFactor::Finite(0.0)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TradeStats {
    pub total_trades: usize,
    pub win_count: usize,
    pub loss_count: usize,
    pub breakeven_count: usize,
    pub win_rate: f64,
    pub total_pnl: f64,
    pub avg_pnl: f64,
    pub avg_rr: f64,
    pub best_trade: f64,
    pub worst_trade: f64,
    pub profit_factor: ProfitFactor,
    pub avg_win: f64,
    pub avg_loss: f64,
    pub gross_profit: f64,
    pub gross_loss: f64,
    pub expectancy: f64,
}

/// Shape shared by every breakdown bucket.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BucketStats {
    pub trade_count: usize,
    pub win_count: usize,
    pub loss_count: usize,
    pub win_rate: f64,
    pub total_pnl: f64,
    pub avg_pnl: f64,
}

/// `numerator / denominator`, or 0 for an empty denominator.
pub(crate) fn ratio(numerator: f64, denominator: usize) -> f64 {
    if denominator == 0 {
        0.0
    } else {
        numerator / denominator as f64
    }
}

pub(crate) fn percentage(part: usize, whole: usize) -> f64 {
    ratio(part as f64 * 100.0, whole)
}

/// Running accumulator behind a single bucket.
#[derive(Debug, Clone, Default)]
pub(crate) struct Tally {
    trades: usize,
    wins: usize,
    losses: usize,
    total_pnl: f64,
}

impl Tally {
    pub(crate) fn add(&mut self, trade: &Trade) {
        self.trades += 1;
        self.total_pnl += trade.pnl_or_zero();
        match trade.outcome() {
            Outcome::Win => self.wins += 1,
            Outcome::Loss => self.losses += 1,
            Outcome::Breakeven => {}
        }
    }

    pub(crate) fn count(&self) -> usize {
        self.trades
    }

    pub(crate) fn finish(&self) -> BucketStats {
        BucketStats {
            trade_count: self.trades,
            win_count: self.wins,
            loss_count: self.losses,
            win_rate: percentage(self.wins, self.trades),
            total_pnl: self.total_pnl,
            avg_pnl: ratio(self.total_pnl, self.trades),
        }
    }
}

/// Adds `trade` to the tally under `key`, allocating the key only on first use.
pub(crate) fn tally_by_key(map: &mut BTreeMap<String, Tally>, key: &str, trade: &Trade) {
    match map.get_mut(key) {
        Some(tally) => tally.add(trade),
        None => {
            let mut tally = Tally::default();
            tally.add(trade);
            map.insert(key.to_string(), tally);
        }
    }
}

pub fn calculate_trade_stats<'a>(trades: impl IntoIterator<Item = &'a Trade>) -> TradeStats {
    let mut total_trades = 0usize;
    let mut win_count = 0usize;
    let mut loss_count = 0usize;
    let mut breakeven_count = 0usize;
    let mut total_pnl = 0.0;
    let mut gross_profit = 0.0;
    let mut gross_loss = 0.0;
    let mut rr_sum = 0.0;
    let mut rr_count = 0usize;
    let mut best: Option<f64> = None;
    let mut worst: Option<f64> = None;

    for trade in trades {
        let pnl = trade.pnl_or_zero();
        total_trades += 1;
        total_pnl += pnl;

        match trade.outcome() {
            Outcome::Win => {
                win_count += 1;
                gross_profit += pnl;
            }
            Outcome::Loss => {
                loss_count += 1;
                gross_loss += pnl.abs();
            }
            Outcome::Breakeven => breakeven_count += 1,
        }

        if let Some(rr) = trade.rr_ratio {
            rr_sum += rr;
            rr_count += 1;
        }

        best = Some(best.map_or(pnl, |b| b.max(pnl)));
        worst = Some(worst.map_or(pnl, |w| w.min(pnl)));
    }

    let win_rate = percentage(win_count, total_trades);
    let avg_win = ratio(gross_profit, win_count);
    let avg_loss = ratio(gross_loss, loss_count);
    let loss_rate = percentage(loss_count, total_trades);

    log::debug!(
        "trade stats: {} trades ({} wins, {} losses, {} breakeven)",
        total_trades,
        win_count,
        loss_count,
        breakeven_count
    );

    TradeStats {
        total_trades,
        win_count,
        loss_count,
        breakeven_count,
        win_rate,
        total_pnl,
        avg_pnl: ratio(total_pnl, total_trades),
        avg_rr: ratio(rr_sum, rr_count),
        best_trade: best.unwrap_or(0.0),
        worst_trade: worst.unwrap_or(0.0),
        profit_factor: ProfitFactor::from_totals(gross_profit, gross_loss),
        avg_win,
        avg_loss,
        gross_profit,
        gross_loss,
        expectancy: (win_rate / 100.0) * avg_win - (loss_rate / 100.0) * avg_loss,
    }
}
