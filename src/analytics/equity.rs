//! Equity curve, drawdown and streaks in one chronological pass.
//!
//! Trades are ordered by (trade_date, created_at). Same-day pnl collapses into
//! a single curve point; streaks advance per trade.

use serde::{Deserialize, Serialize};

use crate::models::{Outcome, Trade, TradeDate, sorted_chronologically};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EquityCurvePoint {
    pub date: TradeDate,
    pub cumulative_pnl: f64,
    pub daily_pnl: f64,
    pub trade_count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DrawdownPoint {
    pub date: TradeDate,
    /// Peak minus cumulative pnl, never negative.
    pub drawdown: f64,
    /// Drawdown relative to the peak, 0 while the peak is not positive.
    pub drawdown_pct: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DrawdownStats {
    pub peak: f64,
    pub max_drawdown: f64,
    pub max_drawdown_pct: f64,
    pub current_drawdown: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StreakStats {
    /// Positive for a winning run, negative for a losing run, 0 after a breakeven.
    pub current_streak: i64,
    pub longest_win_streak: u64,
    pub longest_loss_streak: u64,
}

/// Signed run-length counter over trade outcomes.
#[derive(Debug, Clone, Default)]
pub struct StreakTracker {
    stats: StreakStats,
}

impl StreakTracker {
    pub fn record(&mut self, outcome: Outcome) {
        let current = self.stats.current_streak;
        self.stats.current_streak = match outcome {
            Outcome::Win if current > 0 => current + 1,
            Outcome::Win => 1,
            Outcome::Loss if current < 0 => current - 1,
            Outcome::Loss => -1,
            // breakeven ends the run without starting a new one
            Outcome::Breakeven => 0,
        };

        let current = self.stats.current_streak;
        let run = current.unsigned_abs();
        if current > 0 {
            self.stats.longest_win_streak = self.stats.longest_win_streak.max(run);
        } else if current < 0 {
            self.stats.longest_loss_streak = self.stats.longest_loss_streak.max(run);
        }
    }

    pub fn current(&self) -> i64 {
        self.stats.current_streak
    }

    pub fn stats(&self) -> &StreakStats {
        &self.stats
    }

    pub fn finish(self) -> StreakStats {
        self.stats
    }
}

#[derive(Debug, Default)]
struct DrawdownTracker {
    cumulative: f64,
    stats: DrawdownStats,
}

impl DrawdownTracker {
    fn close_day(
        &mut self,
        date: TradeDate,
        daily_pnl: f64,
        trade_count: usize,
    ) -> (EquityCurvePoint, DrawdownPoint) {
        self.cumulative += daily_pnl;
        self.stats.peak = self.stats.peak.max(self.cumulative);

        let drawdown = self.stats.peak - self.cumulative;
        let drawdown_pct = if self.stats.peak > 0.0 {
            drawdown / self.stats.peak * 100.0
        } else {
            0.0
        };

        self.stats.max_drawdown = self.stats.max_drawdown.max(drawdown);
        self.stats.max_drawdown_pct = self.stats.max_drawdown_pct.max(drawdown_pct);
        self.stats.current_drawdown = drawdown;

        (
            EquityCurvePoint {
                date: date.clone(),
                cumulative_pnl: self.cumulative,
                daily_pnl,
                trade_count,
            },
            DrawdownPoint {
                date,
                drawdown,
                drawdown_pct,
            },
        )
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EquityAnalysis {
    pub curve: Vec<EquityCurvePoint>,
    pub drawdowns: Vec<DrawdownPoint>,
    pub drawdown: DrawdownStats,
    pub streaks: StreakStats,
    /// Distinct trade dates seen.
    pub active_days: usize,
}

impl EquityAnalysis {
    pub fn final_cumulative_pnl(&self) -> f64 {
        self.curve.last().map(|p| p.cumulative_pnl).unwrap_or(0.0)
    }
}

pub fn analyze_equity<'a>(trades: impl IntoIterator<Item = &'a Trade>) -> EquityAnalysis {
    let mut ordered: Vec<&Trade> = trades.into_iter().collect();
    ordered.sort_by(|a, b| a.chronological_cmp(b));

    let mut drawdown = DrawdownTracker::default();
    let mut streaks = StreakTracker::default();
    let mut curve = Vec::new();
    let mut drawdowns = Vec::new();
    let mut day: Option<(TradeDate, f64, usize)> = None;

    for trade in ordered {
        streaks.record(trade.outcome());

        let same_day = day
            .as_ref()
            .is_some_and(|(date, _, _)| *date == trade.trade_date);
        if same_day {
            if let Some((_, daily_pnl, count)) = day.as_mut() {
                *daily_pnl += trade.pnl_or_zero();
                *count += 1;
            }
            continue;
        }

        if let Some((date, daily_pnl, count)) = day.take() {
            let (point, dd) = drawdown.close_day(date, daily_pnl, count);
            curve.push(point);
            drawdowns.push(dd);
        }
        day = Some((trade.trade_date.clone(), trade.pnl_or_zero(), 1));
    }
    if let Some((date, daily_pnl, count)) = day {
        let (point, dd) = drawdown.close_day(date, daily_pnl, count);
        curve.push(point);
        drawdowns.push(dd);
    }

    log::debug!(
        "equity pass: {} active days, max drawdown {:.2}",
        curve.len(),
        drawdown.stats.max_drawdown
    );

    EquityAnalysis {
        active_days: curve.len(),
        curve,
        drawdowns,
        drawdown: drawdown.stats,
        streaks: streaks.finish(),
    }
}

pub fn equity_curve<'a>(trades: impl IntoIterator<Item = &'a Trade>) -> Vec<EquityCurvePoint> {
    analyze_equity(trades).curve
}

pub fn drawdown_series<'a>(trades: impl IntoIterator<Item = &'a Trade>) -> Vec<DrawdownPoint> {
    analyze_equity(trades).drawdowns
}

/// Streaks over `trades` in chronological order.
pub fn streak_stats(trades: &[Trade]) -> StreakStats {
    let mut tracker = StreakTracker::default();
    for trade in sorted_chronologically(trades) {
        tracker.record(trade.outcome());
    }
    tracker.finish()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analytics::test_support::closed;

    #[test]
    fn test_daily_drawdown_scenario() {
        let trades = vec![
            closed("2024-03-01", Some(50.0)),
            closed("2024-03-02", Some(-100.0)),
            closed("2024-03-03", Some(80.0)),
        ];
        let analysis = analyze_equity(&trades);

        let cumulative: Vec<f64> = analysis.curve.iter().map(|p| p.cumulative_pnl).collect();
        assert_eq!(cumulative, vec![50.0, -50.0, 30.0]);

        let dd: Vec<(f64, f64)> = analysis
            .drawdowns
            .iter()
            .map(|p| (p.drawdown, p.drawdown_pct))
            .collect();
        assert_eq!(dd, vec![(0.0, 0.0), (100.0, 200.0), (20.0, 40.0)]);

        assert_eq!(analysis.drawdown.max_drawdown, 100.0);
        assert_eq!(analysis.drawdown.max_drawdown_pct, 200.0);
        assert_eq!(analysis.drawdown.current_drawdown, 20.0);
        assert_eq!(analysis.drawdown.peak, 50.0);
    }

    #[test]
    fn test_same_day_trades_collapse_into_one_point() {
        let trades = vec![
            closed("2024-03-01", Some(100.0)),
            closed("2024-03-01", Some(-40.0)),
            closed("2024-03-01", Some(60.0)),
            closed("2024-03-04", None),
        ];
        let curve = equity_curve(&trades);
        assert_eq!(curve.len(), 2);
        assert_eq!(curve[0].daily_pnl, 120.0);
        assert_eq!(curve[0].trade_count, 3);
        assert_eq!(curve[1].cumulative_pnl, 120.0);
        assert_eq!(curve[1].trade_count, 1);
    }

    #[test]
    fn test_curve_is_chronological_regardless_of_input_order() {
        let trades = vec![
            closed("2024-03-03", Some(1.0)),
            closed("2024-03-01", Some(2.0)),
            closed("2024-03-02", Some(3.0)),
        ];
        let dates: Vec<String> = equity_curve(&trades).iter().map(|p| p.date.to_string()).collect();
        assert_eq!(dates, vec!["2024-03-01", "2024-03-02", "2024-03-03"]);
    }

    #[test]
    fn test_negative_start_keeps_pct_at_zero() {
        let trades = vec![closed("2024-03-01", Some(-30.0)), closed("2024-03-02", Some(-10.0))];
        let series = drawdown_series(&trades);
        assert_eq!(series[0].drawdown, 30.0);
        assert_eq!(series[1].drawdown, 40.0);
        assert!(series.iter().all(|p| p.drawdown_pct == 0.0));
    }

    #[test]
    fn test_drawdown_invariants_hold() {
        let pnls = [12.0, -3.0, -20.0, 40.0, 0.0, -5.5, 8.0, -60.0, 15.0];
        let trades: Vec<Trade> = pnls
            .iter()
            .enumerate()
            .map(|(i, pnl)| closed(&format!("2024-04-{:02}", i + 1), Some(*pnl)))
            .collect();
        let analysis = analyze_equity(&trades);

        let mut peak: f64 = 0.0;
        for (point, dd) in analysis.curve.iter().zip(&analysis.drawdowns) {
            peak = peak.max(point.cumulative_pnl);
            assert!(dd.drawdown >= 0.0);
            assert_eq!(dd.drawdown == 0.0, point.cumulative_pnl == peak);
            assert!(analysis.drawdown.max_drawdown >= dd.drawdown);
        }

        let total: f64 = pnls.iter().sum();
        assert!((analysis.final_cumulative_pnl() - total).abs() < 1e-9);
    }

    #[test]
    fn test_streak_scenario() {
        let pnls = [10.0, 20.0, -5.0, 15.0, 0.0, -8.0];
        let mut tracker = StreakTracker::default();
        let mut observed = Vec::new();
        for pnl in pnls {
            tracker.record(closed("2024-03-01", Some(pnl)).outcome());
            observed.push(tracker.current());
            assert!(tracker.stats().longest_win_streak as i64 >= tracker.current());
            assert!(tracker.stats().longest_loss_streak as i64 >= -tracker.current());
        }
        assert_eq!(observed, vec![1, 2, -1, 1, 0, -1]);

        let trades: Vec<Trade> = pnls.iter().map(|p| closed("2024-03-01", Some(*p))).collect();
        let stats = streak_stats(&trades);
        assert_eq!(stats.current_streak, -1);
        assert_eq!(stats.longest_win_streak, 2);
        assert_eq!(stats.longest_loss_streak, 1);
        assert_eq!(analyze_equity(&trades).streaks, stats);
    }

    #[test]
    fn test_longest_streaks_survive_later_runs() {
        let trades: Vec<Trade> = [-1.0, -2.0, -3.0, 5.0, 0.0, 1.0]
            .iter()
            .map(|p| closed("2024-03-01", Some(*p)))
            .collect();
        let stats = streak_stats(&trades);
        assert_eq!(stats.longest_loss_streak, 3);
        assert_eq!(stats.longest_win_streak, 1);
        assert_eq!(stats.current_streak, 1);
    }

    #[test]
    fn test_empty_input() {
        let analysis = analyze_equity(&Vec::<Trade>::new());
        assert_eq!(analysis, EquityAnalysis::default());
        assert_eq!(analysis.final_cumulative_pnl(), 0.0);
    }
}
