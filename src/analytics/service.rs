use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::breakdown::*;
use super::equity::{DrawdownPoint, EquityCurvePoint, analyze_equity};
use super::filter::{DateRange, DateRangePreset, TradePage, TradeQuery};
use super::portfolio::{PortfolioSummary, portfolio_summary};
use super::stats::{TradeStats, calculate_trade_stats};
use super::time_buckets::*;
use crate::error::AnalyticsError;
use crate::models::Trade;
use crate::store::TradeStore;

/// Every breakdown for one date range, computed from a single fetch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Dashboard {
    pub range: DateRange,
    pub summary: PortfolioSummary,
    pub stats: TradeStats,
    pub equity_curve: Vec<EquityCurvePoint>,
    pub drawdowns: Vec<DrawdownPoint>,
    pub day_of_week: Vec<DayOfWeekBucket>,
    pub hour_of_day: Vec<HourOfDayBucket>,
    pub weekly: Vec<WeeklyPnl>,
    pub monthly: Vec<MonthlyReturn>,
    pub direction: Vec<DirectionBucket>,
    pub emotion: Vec<EmotionBucket>,
    pub setup: Vec<SetupBucket>,
    pub mistakes: Vec<MistakeBucket>,
    pub risk_reward: Vec<RiskRewardBucket>,
    pub pairs: Vec<PairBreakdown>,
}

/// Runs `compute` on a blocking worker over a shared view of `trades`.
fn spawn_compute<T, F>(trades: &Arc<[Trade]>, compute: F) -> tokio::task::JoinHandle<T>
where
    F: FnOnce(&[Trade]) -> T + Send + 'static,
    T: Send + 'static,
{
    let trades = Arc::clone(trades);
    tokio::task::spawn_blocking(move || compute(&trades))
}

/// Analytics for one user's trades, read through a [`TradeStore`].
///
/// Holds no results between calls; every method fetches and recomputes.
/// Store errors come back unchanged inside [`AnalyticsError::Store`].
pub struct TradeAnalytics<S: TradeStore> {
    store: Arc<S>,
    user_id: String,
}

impl<S: TradeStore> TradeAnalytics<S> {
    pub fn new(store: Arc<S>, user_id: impl Into<String>) -> Self {
        Self {
            store,
            user_id: user_id.into(),
        }
    }

    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    /// Resolves a dashboard preset against today's UTC date.
    pub fn range_for(preset: DateRangePreset) -> DateRange {
        preset.resolve(Utc::now().date_naive())
    }

    pub async fn closed_trades(&self, range: &DateRange) -> Result<Vec<Trade>, AnalyticsError> {
        Ok(self.store.get_closed_trades(&self.user_id, range).await?)
    }

    pub async fn list_trades(
        &self,
        query: &TradeQuery,
        cursor: Option<DateTime<Utc>>,
    ) -> Result<TradePage, AnalyticsError> {
        let settings = self.store.settings().await?;
        Ok(self
            .store
            .list_trades(&self.user_id, query, cursor, settings.page_size as usize)
            .await?)
    }

    pub async fn trade_stats(&self, range: &DateRange) -> Result<TradeStats, AnalyticsError> {
        Ok(calculate_trade_stats(&self.closed_trades(range).await?))
    }

    pub async fn equity_curve(
        &self,
        range: &DateRange,
    ) -> Result<Vec<EquityCurvePoint>, AnalyticsError> {
        Ok(analyze_equity(&self.closed_trades(range).await?).curve)
    }

    pub async fn drawdown_series(
        &self,
        range: &DateRange,
    ) -> Result<Vec<DrawdownPoint>, AnalyticsError> {
        Ok(analyze_equity(&self.closed_trades(range).await?).drawdowns)
    }

    pub async fn day_of_week(
        &self,
        range: &DateRange,
    ) -> Result<Vec<DayOfWeekBucket>, AnalyticsError> {
        Ok(day_of_week_breakdown(&self.closed_trades(range).await?))
    }

    pub async fn hour_of_day(
        &self,
        range: &DateRange,
    ) -> Result<Vec<HourOfDayBucket>, AnalyticsError> {
        let settings = self.store.settings().await?;
        let trades = self.closed_trades(range).await?;
        Ok(hour_of_day_breakdown(&trades, settings.utc_offset_minutes))
    }

    pub async fn weekly_pnl(&self, range: &DateRange) -> Result<Vec<WeeklyPnl>, AnalyticsError> {
        Ok(weekly_pnl(&self.closed_trades(range).await?))
    }

    pub async fn monthly_returns(
        &self,
        range: &DateRange,
    ) -> Result<Vec<MonthlyReturn>, AnalyticsError> {
        Ok(monthly_returns(&self.closed_trades(range).await?))
    }

    pub async fn direction(
        &self,
        range: &DateRange,
    ) -> Result<Vec<DirectionBucket>, AnalyticsError> {
        Ok(direction_breakdown(&self.closed_trades(range).await?))
    }

    pub async fn emotion(&self, range: &DateRange) -> Result<Vec<EmotionBucket>, AnalyticsError> {
        Ok(emotion_breakdown(&self.closed_trades(range).await?))
    }

    pub async fn setup(&self, range: &DateRange) -> Result<Vec<SetupBucket>, AnalyticsError> {
        Ok(setup_breakdown(&self.closed_trades(range).await?))
    }

    pub async fn mistakes(&self, range: &DateRange) -> Result<Vec<MistakeBucket>, AnalyticsError> {
        Ok(mistake_breakdown(&self.closed_trades(range).await?))
    }

    pub async fn risk_reward(
        &self,
        range: &DateRange,
    ) -> Result<Vec<RiskRewardBucket>, AnalyticsError> {
        Ok(risk_reward_breakdown(&self.closed_trades(range).await?))
    }

    pub async fn pairs(&self, range: &DateRange) -> Result<Vec<PairBreakdown>, AnalyticsError> {
        Ok(pair_breakdown(&self.closed_trades(range).await?))
    }

    /// Snapshot over every trade of the user, open and closed.
    pub async fn portfolio_summary(&self) -> Result<PortfolioSummary, AnalyticsError> {
        let trades = self
            .store
            .fetch_trades(&self.user_id, &TradeQuery::default())
            .await?;
        Ok(portfolio_summary(&trades))
    }

    /// Fetches the range once, then runs every computation concurrently on
    /// blocking workers that share the same immutable trade set.
    pub async fn dashboard(&self, range: &DateRange) -> Result<Dashboard, AnalyticsError> {
        let settings = self.store.settings().await?;
        let query = TradeQuery {
            range: range.clone(),
            ..TradeQuery::default()
        };
        let trades = self.store.fetch_trades(&self.user_id, &query).await?;
        let closed: Arc<[Trade]> = trades.iter().filter(|t| t.is_closed()).cloned().collect();
        let all: Arc<[Trade]> = trades.into();

        log::info!(
            "Computing dashboard for {} via {} store: {} trades ({} closed)",
            self.user_id,
            self.store.store_name(),
            all.len(),
            closed.len()
        );

        let offset = settings.utc_offset_minutes;
        let (
            summary,
            stats,
            equity,
            day_of_week,
            hour_of_day,
            weekly,
            monthly,
            direction,
            emotion,
            setup,
            mistakes,
            risk_reward,
            pairs,
        ) = futures::try_join!(
            spawn_compute(&all, |t| portfolio_summary(t)),
            spawn_compute(&closed, |t| calculate_trade_stats(t)),
            spawn_compute(&closed, |t| analyze_equity(t)),
            spawn_compute(&closed, |t| day_of_week_breakdown(t)),
            spawn_compute(&closed, move |t| hour_of_day_breakdown(t, offset)),
            spawn_compute(&closed, |t| weekly_pnl(t)),
            spawn_compute(&closed, |t| monthly_returns(t)),
            spawn_compute(&closed, |t| direction_breakdown(t)),
            spawn_compute(&closed, |t| emotion_breakdown(t)),
            spawn_compute(&closed, |t| setup_breakdown(t)),
            spawn_compute(&closed, |t| mistake_breakdown(t)),
            spawn_compute(&closed, |t| risk_reward_breakdown(t)),
            spawn_compute(&closed, |t| pair_breakdown(t)),
        )?;

        Ok(Dashboard {
            range: range.clone(),
            summary,
            stats,
            equity_curve: equity.curve,
            drawdowns: equity.drawdowns,
            day_of_week,
            hour_of_day,
            weekly,
            monthly,
            direction,
            emotion,
            setup,
            mistakes,
            risk_reward,
            pairs,
        })
    }
}
