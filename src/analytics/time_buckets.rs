//! Time-based breakdowns. Day, week and month buckets key off `trade_date`;
//! only the hour of day reads `created_at`.

use std::collections::BTreeMap;

use chrono::{FixedOffset, Offset, Timelike, Utc};
use serde::{Deserialize, Serialize};

use super::stats::{BucketStats, Tally, tally_by_key};
use crate::models::{Trade, TradeDate};

/// Hour bucket for trades without a `created_at`.
pub const HOUR_FALLBACK: u32 = 12;

const DAY_NAMES: [&str; 7] = [
    "Sunday",
    "Monday",
    "Tuesday",
    "Wednesday",
    "Thursday",
    "Friday",
    "Saturday",
];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DayOfWeekBucket {
    /// 0 = Sunday .. 6 = Saturday
    pub day: u32,
    pub day_name: String,
    #[serde(flatten)]
    pub stats: BucketStats,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HourOfDayBucket {
    pub hour: u32,
    #[serde(flatten)]
    pub stats: BucketStats,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeeklyPnl {
    /// Monday starting the week.
    pub week_start: TradeDate,
    #[serde(flatten)]
    pub stats: BucketStats,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonthlyReturn {
    /// `YYYY-MM`
    pub month: String,
    #[serde(flatten)]
    pub stats: BucketStats,
}

/// Seven buckets, Sunday first, always present.
pub fn day_of_week_breakdown<'a>(
    trades: impl IntoIterator<Item = &'a Trade>,
) -> Vec<DayOfWeekBucket> {
    let mut tallies: [Tally; 7] = Default::default();
    for trade in trades {
        let day = trade.trade_date.weekday().num_days_from_sunday() as usize;
        tallies[day].add(trade);
    }

    tallies
        .iter()
        .zip(DAY_NAMES)
        .enumerate()
        .map(|(day, (tally, name))| DayOfWeekBucket {
            day: day as u32,
            day_name: name.to_string(),
            stats: tally.finish(),
        })
        .collect()
}

fn resolve_offset(utc_offset_minutes: i32) -> FixedOffset {
    utc_offset_minutes
        .checked_mul(60)
        .and_then(FixedOffset::east_opt)
        .unwrap_or_else(|| {
            log::warn!(
                "Ignoring out-of-range UTC offset of {} minutes for hour buckets",
                utc_offset_minutes
            );
            Utc.fix()
        })
}

/// 24 buckets from the hour of `created_at` in the given offset.
pub fn hour_of_day_breakdown<'a>(
    trades: impl IntoIterator<Item = &'a Trade>,
    utc_offset_minutes: i32,
) -> Vec<HourOfDayBucket> {
    let offset = resolve_offset(utc_offset_minutes);
    let mut tallies: [Tally; 24] = Default::default();
    for trade in trades {
        let hour = trade
            .created_at
            .map(|ts| ts.with_timezone(&offset).hour())
            .unwrap_or(HOUR_FALLBACK);
        tallies[hour as usize].add(trade);
    }

    tallies
        .iter()
        .enumerate()
        .map(|(hour, tally)| HourOfDayBucket {
            hour: hour as u32,
            stats: tally.finish(),
        })
        .collect()
}

/// One entry per week with trades, ascending by week start.
pub fn weekly_pnl<'a>(trades: impl IntoIterator<Item = &'a Trade>) -> Vec<WeeklyPnl> {
    let mut weeks: BTreeMap<TradeDate, Tally> = BTreeMap::new();
    for trade in trades {
        weeks.entry(trade.trade_date.week_start()).or_default().add(trade);
    }

    weeks
        .into_iter()
        .map(|(week_start, tally)| WeeklyPnl {
            week_start,
            stats: tally.finish(),
        })
        .collect()
}

/// One entry per `YYYY-MM` prefix of trade_date, ascending.
pub fn monthly_returns<'a>(trades: impl IntoIterator<Item = &'a Trade>) -> Vec<MonthlyReturn> {
    let mut months: BTreeMap<String, Tally> = BTreeMap::new();
    for trade in trades {
        tally_by_key(&mut months, trade.trade_date.month_key(), trade);
    }

    log::debug!("monthly returns: {} months", months.len());

    months
        .into_iter()
        .map(|(month, tally)| MonthlyReturn {
            month,
            stats: tally.finish(),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analytics::test_support::{closed, with_created_at};

    #[test]
    fn test_day_of_week_has_seven_buckets_from_trade_date() {
        // Sunday, Sunday, Wednesday; created_at late in the day must not shift the date
        let trades = vec![
            with_created_at(closed("2024-06-02", Some(10.0)), "2024-06-02T23:59:00Z"),
            with_created_at(closed("2024-06-02", Some(-4.0)), "2024-06-03T00:30:00Z"),
            closed("2024-06-05", Some(6.0)),
        ];
        let buckets = day_of_week_breakdown(&trades);

        assert_eq!(buckets.len(), 7);
        assert_eq!(buckets[0].day_name, "Sunday");
        assert_eq!(buckets[0].stats.trade_count, 2);
        assert_eq!(buckets[0].stats.win_count, 1);
        assert_eq!(buckets[0].stats.win_rate, 50.0);
        assert_eq!(buckets[0].stats.total_pnl, 6.0);
        assert_eq!(buckets[0].stats.avg_pnl, 3.0);
        assert_eq!(buckets[3].stats.trade_count, 1);
        assert_eq!(buckets[1].stats, BucketStats::default());
    }

    #[test]
    fn test_hour_of_day_uses_created_at_and_fallback() {
        let mut missing = closed("2024-06-02", Some(1.0));
        missing.created_at = None;
        let trades = vec![
            with_created_at(closed("2024-06-02", Some(5.0)), "2024-06-02T09:45:00Z"),
            with_created_at(closed("2024-06-02", Some(-5.0)), "2024-06-02T09:05:00Z"),
            missing,
        ];
        let buckets = hour_of_day_breakdown(&trades, 0);

        assert_eq!(buckets.len(), 24);
        assert_eq!(buckets[9].stats.trade_count, 2);
        assert_eq!(buckets[9].stats.total_pnl, 0.0);
        assert_eq!(buckets[HOUR_FALLBACK as usize].stats.trade_count, 1);
    }

    #[test]
    fn test_hour_of_day_applies_offset() {
        let trades = vec![with_created_at(closed("2024-06-02", Some(5.0)), "2024-06-02T22:30:00Z")];
        let buckets = hour_of_day_breakdown(&trades, 120);
        assert_eq!(buckets[0].stats.trade_count, 1);

        // out-of-range offset falls back to UTC
        let buckets = hour_of_day_breakdown(&trades, 100_000);
        assert_eq!(buckets[22].stats.trade_count, 1);
    }

    #[test]
    fn test_weekly_groups_by_monday_ascending() {
        let trades = vec![
            closed("2024-06-10", Some(3.0)), // Monday
            closed("2024-06-02", Some(1.0)), // Sunday -> week of 05-27
            closed("2024-06-09", Some(2.0)), // Sunday -> week of 06-03
            closed("2024-06-04", Some(-1.0)),
        ];
        let weeks = weekly_pnl(&trades);
        let starts: Vec<&str> = weeks.iter().map(|w| w.week_start.as_str()).collect();
        assert_eq!(starts, vec!["2024-05-27", "2024-06-03", "2024-06-10"]);
        assert_eq!(weeks[1].stats.trade_count, 2);
        assert_eq!(weeks[1].stats.total_pnl, 1.0);
    }

    #[test]
    fn test_monthly_returns_by_text_prefix() {
        let trades = vec![
            closed("2024-02-29", Some(10.0)),
            closed("2024-01-31", Some(-2.0)),
            closed("2024-02-01", None),
        ];
        let months = monthly_returns(&trades);
        assert_eq!(months.len(), 2);
        assert_eq!(months[0].month, "2024-01");
        assert_eq!(months[1].month, "2024-02");
        assert_eq!(months[1].stats.trade_count, 2);
        assert_eq!(months[1].stats.win_rate, 50.0);
        assert_eq!(months[1].stats.total_pnl, 10.0);
    }

    #[test]
    fn test_bucket_serializes_flat() {
        let buckets = monthly_returns(&[closed("2024-02-29", Some(10.0))]);
        let json = serde_json::to_value(&buckets[0]).unwrap();
        assert_eq!(json["month"], "2024-02");
        assert_eq!(json["trade_count"], 1);
        assert_eq!(json["total_pnl"], 10.0);
    }
}
