use std::cmp::Ordering;
use std::str::FromStr;

use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::error::AnalyticsError;
use crate::models::{Direction, Trade, TradeDate, TradeStatus};

/// Inclusive bounds on `trade_date`. A missing bound is no constraint.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    pub from: Option<TradeDate>,
    pub to: Option<TradeDate>,
}

impl DateRange {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn between(from: Option<TradeDate>, to: Option<TradeDate>) -> Self {
        Self { from, to }
    }

    pub fn contains(&self, date: &TradeDate) -> bool {
        self.from.as_ref().is_none_or(|from| date >= from)
            && self.to.as_ref().is_none_or(|to| date <= to)
    }
}

/// Dashboard shortcuts for common date windows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DateRangePreset {
    #[serde(rename = "today")]
    Today,
    #[serde(rename = "week")]
    Week,
    #[serde(rename = "month")]
    Month,
    #[serde(rename = "3months")]
    ThreeMonths,
    #[serde(rename = "6months")]
    SixMonths,
    #[serde(rename = "year")]
    Year,
    #[serde(rename = "all")]
    All,
}

impl DateRangePreset {
    /// Calendar days covered, today included.
    pub fn window_days(&self) -> Option<i64> {
        match self {
            DateRangePreset::Today => Some(1),
            DateRangePreset::Week => Some(7),
            DateRangePreset::Month => Some(30),
            DateRangePreset::ThreeMonths => Some(90),
            DateRangePreset::SixMonths => Some(180),
            DateRangePreset::Year => Some(365),
            DateRangePreset::All => None,
        }
    }

    /// The last `window_days` calendar days, ending at `today` inclusive.
    pub fn resolve(&self, today: NaiveDate) -> DateRange {
        match self.window_days() {
            Some(days) => DateRange::between(
                Some(TradeDate::from_date(today - Duration::days(days - 1))),
                Some(TradeDate::from_date(today)),
            ),
            None => DateRange::all(),
        }
    }
}

impl FromStr for DateRangePreset {
    type Err = AnalyticsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "today" => Ok(DateRangePreset::Today),
            "week" => Ok(DateRangePreset::Week),
            "month" => Ok(DateRangePreset::Month),
            "3months" => Ok(DateRangePreset::ThreeMonths),
            "6months" => Ok(DateRangePreset::SixMonths),
            "year" => Ok(DateRangePreset::Year),
            "all" => Ok(DateRangePreset::All),
            other => Err(AnalyticsError::InvalidPreset(other.to_string())),
        }
    }
}

/// AND-combined trade filters.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TradeQuery {
    pub status: Option<TradeStatus>,
    pub pair: Option<String>,
    pub direction: Option<Direction>,
    #[serde(default)]
    pub range: DateRange,
}

impl TradeQuery {
    /// Closed trades inside `range`, the input every breakdown works on.
    pub fn closed_in(range: DateRange) -> Self {
        Self {
            status: Some(TradeStatus::Closed),
            range,
            ..Self::default()
        }
    }

    pub fn matches(&self, trade: &Trade) -> bool {
        self.status.is_none_or(|s| trade.status == s)
            && self.pair.as_deref().is_none_or(|p| trade.pair == p)
            && self.direction.is_none_or(|d| trade.direction == d)
            && self.range.contains(&trade.trade_date)
    }

    /// Matching trades, ascending by (trade_date, created_at).
    pub fn select(&self, trades: &[Trade]) -> Vec<Trade> {
        let mut selected: Vec<Trade> = trades.iter().filter(|t| self.matches(t)).cloned().collect();
        selected.sort_by(|a, b| a.chronological_cmp(b));
        selected
    }
}

/// One page of the trade listing, newest first.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TradePage {
    pub trades: Vec<Trade>,
    /// Oldest `created_at` on the page; present only when the page is full.
    pub next_cursor: Option<DateTime<Utc>>,
}

fn listing_cmp(a: &Trade, b: &Trade) -> Ordering {
    b.trade_date
        .cmp(&a.trade_date)
        .then_with(|| b.created_at.cmp(&a.created_at))
        .then_with(|| b.id.cmp(&a.id))
}

/// Listing order is trade_date desc then created_at desc. The cursor only
/// looks at created_at: rows strictly older than it are eligible, so a row
/// without created_at can only show up on the first page.
pub fn paginate(
    trades: &[Trade],
    query: &TradeQuery,
    cursor: Option<DateTime<Utc>>,
    page_size: usize,
) -> TradePage {
    let page_size = page_size.max(1);
    let mut eligible: Vec<&Trade> = trades
        .iter()
        .filter(|t| query.matches(t))
        .filter(|t| match cursor {
            Some(c) => t.created_at.is_some_and(|ts| ts < c),
            None => true,
        })
        .collect();
    eligible.sort_by(|a, b| listing_cmp(a, b));

    let page: Vec<Trade> = eligible.into_iter().take(page_size).cloned().collect();
    TradePage {
        next_cursor: next_cursor(&page, page_size),
        trades: page,
    }
}

/// Cursor for the page after `page`: the oldest `created_at` on a full page.
/// Rows without `created_at` are skipped, so a full page always continues
/// while any row on it carries a timestamp.
pub(crate) fn next_cursor(page: &[Trade], page_size: usize) -> Option<DateTime<Utc>> {
    if page.len() < page_size {
        return None;
    }
    page.iter().rev().find_map(|t| t.created_at)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analytics::test_support::{closed, date, open, with_created_at};

    #[test]
    fn test_date_range_is_inclusive() {
        let range = DateRange::between(Some(date("2024-01-02")), Some(date("2024-01-04")));
        assert!(!range.contains(&date("2024-01-01")));
        assert!(range.contains(&date("2024-01-02")));
        assert!(range.contains(&date("2024-01-04")));
        assert!(!range.contains(&date("2024-01-05")));
        assert!(DateRange::all().contains(&date("1999-12-31")));
    }

    #[test]
    fn test_filters_are_and_combined() {
        let mut eur = closed("2024-01-02", Some(5.0));
        eur.pair = "EURUSD".to_string();
        let mut eur_short = closed("2024-01-03", Some(5.0));
        eur_short.pair = "EURUSD".to_string();
        eur_short.direction = Direction::Short;
        let mut eur_open = open("2024-01-03", None);
        eur_open.pair = "EURUSD".to_string();
        let trades = vec![
            eur.clone(),
            eur_short.clone(),
            eur_open,
            closed("2024-01-02", Some(1.0)),
        ];

        let query = TradeQuery {
            status: Some(TradeStatus::Closed),
            pair: Some("EURUSD".to_string()),
            direction: Some(Direction::Long),
            range: DateRange::all(),
        };
        assert_eq!(query.select(&trades), vec![eur]);

        assert_eq!(TradeQuery::default().select(&trades).len(), 4);
    }

    #[test]
    fn test_select_orders_ascending_with_created_at_tiebreak() {
        let late = with_created_at(closed("2024-01-02", Some(1.0)), "2024-01-02T15:00:00Z");
        let early = with_created_at(closed("2024-01-02", Some(2.0)), "2024-01-02T09:00:00Z");
        let first_day = with_created_at(closed("2024-01-01", Some(3.0)), "2024-01-03T09:00:00Z");
        let selected =
            TradeQuery::default().select(&[late.clone(), early.clone(), first_day.clone()]);
        assert_eq!(selected, vec![first_day, early, late]);
    }

    #[test]
    fn test_presets_resolve_against_today() {
        let today = NaiveDate::from_ymd_opt(2024, 3, 31).unwrap();
        let week = DateRangePreset::Week.resolve(today);
        assert_eq!(week.from, Some(date("2024-03-25")));
        assert_eq!(week.to, Some(date("2024-03-31")));
        assert_eq!(
            "today".parse::<DateRangePreset>().unwrap().resolve(today),
            DateRange::between(Some(date("2024-03-31")), Some(date("2024-03-31")))
        );
        assert_eq!(DateRangePreset::All.resolve(today), DateRange::all());
        assert!(matches!(
            "fortnight".parse::<DateRangePreset>(),
            Err(AnalyticsError::InvalidPreset(_))
        ));
    }

    #[test]
    fn test_presets_cover_exactly_their_window() {
        let today = NaiveDate::from_ymd_opt(2024, 12, 31).unwrap();
        for preset in [
            DateRangePreset::Today,
            DateRangePreset::Week,
            DateRangePreset::Month,
            DateRangePreset::ThreeMonths,
            DateRangePreset::SixMonths,
            DateRangePreset::Year,
        ] {
            let range = preset.resolve(today);
            let covered = (0..400)
                .map(|back| TradeDate::from_date(today - Duration::days(back)))
                .filter(|d| range.contains(d))
                .count() as i64;
            assert_eq!(Some(covered), preset.window_days(), "{:?}", preset);
        }
        assert_eq!(DateRangePreset::Year.resolve(today).from, Some(date("2024-01-02")));
    }

    #[test]
    fn test_pagination_walks_with_created_at_cursor() {
        let trades: Vec<Trade> = (1..=5)
            .map(|day| {
                with_created_at(
                    closed(&format!("2024-02-0{}", day), Some(1.0)),
                    &format!("2024-02-0{}T10:00:00Z", day),
                )
            })
            .collect();
        let query = TradeQuery::default();

        let first = paginate(&trades, &query, None, 2);
        let dates: Vec<&str> = first.trades.iter().map(|t| t.trade_date.as_str()).collect();
        assert_eq!(dates, vec!["2024-02-05", "2024-02-04"]);
        assert_eq!(first.next_cursor, trades[3].created_at);

        let second = paginate(&trades, &query, first.next_cursor, 2);
        assert_eq!(second.trades[0].trade_date.as_str(), "2024-02-03");

        let third = paginate(&trades, &query, second.next_cursor, 2);
        assert_eq!(third.trades.len(), 1);
        assert_eq!(third.next_cursor, None);
    }

    #[test]
    fn test_full_page_ending_without_created_at_still_continues() {
        let newest = with_created_at(closed("2024-02-05", Some(1.0)), "2024-02-05T10:00:00Z");
        let mut untimed = closed("2024-02-04", Some(2.0));
        untimed.created_at = None;
        let oldest = with_created_at(closed("2024-02-01", Some(3.0)), "2024-02-01T10:00:00Z");
        let trades = vec![newest.clone(), untimed.clone(), oldest.clone()];
        let query = TradeQuery::default();

        let first = paginate(&trades, &query, None, 2);
        assert_eq!(first.trades, vec![newest.clone(), untimed.clone()]);
        assert_eq!(first.next_cursor, newest.created_at);

        let second = paginate(&trades, &query, first.next_cursor, 2);
        assert_eq!(second.trades, vec![oldest]);
        assert_eq!(second.next_cursor, None);
    }

    #[test]
    fn test_trade_without_created_at_only_on_first_page() {
        let mut untimed = closed("2024-02-03", Some(2.0));
        untimed.created_at = None;
        let trades = vec![
            with_created_at(closed("2024-02-05", Some(1.0)), "2024-02-05T10:00:00Z"),
            with_created_at(closed("2024-02-04", Some(1.0)), "2024-02-04T10:00:00Z"),
            untimed.clone(),
            with_created_at(closed("2024-02-02", Some(1.0)), "2024-02-02T10:00:00Z"),
        ];
        let query = TradeQuery::default();

        let first = paginate(&trades, &query, None, 2);
        assert!(!first.trades.contains(&untimed));

        let mut cursor = first.next_cursor;
        while cursor.is_some() {
            let page = paginate(&trades, &query, cursor, 2);
            assert!(!page.trades.contains(&untimed));
            cursor = page.next_cursor;
        }

        // only a first page ever lists it
        assert!(paginate(&trades, &query, None, 10).trades.contains(&untimed));
    }

    #[test]
    fn test_full_page_without_any_created_at_has_no_cursor() {
        let mut trades = vec![closed("2024-02-05", Some(1.0)), closed("2024-02-04", Some(1.0))];
        for trade in &mut trades {
            trade.created_at = None;
        }
        let page = paginate(&trades, &TradeQuery::default(), None, 2);
        assert_eq!(page.trades.len(), 2);
        assert_eq!(page.next_cursor, None);
    }
}
