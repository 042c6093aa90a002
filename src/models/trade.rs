use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Datelike, Duration, NaiveDate, NaiveTime, Utc, Weekday};
use serde::{Deserialize, Serialize};

use crate::error::AnalyticsError;

/// Calendar day a trade belongs to, kept in its exact `YYYY-MM-DD` text form.
///
/// Only zero-padded ISO dates naming a real day are accepted, so the
/// month key can be taken as a plain string prefix.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TradeDate {
    text: String,
    date: NaiveDate,
}

impl TradeDate {
    pub fn from_date(date: NaiveDate) -> Self {
        Self {
            text: date.format("%Y-%m-%d").to_string(),
            date,
        }
    }

    pub fn as_str(&self) -> &str {
        &self.text
    }

    pub fn date(&self) -> NaiveDate {
        self.date
    }

    /// `YYYY-MM`, sliced from the text.
    pub fn month_key(&self) -> &str {
        &self.text[..7]
    }

    /// Weekday of the date anchored at 12:00, so no offset conversion can
    /// roll it into the previous day.
    pub fn weekday(&self) -> Weekday {
        self.date.and_time(NaiveTime::MIN + Duration::hours(12)).weekday()
    }

    /// Monday on or before this date.
    pub fn week_start(&self) -> TradeDate {
        let offset = self.weekday().num_days_from_monday() as i64;
        TradeDate::from_date(self.date - Duration::days(offset))
    }
}

impl FromStr for TradeDate {
    type Err = AnalyticsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || AnalyticsError::InvalidTradeDate(s.to_string());
        if s.len() != 10 {
            return Err(invalid());
        }
        let date = NaiveDate::parse_from_str(s, "%Y-%m-%d").map_err(|_| invalid())?;
        // chrono accepts unpadded fields; the round trip rejects them
        if date.format("%Y-%m-%d").to_string() != s {
            return Err(invalid());
        }
        Ok(Self {
            text: s.to_string(),
            date,
        })
    }
}

impl TryFrom<String> for TradeDate {
    type Error = AnalyticsError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<TradeDate> for String {
    fn from(value: TradeDate) -> Self {
        value.text
    }
}

impl fmt::Display for TradeDate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Long,
    Short,
}

impl Direction {
    pub const ALL: [Direction; 2] = [Direction::Long, Direction::Short];

    pub fn as_str(&self) -> &'static str {
        match self {
            Direction::Long => "long",
            Direction::Short => "short",
        }
    }
}

impl FromStr for Direction {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "long" => Ok(Direction::Long),
            "short" => Ok(Direction::Short),
            other => Err(format!("unknown direction: {}", other)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TradeStatus {
    Open,
    Closed,
}

impl TradeStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TradeStatus::Open => "open",
            TradeStatus::Closed => "closed",
        }
    }
}

impl FromStr for TradeStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "open" => Ok(TradeStatus::Open),
            "closed" => Ok(TradeStatus::Closed),
            other => Err(format!("unknown status: {}", other)),
        }
    }
}

/// Fixed emotion vocabulary a trader can tag a trade with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Emotion {
    Confident,
    Neutral,
    Fearful,
    Greedy,
    Revenge,
}

impl Emotion {
    pub const ALL: [Emotion; 5] = [
        Emotion::Confident,
        Emotion::Neutral,
        Emotion::Fearful,
        Emotion::Greedy,
        Emotion::Revenge,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Emotion::Confident => "confident",
            Emotion::Neutral => "neutral",
            Emotion::Fearful => "fearful",
            Emotion::Greedy => "greedy",
            Emotion::Revenge => "revenge",
        }
    }
}

impl FromStr for Emotion {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Emotion::ALL
            .into_iter()
            .find(|e| e.as_str() == s)
            .ok_or_else(|| format!("unknown emotion: {}", s))
    }
}

/// Sign of a trade's result. A missing pnl is a breakeven.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Win,
    Loss,
    Breakeven,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trade {
    pub id: String,
    pub user_id: String,
    pub pair: String,
    pub direction: Direction,
    pub status: TradeStatus,
    pub trade_date: TradeDate,
    pub created_at: Option<DateTime<Utc>>,
    pub closed_at: Option<DateTime<Utc>>,
    pub pnl: Option<f64>,
    pub rr_ratio: Option<f64>,
    pub emotion: Option<Emotion>,
    pub setup: Option<String>,
    #[serde(default)]
    pub mistakes: Vec<String>,
}

impl Trade {
    pub fn is_closed(&self) -> bool {
        self.status == TradeStatus::Closed
    }

    /// Realized pnl with a missing value counted as 0.
    pub fn pnl_or_zero(&self) -> f64 {
        self.pnl.unwrap_or(0.0)
    }

    pub fn outcome(&self) -> Outcome {
        let pnl = self.pnl_or_zero();
        if pnl > 0.0 {
            Outcome::Win
        } else if pnl < 0.0 {
            Outcome::Loss
        } else {
            Outcome::Breakeven
        }
    }

    /// Ascending (trade_date, created_at, id) order used by every analytics pass.
    pub fn chronological_cmp(&self, other: &Trade) -> Ordering {
        self.trade_date
            .cmp(&other.trade_date)
            .then_with(|| self.created_at.cmp(&other.created_at))
            .then_with(|| self.id.cmp(&other.id))
    }
}

/// Borrowed view of `trades` in chronological order.
pub fn sorted_chronologically(trades: &[Trade]) -> Vec<&Trade> {
    let mut sorted: Vec<&Trade> = trades.iter().collect();
    sorted.sort_by(|a, b| a.chronological_cmp(b));
    sorted
}
