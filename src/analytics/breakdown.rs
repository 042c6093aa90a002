//! Categorical breakdowns.
//!
//! Fixed vocabularies (direction, emotion, risk:reward) use enums, but their
//! presence rules differ: direction and risk:reward always report every
//! bucket, emotion only reports tags that occur. Open vocabularies (setup,
//! mistakes, pair) aggregate into a keyed map and are sorted by trade count
//! on output, ties broken by key.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use super::stats::{BucketStats, Tally, ratio, tally_by_key};
use crate::models::{Direction, Emotion, Trade};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DirectionBucket {
    pub direction: Direction,
    #[serde(flatten)]
    pub stats: BucketStats,
    pub avg_rr: f64,
    pub best_trade: f64,
    pub worst_trade: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmotionBucket {
    pub emotion: Emotion,
    #[serde(flatten)]
    pub stats: BucketStats,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SetupBucket {
    pub setup: String,
    #[serde(flatten)]
    pub stats: BucketStats,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MistakeBucket {
    pub mistake: String,
    #[serde(flatten)]
    pub stats: BucketStats,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PairBreakdown {
    pub pair: String,
    #[serde(flatten)]
    pub stats: BucketStats,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskRewardRange {
    BelowOne,
    OneToTwo,
    TwoToThree,
    ThreePlus,
}

impl RiskRewardRange {
    pub const ALL: [RiskRewardRange; 4] = [
        RiskRewardRange::BelowOne,
        RiskRewardRange::OneToTwo,
        RiskRewardRange::TwoToThree,
        RiskRewardRange::ThreePlus,
    ];

    /// Lower bounds are inclusive: 1.0 is `1:1-2:1`, 3.0 is `3:1+`.
    pub fn classify(rr: f64) -> Option<Self> {
        if rr.is_nan() {
            None
        } else if rr < 1.0 {
            Some(RiskRewardRange::BelowOne)
        } else if rr < 2.0 {
            Some(RiskRewardRange::OneToTwo)
        } else if rr < 3.0 {
            Some(RiskRewardRange::TwoToThree)
        } else {
            Some(RiskRewardRange::ThreePlus)
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            RiskRewardRange::BelowOne => "<1:1",
            RiskRewardRange::OneToTwo => "1:1-2:1",
            RiskRewardRange::TwoToThree => "2:1-3:1",
            RiskRewardRange::ThreePlus => "3:1+",
        }
    }

    fn index(&self) -> usize {
        match self {
            RiskRewardRange::BelowOne => 0,
            RiskRewardRange::OneToTwo => 1,
            RiskRewardRange::TwoToThree => 2,
            RiskRewardRange::ThreePlus => 3,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskRewardBucket {
    pub range: RiskRewardRange,
    pub label: String,
    #[serde(flatten)]
    pub stats: BucketStats,
}

#[derive(Debug, Default)]
struct DirectionTally {
    tally: Tally,
    rr_sum: f64,
    rr_count: usize,
    best: Option<f64>,
    worst: Option<f64>,
}

impl DirectionTally {
    fn add(&mut self, trade: &Trade) {
        self.tally.add(trade);
        if let Some(rr) = trade.rr_ratio {
            self.rr_sum += rr;
            self.rr_count += 1;
        }
        let pnl = trade.pnl_or_zero();
        self.best = Some(self.best.map_or(pnl, |b| b.max(pnl)));
        self.worst = Some(self.worst.map_or(pnl, |w| w.min(pnl)));
    }
}

/// Always two entries, long then short.
pub fn direction_breakdown<'a>(
    trades: impl IntoIterator<Item = &'a Trade>,
) -> Vec<DirectionBucket> {
    let mut long = DirectionTally::default();
    let mut short = DirectionTally::default();
    for trade in trades {
        match trade.direction {
            Direction::Long => long.add(trade),
            Direction::Short => short.add(trade),
        }
    }

    [(Direction::Long, long), (Direction::Short, short)]
        .into_iter()
        .map(|(direction, t)| DirectionBucket {
            direction,
            stats: t.tally.finish(),
            avg_rr: ratio(t.rr_sum, t.rr_count),
            best_trade: t.best.unwrap_or(0.0),
            worst_trade: t.worst.unwrap_or(0.0),
        })
        .collect()
}

/// Only emotions that occur, most frequent first.
pub fn emotion_breakdown<'a>(trades: impl IntoIterator<Item = &'a Trade>) -> Vec<EmotionBucket> {
    let mut tallies: [Tally; 5] = Default::default();
    for trade in trades {
        if let Some(emotion) = trade.emotion {
            tallies[emotion as usize].add(trade);
        }
    }

    let mut buckets: Vec<EmotionBucket> = Emotion::ALL
        .into_iter()
        .zip(tallies.iter())
        .filter(|(_, tally)| tally.count() > 0)
        .map(|(emotion, tally)| EmotionBucket {
            emotion,
            stats: tally.finish(),
        })
        .collect();
    buckets.sort_by(|a, b| b.stats.trade_count.cmp(&a.stats.trade_count));
    buckets
}

/// Finishes a keyed map into `(key, stats)` pairs ordered by count desc,
/// then key asc.
fn ranked(map: BTreeMap<String, Tally>) -> Vec<(String, BucketStats)> {
    let mut ranked: Vec<(String, BucketStats)> = map
        .into_iter()
        .map(|(key, tally)| (key, tally.finish()))
        .collect();
    ranked.sort_by(|a, b| b.1.trade_count.cmp(&a.1.trade_count));
    ranked
}

/// One bucket per distinct setup. Trades without a setup are skipped.
pub fn setup_breakdown<'a>(trades: impl IntoIterator<Item = &'a Trade>) -> Vec<SetupBucket> {
    let mut setups: BTreeMap<String, Tally> = BTreeMap::new();
    for trade in trades {
        if let Some(setup) = trade.setup.as_deref().filter(|s| !s.is_empty()) {
            tally_by_key(&mut setups, setup, trade);
        }
    }

    ranked(setups)
        .into_iter()
        .map(|(setup, stats)| SetupBucket { setup, stats })
        .collect()
}

/// Fans each trade out to every mistake it lists, so pnl is counted once per
/// tag and bucket totals can exceed the trade set.
pub fn mistake_breakdown<'a>(trades: impl IntoIterator<Item = &'a Trade>) -> Vec<MistakeBucket> {
    let mut mistakes: BTreeMap<String, Tally> = BTreeMap::new();
    for trade in trades {
        let tags: BTreeSet<&str> = trade
            .mistakes
            .iter()
            .map(String::as_str)
            .filter(|m| !m.is_empty())
            .collect();
        for tag in tags {
            tally_by_key(&mut mistakes, tag, trade);
        }
    }

    log::debug!("mistake breakdown: {} distinct tags", mistakes.len());

    ranked(mistakes)
        .into_iter()
        .map(|(mistake, stats)| MistakeBucket { mistake, stats })
        .collect()
}

/// Four fixed ranges in ascending order. Trades without rr_ratio are left out.
pub fn risk_reward_breakdown<'a>(
    trades: impl IntoIterator<Item = &'a Trade>,
) -> Vec<RiskRewardBucket> {
    let mut tallies: [Tally; 4] = Default::default();
    for trade in trades {
        if let Some(range) = trade.rr_ratio.and_then(RiskRewardRange::classify) {
            tallies[range.index()].add(trade);
        }
    }

    RiskRewardRange::ALL
        .into_iter()
        .zip(tallies.iter())
        .map(|(range, tally)| RiskRewardBucket {
            range,
            label: range.label().to_string(),
            stats: tally.finish(),
        })
        .collect()
}

pub fn pair_breakdown<'a>(trades: impl IntoIterator<Item = &'a Trade>) -> Vec<PairBreakdown> {
    let mut pairs: BTreeMap<String, Tally> = BTreeMap::new();
    for trade in trades {
        tally_by_key(&mut pairs, &trade.pair, trade);
    }

    ranked(pairs)
        .into_iter()
        .map(|(pair, stats)| PairBreakdown { pair, stats })
        .collect()
}
