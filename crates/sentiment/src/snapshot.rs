//! Intraday sentiment snapshots.
//!
//! Re-aggregates the latest session's prints at fixed cutoff times so a caller
//! can see how the read evolved through the day. Classification is not redone;
//! the already-classified slice is filtered.

use crate::aggregator::{EvidenceMetrics, SentimentAggregator};
use crate::expiration::ExpirationRanker;
use chrono::{NaiveDate, NaiveTime};
use optflow_core::{ClassifiedTrade, Scenario};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Sentiment as of one cutoff.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub cutoff: NaiveTime,
    /// Prints at or before the cutoff.
    pub trade_count: usize,
    pub scenario: Scenario,
    pub score: i8,
    pub sentiment_score: f64,
    pub message: Option<String>,
    pub metrics: Option<EvidenceMetrics>,
    pub most_active_expiration: Option<NaiveDate>,
    pub most_active_strike: Option<f64>,
}

/// Label used as the snapshot key, e.g. `"11:30"`.
pub fn cutoff_label(cutoff: NaiveTime) -> String {
    cutoff.format("%H:%M").to_string()
}

/// Latest session date present among timestamped prints.
pub fn session_date(trades: &[ClassifiedTrade]) -> Option<NaiveDate> {
    trades
        .iter()
        .filter(|t| t.record.trade_time.is_some())
        .filter_map(|t| t.record.trade_date)
        .max()
}

#[derive(Debug, Clone)]
pub struct TimeWindowSnapshotter {
    aggregator: SentimentAggregator,
    ranker: ExpirationRanker,
    cutoffs: Vec<NaiveTime>,
}

impl TimeWindowSnapshotter {
    pub fn new(aggregator: SentimentAggregator, ranker: ExpirationRanker, cutoffs: Vec<NaiveTime>) -> Self {
        Self {
            aggregator,
            ranker,
            cutoffs,
        }
    }

    pub fn cutoffs(&self) -> &[NaiveTime] {
        &self.cutoffs
    }

    /// Snapshots for the latest session in the batch, keyed by cutoff label.
    /// Cutoffs with no prints yet are omitted.
    pub fn snapshots(&self, trades: &[ClassifiedTrade], today: NaiveDate) -> BTreeMap<String, Snapshot> {
        let Some(session) = session_date(trades) else {
            return BTreeMap::new();
        };

        self.cutoffs
            .iter()
            .filter_map(|&cutoff| {
                self.snapshot_at(trades, session, cutoff, today)
                    .map(|snap| (cutoff_label(cutoff), snap))
            })
            .collect()
    }

    /// Snapshot of `session` up to and including `cutoff`, or `None` if no
    /// print falls in that window.
    pub fn snapshot_at(
        &self,
        trades: &[ClassifiedTrade],
        session: NaiveDate,
        cutoff: NaiveTime,
        today: NaiveDate,
    ) -> Option<Snapshot> {
        let window: Vec<&ClassifiedTrade> = trades
            .iter()
            .filter(|t| t.record.trade_date == Some(session))
            .filter(|t| t.record.trade_time.is_some_and(|time| time <= cutoff))
            .collect();

        if window.is_empty() {
            return None;
        }

        let report = self.aggregator.aggregate(window.iter().copied());
        let top = self.ranker.rank(window.iter().copied(), today).into_iter().next();

        Some(Snapshot {
            cutoff,
            trade_count: window.len(),
            scenario: report.scenario,
            score: report.score,
            sentiment_score: report.sentiment_score,
            message: report.message().map(str::to_string),
            metrics: report.metrics().cloned(),
            most_active_expiration: top.as_ref().map(|s| s.expiry),
            most_active_strike: top.and_then(|s| s.dominant_strike),
        })
    }
}
