//! Flow report assembly.
//!
//! Classifies a symbol's batch once, then hands the classified slice to the
//! aggregator, expiration ranker and snapshotter.

use chrono::NaiveDate;
use optflow_classifier::{ClassificationStats, TradeClassifier};
use optflow_core::{ClassifiedTrade, Config, FlowRecord, OptionType, Scenario};
use optflow_sentiment::{
    ExpirationRanker, ExpirationSummary, SentimentAggregator, SentimentReport, Snapshot, TimeWindowSnapshotter,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::debug;

/// Message carried by the empty-batch result.
pub const NO_DATA_MESSAGE: &str = "No data available";

/// Headline numbers for the whole batch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OverallSummary {
    pub total_trades_analyzed: usize,
    pub most_active_expiry: Option<NaiveDate>,
    pub largest_trade_premium: Option<f64>,
}

/// Full report for one symbol and look-back window.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FlowReport {
    pub symbol: String,
    pub total_contracts: u64,
    pub total_premium: f64,
    pub total_calls: u64,
    pub total_puts: u64,
    /// Put size over call size, two decimals. `None` when no call size was traded.
    pub put_call_ratio: Option<f64>,
    pub largest_trade: Option<ClassifiedTrade>,
    #[serde(rename = "most_active_expirations")]
    pub top_expirations: Vec<ExpirationSummary>,
    /// Keyed by cutoff label (`"HH:MM"`). Missing keys mean no prints yet.
    #[serde(rename = "time_analysis")]
    pub time_snapshots: BTreeMap<String, Snapshot>,
    pub market_sentiment: SentimentReport,
    pub overall_summary: OverallSummary,
    /// Latest trade date in the batch.
    pub last_update: Option<NaiveDate>,
    pub classification: ClassificationStats,
}

/// Returned instead of a report when the batch is empty.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmptyBatchResult {
    pub message: String,
    pub scenario: Scenario,
    pub score: i8,
    pub sentiment_score: f64,
}

impl Default for EmptyBatchResult {
    fn default() -> Self {
        Self {
            message: NO_DATA_MESSAGE.to_string(),
            scenario: Scenario::Neutral,
            score: 0,
            sentiment_score: 0.0,
        }
    }
}

/// Outcome of [`FlowReportBuilder::classify_and_score`].
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FlowAnalysis {
    Report(Box<FlowReport>),
    NoData(EmptyBatchResult),
}

impl FlowAnalysis {
    pub fn report(&self) -> Option<&FlowReport> {
        match self {
            FlowAnalysis::Report(report) => Some(report),
            FlowAnalysis::NoData(_) => None,
        }
    }

    pub fn into_report(self) -> Option<FlowReport> {
        match self {
            FlowAnalysis::Report(report) => Some(*report),
            FlowAnalysis::NoData(_) => None,
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, FlowAnalysis::NoData(_))
    }

    pub fn scenario(&self) -> Scenario {
        match self {
            FlowAnalysis::Report(report) => report.market_sentiment.scenario,
            FlowAnalysis::NoData(empty) => empty.scenario,
        }
    }

    pub fn score(&self) -> i8 {
        match self {
            FlowAnalysis::Report(report) => report.market_sentiment.score,
            FlowAnalysis::NoData(empty) => empty.score,
        }
    }
}

/// Contract and premium totals for a classified batch.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct FlowTotals {
    pub contracts: f64,
    pub calls: f64,
    pub puts: f64,
    pub premium: f64,
}

impl FlowTotals {
    pub fn from_trades(trades: &[ClassifiedTrade]) -> Self {
        let mut totals = Self::default();
        for trade in trades {
            if let Some(size) = trade.record.size.filter(|v| v.is_finite()) {
                totals.contracts += size;
                match trade.option_type {
                    OptionType::Call => totals.calls += size,
                    OptionType::Put => totals.puts += size,
                    OptionType::Unknown => {}
                }
            }
            if let Some(premium) = trade.record.premium.filter(|v| v.is_finite()) {
                totals.premium += premium;
            }
        }
        totals
    }

    /// Put size over call size rounded to two decimals, `None` when call size is 0.
    pub fn put_call_ratio(&self) -> Option<f64> {
        if self.calls == 0.0 {
            None
        } else {
            Some(round2(self.puts / self.calls))
        }
    }
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

fn to_count(value: f64) -> u64 {
    value.max(0.0).round() as u64
}

/// The print with the highest readable premium. The first one wins ties.
pub fn largest_trade(trades: &[ClassifiedTrade]) -> Option<&ClassifiedTrade> {
    let mut best: Option<(&ClassifiedTrade, f64)> = None;
    for trade in trades {
        let Some(premium) = trade.record.premium.filter(|v| v.is_finite()) else {
            continue;
        };
        if best.map_or(true, |(_, top)| premium > top) {
            best = Some((trade, premium));
        }
    }
    best.map(|(trade, _)| trade)
}

/// Stateless report pipeline built from a [`Config`].
#[derive(Debug, Clone)]
pub struct FlowReportBuilder {
    classifier: TradeClassifier,
    aggregator: SentimentAggregator,
    ranker: ExpirationRanker,
    snapshotter: TimeWindowSnapshotter,
}

impl Default for FlowReportBuilder {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}

impl FlowReportBuilder {
    pub fn from_config(config: &Config) -> Self {
        let aggregator = SentimentAggregator::new(config.policy.clone());
        let ranker = ExpirationRanker::new(aggregator.clone(), config.ranking.top_n);
        let snapshotter = TimeWindowSnapshotter::new(aggregator.clone(), ranker.clone(), config.snapshots.cutoffs.clone());
        Self {
            classifier: TradeClassifier::new(config.intent.clone()),
            aggregator,
            ranker,
            snapshotter,
        }
    }

    pub fn classifier(&self) -> &TradeClassifier {
        &self.classifier
    }

    pub fn aggregator(&self) -> &SentimentAggregator {
        &self.aggregator
    }

    /// Classify and score one symbol's batch.
    ///
    /// An empty batch short-circuits to [`FlowAnalysis::NoData`].
    pub fn classify_and_score(&self, records: &[FlowRecord], reference_date: NaiveDate) -> FlowAnalysis {
        if records.is_empty() {
            debug!("empty flow batch");
            return FlowAnalysis::NoData(EmptyBatchResult::default());
        }
        let trades = self.classifier.classify_batch(records);
        FlowAnalysis::Report(Box::new(self.build_report(&trades, reference_date)))
    }

    /// Assemble a report from an already-classified, non-empty batch.
    pub fn build_report(&self, trades: &[ClassifiedTrade], reference_date: NaiveDate) -> FlowReport {
        let totals = FlowTotals::from_trades(trades);
        let largest = largest_trade(trades);
        let top_expirations = self.ranker.rank(trades, reference_date);
        let time_snapshots = self.snapshotter.snapshots(trades, reference_date);
        let market_sentiment = self.aggregator.aggregate(trades);

        let overall_summary = OverallSummary {
            total_trades_analyzed: trades.len(),
            most_active_expiry: top_expirations.first().map(|s| s.expiry),
            largest_trade_premium: largest.and_then(|t| t.record.premium),
        };

        debug!(
            trades = trades.len(),
            expirations = top_expirations.len(),
            snapshots = time_snapshots.len(),
            scenario = %market_sentiment.scenario,
            "built flow report"
        );

        FlowReport {
            symbol: trades.first().map(|t| t.record.symbol.clone()).unwrap_or_default(),
            total_contracts: to_count(totals.contracts),
            total_premium: totals.premium,
            total_calls: to_count(totals.calls),
            total_puts: to_count(totals.puts),
            put_call_ratio: totals.put_call_ratio(),
            largest_trade: largest.cloned(),
            top_expirations,
            time_snapshots,
            market_sentiment,
            overall_summary,
            last_update: trades.iter().filter_map(|t| t.record.trade_date).max(),
            classification: ClassificationStats::from_trades(trades),
        }
    }
}

/// [`FlowReportBuilder::classify_and_score`] with the default configuration.
pub fn classify_and_score(records: &[FlowRecord], reference_date: NaiveDate) -> FlowAnalysis {
    FlowReportBuilder::default().classify_and_score(records, reference_date)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use optflow_core::QuoteSide;

    fn record(put_call: OptionType, side: QuoteSide, size: f64, premium: f64) -> FlowRecord {
        FlowRecord {
            symbol: "SPY".to_string(),
            put_call,
            side,
            size: Some(size),
            open_int: Some(1_000.0),
            premium: Some(premium),
            volume: Some(size),
            expiry: NaiveDate::from_ymd_opt(2024, 3, 15),
            strike: Some(500.0),
            trade_date: NaiveDate::from_ymd_opt(2024, 3, 1),
            ..Default::default()
        }
    }

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, 1).unwrap()
    }

    #[test]
    fn test_round2() {
        assert_relative_eq!(round2(0.666_666), 0.67);
        assert_relative_eq!(round2(1.0), 1.0);
    }

    #[test]
    fn test_put_call_ratio() {
        let builder = FlowReportBuilder::default();
        let trades = builder.classifier().classify_batch(&[
            record(OptionType::Call, QuoteSide::Ask, 30.0, 100.0),
            record(OptionType::Put, QuoteSide::Ask, 20.0, 100.0),
        ]);
        let totals = FlowTotals::from_trades(&trades);
        assert_eq!(totals.put_call_ratio(), Some(0.67));

        let puts_only = builder
            .classifier()
            .classify_batch(&[record(OptionType::Put, QuoteSide::Ask, 20.0, 100.0)]);
        assert_eq!(FlowTotals::from_trades(&puts_only).put_call_ratio(), None);
    }

    #[test]
    fn test_largest_trade_first_wins_ties() {
        let builder = FlowReportBuilder::default();
        let mut first = record(OptionType::Call, QuoteSide::Ask, 10.0, 5_000.0);
        first.strike = Some(510.0);
        let trades = builder.classifier().classify_batch(&[
            record(OptionType::Put, QuoteSide::Bid, 10.0, 1_000.0),
            first,
            record(OptionType::Call, QuoteSide::Ask, 10.0, 5_000.0),
        ]);
        let largest = largest_trade(&trades).unwrap();
        assert_eq!(largest.record.strike, Some(510.0));
    }

    #[test]
    fn test_empty_batch_short_circuits() {
        let analysis = classify_and_score(&[], today());
        assert!(analysis.is_empty());
        assert_eq!(analysis.scenario(), Scenario::Neutral);
        assert_eq!(analysis.score(), 0);
        assert!(analysis.report().is_none());
    }

    #[test]
    fn test_report_fields() {
        let analysis = classify_and_score(
            &[
                record(OptionType::Call, QuoteSide::Ask, 10.0, 4_000.0),
                record(OptionType::Put, QuoteSide::Mid, 5.0, 1_000.0),
            ],
            today(),
        );
        let report = analysis.report().unwrap();
        assert_eq!(report.symbol, "SPY");
        assert_eq!(report.total_contracts, 15);
        assert_eq!(report.total_calls, 10);
        assert_eq!(report.total_puts, 5);
        assert_relative_eq!(report.total_premium, 5_000.0);
        assert_eq!(report.put_call_ratio, Some(0.5));
        assert_eq!(report.overall_summary.total_trades_analyzed, 2);
        assert_eq!(report.overall_summary.largest_trade_premium, Some(4_000.0));
        assert_eq!(report.overall_summary.most_active_expiry, NaiveDate::from_ymd_opt(2024, 3, 15));
        assert_eq!(report.last_update, Some(today()));
        assert_eq!(report.classification.total_trades, 2);
        assert!(report.market_sentiment.sentiment_score > 0.0);
    }

    #[test]
    fn test_report_json_field_names() {
        let analysis = classify_and_score(
            &[
                record(OptionType::Call, QuoteSide::Ask, 10.0, 4_000.0),
                record(OptionType::Put, QuoteSide::Mid, 5.0, 1_000.0),
            ],
            today(),
        );
        let json = serde_json::to_value(&analysis).unwrap();
        assert!(json["most_active_expirations"].is_array());
        assert!(json["time_analysis"].is_object());
        assert!(json.get("top_expirations").is_none());
        assert!(json.get("time_snapshots").is_none());

        let vs = &json["market_sentiment"]["vs_metrics"];
        assert!(vs["left"].is_object());
        assert!(vs["right"].is_object());
        assert_eq!(vs["left"], json["market_sentiment"]["details"]["metrics"]["Bullish Metrics"]);
    }

    #[test]
    fn test_no_data_serializes_flat() {
        let json = serde_json::to_value(classify_and_score(&[], today())).unwrap();
        assert_eq!(json["message"], NO_DATA_MESSAGE);
        assert_eq!(json["scenario"], "Neutral");
        assert_eq!(json["score"], 0);
    }
}
