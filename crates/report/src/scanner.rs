//! Watchlist setup scanning.
//!
//! Runs the report pipeline over many symbols on a bounded worker pool and
//! keeps the ones whose flow reads as an actionable setup.

use crate::builder::{FlowAnalysis, FlowReportBuilder};
use crate::source::FlowSource;
use anyhow::Context;
use chrono::NaiveDate;
use optflow_core::config::ScannerConfig;
use optflow_core::{Config, Scenario};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use tracing::{debug, warn};

/// Look-back windows reported by [`SetupScanner::horizons`].
pub const HORIZONS: [(&str, u32); 3] = [("2D", 2), ("1D", 1), ("Live", 0)];

/// A symbol whose flow matched a signal scenario.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Setup {
    pub symbol: String,
    pub scenario: Scenario,
    pub score: i8,
    pub sentiment_score: f64,
    pub last_trade_date: NaiveDate,
    pub total_premium: f64,
    pub put_call_ratio: Option<f64>,
    pub message: Option<String>,
}

/// Scenario read over one look-back window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Horizon {
    pub label: String,
    /// `None` when the window had no prints.
    pub scenario: Option<Scenario>,
    pub score: Option<i8>,
}

/// Upper-case, trim and de-duplicate symbols, keeping first occurrences.
pub fn normalize_symbols<S: AsRef<str>>(symbols: &[S]) -> Vec<String> {
    let mut seen = HashSet::new();
    symbols
        .iter()
        .map(|s| s.as_ref().trim().to_uppercase())
        .filter(|s| !s.is_empty())
        .filter(|s| seen.insert(s.clone()))
        .collect()
}

pub struct SetupScanner<S> {
    source: S,
    builder: FlowReportBuilder,
    config: ScannerConfig,
}

impl<S: FlowSource> SetupScanner<S> {
    pub fn new(source: S, config: &Config) -> Self {
        Self {
            source,
            builder: FlowReportBuilder::from_config(config),
            config: config.scanner.clone(),
        }
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    /// Scan a watchlist as of `reference_date`.
    ///
    /// Results are ordered by absolute scenario score, strongest first; equal
    /// scores keep watchlist order. Symbols whose fetch fails are skipped.
    pub fn scan<T>(&self, symbols: &[T], reference_date: NaiveDate) -> anyhow::Result<Vec<Setup>>
    where
        T: AsRef<str>,
    {
        let symbols = normalize_symbols(symbols);
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.config.workers)
            .build()
            .context("failed to build scanner thread pool")?;

        let mut setups: Vec<Setup> = pool.install(|| {
            symbols
                .par_iter()
                .filter_map(|symbol| self.evaluate(symbol, reference_date))
                .collect()
        });

        setups.sort_by(|a, b| b.score.unsigned_abs().cmp(&a.score.unsigned_abs()));
        setups.truncate(self.config.limit);

        debug!(
            symbols = symbols.len(),
            setups = setups.len(),
            "scanned watchlist"
        );
        Ok(setups)
    }

    fn evaluate(&self, symbol: &str, reference_date: NaiveDate) -> Option<Setup> {
        let records = match self.source.fetch_flow_records(symbol, self.config.date_range_days) {
            Ok(records) => records,
            Err(err) => {
                warn!(symbol, error = %err, "flow fetch failed, skipping symbol");
                return None;
            }
        };

        let report = self.builder.classify_and_score(&records, reference_date).into_report()?;
        let sentiment = &report.market_sentiment;
        if !sentiment.scenario.is_signal() {
            return None;
        }

        let last_trade_date = report.last_update?;
        if (reference_date - last_trade_date).num_days() > self.config.max_age_days {
            debug!(symbol, %last_trade_date, "stale setup dropped");
            return None;
        }

        Some(Setup {
            symbol: symbol.to_string(),
            scenario: sentiment.scenario,
            score: sentiment.score,
            sentiment_score: sentiment.sentiment_score,
            last_trade_date,
            total_premium: report.total_premium,
            put_call_ratio: report.put_call_ratio,
            message: sentiment.message().map(str::to_string),
        })
    }

    /// Scenario per look-back window (2 days, 1 day, live session).
    pub fn horizons(&self, symbol: &str, reference_date: NaiveDate) -> anyhow::Result<Vec<Horizon>> {
        let symbol = symbol.trim().to_uppercase();
        HORIZONS
            .iter()
            .map(|&(label, days)| {
                let records = self
                    .source
                    .fetch_flow_records(&symbol, days)
                    .with_context(|| format!("fetching {label} flow for {symbol}"))?;
                let analysis = self.builder.classify_and_score(&records, reference_date);
                let (scenario, score) = match analysis {
                    FlowAnalysis::Report(report) => (
                        Some(report.market_sentiment.scenario),
                        Some(report.market_sentiment.score),
                    ),
                    FlowAnalysis::NoData(_) => (None, None),
                };
                Ok::<_, anyhow::Error>(Horizon {
                    label: label.to_string(),
                    scenario,
                    score,
                })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::MemoryFlowSource;
    use optflow_core::{FlowRecord, OptionType, QuoteSide};

    struct FailingSource;

    impl FlowSource for FailingSource {
        fn fetch_flow_records(&self, symbol: &str, _: u32) -> anyhow::Result<Vec<FlowRecord>> {
            anyhow::bail!("upstream unavailable for {symbol}")
        }
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn buy(put_call: OptionType, premium: f64, day: NaiveDate) -> FlowRecord {
        FlowRecord {
            put_call,
            side: QuoteSide::Ask,
            size: Some(100.0),
            open_int: Some(10.0),
            premium: Some(premium),
            volume: Some(100.0),
            conds: "opening".to_string(),
            expiry: Some(date(2024, 6, 21)),
            strike: Some(100.0),
            trade_date: Some(day),
            ..Default::default()
        }
    }

    fn close_put(premium: f64, day: NaiveDate) -> FlowRecord {
        FlowRecord {
            side: QuoteSide::Below,
            conds: String::new(),
            ..buy(OptionType::Put, premium, day)
        }
    }

    fn source() -> MemoryFlowSource {
        let day = date(2024, 3, 1);
        MemoryFlowSource::new()
            // Strong bullish: call opening plus put closing.
            .with_symbol(
                "aapl",
                vec![buy(OptionType::Call, 50_000.0, day), close_put(5_000.0, day)],
            )
            // Bearish accumulation: puts lead, but not by 2x.
            .with_symbol(
                "msft",
                vec![buy(OptionType::Put, 30_000.0, day), buy(OptionType::Call, 20_000.0, day)],
            )
            // Stale.
            .with_symbol("old", vec![buy(OptionType::Call, 50_000.0, date(2024, 1, 2))])
    }

    #[test]
    fn test_normalize_symbols() {
        assert_eq!(normalize_symbols(&["aapl", " AAPL", "msft", ""]), vec!["AAPL", "MSFT"]);
    }

    #[test]
    fn test_scan_filters_sorts_and_drops_stale() {
        let scanner = SetupScanner::new(source(), &Config::default());
        let setups = scanner
            .scan(&["msft", "aapl", "old", "none"], date(2024, 3, 1))
            .unwrap();

        let symbols: Vec<&str> = setups.iter().map(|s| s.symbol.as_str()).collect();
        assert_eq!(symbols, vec!["AAPL", "MSFT"]);
        assert_eq!(setups[0].scenario, Scenario::StrongBullishFlow);
        assert_eq!(setups[1].scenario, Scenario::BearishAccumulation);
        assert!(setups.iter().all(|s| s.scenario.is_signal()));
    }

    #[test]
    fn test_scan_respects_limit() {
        let mut config = Config::default();
        config.scanner.limit = 1;
        let scanner = SetupScanner::new(source(), &config);
        let setups = scanner.scan(&["msft", "aapl"], date(2024, 3, 1)).unwrap();
        assert_eq!(setups.len(), 1);
        assert_eq!(setups[0].symbol, "AAPL");
    }

    #[test]
    fn test_scan_with_unvalidated_huge_lookback() {
        let mut config = Config::default();
        config.scanner.date_range_days = u32::MAX;
        assert!(config.validate().is_err());

        let scanner = SetupScanner::new(source(), &config);
        let setups = scanner.scan(&["aapl", "msft", "old"], date(2024, 3, 1)).unwrap();
        let symbols: Vec<&str> = setups.iter().map(|s| s.symbol.as_str()).collect();
        assert_eq!(symbols, vec!["AAPL", "MSFT"]);
    }

    #[test]
    fn test_scan_skips_failing_symbols() {
        let scanner = SetupScanner::new(FailingSource, &Config::default());
        let setups = scanner.scan(&["AAPL", "MSFT"], date(2024, 3, 1)).unwrap();
        assert!(setups.is_empty());
    }

    #[test]
    fn test_horizons() {
        let source = MemoryFlowSource::new().with_symbol(
            "AAPL",
            vec![
                buy(OptionType::Put, 80_000.0, date(2024, 2, 28)),
                buy(OptionType::Call, 50_000.0, date(2024, 3, 1)),
            ],
        );
        let scanner = SetupScanner::new(source, &Config::default());
        let horizons = scanner.horizons("aapl", date(2024, 3, 1)).unwrap();

        let labels: Vec<&str> = horizons.iter().map(|h| h.label.as_str()).collect();
        assert_eq!(labels, vec!["2D", "1D", "Live"]);
        assert!(horizons[0].score.unwrap() < 0);
        assert_eq!(horizons[2].scenario, Some(Scenario::BullishAccumulation));

        let missing = scanner.horizons("ZZZ", date(2024, 3, 1)).unwrap();
        assert!(missing.iter().all(|h| h.scenario.is_none()));
    }

    #[test]
    fn test_horizons_propagates_fetch_errors() {
        let scanner = SetupScanner::new(FailingSource, &Config::default());
        assert!(scanner.horizons("AAPL", date(2024, 3, 1)).is_err());
    }
}
