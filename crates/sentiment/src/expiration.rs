//! Per-expiration aggregation and ranking.

use crate::aggregator::{SentimentAggregator, SentimentReport};
use chrono::NaiveDate;
use optflow_core::{ClassifiedTrade, OptionType, Price, Scenario};
use ordered_float::OrderedFloat;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use tracing::debug;

/// Aggregates for one expiration date.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExpirationSummary {
    pub expiry: NaiveDate,
    /// Whole days from the reference date.
    pub days_to_expiry: i64,
    /// Contracts traded (readable sizes only).
    pub total_contracts: u64,
    pub total_premium: f64,
    /// Premium from opening prints.
    pub opening_premium: f64,
    /// Call contracts.
    pub total_calls: u64,
    /// Put contracts.
    pub total_puts: u64,
    /// Strike with the most contracts. Ties go to the strike seen first.
    pub dominant_strike: Option<f64>,
    pub scenario: Scenario,
    pub score: i8,
    pub sentiment: SentimentReport,
}

fn to_contracts(total: f64) -> u64 {
    total.max(0.0).round() as u64
}

/// Strike with the largest summed size. Among equal sums the strike first
/// encountered in input order wins.
pub fn dominant_strike<'a, I>(trades: I) -> Option<f64>
where
    I: IntoIterator<Item = &'a ClassifiedTrade>,
{
    let mut tally: Vec<(Price, f64)> = Vec::new();
    let mut index: HashMap<Price, usize> = HashMap::new();

    for trade in trades {
        let (Some(strike), Some(size)) = (trade.record.strike, trade.record.size) else {
            continue;
        };
        if !strike.is_finite() || !size.is_finite() {
            continue;
        }
        let key = OrderedFloat(strike);
        match index.get(&key) {
            Some(&i) => tally[i].1 += size,
            None => {
                index.insert(key, tally.len());
                tally.push((key, size));
            }
        }
    }

    let mut best: Option<(Price, f64)> = None;
    for (strike, size) in tally {
        if best.map_or(true, |(_, best_size)| size > best_size) {
            best = Some((strike, size));
        }
    }
    best.map(|(strike, _)| strike.into_inner())
}

/// Groups by expiry, aggregates each group, and keeps the busiest.
#[derive(Debug, Clone)]
pub struct ExpirationRanker {
    aggregator: SentimentAggregator,
    top_n: usize,
}

impl ExpirationRanker {
    pub fn new(aggregator: SentimentAggregator, top_n: usize) -> Self {
        Self { aggregator, top_n }
    }

    pub fn top_n(&self) -> usize {
        self.top_n
    }

    /// Rank current and future expirations by contracts, descending.
    ///
    /// Prints with an unreadable or past expiry are ignored. Groups with equal
    /// contract counts stay in ascending expiry order.
    pub fn rank<'a, I>(&self, trades: I, today: NaiveDate) -> Vec<ExpirationSummary>
    where
        I: IntoIterator<Item = &'a ClassifiedTrade>,
    {
        let mut groups: BTreeMap<NaiveDate, Vec<&ClassifiedTrade>> = BTreeMap::new();
        let mut dropped = 0usize;

        for trade in trades {
            match trade.record.expiry {
                Some(expiry) if expiry >= today => groups.entry(expiry).or_default().push(trade),
                _ => dropped += 1,
            }
        }

        let mut summaries: Vec<ExpirationSummary> = groups
            .into_iter()
            .map(|(expiry, group)| self.summarize(expiry, &group, today))
            .collect();

        // Stable: equal counts keep ascending expiry order.
        summaries.sort_by(|a, b| b.total_contracts.cmp(&a.total_contracts));
        summaries.truncate(self.top_n);

        debug!(
            expirations = summaries.len(),
            dropped, "ranked expirations"
        );
        summaries
    }

    /// Aggregate one expiration group.
    pub fn summarize(&self, expiry: NaiveDate, group: &[&ClassifiedTrade], today: NaiveDate) -> ExpirationSummary {
        let mut contracts = 0.0;
        let mut calls = 0.0;
        let mut puts = 0.0;
        let mut total_premium = 0.0;
        let mut opening_premium = 0.0;

        for trade in group {
            if let Some(size) = trade.record.size.filter(|s| s.is_finite()) {
                contracts += size;
                match trade.option_type {
                    OptionType::Call => calls += size,
                    OptionType::Put => puts += size,
                    OptionType::Unknown => {}
                }
            }
            if let Some(premium) = trade.record.premium.filter(|p| p.is_finite()) {
                total_premium += premium;
                if trade.is_opening {
                    opening_premium += premium;
                }
            }
        }

        let sentiment = self.aggregator.aggregate(group.iter().copied());

        ExpirationSummary {
            expiry,
            days_to_expiry: (expiry - today).num_days(),
            total_contracts: to_contracts(contracts),
            total_premium,
            opening_premium,
            total_calls: to_contracts(calls),
            total_puts: to_contracts(puts),
            dominant_strike: dominant_strike(group.iter().copied()),
            scenario: sentiment.scenario,
            score: sentiment.score,
            sentiment,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use optflow_core::{FlowRecord, OrderAction, Sentiment};

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn make_trade(expiry: Option<NaiveDate>, strike: f64, size: f64) -> ClassifiedTrade {
        ClassifiedTrade {
            record: FlowRecord {
                put_call: OptionType::Call,
                size: Some(size),
                premium: Some(size * 100.0),
                strike: Some(strike),
                expiry,
                ..Default::default()
            },
            option_type: OptionType::Call,
            order_action: OrderAction::BuyToOpen,
            sentiment: Sentiment::Bullish,
            description: String::new(),
            is_opening: true,
            is_unusual: false,
            is_adding: false,
            is_profit_taking: false,
            is_closing: false,
        }
    }

    fn ranker() -> ExpirationRanker {
        ExpirationRanker::new(SentimentAggregator::default(), 5)
    }

    #[test]
    fn test_dominant_strike_tie_goes_to_first_seen() {
        let trades = vec![
            make_trade(None, 105.0, 10.0),
            make_trade(None, 100.0, 10.0),
            make_trade(None, 110.0, 5.0),
        ];
        assert_eq!(dominant_strike(&trades), Some(105.0));

        let trades = vec![
            make_trade(None, 105.0, 10.0),
            make_trade(None, 100.0, 6.0),
            make_trade(None, 100.0, 6.0),
        ];
        assert_eq!(dominant_strike(&trades), Some(100.0));
    }

    #[test]
    fn test_dominant_strike_none_without_strikes() {
        let mut trade = make_trade(None, 100.0, 10.0);
        trade.record.strike = None;
        assert_eq!(dominant_strike(&vec![trade]), None);
        assert_eq!(dominant_strike(&Vec::<ClassifiedTrade>::new()), None);
    }

    #[test]
    fn test_past_and_unparseable_expiries_excluded() {
        let today = date(2024, 3, 1);
        let trades = vec![
            make_trade(Some(date(2024, 2, 28)), 100.0, 500.0),
            make_trade(None, 100.0, 500.0),
            make_trade(Some(today), 100.0, 5.0),
            make_trade(Some(date(2024, 3, 8)), 100.0, 10.0),
        ];
        let ranked = ranker().rank(&trades, today);
        assert_eq!(ranked.len(), 2);
        assert!(ranked.iter().all(|s| s.expiry >= today));
        assert_eq!(ranked[0].expiry, date(2024, 3, 8));
        assert_eq!(ranked[0].days_to_expiry, 7);
        assert_eq!(ranked[1].days_to_expiry, 0);
    }

    #[test]
    fn test_sorted_descending_and_truncated() {
        let today = date(2024, 3, 1);
        let trades: Vec<ClassifiedTrade> = (1..=7)
            .map(|i| make_trade(Some(date(2024, 3, i + 1)), 100.0, (i * 10) as f64))
            .collect();
        let ranked = ranker().rank(&trades, today);
        assert_eq!(ranked.len(), 5);
        assert!(ranked.windows(2).all(|w| w[0].total_contracts >= w[1].total_contracts));
        assert_eq!(ranked[0].total_contracts, 70);
    }

    #[test]
    fn test_equal_counts_keep_expiry_order() {
        let today = date(2024, 3, 1);
        let trades = vec![
            make_trade(Some(date(2024, 3, 15)), 100.0, 10.0),
            make_trade(Some(date(2024, 3, 8)), 100.0, 10.0),
        ];
        let ranked = ranker().rank(&trades, today);
        assert_eq!(ranked[0].expiry, date(2024, 3, 8));
        assert_eq!(ranked[1].expiry, date(2024, 3, 15));
    }

    #[test]
    fn test_summary_fields() {
        let today = date(2024, 3, 1);
        let expiry = date(2024, 3, 15);
        let mut put = make_trade(Some(expiry), 95.0, 4.0);
        put.option_type = OptionType::Put;
        put.record.put_call = OptionType::Put;
        put.is_opening = false;
        let trades = vec![
            make_trade(Some(expiry), 100.0, 10.0),
            make_trade(Some(expiry), 100.0, 6.0),
            put,
        ];
        let ranked = ranker().rank(&trades, today);
        let summary = &ranked[0];
        assert_eq!(summary.total_contracts, 20);
        assert_eq!(summary.total_calls, 16);
        assert_eq!(summary.total_puts, 4);
        assert_relative_eq!(summary.total_premium, 2_000.0);
        assert_relative_eq!(summary.opening_premium, 1_600.0);
        assert_eq!(summary.dominant_strike, Some(100.0));
        assert_eq!(summary.scenario, summary.sentiment.scenario);
        assert!(summary.score > 0);
    }
}
