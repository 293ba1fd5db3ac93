//! Per-trade order-action and sentiment classification.
//!
//! Each print is looked up by (option type, quote side). Bid-side prints split
//! on whether the print is opening: selling to open and selling to close read
//! differently. Anything outside the table is "unknown / neutral".

use crate::predicates::IntentFlags;
use optflow_core::config::IntentConfig;
use optflow_core::{ClassifiedTrade, FlowRecord, OptionType, OrderAction, QuoteSide, Sentiment};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Base classification before intent clauses are appended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BaseRule {
    pub order_action: OrderAction,
    pub sentiment: Sentiment,
    pub description: &'static str,
}

const fn rule(order_action: OrderAction, sentiment: Sentiment, description: &'static str) -> BaseRule {
    BaseRule {
        order_action,
        sentiment,
        description,
    }
}

/// Description used when no rule matches.
pub const NO_MATCH_DESCRIPTION: &str = "no matching pattern";

/// Static rule table.
pub fn base_rule(option_type: OptionType, side: QuoteSide, opening: bool) -> Option<BaseRule> {
    use OrderAction::*;
    use Sentiment::*;

    let found = match (option_type, side) {
        (OptionType::Call, QuoteSide::Above) => rule(BuyToOpen, Bullish, "Aggressive call buying above the ask"),
        (OptionType::Call, QuoteSide::Ask) => rule(BuyToOpen, Bullish, "Calls bought at the ask"),
        (OptionType::Call, QuoteSide::Mid) => rule(Passive, Neutral, "Calls traded at the mid"),
        (OptionType::Call, QuoteSide::Bid) => match opening {
            true => rule(SellToOpen, Bearish, "Calls sold to open at the bid"),
            false => rule(SellToClose, Neutral, "Calls sold to close at the bid"),
        },
        (OptionType::Call, QuoteSide::Below) => rule(SellToClose, Bearish, "Aggressive call selling below the bid"),

        (OptionType::Put, QuoteSide::Above) => rule(BuyToOpen, Bearish, "Aggressive put buying above the ask"),
        (OptionType::Put, QuoteSide::Ask) => rule(BuyToOpen, Bearish, "Puts bought at the ask"),
        (OptionType::Put, QuoteSide::Mid) => rule(Passive, Neutral, "Puts traded at the mid"),
        (OptionType::Put, QuoteSide::Bid) => match opening {
            true => rule(SellToOpen, Bullish, "Puts sold to open at the bid"),
            false => rule(SellToClose, Neutral, "Puts sold to close at the bid"),
        },
        (OptionType::Put, QuoteSide::Below) => rule(SellToClose, Bullish, "Aggressive put selling below the bid"),

        (OptionType::Unknown, _) | (_, QuoteSide::Unknown) => return None,
    };
    Some(found)
}

/// Statistics over a classified batch.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ClassificationStats {
    /// Total trades classified.
    pub total_trades: u64,
    /// Trades read as bullish.
    pub bullish_trades: u64,
    /// Trades read as bearish.
    pub bearish_trades: u64,
    /// Trades read as neutral (including unknown).
    pub neutral_trades: u64,
    /// Trades that matched no rule.
    pub unknown_trades: u64,
    /// Opening prints.
    pub opening_trades: u64,
    /// Unusual prints.
    pub unusual_trades: u64,
    /// Rows whose size or premium could not be read.
    pub malformed_trades: u64,
}

impl ClassificationStats {
    /// Tally a classified batch.
    pub fn from_trades(trades: &[ClassifiedTrade]) -> Self {
        let mut stats = Self::default();
        for trade in trades {
            stats.total_trades += 1;
            match trade.sentiment {
                Sentiment::Bullish => stats.bullish_trades += 1,
                Sentiment::Bearish => stats.bearish_trades += 1,
                Sentiment::Neutral => stats.neutral_trades += 1,
            }
            if trade.order_action == OrderAction::Unknown {
                stats.unknown_trades += 1;
            }
            if trade.is_opening {
                stats.opening_trades += 1;
            }
            if trade.is_unusual {
                stats.unusual_trades += 1;
            }
            if trade.size_and_premium().is_none() {
                stats.malformed_trades += 1;
            }
        }
        stats
    }

    /// Fraction of trades that matched no rule.
    pub fn unknown_frac(&self) -> f64 {
        if self.total_trades > 0 {
            self.unknown_trades as f64 / self.total_trades as f64
        } else {
            0.0
        }
    }
}

/// Stateless trade classifier.
#[derive(Debug, Clone, Default)]
pub struct TradeClassifier {
    intent: IntentConfig,
}

impl TradeClassifier {
    /// Create a classifier with the given intent configuration.
    pub fn new(intent: IntentConfig) -> Self {
        Self { intent }
    }

    pub fn intent(&self) -> &IntentConfig {
        &self.intent
    }

    /// Classify a single record. Never fails.
    pub fn classify(&self, record: &FlowRecord) -> ClassifiedTrade {
        let flags = IntentFlags::evaluate(record, &self.intent);

        let (order_action, sentiment, description) =
            match base_rule(record.put_call, record.side, flags.opening) {
                Some(base) => {
                    let mut description = base.description.to_string();
                    if flags.opening {
                        description.push_str(" - opening position");
                    }
                    if flags.unusual {
                        description.push_str(" - unusual activity");
                    }
                    (base.order_action, base.sentiment, description)
                }
                None => (
                    OrderAction::Unknown,
                    Sentiment::Neutral,
                    NO_MATCH_DESCRIPTION.to_string(),
                ),
            };

        ClassifiedTrade {
            record: record.clone(),
            option_type: record.put_call,
            order_action,
            sentiment,
            description,
            is_opening: flags.opening,
            is_unusual: flags.unusual,
            is_adding: flags.adding,
            is_profit_taking: flags.profit_taking,
            is_closing: flags.closing,
        }
    }

    /// Classify a batch, preserving input order.
    pub fn classify_batch(&self, records: &[FlowRecord]) -> Vec<ClassifiedTrade> {
        let classified: Vec<ClassifiedTrade> = records.iter().map(|r| self.classify(r)).collect();
        debug!(
            records = records.len(),
            unknown = classified
                .iter()
                .filter(|t| t.order_action == OrderAction::Unknown)
                .count(),
            "classified flow batch"
        );
        classified
    }
}
