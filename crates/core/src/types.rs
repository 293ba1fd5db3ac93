//! Core data types for the optflow system.

use crate::coerce::{lenient_date, lenient_f64, lenient_string, lenient_time, safe_f64};
use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use ordered_float::OrderedFloat;
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

/// Strike price with ordering support.
pub type Price = OrderedFloat<f64>;

/// Contract type of an option print.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum OptionType {
    Call,
    Put,
    /// Anything that is not recognisably a call or a put.
    #[default]
    Unknown,
}

impl OptionType {
    pub fn as_str(self) -> &'static str {
        match self {
            OptionType::Call => "call",
            OptionType::Put => "put",
            OptionType::Unknown => "unknown",
        }
    }
}

impl From<&str> for OptionType {
    fn from(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "call" | "calls" | "c" => OptionType::Call,
            "put" | "puts" | "p" => OptionType::Put,
            _ => OptionType::Unknown,
        }
    }
}

impl<'de> Deserialize<'de> for OptionType {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        lenient_string(deserializer).map(|s| OptionType::from(s.as_str()))
    }
}

/// Where the print executed relative to the prevailing quote.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum QuoteSide {
    /// Above the ask.
    Above,
    /// At the ask.
    Ask,
    /// Between bid and ask.
    Mid,
    /// At the bid.
    Bid,
    /// Below the bid.
    Below,
    #[default]
    Unknown,
}

impl QuoteSide {
    pub fn as_str(self) -> &'static str {
        match self {
            QuoteSide::Above => "above",
            QuoteSide::Ask => "ask",
            QuoteSide::Mid => "mid",
            QuoteSide::Bid => "bid",
            QuoteSide::Below => "below",
            QuoteSide::Unknown => "unknown",
        }
    }
}

impl From<&str> for QuoteSide {
    fn from(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "above" | "above ask" | "above_ask" => QuoteSide::Above,
            "ask" | "at ask" => QuoteSide::Ask,
            "mid" | "middle" => QuoteSide::Mid,
            "bid" | "at bid" => QuoteSide::Bid,
            "below" | "below bid" | "below_bid" => QuoteSide::Below,
            _ => QuoteSide::Unknown,
        }
    }
}

impl<'de> Deserialize<'de> for QuoteSide {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        lenient_string(deserializer).map(|s| QuoteSide::from(s.as_str()))
    }
}

/// Inferred order intent of a print.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum OrderAction {
    BuyToOpen,
    SellToOpen,
    SellToClose,
    /// Mid-market execution with no inferable direction.
    Passive,
    Unknown,
}

impl OrderAction {
    pub fn as_str(self) -> &'static str {
        match self {
            OrderAction::BuyToOpen => "buy-to-open",
            OrderAction::SellToOpen => "sell-to-open",
            OrderAction::SellToClose => "sell-to-close",
            OrderAction::Passive => "passive",
            OrderAction::Unknown => "unknown",
        }
    }
}

/// Directional read of a single print.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sentiment {
    Bullish,
    Bearish,
    Neutral,
}

impl Sentiment {
    pub fn as_str(self) -> &'static str {
        match self {
            Sentiment::Bullish => "bullish",
            Sentiment::Bearish => "bearish",
            Sentiment::Neutral => "neutral",
        }
    }
}

/// One executed option trade print, as delivered by the flow source.
///
/// Numeric and date fields are optional because exports routinely contain
/// blanks or junk; `None` means "could not be read".
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FlowRecord {
    /// Underlying symbol.
    #[serde(default, deserialize_with = "lenient_string")]
    pub symbol: String,
    /// Call or put.
    #[serde(default)]
    pub put_call: OptionType,
    /// Execution side relative to the quote.
    #[serde(default)]
    pub side: QuoteSide,
    /// Contracts traded.
    #[serde(default, deserialize_with = "lenient_f64")]
    pub size: Option<f64>,
    /// Open interest before the trade.
    #[serde(default, deserialize_with = "lenient_f64")]
    pub open_int: Option<f64>,
    /// Dollar premium of the print.
    #[serde(default, deserialize_with = "lenient_f64")]
    pub premium: Option<f64>,
    /// Cumulative session volume for the contract.
    #[serde(default, deserialize_with = "lenient_f64")]
    pub volume: Option<f64>,
    /// Free-text condition codes (e.g. "opening unusual").
    #[serde(default, deserialize_with = "lenient_string")]
    pub conds: String,
    /// Expiration date.
    #[serde(default, deserialize_with = "lenient_date")]
    pub expiry: Option<NaiveDate>,
    /// Strike price.
    #[serde(default, deserialize_with = "lenient_f64")]
    pub strike: Option<f64>,
    /// Option trade price.
    #[serde(default, deserialize_with = "lenient_f64")]
    pub price: Option<f64>,
    /// Underlying price at execution.
    #[serde(default, deserialize_with = "lenient_f64")]
    pub spot: Option<f64>,
    /// Session date of the print.
    #[serde(default, deserialize_with = "lenient_date")]
    pub trade_date: Option<NaiveDate>,
    /// Exchange-local time of the print.
    #[serde(default, deserialize_with = "lenient_time")]
    pub trade_time: Option<NaiveTime>,
}

impl FlowRecord {
    /// Size coerced to a number (0.0 when unreadable).
    #[inline]
    pub fn size_or_zero(&self) -> f64 {
        safe_f64(self.size)
    }

    /// Open interest coerced to a number (0.0 when unreadable).
    #[inline]
    pub fn open_int_or_zero(&self) -> f64 {
        safe_f64(self.open_int)
    }

    /// Volume coerced to a number (0.0 when unreadable).
    #[inline]
    pub fn volume_or_zero(&self) -> f64 {
        safe_f64(self.volume)
    }

    /// Full timestamp, if both date and time were readable.
    pub fn timestamp(&self) -> Option<NaiveDateTime> {
        Some(self.trade_date?.and_time(self.trade_time?))
    }
}

/// A flow record with its derived classification attached.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassifiedTrade {
    /// Original record.
    #[serde(flatten)]
    pub record: FlowRecord,
    /// Parsed contract type (same as `record.put_call`).
    pub option_type: OptionType,
    /// Inferred order intent.
    pub order_action: OrderAction,
    /// Directional read.
    pub sentiment: Sentiment,
    /// Human-readable explanation of the classification.
    pub description: String,
    pub is_opening: bool,
    pub is_unusual: bool,
    /// Looks like an addition to an existing position. Informational only.
    pub is_adding: bool,
    pub is_profit_taking: bool,
    pub is_closing: bool,
}

impl ClassifiedTrade {
    /// Size and premium, if both are usable for summation.
    #[inline]
    pub fn size_and_premium(&self) -> Option<(f64, f64)> {
        let size = self.record.size.filter(|v| v.is_finite())?;
        let premium = self.record.premium.filter(|v| v.is_finite())?;
        Some((size, premium))
    }
}

/// Named market scenario assigned to an aggregated batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Scenario {
    #[serde(rename = "Strong Bullish Flow")]
    StrongBullishFlow,
    #[serde(rename = "Bullish Accumulation")]
    BullishAccumulation,
    #[serde(rename = "Bullish Profit-Taking/Unwinding")]
    BullishProfitTaking,
    #[serde(rename = "Bullish Positioning")]
    BullishPositioning,
    #[serde(rename = "Mildly Bullish")]
    MildlyBullish,
    #[serde(rename = "Neutral")]
    Neutral,
    #[serde(rename = "Mildly Bearish")]
    MildlyBearish,
    #[serde(rename = "Bearish Positioning")]
    BearishPositioning,
    #[serde(rename = "Bearish Accumulation")]
    BearishAccumulation,
    #[serde(rename = "Bearish Profit-Taking/Distribution")]
    BearishProfitTaking,
    #[serde(rename = "Strong Bearish Flow")]
    StrongBearishFlow,
}

impl Scenario {
    /// The complete scenario vocabulary, strongest bullish to strongest bearish.
    pub const ALL: [Scenario; 11] = [
        Scenario::StrongBullishFlow,
        Scenario::BullishAccumulation,
        Scenario::BullishProfitTaking,
        Scenario::BullishPositioning,
        Scenario::MildlyBullish,
        Scenario::Neutral,
        Scenario::MildlyBearish,
        Scenario::BearishPositioning,
        Scenario::BearishAccumulation,
        Scenario::BearishProfitTaking,
        Scenario::StrongBearishFlow,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Scenario::StrongBullishFlow => "Strong Bullish Flow",
            Scenario::BullishAccumulation => "Bullish Accumulation",
            Scenario::BullishProfitTaking => "Bullish Profit-Taking/Unwinding",
            Scenario::BullishPositioning => "Bullish Positioning",
            Scenario::MildlyBullish => "Mildly Bullish",
            Scenario::Neutral => "Neutral",
            Scenario::MildlyBearish => "Mildly Bearish",
            Scenario::BearishPositioning => "Bearish Positioning",
            Scenario::BearishAccumulation => "Bearish Accumulation",
            Scenario::BearishProfitTaking => "Bearish Profit-Taking/Distribution",
            Scenario::StrongBearishFlow => "Strong Bearish Flow",
        }
    }

    /// Integer tier in [-3, 3].
    pub fn score(self) -> i8 {
        match self {
            Scenario::StrongBullishFlow => 3,
            Scenario::BullishAccumulation | Scenario::BullishProfitTaking => 2,
            Scenario::BullishPositioning => 1,
            Scenario::MildlyBullish | Scenario::Neutral | Scenario::MildlyBearish => 0,
            Scenario::BearishPositioning => -1,
            Scenario::BearishAccumulation | Scenario::BearishProfitTaking => -2,
            Scenario::StrongBearishFlow => -3,
        }
    }

    /// Scenarios worth surfacing as a watchlist setup.
    pub fn is_signal(self) -> bool {
        matches!(
            self,
            Scenario::StrongBullishFlow
                | Scenario::BullishAccumulation
                | Scenario::BullishPositioning
                | Scenario::BearishPositioning
                | Scenario::BearishAccumulation
                | Scenario::StrongBearishFlow
        )
    }
}

impl fmt::Display for Scenario {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_option_type_parsing() {
        assert_eq!(OptionType::from("CALL"), OptionType::Call);
        assert_eq!(OptionType::from(" put "), OptionType::Put);
        assert_eq!(OptionType::from("straddle"), OptionType::Unknown);
    }

    #[test]
    fn test_quote_side_parsing() {
        assert_eq!(QuoteSide::from("Ask"), QuoteSide::Ask);
        assert_eq!(QuoteSide::from("below"), QuoteSide::Below);
        assert_eq!(QuoteSide::from(""), QuoteSide::Unknown);
    }

    #[test]
    fn test_flow_record_lenient_deserialize() {
        let json = r#"{
            "symbol": "AAPL",
            "put_call": "Call",
            "side": "ask",
            "size": "1,200",
            "open_int": 300,
            "premium": "$45,000",
            "volume": null,
            "conds": null,
            "expiry": "03/15/2024",
            "strike": 190,
            "trade_date": "2024-03-01",
            "trade_time": "10:15:00"
        }"#;
        let record: FlowRecord = serde_json::from_str(json).unwrap();
        assert_eq!(record.put_call, OptionType::Call);
        assert_eq!(record.side, QuoteSide::Ask);
        assert_eq!(record.size, Some(1200.0));
        assert_eq!(record.premium, Some(45000.0));
        assert_eq!(record.volume, None);
        assert_eq!(record.volume_or_zero(), 0.0);
        assert_eq!(record.conds, "");
        assert_eq!(record.expiry, NaiveDate::from_ymd_opt(2024, 3, 15));
        assert!(record.timestamp().is_some());
        assert_eq!(record.spot, None);
    }

    #[test]
    fn test_flow_record_junk_fields() {
        let json = r#"{"put_call": 7, "side": "sideways", "size": "lots", "expiry": "soon"}"#;
        let record: FlowRecord = serde_json::from_str(json).unwrap();
        assert_eq!(record.put_call, OptionType::Unknown);
        assert_eq!(record.side, QuoteSide::Unknown);
        assert_eq!(record.size, None);
        assert_eq!(record.size_or_zero(), 0.0);
        assert_eq!(record.expiry, None);
        assert_eq!(record.timestamp(), None);
    }

    #[test]
    fn test_scenario_scores_in_range() {
        for scenario in Scenario::ALL {
            assert!((-3..=3).contains(&scenario.score()));
        }
        assert_eq!(Scenario::Neutral.score(), 0);
        assert_eq!(Scenario::StrongBearishFlow.score(), -3);
    }

    #[test]
    fn test_scenario_serializes_to_label() {
        let json = serde_json::to_string(&Scenario::BullishProfitTaking).unwrap();
        assert_eq!(json, "\"Bullish Profit-Taking/Unwinding\"");
        for scenario in Scenario::ALL {
            let json = serde_json::to_string(&scenario).unwrap();
            assert_eq!(json, format!("\"{}\"", scenario.as_str()));
        }
    }

    #[test]
    fn test_signal_scenarios() {
        assert!(Scenario::StrongBullishFlow.is_signal());
        assert!(!Scenario::BullishProfitTaking.is_signal());
        assert!(!Scenario::Neutral.is_signal());
    }
}
