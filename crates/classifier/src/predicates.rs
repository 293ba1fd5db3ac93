//! Intent predicates over a single flow record.
//!
//! All numeric reads go through the record's `*_or_zero` accessors, so a blank
//! or junk field behaves as 0.0 instead of failing.

use optflow_core::config::IntentConfig;
use optflow_core::{FlowRecord, OptionType, QuoteSide};
use serde::{Deserialize, Serialize};

fn conds_contain_any(record: &FlowRecord, markers: &[String]) -> bool {
    let conds = record.conds.to_lowercase();
    markers
        .iter()
        .any(|marker| conds.contains(marker.to_lowercase().as_str()))
}

/// Opening print: an opening condition code, or size above open interest.
pub fn is_opening(record: &FlowRecord, intent: &IntentConfig) -> bool {
    conds_contain_any(record, &intent.opening_markers)
        || record.size_or_zero() > record.open_int_or_zero()
}

/// Unusual print: an unusual condition code.
pub fn is_unusual(record: &FlowRecord, intent: &IntentConfig) -> bool {
    conds_contain_any(record, &intent.unusual_markers)
}

/// Profit-taking: small relative to OI, light volume, on the side a holder
/// would exit at (calls hit the bid, puts lift the ask). Never true for an
/// opening print.
pub fn is_profit_taking(record: &FlowRecord, intent: &IntentConfig) -> bool {
    !is_opening(record, intent) && profit_taking_shape(record)
}

fn profit_taking_shape(record: &FlowRecord) -> bool {
    let size = record.size_or_zero();
    let oi = record.open_int_or_zero();
    let volume = record.volume_or_zero();

    let side_ok = match record.put_call {
        OptionType::Call => record.side == QuoteSide::Bid,
        OptionType::Put => record.side == QuoteSide::Ask,
        OptionType::Unknown => matches!(record.side, QuoteSide::Bid | QuoteSide::Ask),
    };

    size < oi && volume <= oi && side_ok
}

/// Adding to an existing position. Only evaluated for prints that are
/// neither opening nor profit-taking.
pub fn is_adding(record: &FlowRecord, intent: &IntentConfig) -> bool {
    if is_opening(record, intent) || profit_taking_shape(record) {
        return false;
    }
    adding_shape(record)
}

fn adding_shape(record: &FlowRecord) -> bool {
    let size = record.size_or_zero();
    let oi = record.open_int_or_zero();
    let volume = record.volume_or_zero();

    volume >= size
        || volume > oi
        || (record.put_call == OptionType::Call
            && matches!(record.side, QuoteSide::Ask | QuoteSide::Mid)
            && size < oi)
}

/// Closing print: size matches OI, or nearly does on light volume.
/// Always false when there is no open interest.
pub fn is_closing(record: &FlowRecord, intent: &IntentConfig) -> bool {
    let oi = record.open_int_or_zero();
    if oi == 0.0 {
        return false;
    }
    let size = record.size_or_zero();
    let volume = record.volume_or_zero();

    size == oi || (size > intent.closing_oi_fraction * oi && volume <= oi)
}

/// All predicates evaluated once for a record.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IntentFlags {
    pub opening: bool,
    pub unusual: bool,
    pub adding: bool,
    pub profit_taking: bool,
    pub closing: bool,
}

impl IntentFlags {
    pub fn evaluate(record: &FlowRecord, intent: &IntentConfig) -> Self {
        let opening = is_opening(record, intent);
        let profit_taking = !opening && profit_taking_shape(record);
        let adding = !opening && !profit_taking && adding_shape(record);

        Self {
            opening,
            unusual: is_unusual(record, intent),
            adding,
            profit_taking,
            closing: is_closing(record, intent),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(put_call: OptionType, side: QuoteSide, size: f64, oi: f64, volume: f64) -> FlowRecord {
        FlowRecord {
            symbol: "SPY".to_string(),
            put_call,
            side,
            size: Some(size),
            open_int: Some(oi),
            volume: Some(volume),
            ..Default::default()
        }
    }

    #[test]
    fn test_opening_from_conditions() {
        let intent = IntentConfig::default();
        let mut r = record(OptionType::Call, QuoteSide::Ask, 10.0, 500.0, 10.0);
        assert!(!is_opening(&r, &intent));
        r.conds = "OPENING Unusual".to_string();
        assert!(is_opening(&r, &intent));
        assert!(is_unusual(&r, &intent));
    }

    #[test]
    fn test_opening_from_size_over_oi() {
        let intent = IntentConfig::default();
        let r = record(OptionType::Put, QuoteSide::Bid, 600.0, 500.0, 600.0);
        assert!(is_opening(&r, &intent));
        assert!(!is_unusual(&r, &intent));
    }

    #[test]
    fn test_highly_unusual_marker() {
        let intent = IntentConfig::default();
        let mut r = record(OptionType::Call, QuoteSide::Ask, 1.0, 5.0, 1.0);
        r.conds = "highly_un".to_string();
        assert!(is_unusual(&r, &intent));
        assert!(!is_opening(&r, &intent));
    }

    #[test]
    fn test_closing_requires_open_interest() {
        let intent = IntentConfig::default();
        let r = record(OptionType::Call, QuoteSide::Bid, 0.0, 0.0, 0.0);
        assert!(!is_closing(&r, &intent));

        let r = FlowRecord::default();
        assert!(!is_closing(&r, &intent));
    }

    #[test]
    fn test_closing_shapes() {
        let intent = IntentConfig::default();
        assert!(is_closing(&record(OptionType::Call, QuoteSide::Bid, 100.0, 100.0, 500.0), &intent));
        assert!(is_closing(&record(OptionType::Call, QuoteSide::Bid, 95.0, 100.0, 100.0), &intent));
        // Heavy volume disqualifies the near-match branch.
        assert!(!is_closing(&record(OptionType::Call, QuoteSide::Bid, 95.0, 100.0, 150.0), &intent));
        assert!(!is_closing(&record(OptionType::Call, QuoteSide::Bid, 50.0, 100.0, 50.0), &intent));
    }

    #[test]
    fn test_profit_taking_side_by_type() {
        let intent = IntentConfig::default();
        assert!(is_profit_taking(&record(OptionType::Call, QuoteSide::Bid, 10.0, 100.0, 50.0), &intent));
        assert!(!is_profit_taking(&record(OptionType::Call, QuoteSide::Ask, 10.0, 100.0, 50.0), &intent));
        assert!(is_profit_taking(&record(OptionType::Put, QuoteSide::Ask, 10.0, 100.0, 50.0), &intent));
        assert!(!is_profit_taking(&record(OptionType::Put, QuoteSide::Bid, 10.0, 100.0, 50.0), &intent));
        assert!(is_profit_taking(&record(OptionType::Unknown, QuoteSide::Bid, 10.0, 100.0, 50.0), &intent));
        assert!(!is_profit_taking(&record(OptionType::Unknown, QuoteSide::Mid, 10.0, 100.0, 50.0), &intent));
    }

    #[test]
    fn test_profit_taking_never_opening() {
        let intent = IntentConfig::default();
        let mut r = record(OptionType::Call, QuoteSide::Bid, 10.0, 100.0, 50.0);
        r.conds = "opening".to_string();
        assert!(!is_profit_taking(&r, &intent));
    }

    #[test]
    fn test_adding() {
        let intent = IntentConfig::default();
        // Call at the ask, below OI, volume past OI: not opening, not profit-taking.
        let r = record(OptionType::Call, QuoteSide::Ask, 50.0, 100.0, 150.0);
        assert!(is_adding(&r, &intent));
        // Opening prints are never "adding".
        let r = record(OptionType::Call, QuoteSide::Ask, 150.0, 100.0, 150.0);
        assert!(!is_adding(&r, &intent));
        // Profit-taking prints are never "adding".
        let r = record(OptionType::Call, QuoteSide::Bid, 10.0, 100.0, 50.0);
        assert!(!is_adding(&r, &intent));
    }

    #[test]
    fn test_missing_numbers_read_as_zero() {
        let intent = IntentConfig::default();
        let r = FlowRecord {
            put_call: OptionType::Call,
            side: QuoteSide::Ask,
            ..Default::default()
        };
        // 0 > 0 is false and no conditions: not opening.
        assert!(!is_opening(&r, &intent));
        assert!(!is_closing(&r, &intent));
    }

    #[test]
    fn test_flags_match_free_functions() {
        let intent = IntentConfig::default();
        let cases = [
            record(OptionType::Call, QuoteSide::Ask, 50.0, 100.0, 150.0),
            record(OptionType::Put, QuoteSide::Ask, 10.0, 100.0, 50.0),
            record(OptionType::Put, QuoteSide::Bid, 600.0, 500.0, 600.0),
            record(OptionType::Call, QuoteSide::Bid, 100.0, 100.0, 100.0),
        ];
        for r in &cases {
            let flags = IntentFlags::evaluate(r, &intent);
            assert_eq!(flags.opening, is_opening(r, &intent));
            assert_eq!(flags.unusual, is_unusual(r, &intent));
            assert_eq!(flags.adding, is_adding(r, &intent));
            assert_eq!(flags.profit_taking, is_profit_taking(r, &intent));
            assert_eq!(flags.closing, is_closing(r, &intent));
        }
    }
}
