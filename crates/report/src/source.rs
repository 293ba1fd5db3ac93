//! Flow record collaborators.

use chrono::Duration;
use optflow_core::FlowRecord;
use std::collections::HashMap;

/// Supplies raw flow rows for one symbol and look-back window.
///
/// Implementations return only rows for the requested symbol inside the
/// window; the report pipeline does not filter again.
pub trait FlowSource: Send + Sync {
    fn fetch_flow_records(&self, symbol: &str, date_range_days: u32) -> anyhow::Result<Vec<FlowRecord>>;
}

/// In-memory source keyed by upper-cased symbol.
///
/// The window is anchored on the symbol's latest trade date: a look-back of
/// `n` days keeps rows dated within `n` days of that date. Undated rows are
/// kept.
#[derive(Debug, Clone, Default)]
pub struct MemoryFlowSource {
    rows: HashMap<String, Vec<FlowRecord>>,
}

impl MemoryFlowSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append rows for a symbol.
    pub fn insert(&mut self, symbol: &str, records: impl IntoIterator<Item = FlowRecord>) {
        self.rows
            .entry(symbol.to_uppercase())
            .or_default()
            .extend(records);
    }

    pub fn with_symbol(mut self, symbol: &str, records: impl IntoIterator<Item = FlowRecord>) -> Self {
        self.insert(symbol, records);
        self
    }

    pub fn symbols(&self) -> impl Iterator<Item = &str> {
        self.rows.keys().map(String::as_str)
    }
}

impl FlowSource for MemoryFlowSource {
    fn fetch_flow_records(&self, symbol: &str, date_range_days: u32) -> anyhow::Result<Vec<FlowRecord>> {
        let Some(rows) = self.rows.get(&symbol.to_uppercase()) else {
            return Ok(Vec::new());
        };
        let Some(latest) = rows.iter().filter_map(|r| r.trade_date).max() else {
            return Ok(rows.clone());
        };
        // A window reaching past the calendar's start keeps everything.
        let start = latest.checked_sub_signed(Duration::days(i64::from(date_range_days)));

        Ok(rows
            .iter()
            .filter(|r| match (r.trade_date, start) {
                (Some(d), Some(start)) => d >= start,
                _ => true,
            })
            .cloned()
            .collect())
    }
}
