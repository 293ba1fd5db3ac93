//! PyO3 bindings for the optflow Rust components.
//!
//! Exposes the classification and scoring core to the Python report layer:
//! - Flow record and classified trade types
//! - Trade classification
//! - Full flow reports (returned as JSON)

use chrono::{Local, NaiveDate};
use pyo3::exceptions::PyValueError;
use pyo3::prelude::*;
use tracing::debug;
use tracing_subscriber::EnvFilter;

use optflow_classifier::{ClassificationStats, TradeClassifier};
use optflow_core::coerce::{parse_date, parse_time};
use optflow_core::{
    ClassifiedTrade as RustClassifiedTrade, Config as RustConfig, Error as RustError, FlowRecord as RustFlowRecord,
    OptionType, QuoteSide, Scenario,
};
use optflow_report::FlowReportBuilder;

fn to_py_err(err: RustError) -> PyErr {
    PyValueError::new_err(err.to_string())
}

fn load_config(config_json: Option<&str>) -> PyResult<RustConfig> {
    match config_json {
        Some(json) => RustConfig::from_json_str(json).map_err(to_py_err),
        None => Ok(RustConfig::default()),
    }
}

/// Parse the caller's reference date, defaulting to today.
fn resolve_reference_date(raw: Option<&str>) -> Result<NaiveDate, RustError> {
    match raw {
        None => Ok(Local::now().date_naive()),
        Some(text) => parse_date(text).ok_or_else(|| RustError::data(format!("unparseable reference date: {text:?}"))),
    }
}

// ============================================================================
// Python-exposed Types
// ============================================================================

/// A single option trade print.
#[pyclass(name = "FlowRecord")]
#[derive(Clone, Default)]
pub struct PyFlowRecord {
    #[pyo3(get, set)]
    pub symbol: String,
    #[pyo3(get, set)]
    pub put_call: String,
    #[pyo3(get, set)]
    pub side: String,
    #[pyo3(get, set)]
    pub size: Option<f64>,
    #[pyo3(get, set)]
    pub open_int: Option<f64>,
    #[pyo3(get, set)]
    pub premium: Option<f64>,
    #[pyo3(get, set)]
    pub volume: Option<f64>,
    #[pyo3(get, set)]
    pub conds: String,
    /// Expiration date text, e.g. "2024-03-15".
    #[pyo3(get, set)]
    pub expiry: Option<String>,
    #[pyo3(get, set)]
    pub strike: Option<f64>,
    #[pyo3(get, set)]
    pub price: Option<f64>,
    #[pyo3(get, set)]
    pub spot: Option<f64>,
    #[pyo3(get, set)]
    pub trade_date: Option<String>,
    #[pyo3(get, set)]
    pub trade_time: Option<String>,
}

#[pymethods]
impl PyFlowRecord {
    #[new]
    #[pyo3(signature = (
        symbol, put_call, side, size=None, open_int=None, premium=None, volume=None, conds=String::new(),
        expiry=None, strike=None, price=None, spot=None, trade_date=None, trade_time=None
    ))]
    #[allow(clippy::too_many_arguments)]
    fn new(
        symbol: String,
        put_call: String,
        side: String,
        size: Option<f64>,
        open_int: Option<f64>,
        premium: Option<f64>,
        volume: Option<f64>,
        conds: String,
        expiry: Option<String>,
        strike: Option<f64>,
        price: Option<f64>,
        spot: Option<f64>,
        trade_date: Option<String>,
        trade_time: Option<String>,
    ) -> Self {
        PyFlowRecord {
            symbol,
            put_call,
            side,
            size,
            open_int,
            premium,
            volume,
            conds,
            expiry,
            strike,
            price,
            spot,
            trade_date,
            trade_time,
        }
    }

    fn __repr__(&self) -> String {
        format!(
            "FlowRecord(symbol={}, put_call={}, side={}, size={:?}, premium={:?}, expiry={:?})",
            self.symbol, self.put_call, self.side, self.size, self.premium, self.expiry
        )
    }
}

impl From<&PyFlowRecord> for RustFlowRecord {
    fn from(r: &PyFlowRecord) -> Self {
        RustFlowRecord {
            symbol: r.symbol.clone(),
            put_call: OptionType::from(r.put_call.as_str()),
            side: QuoteSide::from(r.side.as_str()),
            size: r.size,
            open_int: r.open_int,
            premium: r.premium,
            volume: r.volume,
            conds: r.conds.clone(),
            expiry: r.expiry.as_deref().and_then(parse_date),
            strike: r.strike,
            price: r.price,
            spot: r.spot,
            trade_date: r.trade_date.as_deref().and_then(parse_date),
            trade_time: r.trade_time.as_deref().and_then(parse_time),
        }
    }
}

impl From<&RustFlowRecord> for PyFlowRecord {
    fn from(r: &RustFlowRecord) -> Self {
        PyFlowRecord {
            symbol: r.symbol.clone(),
            put_call: r.put_call.as_str().to_string(),
            side: r.side.as_str().to_string(),
            size: r.size,
            open_int: r.open_int,
            premium: r.premium,
            volume: r.volume,
            conds: r.conds.clone(),
            expiry: r.expiry.map(|d| d.format("%Y-%m-%d").to_string()),
            strike: r.strike,
            price: r.price,
            spot: r.spot,
            trade_date: r.trade_date.map(|d| d.format("%Y-%m-%d").to_string()),
            trade_time: r.trade_time.map(|t| t.format("%H:%M:%S").to_string()),
        }
    }
}

/// A flow record with its classification.
#[pyclass(name = "ClassifiedTrade")]
#[derive(Clone)]
pub struct PyClassifiedTrade {
    #[pyo3(get)]
    pub record: PyFlowRecord,
    #[pyo3(get)]
    pub option_type: String,
    /// "buy-to-open", "sell-to-open", "sell-to-close", "passive" or "unknown".
    #[pyo3(get)]
    pub order_action: String,
    #[pyo3(get)]
    pub sentiment: String,
    #[pyo3(get)]
    pub description: String,
    #[pyo3(get)]
    pub is_opening: bool,
    #[pyo3(get)]
    pub is_unusual: bool,
    #[pyo3(get)]
    pub is_adding: bool,
    #[pyo3(get)]
    pub is_profit_taking: bool,
    #[pyo3(get)]
    pub is_closing: bool,
}

#[pymethods]
impl PyClassifiedTrade {
    fn __repr__(&self) -> String {
        format!(
            "ClassifiedTrade(option_type={}, order_action={}, sentiment={}, description={:?})",
            self.option_type, self.order_action, self.sentiment, self.description
        )
    }
}

impl From<RustClassifiedTrade> for PyClassifiedTrade {
    fn from(t: RustClassifiedTrade) -> Self {
        PyClassifiedTrade {
            record: PyFlowRecord::from(&t.record),
            option_type: t.option_type.as_str().to_string(),
            order_action: t.order_action.as_str().to_string(),
            sentiment: t.sentiment.as_str().to_string(),
            description: t.description,
            is_opening: t.is_opening,
            is_unusual: t.is_unusual,
            is_adding: t.is_adding,
            is_profit_taking: t.is_profit_taking,
            is_closing: t.is_closing,
        }
    }
}

// ============================================================================
// Engine Classes
// ============================================================================

/// Per-print order-action and sentiment classifier.
#[pyclass]
pub struct PyTradeClassifier {
    inner: TradeClassifier,
}

#[pymethods]
impl PyTradeClassifier {
    #[new]
    #[pyo3(signature = (config_json=None))]
    fn new(config_json: Option<&str>) -> PyResult<Self> {
        let config = load_config(config_json)?;
        Ok(PyTradeClassifier {
            inner: TradeClassifier::new(config.intent),
        })
    }

    /// Classify a single record.
    fn classify(&self, record: PyFlowRecord) -> PyClassifiedTrade {
        self.inner.classify(&RustFlowRecord::from(&record)).into()
    }

    /// Classify a batch of records, preserving order.
    fn classify_batch(&self, records: Vec<PyFlowRecord>) -> Vec<PyClassifiedTrade> {
        let rust_records: Vec<RustFlowRecord> = records.iter().map(RustFlowRecord::from).collect();
        self.inner
            .classify_batch(&rust_records)
            .into_iter()
            .map(|t| t.into())
            .collect()
    }

    /// Classification counts: (total, bullish, bearish, unknown).
    fn stats(&self, records: Vec<PyFlowRecord>) -> (u64, u64, u64, u64) {
        let rust_records: Vec<RustFlowRecord> = records.iter().map(RustFlowRecord::from).collect();
        let s = ClassificationStats::from_trades(&self.inner.classify_batch(&rust_records));
        (s.total_trades, s.bullish_trades, s.bearish_trades, s.unknown_trades)
    }
}

/// Full flow report pipeline for one symbol's batch.
#[pyclass]
pub struct PyFlowAnalyzer {
    inner: FlowReportBuilder,
}

#[pymethods]
impl PyFlowAnalyzer {
    #[new]
    #[pyo3(signature = (config_json=None))]
    fn new(config_json: Option<&str>) -> PyResult<Self> {
        let config = load_config(config_json)?;
        Ok(PyFlowAnalyzer {
            inner: FlowReportBuilder::from_config(&config),
        })
    }

    /// Analyze records and return the report (or the no-data result) as JSON.
    ///
    /// `reference_date` defaults to today.
    #[pyo3(signature = (records, reference_date=None))]
    fn analyze(&self, records: Vec<PyFlowRecord>, reference_date: Option<&str>) -> PyResult<String> {
        let rust_records: Vec<RustFlowRecord> = records.iter().map(RustFlowRecord::from).collect();
        self.analyze_records(&rust_records, reference_date)
    }

    /// Same as `analyze`, taking a JSON array of raw rows.
    #[pyo3(signature = (rows_json, reference_date=None))]
    fn analyze_json(&self, rows_json: &str, reference_date: Option<&str>) -> PyResult<String> {
        let rust_records: Vec<RustFlowRecord> =
            serde_json::from_str(rows_json).map_err(|e| to_py_err(e.into()))?;
        self.analyze_records(&rust_records, reference_date)
    }
}

impl PyFlowAnalyzer {
    fn analyze_records(&self, records: &[RustFlowRecord], reference_date: Option<&str>) -> PyResult<String> {
        let reference_date = resolve_reference_date(reference_date).map_err(to_py_err)?;
        debug!(records = records.len(), %reference_date, "analyzing flow batch from python");
        let analysis = self.inner.classify_and_score(records, reference_date);
        serde_json::to_string(&analysis).map_err(|e| to_py_err(e.into()))
    }
}

/// Every scenario label, strongest bullish to strongest bearish.
#[pyfunction]
fn scenario_vocabulary() -> Vec<&'static str> {
    Scenario::ALL.iter().map(|s| s.as_str()).collect()
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    // A host application may already own the global subscriber.
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}

// ============================================================================
// Module Definition
// ============================================================================

/// Optflow Core - options flow classification and scoring for Python.
#[pymodule]
fn optflow_core_py(m: &Bound<'_, PyModule>) -> PyResult<()> {
    init_tracing();

    // Types
    m.add_class::<PyFlowRecord>()?;
    m.add_class::<PyClassifiedTrade>()?;

    // Engine classes
    m.add_class::<PyTradeClassifier>()?;
    m.add_class::<PyFlowAnalyzer>()?;

    m.add_function(wrap_pyfunction!(scenario_vocabulary, m)?)?;

    Ok(())
}
