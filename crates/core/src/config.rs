//! Configuration structures for the optflow system.
//!
//! Loaded once at startup and passed explicitly into the classifier,
//! aggregator and report builder. Nothing mutates it afterwards.

use crate::error::{Error, Result};
use crate::policy::ScenarioPolicy;
use chrono::NaiveTime;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Main configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Opening / unusual / closing intent detection.
    pub intent: IntentConfig,
    /// Score weights and scenario cascades.
    pub policy: ScenarioPolicy,
    /// Expiration ranking.
    pub ranking: RankingConfig,
    /// Intraday snapshot cutoffs.
    pub snapshots: SnapshotConfig,
    /// Watchlist setup scanning.
    pub scanner: ScannerConfig,
}

impl Config {
    /// Parse and validate a JSON configuration document.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Config = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a JSON configuration file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }

    /// Validate every section.
    pub fn validate(&self) -> Result<()> {
        self.intent.validate()?;
        self.policy.validate()?;
        self.ranking.validate()?;
        self.snapshots.validate()?;
        self.scanner.validate()
    }
}

/// Condition-code markers and thresholds for intent predicates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IntentConfig {
    /// Substrings of the lowercased condition text that mark an opening print.
    pub opening_markers: Vec<String>,
    /// Substrings of the lowercased condition text that mark unusual activity.
    pub unusual_markers: Vec<String>,
    /// A print larger than this fraction of open interest (with volume not
    /// exceeding OI) reads as closing.
    pub closing_oi_fraction: f64,
}

impl Default for IntentConfig {
    fn default() -> Self {
        Self {
            opening_markers: vec![
                "opening".to_string(),
                "opening unusual".to_string(),
                "opening highly_un".to_string(),
            ],
            unusual_markers: vec![
                "unusual".to_string(),
                "highly_un".to_string(),
                "opening unusual".to_string(),
                "opening highly_un".to_string(),
            ],
            closing_oi_fraction: 0.9,
        }
    }
}

impl IntentConfig {
    pub fn validate(&self) -> Result<()> {
        if !(self.closing_oi_fraction > 0.0 && self.closing_oi_fraction <= 1.0) {
            return Err(Error::config(format!(
                "closing_oi_fraction must be in (0, 1], got {}",
                self.closing_oi_fraction
            )));
        }
        if self
            .opening_markers
            .iter()
            .chain(&self.unusual_markers)
            .any(|m| m.trim().is_empty())
        {
            return Err(Error::config("condition markers must not be blank"));
        }
        Ok(())
    }
}

/// Expiration ranking configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RankingConfig {
    /// How many expirations to keep after sorting by contracts.
    pub top_n: usize,
}

impl Default for RankingConfig {
    fn default() -> Self {
        Self { top_n: 5 }
    }
}

impl RankingConfig {
    pub fn validate(&self) -> Result<()> {
        if self.top_n == 0 {
            return Err(Error::config("ranking.top_n must be positive"));
        }
        Ok(())
    }
}

/// Intraday snapshot configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SnapshotConfig {
    /// Exchange-local cutoff times, ascending.
    pub cutoffs: Vec<NaiveTime>,
}

impl Default for SnapshotConfig {
    fn default() -> Self {
        let at = |h, m| NaiveTime::from_hms_opt(h, m, 0).unwrap_or_default();
        Self {
            cutoffs: vec![at(11, 30), at(13, 30), at(15, 30)],
        }
    }
}

impl SnapshotConfig {
    pub fn validate(&self) -> Result<()> {
        if self.cutoffs.is_empty() {
            return Err(Error::config("snapshots.cutoffs must not be empty"));
        }
        if self.cutoffs.windows(2).any(|w| w[0] >= w[1]) {
            return Err(Error::config("snapshots.cutoffs must be strictly ascending"));
        }
        Ok(())
    }
}

/// Longest look-back the scanner will hand to a flow source.
pub const MAX_DATE_RANGE_DAYS: u32 = 3_650;

/// Watchlist setup scanner configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScannerConfig {
    /// Maximum symbols analysed concurrently.
    pub workers: usize,
    /// Maximum setups returned.
    pub limit: usize,
    /// Look-back window handed to the flow source.
    pub date_range_days: u32,
    /// Setups whose last print is older than this are dropped.
    pub max_age_days: i64,
}

impl Default for ScannerConfig {
    fn default() -> Self {
        Self {
            workers: 4,
            limit: 50,
            date_range_days: 3,
            max_age_days: 14,
        }
    }
}

impl ScannerConfig {
    pub fn validate(&self) -> Result<()> {
        if self.workers == 0 {
            return Err(Error::config("scanner.workers must be positive"));
        }
        if self.max_age_days < 0 {
            return Err(Error::config("scanner.max_age_days must be non-negative"));
        }
        if self.date_range_days > MAX_DATE_RANGE_DAYS {
            return Err(Error::config(format!(
                "scanner.date_range_days must be at most {MAX_DATE_RANGE_DAYS}, got {}",
                self.date_range_days
            )));
        }
        Ok(())
    }
}
