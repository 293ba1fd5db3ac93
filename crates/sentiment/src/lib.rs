//! Sentiment aggregation for the optflow system.
//!
//! This crate provides:
//! - Premium bucket accumulation
//! - Sentiment scoring and scenario selection
//! - Per-expiration ranking
//! - Intraday time-window snapshots

pub mod aggregator;
pub mod buckets;
pub mod expiration;
pub mod snapshot;

pub use aggregator::{EvidenceMetrics, ScenarioDetails, SentimentAggregator, SentimentReport, VsMetrics};
pub use buckets::PremiumBuckets;
pub use expiration::{ExpirationRanker, ExpirationSummary};
pub use snapshot::{Snapshot, TimeWindowSnapshotter};
