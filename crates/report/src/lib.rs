//! Flow reports for the optflow system.
//!
//! This crate provides:
//! - The classify-and-score report pipeline
//! - The flow source collaborator trait
//! - Bounded-concurrency watchlist scanning

pub mod builder;
pub mod scanner;
pub mod source;

pub use builder::{
    classify_and_score, EmptyBatchResult, FlowAnalysis, FlowReport, FlowReportBuilder, FlowTotals, OverallSummary,
};
pub use scanner::{Horizon, Setup, SetupScanner};
pub use source::{FlowSource, MemoryFlowSource};
