//! Trade classification for the optflow system.
//!
//! This crate handles:
//! - Intent predicates (opening, unusual, adding, profit-taking, closing)
//! - Order-action and sentiment classification per print
//! - Batch classification statistics

pub mod classifier;
pub mod predicates;

pub use classifier::{base_rule, BaseRule, ClassificationStats, TradeClassifier};
pub use predicates::IntentFlags;
