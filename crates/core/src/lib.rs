//! Core types and configuration for the optflow system.
//!
//! This crate provides shared types used across all other crates:
//! - Flow record and classification types
//! - Scenario vocabulary and the scenario policy
//! - Configuration structures
//! - Common error types and lenient value coercion

pub mod coerce;
pub mod config;
pub mod error;
pub mod policy;
pub mod types;

pub use config::Config;
pub use error::{Error, Result};
pub use policy::{Bucket, Decision, ScenarioPolicy, ScoreWeights};
pub use types::*;
