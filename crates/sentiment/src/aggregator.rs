//! Sentiment aggregation.
//!
//! Rolls a classified batch up into premium buckets, a signed sentiment score,
//! a named scenario from the configured cascade, and the narrative/evidence
//! shown next to it.

use crate::buckets::PremiumBuckets;
use optflow_core::{Bucket, ClassifiedTrade, Scenario, ScenarioPolicy, Sentiment};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::debug;

/// Bucket values supporting each side of the decision.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EvidenceMetrics {
    #[serde(rename = "Bullish Metrics")]
    pub bullish: BTreeMap<String, f64>,
    #[serde(rename = "Bearish Metrics")]
    pub bearish: BTreeMap<String, f64>,
}

impl EvidenceMetrics {
    /// Values of the given buckets, split by the side each bucket leans.
    pub fn from_evidence(buckets: &PremiumBuckets, evidence: &[Bucket]) -> Self {
        let mut metrics = Self::default();
        for &bucket in evidence {
            let side = match bucket.lean() {
                Sentiment::Bullish => &mut metrics.bullish,
                _ => &mut metrics.bearish,
            };
            side.insert(bucket.label().to_string(), buckets.get(bucket));
        }
        metrics
    }
}

/// Side-by-side view of the evidence: bullish on the left, bearish on the right.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VsMetrics {
    pub left: BTreeMap<String, f64>,
    pub right: BTreeMap<String, f64>,
}

impl From<&EvidenceMetrics> for VsMetrics {
    fn from(metrics: &EvidenceMetrics) -> Self {
        Self {
            left: metrics.bullish.clone(),
            right: metrics.bearish.clone(),
        }
    }
}

/// Narrative plus supporting metrics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScenarioDetails {
    pub message: String,
    pub metrics: EvidenceMetrics,
}

/// Output of one aggregation call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SentimentReport {
    /// Signed weighted premium combination.
    pub sentiment_score: f64,
    pub scenario: Scenario,
    /// Integer tier of the scenario, in [-3, 3].
    pub score: i8,
    pub buckets: PremiumBuckets,
    /// Absent when no row contributed to the sums.
    pub details: Option<ScenarioDetails>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vs_metrics: Option<VsMetrics>,
}

impl SentimentReport {
    /// The neutral report for a batch with nothing to sum.
    pub fn neutral() -> Self {
        Self {
            sentiment_score: 0.0,
            scenario: Scenario::Neutral,
            score: 0,
            buckets: PremiumBuckets::default(),
            details: None,
            vs_metrics: None,
        }
    }

    pub fn message(&self) -> Option<&str> {
        self.details.as_ref().map(|d| d.message.as_str())
    }

    pub fn metrics(&self) -> Option<&EvidenceMetrics> {
        self.details.as_ref().map(|d| &d.metrics)
    }
}

/// Whole-dollar amount with thousands separators, e.g. `$12,500`.
pub fn format_usd(value: f64) -> String {
    let whole = value.round() as i64;
    let digits = whole.unsigned_abs().to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }
    if whole < 0 {
        format!("-${grouped}")
    } else {
        format!("${grouped}")
    }
}

/// Templated explanation for a scenario.
pub fn scenario_message(scenario: Scenario, b: &PremiumBuckets) -> String {
    let usd = |bucket| format_usd(b.get(bucket));
    use Bucket::*;

    match scenario {
        Scenario::StrongBullishFlow => format!(
            "Call opening of {} dominates put opening of {} and call closing of {}, while put closing of {} outpaces sell-to-open premium.",
            usd(CallOpen), usd(PutOpen), usd(CallClose), usd(PutClose)
        ),
        Scenario::BullishProfitTaking => format!(
            "Put closing of {} outweighs call opening of {} and put opening of {}: bearish positions are being unwound.",
            usd(PutClose), usd(CallOpen), usd(PutOpen)
        ),
        Scenario::BullishAccumulation => format!(
            "Call opening of {} leads put opening of {} and call closing of {}.",
            usd(CallOpen), usd(PutOpen), usd(CallClose)
        ),
        Scenario::BullishPositioning => format!(
            "Calls opening at {} against puts at {}; put sell-to-open {} vs call sell-to-open {}.",
            usd(CallOpen), usd(PutOpen), usd(PutSellToOpen), usd(CallSellToOpen)
        ),
        Scenario::MildlyBullish => format!(
            "Net premium leans bullish without a clear driver: call opening {}, put closing {}, put sell-to-open {}.",
            usd(CallOpen), usd(PutClose), usd(PutSellToOpen)
        ),
        Scenario::Neutral => format!(
            "Bullish and bearish premium offset: call opening {} vs put opening {}.",
            usd(CallOpen), usd(PutOpen)
        ),
        Scenario::MildlyBearish => format!(
            "Net premium leans bearish without a clear driver: put opening {}, call closing {}, call sell-to-open {}.",
            usd(PutOpen), usd(CallClose), usd(CallSellToOpen)
        ),
        Scenario::BearishPositioning => format!(
            "Puts opening at {} against calls at {}; call sell-to-open {} vs put sell-to-open {}.",
            usd(PutOpen), usd(CallOpen), usd(CallSellToOpen), usd(PutSellToOpen)
        ),
        Scenario::BearishAccumulation => format!(
            "Put opening of {} leads call opening of {} and put closing of {}.",
            usd(PutOpen), usd(CallOpen), usd(PutClose)
        ),
        Scenario::BearishProfitTaking => format!(
            "Call closing of {} outweighs put opening of {} and call opening of {}: bullish positions are being distributed.",
            usd(CallClose), usd(PutOpen), usd(CallOpen)
        ),
        Scenario::StrongBearishFlow => format!(
            "Put opening of {} dominates call opening of {} and put closing of {}, while call closing of {} outpaces sell-to-open premium.",
            usd(PutOpen), usd(CallOpen), usd(PutClose), usd(CallClose)
        ),
    }
}

/// Applies a scenario policy to classified batches.
#[derive(Debug, Clone, Default)]
pub struct SentimentAggregator {
    policy: ScenarioPolicy,
}

impl SentimentAggregator {
    pub fn new(policy: ScenarioPolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> &ScenarioPolicy {
        &self.policy
    }

    /// Aggregate a batch. An empty batch yields the neutral report.
    pub fn aggregate<'a, I>(&self, trades: I) -> SentimentReport
    where
        I: IntoIterator<Item = &'a ClassifiedTrade>,
    {
        self.from_buckets(PremiumBuckets::from_trades(trades))
    }

    /// Score and label pre-accumulated buckets.
    pub fn from_buckets(&self, buckets: PremiumBuckets) -> SentimentReport {
        if buckets.trades_skipped > 0 {
            debug!(skipped = buckets.trades_skipped, "dropped unreadable rows from premium sums");
        }
        if buckets.is_empty() {
            return SentimentReport {
                buckets,
                ..SentimentReport::neutral()
            };
        }

        let value = |bucket: Bucket| buckets.get(bucket);
        let sentiment_score = self.policy.sentiment_score(&value, buckets.passive_net());
        let decision = self.policy.decide(sentiment_score, &value);
        let scenario = decision.scenario;
        let metrics = EvidenceMetrics::from_evidence(&buckets, &decision.evidence());

        debug!(sentiment_score, %scenario, matched_rule = decision.rule.is_some(), "aggregated flow sentiment");

        SentimentReport {
            sentiment_score,
            scenario,
            score: scenario.score(),
            vs_metrics: Some(VsMetrics::from(&metrics)),
            details: Some(ScenarioDetails {
                message: scenario_message(scenario, &buckets),
                metrics,
            }),
            buckets,
        }
    }
}
