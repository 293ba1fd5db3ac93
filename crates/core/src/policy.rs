//! Scenario policy: score weights and the ordered scenario cascades, as data.
//!
//! The weighting and thresholds are a tunable heuristic. Keeping them here as
//! plain serde data lets them be loaded from config, swapped wholesale, and
//! tested without touching the aggregation mechanics.

use crate::error::{Error, Result};
use crate::types::{Scenario, Sentiment};
use serde::{Deserialize, Serialize};

/// Premium bucket keyed by (option type × order action).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Bucket {
    /// Calls bought to open.
    CallOpen,
    /// Puts bought to open.
    PutOpen,
    /// Calls sold to close.
    CallClose,
    /// Puts sold to close.
    PutClose,
    /// Calls sold to open.
    CallSellToOpen,
    /// Puts sold to open.
    PutSellToOpen,
}

impl Bucket {
    pub const ALL: [Bucket; 6] = [
        Bucket::CallOpen,
        Bucket::PutOpen,
        Bucket::CallClose,
        Bucket::PutClose,
        Bucket::CallSellToOpen,
        Bucket::PutSellToOpen,
    ];

    /// Display label used in evidence metrics and narratives.
    pub fn label(self) -> &'static str {
        match self {
            Bucket::CallOpen => "Call Opening",
            Bucket::PutOpen => "Put Opening",
            Bucket::CallClose => "Call Closing",
            Bucket::PutClose => "Put Closing",
            Bucket::CallSellToOpen => "Call Sell-to-Open",
            Bucket::PutSellToOpen => "Put Sell-to-Open",
        }
    }

    /// Which way premium in this bucket leans.
    pub fn lean(self) -> Sentiment {
        match self {
            Bucket::CallOpen | Bucket::PutClose | Bucket::PutSellToOpen => Sentiment::Bullish,
            Bucket::PutOpen | Bucket::CallClose | Bucket::CallSellToOpen => Sentiment::Bearish,
        }
    }
}

/// Weights applied to net bucket premium when computing the sentiment score.
///
/// Must satisfy `open > close > sell_to_open > passive >= 0`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoreWeights {
    /// Weight on net opening premium (call open − put open).
    pub open: f64,
    /// Weight on net closing premium (put close − call close).
    pub close: f64,
    /// Weight on net sell-to-open premium (put STO − call STO).
    pub sell_to_open: f64,
    /// Weight on net passive (mid) premium (call mid − put mid).
    pub passive: f64,
}

/// Opening flow: new directional commitment.
pub const OPEN_WEIGHT: f64 = 1.0;
/// Closing flow: unwinds of existing positions.
pub const CLOSE_WEIGHT: f64 = 0.6;
/// Sell-to-open flow: premium collection.
pub const SELL_TO_OPEN_WEIGHT: f64 = 0.4;
/// Mid-market executions.
pub const PASSIVE_WEIGHT: f64 = 0.0;

impl Default for ScoreWeights {
    fn default() -> Self {
        Self {
            open: OPEN_WEIGHT,
            close: CLOSE_WEIGHT,
            sell_to_open: SELL_TO_OPEN_WEIGHT,
            passive: PASSIVE_WEIGHT,
        }
    }
}

impl ScoreWeights {
    /// Check the tier ordering.
    pub fn validate(&self) -> Result<()> {
        let all = [self.open, self.close, self.sell_to_open, self.passive];
        if all.iter().any(|w| !w.is_finite()) {
            return Err(Error::config("score weights must be finite"));
        }
        if !(self.open > self.close && self.close > self.sell_to_open && self.sell_to_open > self.passive) {
            return Err(Error::config(format!(
                "score weights must satisfy open > close > sell_to_open > passive, got {} / {} / {} / {}",
                self.open, self.close, self.sell_to_open, self.passive
            )));
        }
        if self.passive < 0.0 {
            return Err(Error::config("passive weight must be non-negative"));
        }
        Ok(())
    }
}

fn one() -> f64 {
    1.0
}

/// `lhs > factor × Σ rhs`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Comparison {
    pub lhs: Bucket,
    pub rhs: Vec<Bucket>,
    #[serde(default = "one")]
    pub factor: f64,
}

impl Comparison {
    pub fn new(lhs: Bucket, rhs: &[Bucket]) -> Self {
        Self {
            lhs,
            rhs: rhs.to_vec(),
            factor: 1.0,
        }
    }

    pub fn with_factor(mut self, factor: f64) -> Self {
        self.factor = factor;
        self
    }

    pub fn holds(&self, value: &impl Fn(Bucket) -> f64) -> bool {
        let rhs: f64 = self.rhs.iter().map(|b| value(*b)).sum();
        value(self.lhs) > self.factor * rhs
    }
}

/// Conjunction or disjunction of comparisons.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Clause {
    All(Vec<Comparison>),
    Any(Vec<Comparison>),
}

impl Clause {
    pub fn holds(&self, value: &impl Fn(Bucket) -> f64) -> bool {
        match self {
            Clause::All(parts) => parts.iter().all(|c| c.holds(value)),
            Clause::Any(parts) => parts.iter().any(|c| c.holds(value)),
        }
    }

    pub fn comparisons(&self) -> &[Comparison] {
        match self {
            Clause::All(parts) | Clause::Any(parts) => parts,
        }
    }
}

/// One tier of a cascade.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScenarioRule {
    pub scenario: Scenario,
    pub when: Clause,
}

impl ScenarioRule {
    /// Buckets the rule compares, in order of first mention.
    pub fn buckets(&self) -> Vec<Bucket> {
        let mut seen = Vec::new();
        for c in self.when.comparisons() {
            for bucket in std::iter::once(c.lhs).chain(c.rhs.iter().copied()) {
                if !seen.contains(&bucket) {
                    seen.push(bucket);
                }
            }
        }
        seen
    }
}

/// A selected scenario and the cascade rule that matched, if any.
///
/// `rule` is `None` for Neutral and for the Mildly fallbacks.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Decision<'a> {
    pub scenario: Scenario,
    pub rule: Option<&'a ScenarioRule>,
}

impl Decision<'_> {
    /// Buckets that justify the decision.
    ///
    /// Always the two opening buckets plus whatever the matched rule compared.
    /// A side left with a single bucket also gets its closing bucket, so each
    /// side carries two to three values.
    pub fn evidence(&self) -> Vec<Bucket> {
        let mut picked = vec![Bucket::CallOpen, Bucket::PutOpen];
        if let Some(rule) = self.rule {
            for bucket in rule.buckets() {
                if !picked.contains(&bucket) {
                    picked.push(bucket);
                }
            }
        }
        for (lean, closing) in [(Sentiment::Bullish, Bucket::PutClose), (Sentiment::Bearish, Bucket::CallClose)] {
            if picked.iter().filter(|b| b.lean() == lean).count() < 2 && !picked.contains(&closing) {
                picked.push(closing);
            }
        }
        picked
    }
}

/// Score weights plus the bullish and bearish cascades. First matching rule wins.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScenarioPolicy {
    pub weights: ScoreWeights,
    /// Evaluated when the sentiment score is positive.
    pub bullish: Vec<ScenarioRule>,
    /// Evaluated when the sentiment score is negative.
    pub bearish: Vec<ScenarioRule>,
}

impl Default for ScenarioPolicy {
    fn default() -> Self {
        Self::standard()
    }
}

impl ScenarioPolicy {
    /// The current production cascade.
    pub fn standard() -> Self {
        use Bucket::*;

        let bullish = vec![
            ScenarioRule {
                scenario: Scenario::StrongBullishFlow,
                when: Clause::All(vec![
                    Comparison::new(CallOpen, &[CallClose]),
                    Comparison::new(CallOpen, &[PutOpen]).with_factor(2.0),
                    Comparison::new(PutClose, &[CallSellToOpen, PutSellToOpen]),
                ]),
            },
            ScenarioRule {
                scenario: Scenario::BullishProfitTaking,
                when: Clause::All(vec![
                    Comparison::new(PutClose, &[CallOpen]),
                    Comparison::new(PutClose, &[PutOpen]),
                ]),
            },
            ScenarioRule {
                scenario: Scenario::BullishAccumulation,
                when: Clause::All(vec![
                    Comparison::new(CallOpen, &[CallClose]),
                    Comparison::new(CallOpen, &[PutOpen]),
                ]),
            },
            ScenarioRule {
                scenario: Scenario::BullishPositioning,
                when: Clause::Any(vec![
                    Comparison::new(CallOpen, &[PutOpen]),
                    Comparison::new(PutSellToOpen, &[CallSellToOpen]),
                ]),
            },
        ];

        let bearish = vec![
            ScenarioRule {
                scenario: Scenario::StrongBearishFlow,
                when: Clause::All(vec![
                    Comparison::new(PutOpen, &[PutClose]),
                    Comparison::new(PutOpen, &[CallOpen]).with_factor(2.0),
                    Comparison::new(CallClose, &[CallSellToOpen, PutSellToOpen]),
                ]),
            },
            ScenarioRule {
                scenario: Scenario::BearishProfitTaking,
                when: Clause::All(vec![
                    Comparison::new(CallClose, &[PutOpen]),
                    Comparison::new(CallClose, &[CallOpen]),
                ]),
            },
            ScenarioRule {
                scenario: Scenario::BearishAccumulation,
                when: Clause::All(vec![
                    Comparison::new(PutOpen, &[PutClose]),
                    Comparison::new(PutOpen, &[CallOpen]),
                ]),
            },
            ScenarioRule {
                scenario: Scenario::BearishPositioning,
                when: Clause::Any(vec![
                    Comparison::new(PutOpen, &[CallOpen]),
                    Comparison::new(CallSellToOpen, &[PutSellToOpen]),
                ]),
            },
        ];

        Self {
            weights: ScoreWeights::default(),
            bullish,
            bearish,
        }
    }

    /// Signed weighted combination of bucket sums. `passive_net` is call mid
    /// premium minus put mid premium.
    pub fn sentiment_score(&self, value: &impl Fn(Bucket) -> f64, passive_net: f64) -> f64 {
        let w = &self.weights;
        w.open * (value(Bucket::CallOpen) - value(Bucket::PutOpen))
            + w.close * (value(Bucket::PutClose) - value(Bucket::CallClose))
            + w.sell_to_open * (value(Bucket::PutSellToOpen) - value(Bucket::CallSellToOpen))
            + w.passive * passive_net
    }

    /// Pick the scenario for a score: sign selects the cascade, first match wins,
    /// an unmatched cascade falls back to its "Mildly" label.
    pub fn decide(&self, sentiment_score: f64, value: &impl Fn(Bucket) -> f64) -> Decision<'_> {
        let (rules, fallback) = if sentiment_score > 0.0 {
            (&self.bullish, Scenario::MildlyBullish)
        } else if sentiment_score < 0.0 {
            (&self.bearish, Scenario::MildlyBearish)
        } else {
            return Decision {
                scenario: Scenario::Neutral,
                rule: None,
            };
        };

        match rules.iter().find(|rule| rule.when.holds(value)) {
            Some(rule) => Decision {
                scenario: rule.scenario,
                rule: Some(rule),
            },
            None => Decision {
                scenario: fallback,
                rule: None,
            },
        }
    }

    /// Scenario only; see [`ScenarioPolicy::decide`].
    pub fn select(&self, sentiment_score: f64, value: &impl Fn(Bucket) -> f64) -> Scenario {
        self.decide(sentiment_score, value).scenario
    }

    /// Validate weights and cascade shape.
    pub fn validate(&self) -> Result<()> {
        self.weights.validate()?;

        for (name, rules, sign) in [("bullish", &self.bullish, 1i8), ("bearish", &self.bearish, -1i8)] {
            if rules.is_empty() {
                return Err(Error::config(format!("{name} cascade is empty")));
            }
            for rule in rules {
                if rule.scenario.score().signum() != sign {
                    return Err(Error::config(format!(
                        "{} cannot appear in the {name} cascade",
                        rule.scenario
                    )));
                }
                if rule.when.comparisons().is_empty() {
                    return Err(Error::config(format!("rule for {} has no comparisons", rule.scenario)));
                }
                if rule
                    .when
                    .comparisons()
                    .iter()
                    .any(|c| !c.factor.is_finite() || c.factor < 0.0)
                {
                    return Err(Error::config(format!(
                        "rule for {} has an invalid factor",
                        rule.scenario
                    )));
                }
            }
        }
        Ok(())
    }
}
