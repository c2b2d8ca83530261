//! Cross-product summary metrics derived from per-model predictions
//!
//! Thresholds below are fixed business constants. Comparisons are strict,
//! so a value sitting exactly on a boundary falls into the upper bucket.

use crate::scoring::{Outcome, ScoreRecord};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Call-success probability assumed when no call-success model scored
pub const NEUTRAL_CALL_SUCCESS_PROB: f64 = 0.5;

/// Churn risk strictly above this is `High`
pub const CHURN_HIGH_THRESHOLD: f64 = 0.7;
/// Churn risk strictly above this (and not high) is `Medium`
pub const CHURN_MEDIUM_THRESHOLD: f64 = 0.4;

/// NGD score strictly below this is `Decliner`
pub const NGD_DECLINER_BELOW: f64 = 0.25;
/// NGD score strictly below this is `Stable`
pub const NGD_STABLE_BELOW: f64 = 0.5;
/// NGD score strictly below this is `Grower`; at or above is `New`
pub const NGD_GROWER_BELOW: f64 = 0.75;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ChurnRiskLevel {
    Low,
    Medium,
    High,
}

impl ChurnRiskLevel {
    pub fn from_risk(churn_risk: f64) -> Self {
        if churn_risk > CHURN_HIGH_THRESHOLD {
            ChurnRiskLevel::High
        } else if churn_risk > CHURN_MEDIUM_THRESHOLD {
            ChurnRiskLevel::Medium
        } else {
            ChurnRiskLevel::Low
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ChurnRiskLevel::Low => "Low",
            ChurnRiskLevel::Medium => "Medium",
            ChurnRiskLevel::High => "High",
        }
    }
}

impl fmt::Display for ChurnRiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Prescriber trajectory
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum NgdClass {
    Decliner,
    Stable,
    Grower,
    New,
}

impl NgdClass {
    pub fn from_score(score: f64) -> Self {
        if score < NGD_DECLINER_BELOW {
            NgdClass::Decliner
        } else if score < NGD_STABLE_BELOW {
            NgdClass::Stable
        } else if score < NGD_GROWER_BELOW {
            NgdClass::Grower
        } else {
            NgdClass::New
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            NgdClass::Decliner => "Decliner",
            NgdClass::Stable => "Stable",
            NgdClass::Grower => "Grower",
            NgdClass::New => "New",
        }
    }
}

impl fmt::Display for NgdClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Aggregated metrics for one HCP
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct AggregateMetrics {
    pub call_success_prob: f64,
    pub forecasted_lift: f64,
    pub churn_risk: f64,
    pub churn_risk_level: ChurnRiskLevel,
    pub ngd_classification: NgdClass,
}

impl AggregateMetrics {
    /// Summarize one HCP's per-product predictions
    pub fn from_scores(scores: &ScoreRecord) -> Self {
        let (sum, count) = scores
            .signals(Outcome::CallSuccess)
            .fold((0.0, 0usize), |(s, n), p| (s + p, n + 1));
        let call_success_prob = if count > 0 {
            sum / count as f64
        } else {
            NEUTRAL_CALL_SUCCESS_PROB
        };

        let forecasted_lift: f64 = scores.signals(Outcome::PrescriptionLift).sum();

        let churn_risk = 1.0 - call_success_prob;

        let ngd_classification = scores
            .signals(Outcome::NgdCategory)
            .next()
            .map(NgdClass::from_score)
            .unwrap_or(NgdClass::Stable);

        Self {
            call_success_prob,
            forecasted_lift,
            churn_risk,
            churn_risk_level: ChurnRiskLevel::from_risk(churn_risk),
            ngd_classification,
        }
    }
}
