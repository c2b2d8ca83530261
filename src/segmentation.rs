//! Rule-based segment and next-best-action assignment
//!
//! Both rule sets are first-match-wins. Conditions overlap, so the order of
//! the checks below is part of the contract.

use crate::metrics::{AggregateMetrics, ChurnRiskLevel};
use serde::{Deserialize, Serialize};
use std::fmt;

pub const CHAMPION_MIN_CALL_SUCCESS: f64 = 0.7;
pub const CHAMPION_MIN_LIFT: f64 = 10.0;
pub const GROWTH_MIN_LIFT: f64 = 5.0;
pub const AT_RISK_MIN_CHURN: f64 = 0.6;
pub const MAINTAIN_MIN_CALL_SUCCESS: f64 = 0.5;

/// Lift above which calls should be increased
pub const INCREASE_CALLS_MIN_LIFT: f64 = 10.0;
/// Sample effectiveness = call-success probability × this factor
pub const SAMPLE_EFFECTIVENESS_FACTOR: f64 = 0.3;
/// Effectiveness below this only warrants a sample drop
pub const SAMPLE_DROP_BELOW: f64 = 0.05;
/// Upper bound on samples allocated to one HCP
pub const MAX_SAMPLE_ALLOCATION: u32 = 50;

/// Default per-unit revenue proxy for expected ROI
pub const DEFAULT_UNIT_VALUE: f64 = 150.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Segment {
    Champions,
    GrowthOpportunities,
    AtRisk,
    Maintain,
    Deprioritize,
}

impl Segment {
    pub fn classify(m: &AggregateMetrics) -> Self {
        if m.call_success_prob > CHAMPION_MIN_CALL_SUCCESS
            && m.forecasted_lift > CHAMPION_MIN_LIFT
        {
            Segment::Champions
        } else if m.forecasted_lift > GROWTH_MIN_LIFT {
            Segment::GrowthOpportunities
        } else if m.churn_risk > AT_RISK_MIN_CHURN {
            Segment::AtRisk
        } else if m.call_success_prob > MAINTAIN_MIN_CALL_SUCCESS {
            Segment::Maintain
        } else {
            Segment::Deprioritize
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Segment::Champions => "Champions",
            Segment::GrowthOpportunities => "Growth Opportunities",
            Segment::AtRisk => "At-Risk",
            Segment::Maintain => "Maintain",
            Segment::Deprioritize => "Deprioritize",
        }
    }
}

impl fmt::Display for Segment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum NextBestAction {
    MaintainEngagement,
    IncreaseCalls,
    SampleDropOnly,
    DetailOnly,
}

impl NextBestAction {
    pub fn classify(m: &AggregateMetrics) -> Self {
        if m.churn_risk_level == ChurnRiskLevel::High {
            NextBestAction::MaintainEngagement
        } else if m.forecasted_lift > INCREASE_CALLS_MIN_LIFT {
            NextBestAction::IncreaseCalls
        } else if sample_effectiveness(m) < SAMPLE_DROP_BELOW {
            NextBestAction::SampleDropOnly
        } else {
            NextBestAction::DetailOnly
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            NextBestAction::MaintainEngagement => "Maintain Engagement",
            NextBestAction::IncreaseCalls => "Increase Calls",
            NextBestAction::SampleDropOnly => "Sample Drop Only",
            NextBestAction::DetailOnly => "Detail Only",
        }
    }
}

impl fmt::Display for NextBestAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Proxy for how much a sample drop moves this HCP
pub fn sample_effectiveness(m: &AggregateMetrics) -> f64 {
    m.call_success_prob * SAMPLE_EFFECTIVENESS_FACTOR
}

/// Samples to allocate: effectiveness × 100, clipped to `[0, 50]` and rounded
pub fn sample_allocation(m: &AggregateMetrics) -> u32 {
    let raw = (sample_effectiveness(m) * 100.0).clamp(0.0, MAX_SAMPLE_ALLOCATION as f64);
    // NaN maps to 0
    raw.round() as u32
}

/// Sales action plan for one HCP
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SegmentAssignment {
    pub segment: Segment,
    pub next_best_action: NextBestAction,
    pub expected_roi: f64,
    pub sample_allocation: u32,
}

impl SegmentAssignment {
    pub fn assign(m: &AggregateMetrics, unit_value: f64) -> Self {
        Self {
            segment: Segment::classify(m),
            next_best_action: NextBestAction::classify(m),
            expected_roi: m.forecasted_lift * unit_value,
            sample_allocation: sample_allocation(m),
        }
    }
}
