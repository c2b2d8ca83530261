//! Ensemble scoring of an HCP batch against every available model

use super::align::{align_features, AlignmentOutcome, AlignmentPolicy};
use super::registry::{ModelRegistry, ModelStatus};
use super::{ModelKey, Outcome, OutcomeKind, Predictor, Product};
use crate::metrics::NEUTRAL_CALL_SUCCESS_PROB;
use log::{info, warn};
use rayon::prelude::*;
use serde::Serialize;
use std::collections::BTreeMap;

/// One model's output for one HCP
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Prediction {
    Binary { label: u8, probability: f64 },
    Continuous { value: f64 },
}

impl Prediction {
    /// Score a single aligned row.
    ///
    /// A non-finite model output (overflowing dot product) scores as the
    /// neutral probability for binary outcomes and zero for continuous ones.
    pub fn from_model(model: &dyn Predictor, kind: OutcomeKind, features: &[f64]) -> Self {
        let decision = model.predict(features);
        match kind {
            OutcomeKind::Binary => {
                let proba = model.predict_proba(features);
                if !decision.is_finite() || proba.is_some_and(|p| !p.is_finite()) {
                    warn!(
                        "Non-finite classifier output; using probability {}",
                        NEUTRAL_CALL_SUCCESS_PROB
                    );
                    return Prediction::Binary {
                        label: 0,
                        probability: NEUTRAL_CALL_SUCCESS_PROB,
                    };
                }
                let label = if decision > 0.0 { 1 } else { 0 };
                // Without a probability output the label stands in for it
                let probability = proba.unwrap_or(label as f64).clamp(0.0, 1.0);
                Prediction::Binary { label, probability }
            }
            OutcomeKind::Continuous if !decision.is_finite() => {
                warn!("Non-finite regression output; using 0");
                Prediction::Continuous { value: 0.0 }
            }
            OutcomeKind::Continuous => Prediction::Continuous { value: decision },
        }
    }

    /// The number the aggregator consumes: probability for binary outcomes,
    /// the raw value for continuous ones
    pub fn signal(&self) -> f64 {
        match *self {
            Prediction::Binary { probability, .. } => probability,
            Prediction::Continuous { value } => value,
        }
    }
}

/// Per-HCP predictions for every scored slot
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ScoreRecord {
    predictions: BTreeMap<ModelKey, Prediction>,
}

impl ScoreRecord {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: ModelKey, prediction: Prediction) {
        self.predictions.insert(key, prediction);
    }

    pub fn get(&self, product: Product, outcome: Outcome) -> Option<&Prediction> {
        self.predictions.get(&ModelKey::new(product, outcome))
    }

    /// Signals for one outcome across products, in product order
    pub fn signals(&self, outcome: Outcome) -> impl Iterator<Item = f64> + '_ {
        Product::ALL
            .into_iter()
            .filter_map(move |p| self.get(p, outcome).map(Prediction::signal))
    }

    pub fn iter(&self) -> impl Iterator<Item = (&ModelKey, &Prediction)> {
        self.predictions.iter()
    }

    pub fn len(&self) -> usize {
        self.predictions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.predictions.is_empty()
    }
}

/// Per-slot result of a scoring pass
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum SlotReport {
    Scored { alignment: AlignmentOutcome },
    Skipped { alignment: AlignmentOutcome },
    Unavailable { reason: String },
}

/// Which slots contributed columns to this batch
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ScoringReport {
    pub slots: BTreeMap<ModelKey, SlotReport>,
}

impl ScoringReport {
    pub fn scored_count(&self) -> usize {
        self.slots
            .values()
            .filter(|s| matches!(s, SlotReport::Scored { .. }))
            .count()
    }

    /// Scored slots in column order
    pub fn scored_keys(&self) -> Vec<ModelKey> {
        self.slots
            .iter()
            .filter(|(_, s)| matches!(s, SlotReport::Scored { .. }))
            .map(|(k, _)| *k)
            .collect()
    }

    pub fn total_slots(&self) -> usize {
        ModelKey::total_slots()
    }
}

/// Scores feature matrices against a model registry
#[derive(Debug, Clone, Copy)]
pub struct EnsembleScorer {
    pub policy: AlignmentPolicy,
    pub parallel: bool,
}

impl Default for EnsembleScorer {
    fn default() -> Self {
        Self { policy: AlignmentPolicy::Strict, parallel: true }
    }
}

impl EnsembleScorer {
    pub fn new(policy: AlignmentPolicy, parallel: bool) -> Self {
        Self { policy, parallel }
    }

    /// Score every row of `features` (all rows `width` wide).
    ///
    /// Returns one [`ScoreRecord`] per row, in row order.
    pub fn score(
        &self,
        features: &[Vec<f64>],
        width: usize,
        registry: &ModelRegistry,
    ) -> (Vec<ScoreRecord>, ScoringReport) {
        let mut records = vec![ScoreRecord::new(); features.len()];
        let mut report = ScoringReport::default();

        for key in ModelKey::all() {
            let model = match (registry.get(&key), registry.status(&key)) {
                (Some(model), _) => model,
                (None, ModelStatus::Unavailable { reason }) => {
                    report.slots.insert(key, SlotReport::Unavailable { reason });
                    continue;
                }
                (None, ModelStatus::Available { .. }) => continue,
            };

            let label = key.stem();
            let (alignment, aligned) =
                align_features(features, width, model.expected_width(), self.policy, &label);
            let Some(aligned) = aligned else {
                report.slots.insert(key, SlotReport::Skipped { alignment });
                continue;
            };

            let kind = key.outcome.kind();
            let column: Vec<Prediction> = if self.parallel {
                aligned
                    .par_iter()
                    .map(|row| Prediction::from_model(model, kind, row))
                    .collect()
            } else {
                aligned
                    .iter()
                    .map(|row| Prediction::from_model(model, kind, row))
                    .collect()
            };

            for (record, prediction) in records.iter_mut().zip(column) {
                record.insert(key, prediction);
            }
            report.slots.insert(key, SlotReport::Scored { alignment });
        }

        info!(
            "Scored {}/{} model slots over {} HCPs",
            report.scored_count(),
            report.total_slots(),
            features.len()
        );
        (records, report)
    }
}
