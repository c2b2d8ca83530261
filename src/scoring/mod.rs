//! Per-product, per-outcome model scoring

pub mod align;
pub mod model;
pub mod registry;
pub mod scorer;

pub use align::{align_features, align_row, AlignmentOutcome, AlignmentPolicy};
pub use model::{LinearModel, LogisticModel, ModelDefinition, Predictor};
pub use registry::{ModelRegistry, ModelStatus};
pub use scorer::{EnsembleScorer, Prediction, ScoreRecord, ScoringReport, SlotReport};

use serde::{Deserialize, Serialize};
use std::fmt;

/// Promoted products. Order matters: it fixes column order and the
/// competitor cluster each product maps to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Product {
    Tirosint,
    Flector,
    Licart,
}

impl Product {
    pub const ALL: [Product; 3] = [Product::Tirosint, Product::Flector, Product::Licart];

    pub fn as_str(&self) -> &'static str {
        match self {
            Product::Tirosint => "tirosint",
            Product::Flector => "flector",
            Product::Licart => "licart",
        }
    }

    pub fn index(&self) -> usize {
        match self {
            Product::Tirosint => 0,
            Product::Flector => 1,
            Product::Licart => 2,
        }
    }
}

impl fmt::Display for Product {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Whether a model predicts a class label or a real value
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutcomeKind {
    Binary,
    Continuous,
}

/// Modelled outcomes
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    CallSuccess,
    PrescriptionLift,
    NgdCategory,
    WalletShareGrowth,
}

impl Outcome {
    pub const ALL: [Outcome; 4] = [
        Outcome::CallSuccess,
        Outcome::PrescriptionLift,
        Outcome::NgdCategory,
        Outcome::WalletShareGrowth,
    ];

    pub fn kind(&self) -> OutcomeKind {
        match self {
            Outcome::CallSuccess | Outcome::NgdCategory => OutcomeKind::Binary,
            Outcome::PrescriptionLift | Outcome::WalletShareGrowth => OutcomeKind::Continuous,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Outcome::CallSuccess => "call_success",
            Outcome::PrescriptionLift => "prescription_lift",
            Outcome::NgdCategory => "ngd_category",
            Outcome::WalletShareGrowth => "wallet_share_growth",
        }
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Identity of one model slot
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ModelKey {
    pub product: Product,
    pub outcome: Outcome,
}

impl ModelKey {
    pub fn new(product: Product, outcome: Outcome) -> Self {
        Self { product, outcome }
    }

    /// Every fixed slot, product-major
    pub fn all() -> impl Iterator<Item = ModelKey> {
        Product::ALL
            .into_iter()
            .flat_map(|p| Outcome::ALL.into_iter().map(move |o| ModelKey::new(p, o)))
    }

    pub fn total_slots() -> usize {
        Product::ALL.len() * Outcome::ALL.len()
    }

    /// Column/file stem, e.g. `tirosint_call_success`
    pub fn stem(&self) -> String {
        format!("{}_{}", self.product, self.outcome)
    }
}

impl fmt::Display for ModelKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}_{}", self.product, self.outcome)
    }
}
