//! Pre-trained predictors
//!
//! Models are trained elsewhere and shipped as small JSON descriptions.
//! The engine only ever scores them through [`Predictor`].

use crate::error::{EngineError, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// A loaded, immutable scoring function
pub trait Predictor: Send + Sync {
    /// Number of input features the model was trained on
    fn expected_width(&self) -> usize;

    /// Decision value: a class label for classifiers, the prediction for regressors
    fn predict(&self, features: &[f64]) -> f64;

    /// Positive-class probability, when the model can produce one
    fn predict_proba(&self, _features: &[f64]) -> Option<f64> {
        None
    }
}

fn dot(weights: &[f64], features: &[f64], intercept: f64) -> f64 {
    weights
        .iter()
        .zip(features)
        .fold(intercept, |acc, (w, x)| acc + w * x)
}

/// Ordinary linear model. Used directly for continuous outcomes; for a
/// binary outcome the label is `1` when the decision value is positive.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinearModel {
    pub weights: Vec<f64>,
    #[serde(default)]
    pub intercept: f64,
}

impl LinearModel {
    pub fn new(weights: Vec<f64>, intercept: f64) -> Self {
        Self { weights, intercept }
    }

    pub fn decision(&self, features: &[f64]) -> f64 {
        dot(&self.weights, features, self.intercept)
    }
}

impl Predictor for LinearModel {
    fn expected_width(&self) -> usize {
        self.weights.len()
    }

    fn predict(&self, features: &[f64]) -> f64 {
        self.decision(features)
    }
}

/// Binary classifier that thresholds `sigmoid(w·x + b)`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogisticModel {
    pub weights: Vec<f64>,
    #[serde(default)]
    pub intercept: f64,
    #[serde(default = "default_threshold")]
    pub threshold: f64,
}

fn default_threshold() -> f64 { 0.5 }

impl LogisticModel {
    pub fn new(weights: Vec<f64>, intercept: f64) -> Self {
        Self { weights, intercept, threshold: default_threshold() }
    }

    pub fn probability(&self, features: &[f64]) -> f64 {
        let z = dot(&self.weights, features, self.intercept);
        1.0 / (1.0 + (-z).exp())
    }
}

impl Predictor for LogisticModel {
    fn expected_width(&self) -> usize {
        self.weights.len()
    }

    fn predict(&self, features: &[f64]) -> f64 {
        if self.probability(features) >= self.threshold { 1.0 } else { 0.0 }
    }

    fn predict_proba(&self, features: &[f64]) -> Option<f64> {
        Some(self.probability(features))
    }
}

/// On-disk model description
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ModelDefinition {
    Linear(LinearModel),
    Logistic(LogisticModel),
}

impl ModelDefinition {
    /// Read and validate a model file
    pub fn load(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path)?;
        let def: ModelDefinition = serde_json::from_str(&raw).map_err(|e| EngineError::ModelLoad {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        def.validate().map_err(|reason| EngineError::ModelLoad {
            path: path.to_path_buf(),
            reason,
        })?;
        Ok(def)
    }

    fn validate(&self) -> std::result::Result<(), String> {
        let weights = match self {
            ModelDefinition::Linear(m) => &m.weights,
            ModelDefinition::Logistic(m) => &m.weights,
        };
        if weights.is_empty() {
            return Err("model has no weights".to_string());
        }
        if weights.iter().any(|w| !w.is_finite()) {
            return Err("model weights must be finite".to_string());
        }
        Ok(())
    }

    pub fn into_predictor(self) -> Box<dyn Predictor> {
        match self {
            ModelDefinition::Linear(m) => Box::new(m),
            ModelDefinition::Logistic(m) => Box::new(m),
        }
    }
}
