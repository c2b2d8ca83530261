//! Model registry: one slot per (product, outcome)
//!
//! A slot whose file is missing or unreadable is recorded as unavailable.
//! That never fails the batch; the scorer simply omits the slot's columns.

use super::model::{ModelDefinition, Predictor};
use super::ModelKey;
use log::{info, warn};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;

/// Load state of one slot
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ModelStatus {
    Available { expected_width: usize },
    Unavailable { reason: String },
}

enum Slot {
    Loaded(Box<dyn Predictor>),
    Missing(String),
}

/// Holds every fixed model slot, loaded once before scoring
pub struct ModelRegistry {
    slots: BTreeMap<ModelKey, Slot>,
}

impl ModelRegistry {
    /// Empty registry: every slot unavailable
    pub fn empty() -> Self {
        let slots = ModelKey::all()
            .map(|k| (k, Slot::Missing("not supplied".to_string())))
            .collect();
        Self { slots }
    }

    /// Load `<product>_<outcome>.json` for every slot from `dir`
    pub fn load_dir(dir: &Path) -> Self {
        let mut registry = Self::empty();
        for key in ModelKey::all() {
            let path = dir.join(format!("{}.json", key.stem()));
            let slot = if !path.exists() {
                warn!("Model {key} unavailable: {} not found", path.display());
                Slot::Missing("file not found".to_string())
            } else {
                match ModelDefinition::load(&path) {
                    Ok(def) => Slot::Loaded(def.into_predictor()),
                    Err(e) => {
                        warn!("Model {key} unavailable: {e}");
                        Slot::Missing(e.to_string())
                    }
                }
            };
            registry.slots.insert(key, slot);
        }
        info!(
            "Loaded {}/{} models from {}",
            registry.available_count(),
            registry.total_slots(),
            dir.display()
        );
        registry
    }

    /// Build from caller-supplied predictors; unspecified slots stay unavailable
    pub fn from_models<I>(models: I) -> Self
    where
        I: IntoIterator<Item = (ModelKey, Box<dyn Predictor>)>,
    {
        let mut registry = Self::empty();
        for (key, model) in models {
            registry.insert(key, model);
        }
        registry
    }

    pub fn insert(&mut self, key: ModelKey, model: Box<dyn Predictor>) {
        self.slots.insert(key, Slot::Loaded(model));
    }

    pub fn get(&self, key: &ModelKey) -> Option<&dyn Predictor> {
        match self.slots.get(key) {
            Some(Slot::Loaded(m)) => Some(m.as_ref()),
            _ => None,
        }
    }

    pub fn status(&self, key: &ModelKey) -> ModelStatus {
        match self.slots.get(key) {
            Some(Slot::Loaded(m)) => ModelStatus::Available { expected_width: m.expected_width() },
            Some(Slot::Missing(reason)) => ModelStatus::Unavailable { reason: reason.clone() },
            None => ModelStatus::Unavailable { reason: "unknown slot".to_string() },
        }
    }

    pub fn available_count(&self) -> usize {
        self.slots.values().filter(|s| matches!(s, Slot::Loaded(_))).count()
    }

    pub fn total_slots(&self) -> usize {
        ModelKey::total_slots()
    }
}

impl Default for ModelRegistry {
    fn default() -> Self {
        Self::empty()
    }
}

impl fmt::Debug for ModelRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModelRegistry")
            .field("available", &self.available_count())
            .field("total", &self.total_slots())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scoring::model::LinearModel;
    use crate::scoring::{Outcome, Product};
    use std::fs;

    #[test]
    fn test_missing_dir_leaves_every_slot_unavailable() {
        let dir = tempfile::tempdir().unwrap();
        let registry = ModelRegistry::load_dir(dir.path());
        assert_eq!(registry.available_count(), 0);
        assert_eq!(registry.total_slots(), 12);
    }

    #[test]
    fn test_loads_present_files_and_tolerates_corrupt_ones() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join("tirosint_call_success.json"),
            r#"{"kind": "logistic", "weights": [0.5, 0.5]}"#,
        )
        .unwrap();
        fs::write(dir.path().join("flector_prescription_lift.json"), "not json").unwrap();

        let registry = ModelRegistry::load_dir(dir.path());
        assert_eq!(registry.available_count(), 1);

        let ok = ModelKey::new(Product::Tirosint, Outcome::CallSuccess);
        assert_eq!(registry.status(&ok), ModelStatus::Available { expected_width: 2 });

        let bad = ModelKey::new(Product::Flector, Outcome::PrescriptionLift);
        assert!(registry.get(&bad).is_none());
        assert!(matches!(registry.status(&bad), ModelStatus::Unavailable { .. }));
    }

    #[test]
    fn test_from_models() {
        let key = ModelKey::new(Product::Licart, Outcome::WalletShareGrowth);
        let registry = ModelRegistry::from_models([(
            key,
            Box::new(LinearModel::new(vec![1.0], 0.0)) as Box<dyn Predictor>,
        )]);
        assert_eq!(registry.available_count(), 1);
        assert!(registry.get(&key).is_some());
    }
}
