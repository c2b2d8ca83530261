//! Engine configuration
//!
//! Every field has a default, so a partial JSON file (or none at all) is valid.

use crate::error::{EngineError, Result};
use crate::hcp::InputColumns;
use crate::market::AttributionConfig;
use crate::scoring::AlignmentPolicy;
use crate::segmentation::DEFAULT_UNIT_VALUE;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    #[serde(flatten)]
    pub input: InputColumns,

    /// Feature-width mismatch handling
    #[serde(default)]
    pub alignment: AlignmentPolicy,

    /// Revenue per unit of forecasted lift
    #[serde(default = "default_unit_value")]
    pub unit_value: f64,

    #[serde(flatten)]
    pub attribution: AttributionConfig,

    /// Score rows on the rayon pool
    #[serde(default = "default_parallel")]
    pub parallel: bool,
}

fn default_unit_value() -> f64 { DEFAULT_UNIT_VALUE }
fn default_parallel() -> bool { true }

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            input: InputColumns::default(),
            alignment: AlignmentPolicy::default(),
            unit_value: DEFAULT_UNIT_VALUE,
            attribution: AttributionConfig::default(),
            parallel: true,
        }
    }
}

impl EngineConfig {
    /// Load from a JSON file and validate
    pub fn load(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path)?;
        let config: EngineConfig = serde_json::from_str(&raw)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.input.id_column.trim().is_empty() {
            return Err(EngineError::InvalidConfig("id_column must not be empty".to_string()));
        }
        if !self.unit_value.is_finite() {
            return Err(EngineError::InvalidConfig(format!(
                "unit_value must be finite, got {}",
                self.unit_value
            )));
        }
        self.attribution.validate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_object_gives_defaults() {
        let config: EngineConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config, EngineConfig::default());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_override() {
        let json = r#"{
            "id_column": "npi",
            "alignment": "lossy",
            "unit_value": 42.0,
            "specialty_boost": 2.0,
            "specialty_keywords": {"levothyroxine": ["thyroid"]}
        }"#;
        let config: EngineConfig = serde_json::from_str(json).unwrap();
        assert_eq!(config.input.id_column, "npi");
        assert_eq!(config.input.specialty_column, "specialty");
        assert_eq!(config.alignment, AlignmentPolicy::Lossy);
        assert_eq!(config.unit_value, 42.0);
        assert_eq!(config.attribution.specialty_boost, 2.0);
        assert_eq!(config.attribution.default_shares, [0.40, 0.35, 0.25]);
        assert_eq!(config.attribution.specialty_keywords.len(), 1);
        assert!(config.parallel);
    }

    #[test]
    fn test_invalid_shares_rejected() {
        let json = r#"{"default_shares": [0.9, 0.9, 0.9]}"#;
        let config: EngineConfig = serde_json::from_str(json).unwrap();
        assert!(matches!(config.validate(), Err(EngineError::InvalidConfig(_))));
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("engine.json");
        fs::write(&path, r#"{"parallel": false}"#).unwrap();
        let config = EngineConfig::load(&path).unwrap();
        assert!(!config.parallel);
    }
}
