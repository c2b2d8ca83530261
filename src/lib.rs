//! HCP scoring, market-share decomposition and segmentation engine
//!
//! A pure batch transform over already-joined prescriber rows:
//! - scores each HCP with pre-trained per-product, per-outcome models
//! - aggregates cross-product metrics and assigns a sales segment and next best action
//! - reconstructs total-market and competitor volume from market share
//! - attributes competitor volume to competitor product clusters

pub mod config;
pub mod error;
pub mod hcp;
pub mod market;
pub mod metrics;
pub mod output;
pub mod pipeline;
pub mod scoring;
pub mod segmentation;
pub mod summary;

pub use config::EngineConfig;
pub use error::{EngineError, Result};
pub use hcp::{load_hcps, load_hcps_from_reader, Channel, HcpBatch, HcpRecord};
pub use metrics::{AggregateMetrics, ChurnRiskLevel, NgdClass};
pub use pipeline::{BatchResult, Engine, HcpOutput};
pub use scoring::{ModelKey, ModelRegistry, Outcome, Product};
pub use segmentation::{NextBestAction, Segment, SegmentAssignment};
pub use summary::BatchSummary;
