//! Batch pipeline: scoring path and decomposition path per HCP
//!
//! Scoring path: features → ensemble scores → aggregate metrics → segment.
//! Decomposition path: channel volume + share → market snapshot → attribution,
//! weighted by wallet-share growth from the scoring path or from the input.
//! Rows are independent; the output order always matches the input order.

use crate::config::EngineConfig;
use crate::hcp::{Channel, HcpBatch, HcpRecord};
use crate::market::{
    attribute, decompose, AttributionConfig, AttributionRecord, MarketShareSnapshot,
};
use crate::metrics::AggregateMetrics;
use crate::scoring::{
    EnsembleScorer, ModelRegistry, Outcome, Prediction, Product, ScoreRecord, ScoringReport,
};
use crate::segmentation::SegmentAssignment;
use crate::summary::BatchSummary;
use log::info;
use rayon::prelude::*;
use std::time::Instant;

/// Decomposition result for one channel
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ChannelOutput {
    pub channel: Channel,
    /// Share percentage as supplied
    pub share_pct: Option<f64>,
    pub snapshot: MarketShareSnapshot,
    pub attribution: AttributionRecord,
}

/// Everything the engine derives for one HCP
#[derive(Debug, Clone, PartialEq)]
pub struct HcpOutput {
    pub id: String,
    pub specialty: String,
    /// Source row, carried through to the output table
    pub input: Vec<String>,
    pub scores: ScoreRecord,
    pub metrics: AggregateMetrics,
    pub assignment: SegmentAssignment,
    pub channels: [ChannelOutput; 2],
}

impl HcpOutput {
    pub fn channel(&self, channel: Channel) -> &ChannelOutput {
        match channel {
            Channel::Trx => &self.channels[0],
            Channel::Nrx => &self.channels[1],
        }
    }
}

/// Output of one run over a batch
#[derive(Debug, Clone)]
pub struct BatchResult {
    /// Header of the source table, matching each row's `input`
    pub input_columns: Vec<String>,
    pub rows: Vec<HcpOutput>,
    pub report: ScoringReport,
}

impl BatchResult {
    pub fn summary(&self) -> BatchSummary {
        BatchSummary::from_result(self)
    }
}

/// Attribution weights per product: supplied signal, else the model's
/// wallet-share-growth prediction, else zero
pub fn attribution_weights(record: &HcpRecord, scores: &ScoreRecord) -> [f64; 3] {
    Product::ALL.map(|p| {
        record.wallet_share_signals[p.index()]
            .or_else(|| scores.get(p, Outcome::WalletShareGrowth).map(Prediction::signal))
            .unwrap_or(0.0)
    })
}

/// Decompose and attribute both channels of one HCP
pub fn decompose_hcp(
    record: &HcpRecord,
    weights: [f64; 3],
    cfg: &AttributionConfig,
) -> [ChannelOutput; 2] {
    Channel::ALL.map(|channel| {
        let obs = record.channel(channel);
        let snapshot = decompose(obs.volume, obs.share_pct);
        let attribution = attribute(snapshot.competitor_volume, weights, &record.specialty, cfg);
        ChannelOutput { channel, share_pct: obs.share_pct, snapshot, attribution }
    })
}

/// Holds configuration and loaded models for a scoring run
#[derive(Debug)]
pub struct Engine {
    config: EngineConfig,
    registry: ModelRegistry,
}

impl Engine {
    pub fn new(config: EngineConfig, registry: ModelRegistry) -> Self {
        Self { config, registry }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn registry(&self) -> &ModelRegistry {
        &self.registry
    }

    fn finish_row(&self, record: &HcpRecord, scores: ScoreRecord) -> HcpOutput {
        let metrics = AggregateMetrics::from_scores(&scores);
        let assignment = SegmentAssignment::assign(&metrics, self.config.unit_value);
        let weights = attribution_weights(record, &scores);
        let channels = decompose_hcp(record, weights, &self.config.attribution);
        HcpOutput {
            id: record.id.clone(),
            specialty: record.specialty.clone(),
            input: record.input.clone(),
            scores,
            metrics,
            assignment,
            channels,
        }
    }

    /// Run both paths over every HCP in the batch
    pub fn run(&self, batch: &HcpBatch) -> BatchResult {
        let start = Instant::now();
        let scorer = EnsembleScorer::new(self.config.alignment, self.config.parallel);
        let (scores, report) =
            scorer.score(&batch.feature_matrix(), batch.feature_width(), &self.registry);

        let rows: Vec<HcpOutput> = if self.config.parallel {
            batch
                .records
                .par_iter()
                .zip(scores.into_par_iter())
                .map(|(record, s)| self.finish_row(record, s))
                .collect()
        } else {
            batch
                .records
                .iter()
                .zip(scores)
                .map(|(record, s)| self.finish_row(record, s))
                .collect()
        };

        info!("Processed {} HCPs in {:?}", rows.len(), start.elapsed());
        BatchResult {
            input_columns: batch.input_columns.clone(),
            rows,
            report,
        }
    }
}
