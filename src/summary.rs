//! Batch-level summary for reporting

use crate::hcp::Channel;
use crate::market::CompetitorCluster;
use crate::pipeline::BatchResult;
use crate::scoring::{ModelKey, SlotReport};
use serde::Serialize;
use std::collections::BTreeMap;

/// Volume totals for one channel across the batch
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ChannelTotals {
    pub ibsa_volume: f64,
    pub total_market_volume: f64,
    pub competitor_volume: f64,
    pub attributed: BTreeMap<String, f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct BatchSummary {
    pub hcp_count: usize,
    pub models_scored: usize,
    pub model_slots: usize,
    pub model_status: BTreeMap<String, SlotReport>,
    pub segments: BTreeMap<String, usize>,
    pub next_best_actions: BTreeMap<String, usize>,
    pub churn_risk_levels: BTreeMap<String, usize>,
    pub channels: BTreeMap<String, ChannelTotals>,
    pub total_expected_roi: f64,
}

impl BatchSummary {
    pub fn from_result(result: &BatchResult) -> Self {
        let mut summary = BatchSummary {
            hcp_count: result.rows.len(),
            models_scored: result.report.scored_count(),
            model_slots: result.report.total_slots(),
            ..Default::default()
        };

        for key in ModelKey::all() {
            if let Some(slot) = result.report.slots.get(&key) {
                summary.model_status.insert(key.stem(), slot.clone());
            }
        }

        for row in &result.rows {
            *summary
                .segments
                .entry(row.assignment.segment.to_string())
                .or_insert(0) += 1;
            *summary
                .next_best_actions
                .entry(row.assignment.next_best_action.to_string())
                .or_insert(0) += 1;
            *summary
                .churn_risk_levels
                .entry(row.metrics.churn_risk_level.to_string())
                .or_insert(0) += 1;
            summary.total_expected_roi += row.assignment.expected_roi;

            for channel in Channel::ALL {
                let out = row.channel(channel);
                let totals = summary.channels.entry(channel.to_string()).or_default();
                totals.ibsa_volume += out.snapshot.ibsa_volume;
                totals.total_market_volume += out.snapshot.total_market_volume;
                totals.competitor_volume += out.snapshot.competitor_volume;
                for cluster in CompetitorCluster::ALL {
                    *totals.attributed.entry(cluster.to_string()).or_insert(0.0) +=
                        out.attribution.get(cluster);
                }
            }
        }

        summary
    }
}
