//! HCP record types

use crate::scoring::Product;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Prescription channel
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Channel {
    /// Total prescriptions (new + refills)
    Trx,
    /// New prescriptions only
    Nrx,
}

impl Channel {
    pub const ALL: [Channel; 2] = [Channel::Trx, Channel::Nrx];

    pub fn as_str(&self) -> &'static str {
        match self {
            Channel::Trx => "trx",
            Channel::Nrx => "nrx",
        }
    }

    pub fn volume_column(&self) -> String {
        format!("ibsa_volume_{}", self.as_str())
    }

    pub fn share_column(&self) -> String {
        format!("ibsa_share_pct_{}", self.as_str())
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Observed own-product volume and market share on one channel
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ChannelObservation {
    pub volume: f64,
    /// Percentage in [0, 100]; `None` when the source had no value
    pub share_pct: Option<f64>,
}

/// Column holding an externally supplied wallet-share-growth signal
pub fn wallet_signal_column(product: Product) -> String {
    format!("wallet_share_growth_{product}")
}

/// One prescriber row as supplied by upstream ETL
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HcpRecord {
    pub id: String,
    pub specialty: String,
    pub trx: ChannelObservation,
    pub nrx: ChannelObservation,
    /// Ordered model inputs
    pub features: Vec<f64>,
    /// Externally computed wallet-share growth per product (product order)
    pub wallet_share_signals: [Option<f64>; 3],
    /// Raw input cells, in input column order, written back out unchanged
    pub input: Vec<String>,
}

impl HcpRecord {
    pub fn new(id: impl Into<String>) -> Self {
        Self { id: id.into(), ..Default::default() }
    }

    pub fn channel(&self, channel: Channel) -> &ChannelObservation {
        match channel {
            Channel::Trx => &self.trx,
            Channel::Nrx => &self.nrx,
        }
    }

    pub fn channel_mut(&mut self, channel: Channel) -> &mut ChannelObservation {
        match channel {
            Channel::Trx => &mut self.trx,
            Channel::Nrx => &mut self.nrx,
        }
    }
}

/// A loaded batch: records plus the feature layout shared by every row
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HcpBatch {
    pub records: Vec<HcpRecord>,
    pub feature_names: Vec<String>,
    /// Header of the source table; empty for batches built in memory
    pub input_columns: Vec<String>,
}

impl HcpBatch {
    pub fn new(records: Vec<HcpRecord>, feature_names: Vec<String>) -> Self {
        Self { records, feature_names, input_columns: Vec::new() }
    }

    pub fn with_input_columns(mut self, input_columns: Vec<String>) -> Self {
        self.input_columns = input_columns;
        self
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Width of the feature matrix
    pub fn feature_width(&self) -> usize {
        self.feature_names.len()
    }

    pub fn feature_matrix(&self) -> Vec<Vec<f64>> {
        self.records.iter().map(|r| r.features.clone()).collect()
    }
}
