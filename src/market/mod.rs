//! Market-share decomposition and competitor attribution

pub mod attribution;
pub mod decompose;

pub use attribution::{
    attribute, attribution_shares, AttributionConfig, AttributionRecord, CompetitorCluster,
    DEFAULT_COMPETITOR_SHARES, DEFAULT_SPECIALTY_BOOST,
};
pub use decompose::{decompose, MarketShareSnapshot};
