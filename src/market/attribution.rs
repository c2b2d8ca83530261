//! Split the competitor residual across named competitor clusters
//!
//! Weights come from per-product wallet-share-growth signals. Each product
//! maps to the competitor cluster it takes share from. After the specialty
//! boost the split is renormalized, so the attributed volumes always sum to
//! the competitor volume.

use crate::error::{EngineError, Result};
use crate::scoring::Product;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Fallback split when no product carries positive weight (product order)
pub const DEFAULT_COMPETITOR_SHARES: [f64; 3] = [0.40, 0.35, 0.25];

/// Multiplier applied to a cluster whose keywords match the HCP's specialty
pub const DEFAULT_SPECIALTY_BOOST: f64 = 1.5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CompetitorCluster {
    /// Synthroid, Levoxyl, Unithroid and generic levothyroxine
    Levothyroxine,
    /// Oral diclofenac, meloxicam, celecoxib
    OralNsaid,
    /// Lidocaine patches, Voltaren gel and other topicals
    TopicalAnalgesic,
}

impl CompetitorCluster {
    pub const ALL: [CompetitorCluster; 3] = [
        CompetitorCluster::Levothyroxine,
        CompetitorCluster::OralNsaid,
        CompetitorCluster::TopicalAnalgesic,
    ];

    /// The cluster a product competes against
    pub fn for_product(product: Product) -> Self {
        match product {
            Product::Tirosint => CompetitorCluster::Levothyroxine,
            Product::Flector => CompetitorCluster::OralNsaid,
            Product::Licart => CompetitorCluster::TopicalAnalgesic,
        }
    }

    pub fn index(&self) -> usize {
        match self {
            CompetitorCluster::Levothyroxine => 0,
            CompetitorCluster::OralNsaid => 1,
            CompetitorCluster::TopicalAnalgesic => 2,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            CompetitorCluster::Levothyroxine => "levothyroxine",
            CompetitorCluster::OralNsaid => "oral_nsaid",
            CompetitorCluster::TopicalAnalgesic => "topical_analgesic",
        }
    }
}

impl fmt::Display for CompetitorCluster {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

fn default_keywords() -> BTreeMap<CompetitorCluster, Vec<String>> {
    let groups: [(CompetitorCluster, &[&str]); 3] = [
        (CompetitorCluster::Levothyroxine, &["endocrin", "thyroid", "diabet"]),
        (CompetitorCluster::OralNsaid, &["sports", "orthop", "rheumat", "pain"]),
        (
            CompetitorCluster::TopicalAnalgesic,
            &["physical medicine", "rehab", "neurolog", "anesthes"],
        ),
    ];
    groups
        .into_iter()
        .map(|(c, words)| (c, words.iter().map(|w| w.to_string()).collect()))
        .collect()
}

fn default_shares() -> [f64; 3] { DEFAULT_COMPETITOR_SHARES }
fn default_boost() -> f64 { DEFAULT_SPECIALTY_BOOST }

/// Attribution heuristics
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttributionConfig {
    /// Split used when total weight is not positive
    #[serde(default = "default_shares")]
    pub default_shares: [f64; 3],

    /// Multiplier for clusters matching the specialty
    #[serde(default = "default_boost")]
    pub specialty_boost: f64,

    /// Case-insensitive substrings that tie a specialty to a cluster
    #[serde(default = "default_keywords")]
    pub specialty_keywords: BTreeMap<CompetitorCluster, Vec<String>>,
}

impl Default for AttributionConfig {
    fn default() -> Self {
        Self {
            default_shares: DEFAULT_COMPETITOR_SHARES,
            specialty_boost: DEFAULT_SPECIALTY_BOOST,
            specialty_keywords: default_keywords(),
        }
    }
}

impl AttributionConfig {
    pub fn validate(&self) -> Result<()> {
        if self.default_shares.iter().any(|s| !s.is_finite() || *s < 0.0) {
            return Err(EngineError::InvalidConfig(
                "default competitor shares must be non-negative".to_string(),
            ));
        }
        let sum: f64 = self.default_shares.iter().sum();
        if (sum - 1.0).abs() > 1e-9 {
            return Err(EngineError::InvalidConfig(format!(
                "default competitor shares must sum to 1.0, got {sum}"
            )));
        }
        if !(self.specialty_boost.is_finite() && self.specialty_boost > 0.0) {
            return Err(EngineError::InvalidConfig(format!(
                "specialty boost must be positive, got {}",
                self.specialty_boost
            )));
        }
        Ok(())
    }

    /// Which clusters the specialty text matches
    pub fn matched_clusters(&self, specialty: &str) -> [bool; 3] {
        let text = specialty.to_lowercase();
        let mut matched = [false; 3];
        for cluster in CompetitorCluster::ALL {
            matched[cluster.index()] = self
                .specialty_keywords
                .get(&cluster)
                .map(|words| {
                    words
                        .iter()
                        .any(|w| !w.is_empty() && text.contains(&w.to_lowercase()))
                })
                .unwrap_or(false);
        }
        matched
    }
}

/// Competitor volume per cluster for one HCP and channel
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct AttributionRecord {
    volumes: [f64; 3],
}

impl AttributionRecord {
    pub fn get(&self, cluster: CompetitorCluster) -> f64 {
        self.volumes[cluster.index()]
    }

    pub fn iter(&self) -> impl Iterator<Item = (CompetitorCluster, f64)> + '_ {
        CompetitorCluster::ALL.into_iter().map(|c| (c, self.get(c)))
    }

    pub fn total(&self) -> f64 {
        self.volumes.iter().sum()
    }
}

/// Normalized shares from raw product weights, or the configured defaults
/// when no weight is positive. Negative weights count as zero.
pub fn attribution_shares(weights: [f64; 3], cfg: &AttributionConfig) -> [f64; 3] {
    let clean = weights.map(|w| if w.is_finite() { w.max(0.0) } else { 0.0 });
    let total: f64 = clean.iter().sum();
    if total > 0.0 {
        clean.map(|w| w / total)
    } else {
        cfg.default_shares
    }
}

/// Split `competitor_volume` across clusters.
///
/// `weights` are indexed by product order; `specialty` is free text. Shares are
/// boosted and renormalized first, and the volume is applied last, so the
/// parts sum to `competitor_volume` for any finite input.
pub fn attribute(
    competitor_volume: f64,
    weights: [f64; 3],
    specialty: &str,
    cfg: &AttributionConfig,
) -> AttributionRecord {
    let competitor_volume =
        if competitor_volume.is_finite() { competitor_volume.max(0.0) } else { 0.0 };
    let shares = attribution_shares(weights, cfg);
    let matched = cfg.matched_clusters(specialty);

    let mut boosted = [0.0; 3];
    for i in 0..3 {
        boosted[i] = if matched[i] { shares[i] * cfg.specialty_boost } else { shares[i] };
    }

    // Scale by the largest share before summing so a huge boost cannot overflow
    let largest = boosted.iter().copied().fold(0.0, f64::max);
    if !(largest > 0.0 && largest.is_finite()) {
        return AttributionRecord::default();
    }
    let scaled = boosted.map(|b| b / largest);
    let adjusted_total: f64 = scaled.iter().sum();

    AttributionRecord {
        volumes: scaled.map(|b| b / adjusted_total * competitor_volume),
    }
}
