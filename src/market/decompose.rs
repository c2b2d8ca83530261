//! Market-share inversion: own volume + share % → total market and competitor volume

use log::warn;
use serde::Serialize;

/// Reconstructed market for one HCP on one channel
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct MarketShareSnapshot {
    pub ibsa_volume: f64,
    /// Raw `volume / share`; below `ibsa_volume` when the share is inconsistent
    pub implied_market_volume: f64,
    pub total_market_volume: f64,
    pub competitor_volume: f64,
}

/// Invert a market-share percentage.
///
/// With a positive share, total = volume / (share / 100). With no usable
/// share (zero, negative, missing, NaN) the observed volume is taken as the
/// whole market. Competitor volume is clipped at zero, which absorbs share
/// figures that imply a market smaller than the observed volume. The raw
/// inversion is kept as `implied_market_volume`; `total_market_volume` never
/// drops below the observed volume. An inversion that overflows carries no
/// usable signal and falls back to the observed volume.
pub fn decompose(ibsa_volume: f64, share_pct: Option<f64>) -> MarketShareSnapshot {
    let ibsa_volume = if ibsa_volume.is_finite() { ibsa_volume.max(0.0) } else { 0.0 };

    let implied_market_volume = match share_pct {
        Some(pct) if pct > 0.0 && pct.is_finite() => {
            let implied = ibsa_volume / (pct / 100.0);
            if implied.is_finite() {
                implied
            } else {
                warn!("Share {pct}% on volume {ibsa_volume} overflows; using observed volume");
                ibsa_volume
            }
        }
        _ => ibsa_volume,
    };

    let competitor_volume = (implied_market_volume - ibsa_volume).max(0.0);

    MarketShareSnapshot {
        ibsa_volume,
        implied_market_volume,
        total_market_volume: ibsa_volume + competitor_volume,
        competitor_volume,
    }
}
