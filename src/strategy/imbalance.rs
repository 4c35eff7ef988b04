// src/strategy/imbalance.rs
// Order book imbalance: depth-weighted bid/ask volume asymmetry

use serde::Deserialize;

use crate::domain::types::PriceLevel;

/// Directional signal strength in [-1, 1]. Positive is bullish.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct SignalStrength(f64);

impl SignalStrength {
    pub fn new(value: f64) -> Self {
        SignalStrength(value.clamp(-1.0, 1.0))
    }

    pub fn value(&self) -> f64 {
        self.0
    }

    pub fn is_bullish(&self) -> bool {
        self.0 > 0.0
    }

    pub fn is_bearish(&self) -> bool {
        self.0 < 0.0
    }

    pub fn is_neutral(&self) -> bool {
        self.0 == 0.0
    }
}

/// Depth-weighted imbalance over the top `levels` levels of each side.
///
/// Weights decay linearly with depth (1.0, then 1 - 1/L, ...), so volume
/// resting near the touch dominates. Returns a ratio in [-1, 1], or 0 when
/// either side is empty or carries no volume.
pub fn weighted_imbalance(bids: &[PriceLevel], asks: &[PriceLevel], levels: usize) -> f64 {
    if bids.is_empty() || asks.is_empty() || levels == 0 {
        return 0.0;
    }

    let n = levels.min(bids.len()).min(asks.len());

    let mut bid_volume = 0.0;
    let mut ask_volume = 0.0;
    for i in 0..n {
        let weight = 1.0 - (i as f64 / levels as f64);
        bid_volume += bids[i].quantity.to_f64() * weight;
        ask_volume += asks[i].quantity.to_f64() * weight;
    }

    let total = bid_volume + ask_volume;
    if total == 0.0 {
        return 0.0;
    }

    (bid_volume - ask_volume) / total
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ObiConfig {
    /// Book levels per side fed into the imbalance ratio.
    pub depth_levels: usize,
    /// Minimum |imbalance| before the signal is non-zero.
    pub imbalance_threshold: f64,
    /// EMA period for noise reduction.
    pub smoothing_period: usize,
}

impl Default for ObiConfig {
    fn default() -> Self {
        ObiConfig {
            depth_levels: 5,
            imbalance_threshold: 0.3,
            smoothing_period: 10,
        }
    }
}

/// Smooths the raw imbalance with an EMA and maps it to a signal strength.
pub struct ImbalanceGenerator {
    config: ObiConfig,
    raw_imbalance: f64,
    smoothed_imbalance: f64,
    sample_count: usize,
}

impl ImbalanceGenerator {
    pub fn new(config: ObiConfig) -> Self {
        ImbalanceGenerator {
            config,
            raw_imbalance: 0.0,
            smoothed_imbalance: 0.0,
            sample_count: 0,
        }
    }

    pub fn update(&mut self, bids: &[PriceLevel], asks: &[PriceLevel]) {
        let raw = weighted_imbalance(bids, asks, self.config.depth_levels);

        if self.sample_count == 0 {
            self.smoothed_imbalance = raw;
        } else {
            let alpha = 2.0 / (self.config.smoothing_period as f64 + 1.0);
            self.smoothed_imbalance = alpha * raw + (1.0 - alpha) * self.smoothed_imbalance;
        }

        self.sample_count += 1;
        self.raw_imbalance = raw;
    }

    /// Signal strength from the smoothed imbalance: zero below the
    /// threshold, then scaled linearly up to full strength at |imb| = 1.
    pub fn signal(&self) -> SignalStrength {
        let magnitude = self.smoothed_imbalance.abs();

        if magnitude < self.config.imbalance_threshold {
            return SignalStrength::new(0.0);
        }

        let strength = ((magnitude - self.config.imbalance_threshold)
            / (1.0 - self.config.imbalance_threshold))
            .clamp(0.0, 1.0);

        if self.smoothed_imbalance > 0.0 {
            SignalStrength::new(strength)
        } else {
            SignalStrength::new(-strength)
        }
    }

    pub fn raw_imbalance(&self) -> f64 {
        self.raw_imbalance
    }

    pub fn smoothed_imbalance(&self) -> f64 {
        self.smoothed_imbalance
    }

    /// True once a full smoothing period of samples has been observed.
    pub fn is_ready(&self) -> bool {
        self.sample_count >= self.config.smoothing_period
    }

    pub fn reset(&mut self) {
        self.raw_imbalance = 0.0;
        self.smoothed_imbalance = 0.0;
        self.sample_count = 0;
    }
}
