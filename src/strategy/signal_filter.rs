// src/strategy/signal_filter.rs
// Multi-stage filter turning raw imbalance readings into rare, qualified
// entry signals

use serde::Deserialize;
use std::time::Instant;

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SignalFilterConfig {
    /// Minimum |imbalance| to consider at all.
    pub imbalance_threshold: f64,
    /// Above this, confirmation is shortened to `high_conviction_ticks`.
    pub high_conviction_threshold: f64,
    /// Consecutive qualifying ticks required at the normal threshold.
    pub confirmation_ticks: u32,
    /// Consecutive qualifying ticks required at high conviction.
    pub high_conviction_ticks: u32,
    /// Minimum seconds between qualified signals in the same direction.
    pub cooldown_seconds: u64,
    /// Maximum acceptable spread as a percentage of mid.
    pub max_spread_pct: f64,
}

impl Default for SignalFilterConfig {
    fn default() -> Self {
        SignalFilterConfig {
            imbalance_threshold: 0.6,
            high_conviction_threshold: 0.7,
            confirmation_ticks: 3,
            high_conviction_ticks: 1,
            cooldown_seconds: 30,
            max_spread_pct: 0.05,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignalDirection {
    None,
    Buy,
    Sell,
}

/// Output of one filter pass. `direction` is None unless every gate passed.
#[derive(Debug, Clone, Copy)]
pub struct FilteredSignal {
    pub direction: SignalDirection,
    pub imbalance: f64,
    pub confidence: f64,
    pub high_conviction: bool,
}

impl Default for FilteredSignal {
    fn default() -> Self {
        FilteredSignal {
            direction: SignalDirection::None,
            imbalance: 0.0,
            confidence: 0.0,
            high_conviction: false,
        }
    }
}

/// Per-stage rejection counters, printed with the engine stats.
#[derive(Debug, Clone, Copy, Default)]
pub struct FilterStats {
    pub raw_ticks: u64,
    pub spread_rejected: u64,
    pub threshold_rejected: u64,
    pub confirmation_rejected: u64,
    pub cooldown_rejected: u64,
    pub qualified: u64,
}

pub struct SignalFilter {
    config: SignalFilterConfig,
    last_direction: SignalDirection,
    consecutive_ticks: u32,
    last_buy_time: Option<Instant>,
    last_sell_time: Option<Instant>,
    stats: FilterStats,
}

impl SignalFilter {
    pub fn new(config: SignalFilterConfig) -> Self {
        SignalFilter {
            config,
            last_direction: SignalDirection::None,
            consecutive_ticks: 0,
            last_buy_time: None,
            last_sell_time: None,
            stats: FilterStats::default(),
        }
    }

    pub fn filter(&mut self, imbalance: f64, spread_pct: f64, bid: f64, ask: f64) -> FilteredSignal {
        self.filter_at(Instant::now(), imbalance, spread_pct, bid, ask)
    }

    /// Filter pass against an explicit clock reading. The clock must be
    /// monotonic; cooldown windows are measured on it.
    pub fn filter_at(
        &mut self,
        now: Instant,
        imbalance: f64,
        spread_pct: f64,
        bid: f64,
        ask: f64,
    ) -> FilteredSignal {
        self.stats.raw_ticks += 1;
        let result = FilteredSignal::default();

        // A direction flip restarts confirmation from scratch.
        let direction = direction_of(imbalance);
        if direction != self.last_direction {
            self.consecutive_ticks = 0;
            self.last_direction = direction;
        }

        // Gate 1: spread. A wide market eats the edge before the TP is hit.
        if spread_pct > self.config.max_spread_pct {
            self.stats.spread_rejected += 1;
            self.consecutive_ticks = 0;
            return result;
        }

        let magnitude = imbalance.abs();

        // Gate 2: magnitude threshold.
        if magnitude < self.config.imbalance_threshold {
            self.stats.threshold_rejected += 1;
            self.consecutive_ticks = 0;
            return result;
        }

        self.consecutive_ticks += 1;

        // Gate 3: confirmation, shortened when conviction is high.
        let high_conviction = magnitude >= self.config.high_conviction_threshold;
        let required_ticks = if high_conviction {
            self.config.high_conviction_ticks
        } else {
            self.config.confirmation_ticks
        };

        if self.consecutive_ticks < required_ticks {
            self.stats.confirmation_rejected += 1;
            return result;
        }

        // Gate 4: directional cooldown. The streak is kept so a signal can
        // fire as soon as the window expires.
        let cooldown = std::time::Duration::from_secs(self.config.cooldown_seconds);
        let last_same_direction = match direction {
            SignalDirection::Buy => self.last_buy_time,
            SignalDirection::Sell => self.last_sell_time,
            SignalDirection::None => None,
        };
        if let Some(last) = last_same_direction {
            if now.duration_since(last) < cooldown {
                self.stats.cooldown_rejected += 1;
                return result;
            }
        }

        self.stats.qualified += 1;
        log::debug!(
            "Qualified {:?} signal: imbalance {:.3}, spread {:.4}%, bid {:.2}, ask {:.2}",
            direction,
            imbalance,
            spread_pct,
            bid,
            ask
        );

        match direction {
            SignalDirection::Buy => self.last_buy_time = Some(now),
            SignalDirection::Sell => self.last_sell_time = Some(now),
            SignalDirection::None => {}
        }
        self.consecutive_ticks = 0;

        FilteredSignal {
            direction,
            imbalance,
            confidence: self.confidence(magnitude),
            high_conviction,
        }
    }

    pub fn stats(&self) -> &FilterStats {
        &self.stats
    }

    pub fn reset_stats(&mut self) {
        self.stats = FilterStats::default();
    }

    /// Map |imbalance| in [threshold, 1] linearly onto [0.5, 1.0].
    fn confidence(&self, magnitude: f64) -> f64 {
        let normalized = (magnitude - self.config.imbalance_threshold)
            / (1.0 - self.config.imbalance_threshold);
        (0.5 + normalized * 0.5).clamp(0.5, 1.0)
    }
}

fn direction_of(imbalance: f64) -> SignalDirection {
    if imbalance > 0.0 {
        SignalDirection::Buy
    } else if imbalance < 0.0 {
        SignalDirection::Sell
    } else {
        SignalDirection::None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn test_config() -> SignalFilterConfig {
        SignalFilterConfig {
            imbalance_threshold: 0.6,
            high_conviction_threshold: 0.7,
            confirmation_ticks: 3,
            high_conviction_ticks: 1,
            cooldown_seconds: 30,
            max_spread_pct: 1.0,
        }
    }

    fn feed(filter: &mut SignalFilter, at: Instant, imbalance: f64) -> FilteredSignal {
        filter.filter_at(at, imbalance, 0.01, 100.0, 100.05)
    }

    #[test]
    fn requires_consecutive_confirmation() {
        let mut filter = SignalFilter::new(test_config());
        let t0 = Instant::now();

        assert_eq!(feed(&mut filter, t0, 0.65).direction, SignalDirection::None);
        assert_eq!(feed(&mut filter, t0, 0.65).direction, SignalDirection::None);

        let third = feed(&mut filter, t0, 0.65);
        assert_eq!(third.direction, SignalDirection::Buy);
        assert!(!third.high_conviction);
        assert!((third.confidence - 0.5625).abs() < 1e-12);
    }

    #[test]
    fn cooldown_blocks_then_releases() {
        let mut filter = SignalFilter::new(test_config());
        let t0 = Instant::now();

        for _ in 0..3 {
            feed(&mut filter, t0, 0.65);
        }
        // The streak above produced a Buy; ten seconds in, a fresh streak
        // runs into the cooldown on its confirming tick.
        let t10 = t0 + Duration::from_secs(10);
        let blocked: Vec<_> = (0..3).map(|_| feed(&mut filter, t10, 0.65).direction).collect();
        assert!(blocked.iter().all(|d| *d == SignalDirection::None));
        assert!(filter.stats().cooldown_rejected > 0);

        // After the window expires, the same pressure qualifies again.
        let t31 = t0 + Duration::from_secs(31);
        let fired: Vec<_> = (0..3).map(|_| feed(&mut filter, t31, 0.65).direction).collect();
        assert_eq!(
            fired.iter().filter(|d| **d == SignalDirection::Buy).count(),
            1
        );
    }

    #[test]
    fn opposite_direction_has_its_own_cooldown() {
        let mut filter = SignalFilter::new(test_config());
        let t0 = Instant::now();

        for _ in 0..3 {
            feed(&mut filter, t0, 0.65);
        }

        // A sell streak right afterwards is not blocked by the buy cooldown.
        let t1 = t0 + Duration::from_secs(1);
        let mut last = FilteredSignal::default();
        for _ in 0..3 {
            last = feed(&mut filter, t1, -0.65);
        }
        assert_eq!(last.direction, SignalDirection::Sell);
    }

    #[test]
    fn high_conviction_enters_on_first_tick() {
        let mut filter = SignalFilter::new(test_config());
        let signal = feed(&mut filter, Instant::now(), 0.75);
        assert_eq!(signal.direction, SignalDirection::Buy);
        assert!(signal.high_conviction);
    }

    #[test]
    fn wide_spread_rejects_and_resets_the_streak() {
        let mut filter = SignalFilter::new(SignalFilterConfig {
            max_spread_pct: 0.05,
            ..test_config()
        });
        let t0 = Instant::now();

        filter.filter_at(t0, 0.65, 0.01, 100.0, 100.05);
        filter.filter_at(t0, 0.65, 0.01, 100.0, 100.05);
        // Wide spread on what would have been the confirming tick.
        let wide = filter.filter_at(t0, 0.65, 0.2, 100.0, 100.2);
        assert_eq!(wide.direction, SignalDirection::None);

        // Streak was reset, so the next tick starts over.
        let next = filter.filter_at(t0, 0.65, 0.01, 100.0, 100.05);
        assert_eq!(next.direction, SignalDirection::None);
        assert_eq!(filter.stats().spread_rejected, 1);
    }

    #[test]
    fn direction_flip_restarts_confirmation() {
        let mut filter = SignalFilter::new(test_config());
        let t0 = Instant::now();

        feed(&mut filter, t0, 0.65);
        feed(&mut filter, t0, 0.65);
        feed(&mut filter, t0, -0.65); // flip
        feed(&mut filter, t0, 0.65); // flip back, streak restarts at 1
        let signal = feed(&mut filter, t0, 0.65);
        assert_eq!(signal.direction, SignalDirection::None);
    }

    #[test]
    fn same_direction_signals_respect_the_cooldown_invariant() {
        let mut filter = SignalFilter::new(test_config());
        let t0 = Instant::now();

        let mut qualified_at = Vec::new();
        for second in 0..120u64 {
            let now = t0 + Duration::from_secs(second);
            if feed(&mut filter, now, 0.65).direction == SignalDirection::Buy {
                qualified_at.push(second);
            }
        }

        assert!(qualified_at.len() >= 2);
        for pair in qualified_at.windows(2) {
            assert!(pair[1] - pair[0] >= 30);
        }
    }

    #[test]
    fn below_threshold_is_counted_and_rejected() {
        let mut filter = SignalFilter::new(test_config());
        let t0 = Instant::now();
        for _ in 0..5 {
            assert_eq!(feed(&mut filter, t0, 0.3).direction, SignalDirection::None);
        }
        assert_eq!(filter.stats().threshold_rejected, 5);
        assert_eq!(filter.stats().raw_ticks, 5);
        assert_eq!(filter.stats().qualified, 0);
    }
}
