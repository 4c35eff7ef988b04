// src/replay.rs
// Market-data replay: recorded depth files and a synthetic generator

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crate::bus::message_bus::MessageBus;
use crate::domain::errors::{MarketDataError, MarketDataResult};
use crate::domain::models::DepthUpdate;
use crate::domain::types::{Price, PriceLevel, Quantity, Symbol};

/// Cap on the pause between two replayed events so a gap in the recording
/// does not stall the feed.
const MAX_INTER_EVENT_WAIT: Duration = Duration::from_secs(1);

#[derive(Debug, Clone, Copy, Default)]
pub struct ReplayStats {
    pub published: u64,
    pub dropped: u64,
    pub parse_errors: u64,
}

/// Replay a JSON-lines recording of depth updates into the bus, pacing by
/// the recorded event times divided by `speed`. Sends a shutdown event when
/// the file ends or the running flag clears.
pub fn replay_file(
    path: &Path,
    bus: &MessageBus,
    speed: f64,
    running: &Arc<AtomicBool>,
) -> MarketDataResult<ReplayStats> {
    if speed <= 0.0 {
        return Err(MarketDataError::Replay(format!(
            "invalid replay speed {}",
            speed
        )));
    }

    let file = File::open(path)
        .map_err(|e| MarketDataError::Replay(format!("cannot open {}: {}", path.display(), e)))?;
    let reader = BufReader::new(file);

    let mut stats = ReplayStats::default();
    let mut previous_time_ms: Option<i64> = None;

    log::info!("Replaying {} at {}x", path.display(), speed);

    for line in reader.lines() {
        if !running.load(Ordering::Acquire) {
            break;
        }

        let line = line.map_err(|e| MarketDataError::Replay(e.to_string()))?;
        if line.trim().is_empty() {
            continue;
        }

        let update: DepthUpdate = match serde_json::from_str(&line) {
            Ok(update) => update,
            Err(e) => {
                stats.parse_errors += 1;
                log::warn!("Skipping malformed depth record: {}", e);
                continue;
            }
        };

        if let Some(previous) = previous_time_ms {
            let gap_ms = (update.event_time_ms - previous).max(0) as f64 / speed;
            let wait = Duration::from_millis(gap_ms as u64).min(MAX_INTER_EVENT_WAIT);
            if !wait.is_zero() {
                std::thread::sleep(wait);
            }
        }
        previous_time_ms = Some(update.event_time_ms);

        if bus.publish_depth(&update) {
            stats.published += 1;
        } else {
            stats.dropped += 1;
        }
    }

    bus.publish_shutdown();
    log::info!(
        "Replay finished: {} published, {} dropped, {} parse errors",
        stats.published,
        stats.dropped,
        stats.parse_errors
    );
    Ok(stats)
}

/// Deterministic depth generator for dry runs. The book drifts on a slow
/// sine wave while resting volume oscillates between bid-heavy and ask-heavy
/// phases, so the full signal pipeline gets exercised in both directions.
pub struct SyntheticDepthGenerator {
    symbol: Symbol,
    tick: u64,
}

impl SyntheticDepthGenerator {
    const LEVELS: usize = 10;
    const BASE_PRICE: f64 = 50_000.0;

    pub fn new(symbol: Symbol) -> Self {
        SyntheticDepthGenerator { symbol, tick: 0 }
    }

    pub fn next_update(&mut self) -> DepthUpdate {
        self.tick += 1;
        let t = self.tick as f64;

        let mid = Self::BASE_PRICE + 25.0 * (t * 0.01).sin();
        // Imbalance phase swings roughly every ~300 ticks.
        let bias = 0.8 * (t * 0.02).sin();
        let bid_qty = 1.0 + bias.max(0.0) * 9.0;
        let ask_qty = 1.0 + (-bias).max(0.0) * 9.0;

        let bids = (0..Self::LEVELS)
            .map(|i| {
                PriceLevel::new(
                    Price::from_f64(mid - 0.5 - i as f64 * 0.5),
                    Quantity::from_f64(bid_qty),
                )
            })
            .collect();
        let asks = (0..Self::LEVELS)
            .map(|i| {
                PriceLevel::new(
                    Price::from_f64(mid + 0.5 + i as f64 * 0.5),
                    Quantity::from_f64(ask_qty),
                )
            })
            .collect();

        DepthUpdate {
            symbol: self.symbol,
            last_update_id: self.tick as i64,
            event_time_ms: self.tick as i64 * 100,
            bids,
            asks,
        }
    }
}

/// Publish `ticks` synthetic depth events into the bus, then shut down.
pub fn synthetic_feed(
    symbol: Symbol,
    ticks: u64,
    bus: &MessageBus,
    running: &Arc<AtomicBool>,
) -> ReplayStats {
    let mut generator = SyntheticDepthGenerator::new(symbol);
    let mut stats = ReplayStats::default();

    for _ in 0..ticks {
        if !running.load(Ordering::Acquire) {
            break;
        }
        let update = generator.next_update();
        if bus.publish_depth(&update) {
            stats.published += 1;
        } else {
            stats.dropped += 1;
            // The consumer is behind; give it a breath instead of spinning.
            std::thread::sleep(Duration::from_millis(1));
        }
    }

    bus.publish_shutdown();
    log::info!(
        "Synthetic feed finished: {} published, {} dropped",
        stats.published,
        stats.dropped
    );
    stats
}
