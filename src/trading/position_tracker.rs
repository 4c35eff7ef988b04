// src/trading/position_tracker.rs
// Poll-based position reconciliation against exchange truth

use std::sync::{Arc, Mutex};

use crate::domain::types::{PositionSide, Symbol};
use crate::exchange::client::ExchangeClient;

/// Trades older than this are ignored when attributing realized PnL to a
/// close. The figure is approximate and is reported as such.
const REALIZED_PNL_WINDOW_MS: i64 = 30_000;

/// How many recent account trades to inspect per closed symbol.
const RECENT_TRADES_LIMIT: usize = 5;

/// A locally tracked position. Positive quantity is long, negative short.
#[derive(Debug, Clone)]
pub struct TrackedPosition {
    pub symbol: Symbol,
    pub quantity: f64,
    pub entry_price: f64,
    pub unrealized_pnl: f64,
}

/// Mirrors exchange position state through periodic polling. The exchange is
/// authoritative: anything the exchange no longer reports is treated as
/// closed, whatever the engine believes.
pub struct PositionTracker<C: ExchangeClient> {
    client: Arc<C>,
    positions: Mutex<Vec<TrackedPosition>>,
    last_realized_pnl: Mutex<f64>,
}

impl<C: ExchangeClient> PositionTracker<C> {
    pub fn new(client: Arc<C>) -> Self {
        PositionTracker {
            client,
            positions: Mutex::new(Vec::new()),
            last_realized_pnl: Mutex::new(0.0),
        }
    }

    /// Refresh from the exchange. Returns true when a previously tracked
    /// position has just disappeared, i.e. was closed.
    pub fn sync_with_exchange(&self) -> bool {
        let previous: Vec<Symbol> = self
            .positions
            .lock()
            .unwrap()
            .iter()
            .map(|p| p.symbol)
            .collect();

        let current = self.client.positions();

        let mut closed_any = false;
        let mut realized = 0.0;
        let now_ms = chrono::Utc::now().timestamp_millis();

        for symbol in previous {
            if current.iter().any(|p| p.symbol == symbol) {
                continue;
            }
            closed_any = true;

            let trades = self.client.account_trades(&symbol, RECENT_TRADES_LIMIT);
            let pnl: f64 = trades
                .iter()
                .filter(|t| now_ms - t.trade_time_ms <= REALIZED_PNL_WINDOW_MS)
                .map(|t| t.realized_pnl)
                .sum();
            realized += pnl;

            log::info!(
                "Position closed on exchange: {} (approximate realized PnL ${:.2})",
                symbol,
                pnl
            );
        }

        let tracked: Vec<TrackedPosition> = current
            .iter()
            .map(|p| {
                let magnitude = p.quantity.to_f64().abs();
                let quantity = match p.side {
                    PositionSide::Long => magnitude,
                    PositionSide::Short => -magnitude,
                    // One-way accounts report a signed quantity directly.
                    PositionSide::Both => p.quantity.to_f64(),
                };
                TrackedPosition {
                    symbol: p.symbol,
                    quantity,
                    entry_price: p.entry_price.to_f64(),
                    unrealized_pnl: p.unrealized_profit,
                }
            })
            .collect();

        *self.positions.lock().unwrap() = tracked;

        if closed_any {
            *self.last_realized_pnl.lock().unwrap() = realized;
        }

        closed_any
    }

    pub fn has_open_position(&self) -> bool {
        !self.positions.lock().unwrap().is_empty()
    }

    pub fn position(&self, symbol: &Symbol) -> Option<TrackedPosition> {
        self.positions
            .lock()
            .unwrap()
            .iter()
            .find(|p| p.symbol == *symbol)
            .cloned()
    }

    pub fn positions(&self) -> Vec<TrackedPosition> {
        self.positions.lock().unwrap().clone()
    }

    /// Approximate realized PnL of the most recent close.
    pub fn last_realized_pnl(&self) -> f64 {
        *self.last_realized_pnl.lock().unwrap()
    }
}
