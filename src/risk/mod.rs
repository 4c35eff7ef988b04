// src/risk/mod.rs
// Pre-trade risk gate with hardcoded limits that configuration cannot relax

use serde::Deserialize;
use std::time::{Duration, Instant};

/// Configurable risk parameters. Percentages are in percent units, so 0.25
/// means 0.25%.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RiskConfig {
    pub max_position_usd: f64,
    pub max_open_positions: u32,
    pub max_orders_per_minute: u32,
    pub min_order_interval_ms: u64,
    pub stop_loss_pct: f64,
    pub take_profit_pct: f64,
    pub max_daily_loss_usd: f64,
    pub maker_fee_pct: f64,
    pub taker_fee_pct: f64,
}

impl Default for RiskConfig {
    fn default() -> Self {
        RiskConfig {
            max_position_usd: 100.0,
            max_open_positions: 1,
            max_orders_per_minute: 2,
            min_order_interval_ms: 30_000,
            stop_loss_pct: 0.25,
            take_profit_pct: 0.50,
            max_daily_loss_usd: 50.0,
            maker_fee_pct: 0.02,
            taker_fee_pct: 0.05,
        }
    }
}

/// Floors and ceilings applied at construction. These bound the damage a bad
/// config file or a bug upstream can do and cannot be overridden.
pub mod limits {
    pub const MIN_STOP_LOSS_PCT: f64 = 0.20;
    pub const MAX_POSITION_USD: f64 = 500.0;
    pub const MIN_ORDER_INTERVAL_MS: u64 = 10_000;
    pub const MAX_DAILY_TRADES: u32 = 20;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TradeDecision {
    Approved,
    RejectedPositionLimit,
    RejectedDailyLoss,
    RejectedCooldown,
    RejectedMaxTrades,
}

/// Outcome of a pre-trade check. On approval the bracket prices and the
/// position size in quote currency are filled in.
#[derive(Debug, Clone)]
pub struct TradeCheck {
    pub decision: TradeDecision,
    pub position_size_usd: f64,
    pub stop_loss_price: f64,
    pub take_profit_price: f64,
    pub reason: String,
}

impl TradeCheck {
    fn rejected(decision: TradeDecision, reason: String) -> Self {
        TradeCheck {
            decision,
            position_size_usd: 0.0,
            stop_loss_price: 0.0,
            take_profit_price: 0.0,
            reason,
        }
    }

    pub fn is_approved(&self) -> bool {
        self.decision == TradeDecision::Approved
    }
}

pub struct RiskManager {
    config: RiskConfig,
    open_positions: u32,
    daily_trades: u32,
    daily_pnl: f64,
    last_order_time: Option<Instant>,
}

impl RiskManager {
    pub fn new(config: RiskConfig) -> Self {
        RiskManager {
            config: apply_hard_limits(config),
            open_positions: 0,
            daily_trades: 0,
            daily_pnl: 0.0,
            last_order_time: None,
        }
    }

    pub fn can_trade(&self, entry_price: f64, is_long: bool) -> TradeCheck {
        self.can_trade_at(Instant::now(), entry_price, is_long)
    }

    /// Pre-trade check against an explicit clock reading. Gates run in a
    /// fixed order so the first violated limit is the one reported.
    pub fn can_trade_at(&self, now: Instant, entry_price: f64, is_long: bool) -> TradeCheck {
        if self.daily_pnl <= -self.config.max_daily_loss_usd {
            return TradeCheck::rejected(
                TradeDecision::RejectedDailyLoss,
                format!("Daily loss limit reached: ${:.2}", -self.daily_pnl),
            );
        }

        if self.daily_trades >= limits::MAX_DAILY_TRADES {
            return TradeCheck::rejected(
                TradeDecision::RejectedMaxTrades,
                format!("Max daily trades reached: {}", self.daily_trades),
            );
        }

        if self.open_positions >= self.config.max_open_positions {
            return TradeCheck::rejected(
                TradeDecision::RejectedPositionLimit,
                format!("Max open positions: {}", self.open_positions),
            );
        }

        if let Some(last) = self.last_order_time {
            let cooldown = Duration::from_millis(self.config.min_order_interval_ms);
            let elapsed = now.duration_since(last);
            if elapsed < cooldown {
                let remaining = (cooldown - elapsed).as_secs();
                return TradeCheck::rejected(
                    TradeDecision::RejectedCooldown,
                    format!("Cooldown active: {}s remaining", remaining),
                );
            }
        }

        let sl_offset = entry_price * (self.config.stop_loss_pct / 100.0);
        let tp_offset = entry_price * (self.config.take_profit_pct / 100.0);

        let (stop_loss_price, take_profit_price) = if is_long {
            (entry_price - sl_offset, entry_price + tp_offset)
        } else {
            (entry_price + sl_offset, entry_price - tp_offset)
        };

        TradeCheck {
            decision: TradeDecision::Approved,
            position_size_usd: self.config.max_position_usd,
            stop_loss_price,
            take_profit_price,
            reason: String::new(),
        }
    }

    pub fn on_order_placed(&mut self) {
        self.last_order_time = Some(Instant::now());
        self.open_positions += 1;
        self.daily_trades += 1;
    }

    pub fn on_position_closed(&mut self, pnl: f64) {
        self.open_positions = self.open_positions.saturating_sub(1);
        self.daily_pnl += pnl;
    }

    /// Called at the UTC day boundary.
    pub fn reset_daily_stats(&mut self) {
        self.daily_pnl = 0.0;
        self.daily_trades = 0;
    }

    /// Expected round-trip commission for a position of the given notional.
    pub fn expected_fees(&self, position_usd: f64, is_taker: bool) -> f64 {
        let fee_rate = if is_taker {
            self.config.taker_fee_pct
        } else {
            self.config.maker_fee_pct
        };
        position_usd * (fee_rate / 100.0) * 2.0
    }

    pub fn daily_pnl(&self) -> f64 {
        self.daily_pnl
    }

    pub fn daily_trades(&self) -> u32 {
        self.daily_trades
    }

    pub fn open_positions(&self) -> u32 {
        self.open_positions
    }

    pub fn config(&self) -> &RiskConfig {
        &self.config
    }
}

fn apply_hard_limits(mut config: RiskConfig) -> RiskConfig {
    config.stop_loss_pct = config.stop_loss_pct.max(limits::MIN_STOP_LOSS_PCT);
    config.max_position_usd = config.max_position_usd.min(limits::MAX_POSITION_USD);
    config.min_order_interval_ms = config
        .min_order_interval_ms
        .max(limits::MIN_ORDER_INTERVAL_MS);
    config
}
