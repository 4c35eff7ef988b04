// src/engine/trading_engine.rs
// Wires the market-data bus to strategy, risk and execution

use chrono::{NaiveDate, Utc};
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::bus::events::{DepthEvent, TimerEvent};
use crate::bus::message_bus::{EventRing, MessageBus};
use crate::config::AppConfig;
use crate::domain::errors::{AppError, AppResult, ExchangeError};
use crate::domain::types::{Price, Quantity, Side, Symbol};
use crate::engine::event_loop::{
    EventHandler, EventLoop, TIMER_HEARTBEAT, TIMER_POSITION_SYNC, TIMER_STATS,
};
use crate::exchange::client::ExchangeClient;
use crate::market::order_book::{OrderBook, OrderBookConfig};
use crate::risk::RiskManager;
use crate::strategy::imbalance::ImbalanceGenerator;
use crate::strategy::signal_filter::{FilteredSignal, SignalDirection, SignalFilter};
use crate::trading::order_manager::OrderManager;
use crate::trading::position_tracker::PositionTracker;

/// Orders below this notional are bumped up to the exchange minimum.
const MIN_ORDER_NOTIONAL_USD: f64 = 5.0;

/// Absolute ceiling on a single order's notional. A computed size above this
/// means something upstream is broken; the order is refused outright.
const MAX_ORDER_NOTIONAL_USD: f64 = 600.0;

const STATS_INTERVAL: Duration = Duration::from_secs(5);
const POSITION_SYNC_INTERVAL: Duration = Duration::from_secs(2);
const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(300);

/// Seconds to wait for the stream connection at startup.
const CONNECT_TIMEOUT_TICKS: u32 = 50;

#[derive(Debug, Clone, Copy, Default)]
pub struct EngineStats {
    pub total_updates: u64,
    pub buy_signals: u64,
    pub sell_signals: u64,
    pub qualified_buys: u64,
    pub qualified_sells: u64,
    pub approved_trades: u64,
    pub rejected_trades: u64,
    pub emergency_closes: u64,
    pub avg_latency_us: f64,
}

pub struct TradingEngine<C: ExchangeClient> {
    config: AppConfig,
    symbol: Symbol,
    client: Arc<C>,
    ring: Arc<EventRing>,
    bus: Arc<MessageBus>,
    order_book: OrderBook,
    obi: ImbalanceGenerator,
    filter: SignalFilter,
    risk: RiskManager,
    order_manager: OrderManager<C>,
    position_tracker: PositionTracker<C>,
    running: Arc<AtomicBool>,
    stats: EngineStats,
    last_imbalance: f64,
    current_day: NaiveDate,
}

impl<C: ExchangeClient + 'static> TradingEngine<C> {
    pub fn new(config: AppConfig, client: Arc<C>) -> Self {
        let symbol = Symbol::new(config.trading.primary_symbol());
        let ring = Arc::new(EventRing::new());
        let bus = Arc::new(MessageBus::new(ring.clone()));

        TradingEngine {
            symbol,
            ring,
            bus,
            order_book: OrderBook::new(OrderBookConfig::default()),
            obi: ImbalanceGenerator::new(config.obi.clone()),
            filter: SignalFilter::new(config.filter.clone()),
            risk: RiskManager::new(config.risk.clone()),
            order_manager: OrderManager::new(client.clone()),
            position_tracker: PositionTracker::new(client.clone()),
            client,
            running: Arc::new(AtomicBool::new(true)),
            stats: EngineStats::default(),
            last_imbalance: 0.0,
            current_day: Utc::now().date_naive(),
            config,
        }
    }

    /// Producer-side bus handle, shared with the stream callback and with
    /// replay feeds.
    pub fn bus(&self) -> Arc<MessageBus> {
        self.bus.clone()
    }

    /// Flag cleared by signal handlers to request an orderly stop.
    pub fn running_flag(&self) -> Arc<AtomicBool> {
        self.running.clone()
    }

    pub fn stats(&self) -> EngineStats {
        self.stats
    }

    /// Probe the REST side, start the stream client and subscribe the depth
    /// callback that feeds the bus.
    pub fn start(&mut self) -> AppResult<()> {
        log::info!(
            "Starting engine: symbol {} | depth levels {} | imbalance threshold {:.2}",
            self.symbol,
            self.config.obi.depth_levels,
            self.config.obi.imbalance_threshold
        );

        let account = self.client.account_info().ok_or_else(|| {
            AppError::Exchange(ExchangeError::Connection(
                "account probe failed, check API credentials".to_string(),
            ))
        })?;
        log::info!("Connected. Available balance: ${:.2}", account.available_balance);

        self.client.on_error(Box::new(|message| {
            log::error!("Exchange error: {}", message);
        }));

        let leverage = self.config.exchange.default_leverage;
        if leverage > 0 && !self.client.set_leverage(&self.symbol, leverage) {
            log::warn!("Failed to set leverage {}x for {}", leverage, self.symbol);
        }

        self.client.start();

        let mut ticks = 0;
        while !self.client.is_connected() && ticks < CONNECT_TIMEOUT_TICKS {
            std::thread::sleep(Duration::from_millis(100));
            ticks += 1;
        }
        if !self.client.is_connected() {
            return Err(AppError::Exchange(ExchangeError::Connection(
                "stream connection timed out".to_string(),
            )));
        }

        let bus = self.bus.clone();
        self.client.subscribe_depth(
            &self.symbol,
            Box::new(move |update| {
                bus.publish_depth(update);
            }),
        );
        log::info!("Subscribed to {} depth stream", self.symbol);

        Ok(())
    }

    /// Run the event loop on the calling thread until stopped.
    pub fn run(&mut self) {
        let mut event_loop = EventLoop::new(self.ring.clone(), self.running.clone());
        event_loop.add_timer(TIMER_STATS, STATS_INTERVAL);
        event_loop.add_timer(TIMER_POSITION_SYNC, POSITION_SYNC_INTERVAL);
        event_loop.add_timer(TIMER_HEARTBEAT, HEARTBEAT_INTERVAL);
        event_loop.run(self);
    }

    /// Stop the stream client and print the final statistics block.
    pub fn stop(&mut self) {
        log::info!("Stopping engine");
        self.running
            .store(false, std::sync::atomic::Ordering::Release);
        self.client.stop();
        self.print_final_stats();
    }

    fn execute_signal(&mut self, signal: &FilteredSignal, bid: f64, ask: f64) {
        let is_long = signal.direction == SignalDirection::Buy;

        // Cross the spread: pay the ask to buy, hit the bid to sell.
        let price = if is_long { ask } else { bid };
        if price <= 0.0 {
            return;
        }

        if is_long {
            self.stats.qualified_buys += 1;
        } else {
            self.stats.qualified_sells += 1;
        }

        let check = self.risk.can_trade(price, is_long);
        if !check.is_approved() {
            self.stats.rejected_trades += 1;
            log::warn!("Trade rejected: {}", check.reason);
            return;
        }
        self.stats.approved_trades += 1;

        let Some(quantity) = self.size_order(check.position_size_usd, price) else {
            return;
        };

        if !self.config.trading.enabled {
            log::info!(
                "Trading disabled; would have placed {} {} {} at ~{:.2} (confidence {:.2})",
                if is_long { "BUY" } else { "SELL" },
                quantity,
                self.symbol,
                price,
                signal.confidence
            );
            return;
        }

        let side = if is_long { Side::Buy } else { Side::Sell };
        log::info!(
            "Executing {} {} {} at ~{:.2} | SL {:.2} TP {:.2} | confidence {:.2}{}",
            side,
            quantity,
            self.symbol,
            price,
            check.stop_loss_price,
            check.take_profit_price,
            signal.confidence,
            if signal.high_conviction { " | high conviction" } else { "" }
        );

        let result = self.order_manager.place_bracket_order(
            self.symbol,
            side,
            quantity,
            Price::from_f64(check.stop_loss_price),
            Price::from_f64(check.take_profit_price),
        );

        let Some(entry) = result.entry_order.as_ref() else {
            log::error!("Entry order failed: {}", self.client.last_error());
            return;
        };
        self.risk.on_order_placed();

        // A filled entry without both protective legs is the worst state the
        // engine can be in. Flatten it immediately.
        if result.is_unprotected() {
            self.stats.emergency_closes += 1;
            log::error!(
                "CRITICAL: bracket leg missing for {} (SL {}, TP {}), force-closing entry",
                self.symbol,
                result.stop_loss_order.is_some(),
                result.take_profit_order.is_some()
            );

            let closed = self.order_manager.place_reduce_only_market(
                self.symbol,
                side.opposite(),
                entry.executed_qty,
            );
            match closed {
                Some(order) => log::warn!("Emergency close placed: order {}", order.order_id),
                None => log::error!(
                    "CRITICAL: emergency close FAILED, manual intervention required: {}",
                    self.client.last_error()
                ),
            }
        }
    }

    /// Convert an approved notional into an order quantity on the exchange's
    /// step grid. Returns None when the sized order violates the notional
    /// guard rails.
    fn size_order(&self, notional_usd: f64, price: f64) -> Option<Quantity> {
        let step = qty_step_for_price(price);
        let mut qty = (notional_usd / price / step).floor() * step;

        if qty * price < MIN_ORDER_NOTIONAL_USD {
            qty = (MIN_ORDER_NOTIONAL_USD / price / step).ceil() * step;
        }

        let notional = qty * price;
        if notional > MAX_ORDER_NOTIONAL_USD {
            log::error!(
                "Safety guard: sized notional ${:.2} exceeds ${:.0} ceiling, refusing order",
                notional,
                MAX_ORDER_NOTIONAL_USD
            );
            return None;
        }
        if qty <= 0.0 {
            return None;
        }

        Some(Quantity::from_f64(qty))
    }

    fn sync_positions(&mut self) {
        // Poll only while local state suggests exposure; an idle engine
        // should not hammer the REST API.
        if self.risk.open_positions() == 0 && !self.position_tracker.has_open_position() {
            return;
        }

        if self.position_tracker.sync_with_exchange() {
            let pnl = self.position_tracker.last_realized_pnl();
            self.risk.on_position_closed(pnl);
            log::info!(
                "Position closed (sync). Approximate PnL ${:.2}, daily ${:.2}",
                pnl,
                self.risk.daily_pnl()
            );
        }
    }

    fn check_day_rollover(&mut self) {
        let today = Utc::now().date_naive();
        if today != self.current_day {
            self.current_day = today;
            self.risk.reset_daily_stats();
            log::info!("UTC day rollover, daily risk counters reset");
        }
    }

    fn print_stats(&self) {
        let (Some(bid), Some(ask)) = (self.order_book.best_bid(), self.order_book.best_ask())
        else {
            log::info!("Waiting for depth data...");
            return;
        };

        log::info!(
            "{} | bid {:.2} ask {:.2} | imb {:+.3} | updates {} | lat {:.0}us | dropped {}",
            self.symbol,
            bid.price.to_f64(),
            ask.price.to_f64(),
            self.last_imbalance,
            self.stats.total_updates,
            self.stats.avg_latency_us,
            self.bus.events_dropped()
        );
    }

    fn heartbeat(&self) {
        log::info!(
            "Heartbeat: connected={} published={} dropped={} drop_rate={:.4}% daily_pnl=${:.2} open_positions={}",
            self.client.is_connected(),
            self.bus.events_published(),
            self.bus.events_dropped(),
            self.bus.drop_rate() * 100.0,
            self.risk.daily_pnl(),
            self.risk.open_positions()
        );
    }

    fn print_final_stats(&self) {
        let stats = &self.stats;
        let filter_stats = self.filter.stats();
        let raw_total = stats.buy_signals + stats.sell_signals;
        let qualified_total = stats.qualified_buys + stats.qualified_sells;
        let filter_rate = if raw_total > 0 {
            (1.0 - qualified_total as f64 / raw_total as f64) * 100.0
        } else {
            0.0
        };

        log::info!("=== Final Statistics ===");
        log::info!("Depth updates:     {}", stats.total_updates);
        log::info!(
            "Raw signals:       {} ({} buy / {} sell)",
            raw_total,
            stats.buy_signals,
            stats.sell_signals
        );
        log::info!(
            "Qualified:         {} ({} buy / {} sell)",
            qualified_total,
            stats.qualified_buys,
            stats.qualified_sells
        );
        log::info!(
            "Filter rejections: spread {} threshold {} confirmation {} cooldown {}",
            filter_stats.spread_rejected,
            filter_stats.threshold_rejected,
            filter_stats.confirmation_rejected,
            filter_stats.cooldown_rejected
        );
        log::info!(
            "Risk decisions:    {} approved / {} rejected",
            stats.approved_trades,
            stats.rejected_trades
        );
        log::info!("Emergency closes:  {}", stats.emergency_closes);
        log::info!("Filter rate:       {:.1}% filtered out", filter_rate);
        log::info!(
            "Bus counters:      {} published / {} dropped",
            self.bus.events_published(),
            self.bus.events_dropped()
        );
        log::info!("Avg latency:       {:.0} us", stats.avg_latency_us);
    }
}

impl<C: ExchangeClient + 'static> EventHandler for TradingEngine<C> {
    fn on_depth(&mut self, event: &DepthEvent) {
        let start = Instant::now();

        // Auxiliary symbols are not routed here.
        if event.symbol != self.symbol {
            return;
        }

        // Each stream event carries the current top levels, so the book is
        // rebuilt per event rather than merged. See DESIGN.md before
        // changing this to delta-merge semantics.
        self.order_book.clear();
        for level in event.bids() {
            self.order_book
                .update_bid(Price::from_raw(level.price_raw), Quantity::from_raw(level.qty_raw));
        }
        for level in event.asks() {
            self.order_book
                .update_ask(Price::from_raw(level.price_raw), Quantity::from_raw(level.qty_raw));
        }
        self.order_book.set_last_update_id(event.sequence);

        let depth_levels = self.config.obi.depth_levels;
        let bids = self.order_book.bids(depth_levels);
        let asks = self.order_book.asks(depth_levels);
        self.obi.update(bids, asks);

        self.stats.total_updates += 1;

        if self.obi.is_ready() {
            let imbalance = self.obi.smoothed_imbalance();
            let spread_pct = self.order_book.spread_pct();
            let bid = self
                .order_book
                .best_bid()
                .map(|l| l.price.to_f64())
                .unwrap_or(0.0);
            let ask = self
                .order_book
                .best_ask()
                .map(|l| l.price.to_f64())
                .unwrap_or(0.0);

            if imbalance.abs() > self.config.obi.imbalance_threshold {
                if imbalance > 0.0 {
                    self.stats.buy_signals += 1;
                } else {
                    self.stats.sell_signals += 1;
                }
            }

            let filtered = self.filter.filter(imbalance, spread_pct, bid, ask);
            if filtered.direction != SignalDirection::None {
                self.execute_signal(&filtered, bid, ask);
            }

            self.last_imbalance = imbalance;
        }

        let latency_us = start.elapsed().as_micros() as f64;
        self.stats.avg_latency_us = self.stats.avg_latency_us * 0.99 + latency_us * 0.01;
    }

    fn on_timer(&mut self, event: TimerEvent) {
        match event.timer_id {
            TIMER_STATS => {
                self.check_day_rollover();
                self.print_stats();
            }
            TIMER_POSITION_SYNC => self.sync_positions(),
            TIMER_HEARTBEAT => self.heartbeat(),
            other => log::warn!("Unknown timer id {}", other),
        }
    }
}

/// Exchange quantity grid, coarser for cheaper assets.
fn qty_step_for_price(price: f64) -> f64 {
    if price >= 10_000.0 {
        0.001
    } else if price >= 100.0 {
        0.01
    } else if price >= 1.0 {
        0.1
    } else {
        1.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bus::events::DepthEvent;
    use crate::domain::models::DepthUpdate;
    use crate::domain::types::{OrderType, PriceLevel};
    use crate::exchange::mock::MockExchangeClient;

    /// Config tuned so a single lopsided depth event produces a qualified
    /// signal: one-sample smoothing, one confirmation tick, no spread gate.
    fn hair_trigger_config() -> AppConfig {
        let mut config = AppConfig::default();
        config.trading.enabled = true;
        config.obi.depth_levels = 5;
        config.obi.smoothing_period = 1;
        config.obi.imbalance_threshold = 0.3;
        config.filter.imbalance_threshold = 0.5;
        config.filter.high_conviction_threshold = 0.9;
        config.filter.confirmation_ticks = 1;
        config.filter.max_spread_pct = 5.0;
        config
    }

    fn lopsided_event(bid_qty: f64, ask_qty: f64) -> DepthEvent {
        let update = DepthUpdate {
            symbol: Symbol::new("BTCUSDT"),
            last_update_id: 1,
            event_time_ms: 0,
            bids: (0..5)
                .map(|i| {
                    PriceLevel::new(
                        Price::from_f64(50_000.0 - i as f64),
                        Quantity::from_f64(bid_qty),
                    )
                })
                .collect(),
            asks: (0..5)
                .map(|i| {
                    PriceLevel::new(
                        Price::from_f64(50_001.0 + i as f64),
                        Quantity::from_f64(ask_qty),
                    )
                })
                .collect(),
        };
        DepthEvent::from_update(&update)
    }

    #[test]
    fn lopsided_book_places_a_full_bracket() {
        let client = Arc::new(MockExchangeClient::new());
        let mut engine = TradingEngine::new(hair_trigger_config(), client.clone());

        engine.on_depth(&lopsided_event(10.0, 1.0));

        let placed = client.placed_orders();
        assert_eq!(placed.len(), 3);
        assert_eq!(placed[0].order_type, OrderType::Market);
        assert_eq!(placed[0].side, Side::Buy);
        assert_eq!(placed[1].order_type, OrderType::StopMarket);
        assert_eq!(placed[2].order_type, OrderType::TakeProfitMarket);

        let stats = engine.stats();
        assert_eq!(stats.qualified_buys, 1);
        assert_eq!(stats.approved_trades, 1);
        assert_eq!(stats.emergency_closes, 0);
    }

    #[test]
    fn failed_stop_leg_triggers_reduce_only_close() {
        let client = Arc::new(MockExchangeClient::new());
        client.fail_order_type(OrderType::StopMarket);

        let mut engine = TradingEngine::new(hair_trigger_config(), client.clone());
        engine.on_depth(&lopsided_event(10.0, 1.0));

        let placed = client.placed_orders();
        // entry, failed SL attempt, TP, then the emergency close
        assert_eq!(placed.len(), 4);

        let close = placed.last().unwrap();
        assert_eq!(close.order_type, OrderType::Market);
        assert_eq!(close.side, Side::Sell);
        assert!(close.reduce_only);
        assert_eq!(close.quantity, placed[0].quantity);
        assert_eq!(engine.stats().emergency_closes, 1);
    }

    #[test]
    fn other_symbols_are_ignored() {
        let client = Arc::new(MockExchangeClient::new());
        let mut engine = TradingEngine::new(hair_trigger_config(), client.clone());

        let mut event = lopsided_event(10.0, 1.0);
        event.symbol = Symbol::new("DOGEUSDT");
        engine.on_depth(&event);

        assert_eq!(engine.stats().total_updates, 0);
        assert!(client.placed_orders().is_empty());
    }

    #[test]
    fn balanced_book_produces_no_orders() {
        let client = Arc::new(MockExchangeClient::new());
        let mut engine = TradingEngine::new(hair_trigger_config(), client.clone());

        for _ in 0..10 {
            engine.on_depth(&lopsided_event(5.0, 5.0));
        }

        assert_eq!(engine.stats().total_updates, 10);
        assert!(client.placed_orders().is_empty());
    }

    #[test]
    fn disabled_trading_generates_signals_but_no_orders() {
        let client = Arc::new(MockExchangeClient::new());
        let mut config = hair_trigger_config();
        config.trading.enabled = false;

        let mut engine = TradingEngine::new(config, client.clone());
        engine.on_depth(&lopsided_event(10.0, 1.0));

        assert_eq!(engine.stats().qualified_buys, 1);
        assert_eq!(engine.stats().approved_trades, 1);
        assert!(client.placed_orders().is_empty());
    }

    #[test]
    fn risk_cooldown_blocks_back_to_back_entries() {
        let client = Arc::new(MockExchangeClient::new());
        let mut config = hair_trigger_config();
        // Separate filter cooldown from the risk gate: allow the filter to
        // qualify repeatedly, let risk do the blocking.
        config.filter.cooldown_seconds = 0;
        config.risk.max_open_positions = 5;

        let mut engine = TradingEngine::new(config, client.clone());
        engine.on_depth(&lopsided_event(10.0, 1.0));
        engine.on_depth(&lopsided_event(10.0, 1.0));

        let stats = engine.stats();
        assert_eq!(stats.qualified_buys, 2);
        assert_eq!(stats.approved_trades, 1);
        assert_eq!(stats.rejected_trades, 1);
        // Only the first signal reached the exchange.
        assert_eq!(client.placed_orders().len(), 3);
    }

    #[test]
    fn order_size_respects_step_and_guards() {
        let client = Arc::new(MockExchangeClient::new());
        let engine = TradingEngine::new(hair_trigger_config(), client);

        // $100 at $50,000 on a 0.001 step: 0.002.
        let qty = engine.size_order(100.0, 50_000.0).unwrap();
        assert_eq!(qty, Quantity::from_f64(0.002));

        // Tiny notional gets bumped to the minimum, one step up.
        let qty = engine.size_order(1.0, 50_000.0).unwrap();
        assert!(qty.to_f64() * 50_000.0 >= MIN_ORDER_NOTIONAL_USD);

        // Oversized notional is refused.
        assert!(engine.size_order(10_000.0, 50_000.0).is_none());
    }
}
