// src/market/order_book.rs
// In-memory L2 order book over sorted arrays
//
// The strategy only reads the top levels on every update, so both sides are
// kept as flat sorted arrays: binary search to locate a level, memmove-style
// shifts to insert or remove. For books capped at ~1000 levels this beats
// pointer-chasing structures on real hardware.

use crate::domain::types::{Price, PriceLevel, Quantity};

#[derive(Debug, Clone)]
pub struct OrderBookConfig {
    /// Maximum levels stored per side.
    pub max_depth: usize,
}

impl Default for OrderBookConfig {
    fn default() -> Self {
        OrderBookConfig {
            max_depth: OrderBook::MAX_LEVELS,
        }
    }
}

pub struct OrderBook {
    // Bids sorted descending, asks ascending, both by price.
    bids: Vec<PriceLevel>,
    asks: Vec<PriceLevel>,
    last_update_id: i64,
    last_update_time_ms: i64,
    initialized: bool,
    max_depth: usize,
}

impl OrderBook {
    pub const MAX_LEVELS: usize = 1000;

    pub fn new(config: OrderBookConfig) -> Self {
        OrderBook {
            bids: Vec::with_capacity(config.max_depth),
            asks: Vec::with_capacity(config.max_depth),
            last_update_id: 0,
            last_update_time_ms: 0,
            initialized: false,
            max_depth: config.max_depth,
        }
    }

    /// Load a snapshot. Input sides are assumed pre-sorted (bids descending,
    /// asks ascending) and are truncated to the configured depth.
    pub fn initialize(&mut self, bids: &[PriceLevel], asks: &[PriceLevel], last_update_id: i64) {
        self.clear();

        let bid_count = bids.len().min(self.max_depth);
        self.bids.extend_from_slice(&bids[..bid_count]);

        let ask_count = asks.len().min(self.max_depth);
        self.asks.extend_from_slice(&asks[..ask_count]);

        self.last_update_id = last_update_id;
        self.last_update_time_ms = now_ms();
        self.initialized = true;
    }

    pub fn clear(&mut self) {
        self.bids.clear();
        self.asks.clear();
        self.last_update_id = 0;
        self.initialized = false;
    }

    /// Apply one bid delta. A zero quantity removes the level.
    pub fn update_bid(&mut self, price: Price, qty: Quantity) {
        self.last_update_time_ms = now_ms();

        if qty.raw() == 0 {
            remove_level(&mut self.bids, price);
        } else {
            // Bids compare descending.
            let idx = self.bids.partition_point(|level| level.price > price);
            insert_level(&mut self.bids, idx, price, qty, self.max_depth);
        }
    }

    /// Apply one ask delta. A zero quantity removes the level.
    pub fn update_ask(&mut self, price: Price, qty: Quantity) {
        self.last_update_time_ms = now_ms();

        if qty.raw() == 0 {
            remove_level(&mut self.asks, price);
        } else {
            // Asks compare ascending.
            let idx = self.asks.partition_point(|level| level.price < price);
            insert_level(&mut self.asks, idx, price, qty, self.max_depth);
        }
    }

    /// Apply a batch of deltas, bids first.
    pub fn update_batch(&mut self, bids: &[PriceLevel], asks: &[PriceLevel]) {
        for level in bids {
            self.update_bid(level.price, level.quantity);
        }
        for level in asks {
            self.update_ask(level.price, level.quantity);
        }
    }

    pub fn set_last_update_id(&mut self, id: i64) {
        self.last_update_id = id;
    }

    pub fn best_bid(&self) -> Option<&PriceLevel> {
        self.bids.first()
    }

    pub fn best_ask(&self) -> Option<&PriceLevel> {
        self.asks.first()
    }

    pub fn mid_price(&self) -> Price {
        match (self.best_bid(), self.best_ask()) {
            (Some(bid), Some(ask)) => Price::from_raw((bid.price.raw() + ask.price.raw()) / 2),
            _ => Price::ZERO,
        }
    }

    pub fn spread(&self) -> Price {
        match (self.best_bid(), self.best_ask()) {
            (Some(bid), Some(ask)) => Price::from_raw(ask.price.raw() - bid.price.raw()),
            _ => Price::ZERO,
        }
    }

    /// Spread as a percentage of the mid price.
    pub fn spread_pct(&self) -> f64 {
        let mid = self.mid_price();
        if mid.raw() == 0 {
            return 0.0;
        }
        self.spread().to_f64() / mid.to_f64() * 100.0
    }

    pub fn bids(&self, n: usize) -> &[PriceLevel] {
        &self.bids[..n.min(self.bids.len())]
    }

    pub fn asks(&self, n: usize) -> &[PriceLevel] {
        &self.asks[..n.min(self.asks.len())]
    }

    /// Total bid volume over the top `levels` levels.
    pub fn bid_depth(&self, levels: usize) -> Quantity {
        self.bids(levels)
            .iter()
            .fold(Quantity::ZERO, |total, level| total + level.quantity)
    }

    /// Total ask volume over the top `levels` levels.
    pub fn ask_depth(&self, levels: usize) -> Quantity {
        self.asks(levels)
            .iter()
            .fold(Quantity::ZERO, |total, level| total + level.quantity)
    }

    pub fn bid_count(&self) -> usize {
        self.bids.len()
    }

    pub fn ask_count(&self) -> usize {
        self.asks.len()
    }

    pub fn last_update_id(&self) -> i64 {
        self.last_update_id
    }

    pub fn last_update_time_ms(&self) -> i64 {
        self.last_update_time_ms
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized
    }
}

impl Default for OrderBook {
    fn default() -> Self {
        OrderBook::new(OrderBookConfig::default())
    }
}

fn now_ms() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

/// Insert or overwrite at a pre-computed sorted index. When the side is at
/// capacity the worst level is evicted, unless the new level itself sorts
/// past the end.
fn insert_level(side: &mut Vec<PriceLevel>, idx: usize, price: Price, qty: Quantity, max_depth: usize) {
    if idx < side.len() && side[idx].price == price {
        side[idx].quantity = qty;
        return;
    }

    if side.len() < max_depth {
        side.insert(idx, PriceLevel::new(price, qty));
    } else if idx < max_depth {
        side.pop();
        side.insert(idx, PriceLevel::new(price, qty));
    }
}

fn remove_level(side: &mut Vec<PriceLevel>, price: Price) {
    if let Some(idx) = side.iter().position(|level| level.price == price) {
        side.remove(idx);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn px(value: f64) -> Price {
        Price::from_f64(value)
    }

    fn qty(value: f64) -> Quantity {
        Quantity::from_f64(value)
    }

    fn book() -> OrderBook {
        OrderBook::default()
    }

    #[test]
    fn insert_update_remove_bids() {
        let mut book = book();
        book.update_bid(px(100.00), qty(1.0));
        book.update_bid(px(99.50), qty(2.0));
        book.update_bid(px(100.50), qty(3.0));

        let bids = book.bids(10);
        assert_eq!(bids.len(), 3);
        assert_eq!(bids[0].price, px(100.50));
        assert_eq!(bids[0].quantity, qty(3.0));
        assert_eq!(bids[1].price, px(100.00));
        assert_eq!(bids[2].price, px(99.50));

        // Overwrite an existing level.
        book.update_bid(px(100.00), qty(5.0));
        assert_eq!(book.bids(10)[1].quantity, qty(5.0));
        assert_eq!(book.bid_count(), 3);

        // Zero quantity removes.
        book.update_bid(px(99.50), qty(0.0));
        assert_eq!(book.bid_count(), 2);
        assert_eq!(book.bids(10).last().unwrap().price, px(100.00));
    }

    #[test]
    fn sides_stay_strictly_sorted() {
        let mut book = book();
        let prices = [101.0, 99.0, 100.0, 102.5, 98.5, 100.5, 99.9];
        for &p in &prices {
            book.update_bid(px(p), qty(1.0));
            book.update_ask(px(p + 10.0), qty(1.0));
        }

        let bids = book.bids(OrderBook::MAX_LEVELS);
        for pair in bids.windows(2) {
            assert!(pair[0].price > pair[1].price);
        }

        let asks = book.asks(OrderBook::MAX_LEVELS);
        for pair in asks.windows(2) {
            assert!(pair[0].price < pair[1].price);
        }
    }

    #[test]
    fn capacity_evicts_the_worst_level() {
        let mut book = OrderBook::new(OrderBookConfig { max_depth: 3 });
        book.update_bid(px(100.0), qty(1.0));
        book.update_bid(px(99.0), qty(1.0));
        book.update_bid(px(98.0), qty(1.0));
        assert_eq!(book.bid_count(), 3);

        // Better than the worst: inserted, worst evicted.
        book.update_bid(px(101.0), qty(2.0));
        assert_eq!(book.bid_count(), 3);
        assert_eq!(book.best_bid().unwrap().price, px(101.0));
        assert!(book.bids(3).iter().all(|l| l.price != px(98.0)));

        // Worse than everything at capacity: ignored.
        book.update_bid(px(90.0), qty(2.0));
        assert_eq!(book.bid_count(), 3);
        assert!(book.bids(3).iter().all(|l| l.price != px(90.0)));
    }

    #[test]
    fn removing_a_missing_price_is_a_no_op() {
        let mut book = book();
        book.update_ask(px(100.5), qty(1.0));
        book.update_ask(px(101.5), qty(0.0));
        assert_eq!(book.ask_count(), 1);
    }

    #[test]
    fn mid_spread_and_depth() {
        let mut book = book();
        book.update_bid(px(100.0), qty(2.0));
        book.update_bid(px(99.5), qty(3.0));
        book.update_ask(px(100.5), qty(1.0));
        book.update_ask(px(101.0), qty(4.0));

        assert_eq!(book.mid_price(), px(100.25));
        assert_eq!(book.spread(), px(0.5));
        let expected_pct = 0.5 / 100.25 * 100.0;
        assert!((book.spread_pct() - expected_pct).abs() < 1e-9);

        assert_eq!(book.bid_depth(10), qty(5.0));
        assert_eq!(book.ask_depth(1), qty(1.0));
    }

    #[test]
    fn snapshot_initialize_truncates() {
        let mut book = OrderBook::new(OrderBookConfig { max_depth: 2 });
        let bids = [
            PriceLevel::new(px(100.0), qty(1.0)),
            PriceLevel::new(px(99.0), qty(1.0)),
            PriceLevel::new(px(98.0), qty(1.0)),
        ];
        let asks = [PriceLevel::new(px(100.5), qty(1.0))];

        book.initialize(&bids, &asks, 77);
        assert!(book.is_initialized());
        assert_eq!(book.bid_count(), 2);
        assert_eq!(book.ask_count(), 1);
        assert_eq!(book.last_update_id(), 77);

        book.clear();
        assert!(!book.is_initialized());
        assert_eq!(book.bid_count(), 0);
    }

    #[test]
    fn empty_book_queries_return_zero() {
        let book = book();
        assert!(book.best_bid().is_none());
        assert!(book.best_ask().is_none());
        assert_eq!(book.mid_price(), Price::ZERO);
        assert_eq!(book.spread(), Price::ZERO);
        assert_eq!(book.spread_pct(), 0.0);
    }
}
