// src/bus/events.rs
// Fixed-size event types stored by value in the ring buffer

use crate::domain::models::DepthUpdate;
use crate::domain::types::Symbol;

/// Book levels carried per side in a single depth event. Deeper updates are
/// truncated; the strategy only reads the top of the book.
pub const MAX_EVENT_LEVELS: usize = 20;

/// Raw fixed-point (price, quantity) pair. Kept as bare integers so the
/// whole event is trivially copyable.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RawLevel {
    pub price_raw: i64,
    pub qty_raw: i64,
}

/// Depth payload with inline storage, sized so the ring can hold events
/// without indirection.
#[derive(Debug, Clone, Copy)]
pub struct DepthEvent {
    pub symbol: Symbol,
    pub timestamp_ms: i64,
    pub sequence: i64,
    pub bid_count: u8,
    pub ask_count: u8,
    pub bids: [RawLevel; MAX_EVENT_LEVELS],
    pub asks: [RawLevel; MAX_EVENT_LEVELS],
}

impl DepthEvent {
    pub fn from_update(update: &DepthUpdate) -> Self {
        let mut event = DepthEvent {
            symbol: update.symbol,
            timestamp_ms: update.event_time_ms,
            sequence: update.last_update_id,
            bid_count: 0,
            ask_count: 0,
            bids: [RawLevel::default(); MAX_EVENT_LEVELS],
            asks: [RawLevel::default(); MAX_EVENT_LEVELS],
        };

        for (slot, level) in event.bids.iter_mut().zip(update.bids.iter()) {
            *slot = RawLevel {
                price_raw: level.price.raw(),
                qty_raw: level.quantity.raw(),
            };
            event.bid_count += 1;
        }
        for (slot, level) in event.asks.iter_mut().zip(update.asks.iter()) {
            *slot = RawLevel {
                price_raw: level.price.raw(),
                qty_raw: level.quantity.raw(),
            };
            event.ask_count += 1;
        }

        event
    }

    pub fn bids(&self) -> &[RawLevel] {
        &self.bids[..self.bid_count as usize]
    }

    pub fn asks(&self) -> &[RawLevel] {
        &self.asks[..self.ask_count as usize]
    }
}

/// Periodic timer identifier, routed by the engine's timer handler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimerEvent {
    pub timer_id: u32,
}

/// Tagged union moved through the ring. All variants are fixed-size and
/// trivially copyable.
#[derive(Debug, Clone, Copy)]
pub enum Event {
    Depth(DepthEvent),
    Timer(TimerEvent),
    Shutdown,
}
