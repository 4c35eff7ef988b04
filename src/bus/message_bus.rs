// src/bus/message_bus.rs
// Producer-side facade over the SPSC ring

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crate::bus::events::{DepthEvent, Event};
use crate::bus::ring::SpscRing;
use crate::domain::models::DepthUpdate;

/// Ring capacity for the market-data bus. At a typical 10 Hz depth rate this
/// buffers several minutes of burst.
pub const BUS_CAPACITY: usize = 4096;

pub type EventRing = SpscRing<Event, BUS_CAPACITY>;

/// Converts exchange depth updates into compact events and publishes them
/// into the ring from the network thread. Overflow is counted, not blocked
/// on; the strategy thread observes the drop rate.
pub struct MessageBus {
    ring: Arc<EventRing>,
    events_published: AtomicU64,
    events_dropped: AtomicU64,
}

impl MessageBus {
    pub fn new(ring: Arc<EventRing>) -> Self {
        MessageBus {
            ring,
            events_published: AtomicU64::new(0),
            events_dropped: AtomicU64::new(0),
        }
    }

    /// Publish a depth update, truncating to the event's inline capacity.
    /// Returns false when the ring was full and the event was dropped.
    pub fn publish_depth(&self, update: &DepthUpdate) -> bool {
        let event = Event::Depth(DepthEvent::from_update(update));

        if self.ring.try_push(event) {
            self.events_published.fetch_add(1, Ordering::Relaxed);
            true
        } else {
            self.events_dropped.fetch_add(1, Ordering::Relaxed);
            false
        }
    }

    /// Publish a shutdown marker. Retries through transient backpressure,
    /// but gives up if the consumer is clearly gone so the producer thread
    /// cannot hang on a full ring.
    pub fn publish_shutdown(&self) {
        for _ in 0..1000 {
            if self.ring.try_push(Event::Shutdown) {
                self.events_published.fetch_add(1, Ordering::Relaxed);
                return;
            }
            std::thread::sleep(std::time::Duration::from_millis(1));
        }
        log::warn!("Shutdown event could not be published, ring is full and idle");
    }

    pub fn events_published(&self) -> u64 {
        self.events_published.load(Ordering::Relaxed)
    }

    pub fn events_dropped(&self) -> u64 {
        self.events_dropped.load(Ordering::Relaxed)
    }

    pub fn drop_rate(&self) -> f64 {
        let published = self.events_published() as f64;
        let dropped = self.events_dropped() as f64;
        let total = published + dropped;
        if total == 0.0 {
            0.0
        } else {
            dropped / total
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::types::{Price, PriceLevel, Quantity, Symbol};

    fn update(seq: i64) -> DepthUpdate {
        DepthUpdate {
            symbol: Symbol::new("BTCUSDT"),
            last_update_id: seq,
            event_time_ms: seq * 100,
            bids: vec![PriceLevel::new(
                Price::from_f64(100.0),
                Quantity::from_f64(1.0),
            )],
            asks: vec![PriceLevel::new(
                Price::from_f64(100.5),
                Quantity::from_f64(1.0),
            )],
        }
    }

    #[test]
    fn publishes_and_counts() {
        let ring = Arc::new(EventRing::new());
        let bus = MessageBus::new(ring.clone());

        assert!(bus.publish_depth(&update(1)));
        assert_eq!(bus.events_published(), 1);
        assert_eq!(bus.events_dropped(), 0);

        match ring.try_pop() {
            Some(Event::Depth(event)) => assert_eq!(event.sequence, 1),
            other => panic!("expected depth event, got {:?}", other),
        }
    }

    #[test]
    fn accounts_for_every_attempt() {
        let ring = Arc::new(EventRing::new());
        let bus = MessageBus::new(ring);

        // Nothing drains the ring, so attempts beyond the capacity drop.
        let attempts = (BUS_CAPACITY + 500) as u64;
        for i in 0..attempts {
            bus.publish_depth(&update(i as i64));
        }

        assert_eq!(bus.events_published() + bus.events_dropped(), attempts);
        assert_eq!(bus.events_published(), (BUS_CAPACITY - 1) as u64);
        assert!(bus.events_dropped() > 0);
        assert!(bus.drop_rate() > 0.0 && bus.drop_rate() < 1.0);
    }
}
