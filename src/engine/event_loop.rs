// src/engine/event_loop.rs
// Single-threaded reactor draining the ring and firing periodic timers

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::bus::events::{DepthEvent, Event, TimerEvent};
use crate::bus::message_bus::EventRing;

pub const TIMER_STATS: u32 = 1;
pub const TIMER_POSITION_SYNC: u32 = 2;
pub const TIMER_HEARTBEAT: u32 = 3;

/// Sleep when neither the ring nor the timers had work.
const IDLE_WAIT: Duration = Duration::from_millis(50);

/// Strategy-side event sink. All mutation of strategy state happens through
/// these callbacks, on the one thread that runs the loop.
pub trait EventHandler {
    fn on_depth(&mut self, event: &DepthEvent);
    fn on_timer(&mut self, event: TimerEvent);
}

struct Timer {
    id: u32,
    period: Duration,
    next_deadline: Instant,
}

/// Owns the consumer side of the ring and all timer state. Events and timer
/// callbacks are dispatched on the calling thread, in the same lane, so the
/// handler never needs internal synchronization.
pub struct EventLoop {
    ring: Arc<EventRing>,
    timers: Vec<Timer>,
    running: Arc<AtomicBool>,
    events_processed: u64,
}

impl EventLoop {
    pub fn new(ring: Arc<EventRing>, running: Arc<AtomicBool>) -> Self {
        EventLoop {
            ring,
            timers: Vec::new(),
            running,
            events_processed: 0,
        }
    }

    pub fn add_timer(&mut self, id: u32, period: Duration) {
        self.timers.push(Timer {
            id,
            period,
            next_deadline: Instant::now() + period,
        });
    }

    pub fn stop(&self) {
        self.running.store(false, Ordering::Release);
    }

    pub fn events_processed(&self) -> u64 {
        self.events_processed
    }

    /// Run until the flag clears or a shutdown event is drained.
    pub fn run(&mut self, handler: &mut dyn EventHandler) {
        let start = Instant::now();
        for timer in &mut self.timers {
            timer.next_deadline = start + timer.period;
        }

        log::info!("Event loop started ({} timers)", self.timers.len());

        while self.running.load(Ordering::Acquire) {
            let mut worked = false;

            // Drain everything the producer queued since the last pass.
            while let Some(event) = self.ring.try_pop() {
                worked = true;
                self.events_processed += 1;

                match event {
                    Event::Depth(depth) => handler.on_depth(&depth),
                    Event::Timer(timer) => handler.on_timer(timer),
                    Event::Shutdown => {
                        log::info!("Shutdown event drained, stopping event loop");
                        self.running.store(false, Ordering::Release);
                        return;
                    }
                }
            }

            // Fire due timers on this same thread. A deadline missed several
            // times over collapses into a single fire.
            let now = Instant::now();
            for timer in &mut self.timers {
                if now >= timer.next_deadline {
                    worked = true;
                    handler.on_timer(TimerEvent { timer_id: timer.id });
                    while timer.next_deadline <= now {
                        timer.next_deadline += timer.period;
                    }
                }
            }

            if !worked {
                std::thread::sleep(IDLE_WAIT);
            }
        }

        log::info!(
            "Event loop stopped after {} events",
            self.events_processed
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bus::message_bus::MessageBus;
    use crate::domain::models::DepthUpdate;
    use crate::domain::types::{Price, PriceLevel, Quantity, Symbol};
    use std::thread;

    #[derive(Default)]
    struct CountingHandler {
        depth_events: u64,
        timer_events: Vec<u32>,
        last_sequence: i64,
    }

    impl EventHandler for CountingHandler {
        fn on_depth(&mut self, event: &DepthEvent) {
            self.depth_events += 1;
            assert!(event.sequence > self.last_sequence, "sequence went backwards");
            self.last_sequence = event.sequence;
        }

        fn on_timer(&mut self, event: TimerEvent) {
            self.timer_events.push(event.timer_id);
        }
    }

    fn depth_update(seq: i64) -> DepthUpdate {
        DepthUpdate {
            symbol: Symbol::new("BTCUSDT"),
            last_update_id: seq,
            event_time_ms: seq,
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
    fn drains_published_events_in_order_and_exits_on_shutdown() {
        let ring = Arc::new(EventRing::new());
        let bus = MessageBus::new(ring.clone());
        let running = Arc::new(AtomicBool::new(true));

        let producer = thread::spawn(move || {
            for seq in 1..=200 {
                assert!(bus.publish_depth(&depth_update(seq)));
            }
            bus.publish_shutdown();
        });

        let mut event_loop = EventLoop::new(ring, running.clone());
        let mut handler = CountingHandler::default();
        event_loop.run(&mut handler);
        producer.join().unwrap();

        assert_eq!(handler.depth_events, 200);
        assert_eq!(handler.last_sequence, 200);
        assert_eq!(event_loop.events_processed(), 201); // depth + shutdown
        assert!(!running.load(Ordering::Acquire));
    }

    #[test]
    fn timers_fire_while_idle() {
        let ring = Arc::new(EventRing::new());
        let running = Arc::new(AtomicBool::new(true));
        let stop_flag = running.clone();

        let stopper = thread::spawn(move || {
            thread::sleep(Duration::from_millis(250));
            stop_flag.store(false, Ordering::Release);
        });

        let mut event_loop = EventLoop::new(ring, running);
        event_loop.add_timer(TIMER_STATS, Duration::from_millis(50));
        let mut handler = CountingHandler::default();
        event_loop.run(&mut handler);
        stopper.join().unwrap();

        assert!(!handler.timer_events.is_empty());
        assert!(handler.timer_events.iter().all(|id| *id == TIMER_STATS));
    }

    #[test]
    fn stop_terminates_a_quiet_loop() {
        let ring = Arc::new(EventRing::new());
        let running = Arc::new(AtomicBool::new(true));

        let mut event_loop = EventLoop::new(ring, running.clone());
        let handle = thread::spawn(move || {
            let mut handler = CountingHandler::default();
            event_loop.run(&mut handler);
            event_loop.events_processed()
        });

        thread::sleep(Duration::from_millis(100));
        running.store(false, Ordering::Release);
        assert_eq!(handle.join().unwrap(), 0);
    }
}
