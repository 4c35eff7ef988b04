pub mod events;
pub mod message_bus;
pub mod ring;

pub use events::{DepthEvent, Event, RawLevel, TimerEvent, MAX_EVENT_LEVELS};
pub use message_bus::{EventRing, MessageBus, BUS_CAPACITY};
pub use ring::SpscRing;
