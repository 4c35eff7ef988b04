pub mod event_loop;
pub mod trading_engine;

pub use event_loop::{
    EventHandler, EventLoop, TIMER_HEARTBEAT, TIMER_POSITION_SYNC, TIMER_STATS,
};
pub use trading_engine::{EngineStats, TradingEngine};
