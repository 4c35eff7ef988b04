pub mod client;
pub mod mock;

pub use client::{
    ConnectCallback, DepthCallback, Environment, ErrorCallback, ExchangeClient, ExchangeConfig,
    KlineCallback, TradeCallback,
};
pub use mock::MockExchangeClient;
