// src/exchange/client.rs
// Exchange client interface consumed by the engine

use serde::Deserialize;

use crate::domain::models::{
    AccountInfo, AccountTrade, DepthUpdate, Kline, KlineUpdate, OrderInfo, OrderRequest,
    PositionInfo, TradeUpdate,
};
use crate::domain::types::{Price, Symbol};

pub type DepthCallback = Box<dyn Fn(&DepthUpdate) + Send + Sync>;
pub type TradeCallback = Box<dyn Fn(&TradeUpdate) + Send + Sync>;
pub type KlineCallback = Box<dyn Fn(&KlineUpdate) + Send + Sync>;
pub type ErrorCallback = Box<dyn Fn(&str) + Send + Sync>;
pub type ConnectCallback = Box<dyn Fn() + Send + Sync>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    Testnet,
    Mainnet,
}

impl Default for Environment {
    fn default() -> Self {
        Environment::Testnet
    }
}

/// Connection settings for a concrete client implementation.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ExchangeConfig {
    pub api_key: String,
    pub secret_key: String,
    pub environment: Environment,
    pub default_leverage: u32,
    pub hedge_mode: bool,
}

/// Synchronous exchange interface. REST calls block the caller; stream
/// callbacks are invoked from the client's own I/O thread.
///
/// Failure contract: `place_order` returns None and leaves a formatted
/// description in `last_error()`; collection queries return empty on failure
/// so a flaky endpoint never takes the strategy loop down.
pub trait ExchangeClient: Send + Sync {
    // Account and trading
    fn account_info(&self) -> Option<AccountInfo>;
    fn positions(&self) -> Vec<PositionInfo>;
    fn position(&self, symbol: &Symbol) -> Option<PositionInfo>;
    fn open_orders(&self, symbol: Option<&Symbol>) -> Vec<OrderInfo>;
    fn account_trades(&self, symbol: &Symbol, limit: usize) -> Vec<AccountTrade>;
    fn place_order(&self, request: &OrderRequest) -> Option<OrderInfo>;
    fn cancel_order(&self, symbol: &Symbol, order_id: i64) -> bool;
    fn cancel_all_orders(&self, symbol: &Symbol) -> bool;
    fn set_leverage(&self, symbol: &Symbol, leverage: u32) -> bool;
    fn last_error(&self) -> String;

    // Market data (REST)
    fn price(&self, symbol: &Symbol) -> Option<Price>;
    fn depth(&self, symbol: &Symbol, limit: usize) -> Option<DepthUpdate>;
    fn klines(&self, symbol: &Symbol, interval: &str, limit: usize) -> Vec<Kline>;

    // Streams
    fn subscribe_depth(&self, symbol: &Symbol, callback: DepthCallback);
    fn subscribe_trades(&self, symbol: &Symbol, callback: TradeCallback);
    fn subscribe_klines(&self, symbol: &Symbol, interval: &str, callback: KlineCallback);
    fn unsubscribe(&self, symbol: &Symbol);
    fn on_error(&self, callback: ErrorCallback);
    fn on_reconnect(&self, callback: ConnectCallback);
    fn on_ws_connect(&self, callback: ConnectCallback);

    // Lifecycle
    fn start(&self);
    fn stop(&self);
    fn is_connected(&self) -> bool;
}
