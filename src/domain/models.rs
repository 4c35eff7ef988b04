// src/domain/models.rs
// Exchange-facing data structures

use serde::{Deserialize, Serialize};

use crate::domain::types::{
    OrderStatus, OrderType, PositionSide, Price, PriceLevel, Quantity, Side, Symbol, TimeInForce,
};

/// Incremental depth message from the market-data stream. Each entry in
/// `bids`/`asks` is a delta; a zero quantity removes the level.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DepthUpdate {
    pub symbol: Symbol,
    pub last_update_id: i64,
    pub event_time_ms: i64,
    pub bids: Vec<PriceLevel>,
    pub asks: Vec<PriceLevel>,
}

/// A new-order request. At most one of `reduce_only` and `close_position`
/// may be set.
#[derive(Debug, Clone)]
pub struct OrderRequest {
    pub symbol: Symbol,
    pub side: Side,
    pub position_side: PositionSide,
    pub order_type: OrderType,
    pub time_in_force: TimeInForce,
    pub quantity: Quantity,
    pub price: Price,
    pub stop_price: Price,
    pub client_order_id: String,
    pub reduce_only: bool,
    pub close_position: bool,
}

impl OrderRequest {
    pub fn market(symbol: Symbol, side: Side, quantity: Quantity) -> Self {
        OrderRequest {
            symbol,
            side,
            position_side: PositionSide::Both,
            order_type: OrderType::Market,
            time_in_force: TimeInForce::Gtc,
            quantity,
            price: Price::ZERO,
            stop_price: Price::ZERO,
            client_order_id: String::new(),
            reduce_only: false,
            close_position: false,
        }
    }

    pub fn limit(symbol: Symbol, side: Side, quantity: Quantity, price: Price) -> Self {
        OrderRequest {
            price,
            order_type: OrderType::Limit,
            ..OrderRequest::market(symbol, side, quantity)
        }
    }

    pub fn is_valid(&self) -> bool {
        !(self.reduce_only && self.close_position)
    }
}

/// Order state as reported by the exchange.
#[derive(Debug, Clone)]
pub struct OrderInfo {
    pub order_id: i64,
    pub client_order_id: String,
    pub symbol: Symbol,
    pub side: Side,
    pub order_type: OrderType,
    pub status: OrderStatus,
    pub price: Price,
    pub quantity: Quantity,
    pub executed_qty: Quantity,
    pub create_time_ms: i64,
    pub update_time_ms: i64,
}

/// Futures account summary.
#[derive(Debug, Clone, Default)]
pub struct AccountInfo {
    pub total_wallet_balance: f64,
    pub available_balance: f64,
    pub total_unrealized_profit: f64,
    pub total_margin_balance: f64,
}

/// An open position as reported by the exchange.
#[derive(Debug, Clone)]
pub struct PositionInfo {
    pub symbol: Symbol,
    pub side: PositionSide,
    pub quantity: Quantity,
    pub entry_price: Price,
    pub unrealized_profit: f64,
    pub leverage: f64,
}

/// A single account trade (fill), used for realized-PnL reconciliation.
#[derive(Debug, Clone)]
pub struct AccountTrade {
    pub symbol: Symbol,
    pub order_id: i64,
    pub price: Price,
    pub quantity: Quantity,
    pub realized_pnl: f64,
    pub commission: f64,
    pub trade_time_ms: i64,
}

/// A public trade from the market-data stream. `side` is the taker side.
#[derive(Debug, Clone)]
pub struct TradeUpdate {
    pub symbol: Symbol,
    pub trade_id: i64,
    pub price: Price,
    pub quantity: Quantity,
    pub side: Side,
    pub trade_time_ms: i64,
}

/// Candlestick data for the REST klines endpoint.
#[derive(Debug, Clone, Default)]
pub struct Kline {
    pub open_time_ms: i64,
    pub close_time_ms: i64,
    pub open: Price,
    pub high: Price,
    pub low: Price,
    pub close: Price,
    pub volume: Quantity,
    pub trade_count: u32,
}

/// Kline stream payload. `is_final` marks a closed candle.
#[derive(Debug, Clone)]
pub struct KlineUpdate {
    pub symbol: Symbol,
    pub kline: Kline,
    pub is_final: bool,
}
