pub mod errors;
pub mod models;
pub mod types;

// Re-export core types for convenience
pub use errors::{
    AppError, AppResult, ExchangeError, ExchangeResult, MarketDataError, MarketDataResult,
    TradingError, TradingResult,
};
pub use models::{
    AccountInfo, AccountTrade, DepthUpdate, Kline, KlineUpdate, OrderInfo, OrderRequest,
    PositionInfo, TradeUpdate,
};
pub use types::{
    OrderStatus, OrderType, PositionSide, Price, PriceLevel, Quantity, Side, Symbol, TimeInForce,
    PRECISION,
};
