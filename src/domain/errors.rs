// src/domain/errors.rs
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Exchange error: {0}")]
    Exchange(#[from] ExchangeError),

    #[error("Market data error: {0}")]
    MarketData(#[from] MarketDataError),

    #[error("Trading error: {0}")]
    Trading(#[from] TradingError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Unknown error: {0}")]
    Unknown(String),
}

impl From<String> for AppError {
    fn from(s: String) -> Self {
        AppError::Unknown(s)
    }
}

impl From<serde_yaml::Error> for AppError {
    fn from(e: serde_yaml::Error) -> Self {
        AppError::Config(e.to_string())
    }
}

#[derive(Error, Debug)]
pub enum ExchangeError {
    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Authentication error: {0}")]
    Authentication(String),

    #[error("Rate limit exceeded: {0}")]
    RateLimit(String),

    #[error("Order error: {0}")]
    Order(String),

    #[error("Invalid symbol: {0}")]
    InvalidSymbol(String),

    #[error("API error: {0}")]
    Api(String),
}

#[derive(Error, Debug)]
pub enum MarketDataError {
    #[error("Websocket error: {0}")]
    WebSocket(String),

    #[error("Invalid data format: {0}")]
    InvalidFormat(String),

    #[error("Stream subscription error: {0}")]
    Subscription(String),

    #[error("Data parse error: {0}")]
    Parse(String),

    #[error("Replay feed error: {0}")]
    Replay(String),
}

#[derive(Error, Debug)]
pub enum TradingError {
    #[error("Risk management error: {0}")]
    RiskManagement(String),

    #[error("Order execution error: {0}")]
    OrderExecution(String),

    #[error("Signal error: {0}")]
    Signal(String),

    #[error("Position management error: {0}")]
    PositionManagement(String),
}

// Result type aliases for convenience
pub type AppResult<T> = Result<T, AppError>;
pub type ExchangeResult<T> = Result<T, ExchangeError>;
pub type MarketDataResult<T> = Result<T, MarketDataError>;
pub type TradingResult<T> = Result<T, TradingError>;
