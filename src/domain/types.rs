// src/domain/types.rs
// Fixed-point scalars and core trading types

use serde::de::{self, Deserializer, Visitor};
use serde::{Deserialize, Serialize, Serializer};
use std::fmt;
use std::ops::{Add, AddAssign, Sub, SubAssign};

/// Scaling factor for 8-decimal fixed-point arithmetic.
pub const PRECISION: i64 = 100_000_000;

/// Largest magnitude convertible from f64 without overflowing the raw i64.
const MAX_CONVERTIBLE: f64 = 9.2e10;

/// Price with 8 decimal places of precision, stored as a raw integer so all
/// arithmetic and comparison stays exact.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct Price(i64);

impl Price {
    pub const ZERO: Price = Price(0);

    pub const fn from_raw(raw: i64) -> Self {
        Price(raw)
    }

    /// Convert from a floating-point price. Non-finite inputs map to zero and
    /// out-of-range inputs clamp to the representable extremum.
    pub fn from_f64(value: f64) -> Self {
        if !value.is_finite() {
            return Price(0);
        }
        if value > MAX_CONVERTIBLE {
            return Price(i64::MAX);
        }
        if value < -MAX_CONVERTIBLE {
            return Price(i64::MIN + 1);
        }
        Price((value * PRECISION as f64) as i64)
    }

    pub fn to_f64(self) -> f64 {
        self.0 as f64 / PRECISION as f64
    }

    pub const fn raw(self) -> i64 {
        self.0
    }

    /// A usable price is strictly positive.
    pub const fn is_valid(self) -> bool {
        self.0 > 0
    }
}

impl Add for Price {
    type Output = Price;
    fn add(self, other: Price) -> Price {
        Price(self.0 + other.0)
    }
}

impl Sub for Price {
    type Output = Price;
    fn sub(self, other: Price) -> Price {
        Price(self.0 - other.0)
    }
}

impl AddAssign for Price {
    fn add_assign(&mut self, other: Price) {
        self.0 += other.0;
    }
}

impl SubAssign for Price {
    fn sub_assign(&mut self, other: Price) {
        self.0 -= other.0;
    }
}

impl fmt::Display for Price {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.8}", self.to_f64())
    }
}

/// Quantity with 8 decimal places of precision, same representation as Price.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct Quantity(i64);

impl Quantity {
    pub const ZERO: Quantity = Quantity(0);

    pub const fn from_raw(raw: i64) -> Self {
        Quantity(raw)
    }

    pub fn from_f64(value: f64) -> Self {
        if !value.is_finite() {
            return Quantity(0);
        }
        if value > MAX_CONVERTIBLE {
            return Quantity(i64::MAX);
        }
        if value < -MAX_CONVERTIBLE {
            return Quantity(i64::MIN + 1);
        }
        Quantity((value * PRECISION as f64) as i64)
    }

    /// Size a quantity from a notional value, e.g. $100 at $50,000 = 0.002.
    pub fn from_usd_value(usd_value: f64, price: f64) -> Self {
        if price <= 0.0 {
            return Quantity(0);
        }
        Quantity::from_f64(usd_value / price)
    }

    pub fn to_f64(self) -> f64 {
        self.0 as f64 / PRECISION as f64
    }

    pub const fn raw(self) -> i64 {
        self.0
    }

    pub const fn is_valid(self) -> bool {
        self.0 > 0
    }
}

impl Add for Quantity {
    type Output = Quantity;
    fn add(self, other: Quantity) -> Quantity {
        Quantity(self.0 + other.0)
    }
}

impl Sub for Quantity {
    type Output = Quantity;
    fn sub(self, other: Quantity) -> Quantity {
        Quantity(self.0 - other.0)
    }
}

impl AddAssign for Quantity {
    fn add_assign(&mut self, other: Quantity) {
        self.0 += other.0;
    }
}

impl SubAssign for Quantity {
    fn sub_assign(&mut self, other: Quantity) {
        self.0 -= other.0;
    }
}

impl fmt::Display for Quantity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.8}", self.to_f64())
    }
}

/// Trading symbol such as "BTCUSDT", stored inline to avoid heap traffic on
/// the market-data path. Longer names are truncated.
#[derive(Clone, Copy)]
pub struct Symbol {
    data: [u8; Symbol::MAX_LENGTH],
    len: u8,
}

impl Symbol {
    pub const MAX_LENGTH: usize = 15;

    pub fn new(symbol: &str) -> Self {
        let bytes = symbol.as_bytes();
        let len = bytes.len().min(Self::MAX_LENGTH);
        let mut data = [0u8; Self::MAX_LENGTH];
        data[..len].copy_from_slice(&bytes[..len]);
        Symbol {
            data,
            len: len as u8,
        }
    }

    pub fn as_str(&self) -> &str {
        std::str::from_utf8(&self.data[..self.len as usize]).unwrap_or("")
    }

    pub fn len(&self) -> usize {
        self.len as usize
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}

impl Default for Symbol {
    fn default() -> Self {
        Symbol {
            data: [0u8; Symbol::MAX_LENGTH],
            len: 0,
        }
    }
}

impl PartialEq for Symbol {
    fn eq(&self, other: &Self) -> bool {
        self.as_str() == other.as_str()
    }
}

impl Eq for Symbol {}

impl std::hash::Hash for Symbol {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.as_str().hash(state);
    }
}

impl fmt::Debug for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Symbol({})", self.as_str())
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<&str> for Symbol {
    fn from(s: &str) -> Self {
        Symbol::new(s)
    }
}

impl Serialize for Symbol {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for Symbol {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct SymbolVisitor;

        impl Visitor<'_> for SymbolVisitor {
            type Value = Symbol;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a symbol string")
            }

            fn visit_str<E: de::Error>(self, v: &str) -> Result<Symbol, E> {
                Ok(Symbol::new(v))
            }
        }

        deserializer.deserialize_str(SymbolVisitor)
    }
}

/// Order side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Side {
    Buy,
    Sell,
}

impl Side {
    pub fn as_str(&self) -> &'static str {
        match self {
            Side::Buy => "BUY",
            Side::Sell => "SELL",
        }
    }

    pub fn opposite(&self) -> Side {
        match self {
            Side::Buy => Side::Sell,
            Side::Sell => Side::Buy,
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Order type, matching the futures REST parameter values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OrderType {
    Market,
    Limit,
    StopMarket,
    StopLimit,
    TakeProfit,
    TakeProfitMarket,
}

impl OrderType {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderType::Market => "MARKET",
            OrderType::Limit => "LIMIT",
            OrderType::StopMarket => "STOP_MARKET",
            OrderType::StopLimit => "STOP",
            OrderType::TakeProfit => "TAKE_PROFIT",
            OrderType::TakeProfitMarket => "TAKE_PROFIT_MARKET",
        }
    }
}

/// Position side for futures accounts. One-way accounts use Both.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PositionSide {
    Both,
    Long,
    Short,
}

impl PositionSide {
    pub fn as_str(&self) -> &'static str {
        match self {
            PositionSide::Both => "BOTH",
            PositionSide::Long => "LONG",
            PositionSide::Short => "SHORT",
        }
    }
}

/// Exchange order status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OrderStatus {
    New,
    PartiallyFilled,
    Filled,
    Canceled,
    Rejected,
    Expired,
}

impl OrderStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            OrderStatus::Filled | OrderStatus::Canceled | OrderStatus::Rejected | OrderStatus::Expired
        )
    }
}

/// Time in force.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TimeInForce {
    Gtc,
    Ioc,
    Fok,
    Gtx,
}

impl TimeInForce {
    pub fn as_str(&self) -> &'static str {
        match self {
            TimeInForce::Gtc => "GTC",
            TimeInForce::Ioc => "IOC",
            TimeInForce::Fok => "FOK",
            TimeInForce::Gtx => "GTX",
        }
    }
}

/// One side of the book at a single price. A zero quantity marks removal.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceLevel {
    pub price: Price,
    pub quantity: Quantity,
    pub order_count: u32,
}

impl PriceLevel {
    pub fn new(price: Price, quantity: Quantity) -> Self {
        PriceLevel {
            price,
            quantity,
            order_count: 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn price_from_f64_is_exact_on_the_grid() {
        assert_eq!(Price::from_f64(42000.5).raw(), 4_200_050_000_000);
        assert_eq!(Price::from_f64(0.00000001).raw(), 1);
        assert_eq!(Price::from_f64(0.0).raw(), 0);
    }

    #[test]
    fn price_round_trip_within_tolerance() {
        for &x in &[0.0, 0.00000001, 0.5, 1.0, 123.456, 42000.5, 1.0e9, 9.2e10] {
            let rt = Price::from_f64(x).to_f64();
            let tol = (x * 1e-9).max(1e-8);
            assert!(
                (rt - x).abs() <= tol,
                "round trip of {} gave {} (diff {})",
                x,
                rt,
                (rt - x).abs()
            );
        }
    }

    #[test]
    fn price_clamps_bad_input() {
        assert_eq!(Price::from_f64(f64::NAN).raw(), 0);
        assert_eq!(Price::from_f64(f64::INFINITY).raw(), i64::MAX);
        assert_eq!(Price::from_f64(f64::NEG_INFINITY).raw(), i64::MIN + 1);
        assert_eq!(Price::from_f64(1.0e15).raw(), i64::MAX);
    }

    #[test]
    fn price_validity_and_ordering() {
        assert!(Price::from_f64(0.01).is_valid());
        assert!(!Price::ZERO.is_valid());
        assert!(!Price::from_f64(-5.0).is_valid());
        assert!(Price::from_f64(100.0) < Price::from_f64(100.5));
    }

    #[test]
    fn quantity_from_usd_value() {
        let qty = Quantity::from_usd_value(100.0, 50_000.0);
        assert_eq!(qty.raw(), 200_000); // 0.002
        assert_eq!(Quantity::from_usd_value(100.0, 0.0).raw(), 0);
        assert_eq!(Quantity::from_usd_value(100.0, -1.0).raw(), 0);
    }

    #[test]
    fn quantity_arithmetic_is_integer_exact() {
        let a = Quantity::from_f64(0.1);
        let b = Quantity::from_f64(0.2);
        assert_eq!((a + b).raw(), Quantity::from_f64(0.3).raw());
    }

    #[test]
    fn symbol_truncates_and_compares_by_content() {
        let s = Symbol::new("BTCUSDT");
        assert_eq!(s.as_str(), "BTCUSDT");
        assert_eq!(s.len(), 7);

        let long = Symbol::new("ABCDEFGHIJKLMNOPQRST");
        assert_eq!(long.len(), Symbol::MAX_LENGTH);
        assert_eq!(long.as_str(), "ABCDEFGHIJKLMNO");

        assert_eq!(Symbol::new("ETHUSDT"), Symbol::new("ETHUSDT"));
        assert_ne!(Symbol::new("ETHUSDT"), Symbol::new("BTCUSDT"));

        let mut map = HashMap::new();
        map.insert(Symbol::new("BTCUSDT"), 1);
        assert_eq!(map.get(&Symbol::new("BTCUSDT")), Some(&1));
    }

    #[test]
    fn side_opposite() {
        assert_eq!(Side::Buy.opposite(), Side::Sell);
        assert_eq!(Side::Sell.opposite(), Side::Buy);
    }
}
