// src/exchange/mock.rs
// In-memory exchange used by tests and paper/replay runs

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};
use std::sync::Mutex;

use crate::domain::models::{
    AccountInfo, AccountTrade, DepthUpdate, Kline, OrderInfo, OrderRequest, PositionInfo,
};
use crate::domain::types::{OrderStatus, OrderType, Price, Quantity, Symbol};
use crate::exchange::client::{
    ConnectCallback, DepthCallback, ErrorCallback, ExchangeClient, KlineCallback, TradeCallback,
};

#[derive(Default)]
struct MockState {
    account: Option<AccountInfo>,
    positions: Vec<PositionInfo>,
    trades: Vec<AccountTrade>,
    open_orders: Vec<OrderInfo>,
    placed: Vec<OrderRequest>,
    fail_types: HashSet<OrderType>,
    last_error: String,
    fill_price: Price,
}

/// Scriptable `ExchangeClient`: order placement fills instantly at a fixed
/// price, failures are injected per order type, and every request is logged
/// for later assertions. Depth events are pushed in by the test or the
/// replay feed through `push_depth`.
pub struct MockExchangeClient {
    state: Mutex<MockState>,
    connected: AtomicBool,
    next_order_id: AtomicI64,
    depth_callback: Mutex<Option<DepthCallback>>,
    error_callback: Mutex<Option<ErrorCallback>>,
    ws_connect_callback: Mutex<Option<ConnectCallback>>,
}

impl MockExchangeClient {
    pub fn new() -> Self {
        let mut state = MockState::default();
        state.account = Some(AccountInfo {
            total_wallet_balance: 10_000.0,
            available_balance: 10_000.0,
            total_unrealized_profit: 0.0,
            total_margin_balance: 10_000.0,
        });
        state.fill_price = Price::from_f64(50_000.0);

        MockExchangeClient {
            state: Mutex::new(state),
            connected: AtomicBool::new(false),
            next_order_id: AtomicI64::new(1),
            depth_callback: Mutex::new(None),
            error_callback: Mutex::new(None),
            ws_connect_callback: Mutex::new(None),
        }
    }

    /// Make every subsequent order of the given type fail.
    pub fn fail_order_type(&self, order_type: OrderType) {
        self.state.lock().unwrap().fail_types.insert(order_type);
    }

    pub fn set_fill_price(&self, price: Price) {
        self.state.lock().unwrap().fill_price = price;
    }

    pub fn set_positions(&self, positions: Vec<PositionInfo>) {
        self.state.lock().unwrap().positions = positions;
    }

    pub fn set_account_trades(&self, trades: Vec<AccountTrade>) {
        self.state.lock().unwrap().trades = trades;
    }

    pub fn set_open_orders(&self, orders: Vec<OrderInfo>) {
        self.state.lock().unwrap().open_orders = orders;
    }

    /// Every request seen by `place_order`, in submission order.
    pub fn placed_orders(&self) -> Vec<OrderRequest> {
        self.state.lock().unwrap().placed.clone()
    }

    /// Deliver a depth update to the subscribed callback, as the I/O thread
    /// of a real client would.
    pub fn push_depth(&self, update: &DepthUpdate) {
        if let Some(callback) = self.depth_callback.lock().unwrap().as_ref() {
            callback(update);
        }
    }

    fn emit_error(&self, message: &str) {
        if let Some(callback) = self.error_callback.lock().unwrap().as_ref() {
            callback(message);
        }
    }
}

impl Default for MockExchangeClient {
    fn default() -> Self {
        Self::new()
    }
}

impl ExchangeClient for MockExchangeClient {
    fn account_info(&self) -> Option<AccountInfo> {
        self.state.lock().unwrap().account.clone()
    }

    fn positions(&self) -> Vec<PositionInfo> {
        // Dust filtering mirrors the real client.
        self.state
            .lock()
            .unwrap()
            .positions
            .iter()
            .filter(|p| p.quantity.to_f64().abs() >= 1e-7)
            .cloned()
            .collect()
    }

    fn position(&self, symbol: &Symbol) -> Option<PositionInfo> {
        self.positions().into_iter().find(|p| p.symbol == *symbol)
    }

    fn open_orders(&self, symbol: Option<&Symbol>) -> Vec<OrderInfo> {
        let state = self.state.lock().unwrap();
        state
            .open_orders
            .iter()
            .filter(|o| symbol.map_or(true, |s| o.symbol == *s))
            .cloned()
            .collect()
    }

    fn account_trades(&self, symbol: &Symbol, limit: usize) -> Vec<AccountTrade> {
        let state = self.state.lock().unwrap();
        let matching: Vec<AccountTrade> = state
            .trades
            .iter()
            .filter(|t| t.symbol == *symbol)
            .cloned()
            .collect();
        let skip = matching.len().saturating_sub(limit);
        matching.into_iter().skip(skip).collect()
    }

    fn place_order(&self, request: &OrderRequest) -> Option<OrderInfo> {
        let mut state = self.state.lock().unwrap();
        state.placed.push(request.clone());

        if state.fail_types.contains(&request.order_type) {
            state.last_error = format!(
                "HTTP 400: order rejected | type={} qty={} price={} stop={}",
                request.order_type.as_str(),
                request.quantity,
                request.price,
                request.stop_price
            );
            let message = state.last_error.clone();
            drop(state);
            self.emit_error(&message);
            return None;
        }

        let order_id = self.next_order_id.fetch_add(1, Ordering::Relaxed);
        let now_ms = chrono::Utc::now().timestamp_millis();

        let (status, executed_qty, price) = match request.order_type {
            OrderType::Market => (OrderStatus::Filled, request.quantity, state.fill_price),
            _ => (OrderStatus::New, Quantity::ZERO, request.price),
        };

        let info = OrderInfo {
            order_id,
            client_order_id: request.client_order_id.clone(),
            symbol: request.symbol,
            side: request.side,
            order_type: request.order_type,
            status,
            price,
            quantity: request.quantity,
            executed_qty,
            create_time_ms: now_ms,
            update_time_ms: now_ms,
        };

        if status == OrderStatus::New {
            state.open_orders.push(info.clone());
        }

        Some(info)
    }

    fn cancel_order(&self, _symbol: &Symbol, order_id: i64) -> bool {
        let mut state = self.state.lock().unwrap();
        let before = state.open_orders.len();
        state.open_orders.retain(|o| o.order_id != order_id);
        state.open_orders.len() < before
    }

    fn cancel_all_orders(&self, symbol: &Symbol) -> bool {
        let mut state = self.state.lock().unwrap();
        state.open_orders.retain(|o| o.symbol != *symbol);
        true
    }

    fn set_leverage(&self, _symbol: &Symbol, _leverage: u32) -> bool {
        true
    }

    fn last_error(&self) -> String {
        self.state.lock().unwrap().last_error.clone()
    }

    fn price(&self, _symbol: &Symbol) -> Option<Price> {
        Some(self.state.lock().unwrap().fill_price)
    }

    fn depth(&self, _symbol: &Symbol, _limit: usize) -> Option<DepthUpdate> {
        None
    }

    fn klines(&self, _symbol: &Symbol, _interval: &str, _limit: usize) -> Vec<Kline> {
        Vec::new()
    }

    fn subscribe_depth(&self, _symbol: &Symbol, callback: DepthCallback) {
        *self.depth_callback.lock().unwrap() = Some(callback);
    }

    fn subscribe_trades(&self, _symbol: &Symbol, _callback: TradeCallback) {}

    fn subscribe_klines(&self, _symbol: &Symbol, _interval: &str, _callback: KlineCallback) {}

    fn unsubscribe(&self, _symbol: &Symbol) {
        *self.depth_callback.lock().unwrap() = None;
    }

    fn on_error(&self, callback: ErrorCallback) {
        *self.error_callback.lock().unwrap() = Some(callback);
    }

    fn on_reconnect(&self, _callback: ConnectCallback) {}

    fn on_ws_connect(&self, callback: ConnectCallback) {
        *self.ws_connect_callback.lock().unwrap() = Some(callback);
    }

    fn start(&self) {
        self.connected.store(true, Ordering::Release);
        if let Some(callback) = self.ws_connect_callback.lock().unwrap().as_ref() {
            callback();
        }
    }

    fn stop(&self) {
        self.connected.store(false, Ordering::Release);
    }

    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::Acquire)
    }
}
