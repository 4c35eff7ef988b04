// src/trading/order_manager.rs
// Order lifecycle management, including bracket orders

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use crate::domain::models::{OrderInfo, OrderRequest};
use crate::domain::types::{OrderType, Price, Quantity, Side, Symbol, TimeInForce};
use crate::exchange::client::ExchangeClient;

/// Outcome of a bracket placement. Any leg can be missing; the engine
/// decides whether the partial state needs an emergency close.
#[derive(Debug, Clone, Default)]
pub struct BracketOrderResult {
    pub entry_order: Option<OrderInfo>,
    pub stop_loss_order: Option<OrderInfo>,
    pub take_profit_order: Option<OrderInfo>,
}

impl BracketOrderResult {
    /// True when the entry filled but at least one protective leg is absent.
    pub fn is_unprotected(&self) -> bool {
        self.entry_order.is_some()
            && (self.stop_loss_order.is_none() || self.take_profit_order.is_none())
    }
}

pub struct OrderManager<C: ExchangeClient> {
    client: Arc<C>,
    pending_orders: Mutex<HashMap<i64, OrderInfo>>,
    order_counter: AtomicU64,
}

impl<C: ExchangeClient> OrderManager<C> {
    pub fn new(client: Arc<C>) -> Self {
        OrderManager {
            client,
            pending_orders: Mutex::new(HashMap::new()),
            order_counter: AtomicU64::new(0),
        }
    }

    pub fn place_market_order(
        &self,
        symbol: Symbol,
        side: Side,
        quantity: Quantity,
    ) -> Option<OrderInfo> {
        let mut request = OrderRequest::market(symbol, side, quantity);
        request.client_order_id = self.generate_client_order_id();
        self.submit(request)
    }

    pub fn place_limit_order(
        &self,
        symbol: Symbol,
        side: Side,
        quantity: Quantity,
        price: Price,
        time_in_force: TimeInForce,
    ) -> Option<OrderInfo> {
        let mut request = OrderRequest::limit(symbol, side, quantity, price);
        request.time_in_force = time_in_force;
        request.client_order_id = self.generate_client_order_id();
        self.submit(request)
    }

    /// Close an open position with a reduce-only market order. Used for the
    /// emergency unwind after a partial bracket.
    pub fn place_reduce_only_market(
        &self,
        symbol: Symbol,
        side: Side,
        quantity: Quantity,
    ) -> Option<OrderInfo> {
        let mut request = OrderRequest::market(symbol, side, quantity);
        request.reduce_only = true;
        request.client_order_id = self.generate_client_order_id();
        self.submit(request)
    }

    /// Place an entry plus its protective stop-loss and take-profit.
    ///
    /// The entry goes first; if it fails nothing else is attempted. Both
    /// protective legs are reduce-only closes of the full quantity on the
    /// opposite side and share the entry's client-order-id base.
    pub fn place_bracket_order(
        &self,
        symbol: Symbol,
        side: Side,
        quantity: Quantity,
        stop_loss_price: Price,
        take_profit_price: Price,
    ) -> BracketOrderResult {
        let mut result = BracketOrderResult::default();
        let base_id = self.generate_client_order_id();

        log::info!(
            "Placing bracket: {} {} {} SL {} TP {}",
            side,
            quantity,
            symbol,
            stop_loss_price,
            take_profit_price
        );

        let mut entry = OrderRequest::market(symbol, side, quantity);
        entry.client_order_id = base_id.clone();
        result.entry_order = self.submit(entry);

        let Some(entry_order) = result.entry_order.as_ref() else {
            log::error!("Bracket entry failed, aborting: {}", self.client.last_error());
            return result;
        };
        log::info!("Entry filled at {}", entry_order.price);

        let close_side = side.opposite();

        let mut sl_request = OrderRequest::market(symbol, close_side, quantity);
        sl_request.order_type = OrderType::StopMarket;
        sl_request.stop_price = stop_loss_price;
        sl_request.reduce_only = true;
        sl_request.client_order_id = format!("{}_SL", base_id);
        result.stop_loss_order = self.submit(sl_request);
        if result.stop_loss_order.is_none() {
            log::error!("Stop loss placement failed: {}", self.client.last_error());
        }

        let mut tp_request = OrderRequest::market(symbol, close_side, quantity);
        tp_request.order_type = OrderType::TakeProfitMarket;
        tp_request.stop_price = take_profit_price;
        tp_request.reduce_only = true;
        tp_request.client_order_id = format!("{}_TP", base_id);
        result.take_profit_order = self.submit(tp_request);
        if result.take_profit_order.is_none() {
            log::error!("Take profit placement failed: {}", self.client.last_error());
        }

        result
    }

    pub fn cancel_order(&self, symbol: Symbol, order_id: i64) -> bool {
        let success = self.client.cancel_order(&symbol, order_id);
        if success {
            self.pending_orders.lock().unwrap().remove(&order_id);
        }
        success
    }

    pub fn cancel_all_orders(&self, symbol: Symbol) -> bool {
        let success = self.client.cancel_all_orders(&symbol);
        if success {
            self.pending_orders.lock().unwrap().clear();
        }
        success
    }

    pub fn pending_orders(&self) -> Vec<OrderInfo> {
        self.pending_orders
            .lock()
            .unwrap()
            .values()
            .cloned()
            .collect()
    }

    /// Replace the local pending map with the exchange's open orders.
    pub fn sync_orders(&self, symbol: Symbol) {
        let open_orders = self.client.open_orders(Some(&symbol));

        let mut pending = self.pending_orders.lock().unwrap();
        pending.clear();
        for order in open_orders {
            pending.insert(order.order_id, order);
        }
    }

    fn submit(&self, request: OrderRequest) -> Option<OrderInfo> {
        let result = self.client.place_order(&request);
        if let Some(info) = result.as_ref() {
            self.pending_orders
                .lock()
                .unwrap()
                .insert(info.order_id, info.clone());
        }
        result
    }

    fn generate_client_order_id(&self) -> String {
        format!("obi_{}", self.order_counter.fetch_add(1, Ordering::Relaxed) + 1)
    }
}
