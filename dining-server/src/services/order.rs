//! Order lifecycle
//!
//! Orders start in `cart`, advance one step at a time to `served`, and may be
//! cancelled from any non-terminal status while they are younger than the
//! cancellation window. Lines can only change while the order is in `cart`;
//! adding an item that is already on the order merges the quantity.

use crate::core::deadline::Deadline;
use crate::db::repository::{MenuItemRepository, OrderRepository, RepoError, SessionRepository};
use crate::services::{insert_with_fresh_id, page_bounds};
use shared::error::{AppError, AppResult, ErrorCode};
use shared::models::{Order, OrderCreate, OrderItem, OrderStatus};
use shared::util::now_millis;
use std::sync::Arc;
use std::time::Duration;

#[derive(Clone)]
pub struct OrderService {
    orders: Arc<dyn OrderRepository>,
    sessions: Arc<dyn SessionRepository>,
    menu_items: Arc<dyn MenuItemRepository>,
    cancel_window: Duration,
    /// Budget for operations started without an explicit deadline
    timeout: Duration,
    deadline: Option<Deadline>,
}

impl std::fmt::Debug for OrderService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OrderService")
            .field("cancel_window", &self.cancel_window)
            .field("timeout", &self.timeout)
            .field("deadline", &self.deadline)
            .finish()
    }
}

fn order_not_found(id: i64) -> AppError {
    AppError::new(ErrorCode::OrderNotFound).with_detail("order_id", id)
}

fn not_in_cart(order_id: i64, status: OrderStatus) -> AppError {
    AppError::new(ErrorCode::OrderNotInCart)
        .with_detail("order_id", order_id)
        .with_detail("status", status.as_str())
}

impl OrderService {
    pub fn new(
        orders: Arc<dyn OrderRepository>,
        sessions: Arc<dyn SessionRepository>,
        menu_items: Arc<dyn MenuItemRepository>,
        cancel_window: Duration,
        timeout: Duration,
    ) -> Self {
        Self {
            orders,
            sessions,
            menu_items,
            cancel_window,
            timeout,
            deadline: None,
        }
    }

    /// Handle whose operations all run against `deadline`
    pub fn with_deadline(&self, deadline: Deadline) -> Self {
        Self {
            deadline: Some(deadline),
            ..self.clone()
        }
    }

    fn budget(&self) -> Deadline {
        self.deadline
            .clone()
            .unwrap_or_else(|| Deadline::after(self.timeout))
    }

    /// Open an empty `cart` order on an existing session
    pub async fn create_order(&self, session_id: i64) -> AppResult<Order> {
        let deadline = self.budget();
        let session = deadline
            .run("load session", self.sessions.find_by_id(session_id))
            .await?;
        if session.is_none() {
            return Err(AppError::new(ErrorCode::SessionNotFound).with_detail("session_id", session_id));
        }

        let created_at = now_millis();
        let order = deadline
            .run("create order", async {
                insert_with_fresh_id(|id| {
                    self.orders.create(OrderCreate {
                        id,
                        session_id,
                        created_at,
                    })
                })
                .await
                .map_err(|e| match e {
                    // Session deleted in between
                    RepoError::Referenced(_) => {
                        AppError::new(ErrorCode::SessionNotFound).with_detail("session_id", session_id)
                    }
                    other => other.into(),
                })
            })
            .await?;

        tracing::info!(order_id = order.id, session_id, "Order created");
        Ok(order)
    }

    /// Add `quantity` of a menu item, merging into an existing line
    pub async fn add_order_item(
        &self,
        order_id: i64,
        menu_item_id: i64,
        quantity: i64,
    ) -> AppResult<OrderItem> {
        if quantity <= 0 {
            return Err(AppError::validation("quantity must be positive").with_detail("quantity", quantity));
        }

        let deadline = self.budget();
        let order = self.load(&deadline, order_id).await?;
        if order.status != OrderStatus::Cart {
            return Err(not_in_cart(order_id, order.status));
        }

        let menu_item = deadline
            .run("load menu item", self.menu_items.find_by_id(menu_item_id))
            .await?
            .ok_or_else(|| {
                AppError::new(ErrorCode::MenuItemNotFound).with_detail("menu_item_id", menu_item_id)
            })?;
        if !menu_item.is_available {
            tracing::warn!(order_id, menu_item_id, "Menu item out of stock");
            return Err(AppError::new(ErrorCode::ProductOutOfStock)
                .with_detail("menu_item_id", menu_item_id)
                .with_detail("name", menu_item.name));
        }

        let upserted = deadline
            .run("add order item", async {
                insert_with_fresh_id(|id| self.orders.upsert_item(id, order_id, menu_item_id, quantity))
                    .await
                    .map_err(|e| match e {
                        RepoError::Referenced(_) => AppError::new(ErrorCode::MenuItemNotFound)
                            .with_detail("menu_item_id", menu_item_id),
                        other => other.into(),
                    })
            })
            .await?;

        match upserted {
            Some(item) => {
                tracing::info!(
                    order_id,
                    menu_item_id,
                    added = quantity,
                    quantity = item.quantity,
                    "Order item added"
                );
                Ok(item)
            }
            // The order left `cart` after it was read
            None => {
                let status = self.load(&deadline, order_id).await?.status;
                Err(not_in_cart(order_id, status))
            }
        }
    }

    /// Remove a line from a `cart` order
    pub async fn remove_order_item(&self, order_id: i64, item_id: i64) -> AppResult<()> {
        let deadline = self.budget();
        let order = self.load(&deadline, order_id).await?;
        if order.status != OrderStatus::Cart {
            return Err(not_in_cart(order_id, order.status));
        }

        let removed = deadline
            .run("remove order item", self.orders.remove_item(order_id, item_id))
            .await?;
        if !removed {
            let status = self.load(&deadline, order_id).await?.status;
            if status != OrderStatus::Cart {
                return Err(not_in_cart(order_id, status));
            }
            return Err(AppError::new(ErrorCode::OrderItemNotFound)
                .with_detail("order_id", order_id)
                .with_detail("item_id", item_id));
        }

        tracing::info!(order_id, item_id, "Order item removed");
        Ok(())
    }

    /// Cancel (within the window) or advance one step
    pub async fn update_order_status(&self, order_id: i64, status: OrderStatus) -> AppResult<Order> {
        let deadline = self.budget();
        let order = self.load(&deadline, order_id).await?;
        self.check_transition(&order, status, now_millis())?;

        let updated = deadline
            .run(
                "update order status",
                self.orders.update_status(order_id, order.status, status),
            )
            .await?
            .ok_or_else(|| {
                AppError::new(ErrorCode::OrderStatusChanged)
                    .with_detail("order_id", order_id)
                    .with_detail("expected", order.status.as_str())
            })?;

        tracing::info!(order_id, from = %order.status, to = %updated.status, "Order status changed");
        Ok(updated)
    }

    fn check_transition(&self, order: &Order, target: OrderStatus, now: i64) -> AppResult<()> {
        let invalid = || {
            AppError::new(ErrorCode::OrderInvalidTransition)
                .with_detail("order_id", order.id)
                .with_detail("from", order.status.as_str())
                .with_detail("to", target.as_str())
        };

        if order.status.is_terminal() {
            return Err(invalid());
        }

        if target == OrderStatus::Cancelled {
            let age_ms = now.saturating_sub(order.created_at);
            let window_ms = i64::try_from(self.cancel_window.as_millis()).unwrap_or(i64::MAX);
            if age_ms > window_ms {
                tracing::warn!(order_id = order.id, age_ms, "Cancellation window expired");
                return Err(AppError::new(ErrorCode::OrderCancelWindowExpired)
                    .with_detail("order_id", order.id)
                    .with_detail("age_ms", age_ms));
            }
            return Ok(());
        }

        if order.status.next_forward() != Some(target) {
            return Err(invalid());
        }
        Ok(())
    }

    pub async fn get_order_items(&self, order_id: i64) -> AppResult<Vec<OrderItem>> {
        let deadline = self.budget();
        self.load(&deadline, order_id).await?;
        deadline
            .run("list order items", self.orders.find_items(order_id))
            .await
    }

    pub async fn get_orders_by_session(&self, session_id: i64) -> AppResult<Vec<Order>> {
        self.budget()
            .run("list session orders", self.orders.find_by_session(session_id))
            .await
    }

    /// Every line of every order on the session
    pub async fn get_order_items_by_session(&self, session_id: i64) -> AppResult<Vec<OrderItem>> {
        let deadline = self.budget();
        let orders = deadline
            .run("list session orders", self.orders.find_by_session(session_id))
            .await?;
        let ids: Vec<i64> = orders.iter().map(|o| o.id).collect();
        deadline
            .run("list session order items", self.orders.find_items_by_orders(&ids))
            .await
    }

    /// Newest first
    pub async fn list_orders(&self, limit: i64, offset: i64) -> AppResult<Vec<Order>> {
        let (offset, limit) = page_bounds(offset, limit)?;
        self.budget()
            .run("list orders", self.orders.find_page(offset, limit))
            .await
    }

    async fn load(&self, deadline: &Deadline, id: i64) -> AppResult<Order> {
        deadline
            .run("load order", self.orders.find_by_id(id))
            .await?
            .ok_or_else(|| order_not_found(id))
    }
}
