//! Order Repository

use super::{OrderRepository, RepoError, RepoResult};
use async_trait::async_trait;
use shared::models::{Order, OrderCreate, OrderItem, OrderStatus};
use sqlx::SqlitePool;

const ORDER_COLUMNS: &str = "id, session_id, status, created_at";
const ITEM_COLUMNS: &str = "id, order_id, menu_item_id, quantity";

#[derive(Clone, Debug)]
pub struct SqliteOrderRepository {
    pool: SqlitePool,
}

impl SqliteOrderRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl OrderRepository for SqliteOrderRepository {
    async fn create(&self, data: OrderCreate) -> RepoResult<Order> {
        let sql = format!(
            "INSERT INTO orders (id, session_id, status, created_at) VALUES (?, ?, 'cart', ?) RETURNING {ORDER_COLUMNS}"
        );
        sqlx::query_as::<_, Order>(&sql)
            .bind(data.id)
            .bind(data.session_id)
            .bind(data.created_at)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| match RepoError::from(e) {
                RepoError::Referenced(_) => {
                    RepoError::Referenced(format!("Session {} does not exist", data.session_id))
                }
                other => other,
            })
    }

    async fn find_by_id(&self, id: i64) -> RepoResult<Option<Order>> {
        let sql = format!("SELECT {ORDER_COLUMNS} FROM orders WHERE id = ?");
        let order = sqlx::query_as::<_, Order>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(order)
    }

    async fn update_status(
        &self,
        id: i64,
        expected: OrderStatus,
        status: OrderStatus,
    ) -> RepoResult<Option<Order>> {
        let sql = format!(
            "UPDATE orders SET status = ? WHERE id = ? AND status = ? RETURNING {ORDER_COLUMNS}"
        );
        let order = sqlx::query_as::<_, Order>(&sql)
            .bind(status)
            .bind(id)
            .bind(expected)
            .fetch_optional(&self.pool)
            .await?;
        Ok(order)
    }

    async fn upsert_item(
        &self,
        new_id: i64,
        order_id: i64,
        menu_item_id: i64,
        delta: i64,
    ) -> RepoResult<Option<OrderItem>> {
        // One statement: the cart check, the insert and the merge cannot interleave
        let sql = format!(
            "INSERT INTO order_items (id, order_id, menu_item_id, quantity) \
             SELECT ?1, ?2, ?3, ?4 WHERE EXISTS (SELECT 1 FROM orders WHERE id = ?2 AND status = 'cart') \
             ON CONFLICT (order_id, menu_item_id) DO UPDATE SET quantity = order_items.quantity + excluded.quantity \
             RETURNING {ITEM_COLUMNS}"
        );
        let item = sqlx::query_as::<_, OrderItem>(&sql)
            .bind(new_id)
            .bind(order_id)
            .bind(menu_item_id)
            .bind(delta)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| match RepoError::from(e) {
                RepoError::Referenced(_) => {
                    RepoError::Referenced(format!("Menu item {menu_item_id} does not exist"))
                }
                other => other,
            })?;
        Ok(item)
    }

    async fn remove_item(&self, order_id: i64, item_id: i64) -> RepoResult<bool> {
        let result = sqlx::query(
            "DELETE FROM order_items WHERE id = ?1 AND order_id = ?2 \
             AND EXISTS (SELECT 1 FROM orders WHERE id = ?2 AND status = 'cart')",
        )
        .bind(item_id)
        .bind(order_id)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn find_items(&self, order_id: i64) -> RepoResult<Vec<OrderItem>> {
        let sql = format!("SELECT {ITEM_COLUMNS} FROM order_items WHERE order_id = ? ORDER BY id");
        let items = sqlx::query_as::<_, OrderItem>(&sql)
            .bind(order_id)
            .fetch_all(&self.pool)
            .await?;
        Ok(items)
    }

    async fn find_items_by_orders(&self, order_ids: &[i64]) -> RepoResult<Vec<OrderItem>> {
        if order_ids.is_empty() {
            return Ok(Vec::new());
        }
        let placeholders = vec!["?"; order_ids.len()].join(", ");
        let sql = format!(
            "SELECT {ITEM_COLUMNS} FROM order_items WHERE order_id IN ({placeholders}) ORDER BY order_id, id"
        );
        let mut query = sqlx::query_as::<_, OrderItem>(&sql);
        for id in order_ids {
            query = query.bind(*id);
        }
        let items = query.fetch_all(&self.pool).await?;
        Ok(items)
    }

    async fn find_by_session(&self, session_id: i64) -> RepoResult<Vec<Order>> {
        let sql = format!(
            "SELECT {ORDER_COLUMNS} FROM orders WHERE session_id = ? ORDER BY created_at, id"
        );
        let orders = sqlx::query_as::<_, Order>(&sql)
            .bind(session_id)
            .fetch_all(&self.pool)
            .await?;
        Ok(orders)
    }

    async fn find_page(&self, offset: i64, limit: i64) -> RepoResult<Vec<Order>> {
        let sql = format!(
            "SELECT {ORDER_COLUMNS} FROM orders ORDER BY created_at DESC, id DESC LIMIT ? OFFSET ?"
        );
        let orders = sqlx::query_as::<_, Order>(&sql)
            .bind(limit)
            .bind(offset)
            .fetch_all(&self.pool)
            .await?;
        Ok(orders)
    }
}
