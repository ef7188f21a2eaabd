//! Repository Module
//!
//! Persistence contract consumed by the lifecycle services, plus the SQLite
//! implementations. Every failure leaves this layer classified as a
//! [`RepoError`] kind; no sqlx type crosses the boundary.

pub mod category;
pub mod dining_table;
pub mod menu_item;
pub mod order;
pub mod session;

// Re-exports
pub use category::SqliteCategoryRepository;
pub use dining_table::SqliteDiningTableRepository;
pub use menu_item::SqliteMenuItemRepository;
pub use order::SqliteOrderRepository;
pub use session::SqliteSessionRepository;

use async_trait::async_trait;
use shared::error::{AppError, ErrorCode};
use shared::models::{
    Category, DiningTable, MenuItem, Order, OrderCreate, OrderItem, OrderStatus, Session,
    SessionReserve, SessionStatus,
};
use thiserror::Error;

/// SQLite extended result code for a primary key (rowid) collision
const SQLITE_CONSTRAINT_PRIMARYKEY: &str = "1555";

/// Repository error types
#[derive(Debug, Error)]
pub enum RepoError {
    #[error("Not found: {0}")]
    NotFound(String),

    /// Uniqueness or availability conflict
    #[error("Duplicate: {0}")]
    Duplicate(String),

    /// Generated primary key already in use; retry with a fresh id
    #[error("Id conflict: {0}")]
    IdConflict(String),

    /// Missing referenced row, or a delete blocked by a referencing row
    #[error("Referenced: {0}")]
    Referenced(String),

    #[error("Database error: {0}")]
    Database(String),
}

impl From<sqlx::Error> for RepoError {
    fn from(err: sqlx::Error) -> Self {
        match &err {
            sqlx::Error::RowNotFound => RepoError::NotFound(err.to_string()),
            sqlx::Error::Database(db_err)
                if db_err.code().as_deref() == Some(SQLITE_CONSTRAINT_PRIMARYKEY) =>
            {
                RepoError::IdConflict(db_err.message().to_string())
            }
            sqlx::Error::Database(db_err) if db_err.is_unique_violation() => {
                RepoError::Duplicate(db_err.message().to_string())
            }
            sqlx::Error::Database(db_err) if db_err.is_foreign_key_violation() => {
                RepoError::Referenced(db_err.message().to_string())
            }
            _ => RepoError::Database(err.to_string()),
        }
    }
}

impl From<RepoError> for AppError {
    fn from(err: RepoError) -> Self {
        match err {
            RepoError::NotFound(msg) => AppError::with_message(ErrorCode::NotFound, msg),
            RepoError::Duplicate(msg) => AppError::with_message(ErrorCode::AlreadyExists, msg),
            RepoError::IdConflict(msg) => {
                tracing::error!(target: "database", error = %msg, "Generated id collided");
                AppError::database(msg)
            }
            RepoError::Referenced(msg) => AppError::with_message(ErrorCode::ResourceInUse, msg),
            RepoError::Database(msg) => {
                tracing::error!(target: "database", error = %msg, "Database error occurred");
                AppError::database(msg)
            }
        }
    }
}

/// Result type for repository operations
pub type RepoResult<T> = Result<T, RepoError>;

/// Dining tables
#[async_trait]
pub trait DiningTableRepository: Send + Sync {
    async fn create(&self, id: i64, name: &str, capacity: i32, created_at: i64)
    -> RepoResult<DiningTable>;
    async fn find_by_id(&self, id: i64) -> RepoResult<Option<DiningTable>>;
    async fn find_all(&self) -> RepoResult<Vec<DiningTable>>;
    /// True when no live session references the table
    async fn is_available(&self, id: i64) -> RepoResult<bool>;
    /// `Duplicate` while a live session occupies the table, `Referenced`
    /// while historical sessions reference it
    async fn delete(&self, id: i64) -> RepoResult<()>;
}

/// Dining sessions
#[async_trait]
pub trait SessionRepository: Send + Sync {
    /// Atomically create an `active` session on an available table
    ///
    /// `Duplicate` when the table already hosts a live session, `Referenced`
    /// when the table does not exist.
    async fn reserve(&self, data: SessionReserve) -> RepoResult<Session>;
    async fn find_by_id(&self, id: i64) -> RepoResult<Option<Session>>;
    /// Compare-and-set status change; `None` when the session is no longer
    /// in `expected`
    async fn update_status(
        &self,
        id: i64,
        expected: SessionStatus,
        status: SessionStatus,
        completed_at: Option<i64>,
    ) -> RepoResult<Option<Session>>;
    /// Atomically move a session to a table without a live session
    async fn change_table(&self, id: i64, table_id: i64) -> RepoResult<Session>;
    async fn delete(&self, id: i64) -> RepoResult<()>;
    async fn find_page(&self, offset: i64, limit: i64) -> RepoResult<Vec<Session>>;
    async fn find_by_statuses(&self, statuses: &[SessionStatus]) -> RepoResult<Vec<Session>>;
}

/// Orders and order items
#[async_trait]
pub trait OrderRepository: Send + Sync {
    async fn create(&self, data: OrderCreate) -> RepoResult<Order>;
    async fn find_by_id(&self, id: i64) -> RepoResult<Option<Order>>;
    /// Compare-and-set status change; `None` when the order is no longer in
    /// `expected`
    async fn update_status(
        &self,
        id: i64,
        expected: OrderStatus,
        status: OrderStatus,
    ) -> RepoResult<Option<Order>>;
    /// Insert a line or add `delta` to the existing (order, menu item) line
    ///
    /// Only applies while the order is in `cart`; `None` otherwise.
    async fn upsert_item(
        &self,
        new_id: i64,
        order_id: i64,
        menu_item_id: i64,
        delta: i64,
    ) -> RepoResult<Option<OrderItem>>;
    /// Remove a line while the order is in `cart`; `false` when nothing was
    /// removed
    async fn remove_item(&self, order_id: i64, item_id: i64) -> RepoResult<bool>;
    async fn find_items(&self, order_id: i64) -> RepoResult<Vec<OrderItem>>;
    async fn find_items_by_orders(&self, order_ids: &[i64]) -> RepoResult<Vec<OrderItem>>;
    async fn find_by_session(&self, session_id: i64) -> RepoResult<Vec<Order>>;
    async fn find_page(&self, offset: i64, limit: i64) -> RepoResult<Vec<Order>>;
}

/// Menu categories
#[async_trait]
pub trait CategoryRepository: Send + Sync {
    /// Case-insensitive lookup
    async fn find_by_name(&self, name: &str) -> RepoResult<Option<Category>>;
    /// `Duplicate` when the name is taken
    async fn insert(&self, id: i64, name: &str, created_at: i64) -> RepoResult<Category>;
    async fn rename(&self, old_name: &str, new_name: &str) -> RepoResult<Category>;
    /// `Referenced` while a menu item belongs to the category
    async fn delete(&self, name: &str) -> RepoResult<()>;
    async fn find_by_id(&self, id: i64) -> RepoResult<Option<Category>>;
    async fn find_all(&self) -> RepoResult<Vec<Category>>;
}

/// Menu items
#[async_trait]
pub trait MenuItemRepository: Send + Sync {
    async fn create(&self, item: MenuItem) -> RepoResult<MenuItem>;
    async fn find_by_id(&self, id: i64) -> RepoResult<Option<MenuItem>>;
    async fn set_availability(&self, id: i64, is_available: bool) -> RepoResult<MenuItem>;
    async fn find_by_category(&self, category_id: i64) -> RepoResult<Vec<MenuItem>>;
}

#[cfg(test)]
pub(crate) mod test_support {
    //! Fixtures shared by repository and service tests

    use crate::db::DbService;
    use shared::util::now_millis;

    pub async fn memory_db() -> DbService {
        DbService::open_in_memory().await.unwrap()
    }

    pub async fn seed_table(db: &DbService, id: i64) {
        sqlx::query("INSERT INTO dining_tables (id, name, capacity, created_at) VALUES (?, ?, 4, ?)")
            .bind(id)
            .bind(format!("T{id}"))
            .bind(now_millis())
            .execute(&db.pool)
            .await
            .unwrap();
    }

    pub async fn seed_menu_item(db: &DbService, id: i64, is_available: bool) {
        let category_id = id + 10_000;
        sqlx::query(
            "INSERT OR IGNORE INTO categories (id, name, name_key, created_at) VALUES (?, ?, ?, ?)",
        )
        .bind(category_id)
        .bind(format!("seed-{category_id}"))
        .bind(format!("seed-{category_id}"))
        .bind(now_millis())
        .execute(&db.pool)
        .await
        .unwrap();
        sqlx::query(
            "INSERT INTO menu_items (id, name, category_id, price, is_available, created_at) VALUES (?, ?, ?, 9.5, ?, ?)",
        )
        .bind(id)
        .bind(format!("item-{id}"))
        .bind(category_id)
        .bind(is_available)
        .bind(now_millis())
        .execute(&db.pool)
        .await
        .unwrap();
    }
}
