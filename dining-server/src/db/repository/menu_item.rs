//! Menu Item Repository

use super::{MenuItemRepository, RepoError, RepoResult};
use async_trait::async_trait;
use shared::models::MenuItem;
use sqlx::SqlitePool;

const MENU_ITEM_COLUMNS: &str = "id, name, category_id, price, is_available, created_at";

#[derive(Clone, Debug)]
pub struct SqliteMenuItemRepository {
    pool: SqlitePool,
}

impl SqliteMenuItemRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl MenuItemRepository for SqliteMenuItemRepository {
    async fn create(&self, item: MenuItem) -> RepoResult<MenuItem> {
        let sql = format!(
            "INSERT INTO menu_items ({MENU_ITEM_COLUMNS}) VALUES (?, ?, ?, ?, ?, ?) RETURNING {MENU_ITEM_COLUMNS}"
        );
        sqlx::query_as::<_, MenuItem>(&sql)
            .bind(item.id)
            .bind(&item.name)
            .bind(item.category_id)
            .bind(item.price)
            .bind(item.is_available)
            .bind(item.created_at)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| match RepoError::from(e) {
                RepoError::Referenced(_) => {
                    RepoError::Referenced(format!("Category {} does not exist", item.category_id))
                }
                other => other,
            })
    }

    async fn find_by_id(&self, id: i64) -> RepoResult<Option<MenuItem>> {
        let sql = format!("SELECT {MENU_ITEM_COLUMNS} FROM menu_items WHERE id = ?");
        let item = sqlx::query_as::<_, MenuItem>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(item)
    }

    async fn set_availability(&self, id: i64, is_available: bool) -> RepoResult<MenuItem> {
        let sql = format!(
            "UPDATE menu_items SET is_available = ? WHERE id = ? RETURNING {MENU_ITEM_COLUMNS}"
        );
        let item = sqlx::query_as::<_, MenuItem>(&sql)
            .bind(is_available)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        item.ok_or_else(|| RepoError::NotFound(format!("Menu item {id} not found")))
    }

    async fn find_by_category(&self, category_id: i64) -> RepoResult<Vec<MenuItem>> {
        let sql = format!(
            "SELECT {MENU_ITEM_COLUMNS} FROM menu_items WHERE category_id = ? ORDER BY name, id"
        );
        let items = sqlx::query_as::<_, MenuItem>(&sql)
            .bind(category_id)
            .fetch_all(&self.pool)
            .await?;
        Ok(items)
    }
}
