//! Dining Table Repository

use super::{DiningTableRepository, RepoError, RepoResult};
use async_trait::async_trait;
use shared::models::DiningTable;
use sqlx::SqlitePool;

#[derive(Clone, Debug)]
pub struct SqliteDiningTableRepository {
    pool: SqlitePool,
}

impl SqliteDiningTableRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl DiningTableRepository for SqliteDiningTableRepository {
    async fn create(
        &self,
        id: i64,
        name: &str,
        capacity: i32,
        created_at: i64,
    ) -> RepoResult<DiningTable> {
        sqlx::query_as::<_, DiningTable>(
            "INSERT INTO dining_tables (id, name, capacity, created_at) VALUES (?, ?, ?, ?) RETURNING id, name, capacity, created_at",
        )
        .bind(id)
        .bind(name)
        .bind(capacity)
        .bind(created_at)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| match RepoError::from(e) {
            RepoError::Duplicate(_) => RepoError::Duplicate(format!("Table '{name}' already exists")),
            other => other,
        })
    }

    async fn find_by_id(&self, id: i64) -> RepoResult<Option<DiningTable>> {
        let table = sqlx::query_as::<_, DiningTable>(
            "SELECT id, name, capacity, created_at FROM dining_tables WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(table)
    }

    async fn find_all(&self) -> RepoResult<Vec<DiningTable>> {
        let tables = sqlx::query_as::<_, DiningTable>(
            "SELECT id, name, capacity, created_at FROM dining_tables ORDER BY name COLLATE NOCASE",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(tables)
    }

    async fn is_available(&self, id: i64) -> RepoResult<bool> {
        let live: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM dining_sessions WHERE table_id = ? AND status IN ('active', 'pending')",
        )
        .bind(id)
        .fetch_one(&self.pool)
        .await?;
        Ok(live == 0)
    }

    async fn delete(&self, id: i64) -> RepoResult<()> {
        if !self.is_available(id).await? {
            return Err(RepoError::Duplicate(format!("Table {id} hosts a live session")));
        }
        let result = sqlx::query("DELETE FROM dining_tables WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| match RepoError::from(e) {
                RepoError::Referenced(_) => {
                    RepoError::Referenced(format!("Table {id} has session history"))
                }
                other => other,
            })?;
        if result.rows_affected() == 0 {
            return Err(RepoError::NotFound(format!("Table {id} not found")));
        }
        Ok(())
    }
}
