//! Dining Session Repository
//!
//! Table exclusivity is enforced by the partial unique index on live
//! sessions, so `reserve` and `change_table` are single atomic statements.

use super::{RepoError, RepoResult, SessionRepository};
use async_trait::async_trait;
use shared::models::{Session, SessionReserve, SessionStatus};
use sqlx::SqlitePool;

const SESSION_COLUMNS: &str = "id, table_id, status, created_at, completed_at";

#[derive(Clone, Debug)]
pub struct SqliteSessionRepository {
    pool: SqlitePool,
}

impl SqliteSessionRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    async fn table_exists(&self, table_id: i64) -> RepoResult<bool> {
        let found: Option<i64> = sqlx::query_scalar("SELECT id FROM dining_tables WHERE id = ?")
            .bind(table_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(found.is_some())
    }
}

#[async_trait]
impl SessionRepository for SqliteSessionRepository {
    async fn reserve(&self, data: SessionReserve) -> RepoResult<Session> {
        let sql = format!(
            "INSERT INTO dining_sessions (id, table_id, status, created_at, completed_at) VALUES (?, ?, 'active', ?, NULL) RETURNING {SESSION_COLUMNS}"
        );
        let result = sqlx::query_as::<_, Session>(&sql)
            .bind(data.id)
            .bind(data.table_id)
            .bind(data.created_at)
            .fetch_one(&self.pool)
            .await;

        match result {
            Ok(session) => Ok(session),
            Err(e) => match RepoError::from(e) {
                RepoError::Duplicate(_) => Err(RepoError::Duplicate(format!(
                    "Table {} already hosts a live session",
                    data.table_id
                ))),
                RepoError::Referenced(_) => Err(RepoError::Referenced(format!(
                    "Table {} does not exist",
                    data.table_id
                ))),
                other => Err(other),
            },
        }
    }

    async fn find_by_id(&self, id: i64) -> RepoResult<Option<Session>> {
        let sql = format!("SELECT {SESSION_COLUMNS} FROM dining_sessions WHERE id = ?");
        let session = sqlx::query_as::<_, Session>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(session)
    }

    async fn update_status(
        &self,
        id: i64,
        expected: SessionStatus,
        status: SessionStatus,
        completed_at: Option<i64>,
    ) -> RepoResult<Option<Session>> {
        let sql = format!(
            "UPDATE dining_sessions SET status = ?, completed_at = ? WHERE id = ? AND status = ? RETURNING {SESSION_COLUMNS}"
        );
        let session = sqlx::query_as::<_, Session>(&sql)
            .bind(status)
            .bind(completed_at)
            .bind(id)
            .bind(expected)
            .fetch_optional(&self.pool)
            .await?;
        Ok(session)
    }

    async fn change_table(&self, id: i64, table_id: i64) -> RepoResult<Session> {
        // Conditional write: the destination must not host another live session
        let sql = format!(
            "UPDATE dining_sessions SET table_id = ?1 WHERE id = ?2 AND NOT EXISTS (SELECT 1 FROM dining_sessions other WHERE other.table_id = ?1 AND other.id != ?2 AND other.status IN ('active', 'pending')) RETURNING {SESSION_COLUMNS}"
        );
        let result = sqlx::query_as::<_, Session>(&sql)
            .bind(table_id)
            .bind(id)
            .fetch_optional(&self.pool)
            .await;

        match result {
            Ok(Some(session)) => Ok(session),
            Ok(None) => {
                // Nothing updated: classify why
                if self.find_by_id(id).await?.is_none() {
                    Err(RepoError::NotFound(format!("Session {id} not found")))
                } else if !self.table_exists(table_id).await? {
                    Err(RepoError::Referenced(format!("Table {table_id} does not exist")))
                } else {
                    Err(RepoError::Duplicate(format!(
                        "Table {table_id} already hosts a live session"
                    )))
                }
            }
            Err(e) => match RepoError::from(e) {
                RepoError::Duplicate(_) => Err(RepoError::Duplicate(format!(
                    "Table {table_id} already hosts a live session"
                ))),
                RepoError::Referenced(_) => Err(RepoError::Referenced(format!(
                    "Table {table_id} does not exist"
                ))),
                other => Err(other),
            },
        }
    }

    async fn delete(&self, id: i64) -> RepoResult<()> {
        let result = sqlx::query("DELETE FROM dining_sessions WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| match RepoError::from(e) {
                RepoError::Referenced(_) => {
                    RepoError::Referenced(format!("Session {id} still owns orders"))
                }
                other => other,
            })?;

        if result.rows_affected() == 0 {
            return Err(RepoError::NotFound(format!("Session {id} not found")));
        }
        Ok(())
    }

    async fn find_page(&self, offset: i64, limit: i64) -> RepoResult<Vec<Session>> {
        let sql = format!(
            "SELECT {SESSION_COLUMNS} FROM dining_sessions ORDER BY created_at DESC, id DESC LIMIT ? OFFSET ?"
        );
        let sessions = sqlx::query_as::<_, Session>(&sql)
            .bind(limit)
            .bind(offset)
            .fetch_all(&self.pool)
            .await?;
        Ok(sessions)
    }

    async fn find_by_statuses(&self, statuses: &[SessionStatus]) -> RepoResult<Vec<Session>> {
        if statuses.is_empty() {
            return Ok(Vec::new());
        }
        let placeholders = vec!["?"; statuses.len()].join(", ");
        let sql = format!(
            "SELECT {SESSION_COLUMNS} FROM dining_sessions WHERE status IN ({placeholders}) ORDER BY created_at, id"
        );
        let mut query = sqlx::query_as::<_, Session>(&sql);
        for status in statuses {
            query = query.bind(*status);
        }
        let sessions = query.fetch_all(&self.pool).await?;
        Ok(sessions)
    }
}
