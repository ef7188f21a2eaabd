//! Dining session lifecycle
//!
//! Sessions are created only by reserving an available table and change only
//! through status transitions or table moves. Table exclusivity is enforced
//! by the repository's atomic `reserve` / `change_table`; this layer never
//! composes a separate availability check with a write.

use crate::cache::TtlCache;
use crate::core::deadline::Deadline;
use crate::db::repository::{RepoError, SessionRepository};
use crate::services::{insert_with_fresh_id, page_bounds};
use shared::error::{AppError, AppResult, ErrorCode};
use shared::models::{Session, SessionReserve, SessionStatus};
use shared::util::now_millis;
use std::sync::Arc;
use std::time::Duration;

#[derive(Clone)]
pub struct SessionService {
    sessions: Arc<dyn SessionRepository>,
    /// Read-through cache for `get_session`, keyed by session id
    cache: Arc<TtlCache<Session>>,
    /// Budget for operations started without an explicit deadline
    timeout: Duration,
    deadline: Option<Deadline>,
}

impl std::fmt::Debug for SessionService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionService")
            .field("cached", &self.cache.size())
            .field("timeout", &self.timeout)
            .field("deadline", &self.deadline)
            .finish()
    }
}

fn session_not_found(id: i64) -> AppError {
    AppError::new(ErrorCode::SessionNotFound).with_detail("session_id", id)
}

/// Classify a failed table claim (reserve or move)
fn table_claim_error(err: RepoError, table_id: i64) -> AppError {
    match err {
        RepoError::Duplicate(_) => {
            AppError::new(ErrorCode::TableOccupied).with_detail("table_id", table_id)
        }
        RepoError::Referenced(_) => {
            AppError::new(ErrorCode::TableNotFound).with_detail("table_id", table_id)
        }
        other => other.into(),
    }
}

impl SessionService {
    pub fn new(
        sessions: Arc<dyn SessionRepository>,
        cache: Arc<TtlCache<Session>>,
        timeout: Duration,
    ) -> Self {
        Self {
            sessions,
            cache,
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

    /// One budget per operation, shared by all of its persistence calls
    fn budget(&self) -> Deadline {
        self.deadline
            .clone()
            .unwrap_or_else(|| Deadline::after(self.timeout))
    }

    /// Reserve `table_id` and open an `active` session on it
    pub async fn create_session(&self, table_id: i64) -> AppResult<Session> {
        if table_id <= 0 {
            return Err(AppError::validation("table_id must be positive").with_detail("table_id", table_id));
        }

        let created_at = now_millis();
        let session = self
            .budget()
            .run("reserve table", async {
                insert_with_fresh_id(|id| {
                    self.sessions.reserve(SessionReserve {
                        id,
                        table_id,
                        created_at,
                    })
                })
                .await
                .map_err(|e| table_claim_error(e, table_id))
            })
            .await
            .inspect_err(|e| {
                if e.code == ErrorCode::TableOccupied {
                    tracing::warn!(table_id, "Table already hosts a live session");
                }
            })?;

        tracing::info!(session_id = session.id, table_id, "Session created");
        Ok(session)
    }

    pub async fn get_session(&self, id: i64) -> AppResult<Session> {
        let key = id.to_string();
        if let Some(session) = self.cache.get(&key) {
            tracing::debug!(session_id = id, "Session cache hit");
            return Ok(session);
        }

        // Read before loading: a mutation that lands mid-load voids the fill
        let epoch = self.cache.epoch();
        let session = self.load(&self.budget(), id).await?;
        if !self.cache.set_if_unchanged(key, session.clone(), epoch) {
            tracing::debug!(session_id = id, "Session changed during load, not cached");
        }
        Ok(session)
    }

    /// Apply a status transition from the fixed transition table
    ///
    /// Moving to `completed` stamps `completed_at`; every other transition
    /// clears it.
    pub async fn update_session_status(&self, id: i64, status: SessionStatus) -> AppResult<Session> {
        let deadline = self.budget();
        let current = self.load(&deadline, id).await?;

        if !current.status.can_transition_to(status) {
            return Err(AppError::new(ErrorCode::SessionInvalidTransition)
                .with_detail("session_id", id)
                .with_detail("from", current.status.as_str())
                .with_detail("to", status.as_str()));
        }

        let completed_at = (status == SessionStatus::Completed).then(now_millis);
        let updated = deadline
            .run(
                "update session status",
                self.sessions.update_status(id, current.status, status, completed_at),
            )
            .await?;
        self.invalidate(id);

        // Lost a race against another transition (or a delete)
        let session = updated.ok_or_else(|| {
            AppError::new(ErrorCode::SessionStatusChanged)
                .with_detail("session_id", id)
                .with_detail("expected", current.status.as_str())
        })?;

        tracing::info!(
            session_id = id,
            from = %current.status,
            to = %session.status,
            "Session status changed"
        );
        Ok(session)
    }

    /// Move a live session to another available table
    pub async fn change_table(&self, id: i64, table_id: i64) -> AppResult<Session> {
        let deadline = self.budget();
        let current = self.load(&deadline, id).await?;
        if current.table_id == table_id {
            return Ok(current);
        }
        if current.status.is_terminal() {
            return Err(AppError::with_message(
                ErrorCode::SessionInvalidTransition,
                "closed sessions cannot change table",
            )
            .with_detail("session_id", id)
            .with_detail("status", current.status.as_str()));
        }

        let result = deadline
            .run("change table", async {
                self.sessions
                    .change_table(id, table_id)
                    .await
                    .map_err(|e| match e {
                        RepoError::NotFound(_) => session_not_found(id),
                        other => table_claim_error(other, table_id),
                    })
            })
            .await;
        self.invalidate(id);

        let session = result?;
        tracing::info!(
            session_id = id,
            from_table = current.table_id,
            to_table = table_id,
            "Session moved"
        );
        Ok(session)
    }

    /// Delete a session in any status
    ///
    /// A session that still owns orders cannot be deleted.
    pub async fn delete_session(&self, id: i64) -> AppResult<()> {
        let deadline = self.budget();
        let current = self.load(&deadline, id).await?;
        if current.status.is_live() {
            tracing::warn!(
                session_id = id,
                table_id = current.table_id,
                status = %current.status,
                "Deleting a live session"
            );
        }

        let result = deadline
            .run("delete session", async {
                self.sessions.delete(id).await.map_err(|e| match e {
                    RepoError::NotFound(_) => session_not_found(id),
                    RepoError::Referenced(_) => {
                        AppError::new(ErrorCode::SessionHasOrders).with_detail("session_id", id)
                    }
                    other => other.into(),
                })
            })
            .await;
        self.invalidate(id);
        result?;

        tracing::info!(session_id = id, "Session deleted");
        Ok(())
    }

    /// Newest first
    pub async fn list_sessions(&self, offset: i64, limit: i64) -> AppResult<Vec<Session>> {
        let (offset, limit) = page_bounds(offset, limit)?;
        self.budget()
            .run("list sessions", self.sessions.find_page(offset, limit))
            .await
    }

    pub async fn list_active_sessions(&self) -> AppResult<Vec<Session>> {
        self.budget()
            .run(
                "list active sessions",
                self.sessions.find_by_statuses(&[SessionStatus::Active]),
            )
            .await
    }

    async fn load(&self, deadline: &Deadline, id: i64) -> AppResult<Session> {
        deadline
            .run("load session", self.sessions.find_by_id(id))
            .await?
            .ok_or_else(|| session_not_found(id))
    }

    fn invalidate(&self, id: i64) {
        self.cache.delete(&id.to_string());
    }
}
