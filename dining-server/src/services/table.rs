//! Dining table management

use crate::core::deadline::Deadline;
use crate::db::repository::{DiningTableRepository, RepoError};
use crate::services::insert_with_fresh_id;
use shared::error::{AppError, AppResult, ErrorCode};
use shared::models::{DiningTable, DiningTableCreate};
use shared::util::now_millis;
use std::sync::Arc;
use std::time::Duration;

const DEFAULT_CAPACITY: i32 = 4;

#[derive(Clone)]
pub struct TableService {
    tables: Arc<dyn DiningTableRepository>,
    timeout: Duration,
    deadline: Option<Deadline>,
}

impl std::fmt::Debug for TableService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TableService")
            .field("timeout", &self.timeout)
            .field("deadline", &self.deadline)
            .finish()
    }
}

fn table_not_found(id: i64) -> AppError {
    AppError::new(ErrorCode::TableNotFound).with_detail("table_id", id)
}

impl TableService {
    pub fn new(tables: Arc<dyn DiningTableRepository>, timeout: Duration) -> Self {
        Self {
            tables,
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

    pub async fn create_table(&self, data: DiningTableCreate) -> AppResult<DiningTable> {
        let name = data.name.trim();
        if name.is_empty() {
            return Err(AppError::validation("table name must not be empty"));
        }
        let capacity = data.capacity.unwrap_or(DEFAULT_CAPACITY);
        if capacity <= 0 {
            return Err(AppError::new(ErrorCode::ValueOutOfRange).with_detail("capacity", capacity));
        }

        let table = self
            .budget()
            .run("create table", async {
                let created_at = now_millis();
                insert_with_fresh_id(|id| self.tables.create(id, name, capacity, created_at))
                    .await
                    .map_err(|e| match e {
                        RepoError::Duplicate(_) => {
                            AppError::new(ErrorCode::TableNameExists).with_detail("name", name)
                        }
                        other => other.into(),
                    })
            })
            .await?;

        tracing::info!(table_id = table.id, name = %table.name, capacity, "Table created");
        Ok(table)
    }

    pub async fn get_table(&self, id: i64) -> AppResult<DiningTable> {
        self.load(&self.budget(), id).await
    }

    pub async fn list_tables(&self) -> AppResult<Vec<DiningTable>> {
        self.budget().run("list tables", self.tables.find_all()).await
    }

    /// True when no live session occupies the table
    ///
    /// Informational only: reservations do not rely on this check.
    pub async fn is_available(&self, id: i64) -> AppResult<bool> {
        let deadline = self.budget();
        self.load(&deadline, id).await?;
        deadline
            .run("check table availability", self.tables.is_available(id))
            .await
    }

    /// Delete a table that has never hosted a session
    pub async fn delete_table(&self, id: i64) -> AppResult<()> {
        self.budget()
            .run("delete table", async {
                self.tables.delete(id).await.map_err(|e| match e {
                    RepoError::NotFound(_) => table_not_found(id),
                    RepoError::Duplicate(_) => {
                        AppError::new(ErrorCode::TableOccupied).with_detail("table_id", id)
                    }
                    RepoError::Referenced(_) => {
                        AppError::new(ErrorCode::TableHasSessions).with_detail("table_id", id)
                    }
                    other => other.into(),
                })
            })
            .await?;

        tracing::info!(table_id = id, "Table deleted");
        Ok(())
    }

    async fn load(&self, deadline: &Deadline, id: i64) -> AppResult<DiningTable> {
        deadline
            .run("load table", self.tables.find_by_id(id))
            .await?
            .ok_or_else(|| table_not_found(id))
    }
}
