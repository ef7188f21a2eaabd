//! Category resolution by name
//!
//! `resolve_or_create` is safe under concurrent callers: it attempts the
//! insert and, when another caller won the race on the unique name, reads the
//! winner's row instead. All callers converge on a single stored category.

use crate::core::deadline::Deadline;
use crate::db::repository::{CategoryRepository, RepoError};
use crate::services::insert_with_fresh_id;
use shared::error::{AppError, AppResult, ErrorCode};
use shared::models::{Category, normalize_category_name};
use shared::util::now_millis;
use std::sync::Arc;
use std::time::Duration;

/// Insert/re-read rounds before giving up (a concurrent delete can undo a
/// winner between our conflict and our re-read)
const RESOLVE_ATTEMPTS: usize = 3;

#[derive(Clone)]
pub struct CategoryResolver {
    categories: Arc<dyn CategoryRepository>,
    timeout: Duration,
    deadline: Option<Deadline>,
}

impl std::fmt::Debug for CategoryResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CategoryResolver")
            .field("timeout", &self.timeout)
            .field("deadline", &self.deadline)
            .finish()
    }
}

fn normalized(name: &str) -> AppResult<&str> {
    let name = normalize_category_name(name);
    if name.is_empty() {
        return Err(AppError::validation("category name must not be empty"));
    }
    Ok(name)
}

fn category_not_found(name: &str) -> AppError {
    AppError::new(ErrorCode::CategoryNotFound).with_detail("name", name)
}

fn name_exists(name: &str) -> AppError {
    AppError::new(ErrorCode::CategoryNameExists).with_detail("name", name)
}

impl CategoryResolver {
    pub fn new(categories: Arc<dyn CategoryRepository>, timeout: Duration) -> Self {
        Self {
            categories,
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

    /// Id of the category called `name`, creating it on first reference
    pub async fn resolve_or_create(&self, name: &str) -> AppResult<i64> {
        let name = normalized(name)?;
        let deadline = self.budget();

        for attempt in 0..RESOLVE_ATTEMPTS {
            if let Some(existing) = self.find(&deadline, name).await? {
                return Ok(existing.id);
            }

            let inserted = deadline
                .run("insert category", async {
                    let created_at = now_millis();
                    Ok::<_, AppError>(
                        insert_with_fresh_id(|id| self.categories.insert(id, name, created_at)).await,
                    )
                })
                .await?;

            match inserted {
                Ok(category) => {
                    tracing::info!(category_id = category.id, name = %category.name, "Category created");
                    return Ok(category.id);
                }
                // Lost the race: the winner's row is read on the next round
                Err(RepoError::Duplicate(_)) => {
                    tracing::debug!(name, attempt, "Category insert raced, re-reading");
                }
                Err(other) => return Err(other.into()),
            }
        }

        tracing::error!(name, "Category could not be resolved");
        Err(AppError::internal(format!("category '{name}' could not be resolved")))
    }

    /// Create a category; an existing name is a conflict
    pub async fn create(&self, name: &str) -> AppResult<Category> {
        let name = normalized(name)?;
        let category = self
            .budget()
            .run("create category", async {
                let created_at = now_millis();
                insert_with_fresh_id(|id| self.categories.insert(id, name, created_at))
                    .await
                    .map_err(|e| match e {
                        RepoError::Duplicate(_) => name_exists(name),
                        other => other.into(),
                    })
            })
            .await?;

        tracing::info!(category_id = category.id, name, "Category created");
        Ok(category)
    }

    pub async fn rename(&self, old_name: &str, new_name: &str) -> AppResult<Category> {
        let old_name = normalized(old_name)?;
        let new_name = normalized(new_name)?;

        let category = self
            .budget()
            .run("rename category", async {
                self.categories
                    .rename(old_name, new_name)
                    .await
                    .map_err(|e| match e {
                        RepoError::NotFound(_) => category_not_found(old_name),
                        RepoError::Duplicate(_) => name_exists(new_name),
                        other => other.into(),
                    })
            })
            .await?;

        tracing::info!(category_id = category.id, from = old_name, to = new_name, "Category renamed");
        Ok(category)
    }

    /// Delete by name; blocked while menu items reference the category
    pub async fn delete(&self, name: &str) -> AppResult<()> {
        let name = normalized(name)?;
        self.budget()
            .run("delete category", async {
                self.categories.delete(name).await.map_err(|e| match e {
                    RepoError::NotFound(_) => category_not_found(name),
                    RepoError::Referenced(_) => {
                        AppError::new(ErrorCode::CategoryHasProducts).with_detail("name", name)
                    }
                    other => other.into(),
                })
            })
            .await?;

        tracing::info!(name, "Category deleted");
        Ok(())
    }

    pub async fn get_by_id(&self, id: i64) -> AppResult<Category> {
        self.budget()
            .run("load category", self.categories.find_by_id(id))
            .await?
            .ok_or_else(|| AppError::new(ErrorCode::CategoryNotFound).with_detail("category_id", id))
    }

    pub async fn get_id_by_name(&self, name: &str) -> AppResult<i64> {
        let name = normalized(name)?;
        self.find(&self.budget(), name)
            .await?
            .map(|c| c.id)
            .ok_or_else(|| category_not_found(name))
    }

    pub async fn list(&self) -> AppResult<Vec<Category>> {
        self.budget()
            .run("list categories", self.categories.find_all())
            .await
    }

    async fn find(&self, deadline: &Deadline, name: &str) -> AppResult<Option<Category>> {
        deadline
            .run("find category", self.categories.find_by_name(name))
            .await
    }
}
