//! Category Repository

use super::{CategoryRepository, RepoError, RepoResult};
use async_trait::async_trait;
use shared::models::{Category, category_name_key};
use sqlx::SqlitePool;

#[derive(Clone, Debug)]
pub struct SqliteCategoryRepository {
    pool: SqlitePool,
}

impl SqliteCategoryRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CategoryRepository for SqliteCategoryRepository {
    async fn find_by_name(&self, name: &str) -> RepoResult<Option<Category>> {
        let category = sqlx::query_as::<_, Category>(
            "SELECT id, name, created_at FROM categories WHERE name_key = ?",
        )
        .bind(category_name_key(name))
        .fetch_optional(&self.pool)
        .await?;
        Ok(category)
    }

    async fn insert(&self, id: i64, name: &str, created_at: i64) -> RepoResult<Category> {
        sqlx::query_as::<_, Category>(
            "INSERT INTO categories (id, name, name_key, created_at) VALUES (?, ?, ?, ?) RETURNING id, name, created_at",
        )
        .bind(id)
        .bind(name)
        .bind(category_name_key(name))
        .bind(created_at)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| match RepoError::from(e) {
            RepoError::Duplicate(_) => RepoError::Duplicate(format!("Category '{name}' already exists")),
            other => other,
        })
    }

    async fn rename(&self, old_name: &str, new_name: &str) -> RepoResult<Category> {
        let renamed = sqlx::query_as::<_, Category>(
            "UPDATE categories SET name = ?, name_key = ? WHERE name_key = ? RETURNING id, name, created_at",
        )
        .bind(new_name)
        .bind(category_name_key(new_name))
        .bind(category_name_key(old_name))
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| match RepoError::from(e) {
            RepoError::Duplicate(_) => {
                RepoError::Duplicate(format!("Category '{new_name}' already exists"))
            }
            other => other,
        })?;
        renamed.ok_or_else(|| RepoError::NotFound(format!("Category '{old_name}' not found")))
    }

    async fn delete(&self, name: &str) -> RepoResult<()> {
        let result = sqlx::query("DELETE FROM categories WHERE name_key = ?")
            .bind(category_name_key(name))
            .execute(&self.pool)
            .await
            .map_err(|e| match RepoError::from(e) {
                RepoError::Referenced(_) => {
                    RepoError::Referenced(format!("Category '{name}' still has menu items"))
                }
                other => other,
            })?;
        if result.rows_affected() == 0 {
            return Err(RepoError::NotFound(format!("Category '{name}' not found")));
        }
        Ok(())
    }

    async fn find_by_id(&self, id: i64) -> RepoResult<Option<Category>> {
        let category =
            sqlx::query_as::<_, Category>("SELECT id, name, created_at FROM categories WHERE id = ?")
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;
        Ok(category)
    }

    async fn find_all(&self) -> RepoResult<Vec<Category>> {
        let categories = sqlx::query_as::<_, Category>(
            "SELECT id, name, created_at FROM categories ORDER BY name_key, id",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(categories)
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::memory_db;
    use super::*;

    #[tokio::test]
    async fn test_insert_and_find_case_insensitive() {
        let db = memory_db().await;
        let repo = SqliteCategoryRepository::new(db.pool.clone());

        let created = repo.insert(1, "Desserts", 10).await.unwrap();
        assert_eq!(created.name, "Desserts");

        let found = repo.find_by_name("dESSERTS").await.unwrap().unwrap();
        assert_eq!(found.id, 1);
        assert!(repo.find_by_name("Drinks").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_insert_duplicate_name() {
        let db = memory_db().await;
        let repo = SqliteCategoryRepository::new(db.pool.clone());
        repo.insert(1, "Desserts", 10).await.unwrap();

        let err = repo.insert(2, "desserts", 11).await.unwrap_err();
        assert!(matches!(err, RepoError::Duplicate(_)));
    }

    #[tokio::test]
    async fn test_rename() {
        let db = memory_db().await;
        let repo = SqliteCategoryRepository::new(db.pool.clone());
        repo.insert(1, "Desserts", 10).await.unwrap();
        repo.insert(2, "Drinks", 11).await.unwrap();

        let renamed = repo.rename("desserts", "Sweets").await.unwrap();
        assert_eq!(renamed.id, 1);
        assert_eq!(renamed.name, "Sweets");

        assert!(matches!(
            repo.rename("Sweets", "DRINKS").await.unwrap_err(),
            RepoError::Duplicate(_)
        ));
        assert!(matches!(
            repo.rename("Missing", "Other").await.unwrap_err(),
            RepoError::NotFound(_)
        ));
    }

    #[tokio::test]
    async fn test_delete_blocked_by_menu_items() {
        let db = memory_db().await;
        let repo = SqliteCategoryRepository::new(db.pool.clone());
        repo.insert(1, "Mains", 10).await.unwrap();
        sqlx::query(
            "INSERT INTO menu_items (id, name, category_id, price, is_available, created_at) VALUES (5, 'Steak', 1, 20.0, 1, 0)",
        )
        .execute(&db.pool)
        .await
        .unwrap();

        let err = repo.delete("mains").await.unwrap_err();
        assert!(matches!(err, RepoError::Referenced(_)));

        repo.insert(2, "Empty", 11).await.unwrap();
        repo.delete("EMPTY").await.unwrap();
        assert!(matches!(repo.delete("Empty").await.unwrap_err(), RepoError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_non_ascii_names_fold_case() {
        let db = memory_db().await;
        let repo = SqliteCategoryRepository::new(db.pool.clone());
        repo.insert(1, "CRÈME", 10).await.unwrap();

        let err = repo.insert(2, "crème", 11).await.unwrap_err();
        assert!(matches!(err, RepoError::Duplicate(_)));
        assert_eq!(repo.find_by_name("Crème").await.unwrap().unwrap().id, 1);

        let renamed = repo.rename("crème", "Éclairs").await.unwrap();
        assert_eq!(renamed.name, "Éclairs");
        repo.delete("ÉCLAIRS").await.unwrap();
        assert!(repo.find_all().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_find_all_sorted() {
        let db = memory_db().await;
        let repo = SqliteCategoryRepository::new(db.pool.clone());
        repo.insert(1, "soups", 10).await.unwrap();
        repo.insert(2, "Appetizers", 11).await.unwrap();

        let names: Vec<String> = repo.find_all().await.unwrap().into_iter().map(|c| c.name).collect();
        assert_eq!(names, vec!["Appetizers", "soups"]);
        assert_eq!(repo.find_by_id(2).await.unwrap().unwrap().name, "Appetizers");
    }
}
