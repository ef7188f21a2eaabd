//! Menu item management
//!
//! Menu items reference their category by name on creation; the category is
//! resolved (and created on first use) through [`CategoryResolver`].

use crate::core::deadline::Deadline;
use crate::db::repository::{MenuItemRepository, RepoError};
use crate::services::{CategoryResolver, insert_with_fresh_id};
use shared::error::{AppError, AppResult, ErrorCode};
use shared::models::{MenuItem, MenuItemCreate};
use shared::util::now_millis;
use std::sync::Arc;
use std::time::Duration;

#[derive(Clone)]
pub struct MenuService {
    menu_items: Arc<dyn MenuItemRepository>,
    categories: CategoryResolver,
    timeout: Duration,
    deadline: Option<Deadline>,
}

impl std::fmt::Debug for MenuService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MenuService")
            .field("timeout", &self.timeout)
            .field("deadline", &self.deadline)
            .finish()
    }
}

fn menu_item_not_found(id: i64) -> AppError {
    AppError::new(ErrorCode::MenuItemNotFound).with_detail("menu_item_id", id)
}

impl MenuService {
    pub fn new(
        menu_items: Arc<dyn MenuItemRepository>,
        categories: CategoryResolver,
        timeout: Duration,
    ) -> Self {
        Self {
            menu_items,
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

    /// Create an available menu item in the named category
    pub async fn create_menu_item(&self, data: MenuItemCreate) -> AppResult<MenuItem> {
        let name = data.name.trim();
        if name.is_empty() {
            return Err(AppError::validation("menu item name must not be empty"));
        }
        if !data.price.is_finite() || data.price < 0.0 {
            return Err(AppError::new(ErrorCode::MenuItemInvalidPrice).with_detail("price", data.price));
        }

        // Category resolution spends from the same budget
        let deadline = self.budget();
        let category_id = self
            .categories
            .with_deadline(deadline.clone())
            .resolve_or_create(&data.category_name)
            .await?;
        let created_at = now_millis();
        let item = deadline
            .run("create menu item", async {
                insert_with_fresh_id(|id| {
                    self.menu_items.create(MenuItem {
                        id,
                        name: name.to_string(),
                        category_id,
                        price: data.price,
                        is_available: true,
                        created_at,
                    })
                })
                .await
                .map_err(|e| match e {
                    // Category deleted right after resolution
                    RepoError::Referenced(_) => AppError::new(ErrorCode::CategoryNotFound)
                        .with_detail("category_id", category_id),
                    other => other.into(),
                })
            })
            .await?;

        tracing::info!(menu_item_id = item.id, category_id, name = %item.name, "Menu item created");
        Ok(item)
    }

    pub async fn get_menu_item(&self, id: i64) -> AppResult<MenuItem> {
        self.budget()
            .run("load menu item", self.menu_items.find_by_id(id))
            .await?
            .ok_or_else(|| menu_item_not_found(id))
    }

    /// Mark an item in or out of stock
    pub async fn set_availability(&self, id: i64, is_available: bool) -> AppResult<MenuItem> {
        let item = self
            .budget()
            .run("set menu item availability", async {
                self.menu_items
                    .set_availability(id, is_available)
                    .await
                    .map_err(|e| match e {
                        RepoError::NotFound(_) => menu_item_not_found(id),
                        other => other.into(),
                    })
            })
            .await?;

        tracing::info!(menu_item_id = id, is_available, "Menu item availability changed");
        Ok(item)
    }

    pub async fn list_by_category(&self, category_id: i64) -> AppResult<Vec<MenuItem>> {
        self.budget()
            .run("list menu items", self.menu_items.find_by_category(category_id))
            .await
    }
}
