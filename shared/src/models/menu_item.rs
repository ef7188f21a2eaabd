//! Menu Item Model

use serde::{Deserialize, Serialize};

/// Menu item entity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
pub struct MenuItem {
    pub id: i64,
    pub name: String,
    pub category_id: i64,
    /// Price in currency unit
    pub price: f64,
    /// In stock and orderable
    pub is_available: bool,
    pub created_at: i64,
}

/// Create menu item payload
///
/// The category is referenced by name and resolved (or created) on insert.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MenuItemCreate {
    pub name: String,
    pub category_name: String,
    pub price: f64,
}
