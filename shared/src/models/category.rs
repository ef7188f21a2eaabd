//! Category Model

use serde::{Deserialize, Serialize};

/// Category entity
///
/// Names are unique under [`category_name_key`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
pub struct Category {
    pub id: i64,
    pub name: String,
    pub created_at: i64,
}

/// Normalize a category name for lookup and storage
///
/// Surrounding whitespace is dropped. Casing is preserved as first written.
pub fn normalize_category_name(name: &str) -> &str {
    name.trim()
}

/// Lookup key for a category name
///
/// Full Unicode lowercasing of the normalized name, so "CRÈME" and "crème"
/// collide. Stored alongside the display name and carries the unique index.
pub fn category_name_key(name: &str) -> String {
    normalize_category_name(name).to_lowercase()
}
