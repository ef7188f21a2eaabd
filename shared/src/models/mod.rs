//! Data models
//!
//! Shared between the server crate and its callers.
//! DB row types use `#[cfg_attr(feature = "db", derive(sqlx::FromRow))]`.
//! All IDs are `i64` (SQLite INTEGER PRIMARY KEY, snowflake generated).

pub mod category;
pub mod dining_table;
pub mod menu_item;
pub mod order;
pub mod session;

// Re-exports
pub use category::*;
pub use dining_table::*;
pub use menu_item::*;
pub use order::*;
pub use session::*;
