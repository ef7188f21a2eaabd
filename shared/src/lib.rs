//! Shared types for the dining backend
//!
//! Domain models, the unified error system and id/time utilities used by
//! the server crate and by whatever transport sits in front of it.

pub mod error;
pub mod models;
pub mod util;

// Re-exports
pub use error::{AppError, AppResult, ErrorCode, ErrorKind};
pub use serde::{Deserialize, Serialize};
