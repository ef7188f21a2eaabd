//! Unified error system for the dining backend
//!
//! This module provides:
//! - [`ErrorCode`]: Standardized error codes for all error types
//! - [`ErrorCategory`]: Classification of errors by domain
//! - [`ErrorKind`]: Semantic classification callers branch on
//! - [`AppError`]: Rich error type with codes, messages, and details
//!
//! # Error Code Ranges
//!
//! - 0xxx: General errors
//! - 4xxx: Order errors
//! - 6xxx: Menu and category errors
//! - 7xxx: Table and session errors
//! - 9xxx: System errors
//!
//! # Example
//!
//! ```
//! use shared::error::{AppError, ErrorCode, ErrorKind};
//!
//! let err = AppError::new(ErrorCode::TableOccupied).with_detail("table_id", 5);
//! assert_eq!(err.kind(), ErrorKind::Conflict);
//! assert_eq!(err.http_status().as_u16(), 409);
//! ```

mod category;
mod codes;
mod http;
mod kind;
mod types;

pub use category::ErrorCategory;
pub use codes::{ErrorCode, InvalidErrorCode};
pub use kind::ErrorKind;
pub use types::{AppError, AppResult};
