//! Semantic error kinds
//!
//! Callers branch on the kind instead of matching individual codes. Every
//! [`ErrorCode`] belongs to exactly one kind.

use super::codes::ErrorCode;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Entity absent
    NotFound,
    /// Bad input or an illegal state transition
    ValidationFailed,
    /// Referenced menu item cannot be ordered right now
    OutOfStock,
    /// Uniqueness or availability conflict
    Conflict,
    /// Delete blocked by a referencing row
    ReferentialConflict,
    /// Admission denied by the rate limiter
    RateLimited,
    /// Deadline elapsed before the operation finished
    Timeout,
    /// Unexpected failure
    Internal,
}

impl ErrorCode {
    pub const fn kind(&self) -> ErrorKind {
        match self {
            ErrorCode::NotFound
            | ErrorCode::OrderNotFound
            | ErrorCode::OrderItemNotFound
            | ErrorCode::MenuItemNotFound
            | ErrorCode::CategoryNotFound
            | ErrorCode::TableNotFound
            | ErrorCode::SessionNotFound => ErrorKind::NotFound,

            ErrorCode::ValidationFailed
            | ErrorCode::ValueOutOfRange
            | ErrorCode::OrderNotInCart
            | ErrorCode::OrderInvalidTransition
            | ErrorCode::OrderCancelWindowExpired
            | ErrorCode::MenuItemInvalidPrice
            | ErrorCode::SessionInvalidTransition => ErrorKind::ValidationFailed,

            ErrorCode::ProductOutOfStock => ErrorKind::OutOfStock,

            ErrorCode::AlreadyExists
            | ErrorCode::OrderStatusChanged
            | ErrorCode::CategoryNameExists
            | ErrorCode::TableOccupied
            | ErrorCode::TableNameExists
            | ErrorCode::SessionStatusChanged => ErrorKind::Conflict,

            ErrorCode::ResourceInUse
            | ErrorCode::CategoryHasProducts
            | ErrorCode::TableHasSessions
            | ErrorCode::SessionHasOrders => ErrorKind::ReferentialConflict,

            ErrorCode::TooManyRequests => ErrorKind::RateLimited,

            ErrorCode::TimeoutError => ErrorKind::Timeout,

            ErrorCode::InternalError
            | ErrorCode::DatabaseError
            | ErrorCode::ConfigError => ErrorKind::Internal,
        }
    }
}
