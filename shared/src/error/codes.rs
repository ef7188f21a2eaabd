//! Unified error codes for the dining backend
//!
//! Error codes are organized by category:
//! - 0xxx: General errors
//! - 4xxx: Order errors
//! - 6xxx: Menu and category errors
//! - 7xxx: Table and session errors
//! - 9xxx: System errors

use serde::{Deserialize, Serialize};
use std::fmt;

/// Unified error code enum
///
/// All error codes are represented as u16 values for efficient serialization
/// and cross-language compatibility.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "u16", try_from = "u16")]
#[repr(u16)]
pub enum ErrorCode {
    // ==================== 0xxx: General ====================
    /// Validation failed
    ValidationFailed = 2,
    /// Resource not found
    NotFound = 3,
    /// Resource already exists
    AlreadyExists = 4,
    /// Value out of range
    ValueOutOfRange = 8,
    /// Resource is still referenced by another record
    ResourceInUse = 9,
    /// Client exceeded its request budget
    TooManyRequests = 10,

    // ==================== 4xxx: Order ====================
    /// Order not found
    OrderNotFound = 4001,
    /// Order item not found
    OrderItemNotFound = 4006,
    /// Order no longer accepts item changes
    OrderNotInCart = 4008,
    /// Order status transition not allowed
    OrderInvalidTransition = 4009,
    /// Cancellation window has expired
    OrderCancelWindowExpired = 4010,
    /// Order status changed by a concurrent caller
    OrderStatusChanged = 4011,

    // ==================== 6xxx: Menu ====================
    /// Menu item not found
    MenuItemNotFound = 6001,
    /// Menu item has invalid price
    MenuItemInvalidPrice = 6002,
    /// Menu item is out of stock
    ProductOutOfStock = 6003,
    /// Category not found
    CategoryNotFound = 6101,
    /// Category has menu items
    CategoryHasProducts = 6102,
    /// Category name already exists
    CategoryNameExists = 6103,

    // ==================== 7xxx: Table ====================
    /// Table not found
    TableNotFound = 7001,
    /// Table is occupied by a live session
    TableOccupied = 7002,
    /// Table name already exists
    TableNameExists = 7003,
    /// Table still has session history
    TableHasSessions = 7104,
    /// Session not found
    SessionNotFound = 7201,
    /// Session status transition not allowed
    SessionInvalidTransition = 7202,
    /// Session still owns orders
    SessionHasOrders = 7203,
    /// Session status changed by a concurrent caller
    SessionStatusChanged = 7204,

    // ==================== 9xxx: System ====================
    /// Internal server error
    InternalError = 9001,
    /// Database error
    DatabaseError = 9002,
    /// Operation timeout
    TimeoutError = 9004,
    /// Configuration error
    ConfigError = 9005,
}

impl ErrorCode {
    /// Get the numeric code value
    #[inline]
    pub const fn code(&self) -> u16 {
        *self as u16
    }

    /// Get the developer-facing English message for this error code
    pub const fn message(&self) -> &'static str {
        match self {
            // General
            ErrorCode::ValidationFailed => "Validation failed",
            ErrorCode::NotFound => "Resource not found",
            ErrorCode::AlreadyExists => "Resource already exists",
            ErrorCode::ValueOutOfRange => "Value is out of range",
            ErrorCode::ResourceInUse => "Resource is still referenced",
            ErrorCode::TooManyRequests => "Too many requests, try again later",

            // Order
            ErrorCode::OrderNotFound => "Order not found",
            ErrorCode::OrderItemNotFound => "Order item not found",
            ErrorCode::OrderNotInCart => "only cart orders accept items",
            ErrorCode::OrderInvalidTransition => "invalid status transition",
            ErrorCode::OrderCancelWindowExpired => "cancellation window expired",
            ErrorCode::OrderStatusChanged => "Order status was changed concurrently",

            // Menu
            ErrorCode::MenuItemNotFound => "Menu item not found",
            ErrorCode::MenuItemInvalidPrice => "Menu item has invalid price",
            ErrorCode::ProductOutOfStock => "Menu item is out of stock",
            ErrorCode::CategoryNotFound => "Category not found",
            ErrorCode::CategoryHasProducts => "Category has associated menu items",
            ErrorCode::CategoryNameExists => "Category name already exists",

            // Table
            ErrorCode::TableNotFound => "Table not found",
            ErrorCode::TableOccupied => "Table is occupied",
            ErrorCode::TableNameExists => "Table name already exists",
            ErrorCode::TableHasSessions => "Table has session history",
            ErrorCode::SessionNotFound => "Session not found",
            ErrorCode::SessionInvalidTransition => "invalid status transition",
            ErrorCode::SessionHasOrders => "Session has associated orders",
            ErrorCode::SessionStatusChanged => "Session status was changed concurrently",

            // System
            ErrorCode::InternalError => "Internal server error",
            ErrorCode::DatabaseError => "Database error",
            ErrorCode::TimeoutError => "Operation timed out",
            ErrorCode::ConfigError => "Configuration error",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "E{:04}", self.code())
    }
}

impl From<ErrorCode> for u16 {
    #[inline]
    fn from(code: ErrorCode) -> Self {
        code.code()
    }
}

/// Error when converting from an invalid u16 to ErrorCode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InvalidErrorCode(pub u16);

impl fmt::Display for InvalidErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid error code: {}", self.0)
    }
}

impl std::error::Error for InvalidErrorCode {}

impl TryFrom<u16> for ErrorCode {
    type Error = InvalidErrorCode;

    fn try_from(value: u16) -> Result<Self, Self::Error> {
        match value {
            // General
            2 => Ok(ErrorCode::ValidationFailed),
            3 => Ok(ErrorCode::NotFound),
            4 => Ok(ErrorCode::AlreadyExists),
            8 => Ok(ErrorCode::ValueOutOfRange),
            9 => Ok(ErrorCode::ResourceInUse),
            10 => Ok(ErrorCode::TooManyRequests),

            // Order
            4001 => Ok(ErrorCode::OrderNotFound),
            4006 => Ok(ErrorCode::OrderItemNotFound),
            4008 => Ok(ErrorCode::OrderNotInCart),
            4009 => Ok(ErrorCode::OrderInvalidTransition),
            4010 => Ok(ErrorCode::OrderCancelWindowExpired),
            4011 => Ok(ErrorCode::OrderStatusChanged),

            // Menu
            6001 => Ok(ErrorCode::MenuItemNotFound),
            6002 => Ok(ErrorCode::MenuItemInvalidPrice),
            6003 => Ok(ErrorCode::ProductOutOfStock),
            6101 => Ok(ErrorCode::CategoryNotFound),
            6102 => Ok(ErrorCode::CategoryHasProducts),
            6103 => Ok(ErrorCode::CategoryNameExists),

            // Table
            7001 => Ok(ErrorCode::TableNotFound),
            7002 => Ok(ErrorCode::TableOccupied),
            7003 => Ok(ErrorCode::TableNameExists),
            7104 => Ok(ErrorCode::TableHasSessions),
            7201 => Ok(ErrorCode::SessionNotFound),
            7202 => Ok(ErrorCode::SessionInvalidTransition),
            7203 => Ok(ErrorCode::SessionHasOrders),
            7204 => Ok(ErrorCode::SessionStatusChanged),

            // System
            9001 => Ok(ErrorCode::InternalError),
            9002 => Ok(ErrorCode::DatabaseError),
            9004 => Ok(ErrorCode::TimeoutError),
            9005 => Ok(ErrorCode::ConfigError),

            _ => Err(InvalidErrorCode(value)),
        }
    }
}
