//! HTTP status code mapping for error codes

use super::codes::ErrorCode;
use super::kind::ErrorKind;
use ::http::StatusCode;

impl ErrorCode {
    /// Get the appropriate HTTP status code for this error code
    pub fn http_status(&self) -> StatusCode {
        match self.kind() {
            ErrorKind::NotFound => StatusCode::NOT_FOUND,
            ErrorKind::ValidationFailed | ErrorKind::OutOfStock => StatusCode::BAD_REQUEST,
            ErrorKind::Conflict | ErrorKind::ReferentialConflict => StatusCode::CONFLICT,
            ErrorKind::RateLimited => StatusCode::TOO_MANY_REQUESTS,
            // 503: transient, client can retry
            ErrorKind::Timeout => StatusCode::SERVICE_UNAVAILABLE,
            ErrorKind::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_status() {
        assert_eq!(ErrorCode::NotFound.http_status(), StatusCode::NOT_FOUND);
        assert_eq!(ErrorCode::OrderNotFound.http_status(), StatusCode::NOT_FOUND);
        assert_eq!(ErrorCode::SessionNotFound.http_status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn test_bad_request_status() {
        assert_eq!(ErrorCode::ValidationFailed.http_status(), StatusCode::BAD_REQUEST);
        assert_eq!(ErrorCode::ProductOutOfStock.http_status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            ErrorCode::OrderCancelWindowExpired.http_status(),
            StatusCode::BAD_REQUEST
        );
    }

    #[test]
    fn test_conflict_status() {
        assert_eq!(ErrorCode::TableOccupied.http_status(), StatusCode::CONFLICT);
        assert_eq!(ErrorCode::CategoryNameExists.http_status(), StatusCode::CONFLICT);
        assert_eq!(ErrorCode::CategoryHasProducts.http_status(), StatusCode::CONFLICT);
    }

    #[test]
    fn test_system_status() {
        assert_eq!(
            ErrorCode::InternalError.http_status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            ErrorCode::DatabaseError.http_status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            ErrorCode::TimeoutError.http_status(),
            StatusCode::SERVICE_UNAVAILABLE
        );
        assert_eq!(
            ErrorCode::TooManyRequests.http_status(),
            StatusCode::TOO_MANY_REQUESTS
        );
    }
}
