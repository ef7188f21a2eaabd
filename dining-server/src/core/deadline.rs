//! Caller-supplied deadlines for service operations
//!
//! A [`Deadline`] is fixed once per operation and shared by every persistence
//! call the operation makes, so a multi-step operation cannot overrun its
//! budget one call at a time. An optional [`CancellationToken`] lets the caller
//! abort early; both outcomes surface as a `TimeoutError`.

use shared::error::AppError;
use std::future::Future;
use std::time::Duration;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

/// Upper bound on a relative budget; larger requests are clamped
const MAX_BUDGET: Duration = Duration::from_secs(24 * 60 * 60);

#[derive(Debug, Clone)]
pub struct Deadline {
    at: Instant,
    cancel: Option<CancellationToken>,
}

impl Deadline {
    /// Expires `budget` from now
    pub fn after(budget: Duration) -> Self {
        let now = Instant::now();
        let at = now
            .checked_add(budget.min(MAX_BUDGET))
            .unwrap_or(now);
        Self { at, cancel: None }
    }

    /// Expires at a fixed instant
    pub fn at(at: Instant) -> Self {
        Self { at, cancel: None }
    }

    /// Also expire as soon as `token` is cancelled
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = Some(token);
        self
    }

    pub fn instant(&self) -> Instant {
        self.at
    }

    /// Time left, zero once expired
    pub fn remaining(&self) -> Duration {
        self.at.saturating_duration_since(Instant::now())
    }

    pub fn is_expired(&self) -> bool {
        self.remaining().is_zero() || self.cancel.as_ref().is_some_and(|t| t.is_cancelled())
    }

    /// Run `fut` against this deadline
    ///
    /// On expiry or cancellation the future is dropped and a `TimeoutError`
    /// naming `operation` is returned. Errors produced by `fut` are converted
    /// into [`AppError`].
    pub async fn run<T, E, F>(&self, operation: &str, fut: F) -> Result<T, AppError>
    where
        F: Future<Output = Result<T, E>>,
        E: Into<AppError>,
    {
        let cancelled = async {
            match &self.cancel {
                Some(token) => token.cancelled().await,
                None => std::future::pending().await,
            }
        };

        tokio::select! {
            biased;
            _ = cancelled => {
                tracing::warn!(operation, "Operation cancelled by caller");
                Err(AppError::timeout(operation).with_detail("reason", "cancelled"))
            }
            result = tokio::time::timeout_at(self.at, fut) => match result {
                Ok(result) => result.map_err(Into::into),
                Err(_) => {
                    tracing::warn!(operation, "Operation deadline exceeded");
                    Err(AppError::timeout(operation).with_detail("reason", "deadline"))
                }
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::error::{ErrorCode, ErrorKind};

    #[tokio::test(start_paused = true)]
    async fn test_completes_before_deadline() {
        let deadline = Deadline::after(Duration::from_secs(1));
        let value = deadline
            .run("fast", async { Ok::<_, AppError>(7) })
            .await
            .unwrap();
        assert_eq!(value, 7);
    }

    #[tokio::test(start_paused = true)]
    async fn test_expired_deadline() {
        let deadline = Deadline::after(Duration::from_millis(50));
        let err = deadline
            .run("slow read", async {
                tokio::time::sleep(Duration::from_secs(5)).await;
                Ok::<_, AppError>(())
            })
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::TimeoutError);
        assert_eq!(err.kind(), ErrorKind::Timeout);
        assert_eq!(err.message, "slow read timed out");
    }

    #[tokio::test(start_paused = true)]
    async fn test_budget_is_shared_across_calls() {
        let deadline = Deadline::after(Duration::from_millis(100));
        let step = || async {
            tokio::time::sleep(Duration::from_millis(60)).await;
            Ok::<_, AppError>(())
        };

        deadline.run("first", step()).await.unwrap();
        let err = deadline.run("second", step()).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::TimeoutError);
        assert!(deadline.is_expired());
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancellation_returns_timeout_kind() {
        let token = CancellationToken::new();
        let deadline = Deadline::after(Duration::from_secs(60)).with_cancellation(token.clone());

        let canceller = tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(10)).await;
            token.cancel();
        });
        let err = deadline
            .run("lookup", async {
                tokio::time::sleep(Duration::from_secs(30)).await;
                Ok::<_, AppError>(())
            })
            .await
            .unwrap_err();
        canceller.await.unwrap();

        assert_eq!(err.kind(), ErrorKind::Timeout);
        assert!(deadline.is_expired());
    }

    #[tokio::test(start_paused = true)]
    async fn test_huge_budget_does_not_overflow() {
        let deadline = Deadline::after(Duration::MAX);
        assert!(deadline.remaining() <= MAX_BUDGET);
        assert!(!deadline.is_expired());
    }

    #[tokio::test]
    async fn test_inner_error_passes_through() {
        let err = Deadline::after(Duration::from_secs(1))
            .run("lookup", async { Err::<(), _>(AppError::not_found("Session")) })
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::NotFound);
    }
}
