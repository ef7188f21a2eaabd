//! 服务层 - 业务规则与生命周期
//!
//! # 服务列表
//!
//! - [`SessionService`] - 就餐会话生命周期与桌台独占
//! - [`OrderService`] - 订单/订单项生命周期
//! - [`CategoryResolver`] - 分类按名称幂等解析
//! - [`TableService`] - 桌台管理
//! - [`MenuService`] - 菜品管理
//!
//! Every service operation runs its persistence work under one
//! [`Deadline`](crate::core::Deadline): the caller's, via `with_deadline`, or
//! the configured default.

pub mod category;
pub mod menu;
pub mod order;
pub mod session;
pub mod table;

pub use category::CategoryResolver;
pub use menu::MenuService;
pub use order::OrderService;
pub use session::SessionService;
pub use table::TableService;

use crate::db::repository::{RepoError, RepoResult};
use shared::error::AppError;
use shared::util::snowflake_id;
use std::future::Future;

/// Generated ids tried per insert
const ID_ATTEMPTS: usize = 3;

/// Run `insert` with a fresh snowflake id, retrying while the id is taken
pub(crate) async fn insert_with_fresh_id<T, F, Fut>(mut insert: F) -> RepoResult<T>
where
    F: FnMut(i64) -> Fut,
    Fut: Future<Output = RepoResult<T>>,
{
    let mut attempt = 1;
    loop {
        match insert(snowflake_id()).await {
            Err(RepoError::IdConflict(msg)) if attempt < ID_ATTEMPTS => {
                tracing::warn!(attempt, error = %msg, "Generated id already in use, retrying");
                attempt += 1;
            }
            other => return other,
        }
    }
}

/// Upper bound for `limit` on list operations
pub const MAX_PAGE_SIZE: i64 = 100;

/// Validate and clamp pagination bounds
///
/// Negative values are rejected; a zero or oversized limit becomes
/// [`MAX_PAGE_SIZE`].
pub fn page_bounds(offset: i64, limit: i64) -> Result<(i64, i64), AppError> {
    if offset < 0 {
        return Err(AppError::validation("offset must not be negative").with_detail("offset", offset));
    }
    if limit < 0 {
        return Err(AppError::validation("limit must not be negative").with_detail("limit", limit));
    }
    let limit = if limit == 0 { MAX_PAGE_SIZE } else { limit.min(MAX_PAGE_SIZE) };
    Ok((offset, limit))
}
