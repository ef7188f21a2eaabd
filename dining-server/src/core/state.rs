use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use shared::error::{AppError, AppResult};
use shared::models::Session;

use crate::cache::TtlCache;
use crate::core::Config;
use crate::db::DbService;
use crate::db::repository::{
    SqliteCategoryRepository, SqliteDiningTableRepository, SqliteMenuItemRepository,
    SqliteOrderRepository, SqliteSessionRepository,
};
use crate::rate_limit::RateLimiter;
use crate::services::{CategoryResolver, MenuService, OrderService, SessionService, TableService};

/// 服务器状态 - 持有所有服务的共享引用
///
/// Cloning is cheap: every field is a pool handle, an `Arc` or a service that
/// only holds `Arc`s.
///
/// | 字段 | 说明 |
/// |------|------|
/// | config | 配置项 (不可变) |
/// | db | SQLite 连接池 |
/// | sessions / orders / categories / tables / menu | 业务服务 |
/// | rate_limiter | 按客户端的令牌桶 |
/// | session_cache | 会话读缓存 |
///
/// ```ignore
/// let state = ServerState::initialize(&config).await?;
/// state.admit("10.0.0.7")?;
/// let session = state.sessions.create_session(5).await?;
/// state.shutdown().await;
/// ```
#[derive(Clone, Debug)]
pub struct ServerState {
    pub config: Config,
    pub db: DbService,
    pub sessions: SessionService,
    pub orders: OrderService,
    pub categories: CategoryResolver,
    pub tables: TableService,
    pub menu: MenuService,
    pub rate_limiter: Arc<RateLimiter>,
    pub session_cache: Arc<TtlCache<Session>>,
    shut_down: Arc<AtomicBool>,
}

impl ServerState {
    /// Open the configured database and build every service
    ///
    /// Must run inside a tokio runtime (the limiter and cache spawn their
    /// sweeps).
    pub async fn initialize(config: &Config) -> AppResult<Self> {
        config.validate()?;
        let db = DbService::new(&config.database_path, config.db_max_connections).await?;
        Ok(Self::with_db(config, db))
    }

    /// Build the services over an already opened database
    pub fn with_db(config: &Config, db: DbService) -> Self {
        let timeout = config.request_timeout();
        let pool = db.pool.clone();

        let session_repo = Arc::new(SqliteSessionRepository::new(pool.clone()));
        let session_cache = Arc::new(TtlCache::new(config.cache.clone()));
        let rate_limiter = Arc::new(RateLimiter::new(config.rate_limit.clone()));

        let categories = CategoryResolver::new(
            Arc::new(SqliteCategoryRepository::new(pool.clone())),
            timeout,
        );
        let sessions = SessionService::new(session_repo.clone(), session_cache.clone(), timeout);
        let orders = OrderService::new(
            Arc::new(SqliteOrderRepository::new(pool.clone())),
            session_repo,
            Arc::new(SqliteMenuItemRepository::new(pool.clone())),
            config.order_cancel_window(),
            timeout,
        );
        let tables = TableService::new(Arc::new(SqliteDiningTableRepository::new(pool.clone())), timeout);
        let menu = MenuService::new(
            Arc::new(SqliteMenuItemRepository::new(pool)),
            categories.clone(),
            timeout,
        );

        tracing::info!(
            timeout_ms = config.request_timeout_ms,
            cancel_window_secs = config.order_cancel_window_secs,
            "Server state initialized"
        );

        Self {
            config: config.clone(),
            db,
            sessions,
            orders,
            categories,
            tables,
            menu,
            rate_limiter,
            session_cache,
            shut_down: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Rate-limit guard for inbound calls from `client_id`
    pub fn admit(&self, client_id: &str) -> AppResult<()> {
        if self.rate_limiter.allow(client_id) {
            Ok(())
        } else {
            Err(AppError::too_many_requests().with_detail("client", client_id))
        }
    }

    /// Stop background sweeps and close the pool (only the first call acts)
    pub async fn shutdown(&self) {
        if self.shut_down.swap(true, Ordering::SeqCst) {
            return;
        }
        tracing::info!("Shutting down server state...");
        self.rate_limiter.stop();
        self.session_cache.stop();
        self.session_cache.clear();
        self.db.close().await;
        tracing::info!("Server state stopped");
    }

    pub fn is_shut_down(&self) -> bool {
        self.shut_down.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::RateLimitConfig;
    use shared::error::{ErrorCode, ErrorKind};
    use std::time::Duration;

    async fn state(config: Config) -> ServerState {
        let db = DbService::open_in_memory().await.unwrap();
        ServerState::with_db(&config, db)
    }

    #[tokio::test]
    async fn test_admit_maps_denial_to_too_many_requests() {
        let mut config = Config::default();
        config.rate_limit = RateLimitConfig {
            requests_per_second: 1.0,
            burst_size: 2,
            cleanup_interval: Duration::from_secs(60),
            idle_timeout: Duration::from_secs(300),
        };
        let state = state(config).await;

        state.admit("kiosk-1").unwrap();
        state.admit("kiosk-1").unwrap();
        let err = state.admit("kiosk-1").unwrap_err();
        assert_eq!(err.code, ErrorCode::TooManyRequests);
        assert_eq!(err.kind(), ErrorKind::RateLimited);
        assert_eq!(err.http_status().as_u16(), 429);

        state.admit("kiosk-2").unwrap();
    }

    #[tokio::test]
    async fn test_services_share_one_database() {
        let state = state(Config::default()).await;
        let table = state
            .tables
            .create_table(shared::models::DiningTableCreate {
                name: "T1".into(),
                capacity: None,
            })
            .await
            .unwrap();
        let session = state.sessions.create_session(table.id).await.unwrap();
        let order = state.orders.create_order(session.id).await.unwrap();
        assert_eq!(order.session_id, session.id);
        assert!(!state.tables.is_available(table.id).await.unwrap());
    }

    #[tokio::test]
    async fn test_shutdown_is_idempotent() {
        let state = state(Config::default()).await;
        state.shutdown().await;
        state.shutdown().await;
        assert!(state.is_shut_down());
        assert!(state.db.pool.is_closed());
    }

    #[tokio::test]
    async fn test_initialize_rejects_invalid_config() {
        let mut config = Config::with_database(":memory:");
        config.rate_limit.burst_size = 0;
        let err = ServerState::initialize(&config).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::ConfigError);
    }
}
