use shared::error::{AppError, ErrorCode};
use std::str::FromStr;
use std::time::Duration;

/// Longest accepted cache TTL or sweep interval
pub const MAX_CACHE_SECS: u64 = 30 * 24 * 60 * 60;
/// Longest accepted request timeout
pub const MAX_REQUEST_TIMEOUT_MS: u64 = 10 * 60 * 1000;

/// 读取环境变量并解析，失败时使用默认值
fn env_or<T: FromStr>(key: &str, default: T) -> T {
    parse_or(std::env::var(key).ok().as_deref(), default)
}

fn parse_or<T: FromStr>(raw: Option<&str>, default: T) -> T {
    raw.and_then(|v| v.trim().parse().ok()).unwrap_or(default)
}

/// Token bucket settings
#[derive(Debug, Clone, PartialEq)]
pub struct RateLimitConfig {
    /// Refill rate (tokens per second)
    pub requests_per_second: f64,
    /// Bucket capacity
    pub burst_size: u32,
    /// Sweep interval
    pub cleanup_interval: Duration,
    /// Buckets untouched for longer than this are evicted by the sweep
    pub idle_timeout: Duration,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            requests_per_second: 10.0,
            burst_size: 20,
            cleanup_interval: Duration::from_secs(60),
            idle_timeout: Duration::from_secs(300),
        }
    }
}

impl RateLimitConfig {
    pub fn from_env() -> Self {
        let d = Self::default();
        Self {
            requests_per_second: env_or("RATE_LIMIT_RPS", d.requests_per_second),
            burst_size: env_or("RATE_LIMIT_BURST", d.burst_size),
            cleanup_interval: Duration::from_secs(env_or(
                "RATE_LIMIT_CLEANUP_SECS",
                d.cleanup_interval.as_secs(),
            )),
            idle_timeout: Duration::from_secs(env_or("RATE_LIMIT_IDLE_SECS", d.idle_timeout.as_secs())),
        }
    }
}

/// TTL cache settings
#[derive(Debug, Clone, PartialEq)]
pub struct CacheConfig {
    pub default_ttl: Duration,
    pub cleanup_interval: Duration,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            default_ttl: Duration::from_secs(60),
            cleanup_interval: Duration::from_secs(30),
        }
    }
}

impl CacheConfig {
    pub fn from_env() -> Self {
        let d = Self::default();
        Self {
            default_ttl: Duration::from_secs(env_or("CACHE_TTL_SECS", d.default_ttl.as_secs())),
            cleanup_interval: Duration::from_secs(env_or(
                "CACHE_CLEANUP_SECS",
                d.cleanup_interval.as_secs(),
            )),
        }
    }
}

/// 服务器配置
///
/// # 环境变量
///
/// | 环境变量 | 默认值 | 说明 |
/// |----------|--------|------|
/// | DATABASE_PATH | dining.db | SQLite 数据库文件 |
/// | DB_MAX_CONNECTIONS | 5 | 连接池大小 |
/// | LOG_LEVEL | info | 日志级别 |
/// | LOG_DIR | (unset) | 日志目录 (按天滚动) |
/// | REQUEST_TIMEOUT_MS | 5000 | 未指定截止时间的操作的默认预算(毫秒) |
/// | ORDER_CANCEL_WINDOW_SECS | 30 | 订单可取消窗口(秒) |
/// | RATE_LIMIT_RPS / RATE_LIMIT_BURST | 10 / 20 | 令牌桶速率与容量 |
/// | RATE_LIMIT_CLEANUP_SECS / RATE_LIMIT_IDLE_SECS | 60 / 300 | 令牌桶清理 |
/// | CACHE_TTL_SECS / CACHE_CLEANUP_SECS | 60 / 30 | 缓存过期与清理 |
///
/// ```ignore
/// DATABASE_PATH=/data/dining.db RATE_LIMIT_RPS=50 cargo run
/// ```
#[derive(Debug, Clone)]
pub struct Config {
    pub database_path: String,
    pub db_max_connections: u32,
    pub log_level: String,
    pub log_dir: Option<String>,
    pub request_timeout_ms: u64,
    pub order_cancel_window_secs: u64,
    pub rate_limit: RateLimitConfig,
    pub cache: CacheConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database_path: "dining.db".into(),
            db_max_connections: 5,
            log_level: "info".into(),
            log_dir: None,
            request_timeout_ms: 5000,
            order_cancel_window_secs: 30,
            rate_limit: RateLimitConfig::default(),
            cache: CacheConfig::default(),
        }
    }
}

impl Config {
    /// 从环境变量加载配置
    ///
    /// 如果环境变量未设置，使用默认值
    pub fn from_env() -> Self {
        let d = Self::default();
        Self {
            database_path: std::env::var("DATABASE_PATH").unwrap_or(d.database_path),
            db_max_connections: env_or("DB_MAX_CONNECTIONS", d.db_max_connections),
            log_level: std::env::var("LOG_LEVEL").unwrap_or(d.log_level),
            log_dir: std::env::var("LOG_DIR").ok().filter(|v| !v.trim().is_empty()),
            request_timeout_ms: env_or("REQUEST_TIMEOUT_MS", d.request_timeout_ms),
            order_cancel_window_secs: env_or("ORDER_CANCEL_WINDOW_SECS", d.order_cancel_window_secs),
            rate_limit: RateLimitConfig::from_env(),
            cache: CacheConfig::from_env(),
        }
    }

    /// Reject values the runtime cannot work with
    pub fn validate(&self) -> Result<(), AppError> {
        let fail = |msg: &str| Err(AppError::with_message(ErrorCode::ConfigError, msg));

        if self.db_max_connections == 0 {
            return fail("DB_MAX_CONNECTIONS must be at least 1");
        }
        if self.request_timeout_ms == 0 || self.request_timeout_ms > MAX_REQUEST_TIMEOUT_MS {
            return fail("REQUEST_TIMEOUT_MS must be between 1 and 600000");
        }
        if !(self.rate_limit.requests_per_second.is_finite() && self.rate_limit.requests_per_second > 0.0)
        {
            return fail("RATE_LIMIT_RPS must be a positive number");
        }
        if self.rate_limit.burst_size == 0 {
            return fail("RATE_LIMIT_BURST must be at least 1");
        }
        if self.rate_limit.cleanup_interval.is_zero() || self.cache.cleanup_interval.is_zero() {
            return fail("cleanup intervals must be positive");
        }
        if self.cache.default_ttl.is_zero() {
            return fail("CACHE_TTL_SECS must be positive");
        }
        let max = Duration::from_secs(MAX_CACHE_SECS);
        if self.cache.default_ttl > max
            || self.cache.cleanup_interval > max
            || self.rate_limit.cleanup_interval > max
            || self.rate_limit.idle_timeout > max
        {
            return fail("cache and rate limit durations must not exceed 30 days");
        }
        Ok(())
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    pub fn order_cancel_window(&self) -> Duration {
        Duration::from_secs(self.order_cancel_window_secs)
    }

    /// 使用自定义数据库路径覆盖配置
    ///
    /// 常用于测试场景
    pub fn with_database(database_path: impl Into<String>) -> Self {
        Self {
            database_path: database_path.into(),
            ..Self::default()
        }
    }
}
