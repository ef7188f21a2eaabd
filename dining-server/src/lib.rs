//! Dining Server - 餐厅就餐会话与订单后端
//!
//! # 架构概述
//!
//! - **会话** (`services::session`): 就餐会话生命周期，桌台独占
//! - **订单** (`services::order`): 订单/订单项生命周期，取消窗口，数量合并
//! - **分类** (`services::category`): 按名称幂等解析
//! - **数据库** (`db`): SQLite (sqlx)，仓储接口与实现
//! - **限流** (`rate_limit`): 按客户端令牌桶
//! - **缓存** (`cache`): TTL 缓存
//!
//! # 模块结构
//!
//! ```text
//! dining-server/src/
//! ├── core/          # 配置、状态、后台任务、超时
//! ├── db/            # 连接池、迁移、仓储
//! ├── services/      # 业务服务
//! ├── rate_limit.rs  # 令牌桶限流
//! ├── cache.rs       # TTL 缓存
//! └── utils/         # 日志
//! ```

pub mod cache;
pub mod core;
pub mod db;
pub mod rate_limit;
pub mod services;
pub mod utils;

// Re-export 公共类型
pub use cache::TtlCache;
pub use crate::core::{CacheConfig, Config, Deadline, RateLimitConfig, ServerState};
pub use rate_limit::RateLimiter;
pub use shared::error::{AppError, AppResult, ErrorCode, ErrorKind};

// Re-export logger functions
pub use utils::logger::{init_logger, init_logger_with_file};

/// Load `.env`, read the configuration and install the logger
pub fn setup_environment() -> Config {
    // .env is optional
    let _ = dotenv::dotenv();
    let config = Config::from_env();
    init_logger_with_file(Some(&config.log_level), config.log_dir.as_deref());
    config
}
