//! 核心模块 - 配置、状态、后台任务与超时
//!
//! # 模块结构
//!
//! - [`Config`] - 服务器配置
//! - [`ServerState`] - 服务器状态
//! - [`tasks::PeriodicTask`] - 可取消的定时任务
//! - [`Deadline`] - 操作截止时间与取消

pub mod config;
pub mod deadline;
pub mod state;
pub mod tasks;

pub use config::{CacheConfig, Config, RateLimitConfig};
pub use deadline::Deadline;
pub use state::ServerState;
