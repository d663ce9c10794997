//! 会员与促销核心服务
//!
//! 负责会员等级计算、升级促销的生成与发放、促销领取台账以及下单时的促销核销。
//!
//! ## 模块结构
//!
//! - `models`: 领域模型
//! - `repository`: 工作单元与数据访问（PostgreSQL / 内存）
//! - `service`: 业务逻辑
//! - `handlers` / `routes` / `state`: HTTP 接口
//! - `config`: `[membership]` 业务配置
//! - `error`: 错误类型

pub mod config;
pub mod error;
pub mod handlers;
pub mod models;
pub mod repository;
pub mod response;
pub mod routes;
pub mod service;
pub mod state;

pub use config::MembershipConfig;
pub use error::{ErrorKind, MembershipError, Result};
pub use models::*;
pub use repository::{MemoryStore, PgTransactionManager, TransactionManager, UnitOfWork};
pub use service::{
    LoggingNotifier, MembershipNotifier, MembershipRankEngine, OrderService, PromotionGenerator,
    RankUpEvent, UserPromotionLedger,
};
pub use state::AppState;

/// 服务名（配置文件名与日志中使用）
pub const SERVICE_NAME: &str = "membership-service";
