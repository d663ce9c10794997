//! 服务层
//!
//! 实现会员与促销业务逻辑，所有读写经由工作单元完成。
//!
//! ## 模块结构
//!
//! - `dto`: 数据传输对象定义
//! - `reward_parser`: 等级奖励条款解析
//! - `promotion_generator`: 升级促销生成与发放
//! - `rank_service`: 会员等级引擎
//! - `ledger_service`: 用户促销领取台账
//! - `order_service`: 下单与订单状态流转
//! - `notifier`: 升级事件通知

pub mod dto;
pub mod ledger_service;
pub mod notifier;
pub mod order_service;
pub mod promotion_generator;
pub mod rank_service;
pub mod reward_parser;

pub use dto::*;
pub use ledger_service::{ClaimPolicy, UserPromotionLedger};
pub use notifier::{LoggingNotifier, MembershipNotifier, RankUpEvent};
pub use order_service::OrderService;
pub use promotion_generator::PromotionGenerator;
pub use rank_service::MembershipRankEngine;
pub use reward_parser::RewardTermsParser;
