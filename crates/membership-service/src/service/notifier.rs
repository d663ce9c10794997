//! 升级通知
//!
//! 事务提交后回调，通知失败只记录日志，不影响已提交的结果

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::Result;

/// 会员升级事件
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RankUpEvent {
    pub user_id: i64,
    pub previous_tier_id: Option<i64>,
    pub tier_id: i64,
    pub tier_name: String,
    pub promotion_codes: Vec<String>,
}

/// 升级通知接口
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MembershipNotifier: Send + Sync {
    async fn on_rank_up(&self, event: &RankUpEvent) -> Result<()>;
}

/// 仅输出日志的通知实现
#[derive(Debug, Clone, Default)]
pub struct LoggingNotifier;

#[async_trait]
impl MembershipNotifier for LoggingNotifier {
    async fn on_rank_up(&self, event: &RankUpEvent) -> Result<()> {
        info!(
            user_id = event.user_id,
            tier_id = event.tier_id,
            tier_name = %event.tier_name,
            promotions = ?event.promotion_codes,
            "会员升级"
        );
        Ok(())
    }
}
