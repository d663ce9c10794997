//! 用户与会员等级实体

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::enums::UserRole;

/// 用户
///
/// accumulated_points 为累计积分，membership_id 仅由等级引擎修改
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: i64,
    pub username: String,
    pub email: String,
    pub role: UserRole,
    pub accumulated_points: i64,
    /// 当前会员等级（无等级时为空）
    #[sqlx(default)]
    pub membership_id: Option<i64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// 会员等级
///
/// 按 point_threshold 升序排列。description 为展示文案，
/// 旧数据的奖励条款编码在文案中；reward_config 存在时以其为准。
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct MembershipTier {
    pub id: i64,
    pub name: String,
    pub point_threshold: i64,
    pub description: String,
    /// 结构化奖励配置（JSON）
    /// 格式：{ "voucherCount": 2, "validityMonths": 3, "discountPercent": 10 }
    #[sqlx(default)]
    pub reward_config: Option<Value>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl MembershipTier {
    /// 解析结构化奖励配置
    pub fn parse_reward_config(&self) -> Result<Option<RewardTerms>, serde_json::Error> {
        self.reward_config
            .clone()
            .map(serde_json::from_value)
            .transpose()
    }
}

/// 等级奖励条款
///
/// 一次升级发放 voucher_count 张券，每张有效 validity_months 个月，折扣 discount_percent%
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RewardTerms {
    pub voucher_count: u32,
    pub validity_months: u32,
    pub discount_percent: i32,
}

impl Default for RewardTerms {
    fn default() -> Self {
        Self {
            voucher_count: 1,
            validity_months: 1,
            discount_percent: 5,
        }
    }
}
