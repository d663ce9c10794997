//! 会员业务配置（`[membership]` 配置段）

use serde::Deserialize;

use crate::models::RewardTerms;

/// 会员业务配置
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MembershipConfig {
    /// 订单完成时每多少实付金额累计 1 积分
    pub amount_per_point: i64,
    /// 同一用户对同一促销可持有的未使用领取记录上限，缺省表示不限
    pub max_claims_per_promotion: Option<u32>,
    /// 单个等级一次升级最多发放的促销数量
    pub max_vouchers_per_tier: u32,
    /// 文案中缺失某项条款时使用的默认值
    pub default_reward: DefaultRewardConfig,
}

impl Default for MembershipConfig {
    fn default() -> Self {
        Self {
            amount_per_point: 1000,
            max_claims_per_promotion: None,
            max_vouchers_per_tier: 20,
            default_reward: DefaultRewardConfig::default(),
        }
    }
}

impl MembershipConfig {
    /// 计算实付金额对应的积分
    pub fn points_for(&self, payable_amount: i64) -> i64 {
        if self.amount_per_point <= 0 {
            return 0;
        }
        payable_amount.max(0) / self.amount_per_point
    }
}

/// 默认奖励条款
#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(default)]
pub struct DefaultRewardConfig {
    pub voucher_count: u32,
    pub validity_months: u32,
    pub discount_percent: i32,
}

impl Default for DefaultRewardConfig {
    fn default() -> Self {
        let terms = RewardTerms::default();
        Self {
            voucher_count: terms.voucher_count,
            validity_months: terms.validity_months,
            discount_percent: terms.discount_percent,
        }
    }
}

impl From<DefaultRewardConfig> for RewardTerms {
    fn from(config: DefaultRewardConfig) -> Self {
        Self {
            voucher_count: config.voucher_count,
            validity_months: config.validity_months,
            discount_percent: config.discount_percent,
        }
    }
}
