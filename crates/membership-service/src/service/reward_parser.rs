//! 等级奖励条款解析
//!
//! 等级的结构化 reward_config 优先；缺失时从展示文案中解析：
//! - 发放数量："Provides N vouchers"
//! - 有效期："valid for N months"
//! - 折扣："N% discount"
//!
//! 三项相互独立，未匹配（或数值越界）时使用默认值。
//! 发放数量超过上限的条款视为非法配置。

use regex::Regex;

use crate::error::{MembershipError, Result};
use crate::models::{MembershipTier, RewardTerms};

/// 奖励条款解析器
///
/// 正则在构造时编译一次，之后可跨请求共享
#[derive(Debug, Clone)]
pub struct RewardTermsParser {
    quantity_regex: Regex,
    duration_regex: Regex,
    discount_regex: Regex,
    defaults: RewardTerms,
    max_vouchers: u32,
}

impl RewardTermsParser {
    pub fn new(defaults: RewardTerms, max_vouchers: u32) -> Result<Self> {
        if defaults.voucher_count > max_vouchers {
            return Err(MembershipError::Internal(format!(
                "默认发放数量 {} 超过上限 {}",
                defaults.voucher_count, max_vouchers
            )));
        }
        Ok(Self {
            quantity_regex: compile(r"(?i)provides\s+(\d+)\s+vouchers?")?,
            duration_regex: compile(r"(?i)valid\s+for\s+(\d+)\s+months?")?,
            discount_regex: compile(r"(?i)(\d+)\s*%\s*discount")?,
            defaults,
            max_vouchers,
        })
    }

    /// 解析等级的奖励条款
    ///
    /// reward_config 存在但格式错误时返回错误，不回退到文案解析
    pub fn resolve(&self, tier: &MembershipTier) -> Result<RewardTerms> {
        let terms = match tier.parse_reward_config()? {
            Some(terms) => terms,
            None => self.parse_description(&tier.description),
        };
        if terms.voucher_count > self.max_vouchers {
            return Err(MembershipError::Validation(format!(
                "等级 {} 的发放数量 {} 超过上限 {}",
                tier.name, terms.voucher_count, self.max_vouchers
            )));
        }
        Ok(terms)
    }

    /// 从文案解析奖励条款
    pub fn parse_description(&self, text: &str) -> RewardTerms {
        RewardTerms {
            voucher_count: capture(&self.quantity_regex, text)
                .unwrap_or(self.defaults.voucher_count),
            validity_months: capture(&self.duration_regex, text)
                .unwrap_or(self.defaults.validity_months),
            discount_percent: capture(&self.discount_regex, text)
                .unwrap_or(self.defaults.discount_percent),
        }
    }

    pub fn defaults(&self) -> RewardTerms {
        self.defaults
    }
}

fn compile(pattern: &str) -> Result<Regex> {
    Regex::new(pattern)
        .map_err(|e| MembershipError::Internal(format!("无效的正则表达式 '{}': {}", pattern, e)))
}

fn capture<T: std::str::FromStr>(regex: &Regex, text: &str) -> Option<T> {
    regex
        .captures(text)
        .and_then(|caps| caps.get(1))
        .and_then(|m| m.as_str().parse().ok())
}
