//! 升级促销生成
//!
//! 根据等级奖励条款为用户生成促销码并自动发放：
//! - 促销码：`TIERNAME_USERNAME`，多张时追加从 1 开始的序号
//! - 同一促销码已存在时复用，不重复创建，但仍会登记领取记录
//! - 规范化后不同用户名可能得到相同促销码，复用他人的促销码时记录告警
//! - 有效期按自然月计算

use std::sync::Arc;
use std::time::Instant;

use chrono::{DateTime, Months, Utc};
use tracing::{debug, info, instrument, warn};

use zentrix_shared::observability::metrics;

use crate::error::{MembershipError, Result};
use crate::models::{DiscountType, MembershipTier, Promotion, PromotionStatus};
use crate::repository::{TransactionManager, UnitOfWork};
use crate::service::dto::GeneratedPromotion;
use crate::service::ledger_service::ClaimPolicy;
use crate::service::reward_parser::RewardTermsParser;

/// 促销码最大长度（与 promotions.code 列宽一致）
pub const MAX_PROMOTION_CODE_LEN: usize = 255;

/// 促销生成器
pub struct PromotionGenerator<T: TransactionManager> {
    tm: Arc<T>,
    parser: Arc<RewardTermsParser>,
    policy: ClaimPolicy,
}

impl<T: TransactionManager> PromotionGenerator<T> {
    pub fn new(tm: Arc<T>, parser: Arc<RewardTermsParser>, policy: ClaimPolicy) -> Self {
        Self { tm, parser, policy }
    }

    pub fn parser(&self) -> &RewardTermsParser {
        &self.parser
    }

    /// 为用户生成并发放指定等级的促销
    #[instrument(skip(self))]
    pub async fn generate_and_assign_promotions(
        &self,
        user_id: i64,
        tier_id: i64,
    ) -> Result<Vec<GeneratedPromotion>> {
        let started = Instant::now();
        let mut uow = self.tm.begin().await?;

        let user = uow
            .get_user(user_id)
            .await?
            .ok_or(MembershipError::UserNotFound(user_id))?;
        let tier = uow
            .get_tier(tier_id)
            .await?
            .ok_or(MembershipError::TierNotFound(tier_id))?;

        let promotions = self
            .generate_in_uow(&mut uow, user_id, &tier, &user.username)
            .await?;

        uow.commit().await?;

        record_generated(&promotions);
        metrics::record_operation_duration(
            "generate_promotions",
            started.elapsed().as_secs_f64(),
        );

        Ok(promotions)
    }

    /// 在调用方的工作单元中生成并发放促销
    pub async fn generate_in_uow(
        &self,
        uow: &mut T::Uow,
        user_id: i64,
        tier: &MembershipTier,
        username: &str,
    ) -> Result<Vec<GeneratedPromotion>> {
        let terms = self.parser.resolve(tier)?;
        if terms.voucher_count == 0 {
            info!(tier_id = tier.id, "等级奖励数量为 0，不生成促销");
            return Ok(Vec::new());
        }

        let start_date = Utc::now();
        let end_date = add_months(start_date, terms.validity_months)?;
        let mut generated = Vec::with_capacity(terms.voucher_count as usize);

        for index in 1..=terms.voucher_count {
            let sequence = (terms.voucher_count > 1).then_some(index);
            let code = promotion_code(&tier.name, username, sequence)?;

            let (promotion_id, created) = match uow.get_promotion_by_code(&code).await? {
                Some(existing) => {
                    if uow.promotion_claimed_by_other(existing.id, user_id).await? {
                        warn!(
                            code = %code,
                            promotion_id = existing.id,
                            user_id,
                            "促销码已登记给其他用户，用户名规范化后冲突"
                        );
                    } else {
                        debug!(code = %code, promotion_id = existing.id, "促销码已存在，复用");
                    }
                    (existing.id, false)
                }
                None => {
                    let promotion = Promotion {
                        id: 0,
                        code: code.clone(),
                        description: Some(format!(
                            "{} membership reward: {}% discount",
                            tier.name, terms.discount_percent
                        )),
                        discount_type: DiscountType::Percent,
                        discount_value: terms.discount_percent,
                        start_date,
                        end_date,
                        remaining_quantity: Some(1),
                        status: PromotionStatus::Active,
                        created_at: start_date,
                        updated_at: start_date,
                    };
                    (uow.create_promotion(&promotion).await?, true)
                }
            };

            let claim_id = self
                .policy
                .auto_claim_in_uow(uow, user_id, promotion_id)
                .await?;

            generated.push(GeneratedPromotion {
                promotion_id,
                code,
                created,
                claim_id,
            });
        }

        info!(
            user_id,
            tier_id = tier.id,
            count = generated.len(),
            discount_percent = terms.discount_percent,
            validity_months = terms.validity_months,
            "已生成等级促销"
        );

        Ok(generated)
    }
}

/// 记录生成指标
pub(crate) fn record_generated(promotions: &[GeneratedPromotion]) {
    let created = promotions.iter().filter(|p| p.created).count() as u64;
    let reused = promotions.len() as u64 - created;
    metrics::record_promotions_generated(created, reused);
}

/// 生成促销码
///
/// 等级名与用户名转大写，连续空白替换为单个 `_`，超过列宽时返回校验错误
pub fn promotion_code(tier_name: &str, username: &str, sequence: Option<u32>) -> Result<String> {
    let base = format!("{}_{}", normalize(tier_name), normalize(username));
    let code = match sequence {
        Some(index) => format!("{}_{}", base, index),
        None => base,
    };
    if code.chars().count() > MAX_PROMOTION_CODE_LEN {
        return Err(MembershipError::Validation(format!(
            "促销码长度超过 {} 个字符",
            MAX_PROMOTION_CODE_LEN
        )));
    }
    Ok(code)
}

fn normalize(part: &str) -> String {
    part.split_whitespace()
        .collect::<Vec<_>>()
        .join("_")
        .to_uppercase()
}

/// 按自然月计算结束时间（月末日期自动截断，如 1 月 31 日 + 1 个月 = 2 月 28/29 日）
pub fn add_months(start: DateTime<Utc>, months: u32) -> Result<DateTime<Utc>> {
    start
        .checked_add_months(Months::new(months))
        .ok_or_else(|| MembershipError::Validation(format!("有效期超出范围: {} 个月", months)))
}
