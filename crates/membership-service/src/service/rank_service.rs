//! 会员等级引擎
//!
//! 根据累计积分计算用户应处的等级：
//! 1. 等级按门槛升序（门槛相同按 id）扫描，取最后一个门槛 <= 积分的等级
//! 2. 积分直接覆盖（非累加）
//! 3. 等级变化（含从无到有、降级）即视为升级，触发促销生成
//! 4. 没有任何等级满足时清空用户等级，不生成促销
//!
//! 积分、等级与促销生成在同一个工作单元内，任一步失败全部回滚。

use std::sync::Arc;
use std::time::Instant;

use tracing::{info, instrument, warn};

use zentrix_shared::observability::metrics;

use crate::error::{MembershipError, Result};
use crate::models::MembershipTier;
use crate::repository::{TransactionManager, UnitOfWork};
use crate::service::dto::{MembershipUpdateResult, TierDto, TierSummary};
use crate::service::notifier::{MembershipNotifier, RankUpEvent};
use crate::service::promotion_generator::{PromotionGenerator, record_generated};

/// 选出积分可达的最高等级
///
/// 输入需已按门槛升序排列；门槛相同时排在后面的等级胜出
pub fn select_tier(tiers: &[MembershipTier], points: i64) -> Option<&MembershipTier> {
    tiers
        .iter()
        .filter(|tier| tier.point_threshold <= points)
        .last()
}

/// 会员等级引擎
pub struct MembershipRankEngine<T: TransactionManager> {
    tm: Arc<T>,
    generator: Arc<PromotionGenerator<T>>,
    notifier: Arc<dyn MembershipNotifier>,
}

impl<T: TransactionManager> MembershipRankEngine<T> {
    pub fn new(
        tm: Arc<T>,
        generator: Arc<PromotionGenerator<T>>,
        notifier: Arc<dyn MembershipNotifier>,
    ) -> Self {
        Self {
            tm,
            generator,
            notifier,
        }
    }

    /// 更新用户累计积分并重新计算等级
    #[instrument(skip(self))]
    pub async fn auto_update_membership(
        &self,
        user_id: i64,
        accumulated_points: i64,
    ) -> Result<MembershipUpdateResult> {
        let started = Instant::now();
        let mut uow = self.tm.begin().await?;

        let result = self
            .auto_update_membership_in_uow(&mut uow, user_id, accumulated_points)
            .await?;

        uow.commit().await?;

        self.publish(&result).await;
        metrics::record_operation_duration(
            "update_membership",
            started.elapsed().as_secs_f64(),
        );

        Ok(result)
    }

    /// 在调用方的工作单元中更新积分与等级
    ///
    /// 不发送通知，调用方提交后需调用 [`Self::publish`]
    pub async fn auto_update_membership_in_uow(
        &self,
        uow: &mut T::Uow,
        user_id: i64,
        accumulated_points: i64,
    ) -> Result<MembershipUpdateResult> {
        if accumulated_points < 0 {
            return Err(MembershipError::Validation(format!(
                "累计积分不能为负数: {}",
                accumulated_points
            )));
        }

        let user = uow
            .get_user_for_update(user_id)
            .await?
            .ok_or(MembershipError::UserNotFound(user_id))?;

        let tiers = uow.list_tiers().await?;
        let eligible = select_tier(&tiers, accumulated_points);
        let new_tier_id = eligible.map(|tier| tier.id);
        let changed = new_tier_id != user.membership_id;

        uow.update_user_membership(user_id, accumulated_points, new_tier_id)
            .await?;

        let mut result = MembershipUpdateResult {
            user_id,
            accumulated_points,
            previous_tier_id: user.membership_id,
            current_tier: eligible.map(|tier| TierSummary {
                id: tier.id,
                name: tier.name.clone(),
            }),
            ranked_up: false,
            promotions: Vec::new(),
        };

        match eligible {
            Some(tier) if changed => {
                result.ranked_up = true;
                result.promotions = self
                    .generator
                    .generate_in_uow(uow, user_id, tier, &user.username)
                    .await?;
                info!(
                    user_id,
                    previous_tier_id = ?user.membership_id,
                    tier_id = tier.id,
                    tier_name = %tier.name,
                    "会员等级变更"
                );
            }
            None if changed => {
                info!(user_id, previous_tier_id = ?user.membership_id, "积分不满足任何等级，清除会员等级");
            }
            _ => {}
        }

        Ok(result)
    }

    /// 提交后发布升级事件
    ///
    /// 通知失败只记录告警
    pub async fn publish(&self, result: &MembershipUpdateResult) {
        let Some(event) = rank_up_event(result) else {
            return;
        };

        metrics::record_rank_up(&event.tier_name);
        record_generated(&result.promotions);

        if let Err(e) = self.notifier.on_rank_up(&event).await {
            warn!(user_id = event.user_id, error = %e, "升级通知发送失败");
        }
    }

    /// 列出全部等级及其奖励条款
    #[instrument(skip(self))]
    pub async fn list_tiers(&self) -> Result<Vec<TierDto>> {
        let mut uow = self.tm.begin().await?;
        let tiers = uow.list_tiers().await?;
        uow.rollback().await?;

        let parser = self.generator.parser();
        tiers
            .into_iter()
            .map(|tier| {
                let reward = parser.resolve(&tier)?;
                Ok(TierDto::new(tier, reward))
            })
            .collect()
    }
}

fn rank_up_event(result: &MembershipUpdateResult) -> Option<RankUpEvent> {
    if !result.ranked_up {
        return None;
    }
    let tier = result.current_tier.as_ref()?;
    Some(RankUpEvent {
        user_id: result.user_id,
        previous_tier_id: result.previous_tier_id,
        tier_id: tier.id,
        tier_name: tier.name.clone(),
        promotion_codes: result.promotions.iter().map(|p| p.code.clone()).collect(),
    })
}
