//! 用户促销领取台账
//!
//! 记录用户持有与使用过的促销。同一用户对同一促销可多次领取，
//! 是否限制由 `membership.max_claims_per_promotion` 决定。

use std::sync::Arc;

use chrono::Utc;
use tracing::{info, instrument, warn};
use validator::Validate;

use crate::error::{MembershipError, Result};
use crate::models::{ClaimSource, ClaimStatus, PromotionStatus, UserPromotion};
use crate::repository::{TransactionManager, UnitOfWork};
use crate::service::dto::{ClaimPromotionRequest, UserPromotionDetail};

/// 领取策略
#[derive(Debug, Clone, Copy, Default)]
pub struct ClaimPolicy {
    max_claims: Option<u32>,
}

impl ClaimPolicy {
    pub fn new(max_claims: Option<u32>) -> Self {
        Self { max_claims }
    }

    pub fn unlimited() -> Self {
        Self { max_claims: None }
    }

    /// 领取上限已满时返回上限值
    async fn reached_limit<U: UnitOfWork>(
        &self,
        uow: &mut U,
        user_id: i64,
        promotion_id: i64,
    ) -> Result<Option<u32>> {
        let Some(limit) = self.max_claims else {
            return Ok(None);
        };
        let held = uow.count_claimed(user_id, promotion_id).await?;
        Ok((held >= i64::from(limit)).then_some(limit))
    }

    /// 在工作单元中领取，上限已满时返回 `ClaimLimitReached`
    pub async fn claim_in_uow<U: UnitOfWork>(
        &self,
        uow: &mut U,
        user_id: i64,
        promotion_id: i64,
        source: ClaimSource,
    ) -> Result<UserPromotion> {
        if let Some(limit) = self.reached_limit(uow, user_id, promotion_id).await? {
            return Err(MembershipError::ClaimLimitReached {
                promotion_id,
                limit,
            });
        }
        insert_claim(uow, user_id, promotion_id, source).await
    }

    /// 自动发放，上限已满时跳过并返回 None
    pub async fn auto_claim_in_uow<U: UnitOfWork>(
        &self,
        uow: &mut U,
        user_id: i64,
        promotion_id: i64,
    ) -> Result<Option<i64>> {
        if let Some(limit) = self.reached_limit(uow, user_id, promotion_id).await? {
            warn!(user_id, promotion_id, limit, "已达到领取上限，跳过自动发放");
            return Ok(None);
        }
        let claim = insert_claim(uow, user_id, promotion_id, ClaimSource::Membership).await?;
        Ok(Some(claim.id))
    }
}

async fn insert_claim<U: UnitOfWork>(
    uow: &mut U,
    user_id: i64,
    promotion_id: i64,
    source: ClaimSource,
) -> Result<UserPromotion> {
    let mut claim = UserPromotion {
        id: 0,
        user_id,
        promotion_id,
        status: ClaimStatus::Claimed,
        source,
        claimed_at: Utc::now(),
        consumed_at: None,
    };
    claim.id = uow.create_user_promotion(&claim).await?;
    Ok(claim)
}

/// 用户促销台账服务
pub struct UserPromotionLedger<T: TransactionManager> {
    tm: Arc<T>,
    policy: ClaimPolicy,
}

impl<T: TransactionManager> UserPromotionLedger<T> {
    pub fn new(tm: Arc<T>, policy: ClaimPolicy) -> Self {
        Self { tm, policy }
    }

    /// 查询用户全部领取记录（最新在前）
    #[instrument(skip(self))]
    pub async fn find_all_user_promotion_by_user_id(
        &self,
        user_id: i64,
    ) -> Result<Vec<UserPromotionDetail>> {
        let mut uow = self.tm.begin().await?;

        uow.get_user(user_id)
            .await?
            .ok_or(MembershipError::UserNotFound(user_id))?;

        let claims = uow.list_user_promotions(user_id).await?;
        let mut result = Vec::with_capacity(claims.len());
        for claim in claims {
            let promotion = uow
                .get_promotion(claim.promotion_id)
                .await?
                .ok_or(MembershipError::PromotionNotFound(claim.promotion_id))?;
            result.push(UserPromotionDetail {
                claim_id: claim.id,
                status: claim.status,
                source: claim.source,
                claimed_at: claim.claimed_at,
                consumed_at: claim.consumed_at,
                promotion,
            });
        }

        uow.rollback().await?;
        Ok(result)
    }

    /// 用户领取促销
    #[instrument(skip(self, request), fields(source = ?request.source))]
    pub async fn claim_promotion(
        &self,
        request: ClaimPromotionRequest,
        promotion_id: i64,
        user_id: i64,
    ) -> Result<UserPromotionDetail> {
        request.validate()?;

        let mut uow = self.tm.begin().await?;

        uow.get_user(user_id)
            .await?
            .ok_or(MembershipError::UserNotFound(user_id))?;
        let promotion = uow
            .get_promotion(promotion_id)
            .await?
            .ok_or(MembershipError::PromotionNotFound(promotion_id))?;
        if promotion.status != PromotionStatus::Active {
            return Err(MembershipError::PromotionUnavailable {
                promotion_id,
                reason: "inactive".to_string(),
            });
        }

        let claim = self
            .policy
            .claim_in_uow(&mut uow, user_id, promotion_id, request.source)
            .await?;

        uow.commit().await?;

        info!(user_id, promotion_id, claim_id = claim.id, "领取促销成功");

        Ok(UserPromotionDetail {
            claim_id: claim.id,
            status: claim.status,
            source: claim.source,
            claimed_at: claim.claimed_at,
            consumed_at: claim.consumed_at,
            promotion,
        })
    }
}
