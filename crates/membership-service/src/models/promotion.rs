//! 促销与用户领取记录实体

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::enums::{ClaimSource, ClaimStatus, DiscountType, PromotionStatus};

/// 促销
///
/// remaining_quantity 为剩余可用次数（null 视为不可用），永远不会被扣减为负数
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Promotion {
    pub id: i64,
    /// 促销码（唯一）
    pub code: String,
    #[sqlx(default)]
    pub description: Option<String>,
    pub discount_type: DiscountType,
    /// 折扣值：PERCENT 时为百分比，AMOUNT 时为金额
    pub discount_value: i32,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    #[sqlx(default)]
    pub remaining_quantity: Option<i32>,
    pub status: PromotionStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Promotion {
    /// 检查是否还有剩余数量
    pub fn has_stock(&self) -> bool {
        self.remaining_quantity.is_some_and(|remaining| remaining > 0)
    }

    /// 检查促销在指定时间是否可用，不可用时返回原因
    pub fn unavailable_reason(&self, now: DateTime<Utc>) -> Option<&'static str> {
        if self.status != PromotionStatus::Active {
            Some("inactive")
        } else if now < self.start_date {
            Some("not started")
        } else if now > self.end_date {
            Some("expired")
        } else {
            None
        }
    }

    /// 计算订单总额对应的折扣金额
    ///
    /// 百分比向下取整；固定金额不超过订单总额。结果不会超过 `total_amount`
    pub fn discount_for(&self, total_amount: i64) -> i64 {
        let value = i64::from(self.discount_value.max(0));
        match self.discount_type {
            DiscountType::Percent => {
                let discount = i128::from(total_amount) * i128::from(value.min(100)) / 100;
                i64::try_from(discount).unwrap_or(total_amount)
            }
            DiscountType::Amount => value.min(total_amount),
        }
    }
}

/// 用户促销领取记录
///
/// 每次发放一行；同一 (user, promotion) 可能存在多行，由领取策略控制
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct UserPromotion {
    pub id: i64,
    pub user_id: i64,
    pub promotion_id: i64,
    pub status: ClaimStatus,
    pub source: ClaimSource,
    pub claimed_at: DateTime<Utc>,
    #[sqlx(default)]
    pub consumed_at: Option<DateTime<Utc>>,
}

impl UserPromotion {
    /// 是否仍可使用
    pub fn is_claimed(&self) -> bool {
        self.status == ClaimStatus::Claimed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn promotion(discount_type: DiscountType, value: i32) -> Promotion {
        let now = Utc::now();
        Promotion {
            id: 1,
            code: "GOLD_ALICE".to_string(),
            description: None,
            discount_type,
            discount_value: value,
            start_date: now - Duration::days(1),
            end_date: now + Duration::days(30),
            remaining_quantity: Some(1),
            status: PromotionStatus::Active,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_has_stock() {
        let mut promo = promotion(DiscountType::Percent, 10);
        assert!(promo.has_stock());

        promo.remaining_quantity = Some(0);
        assert!(!promo.has_stock());

        promo.remaining_quantity = None;
        assert!(!promo.has_stock());
    }

    #[test]
    fn test_unavailable_reason() {
        let now = Utc::now();
        let mut promo = promotion(DiscountType::Percent, 10);
        assert_eq!(promo.unavailable_reason(now), None);

        promo.end_date = now - Duration::hours(1);
        assert_eq!(promo.unavailable_reason(now), Some("expired"));

        promo.status = PromotionStatus::Inactive;
        assert_eq!(promo.unavailable_reason(now), Some("inactive"));
    }

    #[test]
    fn test_discount_for() {
        assert_eq!(promotion(DiscountType::Percent, 10).discount_for(155_000), 15_500);
        assert_eq!(promotion(DiscountType::Percent, 15).discount_for(999), 149);
        assert_eq!(promotion(DiscountType::Amount, 50_000).discount_for(30_000), 30_000);
        assert_eq!(promotion(DiscountType::Amount, 20_000).discount_for(30_000), 20_000);
    }

    #[test]
    fn test_discount_for_large_total() {
        assert_eq!(
            promotion(DiscountType::Percent, 100).discount_for(i64::MAX),
            i64::MAX
        );
        assert_eq!(
            promotion(DiscountType::Percent, 50).discount_for(i64::MAX),
            i64::MAX / 2
        );
    }
}
