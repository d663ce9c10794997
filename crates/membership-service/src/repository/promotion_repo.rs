//! 促销与用户领取记录仓储

use chrono::{DateTime, Utc};
use sqlx::{PgConnection, Row};

use crate::error::{MembershipError, Result};
use crate::models::{ClaimStatus, Promotion, UserPromotion};

/// 促销仓储
pub struct PromotionRepository;

impl PromotionRepository {
    /// 在事务中获取促销
    pub async fn get_promotion_in_tx(tx: &mut PgConnection, id: i64) -> Result<Option<Promotion>> {
        let promotion = sqlx::query_as::<_, Promotion>(
            r#"
            SELECT id, code, description, discount_type, discount_value, start_date, end_date,
                   remaining_quantity, status, created_at, updated_at
            FROM promotions
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(tx)
        .await?;

        Ok(promotion)
    }

    /// 在事务中获取促销并锁定行
    ///
    /// 下单时使用，保证检查剩余数量与扣减之间不会被其他事务插入
    pub async fn get_promotion_for_update_in_tx(
        tx: &mut PgConnection,
        id: i64,
    ) -> Result<Option<Promotion>> {
        let promotion = sqlx::query_as::<_, Promotion>(
            r#"
            SELECT id, code, description, discount_type, discount_value, start_date, end_date,
                   remaining_quantity, status, created_at, updated_at
            FROM promotions
            WHERE id = $1
            FOR UPDATE
            "#,
        )
        .bind(id)
        .fetch_optional(tx)
        .await?;

        Ok(promotion)
    }

    /// 在事务中按促销码获取
    pub async fn get_promotion_by_code_in_tx(
        tx: &mut PgConnection,
        code: &str,
    ) -> Result<Option<Promotion>> {
        let promotion = sqlx::query_as::<_, Promotion>(
            r#"
            SELECT id, code, description, discount_type, discount_value, start_date, end_date,
                   remaining_quantity, status, created_at, updated_at
            FROM promotions
            WHERE code = $1
            "#,
        )
        .bind(code)
        .fetch_optional(tx)
        .await?;

        Ok(promotion)
    }

    /// 在事务中创建促销
    ///
    /// 促销码唯一约束冲突转换为 `DuplicatePromotionCode`
    pub async fn create_promotion_in_tx(
        tx: &mut PgConnection,
        promotion: &Promotion,
    ) -> Result<i64> {
        let row = sqlx::query(
            r#"
            INSERT INTO promotions (code, description, discount_type, discount_value,
                                    start_date, end_date, remaining_quantity, status,
                                    created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            RETURNING id
            "#,
        )
        .bind(&promotion.code)
        .bind(&promotion.description)
        .bind(promotion.discount_type)
        .bind(promotion.discount_value)
        .bind(promotion.start_date)
        .bind(promotion.end_date)
        .bind(promotion.remaining_quantity)
        .bind(promotion.status)
        .bind(promotion.created_at)
        .bind(promotion.updated_at)
        .fetch_one(tx)
        .await
        .map_err(|e| match e {
            sqlx::Error::Database(ref db) if db.is_unique_violation() => {
                MembershipError::DuplicatePromotionCode(promotion.code.clone())
            }
            other => MembershipError::Database(other),
        })?;

        Ok(row.get("id"))
    }

    /// 在事务中原子扣减剩余数量
    ///
    /// 条件更新：remaining_quantity > 0 时才扣减，返回是否扣减成功
    pub async fn decrement_remaining_in_tx(tx: &mut PgConnection, id: i64) -> Result<bool> {
        let result = sqlx::query(
            r#"
            UPDATE promotions
            SET remaining_quantity = remaining_quantity - 1, updated_at = NOW()
            WHERE id = $1 AND remaining_quantity > 0
            "#,
        )
        .bind(id)
        .execute(tx)
        .await?;

        Ok(result.rows_affected() == 1)
    }
}

/// 用户领取记录仓储
pub struct UserPromotionRepository;

impl UserPromotionRepository {
    /// 在事务中创建领取记录
    pub async fn create_in_tx(tx: &mut PgConnection, claim: &UserPromotion) -> Result<i64> {
        let row = sqlx::query(
            r#"
            INSERT INTO user_promotions (user_id, promotion_id, status, source,
                                         claimed_at, consumed_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING id
            "#,
        )
        .bind(claim.user_id)
        .bind(claim.promotion_id)
        .bind(claim.status)
        .bind(claim.source)
        .bind(claim.claimed_at)
        .bind(claim.consumed_at)
        .fetch_one(tx)
        .await?;

        Ok(row.get("id"))
    }

    /// 在事务中查找第一条可用的领取记录并锁定
    pub async fn find_first_claimed_in_tx(
        tx: &mut PgConnection,
        user_id: i64,
        promotion_id: i64,
    ) -> Result<Option<UserPromotion>> {
        let claim = sqlx::query_as::<_, UserPromotion>(
            r#"
            SELECT id, user_id, promotion_id, status, source, claimed_at, consumed_at
            FROM user_promotions
            WHERE user_id = $1 AND promotion_id = $2 AND status = $3
            ORDER BY id ASC
            LIMIT 1
            FOR UPDATE
            "#,
        )
        .bind(user_id)
        .bind(promotion_id)
        .bind(ClaimStatus::Claimed)
        .fetch_optional(tx)
        .await?;

        Ok(claim)
    }

    /// 在事务中统计可用的领取记录数
    pub async fn count_claimed_in_tx(
        tx: &mut PgConnection,
        user_id: i64,
        promotion_id: i64,
    ) -> Result<i64> {
        let count: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*)
            FROM user_promotions
            WHERE user_id = $1 AND promotion_id = $2 AND status = $3
            "#,
        )
        .bind(user_id)
        .bind(promotion_id)
        .bind(ClaimStatus::Claimed)
        .fetch_one(tx)
        .await?;

        Ok(count)
    }

    /// 在事务中检查促销是否已登记给其他用户
    pub async fn claimed_by_other_in_tx(
        tx: &mut PgConnection,
        promotion_id: i64,
        user_id: i64,
    ) -> Result<bool> {
        let exists: bool = sqlx::query_scalar(
            r#"
            SELECT EXISTS(
                SELECT 1 FROM user_promotions
                WHERE promotion_id = $1 AND user_id <> $2
            )
            "#,
        )
        .bind(promotion_id)
        .bind(user_id)
        .fetch_one(tx)
        .await?;

        Ok(exists)
    }

    /// 在事务中将领取记录标记为已使用
    pub async fn mark_consumed_in_tx(
        tx: &mut PgConnection,
        claim_id: i64,
        consumed_at: DateTime<Utc>,
    ) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE user_promotions
            SET status = $2, consumed_at = $3
            WHERE id = $1
            "#,
        )
        .bind(claim_id)
        .bind(ClaimStatus::Consumed)
        .bind(consumed_at)
        .execute(tx)
        .await?;

        Ok(())
    }

    /// 在事务中列出用户全部领取记录
    pub async fn list_by_user_in_tx(
        tx: &mut PgConnection,
        user_id: i64,
    ) -> Result<Vec<UserPromotion>> {
        let claims = sqlx::query_as::<_, UserPromotion>(
            r#"
            SELECT id, user_id, promotion_id, status, source, claimed_at, consumed_at
            FROM user_promotions
            WHERE user_id = $1
            ORDER BY claimed_at DESC, id DESC
            "#,
        )
        .bind(user_id)
        .fetch_all(tx)
        .await?;

        Ok(claims)
    }
}
