//! 用户与会员等级仓储

use sqlx::PgConnection;

use crate::error::Result;
use crate::models::{MembershipTier, User};

/// 用户仓储
pub struct UserRepository;

impl UserRepository {
    /// 在事务中获取用户
    pub async fn get_user_in_tx(tx: &mut PgConnection, id: i64) -> Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT id, username, email, role, accumulated_points, membership_id,
                   created_at, updated_at
            FROM users
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(tx)
        .await?;

        Ok(user)
    }

    /// 在事务中获取用户并锁定行
    ///
    /// 使用 FOR UPDATE 防止并发的积分更新互相覆盖
    pub async fn get_user_for_update_in_tx(
        tx: &mut PgConnection,
        id: i64,
    ) -> Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT id, username, email, role, accumulated_points, membership_id,
                   created_at, updated_at
            FROM users
            WHERE id = $1
            FOR UPDATE
            "#,
        )
        .bind(id)
        .fetch_optional(tx)
        .await?;

        Ok(user)
    }

    /// 在事务中覆盖用户积分与会员等级
    pub async fn update_membership_in_tx(
        tx: &mut PgConnection,
        user_id: i64,
        accumulated_points: i64,
        membership_id: Option<i64>,
    ) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE users
            SET accumulated_points = $2, membership_id = $3, updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(user_id)
        .bind(accumulated_points)
        .bind(membership_id)
        .execute(tx)
        .await?;

        Ok(())
    }
}

/// 会员等级仓储
pub struct TierRepository;

impl TierRepository {
    /// 在事务中列出全部等级（门槛升序，门槛相同按 id 升序）
    pub async fn list_tiers_in_tx(tx: &mut PgConnection) -> Result<Vec<MembershipTier>> {
        let tiers = sqlx::query_as::<_, MembershipTier>(
            r#"
            SELECT id, name, point_threshold, description, reward_config,
                   created_at, updated_at
            FROM membership_tiers
            ORDER BY point_threshold ASC, id ASC
            "#,
        )
        .fetch_all(tx)
        .await?;

        Ok(tiers)
    }

    /// 在事务中获取单个等级
    pub async fn get_tier_in_tx(tx: &mut PgConnection, id: i64) -> Result<Option<MembershipTier>> {
        let tier = sqlx::query_as::<_, MembershipTier>(
            r#"
            SELECT id, name, point_threshold, description, reward_config,
                   created_at, updated_at
            FROM membership_tiers
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(tx)
        .await?;

        Ok(tier)
    }
}
