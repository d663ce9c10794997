//! PostgreSQL 工作单元
//!
//! 每个工作单元持有一个 sqlx 事务；未提交即 drop 时由 sqlx 自动回滚。

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgPool, Postgres, Transaction};
use tracing::debug;

use super::order_repo::{BranchRepository, OrderRepository};
use super::promotion_repo::{PromotionRepository, UserPromotionRepository};
use super::traits::{TransactionManager, UnitOfWork};
use super::user_repo::{TierRepository, UserRepository};
use crate::error::Result;
use crate::models::{
    Branch, MembershipTier, Order, OrderItem, OrderStatus, Promotion, User, UserPromotion,
};

/// 基于连接池的事务管理器
#[derive(Clone)]
pub struct PgTransactionManager {
    pool: PgPool,
}

impl PgTransactionManager {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl TransactionManager for PgTransactionManager {
    type Uow = PgUnitOfWork;

    async fn begin(&self) -> Result<PgUnitOfWork> {
        let tx = self.pool.begin().await?;
        Ok(PgUnitOfWork { tx })
    }
}

/// PostgreSQL 事务工作单元
pub struct PgUnitOfWork {
    tx: Transaction<'static, Postgres>,
}

#[async_trait]
impl UnitOfWork for PgUnitOfWork {
    async fn get_user(&mut self, id: i64) -> Result<Option<User>> {
        UserRepository::get_user_in_tx(&mut self.tx, id).await
    }

    async fn get_user_for_update(&mut self, id: i64) -> Result<Option<User>> {
        UserRepository::get_user_for_update_in_tx(&mut self.tx, id).await
    }

    async fn update_user_membership(
        &mut self,
        user_id: i64,
        accumulated_points: i64,
        membership_id: Option<i64>,
    ) -> Result<()> {
        UserRepository::update_membership_in_tx(
            &mut self.tx,
            user_id,
            accumulated_points,
            membership_id,
        )
        .await
    }

    async fn list_tiers(&mut self) -> Result<Vec<MembershipTier>> {
        TierRepository::list_tiers_in_tx(&mut self.tx).await
    }

    async fn get_tier(&mut self, id: i64) -> Result<Option<MembershipTier>> {
        TierRepository::get_tier_in_tx(&mut self.tx, id).await
    }

    async fn get_promotion(&mut self, id: i64) -> Result<Option<Promotion>> {
        PromotionRepository::get_promotion_in_tx(&mut self.tx, id).await
    }

    async fn get_promotion_for_update(&mut self, id: i64) -> Result<Option<Promotion>> {
        PromotionRepository::get_promotion_for_update_in_tx(&mut self.tx, id).await
    }

    async fn get_promotion_by_code(&mut self, code: &str) -> Result<Option<Promotion>> {
        PromotionRepository::get_promotion_by_code_in_tx(&mut self.tx, code).await
    }

    async fn create_promotion(&mut self, promotion: &Promotion) -> Result<i64> {
        PromotionRepository::create_promotion_in_tx(&mut self.tx, promotion).await
    }

    async fn decrement_promotion_quantity(&mut self, promotion_id: i64) -> Result<bool> {
        PromotionRepository::decrement_remaining_in_tx(&mut self.tx, promotion_id).await
    }

    async fn create_user_promotion(&mut self, claim: &UserPromotion) -> Result<i64> {
        UserPromotionRepository::create_in_tx(&mut self.tx, claim).await
    }

    async fn find_first_claimed(
        &mut self,
        user_id: i64,
        promotion_id: i64,
    ) -> Result<Option<UserPromotion>> {
        UserPromotionRepository::find_first_claimed_in_tx(&mut self.tx, user_id, promotion_id)
            .await
    }

    async fn count_claimed(&mut self, user_id: i64, promotion_id: i64) -> Result<i64> {
        UserPromotionRepository::count_claimed_in_tx(&mut self.tx, user_id, promotion_id).await
    }

    async fn promotion_claimed_by_other(
        &mut self,
        promotion_id: i64,
        user_id: i64,
    ) -> Result<bool> {
        UserPromotionRepository::claimed_by_other_in_tx(&mut self.tx, promotion_id, user_id).await
    }

    async fn mark_user_promotion_consumed(
        &mut self,
        claim_id: i64,
        consumed_at: DateTime<Utc>,
    ) -> Result<()> {
        UserPromotionRepository::mark_consumed_in_tx(&mut self.tx, claim_id, consumed_at).await
    }

    async fn list_user_promotions(&mut self, user_id: i64) -> Result<Vec<UserPromotion>> {
        UserPromotionRepository::list_by_user_in_tx(&mut self.tx, user_id).await
    }

    async fn get_branch(&mut self, id: i64) -> Result<Option<Branch>> {
        BranchRepository::get_branch_in_tx(&mut self.tx, id).await
    }

    async fn decrement_stock(
        &mut self,
        branch_id: i64,
        product_id: i64,
        quantity: i32,
    ) -> Result<bool> {
        BranchRepository::decrement_stock_in_tx(&mut self.tx, branch_id, product_id, quantity)
            .await
    }

    async fn create_order(&mut self, order: &Order) -> Result<i64> {
        OrderRepository::create_order_in_tx(&mut self.tx, order).await
    }

    async fn create_order_item(&mut self, item: &OrderItem) -> Result<i64> {
        OrderRepository::create_item_in_tx(&mut self.tx, item).await
    }

    async fn get_order(&mut self, id: i64) -> Result<Option<Order>> {
        OrderRepository::get_order_in_tx(&mut self.tx, id).await
    }

    async fn get_order_for_update(&mut self, id: i64) -> Result<Option<Order>> {
        OrderRepository::get_order_for_update_in_tx(&mut self.tx, id).await
    }

    async fn list_order_items(&mut self, order_id: i64) -> Result<Vec<OrderItem>> {
        OrderRepository::list_items_in_tx(&mut self.tx, order_id).await
    }

    async fn update_order_status(&mut self, order_id: i64, status: OrderStatus) -> Result<()> {
        OrderRepository::update_status_in_tx(&mut self.tx, order_id, status).await
    }

    async fn commit(self) -> Result<()> {
        self.tx.commit().await?;
        debug!("事务已提交");
        Ok(())
    }

    async fn rollback(self) -> Result<()> {
        self.tx.rollback().await?;
        debug!("事务已回滚");
        Ok(())
    }
}
