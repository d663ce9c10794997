//! 内存存储后端
//!
//! 用于本地运行与测试。工作单元在开启时获取全局锁并复制一份工作副本，
//! 提交时整体写回，drop 时丢弃副本，因此事务之间完全串行。

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::{Mutex, OwnedMutexGuard};

use super::traits::{TransactionManager, UnitOfWork};
use crate::error::{MembershipError, Result};
use crate::models::{
    Branch, BranchStock, ClaimStatus, MembershipTier, Order, OrderItem, OrderStatus, Promotion,
    User, UserPromotion,
};

#[derive(Debug, Clone, Default)]
struct MemoryState {
    next_id: i64,
    users: BTreeMap<i64, User>,
    tiers: BTreeMap<i64, MembershipTier>,
    promotions: BTreeMap<i64, Promotion>,
    user_promotions: BTreeMap<i64, UserPromotion>,
    branches: BTreeMap<i64, Branch>,
    stocks: HashMap<(i64, i64), i32>,
    orders: BTreeMap<i64, Order>,
    order_items: BTreeMap<i64, OrderItem>,
}

impl MemoryState {
    fn allocate_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }

    /// 预置数据保留调用方给定的 id，为 0 时自动分配
    fn reserve_id(&mut self, id: i64) -> i64 {
        if id <= 0 {
            self.allocate_id()
        } else {
            self.next_id = self.next_id.max(id);
            id
        }
    }
}

/// 内存存储（可克隆，克隆体共享同一份数据）
#[derive(Clone, Default)]
pub struct MemoryStore {
    state: Arc<Mutex<MemoryState>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert_user(&self, mut user: User) -> i64 {
        let mut state = self.state.lock().await;
        user.id = state.reserve_id(user.id);
        let id = user.id;
        state.users.insert(id, user);
        id
    }

    pub async fn insert_tier(&self, mut tier: MembershipTier) -> i64 {
        let mut state = self.state.lock().await;
        tier.id = state.reserve_id(tier.id);
        let id = tier.id;
        state.tiers.insert(id, tier);
        id
    }

    pub async fn insert_promotion(&self, mut promotion: Promotion) -> i64 {
        let mut state = self.state.lock().await;
        promotion.id = state.reserve_id(promotion.id);
        let id = promotion.id;
        state.promotions.insert(id, promotion);
        id
    }

    pub async fn insert_user_promotion(&self, mut claim: UserPromotion) -> i64 {
        let mut state = self.state.lock().await;
        claim.id = state.reserve_id(claim.id);
        let id = claim.id;
        state.user_promotions.insert(id, claim);
        id
    }

    pub async fn insert_branch(&self, mut branch: Branch) -> i64 {
        let mut state = self.state.lock().await;
        branch.id = state.reserve_id(branch.id);
        let id = branch.id;
        state.branches.insert(id, branch);
        id
    }

    pub async fn set_stock(&self, stock: BranchStock) {
        let mut state = self.state.lock().await;
        state
            .stocks
            .insert((stock.branch_id, stock.product_id), stock.quantity);
    }

    pub async fn user(&self, id: i64) -> Option<User> {
        self.state.lock().await.users.get(&id).cloned()
    }

    pub async fn promotion(&self, id: i64) -> Option<Promotion> {
        self.state.lock().await.promotions.get(&id).cloned()
    }

    pub async fn promotion_by_code(&self, code: &str) -> Option<Promotion> {
        self.state
            .lock()
            .await
            .promotions
            .values()
            .find(|p| p.code == code)
            .cloned()
    }

    pub async fn promotion_count(&self) -> usize {
        self.state.lock().await.promotions.len()
    }

    /// 用户全部领取记录（按 id 升序）
    pub async fn user_promotions(&self, user_id: i64) -> Vec<UserPromotion> {
        self.state
            .lock()
            .await
            .user_promotions
            .values()
            .filter(|c| c.user_id == user_id)
            .cloned()
            .collect()
    }

    pub async fn stock(&self, branch_id: i64, product_id: i64) -> Option<i32> {
        self.state
            .lock()
            .await
            .stocks
            .get(&(branch_id, product_id))
            .copied()
    }

    pub async fn orders(&self) -> Vec<Order> {
        self.state.lock().await.orders.values().cloned().collect()
    }

    pub async fn order_item_count(&self) -> usize {
        self.state.lock().await.order_items.len()
    }
}

#[async_trait]
impl TransactionManager for MemoryStore {
    type Uow = MemoryUnitOfWork;

    async fn begin(&self) -> Result<MemoryUnitOfWork> {
        let guard = self.state.clone().lock_owned().await;
        let working = guard.clone();
        Ok(MemoryUnitOfWork { guard, working })
    }
}

/// 内存工作单元
pub struct MemoryUnitOfWork {
    guard: OwnedMutexGuard<MemoryState>,
    working: MemoryState,
}

#[async_trait]
impl UnitOfWork for MemoryUnitOfWork {
    async fn get_user(&mut self, id: i64) -> Result<Option<User>> {
        Ok(self.working.users.get(&id).cloned())
    }

    async fn get_user_for_update(&mut self, id: i64) -> Result<Option<User>> {
        self.get_user(id).await
    }

    async fn update_user_membership(
        &mut self,
        user_id: i64,
        accumulated_points: i64,
        membership_id: Option<i64>,
    ) -> Result<()> {
        if let Some(user) = self.working.users.get_mut(&user_id) {
            user.accumulated_points = accumulated_points;
            user.membership_id = membership_id;
            user.updated_at = Utc::now();
        }
        Ok(())
    }

    async fn list_tiers(&mut self) -> Result<Vec<MembershipTier>> {
        let mut tiers: Vec<_> = self.working.tiers.values().cloned().collect();
        tiers.sort_by_key(|t| (t.point_threshold, t.id));
        Ok(tiers)
    }

    async fn get_tier(&mut self, id: i64) -> Result<Option<MembershipTier>> {
        Ok(self.working.tiers.get(&id).cloned())
    }

    async fn get_promotion(&mut self, id: i64) -> Result<Option<Promotion>> {
        Ok(self.working.promotions.get(&id).cloned())
    }

    async fn get_promotion_for_update(&mut self, id: i64) -> Result<Option<Promotion>> {
        self.get_promotion(id).await
    }

    async fn get_promotion_by_code(&mut self, code: &str) -> Result<Option<Promotion>> {
        Ok(self
            .working
            .promotions
            .values()
            .find(|p| p.code == code)
            .cloned())
    }

    async fn create_promotion(&mut self, promotion: &Promotion) -> Result<i64> {
        if self
            .working
            .promotions
            .values()
            .any(|p| p.code == promotion.code)
        {
            return Err(MembershipError::DuplicatePromotionCode(
                promotion.code.clone(),
            ));
        }

        let id = self.working.allocate_id();
        let mut row = promotion.clone();
        row.id = id;
        self.working.promotions.insert(id, row);
        Ok(id)
    }

    async fn decrement_promotion_quantity(&mut self, promotion_id: i64) -> Result<bool> {
        let Some(promotion) = self.working.promotions.get_mut(&promotion_id) else {
            return Ok(false);
        };
        match promotion.remaining_quantity {
            Some(remaining) if remaining > 0 => {
                promotion.remaining_quantity = Some(remaining - 1);
                promotion.updated_at = Utc::now();
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn create_user_promotion(&mut self, claim: &UserPromotion) -> Result<i64> {
        let id = self.working.allocate_id();
        let mut row = claim.clone();
        row.id = id;
        self.working.user_promotions.insert(id, row);
        Ok(id)
    }

    async fn find_first_claimed(
        &mut self,
        user_id: i64,
        promotion_id: i64,
    ) -> Result<Option<UserPromotion>> {
        Ok(self
            .working
            .user_promotions
            .values()
            .find(|c| {
                c.user_id == user_id && c.promotion_id == promotion_id && c.is_claimed()
            })
            .cloned())
    }

    async fn count_claimed(&mut self, user_id: i64, promotion_id: i64) -> Result<i64> {
        let count = self
            .working
            .user_promotions
            .values()
            .filter(|c| c.user_id == user_id && c.promotion_id == promotion_id && c.is_claimed())
            .count();
        Ok(count as i64)
    }

    async fn promotion_claimed_by_other(
        &mut self,
        promotion_id: i64,
        user_id: i64,
    ) -> Result<bool> {
        Ok(self
            .working
            .user_promotions
            .values()
            .any(|c| c.promotion_id == promotion_id && c.user_id != user_id))
    }

    async fn mark_user_promotion_consumed(
        &mut self,
        claim_id: i64,
        consumed_at: DateTime<Utc>,
    ) -> Result<()> {
        if let Some(claim) = self.working.user_promotions.get_mut(&claim_id) {
            claim.status = ClaimStatus::Consumed;
            claim.consumed_at = Some(consumed_at);
        }
        Ok(())
    }

    async fn list_user_promotions(&mut self, user_id: i64) -> Result<Vec<UserPromotion>> {
        let mut claims: Vec<_> = self
            .working
            .user_promotions
            .values()
            .filter(|c| c.user_id == user_id)
            .cloned()
            .collect();
        claims.sort_by(|a, b| b.claimed_at.cmp(&a.claimed_at).then(b.id.cmp(&a.id)));
        Ok(claims)
    }

    async fn get_branch(&mut self, id: i64) -> Result<Option<Branch>> {
        Ok(self.working.branches.get(&id).cloned())
    }

    async fn decrement_stock(
        &mut self,
        branch_id: i64,
        product_id: i64,
        quantity: i32,
    ) -> Result<bool> {
        match self.working.stocks.get_mut(&(branch_id, product_id)) {
            Some(available) if *available >= quantity => {
                *available -= quantity;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn create_order(&mut self, order: &Order) -> Result<i64> {
        let id = self.working.allocate_id();
        let mut row = order.clone();
        row.id = id;
        self.working.orders.insert(id, row);
        Ok(id)
    }

    async fn create_order_item(&mut self, item: &OrderItem) -> Result<i64> {
        let id = self.working.allocate_id();
        let mut row = item.clone();
        row.id = id;
        self.working.order_items.insert(id, row);
        Ok(id)
    }

    async fn get_order(&mut self, id: i64) -> Result<Option<Order>> {
        Ok(self.working.orders.get(&id).cloned())
    }

    async fn get_order_for_update(&mut self, id: i64) -> Result<Option<Order>> {
        self.get_order(id).await
    }

    async fn list_order_items(&mut self, order_id: i64) -> Result<Vec<OrderItem>> {
        Ok(self
            .working
            .order_items
            .values()
            .filter(|i| i.order_id == order_id)
            .cloned()
            .collect())
    }

    async fn update_order_status(&mut self, order_id: i64, status: OrderStatus) -> Result<()> {
        if let Some(order) = self.working.orders.get_mut(&order_id) {
            order.status = status;
            order.updated_at = Utc::now();
        }
        Ok(())
    }

    async fn commit(self) -> Result<()> {
        let Self { mut guard, working } = self;
        *guard = working;
        Ok(())
    }

    async fn rollback(self) -> Result<()> {
        Ok(())
    }
}
