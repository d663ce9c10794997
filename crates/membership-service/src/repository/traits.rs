//! 工作单元 Trait 定义
//!
//! 核心业务操作的全部读写都经由一个显式的工作单元完成：
//! `commit` 发布写入，其余任何退出路径（错误返回、drop）都回滚。
//! 服务层只依赖这些 trait，PostgreSQL 与内存两种后端分别实现。

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::Result;
use crate::models::{
    Branch, MembershipTier, Order, OrderItem, OrderStatus, Promotion, User, UserPromotion,
};

/// 事务范围内的数据访问接口
#[async_trait]
pub trait UnitOfWork: Send {
    // 用户
    async fn get_user(&mut self, id: i64) -> Result<Option<User>>;
    /// 读取并锁定用户行，直到工作单元结束
    async fn get_user_for_update(&mut self, id: i64) -> Result<Option<User>>;
    async fn update_user_membership(
        &mut self,
        user_id: i64,
        accumulated_points: i64,
        membership_id: Option<i64>,
    ) -> Result<()>;

    // 会员等级
    /// 按 point_threshold 升序、id 升序返回全部等级
    async fn list_tiers(&mut self) -> Result<Vec<MembershipTier>>;
    async fn get_tier(&mut self, id: i64) -> Result<Option<MembershipTier>>;

    // 促销
    async fn get_promotion(&mut self, id: i64) -> Result<Option<Promotion>>;
    /// 读取并锁定促销行，直到工作单元结束
    async fn get_promotion_for_update(&mut self, id: i64) -> Result<Option<Promotion>>;
    async fn get_promotion_by_code(&mut self, code: &str) -> Result<Option<Promotion>>;
    /// 创建促销，促销码重复时返回 `DuplicatePromotionCode`
    async fn create_promotion(&mut self, promotion: &Promotion) -> Result<i64>;
    /// 原子扣减 1 次剩余数量，仅当剩余数量 > 0 时成功
    async fn decrement_promotion_quantity(&mut self, promotion_id: i64) -> Result<bool>;

    // 用户领取记录
    async fn create_user_promotion(&mut self, claim: &UserPromotion) -> Result<i64>;
    /// 按 id 升序返回第一条 CLAIMED 状态的领取记录
    async fn find_first_claimed(
        &mut self,
        user_id: i64,
        promotion_id: i64,
    ) -> Result<Option<UserPromotion>>;
    async fn count_claimed(&mut self, user_id: i64, promotion_id: i64) -> Result<i64>;
    /// 促销是否已登记给其他用户（任意状态）
    async fn promotion_claimed_by_other(
        &mut self,
        promotion_id: i64,
        user_id: i64,
    ) -> Result<bool>;
    async fn mark_user_promotion_consumed(
        &mut self,
        claim_id: i64,
        consumed_at: DateTime<Utc>,
    ) -> Result<()>;
    /// 按领取时间倒序返回用户全部领取记录
    async fn list_user_promotions(&mut self, user_id: i64) -> Result<Vec<UserPromotion>>;

    // 门店与库存
    async fn get_branch(&mut self, id: i64) -> Result<Option<Branch>>;
    /// 原子扣减门店库存，仅当库存充足时成功
    async fn decrement_stock(
        &mut self,
        branch_id: i64,
        product_id: i64,
        quantity: i32,
    ) -> Result<bool>;

    // 订单
    async fn create_order(&mut self, order: &Order) -> Result<i64>;
    async fn create_order_item(&mut self, item: &OrderItem) -> Result<i64>;
    async fn get_order(&mut self, id: i64) -> Result<Option<Order>>;
    /// 读取并锁定订单行，直到工作单元结束
    async fn get_order_for_update(&mut self, id: i64) -> Result<Option<Order>>;
    async fn list_order_items(&mut self, order_id: i64) -> Result<Vec<OrderItem>>;
    async fn update_order_status(&mut self, order_id: i64, status: OrderStatus) -> Result<()>;

    /// 提交全部写入
    async fn commit(self) -> Result<()>;
    /// 显式回滚（drop 同样会回滚）
    async fn rollback(self) -> Result<()>;
}

/// 工作单元工厂
#[async_trait]
pub trait TransactionManager: Send + Sync + 'static {
    type Uow: UnitOfWork + 'static;

    /// 开启新的工作单元
    async fn begin(&self) -> Result<Self::Uow>;
}
