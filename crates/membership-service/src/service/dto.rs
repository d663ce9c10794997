//! 服务层数据传输对象
//!
//! 请求 DTO 带 validator 校验规则，响应 DTO 与内部领域模型解耦

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::models::{
    ClaimSource, ClaimStatus, MembershipTier, Order, OrderItem, OrderStatus, Promotion,
    RewardTerms, UserRole,
};

// ============================================================================
// 请求
// ============================================================================

/// 更新用户累计积分请求
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdatePointsRequest {
    #[validate(range(min = 0, message = "累计积分不能为负数"))]
    pub accumulated_points: i64,
}

/// 领取促销请求
#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ClaimPromotionRequest {
    #[serde(default)]
    pub source: ClaimSource,
}

/// 下单请求
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct AddOrderRequest {
    pub user_id: i64,
    pub branch_id: i64,
    pub promotion_id: Option<i64>,
    #[validate(length(min = 1, message = "订单至少包含一个商品"), nested)]
    pub items: Vec<OrderItemRequest>,
}

/// 下单商品明细
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct OrderItemRequest {
    pub product_id: i64,
    #[validate(range(min = 1, message = "商品数量至少为 1"))]
    pub quantity: i32,
    #[validate(range(min = 0, message = "商品单价不能为负数"))]
    pub unit_price: i64,
}

/// 更新订单状态请求
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateOrderStatusRequest {
    pub status: OrderStatus,
}

/// 操作人（由上游网关认证后注入）
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Actor {
    pub user_id: i64,
    pub role: UserRole,
}

// ============================================================================
// 响应
// ============================================================================

/// 会员等级 DTO（附带解析后的奖励条款）
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TierDto {
    pub id: i64,
    pub name: String,
    pub point_threshold: i64,
    pub description: String,
    pub reward: RewardTerms,
}

impl TierDto {
    pub fn new(tier: MembershipTier, reward: RewardTerms) -> Self {
        Self {
            id: tier.id,
            name: tier.name,
            point_threshold: tier.point_threshold,
            description: tier.description,
            reward,
        }
    }
}

/// 等级摘要
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TierSummary {
    pub id: i64,
    pub name: String,
}

/// 单个发放的促销
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeneratedPromotion {
    pub promotion_id: i64,
    pub code: String,
    /// true 表示新建，false 表示复用已存在的促销码
    pub created: bool,
    /// 领取记录 id，领取上限已满时为空
    #[serde(skip_serializing_if = "Option::is_none")]
    pub claim_id: Option<i64>,
}

/// 会员等级更新结果
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MembershipUpdateResult {
    pub user_id: i64,
    pub accumulated_points: i64,
    pub previous_tier_id: Option<i64>,
    pub current_tier: Option<TierSummary>,
    pub ranked_up: bool,
    pub promotions: Vec<GeneratedPromotion>,
}

/// 用户领取记录详情（附带促销信息）
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserPromotionDetail {
    pub claim_id: i64,
    pub status: ClaimStatus,
    pub source: ClaimSource,
    pub claimed_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub consumed_at: Option<DateTime<Utc>>,
    pub promotion: Promotion,
}

/// 订单详情
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderDetail {
    #[serde(flatten)]
    pub order: Order,
    pub items: Vec<OrderItem>,
}
