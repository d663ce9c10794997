//! 枚举类型定义
//!
//! 所有枚举都支持数据库（sqlx）和 JSON（serde）序列化

use serde::{Deserialize, Serialize};

/// 用户角色
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[sqlx(type_name = "varchar", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum UserRole {
    /// 普通顾客
    #[default]
    Customer,
    /// 门店员工
    Staff,
    /// 管理员
    Admin,
}

impl UserRole {
    /// 是否为后台操作角色
    pub fn is_operator(&self) -> bool {
        matches!(self, Self::Staff | Self::Admin)
    }
}

/// 促销状态
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[sqlx(type_name = "varchar", rename_all = "lowercase")]
pub enum PromotionStatus {
    /// 启用
    #[default]
    Active,
    /// 停用
    Inactive,
}

/// 折扣类型
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[sqlx(type_name = "varchar", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DiscountType {
    /// 按百分比折扣
    #[default]
    Percent,
    /// 固定金额立减
    Amount,
}

/// 用户促销领取状态
///
/// 数据库中以整数标记存储：1 = 已领取（可用），0 = 已使用
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[repr(i16)]
pub enum ClaimStatus {
    /// 已使用
    Consumed = 0,
    /// 已领取
    Claimed = 1,
}

/// 领取来源
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[sqlx(type_name = "varchar", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ClaimSource {
    /// 用户主动领取
    #[default]
    Manual,
    /// 会员升级自动发放
    Membership,
}

/// 订单状态
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[sqlx(type_name = "varchar", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderStatus {
    #[default]
    Pending,
    Confirmed,
    Shipping,
    Completed,
    Cancelled,
}

impl OrderStatus {
    /// 检查状态流转是否合法
    ///
    /// PENDING -> CONFIRMED | CANCELLED
    /// CONFIRMED -> SHIPPING | CANCELLED
    /// SHIPPING -> COMPLETED
    pub fn can_transition_to(&self, next: OrderStatus) -> bool {
        matches!(
            (self, next),
            (Self::Pending, Self::Confirmed)
                | (Self::Pending, Self::Cancelled)
                | (Self::Confirmed, Self::Shipping)
                | (Self::Confirmed, Self::Cancelled)
                | (Self::Shipping, Self::Completed)
        )
    }

    /// 是否为终态
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Cancelled)
    }
}
