//! 订单、门店与库存实体

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::enums::OrderStatus;

/// 订单
///
/// promotion_id 在创建时确定，之后只允许修改状态
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub id: i64,
    /// 订单号（业务唯一标识）
    pub order_no: String,
    pub user_id: i64,
    pub branch_id: i64,
    #[sqlx(default)]
    pub promotion_id: Option<i64>,
    pub status: OrderStatus,
    /// 商品总额
    pub total_amount: i64,
    /// 促销折扣金额
    pub discount_amount: i64,
    /// 实付金额
    pub payable_amount: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// 订单明细
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct OrderItem {
    pub id: i64,
    pub order_id: i64,
    pub product_id: i64,
    pub quantity: i32,
    pub unit_price: i64,
}

impl OrderItem {
    /// 明细小计
    pub fn subtotal(&self) -> i64 {
        i64::from(self.quantity) * self.unit_price
    }
}

/// 门店
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Branch {
    pub id: i64,
    pub name: String,
    #[sqlx(default)]
    pub address: Option<String>,
    pub active: bool,
}

/// 门店商品库存
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct BranchStock {
    pub branch_id: i64,
    pub product_id: i64,
    pub quantity: i32,
}
