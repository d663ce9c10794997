//! 会员服务错误类型
//!
//! 业务错误分为三类：资源不存在、参数校验失败、业务规则拒绝；
//! 其余为系统错误。任何错误都会使当前工作单元回滚。

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use thiserror::Error;

use crate::models::OrderStatus;

/// 错误大类
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    NotFound,
    Validation,
    ActionFailed,
    System,
}

/// 会员服务错误类型
#[derive(Debug, Error)]
pub enum MembershipError {
    // === 资源不存在 ===
    #[error("用户不存在: {0}")]
    UserNotFound(i64),

    #[error("门店不存在: {0}")]
    BranchNotFound(i64),

    #[error("促销不存在: {0}")]
    PromotionNotFound(i64),

    #[error("会员等级不存在: {0}")]
    TierNotFound(i64),

    #[error("订单不存在: {0}")]
    OrderNotFound(i64),

    // === 参数校验 ===
    #[error("参数校验失败: {0}")]
    Validation(String),

    // === 业务规则 ===
    #[error("促销库存不足: promotion_id={0}")]
    PromotionOutOfStock(i64),

    #[error("促销不可用: promotion_id={promotion_id}, reason={reason}")]
    PromotionUnavailable { promotion_id: i64, reason: String },

    #[error("用户未领取该促销: user_id={user_id}, promotion_id={promotion_id}")]
    PromotionNotClaimed { user_id: i64, promotion_id: i64 },

    #[error("已达到促销领取上限: promotion_id={promotion_id}, limit={limit}")]
    ClaimLimitReached { promotion_id: i64, limit: u32 },

    #[error("促销码已存在: {0}")]
    DuplicatePromotionCode(String),

    #[error(
        "门店库存不足: branch_id={branch_id}, product_id={product_id}, requested={requested}"
    )]
    InsufficientStock {
        branch_id: i64,
        product_id: i64,
        requested: i32,
    },

    #[error("订单状态不允许此操作: order_id={order_id}, {from:?} -> {to:?}")]
    InvalidOrderStatus {
        order_id: i64,
        from: OrderStatus,
        to: OrderStatus,
    },

    #[error("无权执行此操作: {0}")]
    Forbidden(String),

    // === 系统错误 ===
    #[error("数据库错误: {0}")]
    Database(#[from] sqlx::Error),

    #[error("JSON 序列化错误: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("内部错误: {0}")]
    Internal(String),
}

/// 会员服务 Result 类型别名
pub type Result<T> = std::result::Result<T, MembershipError>;

impl MembershipError {
    /// 错误所属大类
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::UserNotFound(_)
            | Self::BranchNotFound(_)
            | Self::PromotionNotFound(_)
            | Self::TierNotFound(_)
            | Self::OrderNotFound(_) => ErrorKind::NotFound,
            Self::Validation(_) => ErrorKind::Validation,
            Self::PromotionOutOfStock(_)
            | Self::PromotionUnavailable { .. }
            | Self::PromotionNotClaimed { .. }
            | Self::ClaimLimitReached { .. }
            | Self::DuplicatePromotionCode(_)
            | Self::InsufficientStock { .. }
            | Self::InvalidOrderStatus { .. }
            | Self::Forbidden(_) => ErrorKind::ActionFailed,
            Self::Database(_) | Self::Serialization(_) | Self::Internal(_) => ErrorKind::System,
        }
    }

    /// 检查是否为业务错误（非系统错误）
    pub fn is_business_error(&self) -> bool {
        self.kind() != ErrorKind::System
    }

    /// 获取错误码（用于 API 响应与指标标签）
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::UserNotFound(_) => "USER_NOT_FOUND",
            Self::BranchNotFound(_) => "BRANCH_NOT_FOUND",
            Self::PromotionNotFound(_) => "PROMOTION_NOT_FOUND",
            Self::TierNotFound(_) => "TIER_NOT_FOUND",
            Self::OrderNotFound(_) => "ORDER_NOT_FOUND",
            Self::Validation(_) => "VALIDATION_ERROR",
            Self::PromotionOutOfStock(_) => "PROMOTION_OUT_OF_STOCK",
            Self::PromotionUnavailable { .. } => "PROMOTION_UNAVAILABLE",
            Self::PromotionNotClaimed { .. } => "PROMOTION_NOT_CLAIMED",
            Self::ClaimLimitReached { .. } => "CLAIM_LIMIT_REACHED",
            Self::DuplicatePromotionCode(_) => "DUPLICATE_PROMOTION_CODE",
            Self::InsufficientStock { .. } => "INSUFFICIENT_STOCK",
            Self::InvalidOrderStatus { .. } => "INVALID_ORDER_STATUS",
            Self::Forbidden(_) => "FORBIDDEN",
            Self::Database(_) => "DATABASE_ERROR",
            Self::Serialization(_) => "SERIALIZATION_ERROR",
            Self::Internal(_) => "INTERNAL_ERROR",
        }
    }

    /// 对应的 HTTP 状态码
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::Forbidden(_) => StatusCode::FORBIDDEN,
            _ => match self.kind() {
                ErrorKind::NotFound => StatusCode::NOT_FOUND,
                ErrorKind::Validation => StatusCode::BAD_REQUEST,
                ErrorKind::ActionFailed => StatusCode::CONFLICT,
                ErrorKind::System => StatusCode::INTERNAL_SERVER_ERROR,
            },
        }
    }
}

impl IntoResponse for MembershipError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        // 系统错误只返回通用提示，详细信息仅记录日志
        let message = if self.kind() == ErrorKind::System {
            tracing::error!(error = %self, code = self.error_code(), "请求处理失败");
            "服务内部错误，请稍后重试".to_string()
        } else {
            self.to_string()
        };

        let body = json!({
            "success": false,
            "code": self.error_code(),
            "message": message,
            "data": serde_json::Value::Null
        });

        (status, axum::Json(body)).into_response()
    }
}

/// 从 validator 错误转换
impl From<validator::ValidationErrors> for MembershipError {
    fn from(errors: validator::ValidationErrors) -> Self {
        Self::Validation(errors.to_string())
    }
}
