//! 订单 API 处理器

use axum::{
    Json,
    extract::{Path, State},
    http::HeaderMap,
};

use crate::{
    error::MembershipError,
    models::UserRole,
    repository::TransactionManager,
    response::ApiResponse,
    service::{Actor, AddOrderRequest, OrderDetail, UpdateOrderStatusRequest},
    state::AppState,
};

/// 操作人 ID 请求头（由上游网关认证后注入）
pub const ACTOR_ID_HEADER: &str = "x-actor-id";
/// 操作人角色请求头
pub const ACTOR_ROLE_HEADER: &str = "x-actor-role";

/// 下单
///
/// POST /api/orders
pub async fn add_order<T: TransactionManager>(
    State(state): State<AppState<T>>,
    Json(req): Json<AddOrderRequest>,
) -> Result<Json<ApiResponse<OrderDetail>>, MembershipError> {
    let order = state.orders.add_order(req).await?;
    Ok(Json(ApiResponse::success(order)))
}

/// 查询订单
///
/// GET /api/orders/{order_id}
pub async fn get_order<T: TransactionManager>(
    State(state): State<AppState<T>>,
    Path(order_id): Path<i64>,
) -> Result<Json<ApiResponse<OrderDetail>>, MembershipError> {
    let order = state.orders.get_order(order_id).await?;
    Ok(Json(ApiResponse::success(order)))
}

/// 更新订单状态
///
/// PATCH /api/orders/{order_id}/status
pub async fn update_order_status<T: TransactionManager>(
    State(state): State<AppState<T>>,
    Path(order_id): Path<i64>,
    headers: HeaderMap,
    Json(req): Json<UpdateOrderStatusRequest>,
) -> Result<Json<ApiResponse<OrderDetail>>, MembershipError> {
    let actor = actor_from_headers(&headers)?;
    let order = state
        .orders
        .update_order_status(actor, order_id, req.status)
        .await?;
    Ok(Json(ApiResponse::success(order)))
}

/// 从请求头解析操作人，缺失或格式错误时拒绝
fn actor_from_headers(headers: &HeaderMap) -> Result<Actor, MembershipError> {
    let header = |name: &str| {
        headers
            .get(name)
            .and_then(|value| value.to_str().ok())
            .map(str::trim)
            .filter(|value| !value.is_empty())
    };

    let user_id = header(ACTOR_ID_HEADER)
        .and_then(|value| value.parse::<i64>().ok())
        .ok_or_else(|| MembershipError::Forbidden("缺少有效的操作人 ID".to_string()))?;

    let role = match header(ACTOR_ROLE_HEADER).map(str::to_ascii_uppercase).as_deref() {
        Some("ADMIN") => UserRole::Admin,
        Some("STAFF") => UserRole::Staff,
        Some("CUSTOMER") | None => UserRole::Customer,
        Some(other) => {
            return Err(MembershipError::Validation(format!("未知的操作人角色: {}", other)));
        }
    };

    Ok(Actor { user_id, role })
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn test_actor_from_headers() {
        let mut headers = HeaderMap::new();
        headers.insert(ACTOR_ID_HEADER, HeaderValue::from_static("7"));
        headers.insert(ACTOR_ROLE_HEADER, HeaderValue::from_static("staff"));

        let actor = actor_from_headers(&headers).unwrap();
        assert_eq!(actor.user_id, 7);
        assert_eq!(actor.role, UserRole::Staff);
    }

    #[test]
    fn test_actor_role_defaults_to_customer() {
        let mut headers = HeaderMap::new();
        headers.insert(ACTOR_ID_HEADER, HeaderValue::from_static("7"));

        assert_eq!(actor_from_headers(&headers).unwrap().role, UserRole::Customer);
    }

    #[test]
    fn test_actor_missing_id_forbidden() {
        let headers = HeaderMap::new();
        assert!(matches!(
            actor_from_headers(&headers),
            Err(MembershipError::Forbidden(_))
        ));
    }

    #[test]
    fn test_actor_unknown_role_rejected() {
        let mut headers = HeaderMap::new();
        headers.insert(ACTOR_ID_HEADER, HeaderValue::from_static("7"));
        headers.insert(ACTOR_ROLE_HEADER, HeaderValue::from_static("root"));
        assert!(matches!(
            actor_from_headers(&headers),
            Err(MembershipError::Validation(_))
        ));
    }
}
