//! 路由配置模块
//!
//! 定义所有 REST API 端点的路由映射

use axum::{
    Json, Router,
    routing::{get, patch, post, put},
};
use tower_http::trace::TraceLayer;

use crate::{handlers, repository::TransactionManager, state::AppState};

/// 会员等级路由
fn membership_routes<T: TransactionManager>() -> Router<AppState<T>> {
    Router::new()
        .route("/memberships/tiers", get(handlers::membership::list_tiers::<T>))
        .route(
            "/memberships/users/{user_id}/points",
            put(handlers::membership::update_points::<T>),
        )
        .route(
            "/memberships/tiers/{tier_id}/users/{user_id}/promotions",
            post(handlers::membership::generate_promotions::<T>),
        )
}

/// 用户促销路由
fn promotion_routes<T: TransactionManager>() -> Router<AppState<T>> {
    Router::new()
        .route(
            "/users/{user_id}/promotions",
            get(handlers::promotion::list_user_promotions::<T>),
        )
        .route(
            "/users/{user_id}/promotions/{promotion_id}/claims",
            post(handlers::promotion::claim_promotion::<T>),
        )
}

/// 订单路由
fn order_routes<T: TransactionManager>() -> Router<AppState<T>> {
    Router::new()
        .route("/orders", post(handlers::order::add_order::<T>))
        .route("/orders/{order_id}", get(handlers::order::get_order::<T>))
        .route(
            "/orders/{order_id}/status",
            patch(handlers::order::update_order_status::<T>),
        )
}

/// 全部业务 API 路由
pub fn api_routes<T: TransactionManager>() -> Router<AppState<T>> {
    Router::new()
        .merge(membership_routes())
        .merge(promotion_routes())
        .merge(order_routes())
}

/// 构建完整应用
pub fn app<T: TransactionManager>(state: AppState<T>) -> Router {
    Router::new()
        .nest("/api", api_routes())
        .route("/health", get(health_check))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// 存活探针
async fn health_check() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "ok",
        "service": "zentrix-membership"
    }))
}
