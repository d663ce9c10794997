//! 会员等级 API 处理器

use axum::{
    Json,
    extract::{Path, State},
};
use validator::Validate;

use crate::{
    error::MembershipError,
    repository::TransactionManager,
    response::ApiResponse,
    service::{GeneratedPromotion, MembershipUpdateResult, TierDto, UpdatePointsRequest},
    state::AppState,
};

/// 列出会员等级
///
/// GET /api/memberships/tiers
pub async fn list_tiers<T: TransactionManager>(
    State(state): State<AppState<T>>,
) -> Result<Json<ApiResponse<Vec<TierDto>>>, MembershipError> {
    let tiers = state.rank_engine.list_tiers().await?;
    Ok(Json(ApiResponse::success(tiers)))
}

/// 更新用户累计积分并重新计算等级
///
/// PUT /api/memberships/users/{user_id}/points
pub async fn update_points<T: TransactionManager>(
    State(state): State<AppState<T>>,
    Path(user_id): Path<i64>,
    Json(req): Json<UpdatePointsRequest>,
) -> Result<Json<ApiResponse<MembershipUpdateResult>>, MembershipError> {
    req.validate()?;

    let result = state
        .rank_engine
        .auto_update_membership(user_id, req.accumulated_points)
        .await?;
    Ok(Json(ApiResponse::success(result)))
}

/// 为用户生成指定等级的促销
///
/// POST /api/memberships/tiers/{tier_id}/users/{user_id}/promotions
pub async fn generate_promotions<T: TransactionManager>(
    State(state): State<AppState<T>>,
    Path((tier_id, user_id)): Path<(i64, i64)>,
) -> Result<Json<ApiResponse<Vec<GeneratedPromotion>>>, MembershipError> {
    let promotions = state
        .generator
        .generate_and_assign_promotions(user_id, tier_id)
        .await?;
    Ok(Json(ApiResponse::success(promotions)))
}
