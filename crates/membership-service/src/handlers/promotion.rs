//! 用户促销 API 处理器

use axum::{
    Json,
    extract::{Path, State},
};
use tracing::info;

use crate::{
    error::MembershipError,
    repository::TransactionManager,
    response::ApiResponse,
    service::{ClaimPromotionRequest, UserPromotionDetail},
    state::AppState,
};

/// 查询用户领取的促销
///
/// GET /api/users/{user_id}/promotions
pub async fn list_user_promotions<T: TransactionManager>(
    State(state): State<AppState<T>>,
    Path(user_id): Path<i64>,
) -> Result<Json<ApiResponse<Vec<UserPromotionDetail>>>, MembershipError> {
    let claims = state
        .ledger
        .find_all_user_promotion_by_user_id(user_id)
        .await?;
    Ok(Json(ApiResponse::success(claims)))
}

/// 领取促销
///
/// POST /api/users/{user_id}/promotions/{promotion_id}/claims
pub async fn claim_promotion<T: TransactionManager>(
    State(state): State<AppState<T>>,
    Path((user_id, promotion_id)): Path<(i64, i64)>,
    Json(req): Json<ClaimPromotionRequest>,
) -> Result<Json<ApiResponse<UserPromotionDetail>>, MembershipError> {
    let claim = state
        .ledger
        .claim_promotion(req, promotion_id, user_id)
        .await?;

    info!(user_id, promotion_id, claim_id = claim.claim_id, "Promotion claimed");

    Ok(Json(ApiResponse::success(claim)))
}
