//! Leaderboard, admin reporting, locale and text assist

use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, Query, State},
    Json,
};

use secondop_marketplace::{BalanceDiscrepancy, LeaderboardEntry, PlatformStats, Standing};

use crate::dto::{LeaderboardQuery, LocaleBody, RefineRequest, RefineResponse};
use crate::error::ApiResult;
use crate::extractors::CurrentUser;
use crate::state::AppState;

pub async fn leaderboard(
    State(state): State<Arc<AppState>>,
    Query(query): Query<LeaderboardQuery>,
) -> ApiResult<Json<Vec<LeaderboardEntry>>> {
    Ok(Json(state.market.leaderboard(query.limit).await?))
}

pub async fn my_standing(
    State(state): State<Arc<AppState>>,
    CurrentUser(doctor): CurrentUser,
) -> ApiResult<Json<Standing>> {
    Ok(Json(state.market.standing(&doctor.id).await?))
}

pub async fn platform_stats(
    State(state): State<Arc<AppState>>,
    CurrentUser(admin): CurrentUser,
) -> ApiResult<Json<PlatformStats>> {
    Ok(Json(state.market.platform_stats(&admin.id).await?))
}

pub async fn audit_balances(
    State(state): State<Arc<AppState>>,
    CurrentUser(admin): CurrentUser,
) -> ApiResult<Json<Vec<BalanceDiscrepancy>>> {
    Ok(Json(state.market.audit_balances(&admin.id).await?))
}

pub async fn get_locale(State(state): State<Arc<AppState>>) -> Json<LocaleBody> {
    Json(state.market.locale().into())
}

pub async fn set_locale(
    State(state): State<Arc<AppState>>,
    body: Result<Json<LocaleBody>, JsonRejection>,
) -> ApiResult<Json<LocaleBody>> {
    let Json(request) = body?;
    Ok(Json(state.market.set_locale(request.locale).await?.into()))
}

pub async fn toggle_locale(State(state): State<Arc<AppState>>) -> ApiResult<Json<LocaleBody>> {
    Ok(Json(state.market.toggle_locale().await?.into()))
}

/// Best-effort; returns the input unchanged when assist is unavailable
pub async fn refine_symptoms(
    State(state): State<Arc<AppState>>,
    CurrentUser(_user): CurrentUser,
    body: Result<Json<RefineRequest>, JsonRejection>,
) -> ApiResult<Json<RefineResponse>> {
    let Json(request) = body?;
    let refined = state.market.refine_symptoms(&request.text).await;
    Ok(Json(RefineResponse { refined }))
}
