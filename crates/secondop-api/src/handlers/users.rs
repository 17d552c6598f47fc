//! Account Handlers

use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, Query, State},
    http::StatusCode,
    Json,
};

use secondop_marketplace::DoctorSearch;
use secondop_types::{ProfileUpdate, Registration, User};

use crate::dto::{ApprovalRequest, UserSearchQuery};
use crate::error::ApiResult;
use crate::extractors::{CurrentUser, UserPath};
use crate::state::AppState;

pub async fn register(
    State(state): State<Arc<AppState>>,
    body: Result<Json<Registration>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<User>)> {
    let Json(data) = body?;
    let user = state.market.register(data).await?;
    Ok((StatusCode::CREATED, Json(user)))
}

pub async fn me(CurrentUser(user): CurrentUser) -> Json<User> {
    Json(user)
}

pub async fn list_users(
    State(state): State<Arc<AppState>>,
    CurrentUser(admin): CurrentUser,
    Query(query): Query<UserSearchQuery>,
) -> ApiResult<Json<Vec<User>>> {
    let users = state
        .market
        .list_users(&admin.id, query.search.as_deref())
        .await?;
    Ok(Json(users))
}

pub async fn get_user(
    State(state): State<Arc<AppState>>,
    CurrentUser(caller): CurrentUser,
    UserPath(user_id): UserPath,
) -> ApiResult<Json<User>> {
    Ok(Json(state.market.get_user(&caller.id, &user_id).await?))
}

pub async fn update_profile(
    State(state): State<Arc<AppState>>,
    CurrentUser(caller): CurrentUser,
    UserPath(user_id): UserPath,
    body: Result<Json<ProfileUpdate>, JsonRejection>,
) -> ApiResult<Json<User>> {
    let Json(update) = body?;
    let user = state
        .market
        .update_profile(&caller.id, &user_id, update)
        .await?;
    Ok(Json(user))
}

pub async fn set_approval(
    State(state): State<Arc<AppState>>,
    CurrentUser(admin): CurrentUser,
    UserPath(user_id): UserPath,
    body: Result<Json<ApprovalRequest>, JsonRejection>,
) -> ApiResult<Json<User>> {
    let Json(request) = body?;
    let user = state
        .market
        .approve(&admin.id, &user_id, request.approved)
        .await?;
    Ok(Json(user))
}

pub async fn delete_user(
    State(state): State<Arc<AppState>>,
    CurrentUser(admin): CurrentUser,
    UserPath(user_id): UserPath,
) -> ApiResult<StatusCode> {
    state.market.delete_user(&admin.id, &user_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Public doctor directory
pub async fn find_doctors(
    State(state): State<Arc<AppState>>,
    Query(search): Query<DoctorSearch>,
) -> ApiResult<Json<Vec<User>>> {
    Ok(Json(state.market.find_doctors(&search).await?))
}
