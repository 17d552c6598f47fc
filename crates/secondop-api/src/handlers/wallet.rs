//! Wallet Handlers

use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, State},
    Json,
};

use secondop_types::{Transaction, User};

use crate::dto::AmountRequest;
use crate::error::ApiResult;
use crate::extractors::CurrentUser;
use crate::state::AppState;

pub async fn deposit(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    body: Result<Json<AmountRequest>, JsonRejection>,
) -> ApiResult<Json<User>> {
    let Json(request) = body?;
    Ok(Json(state.market.deposit(&user.id, request.amount).await?))
}

pub async fn withdraw(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    body: Result<Json<AmountRequest>, JsonRejection>,
) -> ApiResult<Json<User>> {
    let Json(request) = body?;
    Ok(Json(state.market.withdraw(&user.id, request.amount).await?))
}

/// Own entries, newest first; admins see every entry
pub async fn transactions(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
) -> ApiResult<Json<Vec<Transaction>>> {
    Ok(Json(state.market.transactions(&user.id).await?))
}
