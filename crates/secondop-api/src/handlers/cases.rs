//! Case Handlers
//!
//! Creation, opinions, ratings and the role-dependent case listings.

use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, Query, State},
    http::StatusCode,
    Json,
};

use secondop_marketplace::{CaseFilter, NewCase, OpinionSubmission};
use secondop_types::{Case, Role};

use crate::dto::{AnalysisResponse, RatingRequest};
use crate::error::ApiResult;
use crate::extractors::{CasePath, CurrentUser};
use crate::state::AppState;

pub async fn create_case(
    State(state): State<Arc<AppState>>,
    CurrentUser(patient): CurrentUser,
    body: Result<Json<NewCase>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<Case>)> {
    let Json(request) = body?;
    let case = state.market.create_case(&patient.id, request).await?;
    Ok((StatusCode::CREATED, Json(case)))
}

/// Patients get their own cases, doctors the cases they answered, admins
/// everything matching the filter
pub async fn list_cases(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    Query(filter): Query<CaseFilter>,
) -> ApiResult<Json<Vec<Case>>> {
    let cases = match user.role {
        Role::Patient => state.market.my_cases(&user.id).await?,
        Role::Doctor => state.market.my_opinions(&user.id).await?,
        Role::Admin => state.market.all_cases(&user.id, &filter).await?,
    };
    Ok(Json(cases))
}

pub async fn available_cases(
    State(state): State<Arc<AppState>>,
    CurrentUser(doctor): CurrentUser,
) -> ApiResult<Json<Vec<Case>>> {
    Ok(Json(state.market.available_cases(&doctor.id).await?))
}

pub async fn get_case(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    CasePath(case_id): CasePath,
) -> ApiResult<Json<Case>> {
    Ok(Json(state.market.get_case(&user.id, &case_id).await?))
}

pub async fn submit_opinion(
    State(state): State<Arc<AppState>>,
    CurrentUser(doctor): CurrentUser,
    CasePath(case_id): CasePath,
    body: Result<Json<OpinionSubmission>, JsonRejection>,
) -> ApiResult<Json<Case>> {
    let Json(submission) = body?;
    let case = state
        .market
        .submit_opinion(&doctor.id, &case_id, submission)
        .await?;
    Ok(Json(case))
}

pub async fn rate_doctor(
    State(state): State<Arc<AppState>>,
    CurrentUser(patient): CurrentUser,
    CasePath(case_id): CasePath,
    body: Result<Json<RatingRequest>, JsonRejection>,
) -> ApiResult<Json<Case>> {
    let Json(request) = body?;
    let case = state
        .market
        .rate_doctor(&patient.id, &case_id, request.stars, request.feedback)
        .await?;
    Ok(Json(case))
}

pub async fn analyze_case(
    State(state): State<Arc<AppState>>,
    CurrentUser(doctor): CurrentUser,
    CasePath(case_id): CasePath,
) -> ApiResult<Json<AnalysisResponse>> {
    let analysis = state.market.analyze_case(&doctor.id, &case_id).await?;
    Ok(Json(AnalysisResponse { analysis }))
}
