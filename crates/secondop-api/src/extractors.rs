//! Custom Axum Extractors
//!
//! Credentials are verified upstream; by the time a request reaches this
//! service the caller's account id and role travel in `x-user-id` and
//! `x-user-role`. The marketplace still checks both against the registry.

use std::sync::Arc;

use axum::{
    async_trait,
    extract::{FromRequestParts, Path},
    http::{request::Parts, HeaderMap},
};

use secondop_marketplace::{Identity, IdentityGateway};
use secondop_types::{CaseId, Role, User, UserId};

use crate::error::ApiError;
use crate::state::AppState;

pub const USER_ID_HEADER: &str = "x-user-id";
pub const USER_ROLE_HEADER: &str = "x-user-role";

/// Identity gateway backed by request headers
#[derive(Debug, Clone, Default)]
pub struct HeaderIdentity(Option<Identity>);

impl HeaderIdentity {
    /// Missing or malformed headers yield an anonymous caller
    pub fn from_headers(headers: &HeaderMap) -> Self {
        let header = |name: &str| headers.get(name).and_then(|v| v.to_str().ok());
        let identity = header(USER_ID_HEADER)
            .and_then(|id| UserId::parse(id.trim()).ok())
            .zip(header(USER_ROLE_HEADER).and_then(|r| r.trim().parse::<Role>().ok()))
            .map(|(user_id, role)| Identity { user_id, role });
        Self(identity)
    }
}

#[async_trait]
impl IdentityGateway for HeaderIdentity {
    async fn current_identity(&self) -> Option<Identity> {
        self.0.clone()
    }
}

/// The authenticated, approved caller
#[derive(Debug, Clone)]
pub struct CurrentUser(pub User);

#[async_trait]
impl FromRequestParts<Arc<AppState>> for CurrentUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let gateway = HeaderIdentity::from_headers(&parts.headers);
        let user = state.market.authenticate(&gateway).await?;
        Ok(CurrentUser(user))
    }
}

/// `:id` path segment parsed as a user id
pub struct UserPath(pub UserId);

#[async_trait]
impl<S: Send + Sync> FromRequestParts<S> for UserPath {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Path(raw) = Path::<String>::from_request_parts(parts, state)
            .await
            .map_err(|e| ApiError::InvalidParameter(e.body_text()))?;
        UserId::parse(&raw)
            .map(UserPath)
            .map_err(|_| ApiError::InvalidParameter(format!("invalid user id '{}'", raw)))
    }
}

/// `:id` path segment parsed as a case id
pub struct CasePath(pub CaseId);

#[async_trait]
impl<S: Send + Sync> FromRequestParts<S> for CasePath {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Path(raw) = Path::<String>::from_request_parts(parts, state)
            .await
            .map_err(|e| ApiError::InvalidParameter(e.body_text()))?;
        CaseId::parse(&raw)
            .map(CasePath)
            .map_err(|_| ApiError::InvalidParameter(format!("invalid case id '{}'", raw)))
    }
}
