//! Identity gateway port
//!
//! Credential checks happen outside the marketplace. The gateway only reports
//! who the current caller is; approval is checked against the registry.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use secondop_types::{Role, UserId};

/// An authenticated caller as reported by the gateway
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub user_id: UserId,
    pub role: Role,
}

#[async_trait]
pub trait IdentityGateway: Send + Sync {
    /// The verified caller, if any
    async fn current_identity(&self) -> Option<Identity>;
}

/// Gateway with a fixed answer
#[derive(Debug, Clone, Default)]
pub struct StaticIdentity(pub Option<Identity>);

impl StaticIdentity {
    pub fn signed_in(user_id: UserId, role: Role) -> Self {
        Self(Some(Identity { user_id, role }))
    }

    pub fn anonymous() -> Self {
        Self(None)
    }
}

#[async_trait]
impl IdentityGateway for StaticIdentity {
    async fn current_identity(&self) -> Option<Identity> {
        self.0.clone()
    }
}
