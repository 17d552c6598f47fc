//! Error types for the marketplace
//!
//! Every failure a caller can see is a `MarketError`, and every `MarketError`
//! belongs to exactly one `ErrorKind`. Rejected operations leave no partial
//! state behind.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::money::Money;

/// Result type for marketplace operations
pub type Result<T> = std::result::Result<T, MarketError>;

/// Coarse failure class a caller can branch on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Bad input shape, rejected before any mutation
    Validation,
    /// Wrong role, wrong case status, not approved, already rated
    Precondition,
    /// Balance too low for the requested debit
    InsufficientFunds,
    /// Email taken or a concurrent write won the race
    Conflict,
    /// Persistence layer unreachable or erroring
    Backend,
}

/// Marketplace error types
#[derive(Debug, Clone, PartialEq, Error)]
pub enum MarketError {
    // ========================================================================
    // Validation
    // ========================================================================

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Invalid amount: {0}")]
    InvalidAmount(String),

    // ========================================================================
    // Preconditions
    // ========================================================================

    #[error("No authenticated identity")]
    Unauthenticated,

    #[error("User {user_id} is not a patient")]
    NotAPatient { user_id: String },

    #[error("User {user_id} is not a doctor")]
    NotADoctor { user_id: String },

    #[error("User {user_id} is not an admin")]
    NotAnAdmin { user_id: String },

    #[error("Account {user_id} is pending admin approval")]
    NotApproved { user_id: String },

    #[error("User {user_id} not found")]
    UserNotFound { user_id: String },

    #[error("Case {case_id} not found")]
    CaseNotFound { case_id: String },

    #[error("Case {case_id} does not belong to {user_id}")]
    NotCaseOwner { case_id: String, user_id: String },

    #[error("Case {case_id} is not open (status: {status})")]
    CaseNotOpen { case_id: String, status: String },

    #[error("Case {case_id} is not closed (status: {status})")]
    CaseNotClosed { case_id: String, status: String },

    #[error("Case {case_id} has already been rated")]
    AlreadyRated { case_id: String },

    #[error("An admin account already exists")]
    AdminExists,

    // ========================================================================
    // Funds
    // ========================================================================

    #[error("Insufficient funds for {user_id}: requested {requested}, available {available}")]
    InsufficientFunds {
        user_id: String,
        requested: Money,
        available: Money,
    },

    // ========================================================================
    // Conflicts
    // ========================================================================

    #[error("Email {email} is already registered")]
    EmailTaken { email: String },

    #[error("Case {case_id} was modified concurrently")]
    ConcurrentModification { case_id: String },

    // ========================================================================
    // Backend
    // ========================================================================

    #[error("Backend error: {0}")]
    Backend(String),
}

impl MarketError {
    /// Failure class of this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidInput(_) | Self::InvalidAmount(_) => ErrorKind::Validation,

            Self::Unauthenticated
            | Self::NotAPatient { .. }
            | Self::NotADoctor { .. }
            | Self::NotAnAdmin { .. }
            | Self::NotApproved { .. }
            | Self::UserNotFound { .. }
            | Self::CaseNotFound { .. }
            | Self::NotCaseOwner { .. }
            | Self::CaseNotOpen { .. }
            | Self::CaseNotClosed { .. }
            | Self::AlreadyRated { .. }
            | Self::AdminExists => ErrorKind::Precondition,

            Self::InsufficientFunds { .. } => ErrorKind::InsufficientFunds,

            Self::EmailTaken { .. } | Self::ConcurrentModification { .. } => ErrorKind::Conflict,

            Self::Backend(_) => ErrorKind::Backend,
        }
    }

    /// Stable machine-readable code
    pub fn code(&self) -> &'static str {
        match self {
            Self::InvalidInput(_) => "invalid_input",
            Self::InvalidAmount(_) => "invalid_amount",
            Self::Unauthenticated => "unauthenticated",
            Self::NotAPatient { .. } => "not_a_patient",
            Self::NotADoctor { .. } => "not_a_doctor",
            Self::NotAnAdmin { .. } => "not_an_admin",
            Self::NotApproved { .. } => "not_approved",
            Self::UserNotFound { .. } => "user_not_found",
            Self::CaseNotFound { .. } => "case_not_found",
            Self::NotCaseOwner { .. } => "not_case_owner",
            Self::CaseNotOpen { .. } => "case_not_open",
            Self::CaseNotClosed { .. } => "case_not_closed",
            Self::AlreadyRated { .. } => "already_rated",
            Self::AdminExists => "admin_exists",
            Self::InsufficientFunds { .. } => "insufficient_funds",
            Self::EmailTaken { .. } => "email_taken",
            Self::ConcurrentModification { .. } => "concurrent_modification",
            Self::Backend(_) => "backend",
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::UserNotFound { .. } | Self::CaseNotFound { .. })
    }
}
