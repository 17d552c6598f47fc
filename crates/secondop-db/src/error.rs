//! Database error types

use secondop_types::{MarketError, Money};
use thiserror::Error;

/// Database operation errors
#[derive(Debug, Error)]
pub enum DbError {
    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Migration error: {0}")]
    Migration(String),

    #[error("Query error: {0}")]
    Query(#[from] sqlx::Error),

    #[error("User not found: {0}")]
    UserNotFound(String),

    #[error("Case not found: {0}")]
    CaseNotFound(String),

    /// Unique email violated
    #[error("Duplicate email: {0}")]
    Duplicate(String),

    /// Optimistic version check failed on a case write
    #[error("Version conflict on case {0}")]
    Conflict(String),

    #[error("Insufficient balance for {user_id}: requested {requested}, available {available}")]
    InsufficientBalance {
        user_id: String,
        requested: Money,
        available: Money,
    },

    /// A wallet adjustment would leave the representable range
    #[error("Balance out of range for {user_id}")]
    BalanceOverflow { user_id: String },

    #[error("Invalid stored data: {0}")]
    InvalidData(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Snapshot I/O error: {0}")]
    Io(String),
}

impl From<serde_json::Error> for DbError {
    fn from(e: serde_json::Error) -> Self {
        DbError::Serialization(e.to_string())
    }
}

impl From<std::io::Error> for DbError {
    fn from(e: std::io::Error) -> Self {
        DbError::Io(e.to_string())
    }
}

impl From<MarketError> for DbError {
    fn from(e: MarketError) -> Self {
        DbError::InvalidData(e.to_string())
    }
}

/// Map adapter failures onto the caller-facing taxonomy.
impl From<DbError> for MarketError {
    fn from(e: DbError) -> Self {
        match e {
            DbError::Duplicate(email) => MarketError::EmailTaken { email },
            DbError::Conflict(case_id) => MarketError::ConcurrentModification { case_id },
            DbError::InsufficientBalance {
                user_id,
                requested,
                available,
            } => MarketError::InsufficientFunds {
                user_id,
                requested,
                available,
            },
            DbError::BalanceOverflow { user_id } => MarketError::InvalidAmount(format!(
                "resulting balance for {} is out of range",
                user_id
            )),
            DbError::UserNotFound(user_id) => MarketError::UserNotFound { user_id },
            DbError::CaseNotFound(case_id) => MarketError::CaseNotFound { case_id },
            other => MarketError::Backend(other.to_string()),
        }
    }
}

/// Result type for database operations
pub type DbResult<T> = Result<T, DbError>;
