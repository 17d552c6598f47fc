//! Ledger entries
//!
//! A `Transaction` is an append-only record of one money movement for one
//! user. Entries are never updated or deleted.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::MarketError;
use crate::identity::{CaseId, TransactionId, UserId};
use crate::money::Money;

/// Kind of money movement
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionKind {
    /// Wallet top-up (credit)
    Deposit,
    /// Case creation fee (debit, tied to a case)
    CaseFee,
    /// Doctor payout for a case (credit, tied to a case) or a withdrawal
    /// (debit, no case)
    Payout,
    /// Platform margin on a paid case (credit)
    Commission,
}

impl TransactionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Deposit => "deposit",
            Self::CaseFee => "case_fee",
            Self::Payout => "payout",
            Self::Commission => "commission",
        }
    }

    /// Whether `amount` and `case_id` are a legal shape for this kind.
    pub fn permits(&self, amount: Money, case_id: Option<&CaseId>) -> bool {
        match self {
            Self::Deposit => amount.is_positive() && case_id.is_none(),
            Self::CaseFee => amount.is_negative() && case_id.is_some(),
            Self::Payout => {
                (amount.is_positive() && case_id.is_some())
                    || (amount.is_negative() && case_id.is_none())
            }
            Self::Commission => amount.is_positive() && case_id.is_some(),
        }
    }
}

impl fmt::Display for TransactionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TransactionKind {
    type Err = MarketError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "deposit" => Ok(Self::Deposit),
            "case_fee" => Ok(Self::CaseFee),
            "payout" => Ok(Self::Payout),
            "commission" => Ok(Self::Commission),
            other => Err(MarketError::InvalidInput(format!(
                "unknown transaction kind '{}'",
                other
            ))),
        }
    }
}

/// One ledger entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    pub id: TransactionId,
    pub user_id: UserId,
    /// Signed: negative = debit, positive = credit
    pub amount: Money,
    pub kind: TransactionKind,
    pub description: String,
    pub case_id: Option<CaseId>,
    pub created_at: DateTime<Utc>,
}
