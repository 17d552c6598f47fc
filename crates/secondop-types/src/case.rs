//! Cases and opinions

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::MarketError;
use crate::identity::{CaseId, UserId};
use crate::user::Specialty;

/// Lifecycle status of a case
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CaseStatus {
    /// Waiting for a doctor's opinion
    Open,
    /// A doctor asked for more tests
    PendingInfo,
    /// A doctor agreed or disagreed; the doctor was paid
    Closed,
}

impl CaseStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Open => "open",
            Self::PendingInfo => "pending_info",
            Self::Closed => "closed",
        }
    }

    /// No transition leaves this status
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Open)
    }
}

impl fmt::Display for CaseStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CaseStatus {
    type Err = MarketError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "open" => Ok(Self::Open),
            "pending_info" => Ok(Self::PendingInfo),
            "closed" => Ok(Self::Closed),
            other => Err(MarketError::InvalidInput(format!("unknown case status '{}'", other))),
        }
    }
}

/// A doctor's verdict
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Decision {
    Agree,
    Disagree,
    MoreTests,
}

impl Decision {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Agree => "agree",
            Self::Disagree => "disagree",
            Self::MoreTests => "more_tests",
        }
    }

    /// Whether this verdict earns the doctor the payout
    pub fn is_paid(&self) -> bool {
        !matches!(self, Self::MoreTests)
    }
}

impl FromStr for Decision {
    type Err = MarketError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "agree" => Ok(Self::Agree),
            "disagree" => Ok(Self::Disagree),
            "more_tests" => Ok(Self::MoreTests),
            other => Err(MarketError::InvalidInput(format!("unknown decision '{}'", other))),
        }
    }
}

/// A doctor's opinion, embedded in its case. Immutable once written.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Opinion {
    pub doctor_id: UserId,
    /// Snapshot of the doctor's display name, survives account deletion
    pub doctor_name: String,
    pub decision: Decision,
    pub notes: String,
    pub created_at: DateTime<Utc>,
}

/// A patient's paid request for a second opinion
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Case {
    pub id: CaseId,
    pub patient_id: UserId,
    /// Snapshot of the patient's display name
    pub patient_name: String,
    pub specialty: Specialty,
    pub status: CaseStatus,
    pub symptoms: String,
    /// Set at creation for a direct request, or by opinion submission
    pub assigned_doctor_id: Option<UserId>,
    pub opinion: Option<Opinion>,
    pub patient_rating: Option<u8>,
    pub patient_feedback: Option<String>,
    pub is_rare: bool,
    pub created_at: DateTime<Utc>,
    /// Optimistic concurrency token, bumped on every write
    pub version: u64,
}

impl Case {
    /// Whether this case was addressed to a specific doctor and not yet claimed
    pub fn is_direct_request(&self) -> bool {
        self.assigned_doctor_id.is_some() && self.opinion.is_none()
    }

    pub fn opinion_doctor(&self) -> Option<&UserId> {
        self.opinion.as_ref().map(|o| &o.doctor_id)
    }

    pub fn is_rated(&self) -> bool {
        self.patient_rating.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_keys() {
        for status in [CaseStatus::Open, CaseStatus::PendingInfo, CaseStatus::Closed] {
            assert_eq!(status.as_str().parse::<CaseStatus>().unwrap(), status);
        }
        assert!("in_progress".parse::<CaseStatus>().is_err());
    }

    #[test]
    fn test_only_open_is_not_terminal() {
        assert!(!CaseStatus::Open.is_terminal());
        assert!(CaseStatus::Closed.is_terminal());
        assert!(CaseStatus::PendingInfo.is_terminal());
    }

    #[test]
    fn test_more_tests_is_unpaid() {
        assert!(Decision::Agree.is_paid());
        assert!(Decision::Disagree.is_paid());
        assert!(!Decision::MoreTests.is_paid());
    }
}
