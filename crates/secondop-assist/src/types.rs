//! Common types for text assistance

use serde::Serialize;
use thiserror::Error;

use secondop_types::Case;

/// Errors raised inside a provider. Never escape `TextAssist`.
#[derive(Error, Debug)]
pub enum AssistError {
    #[error("Rate limited")]
    RateLimited { fallback: Option<String> },

    #[error("Request failed: {message}")]
    RequestFailed { message: String },

    #[error("Invalid response: {message}")]
    InvalidResponse { message: String },

    #[error("Network error: {message}")]
    NetworkError { message: String },
}

impl From<reqwest::Error> for AssistError {
    fn from(e: reqwest::Error) -> Self {
        AssistError::NetworkError {
            message: e.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, AssistError>;

/// Texts shorter than this are returned without a round trip
pub const MIN_REFINE_LEN: usize = 5;

/// Shown when an analysis cannot be produced
pub const ANALYSIS_UNAVAILABLE: &str = "Could not generate AI analysis at this time.";

/// Shown when the provider is rate limited and sent no fallback
pub const ANALYSIS_RATE_LIMITED: &str = "AI analysis temporarily unavailable.";

/// Shown when assistance is switched off
pub const ANALYSIS_DISABLED: &str = "AI analysis is not enabled.";

/// What the analyzer is told about a case
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CaseBrief {
    pub specialty: String,
    pub symptoms: String,
    pub patient_name: String,
}

impl From<&Case> for CaseBrief {
    fn from(case: &Case) -> Self {
        Self {
            specialty: case.specialty.display_name().to_string(),
            symptoms: case.symptoms.clone(),
            patient_name: case.patient_name.clone(),
        }
    }
}
