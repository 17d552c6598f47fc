//! Request and response bodies that are not marketplace types

use serde::{Deserialize, Serialize};

use secondop_types::{Locale, Money};

#[derive(Debug, Clone, Deserialize)]
pub struct AmountRequest {
    pub amount: Money,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApprovalRequest {
    pub approved: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RatingRequest {
    pub stars: u8,
    #[serde(default)]
    pub feedback: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RefineRequest {
    pub text: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefineResponse {
    pub refined: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisResponse {
    pub analysis: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LocaleBody {
    pub locale: Locale,
    #[serde(default)]
    pub rtl: bool,
}

impl From<Locale> for LocaleBody {
    fn from(locale: Locale) -> Self {
        Self {
            locale,
            rtl: locale.is_rtl(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct UserSearchQuery {
    #[serde(default)]
    pub search: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LeaderboardQuery {
    #[serde(default = "default_leaderboard_limit")]
    pub limit: usize,
}

fn default_leaderboard_limit() -> usize {
    10
}
