//! Assist configuration

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssistConfig {
    #[serde(default)]
    pub enabled: bool,
    /// Base URL of the functions host; endpoints live under `/functions/v1/`
    #[serde(default)]
    pub base_url: String,
    /// Bearer token sent with every call
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
}

fn default_timeout() -> u64 {
    20
}

impl Default for AssistConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            base_url: String::new(),
            api_key: None,
            timeout_secs: default_timeout(),
        }
    }
}

impl AssistConfig {
    /// Enabled when `SECONDOP_ASSIST_URL` is set
    pub fn from_env() -> Self {
        let _ = dotenvy::dotenv();
        let base_url = std::env::var("SECONDOP_ASSIST_URL").unwrap_or_default();
        Self {
            enabled: !base_url.trim().is_empty(),
            base_url,
            api_key: std::env::var("SECONDOP_ASSIST_KEY").ok(),
            timeout_secs: std::env::var("SECONDOP_ASSIST_TIMEOUT")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or_else(default_timeout),
        }
    }
}
