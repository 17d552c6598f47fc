//! Text-assist providers

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::config::AssistConfig;
use crate::types::*;

/// Best-effort text assistance. Implementations never fail.
#[async_trait]
pub trait TextAssist: Send + Sync {
    /// Get the provider name
    fn name(&self) -> &'static str;

    /// Refined symptom text, or `text` itself
    async fn refine(&self, text: &str) -> String;

    /// Pre-analysis for a doctor, or a generic notice
    async fn analyze(&self, brief: &CaseBrief) -> String;
}

/// Build the provider described by `config`
pub fn from_config(config: &AssistConfig) -> Arc<dyn TextAssist> {
    if config.enabled && !config.base_url.trim().is_empty() {
        Arc::new(EdgeFunctionAssist::new(config.clone()))
    } else {
        Arc::new(DisabledAssist)
    }
}

// ============================================================================
// Disabled Provider
// ============================================================================

/// Returns inputs unchanged and a fixed notice for analysis
#[derive(Debug, Clone, Copy, Default)]
pub struct DisabledAssist;

#[async_trait]
impl TextAssist for DisabledAssist {
    fn name(&self) -> &'static str {
        "disabled"
    }

    async fn refine(&self, text: &str) -> String {
        text.to_string()
    }

    async fn analyze(&self, _brief: &CaseBrief) -> String {
        ANALYSIS_DISABLED.to_string()
    }
}

// ============================================================================
// Edge Function Provider
// ============================================================================

/// Calls the hosted `refine-symptoms` and `analyze-case` functions
pub struct EdgeFunctionAssist {
    config: AssistConfig,
    client: reqwest::Client,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct RefineRequest<'a> {
    raw_text: &'a str,
}

#[derive(Deserialize)]
struct RefineResponse {
    refined: Option<String>,
}

#[derive(Deserialize)]
struct AnalyzeResponse {
    analysis: Option<String>,
}

/// Error body; `fallback` / `analysis` carry degraded output on 429
#[derive(Deserialize, Default)]
struct ErrorBody {
    error: Option<String>,
    fallback: Option<String>,
    analysis: Option<String>,
}

impl EdgeFunctionAssist {
    pub fn new(config: AssistConfig) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());
        Self { config, client }
    }

    pub fn from_env() -> Self {
        Self::new(AssistConfig::from_env())
    }

    fn endpoint(&self, function: &str) -> String {
        format!(
            "{}/functions/v1/{}",
            self.config.base_url.trim_end_matches('/'),
            function
        )
    }

    async fn call<B, R>(&self, function: &str, body: &B) -> Result<R>
    where
        B: Serialize + Sync,
        R: for<'de> Deserialize<'de>,
    {
        let mut req = self.client.post(self.endpoint(function)).json(body);
        if let Some(key) = &self.config.api_key {
            req = req.bearer_auth(key);
        }

        let response = req.send().await?;
        let status = response.status();
        if !status.is_success() {
            let body: ErrorBody = response.json().await.unwrap_or_default();
            if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
                return Err(AssistError::RateLimited {
                    fallback: body.fallback.or(body.analysis),
                });
            }
            return Err(AssistError::RequestFailed {
                message: body.error.unwrap_or_else(|| format!("HTTP {}", status)),
            });
        }

        response.json().await.map_err(|e| AssistError::InvalidResponse {
            message: e.to_string(),
        })
    }
}

#[async_trait]
impl TextAssist for EdgeFunctionAssist {
    fn name(&self) -> &'static str {
        "edge-function"
    }

    async fn refine(&self, text: &str) -> String {
        if text.chars().count() < MIN_REFINE_LEN {
            return text.to_string();
        }

        match self
            .call::<_, RefineResponse>("refine-symptoms", &RefineRequest { raw_text: text })
            .await
        {
            Ok(RefineResponse {
                refined: Some(refined),
            }) if !refined.trim().is_empty() => {
                debug!(chars = refined.len(), "Symptoms refined");
                refined
            }
            Ok(_) => text.to_string(),
            Err(AssistError::RateLimited { fallback }) => {
                warn!("Refine rate limited");
                fallback.unwrap_or_else(|| text.to_string())
            }
            Err(e) => {
                warn!(error = %e, "Refine failed, keeping original text");
                text.to_string()
            }
        }
    }

    async fn analyze(&self, brief: &CaseBrief) -> String {
        match self.call::<_, AnalyzeResponse>("analyze-case", brief).await {
            Ok(AnalyzeResponse {
                analysis: Some(analysis),
            }) if !analysis.trim().is_empty() => analysis,
            Ok(_) => ANALYSIS_UNAVAILABLE.to_string(),
            Err(AssistError::RateLimited { fallback }) => {
                warn!("Analysis rate limited");
                fallback.unwrap_or_else(|| ANALYSIS_RATE_LIMITED.to_string())
            }
            Err(e) => {
                warn!(error = %e, "Analysis failed");
                ANALYSIS_UNAVAILABLE.to_string()
            }
        }
    }
}
