//! Ollama advisor backend
//!
//! HTTP client for the Ollama generate API. The prompt embeds the monthly
//! pattern and asks for a strict JSON array of recommendations.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::Result;
use crate::models::UsagePattern;

use super::parsing::parse_recommendations;
use super::{AdvisorBackend, CandidateRecommendation};

/// Ollama-backed advisor
#[derive(Clone)]
pub struct OllamaAdvisor {
    http_client: Client,
    base_url: String,
    model: String,
}

impl OllamaAdvisor {
    /// Create a new Ollama advisor
    pub fn new(base_url: &str, model: &str) -> Self {
        Self {
            http_client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            model: model.to_string(),
        }
    }

    /// Create from environment variables
    pub fn from_env() -> Option<Self> {
        let host = std::env::var("OLLAMA_HOST").ok()?;
        let model = std::env::var("OLLAMA_MODEL").unwrap_or_else(|_| "llama3.2".to_string());
        Some(Self::new(&host, &model))
    }

    fn build_prompt(pattern: &UsagePattern) -> String {
        format!(
            r#"You are a utility savings advisor. A household has this monthly {utility} usage pattern:
- average usage: {average} {unit}
- peak usage: {peak} {unit}
- off-peak usage: {off_peak} {unit}
- trend: {trend}

Suggest up to 5 savings recommendations. Respond with ONLY a JSON array, no other text.
Each element must have exactly these fields:
- "kind": one of "usage_reduction", "time_shift", "appliance_upgrade", "behavior_change", "tariff_optimization"
- "text": one or two sentences of actionable advice
- "expected_savings": estimated monthly savings as a decimal string, e.g. "12.50"
- "difficulty": one of "easy", "medium", "hard"
"#,
            utility = pattern.utility.as_str(),
            average = pattern.average_usage,
            peak = pattern.peak_usage,
            off_peak = pattern.off_peak_usage,
            trend = pattern.trend.as_str(),
            unit = pattern.utility.unit(),
        )
    }
}

/// Request to Ollama API
#[derive(Debug, Serialize)]
struct OllamaRequest {
    model: String,
    prompt: String,
    stream: bool,
}

/// Response from Ollama API
#[derive(Debug, Deserialize)]
struct OllamaResponse {
    response: String,
}

#[async_trait]
impl AdvisorBackend for OllamaAdvisor {
    async fn recommend(&self, pattern: &UsagePattern) -> Result<Vec<CandidateRecommendation>> {
        let request = OllamaRequest {
            model: self.model.clone(),
            prompt: Self::build_prompt(pattern),
            stream: false,
        };

        let response = self
            .http_client
            .post(format!("{}/api/generate", self.base_url))
            .json(&request)
            .send()
            .await?;

        let ollama_response: OllamaResponse = response.error_for_status()?.json().await?;
        debug!("Advisor response: {}", ollama_response.response);

        parse_recommendations(&ollama_response.response)
    }

    async fn health_check(&self) -> bool {
        self.http_client
            .get(format!("{}/api/tags", self.base_url))
            .send()
            .await
            .map(|r| r.status().is_success())
            .unwrap_or(false)
    }

    fn model(&self) -> &str {
        &self.model
    }

    fn host(&self) -> &str {
        &self.base_url
    }
}
