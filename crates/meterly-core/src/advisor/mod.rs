//! Pluggable AI advisor abstraction
//!
//! The advisor proposes savings recommendations from a monthly usage
//! pattern. All backends run locally; there is no cloud dependency. When
//! the advisor errors or returns nothing, callers fall back to the
//! deterministic rule engine, so an advisor outage never surfaces to users.
//!
//! # Configuration
//!
//! Environment variables:
//! - `ADVISOR_BACKEND`: Backend to use (ollama, mock). Default: ollama
//! - `OLLAMA_HOST`: Ollama server URL (required for the ollama backend)
//! - `OLLAMA_MODEL`: Model name (default: llama3.2)

mod mock;
mod ollama;
pub mod parsing;

pub use mock::MockAdvisor;
pub use ollama::OllamaAdvisor;

use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::models::{Difficulty, RecommendationKind, UsagePattern};

/// A recommendation proposed by the advisor, before validation and
/// persistence. The utility type comes from the pattern, not the model.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CandidateRecommendation {
    pub kind: RecommendationKind,
    pub text: String,
    pub expected_savings: Decimal,
    pub difficulty: Difficulty,
}

/// Interface all advisor backends implement
#[async_trait]
pub trait AdvisorBackend: Send + Sync {
    /// Propose recommendations for a monthly usage pattern
    async fn recommend(&self, pattern: &UsagePattern) -> Result<Vec<CandidateRecommendation>>;

    /// Check if the backend is reachable
    async fn health_check(&self) -> bool;

    /// Model name (for logging)
    fn model(&self) -> &str;

    /// Host URL (for logging)
    fn host(&self) -> &str;
}

/// Concrete advisor client enum
///
/// Provides Clone and compile-time dispatch without Box<dyn> overhead.
#[derive(Clone)]
pub enum AdvisorClient {
    /// Ollama backend (HTTP API)
    Ollama(OllamaAdvisor),
    /// Mock backend for testing
    Mock(MockAdvisor),
}

impl AdvisorClient {
    /// Create an advisor client from environment variables.
    ///
    /// Returns None when the required variables are not set; the caller
    /// then runs rule-based recommendations only.
    pub fn from_env() -> Option<Self> {
        let backend = std::env::var("ADVISOR_BACKEND").unwrap_or_else(|_| "ollama".to_string());

        match backend.to_lowercase().as_str() {
            "ollama" => OllamaAdvisor::from_env().map(AdvisorClient::Ollama),
            "mock" => Some(AdvisorClient::Mock(MockAdvisor::new())),
            _ => {
                tracing::warn!(backend = %backend, "Unknown ADVISOR_BACKEND, falling back to ollama");
                OllamaAdvisor::from_env().map(AdvisorClient::Ollama)
            }
        }
    }

    /// Create an Ollama backend directly
    pub fn ollama(host: &str, model: &str) -> Self {
        AdvisorClient::Ollama(OllamaAdvisor::new(host, model))
    }

    /// Create a mock backend for testing
    pub fn mock() -> Self {
        AdvisorClient::Mock(MockAdvisor::new())
    }
}

#[async_trait]
impl AdvisorBackend for AdvisorClient {
    async fn recommend(&self, pattern: &UsagePattern) -> Result<Vec<CandidateRecommendation>> {
        match self {
            AdvisorClient::Ollama(b) => b.recommend(pattern).await,
            AdvisorClient::Mock(b) => b.recommend(pattern).await,
        }
    }

    async fn health_check(&self) -> bool {
        match self {
            AdvisorClient::Ollama(b) => b.health_check().await,
            AdvisorClient::Mock(b) => b.health_check().await,
        }
    }

    fn model(&self) -> &str {
        match self {
            AdvisorClient::Ollama(b) => b.model(),
            AdvisorClient::Mock(b) => b.model(),
        }
    }

    fn host(&self) -> &str {
        match self {
            AdvisorClient::Ollama(b) => b.host(),
            AdvisorClient::Mock(b) => b.host(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_advisor_client_mock() {
        let client = AdvisorClient::mock();
        assert_eq!(client.model(), "mock");
        assert_eq!(client.host(), "mock://localhost");
    }

    #[tokio::test]
    async fn test_mock_health_check() {
        let client = AdvisorClient::mock();
        assert!(client.health_check().await);
    }
}
