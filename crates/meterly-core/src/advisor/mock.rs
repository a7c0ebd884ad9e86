//! Mock advisor for testing
//!
//! Predictable responses for tests and development without a running LLM
//! server. The failure modes matter as much as the happy path here: the
//! facade's fallback behavior is exercised with `unhealthy()` and `empty()`.

use async_trait::async_trait;
use rust_decimal_macros::dec;

use crate::error::{Error, Result};
use crate::models::{Difficulty, RecommendationKind, UsagePattern};

use super::{AdvisorBackend, CandidateRecommendation};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum MockMode {
    Canned,
    Empty,
    Failing,
}

/// Mock advisor backend
#[derive(Clone)]
pub struct MockAdvisor {
    mode: MockMode,
}

impl Default for MockAdvisor {
    fn default() -> Self {
        Self::new()
    }
}

impl MockAdvisor {
    /// Healthy mock returning a fixed two-item list
    pub fn new() -> Self {
        Self {
            mode: MockMode::Canned,
        }
    }

    /// Healthy mock returning an empty list (triggers rule fallback)
    pub fn empty() -> Self {
        Self {
            mode: MockMode::Empty,
        }
    }

    /// Mock whose calls fail (triggers rule fallback)
    pub fn unhealthy() -> Self {
        Self {
            mode: MockMode::Failing,
        }
    }
}

#[async_trait]
impl AdvisorBackend for MockAdvisor {
    async fn recommend(&self, pattern: &UsagePattern) -> Result<Vec<CandidateRecommendation>> {
        match self.mode {
            MockMode::Canned => Ok(vec![
                CandidateRecommendation {
                    kind: RecommendationKind::UsageReduction,
                    text: format!(
                        "Mock advice: trim your {} consumption during weekdays.",
                        pattern.utility.as_str()
                    ),
                    expected_savings: dec!(25.00),
                    difficulty: Difficulty::Medium,
                },
                CandidateRecommendation {
                    kind: RecommendationKind::TariffOptimization,
                    text: "Mock advice: compare tariff plans.".to_string(),
                    expected_savings: dec!(10.00),
                    difficulty: Difficulty::Easy,
                },
            ]),
            MockMode::Empty => Ok(vec![]),
            MockMode::Failing => Err(Error::Advisor("mock advisor is down".to_string())),
        }
    }

    async fn health_check(&self) -> bool {
        self.mode != MockMode::Failing
    }

    fn model(&self) -> &str {
        "mock"
    }

    fn host(&self) -> &str {
        "mock://localhost"
    }
}
