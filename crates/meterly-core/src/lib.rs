//! Meterly Core Library
//!
//! Shared functionality for the Meterly usage analytics service:
//! - Database access and migrations (readings, patterns, alerts,
//!   recommendations, budgets)
//! - Pattern aggregation over daily/weekly/monthly/seasonal windows
//! - Threshold and positive-feedback alert rules with dedup windows
//! - Deterministic savings recommendations with an optional AI advisor
//! - Savings tracking against a frozen prior-month baseline

pub mod advisor;
pub mod analytics;
pub mod db;
pub mod error;
pub mod models;

pub use advisor::{AdvisorBackend, AdvisorClient, CandidateRecommendation, MockAdvisor, OllamaAdvisor};
pub use analytics::{
    AlertEvaluator, AnalyticsEngine, RecommendationRuleEngine, RecommendationTemplates,
    SavingsTracker,
};
pub use db::Database;
pub use error::{Error, Result};
pub use models::{
    Alert, AlertKind, BudgetSetting, Difficulty, Frequency, NewReading, NewRecommendation,
    PatternStats, Reading, Recommendation, RecommendationKind, SavingsProgress, SavingsTracking,
    Trend, UsagePattern, UtilityType,
};
