//! Domain models for Meterly

use chrono::{DateTime, Duration, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// The commodity a reading/pattern/alert/recommendation is about
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UtilityType {
    Electricity,
    Water,
    Gas,
}

impl UtilityType {
    /// All utility types, in evaluation order
    pub fn all() -> [UtilityType; 3] {
        [Self::Electricity, Self::Water, Self::Gas]
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Electricity => "electricity",
            Self::Water => "water",
            Self::Gas => "gas",
        }
    }

    /// Capitalized name for alert messages
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::Electricity => "Electricity",
            Self::Water => "Water",
            Self::Gas => "Gas",
        }
    }

    /// Default measurement unit for this utility
    pub fn unit(&self) -> &'static str {
        match self {
            Self::Electricity => "kWh",
            Self::Water | Self::Gas => "m³",
        }
    }
}

impl std::str::FromStr for UtilityType {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "electricity" => Ok(Self::Electricity),
            "water" => Ok(Self::Water),
            "gas" => Ok(Self::Gas),
            _ => Err(format!("Unknown utility type: {}", s)),
        }
    }
}

impl std::fmt::Display for UtilityType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Aggregation horizon for a usage pattern
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Frequency {
    Daily,
    Weekly,
    Monthly,
    Seasonal,
}

impl Frequency {
    /// All frequency classes, in evaluation order
    pub fn all() -> [Frequency; 4] {
        [Self::Daily, Self::Weekly, Self::Monthly, Self::Seasonal]
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Daily => "daily",
            Self::Weekly => "weekly",
            Self::Monthly => "monthly",
            Self::Seasonal => "seasonal",
        }
    }
}

impl std::str::FromStr for Frequency {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "daily" => Ok(Self::Daily),
            "weekly" => Ok(Self::Weekly),
            "monthly" => Ok(Self::Monthly),
            "seasonal" => Ok(Self::Seasonal),
            _ => Err(format!("Unknown frequency: {}", s)),
        }
    }
}

impl std::fmt::Display for Frequency {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Direction of usage change between the two halves of an analysis window
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Trend {
    Increasing,
    Decreasing,
    Stable,
}

impl Trend {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Increasing => "increasing",
            Self::Decreasing => "decreasing",
            Self::Stable => "stable",
        }
    }
}

impl std::str::FromStr for Trend {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "increasing" => Ok(Self::Increasing),
            "decreasing" => Ok(Self::Decreasing),
            "stable" => Ok(Self::Stable),
            _ => Err(format!("Unknown trend: {}", s)),
        }
    }
}

impl std::fmt::Display for Trend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Kinds of alerts the evaluator can emit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertKind {
    HighUsage,
    BudgetExceeded,
    UnusualPattern,
    PositiveFeedback,
}

impl AlertKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::HighUsage => "high_usage",
            Self::BudgetExceeded => "budget_exceeded",
            Self::UnusualPattern => "unusual_pattern",
            Self::PositiveFeedback => "positive_feedback",
        }
    }

    /// Rolling window during which a second alert of the same (utility, kind)
    /// for the same user is suppressed. Positive feedback has no window:
    /// month-close runs once per billing month and its two rules may both
    /// fire for the same utility.
    pub fn dedup_window(&self) -> Option<Duration> {
        match self {
            Self::HighUsage | Self::BudgetExceeded => Some(Duration::hours(24)),
            Self::UnusualPattern => Some(Duration::hours(48)),
            Self::PositiveFeedback => None,
        }
    }
}

impl std::str::FromStr for AlertKind {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "high_usage" => Ok(Self::HighUsage),
            "budget_exceeded" => Ok(Self::BudgetExceeded),
            "unusual_pattern" => Ok(Self::UnusualPattern),
            "positive_feedback" => Ok(Self::PositiveFeedback),
            _ => Err(format!("Unknown alert kind: {}", s)),
        }
    }
}

impl std::fmt::Display for AlertKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Categories of savings recommendations
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecommendationKind {
    UsageReduction,
    TimeShift,
    ApplianceUpgrade,
    BehaviorChange,
    TariffOptimization,
}

impl RecommendationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::UsageReduction => "usage_reduction",
            Self::TimeShift => "time_shift",
            Self::ApplianceUpgrade => "appliance_upgrade",
            Self::BehaviorChange => "behavior_change",
            Self::TariffOptimization => "tariff_optimization",
        }
    }
}

impl std::str::FromStr for RecommendationKind {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "usage_reduction" => Ok(Self::UsageReduction),
            "time_shift" => Ok(Self::TimeShift),
            "appliance_upgrade" => Ok(Self::ApplianceUpgrade),
            "behavior_change" => Ok(Self::BehaviorChange),
            "tariff_optimization" => Ok(Self::TariffOptimization),
            _ => Err(format!("Unknown recommendation kind: {}", s)),
        }
    }
}

impl std::fmt::Display for RecommendationKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// How hard a recommendation is to act on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    Easy,
    Medium,
    Hard,
}

impl Difficulty {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Easy => "easy",
            Self::Medium => "medium",
            Self::Hard => "hard",
        }
    }
}

impl std::str::FromStr for Difficulty {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "easy" => Ok(Self::Easy),
            "medium" => Ok(Self::Medium),
            "hard" => Ok(Self::Hard),
            _ => Err(format!("Unknown difficulty: {}", s)),
        }
    }
}

impl std::fmt::Display for Difficulty {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One meter reading. Immutable once created; an update replaces all fields
/// but keeps the identity.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Reading {
    pub id: i64,
    pub user_id: i64,
    pub utility: UtilityType,
    /// Consumed amount in `unit`
    pub amount: Decimal,
    /// Measurement unit, e.g. "kWh" or "m³"
    pub unit: String,
    /// Billed charge for this reading, if known
    pub charge: Option<Decimal>,
    pub measured_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

/// Fields for inserting (or replacing) a reading
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewReading {
    pub utility: UtilityType,
    pub amount: Decimal,
    pub unit: String,
    pub charge: Option<Decimal>,
    pub measured_at: DateTime<Utc>,
}

/// Aggregated usage statistics for one (user, utility, frequency).
/// At most one row exists per key; analysis upserts in place.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UsagePattern {
    pub id: i64,
    pub user_id: i64,
    pub utility: UtilityType,
    pub frequency: Frequency,
    pub average_usage: Decimal,
    pub peak_usage: Decimal,
    pub off_peak_usage: Decimal,
    pub trend: Trend,
    pub updated_at: DateTime<Utc>,
}

/// Computed pattern statistics, before persistence.
///
/// The aggregator is a pure function of the window's readings; the upsert is
/// a separate, explicit store write.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PatternStats {
    pub average_usage: Decimal,
    pub peak_usage: Decimal,
    pub off_peak_usage: Decimal,
    pub trend: Trend,
}

/// A threshold or feedback alert. Immutable after creation except `read`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Alert {
    pub id: i64,
    pub user_id: i64,
    pub utility: UtilityType,
    pub kind: AlertKind,
    pub message: String,
    pub read: bool,
    pub created_at: DateTime<Utc>,
}

/// A savings recommendation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Recommendation {
    pub id: i64,
    pub user_id: i64,
    pub utility: UtilityType,
    pub kind: RecommendationKind,
    pub text: String,
    pub expected_savings: Decimal,
    pub difficulty: Difficulty,
    pub applied: bool,
    pub created_at: DateTime<Utc>,
}

/// Fields for inserting a recommendation (rule-engine or advisor output)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewRecommendation {
    pub utility: UtilityType,
    pub kind: RecommendationKind,
    pub text: String,
    pub expected_savings: Decimal,
    pub difficulty: Difficulty,
}

/// Savings tracked for one applied recommendation over one calendar month.
///
/// `baseline_cost` is frozen at start time (the charge total of the month
/// before tracking began); the actual figures are refreshed on demand.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SavingsTracking {
    pub id: i64,
    pub user_id: i64,
    pub recommendation_id: i64,
    pub utility: UtilityType,
    /// First day of the month being tracked
    pub tracking_month: NaiveDate,
    pub baseline_cost: Decimal,
    pub actual_usage: Decimal,
    pub actual_cost: Decimal,
    /// baseline_cost minus actual_cost; negative when costs went up
    pub savings_achieved: Decimal,
    pub created_at: DateTime<Utc>,
}

/// Computed tracking progress, before persistence.
///
/// The savings computation is a pure function of the baseline and the
/// tracking month's readings; the update is a separate, explicit store write.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SavingsProgress {
    pub actual_usage: Decimal,
    pub actual_cost: Decimal,
    pub savings_achieved: Decimal,
}

/// Per-user budget configuration, read-only to the analytics rules
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BudgetSetting {
    pub user_id: i64,
    /// Monthly budget in currency units; rule A is skipped when unset or zero
    pub monthly_budget: Option<Decimal>,
    /// Percentage of the budget at which rule A fires (e.g. 80)
    pub alert_threshold: Option<Decimal>,
    pub updated_at: DateTime<Utc>,
}
