//! Deterministic fallback recommendations
//!
//! Runs when the advisor returns nothing usable. Output is a pure function
//! of the monthly pattern: same pattern in, same list out, same order.

use rust_decimal::Decimal;

use super::pattern::round2;
use crate::models::{
    Difficulty, NewRecommendation, RecommendationKind, UsagePattern, Trend, UtilityType,
};

/// Recommendation texts, one per (kind, utility).
///
/// Constructed at startup and passed by reference; deployments can swap the
/// wording (or language) without touching rule logic.
#[derive(Debug, Clone)]
pub struct RecommendationTemplates {
    pub usage_reduction: UtilityTexts,
    pub time_shift: UtilityTexts,
    pub appliance_upgrade: UtilityTexts,
    pub behavior_change: UtilityTexts,
    pub tariff_optimization: UtilityTexts,
}

/// One text per utility type
#[derive(Debug, Clone)]
pub struct UtilityTexts {
    pub electricity: String,
    pub water: String,
    pub gas: String,
}

impl UtilityTexts {
    fn new(electricity: &str, water: &str, gas: &str) -> Self {
        Self {
            electricity: electricity.to_string(),
            water: water.to_string(),
            gas: gas.to_string(),
        }
    }

    pub fn get(&self, utility: UtilityType) -> &str {
        match utility {
            UtilityType::Electricity => &self.electricity,
            UtilityType::Water => &self.water,
            UtilityType::Gas => &self.gas,
        }
    }
}

impl RecommendationTemplates {
    pub fn text(&self, kind: RecommendationKind, utility: UtilityType) -> &str {
        match kind {
            RecommendationKind::UsageReduction => self.usage_reduction.get(utility),
            RecommendationKind::TimeShift => self.time_shift.get(utility),
            RecommendationKind::ApplianceUpgrade => self.appliance_upgrade.get(utility),
            RecommendationKind::BehaviorChange => self.behavior_change.get(utility),
            RecommendationKind::TariffOptimization => self.tariff_optimization.get(utility),
        }
    }
}

impl Default for RecommendationTemplates {
    fn default() -> Self {
        Self {
            usage_reduction: UtilityTexts::new(
                "Your electricity usage is trending up. Turn off standby devices and unused lighting to bring it back down.",
                "Your water usage is trending up. Shorter showers and full loads of laundry can reverse the trend.",
                "Your gas usage is trending up. Lowering the thermostat by one degree makes a noticeable difference.",
            ),
            time_shift: UtilityTexts::new(
                "Your peak electricity usage is well above your average. Shift heavy appliances like laundry and dishwashing to off-peak hours.",
                "Your peak water usage is well above your average. Spreading laundry and irrigation across the week evens it out.",
                "Your peak gas usage is well above your average. Staggering heating and hot-water use avoids expensive spikes.",
            ),
            appliance_upgrade: UtilityTexts::new(
                "Your average electricity usage is high. Replacing an old refrigerator or air conditioner with an efficient model pays for itself.",
                "Consider upgrading to water-efficient fixtures.",
                "Consider upgrading to a high-efficiency boiler.",
            ),
            behavior_change: UtilityTexts::new(
                "Small habits add up: unplug chargers, use natural light, and run appliances only when full.",
                "Small habits add up: fix dripping taps and turn off the water while brushing.",
                "Small habits add up: close doors to unheated rooms and bleed your radiators.",
            ),
            tariff_optimization: UtilityTexts::new(
                "Review your electricity tariff. A plan matched to your usage profile often costs less for the same consumption.",
                "Review your water tariff. A plan matched to your usage profile often costs less for the same consumption.",
                "Review your gas tariff. A plan matched to your usage profile often costs less for the same consumption.",
            ),
        }
    }
}

/// Rule-based recommendation generator
pub struct RecommendationRuleEngine<'a> {
    templates: &'a RecommendationTemplates,
}

impl<'a> RecommendationRuleEngine<'a> {
    pub fn new(templates: &'a RecommendationTemplates) -> Self {
        Self { templates }
    }

    /// Recommendations derived from a monthly pattern. Emission order is
    /// fixed: usage reduction, behavior change, time shift, appliance
    /// upgrade, tariff optimization.
    pub fn generate_fallback(&self, pattern: &UsagePattern) -> Vec<NewRecommendation> {
        let mut recs = Vec::new();
        let utility = pattern.utility;
        let average = pattern.average_usage;

        if pattern.trend == Trend::Increasing {
            recs.push(self.build(
                utility,
                RecommendationKind::UsageReduction,
                average * Decimal::new(15, 2),
                Difficulty::Medium,
            ));
            recs.push(self.build(
                utility,
                RecommendationKind::BehaviorChange,
                average * Decimal::new(10, 2),
                Difficulty::Easy,
            ));
        }

        if pattern.peak_usage > average * Decimal::from(2) {
            recs.push(self.build(
                utility,
                RecommendationKind::TimeShift,
                average * Decimal::new(20, 2),
                Difficulty::Medium,
            ));
        }

        if utility == UtilityType::Electricity && average > Decimal::from(300) {
            recs.push(self.build(
                utility,
                RecommendationKind::ApplianceUpgrade,
                average * Decimal::new(25, 2),
                Difficulty::Hard,
            ));
        }

        recs.push(self.build(
            utility,
            RecommendationKind::TariffOptimization,
            average * Decimal::new(8, 2),
            Difficulty::Easy,
        ));

        recs
    }

    fn build(
        &self,
        utility: UtilityType,
        kind: RecommendationKind,
        savings: Decimal,
        difficulty: Difficulty,
    ) -> NewRecommendation {
        NewRecommendation {
            utility,
            kind,
            text: self.templates.text(kind, utility).to_string(),
            expected_savings: round2(savings),
            difficulty,
        }
    }
}
