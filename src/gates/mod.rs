//! Qualification gates.
//!
//! A gate is a pure function of one [`GateInput`] snapshot. Gates never fail:
//! absent or ambiguous evidence is reported as REVIEW_REQUIRED or
//! AUTO_EXCLUDE, never as an error, and never as a silent pass.

mod category;
mod corroboration;
mod geography;
mod revenue;
pub mod rules;
mod website_age;

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub use category::CategoryGate;
pub use corroboration::CorroborationGate;
pub use geography::{haversine_km, GeographyGate};
pub use revenue::RevenueGate;
pub use website_age::{parse_snapshot_timestamp, WebsiteAgeGate};

use crate::config::QualificationConfig;
use crate::models::{Business, BusinessStatus, GateAction, Observation, ObservationField};

/// Immutable view of one business and its evidence at evaluation time.
#[derive(Debug, Clone, Copy)]
pub struct GateInput<'a> {
    pub business: &'a Business,
    /// Ledger rows for the business, oldest first.
    pub observations: &'a [Observation],
    pub evaluated_at: DateTime<Utc>,
}

impl<'a> GateInput<'a> {
    pub fn new(
        business: &'a Business,
        observations: &'a [Observation],
        evaluated_at: DateTime<Utc>,
    ) -> Self {
        Self {
            business,
            observations,
            evaluated_at,
        }
    }

    /// Observations for one field that carry a non-blank value.
    pub fn present<'b>(
        &'b self,
        field: &'b ObservationField,
    ) -> impl Iterator<Item = &'a Observation> + 'b {
        self.observations
            .iter()
            .filter(move |o| &o.field == field && o.present_value().is_some())
    }

    /// Latest non-blank observation of a field from each independent source.
    ///
    /// Estimates are not sources. The map's length matches the ledger's
    /// `count_independent_sources` for the same rows.
    pub fn latest_by_source(&self, field: &ObservationField) -> HashMap<&'a str, &'a Observation> {
        let mut latest = HashMap::new();
        // Oldest first, so later rows replace earlier ones.
        for observation in self.present(field).filter(|o| !o.is_estimate()) {
            latest.insert(observation.source_url.as_str(), observation);
        }
        latest
    }
}

/// Verdict of one gate for one business.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GateOutcome {
    pub rule_id: String,
    pub passed: bool,
    pub action: GateAction,
    pub reason: String,
    /// Observation ids the verdict relied on.
    pub evidence_ids: Vec<i64>,
}

impl GateOutcome {
    pub fn pass(rule_id: &str, reason: impl Into<String>, evidence_ids: Vec<i64>) -> Self {
        Self::with_action(rule_id, GateAction::Pass, reason, evidence_ids)
    }

    pub fn review(rule_id: &str, reason: impl Into<String>, evidence_ids: Vec<i64>) -> Self {
        Self::with_action(rule_id, GateAction::ReviewRequired, reason, evidence_ids)
    }

    pub fn exclude(rule_id: &str, reason: impl Into<String>, evidence_ids: Vec<i64>) -> Self {
        Self::with_action(rule_id, GateAction::AutoExclude, reason, evidence_ids)
    }

    /// Outcome whose action comes from configuration.
    pub fn with_action(
        rule_id: &str,
        action: GateAction,
        reason: impl Into<String>,
        evidence_ids: Vec<i64>,
    ) -> Self {
        Self {
            rule_id: rule_id.to_string(),
            passed: action == GateAction::Pass,
            action,
            reason: reason.into(),
            evidence_ids,
        }
    }
}

/// An independent qualification rule.
pub trait Gate: Send + Sync {
    /// Stable identifier stored on validation and exclusion rows.
    fn rule_id(&self) -> &'static str;

    fn evaluate(&self, input: &GateInput<'_>) -> GateOutcome;
}

/// The standard gate set in conventional order:
/// category, geography, corroboration, website age, revenue.
pub fn standard_gates(config: &QualificationConfig) -> Result<Vec<Box<dyn Gate>>, regex::Error> {
    Ok(vec![
        Box::new(CategoryGate::new(&config.category)?),
        Box::new(GeographyGate::new(config.geography.clone())),
        Box::new(CorroborationGate::new(config.corroboration.clone())),
        Box::new(WebsiteAgeGate::new(config.website_age.clone())),
        Box::new(RevenueGate::new(config.revenue.clone())),
    ])
}

/// Run every gate over the same snapshot. No gate short-circuits another.
pub fn run_all(gates: &[Box<dyn Gate>], input: &GateInput<'_>) -> Vec<GateOutcome> {
    gates.iter().map(|gate| gate.evaluate(input)).collect()
}

/// Final status for a set of outcomes.
///
/// Any AUTO_EXCLUDE wins, then any REVIEW_REQUIRED; only an all-PASS set
/// qualifies. An empty set has nothing vouching for the business and goes
/// to review.
pub fn combine_outcomes(outcomes: &[GateOutcome]) -> BusinessStatus {
    if outcomes.is_empty() {
        return BusinessStatus::ReviewRequired;
    }
    if outcomes.iter().any(|o| o.action == GateAction::AutoExclude) {
        BusinessStatus::Excluded
    } else if outcomes
        .iter()
        .any(|o| o.action == GateAction::ReviewRequired)
    {
        BusinessStatus::ReviewRequired
    } else {
        BusinessStatus::Qualified
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use chrono::{DateTime, Utc};

    use crate::models::{Business, DiscoveryRecord, Observation, ObservationField};

    pub fn business(record: DiscoveryRecord) -> Business {
        Business::discovered("fp-test".into(), &record, Utc::now())
    }

    pub fn observation(
        id: i64,
        source_url: &str,
        field: ObservationField,
        value: Option<&str>,
        confidence: f64,
        observed_at: DateTime<Utc>,
    ) -> Observation {
        Observation {
            id,
            business_id: "b-test".into(),
            source_url: source_url.into(),
            field,
            value: value.map(str::to_string),
            confidence,
            observed_at,
            http_status: None,
            error: None,
        }
    }
}
