use super::{Gate, GateInput, GateOutcome};
use crate::config::RevenueConfig;
use crate::models::{Observation, ObservationField};

const RULE_ID: &str = "revenue";

/// Strict revenue check.
///
/// The best revenue estimate must meet the confidence threshold AND be
/// backed by a directly observed staff count or industry benchmark.
/// Derived (`estimate:`) rows never count as backing evidence.
pub struct RevenueGate {
    config: RevenueConfig,
}

impl RevenueGate {
    pub fn new(config: RevenueConfig) -> Self {
        Self { config }
    }
}

impl Gate for RevenueGate {
    fn rule_id(&self) -> &'static str {
        RULE_ID
    }

    fn evaluate(&self, input: &GateInput<'_>) -> GateOutcome {
        // Highest confidence wins; ties go to the most recent observation.
        let best: Option<&Observation> = input
            .present(&ObservationField::RevenueEstimate)
            .fold(None, |best: Option<&Observation>, o| match best {
                Some(b) if b.confidence > o.confidence => Some(b),
                _ => Some(o),
            });

        let Some(estimate) = best else {
            return GateOutcome::exclude(RULE_ID, "no revenue estimate", vec![]);
        };

        let threshold = self.config.confidence_threshold;
        if estimate.confidence < threshold {
            return GateOutcome::exclude(
                RULE_ID,
                format!(
                    "revenue confidence {:.2} is below threshold {:.2}",
                    estimate.confidence, threshold
                ),
                vec![estimate.id],
            );
        }

        let signals: Vec<&Observation> = input
            .present(&ObservationField::StaffCount)
            .chain(input.present(&ObservationField::IndustryBenchmark))
            .filter(|o| !o.is_estimate())
            .collect();

        if signals.is_empty() {
            return GateOutcome::exclude(
                RULE_ID,
                format!(
                    "confidence without evidence: estimate at {:.2} has no staff count or industry benchmark behind it",
                    estimate.confidence
                ),
                vec![estimate.id],
            );
        }

        let mut evidence_ids: Vec<i64> = std::iter::once(estimate.id)
            .chain(signals.iter().map(|o| o.id))
            .collect();
        evidence_ids.sort_unstable();

        let backing: Vec<&str> = signals.iter().map(|o| o.field.as_str()).collect();
        GateOutcome::pass(
            RULE_ID,
            format!(
                "revenue confidence {:.2} meets threshold {:.2}, backed by {}",
                estimate.confidence,
                threshold,
                backing.join(", ")
            ),
            evidence_ids,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gates::test_support::{business, observation};
    use crate::models::{DiscoveryRecord, GateAction};
    use chrono::Utc;

    fn evaluate(observations: &[Observation]) -> GateOutcome {
        let business = business(DiscoveryRecord::new("Some Shop", "https://x"));
        RevenueGate::new(RevenueConfig::default())
            .evaluate(&GateInput::new(&business, observations, Utc::now()))
    }

    fn obs(id: i64, source: &str, field: ObservationField, value: &str, confidence: f64) -> Observation {
        observation(id, source, field, Some(value), confidence, Utc::now())
    }

    fn staff(id: i64) -> Observation {
        obs(id, "https://linkedin.example", ObservationField::StaffCount, "22", 0.8)
    }

    fn revenue(id: i64, confidence: f64) -> Observation {
        obs(id, "https://model.example", ObservationField::RevenueEstimate, "3100000", confidence)
    }

    #[test]
    fn threshold_boundary_is_inclusive() {
        let below = evaluate(&[revenue(1, 0.59), staff(2)]);
        assert_eq!(below.action, GateAction::AutoExclude);
        assert!(below.reason.contains("below threshold"));

        let at = evaluate(&[revenue(1, 0.60), staff(2)]);
        assert_eq!(at.action, GateAction::Pass, "{}", at.reason);
        assert!(at.passed);
        assert_eq!(at.evidence_ids, vec![1, 2]);
    }

    #[test]
    fn confidence_without_evidence_is_excluded() {
        let outcome = evaluate(&[revenue(1, 0.75)]);
        assert_eq!(outcome.action, GateAction::AutoExclude);
        assert!(outcome.reason.contains("confidence without evidence"));
    }

    #[test]
    fn derived_signals_do_not_back_an_estimate() {
        let outcome = evaluate(&[
            revenue(1, 0.9),
            obs(2, "estimate:benchmark", ObservationField::StaffCount, "20", 0.3),
        ]);
        assert_eq!(outcome.action, GateAction::AutoExclude);

        let outcome = evaluate(&[
            revenue(1, 0.9),
            obs(3, "https://statcan.example", ObservationField::IndustryBenchmark, "NAICS 332", 0.7),
        ]);
        assert_eq!(outcome.action, GateAction::Pass);
    }

    #[test]
    fn best_estimate_is_used() {
        let outcome = evaluate(&[revenue(1, 0.4), revenue(2, 0.8), staff(3)]);
        assert_eq!(outcome.action, GateAction::Pass);
        assert_eq!(outcome.evidence_ids, vec![2, 3]);

        let outcome = evaluate(&[staff(3)]);
        assert_eq!(outcome.action, GateAction::AutoExclude);
        assert_eq!(outcome.reason, "no revenue estimate");
    }
}
