//! Benchmark-derived revenue estimates.
//!
//! A derived value is written to the ledger as its own observation under
//! [`BENCHMARK_ESTIMATE_SOURCE`], never in place of missing evidence.

use crate::models::{NewObservation, Observation, ObservationField};

/// Source recorded on revenue estimates computed from staff count × benchmark.
pub const BENCHMARK_ESTIMATE_SOURCE: &str = "estimate:benchmark";

/// Derived confidence is the product of the input confidences, scaled down.
const DERIVED_CONFIDENCE_FACTOR: f64 = 0.75;

fn numeric(value: &str) -> Option<f64> {
    let cleaned: String = value
        .chars()
        .filter(|c| !matches!(c, ',' | '$' | ' ' | '_'))
        .collect();
    cleaned.parse::<f64>().ok().filter(|n| n.is_finite() && *n > 0.0)
}

/// Latest directly observed numeric value of `field`.
fn latest_numeric<'a>(
    observations: &'a [Observation],
    field: &ObservationField,
) -> Option<(&'a Observation, f64)> {
    observations
        .iter()
        .rev()
        .filter(|o| &o.field == field && !o.is_estimate())
        .find_map(|o| o.present_value().and_then(numeric).map(|n| (o, n)))
}

/// Revenue estimate from the latest staff count and a numeric
/// revenue-per-employee benchmark.
///
/// Returns `None` when either input is missing or non-numeric, or when a
/// benchmark estimate has already been recorded for this business.
pub fn derive_benchmark_estimate(
    business_id: &str,
    observations: &[Observation],
) -> Option<NewObservation> {
    let already_derived = observations.iter().any(|o| {
        o.field == ObservationField::RevenueEstimate && o.source_url == BENCHMARK_ESTIMATE_SOURCE
    });
    if already_derived {
        return None;
    }

    let (staff, headcount) = latest_numeric(observations, &ObservationField::StaffCount)?;
    let (benchmark, per_employee) =
        latest_numeric(observations, &ObservationField::IndustryBenchmark)?;

    let revenue = headcount * per_employee;
    let confidence =
        (staff.confidence * benchmark.confidence * DERIVED_CONFIDENCE_FACTOR).clamp(0.0, 1.0);

    Some(NewObservation::new(
        business_id,
        BENCHMARK_ESTIMATE_SOURCE,
        ObservationField::RevenueEstimate,
        Some(format!("{:.0}", revenue)),
        confidence,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn obs(id: i64, source: &str, field: ObservationField, value: &str, confidence: f64) -> Observation {
        Observation {
            id,
            business_id: "b1".into(),
            source_url: source.into(),
            field,
            value: Some(value.into()),
            confidence,
            observed_at: Utc::now(),
            http_status: None,
            error: None,
        }
    }

    #[test]
    fn derives_labeled_low_confidence_estimate() {
        let observations = vec![
            obs(1, "https://linkedin.example", ObservationField::StaffCount, "12", 0.9),
            obs(2, "https://linkedin.example", ObservationField::StaffCount, "20", 0.8),
            obs(3, "https://statcan.example", ObservationField::IndustryBenchmark, "$150,000", 0.8),
        ];
        let estimate = derive_benchmark_estimate("b1", &observations).unwrap();
        assert_eq!(estimate.source_url, BENCHMARK_ESTIMATE_SOURCE);
        assert_eq!(estimate.field, ObservationField::RevenueEstimate);
        assert_eq!(estimate.value.as_deref(), Some("3000000"));
        assert!((estimate.confidence - 0.48).abs() < 1e-9);
    }

    #[test]
    fn needs_numeric_inputs() {
        let observations = vec![
            obs(1, "https://linkedin.example", ObservationField::StaffCount, "about a dozen", 0.9),
            obs(2, "https://statcan.example", ObservationField::IndustryBenchmark, "150000", 0.8),
        ];
        assert!(derive_benchmark_estimate("b1", &observations).is_none());

        let observations = vec![obs(1, "https://linkedin.example", ObservationField::StaffCount, "12", 0.9)];
        assert!(derive_benchmark_estimate("b1", &observations).is_none());
    }

    #[test]
    fn derived_once() {
        let observations = vec![
            obs(1, "https://linkedin.example", ObservationField::StaffCount, "12", 0.9),
            obs(2, "https://statcan.example", ObservationField::IndustryBenchmark, "150000", 0.8),
            obs(3, BENCHMARK_ESTIMATE_SOURCE, ObservationField::RevenueEstimate, "1800000", 0.54),
        ];
        assert!(derive_benchmark_estimate("b1", &observations).is_none());
    }
}
