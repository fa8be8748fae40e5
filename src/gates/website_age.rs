use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};

use super::{Gate, GateInput, GateOutcome};
use crate::config::WebsiteAgeConfig;
use crate::models::{Observation, ObservationField};

const RULE_ID: &str = "website_age";

const SECONDS_PER_YEAR: f64 = 365.25 * 86_400.0;

/// Parse an archive snapshot time: RFC 3339, a Wayback CDX timestamp
/// (`YYYYMMDDhhmmss`, possibly truncated) or a plain `YYYY-MM-DD` date.
pub fn parse_snapshot_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        return date.and_hms_opt(0, 0, 0).map(|dt| dt.and_utc());
    }
    if raw.len() >= 8 && raw.len() <= 14 && raw.chars().all(|c| c.is_ascii_digit()) {
        let padded = format!("{:0<14}", raw);
        return NaiveDateTime::parse_from_str(&padded, "%Y%m%d%H%M%S")
            .ok()
            .map(|dt| dt.and_utc());
    }
    None
}

/// Age of the website from its earliest archive snapshot.
pub struct WebsiteAgeGate {
    config: WebsiteAgeConfig,
}

impl WebsiteAgeGate {
    pub fn new(config: WebsiteAgeConfig) -> Self {
        Self { config }
    }

    fn missing(&self, reason: &str, evidence_ids: Vec<i64>) -> GateOutcome {
        GateOutcome::with_action(
            RULE_ID,
            self.config.missing_action,
            format!("cannot verify longevity: {}", reason),
            evidence_ids,
        )
    }
}

impl Gate for WebsiteAgeGate {
    fn rule_id(&self) -> &'static str {
        RULE_ID
    }

    fn evaluate(&self, input: &GateInput<'_>) -> GateOutcome {
        if input.business.website.is_none() {
            return self.missing("no website", vec![]);
        }

        let earliest: Option<(&Observation, DateTime<Utc>)> = input
            .present(&ObservationField::WebsiteFirstSeen)
            .filter_map(|o| parse_snapshot_timestamp(o.present_value()?).map(|at| (o, at)))
            .min_by(|a, b| a.1.cmp(&b.1).then_with(|| a.0.id.cmp(&b.0.id)));

        let Some((observation, first_seen)) = earliest else {
            // Failed lookups leave rows without a value; cite them.
            let attempts: Vec<i64> = input
                .observations
                .iter()
                .filter(|o| o.field == ObservationField::WebsiteFirstSeen)
                .map(|o| o.id)
                .collect();
            return self.missing("no archive snapshot", attempts);
        };

        let age = (input.evaluated_at - first_seen).num_seconds() as f64 / SECONDS_PER_YEAR;
        let min = self.config.min_years;
        let band_floor = min - self.config.review_band_years;
        let evidence = vec![observation.id];
        let since = first_seen.format("%Y-%m-%d");

        if age >= min {
            GateOutcome::pass(
                RULE_ID,
                format!("website first seen {} ({:.1} years, minimum {:.1})", since, age, min),
                evidence,
            )
        } else if age >= band_floor {
            GateOutcome::review(
                RULE_ID,
                format!(
                    "website age {:.1} years is within the {:.1}-{:.1} year review band",
                    age, band_floor, min
                ),
                evidence,
            )
        } else {
            GateOutcome::exclude(
                RULE_ID,
                format!(
                    "website first seen {} is only {:.1} years old (minimum {:.1})",
                    since, age, min
                ),
                evidence,
            )
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gates::test_support::{business, observation};
    use crate::models::{DiscoveryRecord, GateAction};
    use chrono::{Duration, TimeZone};

    fn with_site() -> DiscoveryRecord {
        DiscoveryRecord {
            website: Some("https://www.example-shop.ca/about".into()),
            ..DiscoveryRecord::new("Example Shop", "https://x")
        }
    }

    fn years_ago(now: DateTime<Utc>, years: f64) -> DateTime<Utc> {
        now - Duration::seconds((years * SECONDS_PER_YEAR) as i64)
    }

    fn evaluate_at(config: WebsiteAgeConfig, observations: &[Observation], now: DateTime<Utc>) -> GateOutcome {
        let business = business(with_site());
        WebsiteAgeGate::new(config).evaluate(&GateInput::new(&business, observations, now))
    }

    fn first_seen(id: i64, at: DateTime<Utc>) -> Observation {
        let value = at.format("%Y%m%d%H%M%S").to_string();
        observation(id, "https://web.archive.org/cdx", ObservationField::WebsiteFirstSeen, Some(&value), 1.0, at)
    }

    #[test]
    fn parses_snapshot_formats() {
        let expected = Utc.with_ymd_and_hms(2003, 7, 14, 9, 30, 5).unwrap();
        assert_eq!(parse_snapshot_timestamp("20030714093005"), Some(expected));
        assert_eq!(parse_snapshot_timestamp("2003-07-14T09:30:05Z"), Some(expected));
        assert_eq!(
            parse_snapshot_timestamp("20030714"),
            Some(Utc.with_ymd_and_hms(2003, 7, 14, 0, 0, 0).unwrap())
        );
        assert_eq!(
            parse_snapshot_timestamp("2003-07-14"),
            Some(Utc.with_ymd_and_hms(2003, 7, 14, 0, 0, 0).unwrap())
        );
        assert_eq!(parse_snapshot_timestamp("last spring"), None);
        assert_eq!(parse_snapshot_timestamp("2003"), None);
    }

    #[test]
    fn review_band_below_minimum() {
        let now = Utc::now();
        let outcome = evaluate_at(
            WebsiteAgeConfig::default(),
            &[first_seen(1, years_ago(now, 2.8))],
            now,
        );
        assert_eq!(outcome.action, GateAction::ReviewRequired, "{}", outcome.reason);
        assert_eq!(outcome.evidence_ids, vec![1]);
    }

    #[test]
    fn old_site_passes_and_young_site_is_excluded() {
        let now = Utc::now();
        let old = evaluate_at(WebsiteAgeConfig::default(), &[first_seen(1, years_ago(now, 3.1))], now);
        assert_eq!(old.action, GateAction::Pass);

        let young = evaluate_at(WebsiteAgeConfig::default(), &[first_seen(1, years_ago(now, 2.4))], now);
        assert_eq!(young.action, GateAction::AutoExclude);
    }

    #[test]
    fn earliest_snapshot_is_used() {
        let now = Utc::now();
        let outcome = evaluate_at(
            WebsiteAgeConfig {
                min_years: 15.0,
                review_band_years: 1.0,
                ..Default::default()
            },
            &[first_seen(1, years_ago(now, 4.0)), first_seen(2, years_ago(now, 16.0))],
            now,
        );
        assert_eq!(outcome.action, GateAction::Pass);
        assert_eq!(outcome.evidence_ids, vec![2]);
    }

    #[test]
    fn missing_evidence_uses_configured_action() {
        let now = Utc::now();
        let failed = Observation {
            error: Some("timed out".into()),
            ..observation(5, "https://web.archive.org/cdx", ObservationField::WebsiteFirstSeen, None, 0.0, now)
        };

        let outcome = evaluate_at(WebsiteAgeConfig::default(), &[failed.clone()], now);
        assert_eq!(outcome.action, GateAction::AutoExclude);
        assert_eq!(outcome.evidence_ids, vec![5]);

        let lenient = WebsiteAgeConfig {
            missing_action: GateAction::ReviewRequired,
            ..Default::default()
        };
        let outcome = evaluate_at(lenient.clone(), &[failed], now);
        assert_eq!(outcome.action, GateAction::ReviewRequired);

        let no_site = business(DiscoveryRecord::new("Offline Shop", "https://x"));
        let outcome = WebsiteAgeGate::new(lenient).evaluate(&GateInput::new(&no_site, &[], now));
        assert_eq!(outcome.action, GateAction::ReviewRequired);
        assert!(outcome.reason.contains("no website"));
    }
}
