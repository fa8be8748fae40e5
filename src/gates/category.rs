use super::rules::{CategoryMatch, CategoryRules, RuleKind};
use super::{Gate, GateInput, GateOutcome};
use crate::config::CategoryConfig;
use crate::models::ObservationField;

const RULE_ID: &str = "category";

/// Checks the business name, discovery place types and category
/// observations against the category rule set.
///
/// Borderline categories always go to review. A blacklist hit is forgiven
/// when a whitelist term appears alongside it.
pub struct CategoryGate {
    rules: CategoryRules,
}

impl CategoryGate {
    pub fn new(config: &CategoryConfig) -> Result<Self, regex::Error> {
        Ok(Self {
            rules: CategoryRules::new(config)?,
        })
    }
}

fn category_text(raw: &str) -> String {
    raw.to_lowercase()
        .replace(['_', '-'], " ")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

fn describe(hits: &[&CategoryMatch]) -> String {
    hits.iter()
        .map(|h| format!("{} (\"{}\")", h.tag.as_str(), h.term))
        .collect::<Vec<_>>()
        .join(", ")
}

impl Gate for CategoryGate {
    fn rule_id(&self) -> &'static str {
        RULE_ID
    }

    fn evaluate(&self, input: &GateInput<'_>) -> GateOutcome {
        let business = input.business;
        let mut hits: Vec<CategoryMatch> = Vec::new();
        let mut evidence_ids = Vec::new();

        let mut texts: Vec<String> = vec![business.normalized_name.clone()];
        texts.extend(business.place_types.iter().map(|t| category_text(t)));
        for text in &texts {
            hits.extend(self.rules.matches(text));
        }

        let observed = input
            .present(&ObservationField::Category)
            .chain(input.present(&ObservationField::PlaceType));
        for observation in observed {
            let text = category_text(observation.present_value().unwrap_or_default());
            let found = self.rules.matches(&text);
            if !found.is_empty() {
                evidence_ids.push(observation.id);
                hits.extend(found);
            }
        }
        evidence_ids.sort_unstable();
        evidence_ids.dedup();

        let of_kind = |kind: RuleKind| -> Vec<&CategoryMatch> {
            hits.iter().filter(|h| h.tag.kind() == kind).collect()
        };
        let borderline = of_kind(RuleKind::Borderline);
        let blacklist = of_kind(RuleKind::Blacklist);
        let whitelist = of_kind(RuleKind::Whitelist);

        if !borderline.is_empty() {
            return GateOutcome::review(
                RULE_ID,
                format!("borderline category {}", describe(&borderline)),
                evidence_ids,
            );
        }

        match (blacklist.is_empty(), whitelist.is_empty()) {
            (false, false) => GateOutcome::pass(
                RULE_ID,
                format!(
                    "context override: whitelist {} outweighs blacklist {}",
                    describe(&whitelist),
                    describe(&blacklist)
                ),
                evidence_ids,
            ),
            (false, true) => GateOutcome::exclude(
                RULE_ID,
                format!("blacklist match {}", describe(&blacklist)),
                evidence_ids,
            ),
            (true, false) => GateOutcome::pass(
                RULE_ID,
                format!("whitelist match {}", describe(&whitelist)),
                evidence_ids,
            ),
            (true, true) => GateOutcome::review(
                RULE_ID,
                "no category evidence matched a known category",
                evidence_ids,
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gates::test_support::{business, observation};
    use crate::models::{DiscoveryRecord, GateAction};
    use chrono::Utc;

    fn gate() -> CategoryGate {
        CategoryGate::new(&CategoryConfig::default()).unwrap()
    }

    fn evaluate_record(record: DiscoveryRecord) -> GateOutcome {
        let business = business(record);
        gate().evaluate(&GateInput::new(&business, &[], Utc::now()))
    }

    #[test]
    fn convenience_store_is_blacklisted() {
        let outcome = evaluate_record(DiscoveryRecord {
            place_types: vec!["convenience_store".into()],
            ..DiscoveryRecord::new("Eastgate Variety", "https://maps.example/1")
        });
        assert_eq!(outcome.action, GateAction::AutoExclude);
        assert!(!outcome.passed);
        assert!(outcome.reason.contains("blacklist"), "{}", outcome.reason);
    }

    #[test]
    fn whitelist_context_beats_blacklist_keyword() {
        let outcome = evaluate_record(DiscoveryRecord::new(
            "Hamilton Convenience Manufacturing",
            "https://maps.example/2",
        ));
        assert_eq!(outcome.action, GateAction::Pass);
        assert!(outcome.reason.starts_with("context override"));
    }

    #[test]
    fn borderline_goes_to_review_even_with_whitelist() {
        let outcome = evaluate_record(DiscoveryRecord::new(
            "Dodsworth Funeral Home and Precision Engraving",
            "https://maps.example/3",
        ));
        assert_eq!(outcome.action, GateAction::ReviewRequired);

        let outcome = evaluate_record(DiscoveryRecord::new(
            "Tim Hortons Franchise Office",
            "https://maps.example/4",
        ));
        assert_eq!(outcome.action, GateAction::ReviewRequired);
    }

    #[test]
    fn unknown_category_goes_to_review() {
        let outcome = evaluate_record(DiscoveryRecord::new("Locke Street Bakery", "https://x"));
        assert_eq!(outcome.action, GateAction::ReviewRequired);
        assert!(outcome.reason.contains("no category evidence"));
    }

    #[test]
    fn observations_supply_evidence_ids() {
        let business = business(DiscoveryRecord::new("Mohawk Group", "https://x"));
        let now = Utc::now();
        let observations = vec![
            observation(7, "https://a.example", ObservationField::Category, Some("Plastic Injection Moulding"), 0.9, now),
            observation(8, "https://b.example", ObservationField::Phone, Some("9055550100"), 1.0, now),
            observation(9, "https://c.example", ObservationField::PlaceType, Some("point_of_interest"), 0.5, now),
        ];
        let outcome = gate().evaluate(&GateInput::new(&business, &observations, now));
        assert_eq!(outcome.action, GateAction::Pass);
        assert_eq!(outcome.evidence_ids, vec![7]);
    }
}
