use std::collections::HashMap;

use super::{Gate, GateInput, GateOutcome};
use crate::config::CorroborationConfig;

const RULE_ID: &str = "corroboration";

/// Requires independent sources to agree on the key field.
///
/// Each source gets one vote: its latest non-blank observation. Estimates
/// are not sources and never vote.
pub struct CorroborationGate {
    config: CorroborationConfig,
}

impl CorroborationGate {
    pub fn new(config: CorroborationConfig) -> Self {
        Self { config }
    }
}

fn comparable(value: &str) -> String {
    value
        .to_lowercase()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

impl Gate for CorroborationGate {
    fn rule_id(&self) -> &'static str {
        RULE_ID
    }

    fn evaluate(&self, input: &GateInput<'_>) -> GateOutcome {
        let field = &self.config.key_field;
        let required = self.config.min_sources as usize;

        let latest = input.latest_by_source(field);

        let mut votes: HashMap<String, Vec<i64>> = HashMap::new();
        for observation in latest.values() {
            let value = comparable(observation.present_value().unwrap_or_default());
            votes.entry(value).or_default().push(observation.id);
        }

        let mut tally: Vec<(String, Vec<i64>)> = votes.into_iter().collect();
        for (_, ids) in tally.iter_mut() {
            ids.sort_unstable();
        }
        tally.sort_by(|a, b| b.1.len().cmp(&a.1.len()).then_with(|| a.0.cmp(&b.0)));

        let evidence_ids = {
            let mut ids: Vec<i64> = tally.iter().flat_map(|(_, ids)| ids.clone()).collect();
            ids.sort_unstable();
            ids
        };

        let Some((top_value, top_ids)) = tally.first() else {
            return GateOutcome::exclude(
                RULE_ID,
                format!("no source reports {}", field),
                evidence_ids,
            );
        };
        let top = top_ids.len();
        let tied: Vec<&str> = tally
            .iter()
            .filter(|(_, ids)| ids.len() == top)
            .map(|(value, _)| value.as_str())
            .collect();

        if tied.len() > 1 {
            return GateOutcome::review(
                RULE_ID,
                format!(
                    "conflicting {} reports with {} source(s) each: {}",
                    field,
                    top,
                    tied.join(" vs ")
                ),
                evidence_ids,
            );
        }

        if top >= required {
            let dissent = tally.len() - 1;
            let reason = if dissent == 0 {
                format!("{} sources agree on {} \"{}\"", top, field, top_value)
            } else {
                format!(
                    "{} sources agree on {} \"{}\" ({} minority value(s))",
                    top, field, top_value, dissent
                )
            };
            return GateOutcome::pass(RULE_ID, reason, evidence_ids);
        }

        GateOutcome::review(
            RULE_ID,
            format!(
                "only {} of {} required sources report {} \"{}\"",
                top, required, field, top_value
            ),
            evidence_ids,
        )
    }
}
