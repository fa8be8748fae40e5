//! Data models for leadgate.

mod business;
mod discovery;
mod observation;
mod validation;

pub use business::{Business, BusinessStatus, TransitionError};
pub use discovery::{DiscoveryRecord, EnrichmentSignal, SignalTarget};
pub use observation::{NewObservation, Observation, ObservationField, ESTIMATE_SOURCE_PREFIX};
pub use validation::{Exclusion, Export, GateAction, Validation, REVIEW_EXPIRY_RULE_ID};

/// A stored or user-supplied name that matches no variant.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown {kind} '{value}'")]
pub struct ParseEnumError {
    kind: &'static str,
    value: String,
}

impl ParseEnumError {
    pub(crate) fn new(kind: &'static str, value: &str) -> Self {
        Self {
            kind,
            value: value.to_string(),
        }
    }
}
