//! Gate results, exclusions and export links.

use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::ParseEnumError;

/// Rule id recorded on exclusions written by the review expiry policy.
pub const REVIEW_EXPIRY_RULE_ID: &str = "review_expiry";

/// What a gate asks the orchestrator to do with a business.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum GateAction {
    Pass,
    ReviewRequired,
    AutoExclude,
}

impl GateAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pass => "PASS",
            Self::ReviewRequired => "REVIEW_REQUIRED",
            Self::AutoExclude => "AUTO_EXCLUDE",
        }
    }

}

impl FromStr for GateAction {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "PASS" => Ok(Self::Pass),
            "REVIEW_REQUIRED" => Ok(Self::ReviewRequired),
            "AUTO_EXCLUDE" => Ok(Self::AutoExclude),
            other => Err(ParseEnumError::new("gate action", other)),
        }
    }
}

impl std::fmt::Display for GateAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of one gate evaluation for one business.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Validation {
    pub id: i64,
    pub business_id: String,
    pub rule_id: String,
    pub passed: bool,
    pub action: GateAction,
    pub reason: String,
    /// Observation ids the gate relied on.
    pub evidence_ids: Vec<i64>,
    /// Pipeline run number for this business; reruns append a new version.
    pub validation_version: i32,
    pub validated_at: DateTime<Utc>,
}

/// Audit record explaining one reason a business was excluded.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Exclusion {
    pub id: i64,
    pub business_id: String,
    pub rule_id: String,
    pub reason: String,
    pub evidence_ids: Vec<i64>,
    pub validation_version: i32,
    pub excluded_at: DateTime<Utc>,
}

/// Link between a business and an export artifact.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Export {
    pub id: i64,
    pub business_id: String,
    pub export_file: String,
    pub exported_at: DateTime<Utc>,
}
