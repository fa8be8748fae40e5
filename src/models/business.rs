//! Business models and the qualification state machine.

use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{DiscoveryRecord, ParseEnumError};
use crate::normalize::{normalize_name, normalize_phone, normalize_postal_code, normalize_website};

/// Lifecycle status of a business record.
///
/// ```text
/// DISCOVERED -> GEOCODED -> ENRICHED -> VALIDATED -> {QUALIFIED | EXCLUDED | REVIEW_REQUIRED}
/// QUALIFIED | EXCLUDED -> EXPORTED
/// ```
///
/// REVIEW_REQUIRED only leaves through a manual override.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BusinessStatus {
    Discovered,
    Geocoded,
    Enriched,
    Validated,
    Qualified,
    Excluded,
    ReviewRequired,
    Exported,
}

impl BusinessStatus {
    pub const ALL: [BusinessStatus; 8] = [
        Self::Discovered,
        Self::Geocoded,
        Self::Enriched,
        Self::Validated,
        Self::Qualified,
        Self::Excluded,
        Self::ReviewRequired,
        Self::Exported,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Discovered => "discovered",
            Self::Geocoded => "geocoded",
            Self::Enriched => "enriched",
            Self::Validated => "validated",
            Self::Qualified => "qualified",
            Self::Excluded => "excluded",
            Self::ReviewRequired => "review_required",
            Self::Exported => "exported",
        }
    }

    /// Statuses written by the gate pipeline at the end of a run.
    pub fn is_final(&self) -> bool {
        matches!(
            self,
            Self::Qualified | Self::Excluded | Self::ReviewRequired | Self::Exported
        )
    }

    /// Statuses a manual override may force.
    pub fn is_override_target(&self) -> bool {
        matches!(self, Self::Qualified | Self::Excluded)
    }

    /// Statuses other than `next` itself from which `next` may be reached.
    pub fn predecessors(next: BusinessStatus) -> Vec<BusinessStatus> {
        Self::ALL
            .into_iter()
            .filter(|s| *s != next && s.can_transition_to(next))
            .collect()
    }

    /// Whether the pipeline may move a business from `self` to `next`.
    ///
    /// Staying in place is allowed so reruns are idempotent. Manual overrides
    /// bypass this check.
    pub fn can_transition_to(&self, next: BusinessStatus) -> bool {
        use BusinessStatus::*;

        if *self == next {
            return true;
        }
        matches!(
            (self, next),
            (Discovered, Geocoded)
                | (Geocoded, Enriched)
                // Gates may run without coordinates; the geography gate
                // then excludes for missing location.
                | (Discovered, Enriched)
                | (Enriched, Validated)
                | (Validated, Qualified)
                | (Validated, Excluded)
                | (Validated, ReviewRequired)
                | (Qualified, Exported)
                | (Excluded, Exported)
        )
    }
}

impl FromStr for BusinessStatus {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| ParseEnumError::new("business status", s))
    }
}

impl std::fmt::Display for BusinessStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Rejected status change.
#[derive(Debug, thiserror::Error)]
pub enum TransitionError {
    #[error("illegal status transition {from} -> {to} for business {business_id}")]
    Illegal {
        business_id: String,
        from: BusinessStatus,
        to: BusinessStatus,
    },

    #[error("manual override must force qualified or excluded, got {0}")]
    InvalidOverride(BusinessStatus),

    #[error("manual override requires a reason and a reviewer")]
    MissingOverrideDetails,

    #[error("business {0} not found")]
    NotFound(String),
}

/// Canonical record for one candidate company.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Business {
    pub id: String,
    /// Identity hash; unique across all businesses.
    pub fingerprint: String,
    pub normalized_name: String,
    pub original_name: String,
    pub street: Option<String>,
    pub city: Option<String>,
    pub postal_code: Option<String>,
    pub province: Option<String>,
    /// Ten-digit North American number.
    pub phone: Option<String>,
    /// Bare domain, e.g. `example.com`.
    pub website: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    /// Distance from the configured reference point.
    pub distance_km: Option<f64>,
    /// Directory place types reported at discovery.
    pub place_types: Vec<String>,
    pub status: BusinessStatus,
    pub manual_override: bool,
    pub override_reason: Option<String>,
    pub override_by: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Business {
    /// New DISCOVERED business built from a directory record.
    ///
    /// Phone, postal code and website are stored in canonical form; the
    /// name, street and city keep their original spelling.
    pub fn discovered(fingerprint: String, record: &DiscoveryRecord, now: DateTime<Utc>) -> Self {
        let original_name = clean(&record.name).unwrap_or_default();
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            fingerprint,
            normalized_name: normalize_name(&original_name),
            original_name,
            street: clean(&record.street),
            city: clean(&record.city),
            postal_code: record.postal_code.as_deref().and_then(normalize_postal_code),
            province: clean(&record.province),
            phone: record.phone.as_deref().and_then(normalize_phone),
            website: record.website.as_deref().and_then(normalize_website),
            latitude: record.latitude.filter(|v| v.is_finite()),
            longitude: record.longitude.filter(|v| v.is_finite()),
            distance_km: None,
            place_types: record
                .place_types
                .iter()
                .map(|t| t.trim().to_lowercase())
                .filter(|t| !t.is_empty())
                .collect(),
            status: BusinessStatus::Discovered,
            manual_override: false,
            override_reason: None,
            override_by: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Whether both coordinates are known.
    pub fn coordinates(&self) -> Option<(f64, f64)> {
        match (self.latitude, self.longitude) {
            (Some(lat), Some(lon)) => Some((lat, lon)),
            _ => None,
        }
    }
}

fn clean(value: &Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}
