//! Evidence ledger observations.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Source URL prefix for values derived by estimation rather than observed.
///
/// Estimates are recorded as ordinary low-confidence observations under a
/// source such as `estimate:benchmark`, so they stay visible as estimates.
pub const ESTIMATE_SOURCE_PREFIX: &str = "estimate:";

/// Business field an observation speaks about.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ObservationField {
    Name,
    Category,
    PlaceType,
    Phone,
    Website,
    Address,
    Existence,
    StaffCount,
    IndustryBenchmark,
    RevenueEstimate,
    /// Earliest archive snapshot of the website (RFC 3339 or CDX timestamp).
    WebsiteFirstSeen,
    /// Geocoder result as `lat,lon`.
    Coordinates,
    Other(String),
}

impl ObservationField {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Name => "name",
            Self::Category => "category",
            Self::PlaceType => "place_type",
            Self::Phone => "phone",
            Self::Website => "website",
            Self::Address => "address",
            Self::Existence => "existence",
            Self::StaffCount => "staff_count",
            Self::IndustryBenchmark => "industry_benchmark",
            Self::RevenueEstimate => "revenue_estimate",
            Self::WebsiteFirstSeen => "website_first_seen",
            Self::Coordinates => "coordinates",
            Self::Other(name) => name,
        }
    }

    /// Map a field name to its tag; unknown names become [`Self::Other`].
    pub fn from_name(s: &str) -> Self {
        match s {
            "name" => Self::Name,
            "category" => Self::Category,
            "place_type" => Self::PlaceType,
            "phone" => Self::Phone,
            "website" => Self::Website,
            "address" => Self::Address,
            "existence" => Self::Existence,
            "staff_count" => Self::StaffCount,
            "industry_benchmark" => Self::IndustryBenchmark,
            "revenue_estimate" => Self::RevenueEstimate,
            "website_first_seen" => Self::WebsiteFirstSeen,
            "coordinates" => Self::Coordinates,
            other => Self::Other(other.to_string()),
        }
    }

    /// Fields whose presence moves a business to ENRICHED.
    pub fn is_contact_or_category(&self) -> bool {
        matches!(
            self,
            Self::Category
                | Self::PlaceType
                | Self::Phone
                | Self::Website
                | Self::Address
                | Self::Name
        )
    }
}

impl From<String> for ObservationField {
    fn from(s: String) -> Self {
        Self::from_name(&s)
    }
}

impl From<&str> for ObservationField {
    fn from(s: &str) -> Self {
        Self::from_name(s)
    }
}

impl From<ObservationField> for String {
    fn from(field: ObservationField) -> Self {
        field.as_str().to_string()
    }
}

impl std::fmt::Display for ObservationField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One source's claim about one field of one business.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Observation {
    pub id: i64,
    pub business_id: String,
    pub source_url: String,
    pub field: ObservationField,
    /// None when the source was consulted but reported nothing.
    pub value: Option<String>,
    pub confidence: f64,
    pub observed_at: DateTime<Utc>,
    pub http_status: Option<i32>,
    pub error: Option<String>,
}

impl Observation {
    /// The value, if present and not blank.
    pub fn present_value(&self) -> Option<&str> {
        self.value
            .as_deref()
            .map(str::trim)
            .filter(|v| !v.is_empty())
    }

    pub fn is_estimate(&self) -> bool {
        self.source_url.starts_with(ESTIMATE_SOURCE_PREFIX)
    }
}

/// Observation waiting to be appended to the ledger.
#[derive(Debug, Clone)]
pub struct NewObservation {
    pub business_id: String,
    pub source_url: String,
    pub field: ObservationField,
    pub value: Option<String>,
    pub confidence: f64,
    pub observed_at: DateTime<Utc>,
    pub http_status: Option<i32>,
    pub error: Option<String>,
}

impl NewObservation {
    pub fn new(
        business_id: impl Into<String>,
        source_url: impl Into<String>,
        field: ObservationField,
        value: Option<String>,
        confidence: f64,
    ) -> Self {
        Self {
            business_id: business_id.into(),
            source_url: source_url.into(),
            field,
            value,
            confidence,
            observed_at: Utc::now(),
            http_status: None,
            error: None,
        }
    }

    /// Record a failed fetch: no value, zero confidence, the error text kept.
    pub fn failed(
        business_id: impl Into<String>,
        source_url: impl Into<String>,
        field: ObservationField,
        http_status: Option<i32>,
        error: impl Into<String>,
    ) -> Self {
        Self {
            http_status,
            error: Some(error.into()),
            ..Self::new(business_id, source_url, field, None, 0.0)
        }
    }

    pub fn observed_at(mut self, at: DateTime<Utc>) -> Self {
        self.observed_at = at;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn field_names_roundtrip() {
        for field in [
            ObservationField::Category,
            ObservationField::StaffCount,
            ObservationField::WebsiteFirstSeen,
            ObservationField::Other("linkedin_followers".into()),
        ] {
            assert_eq!(ObservationField::from(field.as_str()), field);
        }
    }

    #[test]
    fn field_serializes_as_plain_string() {
        let json = serde_json::to_string(&ObservationField::RevenueEstimate).unwrap();
        assert_eq!(json, "\"revenue_estimate\"");
        let parsed: ObservationField = serde_json::from_str("\"staff_count\"").unwrap();
        assert_eq!(parsed, ObservationField::StaffCount);
    }

    #[test]
    fn failed_observation_has_no_value() {
        let obs = NewObservation::failed(
            "b1",
            "https://web.archive.org",
            ObservationField::WebsiteFirstSeen,
            Some(503),
            "service unavailable",
        );
        assert!(obs.value.is_none());
        assert_eq!(obs.confidence, 0.0);
        assert_eq!(obs.http_status, Some(503));
    }
}
