//! Thresholds and policies for the qualification pipeline.
//!
//! Every gate receives its section at construction; nothing here is global.
//! [`QualificationConfig::validate`] runs before any business is processed.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::models::{GateAction, ObservationField};

/// Configuration problems that stop a run before it starts.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse {format} config {path}: {message}")]
    Parse {
        format: &'static str,
        path: String,
        message: String,
    },

    #[error("invalid {key}: {message}")]
    Invalid { key: &'static str, message: String },
}

fn invalid(key: &'static str, message: impl Into<String>) -> ConfigError {
    ConfigError::Invalid {
        key,
        message: message.into(),
    }
}

/// Revenue gate settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RevenueConfig {
    /// Minimum confidence of the best revenue estimate (inclusive).
    pub confidence_threshold: f64,
}

impl Default for RevenueConfig {
    fn default() -> Self {
        Self {
            confidence_threshold: 0.6,
        }
    }
}

/// Geography gate settings. Both the radius and the allowlist must hold.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeographyConfig {
    pub reference_lat: f64,
    pub reference_lon: f64,
    pub radius_km: f64,
    /// City names compared after normalization (case and punctuation insensitive).
    pub city_allowlist: Vec<String>,
}

impl Default for GeographyConfig {
    fn default() -> Self {
        // Hamilton, Ontario city hall.
        Self {
            reference_lat: 43.2557,
            reference_lon: -79.8711,
            radius_km: 25.0,
            city_allowlist: [
                "Hamilton",
                "Stoney Creek",
                "Ancaster",
                "Dundas",
                "Waterdown",
                "Flamborough",
                "Glanbrook",
                "Binbrook",
                "Burlington",
                "Grimsby",
            ]
            .into_iter()
            .map(str::to_string)
            .collect(),
        }
    }
}

/// Corroboration gate settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CorroborationConfig {
    /// Independent sources that must agree on the key field.
    pub min_sources: u32,
    pub key_field: ObservationField,
}

impl Default for CorroborationConfig {
    fn default() -> Self {
        Self {
            min_sources: 2,
            key_field: ObservationField::Category,
        }
    }
}

/// Website-age gate settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WebsiteAgeConfig {
    pub min_years: f64,
    /// Width of the review band just below `min_years`.
    pub review_band_years: f64,
    /// Outcome when there is no website or no archive snapshot.
    pub missing_action: GateAction,
}

impl Default for WebsiteAgeConfig {
    fn default() -> Self {
        Self {
            min_years: 3.0,
            review_band_years: 0.5,
            missing_action: GateAction::AutoExclude,
        }
    }
}

/// Extra category patterns, appended to the built-in rule set.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CategoryConfig {
    pub whitelist: Vec<String>,
    pub blacklist: Vec<String>,
    pub borderline: Vec<String>,
}

/// Review queue policy.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReviewConfig {
    /// Days after which an untouched REVIEW_REQUIRED business is excluded.
    /// `None` keeps reviews open indefinitely.
    pub expiry_days: Option<u32>,
}

/// Batch execution settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Businesses processed concurrently.
    pub concurrency: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self { concurrency: 4 }
    }
}

/// Timeouts and retry policy for external lookups.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LookupConfig {
    pub timeout_secs: u64,
    pub max_attempts: u32,
    pub initial_backoff_ms: u64,
    pub max_backoff_ms: u64,
    pub backoff_multiplier: f64,
}

impl Default for LookupConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 15,
            max_attempts: 3,
            initial_backoff_ms: 500,
            max_backoff_ms: 8_000,
            backoff_multiplier: 2.0,
        }
    }
}

impl LookupConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Everything the orchestrator and gates need to decide a business.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct QualificationConfig {
    pub revenue: RevenueConfig,
    pub geography: GeographyConfig,
    pub corroboration: CorroborationConfig,
    pub website_age: WebsiteAgeConfig,
    pub category: CategoryConfig,
    pub review: ReviewConfig,
    pub pipeline: PipelineConfig,
    pub lookup: LookupConfig,
}

impl QualificationConfig {
    /// Reject settings that would silently mis-qualify leads.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let threshold = self.revenue.confidence_threshold;
        if !(0.0..=1.0).contains(&threshold) {
            return Err(invalid(
                "revenue.confidence_threshold",
                format!("{threshold} is outside [0, 1]"),
            ));
        }

        let geo = &self.geography;
        if !(-90.0..=90.0).contains(&geo.reference_lat) {
            return Err(invalid(
                "geography.reference_lat",
                format!("{} is not a latitude", geo.reference_lat),
            ));
        }
        if !(-180.0..=180.0).contains(&geo.reference_lon) {
            return Err(invalid(
                "geography.reference_lon",
                format!("{} is not a longitude", geo.reference_lon),
            ));
        }
        if !(geo.radius_km.is_finite() && geo.radius_km > 0.0) {
            return Err(invalid(
                "geography.radius_km",
                format!("{} must be positive", geo.radius_km),
            ));
        }
        if geo.city_allowlist.iter().all(|c| c.trim().is_empty()) {
            return Err(invalid("geography.city_allowlist", "must name at least one city"));
        }

        if self.corroboration.min_sources == 0 {
            return Err(invalid("corroboration.min_sources", "must be at least 1"));
        }

        let age = &self.website_age;
        if !(age.min_years.is_finite() && age.min_years >= 0.0) {
            return Err(invalid(
                "website_age.min_years",
                format!("{} must be a non-negative number", age.min_years),
            ));
        }
        if !(age.review_band_years.is_finite() && age.review_band_years >= 0.0) {
            return Err(invalid(
                "website_age.review_band_years",
                format!("{} must be a non-negative number", age.review_band_years),
            ));
        }
        if age.review_band_years > age.min_years {
            return Err(invalid(
                "website_age.review_band_years",
                format!(
                    "band {} is wider than the minimum age {}",
                    age.review_band_years, age.min_years
                ),
            ));
        }

        for (key, patterns) in [
            ("category.whitelist", &self.category.whitelist),
            ("category.blacklist", &self.category.blacklist),
            ("category.borderline", &self.category.borderline),
        ] {
            for pattern in patterns {
                regex::Regex::new(pattern)
                    .map_err(|e| invalid(key, format!("bad pattern {pattern:?}: {e}")))?;
            }
        }

        if self.review.expiry_days == Some(0) {
            return Err(invalid("review.expiry_days", "must be at least 1 when set"));
        }

        if self.pipeline.concurrency == 0 {
            return Err(invalid("pipeline.concurrency", "must be at least 1"));
        }

        let lookup = &self.lookup;
        if lookup.max_attempts == 0 {
            return Err(invalid("lookup.max_attempts", "must be at least 1"));
        }
        if lookup.timeout_secs == 0 {
            return Err(invalid("lookup.timeout_secs", "must be at least 1"));
        }
        if lookup.initial_backoff_ms > lookup.max_backoff_ms {
            return Err(invalid(
                "lookup.initial_backoff_ms",
                "must not exceed lookup.max_backoff_ms",
            ));
        }
        if !(lookup.backoff_multiplier.is_finite() && lookup.backoff_multiplier >= 1.0) {
            return Err(invalid("lookup.backoff_multiplier", "must be at least 1.0"));
        }

        Ok(())
    }
}
