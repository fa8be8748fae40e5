//! Records produced by the external discovery and enrichment collaborators.

use serde::{Deserialize, Serialize};

/// One business as reported by a directory connector.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DiscoveryRecord {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub street: Option<String>,
    #[serde(default)]
    pub city: Option<String>,
    #[serde(default)]
    pub postal_code: Option<String>,
    #[serde(default)]
    pub province: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub website: Option<String>,
    #[serde(default, alias = "lat")]
    pub latitude: Option<f64>,
    #[serde(default, alias = "lon", alias = "lng")]
    pub longitude: Option<f64>,
    pub source_url: String,
    #[serde(default, alias = "types")]
    pub place_types: Vec<String>,
}

impl DiscoveryRecord {
    pub fn new(name: &str, source_url: &str) -> Self {
        Self {
            name: Some(name.to_string()),
            source_url: source_url.to_string(),
            ..Self::default()
        }
    }
}

/// Which business an enrichment signal is about.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SignalTarget {
    BusinessId(String),
    Fingerprint(String),
}

/// Enrichment data point (staff count, benchmark, revenue estimate, ...).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnrichmentSignal {
    #[serde(flatten)]
    pub target: SignalTarget,
    pub source_url: String,
    pub field: String,
    #[serde(default)]
    pub value: Option<String>,
    pub confidence: f64,
}
