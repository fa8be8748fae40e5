//! External collaborators: geocoding and website archive age.
//!
//! Every call goes through a [`RetryPolicy`], so the pipeline only ever sees
//! a [`LookupOutcome`]: found, not found, or unavailable after retries.

mod geocode;
mod retry;
mod wayback;

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

pub use geocode::StaticGeocoder;
pub use retry::RetryPolicy;
pub use wayback::{WaybackAgeLookup, WAYBACK_CDX_API_URL};

use crate::models::Business;

/// Errors from a single lookup attempt.
#[derive(Debug, thiserror::Error)]
pub enum LookupError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("unexpected HTTP status {0}")]
    Status(u16),

    #[error("timed out after {0:?}")]
    Timeout(Duration),

    #[error("malformed response: {0}")]
    Parse(String),
}

impl LookupError {
    /// Whether another attempt could succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Http(e) => e.is_timeout() || e.is_connect() || e.is_request(),
            Self::Status(code) => *code == 429 || *code >= 500,
            Self::Timeout(_) => true,
            Self::Parse(_) => false,
        }
    }

    /// HTTP status code, when the failure carried one.
    pub fn http_status(&self) -> Option<u16> {
        match self {
            Self::Http(e) => e.status().map(|s| s.as_u16()),
            Self::Status(code) => Some(*code),
            _ => None,
        }
    }
}

/// Result of a lookup after the retry policy has run its course.
#[derive(Debug, Clone, PartialEq)]
pub enum LookupOutcome<T> {
    Found(T),
    /// The service answered and has nothing for this input.
    NotFound,
    /// Every attempt failed.
    Unavailable {
        error: String,
        http_status: Option<u16>,
        attempts: u32,
    },
}

impl<T> LookupOutcome<T> {
    pub fn found(self) -> Option<T> {
        match self {
            Self::Found(value) => Some(value),
            _ => None,
        }
    }
}

/// Resolves coordinates for a business that arrived without them.
#[async_trait]
pub trait Geocoder: Send + Sync {
    /// Identifier recorded as the observation source.
    fn source_url(&self) -> String;

    async fn geocode(&self, business: &Business) -> Result<Option<(f64, f64)>, LookupError>;
}

/// Finds the earliest archived snapshot of a website.
#[async_trait]
pub trait WebsiteAgeLookup: Send + Sync {
    /// Identifier recorded as the observation source for `domain`.
    fn source_url(&self, domain: &str) -> String;

    async fn first_seen(&self, domain: &str) -> Result<Option<DateTime<Utc>>, LookupError>;
}
