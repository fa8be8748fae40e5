//! Wayback Machine CDX lookup for the earliest snapshot of a domain.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tracing::debug;

use super::{LookupError, WebsiteAgeLookup};
use crate::gates::parse_snapshot_timestamp;

/// Wayback Machine CDX API base URL.
pub const WAYBACK_CDX_API_URL: &str = "https://web.archive.org/cdx/search/cdx";

/// Website-age lookup backed by the CDX API.
pub struct WaybackAgeLookup {
    client: reqwest::Client,
    base_url: String,
}

impl WaybackAgeLookup {
    pub fn new(user_agent: &str, request_timeout: Duration) -> Result<Self, LookupError> {
        let client = reqwest::Client::builder()
            .user_agent(user_agent)
            .timeout(request_timeout)
            .build()?;
        Ok(Self {
            client,
            base_url: WAYBACK_CDX_API_URL.to_string(),
        })
    }

    /// Override the CDX API base URL (for alternative instances).
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    /// CDX results are ordered oldest first, so one row is the earliest capture.
    fn query_url(&self, domain: &str) -> Result<url::Url, LookupError> {
        url::Url::parse_with_params(
            &self.base_url,
            &[
                ("url", domain),
                ("output", "json"),
                ("fl", "timestamp"),
                ("filter", "statuscode:200"),
                ("limit", "1"),
            ],
        )
        .map_err(|e| LookupError::Parse(format!("bad CDX base URL {}: {}", self.base_url, e)))
    }
}

/// Earliest timestamp from a CDX JSON body: a header row, then data rows.
fn parse_first_timestamp(body: &str) -> Result<Option<DateTime<Utc>>, LookupError> {
    if body.trim().is_empty() {
        return Ok(None);
    }

    let rows: Vec<Vec<String>> =
        serde_json::from_str(body).map_err(|e| LookupError::Parse(e.to_string()))?;

    let Some(header) = rows.first() else {
        return Ok(None);
    };
    let Some(column) = header.iter().position(|h| h == "timestamp") else {
        return Err(LookupError::Parse("CDX response has no timestamp column".into()));
    };

    let first = rows
        .iter()
        .skip(1)
        .filter_map(|row| row.get(column))
        .find(|ts| ts.as_str() != "-");
    let Some(timestamp) = first else {
        return Ok(None);
    };

    parse_snapshot_timestamp(timestamp)
        .map(Some)
        .ok_or_else(|| LookupError::Parse(format!("bad CDX timestamp {:?}", timestamp)))
}

#[async_trait]
impl WebsiteAgeLookup for WaybackAgeLookup {
    fn source_url(&self, domain: &str) -> String {
        format!("{}?url={}", self.base_url, domain)
    }

    async fn first_seen(&self, domain: &str) -> Result<Option<DateTime<Utc>>, LookupError> {
        let url = self.query_url(domain)?;
        debug!("Querying CDX for {}", domain);

        let response = self.client.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(LookupError::Status(status.as_u16()));
        }

        let body = response.text().await?;
        parse_first_timestamp(&body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_parse_first_timestamp() {
        let body = r#"[["timestamp"],["20040212083015"]]"#;
        assert_eq!(
            parse_first_timestamp(body).unwrap(),
            Some(Utc.with_ymd_and_hms(2004, 2, 12, 8, 30, 15).unwrap())
        );
    }

    #[test]
    fn test_parse_empty_results() {
        assert_eq!(parse_first_timestamp("").unwrap(), None);
        assert_eq!(parse_first_timestamp("[]").unwrap(), None);
        assert_eq!(parse_first_timestamp(r#"[["timestamp"]]"#).unwrap(), None);
    }

    #[test]
    fn test_parse_malformed() {
        assert!(matches!(
            parse_first_timestamp("<html>"),
            Err(LookupError::Parse(_))
        ));
        assert!(matches!(
            parse_first_timestamp(r#"[["original"],["http://x"]]"#),
            Err(LookupError::Parse(_))
        ));
    }

    #[test]
    fn test_query_url() {
        let lookup = WaybackAgeLookup::new("leadgate-test", Duration::from_secs(5))
            .unwrap()
            .with_base_url("https://cdx.example/search");
        let url = lookup.query_url("bartontool.ca").unwrap();
        assert_eq!(url.host_str(), Some("cdx.example"));
        let pairs: Vec<(String, String)> = url.query_pairs().into_owned().collect();
        assert!(pairs.contains(&("url".into(), "bartontool.ca".into())));
        assert!(pairs.contains(&("limit".into(), "1".into())));
        assert_eq!(
            lookup.source_url("bartontool.ca"),
            "https://cdx.example/search?url=bartontool.ca"
        );
    }
}
