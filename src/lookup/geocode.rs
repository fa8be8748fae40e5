//! Offline geocoder that places a business at its city centroid.

use std::collections::HashMap;
use std::sync::LazyLock;

use async_trait::async_trait;

use super::{Geocoder, LookupError};
use crate::models::Business;
use crate::normalize::normalize_city;

static ONTARIO_CENTROIDS: LazyLock<HashMap<String, (f64, f64)>> = LazyLock::new(|| {
    [
        ("hamilton", (43.2557, -79.8711)),
        ("stoney creek", (43.2176, -79.7650)),
        ("ancaster", (43.2172, -79.9873)),
        ("dundas", (43.2665, -79.9543)),
        ("waterdown", (43.3345, -79.8930)),
        ("flamborough", (43.3306, -79.9720)),
        ("glanbrook", (43.1750, -79.8860)),
        ("binbrook", (43.1226, -79.8047)),
        ("burlington", (43.3255, -79.7990)),
        ("grimsby", (43.2001, -79.5610)),
        ("oakville", (43.4675, -79.6877)),
        ("milton", (43.5183, -79.8774)),
        ("brantford", (43.1394, -80.2644)),
        ("st catharines", (43.1594, -79.2469)),
        ("niagara falls", (43.0896, -79.0849)),
        ("mississauga", (43.5890, -79.6441)),
        ("toronto", (43.6534, -79.3839)),
        ("guelph", (43.5448, -80.2482)),
        ("cambridge", (43.3616, -80.3144)),
        ("kitchener", (43.4516, -80.4925)),
        ("waterloo", (43.4643, -80.5204)),
        ("london", (42.9849, -81.2453)),
    ]
    .into_iter()
    .map(|(city, point)| (city.to_string(), point))
    .collect()
});

/// Looks the business's city up in a centroid table.
#[derive(Debug, Clone)]
pub struct StaticGeocoder {
    centroids: HashMap<String, (f64, f64)>,
}

impl Default for StaticGeocoder {
    fn default() -> Self {
        Self {
            centroids: ONTARIO_CENTROIDS.clone(),
        }
    }
}

impl StaticGeocoder {
    /// Add or replace a centroid.
    pub fn with_city(mut self, city: &str, lat: f64, lon: f64) -> Self {
        self.centroids.insert(normalize_city(city), (lat, lon));
        self
    }
}

#[async_trait]
impl Geocoder for StaticGeocoder {
    fn source_url(&self) -> String {
        "geocode:city-centroid".to_string()
    }

    async fn geocode(&self, business: &Business) -> Result<Option<(f64, f64)>, LookupError> {
        Ok(business
            .city
            .as_deref()
            .map(normalize_city)
            .and_then(|city| self.centroids.get(&city).copied()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::DiscoveryRecord;
    use chrono::Utc;

    fn in_city(city: Option<&str>) -> Business {
        let record = DiscoveryRecord {
            city: city.map(str::to_string),
            ..DiscoveryRecord::new("Some Shop", "https://x")
        };
        Business::discovered("fp".into(), &record, Utc::now())
    }

    #[tokio::test]
    async fn test_known_and_unknown_cities() {
        let geocoder = StaticGeocoder::default();
        assert_eq!(
            geocoder.geocode(&in_city(Some("  Stoney Creek "))).await.unwrap(),
            Some((43.2176, -79.7650))
        );
        assert_eq!(geocoder.geocode(&in_city(Some("Atlantis"))).await.unwrap(), None);
        assert_eq!(geocoder.geocode(&in_city(None)).await.unwrap(), None);

        let geocoder = geocoder.with_city("Atlantis", 1.0, 2.0);
        assert_eq!(
            geocoder.geocode(&in_city(Some("ATLANTIS"))).await.unwrap(),
            Some((1.0, 2.0))
        );
    }
}
