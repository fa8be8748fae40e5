use super::{Gate, GateInput, GateOutcome};
use crate::config::GeographyConfig;
use crate::normalize::normalize_city;

const RULE_ID: &str = "geography";

/// Mean Earth radius in kilometres.
const EARTH_RADIUS_KM: f64 = 6371.0088;

/// Great-circle distance between two points in kilometres.
pub fn haversine_km(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let (phi1, phi2) = (lat1.to_radians(), lat2.to_radians());
    let d_phi = (lat2 - lat1).to_radians();
    let d_lambda = (lon2 - lon1).to_radians();

    let a = (d_phi / 2.0).sin().powi(2) + phi1.cos() * phi2.cos() * (d_lambda / 2.0).sin().powi(2);
    2.0 * EARTH_RADIUS_KM * a.sqrt().asin()
}

/// Radius check AND city allowlist. Either failing alone excludes.
pub struct GeographyGate {
    config: GeographyConfig,
    allowlist: Vec<String>,
}

impl GeographyGate {
    pub fn new(config: GeographyConfig) -> Self {
        let allowlist = config
            .city_allowlist
            .iter()
            .map(|c| normalize_city(c))
            .filter(|c| !c.is_empty())
            .collect();
        Self { config, allowlist }
    }

    /// Distance from the configured reference point.
    pub fn distance_km(&self, lat: f64, lon: f64) -> f64 {
        haversine_km(self.config.reference_lat, self.config.reference_lon, lat, lon)
    }
}

impl Gate for GeographyGate {
    fn rule_id(&self) -> &'static str {
        RULE_ID
    }

    fn evaluate(&self, input: &GateInput<'_>) -> GateOutcome {
        let business = input.business;

        let Some((lat, lon)) = business.coordinates() else {
            return GateOutcome::exclude(RULE_ID, "cannot verify location: no coordinates", vec![]);
        };
        let city = business
            .city
            .as_deref()
            .map(normalize_city)
            .filter(|c| !c.is_empty());
        let Some(city) = city else {
            return GateOutcome::exclude(RULE_ID, "cannot verify location: no city", vec![]);
        };

        let distance = self.distance_km(lat, lon);
        let in_radius = distance <= self.config.radius_km;
        let allowlisted = self.allowlist.contains(&city);

        match (in_radius, allowlisted) {
            (true, true) => GateOutcome::pass(
                RULE_ID,
                format!(
                    "{:.1} km from reference (limit {:.1} km), city {} allowlisted",
                    distance, self.config.radius_km, city
                ),
                vec![],
            ),
            (false, true) => GateOutcome::exclude(
                RULE_ID,
                format!(
                    "{:.1} km from reference exceeds {:.1} km radius",
                    distance, self.config.radius_km
                ),
                vec![],
            ),
            (true, false) => GateOutcome::exclude(
                RULE_ID,
                format!("city {} is not in the allowlist", city),
                vec![],
            ),
            (false, false) => GateOutcome::exclude(
                RULE_ID,
                format!(
                    "{:.1} km from reference and city {} is not in the allowlist",
                    distance, city
                ),
                vec![],
            ),
        }
    }
}
