//! OpenRouteService directions client.
//!
//! Uses the GeoJSON `GET /v2/directions/{profile}` endpoint, which takes the
//! key as a query parameter and points as `lon,lat` (note the order).

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;

use super::error::RoutingError;
use super::{RouteLeg, RouteProvider, TravelMode};
use crate::models::GeoPoint;

pub const DEFAULT_BASE_URL: &str = "https://api.openrouteservice.org";

/// Per-request timeout used when the config does not set one.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

pub struct OpenRouteService {
    client: Client,
    api_key: String,
    base_url: String,
    timeout: Duration,
}

impl OpenRouteService {
    /// Create a client.
    ///
    /// # Arguments
    /// * `client` - Shared HTTP client
    /// * `api_key` - OpenRouteService key (empty = every call fails fast)
    /// * `api_base` - Custom base URL (None = public endpoint)
    /// * `timeout` - Bound on each directions request
    pub fn new(client: Client, api_key: &str, api_base: Option<&str>, timeout: Duration) -> Self {
        let base_url = api_base
            .unwrap_or(DEFAULT_BASE_URL)
            .trim_end_matches('/')
            .to_string();

        debug!(base_url = %base_url, timeout_secs = timeout.as_secs(), "Initialized routing provider");

        Self {
            client,
            api_key: api_key.to_string(),
            base_url,
            timeout,
        }
    }

    fn directions_url(&self, mode: TravelMode) -> String {
        format!("{}/v2/directions/{}", self.base_url, mode.profile())
    }
}

/// `lon,lat`, the order the provider expects.
fn lon_lat(point: GeoPoint) -> String {
    format!("{},{}", point.lon, point.lat)
}

// ── Directions response (GeoJSON) ───────────────────────────────────

#[derive(Deserialize)]
struct DirectionsResponse {
    #[serde(default)]
    features: Vec<Feature>,
}

#[derive(Deserialize)]
struct Feature {
    properties: FeatureProperties,
}

#[derive(Deserialize)]
struct FeatureProperties {
    #[serde(default)]
    segments: Vec<Segment>,
}

#[derive(Deserialize)]
struct Segment {
    distance: f64,
    duration: f64,
}

/// Pull distance and duration out of the first segment of the first route.
pub(crate) fn parse_directions(body: &str) -> Result<RouteLeg, RoutingError> {
    let parsed: DirectionsResponse =
        serde_json::from_str(body).map_err(|e| RoutingError::Malformed(e.to_string()))?;

    let segment = parsed
        .features
        .into_iter()
        .next()
        .and_then(|f| f.properties.segments.into_iter().next())
        .ok_or_else(|| RoutingError::Malformed("route has no segments".into()))?;

    if !segment.distance.is_finite() || !segment.duration.is_finite() {
        return Err(RoutingError::Malformed("non-finite segment values".into()));
    }

    Ok(RouteLeg {
        distance_m: segment.distance,
        duration_s: segment.duration,
    })
}

#[async_trait]
impl RouteProvider for OpenRouteService {
    async fn route(
        &self,
        from: GeoPoint,
        to: GeoPoint,
        mode: TravelMode,
    ) -> Result<RouteLeg, RoutingError> {
        if self.api_key.is_empty() {
            return Err(RoutingError::NotConfigured);
        }

        let url = self.directions_url(mode);
        debug!(url = %url, mode = mode.profile(), "Requesting route");

        let response = self
            .client
            .get(&url)
            .timeout(self.timeout)
            .header("Accept", "application/json, application/geo+json")
            .query(&[
                ("api_key", self.api_key.as_str()),
                ("start", lon_lat(from).as_str()),
                ("end", lon_lat(to).as_str()),
            ])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(RoutingError::Status(status));
        }

        let body = response.text().await?;
        parse_directions(&body)
    }

    fn name(&self) -> &str {
        "openrouteservice"
    }
}
