//! Travel distance between dormitories and places.
//!
//! Every request goes to a [`RouteProvider`] first. If the provider fails
//! for any reason (network, timeout, non-2xx, malformed body) the resolver
//! answers with a great-circle estimate instead and flags it with
//! `isFallback`. Callers never see a provider error.

pub mod cache;
pub mod error;
pub mod openroute;

use async_trait::async_trait;
use futures::future::join_all;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;
use tracing::{debug, warn};

use crate::config::RoutingConfig;
use crate::models::{Dormitory, GeoPoint};
use cache::CachedRouteProvider;
pub use error::{DistanceError, RoutingError};
use openroute::OpenRouteService;

/// Mean Earth radius used by the great-circle fallback.
pub const EARTH_RADIUS_KM: f64 = 6371.0;

/// Fallback durations assume walking pace for every mode.
pub const FALLBACK_SPEED_KMH: f64 = 5.0;

/// Default number of results for nearest-dormitory lookups.
pub const DEFAULT_NEAREST_LIMIT: usize = 5;

// ── Travel modes ────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TravelMode {
    #[serde(rename = "foot-walking")]
    FootWalking,
    #[serde(rename = "driving-car")]
    DrivingCar,
    #[serde(rename = "cycling-regular")]
    CyclingRegular,
}

impl TravelMode {
    /// Routing profile name, also used as the wire value.
    pub fn profile(&self) -> &'static str {
        match self {
            Self::FootWalking => "foot-walking",
            Self::DrivingCar => "driving-car",
            Self::CyclingRegular => "cycling-regular",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::FootWalking => "เดิน",
            Self::DrivingCar => "ขับรถ",
            Self::CyclingRegular => "ปั่นจักรยาน",
        }
    }
}

impl fmt::Display for TravelMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.profile())
    }
}

impl FromStr for TravelMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "foot-walking" | "walking" | "walk" | "foot" => Ok(Self::FootWalking),
            "driving-car" | "driving" | "drive" | "car" => Ok(Self::DrivingCar),
            "cycling-regular" | "cycling" | "bike" | "bicycle" => Ok(Self::CyclingRegular),
            other => Err(format!(
                "unknown travel mode '{}' (expected walking, driving or cycling)",
                other
            )),
        }
    }
}

// ── Provider trait ──────────────────────────────────────────────────

/// Raw provider output for one leg.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RouteLeg {
    pub distance_m: f64,
    pub duration_s: f64,
}

/// A road-network routing backend.
///
/// Implementations report every failure as a [`RoutingError`]; retrying
/// and falling back are the resolver's job, not the provider's.
#[async_trait]
pub trait RouteProvider: Send + Sync {
    async fn route(
        &self,
        from: GeoPoint,
        to: GeoPoint,
        mode: TravelMode,
    ) -> Result<RouteLeg, RoutingError>;

    /// Short identifier for logs.
    fn name(&self) -> &str;
}

// ── Results ─────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DistanceResult {
    /// Kilometres with two decimals, for display.
    pub distance_km: String,
    pub distance_m: i64,
    pub duration_min: i64,
    pub duration_text: String,
    pub mode: TravelMode,
    pub mode_label: String,
    #[serde(rename = "isFallback")]
    pub is_fallback: bool,
}

impl DistanceResult {
    fn from_leg(leg: RouteLeg, mode: TravelMode, is_fallback: bool) -> Self {
        Self {
            distance_km: format!("{:.2}", leg.distance_m / 1000.0),
            distance_m: leg.distance_m.round() as i64,
            duration_min: rounded_minutes(leg.duration_s) as i64,
            duration_text: format_duration(leg.duration_s),
            mode,
            mode_label: mode.label().to_string(),
            is_fallback,
        }
    }

    /// Great-circle estimate at walking pace.
    fn fallback(from: GeoPoint, to: GeoPoint, mode: TravelMode) -> Self {
        let km = haversine_distance(from.lat, from.lon, to.lat, to.lon);
        let leg = RouteLeg {
            distance_m: km * 1000.0,
            duration_s: km / FALLBACK_SPEED_KMH * 3600.0,
        };
        Self::from_leg(leg, mode, true)
    }

    /// Distance in kilometres as a number, for sorting.
    pub fn km(&self) -> f64 {
        self.distance_m as f64 / 1000.0
    }
}

/// Walking and driving figures between two named dormitories.
#[derive(Debug, Clone, Serialize)]
pub struct DormComparison {
    pub dorm1_name: String,
    pub dorm2_name: String,
    pub walking: DistanceResult,
    pub driving: DistanceResult,
    pub success: bool,
}

/// One candidate from a nearest-dormitory lookup.
#[derive(Debug, Clone, Serialize)]
pub struct NearbyDorm<'a> {
    pub dorm: &'a Dormitory,
    #[serde(flatten)]
    pub distance: DistanceResult,
}

// ── Resolver ────────────────────────────────────────────────────────

pub struct DistanceResolver {
    provider: Box<dyn RouteProvider>,
}

impl DistanceResolver {
    pub fn new(provider: Box<dyn RouteProvider>) -> Self {
        Self { provider }
    }

    /// Build the production resolver: OpenRouteService, optionally wrapped
    /// in a TTL cache when `cacheTtlSeconds` is set.
    pub fn from_config(config: &RoutingConfig, client: Client) -> Self {
        let ors = OpenRouteService::new(
            client,
            &config.api_key,
            Some(config.api_base.as_str()),
            Duration::from_secs(config.timeout_seconds),
        );

        let provider: Box<dyn RouteProvider> = match config.cache_ttl_seconds {
            Some(ttl) if ttl > 0 => {
                debug!(ttl_secs = ttl, "Route cache enabled");
                Box::new(CachedRouteProvider::new(
                    Box::new(ors),
                    Duration::from_secs(ttl),
                ))
            }
            _ => Box::new(ors),
        };

        Self::new(provider)
    }

    /// Road distance between two `lat, lon` pairs. Never fails.
    pub async fn calculate_road_distance(
        &self,
        lat1: f64,
        lon1: f64,
        lat2: f64,
        lon2: f64,
        mode: TravelMode,
    ) -> DistanceResult {
        let from = GeoPoint { lat: lat1, lon: lon1 };
        let to = GeoPoint { lat: lat2, lon: lon2 };
        self.route_between(from, to, mode).await
    }

    /// Same as [`Self::calculate_road_distance`] for prepared points.
    pub async fn route_between(&self, from: GeoPoint, to: GeoPoint, mode: TravelMode) -> DistanceResult {
        match self.provider.route(from, to, mode).await {
            Ok(leg) => DistanceResult::from_leg(leg, mode, false),
            Err(e) => {
                warn!(
                    provider = self.provider.name(),
                    mode = mode.profile(),
                    error = %e,
                    "Routing failed, using great-circle fallback"
                );
                DistanceResult::fallback(from, to, mode)
            }
        }
    }

    /// Walking and driving distance between two dormitories, resolved
    /// concurrently.
    ///
    /// Both dormitories must have a valid location; otherwise this fails
    /// with [`DistanceError::MissingCoordinates`].
    pub async fn calculate_distance_between_dorms(
        &self,
        dorm1: &Dormitory,
        dorm2: &Dormitory,
    ) -> Result<DormComparison, DistanceError> {
        let from = require_location(dorm1)?;
        let to = require_location(dorm2)?;

        let (walking, driving) = futures::join!(
            self.route_between(from, to, TravelMode::FootWalking),
            self.route_between(from, to, TravelMode::DrivingCar),
        );

        Ok(DormComparison {
            dorm1_name: dorm1.name.clone(),
            dorm2_name: dorm2.name.clone(),
            walking,
            driving,
            success: true,
        })
    }

    /// Walking distance from a point to every dormitory with a valid
    /// location, nearest first, at most `limit` entries.
    ///
    /// Dormitories without usable coordinates are left out. One candidate's
    /// provider failure only affects that candidate.
    pub async fn find_nearest_dorms_to_location<'a>(
        &self,
        lat: f64,
        lon: f64,
        dorms: &'a [Dormitory],
        limit: usize,
    ) -> Vec<NearbyDorm<'a>> {
        let target = GeoPoint { lat, lon };

        let tasks = dorms.iter().filter_map(|dorm| {
            let Some(location) = dorm.location() else {
                debug!(dorm = %dorm.name, "Skipping dormitory without coordinates");
                return None;
            };
            Some(async move {
                let distance = self
                    .route_between(target, location, TravelMode::FootWalking)
                    .await;
                NearbyDorm { dorm, distance }
            })
        });

        let mut results = join_all(tasks).await;
        results.sort_by(|a, b| a.distance.km().total_cmp(&b.distance.km()));
        results.truncate(limit);
        results
    }
}

fn require_location(dorm: &Dormitory) -> Result<GeoPoint, DistanceError> {
    dorm.location().ok_or_else(|| DistanceError::MissingCoordinates {
        dorm: dorm.name.clone(),
    })
}

// ── Helpers ─────────────────────────────────────────────────────────

/// Great-circle distance in kilometres.
pub fn haversine_distance(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let dlat = (lat2 - lat1).to_radians();
    let dlon = (lon2 - lon1).to_radians();
    let a = (dlat / 2.0).sin().powi(2)
        + lat1.to_radians().cos() * lat2.to_radians().cos() * (dlon / 2.0).sin().powi(2);
    let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());
    EARTH_RADIUS_KM * c
}

/// `"H ชม. M นาที"`, or just `"M นาที"` under an hour. Minutes are rounded.
pub fn format_duration(seconds: f64) -> String {
    let total = rounded_minutes(seconds);
    let hours = total / 60;
    let minutes = total % 60;

    if hours > 0 {
        format!("{} ชม. {} นาที", hours, minutes)
    } else {
        format!("{} นาที", minutes)
    }
}

fn rounded_minutes(seconds: f64) -> u64 {
    (seconds.max(0.0) / 60.0).round() as u64
}
