//! Opt-in memoization of successful routes.
//!
//! Only provider successes are stored; failures always go back to the
//! provider on the next request.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};
use std::time::{Duration, Instant};
use tracing::debug;

use super::error::RoutingError;
use super::{RouteLeg, RouteProvider, TravelMode};
use crate::models::GeoPoint;

/// Coordinates are quantized to micro-degrees (~11 cm) for the key.
type RouteKey = (i64, i64, i64, i64, TravelMode);

fn micro(deg: f64) -> i64 {
    (deg * 1_000_000.0).round() as i64
}

fn key(from: GeoPoint, to: GeoPoint, mode: TravelMode) -> RouteKey {
    (micro(from.lat), micro(from.lon), micro(to.lat), micro(to.lon), mode)
}

pub struct CachedRouteProvider {
    inner: Box<dyn RouteProvider>,
    ttl: Duration,
    entries: Mutex<HashMap<RouteKey, (Instant, RouteLeg)>>,
}

impl CachedRouteProvider {
    pub fn new(inner: Box<dyn RouteProvider>, ttl: Duration) -> Self {
        Self {
            inner,
            ttl,
            entries: Mutex::new(HashMap::new()),
        }
    }

    fn lookup(&self, key: &RouteKey) -> Option<RouteLeg> {
        let entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        entries
            .get(key)
            .filter(|(stored, _)| stored.elapsed() < self.ttl)
            .map(|(_, leg)| *leg)
    }

    fn store(&self, key: RouteKey, leg: RouteLeg) {
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        let ttl = self.ttl;
        entries.retain(|_, (stored, _)| stored.elapsed() < ttl);
        entries.insert(key, (Instant::now(), leg));
    }

    pub fn len(&self) -> usize {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl RouteProvider for CachedRouteProvider {
    async fn route(
        &self,
        from: GeoPoint,
        to: GeoPoint,
        mode: TravelMode,
    ) -> Result<RouteLeg, RoutingError> {
        let key = key(from, to, mode);

        if let Some(leg) = self.lookup(&key) {
            debug!(mode = mode.profile(), "Route cache hit");
            return Ok(leg);
        }

        let leg = self.inner.route(from, to, mode).await?;
        self.store(key, leg);
        Ok(leg)
    }

    fn name(&self) -> &str {
        self.inner.name()
    }
}
