//! Dormitory records as supplied by the listing backend.
//!
//! The backend hands out whatever the database holds: prices may be numbers,
//! decimal strings, or missing, and coordinates may be blank. Everything here
//! deserializes leniently so a single bad row never fails the whole list.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// A latitude/longitude pair in decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub lat: f64,
    pub lon: f64,
}

impl GeoPoint {
    /// Build a point, rejecting non-finite or out-of-range values.
    pub fn new(lat: f64, lon: f64) -> Option<Self> {
        let valid = lat.is_finite()
            && lon.is_finite()
            && (-90.0..=90.0).contains(&lat)
            && (-180.0..=180.0).contains(&lon);
        valid.then_some(Self { lat, lon })
    }
}

/// One coordinate entry attached to a dormitory.
///
/// Values are kept raw; use [`CoordinateEntry::point`] to get a checked point.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CoordinateEntry {
    #[serde(default)]
    pub latitude: Value,
    #[serde(default)]
    pub longitude: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
}

impl CoordinateEntry {
    pub fn new(lat: f64, lon: f64) -> Self {
        Self {
            latitude: Value::from(lat),
            longitude: Value::from(lon),
            label: None,
        }
    }

    pub fn point(&self) -> Option<GeoPoint> {
        GeoPoint::new(number_from(&self.latitude)?, number_from(&self.longitude)?)
    }
}

/// A rentable dormitory listing.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Dormitory {
    #[serde(default)]
    pub id: Option<i64>,
    pub name: String,
    #[serde(default, deserialize_with = "lenient_price")]
    pub price_daily: Option<f64>,
    #[serde(default, deserialize_with = "lenient_price")]
    pub price_monthly: Option<f64>,
    #[serde(default, deserialize_with = "lenient_price")]
    pub price_term: Option<f64>,
    /// First entry is the dormitory itself, the rest are nearby places.
    #[serde(default)]
    pub coordinates: Vec<CoordinateEntry>,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub facilities: Option<String>,
}

impl Dormitory {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            ..Self::default()
        }
    }

    /// The dormitory's own location, if it has a valid one.
    pub fn location(&self) -> Option<GeoPoint> {
        self.coordinates.first().and_then(CoordinateEntry::point)
    }

    /// Auxiliary points recorded after the dormitory's own location.
    pub fn nearby_places(&self) -> impl Iterator<Item = &CoordinateEntry> {
        self.coordinates.iter().skip(1)
    }

    /// Monthly-normalized price used only for ranking.
    ///
    /// Monthly wins when set; otherwise daily × 30; otherwise infinity, which
    /// callers treat as "no price". The term price never participates.
    pub fn comparable_price(&self) -> f64 {
        match (positive(self.price_monthly), positive(self.price_daily)) {
            (Some(monthly), _) => monthly,
            (None, Some(daily)) => daily * 30.0,
            (None, None) => f64::INFINITY,
        }
    }

    pub fn has_price(&self) -> bool {
        self.comparable_price().is_finite()
    }
}

/// Returns the value only when it is a finite number above zero.
pub(crate) fn positive(value: Option<f64>) -> Option<f64> {
    value.filter(|v| v.is_finite() && *v > 0.0)
}

fn number_from(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }
}

fn lenient_price<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<Value>::deserialize(deserializer)?;
    Ok(raw.as_ref().and_then(number_from).filter(|v| v.is_finite()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn priced(daily: Option<f64>, monthly: Option<f64>, term: Option<f64>) -> Dormitory {
        Dormitory {
            price_daily: daily,
            price_monthly: monthly,
            price_term: term,
            ..Dormitory::new("test")
        }
    }

    #[test]
    fn test_comparable_price_table() {
        assert_eq!(priced(None, Some(2500.0), None).comparable_price(), 2500.0);
        assert_eq!(priced(Some(100.0), None, None).comparable_price(), 3000.0);
        assert!(priced(Some(0.0), Some(0.0), Some(9000.0))
            .comparable_price()
            .is_infinite());
        assert!(priced(None, None, None).comparable_price().is_infinite());
    }

    #[test]
    fn test_monthly_beats_daily() {
        let dorm = priced(Some(50.0), Some(4000.0), None);
        assert_eq!(dorm.comparable_price(), 4000.0);
    }

    #[test]
    fn test_deserialize_string_prices() {
        let json = r#"{"name": "หอพักสุขใจ", "price_monthly": "3500.00", "price_daily": null, "price_term": "n/a"}"#;
        let dorm: Dormitory = serde_json::from_str(json).unwrap();
        assert_eq!(dorm.price_monthly, Some(3500.0));
        assert_eq!(dorm.price_daily, None);
        assert_eq!(dorm.price_term, None);
    }

    #[test]
    fn test_location_accepts_numeric_strings() {
        let json = r#"{"name": "A", "coordinates": [{"latitude": "13.7563", "longitude": 100.5018}]}"#;
        let dorm: Dormitory = serde_json::from_str(json).unwrap();
        let point = dorm.location().unwrap();
        assert!((point.lat - 13.7563).abs() < 1e-9);
        assert!((point.lon - 100.5018).abs() < 1e-9);
    }

    #[test]
    fn test_invalid_location_is_none() {
        let json = r#"{"name": "A", "coordinates": [{"latitude": "abc", "longitude": 100.5}]}"#;
        let dorm: Dormitory = serde_json::from_str(json).unwrap();
        assert!(dorm.location().is_none());

        let dorm: Dormitory = serde_json::from_str(r#"{"name": "B"}"#).unwrap();
        assert!(dorm.location().is_none());

        let mut dorm = Dormitory::new("C");
        dorm.coordinates.push(CoordinateEntry::new(120.0, 100.0));
        assert!(dorm.location().is_none());
    }

    #[test]
    fn test_nearby_places_skip_own_location() {
        let mut dorm = Dormitory::new("A");
        dorm.coordinates.push(CoordinateEntry::new(13.0, 100.0));
        dorm.coordinates.push(CoordinateEntry {
            label: Some("7-Eleven".into()),
            ..CoordinateEntry::new(13.001, 100.001)
        });
        let nearby: Vec<_> = dorm.nearby_places().collect();
        assert_eq!(nearby.len(), 1);
        assert_eq!(nearby[0].label.as_deref(), Some("7-Eleven"));
    }
}
