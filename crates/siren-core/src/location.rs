//! Coordinates and last-known locations.
//!
//! Each party owns at most one location row. A new report overwrites the old
//! one in place; no history is retained.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{Error, Result, party::PartyKind};

const EARTH_RADIUS_KM: f64 = 6371.0088;

// ─── Coordinate ──────────────────────────────────────────────────────────────

/// A validated WGS84 point.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
  pub latitude:  f64,
  pub longitude: f64,
}

impl Coordinate {
  pub fn new(latitude: f64, longitude: f64) -> Result<Self> {
    if !latitude.is_finite() || !(-90.0..=90.0).contains(&latitude) {
      return Err(Error::InvalidCoordinate(format!(
        "latitude {latitude} outside [-90, 90]"
      )));
    }
    if !longitude.is_finite() || !(-180.0..=180.0).contains(&longitude) {
      return Err(Error::InvalidCoordinate(format!(
        "longitude {longitude} outside [-180, 180]"
      )));
    }
    Ok(Self { latitude, longitude })
  }

  /// Great-circle distance in kilometres.
  pub fn haversine_km(&self, other: &Coordinate) -> f64 {
    let (lat1, lat2) = (self.latitude.to_radians(), other.latitude.to_radians());
    let d_lat = lat2 - lat1;
    let d_lon = (other.longitude - self.longitude).to_radians();

    let a = (d_lat / 2.0).sin().powi(2)
      + lat1.cos() * lat2.cos() * (d_lon / 2.0).sin().powi(2);
    2.0 * EARTH_RADIUS_KM * a.sqrt().min(1.0).asin()
  }
}

// ─── Report ──────────────────────────────────────────────────────────────────

/// A location report as sent by a rider or driver.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LocationReport {
  pub latitude:  f64,
  pub longitude: f64,
  #[serde(default)]
  pub landmark:  Option<String>,
}

impl LocationReport {
  /// Validate the reported point.
  pub fn coordinate(&self) -> Result<Coordinate> {
    Coordinate::new(self.latitude, self.longitude)
  }
}

// ─── Stored location ─────────────────────────────────────────────────────────

/// The latest known location of a party.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Location {
  pub owner_id:   Uuid,
  pub kind:       PartyKind,
  pub latitude:   f64,
  pub longitude:  f64,
  pub landmark:   Option<String>,
  /// Server-assigned on every overwrite.
  pub updated_at: DateTime<Utc>,
}

impl Location {
  pub fn coordinate(&self) -> Coordinate {
    Coordinate { latitude: self.latitude, longitude: self.longitude }
  }
}

/// A location view with nullable fields, for parties that may never have
/// reported one.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LocationSnapshot {
  pub latitude:   Option<f64>,
  pub longitude:  Option<f64>,
  pub landmark:   Option<String>,
  pub updated_at: Option<DateTime<Utc>>,
}

impl From<Option<&Location>> for LocationSnapshot {
  fn from(location: Option<&Location>) -> Self {
    match location {
      Some(l) => Self {
        latitude:   Some(l.latitude),
        longitude:  Some(l.longitude),
        landmark:   l.landmark.clone(),
        updated_at: Some(l.updated_at),
      },
      None => Self::default(),
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn coordinate_rejects_out_of_range() {
    assert!(Coordinate::new(91.0, 0.0).is_err());
    assert!(Coordinate::new(0.0, -180.5).is_err());
    assert!(Coordinate::new(f64::NAN, 0.0).is_err());
    assert!(Coordinate::new(-90.0, 180.0).is_ok());
  }

  #[test]
  fn haversine_known_distance() {
    // Bengaluru → Chennai is roughly 290 km as the crow flies.
    let blr = Coordinate::new(12.9716, 77.5946).unwrap();
    let maa = Coordinate::new(13.0827, 80.2707).unwrap();
    let d = blr.haversine_km(&maa);
    assert!((280.0..300.0).contains(&d), "distance: {d}");
    assert_eq!(blr.haversine_km(&blr), 0.0);
  }

  #[test]
  fn snapshot_of_missing_location_is_all_null() {
    let snap = LocationSnapshot::from(None);
    assert_eq!(snap, LocationSnapshot::default());
    let json = serde_json::to_value(&snap).unwrap();
    assert!(json["latitude"].is_null());
  }
}
