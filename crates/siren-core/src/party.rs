//! Riders and drivers, the two kinds of party the service tracks.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Which side of a dispatch a party is on. Doubles as the token role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PartyKind {
  Rider,
  Driver,
}

impl PartyKind {
  pub fn as_str(self) -> &'static str {
    match self {
      Self::Rider => "rider",
      Self::Driver => "driver",
    }
  }
}

impl fmt::Display for PartyKind {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

// ─── Rider ───────────────────────────────────────────────────────────────────

/// A requesting party. Immutable once registered.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Rider {
  pub rider_id:   Uuid,
  pub first_name: String,
  pub last_name:  String,
  pub mobile:     String,
  pub created_at: DateTime<Utc>,
}

impl Rider {
  pub fn profile(&self) -> RiderProfile {
    RiderProfile {
      rider_id:   self.rider_id,
      first_name: self.first_name.clone(),
      last_name:  self.last_name.clone(),
      mobile:     self.mobile.clone(),
    }
  }
}

/// Input to [`crate::store::DispatchStore::add_rider`].
#[derive(Debug, Clone, Deserialize)]
pub struct NewRider {
  pub first_name: String,
  pub last_name:  String,
  pub mobile:     String,
}

/// The rider fields disclosed to a driver.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RiderProfile {
  pub rider_id:   Uuid,
  pub first_name: String,
  pub last_name:  String,
  pub mobile:     String,
}

// ─── Driver ──────────────────────────────────────────────────────────────────

/// A responder. `available` is the dispatch filter predicate.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Driver {
  pub driver_id:      Uuid,
  pub first_name:     String,
  pub last_name:      String,
  pub mobile:         String,
  pub vehicle_number: String,
  pub available:      bool,
  pub created_at:     DateTime<Utc>,
}

impl Driver {
  pub fn profile(&self) -> DriverProfile {
    DriverProfile {
      driver_id:      self.driver_id,
      first_name:     self.first_name.clone(),
      last_name:      self.last_name.clone(),
      mobile:         self.mobile.clone(),
      vehicle_number: self.vehicle_number.clone(),
    }
  }
}

/// Input to [`crate::store::DispatchStore::add_driver`]. New drivers start
/// unavailable.
#[derive(Debug, Clone, Deserialize)]
pub struct NewDriver {
  pub first_name:     String,
  pub last_name:      String,
  pub mobile:         String,
  pub vehicle_number: String,
}

/// The driver fields disclosed to a rider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DriverProfile {
  pub driver_id:      Uuid,
  pub first_name:     String,
  pub last_name:      String,
  pub mobile:         String,
  pub vehicle_number: String,
}
