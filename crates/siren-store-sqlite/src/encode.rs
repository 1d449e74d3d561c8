//! Encoding and decoding helpers between Rust domain types and the plain-text
//! representations stored in SQLite columns.
//!
//! All timestamps are stored as RFC 3339 strings and UUIDs as hyphenated
//! lowercase strings. Enums use their wire literals.

use chrono::{DateTime, Utc};
use siren_core::{
  assignment::{Assignment, AssignmentStatus},
  location::Location,
  media::{MediaArtifact, MediaKind, MediaSession},
  party::{Driver, PartyKind, Rider},
  store::Candidate,
};
use uuid::Uuid;

use crate::{Error, Result};

// ─── Scalars ─────────────────────────────────────────────────────────────────

pub fn encode_uuid(id: Uuid) -> String { id.hyphenated().to_string() }

pub fn decode_uuid(s: &str) -> Result<Uuid> { Ok(Uuid::parse_str(s)?) }

pub fn encode_dt(dt: DateTime<Utc>) -> String { dt.to_rfc3339() }

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::DateParse(e.to_string()))
}

pub fn decode_party_kind(s: &str) -> Result<PartyKind> {
  match s {
    "rider" => Ok(PartyKind::Rider),
    "driver" => Ok(PartyKind::Driver),
    other => Err(Error::Decode(format!("unknown party kind: {other:?}"))),
  }
}

pub fn decode_media_kind(s: &str) -> Result<MediaKind> {
  match s {
    "image" => Ok(MediaKind::Image),
    "audio" => Ok(MediaKind::Audio),
    other => Err(Error::Decode(format!("unknown media kind: {other:?}"))),
  }
}

// ─── Column lists ────────────────────────────────────────────────────────────

pub const RIDER_COLUMNS: &str = "rider_id, first_name, last_name, mobile, created_at";

pub const DRIVER_COLUMNS: &str =
  "driver_id, first_name, last_name, mobile, vehicle_number, available, created_at";

pub const LOCATION_COLUMNS: &str =
  "owner_kind, owner_id, latitude, longitude, landmark, updated_at";

pub const ASSIGNMENT_COLUMNS: &str =
  "assignment_id, rider_id, driver_id, status, assigned_at, responded_at";

pub const SESSION_COLUMNS: &str = "media_session_id, rider_id, contact_mobile, created_at";

pub const ARTIFACT_COLUMNS: &str = "artifact_id, media_session_id, kind, file_name, \
                                    media_type, content_hash, byte_len, recorded_at";

// ─── Row types ───────────────────────────────────────────────────────────────

/// Raw values read directly from a `riders` row.
pub struct RawRider {
  pub rider_id:   String,
  pub first_name: String,
  pub last_name:  String,
  pub mobile:     String,
  pub created_at: String,
}

impl RawRider {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      rider_id:   row.get(0)?,
      first_name: row.get(1)?,
      last_name:  row.get(2)?,
      mobile:     row.get(3)?,
      created_at: row.get(4)?,
    })
  }

  pub fn into_rider(self) -> Result<Rider> {
    Ok(Rider {
      rider_id:   decode_uuid(&self.rider_id)?,
      first_name: self.first_name,
      last_name:  self.last_name,
      mobile:     self.mobile,
      created_at: decode_dt(&self.created_at)?,
    })
  }
}

/// Raw values read from a `drivers` row.
pub struct RawDriver {
  pub driver_id:      String,
  pub first_name:     String,
  pub last_name:      String,
  pub mobile:         String,
  pub vehicle_number: String,
  pub available:      bool,
  pub created_at:     String,
}

impl RawDriver {
  /// Reads the seven [`DRIVER_COLUMNS`] starting at `offset`.
  pub fn from_row_at(row: &rusqlite::Row<'_>, offset: usize) -> rusqlite::Result<Self> {
    Ok(Self {
      driver_id:      row.get(offset)?,
      first_name:     row.get(offset + 1)?,
      last_name:      row.get(offset + 2)?,
      mobile:         row.get(offset + 3)?,
      vehicle_number: row.get(offset + 4)?,
      available:      row.get(offset + 5)?,
      created_at:     row.get(offset + 6)?,
    })
  }

  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Self::from_row_at(row, 0)
  }

  pub fn into_driver(self) -> Result<Driver> {
    Ok(Driver {
      driver_id:      decode_uuid(&self.driver_id)?,
      first_name:     self.first_name,
      last_name:      self.last_name,
      mobile:         self.mobile,
      vehicle_number: self.vehicle_number,
      available:      self.available,
      created_at:     decode_dt(&self.created_at)?,
    })
  }
}

/// Raw values read from a `locations` row.
pub struct RawLocation {
  pub owner_kind: String,
  pub owner_id:   String,
  pub latitude:   f64,
  pub longitude:  f64,
  pub landmark:   Option<String>,
  pub updated_at: String,
}

impl RawLocation {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      owner_kind: row.get(0)?,
      owner_id:   row.get(1)?,
      latitude:   row.get(2)?,
      longitude:  row.get(3)?,
      landmark:   row.get(4)?,
      updated_at: row.get(5)?,
    })
  }

  pub fn into_location(self) -> Result<Location> {
    Ok(Location {
      owner_id:   decode_uuid(&self.owner_id)?,
      kind:       decode_party_kind(&self.owner_kind)?,
      latitude:   self.latitude,
      longitude:  self.longitude,
      landmark:   self.landmark,
      updated_at: decode_dt(&self.updated_at)?,
    })
  }
}

/// A driver row left-joined with its location.
pub struct RawCandidate {
  pub driver:     RawDriver,
  pub latitude:   Option<f64>,
  pub longitude:  Option<f64>,
  pub landmark:   Option<String>,
  pub updated_at: Option<String>,
}

impl RawCandidate {
  pub fn into_candidate(self) -> Result<Candidate> {
    let driver = self.driver.into_driver()?;
    let location = match (self.latitude, self.longitude, self.updated_at) {
      (Some(latitude), Some(longitude), Some(updated_at)) => Some(Location {
        owner_id: driver.driver_id,
        kind: PartyKind::Driver,
        latitude,
        longitude,
        landmark: self.landmark,
        updated_at: decode_dt(&updated_at)?,
      }),
      _ => None,
    };
    Ok(Candidate { driver, location })
  }
}

/// Raw values read from an `assignments` row.
pub struct RawAssignment {
  pub assignment_id: String,
  pub rider_id:      String,
  pub driver_id:     String,
  pub status:        String,
  pub assigned_at:   String,
  pub responded_at:  Option<String>,
}

impl RawAssignment {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      assignment_id: row.get(0)?,
      rider_id:      row.get(1)?,
      driver_id:     row.get(2)?,
      status:        row.get(3)?,
      assigned_at:   row.get(4)?,
      responded_at:  row.get(5)?,
    })
  }

  pub fn into_assignment(self) -> Result<Assignment> {
    Ok(Assignment {
      assignment_id: decode_uuid(&self.assignment_id)?,
      rider_id:      decode_uuid(&self.rider_id)?,
      driver_id:     decode_uuid(&self.driver_id)?,
      status:        self.status.parse::<AssignmentStatus>()?,
      assigned_at:   decode_dt(&self.assigned_at)?,
      responded_at:  self.responded_at.as_deref().map(decode_dt).transpose()?,
    })
  }
}

/// Raw values read from a `media_sessions` row.
pub struct RawSession {
  pub media_session_id: String,
  pub rider_id:         String,
  pub contact_mobile:   Option<String>,
  pub created_at:       String,
}

impl RawSession {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      media_session_id: row.get(0)?,
      rider_id:         row.get(1)?,
      contact_mobile:   row.get(2)?,
      created_at:       row.get(3)?,
    })
  }

  pub fn into_session(self) -> Result<MediaSession> {
    Ok(MediaSession {
      media_session_id: decode_uuid(&self.media_session_id)?,
      rider_id:         decode_uuid(&self.rider_id)?,
      contact_mobile:   self.contact_mobile,
      created_at:       decode_dt(&self.created_at)?,
    })
  }
}

/// Raw values read from a `media_artifacts` row.
pub struct RawArtifact {
  pub artifact_id:      String,
  pub media_session_id: String,
  pub kind:             String,
  pub file_name:        String,
  pub media_type:       String,
  pub content_hash:     String,
  pub byte_len:         i64,
  pub recorded_at:      String,
}

impl RawArtifact {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      artifact_id:      row.get(0)?,
      media_session_id: row.get(1)?,
      kind:             row.get(2)?,
      file_name:        row.get(3)?,
      media_type:       row.get(4)?,
      content_hash:     row.get(5)?,
      byte_len:         row.get(6)?,
      recorded_at:      row.get(7)?,
    })
  }

  pub fn into_artifact(self) -> Result<MediaArtifact> {
    Ok(MediaArtifact {
      artifact_id:      decode_uuid(&self.artifact_id)?,
      media_session_id: decode_uuid(&self.media_session_id)?,
      kind:             decode_media_kind(&self.kind)?,
      file_name:        self.file_name,
      media_type:       self.media_type,
      content_hash:     self.content_hash,
      byte_len:         u64::try_from(self.byte_len)
        .map_err(|_| Error::Decode(format!("negative byte length {}", self.byte_len)))?,
      recorded_at:      decode_dt(&self.recorded_at)?,
    })
  }
}
