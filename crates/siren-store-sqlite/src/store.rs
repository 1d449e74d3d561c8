//! [`SqliteStore`]: the SQLite implementation of [`DispatchStore`].

use std::path::Path;

use chrono::Utc;
use rusqlite::OptionalExtension as _;
use tracing::debug;
use uuid::Uuid;

use siren_core::{
  assignment::{Assignment, AssignmentStatus},
  location::{Location, LocationReport},
  media::{MediaArtifact, MediaSession, NewArtifact},
  party::{Driver, NewDriver, NewRider, PartyKind, Rider},
  store::{Candidate, DispatchStore},
};

use crate::{
  Error, Result,
  encode::{
    ARTIFACT_COLUMNS, ASSIGNMENT_COLUMNS, DRIVER_COLUMNS, LOCATION_COLUMNS, RIDER_COLUMNS,
    RawArtifact, RawAssignment, RawCandidate, RawDriver, RawLocation, RawRider, RawSession,
    SESSION_COLUMNS, encode_dt, encode_uuid,
  },
  schema::SCHEMA,
};

// ─── Store ───────────────────────────────────────────────────────────────────

/// A Siren dispatch store backed by a single SQLite file.
///
/// Cloning is cheap; the inner connection is reference-counted.
#[derive(Clone)]
pub struct SqliteStore {
  conn: tokio_rusqlite::Connection,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  /// Open an in-memory store.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  async fn query_rider(&self, column: &'static str, value: String) -> Result<Option<Rider>> {
    let raw: Option<RawRider> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              &format!("SELECT {RIDER_COLUMNS} FROM riders WHERE {column} = ?1"),
              rusqlite::params![value],
              RawRider::from_row,
            )
            .optional()?,
        )
      })
      .await?;

    raw.map(RawRider::into_rider).transpose()
  }

  async fn query_driver(&self, column: &'static str, value: String) -> Result<Option<Driver>> {
    let raw: Option<RawDriver> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              &format!("SELECT {DRIVER_COLUMNS} FROM drivers WHERE {column} = ?1"),
              rusqlite::params![value],
              RawDriver::from_row,
            )
            .optional()?,
        )
      })
      .await?;

    raw.map(RawDriver::into_driver).transpose()
  }

  async fn query_assignment(
    &self,
    column: &'static str,
    value: String,
    open_only: bool,
  ) -> Result<Option<Assignment>> {
    let raw: Option<RawAssignment> = self
      .conn
      .call(move |conn| {
        let filter = if open_only {
          " AND status IN ('pending', 'accepted')"
        } else {
          ""
        };
        Ok(
          conn
            .query_row(
              &format!(
                "SELECT {ASSIGNMENT_COLUMNS} FROM assignments WHERE {column} = ?1{filter}"
              ),
              rusqlite::params![value],
              RawAssignment::from_row,
            )
            .optional()?,
        )
      })
      .await?;

    raw.map(RawAssignment::into_assignment).transpose()
  }
}

// ─── DispatchStore impl ──────────────────────────────────────────────────────

impl DispatchStore for SqliteStore {
  type Error = Error;

  // ── Riders ────────────────────────────────────────────────────────────────

  async fn add_rider(&self, input: NewRider) -> Result<Rider> {
    let rider = Rider {
      rider_id:   Uuid::new_v4(),
      first_name: input.first_name,
      last_name:  input.last_name,
      mobile:     input.mobile,
      created_at: Utc::now(),
    };

    let id_str     = encode_uuid(rider.rider_id);
    let first_name = rider.first_name.clone();
    let last_name  = rider.last_name.clone();
    let mobile     = rider.mobile.clone();
    let at_str     = encode_dt(rider.created_at);

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO riders (rider_id, first_name, last_name, mobile, created_at)
           VALUES (?1, ?2, ?3, ?4, ?5)",
          rusqlite::params![id_str, first_name, last_name, mobile, at_str],
        )?;
        Ok(())
      })
      .await?;

    debug!(rider_id = %rider.rider_id, "rider registered");
    Ok(rider)
  }

  async fn get_rider(&self, id: Uuid) -> Result<Option<Rider>> {
    self.query_rider("rider_id", encode_uuid(id)).await
  }

  async fn find_rider_by_mobile<'a>(&'a self, mobile: &'a str) -> Result<Option<Rider>> {
    self.query_rider("mobile", mobile.to_owned()).await
  }

  // ── Drivers ───────────────────────────────────────────────────────────────

  async fn add_driver(&self, input: NewDriver) -> Result<Driver> {
    let driver = Driver {
      driver_id:      Uuid::new_v4(),
      first_name:     input.first_name,
      last_name:      input.last_name,
      mobile:         input.mobile,
      vehicle_number: input.vehicle_number,
      available:      false,
      created_at:     Utc::now(),
    };

    let id_str     = encode_uuid(driver.driver_id);
    let first_name = driver.first_name.clone();
    let last_name  = driver.last_name.clone();
    let mobile     = driver.mobile.clone();
    let vehicle    = driver.vehicle_number.clone();
    let at_str     = encode_dt(driver.created_at);

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO drivers (
             driver_id, first_name, last_name, mobile, vehicle_number, available, created_at
           ) VALUES (?1, ?2, ?3, ?4, ?5, 0, ?6)",
          rusqlite::params![id_str, first_name, last_name, mobile, vehicle, at_str],
        )?;
        Ok(())
      })
      .await?;

    debug!(driver_id = %driver.driver_id, "driver registered");
    Ok(driver)
  }

  async fn get_driver(&self, id: Uuid) -> Result<Option<Driver>> {
    self.query_driver("driver_id", encode_uuid(id)).await
  }

  async fn find_driver_by_mobile<'a>(&'a self, mobile: &'a str) -> Result<Option<Driver>> {
    self.query_driver("mobile", mobile.to_owned()).await
  }

  async fn set_driver_availability(&self, id: Uuid, available: bool) -> Result<Option<Driver>> {
    let id_str = encode_uuid(id);

    let raw: Option<RawDriver> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              &format!(
                "UPDATE drivers SET available = ?2 WHERE driver_id = ?1
                 RETURNING {DRIVER_COLUMNS}"
              ),
              rusqlite::params![id_str, available],
              RawDriver::from_row,
            )
            .optional()?,
        )
      })
      .await?;

    raw.map(RawDriver::into_driver).transpose()
  }

  async fn list_available_drivers(&self) -> Result<Vec<Candidate>> {
    let raws: Vec<RawCandidate> = self
      .conn
      .call(|conn| {
        // rowid order is registration order, which fixes the tie-break.
        let mut stmt = conn.prepare(
          "SELECT
             d.driver_id, d.first_name, d.last_name, d.mobile,
             d.vehicle_number, d.available, d.created_at,
             l.latitude, l.longitude, l.landmark, l.updated_at
           FROM drivers d
           LEFT JOIN locations l
             ON l.owner_kind = 'driver' AND l.owner_id = d.driver_id
           WHERE d.available = 1
           ORDER BY d.rowid",
        )?;

        let rows = stmt
          .query_map([], |row| {
            Ok(RawCandidate {
              driver:     RawDriver::from_row_at(row, 0)?,
              latitude:   row.get(7)?,
              longitude:  row.get(8)?,
              landmark:   row.get(9)?,
              updated_at: row.get(10)?,
            })
          })?
          .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawCandidate::into_candidate).collect()
  }

  // ── Locations ─────────────────────────────────────────────────────────────

  async fn put_location(
    &self,
    kind: PartyKind,
    owner_id: Uuid,
    report: LocationReport,
  ) -> Result<Location> {
    let location = Location {
      owner_id,
      kind,
      latitude: report.latitude,
      longitude: report.longitude,
      landmark: report.landmark,
      updated_at: Utc::now(),
    };

    let kind_str = kind.as_str();
    let id_str   = encode_uuid(owner_id);
    let (lat, lon) = (location.latitude, location.longitude);
    let landmark = location.landmark.clone();
    let at_str   = encode_dt(location.updated_at);

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO locations (owner_kind, owner_id, latitude, longitude, landmark, updated_at)
           VALUES (?1, ?2, ?3, ?4, ?5, ?6)
           ON CONFLICT (owner_kind, owner_id) DO UPDATE SET
             latitude   = excluded.latitude,
             longitude  = excluded.longitude,
             landmark   = excluded.landmark,
             updated_at = excluded.updated_at",
          rusqlite::params![kind_str, id_str, lat, lon, landmark, at_str],
        )?;
        Ok(())
      })
      .await?;

    Ok(location)
  }

  async fn get_location(&self, kind: PartyKind, owner_id: Uuid) -> Result<Option<Location>> {
    let kind_str = kind.as_str();
    let id_str = encode_uuid(owner_id);

    let raw: Option<RawLocation> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              &format!(
                "SELECT {LOCATION_COLUMNS} FROM locations
                 WHERE owner_kind = ?1 AND owner_id = ?2"
              ),
              rusqlite::params![kind_str, id_str],
              RawLocation::from_row,
            )
            .optional()?,
        )
      })
      .await?;

    raw.map(RawLocation::into_location).transpose()
  }

  // ── Assignments ───────────────────────────────────────────────────────────

  async fn upsert_assignment_for_rider(&self, rider_id: Uuid, driver_id: Uuid) -> Result<Assignment> {
    let new_id_str = encode_uuid(Uuid::new_v4());
    let rider_str  = encode_uuid(rider_id);
    let driver_str = encode_uuid(driver_id);
    let at_str     = encode_dt(Utc::now());

    // One statement: concurrent dispatches for a rider serialize on the
    // rider_id UNIQUE key and the last writer's driver wins.
    let raw: RawAssignment = self
      .conn
      .call(move |conn| {
        Ok(conn.query_row(
          &format!(
            "INSERT INTO assignments (
               assignment_id, rider_id, driver_id, status, assigned_at, responded_at
             ) VALUES (?1, ?2, ?3, 'pending', ?4, NULL)
             ON CONFLICT (rider_id) DO UPDATE SET
               driver_id    = excluded.driver_id,
               status       = 'pending',
               assigned_at  = excluded.assigned_at,
               responded_at = NULL
             RETURNING {ASSIGNMENT_COLUMNS}"
          ),
          rusqlite::params![new_id_str, rider_str, driver_str, at_str],
          RawAssignment::from_row,
        )?)
      })
      .await?;

    raw.into_assignment()
  }

  async fn get_assignment(&self, id: Uuid) -> Result<Option<Assignment>> {
    self.query_assignment("assignment_id", encode_uuid(id), false).await
  }

  async fn get_assignment_for_rider(&self, rider_id: Uuid) -> Result<Option<Assignment>> {
    self.query_assignment("rider_id", encode_uuid(rider_id), false).await
  }

  async fn get_open_assignment_for_rider(&self, rider_id: Uuid) -> Result<Option<Assignment>> {
    self.query_assignment("rider_id", encode_uuid(rider_id), true).await
  }

  async fn transition_assignment(
    &self,
    id: Uuid,
    driver_id: Uuid,
    expected: AssignmentStatus,
    next: AssignmentStatus,
  ) -> Result<Option<Assignment>> {
    let id_str       = encode_uuid(id);
    let driver_str   = encode_uuid(driver_id);
    let expected_str = expected.as_str();
    let next_str     = next.as_str();
    let at_str       = encode_dt(Utc::now());

    let raw: Option<RawAssignment> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              &format!(
                "UPDATE assignments SET status = ?4, responded_at = ?5
                 WHERE assignment_id = ?1 AND driver_id = ?2 AND status = ?3
                 RETURNING {ASSIGNMENT_COLUMNS}"
              ),
              rusqlite::params![id_str, driver_str, expected_str, next_str, at_str],
              RawAssignment::from_row,
            )
            .optional()?,
        )
      })
      .await?;

    raw.map(RawAssignment::into_assignment).transpose()
  }

  // ── Media ─────────────────────────────────────────────────────────────────

  async fn media_session_for_rider(&self, rider_id: Uuid) -> Result<MediaSession> {
    let new_id_str = encode_uuid(Uuid::new_v4());
    let rider_str  = encode_uuid(rider_id);
    let at_str     = encode_dt(Utc::now());

    let raw: RawSession = self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO media_sessions (media_session_id, rider_id, contact_mobile, created_at)
           VALUES (?1, ?2, NULL, ?3)
           ON CONFLICT (rider_id) DO NOTHING",
          rusqlite::params![new_id_str, rider_str, at_str],
        )?;
        Ok(conn.query_row(
          &format!("SELECT {SESSION_COLUMNS} FROM media_sessions WHERE rider_id = ?1"),
          rusqlite::params![rider_str],
          RawSession::from_row,
        )?)
      })
      .await?;

    raw.into_session()
  }

  async fn set_media_contact(&self, rider_id: Uuid, mobile: String) -> Result<MediaSession> {
    let new_id_str = encode_uuid(Uuid::new_v4());
    let rider_str  = encode_uuid(rider_id);
    let at_str     = encode_dt(Utc::now());

    let raw: RawSession = self
      .conn
      .call(move |conn| {
        Ok(conn.query_row(
          &format!(
            "INSERT INTO media_sessions (media_session_id, rider_id, contact_mobile, created_at)
             VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT (rider_id) DO UPDATE SET contact_mobile = excluded.contact_mobile
             RETURNING {SESSION_COLUMNS}"
          ),
          rusqlite::params![new_id_str, rider_str, mobile, at_str],
          RawSession::from_row,
        )?)
      })
      .await?;

    raw.into_session()
  }

  async fn record_artifact(&self, input: NewArtifact) -> Result<MediaArtifact> {
    let artifact = MediaArtifact {
      artifact_id:      Uuid::new_v4(),
      media_session_id: input.media_session_id,
      kind:             input.kind,
      file_name:        input.file_name,
      media_type:       input.media_type,
      content_hash:     input.content_hash,
      byte_len:         input.byte_len,
      recorded_at:      Utc::now(),
    };

    let id_str      = encode_uuid(artifact.artifact_id);
    let session_str = encode_uuid(artifact.media_session_id);
    let kind_str    = artifact.kind.as_str();
    let file_name   = artifact.file_name.clone();
    let media_type  = artifact.media_type.clone();
    let hash        = artifact.content_hash.clone();
    let byte_len    = i64::try_from(artifact.byte_len)
      .map_err(|_| Error::Decode(format!("artifact too large: {} bytes", artifact.byte_len)))?;
    let at_str      = encode_dt(artifact.recorded_at);

    self
      .conn
      .call(move |conn| {
        conn.execute(
          &format!("INSERT INTO media_artifacts ({ARTIFACT_COLUMNS})
                    VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)"),
          rusqlite::params![
            id_str,
            session_str,
            kind_str,
            file_name,
            media_type,
            hash,
            byte_len,
            at_str,
          ],
        )?;
        Ok(())
      })
      .await?;

    Ok(artifact)
  }

  async fn list_artifacts(&self, media_session_id: Uuid) -> Result<Vec<MediaArtifact>> {
    let session_str = encode_uuid(media_session_id);

    let raws: Vec<RawArtifact> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&format!(
          "SELECT {ARTIFACT_COLUMNS} FROM media_artifacts
           WHERE media_session_id = ?1
           ORDER BY rowid"
        ))?;
        let rows = stmt
          .query_map(rusqlite::params![session_str], RawArtifact::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawArtifact::into_artifact).collect()
  }
}
