//! In-memory stand-ins for the backend traits, used by this crate's tests.

use std::{
  collections::HashMap,
  future,
  sync::{
    Arc,
    atomic::{AtomicUsize, Ordering},
  },
  time::Duration,
};

use chrono::Utc;
use thiserror::Error;
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::{
  assignment::{Assignment, AssignmentStatus},
  eta::EtaOracle,
  location::{Coordinate, Location, LocationReport},
  media::{MediaArtifact, MediaSession, MediaVault, NewArtifact},
  notify::{NotificationJob, Notifier},
  party::{Driver, NewDriver, NewRider, PartyKind, Rider},
  store::{Candidate, DispatchStore, StoreError},
};

#[derive(Debug, Error)]
pub enum FakeError {
  #[error("injected failure")]
  Injected,
  #[error("duplicate mobile")]
  Duplicate,
  #[error("no bytes for artifact {0}")]
  Missing(Uuid),
  #[error("oracle refused")]
  Refused,
}

impl StoreError for FakeError {
  fn is_conflict(&self) -> bool { matches!(self, Self::Duplicate) }
}

// ─── Store ───────────────────────────────────────────────────────────────────

#[derive(Default)]
struct State {
  riders:           Vec<Rider>,
  drivers:          Vec<Driver>,
  locations:        HashMap<(PartyKind, Uuid), Location>,
  assignments:      Vec<Assignment>,
  sessions:         Vec<MediaSession>,
  artifacts:        Vec<MediaArtifact>,
  fail_assignments: bool,
}

/// Every method takes the single state lock, so each call is atomic.
#[derive(Default)]
pub struct MemoryStore {
  state: Mutex<State>,
}

impl MemoryStore {
  pub async fn assignment_count(&self) -> usize { self.state.lock().await.assignments.len() }

  pub async fn fail_assignment_writes(&self, fail: bool) {
    self.state.lock().await.fail_assignments = fail;
  }
}

fn session_for(state: &mut State, rider_id: Uuid) -> &mut MediaSession {
  let idx = match state.sessions.iter().position(|s| s.rider_id == rider_id) {
    Some(idx) => idx,
    None => {
      state.sessions.push(MediaSession {
        media_session_id: Uuid::new_v4(),
        rider_id,
        contact_mobile: None,
        created_at: Utc::now(),
      });
      state.sessions.len() - 1
    }
  };
  &mut state.sessions[idx]
}

impl DispatchStore for MemoryStore {
  type Error = FakeError;

  async fn add_rider(&self, input: NewRider) -> Result<Rider, FakeError> {
    let mut state = self.state.lock().await;
    if state.riders.iter().any(|r| r.mobile == input.mobile) {
      return Err(FakeError::Duplicate);
    }
    let rider = Rider {
      rider_id:   Uuid::new_v4(),
      first_name: input.first_name,
      last_name:  input.last_name,
      mobile:     input.mobile,
      created_at: Utc::now(),
    };
    state.riders.push(rider.clone());
    Ok(rider)
  }

  async fn get_rider(&self, id: Uuid) -> Result<Option<Rider>, FakeError> {
    let state = self.state.lock().await;
    Ok(state.riders.iter().find(|r| r.rider_id == id).cloned())
  }

  async fn find_rider_by_mobile<'a>(&'a self, mobile: &'a str) -> Result<Option<Rider>, FakeError> {
    let state = self.state.lock().await;
    Ok(state.riders.iter().find(|r| r.mobile == mobile).cloned())
  }

  async fn add_driver(&self, input: NewDriver) -> Result<Driver, FakeError> {
    let mut state = self.state.lock().await;
    if state.drivers.iter().any(|d| d.mobile == input.mobile) {
      return Err(FakeError::Duplicate);
    }
    let driver = Driver {
      driver_id:      Uuid::new_v4(),
      first_name:     input.first_name,
      last_name:      input.last_name,
      mobile:         input.mobile,
      vehicle_number: input.vehicle_number,
      available:      false,
      created_at:     Utc::now(),
    };
    state.drivers.push(driver.clone());
    Ok(driver)
  }

  async fn get_driver(&self, id: Uuid) -> Result<Option<Driver>, FakeError> {
    let state = self.state.lock().await;
    Ok(state.drivers.iter().find(|d| d.driver_id == id).cloned())
  }

  async fn find_driver_by_mobile<'a>(
    &'a self,
    mobile: &'a str,
  ) -> Result<Option<Driver>, FakeError> {
    let state = self.state.lock().await;
    Ok(state.drivers.iter().find(|d| d.mobile == mobile).cloned())
  }

  async fn set_driver_availability(
    &self,
    id: Uuid,
    available: bool,
  ) -> Result<Option<Driver>, FakeError> {
    let mut state = self.state.lock().await;
    Ok(state.drivers.iter_mut().find(|d| d.driver_id == id).map(|d| {
      d.available = available;
      d.clone()
    }))
  }

  async fn list_available_drivers(&self) -> Result<Vec<Candidate>, FakeError> {
    let state = self.state.lock().await;
    Ok(
      state
        .drivers
        .iter()
        .filter(|d| d.available)
        .map(|d| Candidate {
          driver:   d.clone(),
          location: state.locations.get(&(PartyKind::Driver, d.driver_id)).cloned(),
        })
        .collect(),
    )
  }

  async fn put_location(
    &self,
    kind: PartyKind,
    owner_id: Uuid,
    report: LocationReport,
  ) -> Result<Location, FakeError> {
    let location = Location {
      owner_id,
      kind,
      latitude: report.latitude,
      longitude: report.longitude,
      landmark: report.landmark,
      updated_at: Utc::now(),
    };
    self.state.lock().await.locations.insert((kind, owner_id), location.clone());
    Ok(location)
  }

  async fn get_location(
    &self,
    kind: PartyKind,
    owner_id: Uuid,
  ) -> Result<Option<Location>, FakeError> {
    Ok(self.state.lock().await.locations.get(&(kind, owner_id)).cloned())
  }

  async fn upsert_assignment_for_rider(
    &self,
    rider_id: Uuid,
    driver_id: Uuid,
  ) -> Result<Assignment, FakeError> {
    let mut state = self.state.lock().await;
    if state.fail_assignments {
      return Err(FakeError::Injected);
    }
    let now = Utc::now();
    if let Some(row) = state.assignments.iter_mut().find(|a| a.rider_id == rider_id) {
      row.driver_id = driver_id;
      row.status = AssignmentStatus::Pending;
      row.assigned_at = now;
      row.responded_at = None;
      return Ok(row.clone());
    }
    let row = Assignment {
      assignment_id: Uuid::new_v4(),
      rider_id,
      driver_id,
      status: AssignmentStatus::Pending,
      assigned_at: now,
      responded_at: None,
    };
    state.assignments.push(row.clone());
    Ok(row)
  }

  async fn get_assignment(&self, id: Uuid) -> Result<Option<Assignment>, FakeError> {
    let state = self.state.lock().await;
    Ok(state.assignments.iter().find(|a| a.assignment_id == id).cloned())
  }

  async fn get_assignment_for_rider(
    &self,
    rider_id: Uuid,
  ) -> Result<Option<Assignment>, FakeError> {
    let state = self.state.lock().await;
    Ok(state.assignments.iter().find(|a| a.rider_id == rider_id).cloned())
  }

  async fn get_open_assignment_for_rider(
    &self,
    rider_id: Uuid,
  ) -> Result<Option<Assignment>, FakeError> {
    let state = self.state.lock().await;
    Ok(
      state
        .assignments
        .iter()
        .find(|a| a.rider_id == rider_id && a.status.is_open())
        .cloned(),
    )
  }

  async fn transition_assignment(
    &self,
    id: Uuid,
    driver_id: Uuid,
    expected: AssignmentStatus,
    next: AssignmentStatus,
  ) -> Result<Option<Assignment>, FakeError> {
    let mut state = self.state.lock().await;
    Ok(
      state
        .assignments
        .iter_mut()
        .find(|a| a.assignment_id == id && a.driver_id == driver_id && a.status == expected)
        .map(|a| {
          a.status = next;
          a.responded_at = Some(Utc::now());
          a.clone()
        }),
    )
  }

  async fn media_session_for_rider(&self, rider_id: Uuid) -> Result<MediaSession, FakeError> {
    let mut state = self.state.lock().await;
    Ok(session_for(&mut state, rider_id).clone())
  }

  async fn set_media_contact(
    &self,
    rider_id: Uuid,
    mobile: String,
  ) -> Result<MediaSession, FakeError> {
    let mut state = self.state.lock().await;
    let session = session_for(&mut state, rider_id);
    session.contact_mobile = Some(mobile);
    Ok(session.clone())
  }

  async fn record_artifact(&self, input: NewArtifact) -> Result<MediaArtifact, FakeError> {
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
    self.state.lock().await.artifacts.push(artifact.clone());
    Ok(artifact)
  }

  async fn list_artifacts(&self, media_session_id: Uuid) -> Result<Vec<MediaArtifact>, FakeError> {
    let state = self.state.lock().await;
    Ok(
      state
        .artifacts
        .iter()
        .filter(|a| a.media_session_id == media_session_id)
        .cloned()
        .collect(),
    )
  }
}

pub async fn seed_rider(store: &MemoryStore, mobile: &str) -> Rider {
  store
    .add_rider(NewRider {
      first_name: "Asha".into(),
      last_name:  "Rao".into(),
      mobile:     mobile.into(),
    })
    .await
    .unwrap()
}

pub async fn seed_driver(store: &MemoryStore, mobile: &str, available: bool) -> Driver {
  let driver = store
    .add_driver(NewDriver {
      first_name:     "Ravi".into(),
      last_name:      "Kumar".into(),
      mobile:         mobile.into(),
      vehicle_number: format!("KA01-{mobile}"),
    })
    .await
    .unwrap();
  store
    .set_driver_availability(driver.driver_id, available)
    .await
    .unwrap()
    .unwrap()
}

// ─── Vault ───────────────────────────────────────────────────────────────────

#[derive(Default)]
pub struct MemoryVault {
  blobs: Mutex<HashMap<Uuid, Vec<u8>>>,
  reads: AtomicUsize,
}

impl MemoryVault {
  pub async fn insert(&self, artifact: &MediaArtifact, bytes: Vec<u8>) {
    self.blobs.lock().await.insert(artifact.artifact_id, bytes);
  }

  pub async fn reads(&self) -> usize { self.reads.load(Ordering::SeqCst) }
}

impl MediaVault for MemoryVault {
  type Error = FakeError;

  async fn read<'a>(&'a self, artifact: &'a MediaArtifact) -> Result<Vec<u8>, FakeError> {
    self.reads.fetch_add(1, Ordering::SeqCst);
    self
      .blobs
      .lock()
      .await
      .get(&artifact.artifact_id)
      .cloned()
      .ok_or(FakeError::Missing(artifact.artifact_id))
  }
}

// ─── Oracle ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy)]
enum Behaviour {
  Eta(u64),
  Hang,
  Fail,
}

/// Answers by the origin's latitude; origins it has no entry for fail.
#[derive(Default)]
pub struct FakeOracle {
  by_latitude: HashMap<u64, Behaviour>,
}

impl FakeOracle {
  pub fn eta(mut self, latitude: f64, secs: u64) -> Self {
    self.by_latitude.insert(latitude.to_bits(), Behaviour::Eta(secs));
    self
  }

  pub fn hang(mut self, latitude: f64) -> Self {
    self.by_latitude.insert(latitude.to_bits(), Behaviour::Hang);
    self
  }

  pub fn fail(mut self, latitude: f64) -> Self {
    self.by_latitude.insert(latitude.to_bits(), Behaviour::Fail);
    self
  }
}

impl EtaOracle for FakeOracle {
  type Error = FakeError;

  async fn estimate(
    &self,
    origin: Coordinate,
    _destination: Coordinate,
  ) -> Result<Duration, FakeError> {
    let behaviour = self
      .by_latitude
      .get(&origin.latitude.to_bits())
      .copied()
      .unwrap_or(Behaviour::Fail);
    match behaviour {
      Behaviour::Eta(secs) => Ok(Duration::from_secs(secs)),
      Behaviour::Hang => future::pending().await,
      Behaviour::Fail => Err(FakeError::Refused),
    }
  }
}

// ─── Notifier ────────────────────────────────────────────────────────────────

#[derive(Default, Clone)]
pub struct RecordingNotifier {
  jobs: Arc<std::sync::Mutex<Vec<NotificationJob>>>,
}

impl RecordingNotifier {
  pub fn jobs(&self) -> Vec<NotificationJob> { self.jobs.lock().unwrap().clone() }
}

impl Notifier for RecordingNotifier {
  fn notify(&self, job: NotificationJob) { self.jobs.lock().unwrap().push(job); }
}
