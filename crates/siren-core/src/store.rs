//! The `DispatchStore` trait.
//!
//! The trait is implemented by storage backends (e.g. `siren-store-sqlite`).
//! The dispatch engine, the assignment state machine and the notification
//! dispatcher depend on this abstraction, not on any concrete backend.

use std::future::Future;

use uuid::Uuid;

use crate::{
  assignment::{Assignment, AssignmentStatus},
  location::{Location, LocationReport},
  media::{MediaArtifact, MediaSession, NewArtifact},
  party::{Driver, NewDriver, NewRider, PartyKind, Rider},
};

/// An available driver and their last known location, if any.
#[derive(Debug, Clone)]
pub struct Candidate {
  pub driver:   Driver,
  pub location: Option<Location>,
}

/// Backend errors, with enough classification for callers to tell a
/// uniqueness violation from an outage.
pub trait StoreError: std::error::Error + Send + Sync + 'static {
  /// A write collided with an existing unique value (mobile number, vehicle).
  fn is_conflict(&self) -> bool { false }
}

/// Abstraction over a Siren persistence backend.
///
/// All methods return `Send` futures so the trait can be used in
/// multi-threaded async runtimes (e.g. tokio with `axum`).
pub trait DispatchStore: Send + Sync {
  type Error: StoreError;

  // ── Riders ────────────────────────────────────────────────────────────

  fn add_rider(
    &self,
    input: NewRider,
  ) -> impl Future<Output = Result<Rider, Self::Error>> + Send + '_;

  fn get_rider(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Option<Rider>, Self::Error>> + Send + '_;

  fn find_rider_by_mobile<'a>(
    &'a self,
    mobile: &'a str,
  ) -> impl Future<Output = Result<Option<Rider>, Self::Error>> + Send + 'a;

  // ── Drivers ───────────────────────────────────────────────────────────

  fn add_driver(
    &self,
    input: NewDriver,
  ) -> impl Future<Output = Result<Driver, Self::Error>> + Send + '_;

  fn get_driver(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Option<Driver>, Self::Error>> + Send + '_;

  fn find_driver_by_mobile<'a>(
    &'a self,
    mobile: &'a str,
  ) -> impl Future<Output = Result<Option<Driver>, Self::Error>> + Send + 'a;

  /// Returns `None` if the driver does not exist.
  fn set_driver_availability(
    &self,
    id: Uuid,
    available: bool,
  ) -> impl Future<Output = Result<Option<Driver>, Self::Error>> + Send + '_;

  /// Every driver with `available = true`, each with its location if one
  /// has been reported. The order is stable for identical store contents.
  fn list_available_drivers(
    &self,
  ) -> impl Future<Output = Result<Vec<Candidate>, Self::Error>> + Send + '_;

  // ── Locations ─────────────────────────────────────────────────────────

  /// Replace the owner's location; `updated_at` is set by the store.
  fn put_location(
    &self,
    kind: PartyKind,
    owner_id: Uuid,
    report: LocationReport,
  ) -> impl Future<Output = Result<Location, Self::Error>> + Send + '_;

  fn get_location(
    &self,
    kind: PartyKind,
    owner_id: Uuid,
  ) -> impl Future<Output = Result<Option<Location>, Self::Error>> + Send + '_;

  // ── Assignments ───────────────────────────────────────────────────────

  /// Atomically insert the rider's assignment, or overwrite the existing
  /// row's driver, reset it to `pending` and refresh `assigned_at`. The
  /// assignment id survives the overwrite.
  fn upsert_assignment_for_rider(
    &self,
    rider_id: Uuid,
    driver_id: Uuid,
  ) -> impl Future<Output = Result<Assignment, Self::Error>> + Send + '_;

  fn get_assignment(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Option<Assignment>, Self::Error>> + Send + '_;

  /// The rider's assignment regardless of status.
  fn get_assignment_for_rider(
    &self,
    rider_id: Uuid,
  ) -> impl Future<Output = Result<Option<Assignment>, Self::Error>> + Send + '_;

  /// The rider's assignment if it is still open (`pending` or `accepted`).
  fn get_open_assignment_for_rider(
    &self,
    rider_id: Uuid,
  ) -> impl Future<Output = Result<Option<Assignment>, Self::Error>> + Send + '_;

  /// Compare-and-set on status: applies `next` and stamps `responded_at` only
  /// if the row still belongs to `driver_id` and is in `expected`. Returns the
  /// updated row, or `None` if the precondition did not hold.
  fn transition_assignment(
    &self,
    id: Uuid,
    driver_id: Uuid,
    expected: AssignmentStatus,
    next: AssignmentStatus,
  ) -> impl Future<Output = Result<Option<Assignment>, Self::Error>> + Send + '_;

  // ── Media ─────────────────────────────────────────────────────────────

  /// Get the rider's media session, creating it on first use.
  fn media_session_for_rider(
    &self,
    rider_id: Uuid,
  ) -> impl Future<Output = Result<MediaSession, Self::Error>> + Send + '_;

  fn set_media_contact(
    &self,
    rider_id: Uuid,
    mobile: String,
  ) -> impl Future<Output = Result<MediaSession, Self::Error>> + Send + '_;

  fn record_artifact(
    &self,
    input: NewArtifact,
  ) -> impl Future<Output = Result<MediaArtifact, Self::Error>> + Send + '_;

  /// Artifacts in a session, oldest first.
  fn list_artifacts(
    &self,
    media_session_id: Uuid,
  ) -> impl Future<Output = Result<Vec<MediaArtifact>, Self::Error>> + Send + '_;
}
