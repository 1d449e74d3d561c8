//! Error types for `siren-core`.
//!
//! Dispatch and response failures each get their own variant so callers can
//! tell "try again later" apart from "someone already answered this".

use thiserror::Error;
use uuid::Uuid;

use crate::party::PartyKind;

/// A boxed backend error (store, oracle, vault).
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

#[derive(Debug, Error)]
pub enum Error {
  // ── Dispatch ────────────────────────────────────────────────────────────
  #[error("no drivers are currently available")]
  NoDriversAvailable,

  #[error("no available driver has a known location")]
  NoDriverLocationAvailable,

  #[error("failed to persist assignment: {0}")]
  AssignmentPersistence(#[source] BoxError),

  // ── Assignment responses ────────────────────────────────────────────────
  #[error("assignment not found: {0}")]
  AssignmentNotFound(Uuid),

  #[error("assignment {0} is held by another driver")]
  Forbidden(Uuid),

  #[error("assignment {0} has already been responded to")]
  AlreadyResponded(Uuid),

  // ── Parties ─────────────────────────────────────────────────────────────
  #[error("rider not found: {0}")]
  RiderNotFound(Uuid),

  #[error("driver not found: {0}")]
  DriverNotFound(Uuid),

  // ── Credentials ─────────────────────────────────────────────────────────
  #[error("credential expired")]
  CredentialExpired,

  #[error("credential invalid")]
  CredentialInvalid,

  #[error("credential belongs to a {actual}, expected a {expected}")]
  WrongRole {
    expected: PartyKind,
    actual:   PartyKind,
  },

  // ── Input and encoding ──────────────────────────────────────────────────
  #[error("invalid coordinate: {0}")]
  InvalidCoordinate(String),

  #[error("unknown assignment status: {0:?}")]
  UnknownStatus(String),

  #[error("invalid configuration: {0}")]
  Config(String),

  #[error("serialization error: {0}")]
  Serialization(#[from] serde_json::Error),

  #[error("store error: {0}")]
  Store(#[source] BoxError),
}

impl Error {
  /// Wrap any backend error as [`Error::Store`].
  pub fn store(e: impl std::error::Error + Send + Sync + 'static) -> Self {
    Self::Store(Box::new(e))
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
