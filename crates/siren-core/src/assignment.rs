//! Assignments and their accept/deny lifecycle.
//!
//! A rider has at most one assignment row. Re-dispatching overwrites it and
//! resets it to `pending`. Status only moves forward:
//!
//! ```text
//! pending ──► accepted
//!    └──────► denied
//! ```
//!
//! [`respond`] is the only path that changes status after creation.

use std::{fmt, str::FromStr};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use crate::{
  Error, Result,
  location::LocationSnapshot,
  party::{PartyKind, RiderProfile},
  store::DispatchStore,
};

// ─── Status ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AssignmentStatus {
  Pending,
  Accepted,
  Denied,
}

impl AssignmentStatus {
  /// The literal stored in the database and sent on the wire.
  pub fn as_str(self) -> &'static str {
    match self {
      Self::Pending => "pending",
      Self::Accepted => "accepted",
      Self::Denied => "denied",
    }
  }

  pub fn is_terminal(self) -> bool { !matches!(self, Self::Pending) }

  /// Open assignments still route media to their driver.
  pub fn is_open(self) -> bool { matches!(self, Self::Pending | Self::Accepted) }
}

impl fmt::Display for AssignmentStatus {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

impl FromStr for AssignmentStatus {
  type Err = Error;

  fn from_str(s: &str) -> Result<Self> {
    match s {
      "pending" => Ok(Self::Pending),
      "accepted" => Ok(Self::Accepted),
      "denied" => Ok(Self::Denied),
      other => Err(Error::UnknownStatus(other.to_owned())),
    }
  }
}

// ─── Assignment ──────────────────────────────────────────────────────────────

/// The durable rider↔driver pairing. Never deleted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Assignment {
  pub assignment_id: Uuid,
  pub rider_id:      Uuid,
  pub driver_id:     Uuid,
  pub status:        AssignmentStatus,
  pub assigned_at:   DateTime<Utc>,
  pub responded_at:  Option<DateTime<Utc>>,
}

// ─── Respond ─────────────────────────────────────────────────────────────────

/// A driver's answer to an assignment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Decision {
  Accepted,
  Denied,
}

impl Decision {
  pub fn status(self) -> AssignmentStatus {
    match self {
      Self::Accepted => AssignmentStatus::Accepted,
      Self::Denied => AssignmentStatus::Denied,
    }
  }
}

/// What the responding driver gets back.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "decision", rename_all = "lowercase")]
pub enum Response {
  /// Accepting discloses the rider and their latest location.
  Accepted {
    assignment: Assignment,
    rider:      RiderProfile,
    location:   LocationSnapshot,
  },
  /// Denying discloses nothing about the rider.
  Denied {
    assignment_id: Uuid,
    message:       String,
  },
}

fn check_preconditions(assignment: &Assignment, driver_id: Uuid) -> Result<()> {
  if assignment.driver_id != driver_id {
    return Err(Error::Forbidden(assignment.assignment_id));
  }
  if assignment.status.is_terminal() {
    return Err(Error::AlreadyResponded(assignment.assignment_id));
  }
  Ok(())
}

/// Apply a driver's decision to an assignment.
///
/// Fails with [`Error::AssignmentNotFound`], [`Error::Forbidden`] or
/// [`Error::AlreadyResponded`]. The final write is a compare-and-set on
/// `(driver_id, status = pending)`, so of two concurrent responses at most one
/// succeeds; the loser is classified against the row it lost to.
pub async fn respond<S: DispatchStore>(
  store: &S,
  assignment_id: Uuid,
  driver_id: Uuid,
  decision: Decision,
) -> Result<Response> {
  let current = store
    .get_assignment(assignment_id)
    .await
    .map_err(Error::store)?
    .ok_or(Error::AssignmentNotFound(assignment_id))?;
  check_preconditions(&current, driver_id)?;

  let updated = store
    .transition_assignment(
      assignment_id,
      driver_id,
      AssignmentStatus::Pending,
      decision.status(),
    )
    .await
    .map_err(Error::store)?;

  let Some(assignment) = updated else {
    let raced = store
      .get_assignment(assignment_id)
      .await
      .map_err(Error::store)?
      .ok_or(Error::AssignmentNotFound(assignment_id))?;
    check_preconditions(&raced, driver_id)?;
    // Still pending for this driver yet the write missed: someone
    // responded and the rider re-dispatched back to us in between.
    return Err(Error::AlreadyResponded(assignment_id));
  };

  info!(
    %assignment_id,
    %driver_id,
    status = %assignment.status,
    "assignment responded"
  );

  match decision {
    Decision::Accepted => {
      let rider = store
        .get_rider(assignment.rider_id)
        .await
        .map_err(Error::store)?
        .ok_or(Error::RiderNotFound(assignment.rider_id))?;
      let location = store
        .get_location(PartyKind::Rider, assignment.rider_id)
        .await
        .map_err(Error::store)?;
      Ok(Response::Accepted {
        rider: rider.profile(),
        location: LocationSnapshot::from(location.as_ref()),
        assignment,
      })
    }
    Decision::Denied => Ok(Response::Denied {
      assignment_id,
      message: "Assignment denied.".to_owned(),
    }),
  }
}
