//! The dispatch engine: rank available drivers by ETA and assign the nearest.
//!
//! A dispatch:
//! 1. overwrites the rider's location,
//! 2. loads every available driver with a known location,
//! 3. asks the ETA oracle about each candidate concurrently, substituting the
//!    fallback ETA for any call that errors or times out,
//! 4. picks the minimum ETA (ties go to the earlier candidate),
//! 5. upserts the rider's assignment and hands a notification job to the
//!    notifier without waiting for delivery.

use std::{sync::Arc, time::Duration};

use futures_util::future::join_all;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use uuid::Uuid;

use crate::{
  Error, Result,
  eta::{EtaOracle, EtaPolicy, EtaSource, serialize_secs},
  location::{Coordinate, Location, LocationReport},
  notify::{AssignmentJob, NotificationJob, Notifier},
  party::{Driver, DriverProfile, PartyKind},
  store::DispatchStore,
};

/// Why the oracle produced no estimate. Never leaves this module; every
/// occurrence is downgraded to the fallback ETA.
#[derive(Debug)]
enum OracleUnavailable {
  TimedOut,
  Failed(String),
}

/// A located candidate with its estimate.
#[derive(Debug, Clone)]
pub struct RankedCandidate {
  pub driver:   Driver,
  pub location: Location,
  pub eta:      Duration,
  pub source:   EtaSource,
}

/// Sort by ascending ETA. The sort is stable, so equal ETAs keep their
/// enumeration order.
pub fn rank(mut candidates: Vec<RankedCandidate>) -> Vec<RankedCandidate> {
  candidates.sort_by_key(|c| c.eta);
  candidates
}

/// What the rider gets back from a successful dispatch.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DispatchOutcome {
  pub assignment_id:    Uuid,
  pub driver:           DriverProfile,
  #[serde(rename = "eta_seconds", serialize_with = "serialize_secs", skip_deserializing)]
  pub eta:              Duration,
  pub eta_source:       EtaSource,
  pub media_session_id: Uuid,
}

pub struct DispatchEngine<S, O, N> {
  store:    Arc<S>,
  oracle:   Arc<O>,
  notifier: N,
  policy:   EtaPolicy,
}

impl<S, O, N> DispatchEngine<S, O, N>
where
  S: DispatchStore,
  O: EtaOracle,
  N: Notifier,
{
  pub fn new(store: Arc<S>, oracle: Arc<O>, notifier: N, policy: EtaPolicy) -> Self {
    Self { store, oracle, notifier, policy }
  }

  pub fn policy(&self) -> EtaPolicy { self.policy }

  /// Record the rider's new location and assign the nearest available driver.
  pub async fn dispatch(
    &self,
    rider_id: Uuid,
    report: LocationReport,
  ) -> Result<DispatchOutcome> {
    let rider_point = report.coordinate()?;

    let rider_location = self
      .store
      .put_location(PartyKind::Rider, rider_id, report)
      .await
      .map_err(Error::store)?;

    let available = self
      .store
      .list_available_drivers()
      .await
      .map_err(Error::store)?;
    if available.is_empty() {
      return Err(Error::NoDriversAvailable);
    }

    let located: Vec<(Driver, Location)> = available
      .into_iter()
      .filter_map(|c| c.location.map(|l| (c.driver, l)))
      .collect();

    let winner = rank(self.estimate_all(rider_point, located).await)
      .into_iter()
      .next()
      .ok_or(Error::NoDriverLocationAvailable)?;

    let session = self
      .store
      .media_session_for_rider(rider_id)
      .await
      .map_err(Error::store)?;

    let assignment = self
      .store
      .upsert_assignment_for_rider(rider_id, winner.driver.driver_id)
      .await
      .map_err(|e| Error::AssignmentPersistence(Box::new(e)))?;

    info!(
      %rider_id,
      driver_id = %winner.driver.driver_id,
      assignment_id = %assignment.assignment_id,
      eta_secs = winner.eta.as_secs_f64(),
      eta_source = ?winner.source,
      "dispatched"
    );

    let outcome = DispatchOutcome {
      assignment_id:    assignment.assignment_id,
      driver:           winner.driver.profile(),
      eta:              winner.eta,
      eta_source:       winner.source,
      media_session_id: session.media_session_id,
    };

    self.notifier.notify(NotificationJob::Assignment(AssignmentJob {
      assignment,
      rider_location,
      media_session_id: session.media_session_id,
      eta: winner.eta,
    }));

    Ok(outcome)
  }

  /// Estimate every candidate concurrently. Output order matches input order.
  async fn estimate_all(
    &self,
    rider_point: Coordinate,
    located: Vec<(Driver, Location)>,
  ) -> Vec<RankedCandidate> {
    let estimates = join_all(
      located
        .iter()
        .map(|(_, location)| self.estimate_one(location.coordinate(), rider_point)),
    )
    .await;

    located
      .into_iter()
      .zip(estimates)
      .map(|((driver, location), estimate)| {
        let (eta, source) = match estimate {
          Ok(eta) => (eta, EtaSource::Oracle),
          Err(reason) => {
            warn!(driver_id = %driver.driver_id, ?reason, "eta oracle unavailable; using fallback");
            (self.policy.fallback, EtaSource::Fallback)
          }
        };
        RankedCandidate { driver, location, eta, source }
      })
      .collect()
  }

  async fn estimate_one(
    &self,
    origin: Coordinate,
    destination: Coordinate,
  ) -> Result<Duration, OracleUnavailable> {
    match tokio::time::timeout(self.policy.timeout, self.oracle.estimate(origin, destination))
      .await
    {
      Ok(Ok(eta)) => Ok(eta),
      Ok(Err(e)) => Err(OracleUnavailable::Failed(e.to_string())),
      Err(_) => Err(OracleUnavailable::TimedOut),
    }
  }
}
