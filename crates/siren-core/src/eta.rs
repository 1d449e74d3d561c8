//! ETA estimation: the oracle abstraction and its degradation policy.

use std::{
  future::Future,
  time::{Duration, TryFromFloatSecsError},
};

use serde::{Deserialize, Serialize, Serializer};

use crate::{Error, Result, location::Coordinate};

/// A routing service that estimates travel time between two points.
///
/// Implementations may fail or hang; the dispatch engine wraps every call in
/// [`EtaPolicy::timeout`] and substitutes [`EtaPolicy::fallback`] on failure.
pub trait EtaOracle: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  fn estimate(
    &self,
    origin: Coordinate,
    destination: Coordinate,
  ) -> impl Future<Output = Result<Duration, Self::Error>> + Send + '_;
}

/// Per-call timeout and the sentinel used when the oracle cannot answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EtaPolicy {
  pub timeout:  Duration,
  /// Large but finite, so degraded candidates rank last but still rank.
  pub fallback: Duration,
}

impl Default for EtaPolicy {
  fn default() -> Self {
    Self {
      timeout:  Duration::from_secs(3),
      fallback: Duration::from_secs(3600),
    }
  }
}

/// Where a candidate's ETA came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EtaSource {
  Oracle,
  Fallback,
}

pub(crate) fn serialize_secs<S: Serializer>(
  d: &Duration,
  s: S,
) -> std::result::Result<S::Ok, S::Error> {
  s.serialize_f64(d.as_secs_f64())
}

// ─── Straight-line oracle ────────────────────────────────────────────────────

/// Great-circle distance at a constant average speed. Used when no routing
/// service is configured.
#[derive(Debug, Clone, Copy)]
pub struct StraightLineOracle {
  speed_kmh: f64,
}

impl StraightLineOracle {
  pub fn new(speed_kmh: f64) -> Result<Self> {
    if !speed_kmh.is_finite() || speed_kmh <= 0.0 {
      return Err(Error::Config(format!(
        "average speed must be positive, got {speed_kmh}"
      )));
    }
    Ok(Self { speed_kmh })
  }
}

impl EtaOracle for StraightLineOracle {
  type Error = TryFromFloatSecsError;

  async fn estimate(
    &self,
    origin: Coordinate,
    destination: Coordinate,
  ) -> Result<Duration, Self::Error> {
    let hours = origin.haversine_km(&destination) / self.speed_kmh;
    Duration::try_from_secs_f64(hours * 3600.0)
  }
}
