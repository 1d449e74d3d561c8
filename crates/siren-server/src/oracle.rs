//! ETA oracles available to the server: an OSRM routing client, or the
//! straight-line estimate when no routing service is configured.

use std::time::{Duration, TryFromFloatSecsError};

use reqwest::Client;
use serde::Deserialize;
use siren_core::{
  eta::{EtaOracle, StraightLineOracle},
  location::Coordinate,
};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum OracleError {
  #[error("routing request failed: {0}")]
  Http(#[from] reqwest::Error),

  #[error("routing service answered {code}: {message}")]
  Route { code: String, message: String },

  #[error("routing service returned no route")]
  NoRoute,

  #[error("duration out of range: {0}")]
  Duration(#[from] TryFromFloatSecsError),
}

// ─── OSRM ────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct RouteResponse {
  code:    String,
  #[serde(default)]
  message: Option<String>,
  #[serde(default)]
  routes:  Vec<Route>,
}

#[derive(Debug, Deserialize)]
struct Route {
  /// Seconds.
  duration: f64,
}

impl RouteResponse {
  fn eta(self) -> Result<Duration, OracleError> {
    if self.code != "Ok" {
      return Err(OracleError::Route {
        code:    self.code,
        message: self.message.unwrap_or_default(),
      });
    }
    let route = self.routes.into_iter().next().ok_or(OracleError::NoRoute)?;
    Ok(Duration::try_from_secs_f64(route.duration)?)
  }
}

/// Driving-time estimates from an OSRM `route` service.
#[derive(Debug, Clone)]
pub struct OsrmOracle {
  client:   Client,
  base_url: String,
}

impl OsrmOracle {
  /// `timeout` bounds the whole HTTP exchange; the dispatch engine applies
  /// its own, usually tighter, deadline on top.
  pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, OracleError> {
    let client = Client::builder().timeout(timeout).build()?;
    Ok(Self { client, base_url: base_url.into() })
  }

  fn url(&self, origin: Coordinate, destination: Coordinate) -> String {
    // OSRM takes lon,lat.
    format!(
      "{}/route/v1/driving/{},{};{},{}?overview=false",
      self.base_url.trim_end_matches('/'),
      origin.longitude,
      origin.latitude,
      destination.longitude,
      destination.latitude,
    )
  }
}

impl EtaOracle for OsrmOracle {
  type Error = OracleError;

  async fn estimate(
    &self,
    origin: Coordinate,
    destination: Coordinate,
  ) -> Result<Duration, OracleError> {
    let body: RouteResponse = self
      .client
      .get(self.url(origin, destination))
      .send()
      .await?
      .json()
      .await?;
    body.eta()
  }
}

// ─── Runtime choice ──────────────────────────────────────────────────────────

/// The oracle picked from configuration at startup.
#[derive(Debug, Clone)]
pub enum Oracle {
  Osrm(OsrmOracle),
  StraightLine(StraightLineOracle),
}

impl EtaOracle for Oracle {
  type Error = OracleError;

  async fn estimate(
    &self,
    origin: Coordinate,
    destination: Coordinate,
  ) -> Result<Duration, OracleError> {
    match self {
      Self::Osrm(osrm) => osrm.estimate(origin, destination).await,
      Self::StraightLine(line) => Ok(line.estimate(origin, destination).await?),
    }
  }
}
