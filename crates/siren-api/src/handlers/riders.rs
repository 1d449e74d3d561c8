//! Handlers for rider endpoints.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `POST` | `/riders` | Register; returns a token. 409 on duplicate mobile |
//! | `GET`  | `/riders/me/location` | 404 if never reported |
//! | `POST` | `/riders/me/location` | Overwrite location **and dispatch** |
//! | `GET`  | `/riders/me/assignment` | Current assignment and its driver |

use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use serde::Serialize;
use siren_core::{
  Error as CoreError,
  assignment::Assignment,
  dispatch::DispatchOutcome,
  eta::EtaOracle,
  identity::Identity,
  location::{Location, LocationReport},
  party::{DriverProfile, NewRider, PartyKind, Rider},
  store::DispatchStore,
};

use super::{TokenBody, issue, registration_error, require};
use crate::{AppState, auth::RiderAuth, error::ApiError};

// ─── Register ────────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
pub struct RegisteredRider {
  pub rider: Rider,
  #[serde(flatten)]
  pub token: TokenBody,
}

/// `POST /riders`
pub async fn register<S, O>(
  State(state): State<AppState<S, O>>,
  Json(body): Json<NewRider>,
) -> Result<impl IntoResponse, ApiError>
where
  S: DispatchStore + 'static,
  O: EtaOracle + 'static,
{
  require("first_name", &body.first_name)?;
  require("mobile", &body.mobile)?;

  let rider = state.store.add_rider(body).await.map_err(registration_error)?;
  let token = issue(&state.identity, &Identity {
    party_id: rider.rider_id,
    mobile:   rider.mobile.clone(),
    kind:     PartyKind::Rider,
  })?;

  Ok((StatusCode::CREATED, Json(RegisteredRider { rider, token })))
}

// ─── Location ────────────────────────────────────────────────────────────────

/// `GET /riders/me/location`
pub async fn get_location<S, O>(
  State(state): State<AppState<S, O>>,
  RiderAuth(me): RiderAuth,
) -> Result<Json<Location>, ApiError>
where
  S: DispatchStore + 'static,
  O: EtaOracle + 'static,
{
  let location = state
    .store
    .get_location(PartyKind::Rider, me.party_id)
    .await
    .map_err(ApiError::store)?
    .ok_or_else(|| ApiError::NotFound("no location reported yet".into()))?;
  Ok(Json(location))
}

/// `POST /riders/me/location`. Body: `{"latitude":..,"longitude":..,"landmark":..}`
///
/// Records the location, then assigns the nearest available driver.
pub async fn report_location<S, O>(
  State(state): State<AppState<S, O>>,
  RiderAuth(me): RiderAuth,
  Json(report): Json<LocationReport>,
) -> Result<Json<DispatchOutcome>, ApiError>
where
  S: DispatchStore + 'static,
  O: EtaOracle + 'static,
{
  let outcome = state.engine.dispatch(me.party_id, report).await?;
  Ok(Json(outcome))
}

// ─── Assignment ──────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
pub struct RiderAssignment {
  pub assignment: Assignment,
  pub driver:     DriverProfile,
}

/// `GET /riders/me/assignment`
pub async fn get_assignment<S, O>(
  State(state): State<AppState<S, O>>,
  RiderAuth(me): RiderAuth,
) -> Result<Json<RiderAssignment>, ApiError>
where
  S: DispatchStore + 'static,
  O: EtaOracle + 'static,
{
  let assignment = state
    .store
    .get_assignment_for_rider(me.party_id)
    .await
    .map_err(ApiError::store)?
    .ok_or_else(|| ApiError::NotFound("no assignment yet".into()))?;

  let driver = state
    .store
    .get_driver(assignment.driver_id)
    .await
    .map_err(ApiError::store)?
    .ok_or(CoreError::DriverNotFound(assignment.driver_id))?;

  Ok(Json(RiderAssignment { assignment, driver: driver.profile() }))
}
