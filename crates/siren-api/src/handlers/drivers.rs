//! Handlers for driver endpoints.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `POST` | `/drivers` | Register; starts unavailable. 409 on duplicate mobile or vehicle |
//! | `PUT`  | `/drivers/me/location` | Overwrite location |
//! | `PUT`  | `/drivers/me/availability` | Body: `{"available":true}` |

use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use serde::{Deserialize, Serialize};
use siren_core::{
  Error as CoreError,
  eta::EtaOracle,
  identity::Identity,
  location::{Location, LocationReport},
  party::{Driver, NewDriver, PartyKind},
  store::DispatchStore,
};
use tracing::info;

use super::{TokenBody, issue, registration_error, require};
use crate::{AppState, auth::DriverAuth, error::ApiError};

#[derive(Debug, Serialize)]
pub struct RegisteredDriver {
  pub driver: Driver,
  #[serde(flatten)]
  pub token:  TokenBody,
}

/// `POST /drivers`
pub async fn register<S, O>(
  State(state): State<AppState<S, O>>,
  Json(body): Json<NewDriver>,
) -> Result<impl IntoResponse, ApiError>
where
  S: DispatchStore + 'static,
  O: EtaOracle + 'static,
{
  require("first_name", &body.first_name)?;
  require("mobile", &body.mobile)?;
  require("vehicle_number", &body.vehicle_number)?;

  let driver = state.store.add_driver(body).await.map_err(registration_error)?;
  let token = issue(&state.identity, &Identity {
    party_id: driver.driver_id,
    mobile:   driver.mobile.clone(),
    kind:     PartyKind::Driver,
  })?;

  Ok((StatusCode::CREATED, Json(RegisteredDriver { driver, token })))
}

/// `PUT /drivers/me/location`
pub async fn report_location<S, O>(
  State(state): State<AppState<S, O>>,
  DriverAuth(me): DriverAuth,
  Json(report): Json<LocationReport>,
) -> Result<Json<Location>, ApiError>
where
  S: DispatchStore + 'static,
  O: EtaOracle + 'static,
{
  report.coordinate()?;
  let location = state
    .store
    .put_location(PartyKind::Driver, me.party_id, report)
    .await
    .map_err(ApiError::store)?;
  Ok(Json(location))
}

#[derive(Debug, Deserialize)]
pub struct AvailabilityBody {
  pub available: bool,
}

/// `PUT /drivers/me/availability`
pub async fn set_availability<S, O>(
  State(state): State<AppState<S, O>>,
  DriverAuth(me): DriverAuth,
  Json(body): Json<AvailabilityBody>,
) -> Result<Json<Driver>, ApiError>
where
  S: DispatchStore + 'static,
  O: EtaOracle + 'static,
{
  let driver = state
    .store
    .set_driver_availability(me.party_id, body.available)
    .await
    .map_err(ApiError::store)?
    .ok_or(CoreError::DriverNotFound(me.party_id))?;
  info!(driver_id = %driver.driver_id, available = driver.available, "availability changed");
  Ok(Json(driver))
}
