//! `POST /auth/login`. Body: `{"phone_number":"...","role":"rider"|"driver"}`
//!
//! A bearer credential, if presented, is tried first: a live one is echoed
//! back, an expired but recognisable one is swapped for a fresh token. Any
//! other case falls through to a phone-number login.

use axum::{Json, extract::State, http::HeaderMap};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use siren_core::{
  eta::EtaOracle,
  identity::{Identity, LoginOutcome, refresh_on_login},
  party::PartyKind,
  store::DispatchStore,
};
use tracing::{debug, info};
use uuid::Uuid;

use super::issue;
use crate::{AppState, auth::bearer_token, error::ApiError};

#[derive(Debug, Deserialize)]
pub struct LoginBody {
  pub phone_number: String,
  #[serde(default = "default_role")]
  pub role:         PartyKind,
}

fn default_role() -> PartyKind { PartyKind::Rider }

#[derive(Debug, Serialize)]
pub struct LoginResponse {
  pub access_token: String,
  pub token_type:   &'static str,
  pub role:         PartyKind,
  pub party_id:     Uuid,
  pub expires_at:   Option<DateTime<Utc>>,
  pub reissued:     bool,
  pub message:      &'static str,
}

pub async fn login<S, O>(
  State(state): State<AppState<S, O>>,
  headers: HeaderMap,
  Json(body): Json<LoginBody>,
) -> Result<Json<LoginResponse>, ApiError>
where
  S: DispatchStore + 'static,
  O: EtaOracle + 'static,
{
  if let Some(token) = bearer_token(&headers) {
    match refresh_on_login(state.identity.as_ref(), token).await? {
      Some(outcome) if outcome.identity.kind == body.role => {
        return Ok(Json(refreshed(outcome)));
      }
      Some(outcome) => {
        debug!(
          party_id = %outcome.identity.party_id,
          presented = %outcome.identity.kind,
          requested = %body.role,
          "bearer role differs from login role; ignoring it"
        );
      }
      None => debug!("bearer unusable; falling back to phone login"),
    }
  }

  let phone = body.phone_number.trim();
  if phone.is_empty() {
    return Err(ApiError::BadRequest("phone_number must not be empty".into()));
  }

  let party_id = match body.role {
    PartyKind::Rider => state
      .store
      .find_rider_by_mobile(phone)
      .await
      .map_err(ApiError::store)?
      .map(|r| r.rider_id),
    PartyKind::Driver => state
      .store
      .find_driver_by_mobile(phone)
      .await
      .map_err(ApiError::store)?
      .map(|d| d.driver_id),
  }
  .ok_or_else(|| ApiError::NotFound(format!("no {} registered with that phone number", body.role)))?;

  let identity = Identity { party_id, mobile: phone.to_owned(), kind: body.role };
  let token = issue(&state.identity, &identity)?;
  info!(%party_id, role = %body.role, "phone login");

  Ok(Json(LoginResponse {
    access_token: token.access_token,
    token_type:   token.token_type,
    role:         body.role,
    party_id,
    expires_at:   token.expires_at,
    reissued:     false,
    message:      "New login token issued.",
  }))
}

fn refreshed(outcome: LoginOutcome) -> LoginResponse {
  let message = if outcome.reissued {
    "Token expired. New token issued."
  } else {
    "Token is still valid."
  };
  LoginResponse {
    access_token: outcome.access_token,
    token_type: "bearer",
    role: outcome.identity.kind,
    party_id: outcome.identity.party_id,
    expires_at: outcome.expires_at,
    reissued: outcome.reissued,
    message,
  }
}
