//! `POST /assignments/{id}/respond`. Body: `{"decision":"accepted"|"denied"}`

use axum::{
  Json,
  extract::{Path, State},
};
use serde::Deserialize;
use siren_core::{
  assignment::{self, Decision, Response},
  eta::EtaOracle,
  store::DispatchStore,
};
use uuid::Uuid;

use crate::{AppState, auth::DriverAuth, error::ApiError};

#[derive(Debug, Deserialize)]
pub struct RespondBody {
  pub decision: Decision,
}

pub async fn respond<S, O>(
  State(state): State<AppState<S, O>>,
  DriverAuth(me): DriverAuth,
  Path(id): Path<Uuid>,
  Json(body): Json<RespondBody>,
) -> Result<Json<Response>, ApiError>
where
  S: DispatchStore + 'static,
  O: EtaOracle + 'static,
{
  let response = assignment::respond(state.store.as_ref(), id, me.party_id, body.decision).await?;
  Ok(Json(response))
}
