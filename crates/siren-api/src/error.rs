//! API error type and [`axum::response::IntoResponse`] implementation.
//!
//! Every error renders as `{"error": <message>, "code": <code>}`.

use axum::{
  Json,
  http::{HeaderValue, StatusCode, header},
  response::{IntoResponse, Response},
};
use serde_json::json;
use siren_core::Error as CoreError;
use thiserror::Error;
use tracing::error;

/// An error returned by an API handler.
#[derive(Debug, Error)]
pub enum ApiError {
  #[error(transparent)]
  Core(#[from] CoreError),

  #[error("missing bearer token")]
  MissingToken,

  #[error("not found: {0}")]
  NotFound(String),

  #[error("bad request: {0}")]
  BadRequest(String),

  #[error("already registered: {0}")]
  Conflict(String),

  #[error("payload too large")]
  PayloadTooLarge,

  #[error(transparent)]
  Token(#[from] crate::token::TokenError),

  #[error("media vault error: {0}")]
  Vault(#[from] std::io::Error),

  #[error("store error: {0}")]
  Store(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl ApiError {
  pub fn store(e: impl std::error::Error + Send + Sync + 'static) -> Self {
    Self::Store(Box::new(e))
  }

  /// HTTP status and stable machine-readable code.
  pub fn status_and_code(&self) -> (StatusCode, &'static str) {
    match self {
      Self::Core(e) => match e {
        CoreError::NoDriversAvailable => (StatusCode::SERVICE_UNAVAILABLE, "no_drivers_available"),
        CoreError::NoDriverLocationAvailable => {
          (StatusCode::SERVICE_UNAVAILABLE, "no_driver_location_available")
        }
        CoreError::AssignmentPersistence(_) => {
          (StatusCode::INTERNAL_SERVER_ERROR, "assignment_persistence_error")
        }
        CoreError::AssignmentNotFound(_) => (StatusCode::NOT_FOUND, "assignment_not_found"),
        CoreError::RiderNotFound(_) => (StatusCode::NOT_FOUND, "rider_not_found"),
        CoreError::DriverNotFound(_) => (StatusCode::NOT_FOUND, "driver_not_found"),
        CoreError::Forbidden(_) => (StatusCode::FORBIDDEN, "forbidden"),
        CoreError::WrongRole { .. } => (StatusCode::FORBIDDEN, "wrong_role"),
        CoreError::AlreadyResponded(_) => (StatusCode::CONFLICT, "already_responded"),
        CoreError::CredentialExpired => (StatusCode::UNAUTHORIZED, "token_expired"),
        CoreError::CredentialInvalid => (StatusCode::UNAUTHORIZED, "invalid_token"),
        CoreError::InvalidCoordinate(_) => (StatusCode::BAD_REQUEST, "invalid_coordinate"),
        CoreError::UnknownStatus(_)
        | CoreError::Config(_)
        | CoreError::Serialization(_)
        | CoreError::Store(_) => (StatusCode::INTERNAL_SERVER_ERROR, "internal_error"),
      },
      Self::MissingToken => (StatusCode::UNAUTHORIZED, "missing_token"),
      Self::NotFound(_) => (StatusCode::NOT_FOUND, "not_found"),
      Self::BadRequest(_) => (StatusCode::BAD_REQUEST, "bad_request"),
      Self::Conflict(_) => (StatusCode::CONFLICT, "already_registered"),
      Self::PayloadTooLarge => (StatusCode::PAYLOAD_TOO_LARGE, "payload_too_large"),
      Self::Token(_) | Self::Vault(_) | Self::Store(_) => {
        (StatusCode::INTERNAL_SERVER_ERROR, "internal_error")
      }
    }
  }
}

impl IntoResponse for ApiError {
  fn into_response(self) -> Response {
    let (status, code) = self.status_and_code();
    if status.is_server_error() {
      error!(error = %self, code, "request failed");
    }

    let mut res = (status, Json(json!({ "error": self.to_string(), "code": code }))).into_response();
    if status == StatusCode::UNAUTHORIZED {
      res
        .headers_mut()
        .insert(header::WWW_AUTHENTICATE, HeaderValue::from_static("Bearer realm=\"siren\""));
    }
    res
  }
}
