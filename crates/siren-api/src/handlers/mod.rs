//! Route handlers, one module per resource.

pub mod assignments;
pub mod drivers;
pub mod login;
pub mod media;
pub mod riders;

use siren_core::{identity::Identity, store::StoreError};

use crate::{ApiError, token::JwtIdentityService};

/// Credential handed back by registration and login.
#[derive(Debug, serde::Serialize)]
pub struct TokenBody {
  pub access_token: String,
  pub token_type:   &'static str,
  pub expires_at:   Option<chrono::DateTime<chrono::Utc>>,
}

impl TokenBody {
  pub fn bearer(
    access_token: String,
    expires_at: Option<chrono::DateTime<chrono::Utc>>,
  ) -> Self {
    Self { access_token, token_type: "bearer", expires_at }
  }
}

pub(crate) fn issue<S>(
  identity: &JwtIdentityService<S>,
  who: &Identity,
) -> Result<TokenBody, ApiError>
where
  S: siren_core::store::DispatchStore,
{
  let token = identity.issue(who)?;
  Ok(TokenBody::bearer(token.access_token, Some(token.expires_at)))
}

/// Map a registration write failure, turning uniqueness violations into 409.
pub(crate) fn registration_error<E: StoreError>(e: E) -> ApiError {
  if e.is_conflict() {
    ApiError::Conflict(e.to_string())
  } else {
    ApiError::store(e)
  }
}

/// Reject blank required text fields.
pub(crate) fn require(field: &str, value: &str) -> Result<(), ApiError> {
  if value.trim().is_empty() {
    return Err(ApiError::BadRequest(format!("{field} must not be empty")));
  }
  Ok(())
}
