//! Bearer-token extractors.
//!
//! [`RiderAuth`] and [`DriverAuth`] reject expired tokens outright; only the
//! login endpoint refreshes them.

use axum::{
  extract::FromRequestParts,
  http::{HeaderMap, header, request::Parts},
};
use siren_core::{
  eta::EtaOracle,
  identity::{Identity, IdentityService},
  party::PartyKind,
  store::DispatchStore,
};

use crate::{AppState, error::ApiError};

/// The token from an `Authorization: Bearer <token>` header, if any.
pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
  headers
    .get(header::AUTHORIZATION)
    .and_then(|v| v.to_str().ok())
    .and_then(|v| v.strip_prefix("Bearer ").or_else(|| v.strip_prefix("bearer ")))
    .map(str::trim)
    .filter(|t| !t.is_empty())
}

/// Resolve `token` and require a live credential of role `kind`.
pub async fn authenticate<S, O>(
  state: &AppState<S, O>,
  token: &str,
  kind: PartyKind,
) -> Result<Identity, ApiError>
where
  S: DispatchStore + 'static,
  O: EtaOracle + 'static,
{
  let status = state.identity.resolve(token).await?;
  Ok(status.authenticate(kind)?)
}

/// An authenticated rider.
#[derive(Debug, Clone)]
pub struct RiderAuth(pub Identity);

/// An authenticated driver.
#[derive(Debug, Clone)]
pub struct DriverAuth(pub Identity);

impl<S, O> FromRequestParts<AppState<S, O>> for RiderAuth
where
  S: DispatchStore + 'static,
  O: EtaOracle + 'static,
{
  type Rejection = ApiError;

  async fn from_request_parts(
    parts: &mut Parts,
    state: &AppState<S, O>,
  ) -> Result<Self, Self::Rejection> {
    let token = bearer_token(&parts.headers).ok_or(ApiError::MissingToken)?;
    Ok(Self(authenticate(state, token, PartyKind::Rider).await?))
  }
}

impl<S, O> FromRequestParts<AppState<S, O>> for DriverAuth
where
  S: DispatchStore + 'static,
  O: EtaOracle + 'static,
{
  type Rejection = ApiError;

  async fn from_request_parts(
    parts: &mut Parts,
    state: &AppState<S, O>,
  ) -> Result<Self, Self::Rejection> {
    let token = bearer_token(&parts.headers).ok_or(ApiError::MissingToken)?;
    Ok(Self(authenticate(state, token, PartyKind::Driver).await?))
  }
}

#[cfg(test)]
mod tests {
  use axum::http::HeaderValue;

  use super::*;

  #[test]
  fn bearer_token_parsing() {
    let mut headers = HeaderMap::new();
    assert_eq!(bearer_token(&headers), None);

    headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Bearer abc.def"));
    assert_eq!(bearer_token(&headers), Some("abc.def"));

    headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Basic dXNlcg=="));
    assert_eq!(bearer_token(&headers), None);

    headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Bearer "));
    assert_eq!(bearer_token(&headers), None);
  }
}
