//! HS256 bearer tokens and the [`IdentityService`] built on them.
//!
//! A token names its party (`sub`), the mobile number it was issued against
//! and the party's role. Resolution re-reads the party from the store, so a
//! token outlives neither its party nor a change of mobile number.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{
  Algorithm, DecodingKey, EncodingKey, Header, Validation, errors::ErrorKind,
};
use serde::{Deserialize, Serialize};
use siren_core::{
  identity::{Identity, IdentityService, IssuedToken, TokenStatus},
  party::PartyKind,
  store::DispatchStore,
};
use thiserror::Error;
use tracing::debug;
use uuid::Uuid;

/// Default token lifetime.
pub const DEFAULT_TOKEN_TTL_MINUTES: i64 = 240;

#[derive(Debug, Error)]
pub enum TokenError {
  #[error("token signing failed: {0}")]
  Sign(#[from] jsonwebtoken::errors::Error),

  #[error("store error: {0}")]
  Store(#[source] Box<dyn std::error::Error + Send + Sync>),
}

/// Claims carried by every Siren bearer token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
  pub sub:    Uuid,
  pub mobile: String,
  pub role:   PartyKind,
  pub iat:    i64,
  pub exp:    i64,
}

pub struct JwtIdentityService<S> {
  store:    Arc<S>,
  encoding: EncodingKey,
  decoding: DecodingKey,
  ttl:      Duration,
}

impl<S: DispatchStore> JwtIdentityService<S> {
  pub fn new(store: Arc<S>, secret: &[u8], ttl: Duration) -> Self {
    Self {
      store,
      encoding: EncodingKey::from_secret(secret),
      decoding: DecodingKey::from_secret(secret),
      ttl,
    }
  }

  /// Mint a token for `identity` valid from now.
  pub fn issue(&self, identity: &Identity) -> Result<IssuedToken, TokenError> {
    self.issue_at(identity, Utc::now())
  }

  /// Mint a token as though issued at `issued_at`.
  pub fn issue_at(
    &self,
    identity: &Identity,
    issued_at: DateTime<Utc>,
  ) -> Result<IssuedToken, TokenError> {
    let expires_at = issued_at + self.ttl;
    let claims = Claims {
      sub:    identity.party_id,
      mobile: identity.mobile.clone(),
      role:   identity.kind,
      iat:    issued_at.timestamp(),
      exp:    expires_at.timestamp(),
    };
    let access_token =
      jsonwebtoken::encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)?;
    Ok(IssuedToken { access_token, expires_at })
  }

  fn decode(&self, token: &str, check_expiry: bool) -> jsonwebtoken::errors::Result<Claims> {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.leeway = 0;
    validation.validate_exp = check_expiry;
    jsonwebtoken::decode::<Claims>(token, &self.decoding, &validation).map(|data| data.claims)
  }

  /// The party behind `claims`, if it still exists under the same mobile.
  async fn identify(&self, claims: Claims) -> Result<Option<Identity>, TokenError> {
    let mobile = match claims.role {
      PartyKind::Rider => self
        .store
        .get_rider(claims.sub)
        .await
        .map_err(|e| TokenError::Store(Box::new(e)))?
        .map(|r| r.mobile),
      PartyKind::Driver => self
        .store
        .get_driver(claims.sub)
        .await
        .map_err(|e| TokenError::Store(Box::new(e)))?
        .map(|d| d.mobile),
    };

    Ok(mobile.filter(|m| *m == claims.mobile).map(|mobile| Identity {
      party_id: claims.sub,
      mobile,
      kind: claims.role,
    }))
  }
}

impl<S: DispatchStore> IdentityService for JwtIdentityService<S> {
  type Error = TokenError;

  async fn resolve<'a>(&'a self, credential: &'a str) -> Result<TokenStatus, TokenError> {
    let (claims, expired) = match self.decode(credential, true) {
      Ok(claims) => (claims, false),
      Err(e) if matches!(e.kind(), ErrorKind::ExpiredSignature) => {
        match self.decode(credential, false) {
          Ok(claims) => (claims, true),
          Err(e) => {
            debug!(error = %e, "expired token failed re-decode");
            return Ok(TokenStatus::Invalid);
          }
        }
      }
      Err(e) => {
        debug!(error = %e, "token rejected");
        return Ok(TokenStatus::Invalid);
      }
    };

    Ok(match self.identify(claims).await? {
      Some(identity) if expired => TokenStatus::Expired(identity),
      Some(identity) => TokenStatus::Valid(identity),
      None => TokenStatus::Invalid,
    })
  }

  fn reissue(&self, identity: &Identity) -> Result<IssuedToken, TokenError> {
    self.issue(identity)
  }
}
