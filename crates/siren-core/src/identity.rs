//! Identity resolution from bearer credentials.
//!
//! Token minting and signature checks live in the HTTP layer; the core only
//! sees the tri-state outcome of [`IdentityService::resolve`] and the
//! re-issue capability used on the login path.

use std::future::Future;

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::{Error, Result, party::PartyKind};

/// The party a credential speaks for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Identity {
  pub party_id: Uuid,
  pub mobile:   String,
  pub kind:     PartyKind,
}

/// Outcome of resolving a credential.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenStatus {
  /// Signature checks out, not expired, party still exists.
  Valid(Identity),
  /// Signature checks out and the party still exists, but the credential is
  /// past its expiry.
  Expired(Identity),
  Invalid,
}

impl TokenStatus {
  /// Gate for ordinary authenticated calls: expired credentials are rejected
  /// outright, and the role must match.
  pub fn authenticate(self, expected: PartyKind) -> Result<Identity> {
    match self {
      Self::Valid(identity) if identity.kind == expected => Ok(identity),
      Self::Valid(identity) => Err(Error::WrongRole { expected, actual: identity.kind }),
      Self::Expired(_) => Err(Error::CredentialExpired),
      Self::Invalid => Err(Error::CredentialInvalid),
    }
  }
}

/// A freshly minted credential.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IssuedToken {
  pub access_token: String,
  pub expires_at:   DateTime<Utc>,
}

pub trait IdentityService: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  fn resolve<'a>(
    &'a self,
    credential: &'a str,
  ) -> impl Future<Output = Result<TokenStatus, Self::Error>> + Send + 'a;

  fn reissue(&self, identity: &Identity) -> Result<IssuedToken, Self::Error>;
}

/// The credential a login attempt ends up with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoginOutcome {
  pub identity:     Identity,
  pub access_token: String,
  /// `None` when the presented credential was echoed back unchanged.
  pub expires_at:   Option<DateTime<Utc>>,
  pub reissued:     bool,
}

/// Re-entry with an existing credential.
///
/// A valid credential is echoed back; an expired but recognisable one is
/// replaced by a fresh credential for the same identity. Returns `None` when
/// the credential is unusable and the caller must fall back to a full login.
pub async fn refresh_on_login<I: IdentityService>(
  service: &I,
  credential: &str,
) -> Result<Option<LoginOutcome>, I::Error> {
  match service.resolve(credential).await? {
    TokenStatus::Valid(identity) => Ok(Some(LoginOutcome {
      identity,
      access_token: credential.to_owned(),
      expires_at: None,
      reissued: false,
    })),
    TokenStatus::Expired(identity) => {
      let token = service.reissue(&identity)?;
      tracing::info!(party_id = %identity.party_id, role = %identity.kind, "expired credential reissued");
      Ok(Some(LoginOutcome {
        identity,
        access_token: token.access_token,
        expires_at: Some(token.expires_at),
        reissued: true,
      }))
    }
    TokenStatus::Invalid => Ok(None),
  }
}

#[cfg(test)]
mod tests {
  use std::{collections::HashMap, convert::Infallible};

  use super::*;

  /// Credentials are looked up verbatim; reissued tokens are `fresh-<id>`.
  #[derive(Default)]
  struct TableIdentity {
    table: HashMap<String, TokenStatus>,
  }

  impl IdentityService for TableIdentity {
    type Error = Infallible;

    async fn resolve<'a>(&'a self, credential: &'a str) -> Result<TokenStatus, Infallible> {
      Ok(self.table.get(credential).cloned().unwrap_or(TokenStatus::Invalid))
    }

    fn reissue(&self, identity: &Identity) -> Result<IssuedToken, Infallible> {
      Ok(IssuedToken {
        access_token: format!("fresh-{}", identity.party_id),
        expires_at:   Utc::now(),
      })
    }
  }

  fn rider() -> Identity {
    Identity { party_id: Uuid::new_v4(), mobile: "9000000000".into(), kind: PartyKind::Rider }
  }

  #[test]
  fn authenticate_rejects_expired_and_wrong_role() {
    let id = rider();
    assert_eq!(TokenStatus::Valid(id.clone()).authenticate(PartyKind::Rider).unwrap(), id);
    assert!(matches!(
      TokenStatus::Valid(id.clone()).authenticate(PartyKind::Driver),
      Err(Error::WrongRole { expected: PartyKind::Driver, actual: PartyKind::Rider })
    ));
    assert!(matches!(
      TokenStatus::Expired(id).authenticate(PartyKind::Rider),
      Err(Error::CredentialExpired)
    ));
    assert!(matches!(
      TokenStatus::Invalid.authenticate(PartyKind::Rider),
      Err(Error::CredentialInvalid)
    ));
  }

  #[tokio::test]
  async fn valid_credential_is_echoed() {
    let id = rider();
    let mut service = TableIdentity::default();
    service.table.insert("live".into(), TokenStatus::Valid(id.clone()));

    let outcome = refresh_on_login(&service, "live").await.unwrap().unwrap();
    assert_eq!(outcome.access_token, "live");
    assert!(!outcome.reissued);
    assert_eq!(outcome.identity, id);
  }

  #[tokio::test]
  async fn expired_credential_is_reissued_for_same_identity() {
    let id = rider();
    let mut service = TableIdentity::default();
    service.table.insert("stale".into(), TokenStatus::Expired(id.clone()));

    let outcome = refresh_on_login(&service, "stale").await.unwrap().unwrap();
    assert!(outcome.reissued);
    assert_eq!(outcome.access_token, format!("fresh-{}", id.party_id));
    assert!(outcome.expires_at.is_some());
    assert_eq!(outcome.identity, id);
  }

  #[tokio::test]
  async fn invalid_credential_falls_through() {
    let service = TableIdentity::default();
    assert!(refresh_on_login(&service, "garbage").await.unwrap().is_none());
  }
}
