//! Server configuration, layered from a TOML file and `SIREN_*` environment
//! variables. Every field has a default except `token_secret`.

use std::{
  path::PathBuf,
  time::{Duration, TryFromFloatSecsError},
};

use serde::Deserialize;
use siren_api::ApiSettings;
use siren_core::eta::EtaPolicy;
use thiserror::Error;

/// A configuration that deserialised but cannot be used.
#[derive(Debug, Error)]
pub enum ConfigError {
  #[error("token_secret is not set (generate one with --generate-secret)")]
  MissingSecret,

  #[error("token_ttl_minutes must be positive, got {0}")]
  InvalidTokenTtl(i64),

  #[error("oracle_timeout_secs: {0}")]
  InvalidOracleTimeout(#[from] TryFromFloatSecsError),

  #[error("oracle_timeout_secs must be positive")]
  ZeroOracleTimeout,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
  pub host:                String,
  pub port:                u16,
  pub store_path:          PathBuf,
  pub media_dir:           PathBuf,
  /// HS256 signing secret. Generate one with `--generate-secret`.
  pub token_secret:        String,
  pub token_ttl_minutes:   i64,
  /// Base URL of an OSRM instance. Without one, ETAs are straight-line.
  pub oracle_url:          Option<String>,
  pub oracle_timeout_secs: f64,
  pub fallback_eta_secs:   u64,
  pub average_speed_kmh:   f64,
  pub assignment_prompt:   String,
  pub queue_depth:         usize,
  pub channel_buffer:      usize,
  pub max_upload_bytes:    usize,
}

impl Default for ServerConfig {
  fn default() -> Self {
    Self {
      host:                "127.0.0.1".to_string(),
      port:                8080,
      store_path:          PathBuf::from("~/.local/share/siren/siren.db"),
      media_dir:           PathBuf::from("~/.local/share/siren/media"),
      token_secret:        String::new(),
      token_ttl_minutes:   siren_api::token::DEFAULT_TOKEN_TTL_MINUTES,
      oracle_url:          None,
      oracle_timeout_secs: 3.0,
      fallback_eta_secs:   3600,
      average_speed_kmh:   40.0,
      assignment_prompt:   "New emergency request. Please respond.".to_string(),
      queue_depth:         1024,
      channel_buffer:      32,
      max_upload_bytes:    16 * 1024 * 1024,
    }
  }
}

impl ServerConfig {
  pub fn eta_policy(&self) -> Result<EtaPolicy, ConfigError> {
    let timeout = Duration::try_from_secs_f64(self.oracle_timeout_secs)?;
    if timeout.is_zero() {
      return Err(ConfigError::ZeroOracleTimeout);
    }
    Ok(EtaPolicy { timeout, fallback: Duration::from_secs(self.fallback_eta_secs) })
  }

  /// Settings for the HTTP layer. Fails if the secret is missing or the
  /// numbers make no sense.
  pub fn api_settings(&self) -> Result<ApiSettings, ConfigError> {
    if self.token_secret.trim().is_empty() {
      return Err(ConfigError::MissingSecret);
    }
    if self.token_ttl_minutes <= 0 {
      return Err(ConfigError::InvalidTokenTtl(self.token_ttl_minutes));
    }

    let mut settings = ApiSettings::new(self.token_secret.clone());
    settings.token_ttl = chrono::Duration::minutes(self.token_ttl_minutes);
    settings.eta = self.eta_policy()?;
    settings.assignment_prompt = self.assignment_prompt.clone();
    settings.queue_depth = self.queue_depth;
    settings.channel_buffer = self.channel_buffer;
    settings.max_upload_bytes = self.max_upload_bytes;
    Ok(settings)
  }
}
