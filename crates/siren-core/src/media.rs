//! Media sessions and artifacts uploaded by riders.
//!
//! Binary data never lives in the database; artifacts hold a content hash and
//! the vault resolves them to bytes.

use std::future::Future;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One per rider; its id is the opaque media-session identifier sent to
/// drivers with each assignment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MediaSession {
  pub media_session_id: Uuid,
  pub rider_id:         Uuid,
  /// Alternate contact number supplied alongside uploads.
  pub contact_mobile:   Option<String>,
  pub created_at:       DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
  Image,
  Audio,
}

impl MediaKind {
  pub fn as_str(self) -> &'static str {
    match self {
      Self::Image => "image",
      Self::Audio => "audio",
    }
  }
}

/// A stored upload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MediaArtifact {
  pub artifact_id:      Uuid,
  pub media_session_id: Uuid,
  pub kind:             MediaKind,
  /// The client-supplied file name.
  pub file_name:        String,
  pub media_type:       String,
  /// SHA-256 hex digest; also the vault key.
  pub content_hash:     String,
  pub byte_len:         u64,
  pub recorded_at:      DateTime<Utc>,
}

/// Input to [`crate::store::DispatchStore::record_artifact`].
#[derive(Debug, Clone)]
pub struct NewArtifact {
  pub media_session_id: Uuid,
  pub kind:             MediaKind,
  pub file_name:        String,
  pub media_type:       String,
  pub content_hash:     String,
  pub byte_len:         u64,
}

/// Resolves stored artifacts to their bytes.
pub trait MediaVault: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  fn read<'a>(
    &'a self,
    artifact: &'a MediaArtifact,
  ) -> impl Future<Output = Result<Vec<u8>, Self::Error>> + Send + 'a;
}
