//! `POST /riders/me/media`: multipart upload of scene photos and voice notes.
//!
//! Fields:
//! - `image` (repeatable): an image file
//! - `audio` (repeatable): an audio file
//! - `mobile_number` (optional text): alternate contact for the driver
//!
//! At least one of the three must be present. Artifacts are stored first,
//! then handed to the notification queue; the response never waits on driver
//! delivery. A contact number on its own is recorded without notifying.

use axum::{
  Json,
  extract::{Multipart, State, multipart::MultipartError},
  http::StatusCode,
  response::IntoResponse,
};
use serde::Serialize;
use siren_core::{
  eta::EtaOracle,
  media::{MediaArtifact, MediaKind, NewArtifact},
  notify::{MediaJob, NotificationJob, Notifier},
  store::DispatchStore,
};
use tracing::info;
use uuid::Uuid;

use crate::{AppState, auth::RiderAuth, error::ApiError};

#[derive(Debug, Serialize)]
pub struct UploadResponse {
  pub media_session_id: Uuid,
  pub contact_mobile:   Option<String>,
  pub artifacts:        Vec<MediaArtifact>,
}

struct Upload {
  kind:       MediaKind,
  file_name:  String,
  media_type: String,
  bytes:      bytes::Bytes,
}

fn multipart_error(e: MultipartError) -> ApiError {
  if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
    ApiError::PayloadTooLarge
  } else {
    ApiError::BadRequest(e.body_text())
  }
}

fn default_media_type(kind: MediaKind) -> &'static str {
  match kind {
    MediaKind::Image => "image/jpeg",
    MediaKind::Audio => "audio/mpeg",
  }
}

pub async fn upload<S, O>(
  State(state): State<AppState<S, O>>,
  RiderAuth(me): RiderAuth,
  mut multipart: Multipart,
) -> Result<impl IntoResponse, ApiError>
where
  S: DispatchStore + 'static,
  O: EtaOracle + 'static,
{
  let mut uploads = Vec::new();
  let mut contact: Option<String> = None;

  while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
    let kind = match field.name() {
      Some("image") => MediaKind::Image,
      Some("audio") => MediaKind::Audio,
      Some("mobile_number") => {
        let text = field.text().await.map_err(multipart_error)?;
        let text = text.trim();
        if !text.is_empty() {
          contact = Some(text.to_owned());
        }
        continue;
      }
      _ => continue,
    };

    let file_name = field
      .file_name()
      .map(str::to_owned)
      .unwrap_or_else(|| format!("{}-upload", kind.as_str()));
    let media_type = field
      .content_type()
      .map(str::to_owned)
      .unwrap_or_else(|| default_media_type(kind).to_owned());
    let bytes = field.bytes().await.map_err(multipart_error)?;
    if bytes.is_empty() {
      continue;
    }
    uploads.push(Upload { kind, file_name, media_type, bytes });
  }

  if uploads.is_empty() && contact.is_none() {
    return Err(ApiError::BadRequest(
      "expected an image, an audio file or a mobile_number".into(),
    ));
  }

  let mut session = state
    .store
    .media_session_for_rider(me.party_id)
    .await
    .map_err(ApiError::store)?;

  let mut artifacts = Vec::with_capacity(uploads.len());
  for upload in uploads {
    let blob = state.vault.write(upload.kind, &upload.file_name, &upload.bytes).await?;
    let artifact = state
      .store
      .record_artifact(NewArtifact {
        media_session_id: session.media_session_id,
        kind:             upload.kind,
        file_name:        upload.file_name,
        media_type:       upload.media_type,
        content_hash:     blob.content_hash,
        byte_len:         blob.byte_len,
      })
      .await
      .map_err(ApiError::store)?;
    artifacts.push(artifact);
  }

  if let Some(mobile) = contact {
    session = state
      .store
      .set_media_contact(me.party_id, mobile)
      .await
      .map_err(ApiError::store)?;
  }

  info!(
    rider_id = %me.party_id,
    media_session_id = %session.media_session_id,
    artifacts = artifacts.len(),
    "media uploaded"
  );

  if !artifacts.is_empty() {
    state.notifier.notify(NotificationJob::Media(MediaJob {
      rider_id:         me.party_id,
      media_session_id: session.media_session_id,
      artifacts:        artifacts.clone(),
    }));
  }

  Ok((
    StatusCode::CREATED,
    Json(UploadResponse {
      media_session_id: session.media_session_id,
      contact_mobile: session.contact_mobile,
      artifacts,
    }),
  ))
}
