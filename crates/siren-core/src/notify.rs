//! Driver notifications: composition, the outbound queue, and delivery.
//!
//! Request paths hand a [`NotificationJob`] to a [`Notifier`] and return
//! immediately. A [`NotificationDispatcher`] drains the queue on its own task,
//! builds the [`DriverNotification`] payload and pushes it through the
//! [`ConnectionRegistry`]. Nothing here reports failure back to the request
//! that triggered it; outcomes are only logged.

use std::{sync::Arc, time::Duration};

use base64::{Engine as _, engine::general_purpose::STANDARD as B64};
use serde::{Deserialize, Serialize};
use tokio::{sync::mpsc, task::JoinHandle};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::{
  Error, Result,
  assignment::Assignment,
  eta::serialize_secs,
  location::{Location, LocationSnapshot},
  media::{MediaArtifact, MediaKind, MediaVault},
  party::RiderProfile,
  registry::{ConnectionRegistry, Delivery},
  store::DispatchStore,
};

// ─── Jobs ────────────────────────────────────────────────────────────────────

/// Work handed off by a request path.
#[derive(Debug, Clone)]
pub enum NotificationJob {
  Assignment(AssignmentJob),
  Media(MediaJob),
}

/// Emitted once per successful dispatch.
#[derive(Debug, Clone)]
pub struct AssignmentJob {
  pub assignment:       Assignment,
  pub rider_location:   Location,
  pub media_session_id: Uuid,
  pub eta:              Duration,
}

/// Emitted whenever a rider uploads a batch of media.
#[derive(Debug, Clone)]
pub struct MediaJob {
  pub rider_id:         Uuid,
  pub media_session_id: Uuid,
  pub artifacts:        Vec<MediaArtifact>,
}

/// Fire-and-forget hand-off. Implementations must not block or fail the
/// caller.
pub trait Notifier: Send + Sync {
  fn notify(&self, job: NotificationJob);
}

/// A bounded in-process queue. A full or closed queue drops the job.
#[derive(Debug, Clone)]
pub struct NotificationQueue {
  tx: mpsc::Sender<NotificationJob>,
}

impl NotificationQueue {
  pub fn new(depth: usize) -> (Self, mpsc::Receiver<NotificationJob>) {
    let (tx, rx) = mpsc::channel(depth.max(1));
    (Self { tx }, rx)
  }
}

impl Notifier for NotificationQueue {
  fn notify(&self, job: NotificationJob) {
    if let Err(e) = self.tx.try_send(job) {
      warn!(error = %e, "notification queue rejected job; dropping");
    }
  }
}

// ─── Payloads ────────────────────────────────────────────────────────────────

/// A frame pushed to a driver's live channel.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DriverNotification {
  Assignment(AssignmentNotice),
  Media(MediaNotice),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssignmentNotice {
  pub assignment_id:    Uuid,
  pub rider:            RiderProfile,
  pub location:         LocationSnapshot,
  /// Free-text prompt shown to the driver.
  pub message:          String,
  pub media_session_id: Uuid,
  #[serde(rename = "eta_seconds", serialize_with = "serialize_secs", skip_deserializing)]
  pub eta:              Duration,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MediaNotice {
  pub assignment_id:    Uuid,
  pub rider_id:         Uuid,
  pub media_session_id: Uuid,
  pub contact_mobile:   Option<String>,
  pub artifacts:        Vec<EncodedArtifact>,
}

/// An artifact with its bytes inlined as standard base64.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EncodedArtifact {
  pub artifact_id: Uuid,
  pub kind:        MediaKind,
  pub file_name:   String,
  pub media_type:  String,
  pub data:        String,
}

// ─── Dispatcher ──────────────────────────────────────────────────────────────

/// Drains [`NotificationJob`]s and delivers them to drivers.
pub struct NotificationDispatcher<S, V> {
  store:    Arc<S>,
  registry: Arc<ConnectionRegistry>,
  vault:    Arc<V>,
  prompt:   String,
}

impl<S, V> NotificationDispatcher<S, V>
where
  S: DispatchStore + 'static,
  V: MediaVault + 'static,
{
  pub fn new(
    store: Arc<S>,
    registry: Arc<ConnectionRegistry>,
    vault: Arc<V>,
    prompt: impl Into<String>,
  ) -> Self {
    Self { store, registry, vault, prompt: prompt.into() }
  }

  /// Run on a background task until every [`NotificationQueue`] is dropped.
  pub fn spawn(self, jobs: mpsc::Receiver<NotificationJob>) -> JoinHandle<()> {
    tokio::spawn(self.run(jobs))
  }

  pub async fn run(self, mut jobs: mpsc::Receiver<NotificationJob>) {
    while let Some(job) = jobs.recv().await {
      self.handle(job).await;
    }
    debug!("notification queue closed");
  }

  /// Deliver one job. Returns `None` when there was nobody to notify.
  pub async fn handle(&self, job: NotificationJob) -> Option<Delivery> {
    let result = match job {
      NotificationJob::Assignment(job) => self.deliver_assignment(job).await,
      NotificationJob::Media(job) => self.deliver_media(job).await,
    };
    match result {
      Ok(delivery) => delivery,
      Err(e) => {
        warn!(error = %e, "notification could not be composed");
        None
      }
    }
  }

  async fn deliver_assignment(&self, job: AssignmentJob) -> Result<Option<Delivery>> {
    let assignment = job.assignment;
    let rider = self
      .store
      .get_rider(assignment.rider_id)
      .await
      .map_err(Error::store)?
      .ok_or(Error::RiderNotFound(assignment.rider_id))?;

    let notice = DriverNotification::Assignment(AssignmentNotice {
      assignment_id:    assignment.assignment_id,
      rider:            rider.profile(),
      location:         LocationSnapshot::from(Some(&job.rider_location)),
      message:          self.prompt.clone(),
      media_session_id: job.media_session_id,
      eta:              job.eta,
    });

    let delivery = self.push(assignment.driver_id, &notice).await?;
    info!(
      assignment_id = %assignment.assignment_id,
      driver_id = %assignment.driver_id,
      ?delivery,
      "assignment notification"
    );
    Ok(Some(delivery))
  }

  async fn deliver_media(&self, job: MediaJob) -> Result<Option<Delivery>> {
    let Some(assignment) = self
      .store
      .get_open_assignment_for_rider(job.rider_id)
      .await
      .map_err(Error::store)?
    else {
      debug!(rider_id = %job.rider_id, "no open assignment; media notification skipped");
      return Ok(None);
    };

    // Reading and encoding is the expensive part; skip it for offline drivers.
    if !self.registry.is_connected(assignment.driver_id).await {
      info!(driver_id = %assignment.driver_id, "driver offline; media notification dropped");
      return Ok(Some(Delivery::Offline));
    }

    let session = self
      .store
      .media_session_for_rider(job.rider_id)
      .await
      .map_err(Error::store)?;

    let mut artifacts = Vec::with_capacity(job.artifacts.len());
    for artifact in &job.artifacts {
      match self.vault.read(artifact).await {
        Ok(bytes) => artifacts.push(EncodedArtifact {
          artifact_id: artifact.artifact_id,
          kind:        artifact.kind,
          file_name:   artifact.file_name.clone(),
          media_type:  artifact.media_type.clone(),
          data:        B64.encode(bytes),
        }),
        Err(e) => {
          warn!(artifact_id = %artifact.artifact_id, error = %e, "skipping unreadable artifact");
        }
      }
    }

    let notice = DriverNotification::Media(MediaNotice {
      assignment_id:    assignment.assignment_id,
      rider_id:         job.rider_id,
      media_session_id: job.media_session_id,
      contact_mobile:   session.contact_mobile,
      artifacts,
    });

    let delivery = self.push(assignment.driver_id, &notice).await?;
    info!(
      assignment_id = %assignment.assignment_id,
      driver_id = %assignment.driver_id,
      artifacts = job.artifacts.len(),
      ?delivery,
      "media notification"
    );
    Ok(Some(delivery))
  }

  async fn push(&self, driver_id: Uuid, notice: &DriverNotification) -> Result<Delivery> {
    let payload = serde_json::to_string(notice)?;
    Ok(self.registry.send_best_effort(driver_id, payload).await)
  }
}
