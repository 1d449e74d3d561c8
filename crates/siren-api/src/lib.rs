//! HTTP surface for Siren.
//!
//! Exposes an axum [`Router`] backed by any [`siren_core::store::DispatchStore`]
//! and [`siren_core::eta::EtaOracle`]: JSON endpoints for riders, drivers and
//! assignments, plus the driver push socket at `/ws/driver`.
//!
//! # Wiring
//!
//! ```rust,ignore
//! let (state, worker) = AppState::new(store, oracle, vault, settings);
//! worker.spawn();
//! axum::serve(listener, siren_api::router(state)).await?;
//! ```

pub mod auth;
pub mod error;
pub mod handlers;
pub mod token;
pub mod vault;
pub mod ws;

use std::{sync::Arc, time::Duration};

use axum::{
  Router,
  extract::DefaultBodyLimit,
  routing::{get, post, put},
};
use siren_core::{
  dispatch::DispatchEngine,
  eta::{EtaOracle, EtaPolicy},
  notify::{NotificationDispatcher, NotificationJob, NotificationQueue},
  registry::ConnectionRegistry,
  store::DispatchStore,
};
use tokio::{sync::mpsc, task::JoinHandle};
use tower_http::trace::TraceLayer;

pub use error::ApiError;

use crate::{token::JwtIdentityService, vault::DiskMediaVault};

// ─── Settings ────────────────────────────────────────────────────────────────

/// Tunables for the HTTP layer and everything it owns.
#[derive(Debug, Clone)]
pub struct ApiSettings {
  pub token_secret:      String,
  pub token_ttl:         chrono::Duration,
  pub eta:               EtaPolicy,
  /// Free-text prompt sent with every assignment notification.
  pub assignment_prompt: String,
  pub queue_depth:       usize,
  pub channel_buffer:    usize,
  pub max_upload_bytes:  usize,
  pub ping_interval:     Duration,
  pub idle_timeout:      Duration,
}

impl ApiSettings {
  pub fn new(token_secret: impl Into<String>) -> Self {
    Self {
      token_secret:      token_secret.into(),
      token_ttl:         chrono::Duration::minutes(token::DEFAULT_TOKEN_TTL_MINUTES),
      eta:               EtaPolicy::default(),
      assignment_prompt: "New emergency request. Please respond.".to_owned(),
      queue_depth:       1024,
      channel_buffer:    32,
      max_upload_bytes:  16 * 1024 * 1024,
      ping_interval:     Duration::from_secs(15),
      idle_timeout:      Duration::from_secs(45),
    }
  }
}

// ─── Application state ───────────────────────────────────────────────────────

/// Shared state threaded through all axum handlers.
pub struct AppState<S, O> {
  pub store:    Arc<S>,
  pub engine:   Arc<DispatchEngine<S, O, NotificationQueue>>,
  pub notifier: NotificationQueue,
  pub registry: Arc<ConnectionRegistry>,
  pub identity: Arc<JwtIdentityService<S>>,
  pub vault:    Arc<DiskMediaVault>,
  pub settings: Arc<ApiSettings>,
}

// Derive would demand `S: Clone` and `O: Clone`.
impl<S, O> Clone for AppState<S, O> {
  fn clone(&self) -> Self {
    Self {
      store:    self.store.clone(),
      engine:   self.engine.clone(),
      notifier: self.notifier.clone(),
      registry: self.registry.clone(),
      identity: self.identity.clone(),
      vault:    self.vault.clone(),
      settings: self.settings.clone(),
    }
  }
}

impl<S, O> AppState<S, O>
where
  S: DispatchStore + 'static,
  O: EtaOracle + 'static,
{
  /// Build the state and the notification worker that drains its queue. The
  /// worker must be spawned for drivers to receive anything.
  pub fn new(
    store: Arc<S>,
    oracle: Arc<O>,
    vault: Arc<DiskMediaVault>,
    settings: ApiSettings,
  ) -> (Self, NotificationWorker<S>) {
    let (notifier, jobs) = NotificationQueue::new(settings.queue_depth);
    let registry = Arc::new(ConnectionRegistry::new(settings.channel_buffer));
    let engine = Arc::new(DispatchEngine::new(
      store.clone(),
      oracle,
      notifier.clone(),
      settings.eta,
    ));
    let identity = Arc::new(JwtIdentityService::new(
      store.clone(),
      settings.token_secret.as_bytes(),
      settings.token_ttl,
    ));
    let dispatcher = NotificationDispatcher::new(
      store.clone(),
      registry.clone(),
      vault.clone(),
      settings.assignment_prompt.clone(),
    );

    let state = Self {
      store,
      engine,
      notifier,
      registry,
      identity,
      vault,
      settings: Arc::new(settings),
    };
    (state, NotificationWorker { dispatcher, jobs })
  }
}

/// The background half of [`AppState`]: delivers queued notifications.
pub struct NotificationWorker<S> {
  dispatcher: NotificationDispatcher<S, DiskMediaVault>,
  jobs:       mpsc::Receiver<NotificationJob>,
}

impl<S: DispatchStore + 'static> NotificationWorker<S> {
  pub fn spawn(self) -> JoinHandle<()> { self.dispatcher.spawn(self.jobs) }
}

// ─── Router ──────────────────────────────────────────────────────────────────

/// Build the full Siren router for `state`.
pub fn router<S, O>(state: AppState<S, O>) -> Router
where
  S: DispatchStore + 'static,
  O: EtaOracle + 'static,
{
  use handlers::{assignments, drivers, login, media, riders};

  let body_limit = state.settings.max_upload_bytes;

  Router::new()
    .route("/health", get(|| async { "ok" }))
    // Identity
    .route("/auth/login", post(login::login::<S, O>))
    .route("/riders", post(riders::register::<S, O>))
    .route("/drivers", post(drivers::register::<S, O>))
    // Riders
    .route(
      "/riders/me/location",
      get(riders::get_location::<S, O>).post(riders::report_location::<S, O>),
    )
    .route("/riders/me/assignment", get(riders::get_assignment::<S, O>))
    .route("/riders/me/media", post(media::upload::<S, O>))
    // Drivers
    .route("/drivers/me/location", put(drivers::report_location::<S, O>))
    .route("/drivers/me/availability", put(drivers::set_availability::<S, O>))
    .route("/assignments/{id}/respond", post(assignments::respond::<S, O>))
    .route("/ws/driver", get(ws::upgrade::<S, O>))
    .layer(DefaultBodyLimit::max(body_limit))
    .layer(TraceLayer::new_for_http())
    .with_state(state)
}
