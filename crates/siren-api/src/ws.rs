//! `GET /ws/driver`: the driver push channel.
//!
//! The driver authenticates with a bearer token in the `Authorization` header
//! or a `?token=` query parameter. Credentials are checked before the upgrade
//! handshake is validated, so a bad token is a 401/403 even on a malformed
//! handshake.
//!
//! Once upgraded, the session forwards registry frames as text messages,
//! pings on an interval, and hangs up after a period of client silence. Any
//! inbound frame, pongs included, counts as activity; its content is ignored.

use std::time::Duration;

use axum::{
  extract::{
    Query, State,
    ws::{Message, WebSocket, WebSocketUpgrade, rejection::WebSocketUpgradeRejection},
  },
  http::HeaderMap,
  response::{IntoResponse, Response},
};
use bytes::Bytes;
use serde::Deserialize;
use siren_core::{eta::EtaOracle, party::PartyKind, registry::ConnectionRegistry, store::DispatchStore};
use tokio::time::{self, Instant, MissedTickBehavior};
use tracing::{debug, info};
use uuid::Uuid;

use crate::{
  AppState,
  auth::{authenticate, bearer_token},
  error::ApiError,
};

#[derive(Debug, Deserialize)]
pub struct WsQuery {
  pub token: Option<String>,
}

pub async fn upgrade<S, O>(
  State(state): State<AppState<S, O>>,
  Query(query): Query<WsQuery>,
  headers: HeaderMap,
  ws: Result<WebSocketUpgrade, WebSocketUpgradeRejection>,
) -> Result<Response, ApiError>
where
  S: DispatchStore + 'static,
  O: EtaOracle + 'static,
{
  let token = bearer_token(&headers)
    .or(query.token.as_deref())
    .ok_or(ApiError::MissingToken)?;
  let driver = authenticate(&state, token, PartyKind::Driver).await?;
  let ws = match ws {
    Ok(ws) => ws,
    Err(rejection) => return Ok(rejection.into_response()),
  };

  let registry = state.registry.clone();
  let timing = Timing {
    ping: state.settings.ping_interval,
    idle: state.settings.idle_timeout,
  };
  Ok(ws.on_upgrade(move |socket| run_session(socket, registry, driver.party_id, timing)))
}

#[derive(Debug, Clone, Copy)]
struct Timing {
  ping: Duration,
  idle: Duration,
}

/// Why a session ended.
#[derive(Debug)]
enum End {
  ClientClosed,
  IdleTimeout,
  /// The registry dropped our sender: a newer connection took over.
  Evicted,
  Network(axum::Error),
}

async fn run_session(
  mut socket: WebSocket,
  registry: std::sync::Arc<ConnectionRegistry>,
  driver_id: Uuid,
  timing: Timing,
) {
  let mut connection = registry.connect(driver_id).await;
  info!(%driver_id, connection = %connection.id, "driver socket open");

  let mut last_seen = Instant::now();
  let mut ticker = time::interval(timing.ping);
  ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

  let end = loop {
    tokio::select! {
      _ = ticker.tick() => {
        if last_seen.elapsed() > timing.idle {
          break End::IdleTimeout;
        }
        if let Err(e) = socket.send(Message::Ping(Bytes::new())).await {
          break End::Network(e);
        }
      }
      frame = connection.outbound.recv() => {
        let Some(payload) = frame else {
          break End::Evicted;
        };
        if let Err(e) = socket.send(Message::Text(payload.into())).await {
          break End::Network(e);
        }
      }
      inbound = socket.recv() => {
        match inbound {
          Some(Ok(Message::Close(_))) | None => break End::ClientClosed,
          Some(Ok(_)) => last_seen = Instant::now(),
          Some(Err(e)) => break End::Network(e),
        }
      }
    }
  };

  if !matches!(end, End::ClientClosed | End::Network(_)) {
    let _ = socket.send(Message::Close(None)).await;
  }
  let removed = registry.disconnect(driver_id, connection.id).await;
  debug!(%driver_id, connection = %connection.id, ?end, removed, "driver socket closed");
}
