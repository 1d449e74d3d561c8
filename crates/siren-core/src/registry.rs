//! The connection registry: driver id → live push channel.
//!
//! The registry exclusively owns the channel handles. Each driver has at most
//! one channel; connecting again replaces the old handle without closing it.
//! Delivery is at-most-once: a send to an absent or backed-up channel is
//! dropped, never queued or retried.

use std::{collections::HashMap, fmt};

use tokio::sync::{RwLock, mpsc, mpsc::error::TrySendError};
use tracing::debug;
use uuid::Uuid;

/// Identifies one physical connection, so a stale disconnect from an evicted
/// socket cannot remove its replacement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionId(Uuid);

impl ConnectionId {
  fn new() -> Self { Self(Uuid::new_v4()) }
}

impl fmt::Display for ConnectionId {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { self.0.fmt(f) }
}

/// Handed to the transport on connect. The transport drains `outbound` onto
/// the wire; the stream ends once the registry drops the sending half.
pub struct Connection {
  pub id:       ConnectionId,
  pub outbound: mpsc::Receiver<String>,
}

/// Result of a best-effort send. Never an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
  /// Handed to the driver's channel.
  Sent,
  /// No live channel for the driver.
  Offline,
  /// The channel is backed up; the payload was discarded.
  Dropped,
}

struct Channel {
  id: ConnectionId,
  tx: mpsc::Sender<String>,
}

pub struct ConnectionRegistry {
  channels: RwLock<HashMap<Uuid, Channel>>,
  buffer:   usize,
}

impl ConnectionRegistry {
  /// `buffer` is the per-driver outbound frame capacity.
  pub fn new(buffer: usize) -> Self {
    Self { channels: RwLock::new(HashMap::new()), buffer: buffer.max(1) }
  }

  /// Register a fresh channel as the driver's live connection, evicting any
  /// previous one.
  pub async fn connect(&self, driver_id: Uuid) -> Connection {
    let (tx, outbound) = mpsc::channel(self.buffer);
    let id = ConnectionId::new();

    let evicted = self.channels.write().await.insert(driver_id, Channel { id, tx });
    match evicted {
      Some(old) => debug!(%driver_id, connection = %id, evicted = %old.id, "driver reconnected"),
      None => debug!(%driver_id, connection = %id, "driver connected"),
    }

    Connection { id, outbound }
  }

  /// Remove the driver's mapping if it is still `connection`. Returns whether
  /// anything was removed; a miss is not an error.
  pub async fn disconnect(&self, driver_id: Uuid, connection: ConnectionId) -> bool {
    let mut channels = self.channels.write().await;
    match channels.get(&driver_id) {
      Some(channel) if channel.id == connection => {
        channels.remove(&driver_id);
        debug!(%driver_id, %connection, "driver disconnected");
        true
      }
      _ => false,
    }
  }

  /// Attempt a single send to the driver's current channel.
  pub async fn send_best_effort(&self, driver_id: Uuid, payload: String) -> Delivery {
    let channels = self.channels.read().await;
    let Some(channel) = channels.get(&driver_id) else {
      return Delivery::Offline;
    };
    match channel.tx.try_send(payload) {
      Ok(()) => Delivery::Sent,
      Err(TrySendError::Full(_)) => Delivery::Dropped,
      Err(TrySendError::Closed(_)) => Delivery::Offline,
    }
  }

  /// Liveness check for callers that want to skip expensive work.
  pub async fn is_connected(&self, driver_id: Uuid) -> bool {
    self
      .channels
      .read()
      .await
      .get(&driver_id)
      .is_some_and(|channel| !channel.tx.is_closed())
  }
}
