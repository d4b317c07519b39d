// Connection status of the subscription socket, republished for the UI tree

use crate::transport::SubscriptionClient;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt;
use tokio::sync::watch;
use tokio_stream::wrappers::WatchStream;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionStatus {
    Disconnected,
    Connecting,
    Connected,
    Reconnecting,
}

impl ConnectionStatus {
    pub fn label(&self) -> &'static str {
        match self {
            ConnectionStatus::Disconnected => "Disconnected",
            ConnectionStatus::Connecting => "Connecting",
            ConnectionStatus::Connected => "Connected",
            ConnectionStatus::Reconnecting => "Reconnecting",
        }
    }

    pub fn is_connected(&self) -> bool {
        matches!(self, ConnectionStatus::Connected)
    }
}

impl fmt::Display for ConnectionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Status plus the time of the transition into it
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct StatusSnapshot {
    pub status: ConnectionStatus,
    pub since: DateTime<Utc>,
}

impl StatusSnapshot {
    pub fn new(status: ConnectionStatus) -> Self {
        Self {
            status,
            since: Utc::now(),
        }
    }
}

/// Read-only view of the socket status handed to UI components
#[derive(Debug, Clone)]
pub struct StatusHandle {
    rx: watch::Receiver<StatusSnapshot>,
}

impl StatusHandle {
    pub fn new(rx: watch::Receiver<StatusSnapshot>) -> Self {
        Self { rx }
    }

    pub fn current(&self) -> StatusSnapshot {
        *self.rx.borrow()
    }

    pub fn status(&self) -> ConnectionStatus {
        self.rx.borrow().status
    }

    /// Wait for the next transition. `None` once the transport is gone.
    pub async fn changed(&mut self) -> Option<StatusSnapshot> {
        self.rx.changed().await.ok()?;
        Some(*self.rx.borrow_and_update())
    }

    /// Wait until the transport reaches `status` (returns at once if it already has)
    pub async fn wait_for(&mut self, status: ConnectionStatus) -> Option<StatusSnapshot> {
        self.rx
            .wait_for(|snapshot| snapshot.status == status)
            .await
            .ok()
            .map(|snapshot| *snapshot)
    }

    /// Current snapshot followed by every later transition
    pub fn stream(&self) -> WatchStream<StatusSnapshot> {
        WatchStream::new(self.rx.clone())
    }
}

/// Wraps the UI tree with the socket's live status.
///
/// Only observes the transport; reconnecting is the transport's job.
pub struct WebsocketStatusProvider {
    handle: StatusHandle,
}

impl WebsocketStatusProvider {
    pub fn new(websocket: &SubscriptionClient) -> Self {
        Self {
            handle: StatusHandle::new(websocket.subscribe_status()),
        }
    }

    pub fn handle(&self) -> StatusHandle {
        self.handle.clone()
    }

    pub fn status(&self) -> ConnectionStatus {
        self.handle.status()
    }
}
