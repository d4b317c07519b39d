use super::connector::{Connector, SocketConnection};
use super::protocol::{ClientMessage, ServerMessage};
use super::TransportError;
use async_trait::async_trait;
use futures::channel::mpsc as frames;
use futures::{SinkExt, StreamExt};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;

struct MemoryInner {
    attempts: AtomicUsize,
    refusing: AtomicBool,
    accepted: mpsc::UnboundedSender<MemorySocket>,
}

/// In-process connector. Every successful connect hands the server side of
/// the socket to the paired [`MemoryServer`].
#[derive(Clone)]
pub struct MemoryConnector {
    inner: Arc<MemoryInner>,
}

/// Accepting end of a [`MemoryConnector`]
pub struct MemoryServer {
    inner: Arc<MemoryInner>,
    accepted: mpsc::UnboundedReceiver<MemorySocket>,
}

/// Server side of one in-memory socket. Dropping it drops the connection.
pub struct MemorySocket {
    incoming: frames::UnboundedReceiver<String>,
    outgoing: frames::UnboundedSender<String>,
}

pub fn memory_pair() -> (MemoryConnector, MemoryServer) {
    let (tx, rx) = mpsc::unbounded_channel();
    let inner = Arc::new(MemoryInner {
        attempts: AtomicUsize::new(0),
        refusing: AtomicBool::new(false),
        accepted: tx,
    });
    (
        MemoryConnector {
            inner: Arc::clone(&inner),
        },
        MemoryServer {
            inner,
            accepted: rx,
        },
    )
}

#[async_trait]
impl Connector for MemoryConnector {
    async fn connect(&self, _uri: &str) -> Result<SocketConnection, TransportError> {
        self.inner.attempts.fetch_add(1, Ordering::SeqCst);
        if self.inner.refusing.load(Ordering::SeqCst) {
            return Err(TransportError::Connect("connection refused".to_string()));
        }

        let (to_server, incoming) = frames::unbounded::<String>();
        let (outgoing, to_client) = frames::unbounded::<String>();

        self.inner
            .accepted
            .send(MemorySocket { incoming, outgoing })
            .map_err(|_| TransportError::Connect("memory server is gone".to_string()))?;

        Ok(SocketConnection {
            sink: Box::pin(to_server.sink_map_err(|e| TransportError::Socket(e.to_string()))),
            stream: to_client.map(Ok).boxed(),
        })
    }
}

impl MemoryServer {
    /// Wait for the next connection
    pub async fn accept(&mut self) -> Option<MemorySocket> {
        self.accepted.recv().await
    }

    /// Connection attempts made so far, refused ones included
    pub fn attempts(&self) -> usize {
        self.inner.attempts.load(Ordering::SeqCst)
    }

    /// Refuse (or stop refusing) new connections
    pub fn set_refusing(&self, refusing: bool) {
        self.inner.refusing.store(refusing, Ordering::SeqCst);
    }
}

impl MemorySocket {
    /// Next message from the client; `None` once the client closed the socket.
    /// Frames that are not valid protocol messages are skipped.
    pub async fn recv(&mut self) -> Option<ClientMessage> {
        while let Some(text) = self.incoming.next().await {
            if let Ok(message) = serde_json::from_str(&text) {
                return Some(message);
            }
        }
        None
    }

    /// Send a message to the client; false if the client is gone
    pub fn send(&self, message: &ServerMessage) -> bool {
        match serde_json::to_string(message) {
            Ok(text) => self.send_raw(text),
            Err(_) => false,
        }
    }

    pub fn send_raw(&self, text: impl Into<String>) -> bool {
        self.outgoing.unbounded_send(text.into()).is_ok()
    }
}
