use super::backoff::Backoff;
use super::connector::{Connector, SocketConnection};
use super::protocol::{errors_from_payload, ClientMessage, OperationPayload, ServerMessage};
use super::TransportError;
use crate::link::{FetchResult, LinkError};
use crate::status::{ConnectionStatus, StatusSnapshot};
use futures::{SinkExt, Stream, StreamExt};
use serde_json::Value;
use std::collections::HashMap;
use std::pin::Pin;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, Weak};
use std::task::{Context, Poll};
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::time::timeout;
use tracing::{debug, info, trace, warn};

/// Subscription client behavior
#[derive(Debug, Clone)]
pub struct ClientOptions {
    /// Re-establish the socket automatically after it drops
    pub reconnect: bool,
    /// Defer opening the socket until the first operation is issued
    pub lazy: bool,
    /// Give up after this many consecutive reconnect attempts (`None` = never)
    pub reconnection_attempts: Option<u32>,
    pub min_reconnect_delay: Duration,
    pub max_reconnect_delay: Duration,
    pub backoff_factor: f64,
    /// Share of each delay that is randomized (0.0 disables jitter)
    pub backoff_jitter: f64,
    /// Bound on socket open and on waiting for `connection_ack`
    pub connect_timeout: Duration,
    /// Payload of `connection_init`
    pub connection_params: Option<Value>,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            reconnect: true,
            lazy: true,
            reconnection_attempts: None,
            min_reconnect_delay: Duration::from_secs(1),
            max_reconnect_delay: Duration::from_secs(30),
            backoff_factor: 1.2,
            backoff_jitter: 0.5,
            connect_timeout: Duration::from_secs(10),
            connection_params: None,
        }
    }
}

type ResultSender = mpsc::UnboundedSender<Result<FetchResult, LinkError>>;

enum Command {
    Start {
        id: String,
        payload: OperationPayload,
        results: ResultSender,
    },
    Stop {
        id: String,
    },
    Close,
}

struct WorkerSlot {
    generation: u64,
    commands: mpsc::UnboundedSender<Command>,
}

struct Shared {
    uri: String,
    options: ClientOptions,
    connector: Arc<dyn Connector>,
    status: Arc<watch::Sender<StatusSnapshot>>,
    next_operation_id: AtomicU64,
    generation: AtomicU64,
    worker: Mutex<Option<WorkerSlot>>,
}

/// GraphQL-over-WebSocket client (`graphql-ws` subprotocol).
///
/// One background worker owns the socket, the active operations and the
/// reconnect loop. With `lazy` the worker and the socket are created by the
/// first [`request`](Self::request); otherwise at construction, which then
/// must happen inside a tokio runtime.
#[derive(Clone)]
pub struct SubscriptionClient {
    shared: Arc<Shared>,
}

impl SubscriptionClient {
    pub fn new(
        uri: impl Into<String>,
        options: ClientOptions,
        connector: Arc<dyn Connector>,
    ) -> Self {
        let (status, _) = watch::channel(StatusSnapshot::new(ConnectionStatus::Disconnected));
        let client = Self {
            shared: Arc::new(Shared {
                uri: uri.into(),
                options,
                connector,
                status: Arc::new(status),
                next_operation_id: AtomicU64::new(0),
                generation: AtomicU64::new(0),
                worker: Mutex::new(None),
            }),
        };

        if !client.shared.options.lazy {
            client.commands();
        }

        client
    }

    pub fn uri(&self) -> &str {
        &self.shared.uri
    }

    pub fn options(&self) -> &ClientOptions {
        &self.shared.options
    }

    pub fn status(&self) -> ConnectionStatus {
        self.shared.status.borrow().status
    }

    /// Receiver of connection status changes
    pub fn subscribe_status(&self) -> watch::Receiver<StatusSnapshot> {
        self.shared.status.subscribe()
    }

    /// Start an operation. Results arrive on the returned stream; dropping it
    /// before completion stops the operation on the server.
    pub fn request(&self, payload: OperationPayload) -> Subscription {
        let id = (self.shared.next_operation_id.fetch_add(1, Ordering::Relaxed) + 1).to_string();
        let (results, rx) = mpsc::unbounded_channel();
        let commands = self.commands();

        if let Err(mpsc::error::SendError(Command::Start { results, .. })) =
            commands.send(Command::Start {
                id: id.clone(),
                payload,
                results,
            })
        {
            let _ = results.send(Err(LinkError::Transport(TransportError::ConnectionClosed)));
        }

        Subscription {
            id,
            results: rx,
            commands,
            finished: false,
        }
    }

    /// Terminate the connection. Active operations complete; the next request
    /// opens a new connection.
    pub fn close(&self) {
        let slot = self.shared.worker.lock().unwrap().take();
        if let Some(slot) = slot {
            let _ = slot.commands.send(Command::Close);
        }
    }

    fn commands(&self) -> mpsc::UnboundedSender<Command> {
        let mut slot = self.shared.worker.lock().unwrap();
        if let Some(existing) = slot.as_ref() {
            if !existing.commands.is_closed() {
                return existing.commands.clone();
            }
        }

        let generation = self.shared.generation.fetch_add(1, Ordering::Relaxed) + 1;
        let (tx, rx) = mpsc::unbounded_channel();
        let worker = Worker {
            uri: self.shared.uri.clone(),
            options: self.shared.options.clone(),
            connector: Arc::clone(&self.shared.connector),
            status: Arc::clone(&self.shared.status),
            shared: Arc::downgrade(&self.shared),
            generation,
            commands: rx,
            operations: HashMap::new(),
            backoff: Backoff::new(
                self.shared.options.min_reconnect_delay,
                self.shared.options.max_reconnect_delay,
                self.shared.options.backoff_factor,
                self.shared.options.backoff_jitter,
            ),
        };
        debug!(uri = %self.shared.uri, generation, "Starting subscription worker");
        tokio::spawn(worker.run());

        *slot = Some(WorkerSlot {
            generation,
            commands: tx.clone(),
        });
        tx
    }
}

/// Result stream of one operation
pub struct Subscription {
    id: String,
    results: mpsc::UnboundedReceiver<Result<FetchResult, LinkError>>,
    commands: mpsc::UnboundedSender<Command>,
    finished: bool,
}

impl Subscription {
    pub fn id(&self) -> &str {
        &self.id
    }
}

impl Stream for Subscription {
    type Item = Result<FetchResult, LinkError>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let polled = self.results.poll_recv(cx);
        if let Poll::Ready(None) = polled {
            self.finished = true;
        }
        polled
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if !self.finished {
            let _ = self.commands.send(Command::Stop {
                id: self.id.clone(),
            });
        }
    }
}

struct ActiveOperation {
    payload: OperationPayload,
    results: ResultSender,
}

enum SessionEnd {
    /// Socket dropped; reconnect policy decides what happens next
    Dropped,
    /// Closed on request, or every handle to the client is gone
    Closed,
}

enum Exit {
    Closed,
    Failed,
}

struct Worker {
    uri: String,
    options: ClientOptions,
    connector: Arc<dyn Connector>,
    status: Arc<watch::Sender<StatusSnapshot>>,
    shared: Weak<Shared>,
    generation: u64,
    commands: mpsc::UnboundedReceiver<Command>,
    operations: HashMap<String, ActiveOperation>,
    backoff: Backoff,
}

impl Worker {
    async fn run(mut self) {
        let mut reconnecting = false;

        let exit = loop {
            self.set_status(if reconnecting {
                ConnectionStatus::Reconnecting
            } else {
                ConnectionStatus::Connecting
            });

            match self.open().await {
                Ok(connection) => {
                    self.backoff.reset();
                    match self.drive(connection).await {
                        SessionEnd::Closed => break Exit::Closed,
                        SessionEnd::Dropped => {
                            info!(uri = %self.uri, "WebSocket connection lost");
                        }
                    }
                }
                Err(e) => {
                    warn!(uri = %self.uri, error = %e, "WebSocket connection failed");
                }
            }

            self.set_status(ConnectionStatus::Disconnected);

            if !self.options.reconnect {
                break Exit::Failed;
            }
            if let Some(max) = self.options.reconnection_attempts {
                if self.backoff.attempts() >= max {
                    warn!(uri = %self.uri, attempts = max, "Giving up on reconnecting");
                    break Exit::Failed;
                }
            }

            let delay = self.backoff.next_delay();
            debug!(
                uri = %self.uri,
                attempt = self.backoff.attempts(),
                delay_ms = delay.as_millis() as u64,
                "Reconnecting after backoff"
            );
            if let SessionEnd::Closed = self.wait(delay).await {
                break Exit::Closed;
            }
            reconnecting = true;
        };

        self.shutdown(exit);
    }

    /// Open the socket, complete the handshake and resend active operations
    async fn open(&mut self) -> Result<SocketConnection, TransportError> {
        let limit = self.options.connect_timeout;

        let mut connection = timeout(limit, self.connector.connect(&self.uri))
            .await
            .map_err(|_| TransportError::Timeout)??;

        send(
            &mut connection,
            &ClientMessage::ConnectionInit {
                payload: self.options.connection_params.clone(),
            },
        )
        .await?;

        timeout(limit, await_ack(&mut connection))
            .await
            .map_err(|_| TransportError::Timeout)??;

        self.set_status(ConnectionStatus::Connected);
        info!(uri = %self.uri, operations = self.operations.len(), "WebSocket connected");

        // The server forgot every operation with the previous socket
        for (id, operation) in &self.operations {
            send(
                &mut connection,
                &ClientMessage::Start {
                    id: id.clone(),
                    payload: operation.payload.clone(),
                },
            )
            .await?;
        }

        Ok(connection)
    }

    /// Pump commands and server messages until the socket drops or the client closes
    async fn drive(&mut self, mut connection: SocketConnection) -> SessionEnd {
        loop {
            tokio::select! {
                command = self.commands.recv() => {
                    let Some(command) = command else {
                        terminate(&mut connection).await;
                        return SessionEnd::Closed;
                    };

                    match command {
                        Command::Start { id, payload, results } => {
                            let message = ClientMessage::Start {
                                id: id.clone(),
                                payload: payload.clone(),
                            };
                            self.operations.insert(id, ActiveOperation { payload, results });
                            if let Err(e) = send(&mut connection, &message).await {
                                warn!(error = %e, "Failed to send start");
                                return SessionEnd::Dropped;
                            }
                        }
                        Command::Stop { id } => {
                            if self.operations.remove(&id).is_some() {
                                if let Err(e) = send(&mut connection, &ClientMessage::Stop { id }).await {
                                    warn!(error = %e, "Failed to send stop");
                                    return SessionEnd::Dropped;
                                }
                            }
                        }
                        Command::Close => {
                            terminate(&mut connection).await;
                            return SessionEnd::Closed;
                        }
                    }
                }

                frame = connection.stream.next() => {
                    match frame {
                        Some(Ok(text)) => self.handle_frame(&text),
                        Some(Err(e)) => {
                            warn!(error = %e, "WebSocket error");
                            return SessionEnd::Dropped;
                        }
                        None => return SessionEnd::Dropped,
                    }
                }
            }
        }
    }

    fn handle_frame(&mut self, text: &str) {
        let message = match decode(text) {
            Ok(message) => message,
            Err(e) => {
                warn!(error = %e, "Ignoring malformed server message");
                return;
            }
        };

        match message {
            ServerMessage::Data { id, payload } => {
                if let Some(operation) = self.operations.get(&id) {
                    let _ = operation.results.send(Ok(payload));
                }
            }
            ServerMessage::Error { id, payload } => {
                if let Some(operation) = self.operations.remove(&id) {
                    let errors = errors_from_payload(payload);
                    let _ = operation.results.send(Err(LinkError::GraphQL(errors)));
                }
            }
            ServerMessage::Complete { id } => {
                self.operations.remove(&id);
            }
            ServerMessage::KeepAlive => trace!("Keep-alive received"),
            ServerMessage::ConnectionAck => debug!("Ignoring repeated connection_ack"),
            ServerMessage::ConnectionError { payload } => {
                warn!(payload = %payload, "Server reported a connection error");
            }
        }
    }

    /// Sleep out a backoff delay while still accepting commands
    async fn wait(&mut self, delay: Duration) -> SessionEnd {
        let sleep = tokio::time::sleep(delay);
        tokio::pin!(sleep);

        loop {
            tokio::select! {
                _ = &mut sleep => return SessionEnd::Dropped,
                command = self.commands.recv() => match command {
                    None | Some(Command::Close) => return SessionEnd::Closed,
                    Some(Command::Start { id, payload, results }) => {
                        self.operations.insert(id, ActiveOperation { payload, results });
                    }
                    Some(Command::Stop { id }) => {
                        self.operations.remove(&id);
                    }
                },
            }
        }
    }

    fn shutdown(mut self, exit: Exit) {
        let is_current = match self.shared.upgrade() {
            Some(shared) => {
                let mut slot = shared.worker.lock().unwrap();
                match slot.as_ref().map(|s| s.generation) {
                    Some(generation) if generation == self.generation => {
                        *slot = None;
                        true
                    }
                    Some(_) => false,
                    None => true,
                }
            }
            None => true,
        };

        // Commands that raced with the exit still get an answer
        self.commands.close();
        while let Ok(command) = self.commands.try_recv() {
            if let Command::Start { id, payload, results } = command {
                self.operations.insert(id, ActiveOperation { payload, results });
            }
        }

        for (_, operation) in self.operations.drain() {
            if let Exit::Failed = exit {
                let _ = operation
                    .results
                    .send(Err(LinkError::Transport(TransportError::ConnectionClosed)));
            }
        }

        // A newer worker owns the status now
        if is_current {
            self.set_status(ConnectionStatus::Disconnected);
        }
        debug!(uri = %self.uri, generation = self.generation, "Subscription worker stopped");
    }

    fn set_status(&self, status: ConnectionStatus) {
        self.status.send_if_modified(|snapshot| {
            if snapshot.status == status {
                return false;
            }
            *snapshot = StatusSnapshot::new(status);
            true
        });
    }
}

async fn await_ack(connection: &mut SocketConnection) -> Result<(), TransportError> {
    while let Some(frame) = connection.stream.next().await {
        match decode(&frame?)? {
            ServerMessage::ConnectionAck => return Ok(()),
            ServerMessage::ConnectionError { payload } => {
                return Err(TransportError::Rejected(payload.to_string()));
            }
            ServerMessage::KeepAlive => continue,
            other => debug!(message = ?other, "Ignoring message before connection_ack"),
        }
    }
    Err(TransportError::ConnectionClosed)
}

async fn terminate(connection: &mut SocketConnection) {
    let _ = send(connection, &ClientMessage::ConnectionTerminate).await;
    let _ = connection.sink.close().await;
}

async fn send(
    connection: &mut SocketConnection,
    message: &ClientMessage,
) -> Result<(), TransportError> {
    let text =
        serde_json::to_string(message).map_err(|e| TransportError::Protocol(e.to_string()))?;
    connection.sink.send(text).await
}

fn decode(text: &str) -> Result<ServerMessage, TransportError> {
    serde_json::from_str(text).map_err(|e| TransportError::Protocol(e.to_string()))
}
