use super::protocol::GRAPHQL_WS_PROTOCOL;
use super::TransportError;
use async_trait::async_trait;
use futures::future;
use futures::sink::Sink;
use futures::stream::{BoxStream, StreamExt};
use futures::SinkExt;
use std::pin::Pin;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::http::header::SEC_WEBSOCKET_PROTOCOL;
use tokio_tungstenite::tungstenite::http::HeaderValue;
use tokio_tungstenite::tungstenite::{self, Message};
use tracing::debug;

/// Outgoing text frames
pub type FrameSink = Pin<Box<dyn Sink<String, Error = TransportError> + Send>>;

/// Incoming text frames; ends when the socket closes
pub type FrameStream = BoxStream<'static, Result<String, TransportError>>;

/// An open socket, reduced to text frames in both directions
pub struct SocketConnection {
    pub sink: FrameSink,
    pub stream: FrameStream,
}

/// Opens sockets for the subscription client
#[async_trait]
pub trait Connector: Send + Sync {
    async fn connect(&self, uri: &str) -> Result<SocketConnection, TransportError>;
}

/// Network connector backed by tokio-tungstenite
#[derive(Debug, Clone, Copy, Default)]
pub struct TungsteniteConnector;

#[async_trait]
impl Connector for TungsteniteConnector {
    async fn connect(&self, uri: &str) -> Result<SocketConnection, TransportError> {
        let mut request = uri
            .into_client_request()
            .map_err(|e| TransportError::Connect(e.to_string()))?;
        request.headers_mut().insert(
            SEC_WEBSOCKET_PROTOCOL,
            HeaderValue::from_static(GRAPHQL_WS_PROTOCOL),
        );

        debug!(uri = %uri, "Opening WebSocket");
        let (socket, _response) = connect_async(request)
            .await
            .map_err(|e| TransportError::Connect(e.to_string()))?;

        let (write, read) = socket.split();

        let sink = write
            .with(|text: String| future::ready(Ok::<_, tungstenite::Error>(Message::Text(text))))
            .sink_map_err(|e| TransportError::Socket(e.to_string()));

        let stream = read.filter_map(|frame| {
            future::ready(match frame {
                Ok(Message::Text(text)) => Some(Ok(text)),
                // Ping/pong are answered by tungstenite; close ends the stream
                Ok(_) => None,
                Err(e) => Some(Err(TransportError::Socket(e.to_string()))),
            })
        });

        Ok(SocketConnection {
            sink: Box::pin(sink),
            stream: stream.boxed(),
        })
    }
}
