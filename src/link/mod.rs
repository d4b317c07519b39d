// Request/response link chain in front of the GraphQL transports

mod errors;
mod http;
mod operation;
mod split;
mod timing;
mod ws;


pub use errors::{ErrorLink, ErrorReporter, TracingErrorReporter};
pub use http::HttpLink;
pub use operation::{Context, Operation, OperationKind};
pub use split::SplitLink;
pub use timing::{LogTimeLink, TimeStartLink};
pub use ws::WebSocketLink;

use crate::transport::TransportError;
use futures::stream::{self, BoxStream, StreamExt};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::sync::Arc;

/// Results of one operation: a single item for queries and mutations, many for subscriptions
pub type OperationStream = BoxStream<'static, Result<FetchResult, LinkError>>;

/// One execution result as returned by a GraphQL server
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct FetchResult {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<GraphQLError>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extensions: Option<Value>,
}

impl FetchResult {
    pub fn from_data(data: Value) -> Self {
        Self {
            data: Some(data),
            ..Default::default()
        }
    }

    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphQLError {
    pub message: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub locations: Vec<Location>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<Vec<Value>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extensions: Option<Value>,
}

impl GraphQLError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            locations: Vec::new(),
            path: None,
            extensions: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Location {
    pub line: u32,
    pub column: u32,
}

/// Per-operation failures delivered to the caller
#[derive(Debug, Clone, PartialEq)]
pub enum LinkError {
    /// Socket transport failed underneath the operation
    Transport(TransportError),
    /// HTTP request failed or returned a non-success status
    Network { status: Option<u16>, message: String },
    /// Server rejected the operation
    GraphQL(Vec<GraphQLError>),
    /// Chain ran out of links before reaching a transport
    NoTerminatingLink,
    /// Operation finished without producing a result
    NoResult,
    Unsupported(String),
}

impl fmt::Display for LinkError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LinkError::Transport(e) => write!(f, "transport error: {}", e),
            LinkError::Network {
                status: Some(status),
                message,
            } => write!(f, "network error (HTTP {}): {}", status, message),
            LinkError::Network {
                status: None,
                message,
            } => write!(f, "network error: {}", message),
            LinkError::GraphQL(errors) => {
                let messages: Vec<&str> = errors.iter().map(|e| e.message.as_str()).collect();
                write!(f, "GraphQL error: {}", messages.join("; "))
            }
            LinkError::NoTerminatingLink => {
                write!(f, "link chain has no terminating link")
            }
            LinkError::NoResult => write!(f, "operation completed without a result"),
            LinkError::Unsupported(reason) => write!(f, "unsupported operation: {}", reason),
        }
    }
}

impl std::error::Error for LinkError {}

impl From<TransportError> for LinkError {
    fn from(e: TransportError) -> Self {
        LinkError::Transport(e)
    }
}

/// One interceptor in the chain.
///
/// A link receives the operation and the rest of the chain. Middleware links
/// call `forward.run(operation)` and may transform the returned stream;
/// terminating links ignore `forward` and talk to a transport.
pub trait Link: Send + Sync {
    fn name(&self) -> &'static str;

    fn request(&self, operation: Operation, forward: NextLink) -> OperationStream;
}

/// The remainder of a link chain, handed to each link
#[derive(Clone)]
pub struct NextLink {
    links: Arc<[Arc<dyn Link>]>,
    index: usize,
}

impl NextLink {
    pub fn run(self, operation: Operation) -> OperationStream {
        match self.links.get(self.index).cloned() {
            Some(link) => {
                let next = NextLink {
                    links: self.links,
                    index: self.index + 1,
                };
                link.request(operation, next)
            }
            None => {
                stream::once(async { Err::<FetchResult, _>(LinkError::NoTerminatingLink) }).boxed()
            }
        }
    }
}

/// Ordered list of links, outermost first
#[derive(Clone)]
pub struct LinkChain {
    links: Arc<[Arc<dyn Link>]>,
}

impl LinkChain {
    pub fn from_links(links: Vec<Arc<dyn Link>>) -> Self {
        Self {
            links: links.into(),
        }
    }

    pub fn execute(&self, operation: Operation) -> OperationStream {
        NextLink {
            links: Arc::clone(&self.links),
            index: 0,
        }
        .run(operation)
    }

    pub fn stage_names(&self) -> Vec<&'static str> {
        self.links.iter().map(|link| link.name()).collect()
    }
}

/// Build the dashboard chain. Stages, outermost first:
///
/// 1. `log-time`: on each result, logs `now - context.start`
/// 2. `time-start`
/// 3. `report-errors`: reports failures, passes them through untouched
/// 4. `time-start`: nearest the transport, so its write is the one `log-time` reads
/// 5. `transport`: the terminating link
pub fn dashboard_chain(
    reporter: Arc<dyn ErrorReporter>,
    timing: LogTimeLink,
    transport: Arc<dyn Link>,
) -> LinkChain {
    LinkChain::from_links(vec![
        Arc::new(timing),
        Arc::new(TimeStartLink),
        Arc::new(ErrorLink::new(reporter)),
        Arc::new(TimeStartLink),
        transport,
    ])
}
