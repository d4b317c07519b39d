use crate::link::{FetchResult, GraphQLError};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// WebSocket subprotocol negotiated with the server
pub const GRAPHQL_WS_PROTOCOL: &str = "graphql-ws";

/// Operation body: HTTP request body and socket `start` payload
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OperationPayload {
    pub query: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub variables: Option<Value>,
    #[serde(
        rename = "operationName",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub operation_name: Option<String>,
}

/// Client → Server message types
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ClientMessage {
    #[serde(rename = "connection_init")]
    ConnectionInit {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        payload: Option<Value>,
    },
    #[serde(rename = "start")]
    Start { id: String, payload: OperationPayload },
    #[serde(rename = "stop")]
    Stop { id: String },
    #[serde(rename = "connection_terminate")]
    ConnectionTerminate,
}

/// Server → Client message types
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ServerMessage {
    #[serde(rename = "connection_ack")]
    ConnectionAck,
    #[serde(rename = "connection_error")]
    ConnectionError {
        #[serde(default)]
        payload: Value,
    },
    #[serde(rename = "ka")]
    KeepAlive,
    #[serde(rename = "data")]
    Data { id: String, payload: FetchResult },
    #[serde(rename = "error")]
    Error { id: String, payload: Value },
    #[serde(rename = "complete")]
    Complete { id: String },
}

/// Decode the payload of an `error` message.
///
/// Servers send either a list of GraphQL errors or a single error object;
/// anything else is kept verbatim as the message.
pub fn errors_from_payload(payload: Value) -> Vec<GraphQLError> {
    match payload {
        Value::Array(items) => items.into_iter().map(error_from_value).collect(),
        other => vec![error_from_value(other)],
    }
}

fn error_from_value(value: Value) -> GraphQLError {
    match serde_json::from_value::<GraphQLError>(value.clone()) {
        Ok(error) => error,
        Err(_) => match value {
            Value::String(message) => GraphQLError::new(message),
            other => GraphQLError::new(other.to_string()),
        },
    }
}
