use super::{FetchResult, Link, LinkError, NextLink, Operation, OperationKind, OperationStream};
use crate::transport::OperationPayload;
use futures::stream::{self, StreamExt};
use reqwest::Url;
use tracing::debug;

/// Terminating link POSTing queries and mutations to a GraphQL HTTP endpoint
pub struct HttpLink {
    http: reqwest::Client,
    uri: Url,
}

impl HttpLink {
    pub fn new(uri: Url) -> Self {
        Self::with_client(reqwest::Client::new(), uri)
    }

    pub fn with_client(http: reqwest::Client, uri: Url) -> Self {
        Self { http, uri }
    }

    pub fn uri(&self) -> &Url {
        &self.uri
    }
}

impl Link for HttpLink {
    fn name(&self) -> &'static str {
        "http"
    }

    fn request(&self, operation: Operation, _forward: NextLink) -> OperationStream {
        if operation.kind() == OperationKind::Subscription {
            let error = LinkError::Unsupported(format!(
                "subscription '{}' cannot be sent over HTTP",
                operation.display_name()
            ));
            return stream::once(async move { Err::<FetchResult, _>(error) }).boxed();
        }

        let http = self.http.clone();
        let uri = self.uri.clone();
        let payload = operation.payload();
        stream::once(post(http, uri, payload)).boxed()
    }
}

async fn post(
    http: reqwest::Client,
    uri: Url,
    payload: OperationPayload,
) -> Result<FetchResult, LinkError> {
    debug!(uri = %uri, operation = ?payload.operation_name, "POST GraphQL operation");

    let response = http
        .post(uri)
        .json(&payload)
        .send()
        .await
        .map_err(|e| LinkError::Network {
            status: e.status().map(|s| s.as_u16()),
            message: e.to_string(),
        })?;

    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(LinkError::Network {
            status: Some(status.as_u16()),
            message: body,
        });
    }

    response
        .json::<FetchResult>()
        .await
        .map_err(|e| LinkError::Network {
            status: Some(status.as_u16()),
            message: format!("invalid response body: {}", e),
        })
}
