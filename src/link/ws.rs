use super::{Link, NextLink, Operation, OperationStream};
use crate::transport::SubscriptionClient;
use futures::StreamExt;

/// Terminating link sending every operation over the subscription socket
pub struct WebSocketLink {
    client: SubscriptionClient,
}

impl WebSocketLink {
    pub fn new(client: SubscriptionClient) -> Self {
        Self { client }
    }
}

impl Link for WebSocketLink {
    fn name(&self) -> &'static str {
        "websocket"
    }

    fn request(&self, operation: Operation, _forward: NextLink) -> OperationStream {
        self.client.request(operation.payload()).boxed()
    }
}
