use super::{Link, NextLink, Operation, OperationKind, OperationStream};
use std::sync::Arc;

/// Terminating link routing subscriptions and other operations to different transports
pub struct SplitLink {
    subscriptions: Arc<dyn Link>,
    operations: Arc<dyn Link>,
}

impl SplitLink {
    pub fn new(subscriptions: Arc<dyn Link>, operations: Arc<dyn Link>) -> Self {
        Self {
            subscriptions,
            operations,
        }
    }
}

impl Link for SplitLink {
    fn name(&self) -> &'static str {
        "split"
    }

    fn request(&self, operation: Operation, forward: NextLink) -> OperationStream {
        match operation.kind() {
            OperationKind::Subscription => self.subscriptions.request(operation, forward),
            OperationKind::Query | OperationKind::Mutation => {
                self.operations.request(operation, forward)
            }
        }
    }
}
