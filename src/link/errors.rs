use super::{GraphQLError, Link, LinkError, NextLink, Operation, OperationStream};
use futures::StreamExt;
use std::sync::Arc;
use tracing::error;

/// Side channel for operation failures (toasts, telemetry, logs)
pub trait ErrorReporter: Send + Sync {
    /// GraphQL errors returned by the server, either inside a result or as the failure itself
    fn graphql_errors(&self, operation: &str, errors: &[GraphQLError]);

    /// Transport or network failure
    fn link_error(&self, operation: &str, error: &LinkError);
}

/// Default reporter: every failure becomes an error log
pub struct TracingErrorReporter;

impl ErrorReporter for TracingErrorReporter {
    fn graphql_errors(&self, operation: &str, errors: &[GraphQLError]) {
        for e in errors {
            error!(operation = %operation, path = ?e.path, "[GraphQL error] {}", e.message);
        }
    }

    fn link_error(&self, operation: &str, error: &LinkError) {
        error!(operation = %operation, error = %error, "[Network error]");
    }
}

/// Observes failures on the response path. Results and errors pass through unchanged.
pub struct ErrorLink {
    reporter: Arc<dyn ErrorReporter>,
}

impl ErrorLink {
    pub fn new(reporter: Arc<dyn ErrorReporter>) -> Self {
        Self { reporter }
    }
}

impl Link for ErrorLink {
    fn name(&self) -> &'static str {
        "report-errors"
    }

    fn request(&self, operation: Operation, forward: NextLink) -> OperationStream {
        let reporter = Arc::clone(&self.reporter);
        let name = operation.display_name().to_string();

        forward
            .run(operation)
            .inspect(move |result| match result {
                Ok(fetched) if fetched.has_errors() => {
                    reporter.graphql_errors(&name, &fetched.errors)
                }
                Ok(_) => {}
                Err(LinkError::GraphQL(errors)) => reporter.graphql_errors(&name, errors),
                Err(e) => reporter.link_error(&name, e),
            })
            .boxed()
    }
}
