use super::{Link, NextLink, Operation, OperationStream};
use crate::util::format_elapsed_time;
use futures::StreamExt;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tracing::debug;

/// Callback receiving `(operation name, elapsed)` for every timed result
pub(crate) type TimingObserver = Arc<dyn Fn(&str, Duration) + Send + Sync>;

/// Records the operation start instant into the request context
pub struct TimeStartLink;

impl Link for TimeStartLink {
    fn name(&self) -> &'static str {
        "time-start"
    }

    fn request(&self, operation: Operation, forward: NextLink) -> OperationStream {
        operation.context().set_start(Instant::now());
        forward.run(operation)
    }
}

/// Logs how long each successful result took, measured from the context start
#[derive(Default)]
pub struct LogTimeLink {
    observer: Option<TimingObserver>,
}

impl LogTimeLink {
    pub fn new() -> Self {
        Self::default()
    }

    #[cfg(test)]
    pub(crate) fn with_observer(observer: TimingObserver) -> Self {
        Self {
            observer: Some(observer),
        }
    }
}

impl Link for LogTimeLink {
    fn name(&self) -> &'static str {
        "log-time"
    }

    fn request(&self, operation: Operation, forward: NextLink) -> OperationStream {
        // Read the context when the result arrives: inner links write to it after this point
        let context = operation.context().clone();
        let name = operation.display_name().to_string();
        let observer = self.observer.clone();

        forward
            .run(operation)
            .map(move |result| {
                if result.is_ok() {
                    if let Some(start) = context.start() {
                        let elapsed = start.elapsed();
                        debug!(
                            operation = %name,
                            elapsed_ms = elapsed.as_millis() as u64,
                            "{} took {}",
                            name,
                            format_elapsed_time(elapsed)
                        );
                        if let Some(observer) = &observer {
                            observer(&name, elapsed);
                        }
                    }
                }
                result
            })
            .boxed()
    }
}
