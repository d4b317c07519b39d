// GraphQL client: the result cache in front of the link chain

use crate::cache::AppCache;
use crate::link::{FetchResult, LinkChain, LinkError, Operation, OperationKind, OperationStream};
use futures::stream::{self, StreamExt};
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FetchPolicy {
    /// Serve from the cache when possible, otherwise fetch and cache
    #[default]
    CacheFirst,
    /// Always fetch, then refresh the cache
    NetworkOnly,
    /// Always fetch, never touch the cache
    NoCache,
}

#[derive(Clone)]
pub struct GraphQLClient {
    cache: AppCache,
    link: LinkChain,
}

impl GraphQLClient {
    pub fn new(cache: AppCache, link: LinkChain) -> Self {
        Self { cache, link }
    }

    pub fn cache(&self) -> &AppCache {
        &self.cache
    }

    pub fn link(&self) -> &LinkChain {
        &self.link
    }

    /// Run a query. Results carrying GraphQL errors are returned but never cached.
    pub async fn query(
        &self,
        operation: Operation,
        policy: FetchPolicy,
    ) -> Result<FetchResult, LinkError> {
        expect_kind(&operation, OperationKind::Query)?;
        let key = AppCache::key(&operation);

        if policy == FetchPolicy::CacheFirst {
            if let Some(cached) = self.cache.read(&operation) {
                debug!(operation = %operation.display_name(), "Cache hit");
                return Ok(cached);
            }
        }

        let result = self.first_result(operation).await?;
        if policy != FetchPolicy::NoCache && !result.has_errors() {
            self.cache.write_key(key, result.clone());
        }
        Ok(result)
    }

    pub async fn mutate(&self, operation: Operation) -> Result<FetchResult, LinkError> {
        expect_kind(&operation, OperationKind::Mutation)?;
        self.first_result(operation).await
    }

    /// Start a subscription; every server event arrives on the stream
    pub fn subscribe(&self, operation: Operation) -> OperationStream {
        if let Err(e) = expect_kind(&operation, OperationKind::Subscription) {
            return stream::once(async move { Err::<FetchResult, _>(e) }).boxed();
        }
        self.link.execute(operation)
    }

    async fn first_result(&self, operation: Operation) -> Result<FetchResult, LinkError> {
        let mut results = self.link.execute(operation);
        results.next().await.unwrap_or(Err(LinkError::NoResult))
    }
}

fn expect_kind(operation: &Operation, expected: OperationKind) -> Result<(), LinkError> {
    if operation.kind() == expected {
        return Ok(());
    }
    Err(LinkError::Unsupported(format!(
        "expected a {} but '{}' is a {}",
        expected.as_str(),
        operation.display_name(),
        operation.kind().as_str()
    )))
}

#[cfg(test)]
mod tests;
