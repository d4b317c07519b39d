use super::*;
use crate::link::{GraphQLError, Link, NextLink};
use futures::stream;
use serde_json::json;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// Counts requests and answers each with the next scripted result
struct ScriptedLink {
    calls: Arc<AtomicUsize>,
    results: Vec<Result<FetchResult, LinkError>>,
}

impl Link for ScriptedLink {
    fn name(&self) -> &'static str {
        "scripted"
    }

    fn request(&self, _operation: Operation, _forward: NextLink) -> OperationStream {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        let result = self.results[call.min(self.results.len() - 1)].clone();
        stream::once(async move { result }).boxed()
    }
}

fn client_with(results: Vec<Result<FetchResult, LinkError>>) -> (GraphQLClient, Arc<AtomicUsize>) {
    let calls = Arc::new(AtomicUsize::new(0));
    let link = ScriptedLink {
        calls: Arc::clone(&calls),
        results,
    };
    let client = GraphQLClient::new(AppCache::new(), LinkChain::from_links(vec![Arc::new(link)]));
    (client, calls)
}

fn version() -> Operation {
    Operation::new("query Version { version }").with_name("Version")
}

#[tokio::test]
async fn test_cache_first_serves_second_query_from_cache() {
    let (client, calls) = client_with(vec![
        Ok(FetchResult::from_data(json!({"version": "1.0"}))),
        Ok(FetchResult::from_data(json!({"version": "2.0"}))),
    ]);

    let first = client.query(version(), FetchPolicy::CacheFirst).await.unwrap();
    let second = client.query(version(), FetchPolicy::CacheFirst).await.unwrap();

    assert_eq!(first.data, Some(json!({"version": "1.0"})));
    assert_eq!(second, first);
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_network_only_refreshes_cache() {
    let (client, calls) = client_with(vec![
        Ok(FetchResult::from_data(json!({"version": "1.0"}))),
        Ok(FetchResult::from_data(json!({"version": "2.0"}))),
    ]);

    client.query(version(), FetchPolicy::CacheFirst).await.unwrap();
    let refreshed = client.query(version(), FetchPolicy::NetworkOnly).await.unwrap();
    assert_eq!(refreshed.data, Some(json!({"version": "2.0"})));

    let cached = client.query(version(), FetchPolicy::CacheFirst).await.unwrap();
    assert_eq!(cached.data, Some(json!({"version": "2.0"})));
    assert_eq!(calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_no_cache_and_error_results_are_not_stored() {
    let with_errors = FetchResult {
        data: None,
        errors: vec![GraphQLError::new("not ready")],
        extensions: None,
    };
    let (client, _) = client_with(vec![
        Ok(with_errors.clone()),
        Ok(FetchResult::from_data(json!({"version": "1.0"}))),
    ]);

    let result = client.query(version(), FetchPolicy::CacheFirst).await.unwrap();
    assert_eq!(result, with_errors);
    assert!(client.cache().is_empty());

    client.query(version(), FetchPolicy::NoCache).await.unwrap();
    assert!(client.cache().is_empty());
}

#[tokio::test]
async fn test_link_errors_propagate() {
    let failure = LinkError::Network {
        status: None,
        message: "connection refused".to_string(),
    };
    let (client, _) = client_with(vec![Err(failure.clone())]);

    assert_eq!(
        client.query(version(), FetchPolicy::CacheFirst).await,
        Err(failure)
    );
}

#[tokio::test]
async fn test_operation_kind_is_checked() {
    let (client, calls) = client_with(vec![Ok(FetchResult::default())]);

    let err = client
        .mutate(Operation::new("query NotAMutation { version }"))
        .await
        .unwrap_err();
    assert!(matches!(err, LinkError::Unsupported(_)));

    let mut events = client.subscribe(Operation::new("{ version }"));
    assert!(matches!(
        events.next().await,
        Some(Err(LinkError::Unsupported(_)))
    ));

    assert_eq!(calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_mutation_is_never_cached() {
    let (client, calls) = client_with(vec![Ok(FetchResult::from_data(json!({"launch": "ok"})))]);
    let launch = || Operation::new("mutation Launch { launch }");

    client.mutate(launch()).await.unwrap();
    client.mutate(launch()).await.unwrap();

    assert_eq!(calls.load(Ordering::SeqCst), 2);
    assert!(client.cache().is_empty());
}
