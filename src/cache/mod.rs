// Result cache injected into the GraphQL client

use crate::link::{FetchResult, Operation};
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde_json::Value;
use std::sync::Arc;

#[derive(Debug, Clone)]
struct CachedResult {
    result: FetchResult,
    stored_at: DateTime<Utc>,
}

/// Last successful result per (query, variables).
///
/// Clones share the same entries. Results are stored whole; there is no
/// per-object normalization.
#[derive(Debug, Clone, Default)]
pub struct AppCache {
    entries: Arc<DashMap<String, CachedResult>>,
}

impl AppCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cache key: query text plus variables. serde_json maps are sorted, so
    /// variable order does not matter.
    pub fn key(operation: &Operation) -> String {
        format!(
            "{}\u{0}{}",
            operation.query(),
            Value::Object(operation.variables().clone())
        )
    }

    pub fn read(&self, operation: &Operation) -> Option<FetchResult> {
        self.entries
            .get(&Self::key(operation))
            .map(|entry| entry.result.clone())
    }

    /// When the cached result for `operation` was written
    pub fn stored_at(&self, operation: &Operation) -> Option<DateTime<Utc>> {
        self.entries
            .get(&Self::key(operation))
            .map(|entry| entry.stored_at)
    }

    pub fn write(&self, operation: &Operation, result: FetchResult) {
        self.write_key(Self::key(operation), result);
    }

    pub(crate) fn write_key(&self, key: String, result: FetchResult) {
        self.entries.insert(
            key,
            CachedResult {
                result,
                stored_at: Utc::now(),
            },
        );
    }

    pub fn evict(&self, operation: &Operation) -> bool {
        self.entries.remove(&Self::key(operation)).is_some()
    }

    pub fn reset(&self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Map};

    fn vars(value: Value) -> Map<String, Value> {
        value.as_object().unwrap().clone()
    }

    #[test]
    fn test_variable_order_does_not_change_key() {
        let a = Operation::new("query Runs($a: Int, $b: Int) { runs }")
            .with_variables(vars(json!({"a": 1, "b": 2})));
        let mut reversed = Map::new();
        reversed.insert("b".to_string(), json!(2));
        reversed.insert("a".to_string(), json!(1));
        let b = Operation::new("query Runs($a: Int, $b: Int) { runs }").with_variables(reversed);

        assert_eq!(AppCache::key(&a), AppCache::key(&b));
    }

    #[test]
    fn test_write_read_evict() {
        let cache = AppCache::new();
        let op = Operation::new("{ version }");
        assert!(cache.read(&op).is_none());

        cache.write(&op, FetchResult::from_data(json!({"version": "1.0"})));
        assert_eq!(
            cache.read(&op).unwrap().data,
            Some(json!({"version": "1.0"}))
        );
        assert!(cache.stored_at(&op).is_some());

        let other = Operation::new("{ version }").with_variables(vars(json!({"x": 1})));
        assert!(cache.read(&other).is_none());

        assert!(cache.evict(&op));
        assert!(!cache.evict(&op));
        assert!(cache.is_empty());
    }

    #[test]
    fn test_clones_share_entries() {
        let cache = AppCache::new();
        let clone = cache.clone();
        clone.write(&Operation::new("{ a }"), FetchResult::default());
        assert_eq!(cache.len(), 1);

        cache.reset();
        assert!(clone.is_empty());
    }
}
