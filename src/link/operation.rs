use crate::transport::OperationPayload;
use serde_json::{Map, Value};
use std::sync::{Arc, Mutex};
use tokio::time::Instant;

/// GraphQL operation type, derived from the query document
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperationKind {
    Query,
    Mutation,
    Subscription,
}

impl OperationKind {
    /// Detect the operation type of a query document.
    ///
    /// The first `query`/`mutation`/`subscription` keyword at the top level wins.
    /// An anonymous selection set (`{ ... }`) is a query. Fragment definitions,
    /// comments and string literals are skipped.
    pub fn from_query(query: &str) -> Self {
        let mut chars = query.chars().peekable();
        let mut depth = 0usize;
        let mut parens = 0usize;
        let mut in_fragment = false;

        while let Some(c) = chars.next() {
            match c {
                '#' => {
                    while let Some(&next) = chars.peek() {
                        if next == '\n' {
                            break;
                        }
                        chars.next();
                    }
                }
                '"' => {
                    let mut escaped = false;
                    for next in chars.by_ref() {
                        if escaped {
                            escaped = false;
                        } else if next == '\\' {
                            escaped = true;
                        } else if next == '"' {
                            break;
                        }
                    }
                }
                '(' => parens += 1,
                ')' => parens = parens.saturating_sub(1),
                // Object literals in arguments are not selection sets
                '{' | '}' if parens > 0 => {}
                '{' => {
                    if depth == 0 && !in_fragment {
                        return OperationKind::Query;
                    }
                    depth += 1;
                }
                '}' => {
                    depth = depth.saturating_sub(1);
                    if depth == 0 {
                        in_fragment = false;
                    }
                }
                c if depth == 0
                    && parens == 0
                    && !in_fragment
                    && (c.is_ascii_alphabetic() || c == '_') =>
                {
                    let mut word = String::from(c);
                    while let Some(&next) = chars.peek() {
                        if next.is_ascii_alphanumeric() || next == '_' {
                            word.push(next);
                            chars.next();
                        } else {
                            break;
                        }
                    }
                    match word.as_str() {
                        "query" => return OperationKind::Query,
                        "mutation" => return OperationKind::Mutation,
                        "subscription" => return OperationKind::Subscription,
                        "fragment" => in_fragment = true,
                        _ => {}
                    }
                }
                _ => {}
            }
        }

        OperationKind::Query
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            OperationKind::Query => "query",
            OperationKind::Mutation => "mutation",
            OperationKind::Subscription => "subscription",
        }
    }
}

#[derive(Debug, Default)]
struct ContextValues {
    start: Option<Instant>,
    entries: Map<String, Value>,
}

/// Request-scoped metadata bag.
///
/// Every link handling one operation sees the same context, so a value written
/// by an inner link is visible to an outer link on the response path. A fresh
/// context is created for each new operation.
#[derive(Debug, Clone, Default)]
pub struct Context {
    inner: Arc<Mutex<ContextValues>>,
}

impl Context {
    pub fn set_start(&self, at: Instant) {
        self.inner.lock().unwrap().start = Some(at);
    }

    pub fn start(&self) -> Option<Instant> {
        self.inner.lock().unwrap().start
    }

    pub fn insert(&self, key: impl Into<String>, value: Value) {
        self.inner.lock().unwrap().entries.insert(key.into(), value);
    }

    pub fn get(&self, key: &str) -> Option<Value> {
        self.inner.lock().unwrap().entries.get(key).cloned()
    }
}

/// A GraphQL operation travelling through the link chain
#[derive(Debug, Clone)]
pub struct Operation {
    operation_name: Option<String>,
    query: String,
    variables: Map<String, Value>,
    kind: OperationKind,
    context: Context,
}

impl Operation {
    pub fn new(query: impl Into<String>) -> Self {
        let query = query.into();
        let kind = OperationKind::from_query(&query);
        Self {
            operation_name: None,
            query,
            variables: Map::new(),
            kind,
            context: Context::default(),
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.operation_name = Some(name.into());
        self
    }

    pub fn with_variables(mut self, variables: Map<String, Value>) -> Self {
        self.variables = variables;
        self
    }

    pub fn operation_name(&self) -> Option<&str> {
        self.operation_name.as_deref()
    }

    /// Name used in logs; anonymous operations log as "anonymous"
    pub fn display_name(&self) -> &str {
        self.operation_name.as_deref().unwrap_or("anonymous")
    }

    pub fn query(&self) -> &str {
        &self.query
    }

    pub fn variables(&self) -> &Map<String, Value> {
        &self.variables
    }

    pub fn kind(&self) -> OperationKind {
        self.kind
    }

    pub fn context(&self) -> &Context {
        &self.context
    }

    /// Wire payload shared by the HTTP body and the socket `start` message
    pub fn payload(&self) -> OperationPayload {
        OperationPayload {
            query: self.query.clone(),
            variables: if self.variables.is_empty() {
                None
            } else {
                Some(Value::Object(self.variables.clone()))
            },
            operation_name: self.operation_name.clone(),
        }
    }
}
