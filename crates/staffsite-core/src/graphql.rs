//! The query-endpoint envelope shared by the server and the client.
//!
//! Request: `{"query": "...", "variables": {...}}`.
//! Response: `{"data": ..., "errors": [{"message": "..."}]}`.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

// ─── Operation classification ────────────────────────────────────────────────

/// Whether an operation reads or changes server-side state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperationKind {
  Query,
  Mutation,
}

impl OperationKind {
  /// Mutation iff the text, trimmed, starts with `mutation` (any case).
  pub fn classify(operation: &str) -> Self {
    let head = operation.trim_start().as_bytes();
    if head.len() >= 8 && head[..8].eq_ignore_ascii_case(b"mutation") {
      OperationKind::Mutation
    } else {
      OperationKind::Query
    }
  }

  pub fn is_mutation(self) -> bool { self == OperationKind::Mutation }
}

/// Name of the first root field selected by `operation`.
///
/// Skips the optional `query`/`mutation` keyword, operation name and variable
/// definitions, then reads the identifier after the opening brace. Returns
/// `None` when no selection set is found.
pub fn root_field(operation: &str) -> Option<&str> {
  let mut rest = operation.trim_start();
  for keyword in ["query", "mutation", "subscription"] {
    if rest.get(..keyword.len()).is_some_and(|head| head.eq_ignore_ascii_case(keyword)) {
      rest = &rest[keyword.len()..];
      break;
    }
  }

  let mut depth = 0usize;
  let brace = rest.char_indices().find_map(|(i, c)| match c {
    '(' => {
      depth += 1;
      None
    }
    ')' => {
      depth = depth.saturating_sub(1);
      None
    }
    '{' if depth == 0 => Some(i),
    _ => None,
  })?;

  let body = rest[brace + 1..].trim_start();
  let end = body
    .find(|c: char| !(c.is_ascii_alphanumeric() || c == '_'))
    .unwrap_or(body.len());
  let name = &body[..end];
  (!name.is_empty()).then_some(name)
}

// ─── Envelope ────────────────────────────────────────────────────────────────

/// Request body posted to the query endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GraphqlRequest {
  pub query:     String,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub variables: Option<Map<String, Value>>,
}

/// One entry of the response `errors` list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphqlError {
  pub message:    String,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub extensions: Option<Value>,
}

impl GraphqlError {
  pub fn new(message: impl Into<String>) -> Self {
    Self { message: message.into(), extensions: None }
  }

  pub fn with_code(message: impl Into<String>, code: &str) -> Self {
    Self {
      message:    message.into(),
      extensions: Some(serde_json::json!({ "code": code })),
    }
  }

  /// The `extensions.code` value, if present.
  pub fn code(&self) -> Option<&str> {
    self.extensions.as_ref()?.get("code")?.as_str()
  }
}

/// Response body returned by the query endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GraphqlResponse<T = Value> {
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub data:   Option<T>,
  #[serde(default, skip_serializing_if = "Vec::is_empty")]
  pub errors: Vec<GraphqlError>,
}

impl<T> GraphqlResponse<T> {
  pub fn data(data: T) -> Self { Self { data: Some(data), errors: Vec::new() } }

  pub fn error(error: GraphqlError) -> Self {
    Self { data: None, errors: vec![error] }
  }
}
