//! Dispatch for the query endpoint.
//!
//! Only the root field of an operation is interpreted; arguments arrive
//! through `variables`. Each root field declares its kind and the permission
//! it needs, and the permission gate runs before any resolver touches the
//! store.

use std::path::Path;

use serde_json::{Map, Value, json};
use staffsite_core::{
  AuthorizationError, Identity, Permission,
  graphql::{GraphqlError, GraphqlRequest, GraphqlResponse, OperationKind, root_field},
  section::Section,
  store::SiteStore,
};

use crate::AppState;

/// The root fields this endpoint understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RootField {
  Ping,
  Section,
  Sections,
  Uploads,
  UpdateSection,
}

impl RootField {
  pub fn from_name(name: &str) -> Option<Self> {
    match name {
      "ping" => Some(RootField::Ping),
      "section" => Some(RootField::Section),
      "sections" => Some(RootField::Sections),
      "uploads" => Some(RootField::Uploads),
      "updateSection" => Some(RootField::UpdateSection),
      _ => None,
    }
  }

  pub fn name(self) -> &'static str {
    match self {
      RootField::Ping => "ping",
      RootField::Section => "section",
      RootField::Sections => "sections",
      RootField::Uploads => "uploads",
      RootField::UpdateSection => "updateSection",
    }
  }

  pub fn kind(self) -> OperationKind {
    match self {
      RootField::UpdateSection => OperationKind::Mutation,
      _ => OperationKind::Query,
    }
  }

  /// Permission the caller's role must hold, if any.
  pub fn required_permission(self) -> Option<Permission> {
    match self {
      RootField::Ping | RootField::Section => None,
      RootField::Sections => Some(Permission::ContentRead),
      RootField::Uploads => Some(Permission::FileRead),
      RootField::UpdateSection => Some(Permission::ContentWrite),
    }
  }
}

/// Execute one request envelope on behalf of `identity`.
pub async fn execute<S>(
  state: &AppState<S>,
  identity: Option<&Identity>,
  request: GraphqlRequest,
) -> GraphqlResponse
where
  S: SiteStore,
{
  match resolve(state, identity, &request).await {
    Ok((field, value)) => {
      let mut data = Map::new();
      data.insert(field.name().to_string(), value);
      GraphqlResponse::data(Value::Object(data))
    }
    Err(error) => GraphqlResponse::error(error),
  }
}

async fn resolve<S>(
  state: &AppState<S>,
  identity: Option<&Identity>,
  request: &GraphqlRequest,
) -> Result<(RootField, Value), GraphqlError>
where
  S: SiteStore,
{
  let kind = OperationKind::classify(&request.query);
  let name = root_field(&request.query).ok_or_else(|| {
    GraphqlError::with_code("operation has no selection set", "GRAPHQL_PARSE_FAILED")
  })?;
  let field = RootField::from_name(name).ok_or_else(|| {
    GraphqlError::with_code(format!("unknown field `{name}`"), "GRAPHQL_VALIDATION_FAILED")
  })?;

  if field.kind() != kind {
    let expected = if field.kind().is_mutation() { "mutation" } else { "query" };
    return Err(GraphqlError::with_code(
      format!("`{}` must be requested in a {expected} operation", field.name()),
      "GRAPHQL_VALIDATION_FAILED",
    ));
  }

  if let Some(permission) = field.required_permission() {
    state
      .permissions
      .require(identity, permission)
      .map_err(|e| denied(field, &e))?;
  }

  let vars = request.variables.as_ref();
  let value = match field {
    RootField::Ping => json!("pong"),

    RootField::Section => {
      let section = section_variable(vars)?;
      let record = state.store.get_section(section).await.map_err(internal)?;
      record.map(|r| r.content).unwrap_or(Value::Null)
    }

    RootField::Sections => {
      let records = state.store.list_sections().await.map_err(internal)?;
      Value::Array(
        records
          .into_iter()
          .map(|r| {
            json!({
              "name":      r.section,
              "updatedAt": r.updated_at,
              "updatedBy": r.updated_by,
            })
          })
          .collect(),
      )
    }

    RootField::Uploads => {
      let files = match state.config.upload_dir() {
        Some(dir) => list_uploads(dir).await.map_err(internal)?,
        None => Vec::new(),
      };
      json!(files)
    }

    RootField::UpdateSection => {
      let section = section_variable(vars)?;
      let content = vars
        .and_then(|v| v.get("content"))
        .cloned()
        .ok_or_else(|| bad_input("variable `content` is required"))?;
      let record = state
        .store
        .put_section(section, content, identity.map(|i| i.id))
        .await
        .map_err(internal)?;
      serde_json::to_value(record).map_err(internal)?
    }
  };

  Ok((field, value))
}

fn section_variable(vars: Option<&Map<String, Value>>) -> Result<Section, GraphqlError> {
  let name = vars
    .and_then(|v| v.get("name"))
    .and_then(Value::as_str)
    .ok_or_else(|| bad_input("variable `name` is required"))?;
  name
    .parse()
    .map_err(|_| bad_input(format!("unknown section `{name}`")))
}

/// Regular file names in `dir`, sorted.
async fn list_uploads(dir: &Path) -> std::io::Result<Vec<String>> {
  let mut entries = tokio::fs::read_dir(dir).await?;
  let mut names = Vec::new();
  while let Some(entry) = entries.next_entry().await? {
    if entry.file_type().await?.is_file() {
      names.push(entry.file_name().to_string_lossy().into_owned());
    }
  }
  names.sort();
  Ok(names)
}

fn denied(field: RootField, error: &AuthorizationError) -> GraphqlError {
  tracing::warn!(field = field.name(), %error, "operation rejected");
  GraphqlError::with_code(error.to_string(), error.code())
}

fn bad_input(message: impl Into<String>) -> GraphqlError {
  GraphqlError::with_code(message, "BAD_USER_INPUT")
}

fn internal(error: impl std::fmt::Display) -> GraphqlError {
  tracing::error!(%error, "resolver failed");
  GraphqlError::with_code("internal server error", "INTERNAL_SERVER_ERROR")
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn names_round_trip() {
    for field in [
      RootField::Ping,
      RootField::Section,
      RootField::Sections,
      RootField::Uploads,
      RootField::UpdateSection,
    ] {
      assert_eq!(RootField::from_name(field.name()), Some(field));
    }
    assert_eq!(RootField::from_name("deleteEverything"), None);
  }

  #[test]
  fn only_update_section_is_a_mutation() {
    assert!(RootField::UpdateSection.kind().is_mutation());
    assert!(!RootField::Uploads.kind().is_mutation());
  }

  #[test]
  fn section_variable_validates() {
    let mut vars = Map::new();
    assert_eq!(section_variable(None).unwrap_err().code(), Some("BAD_USER_INPUT"));
    vars.insert("name".into(), json!("careers"));
    assert!(section_variable(Some(&vars)).unwrap_err().message.contains("careers"));
    vars.insert("name".into(), json!("staff"));
    assert_eq!(section_variable(Some(&vars)).unwrap(), Section::Staff);
  }
}
