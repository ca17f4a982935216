//! Error types for `staffsite-core`.

use std::fmt;

use thiserror::Error;

use crate::permission::Permission;

/// A single field that failed boot-time validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Violation {
  /// Field path, e.g. `auth_secret`.
  pub field:      &'static str,
  /// Human-readable constraint that failed.
  pub constraint: String,
}

impl fmt::Display for Violation {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}: {}", self.field, self.constraint)
  }
}

/// Fatal startup error. Never handled by request code.
#[derive(Debug, Error)]
pub enum ConfigError {
  #[error("failed to read configuration: {0}")]
  Load(#[from] config::ConfigError),

  #[error("invalid configuration: {}", join_violations(.0))]
  Invalid(Vec<Violation>),
}

impl ConfigError {
  /// Violations carried by an `Invalid` error; empty for load failures.
  pub fn violations(&self) -> &[Violation] {
    match self {
      ConfigError::Invalid(v) => v,
      ConfigError::Load(_) => &[],
    }
  }

  /// Whether `field` is among the reported violations.
  pub fn names_field(&self, field: &str) -> bool {
    self.violations().iter().any(|v| v.field == field)
  }
}

fn join_violations(violations: &[Violation]) -> String {
  violations
    .iter()
    .map(ToString::to_string)
    .collect::<Vec<_>>()
    .join("; ")
}

/// Per-request authorization failure.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuthorizationError {
  #[error("authentication required")]
  Unauthenticated,

  #[error("permission denied: {permission}")]
  Forbidden { permission: Permission },
}

impl AuthorizationError {
  /// Machine-readable code used in GraphQL error extensions.
  pub fn code(&self) -> &'static str {
    match self {
      AuthorizationError::Unauthenticated => "UNAUTHENTICATED",
      AuthorizationError::Forbidden { .. } => "FORBIDDEN",
    }
  }
}
