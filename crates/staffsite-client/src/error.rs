//! Client error type.

use reqwest::StatusCode;
use staffsite_core::graphql::GraphqlError;
use thiserror::Error;

/// A failed call to the query endpoint.
#[derive(Debug, Error)]
pub enum RequestError {
  /// The endpoint answered with a non-success status.
  #[error("request failed with status {status}")]
  Transport { status: StatusCode },

  /// The body carried a non-empty `errors` list. `message` is the first
  /// entry's message; `errors` keeps all of them.
  #[error("{message}")]
  Application {
    message: String,
    errors:  Vec<GraphqlError>,
  },

  #[error(transparent)]
  Http(#[from] reqwest::Error),

  #[error(transparent)]
  Decode(#[from] serde_json::Error),

  #[error("invalid base URL: {0}")]
  BaseUrl(#[from] url::ParseError),
}

impl RequestError {
  /// `extensions.code` of the first application error, if any.
  pub fn code(&self) -> Option<&str> {
    match self {
      RequestError::Application { errors, .. } => errors.first()?.code(),
      _ => None,
    }
  }

  pub fn status(&self) -> Option<StatusCode> {
    match self {
      RequestError::Transport { status } => Some(*status),
      _ => None,
    }
  }
}
