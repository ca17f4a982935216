//! Error types and axum `IntoResponse` implementation.

use axum::{
  Json,
  http::StatusCode,
  response::{IntoResponse, Response},
};
use serde_json::json;
use staffsite_core::AuthorizationError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("invalid email or password")]
  InvalidCredentials,
  #[error(transparent)]
  Authorization(#[from] AuthorizationError),
  #[error("not found")]
  NotFound,
  #[error("bad request: {0}")]
  BadRequest(String),
  #[error("internal error: {0}")]
  Internal(String),
  #[error("store error: {0}")]
  Store(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl Error {
  pub fn store(e: impl std::error::Error + Send + Sync + 'static) -> Self {
    Error::Store(Box::new(e))
  }

  pub fn status(&self) -> StatusCode {
    match self {
      Error::InvalidCredentials => StatusCode::UNAUTHORIZED,
      Error::Authorization(AuthorizationError::Unauthenticated) => StatusCode::UNAUTHORIZED,
      Error::Authorization(AuthorizationError::Forbidden { .. }) => StatusCode::FORBIDDEN,
      Error::NotFound => StatusCode::NOT_FOUND,
      Error::BadRequest(_) => StatusCode::BAD_REQUEST,
      Error::Internal(_) | Error::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
  }
}

impl IntoResponse for Error {
  fn into_response(self) -> Response {
    let status = self.status();
    if status.is_server_error() {
      tracing::error!(error = %self, "request failed");
    }
    let message = match &self {
      Error::BadRequest(m) | Error::Internal(m) => m.clone(),
      other => other.to_string(),
    };
    (status, Json(json!({ "error": message }))).into_response()
  }
}
