//! Async HTTP client for the staffsite backend.

use std::sync::Arc;

use reqwest::{Client, Response, cookie::Jar};
use serde::{Serialize, de::DeserializeOwned};
use serde_json::{Map, Value};
use staffsite_core::{
  IdentityReport, Session,
  graphql::{GraphqlRequest, GraphqlResponse, OperationKind},
};
use url::Url;

use crate::error::RequestError;

/// Name of the cookie the server issues on login.
pub const SESSION_COOKIE: &str = "staffsite_session";

/// Client for the query endpoint and the session routes.
///
/// Cheap to clone; clones share the connection pool and the cookie jar.
/// Requests carry no timeout.
#[derive(Clone)]
pub struct GraphqlClient {
  client: Client,
  jar:    Arc<Jar>,
  base:   Url,
}

#[derive(Serialize)]
struct LoginBody<'a> {
  email:    &'a str,
  password: &'a str,
}

impl GraphqlClient {
  /// A client for the backend at `base_url`, e.g. `http://localhost:3000`.
  pub fn new(base_url: &str) -> Result<Self, RequestError> {
    let base = Url::parse(base_url)?;
    let jar = Arc::new(Jar::default());
    let client = Client::builder()
      .cookie_provider(Arc::clone(&jar))
      .build()?;
    Ok(Self { client, jar, base })
  }

  pub fn base_url(&self) -> &Url { &self.base }

  fn url(&self, path: &str) -> String {
    format!("{}{}", self.base.as_str().trim_end_matches('/'), path)
  }

  /// Seed the cookie jar with a session token obtained elsewhere.
  pub fn set_session_token(&self, token: &str) {
    self
      .jar
      .add_cookie_str(&format!("{SESSION_COOKIE}={token}; Path=/"), &self.base);
  }

  // ── Query endpoint ────────────────────────────────────────────────────────

  /// Run one query or mutation and decode its `data` as `T`.
  ///
  /// `session` only feeds a local warning when a mutation is sent without
  /// one; the request is always made, and the server decides authorization
  /// from the cookie it receives.
  pub async fn send<T>(
    &self,
    operation: &str,
    variables: Option<Map<String, Value>>,
    session: Option<&Session>,
  ) -> Result<T, RequestError>
  where
    T: DeserializeOwned,
  {
    let kind = OperationKind::classify(operation);
    if kind.is_mutation() && session.is_none() {
      tracing::warn!("sending a mutation without a session; the server will decide");
    }

    let envelope = GraphqlRequest { query: operation.to_string(), variables };
    self
      .exchange(&envelope)
      .await
      .inspect_err(|e| tracing::error!(error = %e, code = e.code(), "query request failed"))
  }

  async fn exchange<T>(&self, envelope: &GraphqlRequest) -> Result<T, RequestError>
  where
    T: DeserializeOwned,
  {
    let resp = self
      .client
      .post(self.url("/api/graphql"))
      .json(envelope)
      .send()
      .await?;
    let body = success(resp)?.bytes().await?;

    let parsed: GraphqlResponse = serde_json::from_slice(&body)?;
    if let Some(first) = parsed.errors.first() {
      return Err(RequestError::Application {
        message: first.message.clone(),
        errors:  parsed.errors,
      });
    }
    Ok(serde_json::from_value(parsed.data.unwrap_or(Value::Null))?)
  }

  // ── Session routes ────────────────────────────────────────────────────────

  /// `POST /api/auth/login`. The session cookie lands in the jar.
  pub async fn login(&self, email: &str, password: &str) -> Result<Session, RequestError> {
    let resp = self
      .client
      .post(self.url("/api/auth/login"))
      .json(&LoginBody { email, password })
      .send()
      .await?;
    let session: Session = serde_json::from_slice(&success(resp)?.bytes().await?)?;
    tracing::debug!(user = %session.identity.id, "logged in");
    Ok(session)
  }

  /// `POST /api/auth/logout`
  pub async fn logout(&self) -> Result<(), RequestError> {
    let resp = self.client.post(self.url("/api/auth/logout")).send().await?;
    success(resp)?;
    Ok(())
  }

  /// `GET /api/auth/me`
  pub async fn me(&self) -> Result<IdentityReport, RequestError> {
    let resp = self.client.get(self.url("/api/auth/me")).send().await?;
    Ok(serde_json::from_slice(&success(resp)?.bytes().await?)?)
  }
}

fn success(resp: Response) -> Result<Response, RequestError> {
  let status = resp.status();
  if status.is_success() {
    Ok(resp)
  } else {
    Err(RequestError::Transport { status })
  }
}
