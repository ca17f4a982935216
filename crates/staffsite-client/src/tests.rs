//! Client tests against a throwaway axum server on a loopback port.

use std::sync::{
  Arc,
  atomic::{AtomicUsize, Ordering},
};

use axum::{
  Json, Router,
  http::{HeaderMap, StatusCode, header},
  routing::{get, post},
};
use serde::Deserialize;
use serde_json::{Map, Value, json};
use staffsite_core::Session;
use tokio::net::TcpListener;
use tracing::{Event, Level, Subscriber, subscriber::DefaultGuard};
use tracing_subscriber::layer::{Context, Layer, SubscriberExt as _};

use crate::{GraphqlClient, RequestError};

// ─── Helpers ──────────────────────────────────────────────────────────────────

async fn spawn(router: Router) -> GraphqlClient {
  let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
  let addr = listener.local_addr().unwrap();
  tokio::spawn(async move { axum::serve(listener, router).await.unwrap() });
  GraphqlClient::new(&format!("http://{addr}")).unwrap()
}

/// Counts events at one level emitted by this crate.
struct CountEvents {
  level: Level,
  count: Arc<AtomicUsize>,
}

impl<S: Subscriber> Layer<S> for CountEvents {
  fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
    let meta = event.metadata();
    if *meta.level() == self.level && meta.target().starts_with("staffsite_client") {
      self.count.fetch_add(1, Ordering::SeqCst);
    }
  }
}

fn capture(level: Level) -> (Arc<AtomicUsize>, DefaultGuard) {
  let count = Arc::new(AtomicUsize::new(0));
  let layer = CountEvents { level, count: Arc::clone(&count) };
  let subscriber = tracing_subscriber::registry().with(layer);
  (count, tracing::subscriber::set_default(subscriber))
}

fn capture_warnings() -> (Arc<AtomicUsize>, DefaultGuard) { capture(Level::WARN) }

/// Echoes the posted envelope and the cookie header back as `data`.
async fn echo(headers: HeaderMap, Json(body): Json<Value>) -> Json<Value> {
  let cookie = headers
    .get(header::COOKIE)
    .and_then(|v| v.to_str().ok())
    .map(str::to_string);
  Json(json!({ "data": { "cookie": cookie, "request": body } }))
}

fn session_json() -> Value {
  json!({
    "identity": {
      "id":         "00000000-0000-0000-0000-000000000001",
      "name":       "Jana",
      "email":      "jana@agency.example",
      "role":       "editor",
      "department": null
    },
    "expires_at": "2030-01-01T00:00:00Z"
  })
}

fn session() -> Session { serde_json::from_value(session_json()).unwrap() }

fn vars(value: Value) -> Option<Map<String, Value>> { value.as_object().cloned() }

// ─── Query endpoint ───────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct Ping {
  ping: String,
}

#[tokio::test]
async fn query_decodes_data_without_warning() {
  let (warnings, _guard) = capture_warnings();
  let client = spawn(Router::new().route(
    "/api/graphql",
    post(|| async { Json(json!({ "data": { "ping": "pong" } })) }),
  ))
  .await;

  let ping: Ping = client.send("query { ping }", None, None).await.unwrap();
  assert_eq!(ping.ping, "pong");
  assert_eq!(warnings.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn mutation_without_session_warns_once_and_is_still_sent() {
  let (warnings, _guard) = capture_warnings();
  let client = spawn(Router::new().route("/api/graphql", post(echo))).await;

  let op = "mutation { updateSection }";
  let data: Value = client
    .send(op, vars(json!({ "name": "faq", "content": [] })), None)
    .await
    .unwrap();
  assert_eq!(data["request"]["query"], op);
  assert_eq!(data["request"]["variables"]["name"], "faq");
  assert_eq!(warnings.load(Ordering::SeqCst), 1);

  let session = session();
  let _: Value = client.send(op, None, Some(&session)).await.unwrap();
  let _: Value = client.send("query { ping }", None, None).await.unwrap();
  assert_eq!(warnings.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn variables_are_omitted_when_absent() {
  let client = spawn(Router::new().route("/api/graphql", post(echo))).await;
  let data: Value = client.send("{ ping }", None, None).await.unwrap();
  assert!(data["request"].get("variables").is_none());
}

#[tokio::test]
async fn first_application_error_is_surfaced() {
  let client = spawn(Router::new().route(
    "/api/graphql",
    post(|| async {
      Json(json!({
        "errors": [
          { "message": "bad input", "extensions": { "code": "BAD_USER_INPUT" } },
          { "message": "second" }
        ]
      }))
    }),
  ))
  .await;

  let err = client
    .send::<Value>("query { section }", None, None)
    .await
    .unwrap_err();
  assert_eq!(err.to_string(), "bad input");
  assert_eq!(err.code(), Some("BAD_USER_INPUT"));
  match err {
    RequestError::Application { message, errors } => {
      assert_eq!(message, "bad input");
      assert_eq!(errors.len(), 2);
      assert_eq!(errors[1].message, "second");
    }
    other => panic!("expected application error, got {other:?}"),
  }
}

#[tokio::test]
async fn non_success_status_is_a_transport_error() {
  let client = spawn(Router::new().route(
    "/api/graphql",
    post(|| async {
      (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(json!({ "errors": [{ "message": "ignored" }] })),
      )
    }),
  ))
  .await;

  let err = client.send::<Value>("{ ping }", None, None).await.unwrap_err();
  assert!(matches!(err, RequestError::Transport { .. }));
  assert_eq!(err.status(), Some(StatusCode::INTERNAL_SERVER_ERROR));
  assert_eq!(err.code(), None);
}

#[tokio::test]
async fn every_failure_logs_one_error_line() {
  let (errors, _guard) = capture(Level::ERROR);
  let client = spawn(Router::new().route(
    "/api/graphql",
    post(|| async { StatusCode::INTERNAL_SERVER_ERROR }),
  ))
  .await;

  let err = client.send::<Value>("{ ping }", None, None).await.unwrap_err();
  assert!(matches!(err, RequestError::Transport { .. }));
  assert_eq!(errors.load(Ordering::SeqCst), 1);

  let app = spawn(Router::new().route(
    "/api/graphql",
    post(|| async { Json(json!({ "errors": [{ "message": "bad input" }] })) }),
  ))
  .await;
  let err = app.send::<Value>("{ section }", None, None).await.unwrap_err();
  assert!(matches!(err, RequestError::Application { .. }));
  assert_eq!(errors.load(Ordering::SeqCst), 2);

  let ok = spawn(Router::new().route(
    "/api/graphql",
    post(|| async { Json(json!({ "data": { "ping": "pong" } })) }),
  ))
  .await;
  let _: Value = ok.send("{ ping }", None, None).await.unwrap();
  assert_eq!(errors.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn undecodable_body_is_a_decode_error() {
  let client = spawn(Router::new().route("/api/graphql", post(|| async { "not json" }))).await;
  let err = client.send::<Value>("{ ping }", None, None).await.unwrap_err();
  assert!(matches!(err, RequestError::Decode(_)));
}

#[tokio::test]
async fn data_of_the_wrong_shape_is_a_decode_error() {
  let client = spawn(Router::new().route(
    "/api/graphql",
    post(|| async { Json(json!({ "data": { "ping": 42 } })) }),
  ))
  .await;
  let err = client.send::<Ping>("{ ping }", None, None).await.unwrap_err();
  assert!(matches!(err, RequestError::Decode(_)));
}

#[tokio::test]
async fn unreachable_server_is_an_http_error() {
  let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
  let addr = listener.local_addr().unwrap();
  drop(listener);

  let client = GraphqlClient::new(&format!("http://{addr}")).unwrap();
  let err = client.send::<Value>("{ ping }", None, None).await.unwrap_err();
  assert!(matches!(err, RequestError::Http(_)));
}

#[test]
fn rejects_unparseable_base_url() {
  assert!(matches!(GraphqlClient::new("not a url"), Err(RequestError::BaseUrl(_))));
  let client = GraphqlClient::new("http://localhost:3000").unwrap();
  assert_eq!(client.base_url().as_str(), "http://localhost:3000/");
}

// ─── Session routes ───────────────────────────────────────────────────────────

#[tokio::test]
async fn login_cookie_rides_along_on_later_requests() {
  let client = spawn(
    Router::new()
      .route(
        "/api/auth/login",
        post(|| async {
          (
            [(header::SET_COOKIE, "staffsite_session=tok123; Path=/; HttpOnly; SameSite=Lax")],
            Json(session_json()),
          )
        }),
      )
      .route("/api/graphql", post(echo)),
  )
  .await;

  let before: Value = client.send("{ ping }", None, None).await.unwrap();
  assert!(before["cookie"].is_null());

  let session = client.login("jana@agency.example", "secret").await.unwrap();
  assert_eq!(session.identity.role, "editor");

  let after: Value = client.send("{ ping }", None, Some(&session)).await.unwrap();
  assert!(after["cookie"].as_str().unwrap().contains("staffsite_session=tok123"));
}

#[tokio::test]
async fn clones_share_the_cookie_jar() {
  let client = spawn(Router::new().route("/api/graphql", post(echo))).await;
  let other = client.clone();
  client.set_session_token("seeded");

  let data: Value = other.send("{ ping }", None, None).await.unwrap();
  assert_eq!(data["cookie"], "staffsite_session=seeded");
}

#[tokio::test]
async fn rejected_login_is_a_transport_error() {
  let client = spawn(Router::new().route(
    "/api/auth/login",
    post(|| async { (StatusCode::UNAUTHORIZED, Json(json!({ "error": "invalid credentials" }))) }),
  ))
  .await;

  let err = client.login("jana@agency.example", "wrong").await.unwrap_err();
  assert_eq!(err.status(), Some(StatusCode::UNAUTHORIZED));
}

#[tokio::test]
async fn me_and_logout() {
  let client = spawn(
    Router::new()
      .route(
        "/api/auth/me",
        get(|| async {
          Json(json!({
            "id":          "00000000-0000-0000-0000-000000000001",
            "name":        "Jana",
            "email":       "jana@agency.example",
            "role":        "editor",
            "department":  null,
            "permissions": ["content:read", "content:write"],
            "hasFileRead": false
          }))
        }),
      )
      .route("/api/auth/logout", post(|| async { StatusCode::NO_CONTENT })),
  )
  .await;

  let report = client.me().await.unwrap();
  assert_eq!(report.permissions, ["content:read", "content:write"]);
  assert!(!report.has_file_read);

  client.logout().await.unwrap();
}
