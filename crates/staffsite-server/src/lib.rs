//! HTTP layer for the staffsite backend.
//!
//! Exposes an axum [`Router`] backed by any [`SiteStore`]: the query
//! endpoint, session login/logout, the diagnostic identity endpoint, cache
//! invalidation and the public content, robots and sitemap routes.

pub mod auth;
pub mod cache;
pub mod error;
pub mod handlers;
pub mod operation;
pub mod sitemap;

pub use error::Error;

use std::sync::Arc;

use axum::{
  Router,
  http::{HeaderValue, Method, header},
  routing::{get, post},
};
use staffsite_core::{AppConfig, PermissionTable, store::SiteStore};
use tower_http::{
  cors::{AllowOrigin, CorsLayer},
  trace::TraceLayer,
};

use cache::RenderCache;
use handlers::{graphql, public, revalidate, session};

// ─── Application state ────────────────────────────────────────────────────────

/// Shared state threaded through all axum handlers.
///
/// Everything but the render cache is immutable after startup.
#[derive(Clone)]
pub struct AppState<S: SiteStore> {
  pub store:       Arc<S>,
  pub config:      Arc<AppConfig>,
  pub permissions: Arc<PermissionTable>,
  pub cache:       Arc<RenderCache>,
}

impl<S: SiteStore> AppState<S> {
  /// State with the built-in permission table and an empty cache.
  pub fn new(store: S, config: AppConfig) -> Self {
    Self {
      store:       Arc::new(store),
      config:      Arc::new(config),
      permissions: Arc::new(PermissionTable::builtin()),
      cache:       Arc::new(RenderCache::new()),
    }
  }
}

// ─── Router ───────────────────────────────────────────────────────────────────

/// Build the axum [`Router`] for the site backend.
pub fn router<S>(state: AppState<S>) -> Router
where
  S: SiteStore + Clone + Send + Sync + 'static,
{
  let cors = cors_layer(&state.config);

  let router = Router::new()
    .route("/api/graphql",      post(graphql::handler::<S>))
    .route("/api/auth/login",   post(session::login::<S>))
    .route("/api/auth/logout",  post(session::logout::<S>))
    .route("/api/auth/me",      get(session::me::<S>))
    .route("/api/revalidate",   post(revalidate::handler::<S>))
    .route("/content/{section}", get(public::content::<S>))
    .route("/robots.txt",       get(public::robots::<S>))
    .route("/sitemap.xml",      get(public::sitemap::<S>))
    .layer(TraceLayer::new_for_http());

  let router = match cors {
    Some(cors) => router.layer(cors),
    None => router,
  };
  router.with_state(state)
}

/// Credentialed CORS for the configured origins; `None` when the allow-list
/// is empty.
fn cors_layer(config: &AppConfig) -> Option<CorsLayer> {
  let origins: Vec<HeaderValue> = config
    .cors_origins()
    .iter()
    .filter_map(|url| {
      let origin = url.origin().ascii_serialization();
      HeaderValue::from_str(&origin)
        .inspect_err(|_| tracing::warn!(%origin, "skipping unusable CORS origin"))
        .ok()
    })
    .collect();

  if origins.is_empty() {
    return None;
  }
  Some(
    CorsLayer::new()
      .allow_origin(AllowOrigin::list(origins))
      .allow_methods([Method::GET, Method::POST])
      .allow_headers([header::CONTENT_TYPE])
      .allow_credentials(true),
  )
}
