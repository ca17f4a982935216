//! `POST /api/revalidate`: drop cached rendered output for one path.

use axum::{Json, extract::State};
use bytes::Bytes;
use serde::Deserialize;
use serde_json::{Value, json};
use staffsite_core::store::SiteStore;

use crate::{AppState, error::Error};

#[derive(Debug, Deserialize)]
struct RevalidateBody {
  path: Option<String>,
}

/// Body: `{"path": "/content/faq"}`. Missing or empty path → 400.
pub async fn handler<S>(
  State(state): State<AppState<S>>,
  body: Bytes,
) -> Result<Json<Value>, Error>
where
  S: SiteStore + Clone + Send + Sync + 'static,
{
  let path = serde_json::from_slice::<RevalidateBody>(&body)
    .ok()
    .and_then(|b| b.path)
    .filter(|p| !p.trim().is_empty())
    .ok_or_else(|| Error::BadRequest("path is required".to_string()))?;

  let dropped = state.cache.invalidate(&path)?;
  tracing::info!(%path, dropped, "revalidated");
  Ok(Json(json!({ "revalidated": true, "path": path })))
}
