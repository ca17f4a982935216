//! Public, unauthenticated reads: cached section content, the crawler policy
//! and the sitemap.

use axum::{
  body::Body,
  extract::{Path, State},
  http::{StatusCode, Uri, header},
  response::Response,
};
use bytes::Bytes;
use staffsite_core::{section::Section, store::SiteStore};

use crate::{
  AppState,
  cache::CachedPage,
  error::Error,
  sitemap,
};

const CONTENT_TYPE_JSON: &str = "application/json";

/// Path prefixes crawlers are asked to stay out of.
pub const DISALLOWED_PREFIXES: [&str; 3] = ["/admin/", "/api/", "/request-staff/"];

fn page_response(page: CachedPage, cache_status: &'static str) -> Response {
  Response::builder()
    .status(StatusCode::OK)
    .header(header::CONTENT_TYPE, page.content_type)
    .header("x-cache", cache_status)
    .body(Body::from(page.body))
    .unwrap_or_default()
}

/// `GET /content/{section}`: section record, cached by path.
pub async fn content<S>(
  State(state): State<AppState<S>>,
  Path(name): Path<String>,
  uri: Uri,
) -> Result<Response, Error>
where
  S: SiteStore + Clone + Send + Sync + 'static,
{
  if let Some(page) = state.cache.get(uri.path()) {
    return Ok(page_response(page, "hit"));
  }
  let generation = state.cache.generation(uri.path());

  let section: Section = name.parse().map_err(|_| Error::NotFound)?;
  let record = state
    .store
    .get_section(section)
    .await
    .map_err(Error::store)?
    .ok_or(Error::NotFound)?;

  let body = serde_json::to_vec(&record).map_err(|e| Error::Internal(e.to_string()))?;
  let page = CachedPage { body: Bytes::from(body), content_type: CONTENT_TYPE_JSON };
  state.cache.insert(uri.path(), generation, page.clone());
  Ok(page_response(page, "miss"))
}

/// `GET /robots.txt`
pub async fn robots<S>(State(state): State<AppState<S>>) -> Response
where
  S: SiteStore + Clone + Send + Sync + 'static,
{
  let mut body = String::from("User-agent: *\nAllow: /\n");
  for prefix in DISALLOWED_PREFIXES {
    body.push_str(&format!("Disallow: {prefix}\n"));
  }
  body.push_str(&format!("\nSitemap: {}\n", state.config.absolute_url("/sitemap.xml")));

  Response::builder()
    .status(StatusCode::OK)
    .header(header::CONTENT_TYPE, "text/plain; charset=utf-8")
    .body(Body::from(body))
    .unwrap_or_default()
}

/// `GET /sitemap.xml`
pub async fn sitemap<S>(State(state): State<AppState<S>>) -> Result<Response, Error>
where
  S: SiteStore + Clone + Send + Sync + 'static,
{
  let records = state.store.list_sections().await.map_err(Error::store)?;
  let xml = sitemap::render(&state.config, &records)?;

  Ok(
    Response::builder()
      .status(StatusCode::OK)
      .header(header::CONTENT_TYPE, "application/xml; charset=utf-8")
      .body(Body::from(xml))
      .unwrap_or_default(),
  )
}
