//! Rendered-output cache for public reads, keyed by request path.
//!
//! Entries live until `/api/revalidate` drops them. Every invalidation bumps
//! the path's generation; a render that started under an older generation is
//! not stored. The lock is only held for map operations, never across an
//! `.await`.

use std::{collections::HashMap, sync::RwLock};

use bytes::Bytes;

use crate::error::Error;

/// A cached response body.
#[derive(Debug, Clone)]
pub struct CachedPage {
  pub body:         Bytes,
  pub content_type: &'static str,
}

/// Invalidation count for one path, read before rendering it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Generation(u64);

#[derive(Debug, Default)]
struct Slots {
  pages:       HashMap<String, CachedPage>,
  generations: HashMap<String, u64>,
}

#[derive(Debug, Default)]
pub struct RenderCache {
  slots: RwLock<Slots>,
}

impl RenderCache {
  pub fn new() -> Self { Self::default() }

  pub fn get(&self, path: &str) -> Option<CachedPage> {
    self.slots.read().ok()?.pages.get(&normalize(path)).cloned()
  }

  /// The current generation of `path`; pass it back to [`Self::insert`].
  pub fn generation(&self, path: &str) -> Generation {
    let current = self
      .slots
      .read()
      .ok()
      .and_then(|slots| slots.generations.get(&normalize(path)).copied())
      .unwrap_or(0);
    Generation(current)
  }

  /// Store `page` unless `path` was invalidated since `rendered_at` was
  /// read. Returns whether the page was stored.
  pub fn insert(&self, path: &str, rendered_at: Generation, page: CachedPage) -> bool {
    let Ok(mut slots) = self.slots.write() else {
      tracing::warn!(path, "render cache lock poisoned; not caching");
      return false;
    };
    let key = normalize(path);
    let current = slots.generations.get(&key).copied().unwrap_or(0);
    if current != rendered_at.0 {
      tracing::debug!(path, "render outdated by revalidation; not caching");
      return false;
    }
    slots.pages.insert(key, page);
    true
  }

  /// Drop the entry for `path` and outdate renders in flight. Returns
  /// whether an entry existed.
  pub fn invalidate(&self, path: &str) -> Result<bool, Error> {
    let mut slots = self
      .slots
      .write()
      .map_err(|_| Error::Internal("render cache lock poisoned".to_string()))?;
    let key = normalize(path);
    let dropped = slots.pages.remove(&key).is_some();
    *slots.generations.entry(key).or_insert(0) += 1;
    Ok(dropped)
  }

  pub fn len(&self) -> usize { self.slots.read().map(|s| s.pages.len()).unwrap_or(0) }

  pub fn is_empty(&self) -> bool { self.len() == 0 }
}

/// `faq/` and `/faq` name the same entry as `/faq`.
fn normalize(path: &str) -> String {
  let trimmed = path.trim().trim_end_matches('/');
  if trimmed.starts_with('/') {
    trimmed.to_string()
  } else {
    format!("/{trimmed}")
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn page(body: &'static str) -> CachedPage {
    CachedPage { body: Bytes::from_static(body.as_bytes()), content_type: "application/json" }
  }

  #[test]
  fn insert_get_invalidate() {
    let cache = RenderCache::new();
    let at = cache.generation("/content/faq");
    assert!(cache.insert("/content/faq", at, page("{}")));
    assert_eq!(cache.get("/content/faq").unwrap().body, Bytes::from_static(b"{}"));

    assert!(cache.invalidate("/content/faq").unwrap());
    assert!(cache.get("/content/faq").is_none());
    assert!(!cache.invalidate("/content/faq").unwrap());
  }

  #[test]
  fn paths_are_normalized() {
    let cache = RenderCache::new();
    let at = cache.generation("content/news/");
    cache.insert("content/news/", at, page("[]"));
    assert!(cache.get("/content/news").is_some());
    assert!(cache.invalidate("/content/news/").unwrap());
    assert!(cache.is_empty());
  }

  #[test]
  fn render_started_before_invalidation_is_not_stored() {
    let cache = RenderCache::new();
    let before = cache.generation("/content/faq");
    cache.invalidate("/content/faq").unwrap();

    assert!(!cache.insert("/content/faq", before, page("\"old\"")));
    assert!(cache.get("/content/faq").is_none());

    let after = cache.generation("/content/faq");
    assert_ne!(before, after);
    assert!(cache.insert("/content/faq", after, page("\"new\"")));
  }

  #[test]
  fn invalidation_only_outdates_its_own_path() {
    let cache = RenderCache::new();
    let news = cache.generation("/content/news");
    cache.invalidate("/content/faq").unwrap();
    assert!(cache.insert("/content/news", news, page("[]")));
  }

  #[test]
  fn root_path_is_kept() {
    assert_eq!(normalize("/"), "/");
    assert_eq!(normalize(""), "/");
  }
}
