//! Session-cookie authentication.
//!
//! A login mints a random token, hands it to the browser in an `HttpOnly`
//! cookie and stores only `sha256(auth_secret ‖ 0x00 ‖ token)`. Requests
//! resolve their identity by digesting the cookie again and asking the store.

use argon2::{
  Argon2, PasswordHash, PasswordHasher, PasswordVerifier, password_hash::SaltString,
};
use axum::{
  extract::FromRequestParts,
  http::{HeaderMap, HeaderValue, header, request::Parts},
};
use base64::Engine as _;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use chrono::Utc;
use rand_core::{OsRng, RngCore};
use sha2::{Digest, Sha256};
use staffsite_core::{AppConfig, AuthorizationError, Identity, store::SiteStore};

use crate::{AppState, error::Error};

/// Name of the session cookie.
pub const SESSION_COOKIE: &str = "staffsite_session";

/// Session lifetime in days.
pub const SESSION_TTL_DAYS: i64 = 30;

pub fn session_ttl() -> chrono::Duration { chrono::Duration::days(SESSION_TTL_DAYS) }

// ─── Tokens ──────────────────────────────────────────────────────────────────

/// A fresh 256-bit session token, URL-safe base64.
pub fn generate_token() -> String {
  let mut bytes = [0u8; 32];
  OsRng.fill_bytes(&mut bytes);
  URL_SAFE_NO_PAD.encode(bytes)
}

/// Keyed digest under which a token is stored.
pub fn token_digest(secret: &str, token: &str) -> String {
  let mut hasher = Sha256::new();
  hasher.update(secret.as_bytes());
  hasher.update([0u8]);
  hasher.update(token.as_bytes());
  hex::encode(hasher.finalize())
}

/// The session token carried by the `Cookie` header(s), if any.
pub fn session_token(headers: &HeaderMap) -> Option<&str> {
  headers
    .get_all(header::COOKIE)
    .iter()
    .filter_map(|v| v.to_str().ok())
    .flat_map(|v| v.split(';'))
    .filter_map(|pair| pair.trim().split_once('='))
    .find(|(name, _)| *name == SESSION_COOKIE)
    .map(|(_, value)| value.trim_matches('"'))
    .filter(|value| !value.is_empty())
}

/// `Set-Cookie` value that installs `token`.
pub fn session_cookie(token: &str, config: &AppConfig) -> Result<HeaderValue, Error> {
  let secure = if config.is_production() { "; Secure" } else { "" };
  let value = format!(
    "{SESSION_COOKIE}={token}; HttpOnly; SameSite=Lax; Path=/; Max-Age={}{secure}",
    session_ttl().num_seconds()
  );
  HeaderValue::from_str(&value).map_err(|e| Error::Internal(e.to_string()))
}

/// `Set-Cookie` value that removes the session cookie.
pub fn clear_cookie(config: &AppConfig) -> HeaderValue {
  if config.is_production() {
    HeaderValue::from_static(
      "staffsite_session=; HttpOnly; SameSite=Lax; Path=/; Max-Age=0; Secure",
    )
  } else {
    HeaderValue::from_static("staffsite_session=; HttpOnly; SameSite=Lax; Path=/; Max-Age=0")
  }
}

// ─── Passwords ───────────────────────────────────────────────────────────────

/// argon2id PHC string for `password`.
pub fn hash_password(password: &str) -> Result<String, Error> {
  let salt = SaltString::generate(&mut OsRng);
  Argon2::default()
    .hash_password(password.as_bytes(), &salt)
    .map(|hash| hash.to_string())
    .map_err(|e| Error::Internal(format!("argon2 error: {e}")))
}

/// Whether `password` matches the stored PHC string. Malformed hashes never
/// match.
pub fn verify_password(phc: &str, password: &str) -> bool {
  PasswordHash::new(phc)
    .map(|parsed| {
      Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok()
    })
    .unwrap_or(false)
}

// ─── Identity resolution ─────────────────────────────────────────────────────

/// Resolve the identity behind the request's session cookie.
pub async fn resolve_identity<S>(
  state: &AppState<S>,
  headers: &HeaderMap,
) -> Result<Option<Identity>, Error>
where
  S: SiteStore,
{
  let Some(token) = session_token(headers) else {
    return Ok(None);
  };
  let digest = token_digest(state.config.auth_secret(), token);
  let session = state
    .store
    .find_session(&digest, Utc::now())
    .await
    .map_err(Error::store)?;
  Ok(session.map(|s| s.identity))
}

/// The caller's identity, if the request carries a live session.
pub struct CurrentUser(pub Option<Identity>);

/// The caller's identity; rejects with 401 when there is no live session.
pub struct RequireUser(pub Identity);

impl<S> FromRequestParts<AppState<S>> for CurrentUser
where
  S: SiteStore + Clone + Send + Sync + 'static,
{
  type Rejection = Error;

  async fn from_request_parts(
    parts: &mut Parts,
    state: &AppState<S>,
  ) -> Result<Self, Self::Rejection> {
    Ok(CurrentUser(resolve_identity(state, &parts.headers).await?))
  }
}

impl<S> FromRequestParts<AppState<S>> for RequireUser
where
  S: SiteStore + Clone + Send + Sync + 'static,
{
  type Rejection = Error;

  async fn from_request_parts(
    parts: &mut Parts,
    state: &AppState<S>,
  ) -> Result<Self, Self::Rejection> {
    resolve_identity(state, &parts.headers)
      .await?
      .map(RequireUser)
      .ok_or(Error::Authorization(AuthorizationError::Unauthenticated))
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn headers(cookies: &[&str]) -> HeaderMap {
    let mut map = HeaderMap::new();
    for c in cookies {
      map.append(header::COOKIE, HeaderValue::from_str(c).unwrap());
    }
    map
  }

  #[test]
  fn finds_session_cookie_among_others() {
    let h = headers(&["theme=dark; staffsite_session=abc123; lang=de"]);
    assert_eq!(session_token(&h), Some("abc123"));
  }

  #[test]
  fn finds_session_cookie_in_second_header() {
    let h = headers(&["theme=dark", "staffsite_session=xyz"]);
    assert_eq!(session_token(&h), Some("xyz"));
  }

  #[test]
  fn empty_or_missing_cookie_is_none() {
    assert_eq!(session_token(&headers(&[])), None);
    assert_eq!(session_token(&headers(&["staffsite_session="])), None);
    assert_eq!(session_token(&headers(&["other_session=1"])), None);
  }

  #[test]
  fn digest_depends_on_secret_and_token() {
    let a = token_digest("secret-one", "token");
    assert_eq!(a, token_digest("secret-one", "token"));
    assert_ne!(a, token_digest("secret-two", "token"));
    assert_ne!(a, token_digest("secret-one", "other"));
    assert_eq!(a.len(), 64);
  }

  #[test]
  fn tokens_are_unique_and_url_safe() {
    let a = generate_token();
    let b = generate_token();
    assert_ne!(a, b);
    assert_eq!(a.len(), 43);
    assert!(a.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_'));
  }

  #[test]
  fn password_hash_verifies() {
    let hash = hash_password("correct horse").unwrap();
    assert!(verify_password(&hash, "correct horse"));
    assert!(!verify_password(&hash, "wrong"));
    assert!(!verify_password("not-a-phc-string", "correct horse"));
  }
}
