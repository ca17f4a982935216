//! Login, logout and the diagnostic identity endpoint.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `POST` | `/api/auth/login`  | Body: `{"email":..,"password":..}`; sets the session cookie |
//! | `POST` | `/api/auth/logout` | Drops the session; clears the cookie |
//! | `GET`  | `/api/auth/me`     | Identity plus resolved permissions; 401 without a session |

use axum::{
  Json,
  extract::State,
  http::{HeaderMap, StatusCode, header},
  response::{IntoResponse, Response},
};
use chrono::Utc;
use serde::Deserialize;
use staffsite_core::{IdentityReport, store::SiteStore};

use crate::{
  AppState,
  auth::{
    RequireUser, clear_cookie, generate_token, session_cookie, session_token, session_ttl,
    token_digest, verify_password,
  },
  error::Error,
};

// ─── Login ────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct LoginBody {
  pub email:    String,
  pub password: String,
}

/// `POST /api/auth/login`
pub async fn login<S>(
  State(state): State<AppState<S>>,
  Json(body): Json<LoginBody>,
) -> Result<Response, Error>
where
  S: SiteStore + Clone + Send + Sync + 'static,
{
  let user = state
    .store
    .find_user_by_email(&body.email)
    .await
    .map_err(Error::store)?
    .filter(|u| verify_password(&u.password_hash, &body.password))
    .ok_or_else(|| {
      tracing::info!(email = %body.email, "login failed");
      Error::InvalidCredentials
    })?;

  let token   = generate_token();
  let digest  = token_digest(state.config.auth_secret(), &token);
  let session = state
    .store
    .create_session(digest, user.identity.id, Utc::now() + session_ttl())
    .await
    .map_err(Error::store)?;

  tracing::info!(user = %session.identity.id, role = %session.identity.role, "logged in");
  let cookie = session_cookie(&token, &state.config)?;
  Ok(([(header::SET_COOKIE, cookie)], Json(session)).into_response())
}

// ─── Logout ───────────────────────────────────────────────────────────────────

/// `POST /api/auth/logout`
pub async fn logout<S>(
  State(state): State<AppState<S>>,
  headers: HeaderMap,
) -> Result<Response, Error>
where
  S: SiteStore + Clone + Send + Sync + 'static,
{
  if let Some(token) = session_token(&headers) {
    let digest = token_digest(state.config.auth_secret(), token);
    state
      .store
      .delete_session(&digest)
      .await
      .map_err(Error::store)?;
  }
  Ok(
    (
      StatusCode::NO_CONTENT,
      [(header::SET_COOKIE, clear_cookie(&state.config))],
    )
      .into_response(),
  )
}

// ─── Me ───────────────────────────────────────────────────────────────────────

/// `GET /api/auth/me`
pub async fn me<S>(
  State(state): State<AppState<S>>,
  RequireUser(identity): RequireUser,
) -> Json<IdentityReport>
where
  S: SiteStore + Clone + Send + Sync + 'static,
{
  Json(state.permissions.report(&identity))
}
