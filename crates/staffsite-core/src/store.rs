//! The `SiteStore` trait: users, sessions and content sections.
//!
//! Implemented by storage backends (e.g. `staffsite-store-sqlite`). The
//! server depends on this abstraction, not on any concrete backend.

use std::future::Future;

use chrono::{DateTime, Utc};
use serde_json::Value;
use uuid::Uuid;

use crate::{
  identity::{Identity, Session},
  section::{Section, SectionRecord},
};

/// Input for [`SiteStore::create_user`].
#[derive(Debug, Clone)]
pub struct NewUser {
  pub name:          String,
  pub email:         String,
  /// argon2 PHC string.
  pub password_hash: String,
  pub role:          String,
  pub department:    Option<String>,
}

/// A stored user together with its password hash.
#[derive(Debug, Clone)]
pub struct UserRecord {
  pub identity:      Identity,
  pub password_hash: String,
  pub created_at:    DateTime<Utc>,
}

/// Abstraction over a site store backend.
///
/// Session tokens never reach the store in the clear: callers pass a digest.
pub trait SiteStore: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  // ── Users ─────────────────────────────────────────────────────────────

  /// Persist a new user. Emails are unique (case-insensitive).
  fn create_user(
    &self,
    user: NewUser,
  ) -> impl Future<Output = Result<Identity, Self::Error>> + Send + '_;

  /// Look up a user by email (case-insensitive).
  fn find_user_by_email<'a>(
    &'a self,
    email: &'a str,
  ) -> impl Future<Output = Result<Option<UserRecord>, Self::Error>> + Send + 'a;

  // ── Sessions ──────────────────────────────────────────────────────────

  /// Record a session for `user_id`, keyed by `token_digest`.
  fn create_session(
    &self,
    token_digest: String,
    user_id: Uuid,
    expires_at: DateTime<Utc>,
  ) -> impl Future<Output = Result<Session, Self::Error>> + Send + '_;

  /// Resolve a session digest to its session. Expired sessions resolve to
  /// `None`.
  fn find_session<'a>(
    &'a self,
    token_digest: &'a str,
    now: DateTime<Utc>,
  ) -> impl Future<Output = Result<Option<Session>, Self::Error>> + Send + 'a;

  /// Remove a session. Deleting an unknown digest is not an error.
  fn delete_session<'a>(
    &'a self,
    token_digest: &'a str,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + 'a;

  // ── Content ───────────────────────────────────────────────────────────

  fn get_section(
    &self,
    section: Section,
  ) -> impl Future<Output = Result<Option<SectionRecord>, Self::Error>> + Send + '_;

  /// All stored sections, ordered by section name.
  fn list_sections(
    &self,
  ) -> impl Future<Output = Result<Vec<SectionRecord>, Self::Error>> + Send + '_;

  /// Replace a section document.
  fn put_section(
    &self,
    section: Section,
    content: Value,
    updated_by: Option<Uuid>,
  ) -> impl Future<Output = Result<SectionRecord, Self::Error>> + Send + '_;
}
