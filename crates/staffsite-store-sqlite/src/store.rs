//! The SQLite implementation of [`SiteStore`].

use std::path::Path;

use chrono::{DateTime, Utc};
use rusqlite::OptionalExtension as _;
use serde_json::Value;
use staffsite_core::{
  identity::{Identity, Session},
  section::{Section, SectionRecord},
  store::{NewUser, SiteStore, UserRecord},
};
use uuid::Uuid;

use crate::{
  Error, Result,
  encode::{RawSection, RawSession, RawUser, USER_COLUMNS, encode_dt, encode_uuid},
  schema::SCHEMA,
};

// ─── Store ───────────────────────────────────────────────────────────────────

/// A site store backed by a single SQLite file.
///
/// Cloning is cheap; the inner connection is reference-counted.
#[derive(Clone)]
pub struct SqliteStore {
  conn: tokio_rusqlite::Connection,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  /// Open an in-memory store.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  /// Open the store named by a database URL.
  ///
  /// Accepts `sqlite::memory:`, `:memory:`, `sqlite://<path>`,
  /// `sqlite:<path>` or a bare path.
  pub async fn connect(database_url: &str) -> Result<Self> {
    match database_url {
      "sqlite::memory:" | ":memory:" => Self::open_in_memory().await,
      url => {
        let path = url
          .strip_prefix("sqlite://")
          .or_else(|| url.strip_prefix("sqlite:"))
          .unwrap_or(url);
        tracing::debug!(path, "opening sqlite store");
        Self::open(path).await
      }
    }
  }

  async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  async fn get_user(&self, id: Uuid) -> Result<Option<UserRecord>> {
    let id_str = encode_uuid(id);
    let raw: Option<RawUser> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              &format!("SELECT {USER_COLUMNS} FROM users u WHERE u.user_id = ?1"),
              rusqlite::params![id_str],
              |row| RawUser::from_row(row, 0),
            )
            .optional()?,
        )
      })
      .await?;
    raw.map(RawUser::into_user).transpose()
  }
}

// ─── SiteStore impl ──────────────────────────────────────────────────────────

impl SiteStore for SqliteStore {
  type Error = Error;

  // ── Users ─────────────────────────────────────────────────────────────────

  async fn create_user(&self, user: NewUser) -> Result<Identity> {
    let identity = Identity {
      id:         Uuid::new_v4(),
      name:       user.name,
      email:      user.email,
      role:       user.role,
      department: user.department,
    };

    let id_str     = encode_uuid(identity.id);
    let name       = identity.name.clone();
    let email      = identity.email.clone();
    let role       = identity.role.clone();
    let department = identity.department.clone();
    let hash       = user.password_hash;
    let at_str     = encode_dt(Utc::now());

    let inserted = self
      .conn
      .call(move |conn| {
        let taken = conn
          .query_row(
            "SELECT 1 FROM users WHERE email = ?1",
            rusqlite::params![email],
            |_| Ok(true),
          )
          .optional()?
          .unwrap_or(false);
        if taken {
          return Ok(false);
        }
        conn.execute(
          "INSERT INTO users (
             user_id, name, email, password_hash, role, department, created_at
           ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
          rusqlite::params![id_str, name, email, hash, role, department, at_str],
        )?;
        Ok(true)
      })
      .await?;

    if !inserted {
      return Err(Error::DuplicateEmail(identity.email));
    }
    tracing::info!(user = %identity.id, role = %identity.role, "created user");
    Ok(identity)
  }

  async fn find_user_by_email(&self, email: &str) -> Result<Option<UserRecord>> {
    let email = email.trim().to_string();
    let raw: Option<RawUser> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              &format!("SELECT {USER_COLUMNS} FROM users u WHERE u.email = ?1"),
              rusqlite::params![email],
              |row| RawUser::from_row(row, 0),
            )
            .optional()?,
        )
      })
      .await?;
    raw.map(RawUser::into_user).transpose()
  }

  // ── Sessions ──────────────────────────────────────────────────────────────

  async fn create_session(
    &self,
    token_digest: String,
    user_id: Uuid,
    expires_at: DateTime<Utc>,
  ) -> Result<Session> {
    let user = self
      .get_user(user_id)
      .await?
      .ok_or(Error::UserNotFound(user_id))?;

    let id_str      = encode_uuid(user_id);
    let created_str = encode_dt(Utc::now());
    let expires_str = encode_dt(expires_at);

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO sessions (token_digest, user_id, created_at, expires_at)
           VALUES (?1, ?2, ?3, ?4)",
          rusqlite::params![token_digest, id_str, created_str, expires_str],
        )?;
        Ok(())
      })
      .await?;

    Ok(Session { identity: user.identity, expires_at })
  }

  async fn find_session(
    &self,
    token_digest: &str,
    now: DateTime<Utc>,
  ) -> Result<Option<Session>> {
    let digest = token_digest.to_string();
    let raw: Option<RawSession> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              &format!(
                "SELECT {USER_COLUMNS}, s.expires_at
                 FROM sessions s JOIN users u ON u.user_id = s.user_id
                 WHERE s.token_digest = ?1"
              ),
              rusqlite::params![digest],
              |row| {
                Ok(RawSession {
                  user:       RawUser::from_row(row, 0)?,
                  expires_at: row.get(7)?,
                })
              },
            )
            .optional()?,
        )
      })
      .await?;

    let session = raw.map(RawSession::into_session).transpose()?;
    Ok(session.filter(|s| !s.is_expired_at(now)))
  }

  async fn delete_session(&self, token_digest: &str) -> Result<()> {
    let digest = token_digest.to_string();
    self
      .conn
      .call(move |conn| {
        conn.execute(
          "DELETE FROM sessions WHERE token_digest = ?1",
          rusqlite::params![digest],
        )?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  // ── Content ───────────────────────────────────────────────────────────────

  async fn get_section(&self, section: Section) -> Result<Option<SectionRecord>> {
    let name = section.as_str();
    let raw: Option<RawSection> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              "SELECT section, content_json, updated_at, updated_by
               FROM sections WHERE section = ?1",
              rusqlite::params![name],
              RawSection::from_row,
            )
            .optional()?,
        )
      })
      .await?;
    raw.map(RawSection::into_record).transpose()
  }

  async fn list_sections(&self) -> Result<Vec<SectionRecord>> {
    let raws: Vec<RawSection> = self
      .conn
      .call(|conn| {
        let mut stmt = conn.prepare(
          "SELECT section, content_json, updated_at, updated_by
           FROM sections ORDER BY section",
        )?;
        let rows = stmt
          .query_map([], RawSection::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;
    raws.into_iter().map(RawSection::into_record).collect()
  }

  async fn put_section(
    &self,
    section: Section,
    content: Value,
    updated_by: Option<Uuid>,
  ) -> Result<SectionRecord> {
    let record = SectionRecord { section, content, updated_at: Utc::now(), updated_by };

    let name         = section.as_str();
    let content_json = record.content.to_string();
    let at_str       = encode_dt(record.updated_at);
    let by_str       = updated_by.map(encode_uuid);

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO sections (section, content_json, updated_at, updated_by)
           VALUES (?1, ?2, ?3, ?4)
           ON CONFLICT(section) DO UPDATE SET
             content_json = excluded.content_json,
             updated_at   = excluded.updated_at,
             updated_by   = excluded.updated_by",
          rusqlite::params![name, content_json, at_str, by_str],
        )?;
        Ok(())
      })
      .await?;

    tracing::info!(section = name, "section updated");
    Ok(record)
  }
}
