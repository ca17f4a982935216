//! Encoding and decoding helpers between domain types and the plain-text
//! representations stored in SQLite columns.
//!
//! Timestamps are RFC 3339 strings, UUIDs hyphenated lowercase strings and
//! section content compact JSON.

use chrono::{DateTime, Utc};
use staffsite_core::{
  identity::{Identity, Session},
  section::{Section, SectionRecord},
  store::UserRecord,
};
use uuid::Uuid;

use crate::{Error, Result};

// ─── Scalars ──────────────────────────────────────────────────────────────────

pub fn encode_uuid(id: Uuid) -> String { id.hyphenated().to_string() }

pub fn decode_uuid(s: &str) -> Result<Uuid> { Ok(Uuid::parse_str(s)?) }

pub fn encode_dt(dt: DateTime<Utc>) -> String { dt.to_rfc3339() }

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::DateParse(e.to_string()))
}

pub fn decode_section(s: &str) -> Result<Section> {
  s.parse().map_err(|_| Error::UnknownSection(s.to_string()))
}

// ─── Raw row types ───────────────────────────────────────────────────────────

/// A `users` row as read from SQLite.
pub struct RawUser {
  pub user_id:       String,
  pub name:          String,
  pub email:         String,
  pub password_hash: String,
  pub role:          String,
  pub department:    Option<String>,
  pub created_at:    String,
}

/// Column list matching [`RawUser::from_row`].
pub const USER_COLUMNS: &str =
  "u.user_id, u.name, u.email, u.password_hash, u.role, u.department, u.created_at";

impl RawUser {
  /// Read the [`USER_COLUMNS`] starting at column `offset`.
  pub fn from_row(row: &rusqlite::Row<'_>, offset: usize) -> rusqlite::Result<Self> {
    Ok(RawUser {
      user_id:       row.get(offset)?,
      name:          row.get(offset + 1)?,
      email:         row.get(offset + 2)?,
      password_hash: row.get(offset + 3)?,
      role:          row.get(offset + 4)?,
      department:    row.get(offset + 5)?,
      created_at:    row.get(offset + 6)?,
    })
  }

  pub fn into_user(self) -> Result<UserRecord> {
    Ok(UserRecord {
      identity:      Identity {
        id:         decode_uuid(&self.user_id)?,
        name:       self.name,
        email:      self.email,
        role:       self.role,
        department: self.department,
      },
      password_hash: self.password_hash,
      created_at:    decode_dt(&self.created_at)?,
    })
  }
}

/// A `sessions` row joined with its user.
pub struct RawSession {
  pub user:       RawUser,
  pub expires_at: String,
}

impl RawSession {
  pub fn into_session(self) -> Result<Session> {
    Ok(Session {
      identity:   self.user.into_user()?.identity,
      expires_at: decode_dt(&self.expires_at)?,
    })
  }
}

/// A `sections` row.
pub struct RawSection {
  pub section:      String,
  pub content_json: String,
  pub updated_at:   String,
  pub updated_by:   Option<String>,
}

impl RawSection {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(RawSection {
      section:      row.get(0)?,
      content_json: row.get(1)?,
      updated_at:   row.get(2)?,
      updated_by:   row.get(3)?,
    })
  }

  pub fn into_record(self) -> Result<SectionRecord> {
    Ok(SectionRecord {
      section:    decode_section(&self.section)?,
      content:    serde_json::from_str(&self.content_json)?,
      updated_at: decode_dt(&self.updated_at)?,
      updated_by: self.updated_by.as_deref().map(decode_uuid).transpose()?,
    })
  }
}
