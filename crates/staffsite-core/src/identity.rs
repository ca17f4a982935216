//! Authenticated actors and their sessions.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString, IntoStaticStr};
use uuid::Uuid;

/// The closed set of roles the permission table knows about.
#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord,
  Serialize, Deserialize, Display, EnumString, EnumIter, IntoStaticStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Role {
  Admin,
  Editor,
  Viewer,
}

/// An authenticated actor.
///
/// `role` is kept as the raw tag so that a stored role this build does not
/// know resolves to no permissions instead of failing to load.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
  pub id:         Uuid,
  pub name:       String,
  pub email:      String,
  pub role:       String,
  pub department: Option<String>,
}

impl Identity {
  /// The role as a member of the closed enumeration, if it is one.
  pub fn known_role(&self) -> Option<Role> { self.role.parse().ok() }
}

/// An identity bound to an expiring login.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
  pub identity:   Identity,
  pub expires_at: DateTime<Utc>,
}

impl Session {
  pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool { self.expires_at <= now }
}

/// Diagnostic view of an identity and the permissions its role resolves to.
///
/// For support and debugging only; authorization decisions go through
/// [`crate::PermissionTable::require`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IdentityReport {
  pub id:            Uuid,
  pub name:          String,
  pub email:         String,
  pub role:          String,
  pub department:    Option<String>,
  pub permissions:   Vec<String>,
  pub has_file_read: bool,
}
