//! Role → permission resolution.
//!
//! [`PermissionTable`] is built once at startup and shared read-only. Lookups
//! are pure: the same role always yields the same set, and a role the table
//! does not know yields the empty set.

use std::collections::{BTreeSet, HashMap};

use serde::Serialize;
use strum::{Display, EnumIter, EnumString, IntoStaticStr};

use crate::{
  error::AuthorizationError,
  identity::{Identity, IdentityReport, Role},
};

/// A namespaced capability tag, `resource:action`.
#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord,
  Display, EnumString, EnumIter, IntoStaticStr,
)]
pub enum Permission {
  #[strum(serialize = "content:read")]
  ContentRead,
  #[strum(serialize = "content:write")]
  ContentWrite,
  #[strum(serialize = "file:read")]
  FileRead,
  #[strum(serialize = "file:write")]
  FileWrite,
  #[strum(serialize = "user:manage")]
  UserManage,
}

impl Permission {
  pub fn as_str(self) -> &'static str { self.into() }
}

impl Serialize for Permission {
  fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(self.as_str())
  }
}

/// Immutable mapping from role to granted permissions.
#[derive(Debug, Clone)]
pub struct PermissionTable {
  grants: HashMap<Role, BTreeSet<Permission>>,
}

impl PermissionTable {
  /// The table compiled into this build.
  pub fn builtin() -> Self {
    use Permission::*;

    let grants = HashMap::from([
      (
        Role::Admin,
        BTreeSet::from([ContentRead, ContentWrite, FileRead, FileWrite, UserManage]),
      ),
      (Role::Editor, BTreeSet::from([ContentRead, ContentWrite])),
      (Role::Viewer, BTreeSet::from([ContentRead])),
    ]);
    Self { grants }
  }

  fn grants(&self, role: Option<Role>) -> Option<&BTreeSet<Permission>> {
    role.and_then(|r| self.grants.get(&r))
  }

  /// Permissions granted to the role tag `role`. Empty for unknown tags.
  pub fn permissions_for(&self, role: &str) -> BTreeSet<Permission> {
    self.grants(role.parse().ok()).cloned().unwrap_or_default()
  }

  /// Whether `role` is granted the permission tag `tag`.
  pub fn has_permission(&self, role: &str, tag: &str) -> bool {
    match tag.parse::<Permission>() {
      Ok(permission) => self.grants_permission(role, permission),
      Err(_) => false,
    }
  }

  pub fn grants_permission(&self, role: &str, permission: Permission) -> bool {
    self
      .grants(role.parse().ok())
      .is_some_and(|set| set.contains(&permission))
  }

  /// Identity fields plus the full resolved permission set.
  pub fn report(&self, identity: &Identity) -> IdentityReport {
    let permissions = self.grants(identity.known_role()).cloned().unwrap_or_default();
    IdentityReport {
      id:            identity.id,
      name:          identity.name.clone(),
      email:         identity.email.clone(),
      role:          identity.role.clone(),
      department:    identity.department.clone(),
      has_file_read: permissions.contains(&Permission::FileRead),
      permissions:   permissions.iter().map(|p| p.as_str().to_string()).collect(),
    }
  }

  /// Gate a privileged operation on `identity` holding `permission`.
  pub fn require(
    &self,
    identity: Option<&Identity>,
    permission: Permission,
  ) -> Result<(), AuthorizationError> {
    let identity = identity.ok_or(AuthorizationError::Unauthenticated)?;
    if self
      .grants(identity.known_role())
      .is_some_and(|set| set.contains(&permission))
    {
      Ok(())
    } else {
      tracing::debug!(
        user = %identity.id,
        role = %identity.role,
        %permission,
        "permission denied"
      );
      Err(AuthorizationError::Forbidden { permission })
    }
  }
}
