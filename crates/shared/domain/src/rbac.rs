//! Roles, permissions and the access profile checked by route guards.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::constants::{GUARD_WEB, ROLE_ADMIN};

/// Named permission, unique within its guard
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct Permission {
    pub id: Uuid,
    pub name: String,
    pub guard_name: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Named role with the permissions it grants
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct Role {
    pub id: Uuid,
    pub name: String,
    pub guard_name: String,
    pub permissions: Vec<Permission>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Role {
    pub fn is_admin(&self) -> bool {
        self.name == ROLE_ADMIN
    }

    pub fn permission_ids(&self) -> Vec<Uuid> {
        self.permissions.iter().map(|p| p.id).collect()
    }
}

/// Lightweight role reference carried on users
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct RoleRef {
    pub id: Uuid,
    pub name: String,
}

impl From<&Role> for RoleRef {
    fn from(role: &Role) -> Self {
        Self {
            id: role.id,
            name: role.name.clone(),
        }
    }
}

/// Resolve an optional guard name, falling back to the web guard.
pub fn guard_or_default(guard: Option<&str>) -> String {
    match guard.map(str::trim) {
        Some(g) if !g.is_empty() => g.to_string(),
        _ => GUARD_WEB.to_string(),
    }
}

/// Effective roles and permissions of an authenticated principal.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessProfile {
    pub roles: BTreeSet<String>,
    pub permissions: BTreeSet<String>,
}

impl AccessProfile {
    /// Flatten a set of roles into their names and granted permissions.
    pub fn from_roles(roles: &[Role]) -> Self {
        let mut profile = Self::default();
        for role in roles {
            profile.roles.insert(role.name.clone());
            for permission in &role.permissions {
                profile.permissions.insert(permission.name.clone());
            }
        }
        profile
    }

    pub fn has_role(&self, role: &str) -> bool {
        self.roles.contains(role)
    }

    pub fn has_permission(&self, permission: &str) -> bool {
        self.permissions.contains(permission)
    }

    pub fn is_admin(&self) -> bool {
        self.has_role(ROLE_ADMIN)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn permission(name: &str) -> Permission {
        Permission {
            id: Uuid::new_v4(),
            name: name.to_string(),
            guard_name: GUARD_WEB.to_string(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn role(name: &str, perms: &[&str]) -> Role {
        Role {
            id: Uuid::new_v4(),
            name: name.to_string(),
            guard_name: GUARD_WEB.to_string(),
            permissions: perms.iter().map(|p| permission(p)).collect(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_profile_unions_role_permissions() {
        let profile = AccessProfile::from_roles(&[
            role("editor", &["view-gallery", "manage-gallery"]),
            role("viewer", &["view-gallery", "view-dashboard"]),
        ]);

        assert!(profile.has_role("editor"));
        assert!(profile.has_permission("view-dashboard"));
        assert!(profile.has_permission("manage-gallery"));
        assert!(!profile.has_permission("manage-settings"));
        assert!(!profile.is_admin());
        assert_eq!(profile.permissions.len(), 3);
    }

    #[test]
    fn test_guard_default() {
        assert_eq!(guard_or_default(None), "web");
        assert_eq!(guard_or_default(Some("  ")), "web");
        assert_eq!(guard_or_default(Some("api")), "api");
    }
}
