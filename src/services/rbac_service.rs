//! Role and permission administration.

use async_trait::async_trait;
use serde_json::json;
use std::sync::Arc;
use uuid::Uuid;

use super::ActivityService;
use crate::errors::{AppError, AppResult, OptionExt};
use crate::infra::repositories::RbacRepository;
use crate::types::{DataTableRequest, DataTableResponse};
use domain::rbac::guard_or_default;
use domain::{FieldErrors, NewActivity, Permission, Role, ACTION_CREATED, ACTION_DELETED, ACTION_UPDATED};

#[cfg(any(test, feature = "test-utils"))]
use mockall::automock;

/// Role form after shape validation
#[derive(Debug, Clone, PartialEq)]
pub struct RoleInput {
    pub name: String,
    pub guard_name: Option<String>,
    pub permission_ids: Vec<Uuid>,
}

/// Permission form after shape validation
#[derive(Debug, Clone, PartialEq)]
pub struct PermissionInput {
    pub name: String,
    pub guard_name: Option<String>,
}

#[cfg_attr(any(test, feature = "test-utils"), automock)]
#[async_trait]
pub trait RbacService: Send + Sync {
    async fn list_roles(&self) -> AppResult<Vec<Role>>;
    async fn get_role(&self, id: Uuid) -> AppResult<Role>;
    async fn roles_datatable(&self, req: &DataTableRequest) -> AppResult<DataTableResponse<Role>>;
    async fn create_role(&self, input: RoleInput, actor: Uuid) -> AppResult<Role>;
    async fn update_role(&self, id: Uuid, input: RoleInput, actor: Uuid) -> AppResult<Role>;
    async fn delete_role(&self, id: Uuid, actor: Uuid) -> AppResult<()>;

    async fn list_permissions(&self) -> AppResult<Vec<Permission>>;
    async fn get_permission(&self, id: Uuid) -> AppResult<Permission>;
    async fn permissions_datatable(
        &self,
        req: &DataTableRequest,
    ) -> AppResult<DataTableResponse<Permission>>;
    async fn create_permission(&self, input: PermissionInput, actor: Uuid) -> AppResult<Permission>;
    async fn update_permission(
        &self,
        id: Uuid,
        input: PermissionInput,
        actor: Uuid,
    ) -> AppResult<Permission>;
    async fn delete_permission(&self, id: Uuid, actor: Uuid) -> AppResult<()>;
}

pub struct RbacManager {
    repo: Arc<dyn RbacRepository>,
    activity: Arc<dyn ActivityService>,
}

impl RbacManager {
    pub fn new(repo: Arc<dyn RbacRepository>, activity: Arc<dyn ActivityService>) -> Self {
        Self { repo, activity }
    }

    /// Name uniqueness within the guard and existence of every requested
    /// permission, reported together. Returns the deduplicated permission ids.
    async fn check_role(
        &self,
        input: &RoleInput,
        guard: &str,
        except: Option<Uuid>,
    ) -> AppResult<Vec<Uuid>> {
        let mut errors = FieldErrors::new();
        if self.repo.role_name_taken(&input.name, guard, except).await? {
            errors.add_taken("name");
        }

        let mut unique = input.permission_ids.clone();
        unique.sort();
        unique.dedup();
        if !unique.is_empty() {
            let existing = self.repo.existing_permission_ids(unique.clone()).await?;
            if existing.len() != unique.len() {
                errors.add_invalid_reference("permissions");
            }
        }

        AppError::check_fields(errors)?;
        Ok(unique)
    }
}

#[async_trait]
impl RbacService for RbacManager {
    async fn list_roles(&self) -> AppResult<Vec<Role>> {
        self.repo.list_roles().await
    }

    async fn get_role(&self, id: Uuid) -> AppResult<Role> {
        self.repo.find_role(id).await?.ok_or_not_found()
    }

    async fn roles_datatable(&self, req: &DataTableRequest) -> AppResult<DataTableResponse<Role>> {
        self.repo.roles_datatable(req).await
    }

    async fn create_role(&self, input: RoleInput, actor: Uuid) -> AppResult<Role> {
        let guard = guard_or_default(input.guard_name.as_deref());
        let permission_ids = self.check_role(&input, &guard, None).await?;

        let role = self
            .repo
            .create_role(input.name, guard, permission_ids)
            .await?;

        self.activity
            .record(
                NewActivity::new("role", ACTION_CREATED)
                    .by(Some(actor))
                    .on(role.id)
                    .describe(format!("Created role {}", role.name))
                    .with_properties(json!({ "permissions": role.permission_ids() })),
            )
            .await;
        Ok(role)
    }

    async fn update_role(&self, id: Uuid, input: RoleInput, actor: Uuid) -> AppResult<Role> {
        self.get_role(id).await?;
        let guard = guard_or_default(input.guard_name.as_deref());
        let permission_ids = self.check_role(&input, &guard, Some(id)).await?;

        let role = self
            .repo
            .update_role(id, input.name, guard, permission_ids)
            .await?;

        self.activity
            .record(
                NewActivity::new("role", ACTION_UPDATED)
                    .by(Some(actor))
                    .on(role.id)
                    .describe(format!("Updated role {}", role.name))
                    .with_properties(json!({ "permissions": role.permission_ids() })),
            )
            .await;
        Ok(role)
    }

    async fn delete_role(&self, id: Uuid, actor: Uuid) -> AppResult<()> {
        let role = self.get_role(id).await?;
        if role.is_admin() {
            return Err(AppError::field("id", "The admin role cannot be deleted."));
        }
        self.repo.delete_role(id).await?;

        self.activity
            .record(
                NewActivity::new("role", ACTION_DELETED)
                    .by(Some(actor))
                    .on(id)
                    .describe(format!("Deleted role {}", role.name)),
            )
            .await;
        Ok(())
    }

    async fn list_permissions(&self) -> AppResult<Vec<Permission>> {
        self.repo.list_permissions().await
    }

    async fn get_permission(&self, id: Uuid) -> AppResult<Permission> {
        self.repo.find_permission(id).await?.ok_or_not_found()
    }

    async fn permissions_datatable(
        &self,
        req: &DataTableRequest,
    ) -> AppResult<DataTableResponse<Permission>> {
        self.repo.permissions_datatable(req).await
    }

    async fn create_permission(&self, input: PermissionInput, actor: Uuid) -> AppResult<Permission> {
        let guard = guard_or_default(input.guard_name.as_deref());
        if self.repo.permission_name_taken(&input.name, &guard, None).await? {
            return Err(AppError::taken("name"));
        }
        let permission = self.repo.create_permission(input.name, guard).await?;

        self.activity
            .record(
                NewActivity::new("permission", ACTION_CREATED)
                    .by(Some(actor))
                    .on(permission.id)
                    .describe(format!("Created permission {}", permission.name)),
            )
            .await;
        Ok(permission)
    }

    async fn update_permission(
        &self,
        id: Uuid,
        input: PermissionInput,
        actor: Uuid,
    ) -> AppResult<Permission> {
        self.get_permission(id).await?;
        let guard = guard_or_default(input.guard_name.as_deref());
        if self
            .repo
            .permission_name_taken(&input.name, &guard, Some(id))
            .await?
        {
            return Err(AppError::taken("name"));
        }
        let permission = self.repo.update_permission(id, input.name, guard).await?;

        self.activity
            .record(
                NewActivity::new("permission", ACTION_UPDATED)
                    .by(Some(actor))
                    .on(permission.id)
                    .describe(format!("Updated permission {}", permission.name)),
            )
            .await;
        Ok(permission)
    }

    async fn delete_permission(&self, id: Uuid, actor: Uuid) -> AppResult<()> {
        let permission = self.get_permission(id).await?;
        self.repo.delete_permission(id).await?;

        self.activity
            .record(
                NewActivity::new("permission", ACTION_DELETED)
                    .by(Some(actor))
                    .on(id)
                    .describe(format!("Deleted permission {}", permission.name)),
            )
            .await;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infra::repositories::MockRbacRepository;
    use crate::services::MockActivityService;
    use chrono::Utc;
    use domain::{GUARD_WEB, ROLE_ADMIN};

    fn role(id: Uuid, name: &str) -> Role {
        Role {
            id,
            name: name.into(),
            guard_name: GUARD_WEB.into(),
            permissions: vec![],
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn quiet_activity() -> Arc<MockActivityService> {
        let mut activity = MockActivityService::new();
        activity.expect_record().returning(|_| ());
        Arc::new(activity)
    }

    #[tokio::test]
    async fn test_create_role_defaults_to_web_guard() {
        let mut repo = MockRbacRepository::new();
        repo.expect_role_name_taken()
            .withf(|name, guard, except| name == "editor" && guard == "web" && except.is_none())
            .returning(|_, _, _| Ok(false));
        repo.expect_existing_permission_ids()
            .returning(|ids| Ok(ids));
        repo.expect_create_role()
            .withf(|_, guard, ids| guard == "web" && ids.len() == 1)
            .returning(|name, _, _| Ok(role(Uuid::new_v4(), &name)));

        let permission = Uuid::new_v4();
        let created = RbacManager::new(Arc::new(repo), quiet_activity())
            .create_role(
                RoleInput {
                    name: "editor".into(),
                    guard_name: None,
                    // Duplicates collapse
                    permission_ids: vec![permission, permission],
                },
                Uuid::new_v4(),
            )
            .await
            .unwrap();

        assert_eq!(created.name, "editor");
    }

    #[tokio::test]
    async fn test_unknown_permission_rejects_role() {
        let mut repo = MockRbacRepository::new();
        repo.expect_role_name_taken().returning(|_, _, _| Ok(true));
        repo.expect_existing_permission_ids().returning(|_| Ok(vec![]));
        repo.expect_create_role().never();

        let err = RbacManager::new(Arc::new(repo), quiet_activity())
            .create_role(
                RoleInput {
                    name: "editor".into(),
                    guard_name: None,
                    permission_ids: vec![Uuid::new_v4()],
                },
                Uuid::new_v4(),
            )
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            AppError::Validation(ref f) if f.contains("permissions") && f.contains("name")
        ));
    }

    #[tokio::test]
    async fn test_renaming_role_to_own_name_is_allowed() {
        let id = Uuid::new_v4();
        let mut repo = MockRbacRepository::new();
        repo.expect_find_role()
            .returning(|id| Ok(Some(role(id, "editor"))));
        repo.expect_role_name_taken()
            .withf(move |_, _, except| *except == Some(id))
            .returning(|_, _, _| Ok(false));
        repo.expect_update_role()
            .returning(|id, name, _, _| Ok(role(id, &name)));

        let updated = RbacManager::new(Arc::new(repo), quiet_activity())
            .update_role(
                id,
                RoleInput {
                    name: "editor".into(),
                    guard_name: Some("web".into()),
                    permission_ids: vec![],
                },
                Uuid::new_v4(),
            )
            .await
            .unwrap();

        assert_eq!(updated.id, id);
    }

    #[tokio::test]
    async fn test_admin_role_cannot_be_deleted() {
        let mut repo = MockRbacRepository::new();
        repo.expect_find_role()
            .returning(|id| Ok(Some(role(id, ROLE_ADMIN))));
        repo.expect_delete_role().never();

        let err = RbacManager::new(Arc::new(repo), quiet_activity())
            .delete_role(Uuid::new_v4(), Uuid::new_v4())
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[tokio::test]
    async fn test_duplicate_permission_name() {
        let mut repo = MockRbacRepository::new();
        repo.expect_permission_name_taken()
            .returning(|_, _, _| Ok(true));
        repo.expect_create_permission().never();

        let err = RbacManager::new(Arc::new(repo), quiet_activity())
            .create_permission(
                PermissionInput {
                    name: "view-users".into(),
                    guard_name: None,
                },
                Uuid::new_v4(),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Validation(ref f) if f.contains("name")));
    }
}
