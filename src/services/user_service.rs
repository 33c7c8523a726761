//! User service - Admin-side account management.
//!
//! Operations on active users exclude soft-deleted rows; restore and
//! force-delete operate on trashed rows only.

use async_trait::async_trait;
use chrono::Utc;
use serde_json::json;
use std::sync::Arc;
use uuid::Uuid;

use super::ActivityService;
use crate::errors::{AppError, AppResult, CollectFieldErrors, OptionExt};
use crate::infra::repositories::{NewUser, RbacRepository, UserChanges, UserRepository};
use crate::infra::FileStorage;
use crate::types::{DataTableRequest, DataTableResponse, PaginationParams};
use domain::{
    FieldErrors, NewActivity, Password, User, ACTION_CREATED, ACTION_DELETED, ACTION_FORCE_DELETED,
    ACTION_RESTORED, ACTION_UPDATED,
};

#[cfg(any(test, feature = "test-utils"))]
use mockall::automock;

/// Validated form for a new account
#[derive(Debug, Clone, PartialEq)]
pub struct CreateUserInput {
    pub name: String,
    pub email: String,
    pub password: String,
    pub role_id: Uuid,
}

/// Validated form for an existing account; a `None` password keeps the hash
#[derive(Debug, Clone, PartialEq)]
pub struct UpdateUserInput {
    pub name: String,
    pub email: String,
    pub password: Option<String>,
    pub role_id: Uuid,
}

#[cfg_attr(any(test, feature = "test-utils"), automock)]
#[async_trait]
pub trait UserService: Send + Sync {
    /// Get active user by ID (excludes soft-deleted)
    async fn get_user(&self, id: Uuid) -> AppResult<User>;

    async fn datatable(&self, req: &DataTableRequest) -> AppResult<DataTableResponse<User>>;

    /// Page of soft-deleted users with the total count
    async fn list_trashed(&self, params: &PaginationParams) -> AppResult<(Vec<User>, u64)>;

    async fn create_user(&self, input: CreateUserInput, actor: Uuid) -> AppResult<User>;

    async fn update_user(&self, id: Uuid, input: UpdateUserInput, actor: Uuid) -> AppResult<User>;

    /// Soft delete; an account cannot delete itself
    async fn delete_user(&self, id: Uuid, actor: Uuid) -> AppResult<()>;

    async fn restore_user(&self, id: Uuid, actor: Uuid) -> AppResult<User>;

    /// Permanently remove a trashed account and its avatar
    async fn force_delete_user(&self, id: Uuid, actor: Uuid) -> AppResult<()>;

    async fn count_users(&self) -> AppResult<u64>;
}

pub struct UserManager {
    users: Arc<dyn UserRepository>,
    rbac: Arc<dyn RbacRepository>,
    storage: Arc<dyn FileStorage>,
    activity: Arc<dyn ActivityService>,
}

impl UserManager {
    pub fn new(
        users: Arc<dyn UserRepository>,
        rbac: Arc<dyn RbacRepository>,
        storage: Arc<dyn FileStorage>,
        activity: Arc<dyn ActivityService>,
    ) -> Self {
        Self {
            users,
            rbac,
            storage,
            activity,
        }
    }

    /// Email uniqueness, role reference and password length, reported
    /// together. Returns the new password hash when one was given.
    async fn check_user(
        &self,
        email: &str,
        except: Option<Uuid>,
        role_id: Uuid,
        password: Option<&str>,
    ) -> AppResult<Option<String>> {
        let mut errors = FieldErrors::new();
        // Trashed rows still own their address
        let (email_taken, role) = tokio::try_join!(
            self.users.email_taken(email, except),
            self.rbac.find_role(role_id),
        )?;
        if email_taken {
            errors.add_taken("email");
        }
        if role.is_none() {
            errors.add_invalid_reference("role_id");
        }

        let mut password_hash = None;
        if let Some(plain) = password {
            match Password::new(plain) {
                Ok(password) => password_hash = Some(password.into_string()),
                Err(err) => Err::<(), _>(err).collect_into(&mut errors)?,
            }
        }

        AppError::check_fields(errors)?;
        Ok(password_hash)
    }

    async fn find_trashed(&self, id: Uuid) -> AppResult<User> {
        self.users
            .find_by_id_with_deleted(id)
            .await?
            .filter(User::is_deleted)
            .ok_or_not_found()
    }
}

#[async_trait]
impl UserService for UserManager {
    async fn get_user(&self, id: Uuid) -> AppResult<User> {
        self.users.find_by_id(id).await?.ok_or_not_found()
    }

    async fn datatable(&self, req: &DataTableRequest) -> AppResult<DataTableResponse<User>> {
        self.users.datatable(req).await
    }

    async fn list_trashed(&self, params: &PaginationParams) -> AppResult<(Vec<User>, u64)> {
        self.users.list_trashed(params).await
    }

    async fn create_user(&self, input: CreateUserInput, actor: Uuid) -> AppResult<User> {
        let password_hash = self
            .check_user(&input.email, None, input.role_id, Some(&input.password))
            .await?;

        let user = self
            .users
            .create(NewUser {
                name: input.name,
                email: input.email,
                password_hash,
                email_verified_at: Some(Utc::now()),
                provider: None,
                provider_id: None,
                role_id: Some(input.role_id),
            })
            .await?;

        tracing::info!(user_id = %user.id, "User created");
        self.activity
            .record(
                NewActivity::new("user", ACTION_CREATED)
                    .by(Some(actor))
                    .on(user.id)
                    .describe(format!("Created user {}", user.email))
                    .with_properties(json!({ "role_id": input.role_id })),
            )
            .await;

        Ok(user)
    }

    async fn update_user(&self, id: Uuid, input: UpdateUserInput, actor: Uuid) -> AppResult<User> {
        self.get_user(id).await?;
        let password_hash = self
            .check_user(&input.email, Some(id), input.role_id, input.password.as_deref())
            .await?;
        let password_changed = password_hash.is_some();

        let user = self
            .users
            .update(
                id,
                UserChanges {
                    name: Some(input.name),
                    email: Some(input.email),
                    password_hash,
                    role_id: Some(input.role_id),
                },
            )
            .await?;

        self.activity
            .record(
                NewActivity::new("user", ACTION_UPDATED)
                    .by(Some(actor))
                    .on(user.id)
                    .describe(format!("Updated user {}", user.email))
                    .with_properties(json!({ "password_changed": password_changed })),
            )
            .await;

        Ok(user)
    }

    async fn delete_user(&self, id: Uuid, actor: Uuid) -> AppResult<()> {
        if id == actor {
            return Err(AppError::Forbidden);
        }
        let user = self.get_user(id).await?;
        self.users.soft_delete(id).await?;

        self.activity
            .record(
                NewActivity::new("user", ACTION_DELETED)
                    .by(Some(actor))
                    .on(id)
                    .describe(format!("Deleted user {}", user.email)),
            )
            .await;
        Ok(())
    }

    async fn restore_user(&self, id: Uuid, actor: Uuid) -> AppResult<User> {
        self.find_trashed(id).await?;
        let user = self.users.restore(id).await?;

        self.activity
            .record(
                NewActivity::new("user", ACTION_RESTORED)
                    .by(Some(actor))
                    .on(id)
                    .describe(format!("Restored user {}", user.email)),
            )
            .await;
        Ok(user)
    }

    async fn force_delete_user(&self, id: Uuid, actor: Uuid) -> AppResult<()> {
        if id == actor {
            return Err(AppError::Forbidden);
        }
        let user = self.find_trashed(id).await?;
        self.users.force_delete(id).await?;

        if let Some(path) = user.avatar_path.as_deref() {
            if let Err(e) = self.storage.delete(path).await {
                tracing::warn!(error = %e, path = %path, "Failed to remove avatar");
            }
        }

        self.activity
            .record(
                NewActivity::new("user", ACTION_FORCE_DELETED)
                    .by(Some(actor))
                    .on(id)
                    .describe(format!("Permanently deleted user {}", user.email)),
            )
            .await;
        Ok(())
    }

    async fn count_users(&self) -> AppResult<u64> {
        self.users.count_active().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infra::repositories::{MockRbacRepository, MockUserRepository};
    use crate::infra::MockFileStorage;
    use crate::services::MockActivityService;
    use domain::{Role, RoleRef, GUARD_WEB};

    fn sample_user(id: Uuid) -> User {
        User {
            id,
            name: "Grace".into(),
            email: "grace@example.com".into(),
            password_hash: Some("$argon2id$stored".into()),
            email_verified_at: Some(Utc::now()),
            avatar_path: None,
            provider: None,
            provider_id: None,
            roles: vec![],
            created_at: Utc::now(),
            updated_at: Utc::now(),
            deleted_at: None,
        }
    }

    fn sample_role(id: Uuid) -> Role {
        Role {
            id,
            name: "editor".into(),
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

    fn manager(users: MockUserRepository, rbac: MockRbacRepository) -> UserManager {
        UserManager::new(
            Arc::new(users),
            Arc::new(rbac),
            Arc::new(MockFileStorage::new()),
            quiet_activity(),
        )
    }

    #[tokio::test]
    async fn test_create_hashes_password_and_marks_verified() {
        let role_id = Uuid::new_v4();

        let mut users = MockUserRepository::new();
        users.expect_email_taken().returning(|_, _| Ok(false));
        users
            .expect_create()
            .withf(move |u| {
                let hash = u.password_hash.as_deref().unwrap_or_default();
                hash.starts_with("$argon2")
                    && hash != "secret-password"
                    && u.email_verified_at.is_some()
                    && u.role_id == Some(role_id)
            })
            .returning(|u| {
                let mut user = sample_user(Uuid::new_v4());
                user.email = u.email;
                user.roles = vec![RoleRef {
                    id: u.role_id.unwrap_or_default(),
                    name: "editor".into(),
                }];
                Ok(user)
            });

        let mut rbac = MockRbacRepository::new();
        rbac.expect_find_role()
            .returning(|id| Ok(Some(sample_role(id))));

        let user = manager(users, rbac)
            .create_user(
                CreateUserInput {
                    name: "Grace".into(),
                    email: "grace@example.com".into(),
                    password: "secret-password".into(),
                    role_id,
                },
                Uuid::new_v4(),
            )
            .await
            .unwrap();

        assert_eq!(user.email, "grace@example.com");
    }

    #[tokio::test]
    async fn test_duplicate_email_is_rejected_without_writing() {
        let mut users = MockUserRepository::new();
        users.expect_email_taken().returning(|_, _| Ok(true));
        users.expect_create().never();

        let mut rbac = MockRbacRepository::new();
        rbac.expect_find_role()
            .returning(|id| Ok(Some(sample_role(id))));

        let err = manager(users, rbac)
            .create_user(
                CreateUserInput {
                    name: "Grace".into(),
                    email: "grace@example.com".into(),
                    password: "secret-password".into(),
                    role_id: Uuid::new_v4(),
                },
                Uuid::new_v4(),
            )
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::Validation(ref f) if f.contains("email")));
    }

    #[tokio::test]
    async fn test_taken_email_unknown_role_and_short_password_reported_together() {
        let mut users = MockUserRepository::new();
        users.expect_email_taken().returning(|_, _| Ok(true));
        users.expect_create().never();

        let mut rbac = MockRbacRepository::new();
        rbac.expect_find_role().returning(|_| Ok(None));

        let err = manager(users, rbac)
            .create_user(
                CreateUserInput {
                    name: "Grace".into(),
                    email: "grace@example.com".into(),
                    password: "short".into(),
                    role_id: Uuid::new_v4(),
                },
                Uuid::new_v4(),
            )
            .await
            .unwrap_err();

        match err {
            AppError::Validation(fields) => {
                assert!(fields.contains("email"));
                assert!(fields.contains("role_id"));
                assert!(fields.contains("password"));
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_unknown_role_is_field_error() {
        let mut users = MockUserRepository::new();
        users.expect_email_taken().returning(|_, _| Ok(false));
        users.expect_create().never();

        let mut rbac = MockRbacRepository::new();
        rbac.expect_find_role().returning(|_| Ok(None));

        let err = manager(users, rbac)
            .create_user(
                CreateUserInput {
                    name: "Grace".into(),
                    email: "grace@example.com".into(),
                    password: "secret-password".into(),
                    role_id: Uuid::new_v4(),
                },
                Uuid::new_v4(),
            )
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::Validation(ref f) if f.contains("role_id")));
    }

    #[tokio::test]
    async fn test_update_keeps_own_email_and_blank_password() {
        let id = Uuid::new_v4();

        let mut users = MockUserRepository::new();
        users
            .expect_find_by_id()
            .returning(|id| Ok(Some(sample_user(id))));
        users
            .expect_email_taken()
            .withf(move |_, except| *except == Some(id))
            .returning(|_, _| Ok(false));
        users
            .expect_update()
            .withf(|_, changes| changes.password_hash.is_none())
            .returning(|id, _| Ok(sample_user(id)));

        let mut rbac = MockRbacRepository::new();
        rbac.expect_find_role()
            .returning(|id| Ok(Some(sample_role(id))));

        let result = manager(users, rbac)
            .update_user(
                id,
                UpdateUserInput {
                    name: "Grace".into(),
                    email: "grace@example.com".into(),
                    password: None,
                    role_id: Uuid::new_v4(),
                },
                Uuid::new_v4(),
            )
            .await;

        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn test_cannot_delete_self() {
        let id = Uuid::new_v4();
        let mut users = MockUserRepository::new();
        users.expect_soft_delete().never();

        let err = manager(users, MockRbacRepository::new())
            .delete_user(id, id)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Forbidden));
    }

    #[tokio::test]
    async fn test_restore_requires_trashed_user() {
        let mut users = MockUserRepository::new();
        users
            .expect_find_by_id_with_deleted()
            .returning(|id| Ok(Some(sample_user(id))));
        users.expect_restore().never();

        let err = manager(users, MockRbacRepository::new())
            .restore_user(Uuid::new_v4(), Uuid::new_v4())
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound));
    }

    #[tokio::test]
    async fn test_force_delete_removes_avatar() {
        let mut users = MockUserRepository::new();
        users.expect_find_by_id_with_deleted().returning(|id| {
            let mut user = sample_user(id);
            user.deleted_at = Some(Utc::now());
            user.avatar_path = Some("avatars/a.png".into());
            Ok(Some(user))
        });
        users.expect_force_delete().times(1).returning(|_| Ok(()));

        let mut storage = MockFileStorage::new();
        storage
            .expect_delete()
            .withf(|path| path == "avatars/a.png")
            .times(1)
            .returning(|_| Ok(()));

        let manager = UserManager::new(
            Arc::new(users),
            Arc::new(MockRbacRepository::new()),
            Arc::new(storage),
            quiet_activity(),
        );

        manager
            .force_delete_user(Uuid::new_v4(), Uuid::new_v4())
            .await
            .unwrap();
    }
}
