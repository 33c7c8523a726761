//! Self-service profile: details, password and avatar.

use async_trait::async_trait;
use std::sync::Arc;
use uuid::Uuid;

use super::ActivityService;
use crate::config::AVATAR_DIRECTORY;
use crate::errors::{AppError, AppResult, OptionExt};
use crate::infra::repositories::{UserChanges, UserRepository};
use crate::infra::FileStorage;
use domain::gallery::check_upload;
use domain::{NewActivity, Password, User, ACTION_UPDATED, ACTION_UPLOADED, ALLOWED_AVATAR_EXTENSIONS};

#[cfg(any(test, feature = "test-utils"))]
use mockall::automock;

#[derive(Debug, Clone, PartialEq)]
pub struct ProfileInput {
    pub name: String,
    pub email: String,
    /// New password; `None` keeps the current one
    pub password: Option<String>,
    pub current_password: Option<String>,
}

#[cfg_attr(any(test, feature = "test-utils"), automock)]
#[async_trait]
pub trait ProfileService: Send + Sync {
    async fn update_profile(&self, user_id: Uuid, input: ProfileInput) -> AppResult<User>;

    /// Store a new avatar and drop the previous file
    async fn upload_avatar(&self, user_id: Uuid, file_name: String, bytes: Vec<u8>)
        -> AppResult<User>;

    async fn remove_avatar(&self, user_id: Uuid) -> AppResult<User>;
}

pub struct ProfileManager {
    users: Arc<dyn UserRepository>,
    storage: Arc<dyn FileStorage>,
    activity: Arc<dyn ActivityService>,
}

impl ProfileManager {
    pub fn new(
        users: Arc<dyn UserRepository>,
        storage: Arc<dyn FileStorage>,
        activity: Arc<dyn ActivityService>,
    ) -> Self {
        Self {
            users,
            storage,
            activity,
        }
    }

    async fn find_user(&self, id: Uuid) -> AppResult<User> {
        self.users.find_by_id(id).await?.ok_or_not_found()
    }

    async fn discard(&self, path: Option<&str>) {
        if let Some(path) = path {
            if let Err(e) = self.storage.delete(path).await {
                tracing::warn!(error = %e, path = %path, "Failed to remove previous avatar");
            }
        }
    }
}

#[async_trait]
impl ProfileService for ProfileManager {
    async fn update_profile(&self, user_id: Uuid, input: ProfileInput) -> AppResult<User> {
        let user = self.find_user(user_id).await?;

        if self.users.email_taken(&input.email, Some(user_id)).await? {
            return Err(AppError::taken("email"));
        }

        let password_hash = match input.password.as_deref() {
            Some(new_password) => {
                // Accounts created through OAuth have nothing to confirm
                if let Some(stored) = user.password_hash.clone() {
                    let confirmed = input
                        .current_password
                        .as_deref()
                        .map(|current| Password::from_hash(stored).verify(current))
                        .unwrap_or(false);
                    if !confirmed {
                        return Err(AppError::field(
                            "current_password",
                            "The password is incorrect.",
                        ));
                    }
                }
                Some(Password::new(new_password)?.into_string())
            }
            None => None,
        };
        let password_changed = password_hash.is_some();

        let updated = self
            .users
            .update(
                user_id,
                UserChanges {
                    name: Some(input.name),
                    email: Some(input.email),
                    password_hash,
                    role_id: None,
                },
            )
            .await?;

        self.activity
            .record(
                NewActivity::new("profile", ACTION_UPDATED)
                    .by(Some(user_id))
                    .on(user_id)
                    .describe(if password_changed {
                        "Updated profile and password"
                    } else {
                        "Updated profile"
                    }),
            )
            .await;
        Ok(updated)
    }

    async fn upload_avatar(
        &self,
        user_id: Uuid,
        file_name: String,
        bytes: Vec<u8>,
    ) -> AppResult<User> {
        let ext = check_upload("avatar", &file_name, bytes.len(), ALLOWED_AVATAR_EXTENSIONS)?;
        let user = self.find_user(user_id).await?;

        let path = format!("{}/{}.{}", AVATAR_DIRECTORY, Uuid::new_v4(), ext);
        self.storage.put(&path, bytes).await?;

        let updated = self.users.set_avatar(user_id, Some(path)).await?;
        self.discard(user.avatar_path.as_deref()).await;

        self.activity
            .record(
                NewActivity::new("profile", ACTION_UPLOADED)
                    .by(Some(user_id))
                    .on(user_id)
                    .describe("Changed avatar"),
            )
            .await;
        Ok(updated)
    }

    async fn remove_avatar(&self, user_id: Uuid) -> AppResult<User> {
        let user = self.find_user(user_id).await?;
        let updated = self.users.set_avatar(user_id, None).await?;
        self.discard(user.avatar_path.as_deref()).await;
        Ok(updated)
    }
}
