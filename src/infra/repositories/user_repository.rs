//! User repository implementation with soft delete support.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, Order, PaginatorTrait,
    QueryFilter, Set, TransactionTrait,
};
use uuid::Uuid;

use super::base::{fetch_datatable, fetch_page, TableColumns};
use super::entities::{
    role,
    user::{self, ActiveModel, Entity as UserEntity},
    user_role,
};
use crate::errors::{AppError, AppResult};
use crate::types::{DataTableRequest, DataTableResponse, PaginationParams};
use domain::{RoleRef, User};

#[cfg(any(test, feature = "test-utils"))]
use mockall::automock;

/// Fields of a user about to be inserted
#[derive(Debug, Clone, PartialEq)]
pub struct NewUser {
    pub name: String,
    pub email: String,
    pub password_hash: Option<String>,
    pub email_verified_at: Option<DateTime<Utc>>,
    pub provider: Option<String>,
    pub provider_id: Option<String>,
    pub role_id: Option<Uuid>,
}

/// Changes applied to an existing user. `None` leaves a field untouched.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UserChanges {
    pub name: Option<String>,
    pub email: Option<String>,
    pub password_hash: Option<String>,
    /// Replaces every role assignment with this one
    pub role_id: Option<Uuid>,
}

/// User repository trait for dependency injection.
///
/// By default, all query methods exclude soft-deleted records.
/// Use `*_with_deleted` variants to include them.
#[cfg_attr(any(test, feature = "test-utils"), automock)]
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Find active user by ID (excludes soft-deleted)
    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<User>>;

    /// Find user by ID including soft-deleted
    async fn find_by_id_with_deleted(&self, id: Uuid) -> AppResult<Option<User>>;

    /// Find active user by email address (excludes soft-deleted)
    async fn find_by_email(&self, email: &str) -> AppResult<Option<User>>;

    /// Find the account linked to an OAuth identity, trashed accounts included
    async fn find_by_provider(&self, provider: &str, provider_id: &str)
        -> AppResult<Option<User>>;

    /// Whether any row, trashed or not, other than `except` uses this email
    async fn email_taken(&self, email: &str, except: Option<Uuid>) -> AppResult<bool>;

    /// Insert a user and its role assignment
    async fn create(&self, user: NewUser) -> AppResult<User>;

    /// Update user fields (only active users)
    async fn update(&self, id: Uuid, changes: UserChanges) -> AppResult<User>;

    /// Replace or clear the avatar path
    async fn set_avatar(&self, id: Uuid, path: Option<String>) -> AppResult<User>;

    /// Attach an OAuth identity and mark the email verified
    async fn link_provider(&self, id: Uuid, provider: &str, provider_id: &str) -> AppResult<User>;

    /// Soft delete user by ID (sets deleted_at timestamp)
    async fn soft_delete(&self, id: Uuid) -> AppResult<()>;

    /// Restore a soft-deleted user
    async fn restore(&self, id: Uuid) -> AppResult<User>;

    /// Permanently delete a soft-deleted user
    async fn force_delete(&self, id: Uuid) -> AppResult<()>;

    /// Data-table draw over active users
    async fn datatable(&self, req: &DataTableRequest) -> AppResult<DataTableResponse<User>>;

    /// Page of soft-deleted users
    async fn list_trashed(&self, params: &PaginationParams) -> AppResult<(Vec<User>, u64)>;

    /// Number of active users
    async fn count_active(&self) -> AppResult<u64>;
}

/// Concrete implementation of UserRepository with soft delete
pub struct UserStore {
    db: DatabaseConnection,
}

impl UserStore {
    /// Create new repository instance
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Attach role references to loaded users.
    async fn with_roles(&self, models: Vec<user::Model>) -> AppResult<Vec<User>> {
        if models.is_empty() {
            return Ok(Vec::new());
        }
        let user_ids: Vec<Uuid> = models.iter().map(|m| m.id).collect();

        let assignments = user_role::Entity::find()
            .filter(user_role::Column::UserId.is_in(user_ids))
            .all(&self.db)
            .await?;
        let role_ids: Vec<Uuid> = assignments.iter().map(|a| a.role_id).collect();

        let roles: HashMap<Uuid, RoleRef> = if role_ids.is_empty() {
            HashMap::new()
        } else {
            role::Entity::find()
                .filter(role::Column::Id.is_in(role_ids))
                .all(&self.db)
                .await?
                .into_iter()
                .map(|r| (r.id, RoleRef { id: r.id, name: r.name }))
                .collect()
        };

        Ok(models
            .into_iter()
            .map(|model| {
                let mut user = User::from(model);
                user.roles = assignments
                    .iter()
                    .filter(|a| a.user_id == user.id)
                    .filter_map(|a| roles.get(&a.role_id).cloned())
                    .collect();
                user.roles.sort_by(|a, b| a.name.cmp(&b.name));
                user
            })
            .collect())
    }

    async fn with_roles_one(&self, model: Option<user::Model>) -> AppResult<Option<User>> {
        match model {
            Some(model) => Ok(self.with_roles(vec![model]).await?.pop()),
            None => Ok(None),
        }
    }

    async fn find_active_model(&self, id: Uuid) -> AppResult<user::Model> {
        UserEntity::find_by_id(id)
            .filter(user::Column::DeletedAt.is_null())
            .one(&self.db)
            .await?
            .ok_or(AppError::NotFound)
    }

    async fn reload(&self, id: Uuid) -> AppResult<User> {
        let model = UserEntity::find_by_id(id).one(&self.db).await?;
        self.with_roles_one(model).await?.ok_or(AppError::NotFound)
    }
}

#[async_trait]
impl UserRepository for UserStore {
    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<User>> {
        let result = UserEntity::find_by_id(id)
            .filter(user::Column::DeletedAt.is_null())
            .one(&self.db)
            .await?;

        self.with_roles_one(result).await
    }

    async fn find_by_id_with_deleted(&self, id: Uuid) -> AppResult<Option<User>> {
        let result = UserEntity::find_by_id(id).one(&self.db).await?;
        self.with_roles_one(result).await
    }

    async fn find_by_email(&self, email: &str) -> AppResult<Option<User>> {
        let result = UserEntity::find()
            .filter(user::Column::Email.eq(email))
            .filter(user::Column::DeletedAt.is_null())
            .one(&self.db)
            .await?;

        self.with_roles_one(result).await
    }

    async fn find_by_provider(
        &self,
        provider: &str,
        provider_id: &str,
    ) -> AppResult<Option<User>> {
        let result = UserEntity::find()
            .filter(user::Column::Provider.eq(provider))
            .filter(user::Column::ProviderId.eq(provider_id))
            .one(&self.db)
            .await?;

        self.with_roles_one(result).await
    }

    async fn email_taken(&self, email: &str, except: Option<Uuid>) -> AppResult<bool> {
        let mut query = UserEntity::find().filter(user::Column::Email.eq(email));
        if let Some(id) = except {
            query = query.filter(user::Column::Id.ne(id));
        }
        Ok(query.count(&self.db).await? > 0)
    }

    async fn create(&self, new_user: NewUser) -> AppResult<User> {
        let now = Utc::now();
        let id = Uuid::new_v4();
        let txn = self.db.begin().await?;

        ActiveModel {
            id: Set(id),
            name: Set(new_user.name),
            email: Set(new_user.email),
            password_hash: Set(new_user.password_hash),
            email_verified_at: Set(new_user.email_verified_at),
            avatar_path: Set(None),
            provider: Set(new_user.provider),
            provider_id: Set(new_user.provider_id),
            created_at: Set(now),
            updated_at: Set(now),
            deleted_at: Set(None),
        }
        .insert(&txn)
        .await?;

        if let Some(role_id) = new_user.role_id {
            user_role::ActiveModel {
                user_id: Set(id),
                role_id: Set(role_id),
            }
            .insert(&txn)
            .await?;
        }

        txn.commit().await?;
        self.reload(id).await
    }

    async fn update(&self, id: Uuid, changes: UserChanges) -> AppResult<User> {
        let model = self.find_active_model(id).await?;
        let txn = self.db.begin().await?;

        let mut active: ActiveModel = model.into();
        if let Some(name) = changes.name {
            active.name = Set(name);
        }
        if let Some(email) = changes.email {
            active.email = Set(email);
        }
        if let Some(hash) = changes.password_hash {
            active.password_hash = Set(Some(hash));
        }
        active.updated_at = Set(Utc::now());
        active.update(&txn).await?;

        if let Some(role_id) = changes.role_id {
            user_role::Entity::delete_many()
                .filter(user_role::Column::UserId.eq(id))
                .exec(&txn)
                .await?;
            user_role::ActiveModel {
                user_id: Set(id),
                role_id: Set(role_id),
            }
            .insert(&txn)
            .await?;
        }

        txn.commit().await?;
        self.reload(id).await
    }

    async fn set_avatar(&self, id: Uuid, path: Option<String>) -> AppResult<User> {
        let model = self.find_active_model(id).await?;
        let mut active: ActiveModel = model.into();
        active.avatar_path = Set(path);
        active.updated_at = Set(Utc::now());
        active.update(&self.db).await?;
        self.reload(id).await
    }

    async fn link_provider(&self, id: Uuid, provider: &str, provider_id: &str) -> AppResult<User> {
        let model = self.find_active_model(id).await?;
        let now = Utc::now();
        let verified = model.email_verified_at.unwrap_or(now);

        let mut active: ActiveModel = model.into();
        active.provider = Set(Some(provider.to_string()));
        active.provider_id = Set(Some(provider_id.to_string()));
        active.email_verified_at = Set(Some(verified));
        active.updated_at = Set(now);
        active.update(&self.db).await?;
        self.reload(id).await
    }

    async fn soft_delete(&self, id: Uuid) -> AppResult<()> {
        let model = self.find_active_model(id).await?;

        let mut active: ActiveModel = model.into();
        let now = Utc::now();
        active.deleted_at = Set(Some(now));
        active.updated_at = Set(now);

        active.update(&self.db).await?;
        Ok(())
    }

    async fn restore(&self, id: Uuid) -> AppResult<User> {
        let model = UserEntity::find_by_id(id)
            .filter(user::Column::DeletedAt.is_not_null())
            .one(&self.db)
            .await?
            .ok_or(AppError::NotFound)?;

        let mut active: ActiveModel = model.into();
        active.deleted_at = Set(None);
        active.updated_at = Set(Utc::now());
        active.update(&self.db).await?;

        self.reload(id).await
    }

    async fn force_delete(&self, id: Uuid) -> AppResult<()> {
        // Role assignments go with the row through the foreign key cascade.
        let result = UserEntity::delete_many()
            .filter(user::Column::Id.eq(id))
            .filter(user::Column::DeletedAt.is_not_null())
            .exec(&self.db)
            .await?;

        if result.rows_affected == 0 {
            return Err(AppError::NotFound);
        }

        Ok(())
    }

    async fn datatable(&self, req: &DataTableRequest) -> AppResult<DataTableResponse<User>> {
        let columns = TableColumns::<UserEntity> {
            searchable: &[user::Column::Name, user::Column::Email],
            sortable: &[
                ("name", user::Column::Name),
                ("email", user::Column::Email),
                ("created_at", user::Column::CreatedAt),
            ],
            default_sort: (user::Column::CreatedAt, Order::Desc),
        };
        let base = UserEntity::find().filter(user::Column::DeletedAt.is_null());
        let page = fetch_datatable(&self.db, base, req, &columns).await?;

        let DataTableResponse {
            draw,
            records_total,
            records_filtered,
            data,
        } = page;
        let users = self.with_roles(data).await?;
        Ok(DataTableResponse::new(draw, records_total, records_filtered, users))
    }

    async fn list_trashed(&self, params: &PaginationParams) -> AppResult<(Vec<User>, u64)> {
        use sea_orm::QueryOrder;

        let base = UserEntity::find()
            .filter(user::Column::DeletedAt.is_not_null())
            .order_by_desc(user::Column::DeletedAt);
        let (models, total) = fetch_page(&self.db, base, params).await?;
        Ok((self.with_roles(models).await?, total))
    }

    async fn count_active(&self) -> AppResult<u64> {
        Ok(UserEntity::find()
            .filter(user::Column::DeletedAt.is_null())
            .count(&self.db)
            .await?)
    }
}
