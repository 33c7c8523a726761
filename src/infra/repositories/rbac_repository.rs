//! Roles, permissions and their assignments.

use async_trait::async_trait;
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait, Order,
    QueryFilter, QueryOrder, Set, TransactionTrait,
};
use uuid::Uuid;

use super::base::{fetch_datatable, TableColumns};
use super::entities::{permission, role, role_permission, user_role};
use crate::errors::{AppError, AppResult};
use crate::types::{DataTableRequest, DataTableResponse};
use domain::{Permission, Role};

#[cfg(any(test, feature = "test-utils"))]
use mockall::automock;

/// Role and permission persistence.
#[cfg_attr(any(test, feature = "test-utils"), automock)]
#[async_trait]
pub trait RbacRepository: Send + Sync {
    // Roles

    /// Every role with its permissions, by name
    async fn list_roles(&self) -> AppResult<Vec<Role>>;

    async fn find_role(&self, id: Uuid) -> AppResult<Option<Role>>;

    async fn find_role_by_name(&self, name: &str, guard: &str) -> AppResult<Option<Role>>;

    /// Whether another role already uses this (name, guard) pair
    async fn role_name_taken(&self, name: &str, guard: &str, except: Option<Uuid>)
        -> AppResult<bool>;

    /// Insert a role and its permission set in one transaction
    async fn create_role(
        &self,
        name: String,
        guard: String,
        permission_ids: Vec<Uuid>,
    ) -> AppResult<Role>;

    /// Rename a role and replace its permission set in one transaction
    async fn update_role(
        &self,
        id: Uuid,
        name: String,
        guard: String,
        permission_ids: Vec<Uuid>,
    ) -> AppResult<Role>;

    async fn delete_role(&self, id: Uuid) -> AppResult<()>;

    async fn roles_datatable(&self, req: &DataTableRequest) -> AppResult<DataTableResponse<Role>>;

    /// Roles assigned to a user, permissions loaded
    async fn roles_for_user(&self, user_id: Uuid) -> AppResult<Vec<Role>>;

    // Permissions

    async fn list_permissions(&self) -> AppResult<Vec<Permission>>;

    async fn find_permission(&self, id: Uuid) -> AppResult<Option<Permission>>;

    async fn find_permission_by_name(&self, name: &str, guard: &str)
        -> AppResult<Option<Permission>>;

    async fn permission_name_taken(
        &self,
        name: &str,
        guard: &str,
        except: Option<Uuid>,
    ) -> AppResult<bool>;

    async fn create_permission(&self, name: String, guard: String) -> AppResult<Permission>;

    async fn update_permission(&self, id: Uuid, name: String, guard: String)
        -> AppResult<Permission>;

    async fn delete_permission(&self, id: Uuid) -> AppResult<()>;

    async fn permissions_datatable(
        &self,
        req: &DataTableRequest,
    ) -> AppResult<DataTableResponse<Permission>>;

    /// Subset of `ids` that exist
    async fn existing_permission_ids(&self, ids: Vec<Uuid>) -> AppResult<Vec<Uuid>>;
}

/// SeaORM implementation of RbacRepository
pub struct RbacStore {
    db: DatabaseConnection,
}

impl RbacStore {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Load permissions for the given role rows.
    async fn with_permissions<C: ConnectionTrait>(
        db: &C,
        models: Vec<role::Model>,
    ) -> AppResult<Vec<Role>> {
        if models.is_empty() {
            return Ok(Vec::new());
        }
        let role_ids: Vec<Uuid> = models.iter().map(|m| m.id).collect();

        let links = role_permission::Entity::find()
            .filter(role_permission::Column::RoleId.is_in(role_ids))
            .all(db)
            .await?;
        let permission_ids: Vec<Uuid> = links.iter().map(|l| l.permission_id).collect();

        let permissions: Vec<Permission> = if permission_ids.is_empty() {
            Vec::new()
        } else {
            permission::Entity::find()
                .filter(permission::Column::Id.is_in(permission_ids))
                .order_by_asc(permission::Column::Name)
                .all(db)
                .await?
                .into_iter()
                .map(Permission::from)
                .collect()
        };

        Ok(models
            .into_iter()
            .map(|model| {
                let mut role = Role::from(model);
                role.permissions = permissions
                    .iter()
                    .filter(|p| {
                        links
                            .iter()
                            .any(|l| l.role_id == role.id && l.permission_id == p.id)
                    })
                    .cloned()
                    .collect();
                role
            })
            .collect())
    }

    async fn sync_permissions<C: ConnectionTrait>(
        db: &C,
        role_id: Uuid,
        permission_ids: Vec<Uuid>,
    ) -> AppResult<()> {
        role_permission::Entity::delete_many()
            .filter(role_permission::Column::RoleId.eq(role_id))
            .exec(db)
            .await?;

        if permission_ids.is_empty() {
            return Ok(());
        }

        let mut unique = permission_ids;
        unique.sort();
        unique.dedup();

        let rows = unique.into_iter().map(|permission_id| role_permission::ActiveModel {
            role_id: Set(role_id),
            permission_id: Set(permission_id),
        });
        role_permission::Entity::insert_many(rows).exec(db).await?;
        Ok(())
    }

    async fn load_role(&self, id: Uuid) -> AppResult<Option<Role>> {
        let model = role::Entity::find_by_id(id).one(&self.db).await?;
        match model {
            Some(model) => Ok(Self::with_permissions(&self.db, vec![model]).await?.pop()),
            None => Ok(None),
        }
    }
}

#[async_trait]
impl RbacRepository for RbacStore {
    async fn list_roles(&self) -> AppResult<Vec<Role>> {
        let models = role::Entity::find()
            .order_by_asc(role::Column::Name)
            .all(&self.db)
            .await?;
        Self::with_permissions(&self.db, models).await
    }

    async fn find_role(&self, id: Uuid) -> AppResult<Option<Role>> {
        self.load_role(id).await
    }

    async fn find_role_by_name(&self, name: &str, guard: &str) -> AppResult<Option<Role>> {
        let model = role::Entity::find()
            .filter(role::Column::Name.eq(name))
            .filter(role::Column::GuardName.eq(guard))
            .one(&self.db)
            .await?;
        match model {
            Some(model) => Ok(Self::with_permissions(&self.db, vec![model]).await?.pop()),
            None => Ok(None),
        }
    }

    async fn role_name_taken(
        &self,
        name: &str,
        guard: &str,
        except: Option<Uuid>,
    ) -> AppResult<bool> {
        let mut query = role::Entity::find()
            .filter(role::Column::Name.eq(name))
            .filter(role::Column::GuardName.eq(guard));
        if let Some(id) = except {
            query = query.filter(role::Column::Id.ne(id));
        }
        Ok(query.one(&self.db).await?.is_some())
    }

    async fn create_role(
        &self,
        name: String,
        guard: String,
        permission_ids: Vec<Uuid>,
    ) -> AppResult<Role> {
        let now = Utc::now();
        let id = Uuid::new_v4();
        let txn = self.db.begin().await?;

        role::ActiveModel {
            id: Set(id),
            name: Set(name),
            guard_name: Set(guard),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(&txn)
        .await?;
        Self::sync_permissions(&txn, id, permission_ids).await?;

        txn.commit().await?;
        self.load_role(id).await?.ok_or(AppError::NotFound)
    }

    async fn update_role(
        &self,
        id: Uuid,
        name: String,
        guard: String,
        permission_ids: Vec<Uuid>,
    ) -> AppResult<Role> {
        let model = role::Entity::find_by_id(id)
            .one(&self.db)
            .await?
            .ok_or(AppError::NotFound)?;
        let txn = self.db.begin().await?;

        let mut active: role::ActiveModel = model.into();
        active.name = Set(name);
        active.guard_name = Set(guard);
        active.updated_at = Set(Utc::now());
        active.update(&txn).await?;
        Self::sync_permissions(&txn, id, permission_ids).await?;

        txn.commit().await?;
        self.load_role(id).await?.ok_or(AppError::NotFound)
    }

    async fn delete_role(&self, id: Uuid) -> AppResult<()> {
        let result = role::Entity::delete_by_id(id).exec(&self.db).await?;
        if result.rows_affected == 0 {
            return Err(AppError::NotFound);
        }
        Ok(())
    }

    async fn roles_datatable(&self, req: &DataTableRequest) -> AppResult<DataTableResponse<Role>> {
        let columns = TableColumns::<role::Entity> {
            searchable: &[role::Column::Name, role::Column::GuardName],
            sortable: &[
                ("name", role::Column::Name),
                ("guard_name", role::Column::GuardName),
                ("created_at", role::Column::CreatedAt),
            ],
            default_sort: (role::Column::Name, Order::Asc),
        };
        let page = fetch_datatable(&self.db, role::Entity::find(), req, &columns).await?;
        let roles = Self::with_permissions(&self.db, page.data).await?;
        Ok(DataTableResponse::new(
            page.draw,
            page.records_total,
            page.records_filtered,
            roles,
        ))
    }

    async fn roles_for_user(&self, user_id: Uuid) -> AppResult<Vec<Role>> {
        let role_ids: Vec<Uuid> = user_role::Entity::find()
            .filter(user_role::Column::UserId.eq(user_id))
            .all(&self.db)
            .await?
            .into_iter()
            .map(|a| a.role_id)
            .collect();
        if role_ids.is_empty() {
            return Ok(Vec::new());
        }

        let models = role::Entity::find()
            .filter(role::Column::Id.is_in(role_ids))
            .all(&self.db)
            .await?;
        Self::with_permissions(&self.db, models).await
    }

    async fn list_permissions(&self) -> AppResult<Vec<Permission>> {
        Ok(permission::Entity::find()
            .order_by_asc(permission::Column::Name)
            .all(&self.db)
            .await?
            .into_iter()
            .map(Permission::from)
            .collect())
    }

    async fn find_permission(&self, id: Uuid) -> AppResult<Option<Permission>> {
        Ok(permission::Entity::find_by_id(id)
            .one(&self.db)
            .await?
            .map(Permission::from))
    }

    async fn find_permission_by_name(
        &self,
        name: &str,
        guard: &str,
    ) -> AppResult<Option<Permission>> {
        Ok(permission::Entity::find()
            .filter(permission::Column::Name.eq(name))
            .filter(permission::Column::GuardName.eq(guard))
            .one(&self.db)
            .await?
            .map(Permission::from))
    }

    async fn permission_name_taken(
        &self,
        name: &str,
        guard: &str,
        except: Option<Uuid>,
    ) -> AppResult<bool> {
        let mut query = permission::Entity::find()
            .filter(permission::Column::Name.eq(name))
            .filter(permission::Column::GuardName.eq(guard));
        if let Some(id) = except {
            query = query.filter(permission::Column::Id.ne(id));
        }
        Ok(query.one(&self.db).await?.is_some())
    }

    async fn create_permission(&self, name: String, guard: String) -> AppResult<Permission> {
        let now = Utc::now();
        let model = permission::ActiveModel {
            id: Set(Uuid::new_v4()),
            name: Set(name),
            guard_name: Set(guard),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(&self.db)
        .await?;
        Ok(Permission::from(model))
    }

    async fn update_permission(
        &self,
        id: Uuid,
        name: String,
        guard: String,
    ) -> AppResult<Permission> {
        let model = permission::Entity::find_by_id(id)
            .one(&self.db)
            .await?
            .ok_or(AppError::NotFound)?;

        let mut active: permission::ActiveModel = model.into();
        active.name = Set(name);
        active.guard_name = Set(guard);
        active.updated_at = Set(Utc::now());
        Ok(Permission::from(active.update(&self.db).await?))
    }

    async fn delete_permission(&self, id: Uuid) -> AppResult<()> {
        let result = permission::Entity::delete_by_id(id).exec(&self.db).await?;
        if result.rows_affected == 0 {
            return Err(AppError::NotFound);
        }
        Ok(())
    }

    async fn permissions_datatable(
        &self,
        req: &DataTableRequest,
    ) -> AppResult<DataTableResponse<Permission>> {
        let columns = TableColumns::<permission::Entity> {
            searchable: &[permission::Column::Name, permission::Column::GuardName],
            sortable: &[
                ("name", permission::Column::Name),
                ("guard_name", permission::Column::GuardName),
                ("created_at", permission::Column::CreatedAt),
            ],
            default_sort: (permission::Column::Name, Order::Asc),
        };
        let page = fetch_datatable(&self.db, permission::Entity::find(), req, &columns).await?;
        Ok(page.map(Permission::from))
    }

    async fn existing_permission_ids(&self, ids: Vec<Uuid>) -> AppResult<Vec<Uuid>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        Ok(permission::Entity::find()
            .filter(permission::Column::Id.is_in(ids))
            .all(&self.db)
            .await?
            .into_iter()
            .map(|p| p.id)
            .collect())
    }
}
