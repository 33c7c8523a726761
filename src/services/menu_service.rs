//! Menu administration and the per-user sidebar.

use async_trait::async_trait;
use serde_json::json;
use std::sync::Arc;
use uuid::Uuid;

use super::ActivityService;
use crate::errors::{AppError, AppResult, OptionExt};
use crate::infra::repositories::{MenuInput, MenuRepository};
use crate::types::{DataTableRequest, DataTableResponse};
use domain::menu::{build_sidebar, build_tree, check_reorder, is_descendant};
use domain::{
    AccessProfile, Menu, MenuNode, MenuPosition, NewActivity, ACTION_CREATED, ACTION_DELETED,
    ACTION_REORDERED, ACTION_UPDATED,
};

#[cfg(any(test, feature = "test-utils"))]
use mockall::automock;

#[cfg_attr(any(test, feature = "test-utils"), automock)]
#[async_trait]
pub trait MenuService: Send + Sync {
    /// Every menu as a tree, inactive ones included
    async fn tree(&self) -> AppResult<Vec<MenuNode>>;

    /// Navigation visible to the given access profile
    async fn sidebar(&self, access: &AccessProfile) -> AppResult<Vec<MenuNode>>;

    async fn list(&self) -> AppResult<Vec<Menu>>;
    async fn get_menu(&self, id: Uuid) -> AppResult<Menu>;
    async fn datatable(&self, req: &DataTableRequest) -> AppResult<DataTableResponse<Menu>>;
    async fn create_menu(&self, input: MenuInput, actor: Uuid) -> AppResult<Menu>;
    async fn update_menu(&self, id: Uuid, input: MenuInput, actor: Uuid) -> AppResult<Menu>;
    async fn delete_menu(&self, id: Uuid, actor: Uuid) -> AppResult<()>;
    async fn reorder(&self, items: Vec<MenuPosition>, actor: Uuid) -> AppResult<Vec<MenuNode>>;
}

pub struct MenuManager {
    repo: Arc<dyn MenuRepository>,
    activity: Arc<dyn ActivityService>,
}

impl MenuManager {
    pub fn new(repo: Arc<dyn MenuRepository>, activity: Arc<dyn ActivityService>) -> Self {
        Self { repo, activity }
    }

    async fn log(&self, action: &str, id: Uuid, actor: Uuid, description: String) {
        self.activity
            .record(
                NewActivity::new("menu", action)
                    .by(Some(actor))
                    .on(id)
                    .describe(description),
            )
            .await;
    }
}

#[async_trait]
impl MenuService for MenuManager {
    async fn tree(&self) -> AppResult<Vec<MenuNode>> {
        Ok(build_tree(&self.repo.list().await?))
    }

    async fn sidebar(&self, access: &AccessProfile) -> AppResult<Vec<MenuNode>> {
        Ok(build_sidebar(&self.repo.list().await?, access))
    }

    async fn list(&self) -> AppResult<Vec<Menu>> {
        self.repo.list().await
    }

    async fn get_menu(&self, id: Uuid) -> AppResult<Menu> {
        self.repo.find_by_id(id).await?.ok_or_not_found()
    }

    async fn datatable(&self, req: &DataTableRequest) -> AppResult<DataTableResponse<Menu>> {
        self.repo.datatable(req).await
    }

    async fn create_menu(&self, input: MenuInput, actor: Uuid) -> AppResult<Menu> {
        if let Some(parent) = input.parent_id {
            if self.repo.find_by_id(parent).await?.is_none() {
                return Err(AppError::invalid_reference("parent_id"));
            }
        }
        let menu = self.repo.create(input).await?;
        self.log(ACTION_CREATED, menu.id, actor, format!("Created menu {}", menu.title))
            .await;
        Ok(menu)
    }

    async fn update_menu(&self, id: Uuid, input: MenuInput, actor: Uuid) -> AppResult<Menu> {
        self.get_menu(id).await?;
        if let Some(parent) = input.parent_id {
            let menus = self.repo.list().await?;
            if !menus.iter().any(|m| m.id == parent) {
                return Err(AppError::invalid_reference("parent_id"));
            }
            if is_descendant(&menus, id, parent) {
                return Err(AppError::field(
                    "parent_id",
                    "A menu cannot be nested inside its own descendant.",
                ));
            }
        }
        let menu = self.repo.update(id, input).await?;
        self.log(ACTION_UPDATED, menu.id, actor, format!("Updated menu {}", menu.title))
            .await;
        Ok(menu)
    }

    async fn delete_menu(&self, id: Uuid, actor: Uuid) -> AppResult<()> {
        let menu = self.get_menu(id).await?;
        self.repo.delete(id).await?;
        self.log(ACTION_DELETED, id, actor, format!("Deleted menu {}", menu.title))
            .await;
        Ok(())
    }

    async fn reorder(&self, items: Vec<MenuPosition>, actor: Uuid) -> AppResult<Vec<MenuNode>> {
        let existing = self.repo.list().await?;
        check_reorder(&existing, &items)?;

        let count = items.len();
        self.repo.reorder(items).await?;

        self.activity
            .record(
                NewActivity::new("menu", ACTION_REORDERED)
                    .by(Some(actor))
                    .describe(format!("Reordered {} menu(s)", count))
                    .with_properties(json!({ "count": count })),
            )
            .await;

        self.tree().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infra::repositories::MockMenuRepository;
    use crate::services::MockActivityService;
    use chrono::Utc;

    fn menu(id: Uuid, parent_id: Option<Uuid>, title: &str, permission: Option<&str>) -> Menu {
        Menu {
            id,
            parent_id,
            title: title.into(),
            route: Some(format!("/{}", title.to_lowercase())),
            icon: None,
            permission: permission.map(str::to_string),
            position: 0,
            is_active: true,
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
    async fn test_sidebar_hides_entries_without_permission() {
        let menus = vec![
            menu(Uuid::new_v4(), None, "Dashboard", Some("view-dashboard")),
            menu(Uuid::new_v4(), None, "Settings", Some("manage-settings")),
        ];
        let mut repo = MockMenuRepository::new();
        repo.expect_list().returning(move || Ok(menus.clone()));

        let mut access = AccessProfile::default();
        access.permissions.insert("view-dashboard".into());

        let sidebar = MenuManager::new(Arc::new(repo), quiet_activity())
            .sidebar(&access)
            .await
            .unwrap();

        assert_eq!(sidebar.len(), 1);
        assert_eq!(sidebar[0].title, "Dashboard");
    }

    #[tokio::test]
    async fn test_menu_cannot_move_under_its_child() {
        let parent = Uuid::new_v4();
        let child = Uuid::new_v4();
        let menus = vec![
            menu(parent, None, "Production", None),
            menu(child, Some(parent), "Lines", None),
        ];
        let mut repo = MockMenuRepository::new();
        let stored = menus.clone();
        repo.expect_find_by_id()
            .returning(move |id| Ok(stored.iter().find(|m| m.id == id).cloned()));
        repo.expect_list().returning(move || Ok(menus.clone()));
        repo.expect_update().never();

        let err = MenuManager::new(Arc::new(repo), quiet_activity())
            .update_menu(
                parent,
                MenuInput {
                    parent_id: Some(child),
                    title: "Production".into(),
                    route: None,
                    icon: None,
                    permission: None,
                    position: 0,
                    is_active: true,
                },
                Uuid::new_v4(),
            )
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::Validation(ref f) if f.contains("parent_id")));
    }

    #[tokio::test]
    async fn test_reorder_rejects_cycle_without_writing() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        let menus = vec![menu(a, None, "A", None), menu(b, Some(a), "B", None)];
        let mut repo = MockMenuRepository::new();
        repo.expect_list().returning(move || Ok(menus.clone()));
        repo.expect_reorder().never();

        let result = MenuManager::new(Arc::new(repo), quiet_activity())
            .reorder(
                vec![MenuPosition {
                    id: a,
                    parent_id: Some(b),
                    position: 0,
                }],
                Uuid::new_v4(),
            )
            .await;

        assert!(matches!(result, Err(AppError::Validation(_))));
    }
}
