//! Seed command - Initial access control data, admin account and menus.
//!
//! Every step checks for existing rows first, so the command can be re-run.

use std::sync::Arc;

use chrono::Utc;
use uuid::Uuid;

use crate::cli::args::SeedArgs;
use crate::config::Config;
use crate::errors::AppResult;
use crate::infra::repositories::{
    MenuInput, MenuRepository, MenuStore, NewUser, RbacRepository, RbacStore, UserRepository,
    UserStore,
};
use crate::infra::Database;
use domain::{
    Password, Role, ALL_PERMISSIONS, GUARD_WEB, PERM_MANAGE_SETTINGS,
    PERM_VIEW_DASHBOARD, PERM_VIEW_GALLERY, PERM_VIEW_PRODUCTION, PERM_VIEW_USERS, ROLE_ADMIN,
    ROLE_USER,
};

/// Execute the seed command
pub async fn execute(args: SeedArgs, config: Config) -> AppResult<()> {
    let db = Database::connect(&config).await?;
    let connection = db.get_connection();

    let seeder = Seeder::new(
        Arc::new(RbacStore::new(connection.clone())),
        Arc::new(UserStore::new(connection.clone())),
        Arc::new(MenuStore::new(connection)),
    );
    seeder.run(&args.admin_email, &args.admin_password).await?;

    tracing::info!(admin = %args.admin_email, "Seeding completed");
    Ok(())
}

/// Permissions granted to the default `user` role
const USER_PERMISSIONS: &[&str] = &[PERM_VIEW_DASHBOARD, PERM_VIEW_GALLERY];

pub struct Seeder {
    rbac: Arc<dyn RbacRepository>,
    users: Arc<dyn UserRepository>,
    menus: Arc<dyn MenuRepository>,
}

impl Seeder {
    pub fn new(
        rbac: Arc<dyn RbacRepository>,
        users: Arc<dyn UserRepository>,
        menus: Arc<dyn MenuRepository>,
    ) -> Self {
        Self { rbac, users, menus }
    }

    pub async fn run(&self, admin_email: &str, admin_password: &str) -> AppResult<()> {
        let catalogue = self.permissions().await?;

        let admin = self
            .role(ROLE_ADMIN, catalogue.iter().map(|(_, id)| *id).collect())
            .await?;
        let user_permissions = catalogue
            .iter()
            .filter(|(name, _)| USER_PERMISSIONS.contains(name))
            .map(|(_, id)| *id)
            .collect();
        self.role(ROLE_USER, user_permissions).await?;

        self.admin_account(admin_email, admin_password, admin.id)
            .await?;
        self.default_menus().await
    }

    /// Ensure every catalogue permission exists; returns (name, id) pairs.
    async fn permissions(&self) -> AppResult<Vec<(&'static str, Uuid)>> {
        let mut ids = Vec::with_capacity(ALL_PERMISSIONS.len());
        for &name in ALL_PERMISSIONS {
            let permission = match self.rbac.find_permission_by_name(name, GUARD_WEB).await? {
                Some(existing) => existing,
                None => {
                    tracing::info!(permission = name, "Creating permission");
                    self.rbac
                        .create_permission(name.to_string(), GUARD_WEB.to_string())
                        .await?
                }
            };
            ids.push((name, permission.id));
        }
        Ok(ids)
    }

    /// Create the role, or bring its permission set up to date.
    async fn role(&self, name: &str, permission_ids: Vec<Uuid>) -> AppResult<Role> {
        match self.rbac.find_role_by_name(name, GUARD_WEB).await? {
            Some(existing) => {
                let mut merged = existing.permission_ids();
                for id in permission_ids {
                    if !merged.contains(&id) {
                        merged.push(id);
                    }
                }
                self.rbac
                    .update_role(existing.id, existing.name, existing.guard_name, merged)
                    .await
            }
            None => {
                tracing::info!(role = name, "Creating role");
                self.rbac
                    .create_role(name.to_string(), GUARD_WEB.to_string(), permission_ids)
                    .await
            }
        }
    }

    async fn admin_account(&self, email: &str, password: &str, role_id: Uuid) -> AppResult<()> {
        if self.users.find_by_email(email).await?.is_some() {
            tracing::info!(email, "Admin account already present");
            return Ok(());
        }

        let password_hash = Password::new(password)?.into_string();
        self.users
            .create(NewUser {
                name: "Administrator".to_string(),
                email: email.to_string(),
                password_hash: Some(password_hash),
                email_verified_at: Some(Utc::now()),
                provider: None,
                provider_id: None,
                role_id: Some(role_id),
            })
            .await?;
        tracing::info!(email, "Admin account created");
        Ok(())
    }

    /// Default navigation; skipped once any menu exists.
    async fn default_menus(&self) -> AppResult<()> {
        if !self.menus.list().await?.is_empty() {
            return Ok(());
        }

        self.menu(None, "Dashboard", Some("/dashboard"), "home", PERM_VIEW_DASHBOARD, 0)
            .await?;
        self.menu(None, "Users", Some("/dashboard/users"), "users", PERM_VIEW_USERS, 1)
            .await?;

        let production = self
            .menu(None, "Production", None, "factory", PERM_VIEW_PRODUCTION, 2)
            .await?;
        let children = [
            ("Lines", "/dashboard/production/lines"),
            ("Orders", "/dashboard/production/orders"),
            ("Schedules", "/dashboard/production/schedules"),
        ];
        for (position, (title, route)) in children.into_iter().enumerate() {
            self.menu(
                Some(production),
                title,
                Some(route),
                "circle",
                PERM_VIEW_PRODUCTION,
                position as i32,
            )
            .await?;
        }

        self.menu(None, "Gallery", Some("/dashboard/gallery"), "image", PERM_VIEW_GALLERY, 3)
            .await?;
        self.menu(
            None,
            "Settings",
            Some("/dashboard/settings"),
            "settings",
            PERM_MANAGE_SETTINGS,
            4,
        )
        .await?;

        tracing::info!("Default menus created");
        Ok(())
    }

    async fn menu(
        &self,
        parent_id: Option<Uuid>,
        title: &str,
        route: Option<&str>,
        icon: &str,
        permission: &str,
        position: i32,
    ) -> AppResult<Uuid> {
        let menu = self
            .menus
            .create(MenuInput {
                parent_id,
                title: title.to_string(),
                route: route.map(str::to_string),
                icon: Some(icon.to_string()),
                permission: Some(permission.to_string()),
                position,
                is_active: true,
            })
            .await?;
        Ok(menu.id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infra::repositories::{MockMenuRepository, MockRbacRepository, MockUserRepository};
    use domain::{Menu, Permission, User};
    use mockall::predicate::*;

    fn permission(name: &str) -> Permission {
        Permission {
            id: Uuid::new_v4(),
            name: name.to_string(),
            guard_name: GUARD_WEB.to_string(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn role(name: &str, permissions: Vec<Permission>) -> Role {
        Role {
            id: Uuid::new_v4(),
            name: name.to_string(),
            guard_name: GUARD_WEB.to_string(),
            permissions,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn menu(input: MenuInput) -> Menu {
        Menu {
            id: Uuid::new_v4(),
            parent_id: input.parent_id,
            title: input.title,
            route: input.route,
            icon: input.icon,
            permission: input.permission,
            position: input.position,
            is_active: input.is_active,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_first_run_creates_everything() {
        let mut rbac = MockRbacRepository::new();
        rbac.expect_find_permission_by_name()
            .times(ALL_PERMISSIONS.len())
            .returning(|_, _| Ok(None));
        rbac.expect_create_permission()
            .times(ALL_PERMISSIONS.len())
            .returning(|name, _| Ok(permission(&name)));
        rbac.expect_find_role_by_name().returning(|_, _| Ok(None));
        rbac.expect_create_role()
            .withf(|name, _, ids| name == ROLE_ADMIN && ids.len() == ALL_PERMISSIONS.len())
            .times(1)
            .returning(|name, _, _| Ok(role(&name, vec![])));
        rbac.expect_create_role()
            .withf(|name, _, ids| name == ROLE_USER && ids.len() == USER_PERMISSIONS.len())
            .times(1)
            .returning(|name, _, _| Ok(role(&name, vec![])));

        let mut users = MockUserRepository::new();
        users.expect_find_by_email().returning(|_| Ok(None));
        users
            .expect_create()
            .withf(|new| {
                new.email == "admin@example.com"
                    && new.email_verified_at.is_some()
                    && new.role_id.is_some()
                    && new.password_hash.as_deref() != Some("correct-horse")
            })
            .times(1)
            .returning(|_| Ok(existing_user()));

        let mut menus = MockMenuRepository::new();
        menus.expect_list().returning(|| Ok(vec![]));
        menus.expect_create().times(8).returning(|input| Ok(menu(input)));

        let seeder = Seeder::new(Arc::new(rbac), Arc::new(users), Arc::new(menus));
        seeder.run("admin@example.com", "correct-horse").await.unwrap();
    }

    #[tokio::test]
    async fn test_rerun_keeps_existing_rows() {
        let mut rbac = MockRbacRepository::new();
        rbac.expect_find_permission_by_name()
            .returning(|name, _| Ok(Some(permission(name))));
        rbac.expect_create_permission().never();
        rbac.expect_find_role_by_name()
            .returning(|name, _| Ok(Some(role(name, vec![]))));
        rbac.expect_create_role().never();
        rbac.expect_update_role()
            .times(2)
            .returning(|id, name, guard, _| {
                let mut r = role(&name, vec![]);
                r.id = id;
                r.guard_name = guard;
                Ok(r)
            });

        let mut users = MockUserRepository::new();
        users
            .expect_find_by_email()
            .with(eq("admin@example.com"))
            .returning(|_| Ok(Some(existing_user())));
        users.expect_create().never();

        let mut menus = MockMenuRepository::new();
        menus.expect_list().returning(|| {
            Ok(vec![menu(MenuInput {
                parent_id: None,
                title: "Dashboard".into(),
                route: Some("/dashboard".into()),
                icon: None,
                permission: None,
                position: 0,
                is_active: true,
            })])
        });
        menus.expect_create().never();

        let seeder = Seeder::new(Arc::new(rbac), Arc::new(users), Arc::new(menus));
        seeder.run("admin@example.com", "correct-horse").await.unwrap();
    }

    #[tokio::test]
    async fn test_default_menus_created_on_empty_table() {
        let mut menus = MockMenuRepository::new();
        menus.expect_list().returning(|| Ok(vec![]));
        menus
            .expect_create()
            .times(8)
            .returning(|input| Ok(menu(input)));

        let seeder = Seeder::new(
            Arc::new(MockRbacRepository::new()),
            Arc::new(MockUserRepository::new()),
            Arc::new(menus),
        );
        seeder.default_menus().await.unwrap();
    }

    fn existing_user() -> User {
        User {
            id: Uuid::new_v4(),
            name: "Administrator".into(),
            email: "admin@example.com".into(),
            password_hash: None,
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
}
