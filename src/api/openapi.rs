//! OpenAPI documentation configuration.
//!
//! Served through Swagger UI at `/swagger-ui`.

use utoipa::openapi::security::{ApiKey, ApiKeyValue, HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};

use crate::api::handlers::{
    activity_handler, auth_handler, dashboard_handler, gallery_handler, menu_handler,
    production_handler, profile_handler, public_handler, role_handler, settings_handler,
    user_handler,
};
use crate::services::{
    DashboardStats, GalleryListing, ProductionCounts, ScheduleDetail, ScheduleFormOptions,
    StatusCount,
};
use crate::types::{DataTableOrder, DataTableRequest, DataTableSearch, SortDirection};
use domain::{
    ActivityLog, AppSetting, Folder, GalleryFile, MasterLine, MasterOrder, Menu, MenuNode,
    MenuPosition, OrderStatus, Permission, PublicSettings, Role, RoleRef, Schedule, ScheduleDay,
    ScheduleStatus, SocialLinks, UserResponse, Visibility,
};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Back Office API",
        version = "0.1.0",
        description = "Administration back office: users, roles, production scheduling, gallery, menus and settings"
    ),
    servers((url = "http://localhost:3000", description = "Local development server")),
    paths(
        public_handler::health,
        public_handler::app_settings,
        public_handler::public_file,
        auth_handler::login,
        auth_handler::logout,
        auth_handler::oauth_redirect,
        auth_handler::oauth_callback,
        dashboard_handler::index,
        dashboard_handler::sidebar,
        user_handler::index,
        user_handler::datatable,
        user_handler::create,
        user_handler::store,
        user_handler::edit,
        user_handler::update,
        user_handler::destroy,
        user_handler::trashed,
        user_handler::restore,
        user_handler::force_destroy,
        production_handler::lines_index,
        production_handler::lines_datatable,
        production_handler::lines_create,
        production_handler::lines_store,
        production_handler::lines_edit,
        production_handler::lines_update,
        production_handler::lines_destroy,
        production_handler::orders_index,
        production_handler::orders_datatable,
        production_handler::orders_create,
        production_handler::orders_store,
        production_handler::orders_edit,
        production_handler::orders_update,
        production_handler::orders_destroy,
        production_handler::schedules_index,
        production_handler::schedules_datatable,
        production_handler::schedules_create,
        production_handler::schedules_store,
        production_handler::schedules_show,
        production_handler::schedules_edit,
        production_handler::schedules_update,
        production_handler::schedules_destroy,
        production_handler::schedules_outputs,
        gallery_handler::index,
        gallery_handler::datatable,
        gallery_handler::create_folder,
        gallery_handler::rename_folder,
        gallery_handler::delete_folder,
        gallery_handler::upload,
        gallery_handler::set_visibility,
        gallery_handler::delete_file,
        gallery_handler::private_file,
        profile_handler::show,
        profile_handler::update,
        profile_handler::upload_avatar,
        profile_handler::remove_avatar,
        settings_handler::edit,
        settings_handler::update,
        role_handler::roles_index,
        role_handler::roles_datatable,
        role_handler::roles_create,
        role_handler::roles_store,
        role_handler::roles_edit,
        role_handler::roles_update,
        role_handler::roles_destroy,
        role_handler::permissions_index,
        role_handler::permissions_datatable,
        role_handler::permissions_create,
        role_handler::permissions_store,
        role_handler::permissions_edit,
        role_handler::permissions_update,
        role_handler::permissions_destroy,
        menu_handler::index,
        menu_handler::datatable,
        menu_handler::create,
        menu_handler::store,
        menu_handler::edit,
        menu_handler::update,
        menu_handler::destroy,
        menu_handler::reorder,
        activity_handler::index,
        activity_handler::datatable,
        activity_handler::stream,
    ),
    components(
        schemas(
            // Domain types
            UserResponse,
            Role,
            RoleRef,
            Permission,
            MasterLine,
            MasterOrder,
            OrderStatus,
            Schedule,
            ScheduleStatus,
            ScheduleDay,
            Folder,
            GalleryFile,
            Visibility,
            Menu,
            MenuNode,
            MenuPosition,
            AppSetting,
            PublicSettings,
            SocialLinks,
            ActivityLog,
            // Service views
            DashboardStats,
            ProductionCounts,
            StatusCount,
            ScheduleDetail,
            ScheduleFormOptions,
            GalleryListing,
            // Data tables
            DataTableRequest,
            DataTableSearch,
            DataTableOrder,
            SortDirection,
            // Requests and forms
            public_handler::HealthResponse,
            public_handler::ServiceHealth,
            public_handler::ServiceStatus,
            auth_handler::LoginRequest,
            auth_handler::LoginResponse,
            user_handler::StoreUserRequest,
            user_handler::UpdateUserRequest,
            user_handler::UserForm,
            production_handler::LineRequest,
            production_handler::OrderRequest,
            production_handler::ScheduleRequest,
            production_handler::OutputItem,
            production_handler::OutputsRequest,
            production_handler::OrderForm,
            production_handler::ScheduleForm,
            gallery_handler::CreateFolderRequest,
            gallery_handler::RenameFolderRequest,
            gallery_handler::VisibilityRequest,
            profile_handler::ProfileRequest,
            settings_handler::SettingsRequest,
            settings_handler::SocialLinksRequest,
            role_handler::RoleRequest,
            role_handler::PermissionRequest,
            role_handler::RoleForm,
            menu_handler::MenuRequest,
            menu_handler::ReorderRequest,
            menu_handler::MenuForm,
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "System", description = "Health and public endpoints"),
        (name = "Authentication", description = "Password and OAuth sign-in"),
        (name = "Dashboard", description = "Counters and navigation"),
        (name = "Users", description = "User management"),
        (name = "Production", description = "Lines, orders and schedules"),
        (name = "Gallery", description = "Folders and uploaded files"),
        (name = "Profile", description = "The signed-in user's own account"),
        (name = "Settings", description = "Application settings"),
        (name = "Admin", description = "Roles, permissions, menus and activity log")
    )
)]
pub struct ApiDoc;

/// Bearer token and session cookie schemes
struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .description(Some("JWT token obtained from /login"))
                        .build(),
                ),
            );
            components.add_security_scheme(
                "session_cookie",
                SecurityScheme::ApiKey(ApiKey::Cookie(ApiKeyValue::new(
                    crate::config::SESSION_COOKIE,
                ))),
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_document_lists_admin_and_dashboard_paths() {
        let doc = ApiDoc::openapi();
        let paths = &doc.paths.paths;
        assert!(paths.contains_key("/dashboard/production/schedules/{id}/outputs"));
        assert!(paths.contains_key("/admin/menus/reorder"));
        assert!(paths.contains_key("/login"));
    }

    #[test]
    fn test_document_declares_bearer_scheme() {
        let doc = ApiDoc::openapi();
        let components = doc.components.expect("components");
        assert!(components.security_schemes.contains_key("bearer_auth"));
    }
}
