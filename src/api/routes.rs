//! Application route configuration.

use axum::{
    extract::DefaultBodyLimit,
    http::{
        header::{AUTHORIZATION, CONTENT_TYPE},
        HeaderValue, Method,
    },
    middleware,
    routing::{get, post, put},
    Router,
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use super::handlers::{
    activity_handler, auth_handler, dashboard_handler, gallery_handler, menu_handler,
    production_handler, profile_handler, public_handler, role_handler, settings_handler,
    user_handler,
};
use super::middleware::{
    admin_middleware, auth_middleware, input_echo_middleware, login_rate_limit,
    maintenance_middleware, upload_rate_limit,
};
use super::openapi::ApiDoc;
use super::AppState;
use crate::config::{Config, UPLOAD_BODY_LIMIT};

/// Create the application router with all routes configured
pub fn create_router(state: AppState) -> Router {
    let cors = cors_layer(&state.config);

    Router::new()
        // Public endpoints
        .route("/", get(public_handler::root))
        .route("/health", get(public_handler::health))
        .route("/app", get(public_handler::app_settings))
        .route("/storage/*path", get(public_handler::public_file))
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .merge(auth_routes(&state))
        // Authenticated, verified users
        .merge(dashboard_routes(&state))
        // Role `admin` only
        .nest("/admin", admin_routes(&state))
        // Global middleware
        .layer(middleware::from_fn(input_echo_middleware))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn auth_routes(state: &AppState) -> Router<AppState> {
    let login = Router::new()
        .route("/login", post(auth_handler::login))
        .route_layer(middleware::from_fn_with_state(state.clone(), login_rate_limit));

    Router::new()
        .merge(login)
        .route("/logout", post(auth_handler::logout))
        .route("/auth/:provider/redirect", get(auth_handler::oauth_redirect))
        .route("/auth/:provider/callback", get(auth_handler::oauth_callback))
}

fn dashboard_routes(state: &AppState) -> Router<AppState> {
    let uploads = Router::new()
        .route("/dashboard/gallery/files", post(gallery_handler::upload))
        .route(
            "/dashboard/profile/avatar",
            post(profile_handler::upload_avatar).delete(profile_handler::remove_avatar),
        )
        .route_layer(middleware::from_fn_with_state(state.clone(), upload_rate_limit))
        .layer(DefaultBodyLimit::max(UPLOAD_BODY_LIMIT));

    Router::new()
        .route("/dashboard", get(dashboard_handler::index))
        .route("/dashboard/sidebar", get(dashboard_handler::sidebar))
        .merge(user_routes())
        .merge(production_routes())
        .merge(gallery_routes())
        .route(
            "/dashboard/profile",
            get(profile_handler::show).put(profile_handler::update),
        )
        .route(
            "/dashboard/settings",
            get(settings_handler::edit).put(settings_handler::update),
        )
        .merge(uploads)
        // route_layer runs bottom-up: auth first, then the maintenance gate
        .route_layer(middleware::from_fn_with_state(state.clone(), maintenance_middleware))
        .route_layer(middleware::from_fn_with_state(state.clone(), auth_middleware))
}

fn user_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/dashboard/users",
            get(user_handler::index).post(user_handler::store),
        )
        .route("/dashboard/users/json", post(user_handler::datatable))
        .route("/dashboard/users/create", get(user_handler::create))
        .route("/dashboard/users/trashed", get(user_handler::trashed))
        .route(
            "/dashboard/users/:id",
            put(user_handler::update).delete(user_handler::destroy),
        )
        .route("/dashboard/users/:id/edit", get(user_handler::edit))
        .route("/dashboard/users/:id/restore", post(user_handler::restore))
        .route(
            "/dashboard/users/:id/force",
            axum::routing::delete(user_handler::force_destroy),
        )
}

fn production_routes() -> Router<AppState> {
    use production_handler as p;

    Router::new()
        // Lines
        .route(
            "/dashboard/production/lines",
            get(p::lines_index).post(p::lines_store),
        )
        .route("/dashboard/production/lines/json", post(p::lines_datatable))
        .route("/dashboard/production/lines/create", get(p::lines_create))
        .route(
            "/dashboard/production/lines/:id",
            put(p::lines_update).delete(p::lines_destroy),
        )
        .route("/dashboard/production/lines/:id/edit", get(p::lines_edit))
        // Orders
        .route(
            "/dashboard/production/orders",
            get(p::orders_index).post(p::orders_store),
        )
        .route("/dashboard/production/orders/json", post(p::orders_datatable))
        .route("/dashboard/production/orders/create", get(p::orders_create))
        .route(
            "/dashboard/production/orders/:id",
            put(p::orders_update).delete(p::orders_destroy),
        )
        .route("/dashboard/production/orders/:id/edit", get(p::orders_edit))
        // Schedules
        .route(
            "/dashboard/production/schedules",
            get(p::schedules_index).post(p::schedules_store),
        )
        .route(
            "/dashboard/production/schedules/json",
            post(p::schedules_datatable),
        )
        .route(
            "/dashboard/production/schedules/create",
            get(p::schedules_create),
        )
        .route(
            "/dashboard/production/schedules/:id",
            get(p::schedules_show)
                .put(p::schedules_update)
                .delete(p::schedules_destroy),
        )
        .route(
            "/dashboard/production/schedules/:id/edit",
            get(p::schedules_edit),
        )
        .route(
            "/dashboard/production/schedules/:id/outputs",
            post(p::schedules_outputs),
        )
}

fn gallery_routes() -> Router<AppState> {
    Router::new()
        .route("/dashboard/gallery", get(gallery_handler::index))
        .route("/dashboard/gallery/json", post(gallery_handler::datatable))
        .route(
            "/dashboard/gallery/folders",
            post(gallery_handler::create_folder),
        )
        .route(
            "/dashboard/gallery/folders/:id",
            put(gallery_handler::rename_folder).delete(gallery_handler::delete_folder),
        )
        .route(
            "/dashboard/gallery/files/:id",
            axum::routing::delete(gallery_handler::delete_file),
        )
        .route(
            "/dashboard/gallery/files/:id/visibility",
            put(gallery_handler::set_visibility),
        )
        .route("/dashboard/storage/*path", get(gallery_handler::private_file))
}

fn admin_routes(state: &AppState) -> Router<AppState> {
    use role_handler as r;

    Router::new()
        // Roles
        .route("/roles", get(r::roles_index).post(r::roles_store))
        .route("/roles/json", post(r::roles_datatable))
        .route("/roles/create", get(r::roles_create))
        .route("/roles/:id", put(r::roles_update).delete(r::roles_destroy))
        .route("/roles/:id/edit", get(r::roles_edit))
        // Permissions
        .route(
            "/permissions",
            get(r::permissions_index).post(r::permissions_store),
        )
        .route("/permissions/json", post(r::permissions_datatable))
        .route("/permissions/create", get(r::permissions_create))
        .route(
            "/permissions/:id",
            put(r::permissions_update).delete(r::permissions_destroy),
        )
        .route("/permissions/:id/edit", get(r::permissions_edit))
        // Menus
        .route(
            "/menus",
            get(menu_handler::index).post(menu_handler::store),
        )
        .route("/menus/json", post(menu_handler::datatable))
        .route("/menus/create", get(menu_handler::create))
        .route("/menus/reorder", post(menu_handler::reorder))
        .route(
            "/menus/:id",
            put(menu_handler::update).delete(menu_handler::destroy),
        )
        .route("/menus/:id/edit", get(menu_handler::edit))
        // Activity log
        .route("/activity-logs", get(activity_handler::index))
        .route("/activity-logs/json", post(activity_handler::datatable))
        .route("/activity-logs/stream", get(activity_handler::stream))
        .route_layer(middleware::from_fn(admin_middleware))
        .route_layer(middleware::from_fn_with_state(state.clone(), auth_middleware))
}

/// Same-origin front end; credentials allowed so the session cookie travels.
fn cors_layer(config: &Config) -> CorsLayer {
    let layer = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([AUTHORIZATION, CONTENT_TYPE])
        .allow_credentials(true);

    match HeaderValue::from_str(&config.app_url) {
        Ok(origin) => layer.allow_origin(origin),
        Err(_) => {
            tracing::warn!(app_url = %config.app_url, "APP_URL is not a valid origin; CORS disabled");
            layer
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;
    use std::sync::Arc;

    use axum::body::Body;
    use axum::http::{header, Request, StatusCode};
    use chrono::Utc;
    use tower::ServiceExt;
    use uuid::Uuid;

    use crate::errors::AppError;
    use crate::infra::{MockHealthCheck, MockRateLimiter, RateDecision};
    use crate::services::{
        MockActivityService, MockAuthService, MockDashboardService, MockGalleryService,
        MockMenuService, MockProductionService, MockProfileService, MockRbacService,
        MockSettingsService, MockSocialAuthService, MockUserService, Services,
    };
    use domain::{AccessProfile, AppSetting, User};

    fn user(verified: bool) -> User {
        User {
            id: Uuid::new_v4(),
            name: "Operator".into(),
            email: "operator@example.com".into(),
            password_hash: None,
            email_verified_at: verified.then(Utc::now),
            avatar_path: None,
            provider: None,
            provider_id: None,
            roles: vec![],
            created_at: Utc::now(),
            updated_at: Utc::now(),
            deleted_at: None,
        }
    }

    fn access(roles: &[&str], permissions: &[&str]) -> AccessProfile {
        AccessProfile {
            roles: roles.iter().map(|r| r.to_string()).collect::<BTreeSet<_>>(),
            permissions: permissions.iter().map(|p| p.to_string()).collect(),
        }
    }

    fn auth_as(user: User, access: AccessProfile) -> MockAuthService {
        let mut auth = MockAuthService::new();
        auth.expect_authenticate()
            .returning(move |_| Ok((user.clone(), access.clone())));
        auth
    }

    fn settings(maintenance: bool) -> MockSettingsService {
        let mut settings = MockSettingsService::new();
        settings.expect_current().returning(move || {
            let mut s = AppSetting::defaults();
            s.maintenance_mode = maintenance;
            Ok(s)
        });
        settings
    }

    /// Services whose untouched mocks panic if a handler reaches them.
    fn services(auth: MockAuthService, settings: MockSettingsService) -> Services {
        Services {
            auth: Arc::new(auth),
            social: Arc::new(MockSocialAuthService::new()),
            users: Arc::new(MockUserService::new()),
            rbac: Arc::new(MockRbacService::new()),
            production: Arc::new(MockProductionService::new()),
            gallery: Arc::new(MockGalleryService::new()),
            menus: Arc::new(MockMenuService::new()),
            settings: Arc::new(settings),
            profile: Arc::new(MockProfileService::new()),
            activity: Arc::new(MockActivityService::new()),
            dashboard: Arc::new(MockDashboardService::new()),
        }
    }

    fn app(services: Services, limiter: MockRateLimiter, health: MockHealthCheck) -> Router {
        create_router(AppState::new(
            services,
            Arc::new(limiter),
            Arc::new(health),
            Config::for_tests(),
        ))
    }

    fn authed(method: &str, uri: &str, body: Body) -> Request<Body> {
        Request::builder()
            .method(method)
            .uri(uri)
            .header(header::AUTHORIZATION, "Bearer token")
            .header(header::CONTENT_TYPE, "application/json")
            .body(body)
            .unwrap()
    }

    #[tokio::test]
    async fn test_missing_session_is_unauthorized() {
        let router = app(
            services(MockAuthService::new(), MockSettingsService::new()),
            MockRateLimiter::new(),
            MockHealthCheck::new(),
        );

        let response = router
            .oneshot(Request::builder().uri("/dashboard").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_user_without_permission_cannot_create_line() {
        // MockProductionService has no expectations: any call would panic.
        let router = app(
            services(auth_as(user(true), access(&["user"], &[])), settings(false)),
            MockRateLimiter::new(),
            MockHealthCheck::new(),
        );

        let body = Body::from(r#"{"code":"L-01","name":"Line 1"}"#);
        let response = router
            .oneshot(authed("POST", "/dashboard/production/lines", body))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn test_permission_is_checked_before_the_body() {
        let router = app(
            services(auth_as(user(true), access(&["user"], &[])), settings(false)),
            MockRateLimiter::new(),
            MockHealthCheck::new(),
        );

        // Fails validation, but the caller may not create lines at all
        let body = Body::from(r#"{"code":"","name":""}"#);
        let response = router
            .oneshot(authed("POST", "/dashboard/production/lines", body))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn test_missing_field_is_reported_on_that_field() {
        let router = app(
            services(
                auth_as(user(true), access(&["user"], &["manage-production"])),
                settings(false),
            ),
            MockRateLimiter::new(),
            MockHealthCheck::new(),
        );

        let body = Body::from(
            serde_json::json!({
                "order_id": Uuid::new_v4(),
                "line_id": Uuid::new_v4(),
                "start_date": "2024-01-05",
                "target_quantity": 10,
                "status": "pending",
            })
            .to_string(),
        );
        let response = router
            .oneshot(authed("POST", "/dashboard/production/schedules", body))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let json: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(
            json["error"]["fields"]["finish_date"][0],
            "The finish date field is required."
        );
    }

    #[tokio::test]
    async fn test_user_without_permission_cannot_delete_user() {
        let router = app(
            services(auth_as(user(true), access(&["user"], &["view-users"])), settings(false)),
            MockRateLimiter::new(),
            MockHealthCheck::new(),
        );

        let uri = format!("/dashboard/users/{}", Uuid::new_v4());
        let response = router
            .oneshot(authed("DELETE", &uri, Body::empty()))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn test_admin_area_requires_admin_role() {
        let router = app(
            services(
                auth_as(user(true), access(&["user"], &["view-users", "view-roles"])),
                MockSettingsService::new(),
            ),
            MockRateLimiter::new(),
            MockHealthCheck::new(),
        );

        let response = router
            .oneshot(authed("POST", "/admin/roles", Body::from(r#"{"name":"x"}"#)))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn test_unverified_user_is_rejected() {
        let router = app(
            services(auth_as(user(false), access(&["user"], &[])), MockSettingsService::new()),
            MockRateLimiter::new(),
            MockHealthCheck::new(),
        );

        let response = router
            .oneshot(authed("GET", "/dashboard", Body::empty()))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn test_maintenance_mode_blocks_non_admins() {
        let router = app(
            services(
                auth_as(user(true), access(&["user"], &["view-dashboard"])),
                settings(true),
            ),
            MockRateLimiter::new(),
            MockHealthCheck::new(),
        );

        let response = router
            .oneshot(authed("GET", "/dashboard", Body::empty()))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[tokio::test]
    async fn test_login_is_throttled() {
        let mut limiter = MockRateLimiter::new();
        limiter.expect_hit().returning(|_, _, _| {
            Ok(RateDecision {
                count: 11,
                allowed: false,
                retry_after: 42,
            })
        });
        let router = app(
            services(MockAuthService::new(), MockSettingsService::new()),
            limiter,
            MockHealthCheck::new(),
        );

        let request = Request::builder()
            .method("POST")
            .uri("/login")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(r#"{"email":"a@b.c","password":"secret"}"#))
            .unwrap();
        let response = router.oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(response.headers()[header::RETRY_AFTER], "42");
    }

    #[tokio::test]
    async fn test_health_reports_degraded_cache() {
        let mut health = MockHealthCheck::new();
        health.expect_database().returning(|| Ok(()));
        health
            .expect_cache()
            .returning(|| {
                Err(AppError::Cache(redis::RedisError::from((
                    redis::ErrorKind::IoError,
                    "connection refused",
                ))))
            });
        let router = app(
            services(MockAuthService::new(), MockSettingsService::new()),
            MockRateLimiter::new(),
            health,
        );

        let response = router
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    }
}
