//! Application services layer - Use cases and business logic.
//!
//! Services orchestrate domain rules and infrastructure to fulfil the
//! back-office use cases. They depend on repository traits, never on
//! concrete stores, and record an activity entry after every mutation.

mod activity_service;
mod auth_service;
pub mod container;
mod dashboard_service;
mod gallery_service;
mod menu_service;
mod oauth_service;
mod production_service;
mod profile_service;
mod rbac_service;
mod settings_service;
mod user_service;

// Service Container
pub use container::Services;

// Service traits and implementations
pub use activity_service::{ActivityRecorder, ActivityService};
pub use auth_service::{AuthService, Authenticator, Claims, TokenResponse};
pub use dashboard_service::{DashboardManager, DashboardService, DashboardStats};
pub use gallery_service::{GalleryListing, GalleryManager, GalleryService, StoredFile, UploadInput};
pub use menu_service::{MenuManager, MenuService};
pub use oauth_service::{
    HttpOAuthClient, OAuthClient, OAuthProfile, OAuthProvider, SocialAuthService,
    SocialAuthenticator,
};
pub use production_service::{
    ProductionCounts, ProductionManager, ProductionService, ScheduleDetail, ScheduleFormOptions,
    StatusCount,
};
pub use profile_service::{ProfileInput, ProfileManager, ProfileService};
pub use rbac_service::{PermissionInput, RbacManager, RbacService, RoleInput};
pub use settings_service::{SettingsInput, SettingsManager, SettingsService};
pub use user_service::{CreateUserInput, UpdateUserInput, UserManager, UserService};

#[cfg(any(test, feature = "test-utils"))]
pub use activity_service::MockActivityService;
#[cfg(any(test, feature = "test-utils"))]
pub use auth_service::MockAuthService;
#[cfg(any(test, feature = "test-utils"))]
pub use dashboard_service::MockDashboardService;
#[cfg(any(test, feature = "test-utils"))]
pub use gallery_service::MockGalleryService;
#[cfg(any(test, feature = "test-utils"))]
pub use menu_service::MockMenuService;
#[cfg(any(test, feature = "test-utils"))]
pub use oauth_service::{MockOAuthClient, MockSocialAuthService};
#[cfg(any(test, feature = "test-utils"))]
pub use production_service::MockProductionService;
#[cfg(any(test, feature = "test-utils"))]
pub use profile_service::MockProfileService;
#[cfg(any(test, feature = "test-utils"))]
pub use rbac_service::MockRbacService;
#[cfg(any(test, feature = "test-utils"))]
pub use settings_service::MockSettingsService;
#[cfg(any(test, feature = "test-utils"))]
pub use user_service::MockUserService;
