//! Domain-level constants.
//!
//! These constants define business rules and validation requirements.

// =============================================================================
// Roles & Guards
// =============================================================================

/// Default guard scope for roles and permissions
pub const GUARD_WEB: &str = "web";

/// Administrator role, required by every `/admin` route
pub const ROLE_ADMIN: &str = "admin";

/// Role handed to accounts created without an explicit assignment
pub const ROLE_USER: &str = "user";

// =============================================================================
// Permissions
// =============================================================================

pub const PERM_VIEW_DASHBOARD: &str = "view-dashboard";
pub const PERM_VIEW_USERS: &str = "view-users";
pub const PERM_CREATE_USERS: &str = "create-users";
pub const PERM_EDIT_USERS: &str = "edit-users";
pub const PERM_DELETE_USERS: &str = "delete-users";
pub const PERM_RESTORE_USERS: &str = "restore-users";
pub const PERM_FORCE_DELETE_USERS: &str = "force-delete-users";
pub const PERM_VIEW_PRODUCTION: &str = "view-production";
pub const PERM_MANAGE_PRODUCTION: &str = "manage-production";
pub const PERM_RECORD_OUTPUT: &str = "record-production-output";
pub const PERM_VIEW_GALLERY: &str = "view-gallery";
pub const PERM_MANAGE_GALLERY: &str = "manage-gallery";
pub const PERM_MANAGE_SETTINGS: &str = "manage-settings";

/// Every permission the application checks, seeded on install
pub const ALL_PERMISSIONS: &[&str] = &[
    PERM_VIEW_DASHBOARD,
    PERM_VIEW_USERS,
    PERM_CREATE_USERS,
    PERM_EDIT_USERS,
    PERM_DELETE_USERS,
    PERM_RESTORE_USERS,
    PERM_FORCE_DELETE_USERS,
    PERM_VIEW_PRODUCTION,
    PERM_MANAGE_PRODUCTION,
    PERM_RECORD_OUTPUT,
    PERM_VIEW_GALLERY,
    PERM_MANAGE_GALLERY,
    PERM_MANAGE_SETTINGS,
];

// =============================================================================
// Validation
// =============================================================================

/// Minimum password length requirement
pub const MIN_PASSWORD_LENGTH: usize = 8;

/// Upper bound for plain string columns
pub const MAX_STRING_LENGTH: usize = 255;

// =============================================================================
// Uploads
// =============================================================================

/// Maximum accepted upload size (10 MB)
pub const MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

/// Extensions accepted by the gallery
pub const ALLOWED_UPLOAD_EXTENSIONS: &[&str] = &[
    "jpg", "jpeg", "png", "gif", "webp", "svg", "pdf", "doc", "docx", "xls", "xlsx", "ppt",
    "pptx", "txt", "zip", "rar", "mp4", "mov", "avi",
];

/// Extensions accepted for profile avatars
pub const ALLOWED_AVATAR_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "gif", "webp"];

// =============================================================================
// Activity log
// =============================================================================

pub const ACTION_CREATED: &str = "created";
pub const ACTION_UPDATED: &str = "updated";
pub const ACTION_DELETED: &str = "deleted";
pub const ACTION_RESTORED: &str = "restored";
pub const ACTION_FORCE_DELETED: &str = "force_deleted";
pub const ACTION_LOGIN: &str = "login";
pub const ACTION_LOGOUT: &str = "logout";
pub const ACTION_UPLOADED: &str = "uploaded";
pub const ACTION_REORDERED: &str = "reordered";
pub const ACTION_RECORDED: &str = "recorded";
