//! API middleware.

mod auth;
mod input_echo;
mod maintenance;
mod rate_limit;

pub use auth::{
    admin_middleware, auth_middleware, permission, require_admin, require_permission, Authorized,
    CurrentUser, RequiredPermission,
};
pub use input_echo::input_echo_middleware;
pub use maintenance::maintenance_middleware;
pub use rate_limit::{login_rate_limit, upload_rate_limit};
