//! HTTP request handlers.

pub mod activity_handler;
pub mod auth_handler;
pub mod dashboard_handler;
pub mod gallery_handler;
pub mod menu_handler;
pub mod production_handler;
pub mod profile_handler;
pub mod public_handler;
pub mod role_handler;
pub mod settings_handler;
pub mod user_handler;
