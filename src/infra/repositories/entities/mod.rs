//! SeaORM entity definitions
//!
//! These are database-specific entities separate from domain models.

pub mod activity_log;
pub mod app_setting;
pub mod filemanager_folder;
pub mod gallery_file;
pub mod master_line;
pub mod master_order;
pub mod menu;
pub mod permission;
pub mod role;
pub mod role_permission;
pub mod schedule;
pub mod schedule_daily_output;
pub mod user;
pub mod user_role;
