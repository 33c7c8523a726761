//! Domain layer - Core back-office entities, value objects and rules.
//!
//! This crate contains pure domain logic with no infrastructure dependencies:
//! no database, no HTTP. Everything here can be exercised from plain unit tests.

pub mod activity;
pub mod constants;
pub mod error;
pub mod gallery;
pub mod menu;
pub mod password;
pub mod production;
pub mod rbac;
pub mod settings;
pub mod user;

pub use activity::{ActivityLog, NewActivity};
pub use constants::*;
pub use error::{DomainError, DomainResult, FieldErrors};
pub use gallery::{Folder, GalleryFile, Visibility};
pub use menu::{Menu, MenuNode, MenuPosition};
pub use password::Password;
pub use production::{
    MasterLine, MasterOrder, OrderStatus, Schedule, ScheduleDay, ScheduleStatus,
};
pub use rbac::{AccessProfile, Permission, Role, RoleRef};
pub use settings::{AppSetting, PublicSettings, SocialLinks};
pub use user::{User, UserResponse};
