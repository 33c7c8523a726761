//! Repository layer - Data access abstraction
//!
//! Repositories provide an abstraction over data persistence,
//! following the Repository pattern for clean separation of concerns.

mod activity_repository;
mod base;
pub(crate) mod entities;
mod gallery_repository;
mod line_repository;
mod menu_repository;
mod order_repository;
mod rbac_repository;
mod schedule_repository;
mod settings_repository;
mod user_repository;

pub use activity_repository::{ActivityRepository, ActivityStore};
pub use base::{fetch_datatable, fetch_page, TableColumns};
pub use gallery_repository::{GalleryRepository, GalleryStore, NewGalleryFile};
pub use line_repository::{LineInput, LineRepository, LineStore};
pub use menu_repository::{MenuInput, MenuRepository, MenuStore};
pub use order_repository::{OrderInput, OrderRepository, OrderStore};
pub use rbac_repository::{RbacRepository, RbacStore};
pub use schedule_repository::{ScheduleInput, ScheduleRepository, ScheduleStore};
pub use settings_repository::{SettingsRepository, SettingsStore};
pub use user_repository::{NewUser, UserChanges, UserRepository, UserStore};

// Export mocks for tests (both unit and integration)
#[cfg(any(test, feature = "test-utils"))]
pub use activity_repository::MockActivityRepository;
#[cfg(any(test, feature = "test-utils"))]
pub use gallery_repository::MockGalleryRepository;
#[cfg(any(test, feature = "test-utils"))]
pub use line_repository::MockLineRepository;
#[cfg(any(test, feature = "test-utils"))]
pub use menu_repository::MockMenuRepository;
#[cfg(any(test, feature = "test-utils"))]
pub use order_repository::MockOrderRepository;
#[cfg(any(test, feature = "test-utils"))]
pub use rbac_repository::MockRbacRepository;
#[cfg(any(test, feature = "test-utils"))]
pub use schedule_repository::MockScheduleRepository;
#[cfg(any(test, feature = "test-utils"))]
pub use settings_repository::MockSettingsRepository;
#[cfg(any(test, feature = "test-utils"))]
pub use user_repository::MockUserRepository;
