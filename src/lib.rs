//! Back office - administration API
//!
//! Users, roles and permissions, production scheduling, a file gallery,
//! sidebar menus, application settings and a live activity log, served
//! over Axum with SeaORM persistence.
//!
//! # Architecture Layers
//!
//! - **cli**: Command-line interface
//! - **commands**: CLI command implementations
//! - **config**: Application configuration and constants
//! - **services**: Application use cases and business rules
//! - **infra**: Database, Redis, file storage and broadcast plumbing
//! - **api**: HTTP handlers, middleware, and routes
//! - **types**: Shared types (data tables, pagination, responses)
//! - **errors**: Centralized error handling
//!
//! Domain entities live in the `domain` workspace crate.
//!
//! # CLI Usage
//!
//! ```bash
//! # Start the server
//! cargo run -- serve
//!
//! # Run migrations
//! cargo run -- migrate up
//!
//! # Create roles, the admin account and default menus
//! cargo run -- seed --admin-password change-me-now
//! ```

pub mod api;
pub mod cli;
pub mod commands;
pub mod config;
pub mod errors;
pub mod infra;
pub mod services;
pub mod types;

// Re-export commonly used types at crate root
pub use api::AppState;
pub use config::Config;
pub use errors::{AppError, AppResult};
