//! Database migrations.
//!
//! Each migration is a separate module following SeaORM conventions.
//! Migration names follow the pattern: m{YYYYMMDD}_{NNNNNN}_{description}

use sea_orm_migration::prelude::*;

mod m20240101_000001_create_access_tables;
mod m20240101_000002_create_production_tables;
mod m20240101_000003_create_gallery_tables;
mod m20240101_000004_create_menus_and_settings;
mod m20240101_000005_create_activity_logs;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20240101_000001_create_access_tables::Migration),
            Box::new(m20240101_000002_create_production_tables::Migration),
            Box::new(m20240101_000003_create_gallery_tables::Migration),
            Box::new(m20240101_000004_create_menus_and_settings::Migration),
            Box::new(m20240101_000005_create_activity_logs::Migration),
        ]
    }
}
