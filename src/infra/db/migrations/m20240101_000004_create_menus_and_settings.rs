//! Migration: sidebar menus and the application settings row.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Menus::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Menus::Id).uuid().not_null().primary_key())
                    .col(ColumnDef::new(Menus::ParentId).uuid().null())
                    .col(ColumnDef::new(Menus::Title).string_len(255).not_null())
                    .col(ColumnDef::new(Menus::Route).string_len(255).null())
                    .col(ColumnDef::new(Menus::Icon).string_len(100).null())
                    .col(ColumnDef::new(Menus::Permission).string_len(255).null())
                    .col(ColumnDef::new(Menus::Position).integer().not_null().default(0))
                    .col(ColumnDef::new(Menus::IsActive).boolean().not_null().default(true))
                    .col(ColumnDef::new(Menus::CreatedAt).timestamp_with_time_zone().not_null())
                    .col(ColumnDef::new(Menus::UpdatedAt).timestamp_with_time_zone().not_null())
                    // Removing a parent removes its subtree
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_menus_parent")
                            .from(Menus::Table, Menus::ParentId)
                            .to(Menus::Table, Menus::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(AppSettings::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(AppSettings::Id).uuid().not_null().primary_key())
                    .col(ColumnDef::new(AppSettings::AppName).string_len(255).not_null())
                    .col(ColumnDef::new(AppSettings::AppDescription).text().null())
                    .col(ColumnDef::new(AppSettings::LogoPath).string().null())
                    .col(ColumnDef::new(AppSettings::FaviconPath).string().null())
                    .col(ColumnDef::new(AppSettings::SeoTitle).string_len(255).null())
                    .col(ColumnDef::new(AppSettings::SeoDescription).text().null())
                    .col(ColumnDef::new(AppSettings::SeoKeywords).text().null())
                    .col(ColumnDef::new(AppSettings::PrimaryColor).string_len(20).not_null())
                    .col(ColumnDef::new(AppSettings::SecondaryColor).string_len(20).not_null())
                    .col(ColumnDef::new(AppSettings::AccentColor).string_len(20).not_null())
                    .col(ColumnDef::new(AppSettings::ContactEmail).string_len(255).null())
                    .col(ColumnDef::new(AppSettings::ContactPhone).string_len(50).null())
                    .col(ColumnDef::new(AppSettings::Address).text().null())
                    .col(ColumnDef::new(AppSettings::SocialLinks).json_binary().not_null())
                    .col(
                        ColumnDef::new(AppSettings::MaintenanceMode)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(ColumnDef::new(AppSettings::MaintenanceMessage).text().null())
                    .col(ColumnDef::new(AppSettings::CreatedAt).timestamp_with_time_zone().not_null())
                    .col(ColumnDef::new(AppSettings::UpdatedAt).timestamp_with_time_zone().not_null())
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(AppSettings::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Menus::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum Menus {
    Table,
    Id,
    ParentId,
    Title,
    Route,
    Icon,
    Permission,
    Position,
    IsActive,
    CreatedAt,
    UpdatedAt,
}

#[derive(Iden)]
enum AppSettings {
    Table,
    Id,
    AppName,
    AppDescription,
    LogoPath,
    FaviconPath,
    SeoTitle,
    SeoDescription,
    SeoKeywords,
    PrimaryColor,
    SecondaryColor,
    AccentColor,
    ContactEmail,
    ContactPhone,
    Address,
    SocialLinks,
    MaintenanceMode,
    MaintenanceMessage,
    CreatedAt,
    UpdatedAt,
}
