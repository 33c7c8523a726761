//! Migration: append-only activity log.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(ActivityLogs::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(ActivityLogs::Id).uuid().not_null().primary_key())
                    .col(ColumnDef::new(ActivityLogs::CauserId).uuid().null())
                    .col(ColumnDef::new(ActivityLogs::SubjectType).string_len(100).not_null())
                    .col(ColumnDef::new(ActivityLogs::SubjectId).uuid().null())
                    .col(ColumnDef::new(ActivityLogs::Action).string_len(50).not_null())
                    .col(ColumnDef::new(ActivityLogs::Description).text().not_null())
                    .col(ColumnDef::new(ActivityLogs::Properties).json_binary().not_null())
                    .col(ColumnDef::new(ActivityLogs::CreatedAt).timestamp_with_time_zone().not_null())
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_activity_logs_created_at")
                    .table(ActivityLogs::Table)
                    .col(ActivityLogs::CreatedAt)
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(ActivityLogs::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum ActivityLogs {
    Table,
    Id,
    CauserId,
    SubjectType,
    SubjectId,
    Action,
    Description,
    Properties,
    CreatedAt,
}
