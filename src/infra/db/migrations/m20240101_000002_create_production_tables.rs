//! Migration: production lines, orders, schedules and daily outputs.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(MasterLines::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(MasterLines::Id).uuid().not_null().primary_key())
                    .col(ColumnDef::new(MasterLines::Name).string_len(255).not_null())
                    .col(ColumnDef::new(MasterLines::Code).string_len(50).not_null().unique_key())
                    .col(ColumnDef::new(MasterLines::Capacity).integer().null())
                    .col(ColumnDef::new(MasterLines::IsActive).boolean().not_null().default(true))
                    .col(ColumnDef::new(MasterLines::CreatedAt).timestamp_with_time_zone().not_null())
                    .col(ColumnDef::new(MasterLines::UpdatedAt).timestamp_with_time_zone().not_null())
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(MasterOrders::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(MasterOrders::Id).uuid().not_null().primary_key())
                    .col(
                        ColumnDef::new(MasterOrders::OrderNumber)
                            .string_len(50)
                            .not_null()
                            .unique_key(),
                    )
                    .col(ColumnDef::new(MasterOrders::ProductName).string_len(255).not_null())
                    .col(ColumnDef::new(MasterOrders::ProductCode).string_len(100).null())
                    .col(ColumnDef::new(MasterOrders::Quantity).integer().not_null())
                    .col(ColumnDef::new(MasterOrders::OrderDate).date().not_null())
                    .col(ColumnDef::new(MasterOrders::DueDate).date().not_null())
                    .col(
                        ColumnDef::new(MasterOrders::Status)
                            .string_len(20)
                            .not_null()
                            .default("pending"),
                    )
                    .col(ColumnDef::new(MasterOrders::Notes).text().null())
                    .col(ColumnDef::new(MasterOrders::CreatedAt).timestamp_with_time_zone().not_null())
                    .col(ColumnDef::new(MasterOrders::UpdatedAt).timestamp_with_time_zone().not_null())
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Schedules::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Schedules::Id).uuid().not_null().primary_key())
                    .col(ColumnDef::new(Schedules::OrderId).uuid().not_null())
                    .col(ColumnDef::new(Schedules::LineId).uuid().not_null())
                    .col(ColumnDef::new(Schedules::StartDate).date().not_null())
                    .col(ColumnDef::new(Schedules::FinishDate).date().not_null())
                    .col(ColumnDef::new(Schedules::TargetQuantity).integer().not_null())
                    .col(
                        ColumnDef::new(Schedules::Status)
                            .string_len(20)
                            .not_null()
                            .default("pending"),
                    )
                    .col(ColumnDef::new(Schedules::Notes).text().null())
                    .col(ColumnDef::new(Schedules::CreatedAt).timestamp_with_time_zone().not_null())
                    .col(ColumnDef::new(Schedules::UpdatedAt).timestamp_with_time_zone().not_null())
                    // Referenced lines and orders cannot be removed from under a schedule
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_schedules_order")
                            .from(Schedules::Table, Schedules::OrderId)
                            .to(MasterOrders::Table, MasterOrders::Id)
                            .on_delete(ForeignKeyAction::Restrict),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_schedules_line")
                            .from(Schedules::Table, Schedules::LineId)
                            .to(MasterLines::Table, MasterLines::Id)
                            .on_delete(ForeignKeyAction::Restrict),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(ScheduleDailyOutputs::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(ScheduleDailyOutputs::Id).uuid().not_null().primary_key())
                    .col(ColumnDef::new(ScheduleDailyOutputs::ScheduleId).uuid().not_null())
                    .col(ColumnDef::new(ScheduleDailyOutputs::ProductionDate).date().not_null())
                    .col(ColumnDef::new(ScheduleDailyOutputs::ActualOutput).integer().null())
                    .col(
                        ColumnDef::new(ScheduleDailyOutputs::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(ScheduleDailyOutputs::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_daily_outputs_schedule")
                            .from(ScheduleDailyOutputs::Table, ScheduleDailyOutputs::ScheduleId)
                            .to(Schedules::Table, Schedules::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("uq_daily_outputs_schedule_date")
                    .table(ScheduleDailyOutputs::Table)
                    .col(ScheduleDailyOutputs::ScheduleId)
                    .col(ScheduleDailyOutputs::ProductionDate)
                    .unique()
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(ScheduleDailyOutputs::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Schedules::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(MasterOrders::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(MasterLines::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum MasterLines {
    Table,
    Id,
    Name,
    Code,
    Capacity,
    IsActive,
    CreatedAt,
    UpdatedAt,
}

#[derive(Iden)]
enum MasterOrders {
    Table,
    Id,
    OrderNumber,
    ProductName,
    ProductCode,
    Quantity,
    OrderDate,
    DueDate,
    Status,
    Notes,
    CreatedAt,
    UpdatedAt,
}

#[derive(Iden)]
enum Schedules {
    Table,
    Id,
    OrderId,
    LineId,
    StartDate,
    FinishDate,
    TargetQuantity,
    Status,
    Notes,
    CreatedAt,
    UpdatedAt,
}

#[derive(Iden)]
enum ScheduleDailyOutputs {
    Table,
    Id,
    ScheduleId,
    ProductionDate,
    ActualOutput,
    CreatedAt,
    UpdatedAt,
}
