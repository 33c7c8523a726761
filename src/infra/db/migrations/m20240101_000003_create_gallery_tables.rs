//! Migration: file-manager folders and gallery files.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(FilemanagerFolders::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(FilemanagerFolders::Id).uuid().not_null().primary_key())
                    .col(ColumnDef::new(FilemanagerFolders::ParentId).uuid().null())
                    .col(ColumnDef::new(FilemanagerFolders::Name).string_len(255).not_null())
                    .col(
                        ColumnDef::new(FilemanagerFolders::Path)
                            .string_len(1024)
                            .not_null()
                            .unique_key(),
                    )
                    .col(
                        ColumnDef::new(FilemanagerFolders::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(FilemanagerFolders::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_folders_parent")
                            .from(FilemanagerFolders::Table, FilemanagerFolders::ParentId)
                            .to(FilemanagerFolders::Table, FilemanagerFolders::Id)
                            .on_delete(ForeignKeyAction::Restrict),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(GalleryFiles::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(GalleryFiles::Id).uuid().not_null().primary_key())
                    .col(ColumnDef::new(GalleryFiles::FolderId).uuid().null())
                    .col(ColumnDef::new(GalleryFiles::OriginalName).string_len(255).not_null())
                    .col(
                        ColumnDef::new(GalleryFiles::Path)
                            .string_len(1024)
                            .not_null()
                            .unique_key(),
                    )
                    .col(ColumnDef::new(GalleryFiles::MimeType).string_len(255).not_null())
                    .col(ColumnDef::new(GalleryFiles::Size).big_integer().not_null())
                    .col(
                        ColumnDef::new(GalleryFiles::Visibility)
                            .string_len(20)
                            .not_null()
                            .default("private"),
                    )
                    .col(ColumnDef::new(GalleryFiles::UploadedBy).uuid().null())
                    .col(ColumnDef::new(GalleryFiles::CreatedAt).timestamp_with_time_zone().not_null())
                    .col(ColumnDef::new(GalleryFiles::UpdatedAt).timestamp_with_time_zone().not_null())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_gallery_files_folder")
                            .from(GalleryFiles::Table, GalleryFiles::FolderId)
                            .to(FilemanagerFolders::Table, FilemanagerFolders::Id)
                            .on_delete(ForeignKeyAction::Restrict),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_gallery_files_folder")
                    .table(GalleryFiles::Table)
                    .col(GalleryFiles::FolderId)
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(GalleryFiles::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(FilemanagerFolders::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum FilemanagerFolders {
    Table,
    Id,
    ParentId,
    Name,
    Path,
    CreatedAt,
    UpdatedAt,
}

#[derive(Iden)]
enum GalleryFiles {
    Table,
    Id,
    FolderId,
    OriginalName,
    Path,
    MimeType,
    Size,
    Visibility,
    UploadedBy,
    CreatedAt,
    UpdatedAt,
}
