//! Migration: Create access_tokens table with soft delete support.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(AccessTokens::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(AccessTokens::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(AccessTokens::Subject).string().not_null())
                    .col(ColumnDef::new(AccessTokens::AccessToken).text().not_null())
                    .col(ColumnDef::new(AccessTokens::RefreshToken).text().null())
                    .col(ColumnDef::new(AccessTokens::TokenType).string().not_null())
                    .col(
                        ColumnDef::new(AccessTokens::ExpiresAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(AccessTokens::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(AccessTokens::DeletedAt)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .to_owned(),
            )
            .await?;

        // Lookups are always scoped to one subject
        manager
            .create_index(
                Index::create()
                    .name("idx_access_tokens_subject")
                    .table(AccessTokens::Table)
                    .col(AccessTokens::Subject)
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(AccessTokens::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum AccessTokens {
    Table,
    Id,
    Subject,
    AccessToken,
    RefreshToken,
    TokenType,
    ExpiresAt,
    CreatedAt,
    DeletedAt,
}
