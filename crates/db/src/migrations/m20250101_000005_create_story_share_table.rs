//! Create story share table migration.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(StoryShare::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(StoryShare::Id)
                            .string_len(32)
                            .not_null()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(StoryShare::StoryId)
                            .string_len(32)
                            .not_null(),
                    )
                    .col(ColumnDef::new(StoryShare::UserId).string_len(32).not_null())
                    .col(
                        ColumnDef::new(StoryShare::Platform)
                            .string_len(50)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(StoryShare::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_story_share_story")
                            .from(StoryShare::Table, StoryShare::StoryId)
                            .to(Story::Table, Story::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_story_share_user")
                            .from(StoryShare::Table, StoryShare::UserId)
                            .to(User::Table, User::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // Unique index: one share per (story, user, platform)
        manager
            .create_index(
                Index::create()
                    .name("idx_story_share_story_user_platform")
                    .table(StoryShare::Table)
                    .col(StoryShare::StoryId)
                    .col(StoryShare::UserId)
                    .col(StoryShare::Platform)
                    .unique()
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(StoryShare::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum StoryShare {
    Table,
    Id,
    StoryId,
    UserId,
    Platform,
    CreatedAt,
}

#[derive(Iden)]
enum Story {
    Table,
    Id,
}

#[derive(Iden)]
enum User {
    Table,
    Id,
}
