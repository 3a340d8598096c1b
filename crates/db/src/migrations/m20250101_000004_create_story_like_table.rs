//! Create story like table migration.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(StoryLike::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(StoryLike::Id)
                            .string_len(32)
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(StoryLike::StoryId).string_len(32).not_null())
                    .col(ColumnDef::new(StoryLike::UserId).string_len(32).not_null())
                    .col(
                        ColumnDef::new(StoryLike::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_story_like_story")
                            .from(StoryLike::Table, StoryLike::StoryId)
                            .to(Story::Table, Story::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_story_like_user")
                            .from(StoryLike::Table, StoryLike::UserId)
                            .to(User::Table, User::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // Unique index: (story_id, user_id) - one like per user per story
        manager
            .create_index(
                Index::create()
                    .name("idx_story_like_story_user")
                    .table(StoryLike::Table)
                    .col(StoryLike::StoryId)
                    .col(StoryLike::UserId)
                    .unique()
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(StoryLike::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum StoryLike {
    Table,
    Id,
    StoryId,
    UserId,
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
