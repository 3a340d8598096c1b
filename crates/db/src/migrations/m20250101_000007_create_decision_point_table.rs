//! Create decision point table migration.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(DecisionPoint::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(DecisionPoint::Id)
                            .string_len(32)
                            .not_null()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(DecisionPoint::ChapterId)
                            .string_len(32)
                            .not_null(),
                    )
                    .col(ColumnDef::new(DecisionPoint::Question).text().not_null())
                    .col(
                        ColumnDef::new(DecisionPoint::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(ColumnDef::new(DecisionPoint::ExpiresAt).timestamp_with_time_zone())
                    .col(
                        ColumnDef::new(DecisionPoint::IsActive)
                            .boolean()
                            .not_null()
                            .default(true),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_decision_point_chapter")
                            .from(DecisionPoint::Table, DecisionPoint::ChapterId)
                            .to(Chapter::Table, Chapter::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_decision_point_chapter_id")
                    .table(DecisionPoint::Table)
                    .col(DecisionPoint::ChapterId)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(DecisionPoint::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum DecisionPoint {
    Table,
    Id,
    ChapterId,
    Question,
    CreatedAt,
    ExpiresAt,
    IsActive,
}

#[derive(Iden)]
enum Chapter {
    Table,
    Id,
}
