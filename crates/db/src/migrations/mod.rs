//! Database migrations.
//!
//! Schema migrations for the database.

#![allow(missing_docs)]

use sea_orm_migration::prelude::*;

mod m20250101_000001_create_user_table;
mod m20250101_000002_create_following_table;
mod m20250101_000003_create_story_table;
mod m20250101_000004_create_story_like_table;
mod m20250101_000005_create_story_share_table;
mod m20250101_000006_create_chapter_table;
mod m20250101_000007_create_decision_point_table;
mod m20250101_000008_create_choice_table;
mod m20250101_000009_create_vote_table;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20250101_000001_create_user_table::Migration),
            Box::new(m20250101_000002_create_following_table::Migration),
            Box::new(m20250101_000003_create_story_table::Migration),
            Box::new(m20250101_000004_create_story_like_table::Migration),
            Box::new(m20250101_000005_create_story_share_table::Migration),
            Box::new(m20250101_000006_create_chapter_table::Migration),
            Box::new(m20250101_000007_create_decision_point_table::Migration),
            Box::new(m20250101_000008_create_choice_table::Migration),
            Box::new(m20250101_000009_create_vote_table::Migration),
        ]
    }
}
