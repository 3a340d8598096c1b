//! Test utilities for database operations.
//!
//! PostgreSQL-backed tests connect with the `TEST_DB_*` environment
//! variables, migrate a fresh database and seed a story tree to vote on.

use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ConnectionTrait, Database, DatabaseBackend, DatabaseConnection, DbErr, Set,
    Statement,
};
use sea_orm_migration::MigratorTrait;
use tracing::info;

use crate::entities::{chapter, choice, decision_point, story, user};
use crate::migrations::Migrator;

/// Test database configuration.
#[derive(Debug, Clone)]
pub struct TestDbConfig {
    /// Database host.
    pub host: String,
    /// Database port.
    pub port: u16,
    /// Database username.
    pub username: String,
    /// Database password.
    pub password: String,
    /// Database name.
    pub database: String,
}

impl Default for TestDbConfig {
    fn default() -> Self {
        Self {
            host: std::env::var("TEST_DB_HOST").unwrap_or_else(|_| "localhost".to_string()),
            port: std::env::var("TEST_DB_PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(5433),
            username: std::env::var("TEST_DB_USER")
                .unwrap_or_else(|_| "storyloom_test".to_string()),
            password: std::env::var("TEST_DB_PASSWORD")
                .unwrap_or_else(|_| "storyloom_test".to_string()),
            database: std::env::var("TEST_DB_NAME")
                .unwrap_or_else(|_| "storyloom_test".to_string()),
        }
    }
}

impl TestDbConfig {
    /// Get the database URL.
    #[must_use]
    pub fn database_url(&self) -> String {
        self.url_for(&self.database)
    }

    /// URL of the maintenance database used to create and drop test databases.
    #[must_use]
    pub fn postgres_url(&self) -> String {
        self.url_for("postgres")
    }

    fn url_for(&self, database: &str) -> String {
        format!(
            "postgres://{}:{}@{}:{}/{}",
            self.username, self.password, self.host, self.port, database
        )
    }
}

/// A migrated, uniquely named test database.
pub struct TestDatabase {
    /// Database connection.
    pub conn: DatabaseConnection,
    /// Database configuration.
    pub config: TestDbConfig,
}

impl TestDatabase {
    /// Create a fresh database with a unique name and run all migrations.
    pub async fn create() -> Result<Self, DbErr> {
        let mut config = TestDbConfig::default();
        let suffix = uuid::Uuid::new_v4().simple().to_string();
        config.database = format!("storyloom_test_{}", &suffix[..8]);

        let admin = Database::connect(&config.postgres_url()).await?;
        admin
            .execute(Statement::from_string(
                DatabaseBackend::Postgres,
                format!("CREATE DATABASE \"{}\"", config.database),
            ))
            .await?;
        admin.close().await?;

        let conn = Database::connect(&config.database_url()).await?;
        Migrator::up(&conn, None).await?;

        info!(database = %config.database, "Created test database");
        Ok(Self { conn, config })
    }

    /// Get the database connection.
    #[must_use]
    pub const fn connection(&self) -> &DatabaseConnection {
        &self.conn
    }

    /// Drop the database. Consumes self so the connection is closed first.
    pub async fn drop_database(self) -> Result<(), DbErr> {
        self.conn.close().await?;

        let admin = Database::connect(&self.config.postgres_url()).await?;
        admin
            .execute(Statement::from_string(
                DatabaseBackend::Postgres,
                format!(
                    "SELECT pg_terminate_backend(pid) FROM pg_stat_activity WHERE datname = '{}'",
                    self.config.database
                ),
            ))
            .await
            .ok();
        admin
            .execute(Statement::from_string(
                DatabaseBackend::Postgres,
                format!("DROP DATABASE IF EXISTS \"{}\"", self.config.database),
            ))
            .await?;
        admin.close().await?;

        info!(database = %self.config.database, "Dropped test database");
        Ok(())
    }
}

/// Ids of a seeded author, story, chapter, active decision point and two choices.
#[derive(Debug, Clone)]
pub struct SeededStory {
    /// Story author.
    pub author_id: String,
    /// Story id.
    pub story_id: String,
    /// Chapter id.
    pub chapter_id: String,
    /// Decision point id.
    pub decision_point_id: String,
    /// Choice ids, in creation order.
    pub choice_ids: Vec<String>,
}

/// Insert a user with a throwaway password hash.
pub async fn seed_user<C: ConnectionTrait>(conn: &C, id: &str) -> Result<user::Model, DbErr> {
    user::ActiveModel {
        id: Set(id.to_string()),
        username: Set(id.to_string()),
        username_lower: Set(id.to_lowercase()),
        email: Set(format!("{id}@example.com")),
        token: Set(None),
        password_hash: Set("x".to_string()),
        name: Set(None),
        bio: Set(None),
        avatar_url: Set(None),
        followers_count: Set(0),
        following_count: Set(0),
        created_at: Set(Utc::now().into()),
        updated_at: Set(None),
    }
    .insert(conn)
    .await
}

/// Insert a story tree with one decision point and two choices.
pub async fn seed_story<C: ConnectionTrait>(conn: &C, prefix: &str) -> Result<SeededStory, DbErr> {
    let author = seed_user(conn, &format!("{prefix}author")).await?;
    let now = Utc::now();

    let story = story::ActiveModel {
        id: Set(format!("{prefix}story")),
        slug: Set(format!("{prefix}story")),
        author_id: Set(author.id.clone()),
        title: Set("Seeded".to_string()),
        description: Set(String::new()),
        content: Set(String::new()),
        cover_image_url: Set(None),
        category: Set(None),
        is_active: Set(true),
        is_published: Set(true),
        likes_count: Set(0),
        shares_count: Set(0),
        created_at: Set(now.into()),
        updated_at: Set(None),
    }
    .insert(conn)
    .await?;

    let chapter = chapter::ActiveModel {
        id: Set(format!("{prefix}chapter")),
        story_id: Set(story.id.clone()),
        title: Set("One".to_string()),
        content: Set(String::new()),
        order: Set(1),
        created_at: Set(now.into()),
        updated_at: Set(None),
    }
    .insert(conn)
    .await?;

    let dp = decision_point::ActiveModel {
        id: Set(format!("{prefix}dp")),
        chapter_id: Set(chapter.id.clone()),
        question: Set("Which way?".to_string()),
        created_at: Set(now.into()),
        expires_at: Set(None),
        is_active: Set(true),
    }
    .insert(conn)
    .await?;

    let mut choice_ids = Vec::new();
    for (i, text) in ["Left", "Right"].into_iter().enumerate() {
        let c = choice::ActiveModel {
            id: Set(format!("{prefix}choice{i}")),
            decision_point_id: Set(dp.id.clone()),
            text: Set(text.to_string()),
            votes: Set(0),
            created_at: Set(now.into()),
        }
        .insert(conn)
        .await?;
        choice_ids.push(c.id);
    }

    Ok(SeededStory {
        author_id: author.id,
        story_id: story.id,
        chapter_id: chapter.id,
        decision_point_id: dp.id,
        choice_ids,
    })
}
