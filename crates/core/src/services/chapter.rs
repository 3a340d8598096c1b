//! Chapter service.

use sea_orm::Set;
use serde::Deserialize;
use storyloom_common::{AppError, AppResult, IdGenerator};
use storyloom_db::{entities::chapter, repositories::ChapterRepository};
use tracing::info;
use validator::Validate;

use super::story::StoryService;

/// Chapter service for business logic.
#[derive(Clone)]
pub struct ChapterService {
    chapter_repo: ChapterRepository,
    stories: StoryService,
    id_gen: IdGenerator,
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateChapterInput {
    #[validate(length(min = 1, max = 200))]
    pub title: String,

    #[serde(default)]
    pub content: String,

    #[validate(range(min = 1))]
    pub order: i32,
}

#[derive(Debug, Default, Deserialize, Validate)]
pub struct UpdateChapterInput {
    #[validate(length(min = 1, max = 200))]
    pub title: Option<String>,

    pub content: Option<String>,

    #[validate(range(min = 1))]
    pub order: Option<i32>,
}

impl ChapterService {
    /// Create a new chapter service.
    #[must_use]
    pub const fn new(chapter_repo: ChapterRepository, stories: StoryService) -> Self {
        Self {
            chapter_repo,
            stories,
            id_gen: IdGenerator::new(),
        }
    }

    /// List a story's chapters in reading order.
    pub async fn list(&self, slug: &str, viewer_id: Option<&str>) -> AppResult<Vec<chapter::Model>> {
        let story = self.stories.visible_story(slug, viewer_id).await?;
        self.chapter_repo.find_by_story(&story.id).await
    }

    /// Add a chapter to a story.
    pub async fn create(
        &self,
        user_id: &str,
        slug: &str,
        input: CreateChapterInput,
    ) -> AppResult<chapter::Model> {
        input.validate()?;

        let story = self
            .stories
            .authored_story(slug, user_id, "add chapters")
            .await?;

        if self
            .chapter_repo
            .find_by_order(&story.id, input.order)
            .await?
            .is_some()
        {
            return Err(AppError::Conflict(
                "A chapter with this order already exists".to_string(),
            ));
        }

        let model = chapter::ActiveModel {
            id: Set(self.id_gen.generate()),
            story_id: Set(story.id.clone()),
            title: Set(input.title),
            content: Set(input.content),
            order: Set(input.order),
            created_at: Set(chrono::Utc::now().into()),
            updated_at: Set(None),
        };

        let chapter = self.chapter_repo.create(model).await?;
        info!(chapter_id = %chapter.id, story_id = %story.id, "Chapter created");

        Ok(chapter)
    }

    /// Get one chapter of a story.
    pub async fn get(
        &self,
        slug: &str,
        chapter_id: &str,
        viewer_id: Option<&str>,
    ) -> AppResult<chapter::Model> {
        let story = self.stories.visible_story(slug, viewer_id).await?;
        self.chapter_repo.get_in_story(&story.id, chapter_id).await
    }

    /// Update a chapter. Absent fields are left unchanged.
    pub async fn update(
        &self,
        user_id: &str,
        slug: &str,
        chapter_id: &str,
        input: UpdateChapterInput,
    ) -> AppResult<chapter::Model> {
        input.validate()?;

        let story = self
            .stories
            .authored_story(slug, user_id, "edit chapters")
            .await?;
        let chapter = self.chapter_repo.get_in_story(&story.id, chapter_id).await?;

        if let Some(order) = input.order
            && order != chapter.order
            && self
                .chapter_repo
                .find_by_order(&story.id, order)
                .await?
                .is_some()
        {
            return Err(AppError::Conflict(
                "A chapter with this order already exists".to_string(),
            ));
        }

        let mut active: chapter::ActiveModel = chapter.into();
        if let Some(title) = input.title {
            active.title = Set(title);
        }
        if let Some(content) = input.content {
            active.content = Set(content);
        }
        if let Some(order) = input.order {
            active.order = Set(order);
        }
        active.updated_at = Set(Some(chrono::Utc::now().into()));

        self.chapter_repo.update(active).await
    }

    /// Delete a chapter and its decision points.
    pub async fn delete(&self, user_id: &str, slug: &str, chapter_id: &str) -> AppResult<()> {
        let story = self
            .stories
            .authored_story(slug, user_id, "delete chapters")
            .await?;
        let chapter = self.chapter_repo.get_in_story(&story.id, chapter_id).await?;

        self.chapter_repo.delete(&chapter.id).await?;
        info!(chapter_id = %chapter.id, story_id = %story.id, "Chapter deleted");
        Ok(())
    }
}
