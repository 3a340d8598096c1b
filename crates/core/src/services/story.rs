//! Story service: authoring, listing, likes and shares.

use sea_orm::Set;
use serde::{Deserialize, Serialize};
use storyloom_common::{AppError, AppResult, IdGenerator, slug_with_suffix, slugify};
use storyloom_db::{
    entities::{story, story_like, story_share},
    repositories::{StoryFilter, StoryRepository, UserRepository},
};
use tracing::info;
use validator::Validate;

use super::authz::{ensure_author, is_author};

/// Platforms a story can be shared to.
pub const SHARE_PLATFORMS: &[&str] = &["twitter", "facebook", "email", "linkedin", "whatsapp"];

const DEFAULT_LIMIT: u64 = 20;
const MAX_LIMIT: u64 = 100;

/// Story service for business logic.
#[derive(Clone)]
pub struct StoryService {
    story_repo: StoryRepository,
    user_repo: UserRepository,
    id_gen: IdGenerator,
}

/// Input for creating a story.
#[derive(Debug, Deserialize, Validate)]
pub struct CreateStoryInput {
    #[validate(length(min = 1, max = 200))]
    pub title: String,

    #[serde(default)]
    #[validate(length(max = 5000))]
    pub description: String,

    #[serde(default)]
    pub content: String,

    #[validate(length(max = 100))]
    pub category: Option<String>,

    #[validate(length(max = 512))]
    pub cover_image_url: Option<String>,

    pub is_published: Option<bool>,
}

/// Input for updating a story. The slug never changes.
#[derive(Debug, Default, Deserialize, Validate)]
pub struct UpdateStoryInput {
    #[validate(length(min = 1, max = 200))]
    pub title: Option<String>,

    #[validate(length(max = 5000))]
    pub description: Option<String>,

    pub content: Option<String>,

    #[validate(length(max = 100))]
    pub category: Option<String>,

    #[validate(length(max = 512))]
    pub cover_image_url: Option<String>,

    pub is_published: Option<bool>,
}

/// Filters for listing stories.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct StoryListQuery {
    /// Author username.
    pub author: Option<String>,
    pub category: Option<String>,
    pub search: Option<String>,
    pub limit: Option<u64>,
    pub until_id: Option<String>,
}

/// A story as seen by a particular viewer.
#[derive(Debug, Clone, Serialize)]
pub struct StoryView {
    #[serde(flatten)]
    pub story: story::Model,
    pub is_liked: bool,
    pub can_edit: bool,
}

/// Outcome of toggling a like.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct LikeResult {
    pub liked: bool,
    pub likes_count: i32,
}

/// Outcome of a share.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ShareResult {
    /// Whether this call recorded a new share.
    pub shared: bool,
    pub shares_count: i32,
}

impl StoryService {
    /// Create a new story service.
    #[must_use]
    pub const fn new(story_repo: StoryRepository, user_repo: UserRepository) -> Self {
        Self {
            story_repo,
            user_repo,
            id_gen: IdGenerator::new(),
        }
    }

    /// Create a story owned by `author_id`.
    pub async fn create(&self, author_id: &str, input: CreateStoryInput) -> AppResult<story::Model> {
        input.validate()?;

        let mut slug = slugify(&input.title);
        if slug.is_empty() || self.story_repo.slug_exists(&slug).await? {
            slug = slug_with_suffix(&slug, &self.id_gen.generate_suffix());
        }

        let now = chrono::Utc::now();
        let model = story::ActiveModel {
            id: Set(self.id_gen.generate()),
            slug: Set(slug),
            author_id: Set(author_id.to_string()),
            title: Set(input.title),
            description: Set(input.description),
            content: Set(input.content),
            cover_image_url: Set(input.cover_image_url),
            category: Set(input.category),
            is_active: Set(true),
            is_published: Set(input.is_published.unwrap_or(true)),
            likes_count: Set(0),
            shares_count: Set(0),
            created_at: Set(now.into()),
            updated_at: Set(None),
        };

        let story = self.story_repo.create(model).await?;
        info!(story_id = %story.id, slug = %story.slug, author_id, "Story created");

        Ok(story)
    }

    /// List published stories, newest first.
    ///
    /// An unknown author yields an empty list rather than an error.
    pub async fn list(&self, query: StoryListQuery) -> AppResult<Vec<story::Model>> {
        let author_id = match query.author.as_deref() {
            Some(username) => match self.user_repo.find_by_username(username).await? {
                Some(user) => Some(user.id),
                None => return Ok(vec![]),
            },
            None => None,
        };

        let filter = StoryFilter {
            author_id,
            category: query.category.filter(|c| !c.is_empty()),
            search: query.search.filter(|s| !s.trim().is_empty()),
            limit: query.limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT),
            until_id: query.until_id,
        };

        self.story_repo.list(&filter).await
    }

    /// Get a story for a viewer, with their like and edit flags.
    pub async fn get_by_slug(&self, slug: &str, viewer_id: Option<&str>) -> AppResult<StoryView> {
        let story = self.visible_story(slug, viewer_id).await?;

        let (is_liked, can_edit) = match viewer_id {
            Some(viewer) => (
                self.story_repo.is_liked(&story.id, viewer).await?,
                is_author(&story, viewer),
            ),
            None => (false, false),
        };

        Ok(StoryView {
            story,
            is_liked,
            can_edit,
        })
    }

    /// Load a story the viewer may read.
    ///
    /// Drafts are visible to their author only; everyone else gets
    /// [`AppError::StoryNotFound`].
    pub(crate) async fn visible_story(
        &self,
        slug: &str,
        viewer_id: Option<&str>,
    ) -> AppResult<story::Model> {
        let story = self
            .story_repo
            .find_by_slug(slug)
            .await?
            .ok_or_else(|| AppError::StoryNotFound(slug.to_string()))?;

        if story.is_published || viewer_id.is_some_and(|v| is_author(&story, v)) {
            Ok(story)
        } else {
            Err(AppError::StoryNotFound(slug.to_string()))
        }
    }

    /// Load a story `user_id` is about to modify.
    pub(crate) async fn authored_story(
        &self,
        slug: &str,
        user_id: &str,
        action: &str,
    ) -> AppResult<story::Model> {
        let story = self.visible_story(slug, Some(user_id)).await?;
        ensure_author(&story, user_id, action)?;
        Ok(story)
    }

    /// Update a story. Absent fields are left unchanged.
    pub async fn update(
        &self,
        user_id: &str,
        slug: &str,
        input: UpdateStoryInput,
    ) -> AppResult<story::Model> {
        input.validate()?;

        let story = self.authored_story(slug, user_id, "edit this story").await?;
        let mut active: story::ActiveModel = story.into();

        if let Some(title) = input.title {
            active.title = Set(title);
        }
        if let Some(description) = input.description {
            active.description = Set(description);
        }
        if let Some(content) = input.content {
            active.content = Set(content);
        }
        if let Some(category) = input.category {
            active.category = Set(Some(category));
        }
        if let Some(cover_image_url) = input.cover_image_url {
            active.cover_image_url = Set(Some(cover_image_url));
        }
        if let Some(is_published) = input.is_published {
            active.is_published = Set(is_published);
        }

        active.updated_at = Set(Some(chrono::Utc::now().into()));

        self.story_repo.update(active).await
    }

    /// Delete a story and everything under it.
    pub async fn delete(&self, user_id: &str, slug: &str) -> AppResult<()> {
        let story = self
            .authored_story(slug, user_id, "delete this story")
            .await?;
        self.story_repo.delete(&story.id).await?;

        info!(story_id = %story.id, user_id, "Story deleted");
        Ok(())
    }

    /// Like the story, or remove the like if present.
    pub async fn toggle_like(&self, user_id: &str, slug: &str) -> AppResult<LikeResult> {
        let story = self.visible_story(slug, Some(user_id)).await?;

        let liked = if self.story_repo.delete_like(&story.id, user_id).await? {
            self.story_repo.decrement_likes_count(&story.id).await?;
            false
        } else {
            let model = story_like::ActiveModel {
                id: Set(self.id_gen.generate()),
                story_id: Set(story.id.clone()),
                user_id: Set(user_id.to_string()),
                created_at: Set(chrono::Utc::now().into()),
            };
            if self.story_repo.insert_like(model).await? {
                self.story_repo.increment_likes_count(&story.id).await?;
            }
            true
        };

        let likes_count = self.current(&story).await?.likes_count;
        Ok(LikeResult { liked, likes_count })
    }

    /// Record a share of the story to `platform`.
    ///
    /// Sharing to the same platform again is accepted but not counted.
    pub async fn share(
        &self,
        user_id: &str,
        slug: &str,
        platform: &str,
    ) -> AppResult<ShareResult> {
        let platform = platform.to_lowercase();
        if !SHARE_PLATFORMS.contains(&platform.as_str()) {
            return Err(AppError::BadRequest(format!(
                "Unsupported platform. Supported: {}",
                SHARE_PLATFORMS.join(", ")
            )));
        }

        let story = self.visible_story(slug, Some(user_id)).await?;

        let model = story_share::ActiveModel {
            id: Set(self.id_gen.generate()),
            story_id: Set(story.id.clone()),
            user_id: Set(user_id.to_string()),
            platform: Set(platform),
            created_at: Set(chrono::Utc::now().into()),
        };

        let shared = self.story_repo.insert_share(model).await?;
        if shared {
            self.story_repo.increment_shares_count(&story.id).await?;
        }

        let shares_count = self.current(&story).await?.shares_count;
        Ok(ShareResult {
            shared,
            shares_count,
        })
    }

    /// Whether the user likes the story.
    pub async fn is_liked(&self, user_id: &str, slug: &str) -> AppResult<bool> {
        let story = self.visible_story(slug, Some(user_id)).await?;
        self.story_repo.is_liked(&story.id, user_id).await
    }

    async fn current(&self, story: &story::Model) -> AppResult<story::Model> {
        self.story_repo
            .find_by_id(&story.id)
            .await?
            .ok_or_else(|| AppError::StoryNotFound(story.slug.clone()))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use chrono::Utc;
    use sea_orm::{DatabaseBackend, MockDatabase, MockExecResult, Value};
    use std::collections::BTreeMap;
    use std::sync::Arc;

    fn create_test_story(slug: &str, author_id: &str, published: bool) -> story::Model {
        story::Model {
            id: format!("{slug}-id"),
            slug: slug.to_string(),
            author_id: author_id.to_string(),
            title: "A Story".to_string(),
            description: String::new(),
            content: String::new(),
            cover_image_url: None,
            category: None,
            is_active: true,
            is_published: published,
            likes_count: 0,
            shares_count: 0,
            created_at: Utc::now().into(),
            updated_at: None,
        }
    }

    fn count(n: i64) -> BTreeMap<&'static str, Value> {
        BTreeMap::from([("num_items", Value::BigInt(Some(n)))])
    }

    fn exec(rows_affected: u64) -> MockExecResult {
        MockExecResult {
            last_insert_id: 0,
            rows_affected,
        }
    }

    fn service(db: MockDatabase) -> StoryService {
        let db = Arc::new(db.into_connection());
        StoryService::new(StoryRepository::new(db.clone()), UserRepository::new(db))
    }

    #[tokio::test]
    async fn test_create_uses_slugified_title() {
        let mut created = create_test_story("a-story", "alice", true);
        created.title = "A Story!".to_string();
        let svc = service(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[count(0)]])
                .append_query_results([[created]]),
        );

        let story = svc
            .create(
                "alice",
                CreateStoryInput {
                    title: "A Story!".to_string(),
                    description: String::new(),
                    content: String::new(),
                    category: None,
                    cover_image_url: None,
                    is_published: None,
                },
            )
            .await
            .unwrap();

        assert_eq!(story.slug, "a-story");
    }

    #[tokio::test]
    async fn test_create_rejects_empty_title() {
        let svc = service(MockDatabase::new(DatabaseBackend::Postgres));

        let result = svc
            .create(
                "alice",
                CreateStoryInput {
                    title: String::new(),
                    description: String::new(),
                    content: String::new(),
                    category: None,
                    cover_image_url: None,
                    is_published: None,
                },
            )
            .await;

        assert!(matches!(result, Err(AppError::Validation(_))));
    }

    #[tokio::test]
    async fn test_draft_hidden_from_others() {
        let svc = service(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[create_test_story("draft", "alice", false)]]),
        );

        let result = svc.get_by_slug("draft", Some("bob")).await;

        assert!(matches!(result, Err(AppError::StoryNotFound(_))));
    }

    #[tokio::test]
    async fn test_draft_visible_to_author() {
        let svc = service(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[create_test_story("draft", "alice", false)]])
                .append_query_results([[count(0)]]),
        );

        let view = svc.get_by_slug("draft", Some("alice")).await.unwrap();

        assert!(view.can_edit);
        assert!(!view.is_liked);
    }

    #[tokio::test]
    async fn test_update_by_stranger_forbidden() {
        let svc = service(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[create_test_story("tale", "alice", true)]]),
        );

        let result = svc
            .update("bob", "tale", UpdateStoryInput::default())
            .await;

        assert!(matches!(result, Err(AppError::Forbidden(_))));
    }

    #[tokio::test]
    async fn test_list_unknown_author_is_empty() {
        let svc = service(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([Vec::<storyloom_db::entities::user::Model>::new()]),
        );

        let stories = svc
            .list(StoryListQuery {
                author: Some("ghost".to_string()),
                ..Default::default()
            })
            .await
            .unwrap();

        assert!(stories.is_empty());
    }

    #[tokio::test]
    async fn test_toggle_like_adds_like() {
        let mut liked = create_test_story("tale", "alice", true);
        liked.likes_count = 1;
        let svc = service(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[create_test_story("tale", "alice", true)]])
                .append_exec_results([exec(0), exec(1), exec(1)])
                .append_query_results([[liked]]),
        );

        let result = svc.toggle_like("bob", "tale").await.unwrap();

        assert_eq!(
            result,
            LikeResult {
                liked: true,
                likes_count: 1
            }
        );
    }

    #[tokio::test]
    async fn test_toggle_like_removes_like() {
        let svc = service(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[create_test_story("tale", "alice", true)]])
                .append_exec_results([exec(1), exec(1)])
                .append_query_results([[create_test_story("tale", "alice", true)]]),
        );

        let result = svc.toggle_like("bob", "tale").await.unwrap();

        assert!(!result.liked);
        assert_eq!(result.likes_count, 0);
    }

    #[tokio::test]
    async fn test_share_unknown_platform() {
        let svc = service(MockDatabase::new(DatabaseBackend::Postgres));

        let result = svc.share("bob", "tale", "myspace").await;

        assert!(matches!(result, Err(AppError::BadRequest(_))));
    }

    #[tokio::test]
    async fn test_share_repeat_not_counted() {
        let mut shared = create_test_story("tale", "alice", true);
        shared.shares_count = 1;
        let svc = service(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[create_test_story("tale", "alice", true)]])
                .append_exec_results([exec(0)])
                .append_query_results([[shared]]),
        );

        let result = svc.share("bob", "tale", "Twitter").await.unwrap();

        assert_eq!(
            result,
            ShareResult {
                shared: false,
                shares_count: 1
            }
        );
    }
}
